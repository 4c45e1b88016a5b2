pub mod device_registry;
pub mod dispatcher;
pub mod event_relay;
pub mod health_service;
pub mod payload_builder;

pub use device_registry::DeviceRegistry;
pub use dispatcher::Dispatcher;
pub use event_relay::EventRelay;
pub use health_service::HealthService;
pub use payload_builder::PayloadBuilder;
