pub mod delivery;
pub mod device;
pub mod notification;
