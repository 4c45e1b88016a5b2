use crate::adapters::push::PushBackend;
use crate::domain::device::Platform;
use std::collections::HashMap;
use std::sync::Arc;

/// Selects the backend responsible for each platform.
#[derive(Clone, Debug, Default)]
pub struct BackendRouter {
    routes: HashMap<Platform, Arc<dyn PushBackend>>,
    fallback: Option<Arc<dyn PushBackend>>,
}

impl BackendRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A router sending every platform through one backend.
    #[must_use]
    pub fn single(backend: Arc<dyn PushBackend>) -> Self {
        Self { routes: HashMap::new(), fallback: Some(backend) }
    }

    #[must_use]
    pub fn with_route(mut self, platform: Platform, backend: Arc<dyn PushBackend>) -> Self {
        self.routes.insert(platform, backend);
        self
    }

    /// Backend for platforms without an explicit route.
    #[must_use]
    pub fn with_fallback(mut self, backend: Arc<dyn PushBackend>) -> Self {
        self.fallback = Some(backend);
        self
    }

    #[must_use]
    pub fn route(&self, platform: Platform) -> Option<&Arc<dyn PushBackend>> {
        self.routes.get(&platform).or(self.fallback.as_ref())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty() && self.fallback.is_none()
    }
}
