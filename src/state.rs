use std::sync::Arc;

use crate::config::Config;
use crate::middleware::rate_limit::RequestLimiter;
use crate::services::ClientFactory;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub clients: Arc<dyn ClientFactory>,
    pub limiter: Arc<RequestLimiter>,
}

impl AppState {
    pub fn new(config: Arc<Config>, clients: Arc<dyn ClientFactory>) -> Self {
        let limiter = Arc::new(RequestLimiter::new(config.max_concurrent_requests));
        Self {
            config,
            clients,
            limiter,
        }
    }
}
