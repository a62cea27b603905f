use crate::config::AppConfig;
use crate::ports::Host;
use crate::service::ReminderService;

use std::sync::Arc;

pub struct AppState<H: Host> {
    pub config: AppConfig,
    pub service: Arc<ReminderService<H>>,
}

impl<H: Host> Clone for AppState<H> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            service: Arc::clone(&self.service),
        }
    }
}
