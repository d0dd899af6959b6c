//! Application state for the HTTP server

use std::ops::Deref;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::service::DocQaService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<DocQaService>,
}

impl AppState {
    /// Build the service from configuration and make its index ready
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing docqa application state...");
        let service = DocQaService::from_config(config)?;
        service.start().await?;
        Ok(Self::from_service(Arc::new(service)))
    }

    /// Wrap an already started service
    pub fn from_service(service: Arc<DocQaService>) -> Self {
        Self { inner: service }
    }
}

impl Deref for AppState {
    type Target = DocQaService;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
