use adapter_api::{ADAPTERS_PATH, AdapterApiClient, ApiError};
use adapter_types::{AdapterDescriptor, decode_adapter_list};
use async_trait::async_trait;
use tracing::debug;

use crate::{RegistryConfig, error::RefreshError};

/// Source of the adapter list. The registry only talks to the backend
/// through this trait, which keeps it testable without a network.
#[async_trait]
pub trait AdapterFetcher: Send + Sync {
    async fn fetch_adapters(&self) -> Result<Vec<AdapterDescriptor>, RefreshError>;
}

/// Fetches `GET {api_base}/adapters` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAdapterFetcher {
    client: AdapterApiClient,
}

impl HttpAdapterFetcher {
    pub fn new(client: AdapterApiClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &RegistryConfig) -> Result<Self, ApiError> {
        Ok(Self::new(AdapterApiClient::new(&config.client_settings())?))
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }
}

#[async_trait]
impl AdapterFetcher for HttpAdapterFetcher {
    async fn fetch_adapters(&self) -> Result<Vec<AdapterDescriptor>, RefreshError> {
        let body = self.client.get_body(ADAPTERS_PATH).await?;
        let adapters = decode_adapter_list(&body)?;
        debug!(base_url = %self.client.base_url(), adapter_count = adapters.len(), "decoded adapter list");
        Ok(adapters)
    }
}
