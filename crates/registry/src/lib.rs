//! Observable registry of the adapters exposed by the backend.
//!
//! [`AdapterRegistry`] keeps the most recent adapter list fetched from
//! `GET {api_base}/adapters` and lets any number of UI components subscribe
//! to it. Refreshes replace the list wholesale; failures leave it untouched
//! and are sent to a shared [`ErrorReporter`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use adapter_registry::{AdapterRegistry, ErrorStore, RegistryConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let errors = ErrorStore::new();
//! let registry = AdapterRegistry::from_config(&RegistryConfig::load(), Arc::new(errors.clone()))?;
//! let mut updates = registry.subscribe();
//!
//! registry.refresh_adapters();
//! if let Some(adapters) = updates.changed().await {
//!     println!("{} adapters", adapters.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod reporter;
pub mod store;

pub use adapter_types::{AdapterDescriptor, AdapterParameter, PayloadError};
pub use config::{RegistryConfig, default_config_path};
pub use error::{ConfigError, RefreshError};
pub use fetch::{AdapterFetcher, HttpAdapterFetcher};
pub use reporter::{ErrorReport, ErrorReporter, ErrorStore};
pub use store::{AdapterList, AdapterRegistry, AdapterSubscription, RefreshOutcome};
