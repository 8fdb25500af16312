use std::{
    fmt,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use adapter_api::ApiError;
use adapter_types::AdapterDescriptor;
use tokio::{runtime::Handle, sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    RegistryConfig,
    error::RefreshError,
    fetch::{AdapterFetcher, HttpAdapterFetcher},
    reporter::{ErrorReport, ErrorReporter},
};

/// Shared, immutable snapshot of the adapter collection.
pub type AdapterList = Arc<Vec<AdapterDescriptor>>;

/// Result of a single refresh.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// The collection was replaced and subscribers were notified.
    Applied { count: usize },
    /// The backend returned exactly the current collection; nobody was notified.
    Unchanged { count: usize },
    /// A later refresh started before this one finished; its result was dropped.
    Superseded,
    /// The refresh failed and the error was reported; the collection is untouched.
    Failed(RefreshError),
}

impl RefreshOutcome {
    /// Whether the backend answered with a usable list that is now current.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Applied { .. } | Self::Unchanged { .. })
    }
}

/// Observable store of the adapters the backend knows about.
///
/// The collection starts empty and is only ever replaced wholesale by the
/// result of a successful refresh. Failed refreshes leave it untouched and
/// are routed to the shared [`ErrorReporter`].
///
/// Overlapping refreshes resolve to the most recently *started* one: each
/// refresh takes a generation number and only the latest generation may
/// apply its result. Starting a background refresh also aborts the previous
/// background task.
///
/// Cloning produces another handle to the same store.
#[derive(Clone)]
pub struct AdapterRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    fetcher: Arc<dyn AdapterFetcher>,
    error_reporter: Arc<dyn ErrorReporter>,
    adapters: watch::Sender<AdapterList>,
    latest_generation: AtomicU64,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapter_count", &self.len())
            .field("latest_generation", &self.inner.latest_generation.load(Ordering::SeqCst))
            .finish()
    }
}

impl AdapterRegistry {
    pub fn new(fetcher: Arc<dyn AdapterFetcher>, error_reporter: Arc<dyn ErrorReporter>) -> Self {
        let (adapters, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Arc::new(RegistryInner {
                fetcher,
                error_reporter,
                adapters,
                latest_generation: AtomicU64::new(0),
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Build a registry that fetches over HTTP using `config`.
    pub fn from_config(config: &RegistryConfig, error_reporter: Arc<dyn ErrorReporter>) -> Result<Self, ApiError> {
        let fetcher = HttpAdapterFetcher::from_config(config)?;
        info!(base_url = %fetcher.base_url(), "adapter registry configured");
        Ok(Self::new(Arc::new(fetcher), error_reporter))
    }

    /// Start a refresh in the background and return immediately.
    ///
    /// Must be called from within a tokio runtime; otherwise the failure is
    /// reported and nothing else happens.
    pub fn refresh_adapters(&self) {
        let Ok(runtime) = Handle::try_current() else {
            let error = RefreshError::NoRuntime;
            warn!(%error, "adapter refresh not started");
            self.inner.error_reporter.report(ErrorReport::from_refresh_error(&error));
            return;
        };

        // Generations are handed out and their tasks stored under one lock,
        // so the stored handle always belongs to the newest background refresh.
        let mut in_flight = self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = self.inner.begin_generation();
        let inner = Arc::clone(&self.inner);
        let task = runtime.spawn(async move {
            inner.run_refresh(generation).await;
        });

        if let Some(previous) = in_flight.replace(task)
            && !previous.is_finished()
        {
            debug!(generation, "aborting superseded adapter refresh");
            previous.abort();
        }
    }

    /// Run a refresh inline and report how it ended.
    ///
    /// Failures are reported to the error reporter exactly as for
    /// [`refresh_adapters`](Self::refresh_adapters).
    pub async fn refresh_adapters_now(&self) -> RefreshOutcome {
        let generation = self.inner.begin_generation();
        self.inner.run_refresh(generation).await
    }

    /// Current collection.
    pub fn snapshot(&self) -> AdapterList {
        self.inner.adapters.borrow().clone()
    }

    /// Subscribe to collection changes.
    pub fn subscribe(&self) -> AdapterSubscription {
        AdapterSubscription {
            receiver: self.inner.adapters.subscribe(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.adapters.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.adapters.borrow().is_empty()
    }

    /// The first adapter with `id`, if any.
    pub fn get(&self, id: &str) -> Option<AdapterDescriptor> {
        self.inner.adapters.borrow().iter().find(|adapter| adapter.id == id).cloned()
    }

    /// Adapters that are not placeholder entries, in backend order.
    pub fn real_adapters(&self) -> Vec<AdapterDescriptor> {
        self.inner
            .adapters
            .borrow()
            .iter()
            .filter(|adapter| !adapter.is_placeholder())
            .cloned()
            .collect()
    }

    pub fn error_reporter(&self) -> &Arc<dyn ErrorReporter> {
        &self.inner.error_reporter
    }
}

impl RegistryInner {
    fn begin_generation(&self) -> u64 {
        self.latest_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.latest_generation.load(Ordering::SeqCst) == generation
    }

    async fn run_refresh(&self, generation: u64) -> RefreshOutcome {
        debug!(generation, "adapter refresh started");
        let result = self.fetcher.fetch_adapters().await;

        if !self.is_current(generation) {
            debug!(generation, "discarding superseded adapter response");
            return RefreshOutcome::Superseded;
        }

        match result {
            Ok(adapters) => self.apply(generation, adapters),
            Err(error) => {
                warn!(generation, %error, "adapter refresh failed; keeping previous adapters");
                self.error_reporter.report(ErrorReport::from_refresh_error(&error));
                RefreshOutcome::Failed(error)
            }
        }
    }

    fn apply(&self, generation: u64, adapters: Vec<AdapterDescriptor>) -> RefreshOutcome {
        let count = adapters.len();
        let mut superseded = false;

        // The generation check runs under the channel's write lock so a stale
        // result can never land after a newer one.
        let changed = self.adapters.send_if_modified(|current| {
            if !self.is_current(generation) {
                superseded = true;
                return false;
            }
            if same_list(current.as_slice(), &adapters) {
                return false;
            }
            *current = Arc::new(adapters);
            true
        });

        if superseded {
            debug!(generation, "discarding superseded adapter response");
            RefreshOutcome::Superseded
        } else if changed {
            debug!(generation, adapter_count = count, "adapter list replaced");
            RefreshOutcome::Applied { count }
        } else {
            debug!(generation, adapter_count = count, "adapter list unchanged");
            RefreshOutcome::Unchanged { count }
        }
    }
}

/// Order-sensitive comparison, down to the order of each descriptor's slots.
fn same_list(current: &[AdapterDescriptor], incoming: &[AdapterDescriptor]) -> bool {
    current.len() == incoming.len() && current.iter().zip(incoming).all(|(old, new)| old.same_as(new))
}

/// Receiver side of the adapter collection.
///
/// A notification is delivered only when a refresh actually changes the
/// contents; a refresh that returns an equal list is silent.
#[derive(Debug, Clone)]
pub struct AdapterSubscription {
    receiver: watch::Receiver<AdapterList>,
}

impl AdapterSubscription {
    /// Wait for the next change and return the new collection.
    ///
    /// Returns `None` once the registry has been dropped.
    pub async fn changed(&mut self) -> Option<AdapterList> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Whether a change arrived since the last [`changed`](Self::changed) or
    /// [`mark_seen`](Self::mark_seen).
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Current collection, without marking it as seen.
    pub fn snapshot(&self) -> AdapterList {
        self.receiver.borrow().clone()
    }

    /// Current collection, marking it as seen.
    pub fn mark_seen(&mut self) -> AdapterList {
        self.receiver.borrow_and_update().clone()
    }
}
