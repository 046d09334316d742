//! Handle ("onelink") rules and the debounced availability checker.

use crate::error::Error;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

pub const DEFAULT_MIN_LENGTH: usize = 3;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Trims whitespace and strips leading `@`s. Case is preserved.
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').trim().to_string()
}

/// Two handles are the same onelink when their normalized forms are identical.
pub fn is_equivalent_onelink(a: &str, b: &str) -> bool {
    normalize_handle(a) == normalize_handle(b)
}

fn is_handle_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Length then format check on an already normalized handle.
pub fn check_handle_format(normalized: &str, min_length: usize) -> Result<(), HandleStatus> {
    if normalized.chars().count() < min_length {
        return Err(HandleStatus::TooShort);
    }
    if !normalized.chars().all(is_handle_char) {
        return Err(HandleStatus::Invalid);
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleStatus {
    Unknown,
    Validating,
    TooShort,
    Invalid,
    /// Same as the user's current handle; no lookup needed.
    Current,
    Checking,
    Available,
    Unavailable,
    LookupFailed,
}

impl HandleStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            HandleStatus::Unknown | HandleStatus::Validating | HandleStatus::Checking
        )
    }
}

#[async_trait]
pub trait HandleLookup: Send + Sync {
    /// `handle` is already normalized and well-formed.
    async fn is_available(&self, handle: &str) -> Result<bool, Error>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub handle: String,
    pub available: bool,
}

/// Asks the API's `/onelinks/{handle}/available` route.
#[derive(Debug, Clone)]
pub struct RemoteHandleLookup {
    client: reqwest::Client,
    base_url: Url,
}

impl RemoteHandleLookup {
    /// `base_url` may carry a path prefix; it is kept whether or not it ends
    /// in `/`.
    pub fn new(base_url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        RemoteHandleLookup { client, base_url }
    }

    fn endpoint(&self, handle: &str) -> Result<Url, Error> {
        self.base_url
            .join(&format!("api/v1/onelinks/{}/available", handle))
            .map_err(|e| Error::Lookup { msg: e.to_string() })
    }
}

#[async_trait]
impl HandleLookup for RemoteHandleLookup {
    async fn is_available(&self, handle: &str) -> Result<bool, Error> {
        let res = self
            .client
            .get(self.endpoint(handle)?)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Lookup { msg: e.to_string() })?;

        let body: AvailabilityResponse = res
            .json()
            .await
            .map_err(|e| Error::Lookup { msg: e.to_string() })?;

        Ok(body.available)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CheckerConfig {
    pub min_length: usize,
    pub debounce: Duration,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig {
            min_length: DEFAULT_MIN_LENGTH,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Availability state machine for one handle input field.
///
/// Each call to [`input`](Self::input) validates synchronously; a well-formed
/// handle that differs from the current one schedules a single lookup after the
/// debounce window. Newer input aborts the pending lookup, and a lookup that
/// still completes after being superseded is discarded (last input wins).
///
/// Must be used from within a tokio runtime.
pub struct AvailabilityChecker<L> {
    lookup: Arc<L>,
    config: CheckerConfig,
    current_handle: Option<String>,
    generation: Arc<AtomicU64>,
    status: Arc<watch::Sender<HandleStatus>>,
    pending: Option<JoinHandle<()>>,
}

impl<L> AvailabilityChecker<L>
where
    L: HandleLookup + 'static,
{
    pub fn new(lookup: Arc<L>, config: CheckerConfig, current_handle: Option<&str>) -> Self {
        let (status, _) = watch::channel(HandleStatus::Unknown);
        AvailabilityChecker {
            lookup,
            config,
            current_handle: current_handle.map(normalize_handle),
            generation: Arc::new(AtomicU64::new(0)),
            status: Arc::new(status),
            pending: None,
        }
    }

    pub fn status(&self) -> HandleStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<HandleStatus> {
        self.status.subscribe()
    }

    /// Feeds the latest content of the input field and returns the status it
    /// settles on synchronously (`Checking` while a lookup is scheduled).
    pub fn input(&mut self, raw: &str) -> HandleStatus {
        self.cancel_pending();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let normalized = normalize_handle(raw);
        if normalized.is_empty() {
            return self.set(HandleStatus::Unknown);
        }

        self.set(HandleStatus::Validating);
        if let Err(status) = check_handle_format(&normalized, self.config.min_length) {
            return self.set(status);
        }
        if let Some(current) = &self.current_handle {
            if *current == normalized {
                return self.set(HandleStatus::Current);
            }
        }

        self.set(HandleStatus::Checking);
        self.pending = Some(self.schedule_lookup(normalized, generation));
        HandleStatus::Checking
    }

    fn schedule_lookup(&self, handle: String, generation: u64) -> JoinHandle<()> {
        let lookup = self.lookup.clone();
        let latest = self.generation.clone();
        let status = self.status.clone();
        let debounce = self.config.debounce;

        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if latest.load(Ordering::SeqCst) != generation {
                return;
            }

            let resolved = match lookup.is_available(&handle).await {
                Ok(true) => HandleStatus::Available,
                Ok(false) => HandleStatus::Unavailable,
                Err(e) => {
                    log::warn!("availability lookup for {} failed: {}", handle, e);
                    HandleStatus::LookupFailed
                }
            };

            if latest.load(Ordering::SeqCst) == generation {
                status.send_replace(resolved);
            } else {
                log::debug!("discard stale availability result for {}", handle);
            }
        })
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    fn set(&self, status: HandleStatus) -> HandleStatus {
        self.status.send_replace(status);
        status
    }
}

impl<L> Drop for AvailabilityChecker<L> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}
