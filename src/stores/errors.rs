//! Process-wide error history and keyed loading flags
//!
//! Independent features report failures here instead of talking to each
//! other. The history is a ring buffer of the last `MAX_ERRORS` records,
//! newest first.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::error::RequestError;
use crate::models::{ErrorDetails, ErrorRecord, ErrorSeverity, ErrorType};

/// Capacity of the error history
pub const MAX_ERRORS: usize = 10;

/// Observable state of the error store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorState {
    /// Newest first
    pub errors: VecDeque<ErrorRecord>,
    pub current_error: Option<ErrorRecord>,
    pub is_showing_error: bool,
    pub loading: HashMap<String, bool>,
}

struct ErrorInner {
    state: watch::Sender<ErrorState>,
    dismiss_delay: Duration,
    sequence: AtomicU64,
}

#[derive(Clone)]
pub struct ErrorStore {
    inner: Arc<ErrorInner>,
}

impl ErrorStore {
    pub fn new(dismiss_delay: Duration) -> Self {
        let (state, _) = watch::channel(ErrorState::default());
        Self {
            inner: Arc::new(ErrorInner {
                state,
                dismiss_delay,
                sequence: AtomicU64::new(0),
            }),
        }
    }

    pub fn snapshot(&self) -> ErrorState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ErrorState> {
        self.inner.state.subscribe()
    }

    pub fn current_error(&self) -> Option<ErrorRecord> {
        self.inner.state.borrow().current_error.clone()
    }

    pub fn is_showing_error(&self) -> bool {
        self.inner.state.borrow().is_showing_error
    }

    /// Record an error and show it.
    ///
    /// LOW severity errors hide themselves after the dismiss delay, provided
    /// they are still the one being shown. Must be called from within a
    /// tokio runtime.
    pub fn add_error(
        &self,
        error_type: ErrorType,
        message: impl Into<String>,
        severity: ErrorSeverity,
        details: ErrorDetails,
    ) -> ErrorRecord {
        let now = Utc::now();
        let sequence = self.inner.sequence.fetch_add(1, Ordering::Relaxed);
        let record = ErrorRecord {
            id: format!("{}-{}", now.timestamp_millis(), sequence),
            error_type,
            message: message.into(),
            severity,
            details,
            timestamp: now,
        };

        self.inner.state.send_modify(|state| {
            state.errors.push_front(record.clone());
            state.errors.truncate(MAX_ERRORS);
            state.current_error = Some(record.clone());
            state.is_showing_error = true;
        });

        match severity {
            ErrorSeverity::Low => debug!("[{}] {}", error_type, record.message),
            ErrorSeverity::Medium => warn!("[{}] {}", error_type, record.message),
            ErrorSeverity::High | ErrorSeverity::Critical => {
                error!("[{}/{}] {}", error_type, severity, record.message);
            }
        }

        if severity == ErrorSeverity::Low {
            self.schedule_dismiss(record.id.clone());
        }

        record
    }

    /// Shorthand for a MEDIUM error without details
    pub fn report(&self, error_type: ErrorType, message: impl Into<String>) -> ErrorRecord {
        self.add_error(error_type, message, ErrorSeverity::default(), ErrorDetails::new())
    }

    /// Hide the current error; the history keeps it
    pub fn dismiss_error(&self) {
        self.inner.state.send_if_modified(|state| {
            let changed = state.is_showing_error || state.current_error.is_some();
            state.is_showing_error = false;
            state.current_error = None;
            changed
        });
    }

    pub fn clear_errors(&self) {
        self.inner.state.send_if_modified(|state| {
            let changed = !state.errors.is_empty() || state.current_error.is_some();
            state.errors.clear();
            state.current_error = None;
            state.is_showing_error = false;
            changed
        });
    }

    pub fn get_errors_by_type(&self, error_type: ErrorType) -> Vec<ErrorRecord> {
        self.inner
            .state
            .borrow()
            .errors
            .iter()
            .filter(|record| record.error_type == error_type)
            .cloned()
            .collect()
    }

    /// Run `operation`, recording a classified error if it fails.
    ///
    /// The failure itself is returned unchanged.
    pub async fn with_error_handling<T, F>(
        &self,
        operation: F,
        default_type: ErrorType,
    ) -> anyhow::Result<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match operation.await {
            Ok(value) => Ok(value),
            Err(err) => {
                let (error_type, severity, details) = classify(&err, default_type);
                self.add_error(error_type, err.to_string(), severity, details);
                Err(err)
            }
        }
    }

    pub fn set_loading(&self, key: impl Into<String>, loading: bool) {
        let key = key.into();
        self.inner.state.send_if_modified(|state| {
            state.loading.insert(key, loading) != Some(loading)
        });
    }

    /// Set `key` from `loading`, evaluated under the store's channel lock
    pub fn set_loading_from(&self, key: impl Into<String>, loading: impl FnOnce() -> bool) {
        let key = key.into();
        self.inner.state.send_if_modified(|state| {
            let loading = loading();
            state.loading.insert(key, loading) != Some(loading)
        });
    }

    /// `false` for keys that were never set
    pub fn is_loading(&self, key: &str) -> bool {
        self.inner
            .state
            .borrow()
            .loading
            .get(key)
            .copied()
            .unwrap_or(false)
    }

    pub fn clear_loading(&self) {
        self.inner.state.send_if_modified(|state| {
            let changed = !state.loading.is_empty();
            state.loading.clear();
            changed
        });
    }

    fn schedule_dismiss(&self, id: String) {
        let store: Weak<ErrorInner> = Arc::downgrade(&self.inner);
        let delay = self.inner.dismiss_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = store.upgrade() else {
                return;
            };

            inner.state.send_if_modified(|state| {
                let still_current = state
                    .current_error
                    .as_ref()
                    .is_some_and(|current| current.id == id);
                if still_current {
                    state.current_error = None;
                    state.is_showing_error = false;
                }
                still_current
            });
        });
    }
}

/// Map a failure to a type and severity from the signals it carries
fn classify(err: &anyhow::Error, default_type: ErrorType) -> (ErrorType, ErrorSeverity, ErrorDetails) {
    let request = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<RequestError>());
    let status = request.and_then(RequestError::status);
    let is_network = matches!(request, Some(RequestError::Network(_)))
        || err
            .chain()
            .any(|cause| cause.to_string().to_lowercase().contains("network"));

    let mut details = ErrorDetails::new();
    details.insert("cause".to_string(), Value::String(format!("{err:#}")));
    if let Some(status) = status {
        details.insert("status".to_string(), Value::from(status));
    }

    let (error_type, severity) = if is_network {
        (ErrorType::Network, ErrorSeverity::High)
    } else {
        match status {
            Some(401) => (ErrorType::Authentication, ErrorSeverity::High),
            Some(400..=499) => (ErrorType::Validation, ErrorSeverity::Medium),
            // Server errors keep the caller's type and only raise severity
            Some(500..=599) => (default_type, ErrorSeverity::High),
            _ => (default_type, ErrorSeverity::Medium),
        }
    };

    (error_type, severity, details)
}
