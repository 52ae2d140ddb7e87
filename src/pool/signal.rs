//! Write-once cancellation signal shared by a pool, its workers, and its producer.

use crate::error::Error;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// Shared stop condition carrying the first fatal error.
///
/// The first call to [`trip`](Self::trip) records its error and cancels the
/// token; later calls still see the token cancelled but their errors are
/// dropped. The signal is never reset.
#[derive(Clone, Debug)]
pub struct CancelSignal {
    token: CancellationToken,
    first_error: Arc<Mutex<FirstError>>,
}

/// Write-once slot for the first fatal error
#[derive(Debug, Default)]
enum FirstError {
    #[default]
    Empty,
    Recorded(Error),
    /// Handed out by `take_error`; the message keeps the failure visible
    Taken(String),
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    /// Create an independent signal
    pub fn new() -> Self {
        Self::from_token(CancellationToken::new())
    }

    /// Create a signal that also fires when `parent` is cancelled
    ///
    /// Cancelling the parent stops the pool without recording an error.
    /// Tripping this signal never cancels the parent.
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self::from_token(parent.child_token())
    }

    fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            first_error: Arc::new(Mutex::new(FirstError::Empty)),
        }
    }

    /// Record `error` as the run's failure and cancel.
    ///
    /// Returns `true` if this call recorded the first error.
    pub fn trip(&self, error: Error) -> bool {
        let recorded = {
            let mut slot = self.lock_slot();
            if matches!(*slot, FirstError::Empty) {
                *slot = FirstError::Recorded(error);
                true
            } else {
                false
            }
        };
        self.token.cancel();
        recorded
    }

    /// Cancel without recording an error
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation has fired (by error or otherwise)
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether a fatal error has been recorded
    pub fn has_error(&self) -> bool {
        !matches!(*self.lock_slot(), FirstError::Empty)
    }

    /// Message of the recorded error, also after it was taken
    pub fn error_message(&self) -> Option<String> {
        match &*self.lock_slot() {
            FirstError::Empty => None,
            FirstError::Recorded(err) => Some(err.to_string()),
            FirstError::Taken(message) => Some(message.clone()),
        }
    }

    /// Resolves once cancellation fires
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Take the recorded error, leaving its message behind.
    ///
    /// Only the first call after a trip returns `Some`.
    pub(crate) fn take_error(&self) -> Option<Error> {
        let mut slot = self.lock_slot();
        match std::mem::take(&mut *slot) {
            FirstError::Recorded(err) => {
                *slot = FirstError::Taken(err.to_string());
                Some(err)
            }
            other => {
                *slot = other;
                None
            }
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, FirstError> {
        self.first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
