//! CallbackAggregator - collapses N completions into one

use std::sync::{Arc, Mutex, PoisonError};

use contracts::SharedError;

use crate::handle::PublishCallback;

struct AggregatorState {
    remaining: usize,
    first_error: Option<SharedError>,
    callback: Option<PublishCallback>,
}

/// Fires one final callback after `count` constituent results
///
/// The final outcome is success only if every constituent succeeded;
/// otherwise it carries the first failure's error. Safe to feed from
/// several endpoint workers at once. Results past `count` are ignored.
pub struct CallbackAggregator {
    state: Mutex<AggregatorState>,
}

impl CallbackAggregator {
    /// Create an aggregator expecting `count` results
    ///
    /// A zero count completes immediately with success.
    pub fn new(count: usize, callback: PublishCallback) -> Arc<Self> {
        if count == 0 {
            callback(Ok(()));
            return Arc::new(Self {
                state: Mutex::new(AggregatorState {
                    remaining: 0,
                    first_error: None,
                    callback: None,
                }),
            });
        }

        Arc::new(Self {
            state: Mutex::new(AggregatorState {
                remaining: count,
                first_error: None,
                callback: Some(callback),
            }),
        })
    }

    /// Record one constituent result
    pub fn on_result(&self, result: Result<(), SharedError>) {
        let completed = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.callback.is_none() {
                return;
            }
            if let Err(e) = result {
                state.first_error.get_or_insert(e);
            }
            state.remaining -= 1;
            if state.remaining == 0 {
                let outcome = match state.first_error.take() {
                    Some(e) => Err(e),
                    None => Ok(()),
                };
                state.callback.take().map(|callback| (callback, outcome))
            } else {
                None
            }
        };

        // Invoke outside the lock
        if let Some((callback, outcome)) = completed {
            callback(outcome);
        }
    }

    /// A per-endpoint callback feeding this aggregator
    pub fn handler(self: &Arc<Self>) -> PublishCallback {
        let aggregator = Arc::clone(self);
        Box::new(move |result| aggregator.on_result(result))
    }

    /// Results still outstanding
    pub fn remaining(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remaining
    }
}
