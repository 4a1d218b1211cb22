//! Try the candidates of one logical asset in order until one loads.

use crate::classify::classify;
use crate::detect::Detector;
use crate::error::{self, LoadError, TransportCause};
use crate::ledger::{Claim, Ledger};
use crate::outcome::Outcome;
use crate::request::AssetSpec;
use std::sync::Arc;
use tracing::debug;

/// Called once for every leaf asset that settles.
pub type AssetObserver = Arc<dyn Fn(&AssetSpec, &Outcome) + Send + Sync>;

/// Resolves one [`AssetSpec`] against the ledger and the detector.
pub struct FallbackResolver {
    detector: Detector,
    ledger: Arc<Ledger>,
    observer: Option<AssetObserver>,
}

impl FallbackResolver {
    pub fn new(detector: Detector, ledger: Arc<Ledger>) -> Self {
        Self {
            detector,
            ledger,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: AssetObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Load the first candidate that works.
    ///
    /// A candidate that cannot be classified, or whose load fails with a
    /// recoverable error, hands over to the next one. A candidate whose path
    /// is already in the ledger is never injected again: resolution waits for
    /// the first load of that path and is satisfied if it delivered, or moves
    /// on to the next candidate if it failed.
    pub async fn resolve(&self, spec: &AssetSpec) -> Outcome {
        let outcome = self.try_candidates(spec).await;
        if let Some(observer) = &self.observer {
            observer(spec, &outcome);
        }
        outcome
    }

    async fn try_candidates(&self, spec: &AssetSpec) -> Outcome {
        let mut errors = Vec::new();
        let total = spec.candidate_count();

        for (idx, candidate) in spec.candidates().enumerate() {
            let desc = match classify(candidate) {
                Ok(desc) if desc.kind().is_some() => desc,
                Ok(desc) => {
                    let err = LoadError::UnsupportedType(desc.extension);
                    error::report(&err);
                    errors.push(err);
                    continue;
                }
                Err(err) => {
                    error::report(&err);
                    errors.push(err);
                    continue;
                }
            };

            let result = match self.ledger.claim(&desc.path) {
                Claim::Owner(delivery) => {
                    let result = self.detector.load(&desc).await;
                    delivery.settle(result.is_ok());
                    result
                }
                Claim::Waiter(pending) => {
                    debug!(path = %desc.path, "already requested, waiting for first load");
                    let delivered = tokio::select! {
                        biased;
                        _ = self.detector.cancel_token().cancelled() => Err(TransportCause::Cancelled),
                        delivered = pending.delivered() => {
                            if delivered {
                                Ok(())
                            } else {
                                Err(TransportCause::EarlierAttemptFailed)
                            }
                        }
                    };
                    match delivered {
                        Ok(()) => return Outcome::AlreadyRequested { path: desc.path },
                        Err(cause) => Err(LoadError::transport(&desc.path, cause)),
                    }
                }
            };

            match result {
                Ok(()) => {
                    return Outcome::Loaded {
                        address: candidate.to_string(),
                    }
                }
                Err(err) => {
                    error::report(&err);
                    let recoverable = err.is_recoverable();
                    errors.push(err);
                    if !recoverable {
                        break;
                    }
                    if idx + 1 < total {
                        debug!(failed = candidate, next = idx + 1, "falling back");
                    }
                }
            }
        }

        Outcome::Dropped { errors }
    }
}
