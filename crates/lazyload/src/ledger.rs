//! Process-wide record of canonical paths that have been requested.
//!
//! A path is claimed the moment its load is initiated, not when it completes,
//! and a failed load stays recorded. The first claimant owns the load and
//! settles it through its [`Delivery`]; every later claimant receives a
//! [`Pending`] handle that resolves once the owner has settled.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, LazyLock};
use tokio::sync::watch;

static GLOBAL: LazyLock<Arc<Ledger>> = LazyLock::new(|| Arc::new(Ledger::new()));

/// Result of claiming a path.
#[derive(Debug)]
pub enum Claim {
    /// First request for the path: the caller performs the load.
    Owner(Delivery),
    /// The path was requested before; wait on the first load instead.
    Waiter(Pending),
}

/// Settles the first load of a path. Dropping it unsettled counts as a
/// failed delivery.
#[derive(Debug)]
pub struct Delivery {
    tx: watch::Sender<Option<bool>>,
}

impl Delivery {
    pub fn settle(self, delivered: bool) {
        self.tx.send_replace(Some(delivered));
    }
}

/// Waits for the first load of a path to settle.
#[derive(Debug, Clone)]
pub struct Pending {
    rx: watch::Receiver<Option<bool>>,
}

impl Pending {
    /// Whether the first load delivered the asset.
    pub async fn delivered(mut self) -> bool {
        match self.rx.wait_for(Option::is_some).await {
            Ok(state) => (*state).unwrap_or(false),
            Err(_) => false,
        }
    }

    /// The settled state, without waiting.
    pub fn settled(&self) -> Option<bool> {
        *self.rx.borrow()
    }
}

/// Set of requested canonical paths with their delivery state.
#[derive(Debug, Default)]
pub struct Ledger {
    requested: DashMap<String, watch::Receiver<Option<bool>>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ledger shared by every loader built with default settings.
    pub fn global() -> Arc<Ledger> {
        Arc::clone(&GLOBAL)
    }

    /// Claim `path` for loading.
    pub fn claim(&self, path: &str) -> Claim {
        match self.requested.entry(path.to_string()) {
            Entry::Occupied(entry) => Claim::Waiter(Pending {
                rx: entry.get().clone(),
            }),
            Entry::Vacant(entry) => {
                let (tx, rx) = watch::channel(None);
                entry.insert(rx);
                Claim::Owner(Delivery { tx })
            }
        }
    }

    /// Record `path` as already delivered, e.g. an asset the page shipped
    /// with. Returns `false` if it was already recorded.
    pub fn mark(&self, path: &str) -> bool {
        match self.claim(path) {
            Claim::Owner(delivery) => {
                delivery.settle(true);
                true
            }
            Claim::Waiter(_) => false,
        }
    }

    pub fn is_requested(&self, path: &str) -> bool {
        self.requested.contains_key(path)
    }

    /// `Some(delivered)` once the first load of `path` has settled.
    pub fn delivery(&self, path: &str) -> Option<bool> {
        self.requested.get(path).and_then(|rx| *rx.borrow())
    }

    pub fn len(&self) -> usize {
        self.requested.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requested.is_empty()
    }

    /// Forget every path.
    pub fn reset(&self) {
        self.requested.clear();
    }
}
