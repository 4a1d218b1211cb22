//! Public entry point: load a request set and report once it has settled.

use crate::config::LoaderConfig;
use crate::detect::Detector;
use crate::document::Document;
use crate::element::ElementFactory;
use crate::fallback::{AssetObserver, FallbackResolver};
use crate::ledger::Ledger;
use crate::less::LessCompiler;
use crate::net::Fetcher;
use crate::outcome::Outcome;
use crate::request::{AssetSpec, IntoRequests};
use crate::sequence::{self, LinkReport};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How one entry of a batch settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    /// The request in its normalized string form.
    pub request: String,
    pub outcome: Outcome,
    /// Per-link outcomes, deepest first.
    pub links: Vec<LinkReport>,
}

/// Everything a batch callback learns about its batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// One report per entry, in request order.
    pub entries: Vec<EntryReport>,
    pub elapsed_ms: u64,
}

impl BatchReport {
    /// True when no entry was dropped.
    pub fn all_satisfied(&self) -> bool {
        self.entries.iter().all(|e| e.outcome.is_satisfied())
    }

    pub fn dropped(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries.iter().filter(|e| e.outcome.is_dropped())
    }
}

/// Builds a [`Loader`] around a document.
pub struct LoaderBuilder {
    document: Arc<dyn Document>,
    fetcher: Option<Arc<dyn Fetcher>>,
    compiler: Option<Arc<dyn LessCompiler>>,
    ledger: Option<Arc<Ledger>>,
    observer: Option<AssetObserver>,
    config: LoaderConfig,
}

impl LoaderBuilder {
    /// Network collaborator used for LESS sources.
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Without a compiler every `.less` request is dropped.
    pub fn less_compiler(mut self, compiler: Arc<dyn LessCompiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// Use a private ledger instead of the process-wide one.
    pub fn ledger(mut self, ledger: Arc<Ledger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Called once for every leaf asset as it settles.
    pub fn on_asset<F>(mut self, observer: F) -> Self
    where
        F: Fn(&AssetSpec, &Outcome) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Loader {
        let cancel = CancellationToken::new();
        let mut detector = Detector::new(self.document, cancel.clone())
            .with_factory(ElementFactory::new(self.config.less_container_id.clone()))
            .with_script_retry(self.config.script_retry.policy());
        if let Some(fetcher) = self.fetcher {
            detector = detector.with_fetcher(fetcher);
        }
        if let Some(compiler) = self.compiler {
            detector = detector.with_compiler(compiler);
        }

        let ledger = self.ledger.unwrap_or_else(Ledger::global);
        let mut resolver = FallbackResolver::new(detector, ledger);
        if let Some(observer) = self.observer {
            resolver = resolver.with_observer(observer);
        }

        Loader {
            inner: Arc::new(Inner { resolver, cancel }),
        }
    }
}

struct Inner {
    resolver: FallbackResolver,
    cancel: CancellationToken,
}

/// Asynchronous asset loader. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Loader {
    inner: Arc<Inner>,
}

impl Loader {
    pub fn builder(document: Arc<dyn Document>) -> LoaderBuilder {
        LoaderBuilder {
            document,
            fetcher: None,
            compiler: None,
            ledger: None,
            observer: None,
            config: LoaderConfig::default(),
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        self.inner.resolver.ledger()
    }

    /// Abort every in-flight load of this loader. Aborted assets settle as
    /// dropped, so pending batches still complete.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    /// Start loading `requests` and call `on_complete` exactly once when every
    /// entry has settled. Returns immediately.
    pub fn load<R, F>(&self, requests: R, on_complete: F) -> JoinHandle<()>
    where
        R: IntoRequests,
        F: FnOnce(BatchReport) + Send + 'static,
    {
        let requests = requests.into_requests();
        let loader = self.clone();
        tokio::spawn(async move {
            let report = loader.load_all(requests).await;
            on_complete(report);
        })
    }

    /// Load `requests` and resolve once every entry has settled.
    pub async fn load_all<R: IntoRequests>(&self, requests: R) -> BatchReport {
        let started = Instant::now();
        let requests = requests.into_requests();
        let total = requests.len();
        let mut entries: Vec<Option<EntryReport>> = vec![None; total];

        let resolver = &self.inner.resolver;
        let mut pending: FuturesUnordered<_> = requests
            .iter()
            .enumerate()
            .map(|(idx, request)| async move {
                (idx, request, sequence::run(resolver, request).await)
            })
            .collect();

        while let Some((idx, request, chain)) = pending.next().await {
            debug!(
                request = %request,
                remaining = pending.len(),
                satisfied = chain.outcome.is_satisfied(),
                "entry settled"
            );
            entries[idx] = Some(EntryReport {
                request: request.to_string(),
                outcome: chain.outcome,
                links: chain.links,
            });
        }
        drop(pending);

        let report = BatchReport {
            entries: entries.into_iter().flatten().collect(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            entries = total,
            dropped = report.dropped().count(),
            elapsed_ms = report.elapsed_ms,
            "batch complete"
        );
        report
    }
}
