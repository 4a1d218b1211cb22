//! Per-kind strategies deciding when an injected asset has finished loading.

use crate::classify::AssetDescriptor;
use crate::document::{Document, ElementEvent, EventStream};
use crate::element::{Element, ElementFactory};
use crate::error::{LoadError, TransportCause};
use crate::less::LessCompiler;
use crate::net::Fetcher;
use crate::retry::{self, PollOutcome, RetryPolicy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Set by the native completion path of a script, read by its failure poll.
#[derive(Debug, Clone, Default)]
pub struct LoadMarker(Arc<AtomicBool>);

impl LoadMarker {
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Injects one classified asset and waits for its completion signal.
pub struct Detector {
    document: Arc<dyn Document>,
    fetcher: Option<Arc<dyn Fetcher>>,
    compiler: Option<Arc<dyn LessCompiler>>,
    factory: ElementFactory,
    script_retry: RetryPolicy,
    cancel: CancellationToken,
}

impl Detector {
    pub fn new(document: Arc<dyn Document>, cancel: CancellationToken) -> Self {
        Self {
            document,
            fetcher: None,
            compiler: None,
            factory: ElementFactory::default(),
            script_retry: RetryPolicy::script_default(),
            cancel,
        }
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn LessCompiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn with_factory(mut self, factory: ElementFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_script_retry(mut self, policy: RetryPolicy) -> Self {
        self.script_retry = policy;
        self
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Load one asset. Resolves once it is usable, or with the reason it is not.
    pub async fn load(&self, desc: &AssetDescriptor) -> Result<(), LoadError> {
        match self.factory.create(desc)? {
            el @ Element::Script { .. } => self.load_script(el, &desc.path).await,
            el @ Element::Link { .. } => self.load_style(el, &desc.path).await,
            Element::Style { id } => self.load_less(&id, &desc.path).await,
        }
    }

    async fn load_script(&self, element: Element, path: &str) -> Result<(), LoadError> {
        let (id, mut events) = self.document.append(element);
        let marker = LoadMarker::default();

        let (failed_tx, failed_rx) = oneshot::channel();
        let seen = marker.clone();
        let poll = retry::schedule(
            self.script_retry,
            move || seen.is_set(),
            move |outcome| {
                let _ = failed_tx.send(outcome);
            },
            self.cancel.clone(),
        );

        let result = tokio::select! {
            biased;
            signal = script_signal(&mut events, &marker) => signal,
            failed = failed_rx => match failed {
                Ok(PollOutcome::Exhausted { checks }) => Err(TransportCause::PollExhausted { checks }),
                Ok(PollOutcome::BudgetElapsed { .. }) => Err(TransportCause::BudgetElapsed(
                    self.script_retry.budget.unwrap_or_default(),
                )),
                // The poll ended without calling back: it saw the marker or was cancelled.
                _ if marker.is_set() => Ok(()),
                _ => Err(TransportCause::Cancelled),
            },
        };

        poll.abort();
        drop(events);
        self.document.remove(id);
        debug!(path, ok = result.is_ok(), "script settled");
        result.map_err(|cause| LoadError::transport(path, cause))
    }

    async fn load_style(&self, element: Element, path: &str) -> Result<(), LoadError> {
        // The link's own events are unreliable; only the probe is watched.
        let (_id, link_events) = self.document.append(element);
        drop(link_events);

        let mut probe = self.document.probe_image(path);
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TransportCause::Cancelled),
            event = probe.recv() => match event {
                Some(_) => Ok(()),
                None => Err(TransportCause::Detached),
            },
        };

        debug!(path, ok = result.is_ok(), "stylesheet settled");
        result.map_err(|cause| LoadError::transport(path, cause))
    }

    async fn load_less(&self, container_id: &str, path: &str) -> Result<(), LoadError> {
        let compiler = self
            .compiler
            .as_ref()
            .ok_or_else(|| LoadError::MissingCompiler(path.to_string()))?;
        let fetcher = self.fetcher.as_ref().ok_or_else(|| {
            LoadError::transport(path, TransportCause::Fetch("no fetcher installed".into()))
        })?;

        let source = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return Err(LoadError::transport(path, TransportCause::Cancelled));
            }
            fetched = fetcher.fetch_text(path) => fetched
                .map_err(|e| LoadError::transport(path, TransportCause::Fetch(e.to_string())))?,
        };

        let css = compiler.compile(&source).map_err(|e| LoadError::Compile {
            path: path.to_string(),
            message: e.message,
        })?;

        if !self.document.has_style_container(container_id) {
            let (_id, events) = self.document.append(Element::Style {
                id: container_id.to_string(),
            });
            drop(events);
        }
        self.document.append_style_text(container_id, &css);

        debug!(path, bytes = css.len(), "less compiled and appended");
        Ok(())
    }
}

/// Wait for the first qualifying native event of a script element.
async fn script_signal(events: &mut EventStream, marker: &LoadMarker) -> Result<(), TransportCause> {
    while let Some(event) = events.recv().await {
        match event {
            ElementEvent::Load => {
                marker.set();
                return Ok(());
            }
            ElementEvent::ReadyStateChange(state) if state.is_done() => {
                marker.set();
                return Ok(());
            }
            ElementEvent::ReadyStateChange(_) => {}
            ElementEvent::Error => return Err(TransportCause::ErrorEvent),
        }
    }
    Err(TransportCause::Detached)
}
