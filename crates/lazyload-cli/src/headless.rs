//! A [`Document`] without a page: elements are recorded in an in-memory head
//! and their loads are carried out over HTTP.
//!
//! Scripts fire `load` when their GET returns 2xx and `error` otherwise. Style
//! links are recorded but fire nothing, matching what the loader listens to.
//! Image probes complete with `error` whenever the target is not an image,
//! which is the stylesheet-finished signal.

use crate::fetcher::HttpFetcher;
use lazyload::document::{event_channel, EventSink};
use lazyload::{Document, Element, ElementEvent, ElementId, EventStream};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Snapshot of the head, serializable for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeadSnapshot {
    pub elements: Vec<Element>,
    pub styles: BTreeMap<String, String>,
}

#[derive(Default)]
struct HeadState {
    next_id: ElementId,
    head: Vec<(ElementId, Element)>,
    styles: BTreeMap<String, String>,
    // Element sinks without a driving task stay open until removal.
    idle: Vec<(ElementId, EventSink)>,
}

pub struct HeadlessDocument {
    fetcher: Arc<HttpFetcher>,
    state: Mutex<HeadState>,
}

impl HeadlessDocument {
    pub fn new(fetcher: Arc<HttpFetcher>) -> Arc<Self> {
        Arc::new(Self {
            fetcher,
            state: Mutex::new(HeadState::default()),
        })
    }

    fn state(&self) -> MutexGuard<'_, HeadState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Elements currently in the head, in append order.
    pub fn head(&self) -> Vec<Element> {
        self.state().head.iter().map(|(_, el)| el.clone()).collect()
    }

    pub fn style_text(&self, id: &str) -> Option<String> {
        self.state().styles.get(id).cloned()
    }

    pub fn snapshot(&self) -> HeadSnapshot {
        let state = self.state();
        HeadSnapshot {
            elements: state.head.iter().map(|(_, el)| el.clone()).collect(),
            styles: state.styles.clone(),
        }
    }

    fn spawn_script(&self, src: String, sink: EventSink) {
        let fetcher = self.fetcher.clone();
        tokio::spawn(async move {
            let event = match fetcher.probe(&src).await {
                Ok(probe) if probe.is_success() => ElementEvent::Load,
                Ok(probe) => {
                    debug!(src = %src, status = probe.status, "script request failed");
                    ElementEvent::Error
                }
                Err(e) => {
                    debug!(src = %src, error = %e, "script request failed");
                    ElementEvent::Error
                }
            };
            let _ = sink.send(event);
        });
    }
}

impl Document for HeadlessDocument {
    fn append(&self, element: Element) -> (ElementId, EventStream) {
        let (sink, stream) = event_channel();
        let mut state = self.state();
        state.next_id += 1;
        let id = state.next_id;

        match &element {
            Element::Script { src, .. } => self.spawn_script(src.clone(), sink),
            Element::Link { .. } | Element::Style { .. } => state.idle.push((id, sink)),
        }
        if let Element::Style { id: style_id } = &element {
            state.styles.entry(style_id.clone()).or_default();
        }
        state.head.push((id, element));
        (id, stream)
    }

    fn remove(&self, id: ElementId) {
        let mut state = self.state();
        state.head.retain(|(el_id, _)| *el_id != id);
        state.idle.retain(|(el_id, _)| *el_id != id);
    }

    fn probe_image(&self, src: &str) -> EventStream {
        let (sink, stream) = event_channel();
        let fetcher = self.fetcher.clone();
        let src = src.to_string();
        tokio::spawn(async move {
            let event = match fetcher.probe(&src).await {
                Ok(probe) if probe.is_success() && probe.is_image() => ElementEvent::Load,
                _ => ElementEvent::Error,
            };
            let _ = sink.send(event);
        });
        stream
    }

    fn has_style_container(&self, id: &str) -> bool {
        self.state().styles.contains_key(id)
    }

    fn append_style_text(&self, id: &str, css: &str) {
        if let Some(text) = self.state().styles.get_mut(id) {
            text.push_str(css);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc::error::TryRecvError;

    fn document() -> Arc<HeadlessDocument> {
        let fetcher = HttpFetcher::new(None, Duration::from_secs(1)).unwrap();
        HeadlessDocument::new(Arc::new(fetcher))
    }

    #[tokio::test]
    async fn test_style_container_collects_text() {
        let doc = document();
        assert!(!doc.has_style_container("lazyload-style"));

        doc.append(Element::Style {
            id: "lazyload-style".into(),
        });
        doc.append_style_text("lazyload-style", "a{}");
        doc.append_style_text("lazyload-style", "b{}");
        doc.append_style_text("missing", "c{}");

        assert!(doc.has_style_container("lazyload-style"));
        assert_eq!(doc.style_text("lazyload-style").as_deref(), Some("a{}b{}"));
        assert_eq!(doc.style_text("missing"), None);
    }

    #[tokio::test]
    async fn test_unresolvable_script_fires_error() {
        let doc = document();
        let (id, mut events) = doc.append(Element::Script {
            src: "relative/app.js".into(),
            script_type: "text/javascript".into(),
        });

        assert_eq!(events.recv().await, Some(ElementEvent::Error));
        assert_eq!(doc.head().len(), 1);
        doc.remove(id);
        assert!(doc.head().is_empty());
    }

    #[tokio::test]
    async fn test_link_stream_stays_open_until_removed() {
        let doc = document();
        let (id, mut events) = doc.append(Element::Link {
            href: "theme.css".into(),
            rel: "stylesheet".into(),
        });
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));

        doc.remove(id);
        assert_eq!(events.recv().await, None);
    }
}
