//! Scripted in-memory collaborators for tests.
//!
//! `FakeDocument` plays back per-address event scripts on the tokio clock and
//! records everything the loader does to it, so tests can assert on ordering
//! with paused time.

use crate::document::{event_channel, Document, ElementEvent, ElementId, EventSink, EventStream};
use crate::element::Element;
use crate::net::{FetchError, Fetcher};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// How a fake element reacts once appended.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Fire these events, each after its delay relative to the previous one.
    Events(Vec<(Duration, ElementEvent)>),
    /// Never fire anything; the stream stays open.
    Silent,
    /// Close the stream without firing.
    Detach,
}

impl Behavior {
    pub fn immediate(event: ElementEvent) -> Self {
        Behavior::Events(vec![(Duration::ZERO, event)])
    }

    pub fn after(delay: Duration, event: ElementEvent) -> Self {
        Behavior::Events(vec![(delay, event)])
    }

    pub fn sequence(events: Vec<ElementEvent>) -> Self {
        Behavior::Events(events.into_iter().map(|e| (Duration::ZERO, e)).collect())
    }
}

/// Something the fake document observed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trace {
    Appended(String),
    Fired(String, ElementEvent),
    Removed(String),
    Probed(String),
    StyleText(String),
}

#[derive(Default)]
struct DocState {
    next_id: ElementId,
    head: Vec<(ElementId, Element)>,
    appended: Vec<Element>,
    removed: usize,
    probed: Vec<String>,
    styles: HashMap<String, String>,
    scripts: HashMap<String, Behavior>,
    probes: HashMap<String, Behavior>,
    held: Vec<EventSink>,
    trace: Vec<Trace>,
}

/// In-memory `Document` with scripted element behaviour.
pub struct FakeDocument {
    state: Arc<Mutex<DocState>>,
    default_script: Behavior,
    default_probe: Behavior,
}

impl FakeDocument {
    /// Scripts load and probes error immediately unless scripted otherwise.
    pub fn new() -> Arc<Self> {
        Self::with_defaults(
            Behavior::immediate(ElementEvent::Load),
            Behavior::immediate(ElementEvent::Error),
        )
    }

    pub fn with_defaults(default_script: Behavior, default_probe: Behavior) -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(Mutex::new(DocState::default())),
            default_script,
            default_probe,
        })
    }

    fn state(&self) -> MutexGuard<'_, DocState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Script how the `<script>` for `src` behaves.
    pub fn script(&self, src: &str, behavior: Behavior) {
        self.state().scripts.insert(src.to_string(), behavior);
    }

    /// Script how the probe image for `src` behaves.
    pub fn probe(&self, src: &str, behavior: Behavior) {
        self.state().probes.insert(src.to_string(), behavior);
    }

    /// Elements currently under the head.
    pub fn head(&self) -> Vec<Element> {
        self.state().head.iter().map(|(_, el)| el.clone()).collect()
    }

    /// Sources of every element ever appended, in order.
    pub fn appended_sources(&self) -> Vec<String> {
        self.state()
            .appended
            .iter()
            .filter_map(|el| el.source().map(String::from))
            .collect()
    }

    pub fn appended(&self) -> Vec<Element> {
        self.state().appended.clone()
    }

    pub fn removed_count(&self) -> usize {
        self.state().removed
    }

    pub fn probed(&self) -> Vec<String> {
        self.state().probed.clone()
    }

    pub fn style_text(&self, id: &str) -> Option<String> {
        self.state().styles.get(id).cloned()
    }

    pub fn trace(&self) -> Vec<Trace> {
        self.state().trace.clone()
    }

    /// Position of the first trace entry equal to `entry`.
    pub fn position(&self, entry: &Trace) -> Option<usize> {
        self.state().trace.iter().position(|t| t == entry)
    }

    fn play(&self, src: String, behavior: Behavior) -> EventStream {
        let (sink, stream) = event_channel();
        match behavior {
            Behavior::Detach => drop(sink),
            Behavior::Silent => self.state().held.push(sink),
            Behavior::Events(events) => {
                self.state().held.push(sink.clone());
                let state = Arc::clone(&self.state);
                tokio::spawn(async move {
                    for (delay, event) in events {
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        } else {
                            tokio::task::yield_now().await;
                        }
                        state
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .trace
                            .push(Trace::Fired(src.clone(), event));
                        if sink.send(event).is_err() {
                            break;
                        }
                    }
                });
            }
        }
        stream
    }
}

impl Document for FakeDocument {
    fn append(&self, element: Element) -> (ElementId, EventStream) {
        let (id, behavior, src) = {
            let mut state = self.state();
            state.next_id += 1;
            let id = state.next_id;
            state.head.push((id, element.clone()));
            state.appended.push(element.clone());
            let label = match &element {
                Element::Style { id } => format!("#{id}"),
                other => other.source().unwrap_or_default().to_string(),
            };
            state.trace.push(Trace::Appended(label.clone()));
            let behavior = match &element {
                Element::Script { src, .. } => state
                    .scripts
                    .get(src)
                    .cloned()
                    .unwrap_or_else(|| self.default_script.clone()),
                _ => Behavior::Silent,
            };
            (id, behavior, label)
        };
        (id, self.play(src, behavior))
    }

    fn remove(&self, id: ElementId) {
        let mut state = self.state();
        if let Some(pos) = state.head.iter().position(|(eid, _)| *eid == id) {
            let (_, el) = state.head.remove(pos);
            state.removed += 1;
            let label = el.source().unwrap_or_default().to_string();
            state.trace.push(Trace::Removed(label));
        }
    }

    fn probe_image(&self, src: &str) -> EventStream {
        let behavior = {
            let mut state = self.state();
            state.probed.push(src.to_string());
            state.trace.push(Trace::Probed(src.to_string()));
            state
                .probes
                .get(src)
                .cloned()
                .unwrap_or_else(|| self.default_probe.clone())
        };
        self.play(format!("probe:{src}"), behavior)
    }

    fn has_style_container(&self, id: &str) -> bool {
        self.state()
            .head
            .iter()
            .any(|(_, el)| matches!(el, Element::Style { id: sid } if sid == id))
    }

    fn append_style_text(&self, id: &str, css: &str) {
        let mut state = self.state();
        state.styles.entry(id.to_string()).or_default().push_str(css);
        state.trace.push(Trace::StyleText(css.to_string()));
    }
}

/// In-memory `Fetcher` serving fixed bodies after a latency.
#[derive(Default)]
pub struct FakeFetcher {
    bodies: Mutex<HashMap<String, (Result<String, u16>, Duration)>>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, path: &str, body: &str, latency: Duration) {
        self.bodies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string(), (Ok(body.to_string()), latency));
    }

    pub fn fail(&self, path: &str, status: u16, latency: Duration) {
        self.bodies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string(), (Err(status), latency));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch_text(&self, path: &str) -> Result<String, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.to_string());
        let entry = self
            .bodies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned();

        let (body, latency) = entry.unwrap_or((Err(404), Duration::ZERO));
        tokio::time::sleep(latency).await;
        body.map_err(|status| FetchError::Status {
            url: path.to_string(),
            status,
        })
    }
}
