//! The capability surface the loader needs from the page it injects into.
//!
//! Implementations own the real head container. The loader only appends,
//! removes, and listens. Events are delivered through an unbounded channel per
//! element so that an implementation may fire them from any task.

use crate::element::Element;
use tokio::sync::mpsc;

/// Opaque identifier of an appended element.
pub type ElementId = u64;

/// Legacy `readyState` values some environments report instead of `load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Uninitialized,
    Loading,
    Interactive,
    Loaded,
    Complete,
}

impl ReadyState {
    /// Whether this state means the element finished loading.
    pub fn is_done(self) -> bool {
        matches!(self, ReadyState::Loaded | ReadyState::Complete)
    }
}

/// Native events fired by an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementEvent {
    Load,
    ReadyStateChange(ReadyState),
    Error,
}

/// Receiving side of an element's events. Dropping it detaches the handlers.
pub type EventStream = mpsc::UnboundedReceiver<ElementEvent>;

/// Sending side, for implementors.
pub type EventSink = mpsc::UnboundedSender<ElementEvent>;

/// Create a connected sink/stream pair.
pub fn event_channel() -> (EventSink, EventStream) {
    mpsc::unbounded_channel()
}

/// What the loader needs from the surrounding document.
pub trait Document: Send + Sync {
    /// Append `element` under the head container and start listening to it.
    fn append(&self, element: Element) -> (ElementId, EventStream);

    /// Remove a previously appended element. Unknown ids are ignored.
    fn remove(&self, id: ElementId);

    /// Create an invisible image pointed at `src`. It is never appended to the
    /// head; only its events matter.
    fn probe_image(&self, src: &str) -> EventStream;

    /// Whether a style container with this id exists.
    fn has_style_container(&self, id: &str) -> bool;

    /// Append text to the style container with this id.
    fn append_style_text(&self, id: &str, css: &str);
}
