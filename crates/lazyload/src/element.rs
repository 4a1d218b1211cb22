//! Map classified assets onto the handles that get injected into the head.

use crate::classify::{AssetDescriptor, AssetKind};
use crate::error::LoadError;
use serde::{Deserialize, Serialize};

/// Default id of the single style container that accumulates compiled LESS.
pub const LESS_CONTAINER_ID: &str = "lazyload-style";

/// A resource handle ready to be appended to the document head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "lowercase")]
pub enum Element {
    /// `<script src=.. type="text/javascript">`
    Script { src: String, script_type: String },
    /// `<link href=.. rel="stylesheet">`
    Link { href: String, rel: String },
    /// `<style id=..>` with accumulated text.
    Style { id: String },
}

impl Element {
    /// Address the element fetches, if any.
    pub fn source(&self) -> Option<&str> {
        match self {
            Element::Script { src, .. } => Some(src),
            Element::Link { href, .. } => Some(href),
            Element::Style { .. } => None,
        }
    }
}

/// Builds elements for a given kind.
#[derive(Debug, Clone)]
pub struct ElementFactory {
    less_container_id: String,
}

impl Default for ElementFactory {
    fn default() -> Self {
        Self::new(LESS_CONTAINER_ID)
    }
}

impl ElementFactory {
    pub fn new(less_container_id: impl Into<String>) -> Self {
        Self {
            less_container_id: less_container_id.into(),
        }
    }

    pub fn less_container_id(&self) -> &str {
        &self.less_container_id
    }

    /// Produce the handle for a classified asset.
    pub fn create(&self, desc: &AssetDescriptor) -> Result<Element, LoadError> {
        let kind = desc
            .kind()
            .ok_or_else(|| LoadError::UnsupportedType(desc.extension.clone()))?;
        Ok(self.create_for(kind, &desc.path))
    }

    /// Produce the handle for an already-known kind.
    pub fn create_for(&self, kind: AssetKind, path: &str) -> Element {
        match kind {
            AssetKind::Script => Element::Script {
                src: path.to_string(),
                script_type: "text/javascript".to_string(),
            },
            AssetKind::Style => Element::Link {
                href: path.to_string(),
                rel: "stylesheet".to_string(),
            },
            AssetKind::LessSource => Element::Style {
                id: self.less_container_id.clone(),
            },
        }
    }
}
