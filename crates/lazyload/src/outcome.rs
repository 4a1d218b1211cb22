//! How a leaf asset or a whole request entry settled.

use crate::error::LoadError;
use serde::{Serialize, Serializer};

/// Final state of one asset or entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Injected and its completion signal observed.
    Loaded { address: String },
    /// The canonical path was already requested earlier; nothing was injected.
    AlreadyRequested { path: String },
    /// Every candidate failed. `errors` holds one entry per failed candidate.
    Dropped {
        #[serde(serialize_with = "errors_as_strings")]
        errors: Vec<LoadError>,
    },
    /// The request named no asset at all.
    Empty,
}

impl Outcome {
    /// Whether the asset can be relied on being present.
    pub fn is_satisfied(&self) -> bool {
        !matches!(self, Outcome::Dropped { .. })
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, Outcome::Dropped { .. })
    }
}

fn errors_as_strings<S: Serializer>(errors: &[LoadError], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(errors.iter().map(|e| e.to_string()))
}
