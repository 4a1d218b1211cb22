//! Derive an asset's extension and canonical path from its address.

use crate::error::LoadError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static EXTENSION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w+$").unwrap());

/// The closed set of asset kinds the loader knows how to inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    Script,
    Style,
    LessSource,
}

impl AssetKind {
    /// Map a file extension onto a kind. Matching is exact (`JS` is not `js`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" => Some(AssetKind::Script),
            "css" => Some(AssetKind::Style),
            "less" => Some(AssetKind::LessSource),
            _ => None,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssetKind::Script => "script",
            AssetKind::Style => "style",
            AssetKind::LessSource => "less-source",
        })
    }
}

/// What the classifier learned about one candidate address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Extension token, e.g. `js`. Not necessarily a loadable one.
    pub extension: String,
    /// Address with query string and fragment removed. Used as the dedup key.
    pub path: String,
}

impl AssetDescriptor {
    /// The loadable kind, if the extension is in the closed set.
    pub fn kind(&self) -> Option<AssetKind> {
        AssetKind::from_extension(&self.extension)
    }
}

/// Strip everything from the first `?` or `#` onward.
pub fn canonical_path(address: &str) -> &str {
    match address.find(['?', '#']) {
        Some(pos) => &address[..pos],
        None => address,
    }
}

/// Extract the extension token of an address.
///
/// The token is whatever follows the last `.` of the canonical path. If the
/// path has no dot the whole path is the candidate token, so `"jquery"` is
/// rejected only because it is not a recognised kind, while `"lib/jquery"`
/// fails classification outright.
pub fn extract_extension(address: &str) -> Result<&str, LoadError> {
    let path = canonical_path(address);
    let ext = path.rsplit('.').next().unwrap_or_default();
    if EXTENSION_RE.is_match(ext) {
        Ok(ext)
    } else {
        Err(LoadError::Classification(address.to_string()))
    }
}

/// Classify one candidate address.
pub fn classify(address: &str) -> Result<AssetDescriptor, LoadError> {
    let extension = extract_extension(address)?;
    Ok(AssetDescriptor {
        extension: extension.to_string(),
        path: canonical_path(address).to_string(),
    })
}
