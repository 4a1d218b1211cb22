//! Typed asset requests and the string grammar that produces them.
//!
//! A request string is read like `app.js < lib.js|lib-mirror.js < base.css`:
//! `<` separates chain links written outermost first, `|` separates fallback
//! candidates of one link, and whitespace anywhere is ignored. The string is
//! parsed once here; everything downstream works on [`AssetRequest`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separates chain links, dependents before their dependencies.
pub const CHAIN_SEPARATOR: char = '<';
/// Separates fallback candidates of a single link.
pub const FALLBACK_SEPARATOR: char = '|';

/// One logical asset: a primary address and ordered alternates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SpecRepr")]
pub struct AssetSpec {
    pub address: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternates: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SpecRepr {
    Raw(String),
    Typed {
        address: String,
        #[serde(default)]
        alternates: Vec<String>,
    },
}

impl From<SpecRepr> for AssetSpec {
    fn from(repr: SpecRepr) -> Self {
        match repr {
            SpecRepr::Raw(raw) => AssetSpec::parse(&raw).unwrap_or_else(|| AssetSpec::new(raw)),
            SpecRepr::Typed {
                address,
                alternates,
            } => AssetSpec {
                address: strip_whitespace(&address),
                alternates: alternates
                    .iter()
                    .map(|alt| strip_whitespace(alt))
                    .filter(|alt| !alt.is_empty())
                    .collect(),
            },
        }
    }
}

fn strip_whitespace(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

impl AssetSpec {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: strip_whitespace(&address.into()),
            alternates: Vec::new(),
        }
    }

    /// Add a fallback address, tried after all earlier ones. Blank addresses
    /// are ignored.
    pub fn or(mut self, alternate: impl Into<String>) -> Self {
        let alternate = strip_whitespace(&alternate.into());
        if !alternate.is_empty() {
            self.alternates.push(alternate);
        }
        self
    }

    /// Parse one chain link. Returns `None` if it holds no address at all.
    pub fn parse(link: &str) -> Option<Self> {
        let stripped = strip_whitespace(link);
        let mut candidates = stripped
            .split(FALLBACK_SEPARATOR)
            .filter(|c| !c.is_empty())
            .map(String::from);
        let address = candidates.next()?;
        Some(Self {
            address,
            alternates: candidates.collect(),
        })
    }

    /// All candidates in the order they are tried.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.address.as_str()).chain(self.alternates.iter().map(String::as_str))
    }

    pub fn candidate_count(&self) -> usize {
        1 + self.alternates.len()
    }
}

impl fmt::Display for AssetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)?;
        for alt in &self.alternates {
            write!(f, "{FALLBACK_SEPARATOR}{alt}")?;
        }
        Ok(())
    }
}

/// A chain of assets, outermost dependent first, deepest dependency last.
///
/// A request with a single link is a plain request and bypasses sequencing.
/// A request with no links is empty and settles immediately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RequestRepr")]
pub struct AssetRequest {
    pub chain: Vec<AssetSpec>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RequestRepr {
    Raw(String),
    Chain {
        chain: Vec<AssetSpec>,
    },
    Typed {
        target: AssetSpec,
        #[serde(default)]
        depends_on: Vec<AssetSpec>,
    },
}

impl From<RequestRepr> for AssetRequest {
    fn from(repr: RequestRepr) -> Self {
        match repr {
            RequestRepr::Raw(raw) => AssetRequest::parse(&raw),
            RequestRepr::Chain { chain } => AssetRequest { chain },
            RequestRepr::Typed { target, depends_on } => {
                let mut chain = vec![target];
                chain.extend(depends_on);
                AssetRequest { chain }
            }
        }
    }
}

impl AssetRequest {
    /// A plain request for one asset.
    pub fn new(target: impl Into<AssetSpec>) -> Self {
        Self {
            chain: vec![target.into()],
        }
    }

    /// Append a dependency deeper than every link so far.
    pub fn depends_on(mut self, dependency: impl Into<AssetSpec>) -> Self {
        self.chain.push(dependency.into());
        self
    }

    /// Parse the request grammar. Never fails: links without any address are
    /// dropped, and a string with none at all yields an empty request.
    pub fn parse(raw: &str) -> Self {
        let chain = strip_whitespace(raw)
            .split(CHAIN_SEPARATOR)
            .filter_map(AssetSpec::parse)
            .collect();
        Self { chain }
    }

    /// The outermost asset, the one the caller actually asked for.
    pub fn target(&self) -> Option<&AssetSpec> {
        self.chain.first()
    }

    /// Dependencies, nearest first.
    pub fn dependencies(&self) -> &[AssetSpec] {
        self.chain.get(1..).unwrap_or_default()
    }

    pub fn is_chain(&self) -> bool {
        self.chain.len() > 1
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Links in the order they must finish: deepest dependency first.
    pub fn load_order(&self) -> impl Iterator<Item = &AssetSpec> {
        self.chain.iter().rev()
    }
}

impl fmt::Display for AssetRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, link) in self.chain.iter().enumerate() {
            if i > 0 {
                write!(f, "{CHAIN_SEPARATOR}")?;
            }
            write!(f, "{link}")?;
        }
        Ok(())
    }
}

impl From<&str> for AssetSpec {
    fn from(raw: &str) -> Self {
        AssetSpec::parse(raw).unwrap_or_else(|| AssetSpec::new(raw))
    }
}

impl From<String> for AssetSpec {
    fn from(raw: String) -> Self {
        AssetSpec::from(raw.as_str())
    }
}

impl From<&str> for AssetRequest {
    fn from(raw: &str) -> Self {
        AssetRequest::parse(raw)
    }
}

impl From<String> for AssetRequest {
    fn from(raw: String) -> Self {
        AssetRequest::parse(&raw)
    }
}

impl From<&String> for AssetRequest {
    fn from(raw: &String) -> Self {
        AssetRequest::parse(raw)
    }
}

impl From<AssetSpec> for AssetRequest {
    fn from(spec: AssetSpec) -> Self {
        AssetRequest::new(spec)
    }
}

/// Anything the loader accepts as a request set: one request or many.
pub trait IntoRequests {
    fn into_requests(self) -> Vec<AssetRequest>;
}

impl IntoRequests for &str {
    fn into_requests(self) -> Vec<AssetRequest> {
        vec![AssetRequest::parse(self)]
    }
}

impl IntoRequests for String {
    fn into_requests(self) -> Vec<AssetRequest> {
        vec![AssetRequest::parse(&self)]
    }
}

impl IntoRequests for AssetRequest {
    fn into_requests(self) -> Vec<AssetRequest> {
        vec![self]
    }
}

impl<T: Into<AssetRequest>> IntoRequests for Vec<T> {
    fn into_requests(self) -> Vec<AssetRequest> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<AssetRequest>, const N: usize> IntoRequests for [T; N] {
    fn into_requests(self) -> Vec<AssetRequest> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Clone + Into<AssetRequest>> IntoRequests for &[T] {
    fn into_requests(self) -> Vec<AssetRequest> {
        self.iter().cloned().map(Into::into).collect()
    }
}
