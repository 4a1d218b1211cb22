//! Dependency sequencing: deepest link first, each link only after the one
//! below it has finished.

use crate::fallback::FallbackResolver;
use crate::outcome::Outcome;
use crate::request::AssetRequest;
use serde::Serialize;
use tracing::debug;

/// How one chain link settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    pub link: String,
    pub outcome: Outcome,
}

/// Result of driving one request through the sequencer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    /// Outcome of the request as a whole.
    pub outcome: Outcome,
    /// Links in the order they were attempted, deepest first.
    pub links: Vec<LinkReport>,
}

/// Load every link of `request` in dependency order.
///
/// A link that was already requested counts as satisfied and the chain moves
/// on. A dropped link stops the chain: its dependents are never injected, and
/// the whole request settles as dropped with that link's errors.
pub async fn run(resolver: &FallbackResolver, request: &AssetRequest) -> ChainReport {
    let Some(target) = request.target() else {
        return ChainReport {
            outcome: Outcome::Empty,
            links: Vec::new(),
        };
    };

    if !request.is_chain() {
        let outcome = resolver.resolve(target).await;
        return ChainReport {
            outcome: outcome.clone(),
            links: vec![LinkReport {
                link: target.to_string(),
                outcome,
            }],
        };
    }

    let mut links = Vec::with_capacity(request.chain.len());
    for link in request.load_order() {
        let outcome = resolver.resolve(link).await;
        links.push(LinkReport {
            link: link.to_string(),
            outcome: outcome.clone(),
        });

        if outcome.is_dropped() {
            debug!(link = %link, request = %request, "chain broken");
            return ChainReport { outcome, links };
        }
    }

    let outcome = links
        .last()
        .map(|l| l.outcome.clone())
        .unwrap_or(Outcome::Empty);
    ChainReport { outcome, links }
}
