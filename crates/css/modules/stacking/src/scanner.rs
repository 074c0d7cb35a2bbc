use anyhow::Error;
use html::dom::NodeKey;
use log::debug;
use style_engine::StyleProvider;
use tracing::info_span;

use crate::source::TreeSource;
use crate::tree::ContextTree;

/// Counters describing one scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Elements classified.
    pub visited: usize,
    /// Elements that are contexts after the scan.
    pub contexts: usize,
    /// Contexts registered for the first time.
    pub added: usize,
    /// Previously registered contexts that no longer classify as one.
    pub demoted: usize,
}

/// Classify `root` and every element below it in document order.
///
/// Parents are visited before their children, so each new context finds its
/// enclosing context already registered. Competitor lists are consistent
/// when the scan returns.
///
/// # Errors
/// Propagates style provider failures; the tree keeps the work done so far.
pub fn scan<T, S>(
    contexts: &mut ContextTree,
    root: NodeKey,
    tree: &T,
    styles: &S,
) -> Result<ScanStats, Error>
where
    T: TreeSource + ?Sized,
    S: StyleProvider + ?Sized,
{
    let _span = info_span!("stacking_scan", root = root.0).entered();
    let mut stats = ScanStats::default();
    for node in tree.descendants(root) {
        stats.visited += 1;
        let was_registered = contexts.contains(node);
        if contexts.add_context(node, tree, styles)?.is_some() {
            stats.contexts += 1;
            if !was_registered {
                stats.added += 1;
            }
        } else if was_registered && contexts.demote_context(node, tree, styles)? {
            stats.demoted += 1;
        }
    }
    debug!(
        "stacking: scanned {} elements under {root}: {} contexts ({} new, {} demoted)",
        stats.visited, stats.contexts, stats.added, stats.demoted
    );
    Ok(stats)
}
