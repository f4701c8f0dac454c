//! Chooses the page a freshly opened document should start on.
//!
//! Pure function of its inputs so it can be tested without any store.

use crate::config::DivergencePolicy;
use crate::types::{ReadingPosition, RestoreDecision, RestoreSource};

/// Priority: explicit target, then a remote position for this document, then
/// a local one, then the divergence policy over positions saved for other
/// documents, then page 0. The result is clamped to the last page.
pub fn resolve_restore_target(
    document_id: &str,
    page_count: usize,
    explicit: Option<usize>,
    local: Option<&ReadingPosition>,
    remote: Option<&ReadingPosition>,
    policy: DivergencePolicy,
) -> RestoreDecision {
    let (page_index, source) = pick(document_id, explicit, local, remote, policy);
    clamp(page_index, source, page_count)
}

fn pick(
    document_id: &str,
    explicit: Option<usize>,
    local: Option<&ReadingPosition>,
    remote: Option<&ReadingPosition>,
    policy: DivergencePolicy,
) -> (usize, RestoreSource) {
    if let Some(page) = explicit {
        return (page, RestoreSource::Explicit);
    }

    let matches = |p: &&ReadingPosition| p.document_id == document_id;

    if let Some(position) = remote.filter(matches) {
        return (position.page_index, RestoreSource::Remote);
    }
    if let Some(position) = local.filter(matches) {
        return (position.page_index, RestoreSource::Local);
    }

    let from_local = local.map(|p| (p.page_index, RestoreSource::Local));
    let from_remote = remote.map(|p| (p.page_index, RestoreSource::Remote));

    let chosen = match policy {
        DivergencePolicy::PreferLocal => from_local,
        DivergencePolicy::PreferRemote => from_remote.or(from_local),
        DivergencePolicy::PreferNewest => match (local, remote) {
            (Some(l), Some(r)) if r.timestamp > l.timestamp => from_remote,
            (Some(_), _) => from_local,
            (None, _) => from_remote,
        },
        DivergencePolicy::StartOver => None,
    };

    chosen.unwrap_or((0, RestoreSource::Default))
}

fn clamp(page_index: usize, source: RestoreSource, page_count: usize) -> RestoreDecision {
    let last = page_count.saturating_sub(1);
    RestoreDecision {
        page_index: page_index.min(last),
        source,
        clamped: page_index > last,
    }
}
