//! Deduplicating merge of incoming entry ids into a feed.

use crate::types::EntryId;
use std::collections::HashSet;

/// Where incoming entries go relative to the existing ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeMode {
    /// Newer entries: first-page fetches and stream pushes.
    Prepend,
    /// Older entries: expand fetches.
    Append,
}

/// Merge `incoming` into `existing`.
///
/// Ids already in `existing` keep their position and are dropped from
/// `incoming`; repeated ids inside `incoming` keep their first occurrence.
/// The result depends only on the inputs.
pub fn merge(existing: &[EntryId], incoming: &[EntryId], mode: MergeMode) -> Vec<EntryId> {
    let mut merged = existing.to_vec();
    merge_into(&mut merged, incoming, mode);
    merged
}

/// In-place [`merge`]. Returns how many ids were added.
pub fn merge_into(existing: &mut Vec<EntryId>, incoming: &[EntryId], mode: MergeMode) -> usize {
    let mut seen: HashSet<&EntryId> = existing.iter().collect();
    let fresh: Vec<EntryId> = incoming
        .iter()
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect();

    let added = fresh.len();
    if added == 0 {
        return 0;
    }

    match mode {
        MergeMode::Prepend => {
            existing.splice(0..0, fresh);
        }
        MergeMode::Append => existing.extend(fresh),
    }

    added
}
