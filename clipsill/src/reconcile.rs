//! Incremental reconciliation of the published list against a fresh id list.
//!
//! Entries whose id survives keep their identity; only new ids pay for a
//! build. The output follows the fresh order exactly.

use std::collections::{HashMap, HashSet};
use std::future::Future;

/// Items identified by a stable string key
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for &str {
    fn key(&self) -> &str {
        self
    }
}

impl Keyed for String {
    fn key(&self) -> &str {
        self
    }
}

/// Counters from one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub retained: usize,
    pub built: usize,
    pub dropped: usize,
}

/// Reconcile `previous` against `fresh_ids`, building only unseen ids
pub async fn reconcile<T, F, Fut>(previous: &[T], fresh_ids: &[String], build: F) -> Vec<T>
where
    T: Keyed + Clone,
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = T>,
{
    reconcile_with_stats(previous, fresh_ids, build).await.0
}

/// Like [`reconcile`], also reporting how many entries were kept, built and dropped.
pub async fn reconcile_with_stats<T, F, Fut>(
    previous: &[T],
    fresh_ids: &[String],
    mut build: F,
) -> (Vec<T>, ReconcileStats)
where
    T: Keyed + Clone,
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = T>,
{
    reconcile_entries(previous, fresh_ids.iter().map(String::as_str), |id: &str| build(id)).await
}

/// Reconcile against fresh keyed items, handing each unseen item to `build` by value.
///
/// Duplicate keys in `previous` are a consistency breach of the caller; the
/// first occurrence wins and the breach is logged. Duplicate fresh keys are
/// passed through as-is.
pub async fn reconcile_entries<T, U, I, F, Fut>(
    previous: &[T],
    fresh: I,
    mut build: F,
) -> (Vec<T>, ReconcileStats)
where
    T: Keyed + Clone,
    U: Keyed,
    I: IntoIterator<Item = U>,
    F: FnMut(U) -> Fut,
    Fut: Future<Output = T>,
{
    let mut by_key: HashMap<&str, &T> = HashMap::with_capacity(previous.len());
    for item in previous {
        if by_key.contains_key(item.key()) {
            tracing::error!(entry_id = %item.key(), "Duplicate id in published list");
            continue;
        }
        by_key.insert(item.key(), item);
    }

    let fresh = fresh.into_iter();
    let mut stats = ReconcileStats::default();
    let mut result = Vec::with_capacity(fresh.size_hint().0);
    let mut used: HashSet<&str> = HashSet::with_capacity(by_key.len());

    for item in fresh {
        match by_key.get(item.key()).copied() {
            Some(existing) => {
                if used.insert(existing.key()) {
                    stats.retained += 1;
                }
                result.push(existing.clone());
            }
            None => {
                result.push(build(item).await);
                stats.built += 1;
            }
        }
    }

    stats.dropped = by_key.len() - stats.retained;
    (result, stats)
}
