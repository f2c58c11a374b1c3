//! Alignment of per-snapshot categorical breakdowns.
//!
//! Breakdown tables (I/O kinds, lock modes, wait events, users, standbys,
//! slots, SLRUs) report a different set of categories in every snapshot. The
//! [`CategoricalAligner`] discovers one key list in first-seen order and
//! projects each snapshot onto it.
//!
//! Value lookups return `Option<Option<V>>`: the outer `None` means the key is
//! absent from the snapshot, the inner `None` means it is present but null.

use std::collections::HashSet;
use std::hash::Hash;

use crate::rates::RateEngine;
use crate::series::CounterSeries;

// ---------------------------------------------------------------------------
// KeySet
// ---------------------------------------------------------------------------

/// Insertion-ordered set.
#[derive(Debug, Clone)]
pub struct KeySet<K> {
    order: Vec<K>,
    seen: HashSet<K>,
}

impl<K> Default for KeySet<K> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            seen: HashSet::new(),
        }
    }
}

impl<K: Clone + Eq + Hash> KeySet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `key` unless already present. Returns whether it was new.
    pub fn insert(&mut self, key: K) -> bool {
        if self.seen.contains(&key) {
            return false;
        }
        self.seen.insert(key.clone());
        self.order.push(key);
        true
    }

    pub fn contains(&self, key: &K) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, K> {
        self.order.iter()
    }

    pub fn as_slice(&self) -> &[K] {
        &self.order
    }
}

impl<K: Clone + Eq + Hash> FromIterator<K> for KeySet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::new();
        for k in iter {
            set.insert(k);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// CategoricalAligner
// ---------------------------------------------------------------------------

/// One category projected onto every snapshot of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct Aligned<K> {
    pub key: K,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct CategoricalAligner<K> {
    keys: KeySet<K>,
}

impl<K: Clone + Eq + Hash> CategoricalAligner<K> {
    /// Scans the series in order and collects every key `keys_of` reports.
    pub fn discover<T>(series: &CounterSeries<T>, keys_of: impl Fn(&T) -> Vec<K>) -> Self {
        let keys = series.rows().flat_map(keys_of).collect();
        Self { keys }
    }

    /// Uses a fixed key list instead of discovery (e.g. a user filter).
    pub fn with_keys(keys: impl IntoIterator<Item = K>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn keys(&self) -> &[K] {
        self.keys.as_slice()
    }

    /// Per key and snapshot: the value, or 0 when absent or null.
    pub fn align<T>(
        &self,
        series: &CounterSeries<T>,
        value: impl Fn(&T, &K) -> Option<Option<f64>>,
    ) -> Vec<Aligned<K>> {
        self.keys
            .iter()
            .map(|key| Aligned {
                key: key.clone(),
                values: series
                    .rows()
                    .map(|row| Some(value(row, key).flatten().unwrap_or(0.0)))
                    .collect(),
            })
            .collect()
    }

    /// Per key rates.
    ///
    /// A step is undefined when it crosses an epoch boundary, when either
    /// endpoint lacks the key, when the left value is zero or null, or when
    /// the right value is null. The engine's period and scale apply.
    pub fn rates<T>(
        &self,
        series: &CounterSeries<T>,
        engine: &RateEngine,
        value: impl Fn(&T, &K) -> Option<Option<i64>>,
    ) -> Vec<Aligned<K>> {
        let scale = engine.scale();
        self.keys
            .iter()
            .map(|key| Aligned {
                key: key.clone(),
                values: engine.steps(series, |prev, curr, interval| {
                    let left = value(prev, key)??;
                    let right = value(curr, key)??;
                    if left == 0 {
                        return None;
                    }
                    Some((right - left) as f64 / interval * scale)
                }),
            })
            .collect()
    }
}

/// True when every value is zero or undefined.
pub fn is_all_zero(values: &[Option<f64>]) -> bool {
    values.iter().all(|v| v.is_none_or(|x| x == 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LockEntry, LockRow, ResetEpoch, Snapshot};
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn lock_row(entries: &[(&str, i64)]) -> LockRow {
        LockRow {
            locks_total: entries.iter().map(|e| e.1).sum(),
            locks: entries
                .iter()
                .map(|&(mode, count)| LockEntry {
                    lock_mode: Some(mode.to_string()),
                    lock_count: count,
                })
                .collect(),
        }
    }

    fn series(rows: Vec<(i64, Option<i64>, LockRow)>) -> CounterSeries<LockRow> {
        CounterSeries::new(
            rows.into_iter()
                .map(|(secs, epoch, row)| Snapshot::new(ts(secs), ResetEpoch(epoch), row))
                .collect(),
        )
        .unwrap()
    }

    fn modes(row: &LockRow) -> Vec<String> {
        row.locks.iter().filter_map(|l| l.lock_mode.clone()).collect()
    }

    fn count(row: &LockRow, mode: &String) -> Option<Option<i64>> {
        row.locks
            .iter()
            .rev()
            .find(|l| l.lock_mode.as_ref() == Some(mode))
            .map(|l| Some(l.lock_count))
    }

    #[test]
    fn keyset_keeps_first_seen_order() {
        let set: KeySet<&str> = ["b", "a", "b", "c", "a"].into_iter().collect();
        assert_eq!(set.as_slice(), &["b", "a", "c"]);
        assert!(set.contains(&"c"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn discovery_is_deterministic() {
        let s = series(vec![
            (0, None, lock_row(&[("RowShareLock", 1)])),
            (10, None, lock_row(&[("AccessShareLock", 4), ("RowShareLock", 2)])),
            (20, None, lock_row(&[("ExclusiveLock", 1)])),
        ]);
        let aligner = CategoricalAligner::discover(&s, modes);
        assert_eq!(
            aligner.keys(),
            &["RowShareLock", "AccessShareLock", "ExclusiveLock"]
        );
        let again = CategoricalAligner::discover(&s, modes);
        assert_eq!(aligner.keys(), again.keys());
    }

    #[test]
    fn absent_key_displays_zero_and_breaks_rate() {
        let s = series(vec![
            (0, None, lock_row(&[("A", 5), ("B", 1)])),
            (10, None, lock_row(&[("B", 3)])),
        ]);
        let aligner = CategoricalAligner::discover(&s, modes);
        let display = aligner.align(&s, |row, k| count(row, k).map(|c| c.map(|v| v as f64)));
        assert_eq!(display[0].values, vec![Some(5.0), Some(0.0)]);
        assert_eq!(display[1].values, vec![Some(1.0), Some(3.0)]);

        let rates = aligner.rates(&s, &RateEngine::per_second(), count);
        assert_eq!(rates[0].values, vec![None, None]);
        assert_eq!(rates[1].values, vec![None, Some(0.2)]);
    }

    #[test]
    fn zero_left_value_is_undefined() {
        let s = series(vec![
            (0, None, lock_row(&[("A", 0)])),
            (10, None, lock_row(&[("A", 10)])),
        ]);
        let aligner = CategoricalAligner::discover(&s, modes);
        let rates = aligner.rates(&s, &RateEngine::per_second(), count);
        assert_eq!(rates[0].values, vec![None, None]);
    }

    #[test]
    fn epoch_boundary_is_undefined_per_category() {
        let s = series(vec![
            (0, Some(1), lock_row(&[("A", 1)])),
            (10, Some(2), lock_row(&[("A", 11)])),
        ]);
        let aligner = CategoricalAligner::discover(&s, modes);
        let rates = aligner.rates(&s, &RateEngine::per_second(), count);
        assert_eq!(rates[0].values, vec![None, None]);
    }

    #[test]
    fn fixed_keys_are_kept_even_when_missing() {
        let s = series(vec![(0, None, lock_row(&[("A", 1)]))]);
        let aligner = CategoricalAligner::with_keys(["Z".to_string()]);
        let display = aligner.align(&s, |row, k| count(row, k).map(|c| c.map(|v| v as f64)));
        assert_eq!(display[0].values, vec![Some(0.0)]);
    }

    #[test]
    fn all_zero_predicate() {
        assert!(is_all_zero(&[None, Some(0.0), Some(0.0)]));
        assert!(is_all_zero(&[]));
        assert!(!is_all_zero(&[None, Some(0.1)]));
    }
}
