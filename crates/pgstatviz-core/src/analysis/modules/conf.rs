//! Configuration change timeline.
//!
//! Each configuration snapshot is diffed against the one before it; the first
//! snapshot in range is diffed against the latest one at or before the range
//! start. Every non-empty diff becomes a marker on the timeline.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use crate::analysis::{AnalysisError, ChartContext, ChartModule};
use crate::chart::{Chart, Marker, Panel};
use crate::model::{ConfRow, StatRow, StatTable};
use crate::source::SnapshotSource;

/// One changed parameter. `None` means the parameter was absent (or null).
#[derive(Debug, Clone, PartialEq)]
pub struct ConfChange {
    pub param: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// Parameters whose values differ, in name order. An empty `prev` is a
/// baseline and yields no changes.
pub fn config_diff(
    prev: &BTreeMap<String, Value>,
    curr: &BTreeMap<String, Value>,
) -> Vec<ConfChange> {
    if prev.is_empty() {
        return Vec::new();
    }
    let params: BTreeSet<&String> = prev.keys().chain(curr.keys()).collect();
    params
        .into_iter()
        .filter_map(|param| {
            let old = prev.get(param).filter(|v| !v.is_null());
            let new = curr.get(param).filter(|v| !v.is_null());
            (old != new).then(|| ConfChange {
                param: param.clone(),
                old: old.cloned(),
                new: new.cloned(),
            })
        })
        .collect()
}

fn display_value(value: &Option<Value>) -> String {
    match value {
        None => "NULL".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// `YYYY-MM-DD HH:MM: p: old -> new, q: old -> new`.
pub fn change_label(ts: DateTime<Utc>, changes: &[ConfChange]) -> String {
    let parts: Vec<String> = changes
        .iter()
        .map(|c| {
            format!(
                "{}: {} -> {}",
                c.param,
                display_value(&c.old),
                display_value(&c.new)
            )
        })
        .collect();
    format!("{}: {}", ts.format("%Y-%m-%d %H:%M"), parts.join(", "))
}

/// Markers for every snapshot that changed something.
pub fn change_markers(
    baseline: Option<&ConfRow>,
    snapshots: &[(DateTime<Utc>, ConfRow)],
) -> Vec<Marker> {
    let empty = BTreeMap::new();
    let mut prev = baseline.map_or(&empty, |b| &b.conf);
    let mut markers = Vec::new();
    for (ts, row) in snapshots {
        let diff = config_diff(prev, &row.conf);
        if !diff.is_empty() {
            markers.push(Marker {
                ts: *ts,
                label: change_label(*ts, &diff),
            });
        }
        prev = &row.conf;
    }
    markers
}

pub struct ConfModule;

impl ChartModule for ConfModule {
    fn id(&self) -> &'static str {
        "conf"
    }

    fn description(&self) -> &'static str {
        "configuration changes"
    }

    fn charts(
        &self,
        source: &mut dyn SnapshotSource,
        ctx: &ChartContext,
    ) -> Result<Vec<Chart>, AnalysisError> {
        let baseline = source
            .baseline(StatTable::Conf, ctx.range.from)?
            .and_then(|s| s.data.into_conf());
        let snapshots: Vec<(DateTime<Utc>, ConfRow)> = source
            .fetch(StatTable::Conf, &ctx.range)?
            .into_iter()
            .filter_map(|s| {
                let ts = s.tstamp;
                s.data.into_conf().map(|row| (ts, row))
            })
            .collect();

        if snapshots.is_empty() && baseline.is_none() {
            warn!("No config snapshots found, skipping");
            return Ok(Vec::new());
        }
        let markers = change_markers(baseline.as_ref(), &snapshots);
        if markers.is_empty() {
            warn!("No configuration changes in date range, skipping");
            return Ok(Vec::new());
        }

        let x = markers.iter().map(|m| m.ts).collect();
        let panel = markers
            .into_iter()
            .fold(Panel::new("Configuration changes", "", x), Panel::with_marker);
        Ok(vec![ctx.chart("conf").with_panel(panel)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{ctx, snap, ts};
    use crate::source::{DateRange, MemorySource};
    use serde_json::json;

    fn conf(pairs: &[(&str, Value)]) -> ConfRow {
        ConfRow {
            conf: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn empty_previous_config_is_a_baseline() {
        let curr = conf(&[("work_mem", json!("4MB"))]);
        assert!(config_diff(&BTreeMap::new(), &curr.conf).is_empty());
    }

    #[test]
    fn diff_covers_changed_added_and_removed_params() {
        let prev = conf(&[
            ("work_mem", json!("4MB")),
            ("max_connections", json!(100)),
            ("jit", json!("on")),
        ]);
        let curr = conf(&[
            ("work_mem", json!("8MB")),
            ("max_connections", json!(100)),
            ("autovacuum", json!("on")),
        ]);
        let diff = config_diff(&prev.conf, &curr.conf);
        let params: Vec<_> = diff.iter().map(|c| c.param.as_str()).collect();
        assert_eq!(params, vec!["autovacuum", "jit", "work_mem"]);
        assert_eq!(
            change_label(ts(0), &diff),
            "2023-11-14 22:13: autovacuum: NULL -> on, jit: on -> NULL, work_mem: 4MB -> 8MB"
        );
    }

    #[test]
    fn non_string_values_print_as_json() {
        let diff = config_diff(
            &conf(&[("max_connections", json!(100))]).conf,
            &conf(&[("max_connections", json!(200))]).conf,
        );
        assert_eq!(
            change_label(ts(60), &diff),
            "2023-11-14 22:14: max_connections: 100 -> 200"
        );
    }

    #[test]
    fn first_snapshot_is_compared_with_the_baseline() {
        let mut source = MemorySource::default().with_rows(
            StatTable::Conf,
            vec![
                snap(0, None, StatRow::Conf(conf(&[("work_mem", json!("4MB"))]))),
                snap(100, None, StatRow::Conf(conf(&[("work_mem", json!("8MB"))]))),
                snap(200, None, StatRow::Conf(conf(&[("work_mem", json!("8MB"))]))),
            ],
        );
        let mut ctx = ctx();
        ctx.range = DateRange::new(Some(ts(50)), None);
        let charts = ConfModule.charts(&mut source, &ctx).unwrap();
        assert_eq!(charts.len(), 1);
        let markers = &charts[0].panels[0].markers;
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].ts, ts(100));
        assert!(markers[0].label.ends_with("work_mem: 4MB -> 8MB"));
    }

    #[test]
    fn no_changes_produces_no_chart() {
        let row = || StatRow::Conf(conf(&[("work_mem", json!("4MB"))]));
        let mut source = MemorySource::default()
            .with_rows(StatTable::Conf, vec![snap(0, None, row()), snap(10, None, row())]);
        assert!(ConfModule.charts(&mut source, &ctx()).unwrap().is_empty());

        let mut empty = MemorySource::default();
        assert!(ConfModule.charts(&mut empty, &ctx()).unwrap().is_empty());
    }
}
