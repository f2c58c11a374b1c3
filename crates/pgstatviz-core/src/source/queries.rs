//! SQL query builders for the `pgstatviz.*` snapshot tables.
//!
//! Every query returns `tstamp_us` and `reset_us` (epoch microseconds) first,
//! followed by the table's columns. JSON columns come back as text.
//! Cumulative counters keep their NULLs; only snapshot-time gauges
//! (`*_total`, connection states) are coalesced to 0.

use crate::model::StatTable;

const RANGE_FILTER: &str = "snapshot_tstamp BETWEEN \
     COALESCE(to_timestamp($1::float8), '-infinity'::timestamptz) \
     AND COALESCE(to_timestamp($2::float8), now())";

fn columns(table: StatTable) -> &'static str {
    match table {
        StatTable::Buf => {
            "buffers_checkpoint::bigint AS buffers_checkpoint,
             buffers_clean::bigint AS buffers_clean,
             buffers_backend::bigint AS buffers_backend,
             checkpoints_req::bigint AS checkpoints_req,
             checkpoints_timed::bigint AS checkpoints_timed"
        }
        StatTable::Db => {
            "xact_commit::bigint AS xact_commit,
             xact_rollback::bigint AS xact_rollback,
             blks_read::bigint AS blks_read,
             blks_hit::bigint AS blks_hit,
             tup_returned::bigint AS tup_returned,
             tup_fetched::bigint AS tup_fetched,
             tup_inserted::bigint AS tup_inserted,
             tup_updated::bigint AS tup_updated,
             tup_deleted::bigint AS tup_deleted,
             checksum_failures::bigint AS checksum_failures,
             (EXTRACT(EPOCH FROM checksum_last_failure) * 1000000)::bigint AS checksum_last_failure"
        }
        StatTable::Wal => "wal_bytes::bigint AS wal_bytes",
        StatTable::Io => "io_stats::text AS io_stats",
        StatTable::Lock => "COALESCE(locks_total, 0)::bigint AS locks_total, locks::text AS locks",
        StatTable::Wait => {
            "COALESCE(wait_events_total, 0)::bigint AS wait_events_total,
             wait_events::text AS wait_events"
        }
        StatTable::Conn => {
            "COALESCE(conn_total, 0)::bigint AS conn_total,
             COALESCE(conn_active, 0)::bigint AS conn_active,
             COALESCE(conn_idle, 0)::bigint AS conn_idle,
             COALESCE(conn_idle_trans, 0)::bigint AS conn_idle_trans,
             COALESCE(conn_idle_trans_abort, 0)::bigint AS conn_idle_trans_abort,
             COALESCE(conn_fastpath, 0)::bigint AS conn_fastpath,
             conn_users::text AS conn_users"
        }
        StatTable::Repl => "standby_lag::text AS standby_lag, slot_stats::text AS slot_stats",
        StatTable::Slru => "slru_stats::text AS slru_stats",
        StatTable::Conf => "conf::text AS conf",
    }
}

fn envelope(table: StatTable) -> String {
    let reset = if table.has_stats_reset() {
        "(EXTRACT(EPOCH FROM stats_reset) * 1000000)::bigint"
    } else {
        "NULL::bigint"
    };
    format!(
        "(EXTRACT(EPOCH FROM snapshot_tstamp) * 1000000)::bigint AS tstamp_us,
         {reset} AS reset_us"
    )
}

/// Rows of `table` between `$1` and `$2` (epoch seconds, NULL = open).
pub(super) fn build_range_query(table: StatTable) -> String {
    let limit = table
        .row_cap()
        .map(|n| format!(" LIMIT {n}"))
        .unwrap_or_default();
    format!(
        r#"
            SELECT {envelope},
                   {columns}
            FROM {table}
            WHERE {RANGE_FILTER}
            ORDER BY snapshot_tstamp{limit}
        "#,
        envelope = envelope(table),
        columns = columns(table),
    )
}

/// Latest row of `table` at or before `$1` (epoch seconds, NULL = none).
pub(super) fn build_baseline_query(table: StatTable) -> String {
    format!(
        r#"
            SELECT {envelope},
                   {columns}
            FROM {table}
            WHERE snapshot_tstamp <= COALESCE(to_timestamp($1::float8), '-infinity'::timestamptz)
            ORDER BY snapshot_tstamp DESC
            LIMIT 1
        "#,
        envelope = envelope(table),
        columns = columns(table),
    )
}

pub(super) const EXTENSION_QUERY: &str =
    "SELECT 1 FROM pg_extension WHERE extname = 'pg_statviz'";

/// Runs `program` on the server and keeps its first output line.
pub(super) fn build_hostname_batch(program: &str) -> String {
    format!(
        "CREATE TEMP TABLE IF NOT EXISTS pgstatviz_hostname(hostname text);
         TRUNCATE pgstatviz_hostname;
         COPY pgstatviz_hostname FROM PROGRAM '{program}'"
    )
}

pub(super) const HOSTNAME_QUERY: &str = "SELECT hostname FROM pgstatviz_hostname LIMIT 1";

pub(super) const SETTINGS_QUERY: &str = "SELECT current_setting('block_size')::bigint AS block_size,
            current_setting('server_version_num')::int AS server_version_num";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_query_selects_envelope_and_filter() {
        let q = build_range_query(StatTable::Buf);
        assert!(q.contains("FROM pgstatviz.buf"));
        assert!(q.contains("(EXTRACT(EPOCH FROM stats_reset) * 1000000)::bigint AS reset_us"));
        assert!(q.contains("to_timestamp($1::float8)"));
        assert!(q.contains("COALESCE(to_timestamp($2::float8), now())"));
        assert!(q.trim_end().ends_with("ORDER BY snapshot_tstamp"));
    }

    #[test]
    fn cumulative_counters_keep_nulls() {
        let buf = build_range_query(StatTable::Buf);
        assert!(buf.contains("buffers_backend::bigint AS buffers_backend"));
        assert!(!buf.contains("COALESCE(buffers_backend"));
        let wal = build_range_query(StatTable::Wal);
        assert!(wal.contains("wal_bytes::bigint AS wal_bytes"));
        assert!(!wal.contains("COALESCE(wal_bytes"));
    }

    #[test]
    fn tables_without_reset_select_null() {
        let q = build_range_query(StatTable::Lock);
        assert!(q.contains("NULL::bigint AS reset_us"));
        assert!(q.contains("locks::text AS locks"));
    }

    #[test]
    fn conn_query_is_capped() {
        let q = build_range_query(StatTable::Conn);
        assert!(q.trim_end().ends_with("ORDER BY snapshot_tstamp LIMIT 1000"));
    }

    #[test]
    fn baseline_query_takes_latest_before() {
        let q = build_baseline_query(StatTable::Conf);
        assert!(q.contains("FROM pgstatviz.conf"));
        assert!(q.contains("ORDER BY snapshot_tstamp DESC"));
        assert!(q.contains("LIMIT 1"));
    }

    #[test]
    fn hostname_batch_runs_program() {
        let q = build_hostname_batch("uname -n");
        assert!(q.contains("COPY pgstatviz_hostname FROM PROGRAM 'uname -n'"));
    }
}
