//! Snapshot source backed by a live PostgreSQL connection.

use chrono::{DateTime, Utc};
use postgres::error::SqlState;
use postgres::{Client, NoTls, Row};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::queries::{
    EXTENSION_QUERY, HOSTNAME_QUERY, SETTINGS_QUERY, build_baseline_query, build_hostname_batch,
    build_range_query,
};
use super::{DateRange, InfoProvider, InstanceInfo, SnapshotSource, SourceError};
use crate::model::{
    BufRow, ConfRow, ConnRow, DbRow, IoRow, LockRow, ReplRow, ResetEpoch, SlruRow, Snapshot,
    StatRow, StatTable, WaitRow, WalRow,
};

/// Programs tried, in order, to learn the server's hostname.
const HOSTNAME_PROGRAMS: [&str; 2] = ["hostname", "uname -n"];

/// libpq connection parameters.
///
/// Defaults follow libpq: host `/var/run/postgresql`, port 5432, user and
/// database `$USER`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub dbname: String,
    pub password: Option<String>,
}

impl ConnectionParams {
    /// libpq key=value connection string.
    pub fn connection_string(&self) -> String {
        let mut s = format!(
            "host={} port={} user={} dbname={}",
            quote_conn_value(&self.host),
            self.port,
            quote_conn_value(&self.user),
            quote_conn_value(&self.dbname)
        );
        if let Some(password) = &self.password {
            s.push_str(&format!(" password={}", quote_conn_value(password)));
        }
        s
    }
}

/// Quotes a libpq value when it is empty or contains spaces, quotes or backslashes.
fn quote_conn_value(value: &str) -> String {
    if !value.is_empty() && !value.contains([' ', '\'', '\\']) {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// One-line reason for a failure that carries no server error.
fn client_error_reason(msg: &str) -> String {
    if msg.contains("Connection refused") {
        "server refused the connection".to_string()
    } else if msg.contains("No such file or directory") {
        "no server socket in that directory".to_string()
    } else if msg.contains("password authentication failed") {
        "password authentication failed (check PGPASSWORD)".to_string()
    } else if let Some((_, fatal)) = msg.split_once("FATAL:") {
        fatal.trim().to_string()
    } else {
        msg.to_string()
    }
}

fn connect_error(e: &postgres::Error, params: &ConnectionParams) -> SourceError {
    let reason = match e.as_db_error() {
        Some(db) => db.message().to_string(),
        None => client_error_reason(&e.to_string()),
    };
    SourceError::ConnectionError(format!(
        "cannot connect to {}:{} as {}: {reason}",
        params.host, params.port, params.user
    ))
}

fn query_error(e: postgres::Error) -> SourceError {
    let msg = match e.as_db_error() {
        Some(db) if db.code() == &SqlState::UNDEFINED_TABLE => {
            format!("{} (snapshot table missing, upgrade pg_statviz)", db.message())
        }
        Some(db) if db.code() == &SqlState::INSUFFICIENT_PRIVILEGE => {
            format!("{} (SELECT on schema pgstatviz is required)", db.message())
        }
        Some(db) => format!("{}: {}", db.severity(), db.message()),
        None => client_error_reason(&e.to_string()),
    };
    SourceError::QueryError(msg)
}

/// Reads the `pgstatviz.*` tables over one blocking connection.
pub struct PostgresSource {
    params: ConnectionParams,
    client: Option<Client>,
}

impl PostgresSource {
    pub fn new(params: ConnectionParams) -> Self {
        Self {
            params,
            client: None,
        }
    }

    fn client(&mut self) -> Result<&mut Client, SourceError> {
        if self.client.is_none() {
            let client = Client::connect(&self.params.connection_string(), NoTls)
                .map_err(|e| connect_error(&e, &self.params))?;
            debug!(host = %self.params.host, port = self.params.port, "connected");
            self.client = Some(client);
        }
        self.client
            .as_mut()
            .ok_or_else(|| SourceError::ConnectionError("not connected".to_string()))
    }

    fn hostname(&mut self) -> String {
        for program in HOSTNAME_PROGRAMS {
            match self.run_hostname_program(program) {
                Ok(Some(name)) => return name,
                Ok(None) => {}
                Err(e) => warn!(program, error = %e, "hostname lookup failed"),
            }
        }
        let host = self.params.host.clone();
        info!(hostname = %host, "Setting hostname to connection host");
        host
    }

    fn run_hostname_program(&mut self, program: &str) -> Result<Option<String>, SourceError> {
        let client = self.client()?;
        client
            .batch_execute(&build_hostname_batch(program))
            .map_err(query_error)?;
        let row = client.query_opt(HOSTNAME_QUERY, &[]).map_err(query_error)?;
        Ok(row
            .and_then(|r| r.try_get::<_, Option<String>>(0).ok().flatten())
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty()))
    }
}

impl SnapshotSource for PostgresSource {
    fn fetch(&mut self, table: StatTable, range: &DateRange) -> Result<Vec<Snapshot>, SourceError> {
        let query = build_range_query(table);
        let from = range.from.map(epoch_secs);
        let to = range.to.map(epoch_secs);
        debug!(%table, ?from, ?to, "fetching snapshots");
        let rows = self
            .client()?
            .query(&query, &[&from, &to])
            .map_err(query_error)?;
        debug!(%table, rows = rows.len(), "fetched snapshots");
        rows.iter().map(|row| decode_row(table, row)).collect()
    }

    fn baseline(
        &mut self,
        table: StatTable,
        before: Option<DateTime<Utc>>,
    ) -> Result<Option<Snapshot>, SourceError> {
        let query = build_baseline_query(table);
        let before = before.map(epoch_secs);
        let row = self
            .client()?
            .query_opt(&query, &[&before])
            .map_err(query_error)?;
        row.map(|r| decode_row(table, &r)).transpose()
    }
}

impl InfoProvider for PostgresSource {
    fn info(&mut self) -> Result<InstanceInfo, SourceError> {
        let installed = self
            .client()?
            .query_opt(EXTENSION_QUERY, &[])
            .map_err(query_error)?;
        if installed.is_none() {
            return Err(SourceError::ExtensionMissing);
        }

        let hostname = self.hostname();
        let row = self
            .client()?
            .query_one(SETTINGS_QUERY, &[])
            .map_err(query_error)?;
        let info = InstanceInfo {
            hostname,
            port: self.params.port,
            block_size: get(&row, "block_size")?,
            server_version_num: get(&row, "server_version_num")?,
        };
        debug!(?info, "instance info");
        Ok(info)
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn epoch_secs(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_micros() as f64 / 1_000_000.0
}

fn get<'a, T: postgres::types::FromSql<'a>>(row: &'a Row, column: &str) -> Result<T, SourceError> {
    row.try_get(column)
        .map_err(|e| SourceError::Decode(format!("{column}: {e}")))
}

/// Decodes a JSON text column; NULL yields the default value.
fn json<T: DeserializeOwned + Default>(row: &Row, column: &str) -> Result<T, SourceError> {
    match get::<Option<String>>(row, column)? {
        Some(text) => serde_json::from_str(&text)
            .map_err(|e| SourceError::Decode(format!("{column}: {e}"))),
        None => Ok(T::default()),
    }
}

fn decode_row(table: StatTable, row: &Row) -> Result<Snapshot, SourceError> {
    let tstamp_us: i64 = get(row, "tstamp_us")?;
    let tstamp = DateTime::from_timestamp_micros(tstamp_us)
        .ok_or_else(|| SourceError::Decode(format!("tstamp_us out of range: {tstamp_us}")))?;
    let reset_epoch = ResetEpoch::from_micros(get(row, "reset_us")?);

    let data = match table {
        StatTable::Buf => StatRow::Buf(BufRow {
            buffers_checkpoint: get(row, "buffers_checkpoint")?,
            buffers_clean: get(row, "buffers_clean")?,
            buffers_backend: get(row, "buffers_backend")?,
            checkpoints_req: get(row, "checkpoints_req")?,
            checkpoints_timed: get(row, "checkpoints_timed")?,
        }),
        StatTable::Db => StatRow::Db(DbRow {
            xact_commit: get(row, "xact_commit")?,
            xact_rollback: get(row, "xact_rollback")?,
            blks_read: get(row, "blks_read")?,
            blks_hit: get(row, "blks_hit")?,
            tup_returned: get(row, "tup_returned")?,
            tup_fetched: get(row, "tup_fetched")?,
            tup_inserted: get(row, "tup_inserted")?,
            tup_updated: get(row, "tup_updated")?,
            tup_deleted: get(row, "tup_deleted")?,
            checksum_failures: get(row, "checksum_failures")?,
            checksum_last_failure: get(row, "checksum_last_failure")?,
        }),
        StatTable::Wal => StatRow::Wal(WalRow {
            wal_bytes: get(row, "wal_bytes")?,
        }),
        StatTable::Io => StatRow::Io(IoRow {
            io_stats: json(row, "io_stats")?,
        }),
        StatTable::Lock => StatRow::Lock(LockRow {
            locks_total: get(row, "locks_total")?,
            locks: json(row, "locks")?,
        }),
        StatTable::Wait => StatRow::Wait(WaitRow {
            wait_events_total: get(row, "wait_events_total")?,
            wait_events: json(row, "wait_events")?,
        }),
        StatTable::Conn => StatRow::Conn(ConnRow {
            conn_total: get(row, "conn_total")?,
            conn_active: get(row, "conn_active")?,
            conn_idle: get(row, "conn_idle")?,
            conn_idle_trans: get(row, "conn_idle_trans")?,
            conn_idle_trans_abort: get(row, "conn_idle_trans_abort")?,
            conn_fastpath: get(row, "conn_fastpath")?,
            conn_users: json(row, "conn_users")?,
        }),
        StatTable::Repl => StatRow::Repl(ReplRow {
            standby_lag: json(row, "standby_lag")?,
            slot_stats: json(row, "slot_stats")?,
        }),
        StatTable::Slru => StatRow::Slru(SlruRow {
            slru_stats: json(row, "slru_stats")?,
        }),
        StatTable::Conf => StatRow::Conf(ConfRow {
            conf: json(row, "conf")?,
        }),
    };
    Ok(Snapshot::new(tstamp, reset_epoch, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ConnectionParams {
        ConnectionParams {
            host: "localhost".into(),
            port: 5432,
            user: "app".into(),
            dbname: "postgres".into(),
            password: None,
        }
    }

    #[test]
    fn connection_string_without_password() {
        assert_eq!(
            params().connection_string(),
            "host=localhost port=5432 user=app dbname=postgres"
        );
    }

    #[test]
    fn connection_string_quotes_special_values() {
        let p = ConnectionParams {
            password: Some("it's a secret".into()),
            ..params()
        };
        assert_eq!(
            p.connection_string(),
            r"host=localhost port=5432 user=app dbname=postgres password='it\'s a secret'"
        );
    }

    #[test]
    fn empty_value_is_quoted() {
        assert_eq!(quote_conn_value(""), "''");
        assert_eq!(quote_conn_value("/var/run/postgresql"), "/var/run/postgresql");
    }

    #[test]
    fn client_errors_are_summarized() {
        assert_eq!(
            client_error_reason("error connecting to server: Connection refused (os error 111)"),
            "server refused the connection"
        );
        assert_eq!(
            client_error_reason("db error: FATAL: database \"nope\" does not exist"),
            "database \"nope\" does not exist"
        );
        assert_eq!(
            client_error_reason("password authentication failed for user \"app\""),
            "password authentication failed (check PGPASSWORD)"
        );
        assert_eq!(client_error_reason("timed out"), "timed out");
    }

    #[test]
    fn epoch_secs_keeps_micros() {
        let ts = DateTime::from_timestamp_micros(1_700_000_000_500_000).unwrap();
        assert_eq!(epoch_secs(ts), 1_700_000_000.5);
    }
}
