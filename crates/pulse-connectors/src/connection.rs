//! Live connections for query-based checks.
//!
//! The registry hands out [`ConnectionHandle`]s wrapping a boxed
//! [`SqlConnection`]. SQLite is the embedded native implementation; other
//! platforms resolve to connection strings only and have no native builder
//! here, which callers observe as `checkout()` returning `None`.

use std::fmt;
use std::time::{Duration, Instant};

use rusqlite::types::ValueRef;
use tracing::debug;

use datapulse_core::{QualityError, Result};

/// Bounds applied to every live query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    /// Wall-clock bound for a single statement.
    pub timeout: Duration,
    /// Maximum number of rows materialized from a result set.
    pub row_limit: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(8),
            row_limit: 1000,
        }
    }
}

/// A single cell value from a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Numeric view of the value, when it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Integer(v) => Some(*v as f64),
            SqlValue::Real(v) => Some(*v),
            SqlValue::Text(t) => t.parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            SqlValue::Real(v) => Some(*v as i64),
            SqlValue::Text(t) => t.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Integer(v) => write!(f, "{v}"),
            SqlValue::Real(v) => write!(f, "{v}"),
            SqlValue::Text(t) => write!(f, "{t}"),
            SqlValue::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Materialized rows from one query, bounded by [`QueryLimits::row_limit`].
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
    /// Whether the row limit cut the result short.
    pub truncated: bool,
}

impl QueryOutput {
    pub fn row_count(&self) -> i64 {
        self.rows.len() as i64
    }

    /// The single value of a one-row, one-column result.
    pub fn scalar(&self) -> Option<&SqlValue> {
        match (self.rows.len(), self.columns.len()) {
            (1, 1) => self.rows[0].first(),
            _ => None,
        }
    }

    /// Value of the named column in the first row.
    pub fn first_row_value(&self, column: &str) -> Option<&SqlValue> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.first().and_then(|row| row.get(index))
    }
}

/// SQL dialect of a connection, for the few operators that differ per
/// platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Sqlite,
    Postgres,
    MySql,
    Snowflake,
    Generic,
}

impl SqlDialect {
    pub fn for_platform(platform: &str) -> Self {
        match platform {
            "sqlite" => SqlDialect::Sqlite,
            "postgres" | "postgresql" => SqlDialect::Postgres,
            "mysql" => SqlDialect::MySql,
            "snowflake" => SqlDialect::Snowflake,
            _ => SqlDialect::Generic,
        }
    }

    /// Regex-match predicate over `column` with one bound parameter.
    pub fn regex_predicate(&self, column: &str, negated: bool) -> String {
        let predicate = match self {
            SqlDialect::Postgres => format!("{column} ~ ?"),
            SqlDialect::Snowflake => format!("REGEXP_LIKE({column}, ?)"),
            // SQLite (with the registered regexp function), MySQL, and the
            // generic fallback all use the REGEXP operator.
            _ => format!("{column} REGEXP ?"),
        };
        if negated {
            format!("NOT ({predicate})")
        } else {
            predicate
        }
    }
}

/// A live, platform-native database connection.
pub trait SqlConnection: Send {
    fn dialect(&self) -> SqlDialect;

    /// Execute one read statement with bound parameters.
    ///
    /// Implementations enforce `limits.timeout` and stop materializing rows
    /// at `limits.row_limit`.
    fn query(&mut self, sql: &str, params: &[SqlValue], limits: &QueryLimits)
        -> Result<QueryOutput>;
}

/// A checked-out connection, owned by the caller until released back to the
/// registry.
pub struct ConnectionHandle {
    platform: String,
    connection_string: Option<String>,
    connection: Box<dyn SqlConnection>,
}

impl ConnectionHandle {
    /// Wrap a connection. The registry is the usual constructor; embedders
    /// with their own drivers can wrap them directly.
    pub fn new(
        platform: impl Into<String>,
        connection_string: Option<String>,
        connection: Box<dyn SqlConnection>,
    ) -> Self {
        Self {
            platform: platform.into(),
            connection_string,
            connection,
        }
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// The connection string the handle was built from, when one exists.
    /// May embed credentials; callers must not log it.
    pub fn connection_string(&self) -> Option<&str> {
        self.connection_string.as_deref()
    }

    pub fn dialect(&self) -> SqlDialect {
        self.connection.dialect()
    }

    pub fn query(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        limits: &QueryLimits,
    ) -> Result<QueryOutput> {
        self.connection.query(sql, params, limits)
    }

    pub(crate) fn into_connection(self) -> Box<dyn SqlConnection> {
        self.connection
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The connection string may embed credentials; only the platform is
        // safe to show.
        f.debug_struct("ConnectionHandle")
            .field("platform", &self.platform)
            .finish()
    }
}

/// Embedded SQLite connection.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    /// Open a database at `path` (`:memory:` for in-memory).
    pub fn open(path: &str) -> Result<Self> {
        let conn = if path == ":memory:" {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(path)
        }
        .map_err(|err| QualityError::Execution(format!("cannot open sqlite database: {err}")))?;
        register_regexp(&conn)?;
        Ok(Self { conn })
    }

    /// Open from a `sqlite://<path>` connection string.
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        let path = connection_string
            .strip_prefix("sqlite://")
            .ok_or_else(|| {
                QualityError::Config("sqlite connection strings must start with sqlite://".into())
            })?;
        Self::open(path)
    }
}

impl SqlConnection for SqliteConnection {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Sqlite
    }

    fn query(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        limits: &QueryLimits,
    ) -> Result<QueryOutput> {
        let started = Instant::now();
        let timeout = limits.timeout;
        self.conn
            .progress_handler(100, Some(move || started.elapsed() > timeout));
        let result = run_sqlite_query(&self.conn, sql, params, limits);
        self.conn.progress_handler(100, None::<fn() -> bool>);
        result
    }
}

fn run_sqlite_query(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[SqlValue],
    limits: &QueryLimits,
) -> Result<QueryOutput> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|err| map_sqlite_error(err, limits))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let bound: Vec<rusqlite::types::Value> = params.iter().map(to_rusqlite_value).collect();
    let mut rows = stmt
        .query(rusqlite::params_from_iter(bound))
        .map_err(|err| map_sqlite_error(err, limits))?;

    let mut out: Vec<Vec<SqlValue>> = Vec::new();
    let mut truncated = false;
    loop {
        let row = match rows.next() {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(err) => return Err(map_sqlite_error(err, limits)),
        };
        if out.len() >= limits.row_limit {
            truncated = true;
            break;
        }
        let mut record = Vec::with_capacity(columns.len());
        for index in 0..columns.len() {
            let value = row
                .get_ref(index)
                .map_err(|err| map_sqlite_error(err, limits))?;
            record.push(match value {
                ValueRef::Null => SqlValue::Null,
                ValueRef::Integer(v) => SqlValue::Integer(v),
                ValueRef::Real(v) => SqlValue::Real(v),
                ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
                ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
            });
        }
        out.push(record);
    }

    if truncated {
        debug!(row_limit = limits.row_limit, "query result truncated at row limit");
    }
    Ok(QueryOutput {
        columns,
        rows: out,
        truncated,
    })
}

fn to_rusqlite_value(value: &SqlValue) -> rusqlite::types::Value {
    match value {
        SqlValue::Null => rusqlite::types::Value::Null,
        SqlValue::Integer(v) => rusqlite::types::Value::Integer(*v),
        SqlValue::Real(v) => rusqlite::types::Value::Real(*v),
        SqlValue::Text(t) => rusqlite::types::Value::Text(t.clone()),
        SqlValue::Blob(b) => rusqlite::types::Value::Blob(b.clone()),
    }
}

fn map_sqlite_error(err: rusqlite::Error, limits: &QueryLimits) -> QualityError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.code == rusqlite::ErrorCode::OperationInterrupted {
            return QualityError::Timeout {
                timeout_ms: limits.timeout.as_millis() as u64,
            };
        }
    }
    QualityError::Execution(err.to_string())
}

/// Register a `regexp(pattern, text)` scalar so the SQLite dialect supports
/// the `REGEXP` operator the regex checks emit.
fn register_regexp(conn: &rusqlite::Connection) -> Result<()> {
    use rusqlite::functions::FunctionFlags;

    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let pattern: String = ctx.get(0)?;
            let text: Option<String> = ctx.get(1)?;
            let re = regex::Regex::new(&pattern)
                .map_err(|err| rusqlite::Error::UserFunctionError(Box::new(err)))?;
            Ok(text.map(|t| re.is_match(&t)).unwrap_or(false))
        },
    )
    .map_err(|err| QualityError::Execution(format!("cannot register regexp function: {err}")))
}
