//! The driver interface this crate runs on.
//!
//! A driver hands over already-positional SQL plus a `Vec<Value>` and gets
//! back either an [`ExecResult`] or a [`Rows`] iterator. Everything above
//! this module is driver-agnostic; [`crate::mysql`] is the sqlx-backed
//! implementation.

use crate::error::{Error, Result};
use crate::value::Value;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// 0 when the driver or statement has no notion of it.
    pub last_insert_id: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    /// Whatever the server is configured with.
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// SQL spelling, `None` for [`IsolationLevel::Default`].
    pub fn as_sql(&self) -> Option<&'static str> {
        match self {
            IsolationLevel::Default => None,
            IsolationLevel::ReadUncommitted => Some("READ UNCOMMITTED"),
            IsolationLevel::ReadCommitted => Some("READ COMMITTED"),
            IsolationLevel::RepeatableRead => Some("REPEATABLE READ"),
            IsolationLevel::Serializable => Some("SERIALIZABLE"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    pub isolation: IsolationLevel,
    pub read_only: bool,
}

/// A forward-only row iterator.
#[async_trait]
pub trait Rows: Send {
    /// Result column names in order.
    fn columns(&self) -> Result<Vec<String>>;

    /// Advances to the next row. `Ok(false)` once exhausted; an error that
    /// ended iteration early is returned here.
    async fn next(&mut self) -> Result<bool>;

    /// Takes the current row's values in column order.
    fn values(&mut self) -> Result<Vec<Value>>;

    /// Releases the iterator. Calling it again is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Anything statements can run on: a pool or a transaction.
#[async_trait]
pub trait Conn: Send + Sync {
    async fn exec(&self, sql: &str, values: Vec<Value>) -> Result<ExecResult>;

    async fn query(&self, sql: &str, values: Vec<Value>) -> Result<Box<dyn Rows>>;
}

/// A prepared statement.
#[async_trait]
pub trait Stmt: Send + Sync {
    fn sql(&self) -> &str;

    async fn exec(&self, values: Vec<Value>) -> Result<ExecResult>;

    async fn query(&self, values: Vec<Value>) -> Result<Box<dyn Rows>>;

    async fn close(&self) -> Result<()>;
}

/// A driver transaction pinned to one connection.
#[async_trait]
pub trait DriverTx: Conn {
    async fn commit(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;
}

/// A connection pool.
#[async_trait]
pub trait Driver: Conn {
    /// Registered driver name, used to pick the placeholder dialect.
    fn name(&self) -> &str;

    async fn ping(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;

    async fn begin(&self, options: TxOptions) -> Result<Box<dyn DriverTx>>;

    async fn prepare(&self, sql: &str) -> Result<Arc<dyn Stmt>>;
}

/// Rows already materialized in memory.
#[derive(Debug, Default)]
pub struct BufferedRows {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
    closed: bool,
}

impl BufferedRows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        BufferedRows {
            columns,
            rows: rows.into(),
            current: None,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl Rows for BufferedRows {
    fn columns(&self) -> Result<Vec<String>> {
        if self.closed {
            return Err(Error::UsageError("rows are closed".to_owned()));
        }
        Ok(self.columns.clone())
    }

    async fn next(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        self.current = self.rows.pop_front();
        Ok(self.current.is_some())
    }

    fn values(&mut self) -> Result<Vec<Value>> {
        self.current
            .take()
            .ok_or_else(|| Error::UsageError("no current row".to_owned()))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.rows.clear();
        self.current = None;
        Ok(())
    }
}
