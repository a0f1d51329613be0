#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx_named_scan::driver::{BufferedRows, Conn, Driver, DriverTx, ExecResult, Rows, Stmt, TxOptions};
use sqlx_named_scan::{Result, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// One statement as the driver received it.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub sql: String,
    pub values: Vec<Value>,
}

#[derive(Default)]
struct State {
    calls: Mutex<Vec<Call>>,
    results: Mutex<VecDeque<(Vec<String>, Vec<Vec<Value>>)>>,
    closed_flags: Mutex<Vec<Arc<AtomicBool>>>,
    events: Mutex<Vec<String>>,
    prepared: AtomicUsize,
    stmts_closed: AtomicUsize,
}

impl State {
    fn record(&self, sql: &str, values: Vec<Value>) {
        self.calls.lock().push(Call {
            sql: sql.to_owned(),
            values,
        });
    }

    fn next_rows(&self) -> Box<dyn Rows> {
        let (columns, data) = self.results.lock().pop_front().unwrap_or_default();
        let closed = Arc::new(AtomicBool::new(false));
        self.closed_flags.lock().push(closed.clone());
        Box::new(TrackedRows {
            inner: BufferedRows::new(columns, data),
            closed,
        })
    }
}

/// In-memory driver that records every statement and replays scripted
/// result sets in order.
#[derive(Clone)]
pub struct MockDriver {
    name: String,
    state: Arc<State>,
}

impl MockDriver {
    pub fn new(name: &str) -> Self {
        MockDriver {
            name: name.to_owned(),
            state: Arc::default(),
        }
    }

    /// Queues the result set returned by the next query.
    pub fn push_rows(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        self.state.results.lock().push_back((columns, rows));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().clone()
    }

    pub fn last_call(&self) -> Call {
        self.state.calls.lock().last().cloned().expect("no statement was sent")
    }

    /// True once every result set handed out so far has been closed.
    pub fn all_rows_closed(&self) -> bool {
        self.state
            .closed_flags
            .lock()
            .iter()
            .all(|flag| flag.load(Ordering::SeqCst))
    }

    pub fn rows_handed_out(&self) -> usize {
        self.state.closed_flags.lock().len()
    }

    pub fn events(&self) -> Vec<String> {
        self.state.events.lock().clone()
    }

    pub fn prepared(&self) -> usize {
        self.state.prepared.load(Ordering::SeqCst)
    }

    pub fn stmts_closed(&self) -> usize {
        self.state.stmts_closed.load(Ordering::SeqCst)
    }
}

struct TrackedRows {
    inner: BufferedRows,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Rows for TrackedRows {
    fn columns(&self) -> Result<Vec<String>> {
        self.inner.columns()
    }

    async fn next(&mut self) -> Result<bool> {
        self.inner.next().await
    }

    fn values(&mut self) -> Result<Vec<Value>> {
        self.inner.values()
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.inner.close().await
    }
}

#[async_trait]
impl Conn for MockDriver {
    async fn exec(&self, sql: &str, values: Vec<Value>) -> Result<ExecResult> {
        self.state.record(sql, values);
        Ok(ExecResult {
            rows_affected: 1,
            last_insert_id: 0,
        })
    }

    async fn query(&self, sql: &str, values: Vec<Value>) -> Result<Box<dyn Rows>> {
        self.state.record(sql, values);
        Ok(self.state.next_rows())
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.events.lock().push("close".to_owned());
        Ok(())
    }

    async fn begin(&self, options: TxOptions) -> Result<Box<dyn DriverTx>> {
        self.state
            .events
            .lock()
            .push(format!("begin read_only={}", options.read_only));
        Ok(Box::new(MockTx {
            state: self.state.clone(),
        }))
    }

    async fn prepare(&self, sql: &str) -> Result<Arc<dyn Stmt>> {
        self.state.prepared.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockStmt {
            sql: sql.to_owned(),
            state: self.state.clone(),
        }))
    }
}

struct MockTx {
    state: Arc<State>,
}

#[async_trait]
impl Conn for MockTx {
    async fn exec(&self, sql: &str, values: Vec<Value>) -> Result<ExecResult> {
        self.state.record(sql, values);
        Ok(ExecResult::default())
    }

    async fn query(&self, sql: &str, values: Vec<Value>) -> Result<Box<dyn Rows>> {
        self.state.record(sql, values);
        Ok(self.state.next_rows())
    }
}

#[async_trait]
impl DriverTx for MockTx {
    async fn commit(&self) -> Result<()> {
        self.state.events.lock().push("commit".to_owned());
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.state.events.lock().push("rollback".to_owned());
        Ok(())
    }
}

struct MockStmt {
    sql: String,
    state: Arc<State>,
}

#[async_trait]
impl Stmt for MockStmt {
    fn sql(&self) -> &str {
        &self.sql
    }

    async fn exec(&self, values: Vec<Value>) -> Result<ExecResult> {
        self.state.record(&self.sql, values);
        Ok(ExecResult::default())
    }

    async fn query(&self, values: Vec<Value>) -> Result<Box<dyn Rows>> {
        self.state.record(&self.sql, values);
        Ok(self.state.next_rows())
    }

    async fn close(&self) -> Result<()> {
        self.state.stmts_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
