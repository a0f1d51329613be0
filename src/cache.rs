//! Per-handle prepared statement cache.
//!
//! Statements are keyed by a hash of their rewritten SQL. Concurrent
//! requests for the same SQL share one preparation. Callers hold a
//! [`Lease`] while they use a statement; an evicted statement is closed once
//! its last lease is gone.

use crate::driver::Stmt;
use crate::error::Result;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{trace, warn};

struct Entry {
    sql: String,
    stmt: OnceCell<Arc<dyn Stmt>>,
    users: AtomicUsize,
    evicted: AtomicBool,
    closed: AtomicBool,
}

/// Evicted entries with no remaining users, waiting to be closed.
type Retired = Arc<Mutex<Vec<Arc<Entry>>>>;

/// Fixed-capacity LRU of prepared statements.
pub struct StatementCache {
    entries: Mutex<LruCache<u64, Arc<Entry>>>,
    retired: Retired,
}

fn key_of(sql: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    sql.hash(&mut hasher);
    hasher.finish()
}

fn retire(entry: Arc<Entry>, retired: &Retired) {
    entry.evicted.store(true, Ordering::SeqCst);
    if entry.users.load(Ordering::SeqCst) == 0 {
        retired.lock().push(entry);
    }
}

struct Checkout {
    entry: Arc<Entry>,
    retired: Retired,
}

impl Drop for Checkout {
    fn drop(&mut self) {
        let last = self.entry.users.fetch_sub(1, Ordering::SeqCst) == 1;
        if last && self.entry.evicted.load(Ordering::SeqCst) {
            self.retired.lock().push(self.entry.clone());
        }
    }
}

/// A cached statement checked out for one call.
pub struct Lease {
    stmt: Arc<dyn Stmt>,
    _checkout: Checkout,
}

impl Lease {
    pub fn statement(&self) -> &Arc<dyn Stmt> {
        &self.stmt
    }
}

impl Deref for Lease {
    type Target = dyn Stmt;

    fn deref(&self) -> &Self::Target {
        &*self.stmt
    }
}

impl StatementCache {
    /// `None` when `capacity` is 0.
    pub fn new(capacity: usize) -> Option<Self> {
        NonZeroUsize::new(capacity).map(|capacity| StatementCache {
            entries: Mutex::new(LruCache::new(capacity)),
            retired: Retired::default(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns the statement for `sql`, running `prepare` at most once per
    /// cached entry even under concurrent callers.
    pub async fn get_or_prepare<F, Fut>(&self, sql: &str, prepare: F) -> Result<Lease>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn Stmt>>>,
    {
        let key = key_of(sql);
        let entry = {
            let mut entries = self.entries.lock();
            let hit = entries.get(&key).filter(|entry| entry.sql == sql).cloned();
            let entry = match hit {
                Some(entry) => {
                    trace!(sql, "statement cache hit");
                    entry
                }
                None => {
                    trace!(sql, "statement cache miss");
                    let entry = Arc::new(Entry {
                        sql: sql.to_owned(),
                        stmt: OnceCell::new(),
                        users: AtomicUsize::new(0),
                        evicted: AtomicBool::new(false),
                        closed: AtomicBool::new(false),
                    });
                    if let Some((_, old)) = entries.push(key, entry.clone()) {
                        retire(old, &self.retired);
                    }
                    entry
                }
            };
            entry.users.fetch_add(1, Ordering::SeqCst);
            entry
        };
        let checkout = Checkout {
            entry,
            retired: self.retired.clone(),
        };

        self.close_retired().await;

        let stmt = checkout.entry.stmt.get_or_try_init(prepare).await?.clone();
        Ok(Lease {
            stmt,
            _checkout: checkout,
        })
    }

    /// Drops every entry and closes every statement no lease still uses.
    /// Statements still leased are closed by a later call once released.
    pub async fn clear(&self) {
        {
            let mut entries = self.entries.lock();
            while let Some((_, entry)) = entries.pop_lru() {
                retire(entry, &self.retired);
            }
        }
        self.close_retired().await;
    }

    async fn close_retired(&self) {
        let retired = std::mem::take(&mut *self.retired.lock());
        for entry in retired {
            if entry.closed.swap(true, Ordering::SeqCst) {
                continue;
            }
            if let Some(stmt) = entry.stmt.get() {
                if let Err(err) = stmt.close().await {
                    warn!(error = %err, sql = %entry.sql, "failed to close evicted statement");
                }
            }
        }
    }
}
