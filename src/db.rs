use crate::args::Arg;
use crate::builder::rebind;
use crate::cache::{Lease, StatementCache};
use crate::dialect::{dialect_by_name, Dialect};
use crate::driver::{Driver, DriverTx, ExecResult, Rows, TxOptions};
use crate::error::Result;
use crate::options::Options;
use crate::query::BoundQuery;
use crate::scan::Target;
use crate::scanner::Scanner;
use std::sync::Arc;
use tracing::warn;

struct Shared {
    driver: Arc<dyn Driver>,
    dialect: Dialect,
    options: Arc<Options>,
    cache: Option<StatementCache>,
}

/// A database handle.
///
/// `Db` accepts templates with `:name` parameters or positional
/// placeholders, rewrites them for the driver's dialect, and scans results
/// into any [`Target`]. It is cheap to clone and safe to share between
/// tasks.
///
/// # Examples
///
/// ```rust,no_run
/// use sqlx_named_scan::mysql::MySqlDriver;
/// use sqlx_named_scan::{impl_record, named, Arg, Db, Options};
///
/// #[derive(Debug, Default)]
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl_record!(User { id: i64, name: String });
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let driver = MySqlDriver::connect("mysql://localhost/test").await?;
/// let db = Db::from_driver(driver, Options::default());
///
/// let arg = named! { min_id: 10 };
/// let users: Vec<User> = db
///     .select("SELECT id, name FROM users WHERE id >= :min_id", &[Arg::map(&arg)])
///     .await?;
/// for user in users {
///     println!("{}: {}", user.id, user.name);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Db {
    inner: Arc<Shared>,
}

impl Db {
    /// Creates a handle over `driver`.
    ///
    /// The dialect comes from `options.dialect`, else from the registration
    /// for the driver's name. A driver with no registration gets `?`
    /// placeholders.
    pub fn new(driver: Arc<dyn Driver>, options: Options) -> Self {
        let dialect = options
            .dialect
            .unwrap_or_else(|| dialect_by_name(driver.name()));
        let dialect = if dialect == Dialect::Unknown {
            warn!(driver = driver.name(), "no placeholder dialect registered for driver, using '?'");
            Dialect::Question
        } else {
            dialect
        };
        let cache = StatementCache::new(options.statement_cache_capacity);

        Db {
            inner: Arc::new(Shared {
                driver,
                dialect,
                options: Arc::new(options),
                cache,
            }),
        }
    }

    pub fn from_driver<D: Driver + 'static>(driver: D, options: Options) -> Self {
        Db::new(Arc::new(driver), options)
    }

    pub fn dialect(&self) -> Dialect {
        self.inner.dialect
    }

    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.inner.driver
    }

    /// Rewrites a template without running it.
    pub fn compile(&self, template: &str, args: &[Arg<'_>]) -> Result<BoundQuery> {
        BoundQuery::compile(self.inner.dialect, template, args, &self.inner.options)
    }

    /// Converts a `?`-placeholder query to this handle's dialect.
    pub fn rebind(&self, query: &str) -> Result<String> {
        rebind(self.inner.dialect, query)
    }

    /// Runs a query and returns a multi-row scanner.
    ///
    /// # Errors
    ///
    /// Returns rewrite errors before anything is sent, and driver errors
    /// unchanged.
    pub async fn query(&self, template: &str, args: &[Arg<'_>]) -> Result<Scanner> {
        let rows = self.rows(template, args).await?;
        Ok(Scanner::new(rows, self.inner.options.clone()))
    }

    /// Runs a query and returns a scanner that requires exactly one row.
    pub async fn query_row(&self, template: &str, args: &[Arg<'_>]) -> Result<Scanner> {
        let rows = self.rows(template, args).await?;
        Ok(Scanner::single(rows, self.inner.options.clone()))
    }

    /// Runs a statement that returns no rows.
    ///
    /// A list of records or maps as the single argument inserts them all in
    /// one statement:
    ///
    /// ```rust,no_run
    /// # use sqlx_named_scan::{named, Arg, Db};
    /// # async fn example(db: Db) -> sqlx_named_scan::Result<()> {
    /// let rows = vec![named! { a: 1, b: 2 }, named! { a: 3, b: 4 }];
    /// db.exec("INSERT INTO t (a, b) VALUES (:a, :b)", &[Arg::maps(&rows)]).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn exec(&self, template: &str, args: &[Arg<'_>]) -> Result<ExecResult> {
        let bound = self.compile(template, args)?;
        match &self.inner.cache {
            Some(cache) => {
                let stmt = self.prepared(cache, &bound.sql).await?;
                stmt.exec(bound.values).await
            }
            None => self.inner.driver.exec(&bound.sql, bound.values).await,
        }
    }

    /// Runs a query and scans every row into a `Vec<T>`.
    pub async fn select<T: Target + Default>(&self, template: &str, args: &[Arg<'_>]) -> Result<Vec<T>> {
        let mut out = Vec::new();
        self.query(template, args).await?.scan(&mut out).await?;
        Ok(out)
    }

    /// Runs a query and scans its single row into a `T`.
    pub async fn get<T: Target + Default>(&self, template: &str, args: &[Arg<'_>]) -> Result<T> {
        let mut out = T::default();
        self.query_row(template, args).await?.scan(&mut out).await?;
        Ok(out)
    }

    /// Starts a transaction.
    pub async fn begin(&self, options: Option<TxOptions>) -> Result<Tx> {
        let conn = self.inner.driver.begin(options.unwrap_or_default()).await?;
        Ok(Tx {
            conn,
            dialect: self.inner.dialect,
            options: self.inner.options.clone(),
            finished: false,
        })
    }

    pub async fn ping(&self) -> Result<()> {
        self.inner.driver.ping().await
    }

    /// Closes cached statements, then the driver.
    pub async fn close(&self) -> Result<()> {
        if let Some(cache) = &self.inner.cache {
            cache.clear().await;
        }
        self.inner.driver.close().await
    }

    async fn rows(&self, template: &str, args: &[Arg<'_>]) -> Result<Box<dyn Rows>> {
        let bound = self.compile(template, args)?;
        match &self.inner.cache {
            Some(cache) => {
                let stmt = self.prepared(cache, &bound.sql).await?;
                stmt.query(bound.values).await
            }
            None => self.inner.driver.query(&bound.sql, bound.values).await,
        }
    }

    async fn prepared(&self, cache: &StatementCache, sql: &str) -> Result<Lease> {
        let driver = &self.inner.driver;
        cache.get_or_prepare(sql, || driver.prepare(sql)).await
    }
}

/// A transaction with the same query surface as [`Db`].
///
/// Dropping a `Tx` without [`commit`](Tx::commit) or
/// [`rollback`](Tx::rollback) leaves the outcome to the driver, which rolls
/// back.
pub struct Tx {
    conn: Box<dyn DriverTx>,
    dialect: Dialect,
    options: Arc<Options>,
    finished: bool,
}

impl Tx {
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn compile(&self, template: &str, args: &[Arg<'_>]) -> Result<BoundQuery> {
        BoundQuery::compile(self.dialect, template, args, &self.options)
    }

    pub async fn query(&self, template: &str, args: &[Arg<'_>]) -> Result<Scanner> {
        let bound = self.compile(template, args)?;
        let rows = self.conn.query(&bound.sql, bound.values).await?;
        Ok(Scanner::new(rows, self.options.clone()))
    }

    pub async fn query_row(&self, template: &str, args: &[Arg<'_>]) -> Result<Scanner> {
        let bound = self.compile(template, args)?;
        let rows = self.conn.query(&bound.sql, bound.values).await?;
        Ok(Scanner::single(rows, self.options.clone()))
    }

    pub async fn exec(&self, template: &str, args: &[Arg<'_>]) -> Result<ExecResult> {
        let bound = self.compile(template, args)?;
        self.conn.exec(&bound.sql, bound.values).await
    }

    pub async fn select<T: Target + Default>(&self, template: &str, args: &[Arg<'_>]) -> Result<Vec<T>> {
        let mut out = Vec::new();
        self.query(template, args).await?.scan(&mut out).await?;
        Ok(out)
    }

    pub async fn get<T: Target + Default>(&self, template: &str, args: &[Arg<'_>]) -> Result<T> {
        let mut out = T::default();
        self.query_row(template, args).await?.scan(&mut out).await?;
        Ok(out)
    }

    pub async fn commit(mut self) -> Result<()> {
        self.finished = true;
        self.conn.commit().await
    }

    pub async fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.conn.rollback().await
    }
}

impl Drop for Tx {
    fn drop(&mut self) {
        if !self.finished {
            warn!("transaction dropped without commit or rollback");
        }
    }
}
