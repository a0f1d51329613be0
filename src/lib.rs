//! # sqlx-named-scan
//!
//! Named parameters, `IN`-list and batch-insert expansion, and row-to-struct
//! scanning on top of SQLx.
//!
//! ## Features
//!
//! - **Named Placeholders**: Use `:param_name` in templates; they are rewritten to `?`, `$N`, `@pN` or `:name` for the driver
//! - **Record and Map Arguments**: Parameters are resolved from a record's fields or a map's keys, including dotted names for nested values
//! - **IN Expansion**: A list value turns `IN (?)` / `IN (:ids)` into one placeholder per element
//! - **Batch Insert**: A list of records or maps repeats the `VALUES (...)` group once per element
//! - **Row Scanning**: Results are scanned into scalars, records, maps, or `Vec`s of those, with nested and embedded records
//! - **Statement Cache**: Optional per-handle LRU of prepared statements
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! sqlx = { version = "0.8", features = ["mysql", "runtime-tokio"] }
//! sqlx-named-scan = "0.1"
//! ```
//!
//! ## Examples
//!
//! ### Records In, Records Out
//!
//! ```rust,no_run
//! use sqlx_named_scan::mysql::MySqlDriver;
//! use sqlx_named_scan::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//!     email: String,
//! }
//!
//! impl_record!(User {
//!     id: i64,
//!     name: String,
//!     email: String => "email_address",
//! });
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Db::from_driver(MySqlDriver::connect("mysql://localhost/test").await?, Options::default());
//!
//! let user = User { id: 42, name: "John Doe".into(), email: "john@example.com".into() };
//! db.exec(
//!     "INSERT INTO users (id, name, email_address) VALUES (:id, :name, :email_address)",
//!     &[Arg::record(&user)],
//! )
//! .await?;
//!
//! let found: User = db
//!     .get("SELECT id, name, email_address FROM users WHERE id = :id", &[Arg::map(&named! { id: 42 })])
//!     .await?;
//! println!("{}: {}", found.name, found.email);
//! # Ok(())
//! # }
//! ```
//!
//! ### IN Lists and Batch Inserts
//!
//! ```rust,no_run
//! # use sqlx_named_scan::prelude::*;
//! # async fn example(db: Db) -> sqlx_named_scan::Result<()> {
//! let names: Vec<String> = db
//!     .select("SELECT name FROM users WHERE id IN (?)", &params![vec![1, 2, 3]])
//!     .await?;
//!
//! let rows = vec![named! { a: 1, b: 2 }, named! { a: 3, b: 4 }];
//! db.exec("INSERT INTO t (a, b) VALUES (:a, :b)", &[Arg::maps(&rows)]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Using with Transactions
//!
//! ```rust,no_run
//! # use sqlx_named_scan::prelude::*;
//! # async fn example(db: Db) -> sqlx_named_scan::Result<()> {
//! let tx = db.begin(None).await?;
//! let transfer = named! { amount: 100, from_id: 1, to_id: 2 };
//!
//! tx.exec(
//!     "UPDATE accounts SET balance = balance - :amount WHERE id = :from_id",
//!     &[Arg::map(&transfer)],
//! )
//! .await?;
//! tx.exec(
//!     "UPDATE accounts SET balance = balance + :amount WHERE id = :to_id",
//!     &[Arg::map(&transfer)],
//! )
//! .await?;
//!
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Optional Results
//!
//! ```rust,no_run
//! # use sqlx_named_scan::prelude::*;
//! # async fn example(db: Db) -> sqlx_named_scan::Result<()> {
//! match db.get::<String>("SELECT name FROM users WHERE email_address = ?", &params!["user@example.com"]).await {
//!     Ok(name) => println!("Found user: {name}"),
//!     Err(err) if err.is_not_found() => println!("User not found"),
//!     Err(err) => return Err(err),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## How It Works
//!
//! 1. **Rewrite**: The template is lexed once; `:name` parameters (or native placeholders, for positional arguments) are written back in the driver's dialect
//! 2. **Resolve**: Each parameter occurrence is looked up in the named argument, left to right, and list values expand their placeholder
//! 3. **Scan**: The destination's shape picks the strategy; record columns are matched through a field map built once per type
//!
//! Rust has no runtime field reflection, so records describe themselves
//! through [`impl_record!`]. Custom column types implement [`Scan`] and are
//! registered with [`impl_scalar!`].
//!
//! ## Limitations
//!
//! - SQL is not parsed: a `:name` inside a string literal or comment is still a parameter; write `::` for a literal colon
//! - A batch template may only reference parameters inside its `VALUES (...)` group
//! - `Option<T>` is a scan destination only for scalar `T`. Scan a record into `T`
//!   or `Box<T>`; an optional nested record is a `#[nested] field: Option<T>`
//! - The bundled driver is MySQL; other databases plug in through [`driver::Driver`]
//! - With the MySQL driver the statement cache saves little: SQLx already caches
//!   statements per connection, so see [`mysql`] before enabling it
//!
//! ## License
//!
//! Licensed under either of Apache License, Version 2.0 or MIT license at your option.

pub mod args;
pub mod builder;
pub mod cache;
pub mod db;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod expand;
pub mod mapper;
pub mod mysql;
pub mod named;
pub mod options;
pub mod query;
pub mod record;
pub mod scan;
pub mod scanner;
pub mod value;

pub use args::Arg;
pub use builder::{build_query, rebind};
pub use db::{Db, Tx};
pub use dialect::{dialect_by_name, register, Dialect};
pub use driver::{ExecResult, IsolationLevel, TxOptions};
pub use error::{Error, Result};
pub use mapper::NameMapper;
pub use options::Options;
pub use query::BoundQuery;
pub use record::Record;
pub use scan::{Scan, Target};
pub use scanner::Scanner;
pub use value::{Map, ToValue, Value};

/// Convenience re-exports for common use cases
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::{impl_record, impl_scalar, named, params};
    pub use crate::{Arg, Db, Dialect, Map, Options, Record, Scan, Scanner, Target, ToValue, Tx, Value};
}
