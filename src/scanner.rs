//! Row scanning.
//!
//! A [`Scanner`] owns a driver row iterator and writes rows into a
//! destination whose [`Shape`] decides how columns are matched:
//!
//! - scalar: the only column is scanned directly;
//! - map: every column becomes an entry, bytes are turned into text when
//!   they are valid UTF-8;
//! - record: columns are matched to fields through the cached
//!   [`FieldMap`](crate::mapper::FieldMap) of the record type;
//! - list of any of the above: one element is appended per row.
//!
//! Automatic mode ([`Scanner::scan`]) consumes every row and closes the
//! iterator whatever the outcome. Manual mode ([`Scanner::next`] /
//! [`Scanner::scan_row`]) leaves iteration and closing to the caller. The
//! two cannot be mixed on one scanner.
//!
//! A failed row leaves the rows appended before it in a list destination.

use crate::driver::Rows;
use crate::error::{Error, Result};
use crate::mapper::field_map;
use crate::options::Options;
use crate::record::scan_slot;
use crate::scan::{Shape, ShapeKind, Target};
use crate::value::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Fresh,
    Auto,
    Manual,
}

/// How each column of a row reaches the destination.
enum RowPlan {
    Scalar,
    Map,
    /// Field path per column; `None` discards the column.
    Record(Vec<Option<Vec<usize>>>),
}

/// Writes result rows into caller-owned destinations.
pub struct Scanner {
    rows: Box<dyn Rows>,
    options: Arc<Options>,
    single: bool,
    mode: Mode,
    columns: Option<Vec<String>>,
    has_row: bool,
    closed: bool,
}

impl Scanner {
    pub fn new(rows: Box<dyn Rows>, options: Arc<Options>) -> Self {
        Scanner {
            rows,
            options,
            single: false,
            mode: Mode::Fresh,
            columns: None,
            has_row: false,
            closed: false,
        }
    }

    /// A scanner that requires exactly one row.
    pub fn single(rows: Box<dyn Rows>, options: Arc<Options>) -> Self {
        Scanner {
            single: true,
            ..Scanner::new(rows, options)
        }
    }

    pub fn is_single(&self) -> bool {
        self.single
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Result column names.
    pub fn columns(&mut self) -> Result<Vec<String>> {
        Ok(self.load_columns()?.to_vec())
    }

    /// Scans every row into `dest` and closes the iterator.
    ///
    /// Multi-row scanners need a list destination (`Vec<T>`); single-row
    /// scanners need a non-list one and fail with [`Error::NotFound`] on no
    /// rows and [`Error::TooManyRows`] on more than one.
    pub async fn scan<T: Target + ?Sized>(&mut self, dest: &mut T) -> Result<()> {
        match self.mode {
            Mode::Fresh => self.mode = Mode::Auto,
            Mode::Auto => {
                return Err(Error::UsageError("scanner has already been consumed".to_owned()))
            }
            Mode::Manual => {
                return Err(Error::UsageError(
                    "cannot scan automatically after manual iteration".to_owned(),
                ))
            }
        }

        let result = self.scan_all(dest.shape()).await;
        let closed = self.close().await;
        match (result, closed) {
            (Ok(()), closed) => closed,
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!(error = %close_err, "failed to close rows after scan error");
                Err(err)
            }
        }
    }

    async fn scan_all(&mut self, shape: Shape<'_>) -> Result<()> {
        let columns = self.load_columns()?.to_vec();

        match shape {
            Shape::List(list) => {
                if self.single {
                    return Err(Error::UsageError(
                        "single-row scan needs a non-list destination".to_owned(),
                    ));
                }
                let plan = self.plan(list.element_kind(), &columns)?;
                while self.rows.next().await? {
                    let values = self.rows.values()?;
                    if let Err(err) = apply(&plan, &columns, list.append(), values) {
                        list.discard_last();
                        return Err(err);
                    }
                }
                Ok(())
            }
            shape => {
                if !self.single {
                    return Err(Error::UsageError(
                        "multi-row scan needs a list destination".to_owned(),
                    ));
                }
                let plan = self.plan(shape.kind(), &columns)?;
                if !self.rows.next().await? {
                    return Err(Error::NotFound);
                }
                let values = self.rows.values()?;
                apply(&plan, &columns, shape, values)?;
                if self.rows.next().await? {
                    return Err(Error::TooManyRows);
                }
                Ok(())
            }
        }
    }

    /// Advances to the next row in manual mode.
    pub async fn next(&mut self) -> Result<bool> {
        match self.mode {
            Mode::Auto => {
                return Err(Error::UsageError(
                    "cannot iterate manually after an automatic scan".to_owned(),
                ))
            }
            Mode::Fresh | Mode::Manual => self.mode = Mode::Manual,
        }
        if self.closed {
            return Ok(false);
        }
        self.load_columns()?;
        self.has_row = self.rows.next().await?;
        Ok(self.has_row)
    }

    /// Scans the current row into a non-list destination.
    pub fn scan_row<T: Target + ?Sized>(&mut self, dest: &mut T) -> Result<()> {
        if self.mode != Mode::Manual {
            return Err(Error::UsageError("scan_row requires next() first".to_owned()));
        }
        if !self.has_row {
            return Err(Error::UsageError("no current row".to_owned()));
        }
        let columns = self.load_columns()?.to_vec();
        let shape = dest.shape();
        if let Shape::List(_) = shape {
            return Err(Error::UsageError(
                "scan_row needs a non-list destination".to_owned(),
            ));
        }
        let plan = self.plan(shape.kind(), &columns)?;
        let values = self.rows.values()?;
        self.has_row = false;
        apply(&plan, &columns, shape, values)
    }

    /// Closes the iterator. Later calls do nothing.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.has_row = false;
        self.rows.close().await
    }

    fn load_columns(&mut self) -> Result<&[String]> {
        let columns = match self.columns.take() {
            Some(columns) => columns,
            None => {
                let columns = self.rows.columns()?;
                validate_columns(&columns)?;
                columns
            }
        };
        Ok(self.columns.insert(columns).as_slice())
    }

    fn plan(&self, kind: ShapeKind, columns: &[String]) -> Result<RowPlan> {
        match kind {
            ShapeKind::Scalar => {
                if columns.len() != 1 {
                    return Err(Error::InvalidColumns(format!(
                        "scalar destination needs exactly one column, got {}",
                        columns.len()
                    )));
                }
                Ok(RowPlan::Scalar)
            }
            ShapeKind::Map => Ok(RowPlan::Map),
            ShapeKind::Record(record) => {
                let options = &self.options;
                let fields = field_map(
                    record,
                    &options.tag,
                    options.name_mapper,
                    &options.column_separator,
                );
                let mut paths = Vec::with_capacity(columns.len());
                for column in columns {
                    let path = fields
                        .path(column)
                        .or_else(|| fields.path(&column.to_lowercase()));
                    match path {
                        Some(path) => paths.push(Some(path.to_vec())),
                        None if options.ignore_missing_fields => paths.push(None),
                        None => {
                            return Err(Error::UnmappedColumn {
                                column: column.clone(),
                                target: record.name().to_owned(),
                            })
                        }
                    }
                }
                Ok(RowPlan::Record(paths))
            }
            ShapeKind::List => Err(Error::UsageError(
                "lists of lists are not a supported destination".to_owned(),
            )),
        }
    }
}

fn validate_columns(columns: &[String]) -> Result<()> {
    if columns.is_empty() {
        return Err(Error::InvalidColumns("result has no columns".to_owned()));
    }
    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        if !seen.insert(column.as_str()) {
            return Err(Error::InvalidColumns(format!("duplicate column '{column}'")));
        }
    }
    Ok(())
}

fn apply(plan: &RowPlan, columns: &[String], shape: Shape<'_>, values: Vec<Value>) -> Result<()> {
    if values.len() != columns.len() {
        return Err(Error::InvalidColumns(format!(
            "row has {} value(s) for {} column(s)",
            values.len(),
            columns.len()
        )));
    }

    match (plan, shape) {
        (RowPlan::Scalar, Shape::Scalar(slot)) => {
            let value = values.into_iter().next().unwrap_or_default();
            slot.scan(value)
        }
        (RowPlan::Map, Shape::Map(map)) => {
            for (column, value) in columns.iter().zip(values) {
                map.insert(column.clone(), bytes_to_text(value));
            }
            Ok(())
        }
        (RowPlan::Record(paths), Shape::Record(record)) => {
            let target = record.record_type().name();
            for ((column, value), path) in columns.iter().zip(values).zip(paths) {
                let Some(path) = path else {
                    continue;
                };
                let slot = scan_slot(&mut *record, path).ok_or_else(|| Error::UnmappedColumn {
                    column: column.clone(),
                    target: target.to_owned(),
                })?;
                slot.scan(value)?;
            }
            Ok(())
        }
        _ => Err(Error::UsageError(
            "destination shape does not match the row plan".to_owned(),
        )),
    }
}

fn bytes_to_text(value: Value) -> Value {
    match value {
        Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Value::Text(text),
            Err(err) => Value::Bytes(err.into_bytes()),
        },
        other => other,
    }
}
