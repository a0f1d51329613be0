//! Named argument resolution.
//!
//! Every `:name` occurrence in a template is looked up in the named
//! argument, left to right, duplicates included. A list-valued parameter
//! expands into one placeholder per element. A batch argument (a slice of
//! records or maps) repeats the template's `VALUES (...)` group once per
//! element and enumerates values element by element.

use crate::args::Arg;
use crate::builder::{compile_named, rewrite_named, Repeats};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::mapper::field_map;
use crate::options::Options;
use crate::record::{field_at, FieldRef, Record};
use crate::value::{Map, Value};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static VALUES_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bVALUES\s*\(").expect("valid VALUES pattern"));

/// One element of the named argument.
#[derive(Clone, Copy)]
enum Source<'a> {
    Record(&'a dyn Record),
    Map(&'a Map),
}

/// Rewrites `template` for `dialect` and resolves its parameters from `arg`.
///
/// Returns the positional query and its values; the number of
/// placeholders always equals the number of values.
///
/// ```
/// use sqlx_named_scan::{named, Arg, Dialect, Options, Value};
/// use sqlx_named_scan::named::bind_named;
///
/// let rows = vec![named! { a: 1, b: 2 }, named! { a: 3, b: 4 }];
/// let (sql, values) = bind_named(
///     Dialect::Question,
///     "INSERT INTO t(a,b) VALUES (:a,:b)",
///     &Arg::maps(&rows),
///     &Options::default(),
/// )?;
/// assert_eq!(sql, "INSERT INTO t(a,b) VALUES (?,?),(?,?)");
/// assert_eq!(values, vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]);
/// # Ok::<(), sqlx_named_scan::Error>(())
/// ```
pub fn bind_named(
    dialect: Dialect,
    template: &str,
    arg: &Arg<'_>,
    options: &Options,
) -> Result<(String, Vec<Value>)> {
    let sources: Vec<Source<'_>> = match arg {
        Arg::Record(record) => vec![Source::Record(*record)],
        Arg::Map(map) => vec![Source::Map(map)],
        Arg::Records(records) => records.iter().map(|r| Source::Record(*r)).collect(),
        Arg::Maps(maps) => maps.iter().map(Source::Map).collect(),
        Arg::Value(value) => {
            return Err(Error::UnsupportedArgumentType(format!(
                "named template needs a record or map argument, got {}",
                value.type_name()
            )))
        }
    };

    let template: Cow<'_, str> = if arg.is_batch() {
        if sources.is_empty() {
            return Err(Error::EmptyList("batch argument".to_owned()));
        }
        Cow::Owned(repeat_values_group(template, sources.len())?)
    } else {
        Cow::Borrowed(template)
    };

    let first = compile_named(&template, dialect)?;
    let group = first.names.len() / sources.len();

    let mut repeats = Repeats::new();
    let mut values = Vec::with_capacity(first.names.len());
    for (occurrence, name) in first.names.iter().enumerate() {
        let source = sources[occurrence / group.max(1)];
        match resolve(source, name, options)? {
            Value::List(items) => {
                if items.is_empty() {
                    return Err(Error::EmptyList(name.clone()));
                }
                repeats.insert(occurrence, items.len());
                for item in items {
                    if !item.is_bindable() {
                        return Err(Error::UnsupportedArgumentType(format!(
                            "{} inside the list for ':{name}'",
                            item.type_name()
                        )));
                    }
                    values.push(item);
                }
            }
            Value::Map(_) => {
                return Err(Error::UnsupportedArgumentType(format!(
                    "map value for ':{name}'"
                )))
            }
            value => values.push(value),
        }
    }

    let rewritten = if repeats.is_empty() {
        first
    } else {
        rewrite_named(&template, dialect, &repeats)?
    };

    if rewritten.placeholders != values.len() {
        return Err(Error::ArgumentCountMismatch {
            placeholders: rewritten.placeholders,
            values: values.len(),
        });
    }
    Ok((rewritten.sql, values))
}

fn resolve(source: Source<'_>, name: &str, options: &Options) -> Result<Value> {
    let found = match source {
        Source::Map(map) => lookup_map(map, name),
        Source::Record(record) => lookup_record(record, name, options),
    };
    match found {
        Some(value) => Ok(value),
        None if options.missing_params_as_null => Ok(Value::Null),
        None => Err(Error::UnresolvedIdentifier(name.to_owned())),
    }
}

/// Dotted names walk nested maps first, then fall back to a flat key.
fn lookup_map(map: &Map, name: &str) -> Option<Value> {
    if name.contains('.') {
        let mut segments = name.split('.');
        let mut current = segments.next().and_then(|s| map.get(s));
        for segment in segments {
            current = match current {
                Some(Value::Map(inner)) => inner.get(segment),
                _ => None,
            };
        }
        if let Some(value) = current {
            return Some(value.clone());
        }
    }
    map.get(name).cloned()
}

fn lookup_record(record: &dyn Record, name: &str, options: &Options) -> Option<Value> {
    let fields = field_map(
        record.record_type(),
        &options.tag,
        options.name_mapper,
        &options.param_separator,
    );
    match field_at(record, fields.path(name)?)? {
        FieldRef::Value(value) => Some(value),
        // unset optional parent
        FieldRef::Absent => Some(Value::Null),
        FieldRef::Record(_) => None,
    }
}

/// Repeats the `VALUES (...)` group `count` times, comma separated.
fn repeat_values_group(template: &str, count: usize) -> Result<String> {
    let found = VALUES_GROUP.find(template).ok_or_else(|| {
        Error::InvalidTemplate("batch argument needs a VALUES (...) group".to_owned())
    })?;
    let open = found.end() - 1;
    let close = matching_paren(template, open).ok_or_else(|| {
        Error::InvalidTemplate("unbalanced parentheses in VALUES group".to_owned())
    })?;
    let group = &template[open..=close];

    let total = compile_named(template, Dialect::Named)?.names.len();
    let inside = compile_named(group, Dialect::Named)?.names.len();
    if total != inside {
        return Err(Error::InvalidTemplate(format!(
            "batch template has {} parameter(s) outside its VALUES group",
            total - inside
        )));
    }

    let mut out = String::with_capacity(template.len() + (group.len() + 1) * count);
    out.push_str(&template[..open]);
    for i in 0..count {
        if i > 0 {
            out.push(',');
        }
        out.push_str(group);
    }
    out.push_str(&template[close + 1..]);
    Ok(out)
}

fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}
