//! Placeholder lexer and rewriter.
//!
//! The lexer walks the template one character at a time. It recognizes
//! either colon-named parameters (`:name`, for named templates) or
//! positional placeholders (for `IN` expansion and rebinding), and
//! writes each occurrence back out in the target dialect, repeated as many
//! times as requested. Runs of whitespace collapse to a single space so
//! equivalent templates produce the same statement text.
//!
//! Positional placeholders are `?` in every dialect plus the dialect's own
//! form: `$N`, `@pN`, or `:name`.
//!
//! SQL is not parsed: string literals and comments get no special
//! treatment, so `:name` inside a literal is still a parameter. Write `::`
//! for a literal colon.

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Occurrence index (0-based, left to right) to number of placeholders to
/// emit for it. Absent occurrences emit one.
pub type Repeats = HashMap<usize, usize>;

/// Output of one rewrite pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub sql: String,
    /// Identifier per occurrence, duplicates preserved. For native
    /// placeholders this is the original number (`"2"` for `$2`) or empty
    /// for `?`.
    pub names: Vec<String>,
    /// Native placeholders written to `sql`.
    pub placeholders: usize,
}

#[derive(Debug, Clone, Copy)]
enum Source {
    Named,
    Native(Dialect),
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

fn digits_end(chars: &[char], from: usize) -> usize {
    let mut end = from;
    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
    }
    end
}

/// Placeholder starting at `i`: end index (exclusive) and its name.
fn placeholder_at(chars: &[char], i: usize, source: Source) -> Option<(usize, String)> {
    let next = chars.get(i + 1).copied();
    if chars[i] == '?' && matches!(source, Source::Native(_)) {
        return Some((i + 1, String::new()));
    }
    match source {
        Source::Named | Source::Native(Dialect::Named) => {
            if chars[i] != ':' || !next.is_some_and(is_ident_start) {
                return None;
            }
            let mut end = i + 1;
            while end < chars.len() && is_ident_char(chars[end]) {
                end += 1;
            }
            // a trailing dot belongs to the surrounding SQL
            while chars[end - 1] == '.' {
                end -= 1;
            }
            Some((end, chars[i + 1..end].iter().collect()))
        }
        Source::Native(Dialect::Question | Dialect::Unknown) => None,
        Source::Native(Dialect::Dollar) => {
            if chars[i] != '$' || !next.is_some_and(|c| c.is_ascii_digit()) {
                return None;
            }
            let end = digits_end(chars, i + 1);
            Some((end, chars[i + 1..end].iter().collect()))
        }
        Source::Native(Dialect::At) => {
            let p = chars.get(i + 1).copied();
            let digit = chars.get(i + 2).copied();
            if chars[i] != '@'
                || !matches!(p, Some('p' | 'P'))
                || !digit.is_some_and(|c| c.is_ascii_digit())
            {
                return None;
            }
            let end = digits_end(chars, i + 2);
            Some((end, chars[i + 2..end].iter().collect()))
        }
    }
}

fn lex(template: &str, source: Source, target: Dialect, repeats: &Repeats) -> Result<Rewritten> {
    let chars: Vec<char> = template.chars().collect();
    let colon_escapes = matches!(source, Source::Named | Source::Native(Dialect::Named));

    let mut sql = String::with_capacity(template.len() + 8);
    let mut names = Vec::new();
    let mut ordinal = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            sql.push(' ');
            continue;
        }

        if colon_escapes && c == ':' && chars.get(i + 1) == Some(&':') {
            sql.push(':');
            i += 2;
            continue;
        }

        if let Some((end, name)) = placeholder_at(&chars, i, source) {
            let occurrence = names.len();
            let count = repeats.get(&occurrence).copied().unwrap_or(1);
            if count == 0 {
                return Err(Error::InvalidTemplate(format!(
                    "placeholder #{} ('{}') cannot expand to zero values",
                    occurrence + 1,
                    chars[i..end].iter().collect::<String>()
                )));
            }
            for n in 0..count {
                if n > 0 {
                    sql.push(',');
                }
                ordinal += 1;
                target.write_placeholder(&mut sql, ordinal, &name);
            }
            names.push(name);
            i = end;
            continue;
        }

        sql.push(c);
        i += 1;
    }

    Ok(Rewritten {
        sql,
        names,
        placeholders: ordinal,
    })
}

/// Rewrites `:name` parameters into `dialect` placeholders, one per occurrence.
pub fn compile_named(template: &str, dialect: Dialect) -> Result<Rewritten> {
    lex(template, Source::Named, dialect, &Repeats::new())
}

/// Rewrites `:name` parameters, emitting `repeats[k]` comma-separated
/// placeholders for the `k`-th occurrence.
pub fn rewrite_named(template: &str, dialect: Dialect, repeats: &Repeats) -> Result<Rewritten> {
    lex(template, Source::Named, dialect, repeats)
}

/// Rewrites the positional placeholders of a template for `dialect`,
/// expanding the `k`-th one `repeats[k]` times. Numbered dialects are
/// renumbered left to right.
pub fn rewrite_positional(template: &str, dialect: Dialect, repeats: &Repeats) -> Result<Rewritten> {
    lex(template, Source::Native(dialect), dialect, repeats)
}

/// Converts named placeholders (`:name`) to positional placeholders for `dialect`.
///
/// # Examples
///
/// ```
/// use sqlx_named_scan::builder::build_query;
/// use sqlx_named_scan::Dialect;
///
/// let sql = build_query("SELECT * FROM users WHERE id = :id AND name = :name", Dialect::Question)?;
/// assert_eq!(sql, "SELECT * FROM users WHERE id = ? AND name = ?");
///
/// let sql = build_query("SELECT * FROM users WHERE id = :id AND name = :name", Dialect::Dollar)?;
/// assert_eq!(sql, "SELECT * FROM users WHERE id = $1 AND name = $2");
/// # Ok::<(), sqlx_named_scan::Error>(())
/// ```
pub fn build_query(template: &str, dialect: Dialect) -> Result<String> {
    Ok(compile_named(template, dialect)?.sql)
}

/// Converts a `?`-placeholder query to `dialect`.
pub fn rebind(dialect: Dialect, query: &str) -> Result<String> {
    match dialect {
        Dialect::Question | Dialect::Unknown => Ok(query.to_owned()),
        _ => Ok(lex(query, Source::Native(Dialect::Question), dialect, &Repeats::new())?.sql),
    }
}

/// Number of native `dialect` placeholders in `query`.
pub fn count_placeholders(query: &str, dialect: Dialect) -> usize {
    let chars: Vec<char> = query.chars().collect();
    let source = Source::Native(dialect);
    let mut count = 0;
    let mut i = 0;
    while i < chars.len() {
        if dialect == Dialect::Named && chars[i] == ':' && chars.get(i + 1) == Some(&':') {
            i += 2;
            continue;
        }
        match placeholder_at(&chars, i, source) {
            Some((end, _)) => {
                count += 1;
                i = end;
            }
            None => i += 1,
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_single_param() {
        let result = build_query("SELECT * FROM users WHERE id = :id", Dialect::Question).unwrap();
        assert_eq!(result, "SELECT * FROM users WHERE id = ?");
    }

    #[test]
    fn test_build_query_multiple_params() {
        let result = build_query(
            "SELECT * FROM users WHERE id = :id AND name = :name",
            Dialect::Question,
        )
        .unwrap();
        assert_eq!(result, "SELECT * FROM users WHERE id = ? AND name = ?");
    }

    #[test]
    fn test_build_query_repeated_params() {
        let rewritten = compile_named(
            "SELECT * FROM users WHERE id = :id OR user_id = :id",
            Dialect::Dollar,
        )
        .unwrap();
        assert_eq!(rewritten.sql, "SELECT * FROM users WHERE id = $1 OR user_id = $2");
        assert_eq!(rewritten.names, vec!["id", "id"]);
    }

    #[test]
    fn test_build_query_no_params() {
        let result = build_query("SELECT * FROM users", Dialect::Dollar).unwrap();
        assert_eq!(result, "SELECT * FROM users");
    }

    #[test]
    fn test_build_query_with_underscores() {
        let result = build_query("SELECT * FROM users WHERE user_id = :user_id", Dialect::At).unwrap();
        assert_eq!(result, "SELECT * FROM users WHERE user_id = @p1");
    }

    #[test]
    fn test_named_dialect_reproduces_names() {
        let result = build_query("UPDATE t SET a = :a WHERE b = :b", Dialect::Named).unwrap();
        assert_eq!(result, "UPDATE t SET a = :a WHERE b = :b");
    }

    #[test]
    fn test_colon_not_followed_by_letter_is_literal() {
        let rewritten = compile_named(
            "SELECT * FROM t WHERE at > '12:00:00' AND path = 'C:\\tmp' AND x = :x",
            Dialect::Question,
        )
        .unwrap();
        assert_eq!(
            rewritten.sql,
            "SELECT * FROM t WHERE at > '12:00:00' AND path = 'C:\\tmp' AND x = ?"
        );
        assert_eq!(rewritten.names, vec!["x"]);
    }

    #[test]
    fn test_double_colon_escape() {
        let rewritten =
            compile_named("SELECT :id::::int, a::b FROM t", Dialect::Dollar).unwrap();
        assert_eq!(rewritten.sql, "SELECT $1::int, a:b FROM t");
        assert_eq!(rewritten.names, vec!["id"]);
    }

    #[test]
    fn test_dotted_and_unicode_identifiers() {
        let rewritten = compile_named(
            "SELECT * FROM t WHERE city = :address.city AND nom = :prénom.",
            Dialect::Question,
        )
        .unwrap();
        assert_eq!(rewritten.names, vec!["address.city", "prénom"]);
        assert_eq!(rewritten.sql, "SELECT * FROM t WHERE city = ? AND nom = ?.");
    }

    #[test]
    fn test_whitespace_collapses() {
        let result = build_query("SELECT *\n   FROM users\n\tWHERE id = :id", Dialect::Question).unwrap();
        assert_eq!(result, "SELECT * FROM users WHERE id = ?");
    }

    #[test]
    fn test_repeats_expand_occurrence() {
        let mut repeats = Repeats::new();
        repeats.insert(0, 3);
        let rewritten = rewrite_named(
            "SELECT * FROM t WHERE id IN (:ids) AND on = :on",
            Dialect::Dollar,
            &repeats,
        )
        .unwrap();
        assert_eq!(rewritten.sql, "SELECT * FROM t WHERE id IN ($1,$2,$3) AND on = $4");
        assert_eq!(rewritten.placeholders, 4);

        let named = rewrite_named("x IN (:ids)", Dialect::Named, &repeats).unwrap();
        assert_eq!(named.sql, "x IN (:ids,:ids,:ids)");
    }

    #[test]
    fn test_zero_repeat_is_invalid() {
        let mut repeats = Repeats::new();
        repeats.insert(0, 0);
        let err = rewrite_named("x IN (:ids)", Dialect::Question, &repeats).unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(_)));
    }

    #[test]
    fn test_positional_renumbering() {
        let mut repeats = Repeats::new();
        repeats.insert(0, 3);
        let rewritten = rewrite_positional(
            "SELECT * FROM t WHERE a IN ($1) AND b = $2",
            Dialect::Dollar,
            &repeats,
        )
        .unwrap();
        assert_eq!(rewritten.sql, "SELECT * FROM t WHERE a IN ($1,$2,$3) AND b = $4");
        assert_eq!(rewritten.names, vec!["1", "2"]);

        let at = rewrite_positional("a IN (@p1) AND b = @p2", Dialect::At, &repeats).unwrap();
        assert_eq!(at.sql, "a IN (@p1,@p2,@p3) AND b = @p4");
    }

    #[test]
    fn test_positional_accepts_question_marks() {
        let mut repeats = Repeats::new();
        repeats.insert(0, 3);
        let rewritten = rewrite_positional(
            "SELECT * FROM u WHERE id IN (?)",
            Dialect::Dollar,
            &repeats,
        )
        .unwrap();
        assert_eq!(rewritten.sql, "SELECT * FROM u WHERE id IN ($1,$2,$3)");
    }

    #[test]
    fn test_positional_keeps_casts() {
        let rewritten =
            rewrite_positional("SELECT $1::int", Dialect::Dollar, &Repeats::new()).unwrap();
        assert_eq!(rewritten.sql, "SELECT $1::int");
    }

    #[test]
    fn test_rebind() {
        assert_eq!(
            rebind(Dialect::Dollar, "SELECT * FROM t WHERE a = ? AND b = ?").unwrap(),
            "SELECT * FROM t WHERE a = $1 AND b = $2"
        );
        assert_eq!(
            rebind(Dialect::At, "a = ?").unwrap(),
            "a = @p1"
        );
        assert_eq!(rebind(Dialect::Named, "a = ?").unwrap(), "a = :arg1");
        assert_eq!(rebind(Dialect::Question, "a =  ?").unwrap(), "a =  ?");
    }

    #[test]
    fn test_count_placeholders() {
        assert_eq!(count_placeholders("a = ? AND b IN (?,?)", Dialect::Question), 3);
        assert_eq!(count_placeholders("a = $1 AND b = $12", Dialect::Dollar), 2);
        assert_eq!(count_placeholders("a = @p1 AND b = @x", Dialect::At), 1);
        assert_eq!(count_placeholders("a = :a AND b::int", Dialect::Named), 1);
    }
}
