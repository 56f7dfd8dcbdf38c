//! Named parameter binding for caller-supplied SQL.
//!
//! Callers write `@name` in their SELECT text and pass `{ "name": value }`.
//! The driver only understands positional `@P1..@Pn`, so references are
//! rewritten in place. The text is tokenized with the same T-SQL dialect the
//! validator parses with; string literals, quoted identifiers, comments and
//! `@@` system variables are copied through untouched.

use crate::database::query::{BoundQuery, QueryParam};
use crate::error::ServerError;
use serde_json::{Map, Value};
use sqlparser::dialect::MsSqlDialect;
use sqlparser::tokenizer::{Location, Token, Tokenizer};
use std::collections::HashMap;
use tracing::warn;

/// Rewrite `@name` references in `sql` to positional placeholders.
///
/// Keys match case-insensitively, with or without a leading `@`. A name used
/// several times binds once. References with no matching key are left as
/// written so the server reports them.
pub fn bind_named_parameters(
    sql: &str,
    params: &Map<String, Value>,
) -> Result<BoundQuery, ServerError> {
    let mut values: HashMap<String, QueryParam> = HashMap::with_capacity(params.len());
    for (key, value) in params {
        let name = normalize_name(key);
        if name.is_empty() {
            return Err(ServerError::invalid_input("Parameter names cannot be empty"));
        }
        let param = QueryParam::from_json(value).map_err(|e| {
            ServerError::invalid_input(format!("Parameter @{}: {}", name, e.detail()))
        })?;
        values.insert(name, param);
    }

    let dialect = MsSqlDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .with_unescape(false)
        .tokenize_with_location()
        .map_err(|e| ServerError::invalid_query(format!("Failed to tokenize SQL statement: {}", e)))?;

    let lines = LineIndex::new(sql);
    let mut bound = BoundQuery::default();
    let mut text = String::with_capacity(sql.len());
    let mut ordinals: HashMap<String, String> = HashMap::new();
    let mut copied = 0;

    for token in &tokens {
        let Token::Word(word) = &token.token else {
            continue;
        };
        if word.quote_style.is_some() || word.value.starts_with("@@") {
            continue;
        }
        let Some(name) = word.value.strip_prefix('@') else {
            continue;
        };
        let name = name.to_lowercase();
        let Some(param) = values.get(&name) else {
            continue;
        };
        let Some(start) = lines.offset(token.span.start).filter(|&at| at >= copied) else {
            continue;
        };

        let placeholder = ordinals
            .entry(name)
            .or_insert_with(|| bound.bind(param.clone()));
        text.push_str(&sql[copied..start]);
        text.push_str(placeholder);
        copied = start + word.value.len();
    }
    text.push_str(&sql[copied..]);

    for name in values.keys().filter(|name| !ordinals.contains_key(*name)) {
        warn!("Parameter @{} is not referenced by the query", name);
    }

    bound.text = text;
    Ok(bound)
}

fn normalize_name(key: &str) -> String {
    key.trim().trim_start_matches('@').to_lowercase()
}

/// Maps tokenizer locations (1-based line and character column) to byte
/// offsets in the source text.
struct LineIndex<'a> {
    sql: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(sql: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(sql.match_indices('\n').map(|(at, _)| at + 1));
        Self { sql, starts }
    }

    fn offset(&self, location: Location) -> Option<usize> {
        let line = usize::try_from(location.line).ok()?.checked_sub(1)?;
        let column = usize::try_from(location.column).ok()?.checked_sub(1)?;
        let start = *self.starts.get(line)?;
        self.sql[start..]
            .char_indices()
            .nth(column)
            .map(|(at, _)| start + at)
    }
}
