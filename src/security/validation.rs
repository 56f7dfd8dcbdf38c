//! Read-only validation for caller-supplied SELECT text.
//!
//! Two gates run before anything reaches the driver:
//! 1. A lexical prefix gate: the trimmed text must start with `SELECT`
//!    followed by whitespace.
//! 2. A parsed boundary check: the text must be exactly one query statement
//!    whose body is a plain SELECT (or a set operation of them) without INTO.

use crate::error::ServerError;
use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::MsSqlDialect;
use sqlparser::parser::Parser;
use tracing::debug;

/// Error messages for each rejection reason.
mod error_messages {
    pub const EMPTY: &str = "Query cannot be empty";
    pub const NOT_SELECT: &str = "Only SELECT queries are allowed for security reasons";
    pub const MULTIPLE: &str = "Only a single SELECT statement is allowed";
    pub const INTO: &str = "SELECT ... INTO is not allowed";
    pub const PARSE_ERROR: &str = "Failed to parse SQL statement.";
}

/// Validator for the `execute_select_query` tool.
#[derive(Debug, Clone)]
pub struct SelectQueryValidator {
    max_length: usize,
}

impl SelectQueryValidator {
    /// Create a new validator with the given maximum text length (bytes).
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Validate a query. On success the trimmed text is returned.
    pub fn validate<'a>(&self, query: &'a str) -> Result<&'a str, ServerError> {
        let trimmed = query.trim();

        if trimmed.is_empty() {
            return Err(ServerError::invalid_query(error_messages::EMPTY));
        }

        if query.len() > self.max_length {
            return Err(ServerError::invalid_query(format!(
                "Query exceeds maximum length of {} bytes",
                self.max_length
            )));
        }

        if !has_select_prefix(trimmed) {
            return Err(ServerError::invalid_query(error_messages::NOT_SELECT));
        }

        check_single_select(trimmed)?;

        Ok(trimmed)
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

/// `SELECT` (any case) followed by at least one whitespace character.
pub fn has_select_prefix(trimmed: &str) -> bool {
    const KEYWORD: &str = "SELECT";
    match trimmed.get(..KEYWORD.len()) {
        Some(head) if head.eq_ignore_ascii_case(KEYWORD) => trimmed[KEYWORD.len()..]
            .chars()
            .next()
            .is_some_and(char::is_whitespace),
        _ => false,
    }
}

fn check_single_select(sql: &str) -> Result<(), ServerError> {
    let statements = Parser::parse_sql(&MsSqlDialect {}, sql).map_err(|e| {
        debug!("Rejected unparseable query: {}", e);
        ServerError::invalid_query(format!("{} Error: {}", error_messages::PARSE_ERROR, e))
    })?;

    let statement = match statements.as_slice() {
        [single] => single,
        [] => return Err(ServerError::invalid_query(error_messages::EMPTY)),
        _ => return Err(ServerError::invalid_query(error_messages::MULTIPLE)),
    };

    match statement {
        Statement::Query(query) => check_set_expr(&query.body),
        _ => Err(ServerError::invalid_query(error_messages::NOT_SELECT)),
    }
}

fn check_set_expr(expr: &SetExpr) -> Result<(), ServerError> {
    match expr {
        SetExpr::Select(select) => {
            if select.into.is_some() {
                Err(ServerError::invalid_query(error_messages::INTO))
            } else {
                Ok(())
            }
        }
        SetExpr::Query(query) => check_set_expr(&query.body),
        SetExpr::SetOperation { left, right, .. } => {
            check_set_expr(left)?;
            check_set_expr(right)
        }
        SetExpr::Values(_) => Ok(()),
        _ => Err(ServerError::invalid_query(error_messages::NOT_SELECT)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> SelectQueryValidator {
        SelectQueryValidator::new(1_000_000)
    }

    fn rejected(query: &str) -> String {
        match validator().validate(query) {
            Err(ServerError::InvalidQuery(msg)) => msg,
            other => panic!("expected rejection for {:?}, got {:?}", query, other),
        }
    }

    #[test]
    fn test_prefix_gate() {
        assert!(has_select_prefix("select * from T"));
        assert!(has_select_prefix("SELECT\tid FROM T"));
        assert!(!has_select_prefix("SELECTx FROM T"));
        assert!(!has_select_prefix("SELECT"));
        assert!(!has_select_prefix("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(!has_select_prefix("é"));
    }

    #[test]
    fn test_accepts_plain_selects() {
        let v = validator();
        assert!(v.validate("select * from T").is_ok());
        assert_eq!(v.validate("  SELECT id FROM T").unwrap(), "SELECT id FROM T");
        assert!(v.validate("SELECT TOP 10 Name FROM dbo.Users WHERE Id = @id").is_ok());
        assert!(v.validate("SELECT a FROM T UNION ALL SELECT b FROM U").is_ok());
        assert!(v.validate("SELECT 1;").is_ok());
    }

    #[test]
    fn test_rejects_non_select() {
        assert_eq!(rejected("SELECTx FROM T"), error_messages::NOT_SELECT);
        assert_eq!(rejected("DELETE FROM T"), error_messages::NOT_SELECT);
        assert_eq!(rejected("UPDATE T SET a = 1"), error_messages::NOT_SELECT);
    }

    #[test]
    fn test_rejects_chained_statements() {
        assert_eq!(rejected("SELECT 1; DROP TABLE T"), error_messages::MULTIPLE);
        assert_eq!(
            rejected("SELECT * FROM T; DELETE FROM T"),
            error_messages::MULTIPLE
        );
    }

    #[test]
    fn test_rejects_select_into() {
        assert_eq!(rejected("SELECT * INTO Copy FROM T"), error_messages::INTO);
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        assert_eq!(rejected(""), error_messages::EMPTY);
        assert_eq!(rejected("   "), error_messages::EMPTY);

        let v = SelectQueryValidator::new(20);
        let long_query = "SELECT ".to_string() + &"x".repeat(20);
        assert!(matches!(
            v.validate(&long_query),
            Err(ServerError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_rejects_unparseable() {
        let msg = rejected("SELECT * FROM (");
        assert!(msg.starts_with(error_messages::PARSE_ERROR));
    }
}
