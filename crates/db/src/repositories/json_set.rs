//! Expressions over JSONB string-array columns used as sets.
//!
//! Membership changes are single conditional `UPDATE` statements: the
//! `contains`/`not_contains` filter makes the change conditional, and the
//! affected row count tells the caller whether anything changed. Counters
//! are updated in the same statement so they cannot drift from the set.

use sea_orm::sea_query::{Expr, SimpleExpr};

/// `column` with `value` appended.
pub(crate) fn append(column: &str, value: &str) -> SimpleExpr {
    Expr::cust_with_values(
        format!("\"{column}\" || jsonb_build_array(CAST($1 AS TEXT))"),
        [value.to_string()],
    )
}

/// `column` with every occurrence of `value` removed.
pub(crate) fn remove(column: &str, value: &str) -> SimpleExpr {
    Expr::cust_with_values(
        format!("\"{column}\" - CAST($1 AS TEXT)"),
        [value.to_string()],
    )
}

/// `column` with `old` swapped for `new`, keeping a single `new`.
pub(crate) fn replace(column: &str, old: &str, new: &str) -> SimpleExpr {
    Expr::cust_with_values(
        format!(
            "CASE WHEN jsonb_exists(\"{column}\", $1) THEN \"{column}\" - CAST($2 AS TEXT) \
             ELSE (\"{column}\" - CAST($3 AS TEXT)) || jsonb_build_array(CAST($4 AS TEXT)) END"
        ),
        [new.to_string(), old.to_string(), old.to_string(), new.to_string()],
    )
}

/// `counter - 1` when `column` already contains `value`, else `counter`.
///
/// Pairs with [`replace`]: swapping in a value that is already present
/// shrinks the set by one.
pub(crate) fn shrink_if_contains(counter: &str, column: &str, value: &str) -> SimpleExpr {
    Expr::cust_with_values(
        format!(
            "CASE WHEN jsonb_exists(\"{column}\", $1) THEN GREATEST(\"{counter}\" - 1, 0) \
             ELSE \"{counter}\" END"
        ),
        [value.to_string()],
    )
}

/// Whether `column` contains `value`.
pub(crate) fn contains(column: &str, value: &str) -> SimpleExpr {
    Expr::cust_with_values(
        format!("jsonb_exists(\"{column}\", $1)"),
        [value.to_string()],
    )
}

/// Whether `column` does not contain `value`.
pub(crate) fn not_contains(column: &str, value: &str) -> SimpleExpr {
    Expr::cust_with_values(
        format!("NOT jsonb_exists(\"{column}\", $1)"),
        [value.to_string()],
    )
}

/// `column + 1`
pub(crate) fn increment(column: &str) -> SimpleExpr {
    Expr::cust(format!("\"{column}\" + 1"))
}

/// `column - 1`, floored at zero.
pub(crate) fn decrement(column: &str) -> SimpleExpr {
    Expr::cust(format!("GREATEST(\"{column}\" - 1, 0)"))
}
