//! Row filtering against the declared column schema.
//!
//! [`check_schema`] vets a declared schema once, before any row flows.
//! [`matches`] is the per-row accept/reject decision: deterministic given
//! its inputs, with side effects limited to the two reject counters it is
//! handed. Rejection metering uses the *raw* row size, since a rejected
//! record never reaches wire form.

use rowlink_core::{Column, Row};
use tracing::warn;

use crate::error::ConnectorError;
use crate::metrics::Counter;
use crate::setting::CheckRule;

/// Vets a declared schema before rows flow through [`matches`].
///
/// Runs once per task, at configuration parse, not per row.
///
/// # Errors
///
/// Returns [`ConnectorError::FilterError`] if the schema declares the same
/// validated-side column name more than once.
pub fn check_schema(columns: &[Column], is_sink: bool) -> Result<(), ConnectorError> {
    for (i, column) in columns.iter().enumerate() {
        let name = validated_name(column, is_sink);
        if columns[..i]
            .iter()
            .any(|c| validated_name(c, is_sink) == name)
        {
            return Err(ConnectorError::FilterError(format!(
                "schema declares column '{name}' more than once"
            )));
        }
    }
    Ok(())
}

/// Decides whether a row passes the schema check.
///
/// `is_sink` selects the validated column-name side: source tasks (`false`)
/// match cells by the column's wire-form name, sink tasks (`true`) by its
/// external-system name. On rejection both reject counters are incremented
/// exactly once, sized from the raw row.
///
/// Expects a schema that passed [`check_schema`]; a duplicate column name
/// merely validates the same cell twice.
#[must_use]
pub fn matches(
    rule: CheckRule,
    row: &Row,
    columns: &[Column],
    is_sink: bool,
    rejected_rows: Option<&Counter>,
    rejected_bytes: Option<&Counter>,
) -> bool {
    if rule == CheckRule::None {
        return true;
    }

    match validate(row, columns, is_sink) {
        None => true,
        Some(reason) if rule == CheckRule::Permissive => {
            warn!(%reason, "row does not match schema; passing (permissive)");
            true
        }
        Some(reason) => {
            warn!(%reason, "row does not match schema; rejecting");
            reject(row, rejected_rows, rejected_bytes);
            false
        }
    }
}

/// Increments both reject counters once, sized from the raw row.
fn reject(row: &Row, rejected_rows: Option<&Counter>, rejected_bytes: Option<&Counter>) {
    if let Some(c) = rejected_rows {
        c.add(1);
    }
    if let Some(c) = rejected_bytes {
        c.add(row.byte_size());
    }
}

/// Validates a row against the schema, returning the first mismatch.
fn validate(row: &Row, columns: &[Column], is_sink: bool) -> Option<String> {
    for column in columns {
        let expected = validated_name(column, is_sink);
        let Some(cell) = row.cell(expected) else {
            return Some(format!("missing cell '{expected}'"));
        };
        let actual = cell.value.data_type();
        if actual != column.data_type {
            return Some(format!(
                "cell '{expected}' has type {actual}, schema declares {}",
                column.data_type
            ));
        }
    }
    None
}

fn validated_name(column: &Column, is_sink: bool) -> &str {
    if is_sink {
        &column.name
    } else {
        column.output_name()
    }
}
