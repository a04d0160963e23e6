//! Conditions and the shared predicate evaluator.
//!
//! Every scan and join compares column bytes through the same
//! machinery: resolve the left-hand column, resolve the right-hand
//! side (a literal encoded to the left column's width, or another
//! column of the same record), run the type-aware comparator, and
//! apply the operator to the ordering.

use std::cmp::Ordering;
use std::fmt;

use bytes::Bytes;

use crate::catalog::ColumnMeta;
use crate::datum::{compare, Value};
use crate::heap::Record;

use super::error::ExecutorError;

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Greater than.
    Gt,
    /// Less than or equal.
    Le,
    /// Greater than or equal.
    Ge,
}

impl CompOp {
    /// Applies the operator to a comparison result.
    pub fn matches(self, ord: Ordering) -> bool {
        match self {
            CompOp::Eq => ord == Ordering::Equal,
            CompOp::Ne => ord != Ordering::Equal,
            CompOp::Lt => ord == Ordering::Less,
            CompOp::Gt => ord == Ordering::Greater,
            CompOp::Le => ord != Ordering::Greater,
            CompOp::Ge => ord != Ordering::Less,
        }
    }

    /// Returns the operator that holds when the operands swap sides.
    pub fn mirrored(self) -> CompOp {
        match self {
            CompOp::Eq => CompOp::Eq,
            CompOp::Ne => CompOp::Ne,
            CompOp::Lt => CompOp::Gt,
            CompOp::Gt => CompOp::Lt,
            CompOp::Le => CompOp::Ge,
            CompOp::Ge => CompOp::Le,
        }
    }
}

impl fmt::Display for CompOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompOp::Eq => "=",
            CompOp::Ne => "<>",
            CompOp::Lt => "<",
            CompOp::Gt => ">",
            CompOp::Le => "<=",
            CompOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// A possibly table-qualified column reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    /// Table qualifier; empty matches any table.
    pub table: String,
    /// Column name.
    pub column: String,
}

impl TableColumn {
    /// Creates a qualified reference `table.column`.
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates an unqualified reference.
    pub fn unqualified(column: impl Into<String>) -> Self {
        Self {
            table: String::new(),
            column: column.into(),
        }
    }

    /// Returns true if `col` is the column this reference names.
    pub fn resolves_to(&self, col: &ColumnMeta) -> bool {
        (self.table.is_empty() || self.table == col.table) && self.column == col.name
    }
}

impl fmt::Display for TableColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.table.is_empty() {
            f.write_str(&self.column)
        } else {
            write!(f, "{}.{}", self.table, self.column)
        }
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum CondRhs {
    /// Another column of the same row.
    Column(TableColumn),
    /// A literal value.
    Literal(Value),
}

/// One predicate of the form `lhs op rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Left-hand column.
    pub lhs: TableColumn,
    /// Comparison operator.
    pub op: CompOp,
    /// Right-hand side.
    pub rhs: CondRhs,
}

impl Condition {
    /// Builds a column-vs-literal condition.
    pub fn with_literal(lhs: TableColumn, op: CompOp, value: Value) -> Self {
        Self {
            lhs,
            op,
            rhs: CondRhs::Literal(value),
        }
    }

    /// Builds a column-vs-column condition.
    pub fn with_column(lhs: TableColumn, op: CompOp, rhs: TableColumn) -> Self {
        Self {
            lhs,
            op,
            rhs: CondRhs::Column(rhs),
        }
    }
}

/// One assignment of an UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SetClause {
    /// Column being assigned.
    pub column: TableColumn,
    /// New value.
    pub value: Value,
}

/// Resolves a column reference against a schema.
pub fn find_column<'a>(
    cols: &'a [ColumnMeta],
    target: &TableColumn,
) -> Result<&'a ColumnMeta, ExecutorError> {
    cols.iter()
        .find(|c| target.resolves_to(c))
        .ok_or_else(|| ExecutorError::ColumnNotFound {
            name: target.to_string(),
        })
}

/// Resolves a column reference to its position in a schema.
pub fn find_column_index(
    cols: &[ColumnMeta],
    target: &TableColumn,
) -> Result<usize, ExecutorError> {
    cols.iter()
        .position(|c| target.resolves_to(c))
        .ok_or_else(|| ExecutorError::ColumnNotFound {
            name: target.to_string(),
        })
}

/// Rewrites conditions whose left side belongs to a different table by
/// swapping sides and mirroring the operator, so scans over `table`
/// always find their own column on the left.
pub fn normalize(conds: &mut [Condition], table: &str) {
    for cond in conds {
        if cond.lhs.table.is_empty() || cond.lhs.table == table {
            continue;
        }
        if let CondRhs::Column(rhs) = &mut cond.rhs {
            std::mem::swap(&mut cond.lhs, rhs);
            cond.op = cond.op.mirrored();
        }
    }
}

/// Returns true iff `record` satisfies every condition.
pub fn evaluate(
    conds: &[Condition],
    record: &Record,
    cols: &[ColumnMeta],
) -> Result<bool, ExecutorError> {
    for cond in conds {
        if !matches_condition(cond, record, cols)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Evaluates a single condition against one record.
///
/// The left column's type and width drive the comparison; a right-hand
/// side of a different type is an error rather than a silent
/// byte-level mismatch.
fn matches_condition(
    cond: &Condition,
    record: &Record,
    cols: &[ColumnMeta],
) -> Result<bool, ExecutorError> {
    let lhs_col = find_column(cols, &cond.lhs)?;
    let lhs = record.field(lhs_col.offset, lhs_col.len);

    let rhs: Bytes = match &cond.rhs {
        CondRhs::Literal(value) => {
            if value.col_type() != lhs_col.ty {
                return Err(ExecutorError::TypeMismatch {
                    expected: lhs_col.ty,
                    found: value.col_type(),
                });
            }
            value.encode(lhs_col.len)?
        }
        CondRhs::Column(target) => {
            let rhs_col = find_column(cols, target)?;
            if rhs_col.ty != lhs_col.ty {
                return Err(ExecutorError::TypeMismatch {
                    expected: lhs_col.ty,
                    found: rhs_col.ty,
                });
            }
            Bytes::copy_from_slice(record.field(rhs_col.offset, rhs_col.len))
        }
    };

    let ord = compare(lhs, &rhs, lhs_col.ty, lhs_col.len);
    Ok(cond.op.matches(ord))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableMeta;
    use crate::datum::ColType;

    fn schema() -> Vec<ColumnMeta> {
        TableMeta::new("t")
            .add_column("id", ColType::Int, 0)
            .add_column("name", ColType::Str, 8)
            .add_column("twin", ColType::Int, 0)
            .cols
    }

    fn record(id: i32, name: &str, twin: i32) -> Record {
        let mut rec = Record::zeroed(16);
        rec.write(0, &id.to_le_bytes());
        rec.write(4, &Value::Str(name.to_string()).encode(8).unwrap());
        rec.write(12, &twin.to_le_bytes());
        rec
    }

    #[test]
    fn test_comp_op_matches() {
        assert!(CompOp::Eq.matches(Ordering::Equal));
        assert!(!CompOp::Eq.matches(Ordering::Less));
        assert!(CompOp::Ne.matches(Ordering::Greater));
        assert!(CompOp::Lt.matches(Ordering::Less));
        assert!(CompOp::Le.matches(Ordering::Equal));
        assert!(CompOp::Ge.matches(Ordering::Greater));
        assert!(!CompOp::Gt.matches(Ordering::Equal));
    }

    #[test]
    fn test_literal_condition() {
        let cols = schema();
        let rec = record(2, "b", 0);

        let eq = Condition::with_literal(
            TableColumn::unqualified("name"),
            CompOp::Eq,
            Value::Str("b".to_string()),
        );
        assert!(evaluate(&[eq], &rec, &cols).unwrap());

        let gt = Condition::with_literal(TableColumn::unqualified("id"), CompOp::Gt, Value::Int(5));
        assert!(!evaluate(&[gt], &rec, &cols).unwrap());
    }

    #[test]
    fn test_conjunction_short_circuits_to_false() {
        let cols = schema();
        let rec = record(1, "a", 1);

        let conds = vec![
            Condition::with_literal(TableColumn::unqualified("id"), CompOp::Eq, Value::Int(1)),
            Condition::with_literal(TableColumn::unqualified("id"), CompOp::Ne, Value::Int(1)),
        ];
        assert!(!evaluate(&conds, &rec, &cols).unwrap());
        assert!(evaluate(&[], &rec, &cols).unwrap());
    }

    #[test]
    fn test_column_vs_column_in_same_record() {
        let cols = schema();

        let cond = Condition::with_column(
            TableColumn::unqualified("id"),
            CompOp::Eq,
            TableColumn::unqualified("twin"),
        );
        assert!(evaluate(&[cond.clone()], &record(3, "x", 3), &cols).unwrap());
        assert!(!evaluate(&[cond], &record(3, "x", 4), &cols).unwrap());
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let cols = schema();
        let rec = record(1, "a", 1);

        let cond = Condition::with_literal(
            TableColumn::unqualified("id"),
            CompOp::Eq,
            Value::Str("1".to_string()),
        );
        assert!(matches!(
            evaluate(&[cond], &rec, &cols),
            Err(ExecutorError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_column_is_an_error() {
        let cols = schema();
        let rec = record(1, "a", 1);

        let cond =
            Condition::with_literal(TableColumn::unqualified("ghost"), CompOp::Eq, Value::Int(1));
        assert!(matches!(
            evaluate(&[cond], &rec, &cols),
            Err(ExecutorError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_normalize_swaps_foreign_lhs() {
        let mut conds = vec![Condition::with_column(
            TableColumn::new("other", "a"),
            CompOp::Lt,
            TableColumn::new("mine", "b"),
        )];
        normalize(&mut conds, "mine");

        assert_eq!(conds[0].lhs, TableColumn::new("mine", "b"));
        assert_eq!(conds[0].op, CompOp::Gt);
        assert_eq!(
            conds[0].rhs,
            CondRhs::Column(TableColumn::new("other", "a"))
        );
    }

    #[test]
    fn test_normalize_leaves_own_conditions_alone() {
        let original = Condition::with_literal(
            TableColumn::new("mine", "a"),
            CompOp::Le,
            Value::Int(1),
        );
        let mut conds = vec![original.clone()];
        normalize(&mut conds, "mine");
        assert_eq!(conds[0], original);
    }
}
