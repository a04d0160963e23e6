//! Executor nodes implementing the Volcano iterator model.
//!
//! Each node positions itself with `open()`, advances with
//! `next_tuple()`, and materializes the row at the cursor with
//! `current()` until `end()` turns true. Nodes compose into a tree
//! (e.g. Projection -> NestedLoopJoin -> SeqScan) where each parent
//! pulls rows from its children.
//!
//! Uses enum dispatch instead of `dyn Trait`: the set of node kinds is
//! small and fixed, and parents own their children exclusively.

use crate::catalog::{ColumnMeta, SystemCatalog};
use crate::heap::{Record, RecordScan, Rid, RowCursor, TableFile};
use crate::index::IndexFile;
use crate::tx::Context;

use super::error::ExecutorError;
use super::predicate::{
    evaluate, find_column, find_column_index, normalize, CompOp, CondRhs, Condition, TableColumn,
};

/// A query executor node.
pub enum ExecutorNode<'a, F: TableFile, I: IndexFile> {
    /// Sequential heap scan with residual predicates.
    SeqScan(SeqScan<'a, F>),
    /// Index-order scan with residual predicates.
    IndexScan(IndexScan<'a, F, I>),
    /// Column projection.
    Projection(Projection<'a, F, I>),
    /// Nested-loop join.
    NestedLoopJoin(NestedLoopJoin<'a, F, I>),
}

impl<'a, F: TableFile, I: IndexFile> ExecutorNode<'a, F, I> {
    /// Positions the node at its first qualifying row, or at the end.
    pub fn open(&mut self) -> Result<(), ExecutorError> {
        match self {
            ExecutorNode::SeqScan(n) => n.open(),
            ExecutorNode::IndexScan(n) => n.open(),
            ExecutorNode::Projection(n) => n.child.open(),
            ExecutorNode::NestedLoopJoin(n) => n.open(),
        }
    }

    /// Advances to the next qualifying row. Idempotent once at the
    /// end.
    pub fn next_tuple(&mut self) -> Result<(), ExecutorError> {
        match self {
            ExecutorNode::SeqScan(n) => n.next_tuple(),
            ExecutorNode::IndexScan(n) => n.next_tuple(),
            ExecutorNode::Projection(n) => n.child.next_tuple(),
            ExecutorNode::NestedLoopJoin(n) => n.next_tuple(),
        }
    }

    /// Materializes the current row. Only valid while `!end()`.
    pub fn current(&self) -> Result<Record, ExecutorError> {
        match self {
            ExecutorNode::SeqScan(n) => n.current(),
            ExecutorNode::IndexScan(n) => n.current(),
            ExecutorNode::Projection(n) => n.current(),
            ExecutorNode::NestedLoopJoin(n) => n.current(),
        }
    }

    /// Returns true once the node is exhausted.
    pub fn end(&self) -> bool {
        match self {
            ExecutorNode::SeqScan(n) => n.end(),
            ExecutorNode::IndexScan(n) => n.end(),
            ExecutorNode::Projection(n) => n.child.end(),
            ExecutorNode::NestedLoopJoin(n) => n.end,
        }
    }

    /// Returns the node's output schema; offsets are relative to the
    /// node's own output rows.
    pub fn columns(&self) -> &[ColumnMeta] {
        match self {
            ExecutorNode::SeqScan(n) => &n.cols,
            ExecutorNode::IndexScan(n) => &n.cols,
            ExecutorNode::Projection(n) => &n.cols,
            ExecutorNode::NestedLoopJoin(n) => &n.cols,
        }
    }

    /// Returns the byte width of the node's output rows.
    pub fn tuple_len(&self) -> usize {
        match self {
            ExecutorNode::SeqScan(n) => n.len,
            ExecutorNode::IndexScan(n) => n.len,
            ExecutorNode::Projection(n) => n.len,
            ExecutorNode::NestedLoopJoin(n) => n.len,
        }
    }

    /// Returns the physical rid of the current row for scan nodes;
    /// pipeline nodes report the sentinel.
    pub fn rid(&self) -> Rid {
        match self {
            ExecutorNode::SeqScan(n) => n.rid,
            ExecutorNode::IndexScan(n) => n.rid,
            ExecutorNode::Projection(_) | ExecutorNode::NestedLoopJoin(_) => Rid::INVALID,
        }
    }
}

/// Advances `cursor` until the record it points at satisfies every
/// condition, fetching each candidate through the file handle (which
/// takes the row locks). Returns the qualifying rid, or the sentinel
/// when the cursor exhausts first.
fn seek_qualifying<F, C>(
    cursor: &mut C,
    file: &F,
    ctx: &Context<'_>,
    conds: &[Condition],
    cols: &[ColumnMeta],
) -> Result<Rid, ExecutorError>
where
    F: TableFile,
    C: RowCursor,
    ExecutorError: From<C::Error>,
{
    while !cursor.is_end() {
        let rid = cursor.rid();
        let record = file.get_record(rid, ctx)?;
        if evaluate(conds, &record, cols)? {
            return Ok(rid);
        }
        cursor.next()?;
    }
    Ok(Rid::INVALID)
}

/// Sequential scan over a table's heap file.
///
/// Rows come back in rid order. `current()` re-fetches through the
/// file handle so the caller always sees a fresh copy under its own
/// locks.
pub struct SeqScan<'a, F: TableFile> {
    cols: Vec<ColumnMeta>,
    len: usize,
    conds: Vec<Condition>,
    file: &'a F,
    ctx: &'a Context<'a>,
    scan: Option<RecordScan<'a, F>>,
    rid: Rid,
}

impl<'a, F: TableFile> SeqScan<'a, F> {
    /// Creates a scan of `table` with residual `conds`.
    pub fn new<I: IndexFile>(
        catalog: &'a SystemCatalog<F, I>,
        table: &str,
        mut conds: Vec<Condition>,
        ctx: &'a Context<'a>,
    ) -> Result<Self, ExecutorError> {
        let meta = catalog.table(table)?;
        let file = catalog.file(table)?;
        normalize(&mut conds, table);
        Ok(Self {
            cols: meta.cols.clone(),
            len: meta.record_size(),
            conds,
            file,
            ctx,
            scan: None,
            rid: Rid::INVALID,
        })
    }

    fn open(&mut self) -> Result<(), ExecutorError> {
        let mut scan = RecordScan::new(self.file)?;
        self.rid = seek_qualifying(&mut scan, self.file, self.ctx, &self.conds, &self.cols)?;
        self.scan = Some(scan);
        Ok(())
    }

    fn next_tuple(&mut self) -> Result<(), ExecutorError> {
        let Some(scan) = self.scan.as_mut() else {
            return Ok(());
        };
        if scan.is_end() {
            return Ok(());
        }
        scan.next()?;
        self.rid = seek_qualifying(scan, self.file, self.ctx, &self.conds, &self.cols)?;
        Ok(())
    }

    fn current(&self) -> Result<Record, ExecutorError> {
        Ok(self.file.get_record(self.rid, self.ctx)?)
    }

    fn end(&self) -> bool {
        self.scan.as_ref().map_or(true, |s| s.is_end())
    }
}

/// Index-order scan: walks the index from its first to one past its
/// last entry and applies the residual predicates to each fetched
/// record.
///
/// Tightening the iterator range from equality or range conditions is
/// an optimization the planner may add later; correctness does not
/// depend on it because every condition stays in the residual set.
pub struct IndexScan<'a, F: TableFile, I: IndexFile> {
    cols: Vec<ColumnMeta>,
    len: usize,
    conds: Vec<Condition>,
    file: &'a F,
    index: &'a I,
    ctx: &'a Context<'a>,
    cursor: Option<I::Cursor>,
    rid: Rid,
}

impl<'a, F: TableFile, I: IndexFile> IndexScan<'a, F, I> {
    /// Creates a scan of `table` in the key order of its index over
    /// `index_cols`.
    pub fn new(
        catalog: &'a SystemCatalog<F, I>,
        table: &str,
        mut conds: Vec<Condition>,
        index_cols: &[&str],
        ctx: &'a Context<'a>,
    ) -> Result<Self, ExecutorError> {
        let meta = catalog.table(table)?;
        let index_meta =
            meta.index_on(index_cols)
                .ok_or_else(|| ExecutorError::IndexNotFound {
                    table: table.to_string(),
                    columns: index_cols.join(", "),
                })?;
        let index = catalog.index(&index_meta.name)?;
        let file = catalog.file(table)?;
        normalize(&mut conds, table);
        Ok(Self {
            cols: meta.cols.clone(),
            len: meta.record_size(),
            conds,
            file,
            index,
            ctx,
            cursor: None,
            rid: Rid::INVALID,
        })
    }

    fn open(&mut self) -> Result<(), ExecutorError> {
        let mut cursor = self
            .index
            .scan(self.index.leaf_begin(), self.index.leaf_end());
        self.rid = seek_qualifying(&mut cursor, self.file, self.ctx, &self.conds, &self.cols)?;
        self.cursor = Some(cursor);
        Ok(())
    }

    fn next_tuple(&mut self) -> Result<(), ExecutorError> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(());
        };
        if cursor.is_end() {
            return Ok(());
        }
        cursor.next()?;
        self.rid = seek_qualifying(cursor, self.file, self.ctx, &self.conds, &self.cols)?;
        Ok(())
    }

    fn current(&self) -> Result<Record, ExecutorError> {
        Ok(self.file.get_record(self.rid, self.ctx)?)
    }

    fn end(&self) -> bool {
        self.cursor.as_ref().map_or(true, |c| c.is_end())
    }
}

/// Projection: narrows and reorders the child's columns.
///
/// Output offsets are assigned contiguously in the order the columns
/// were selected.
pub struct Projection<'a, F: TableFile, I: IndexFile> {
    child: Box<ExecutorNode<'a, F, I>>,
    cols: Vec<ColumnMeta>,
    len: usize,
    sel: Vec<usize>,
}

impl<'a, F: TableFile, I: IndexFile> Projection<'a, F, I> {
    /// Creates a projection of `sel_cols` over `child`.
    pub fn new(
        child: ExecutorNode<'a, F, I>,
        sel_cols: &[TableColumn],
    ) -> Result<Self, ExecutorError> {
        let child_cols = child.columns();
        let mut cols = Vec::with_capacity(sel_cols.len());
        let mut sel = Vec::with_capacity(sel_cols.len());
        let mut offset = 0;
        for sel_col in sel_cols {
            let pos = find_column_index(child_cols, sel_col)?;
            let mut col = child_cols[pos].clone();
            col.offset = offset;
            offset += col.len;
            cols.push(col);
            sel.push(pos);
        }
        Ok(Self {
            child: Box::new(child),
            cols,
            len: offset,
            sel,
        })
    }

    fn current(&self) -> Result<Record, ExecutorError> {
        let src = self.child.current()?;
        let child_cols = self.child.columns();
        let mut out = Record::zeroed(self.len);
        for (out_col, &pos) in self.cols.iter().zip(&self.sel) {
            let src_col = &child_cols[pos];
            out.write(out_col.offset, src.field(src_col.offset, src_col.len));
        }
        Ok(out)
    }
}

/// One resolved join condition: a left-schema column compared against
/// a right-schema column. Offsets are relative to each child's own
/// rows.
struct JoinCondition {
    left: ColumnMeta,
    right: ColumnMeta,
    op: CompOp,
}

/// Nested-loop join: for every left row, the right child is scanned
/// from the top (its `open()` rewinds it after exhaustion).
///
/// The output row is the left payload followed by the right payload;
/// the output schema shifts the right child's offsets accordingly.
pub struct NestedLoopJoin<'a, F: TableFile, I: IndexFile> {
    left: Box<ExecutorNode<'a, F, I>>,
    right: Box<ExecutorNode<'a, F, I>>,
    cols: Vec<ColumnMeta>,
    len: usize,
    left_len: usize,
    joins: Vec<JoinCondition>,
    end: bool,
}

impl<'a, F: TableFile, I: IndexFile> NestedLoopJoin<'a, F, I> {
    /// Creates a join of `left` and `right` under `conds`.
    ///
    /// Each condition must compare one column from each side, same
    /// type on both; a condition written right-to-left is flipped into
    /// place with its operator mirrored.
    pub fn new(
        left: ExecutorNode<'a, F, I>,
        right: ExecutorNode<'a, F, I>,
        conds: Vec<Condition>,
    ) -> Result<Self, ExecutorError> {
        let left_len = left.tuple_len();
        let mut cols = left.columns().to_vec();
        for col in right.columns() {
            let mut col = col.clone();
            col.offset += left_len;
            cols.push(col);
        }
        let len = left_len + right.tuple_len();

        let mut joins = Vec::with_capacity(conds.len());
        for cond in &conds {
            let CondRhs::Column(rhs) = &cond.rhs else {
                return Err(ExecutorError::Unsupported(
                    "join conditions must compare a column from each side".to_string(),
                ));
            };
            let (lcol, rcol, op) = match (
                find_column(left.columns(), &cond.lhs),
                find_column(right.columns(), rhs),
            ) {
                (Ok(l), Ok(r)) => (l, r, cond.op),
                _ => {
                    // Written right-to-left; mirror it.
                    let l = find_column(left.columns(), rhs)?;
                    let r = find_column(right.columns(), &cond.lhs)?;
                    (l, r, cond.op.mirrored())
                }
            };
            if lcol.ty != rcol.ty {
                return Err(ExecutorError::TypeMismatch {
                    expected: lcol.ty,
                    found: rcol.ty,
                });
            }
            joins.push(JoinCondition {
                left: lcol.clone(),
                right: rcol.clone(),
                op,
            });
        }

        Ok(Self {
            left: Box::new(left),
            right: Box::new(right),
            cols,
            len,
            left_len,
            joins,
            end: false,
        })
    }

    fn open(&mut self) -> Result<(), ExecutorError> {
        self.left.open()?;
        self.right.open()?;
        self.end = false;
        self.advance_to_match()
    }

    fn next_tuple(&mut self) -> Result<(), ExecutorError> {
        if self.end {
            return Ok(());
        }
        self.right.next_tuple()?;
        self.advance_to_match()
    }

    /// Advances the cursor pair until it rests on a combination that
    /// satisfies every join condition, rewinding the right child each
    /// time it exhausts.
    fn advance_to_match(&mut self) -> Result<(), ExecutorError> {
        loop {
            if self.left.end() {
                self.end = true;
                return Ok(());
            }
            while !self.right.end() {
                if self.matches_current()? {
                    return Ok(());
                }
                self.right.next_tuple()?;
            }
            self.left.next_tuple()?;
            if self.left.end() {
                self.end = true;
                return Ok(());
            }
            self.right.open()?;
        }
    }

    fn matches_current(&self) -> Result<bool, ExecutorError> {
        if self.joins.is_empty() {
            return Ok(true);
        }
        let left_rec = self.left.current()?;
        let right_rec = self.right.current()?;
        for jc in &self.joins {
            let l = left_rec.field(jc.left.offset, jc.left.len);
            let r = right_rec.field(jc.right.offset, jc.right.len);
            let ord = crate::datum::compare(l, r, jc.left.ty, jc.left.len);
            if !jc.op.matches(ord) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn current(&self) -> Result<Record, ExecutorError> {
        let left_rec = self.left.current()?;
        let right_rec = self.right.current()?;
        let mut out = Record::zeroed(self.len);
        out.write(0, left_rec.as_slice());
        out.write(self.left_len, right_rec.as_slice());
        Ok(out)
    }
}
