//! End-to-end executor scenarios over the in-memory engine.
//!
//! These tests drive the full stack the way a session would: a
//! catalog with tables and indexes, transactions from the transaction
//! manager, operators reading through the lock manager, and
//! commit/abort finishing the work.

use std::sync::Arc;

use granite::catalog::{SystemCatalog, TableMeta};
use granite::datum::{ColType, Value};
use granite::executor::{
    execute_delete, execute_insert, execute_update, CompOp, Condition, ExecutorError,
    ExecutorNode, IndexScan, NestedLoopJoin, Projection, SeqScan, SetClause, TableColumn,
};
use granite::heap::{HeapError, MemoryTable, Rid, TableFile};
use granite::index::MemoryIndex;
use granite::tx::{Context, LockError, LockManager, TransactionManager, TxnState};

type MemCatalog = SystemCatalog<MemoryTable, MemoryIndex>;
type MemManager = TransactionManager<MemoryTable, MemoryIndex>;

fn engine() -> (Arc<MemCatalog>, MemManager) {
    let mut catalog = SystemCatalog::new();
    catalog
        .create_table(
            TableMeta::new("users")
                .add_column("id", ColType::Int, 0)
                .add_column("name", ColType::Str, 8),
        )
        .unwrap();
    catalog.create_index("users", &["id"]).unwrap();
    catalog
        .create_table(
            TableMeta::new("orders")
                .add_column("user_id", ColType::Int, 0)
                .add_column("amount", ColType::Int, 0),
        )
        .unwrap();

    let catalog = Arc::new(catalog);
    let manager = TransactionManager::new(catalog.clone(), Arc::new(LockManager::new()));
    (catalog, manager)
}

fn insert_user(catalog: &MemCatalog, ctx: &Context<'_>, id: i32, name: &str) -> Rid {
    execute_insert(
        catalog,
        "users",
        &[Value::Int(id), Value::Str(name.to_string())],
        ctx,
    )
    .unwrap()
    .rid
}

fn insert_order(catalog: &MemCatalog, ctx: &Context<'_>, user_id: i32, amount: i32) {
    execute_insert(
        catalog,
        "orders",
        &[Value::Int(user_id), Value::Int(amount)],
        ctx,
    )
    .unwrap();
}

fn column_i32(node: &ExecutorNode<'_, MemoryTable, MemoryIndex>, name: &str, rec: &granite::heap::Record) -> i32 {
    let col = node
        .columns()
        .iter()
        .find(|c| c.name == name)
        .expect("column present");
    i32::from_le_bytes(rec.field(col.offset, col.len).try_into().unwrap())
}

#[test]
fn seq_scan_over_empty_table_is_immediately_at_end() {
    let (catalog, manager) = engine();
    let txn = manager.begin();
    let ctx = Context::new(&txn, manager.lock_manager());

    let mut node: ExecutorNode<'_, MemoryTable, MemoryIndex> =
        ExecutorNode::SeqScan(SeqScan::new(&catalog, "users", vec![], &ctx).unwrap());
    node.open().unwrap();
    assert!(node.end());
    manager.commit(&txn).unwrap();
}

#[test]
fn seq_scan_filters_and_locks_rows() {
    let (catalog, manager) = engine();
    let writer = manager.begin();
    let wctx = Context::new(&writer, manager.lock_manager());
    insert_user(&catalog, &wctx, 1, "a");
    insert_user(&catalog, &wctx, 2, "b");
    insert_user(&catalog, &wctx, 3, "a");
    manager.commit(&writer).unwrap();

    let reader = manager.begin();
    let rctx = Context::new(&reader, manager.lock_manager());
    let conds = vec![Condition::with_literal(
        TableColumn::unqualified("name"),
        CompOp::Eq,
        Value::Str("a".to_string()),
    )];
    let mut node = ExecutorNode::SeqScan(SeqScan::new(&catalog, "users", conds, &rctx).unwrap());

    let mut ids = Vec::new();
    node.open().unwrap();
    while !node.end() {
        let rec = node.current().unwrap();
        ids.push(column_i32(&node, "id", &rec));
        node.next_tuple().unwrap();
    }
    assert_eq!(ids, vec![1, 3]);

    // The scan locked what it read: shared record locks are on file.
    assert!(!reader.held_locks().is_empty());
    manager.commit(&reader).unwrap();
    assert!(manager.lock_manager().is_clean());
}

#[test]
fn projection_reorders_columns_end_to_end() {
    let (catalog, manager) = engine();
    let txn = manager.begin();
    let ctx = Context::new(&txn, manager.lock_manager());
    insert_user(&catalog, &ctx, 1, "a");

    let scan: ExecutorNode<'_, MemoryTable, MemoryIndex> =
        ExecutorNode::SeqScan(SeqScan::new(&catalog, "users", vec![], &ctx).unwrap());
    let mut node = ExecutorNode::Projection(
        Projection::new(
            scan,
            &[
                TableColumn::unqualified("name"),
                TableColumn::unqualified("id"),
            ],
        )
        .unwrap(),
    );

    node.open().unwrap();
    let rec = node.current().unwrap();
    assert_eq!(rec.as_slice().len(), 12);
    assert_eq!(rec.field(0, 8), b"a\0\0\0\0\0\0\0");
    assert_eq!(rec.field(8, 4), &1i32.to_le_bytes());
    manager.commit(&txn).unwrap();
}

#[test]
fn index_scan_joined_with_seq_scan() {
    let (catalog, manager) = engine();
    let txn = manager.begin();
    let ctx = Context::new(&txn, manager.lock_manager());
    insert_user(&catalog, &ctx, 2, "b");
    insert_user(&catalog, &ctx, 1, "a");
    insert_order(&catalog, &ctx, 1, 10);
    insert_order(&catalog, &ctx, 2, 20);
    insert_order(&catalog, &ctx, 2, 30);

    let users = ExecutorNode::IndexScan(
        IndexScan::new(&catalog, "users", vec![], &["id"], &ctx).unwrap(),
    );
    let orders = ExecutorNode::SeqScan(SeqScan::new(&catalog, "orders", vec![], &ctx).unwrap());
    let join_cond = vec![Condition::with_column(
        TableColumn::new("users", "id"),
        CompOp::Eq,
        TableColumn::new("orders", "user_id"),
    )];
    let mut node =
        ExecutorNode::NestedLoopJoin(NestedLoopJoin::new(users, orders, join_cond).unwrap());

    let mut pairs = Vec::new();
    node.open().unwrap();
    while !node.end() {
        let rec = node.current().unwrap();
        pairs.push((
            column_i32(&node, "id", &rec),
            column_i32(&node, "amount", &rec),
        ));
        node.next_tuple().unwrap();
    }
    // Outer side in index order (id 1 before id 2), inner in rid order.
    assert_eq!(pairs, vec![(1, 10), (2, 20), (2, 30)]);
    manager.commit(&txn).unwrap();
}

#[test]
fn update_then_delete_keeps_indexes_consistent() {
    let (catalog, manager) = engine();
    let txn = manager.begin();
    let ctx = Context::new(&txn, manager.lock_manager());
    let rid_a = insert_user(&catalog, &ctx, 1, "a");
    let rid_b = insert_user(&catalog, &ctx, 2, "b");

    let set = vec![SetClause {
        column: TableColumn::unqualified("id"),
        value: Value::Int(7),
    }];
    execute_update(&catalog, "users", &set, &[rid_a], &[], &ctx).unwrap();

    let index = catalog.index("users_id").unwrap();
    assert_eq!(index.get(&1i32.to_le_bytes()), None);
    assert_eq!(index.get(&7i32.to_le_bytes()), Some(rid_a));

    execute_delete(&catalog, "users", &[rid_a, rid_b], &ctx).unwrap();
    assert!(index.is_empty());
    manager.commit(&txn).unwrap();
}

#[test]
fn abort_restores_rows_and_index_entries() {
    let (catalog, manager) = engine();

    let setup = manager.begin();
    let sctx = Context::new(&setup, manager.lock_manager());
    let rid = insert_user(&catalog, &sctx, 1, "a");
    manager.commit(&setup).unwrap();

    let txn = manager.begin();
    let ctx = Context::new(&txn, manager.lock_manager());
    let set = vec![SetClause {
        column: TableColumn::unqualified("id"),
        value: Value::Int(9),
    }];
    execute_update(&catalog, "users", &set, &[rid], &[], &ctx).unwrap();
    insert_user(&catalog, &ctx, 5, "e");
    manager.abort(&txn).unwrap();
    assert_eq!(txn.state(), TxnState::Aborted);

    let probe = manager.begin();
    let pctx = Context::new(&probe, manager.lock_manager());
    let index = catalog.index("users_id").unwrap();
    assert_eq!(index.get(&1i32.to_le_bytes()), Some(rid));
    assert_eq!(index.get(&9i32.to_le_bytes()), None);
    assert_eq!(index.get(&5i32.to_le_bytes()), None);
    let rec = catalog.file("users").unwrap().get_record(rid, &pctx).unwrap();
    assert_eq!(rec.field(0, 4), &1i32.to_le_bytes());
    manager.commit(&probe).unwrap();
}

#[test]
fn writers_conflict_under_no_wait() {
    let (catalog, manager) = engine();

    let setup = manager.begin();
    let sctx = Context::new(&setup, manager.lock_manager());
    let rid = insert_user(&catalog, &sctx, 1, "a");
    manager.commit(&setup).unwrap();

    let t1 = manager.begin();
    let ctx1 = Context::new(&t1, manager.lock_manager());
    let set = vec![SetClause {
        column: TableColumn::unqualified("name"),
        value: Value::Str("x".to_string()),
    }];
    execute_update(&catalog, "users", &set, &[rid], &[], &ctx1).unwrap();

    // A second writer is refused immediately rather than blocking.
    let t2 = manager.begin();
    let ctx2 = Context::new(&t2, manager.lock_manager());
    let result = execute_delete(&catalog, "users", &[rid], &ctx2);
    assert!(matches!(
        result,
        Err(ExecutorError::Heap(HeapError::Lock(
            LockError::DeadlockPrevention(_)
        )))
    ));
    manager.abort(&t2).unwrap();

    // The surviving writer commits its change.
    manager.commit(&t1).unwrap();
    let probe = manager.begin();
    let pctx = Context::new(&probe, manager.lock_manager());
    let rec = catalog.file("users").unwrap().get_record(rid, &pctx).unwrap();
    assert_eq!(rec.field(4, 8), b"x\0\0\0\0\0\0\0");
    manager.commit(&probe).unwrap();
}

#[test]
fn scan_after_mutations_sees_only_surviving_rows() {
    let (catalog, manager) = engine();
    let txn = manager.begin();
    let ctx = Context::new(&txn, manager.lock_manager());

    let mut rids = Vec::new();
    for (id, name) in [(1, "a"), (2, "b"), (3, "c"), (4, "d")] {
        rids.push(insert_user(&catalog, &ctx, id, name));
    }
    execute_delete(&catalog, "users", &[rids[1], rids[3]], &ctx).unwrap();

    let mut node = ExecutorNode::SeqScan(SeqScan::new(&catalog, "users", vec![], &ctx).unwrap());
    let mut ids = Vec::new();
    node.open().unwrap();
    while !node.end() {
        let rec = node.current().unwrap();
        ids.push(column_i32(&node, "id", &rec));
        node.next_tuple().unwrap();
    }
    assert_eq!(ids, vec![1, 3]);
    manager.commit(&txn).unwrap();
}
