// ==========================================
// 机台队列仓储集成测试
// ==========================================
// 测试目标: 验证队列位置稠密性、重复分配兜底与批量提交报告
// ==========================================


use film_aps::logging;
use film_aps::repository::queue_repo::ApplyItem;
use film_aps::repository::{
    MachineQueueRepository, MachineRepository, ProductionOrderRepository, RepositoryError,
};

struct QueueTestContext {
    _temp_file: tempfile::NamedTempFile,
    machine_repo: MachineRepository,
    order_repo: ProductionOrderRepository,
    queue_repo: MachineQueueRepository,
}

/// 建库并预置两台机台 + 五张工单
fn setup() -> QueueTestContext {
    logging::init_test();

    let (temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let conn = test_helpers::open_shared_connection(&db_path).expect("Failed to open db");

    let machine_repo = MachineRepository::from_connection(conn.clone());
    let order_repo = ProductionOrderRepository::from_connection(conn.clone());
    let queue_repo = MachineQueueRepository::from_connection(conn.clone());

    test_helpers::seed_machines(
        &machine_repo,
        &[
            test_helpers::make_machine("machine_A", 500.0),
            test_helpers::make_machine("machine_B", 500.0),
        ],
    )
    .expect("Failed to seed machines");

    test_helpers::seed_orders(
        &order_repo,
        &[
            test_helpers::make_order("order_1", 100.0, 0),
            test_helpers::make_order("order_2", 100.0, 1),
            test_helpers::make_order("order_3", 100.0, 2),
            test_helpers::make_order("order_4", 100.0, 3),
            test_helpers::make_order("order_7", 100.0, 4),
        ],
    )
    .expect("Failed to seed orders");

    QueueTestContext {
        _temp_file: temp_file,
        machine_repo,
        order_repo,
        queue_repo,
    }
}

/// 断言机台队列的 (order_id, position) 序列
fn assert_queue(ctx: &QueueTestContext, machine_id: &str, expected: &[(&str, i64)]) {
    let entries = ctx
        .queue_repo
        .list_by_machine(machine_id)
        .expect("Failed to list queue");
    let actual: Vec<(String, i64)> = entries
        .iter()
        .map(|e| (e.order_id.clone(), e.position))
        .collect();
    let expected: Vec<(String, i64)> = expected
        .iter()
        .map(|(o, p)| (o.to_string(), *p))
        .collect();
    assert_eq!(actual, expected);
}

// ==========================================
// 测试用例
// ==========================================

#[test]
fn test_assign_appends_with_dense_positions() {
    let ctx = setup();

    let e1 = ctx
        .queue_repo
        .assign("order_1", "machine_A", None, "tester")
        .expect("assign order_1");
    let e2 = ctx
        .queue_repo
        .assign("order_2", "machine_A", None, "tester")
        .expect("assign order_2");

    assert_eq!(e1.position, 0);
    assert_eq!(e2.position, 1);
    assert_queue(&ctx, "machine_A", &[("order_1", 0), ("order_2", 1)]);
}

#[test]
fn test_assign_at_position_shifts_existing_entries() {
    let ctx = setup();

    ctx.queue_repo
        .assign("order_1", "machine_A", None, "tester")
        .expect("assign order_1");
    ctx.queue_repo
        .assign("order_2", "machine_A", None, "tester")
        .expect("assign order_2");

    // 插到队首, 原有条目整体后移
    let e3 = ctx
        .queue_repo
        .assign("order_3", "machine_A", Some(0), "tester")
        .expect("assign order_3");
    assert_eq!(e3.position, 0);
    assert_queue(
        &ctx,
        "machine_A",
        &[("order_3", 0), ("order_1", 1), ("order_2", 2)],
    );
}

#[test]
fn test_assign_rejects_out_of_range_position() {
    let ctx = setup();

    ctx.queue_repo
        .assign("order_1", "machine_A", None, "tester")
        .expect("assign order_1");

    // 队列长度 1, position=5 越界
    let result = ctx
        .queue_repo
        .assign("order_2", "machine_A", Some(5), "tester");
    match result {
        Err(RepositoryError::InvalidPosition {
            position,
            queue_len,
        }) => {
            assert_eq!(position, 5);
            assert_eq!(queue_len, 1);
        }
        other => panic!("Expected InvalidPosition, got {:?}", other),
    }

    // 失败不留痕
    assert_queue(&ctx, "machine_A", &[("order_1", 0)]);
}

#[test]
fn test_duplicate_assignment_across_machines_is_rejected() {
    let ctx = setup();

    ctx.queue_repo
        .assign("order_7", "machine_A", None, "tester")
        .expect("assign order_7");

    // 同一工单换机台再分配 → 拒绝, 报告占用机台
    let result = ctx
        .queue_repo
        .assign("order_7", "machine_B", None, "tester");
    match result {
        Err(RepositoryError::DuplicateAssignment {
            order_id,
            machine_id,
        }) => {
            assert_eq!(order_id, "order_7");
            assert_eq!(machine_id, "machine_A");
        }
        other => panic!("Expected DuplicateAssignment, got {:?}", other),
    }

    assert_queue(&ctx, "machine_A", &[("order_7", 0)]);
    assert_queue(&ctx, "machine_B", &[]);
}

#[test]
fn test_remove_keeps_positions_dense() {
    let ctx = setup();

    ctx.queue_repo
        .assign("order_1", "machine_A", None, "tester")
        .expect("assign order_1");
    let e2 = ctx
        .queue_repo
        .assign("order_2", "machine_A", None, "tester")
        .expect("assign order_2");
    ctx.queue_repo
        .assign("order_3", "machine_A", None, "tester")
        .expect("assign order_3");

    // 移除中间条目, 后续条目前移
    ctx.queue_repo.remove(&e2.entry_id).expect("remove order_2");
    assert_queue(&ctx, "machine_A", &[("order_1", 0), ("order_3", 1)]);

    // 移除后可重新分配
    ctx.queue_repo
        .assign("order_2", "machine_B", None, "tester")
        .expect("re-assign order_2");
    assert_queue(&ctx, "machine_B", &[("order_2", 0)]);
}

#[test]
fn test_remove_unknown_entry_is_not_found() {
    let ctx = setup();

    let result = ctx.queue_repo.remove("no-such-entry");
    assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
}

#[test]
fn test_reorder_moves_entry_down_and_up() {
    let ctx = setup();

    let e1 = ctx
        .queue_repo
        .assign("order_1", "machine_A", None, "tester")
        .expect("assign order_1");
    ctx.queue_repo
        .assign("order_2", "machine_A", None, "tester")
        .expect("assign order_2");
    ctx.queue_repo
        .assign("order_3", "machine_A", None, "tester")
        .expect("assign order_3");

    // 下移: 0 → 2, 中间区间前移
    ctx.queue_repo
        .reorder(&e1.entry_id, 2)
        .expect("reorder down");
    assert_queue(
        &ctx,
        "machine_A",
        &[("order_2", 0), ("order_3", 1), ("order_1", 2)],
    );

    // 上移: 2 → 0, 中间区间后移
    ctx.queue_repo.reorder(&e1.entry_id, 0).expect("reorder up");
    assert_queue(
        &ctx,
        "machine_A",
        &[("order_1", 0), ("order_2", 1), ("order_3", 2)],
    );
}

#[test]
fn test_reorder_rejects_out_of_range_position() {
    let ctx = setup();

    let e1 = ctx
        .queue_repo
        .assign("order_1", "machine_A", None, "tester")
        .expect("assign order_1");

    // 队列长度 1, 合法位置只有 0
    let result = ctx.queue_repo.reorder(&e1.entry_id, 1);
    assert!(matches!(
        result,
        Err(RepositoryError::InvalidPosition {
            position: 1,
            queue_len: 1,
        })
    ));

    // 原位重排是空操作
    ctx.queue_repo.reorder(&e1.entry_id, 0).expect("no-op reorder");
    assert_queue(&ctx, "machine_A", &[("order_1", 0)]);
}

#[test]
fn test_apply_reports_per_item_outcome() {
    let ctx = setup();

    // order_7 预先被人工占用
    ctx.queue_repo
        .assign("order_7", "machine_B", None, "tester")
        .expect("pre-assign order_7");

    let items = vec![
        ApplyItem {
            order_id: "order_1".to_string(),
            machine_id: "machine_A".to_string(),
        },
        ApplyItem {
            order_id: "order_7".to_string(),
            machine_id: "machine_A".to_string(),
        },
        ApplyItem {
            order_id: "order_2".to_string(),
            machine_id: "machine_A".to_string(),
        },
    ];

    let outcome = ctx
        .queue_repo
        .apply(&items, "distribution")
        .expect("apply plan");

    // 失败条目不中断后续条目
    assert!(!outcome.is_full_success());
    assert_eq!(outcome.applied.len(), 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].order_id, "order_7");
    assert_eq!(outcome.failures[0].machine_id, "machine_A");
    assert!(outcome.failures[0].reason.contains("machine_B"));

    // 成功条目位置稠密
    assert_queue(&ctx, "machine_A", &[("order_1", 0), ("order_2", 1)]);

    // 工单明细按队列位置可取
    let queued = ctx
        .order_repo
        .list_queued_by_machine("machine_A")
        .expect("list queued");
    assert_eq!(queued.len(), 2);
    assert_eq!(queued[0].order_id, "order_1");

    // 机台目录不受队列操作影响
    let machines = ctx.machine_repo.list_all().expect("list machines");
    assert_eq!(machines.len(), 2);
}
