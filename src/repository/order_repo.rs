// ==========================================
// 薄膜生产管理系统 - 生产工单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::types::{OrderStatus, PriorityLevel};
use crate::domain::ProductionOrder;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ProductionOrderRepository - 生产工单仓储
// ==========================================
pub struct ProductionOrderRepository {
    conn: Arc<Mutex<Connection>>,
}

const ORDER_COLUMNS_PREFIXED: &str = r#"
    o.order_id, o.customer_order_id, o.product_type,
    o.quantity_required_kg, o.produced_kg, o.priority, o.status, o.created_at
"#;

impl ProductionOrderRepository {
    /// 从共享连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> SqliteResult<ProductionOrder> {
        let priority_str: String = row.get(5)?;
        let status_str: String = row.get(6)?;
        Ok(ProductionOrder {
            order_id: row.get(0)?,
            customer_order_id: row.get(1)?,
            product_type: row.get(2)?,
            quantity_required_kg: row.get(3)?,
            produced_kg: row.get(4)?,
            // 非法枚举值降级为保守默认, 不让读路径报错
            priority: PriorityLevel::parse(&priority_str).unwrap_or(PriorityLevel::Normal),
            status: OrderStatus::parse(&status_str).unwrap_or(OrderStatus::Cancelled),
            created_at: row.get::<_, DateTime<Utc>>(7)?,
        })
    }

    /// 查询全部工单 (按创建时间升序)
    pub fn list_all(&self) -> RepositoryResult<Vec<ProductionOrder>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM production_order o ORDER BY o.created_at, o.order_id",
            ORDER_COLUMNS_PREFIXED
        ))?;

        let orders = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<ProductionOrder>>>()?;
        Ok(orders)
    }

    /// 查询未分配的待生产工单 (按创建时间升序)
    ///
    /// 条件: PENDING 状态, 剩余量 > 0, 且不在任何机台队列中
    pub fn list_unassigned_pending(&self) -> RepositoryResult<Vec<ProductionOrder>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM production_order o
            LEFT JOIN machine_queue q ON q.order_id = o.order_id
            WHERE q.entry_id IS NULL
              AND o.status = 'PENDING'
              AND o.quantity_required_kg - o.produced_kg > 0
            ORDER BY o.created_at, o.order_id
            "#,
            ORDER_COLUMNS_PREFIXED
        ))?;

        let orders = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<ProductionOrder>>>()?;
        Ok(orders)
    }

    /// 查询指定机台队列中的工单 (按队列位置升序)
    pub fn list_queued_by_machine(&self, machine_id: &str) -> RepositoryResult<Vec<ProductionOrder>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM production_order o
            JOIN machine_queue q ON q.order_id = o.order_id
            WHERE q.machine_id = ?1
            ORDER BY q.position
            "#,
            ORDER_COLUMNS_PREFIXED
        ))?;

        let orders = stmt
            .query_map(params![machine_id], Self::map_row)?
            .collect::<SqliteResult<Vec<ProductionOrder>>>()?;
        Ok(orders)
    }

    /// 按编号查询工单
    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<ProductionOrder>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM production_order o WHERE o.order_id = ?1",
            ORDER_COLUMNS_PREFIXED
        ))?;

        let order = stmt.query_row(params![order_id], Self::map_row).optional()?;
        Ok(order)
    }

    /// 插入或更新工单 (外部同步/测试夹具)
    pub fn upsert(&self, order: &ProductionOrder) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO production_order (
                order_id, customer_order_id, product_type,
                quantity_required_kg, produced_kg, priority, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                order.order_id,
                order.customer_order_id,
                order.product_type,
                order.quantity_required_kg,
                order.produced_kg,
                order.priority.to_db_str(),
                order.status.to_db_str(),
                order.created_at,
            ],
        )?;
        Ok(())
    }
}
