// ==========================================
// 薄膜生产管理系统 - 机台队列 API
// ==========================================
// 职责:
// - 人工队列操作 (分配/重排/移除/查询) 的入口
// - 机台与工单的存在性校验在此层完成, 位置合法性
//   与重复分配由队列仓储在事务内裁决
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::{MachineQueueEntry, ProductionOrder};
use crate::repository::{MachineQueueRepository, MachineRepository, ProductionOrderRepository};

// ==========================================
// 出参结构
// ==========================================

/// 队列项视图 (队列项 + 工单明细)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntryView {
    pub entry_id: String,
    pub machine_id: String,
    pub position: i64,
    pub assigned_at: String,
    pub assigned_by: String,
    pub order: ProductionOrder,
}

// ==========================================
// QueueApi - 机台队列 API
// ==========================================
pub struct QueueApi {
    machine_repo: Arc<MachineRepository>,
    order_repo: Arc<ProductionOrderRepository>,
    queue_repo: Arc<MachineQueueRepository>,
}

impl QueueApi {
    pub fn new(
        machine_repo: Arc<MachineRepository>,
        order_repo: Arc<ProductionOrderRepository>,
        queue_repo: Arc<MachineQueueRepository>,
    ) -> Self {
        Self {
            machine_repo,
            order_repo,
            queue_repo,
        }
    }

    /// 人工分配工单到机台队列
    ///
    /// # 参数
    /// - `position`: 插入位置; None 表示追加到队尾
    ///
    /// # 错误
    /// - `NotFound`: 机台或工单不存在
    /// - `InvalidInput`: 工单不可分配 (非 PENDING 或剩余量为 0)
    /// - `DuplicateAssignment` / `InvalidPosition`: 由仓储裁决
    pub fn assign_to_queue(
        &self,
        order_id: &str,
        machine_id: &str,
        position: Option<i64>,
        assigned_by: &str,
    ) -> ApiResult<MachineQueueEntry> {
        let machine = self
            .machine_repo
            .find_by_id(machine_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Machine(id={})不存在", machine_id)))?;
        let order = self
            .order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ProductionOrder(id={})不存在", order_id)))?;

        if !order.is_assignable() {
            return Err(ApiError::InvalidInput(format!(
                "工单{}不可分配: status={}, 剩余量={}kg",
                order_id,
                order.status,
                order.remaining_kg()
            )));
        }

        let entry = self
            .queue_repo
            .assign(order_id, machine_id, position, assigned_by)?;

        info!(
            order_id,
            machine_id = %machine.machine_id,
            position = entry.position,
            assigned_by,
            "人工分配完成"
        );
        Ok(entry)
    }

    /// 调整队列项位置
    pub fn reorder_queue(&self, entry_id: &str, new_position: i64) -> ApiResult<()> {
        self.queue_repo.reorder(entry_id, new_position)?;
        info!(entry_id, new_position, "队列重排完成");
        Ok(())
    }

    /// 从队列移除工单
    pub fn remove_from_queue(&self, entry_id: &str) -> ApiResult<()> {
        self.queue_repo.remove(entry_id)?;
        info!(entry_id, "队列项移除完成");
        Ok(())
    }

    /// 查询指定机台队列 (按位置升序, 含工单明细)
    ///
    /// # 错误
    /// - `NotFound`: 机台不存在
    pub fn list_machine_queue(&self, machine_id: &str) -> ApiResult<Vec<QueueEntryView>> {
        self.machine_repo
            .find_by_id(machine_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Machine(id={})不存在", machine_id)))?;

        let entries = self.queue_repo.list_by_machine(machine_id)?;

        let mut views = Vec::with_capacity(entries.len());
        for entry in entries {
            let order = self
                .order_repo
                .find_by_id(&entry.order_id)?
                .ok_or_else(|| {
                    ApiError::InternalError(format!(
                        "队列项{}引用的工单{}不存在",
                        entry.entry_id, entry.order_id
                    ))
                })?;
            views.push(QueueEntryView {
                entry_id: entry.entry_id,
                machine_id: entry.machine_id,
                position: entry.position,
                assigned_at: entry.assigned_at.to_rfc3339(),
                assigned_by: entry.assigned_by,
                order,
            });
        }
        Ok(views)
    }
}
