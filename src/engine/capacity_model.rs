// ==========================================
// 薄膜生产管理系统 - 产能计算引擎
// ==========================================
// 职责: 由机台与其排队工单计算负载/利用率/产能分桶
// 红线: 纯读计算, 不落库, 任何输入下不报错
// ==========================================

use crate::domain::{CapacitySnapshot, CapacityStatus, Machine, ProductionOrder};

// ==========================================
// CapacityModel - 产能计算引擎
// ==========================================
pub struct CapacityModel {
    // 无状态引擎, 不需要注入依赖
}

impl CapacityModel {
    pub fn new() -> Self {
        Self {}
    }

    /// 计算单机台产能快照
    ///
    /// 规则:
    /// - current_load = 排队工单未完成剩余量之和 (不重复计入已完成质量)
    /// - utilization = current_load / max_capacity × 100; 容量为 0 时取 0
    /// - 分桶阈值 40/70/90, 超过 90 一律 OVERLOADED
    ///
    /// # 参数
    /// - `machine`: 机台
    /// - `queued_orders`: 该机台当前排队的工单
    pub fn compute(&self, machine: &Machine, queued_orders: &[ProductionOrder]) -> CapacitySnapshot {
        let current_load_kg: f64 = queued_orders.iter().map(|o| o.remaining_kg()).sum();

        // 容量为 0 时利用率取 0 且分桶为 LOW, 不抛除零错误
        let utilization_pct = if machine.max_capacity_kg > 0.0 {
            (current_load_kg / machine.max_capacity_kg * 100.0).max(0.0)
        } else {
            0.0
        };

        CapacitySnapshot {
            machine_id: machine.machine_id.clone(),
            machine_name: machine.name.clone(),
            current_load_kg,
            max_capacity_kg: machine.max_capacity_kg,
            utilization_pct,
            capacity_status: CapacityStatus::from_utilization(utilization_pct),
            order_count: queued_orders.len(),
            production_rate_kg_h: machine.production_rate_kg_h,
        }
    }

    /// 批量计算产能快照
    ///
    /// # 参数
    /// - `machines_with_queues`: (机台, 排队工单) 列表
    ///
    /// # 返回
    /// 与输入同序的快照列表
    pub fn compute_all(
        &self,
        machines_with_queues: &[(Machine, Vec<ProductionOrder>)],
    ) -> Vec<CapacitySnapshot> {
        machines_with_queues
            .iter()
            .map(|(machine, orders)| self.compute(machine, orders))
            .collect()
    }
}

impl Default for CapacityModel {
    fn default() -> Self {
        Self::new()
    }
}
