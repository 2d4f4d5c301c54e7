// ==========================================
// 薄膜生产管理系统 - 分配预览引擎
// ==========================================
// 职责: 对只读快照执行规划并产出"当前 vs 方案后"的对比视图
// 红线: 预览不落库, 可任意重试
// ==========================================

use crate::domain::{CapacityStatus, Machine, ProductionOrder};
use crate::engine::capacity_model::CapacityModel;
use crate::engine::planner::{DistributionPlan, PlannedAssignment};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// MachinePreview - 单机台预览
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachinePreview {
    pub machine_id: String,
    pub machine_name: String,
    pub current_load_kg: f64,          // 方案前负载
    pub projected_load_kg: f64,        // 方案后负载
    pub current_utilization_pct: f64,
    pub projected_utilization_pct: f64,
    pub current_status: CapacityStatus,
    pub projected_status: CapacityStatus,
    pub proposed_orders: Vec<PlannedAssignment>, // 本方案新增的工单
}

// ==========================================
// DistributionPreview - 预览结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionPreview {
    pub total_orders: usize,          // 参与规划的未分配工单数
    pub machine_count: usize,         // ACTIVE 机台数
    pub efficiency_pct: f64,          // 方案后总负载 / 总容量 × 100, 钳制 [0,100]
    pub per_machine: Vec<MachinePreview>,
}

// ==========================================
// PreviewBuilder - 预览构建引擎
// ==========================================
pub struct PreviewBuilder {
    capacity_model: CapacityModel,
}

impl PreviewBuilder {
    pub fn new() -> Self {
        Self {
            capacity_model: CapacityModel::new(),
        }
    }

    /// 由规划结果构建预览视图
    ///
    /// efficiency 为方案后总分配质量 (现有 + 新增) 对 ACTIVE 机台
    /// 总容量的占比, 是粗粒度的"方案后利用率"指示, 不是最优性界;
    /// 总容量为 0 时取 0
    ///
    /// # 参数
    /// - `machines`: 全量机台
    /// - `queued`: 机台编号 → 现有排队工单
    /// - `total_orders`: 参与规划的未分配工单数
    /// - `plan`: 规划结果
    pub fn build(
        &self,
        machines: &[Machine],
        queued: &HashMap<String, Vec<ProductionOrder>>,
        total_orders: usize,
        plan: &DistributionPlan,
    ) -> DistributionPreview {
        let active: Vec<&Machine> = machines.iter().filter(|m| m.is_active()).collect();

        let mut per_machine = Vec::with_capacity(active.len());
        let mut total_load_kg = 0.0;
        let mut total_capacity_kg = 0.0;

        for machine in &active {
            let existing = queued
                .get(&machine.machine_id)
                .map(|v| v.as_slice())
                .unwrap_or(&[]);
            let current = self.capacity_model.compute(machine, existing);

            let proposed_orders: Vec<PlannedAssignment> = plan
                .assignments_for(&machine.machine_id)
                .cloned()
                .collect();
            let proposed_kg: f64 = proposed_orders.iter().map(|a| a.remaining_kg).sum();

            let projected_load_kg = current.current_load_kg + proposed_kg;
            let projected_utilization_pct = if machine.max_capacity_kg > 0.0 {
                projected_load_kg / machine.max_capacity_kg * 100.0
            } else {
                0.0
            };

            total_load_kg += projected_load_kg;
            total_capacity_kg += machine.max_capacity_kg;

            per_machine.push(MachinePreview {
                machine_id: machine.machine_id.clone(),
                machine_name: machine.name.clone(),
                current_load_kg: current.current_load_kg,
                projected_load_kg,
                current_utilization_pct: current.utilization_pct,
                projected_utilization_pct,
                current_status: current.capacity_status,
                projected_status: CapacityStatus::from_utilization(projected_utilization_pct),
                proposed_orders,
            });
        }

        let efficiency_pct = if total_capacity_kg > 0.0 {
            (total_load_kg / total_capacity_kg * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        DistributionPreview {
            total_orders,
            machine_count: active.len(),
            efficiency_pct,
            per_machine,
        }
    }
}

impl Default for PreviewBuilder {
    fn default() -> Self {
        Self::new()
    }
}
