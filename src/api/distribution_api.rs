// ==========================================
// 薄膜生产管理系统 - 智能分配 API
// ==========================================
// 职责:
// - 读取机台/工单/队列快照, 调用规划引擎产出预览或落库
// - 算法与权重的入参校验在此层完成, 引擎只吃合法输入
// 说明:
// - 预览与提交读取的是两次独立快照, 期间的人工操作
//   由队列仓储的重复检查兜底为逐条失败, 不会静默双重分配
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::types::DistributionAlgorithm;
use crate::domain::{DistributionParams, HybridWeights, Machine, ProductionOrder};
use crate::domain::CapacitySnapshot;
use crate::engine::{CapacityModel, DistributionPlan, DistributionPlanner, DistributionPreview, PreviewBuilder};
use crate::repository::queue_repo::{ApplyFailure, ApplyItem};
use crate::repository::{MachineQueueRepository, MachineRepository, ProductionOrderRepository};

// ==========================================
// 出参结构
// ==========================================

/// 分配提交结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyReport {
    /// 全部条目均成功落库
    pub success: bool,
    /// 成功落库的条目数
    pub assigned_count: usize,
    /// 失败明细 (工单/机台/原因)
    pub failures: Vec<ApplyFailure>,
}

/// 单条分配建议
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentSuggestion {
    pub order_id: String,
    pub machine_id: String,
}

// ==========================================
// DistributionApi - 智能分配 API
// ==========================================
pub struct DistributionApi {
    machine_repo: Arc<MachineRepository>,
    order_repo: Arc<ProductionOrderRepository>,
    queue_repo: Arc<MachineQueueRepository>,
    config_manager: Arc<ConfigManager>,
}

impl DistributionApi {
    pub fn new(
        machine_repo: Arc<MachineRepository>,
        order_repo: Arc<ProductionOrderRepository>,
        queue_repo: Arc<MachineQueueRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            machine_repo,
            order_repo,
            queue_repo,
            config_manager,
        }
    }

    // ==========================================
    // 入参解析
    // ==========================================

    /// 解析算法与权重入参
    ///
    /// - algorithm 为空串时回落配置的默认算法
    /// - 未知算法名与非法权重值直接拒绝 (InvalidInput)
    /// - 非 HYBRID 算法携带权重不报错, 引擎侧忽略
    fn resolve_params(
        &self,
        algorithm: &str,
        hybrid_weights: Option<HybridWeights>,
    ) -> ApiResult<DistributionParams> {
        let trimmed = algorithm.trim();
        let algo = if trimmed.is_empty() {
            self.config_manager
                .get_default_algorithm()
                .map_err(|e| ApiError::InternalError(format!("读取默认算法失败: {}", e)))?
        } else {
            DistributionAlgorithm::parse(trimmed).ok_or_else(|| {
                ApiError::InvalidInput(format!(
                    "未知分配算法: {} (可选: BALANCED/LOAD_BASED/PRIORITY/PRODUCT_TYPE/HYBRID)",
                    trimmed
                ))
            })?
        };

        if let Some(weights) = &hybrid_weights {
            if let Err((field, value)) = weights.validate() {
                return Err(ApiError::InvalidInput(format!(
                    "混合权重非法: {}={} (要求有限且非负)",
                    field, value
                )));
            }
        }

        let weights = match hybrid_weights {
            Some(w) => Some(w),
            None if algo == DistributionAlgorithm::Hybrid => Some(
                self.config_manager
                    .get_default_hybrid_weights()
                    .map_err(|e| ApiError::InternalError(format!("读取默认权重失败: {}", e)))?,
            ),
            None => None,
        };

        Ok(DistributionParams::new(algo, weights))
    }

    // ==========================================
    // 快照与规划
    // ==========================================

    /// 读取规划所需的只读快照
    ///
    /// # 返回
    /// (全量机台, 机台编号→排队工单, 未分配待产工单)
    #[allow(clippy::type_complexity)]
    fn load_snapshot(
        &self,
    ) -> ApiResult<(
        Vec<Machine>,
        HashMap<String, Vec<ProductionOrder>>,
        Vec<ProductionOrder>,
    )> {
        let machines = self.machine_repo.list_all()?;

        let mut queued: HashMap<String, Vec<ProductionOrder>> = HashMap::new();
        for machine in &machines {
            let orders = self.order_repo.list_queued_by_machine(&machine.machine_id)?;
            if !orders.is_empty() {
                queued.insert(machine.machine_id.clone(), orders);
            }
        }

        let unassigned = self.order_repo.list_unassigned_pending()?;
        Ok((machines, queued, unassigned))
    }

    fn plan_with(
        &self,
        params: DistributionParams,
    ) -> ApiResult<(
        Vec<Machine>,
        HashMap<String, Vec<ProductionOrder>>,
        Vec<ProductionOrder>,
        DistributionPlan,
    )> {
        let (machines, queued, unassigned) = self.load_snapshot()?;
        let planner = DistributionPlanner::new(params);
        let plan = planner.plan(&machines, &queued, &unassigned);
        Ok((machines, queued, unassigned, plan))
    }

    // ==========================================
    // 对外操作
    // ==========================================

    /// 分配预览 (只读, 不落库)
    ///
    /// # 参数
    /// - `algorithm`: 算法名; 空串回落配置默认
    /// - `hybrid_weights`: HYBRID 权重; None 时回落配置默认
    pub fn get_distribution_preview(
        &self,
        algorithm: &str,
        hybrid_weights: Option<HybridWeights>,
    ) -> ApiResult<DistributionPreview> {
        let params = self.resolve_params(algorithm, hybrid_weights)?;
        let algo = params.algorithm;
        let (machines, queued, unassigned, plan) = self.plan_with(params)?;

        let preview = PreviewBuilder::new().build(&machines, &queued, unassigned.len(), &plan);

        info!(
            algorithm = %algo,
            total_orders = preview.total_orders,
            machine_count = preview.machine_count,
            efficiency_pct = preview.efficiency_pct,
            "分配预览完成"
        );
        Ok(preview)
    }

    /// 执行分配并落库
    ///
    /// 重新读取快照规划后逐条提交; 单条失败不中断,
    /// 成功/失败明细完整返回
    pub fn apply_distribution(
        &self,
        algorithm: &str,
        hybrid_weights: Option<HybridWeights>,
        assigned_by: &str,
    ) -> ApiResult<ApplyReport> {
        let params = self.resolve_params(algorithm, hybrid_weights)?;
        let algo = params.algorithm;
        let (_machines, _queued, _unassigned, plan) = self.plan_with(params)?;

        let items: Vec<ApplyItem> = plan
            .assignments
            .iter()
            .map(|a| ApplyItem {
                order_id: a.order_id.clone(),
                machine_id: a.machine_id.clone(),
            })
            .collect();

        let outcome = self.queue_repo.apply(&items, assigned_by)?;
        let report = ApplyReport {
            success: outcome.is_full_success(),
            assigned_count: outcome.applied.len(),
            failures: outcome.failures,
        };

        info!(
            algorithm = %algo,
            assigned_count = report.assigned_count,
            failure_count = report.failures.len(),
            "分配提交完成"
        );
        Ok(report)
    }

    /// 单工单分配建议 (默认 LOAD_BASED)
    ///
    /// 为每个未分配工单给出建议机台, 不落库
    pub fn suggest_assignments(&self) -> ApiResult<Vec<AssignmentSuggestion>> {
        let params = DistributionParams::new(DistributionAlgorithm::LoadBased, None);
        let (_machines, _queued, _unassigned, plan) = self.plan_with(params)?;

        Ok(plan
            .assignments
            .iter()
            .map(|a| AssignmentSuggestion {
                order_id: a.order_id.clone(),
                machine_id: a.machine_id.clone(),
            })
            .collect())
    }

    /// 全机台产能快照 (含非 ACTIVE 机台)
    pub fn get_capacity_stats(&self) -> ApiResult<Vec<CapacitySnapshot>> {
        let machines = self.machine_repo.list_all()?;

        let mut machines_with_queues = Vec::with_capacity(machines.len());
        for machine in machines {
            let orders = self.order_repo.list_queued_by_machine(&machine.machine_id)?;
            machines_with_queues.push((machine, orders));
        }

        Ok(CapacityModel::new().compute_all(&machines_with_queues))
    }
}
