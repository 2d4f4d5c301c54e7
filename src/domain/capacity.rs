// ==========================================
// 薄膜生产管理系统 - 产能快照与分配参数
// ==========================================
// CapacitySnapshot 为派生数据, 不落库
// ==========================================

use crate::domain::types::{CapacityStatus, DistributionAlgorithm};
use serde::{Deserialize, Serialize};

// ==========================================
// CapacitySnapshot - 机台产能快照
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    pub machine_id: String,        // 机台编号
    pub machine_name: String,      // 机台名称
    pub current_load_kg: f64,      // 当前排队负载 (kg, 仅未完成剩余量)
    pub max_capacity_kg: f64,      // 最大排队容量 (kg)
    pub utilization_pct: f64,      // 利用率 (%), 容量为 0 时取 0
    pub capacity_status: CapacityStatus, // 产能分桶
    pub order_count: usize,        // 排队工单数
    pub production_rate_kg_h: f64, // 额定产速 (kg/h)
}

impl CapacitySnapshot {
    /// 剩余容量 (kg), 超载时为 0
    pub fn remaining_capacity_kg(&self) -> f64 {
        (self.max_capacity_kg - self.current_load_kg).max(0.0)
    }
}

// ==========================================
// HybridWeights - 混合算法权重
// ==========================================
// 契约: 四个权重为相对贡献份额, 不要求合计 100;
// 组合分为加权求和而非加权平均, 绝对量级同样有意义,
// 引擎不做任何隐式归一化
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridWeights {
    pub load: f64,         // 负载维度权重
    pub capacity: f64,     // 剩余容量维度权重
    pub priority: f64,     // 优先级维度权重
    pub product_type: f64, // 同类产品维度权重
}

impl Default for HybridWeights {
    /// 未指定时四个维度等份
    fn default() -> Self {
        Self {
            load: 25.0,
            capacity: 25.0,
            priority: 25.0,
            product_type: 25.0,
        }
    }
}

impl HybridWeights {
    /// 校验权重合法性
    ///
    /// # 返回
    /// - Ok(()): 全部非负且有限
    /// - Err((维度名, 非法值)): 首个非法维度
    pub fn validate(&self) -> Result<(), (&'static str, f64)> {
        for (name, value) in [
            ("load", self.load),
            ("capacity", self.capacity),
            ("priority", self.priority),
            ("product_type", self.product_type),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err((name, value));
            }
        }
        Ok(())
    }
}

// ==========================================
// DistributionParams - 分配参数
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionParams {
    pub algorithm: DistributionAlgorithm,
    /// 仅 hybrid 算法使用; 其余算法忽略
    pub hybrid_weights: Option<HybridWeights>,
}

impl DistributionParams {
    pub fn new(algorithm: DistributionAlgorithm, hybrid_weights: Option<HybridWeights>) -> Self {
        Self {
            algorithm,
            hybrid_weights,
        }
    }

    /// 生效的混合权重 (未指定时等份默认值)
    pub fn effective_weights(&self) -> HybridWeights {
        self.hybrid_weights.unwrap_or_default()
    }
}
