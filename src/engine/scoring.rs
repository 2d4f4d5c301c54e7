// ==========================================
// 薄膜生产管理系统 - 算法评分函数
// ==========================================
// 职责: (工单, 机台运行视图) → 适配度得分, 得分越高越优
// 红线: 评分函数纯计算, 任何输入下不报错 (缺失数据降级为 0/默认值)
// ==========================================

use crate::domain::{HybridWeights, Machine, ProductionOrder};
use std::collections::HashMap;

// ==========================================
// MachineRunState - 规划运行中的机台视图
// ==========================================
// 规划循环内逐单提交后滚动更新, 使本轮已提交负载
// 参与下一个工单的评分 (贪心逐单, 非全局最优)
#[derive(Debug, Clone)]
pub struct MachineRunState {
    pub machine: Machine,
    pub current_load_kg: f64,                     // 当前负载 (含本轮已提交)
    pub order_count: usize,                       // 排队工单数 (含本轮已提交)
    pub queued_product_types: HashMap<String, usize>, // 排队中的产品类别计数
    pub next_position: i64,                       // 下一个追加位置
}

impl MachineRunState {
    /// 由机台与现有队列构建运行视图
    pub fn from_queue(machine: Machine, queued_orders: &[ProductionOrder]) -> Self {
        let current_load_kg = queued_orders.iter().map(|o| o.remaining_kg()).sum();
        let mut queued_product_types: HashMap<String, usize> = HashMap::new();
        for order in queued_orders {
            *queued_product_types
                .entry(order.product_type.clone())
                .or_insert(0) += 1;
        }

        Self {
            machine,
            current_load_kg,
            order_count: queued_orders.len(),
            queued_product_types,
            next_position: queued_orders.len() as i64,
        }
    }

    /// 假定追加该工单后的负载 (kg)
    pub fn projected_load_kg(&self, order: &ProductionOrder) -> f64 {
        self.current_load_kg + order.remaining_kg()
    }

    /// 假定追加该工单后的负载率
    ///
    /// 容量为 0 时返回正无穷, 使该机台在负载率比较中排到最后,
    /// 但仍保持可选 (软约束, 不硬排除)
    pub fn projected_ratio(&self, order: &ProductionOrder) -> f64 {
        if self.machine.max_capacity_kg > 0.0 {
            self.projected_load_kg(order) / self.machine.max_capacity_kg
        } else {
            f64::INFINITY
        }
    }

    /// 追加该工单后是否仍在容量内
    pub fn fits(&self, order: &ProductionOrder) -> bool {
        self.projected_load_kg(order) <= self.machine.max_capacity_kg
    }

    /// 队列中是否已有同类产品
    pub fn has_product_type(&self, product_type: &str) -> bool {
        self.queued_product_types
            .get(product_type)
            .is_some_and(|n| *n > 0)
    }

    /// 提交工单: 滚动更新负载/数量/类别计数, 返回分得的队列位置
    pub fn commit(&mut self, order: &ProductionOrder) -> i64 {
        let position = self.next_position;
        self.current_load_kg += order.remaining_kg();
        self.order_count += 1;
        *self
            .queued_product_types
            .entry(order.product_type.clone())
            .or_insert(0) += 1;
        self.next_position += 1;
        position
    }
}

// ==========================================
// 评分函数
// ==========================================

/// balanced: 按队列工单数量均衡
///
/// score = -(排队工单数), 数量最少的机台得分最高
pub fn balanced_score(state: &MachineRunState) -> f64 {
    -(state.order_count as f64)
}

/// load-based: 按追加后负载率
///
/// score = -(projected / max_capacity), 追加后最空闲的机台得分最高
pub fn load_based_score(order: &ProductionOrder, state: &MachineRunState) -> f64 {
    -state.projected_ratio(order)
}

/// hybrid: 四维度加权求和
///
/// composite = w_load·(1-负载率) + w_cap·剩余容量比 + w_prio·(优先级序号/3) + w_type·同类匹配(1/0)
///
/// 契约: 权重为相对份额, 引擎不做归一化; (100,0,0,0) 的排序
/// 必须与纯 load-based 一致
pub fn hybrid_score(
    order: &ProductionOrder,
    state: &MachineRunState,
    weights: &HybridWeights,
) -> f64 {
    let cap = state.machine.max_capacity_kg;

    // 负载子分: 1 - 追加后负载率 (超载为负, 保留量级以维持与 load-based 一致的排序;
    // 容量为 0 时负载率为正无穷, 该机台与 load-based 一样排到最后)
    // 权重为 0 时整项跳过, 避免 0 × ∞ = NaN
    let load_term = if weights.load > 0.0 {
        weights.load * (1.0 - state.projected_ratio(order))
    } else {
        0.0
    };

    // 剩余容量子分: 追加前剩余容量比例
    let capacity_sub = if cap > 0.0 {
        ((cap - state.current_load_kg) / cap).max(0.0)
    } else {
        0.0
    };

    // 优先级子分: 序号归一化到 [0,1] (同一工单对所有机台相同, 保持契约维度完整)
    let priority_sub = f64::from(order.priority.rank()) / 3.0;

    // 同类产品子分: 1/0
    let type_sub = if state.has_product_type(&order.product_type) {
        1.0
    } else {
        0.0
    };

    load_term
        + weights.capacity * capacity_sub
        + weights.priority * priority_sub
        + weights.product_type * type_sub
}
