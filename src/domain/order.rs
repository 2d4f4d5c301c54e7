// ==========================================
// 薄膜生产管理系统 - 生产工单领域模型
// ==========================================
// 生命周期: 销售订单下达生产后创建; 卷材完工消耗剩余量;
// 完工或取消后不再参与(重新)分配
// ==========================================

use crate::domain::types::{OrderStatus, PriorityLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ProductionOrder - 生产工单
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionOrder {
    pub order_id: String,              // 工单编号
    pub customer_order_id: Option<String>, // 关联销售订单
    pub product_type: String,          // 产品类别
    pub quantity_required_kg: f64,     // 需求量 (kg)
    pub produced_kg: f64,              // 已完成量 (kg)
    pub priority: PriorityLevel,       // 优先级
    pub status: OrderStatus,           // 工单状态
    pub created_at: DateTime<Utc>,
}

impl ProductionOrder {
    /// 未完成剩余量 (kg)
    ///
    /// 只统计未生产部分, 已完成质量不重复计入机台负载
    pub fn remaining_kg(&self) -> f64 {
        (self.quantity_required_kg - self.produced_kg).max(0.0)
    }

    /// 是否可参与分配
    ///
    /// 待生产且剩余量 > 0; 剩余量为 0 的工单跳过而非分配
    pub fn is_assignable(&self) -> bool {
        self.status == OrderStatus::Pending && self.remaining_kg() > 0.0
    }
}
