// ==========================================
// 薄膜生产管理系统 - 领域类型定义
// ==========================================
// 职责: 机台/工单/分配算法的枚举类型
// 红线: 非法标识符在边界处拒绝, 不允许 switch 默认分支静默吞掉
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 机台状态 (Machine Status)
// ==========================================
// 只有 ACTIVE 的机台可参与分配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineStatus {
    Active,      // 运行中
    Maintenance, // 检修
    Down,        // 停机
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineStatus::Active => write!(f, "ACTIVE"),
            MachineStatus::Maintenance => write!(f, "MAINTENANCE"),
            MachineStatus::Down => write!(f, "DOWN"),
        }
    }
}

impl MachineStatus {
    /// 从字符串解析机台状态
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Some(MachineStatus::Active),
            "MAINTENANCE" => Some(MachineStatus::Maintenance),
            "DOWN" => Some(MachineStatus::Down),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            MachineStatus::Active => "ACTIVE",
            MachineStatus::Maintenance => "MAINTENANCE",
            MachineStatus::Down => "DOWN",
        }
    }
}

// ==========================================
// 工段 (Machine Section)
// ==========================================
// 薄膜生产三段: 吹膜 → 印刷 → 分切
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineSection {
    Blowing,  // 吹膜
    Printing, // 印刷
    Cutting,  // 分切
}

impl fmt::Display for MachineSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineSection::Blowing => write!(f, "BLOWING"),
            MachineSection::Printing => write!(f, "PRINTING"),
            MachineSection::Cutting => write!(f, "CUTTING"),
        }
    }
}

impl MachineSection {
    /// 从字符串解析工段
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BLOWING" => Some(MachineSection::Blowing),
            "PRINTING" => Some(MachineSection::Printing),
            "CUTTING" => Some(MachineSection::Cutting),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            MachineSection::Blowing => "BLOWING",
            MachineSection::Printing => "PRINTING",
            MachineSection::Cutting => "CUTTING",
        }
    }
}

// ==========================================
// 工单状态 (Order Status)
// ==========================================
// PENDING 且剩余量 > 0 的工单才可参与分配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,      // 待生产
    InProduction, // 生产中
    Completed,    // 已完成
    Cancelled,    // 已取消
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "PENDING"),
            OrderStatus::InProduction => write!(f, "IN_PRODUCTION"),
            OrderStatus::Completed => write!(f, "COMPLETED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl OrderStatus {
    /// 从字符串解析工单状态
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(OrderStatus::Pending),
            "IN_PRODUCTION" => Some(OrderStatus::InProduction),
            "COMPLETED" => Some(OrderStatus::Completed),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::InProduction => "IN_PRODUCTION",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

// ==========================================
// 优先级 (Priority Level)
// ==========================================
// 等级制: Low < Normal < High < Urgent
// 历史数据中的布尔加急标志在入库边界映射为 Normal/Urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityLevel {
    Low,    // 低
    Normal, // 正常
    High,   // 高
    Urgent, // 加急
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityLevel::Low => write!(f, "LOW"),
            PriorityLevel::Normal => write!(f, "NORMAL"),
            PriorityLevel::High => write!(f, "HIGH"),
            PriorityLevel::Urgent => write!(f, "URGENT"),
        }
    }
}

impl PriorityLevel {
    /// 从字符串解析优先级
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "LOW" => Some(PriorityLevel::Low),
            "NORMAL" => Some(PriorityLevel::Normal),
            "HIGH" => Some(PriorityLevel::High),
            "URGENT" => Some(PriorityLevel::Urgent),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PriorityLevel::Low => "LOW",
            PriorityLevel::Normal => "NORMAL",
            PriorityLevel::High => "HIGH",
            PriorityLevel::Urgent => "URGENT",
        }
    }

    /// 历史布尔加急标志 → 两级优先级映射
    pub fn from_legacy_flag(urgent: bool) -> Self {
        if urgent {
            PriorityLevel::Urgent
        } else {
            PriorityLevel::Normal
        }
    }

    /// 优先级序号 (0..=3), 用于混合算法归一化
    pub fn rank(&self) -> u8 {
        match self {
            PriorityLevel::Low => 0,
            PriorityLevel::Normal => 1,
            PriorityLevel::High => 2,
            PriorityLevel::Urgent => 3,
        }
    }
}

// ==========================================
// 产能状态 (Capacity Status)
// ==========================================
// 利用率分桶: low <40% | moderate 40-70% | high 70-90% | overloaded >90%
// 超载是软信号, 不是错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapacityStatus {
    Low,        // 空闲
    Moderate,   // 适中
    High,       // 紧张
    Overloaded, // 超载
}

impl fmt::Display for CapacityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityStatus::Low => write!(f, "LOW"),
            CapacityStatus::Moderate => write!(f, "MODERATE"),
            CapacityStatus::High => write!(f, "HIGH"),
            CapacityStatus::Overloaded => write!(f, "OVERLOADED"),
        }
    }
}

impl CapacityStatus {
    /// 由利用率百分比分桶
    ///
    /// 阈值固定为 40/70/90, 超过 90 一律为 OVERLOADED
    pub fn from_utilization(utilization_pct: f64) -> Self {
        if utilization_pct < 40.0 {
            CapacityStatus::Low
        } else if utilization_pct <= 70.0 {
            CapacityStatus::Moderate
        } else if utilization_pct <= 90.0 {
            CapacityStatus::High
        } else {
            CapacityStatus::Overloaded
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            CapacityStatus::Low => "LOW",
            CapacityStatus::Moderate => "MODERATE",
            CapacityStatus::High => "HIGH",
            CapacityStatus::Overloaded => "OVERLOADED",
        }
    }
}

// ==========================================
// 分配算法 (Distribution Algorithm)
// ==========================================
// 五种可互换策略, hybrid 为其余四个维度的加权组合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistributionAlgorithm {
    Balanced,    // 按队列数量均衡
    LoadBased,   // 按负载率
    Priority,    // 优先级优先
    ProductType, // 同类产品聚合
    Hybrid,      // 加权混合
}

impl fmt::Display for DistributionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionAlgorithm::Balanced => write!(f, "balanced"),
            DistributionAlgorithm::LoadBased => write!(f, "load-based"),
            DistributionAlgorithm::Priority => write!(f, "priority"),
            DistributionAlgorithm::ProductType => write!(f, "product-type"),
            DistributionAlgorithm::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl DistributionAlgorithm {
    /// 从字符串解析算法标识
    ///
    /// 非法标识返回 None, 由 API 层转换为 InvalidInput 错误
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "balanced" => Some(DistributionAlgorithm::Balanced),
            "load-based" | "load_based" => Some(DistributionAlgorithm::LoadBased),
            "priority" => Some(DistributionAlgorithm::Priority),
            "product-type" | "product_type" => Some(DistributionAlgorithm::ProductType),
            "hybrid" => Some(DistributionAlgorithm::Hybrid),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            DistributionAlgorithm::Balanced => "balanced",
            DistributionAlgorithm::LoadBased => "load-based",
            DistributionAlgorithm::Priority => "priority",
            DistributionAlgorithm::ProductType => "product-type",
            DistributionAlgorithm::Hybrid => "hybrid",
        }
    }

    /// 工单处理顺序是否为优先级优先
    ///
    /// priority / hybrid 两种算法按优先级降序处理工单,
    /// 其余算法按创建顺序处理
    pub fn is_priority_sequenced(&self) -> bool {
        matches!(
            self,
            DistributionAlgorithm::Priority | DistributionAlgorithm::Hybrid
        )
    }
}
