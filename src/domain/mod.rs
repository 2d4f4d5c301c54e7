// ==========================================
// 薄膜生产管理系统 - 领域层
// ==========================================
// 职责: 实体与类型定义, 不含持久化与业务流程
// ==========================================

pub mod capacity;
pub mod machine;
pub mod order;
pub mod queue;
pub mod types;

// 重导出核心类型
pub use capacity::{CapacitySnapshot, DistributionParams, HybridWeights};
pub use machine::Machine;
pub use order::ProductionOrder;
pub use queue::MachineQueueEntry;
pub use types::{
    CapacityStatus, DistributionAlgorithm, MachineSection, MachineStatus, OrderStatus,
    PriorityLevel,
};
