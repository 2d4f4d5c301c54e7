// ==========================================
// 薄膜生产管理系统 - 数据仓储层
// ==========================================
// 职责: SQLite 数据访问, 不含业务逻辑
// ==========================================

pub mod error;
pub mod machine_repo;
pub mod order_repo;
pub mod queue_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use machine_repo::MachineRepository;
pub use order_repo::ProductionOrderRepository;
pub use queue_repo::{ApplyFailure, ApplyItem, ApplyOutcome, MachineQueueRepository};
