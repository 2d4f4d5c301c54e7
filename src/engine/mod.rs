// ==========================================
// 薄膜生产管理系统 - 引擎层
// ==========================================
// 职责: 产能计算/评分/规划/预览的纯业务规则
// 红线: Engine 不拼 SQL; 评分与产能计算任何输入下不报错;
// 规划结果对相同输入必须可复现
// ==========================================

pub mod capacity_model;
pub mod planner;
pub mod preview;
pub mod scoring;

// 重导出核心引擎
pub use capacity_model::CapacityModel;
pub use planner::{DistributionPlan, DistributionPlanner, PlannedAssignment};
pub use preview::{DistributionPreview, MachinePreview, PreviewBuilder};
pub use scoring::MachineRunState;
