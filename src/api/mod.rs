// ==========================================
// 薄膜生产管理系统 - API 层
// ==========================================
// 职责: 入参校验 + 编排 (引擎规划, 仓储落库)
// 红线: API 层不直接写 SQL
// ==========================================

pub mod distribution_api;
pub mod error;
pub mod queue_api;

pub use distribution_api::{ApplyReport, AssignmentSuggestion, DistributionApi};
pub use error::{ApiError, ApiResult};
pub use queue_api::{QueueApi, QueueEntryView};
