// ==========================================
// 薄膜生产管理系统 - 机台队列领域模型
// ==========================================
// 不变量:
// - 同一机台的 position 为从 0 起的稠密严格递增序列, 无空洞无重复
// - 同一工单在全部机台队列中最多出现一次
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// MachineQueueEntry - 机台队列项
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineQueueEntry {
    pub entry_id: String,          // 队列项ID (uuid v4)
    pub machine_id: String,        // 机台编号
    pub order_id: String,          // 工单编号
    pub position: i64,             // 队列位置 (0 起稠密)
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: String,       // 操作来源 (用户/smart-distribution)
}
