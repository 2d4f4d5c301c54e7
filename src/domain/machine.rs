// ==========================================
// 薄膜生产管理系统 - 机台领域模型
// ==========================================
// 生命周期: 由外部机台管理模块维护, 本引擎只读
// ==========================================

use crate::domain::types::{MachineSection, MachineStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Machine - 机台
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub machine_id: String,            // 机台编号
    pub name: String,                  // 机台名称
    pub section: MachineSection,       // 所属工段
    pub status: MachineStatus,         // 运行状态
    pub production_rate_kg_h: f64,     // 额定产速 (kg/h)
    pub max_capacity_kg: f64,          // 最大排队容量 (kg)
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Machine {
    /// 是否可参与分配
    pub fn is_active(&self) -> bool {
        self.status == MachineStatus::Active
    }
}
