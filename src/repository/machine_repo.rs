// ==========================================
// 薄膜生产管理系统 - 机台数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 注: 机台由外部机台管理模块维护, 本引擎只读;
// upsert 仅供外部同步与测试夹具使用
// ==========================================

use crate::domain::types::{MachineSection, MachineStatus};
use crate::domain::Machine;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// MachineRepository - 机台仓储
// ==========================================
pub struct MachineRepository {
    conn: Arc<Mutex<Connection>>,
}

const MACHINE_COLUMNS: &str = r#"
    machine_id, name, section, status,
    production_rate_kg_h, max_capacity_kg, created_at, updated_at
"#;

impl MachineRepository {
    /// 从共享连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> SqliteResult<Machine> {
        let section_str: String = row.get(2)?;
        let status_str: String = row.get(3)?;
        Ok(Machine {
            machine_id: row.get(0)?,
            name: row.get(1)?,
            // 非法枚举值按数据质量问题降级为保守默认, 不让读路径报错
            section: MachineSection::parse(&section_str).unwrap_or(MachineSection::Blowing),
            status: MachineStatus::parse(&status_str).unwrap_or(MachineStatus::Down),
            production_rate_kg_h: row.get(4)?,
            max_capacity_kg: row.get(5)?,
            created_at: row.get::<_, DateTime<Utc>>(6)?,
            updated_at: row.get::<_, DateTime<Utc>>(7)?,
        })
    }

    /// 查询全部机台 (按机台编号升序)
    pub fn list_all(&self) -> RepositoryResult<Vec<Machine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM machine ORDER BY machine_id",
            MACHINE_COLUMNS
        ))?;

        let machines = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<Machine>>>()?;
        Ok(machines)
    }

    /// 查询 ACTIVE 机台 (按机台编号升序)
    pub fn list_active(&self) -> RepositoryResult<Vec<Machine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM machine WHERE status = 'ACTIVE' ORDER BY machine_id",
            MACHINE_COLUMNS
        ))?;

        let machines = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<Machine>>>()?;
        Ok(machines)
    }

    /// 按编号查询机台
    pub fn find_by_id(&self, machine_id: &str) -> RepositoryResult<Option<Machine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM machine WHERE machine_id = ?1",
            MACHINE_COLUMNS
        ))?;

        let machine = stmt
            .query_row(params![machine_id], Self::map_row)
            .optional()?;
        Ok(machine)
    }

    /// 插入或更新机台 (外部同步/测试夹具)
    pub fn upsert(&self, machine: &Machine) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO machine (
                machine_id, name, section, status,
                production_rate_kg_h, max_capacity_kg, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                machine.machine_id,
                machine.name,
                machine.section.to_db_str(),
                machine.status.to_db_str(),
                machine.production_rate_kg_h,
                machine.max_capacity_kg,
                machine.created_at,
                machine.updated_at,
            ],
        )?;
        Ok(())
    }
}
