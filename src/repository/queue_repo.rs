// ==========================================
// 薄膜生产管理系统 - 机台队列数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 并发纪律: 同一机台队列的全部变更 (assign/reorder/remove)
// 经由单连接 + 事务串行化, 不产生重复或冲突的 position;
// 规划快照与提交之间的过期由 assign 的重复检查兜底失败,
// 绝不静默双重分配
// ==========================================

use crate::domain::MachineQueueEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row, Transaction};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

// ==========================================
// 批量提交的输入与结果
// ==========================================

/// 批量提交的单条输入 (规划结果在 API 层转换而来)
#[derive(Debug, Clone)]
pub struct ApplyItem {
    pub order_id: String,
    pub machine_id: String,
}

/// 批量提交中失败的单条明细
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApplyFailure {
    pub order_id: String,
    pub machine_id: String,
    pub reason: String,
}

/// 批量提交结果
///
/// 逐条报告成功/失败, 由调用方 (Distribution Service) 决定
/// 重试还是放弃; 已成功条目保留 (重复检查保证重放幂等安全)
#[derive(Debug)]
pub struct ApplyOutcome {
    pub applied: Vec<MachineQueueEntry>,
    pub failures: Vec<ApplyFailure>,
}

impl ApplyOutcome {
    pub fn is_full_success(&self) -> bool {
        self.failures.is_empty()
    }
}

// ==========================================
// MachineQueueRepository - 机台队列仓储
// ==========================================
pub struct MachineQueueRepository {
    conn: Arc<Mutex<Connection>>,
}

const ENTRY_COLUMNS: &str =
    "entry_id, machine_id, order_id, position, assigned_at, assigned_by";

impl MachineQueueRepository {
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

    fn map_row(row: &Row<'_>) -> SqliteResult<MachineQueueEntry> {
        Ok(MachineQueueEntry {
            entry_id: row.get(0)?,
            machine_id: row.get(1)?,
            order_id: row.get(2)?,
            position: row.get(3)?,
            assigned_at: row.get::<_, DateTime<Utc>>(4)?,
            assigned_by: row.get(5)?,
        })
    }

    // ==========================================
    // 读接口
    // ==========================================

    /// 查询指定机台队列 (按位置升序)
    pub fn list_by_machine(&self, machine_id: &str) -> RepositoryResult<Vec<MachineQueueEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM machine_queue WHERE machine_id = ?1 ORDER BY position",
            ENTRY_COLUMNS
        ))?;

        let entries = stmt
            .query_map(params![machine_id], Self::map_row)?
            .collect::<SqliteResult<Vec<MachineQueueEntry>>>()?;
        Ok(entries)
    }

    /// 查询全部队列项 (按机台/位置升序)
    pub fn list_all(&self) -> RepositoryResult<Vec<MachineQueueEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM machine_queue ORDER BY machine_id, position",
            ENTRY_COLUMNS
        ))?;

        let entries = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<MachineQueueEntry>>>()?;
        Ok(entries)
    }

    /// 按队列项ID查询
    pub fn find_by_id(&self, entry_id: &str) -> RepositoryResult<Option<MachineQueueEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM machine_queue WHERE entry_id = ?1",
            ENTRY_COLUMNS
        ))?;

        let entry = stmt.query_row(params![entry_id], Self::map_row).optional()?;
        Ok(entry)
    }

    /// 按工单查询队列项 (跨全部机台至多一条)
    pub fn find_by_order(&self, order_id: &str) -> RepositoryResult<Option<MachineQueueEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM machine_queue WHERE order_id = ?1",
            ENTRY_COLUMNS
        ))?;

        let entry = stmt.query_row(params![order_id], Self::map_row).optional()?;
        Ok(entry)
    }

    // ==========================================
    // 写接口 (全部走事务)
    // ==========================================

    /// 分配工单到机台队列
    ///
    /// # 参数
    /// - `order_id`: 工单编号
    /// - `machine_id`: 目标机台
    /// - `position`: 插入位置; None 表示追加到队尾
    /// - `assigned_by`: 操作来源
    ///
    /// # 错误
    /// - `DuplicateAssignment`: 工单已在任一机台队列中
    /// - `InvalidPosition`: position < 0 或 > 当前队列长度
    ///
    /// 插入位置之后的同机台条目整体后移一位, 保持位置稠密
    pub fn assign(
        &self,
        order_id: &str,
        machine_id: &str,
        position: Option<i64>,
        assigned_by: &str,
    ) -> RepositoryResult<MachineQueueEntry> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let entry = Self::assign_in_tx(&tx, order_id, machine_id, position, assigned_by)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        debug!(
            order_id,
            machine_id,
            position = entry.position,
            "队列分配完成"
        );
        Ok(entry)
    }

    /// 事务内的分配实现 (assign 与 apply 共用)
    fn assign_in_tx(
        tx: &Transaction<'_>,
        order_id: &str,
        machine_id: &str,
        position: Option<i64>,
        assigned_by: &str,
    ) -> RepositoryResult<MachineQueueEntry> {
        // 重复检查: 一个工单至多在一个机台队列中
        let existing: Option<String> = tx
            .query_row(
                "SELECT machine_id FROM machine_queue WHERE order_id = ?1",
                params![order_id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(occupied) = existing {
            return Err(RepositoryError::DuplicateAssignment {
                order_id: order_id.to_string(),
                machine_id: occupied,
            });
        }

        let queue_len: i64 = tx.query_row(
            "SELECT COUNT(*) FROM machine_queue WHERE machine_id = ?1",
            params![machine_id],
            |row| row.get(0),
        )?;

        let pos = position.unwrap_or(queue_len);
        if pos < 0 || pos > queue_len {
            return Err(RepositoryError::InvalidPosition {
                position: pos,
                queue_len,
            });
        }

        // 插入位置及之后的条目整体后移
        tx.execute(
            "UPDATE machine_queue SET position = position + 1
             WHERE machine_id = ?1 AND position >= ?2",
            params![machine_id, pos],
        )?;

        let entry = MachineQueueEntry {
            entry_id: Uuid::new_v4().to_string(),
            machine_id: machine_id.to_string(),
            order_id: order_id.to_string(),
            position: pos,
            assigned_at: Utc::now(),
            assigned_by: assigned_by.to_string(),
        };
        tx.execute(
            r#"
            INSERT INTO machine_queue (
                entry_id, machine_id, order_id, position, assigned_at, assigned_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                entry.entry_id,
                entry.machine_id,
                entry.order_id,
                entry.position,
                entry.assigned_at,
                entry.assigned_by,
            ],
        )?;

        Ok(entry)
    }

    /// 调整队列项位置 (同机台内)
    ///
    /// 只重排新旧位置之间的区间, 不做全局重编号
    ///
    /// # 错误
    /// - `NotFound`: 队列项不存在
    /// - `InvalidPosition`: new_position 超出 [0, 队列长度)
    pub fn reorder(&self, entry_id: &str, new_position: i64) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let found: Option<(String, i64)> = tx
            .query_row(
                "SELECT machine_id, position FROM machine_queue WHERE entry_id = ?1",
                params![entry_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (machine_id, old_position) = found.ok_or_else(|| RepositoryError::NotFound {
            entity: "MachineQueueEntry".to_string(),
            id: entry_id.to_string(),
        })?;

        let queue_len: i64 = tx.query_row(
            "SELECT COUNT(*) FROM machine_queue WHERE machine_id = ?1",
            params![machine_id],
            |row| row.get(0),
        )?;
        if new_position < 0 || new_position >= queue_len {
            return Err(RepositoryError::InvalidPosition {
                position: new_position,
                queue_len,
            });
        }

        if new_position == old_position {
            tx.commit()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
            return Ok(());
        }

        if new_position > old_position {
            // 下移: (old, new] 区间整体前移一位
            tx.execute(
                "UPDATE machine_queue SET position = position - 1
                 WHERE machine_id = ?1 AND position > ?2 AND position <= ?3",
                params![machine_id, old_position, new_position],
            )?;
        } else {
            // 上移: [new, old) 区间整体后移一位
            tx.execute(
                "UPDATE machine_queue SET position = position + 1
                 WHERE machine_id = ?1 AND position >= ?2 AND position < ?3",
                params![machine_id, new_position, old_position],
            )?;
        }

        tx.execute(
            "UPDATE machine_queue SET position = ?1 WHERE entry_id = ?2",
            params![new_position, entry_id],
        )?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        debug!(entry_id, machine_id, old_position, new_position, "队列重排完成");
        Ok(())
    }

    /// 移除队列项
    ///
    /// 被移除位置之后的同机台条目整体前移一位, 保持位置稠密
    ///
    /// # 错误
    /// - `NotFound`: 队列项不存在
    pub fn remove(&self, entry_id: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let found: Option<(String, i64)> = tx
            .query_row(
                "SELECT machine_id, position FROM machine_queue WHERE entry_id = ?1",
                params![entry_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (machine_id, old_position) = found.ok_or_else(|| RepositoryError::NotFound {
            entity: "MachineQueueEntry".to_string(),
            id: entry_id.to_string(),
        })?;

        tx.execute(
            "DELETE FROM machine_queue WHERE entry_id = ?1",
            params![entry_id],
        )?;
        tx.execute(
            "UPDATE machine_queue SET position = position - 1
             WHERE machine_id = ?1 AND position > ?2",
            params![machine_id, old_position],
        )?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        debug!(entry_id, machine_id, old_position, "队列项移除完成");
        Ok(())
    }

    /// 批量提交规划方案 (逐条 assign, 逐条报告结果)
    ///
    /// 单条失败 (例如与人工直接分配竞争导致的重复) 不中断后续条目;
    /// 成功/失败明细完整返回, 由调用方决定重试或放弃,
    /// 绝不出现"部分条目静默丢失"的状态
    pub fn apply(&self, items: &[ApplyItem], assigned_by: &str) -> RepositoryResult<ApplyOutcome> {
        let mut outcome = ApplyOutcome {
            applied: Vec::with_capacity(items.len()),
            failures: Vec::new(),
        };

        for item in items {
            // 逐条独立事务: 按规划顺序追加到队尾
            match self.assign(&item.order_id, &item.machine_id, None, assigned_by) {
                Ok(entry) => outcome.applied.push(entry),
                Err(e) => {
                    warn!(
                        order_id = %item.order_id,
                        machine_id = %item.machine_id,
                        error = %e,
                        "批量提交: 单条分配失败"
                    );
                    outcome.failures.push(ApplyFailure {
                        order_id: item.order_id.clone(),
                        machine_id: item.machine_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(outcome)
    }
}
