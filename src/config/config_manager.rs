// ==========================================
// 薄膜生产管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value)
// 纪律: 非法配置值记录告警并回落默认, 不让读路径报错
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::types::DistributionAlgorithm;
use crate::domain::HybridWeights;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键全集
// ==========================================
pub mod config_keys {
    /// 默认分配算法 (DistributionAlgorithm 的 db 形式)
    pub const DEFAULT_ALGORITHM: &str = "distribution/default_algorithm";
    /// 默认混合权重 (HybridWeights 的 JSON 形式)
    pub const DEFAULT_HYBRID_WEIGHTS: &str = "distribution/default_hybrid_weights";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明: 为保证连接行为一致, 会对传入连接再次应用统一 PRAGMA (幂等)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入配置值 (UPSERT)
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    // ===== 分配配置 =====

    /// 获取默认分配算法
    ///
    /// 配置缺失或值非法时回落 BALANCED
    pub fn get_default_algorithm(&self) -> Result<DistributionAlgorithm, Box<dyn Error>> {
        let raw = match self.get_config_value(config_keys::DEFAULT_ALGORITHM)? {
            Some(v) => v,
            None => return Ok(DistributionAlgorithm::Balanced),
        };

        Ok(DistributionAlgorithm::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(
                config_key = config_keys::DEFAULT_ALGORITHM,
                raw_value = %raw,
                "默认算法配置值非法, 回落 BALANCED"
            );
            DistributionAlgorithm::Balanced
        }))
    }

    /// 获取默认混合权重
    ///
    /// 配置缺失、JSON 非法或权重值非法时回落均等权重 (25/25/25/25)
    pub fn get_default_hybrid_weights(&self) -> Result<HybridWeights, Box<dyn Error>> {
        let raw = match self.get_config_value(config_keys::DEFAULT_HYBRID_WEIGHTS)? {
            Some(v) => v,
            None => return Ok(HybridWeights::default()),
        };

        let weights: HybridWeights = match serde_json::from_str(&raw) {
            Ok(w) => w,
            Err(e) => {
                tracing::warn!(
                    config_key = config_keys::DEFAULT_HYBRID_WEIGHTS,
                    raw_value = %raw,
                    error = %e,
                    "默认混合权重配置解析失败, 回落均等权重"
                );
                return Ok(HybridWeights::default());
            }
        };

        if let Err((field, value)) = weights.validate() {
            tracing::warn!(
                config_key = config_keys::DEFAULT_HYBRID_WEIGHTS,
                field,
                value,
                "默认混合权重配置值非法, 回落均等权重"
            );
            return Ok(HybridWeights::default());
        }
        Ok(weights)
    }
}
