// ==========================================
// 薄膜生产管理系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为 (外键/忙等超时)
// - 集中建表语句, 避免各仓储各建各的 schema
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout (毫秒)
///
/// 队列写操作经由单连接串行化, busy_timeout 兜底偶发并发打开
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明:
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema (幂等)
///
/// 表:
/// - machine: 机台目录 (外部机台管理模块维护)
/// - production_order: 生产工单目录
/// - machine_queue: 机台队列 (本引擎唯一的写入对象)
/// - config_kv: 全局配置键值
///
/// machine_queue 的 order_id 带 UNIQUE 索引:
/// "一个工单至多出现在一个机台队列中"由数据库兜底,
/// 仓储层的重复检查在同一事务内先行给出可解释错误
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS machine (
            machine_id              TEXT PRIMARY KEY,
            name                    TEXT NOT NULL,
            section                 TEXT NOT NULL,
            status                  TEXT NOT NULL,
            production_rate_kg_h    REAL NOT NULL DEFAULT 0,
            max_capacity_kg         REAL NOT NULL DEFAULT 0,
            created_at              TEXT NOT NULL,
            updated_at              TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS production_order (
            order_id                TEXT PRIMARY KEY,
            customer_order_id       TEXT,
            product_type            TEXT NOT NULL,
            quantity_required_kg    REAL NOT NULL,
            produced_kg             REAL NOT NULL DEFAULT 0,
            priority                TEXT NOT NULL,
            status                  TEXT NOT NULL,
            created_at              TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS machine_queue (
            entry_id                TEXT PRIMARY KEY,
            machine_id              TEXT NOT NULL REFERENCES machine(machine_id),
            order_id                TEXT NOT NULL UNIQUE REFERENCES production_order(order_id),
            position                INTEGER NOT NULL,
            assigned_at             TEXT NOT NULL,
            assigned_by             TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_machine_queue_machine_position
            ON machine_queue(machine_id, position);

        CREATE TABLE IF NOT EXISTS config_kv (
            key                     TEXT PRIMARY KEY,
            value                   TEXT NOT NULL,
            updated_at              TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;
    Ok(())
}
