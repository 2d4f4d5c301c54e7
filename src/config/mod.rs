// ==========================================
// 薄膜生产管理系统 - 配置层
// ==========================================
// 职责: 系统配置管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

pub use config_manager::{config_keys, ConfigManager};
