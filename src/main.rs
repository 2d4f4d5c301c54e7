// ==========================================
// 薄膜生产管理系统 - 开发辅助命令行
// ==========================================
// 用法:
//   cargo run -- [db_path] [command] [algorithm]
// 命令:
//   preview  - 输出分配预览 (默认)
//   suggest  - 输出 load-based 分配建议
//   stats    - 输出各机台产能快照
// ==========================================

use film_aps::api::DistributionApi;
use film_aps::config::ConfigManager;
use film_aps::db::{init_schema, open_sqlite_connection};
use film_aps::logging;
use film_aps::repository::{MachineQueueRepository, MachineRepository, ProductionOrderRepository};
use std::sync::{Arc, Mutex};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let db_path = args.next().unwrap_or_else(|| "film_aps.db".to_string());
    let command = args.next().unwrap_or_else(|| "preview".to_string());
    let algorithm = args.next().unwrap_or_default();

    let conn = Arc::new(Mutex::new(open_sqlite_connection(&db_path)?));
    {
        let c = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        init_schema(&c)?;
    }

    let machine_repo = Arc::new(MachineRepository::from_connection(conn.clone()));
    let order_repo = Arc::new(ProductionOrderRepository::from_connection(conn.clone()));
    let queue_repo = Arc::new(MachineQueueRepository::from_connection(conn.clone()));
    let config_manager = Arc::new(ConfigManager::from_connection(conn.clone())?);

    let api = DistributionApi::new(machine_repo, order_repo, queue_repo, config_manager);

    match command.as_str() {
        "preview" => {
            let preview = api.get_distribution_preview(&algorithm, None)?;
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
        "suggest" => {
            let suggestions = api.suggest_assignments()?;
            println!("{}", serde_json::to_string_pretty(&suggestions)?);
        }
        "stats" => {
            let stats = api.get_capacity_stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        other => {
            return Err(format!("未知命令: {} (可选: preview/suggest/stats)", other).into());
        }
    }

    Ok(())
}
