// ==========================================
// 门店补货预测系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接、配置与 API 实例
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::CycleApi;
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::{
    AllowAllCapabilities, CapabilityChecker, CsvReportWriter, CycleNotifier, CycleRepositories,
};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "MRP_DB_PATH";

/// 应用状态
///
/// 全部仓储共享同一个连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 共享连接
    pub conn: Arc<Mutex<Connection>>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 库存周期API
    pub cycle_api: Arc<CycleApi<ConfigManager>>,
}

impl AppState {
    /// 以默认协作者创建 (全部放行, 不发通知, 报表写到数据库同级目录)
    pub fn new(db_path: String) -> Result<Self, String> {
        let report_dir = PathBuf::from(&db_path)
            .parent()
            .map(|p| p.join("reports"))
            .unwrap_or_else(|| PathBuf::from("./reports"));
        Self::with_collaborators(db_path, report_dir, Arc::new(AllowAllCapabilities), None)
    }

    pub fn with_collaborators(
        db_path: String,
        report_dir: PathBuf,
        capabilities: Arc<dyn CapabilityChecker>,
        notifier: Option<Arc<dyn CycleNotifier>>,
    ) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn =
            open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let cycle_api = Arc::new(CycleApi::new(
            CycleRepositories::from_connection(conn.clone()),
            config_manager.clone(),
            Arc::new(CsvReportWriter::new(report_dir)),
            capabilities,
            notifier,
        ));

        tracing::info!("AppState初始化成功");
        Ok(Self {
            db_path,
            conn,
            config_manager,
            cycle_api,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 `MRP_DB_PATH` → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./replenishment_mrp.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("replenishment-mrp");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("replenishment_mrp.db");
        }
    }

    path.to_string_lossy().to_string()
}
