// ==========================================
// 门店补货预测系统 - 配置层
// ==========================================
// 职责: 业务可调参数管理 (统计天数/季节指数/到货前天数/线程数)
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod policy;
pub mod policy_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use policy::ForecastPolicy;
pub use policy_config_trait::{ConfigResult, PolicyConfigReader};
