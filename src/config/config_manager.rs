// ==========================================
// 门店补货预测系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::policy::{
    default_worker_pool_size, DEFAULT_AGGREGATION_TIMEOUT_SECS, DEFAULT_DAYS_BEFORE_DELIVERY,
    DEFAULT_NO_OF_DAYS, DEFAULT_SEASONALITY_INDEX,
};
use crate::config::policy_config_trait::{ConfigResult, PolicyConfigReader};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

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
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值 (UPSERT)
    pub fn set_global_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;

        tracing::info!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 读取并解析数值配置; 缺失取默认值, 非法值告警后取默认值
    fn get_parsed_or_default<T>(
        &self,
        key: &str,
        default: T,
        is_valid: impl Fn(&T) -> bool,
    ) -> ConfigResult<T>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match raw.trim().parse::<T>() {
            Ok(value) if is_valid(&value) => Ok(value),
            _ => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = %default,
                    "配置值非法，使用默认值"
                );
                Ok(default)
            }
        }
    }
}

// ==========================================
// PolicyConfigReader Trait 实现
// ==========================================
#[async_trait]
impl PolicyConfigReader for ConfigManager {
    async fn get_no_of_days(&self) -> ConfigResult<u32> {
        self.get_parsed_or_default(config_keys::NO_OF_DAYS, DEFAULT_NO_OF_DAYS, |v| *v > 0)
    }

    async fn get_seasonality_index(&self) -> ConfigResult<f64> {
        self.get_parsed_or_default(
            config_keys::SEASONALITY_INDEX,
            DEFAULT_SEASONALITY_INDEX,
            |v| v.is_finite() && *v >= 0.0,
        )
    }

    async fn get_days_before_delivery(&self) -> ConfigResult<u32> {
        self.get_parsed_or_default(
            config_keys::DAYS_BEFORE_DELIVERY,
            DEFAULT_DAYS_BEFORE_DELIVERY,
            |_| true,
        )
    }

    async fn get_worker_pool_size(&self) -> ConfigResult<usize> {
        self.get_parsed_or_default(
            config_keys::WORKER_POOL_SIZE,
            default_worker_pool_size(),
            |v| *v > 0,
        )
    }

    async fn get_aggregation_timeout_secs(&self) -> ConfigResult<u64> {
        self.get_parsed_or_default(
            config_keys::AGGREGATION_TIMEOUT_SECS,
            DEFAULT_AGGREGATION_TIMEOUT_SECS,
            |v| *v > 0,
        )
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const NO_OF_DAYS: &str = "no_of_days";
    pub const SEASONALITY_INDEX: &str = "seasonality_index";
    pub const DAYS_BEFORE_DELIVERY: &str = "days_before_delivery";
    pub const WORKER_POOL_SIZE: &str = "worker_pool_size";
    pub const AGGREGATION_TIMEOUT_SECS: &str = "aggregation_timeout_secs";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_missing() {
        let manager = setup();
        let policy = manager.resolve_policy().await.unwrap();
        assert_eq!(policy.no_of_days, 21);
        assert_eq!(policy.seasonality_index, 1.1);
        assert_eq!(policy.days_before_delivery, 5);
        assert_eq!(policy.aggregation_timeout_secs, 300);
    }

    #[tokio::test]
    async fn test_override_and_invalid_value() {
        let manager = setup();
        manager.set_global_value(config_keys::NO_OF_DAYS, "28").unwrap();
        manager.set_global_value(config_keys::SEASONALITY_INDEX, "abc").unwrap();
        manager.set_global_value(config_keys::WORKER_POOL_SIZE, "0").unwrap();

        assert_eq!(manager.get_no_of_days().await.unwrap(), 28);
        assert_eq!(manager.get_seasonality_index().await.unwrap(), 1.1);
        assert_eq!(
            manager.get_worker_pool_size().await.unwrap(),
            default_worker_pool_size()
        );

        let snapshot = manager.get_config_snapshot().unwrap();
        assert!(snapshot.contains("no_of_days"));
    }
}
