// ==========================================
// 门店补货预测系统 - 策略配置读取 Trait
// ==========================================
// 职责: 定义预测引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::policy::ForecastPolicy;
use async_trait::async_trait;
use std::error::Error;

pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// PolicyConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）; 测试中使用 MockConfig
#[async_trait]
pub trait PolicyConfigReader: Send + Sync {
    /// 统计窗口天数
    ///
    /// # 默认值
    /// - 21
    async fn get_no_of_days(&self) -> ConfigResult<u32>;

    /// 季节指数
    ///
    /// # 默认值
    /// - 1.1
    async fn get_seasonality_index(&self) -> ConfigResult<f64>;

    /// 下次到货前天数
    ///
    /// # 默认值
    /// - 5
    async fn get_days_before_delivery(&self) -> ConfigResult<u32>;

    /// 汇总阶段工作线程数
    ///
    /// # 默认值
    /// - CPU 核数
    async fn get_worker_pool_size(&self) -> ConfigResult<usize>;

    /// 汇总阶段超时 (秒)
    ///
    /// # 默认值
    /// - 300
    async fn get_aggregation_timeout_secs(&self) -> ConfigResult<u64>;

    /// 组装一次运行使用的完整参数快照
    async fn resolve_policy(&self) -> ConfigResult<ForecastPolicy> {
        Ok(ForecastPolicy {
            no_of_days: self.get_no_of_days().await?,
            seasonality_index: self.get_seasonality_index().await?,
            days_before_delivery: self.get_days_before_delivery().await?,
            worker_pool_size: self.get_worker_pool_size().await?,
            aggregation_timeout_secs: self.get_aggregation_timeout_secs().await?,
        })
    }
}
