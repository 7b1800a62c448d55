// ==========================================
// Mock 配置实现 - 用于集成测试
// ==========================================
// 默认季节指数取 1.0, 使场景数据的期望值为精确值
// ==========================================

use async_trait::async_trait;
use replenishment_mrp::config::{ConfigResult, PolicyConfigReader};

/// Mock 配置结构
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub no_of_days: u32,
    pub seasonality_index: f64,
    pub days_before_delivery: u32,
    pub worker_pool_size: usize,
    pub aggregation_timeout_secs: u64,
}

impl MockConfig {
    /// 创建默认配置
    pub fn default() -> Self {
        Self {
            no_of_days: 21,
            seasonality_index: 1.0,
            days_before_delivery: 5,
            worker_pool_size: 2,
            aggregation_timeout_secs: 30,
        }
    }

    /// 创建自定义季节指数配置
    pub fn with_seasonality(seasonality_index: f64) -> Self {
        let mut config = Self::default();
        config.seasonality_index = seasonality_index;
        config
    }
}

#[async_trait]
impl PolicyConfigReader for MockConfig {
    async fn get_no_of_days(&self) -> ConfigResult<u32> {
        Ok(self.no_of_days)
    }

    async fn get_seasonality_index(&self) -> ConfigResult<f64> {
        Ok(self.seasonality_index)
    }

    async fn get_days_before_delivery(&self) -> ConfigResult<u32> {
        Ok(self.days_before_delivery)
    }

    async fn get_worker_pool_size(&self) -> ConfigResult<usize> {
        Ok(self.worker_pool_size)
    }

    async fn get_aggregation_timeout_secs(&self) -> ConfigResult<u64> {
        Ok(self.aggregation_timeout_secs)
    }
}
