// ==========================================
// 门店补货预测系统 - 预测策略参数
// ==========================================
// 职责: 一次运行所使用的业务可调参数快照
// 说明: 参数来自 config_kv, 由 PolicyConfigReader 解析后整体传入引擎
// ==========================================

use serde::{Deserialize, Serialize};

/// 统计窗口天数 (日均销量分母)
pub const DEFAULT_NO_OF_DAYS: u32 = 21;
/// 季节指数
pub const DEFAULT_SEASONALITY_INDEX: f64 = 1.1;
/// 下次到货前天数
pub const DEFAULT_DAYS_BEFORE_DELIVERY: u32 = 5;
/// 汇总阶段超时 (秒)
pub const DEFAULT_AGGREGATION_TIMEOUT_SECS: u64 = 300;

/// 周用量倍数
///
/// 注意: 业务口径为 8 而不是 7, 待产品确认前保持原值
pub const WEEKLY_USAGE_MULTIPLIER: f64 = 8.0;
/// 安全库存比例 (占周用量)
pub const SAFETY_STOCK_RATIO: f64 = 0.2;

/// 默认工作线程数: 随 CPU 核数伸缩
pub fn default_worker_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

// ==========================================
// ForecastPolicy - 预测策略参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPolicy {
    pub no_of_days: u32,
    pub seasonality_index: f64,
    pub days_before_delivery: u32,
    pub worker_pool_size: usize,
    pub aggregation_timeout_secs: u64,
}

impl Default for ForecastPolicy {
    fn default() -> Self {
        Self {
            no_of_days: DEFAULT_NO_OF_DAYS,
            seasonality_index: DEFAULT_SEASONALITY_INDEX,
            days_before_delivery: DEFAULT_DAYS_BEFORE_DELIVERY,
            worker_pool_size: default_worker_pool_size(),
            aggregation_timeout_secs: DEFAULT_AGGREGATION_TIMEOUT_SECS,
        }
    }
}

impl ForecastPolicy {
    /// 序列化为 JSON 快照 (记录到周期上, 便于追溯)
    pub fn to_snapshot_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
