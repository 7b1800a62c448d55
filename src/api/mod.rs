// ==========================================
// 门店补货预测系统 - API 层
// ==========================================
// 职责: 提供库存周期业务接口, 供命令行/外部服务调用
// ==========================================

pub mod cycle_api;
pub mod error;

// 重导出核心类型
pub use cycle_api::{AreaRunOutcome, AreaRunStatus, CycleApi};
pub use error::{ApiError, ApiResult};
