// ==========================================
// 门店补货预测系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化; 状态迁移与明细写入在同一事务中提交
// ==========================================

pub mod action_log_repo;
pub mod delivery_repo;
pub mod ending_inventory_repo;
pub mod error;
pub mod forecast_repo;
pub mod inventory_code_repo;
pub mod reference_repo;
pub mod sales_repo;

// 重导出核心仓储
pub use action_log_repo::CycleActionLogRepository;
pub use delivery_repo::DeliveryRepository;
pub use ending_inventory_repo::EndingInventoryRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use forecast_repo::{ForecastArtifacts, ForecastRepository};
pub use inventory_code_repo::InventoryCodeRepository;
pub use reference_repo::ReferenceDataRepository;
pub use sales_repo::SalesRepository;
