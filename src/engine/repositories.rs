// ==========================================
// 门店补货预测系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合周期流程所需的所有 Repository
// 目标: 减少 CycleApi 的构造函数参数数量
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::repository::{
    CycleActionLogRepository, DeliveryRepository, EndingInventoryRepository, ForecastRepository,
    InventoryCodeRepository, ReferenceDataRepository, SalesRepository,
};

/// 周期流程仓储集合
///
/// # 包含的仓储
/// - `reference_repo`: 参考数据 (门店/菜单/原料/BOM/按需品项)
/// - `sales_repo`: POS 流水与窗口汇总
/// - `inventory_code_repo`: 库存周期头
/// - `ending_inventory_repo`: 期末盘点
/// - `forecast_repo`: 用量明细/销售汇总/预测行
/// - `delivery_repo`: 配送行/按需申请行
/// - `action_log_repo`: 周期操作日志
#[derive(Clone)]
pub struct CycleRepositories {
    pub reference_repo: Arc<ReferenceDataRepository>,
    pub sales_repo: Arc<SalesRepository>,
    pub inventory_code_repo: Arc<InventoryCodeRepository>,
    pub ending_inventory_repo: Arc<EndingInventoryRepository>,
    pub forecast_repo: Arc<ForecastRepository>,
    pub delivery_repo: Arc<DeliveryRepository>,
    pub action_log_repo: Arc<CycleActionLogRepository>,
}

impl CycleRepositories {
    /// 基于同一连接创建全部仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            reference_repo: Arc::new(ReferenceDataRepository::new(conn.clone())),
            sales_repo: Arc::new(SalesRepository::new(conn.clone())),
            inventory_code_repo: Arc::new(InventoryCodeRepository::new(conn.clone())),
            ending_inventory_repo: Arc::new(EndingInventoryRepository::new(conn.clone())),
            forecast_repo: Arc::new(ForecastRepository::new(conn.clone())),
            delivery_repo: Arc::new(DeliveryRepository::new(conn.clone())),
            action_log_repo: Arc::new(CycleActionLogRepository::new(conn)),
        }
    }
}

// 注: 各仓储的行为由各自模块的单元测试与 tests/ 下的集成测试覆盖,
// CycleRepositories 只是简单的聚合结构体。
