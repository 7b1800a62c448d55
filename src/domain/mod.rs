// ==========================================
// 门店补货预测系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod cycle;
pub mod delivery;
pub mod forecast;
pub mod reference;
pub mod sales;
pub mod types;

// 重导出核心类型
pub use action_log::CycleActionLog;
pub use cycle::InventorySnapshot;
pub use delivery::{
    AdjustmentBatch, ByRequestEntry, ByRequestLine, DeliveryAdjustment, DeliveryLine, RoundEntry,
    RoundSet,
};
pub use forecast::{EndingInventoryLine, ForecastLine, IngredientTotal, UsageRow};
pub use reference::{Area, BomLine, ByRequestItem, Ingredient, MenuItem, ReferenceData};
pub use sales::{ChannelSales, SalesAggregate, SalesSummaryRow, SalesTransaction, SalesWindow};
pub use types::{CycleAction, CycleStatus, DeliveryRound, TransactionType};
