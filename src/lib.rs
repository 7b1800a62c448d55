// ==========================================
// 门店补货预测系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + Tokio
// 系统定位: 补货建议 + 人工调整审批 (人工最终控制权)
// 流程: 销量汇总 → 原料用量 → 盘点对账 → 配送取整 → 提交/审批
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 策略参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CycleAction, CycleStatus, DeliveryRound, TransactionType};

// 领域实体
pub use domain::{
    AdjustmentBatch, ByRequestEntry, ByRequestLine, CycleActionLog, DeliveryAdjustment,
    DeliveryLine, EndingInventoryLine, ForecastLine, InventorySnapshot, ReferenceData,
    SalesWindow, UsageRow,
};

// 引擎
pub use engine::{
    CycleStateMachine, DeliveryRounder, DemandAggregator, ForecastOrchestrator,
    SnapshotReconciler, UsageModel,
};

// API
pub use api::{ApiError, ApiResult, CycleApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "门店补货预测系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";
