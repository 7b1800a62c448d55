// ==========================================
// 门店补货预测系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎, 不拼 SQL
// 流程: UsageModel → DemandAggregator → SnapshotReconciler → DeliveryRounder
// 红线: 计算保护 (除零/零用量) 就地归零, 不作为错误上抛
// ==========================================

pub mod authorization;
pub mod cycle_state;
pub mod delivery_rounder;
pub mod demand_aggregator;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod report;
pub mod repositories;
pub mod snapshot_reconciler;
pub mod usage_model;

// 重导出核心引擎
pub use authorization::{AllowAllCapabilities, CapabilityChecker, StaticCapabilities};
pub use cycle_state::{CycleStateMachine, TransitionRejected};
pub use delivery_rounder::{format_quantity, round_delivery, DeliveryRounder};
pub use demand_aggregator::{DemandAggregation, DemandAggregator};
pub use error::{EngineError, EngineResult};
pub use events::{CycleEvent, CycleEventType, CycleNotifier, NoOpNotifier, OptionalNotifier};
pub use orchestrator::{ForecastOrchestrator, ForecastRun};
pub use report::{
    CsvReportWriter, CycleReport, ReportAssembler, ReportError, ReportWriter,
};
pub use repositories::CycleRepositories;
pub use snapshot_reconciler::SnapshotReconciler;
pub use usage_model::{UsageFigures, UsageModel};
