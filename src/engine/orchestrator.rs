// ==========================================
// 门店补货预测系统 - 预测编排器
// ==========================================
// 用途: 按顺序协调 需求汇总 → 盘点对账, 产出一次预测的全部结果
// 说明: 编排器不落库, 结果由 CycleApi 与状态迁移一起原子提交
// ==========================================

use crate::config::{ForecastPolicy, PolicyConfigReader};
use crate::domain::cycle::InventorySnapshot;
use crate::domain::forecast::EndingInventoryLine;
use crate::domain::reference::ReferenceData;
use crate::domain::sales::SalesAggregate;
use crate::engine::demand_aggregator::DemandAggregator;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::snapshot_reconciler::SnapshotReconciler;
use crate::repository::ForecastArtifacts;
use std::sync::Arc;
use tracing::{debug, info};

/// 一次预测运行的结果
#[derive(Debug, Clone)]
pub struct ForecastRun {
    pub artifacts: ForecastArtifacts,
    /// 本次运行使用的参数
    pub policy: ForecastPolicy,
}

// ==========================================
// ForecastOrchestrator - 预测编排器
// ==========================================
pub struct ForecastOrchestrator<C>
where
    C: PolicyConfigReader,
{
    config: Arc<C>,
}

impl<C> ForecastOrchestrator<C>
where
    C: PolicyConfigReader,
{
    pub fn new(config: Arc<C>) -> Self {
        Self { config }
    }

    /// 解析本次运行的策略参数
    pub async fn resolve_policy(&self) -> EngineResult<ForecastPolicy> {
        self.config
            .resolve_policy()
            .await
            .map_err(|e| EngineError::ConfigError(e.to_string()))
    }

    /// 执行完整预测流程 (单门店单周期)
    pub async fn run(
        &self,
        snapshot: &InventorySnapshot,
        aggregates: &[SalesAggregate],
        ending_lines: &[EndingInventoryLine],
        reference: Arc<ReferenceData>,
    ) -> EngineResult<ForecastRun> {
        let policy = self.resolve_policy().await?;
        self.run_with_policy(policy, snapshot, aggregates, ending_lines, reference)
            .await
    }

    /// 使用给定参数执行预测流程
    pub async fn run_with_policy(
        &self,
        policy: ForecastPolicy,
        snapshot: &InventorySnapshot,
        aggregates: &[SalesAggregate],
        ending_lines: &[EndingInventoryLine],
        reference: Arc<ReferenceData>,
    ) -> EngineResult<ForecastRun> {
        info!(
            inventory_code_id = %snapshot.inventory_code_id,
            area_id = snapshot.area_id,
            aggregates = aggregates.len(),
            ending_lines = ending_lines.len(),
            "开始执行预测流程"
        );

        // ==========================================
        // 步骤1: DemandAggregator - 需求汇总
        // ==========================================
        debug!("步骤1: 执行需求汇总");
        let aggregation = DemandAggregator::new(&policy)
            .aggregate(snapshot.area_id, aggregates, Arc::clone(&reference))
            .await?;

        // ==========================================
        // 步骤2: SnapshotReconciler - 盘点对账 (使用全精度用量)
        // ==========================================
        debug!("步骤2: 执行盘点对账");
        let forecast_lines = SnapshotReconciler::new(policy.days_before_delivery).reconcile(
            &snapshot.inventory_code_id,
            &aggregation.usage_rows,
            ending_lines,
            &reference,
        );

        // ==========================================
        // 步骤3: 展示精度
        // ==========================================
        let usage_rows = aggregation.usage_rows.iter().map(|row| row.rounded()).collect();

        info!(
            inventory_code_id = %snapshot.inventory_code_id,
            usage_rows = aggregation.usage_rows.len(),
            forecast_lines = forecast_lines.len(),
            sales_summary = aggregation.sales_summary.len(),
            "预测流程完成"
        );

        Ok(ForecastRun {
            artifacts: ForecastArtifacts {
                usage_rows,
                sales_summary: aggregation.sales_summary,
                forecast_lines,
            },
            policy,
        })
    }
}
