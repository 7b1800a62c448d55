// ==========================================
// 门店补货预测系统 - 库存周期 API
// ==========================================
// 职责: 周期创建、盘点录入、预测计算、配送调整、提交/审批/退回、报表、批量运行
// 红线:
// - 每个变更操作先做权限校验, 再做状态判定
// - 所有校验在写入之前完成; 写入与状态迁移、操作日志同一事务提交
// - 通知在提交之后发出, 失败不影响已提交的迁移
// ==========================================

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Local;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::PolicyConfigReader;
use crate::domain::action_log::CycleActionLog;
use crate::domain::cycle::InventorySnapshot;
use crate::domain::delivery::{AdjustmentBatch, ByRequestLine, DeliveryLine};
use crate::domain::forecast::{EndingInventoryLine, ForecastLine, UsageRow};
use crate::domain::reference::ReferenceData;
use crate::domain::sales::{SalesSummaryRow, SalesWindow};
use crate::domain::types::{CycleAction, CycleStatus};
use crate::engine::authorization::CapabilityChecker;
use crate::engine::cycle_state::CycleStateMachine;
use crate::engine::delivery_rounder::DeliveryRounder;
use crate::engine::events::{CycleEvent, CycleEventType, CycleNotifier, OptionalNotifier};
use crate::engine::orchestrator::{ForecastOrchestrator, ForecastRun};
use crate::engine::report::{ReportAssembler, ReportWriter};
use crate::engine::repositories::CycleRepositories;

// ==========================================
// 批量运行结果
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AreaRunStatus {
    /// 预测已提交
    Processed { forecast_lines: usize },
    /// 门店没有 OPEN/PROCESSED 周期
    Skipped,
    /// 该门店运行失败 (其他门店不受影响)
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRunOutcome {
    pub area_id: i64,
    pub area_name: String,
    pub inventory_code_id: Option<String>,
    pub status: AreaRunStatus,
}

/// 已计算好的调整批次结果
struct RoundedBatch {
    delivery_lines: Vec<DeliveryLine>,
    by_request_lines: Vec<ByRequestLine>,
}

// ==========================================
// CycleApi - 库存周期 API
// ==========================================
pub struct CycleApi<C>
where
    C: PolicyConfigReader,
{
    repos: CycleRepositories,
    orchestrator: ForecastOrchestrator<C>,
    rounder: DeliveryRounder,
    assembler: ReportAssembler,
    report_writer: Arc<dyn ReportWriter>,
    capabilities: Arc<dyn CapabilityChecker>,
    notifier: OptionalNotifier,
}

impl<C> CycleApi<C>
where
    C: PolicyConfigReader,
{
    pub fn new(
        repos: CycleRepositories,
        config: Arc<C>,
        report_writer: Arc<dyn ReportWriter>,
        capabilities: Arc<dyn CapabilityChecker>,
        notifier: Option<Arc<dyn CycleNotifier>>,
    ) -> Self {
        let notifier = match notifier {
            Some(n) => OptionalNotifier::with_notifier(n),
            None => OptionalNotifier::none(),
        };

        Self {
            repos,
            orchestrator: ForecastOrchestrator::new(config),
            rounder: DeliveryRounder::new(),
            assembler: ReportAssembler::new(),
            report_writer,
            capabilities,
            notifier,
        }
    }

    // ==========================================
    // 周期创建与盘点
    // ==========================================

    /// 创建库存周期
    ///
    /// # 错误
    /// - `NotFound`: 门店不存在
    /// - `Conflict`: 门店已有非终态周期
    pub fn create_snapshot(
        &self,
        principal: &str,
        area_id: i64,
        code: &str,
    ) -> ApiResult<InventorySnapshot> {
        validate_principal(principal)?;
        if code.trim().is_empty() {
            return Err(ApiError::ValidationError("周期编码不能为空".to_string()));
        }
        self.authorize(principal, CycleAction::Create, area_id, None)?;

        let areas = self.repos.reference_repo.list_areas()?;
        if !areas.iter().any(|a| a.area_id == area_id) {
            return Err(ApiError::NotFound(format!("门店(id={})不存在", area_id)));
        }

        let snapshot = InventorySnapshot::new_open(
            area_id,
            code.trim().to_string(),
            principal.to_string(),
            Local::now().naive_local(),
        );
        let log = CycleActionLog::new(
            &snapshot.inventory_code_id,
            CycleAction::Create,
            principal,
            None,
            CycleStatus::Open,
        )
        .with_payload(json!({ "area_id": area_id, "code": snapshot.code }));

        self.repos.inventory_code_repo.create_exclusive(&snapshot, &log)?;

        info!(
            inventory_code_id = %snapshot.inventory_code_id,
            area_id,
            code = %snapshot.code,
            "库存周期已创建"
        );
        Ok(snapshot)
    }

    /// 录入期末盘点 (仅 OPEN), 整体替换已有盘点行
    ///
    /// # 错误
    /// - `UnknownIngredients`: 盘点行引用了不存在的原料
    /// - `ValidationError`: 同一原料重复 / 数量为负
    pub fn load_ending_inventory(
        &self,
        principal: &str,
        inventory_code_id: &str,
        lines: Vec<EndingInventoryLine>,
    ) -> ApiResult<usize> {
        let snapshot = self.load_snapshot(inventory_code_id)?;
        let target = self.check_transition(principal, CycleAction::LoadInventory, &snapshot)?;

        let reference = self.repos.reference_repo.load_snapshot()?;
        let mut unknown: Vec<i64> = lines
            .iter()
            .map(|l| l.ingredient_id)
            .filter(|id| reference.ingredient(*id).is_none())
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            unknown.dedup();
            return Err(ApiError::UnknownIngredients { ids: unknown });
        }

        let mut seen = HashSet::with_capacity(lines.len());
        if let Some(dup) = lines.iter().find(|l| !seen.insert(l.ingredient_id)) {
            return Err(ApiError::ValidationError(format!(
                "原料{}的盘点行重复",
                dup.ingredient_id
            )));
        }

        let lines: Vec<EndingInventoryLine> = lines
            .into_iter()
            .map(|line| EndingInventoryLine {
                inventory_code_id: snapshot.inventory_code_id.clone(),
                ..line
            })
            .collect();

        let mut next = snapshot.clone();
        next.status = target;
        let log = self
            .transition_log(&snapshot, CycleAction::LoadInventory, principal, target)
            .with_payload(json!({ "lines": lines.len() }));

        self.repos.ending_inventory_repo.commit_load(
            &next,
            CycleStateMachine::allowed_from(CycleAction::LoadInventory),
            &lines,
            &log,
        )?;

        info!(inventory_code_id, lines = lines.len(), "期末盘点已录入");
        Ok(lines.len())
    }

    // ==========================================
    // 预测计算
    // ==========================================

    /// 计算预测 (OPEN/PROCESSED → PROCESSED), 重复执行时整体替换结果
    #[instrument(skip(self))]
    pub async fn process_forecast(
        &self,
        principal: &str,
        inventory_code_id: &str,
        window: SalesWindow,
    ) -> ApiResult<Vec<ForecastLine>> {
        if window.is_empty() {
            return Err(ApiError::ValidationError(format!(
                "统计窗口为空: [{}, {})",
                window.start_date, window.end_date
            )));
        }

        let snapshot = self.load_snapshot(inventory_code_id)?;
        let target = self.check_transition(principal, CycleAction::Process, &snapshot)?;

        let reference = Arc::new(self.repos.reference_repo.load_snapshot()?);
        let run = self.compute_forecast(&snapshot, window, reference).await?;

        let mut next = snapshot.clone();
        next.status = target;
        next.config_snapshot_json = Some(run.policy.to_snapshot_json());
        let log = self
            .transition_log(&snapshot, CycleAction::Process, principal, target)
            .with_payload(json!({
                "window": window,
                "usage_rows": run.artifacts.usage_rows.len(),
                "forecast_lines": run.artifacts.forecast_lines.len(),
            }));

        self.repos.forecast_repo.commit_forecast(
            &next,
            CycleStateMachine::allowed_from(CycleAction::Process),
            &run.artifacts,
            &log,
        )?;

        info!(
            inventory_code_id,
            forecast_lines = run.artifacts.forecast_lines.len(),
            "预测结果已提交"
        );
        Ok(run.artifacts.forecast_lines)
    }

    /// 批量运行: 每个门店最近一个 OPEN/PROCESSED 周期
    ///
    /// 门店之间并发执行, 单个门店失败不影响其他门店
    pub async fn run_all_areas(
        &self,
        principal: &str,
        window: SalesWindow,
    ) -> ApiResult<Vec<AreaRunOutcome>> {
        validate_principal(principal)?;
        let areas = self.repos.reference_repo.list_areas()?;

        info!(areas = areas.len(), "开始批量运行");

        let outcomes = join_all(areas.into_iter().map(|area| async move {
            let latest = self.repos.inventory_code_repo.find_latest_by_area(
                area.area_id,
                &[CycleStatus::Open, CycleStatus::Processed],
            );
            let (inventory_code_id, status) = match latest {
                Ok(None) => (None, AreaRunStatus::Skipped),
                Ok(Some(snapshot)) => {
                    let id = snapshot.inventory_code_id.clone();
                    let status = match self.process_forecast(principal, &id, window).await {
                        Ok(lines) => AreaRunStatus::Processed {
                            forecast_lines: lines.len(),
                        },
                        Err(e) => {
                            warn!(area_id = area.area_id, inventory_code_id = %id, error = %e, "门店运行失败");
                            AreaRunStatus::Failed {
                                reason: e.to_string(),
                            }
                        }
                    };
                    (Some(id), status)
                }
                Err(e) => (
                    None,
                    AreaRunStatus::Failed {
                        reason: ApiError::from(e).to_string(),
                    },
                ),
            };

            AreaRunOutcome {
                area_id: area.area_id,
                area_name: area.location,
                inventory_code_id,
                status,
            }
        }))
        .await;

        let processed = outcomes
            .iter()
            .filter(|o| matches!(o.status, AreaRunStatus::Processed { .. }))
            .count();
        let skipped = outcomes
            .iter()
            .filter(|o| o.status == AreaRunStatus::Skipped)
            .count();
        info!(
            processed,
            skipped,
            failed = outcomes.len() - processed - skipped,
            "批量运行完成"
        );
        Ok(outcomes)
    }

    // ==========================================
    // 配送调整与提交
    // ==========================================

    /// 保存调整草稿 (PROCESSED/DRAFT/AMENDED → DRAFT)
    pub fn save_draft(
        &self,
        principal: &str,
        inventory_code_id: &str,
        batch: AdjustmentBatch,
    ) -> ApiResult<Vec<DeliveryLine>> {
        let snapshot = self.load_snapshot(inventory_code_id)?;
        let target = self.check_transition(principal, CycleAction::SaveDraft, &snapshot)?;

        let reference = self.repos.reference_repo.load_snapshot()?;
        let forecast_lines = self.repos.forecast_repo.find_forecast_lines(inventory_code_id)?;
        let rounded = self.round_batch(&snapshot, &forecast_lines, &batch, &reference)?;

        let mut next = snapshot.clone();
        next.status = target;
        let log = self
            .transition_log(&snapshot, CycleAction::SaveDraft, principal, target)
            .with_payload(batch_payload(&snapshot, &batch));

        self.repos.delivery_repo.commit_adjustments(
            &next,
            CycleStateMachine::allowed_from(CycleAction::SaveDraft),
            None,
            &rounded.delivery_lines,
            &rounded.by_request_lines,
            &log,
        )?;

        info!(
            inventory_code_id,
            round = snapshot.delivery_round.number(),
            delivery_lines = rounded.delivery_lines.len(),
            by_request_lines = rounded.by_request_lines.len(),
            "调整草稿已保存"
        );
        Ok(rounded.delivery_lines)
    }

    /// 提交审批 (PROCESSED/DRAFT/AMENDED → SUBMITTED)
    ///
    /// 提交后通知门店全部审批权限持有人
    pub fn submit(
        &self,
        principal: &str,
        inventory_code_id: &str,
        batch: AdjustmentBatch,
    ) -> ApiResult<Vec<DeliveryLine>> {
        let snapshot = self.load_snapshot(inventory_code_id)?;
        let target = self.check_transition(principal, CycleAction::Submit, &snapshot)?;

        let reference = self.repos.reference_repo.load_snapshot()?;
        let forecast_lines = self.repos.forecast_repo.find_forecast_lines(inventory_code_id)?;
        let rounded = self.round_batch(&snapshot, &forecast_lines, &batch, &reference)?;

        self.commit_submission(
            &snapshot,
            CycleAction::Submit,
            target,
            principal,
            &batch,
            None,
            rounded,
        )
    }

    /// 退回后重新提交 (AMENDED → SUBMITTED)
    ///
    /// `recompute` 给出统计窗口时先重算预测, 并与调整结果同一事务提交;
    /// 否则沿用已有预测行
    pub async fn resubmit(
        &self,
        principal: &str,
        inventory_code_id: &str,
        batch: AdjustmentBatch,
        recompute: Option<SalesWindow>,
    ) -> ApiResult<Vec<DeliveryLine>> {
        let snapshot = self.load_snapshot(inventory_code_id)?;
        let target = self.check_transition(principal, CycleAction::Resubmit, &snapshot)?;

        let reference = Arc::new(self.repos.reference_repo.load_snapshot()?);
        let recomputed = match recompute {
            Some(window) if window.is_empty() => {
                return Err(ApiError::ValidationError(format!(
                    "统计窗口为空: [{}, {})",
                    window.start_date, window.end_date
                )));
            }
            Some(window) => Some(
                self.compute_forecast(&snapshot, window, Arc::clone(&reference))
                    .await?,
            ),
            None => None,
        };

        let forecast_lines = match &recomputed {
            Some(run) => run.artifacts.forecast_lines.clone(),
            None => self.repos.forecast_repo.find_forecast_lines(inventory_code_id)?,
        };
        let rounded = self.round_batch(&snapshot, &forecast_lines, &batch, &reference)?;

        self.commit_submission(
            &snapshot,
            CycleAction::Resubmit,
            target,
            principal,
            &batch,
            recomputed,
            rounded,
        )
    }

    // ==========================================
    // 审批
    // ==========================================

    /// 审批通过 (SUBMITTED → APPROVED), 生成报表并记录到周期
    pub fn approve(
        &self,
        principal: &str,
        inventory_code_id: &str,
        message: Option<String>,
    ) -> ApiResult<InventorySnapshot> {
        let snapshot = self.load_snapshot(inventory_code_id)?;
        let target = self.check_transition(principal, CycleAction::Approve, &snapshot)?;

        let artifact = self.write_report(&snapshot)?;

        let mut next = snapshot.clone();
        next.status = target;
        next.report_file = Some(artifact.clone());
        next.review_message = normalize_message(message);
        let log = self
            .transition_log(&snapshot, CycleAction::Approve, principal, target)
            .with_message(next.review_message.clone())
            .with_payload(json!({ "report_file": artifact }));

        next.revision = self.repos.inventory_code_repo.update_status(
            &next,
            CycleStateMachine::allowed_from(CycleAction::Approve),
            &log,
        )?;

        info!(inventory_code_id, report_file = %artifact, "周期已审批");
        self.notify_submitter(&next, CycleEventType::Approved, principal);
        Ok(next)
    }

    /// 退回修改 (SUBMITTED → AMENDED), 进入下一配送轮次
    ///
    /// # 错误
    /// - `ValidationError`: 未填写审批意见
    /// - `Conflict`: 已是第三轮, 不能再退回
    pub fn amend(
        &self,
        principal: &str,
        inventory_code_id: &str,
        message: &str,
    ) -> ApiResult<InventorySnapshot> {
        let message = normalize_message(Some(message.to_string()))
            .ok_or_else(|| ApiError::ValidationError("退回必须填写审批意见".to_string()))?;

        let snapshot = self.load_snapshot(inventory_code_id)?;
        let target = self.check_transition(principal, CycleAction::Amend, &snapshot)?;

        let next_round = snapshot.delivery_round.next().ok_or_else(|| {
            ApiError::Conflict(format!(
                "周期{}已是第{}轮, 不能再退回",
                inventory_code_id,
                snapshot.delivery_round.number()
            ))
        })?;

        let mut next = snapshot.clone();
        next.status = target;
        next.delivery_round = next_round;
        next.review_message = Some(message.clone());
        let log = self
            .transition_log(&snapshot, CycleAction::Amend, principal, target)
            .with_message(Some(message))
            .with_payload(json!({
                "from_round": snapshot.delivery_round.number(),
                "to_round": next_round.number(),
            }));

        next.revision = self.repos.inventory_code_repo.update_status(
            &next,
            CycleStateMachine::allowed_from(CycleAction::Amend),
            &log,
        )?;

        info!(inventory_code_id, round = next_round.number(), "周期已退回");
        self.notify_submitter(&next, CycleEventType::Amended, principal);
        Ok(next)
    }

    /// 软删除 (OPEN/PROCESSED/DRAFT/AMENDED → DELETED)
    pub fn delete(&self, principal: &str, inventory_code_id: &str) -> ApiResult<()> {
        let snapshot = self.load_snapshot(inventory_code_id)?;
        let target = self.check_transition(principal, CycleAction::Delete, &snapshot)?;

        let mut next = snapshot.clone();
        next.status = target;
        let log = self.transition_log(&snapshot, CycleAction::Delete, principal, target);

        self.repos.inventory_code_repo.update_status(
            &next,
            CycleStateMachine::allowed_from(CycleAction::Delete),
            &log,
        )?;

        info!(inventory_code_id, "周期已删除");
        Ok(())
    }

    // ==========================================
    // 报表
    // ==========================================

    /// 生成报表, 返回产物名称
    ///
    /// 不改变周期状态; 需已有预测结果
    pub fn generate_report(&self, inventory_code_id: &str) -> ApiResult<String> {
        let snapshot = self.load_snapshot(inventory_code_id)?;
        if matches!(snapshot.status, CycleStatus::Open | CycleStatus::Deleted) {
            return Err(ApiError::InvalidStateTransition {
                id: snapshot.inventory_code_id.clone(),
                from: snapshot.status.to_string(),
                to: "REPORT".to_string(),
            });
        }
        self.write_report(&snapshot)
    }

    // ==========================================
    // 查询接口
    // ==========================================

    pub fn get_snapshot(&self, inventory_code_id: &str) -> ApiResult<InventorySnapshot> {
        self.load_snapshot(inventory_code_id)
    }

    /// 门店的全部周期 (按创建时间倒序)
    pub fn list_snapshots(&self, area_id: i64) -> ApiResult<Vec<InventorySnapshot>> {
        Ok(self.repos.inventory_code_repo.list_by_area(area_id)?)
    }

    pub fn get_forecast_lines(&self, inventory_code_id: &str) -> ApiResult<Vec<ForecastLine>> {
        self.load_snapshot(inventory_code_id)?;
        Ok(self.repos.forecast_repo.find_forecast_lines(inventory_code_id)?)
    }

    pub fn get_usage_rows(&self, inventory_code_id: &str) -> ApiResult<Vec<UsageRow>> {
        self.load_snapshot(inventory_code_id)?;
        Ok(self.repos.forecast_repo.find_usage_rows(inventory_code_id)?)
    }

    pub fn get_sales_summary(&self, inventory_code_id: &str) -> ApiResult<Vec<SalesSummaryRow>> {
        self.load_snapshot(inventory_code_id)?;
        Ok(self.repos.forecast_repo.find_sales_summary(inventory_code_id)?)
    }

    /// 按配送单号查询配送行
    ///
    /// # 错误
    /// - `NotFound`: 配送单号不存在
    pub fn get_delivery_lines(&self, delivery_code: &str) -> ApiResult<Vec<DeliveryLine>> {
        let lines = self.repos.delivery_repo.find_delivery_lines(delivery_code)?;
        if lines.is_empty() {
            return Err(ApiError::NotFound(format!(
                "配送单(delivery_code={})不存在",
                delivery_code
            )));
        }
        Ok(lines)
    }

    pub fn get_by_request_lines(&self, inventory_code_id: &str) -> ApiResult<Vec<ByRequestLine>> {
        self.load_snapshot(inventory_code_id)?;
        Ok(self.repos.delivery_repo.find_by_request_lines(inventory_code_id)?)
    }

    pub fn get_action_log(&self, inventory_code_id: &str) -> ApiResult<Vec<CycleActionLog>> {
        self.load_snapshot(inventory_code_id)?;
        Ok(self
            .repos
            .action_log_repo
            .find_by_inventory_code(inventory_code_id)?)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn load_snapshot(&self, inventory_code_id: &str) -> ApiResult<InventorySnapshot> {
        self.repos
            .inventory_code_repo
            .find_by_id(inventory_code_id)?
            .ok_or_else(|| ApiError::NotFound(format!("库存周期(id={})不存在", inventory_code_id)))
    }

    fn authorize(
        &self,
        principal: &str,
        action: CycleAction,
        area_id: i64,
        snapshot: Option<&InventorySnapshot>,
    ) -> ApiResult<()> {
        if self
            .capabilities
            .can_perform(principal, action, area_id, snapshot)
        {
            Ok(())
        } else {
            warn!(principal, action = %action, area_id, "权限校验未通过");
            Err(ApiError::PermissionDenied {
                principal: principal.to_string(),
                action: action.to_string(),
            })
        }
    }

    /// 权限 → 状态判定, 返回目标状态
    fn check_transition(
        &self,
        principal: &str,
        action: CycleAction,
        snapshot: &InventorySnapshot,
    ) -> ApiResult<CycleStatus> {
        validate_principal(principal)?;
        self.authorize(principal, action, snapshot.area_id, Some(snapshot))?;
        CycleStateMachine::check(action, snapshot).map_err(|rejected| {
            ApiError::InvalidStateTransition {
                id: snapshot.inventory_code_id.clone(),
                from: rejected.from.to_string(),
                to: CycleStateMachine::target(action).to_string(),
            }
        })
    }

    fn transition_log(
        &self,
        snapshot: &InventorySnapshot,
        action: CycleAction,
        principal: &str,
        target: CycleStatus,
    ) -> CycleActionLog {
        CycleActionLog::new(
            &snapshot.inventory_code_id,
            action,
            principal,
            Some(snapshot.status),
            target,
        )
    }

    async fn compute_forecast(
        &self,
        snapshot: &InventorySnapshot,
        window: SalesWindow,
        reference: Arc<ReferenceData>,
    ) -> ApiResult<ForecastRun> {
        let aggregates = self
            .repos
            .sales_repo
            .aggregate_window(snapshot.area_id, window)?;
        let ending_lines = self
            .repos
            .ending_inventory_repo
            .find_by_code(&snapshot.inventory_code_id)?;

        Ok(self
            .orchestrator
            .run(snapshot, &aggregates, &ending_lines, reference)
            .await?)
    }

    /// 按当前轮次计算配送行与按需行 (整批校验)
    fn round_batch(
        &self,
        snapshot: &InventorySnapshot,
        forecast_lines: &[ForecastLine],
        batch: &AdjustmentBatch,
        reference: &ReferenceData,
    ) -> ApiResult<RoundedBatch> {
        let code_id = snapshot.inventory_code_id.as_str();
        let delivery_code = snapshot.delivery_code();

        let existing_delivery = self.repos.delivery_repo.find_delivery_lines_by_code_id(code_id)?;
        let existing_by_request = self.repos.delivery_repo.find_by_request_lines(code_id)?;

        let delivery_lines = self.rounder.apply_delivery_round(
            snapshot.delivery_round,
            &delivery_code,
            forecast_lines,
            &existing_delivery,
            &batch.deliveries,
            reference,
        )?;
        let by_request_lines = self.rounder.apply_by_request_round(
            snapshot.delivery_round,
            code_id,
            &delivery_code,
            &existing_by_request,
            &batch.by_requests,
            reference,
        )?;

        Ok(RoundedBatch {
            delivery_lines,
            by_request_lines,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn commit_submission(
        &self,
        snapshot: &InventorySnapshot,
        action: CycleAction,
        target: CycleStatus,
        principal: &str,
        batch: &AdjustmentBatch,
        recomputed: Option<ForecastRun>,
        rounded: RoundedBatch,
    ) -> ApiResult<Vec<DeliveryLine>> {
        if rounded.delivery_lines.is_empty() && rounded.by_request_lines.is_empty() {
            return Err(ApiError::ValidationError(format!(
                "周期{}没有可提交的配送调整",
                snapshot.inventory_code_id
            )));
        }

        let mut next = snapshot.clone();
        next.status = target;
        next.submitted_by = Some(principal.to_string());
        next.review_message = None;
        if let Some(run) = &recomputed {
            next.config_snapshot_json = Some(run.policy.to_snapshot_json());
        }

        let mut payload = batch_payload(snapshot, batch);
        payload["recomputed"] = json!(recomputed.is_some());
        let log = self
            .transition_log(snapshot, action, principal, target)
            .with_payload(payload);

        self.repos.delivery_repo.commit_adjustments(
            &next,
            CycleStateMachine::allowed_from(action),
            recomputed.as_ref().map(|run| &run.artifacts),
            &rounded.delivery_lines,
            &rounded.by_request_lines,
            &log,
        )?;

        info!(
            inventory_code_id = %snapshot.inventory_code_id,
            action = %action,
            round = snapshot.delivery_round.number(),
            delivery_lines = rounded.delivery_lines.len(),
            by_request_lines = rounded.by_request_lines.len(),
            "周期已提交审批"
        );

        let recipients = self
            .capabilities
            .holders(snapshot.area_id, CycleAction::Approve);
        self.notifier.notify_best_effort(CycleEvent::new(
            &snapshot.inventory_code_id,
            snapshot.area_id,
            CycleEventType::Submitted,
            recipients,
            principal,
        ));

        Ok(rounded.delivery_lines)
    }

    fn write_report(&self, snapshot: &InventorySnapshot) -> ApiResult<String> {
        let code_id = snapshot.inventory_code_id.as_str();
        let reference = self.repos.reference_repo.load_snapshot()?;
        let report = self.assembler.assemble(
            snapshot,
            &self.repos.forecast_repo.find_usage_rows(code_id)?,
            &self.repos.forecast_repo.find_forecast_lines(code_id)?,
            &self.repos.forecast_repo.find_sales_summary(code_id)?,
            &reference,
        );
        Ok(self.report_writer.write(&report)?)
    }

    fn notify_submitter(&self, snapshot: &InventorySnapshot, event_type: CycleEventType, actor: &str) {
        let Some(submitter) = snapshot.submitted_by.clone() else {
            warn!(
                inventory_code_id = %snapshot.inventory_code_id,
                event_type = event_type.as_str(),
                "周期没有提交人, 跳过通知"
            );
            return;
        };

        let event = CycleEvent::new(
            &snapshot.inventory_code_id,
            snapshot.area_id,
            event_type,
            vec![submitter],
            actor,
        )
        .with_message(snapshot.review_message.clone());
        self.notifier.notify_best_effort(event);
    }
}

fn validate_principal(principal: &str) -> ApiResult<()> {
    if principal.trim().is_empty() {
        return Err(ApiError::ValidationError("操作人不能为空".to_string()));
    }
    Ok(())
}

fn normalize_message(message: Option<String>) -> Option<String> {
    message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

fn batch_payload(snapshot: &InventorySnapshot, batch: &AdjustmentBatch) -> serde_json::Value {
    json!({
        "round": snapshot.delivery_round.number(),
        "deliveries": batch.deliveries,
        "by_requests": batch.by_requests,
    })
}
