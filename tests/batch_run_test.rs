// ==========================================
// 批量运行测试
// ==========================================
// 测试范围: 多门店并发预测、跳过/失败隔离、统计窗口半开区间
// ==========================================

mod helpers;
#[path = "test_helpers.rs"]
mod test_helpers;

use std::sync::Arc;

use chrono::Duration;
use replenishment_mrp::api::{AreaRunOutcome, AreaRunStatus};
use replenishment_mrp::domain::{AdjustmentBatch, CycleAction, CycleStatus, SalesWindow};
use replenishment_mrp::engine::StaticCapabilities;

use test_helpers::*;

const BATCH: &str = "system:batch";

fn outcome_for(outcomes: &[AreaRunOutcome], area_id: i64) -> &AreaRunOutcome {
    outcomes
        .iter()
        .find(|o| o.area_id == area_id)
        .unwrap_or_else(|| panic!("no outcome for area {}", area_id))
}

#[tokio::test]
async fn test_run_all_areas_processes_open_cycles_and_skips_others() {
    let env = setup_env();

    let imus = env.api.create_snapshot(BATCH, AREA_IMUS, "INV-IMUS").unwrap();
    env.api
        .load_ending_inventory(BATCH, &imus.inventory_code_id, vec![bun_ending_line()])
        .unwrap();

    // 门店 2 已提交, 不在批量范围内
    let bacoor = env.api.create_snapshot(BATCH, AREA_BACOOR, "INV-BACOOR").unwrap();
    env.api
        .process_forecast(BATCH, &bacoor.inventory_code_id, default_window())
        .await
        .unwrap();
    env.api
        .submit(BATCH, &bacoor.inventory_code_id, AdjustmentBatch::default())
        .unwrap();

    let outcomes = env.api.run_all_areas(BATCH, default_window()).await.unwrap();
    assert_eq!(outcomes.len(), 3);

    let imus_outcome = outcome_for(&outcomes, AREA_IMUS);
    assert_eq!(imus_outcome.area_name, "SM Imus");
    assert_eq!(
        imus_outcome.inventory_code_id.as_deref(),
        Some(imus.inventory_code_id.as_str())
    );
    assert_eq!(
        imus_outcome.status,
        AreaRunStatus::Processed { forecast_lines: 1 }
    );

    assert_eq!(outcome_for(&outcomes, AREA_BACOOR).status, AreaRunStatus::Skipped);
    assert_eq!(outcome_for(&outcomes, AREA_EMPTY).status, AreaRunStatus::Skipped);
    assert!(outcome_for(&outcomes, AREA_EMPTY).inventory_code_id.is_none());

    let imus = env.api.get_snapshot(&imus.inventory_code_id).unwrap();
    assert_eq!(imus.status, CycleStatus::Processed);
    let bacoor = env.api.get_snapshot(&bacoor.inventory_code_id).unwrap();
    assert_eq!(bacoor.status, CycleStatus::Submitted);
}

#[tokio::test]
async fn test_failure_in_one_area_does_not_affect_others() {
    // 批处理账号只在门店 1 有计算权限
    let capabilities = StaticCapabilities::new()
        .grant(AREA_IMUS, BATCH, &[CycleAction::Create, CycleAction::Process])
        .grant(AREA_BACOOR, BATCH, &[CycleAction::Create]);
    let env = setup_env_with(Arc::new(capabilities), Arc::new(RecordingNotifier::default()));

    let imus = env.api.create_snapshot(BATCH, AREA_IMUS, "INV-IMUS").unwrap();
    let bacoor = env.api.create_snapshot(BATCH, AREA_BACOOR, "INV-BACOOR").unwrap();

    let outcomes = env.api.run_all_areas(BATCH, default_window()).await.unwrap();

    assert!(matches!(
        outcome_for(&outcomes, AREA_IMUS).status,
        AreaRunStatus::Processed { .. }
    ));
    match &outcome_for(&outcomes, AREA_BACOOR).status {
        AreaRunStatus::Failed { reason } => assert!(!reason.is_empty()),
        other => panic!("unexpected status: {:?}", other),
    }

    assert_eq!(
        env.api.get_snapshot(&imus.inventory_code_id).unwrap().status,
        CycleStatus::Processed
    );
    assert_eq!(
        env.api.get_snapshot(&bacoor.inventory_code_id).unwrap().status,
        CycleStatus::Open
    );
}

#[tokio::test]
async fn test_rerun_recomputes_processed_cycles() {
    let env = setup_env();
    let imus = env.api.create_snapshot(BATCH, AREA_IMUS, "INV-IMUS").unwrap();

    env.api.run_all_areas(BATCH, default_window()).await.unwrap();
    let outcomes = env.api.run_all_areas(BATCH, default_window()).await.unwrap();

    assert_eq!(
        outcome_for(&outcomes, AREA_IMUS).status,
        AreaRunStatus::Processed { forecast_lines: 1 }
    );
    let snapshot = env.api.get_snapshot(&imus.inventory_code_id).unwrap();
    assert_eq!(snapshot.revision, 2);
}

#[tokio::test]
async fn test_sales_window_is_half_open() {
    let env = setup_env();
    let snapshot = env.api.create_snapshot(BATCH, AREA_IMUS, "INV-WIN").unwrap();
    let id = snapshot.inventory_code_id;

    // [01-02, 01-23): 20 天 × 11 份 + 结束日之前的 1000 份
    let start = window_start();
    let shifted = SalesWindow::new(start + Duration::days(1), start + Duration::days(22));
    env.api.process_forecast(BATCH, &id, shifted).await.unwrap();

    let usage = env.api.get_usage_rows(&id).unwrap();
    assert_eq!(usage[0].qty_sold, 1220);

    // [01-01, 01-22): 结束日的 1000 份不计入
    env.api
        .process_forecast(BATCH, &id, default_window())
        .await
        .unwrap();
    let usage = env.api.get_usage_rows(&id).unwrap();
    assert_eq!(usage[0].qty_sold, 231);

    let sales = env.api.get_sales_summary(&id).unwrap();
    assert_eq!(sales[0].dine_in_quantity, 231);
    assert_eq!(sales[0].take_out_quantity, 0);
    assert_eq!(sales[0].average_dine_in_sold, 11.0);
}

#[tokio::test]
async fn test_cycle_without_ending_inventory_uses_zero_stock() {
    let env = setup_env();
    let snapshot = env.api.create_snapshot(BATCH, AREA_IMUS, "INV-ZERO").unwrap();

    let lines = env
        .api
        .process_forecast(BATCH, &snapshot.inventory_code_id, default_window())
        .await
        .unwrap();

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].actual_ending, 0.0);
    assert_eq!(lines[0].days_to_last, 0.0);
    assert_eq!(lines[0].forecasted_ending_inventory, 0.0);
    assert_eq!(lines[0].forecast, 212.0);
    assert_eq!(lines[0].converted_ending_inventory, 18.0);
}
