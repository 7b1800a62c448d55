// ==========================================
// 门店补货预测系统 - 批量运行入口
// ==========================================
// 用法:
//   replenishment-mrp [db_path] [start_date] [end_date]
//
// - db_path 缺省时读取 MRP_DB_PATH, 再缺省时使用用户数据目录
// - 窗口为 [start_date, end_date), 缺省时为截至今天的 no_of_days 天
// - 对每个门店最近一个 OPEN/PROCESSED 周期计算预测, 结果以 JSON 输出
// ==========================================

use anyhow::{anyhow, Context};
use chrono::{Duration, Local, NaiveDate};
use replenishment_mrp::app::{get_default_db_path, AppState};
use replenishment_mrp::config::PolicyConfigReader;
use replenishment_mrp::domain::SalesWindow;
use replenishment_mrp::logging;

/// 批量运行使用的操作人
const BATCH_PRINCIPAL: &str = "system:batch";

fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("日期格式应为 YYYY-MM-DD: {}", raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - 批量预测", replenishment_mrp::APP_NAME);
    tracing::info!("系统版本: {}", replenishment_mrp::VERSION);
    tracing::info!("==================================================");

    let mut args = std::env::args().skip(1);
    let db_path = args
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    let window = match (args.next(), args.next()) {
        (Some(start), Some(end)) => SalesWindow::new(parse_date(&start)?, parse_date(&end)?),
        (None, None) => {
            let no_of_days = state
                .config_manager
                .get_no_of_days()
                .await
                .map_err(|e| anyhow!("读取 no_of_days 失败: {}", e))?;
            let end = Local::now().date_naive();
            SalesWindow::new(end - Duration::days(i64::from(no_of_days)), end)
        }
        _ => return Err(anyhow!("start_date 与 end_date 需同时给出")),
    };
    tracing::info!(
        "统计窗口: [{}, {})",
        window.start_date,
        window.end_date
    );

    let outcomes = state
        .cycle_api
        .run_all_areas(BATCH_PRINCIPAL, window)
        .await?;

    println!("{}", serde_json::to_string_pretty(&outcomes)?);
    Ok(())
}
