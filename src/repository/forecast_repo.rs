// ==========================================
// 门店补货预测系统 - 预测结果仓储
// ==========================================
// 职责: 用量明细 / 销售汇总 / 预测行 的持久化
// 红线: 重算时三张表整体替换, 并与周期状态迁移在同一事务中提交
// ==========================================

use crate::domain::action_log::CycleActionLog;
use crate::domain::cycle::InventorySnapshot;
use crate::domain::forecast::{ForecastLine, UsageRow};
use crate::domain::sales::SalesSummaryRow;
use crate::domain::types::CycleStatus;
use crate::repository::action_log_repo::insert_in_tx;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::inventory_code_repo::update_in_tx;
use rusqlite::{params, Connection, TransactionBehavior};
use std::sync::{Arc, Mutex};

/// 一次预测计算的全部产物
#[derive(Debug, Clone, Default)]
pub struct ForecastArtifacts {
    pub usage_rows: Vec<UsageRow>,
    pub sales_summary: Vec<SalesSummaryRow>,
    pub forecast_lines: Vec<ForecastLine>,
}

// ==========================================
// ForecastRepository - 预测结果仓储
// ==========================================
pub struct ForecastRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ForecastRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 原子提交预测结果
    ///
    /// 单事务内:
    /// 1. 周期头 CAS (状态/revision)
    /// 2. 删除旧的用量明细/销售汇总/预测行并写入新结果
    /// 3. 写入操作日志
    ///
    /// 任何一步失败整体回滚, 已有结果保持不变
    pub fn commit_forecast(
        &self,
        snapshot: &InventorySnapshot,
        allowed_from: &[CycleStatus],
        artifacts: &ForecastArtifacts,
        log: &CycleActionLog,
    ) -> RepositoryResult<i32> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let code_id = snapshot.inventory_code_id.as_str();

        let revision = update_in_tx(&tx, snapshot, allowed_from)?;

        write_forecast_in_tx(&tx, code_id, artifacts)?;
        insert_in_tx(&tx, log)?;
        tx.commit()?;

        tracing::debug!(
            inventory_code_id = code_id,
            usage_rows = artifacts.usage_rows.len(),
            sales_summary = artifacts.sales_summary.len(),
            forecast_lines = artifacts.forecast_lines.len(),
            revision,
            "预测结果已提交"
        );
        Ok(revision)
    }

    /// 用量明细 (按写入顺序)
    pub fn find_usage_rows(&self, inventory_code_id: &str) -> RepositoryResult<Vec<UsageRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT menu_item_id, pos_code, menu_description, ingredient_id, bos_code,
                      ingredient_description, category, qty_sold, average_daily_sales,
                      average_daily_usage, weekly_usage, safety_stock, forecast_weekly_consumption
               FROM usage_row
               WHERE inventory_code_id = ?1
               ORDER BY seq_no"#,
        )?;
        let rows = stmt
            .query_map(params![inventory_code_id], |row| {
                Ok(UsageRow {
                    menu_item_id: row.get(0)?,
                    pos_code: row.get(1)?,
                    menu_description: row.get(2)?,
                    ingredient_id: row.get(3)?,
                    bos_code: row.get(4)?,
                    ingredient_description: row.get(5)?,
                    category: row.get(6)?,
                    qty_sold: row.get(7)?,
                    average_daily_sales: row.get(8)?,
                    average_daily_usage: row.get(9)?,
                    weekly_usage: row.get(10)?,
                    safety_stock: row.get(11)?,
                    forecast_weekly_consumption: row.get(12)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn find_sales_summary(
        &self,
        inventory_code_id: &str,
    ) -> RepositoryResult<Vec<SalesSummaryRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT menu_item_id, pos_code, area_id, area_name, dine_in_quantity,
                      take_out_quantity, average_dine_in_sold, average_take_out_sold
               FROM sales_summary
               WHERE inventory_code_id = ?1
               ORDER BY menu_item_id"#,
        )?;
        let rows = stmt
            .query_map(params![inventory_code_id], |row| {
                Ok(SalesSummaryRow {
                    menu_item_id: row.get(0)?,
                    pos_code: row.get(1)?,
                    area_id: row.get(2)?,
                    area_name: row.get(3)?,
                    dine_in_quantity: row.get(4)?,
                    take_out_quantity: row.get(5)?,
                    average_dine_in_sold: row.get(6)?,
                    average_take_out_sold: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn find_forecast_lines(&self, inventory_code_id: &str) -> RepositoryResult<Vec<ForecastLine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT inventory_code_id, ingredient_id, bos_code, total_average_daily_usage,
                      total_forecast_weekly_consumption, actual_ending, upcoming_delivery,
                      days_to_last, forecasted_ending_inventory, forecast,
                      converted_ending_inventory
               FROM forecast_line
               WHERE inventory_code_id = ?1
               ORDER BY ingredient_id"#,
        )?;
        let lines = stmt
            .query_map(params![inventory_code_id], |row| {
                Ok(ForecastLine {
                    inventory_code_id: row.get(0)?,
                    ingredient_id: row.get(1)?,
                    bos_code: row.get(2)?,
                    total_average_daily_usage: row.get(3)?,
                    total_forecast_weekly_consumption: row.get(4)?,
                    actual_ending: row.get(5)?,
                    upcoming_delivery: row.get(6)?,
                    days_to_last: row.get(7)?,
                    forecasted_ending_inventory: row.get(8)?,
                    forecast: row.get(9)?,
                    converted_ending_inventory: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }
}

/// 在调用方事务内整体替换预测结果
pub(crate) fn write_forecast_in_tx(
    conn: &Connection,
    code_id: &str,
    artifacts: &ForecastArtifacts,
) -> RepositoryResult<()> {
    for table in ["usage_row", "sales_summary", "forecast_line"] {
        conn.execute(
            &format!("DELETE FROM {} WHERE inventory_code_id = ?1", table),
            params![code_id],
        )?;
    }

    {
        let mut stmt = conn.prepare(
            r#"INSERT INTO usage_row (
                   inventory_code_id, seq_no, menu_item_id, pos_code, menu_description,
                   ingredient_id, bos_code, ingredient_description, category, qty_sold,
                   average_daily_sales, average_daily_usage, weekly_usage, safety_stock,
                   forecast_weekly_consumption
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"#,
        )?;
        for (seq_no, row) in artifacts.usage_rows.iter().enumerate() {
            stmt.execute(params![
                code_id,
                seq_no as i64,
                row.menu_item_id,
                row.pos_code,
                row.menu_description,
                row.ingredient_id,
                row.bos_code,
                row.ingredient_description,
                row.category,
                row.qty_sold,
                row.average_daily_sales,
                row.average_daily_usage,
                row.weekly_usage,
                row.safety_stock,
                row.forecast_weekly_consumption,
            ])?;
        }

        let mut stmt = conn.prepare(
            r#"INSERT INTO sales_summary (
                   inventory_code_id, menu_item_id, pos_code, area_id, area_name,
                   dine_in_quantity, take_out_quantity, average_dine_in_sold,
                   average_take_out_sold
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
        )?;
        for row in &artifacts.sales_summary {
            stmt.execute(params![
                code_id,
                row.menu_item_id,
                row.pos_code,
                row.area_id,
                row.area_name,
                row.dine_in_quantity,
                row.take_out_quantity,
                row.average_dine_in_sold,
                row.average_take_out_sold,
            ])?;
        }

        let mut stmt = conn.prepare(
            r#"INSERT INTO forecast_line (
                   inventory_code_id, ingredient_id, bos_code, total_average_daily_usage,
                   total_forecast_weekly_consumption, actual_ending, upcoming_delivery,
                   days_to_last, forecasted_ending_inventory, forecast,
                   converted_ending_inventory
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
        )?;
        for line in &artifacts.forecast_lines {
            stmt.execute(params![
                code_id,
                line.ingredient_id,
                line.bos_code,
                line.total_average_daily_usage,
                line.total_forecast_weekly_consumption,
                line.actual_ending,
                line.upcoming_delivery,
                line.days_to_last,
                line.forecasted_ending_inventory,
                line.forecast,
                line.converted_ending_inventory,
            ])?;
        }
    }
    Ok(())
}
