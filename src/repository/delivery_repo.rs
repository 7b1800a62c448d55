// ==========================================
// 门店补货预测系统 - 配送/按需申请仓储
// ==========================================
// 职责: 配送行与按需申请行的原子写入与查询
// 存储: 三轮调整以 JSON (rounds_json) 存放在行内
// 红线: 同一配送单号下每种原料/品项至多一行
// ==========================================

use crate::domain::action_log::CycleActionLog;
use crate::domain::cycle::InventorySnapshot;
use crate::domain::delivery::{ByRequestLine, DeliveryLine, RoundSet};
use crate::domain::types::CycleStatus;
use crate::repository::action_log_repo::insert_in_tx;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::forecast_repo::{write_forecast_in_tx, ForecastArtifacts};
use crate::repository::inventory_code_repo::update_in_tx;
use rusqlite::{params, Connection, TransactionBehavior};
use std::sync::{Arc, Mutex};

pub struct DeliveryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DeliveryRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 原子提交一次调整批次
    ///
    /// 单事务内完成周期头 CAS、配送行/按需行整体替换、操作日志写入;
    /// `recomputed` 非空时同时替换预测结果 (退回后重算再提交)
    pub fn commit_adjustments(
        &self,
        snapshot: &InventorySnapshot,
        allowed_from: &[CycleStatus],
        recomputed: Option<&ForecastArtifacts>,
        delivery_lines: &[DeliveryLine],
        by_request_lines: &[ByRequestLine],
        log: &CycleActionLog,
    ) -> RepositoryResult<i32> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let code_id = snapshot.inventory_code_id.as_str();

        let revision = update_in_tx(&tx, snapshot, allowed_from)?;
        if let Some(artifacts) = recomputed {
            write_forecast_in_tx(&tx, code_id, artifacts)?;
        }

        tx.execute(
            "DELETE FROM delivery_line WHERE inventory_code_id = ?1",
            params![code_id],
        )?;
        tx.execute(
            "DELETE FROM by_request_line WHERE inventory_code_id = ?1",
            params![code_id],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO delivery_line (
                       inventory_code_id, delivery_code, ingredient_id, bos_code, forecast,
                       rounds_json
                   ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            )?;
            for line in delivery_lines {
                stmt.execute(params![
                    code_id,
                    line.delivery_code,
                    line.ingredient_id,
                    line.bos_code,
                    line.forecast,
                    serde_json::to_string(&line.rounds)?,
                ])?;
            }

            let mut stmt = tx.prepare(
                r#"INSERT INTO by_request_line (
                       inventory_code_id, delivery_code, item_id, item_code, rounds_json,
                       total_delivery, total_qty_delivered
                   ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            )?;
            for line in by_request_lines {
                stmt.execute(params![
                    code_id,
                    line.delivery_code,
                    line.item_id,
                    line.item_code,
                    serde_json::to_string(&line.rounds)?,
                    line.total_delivery,
                    line.total_qty_delivered,
                ])?;
            }
        }

        insert_in_tx(&tx, log)?;
        tx.commit()?;

        tracing::debug!(
            inventory_code_id = code_id,
            delivery_lines = delivery_lines.len(),
            by_request_lines = by_request_lines.len(),
            revision,
            "调整批次已提交"
        );
        Ok(revision)
    }

    /// 按配送单号查询配送行
    pub fn find_delivery_lines(&self, delivery_code: &str) -> RepositoryResult<Vec<DeliveryLine>> {
        self.query_delivery_lines("delivery_code", delivery_code)
    }

    /// 按周期查询配送行
    pub fn find_delivery_lines_by_code_id(
        &self,
        inventory_code_id: &str,
    ) -> RepositoryResult<Vec<DeliveryLine>> {
        self.query_delivery_lines("inventory_code_id", inventory_code_id)
    }

    pub fn find_by_request_lines(
        &self,
        inventory_code_id: &str,
    ) -> RepositoryResult<Vec<ByRequestLine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT inventory_code_id, delivery_code, item_id, item_code, rounds_json,
                      total_delivery, total_qty_delivered
               FROM by_request_line
               WHERE inventory_code_id = ?1
               ORDER BY item_id"#,
        )?;
        let raw = stmt
            .query_map(params![inventory_code_id], |row| {
                Ok((
                    ByRequestLine {
                        inventory_code_id: row.get(0)?,
                        delivery_code: row.get(1)?,
                        item_id: row.get(2)?,
                        item_code: row.get(3)?,
                        rounds: RoundSet::default(),
                        total_delivery: row.get(5)?,
                        total_qty_delivered: row.get(6)?,
                    },
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut lines = Vec::with_capacity(raw.len());
        for (mut line, rounds_json) in raw {
            line.rounds = serde_json::from_str(&rounds_json)?;
            lines.push(line);
        }
        Ok(lines)
    }

    fn query_delivery_lines(&self, column: &str, value: &str) -> RepositoryResult<Vec<DeliveryLine>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT inventory_code_id, delivery_code, ingredient_id, bos_code, forecast, rounds_json
               FROM delivery_line
               WHERE {} = ?1
               ORDER BY ingredient_id"#,
            column
        );
        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params![value], |row| {
                Ok((
                    DeliveryLine {
                        inventory_code_id: row.get(0)?,
                        delivery_code: row.get(1)?,
                        ingredient_id: row.get(2)?,
                        bos_code: row.get(3)?,
                        forecast: row.get(4)?,
                        rounds: RoundSet::default(),
                    },
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut lines = Vec::with_capacity(raw.len());
        for (mut line, rounds_json) in raw {
            line.rounds = serde_json::from_str(&rounds_json)?;
            lines.push(line);
        }
        Ok(lines)
    }
}
