// ==========================================
// 门店补货预测系统 - 期末盘点仓储
// ==========================================
// 职责: 周期的实盘/在途数量 (由外部盘点录入)
// ==========================================

use crate::domain::action_log::CycleActionLog;
use crate::domain::cycle::InventorySnapshot;
use crate::domain::forecast::EndingInventoryLine;
use crate::domain::types::CycleStatus;
use crate::repository::action_log_repo::insert_in_tx;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::inventory_code_repo::update_in_tx;
use rusqlite::{params, Connection, TransactionBehavior};
use std::sync::{Arc, Mutex};

pub struct EndingInventoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EndingInventoryRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 录入盘点并记录 LOAD_INVENTORY 迁移 (单事务)
    pub fn commit_load(
        &self,
        snapshot: &InventorySnapshot,
        allowed_from: &[CycleStatus],
        lines: &[EndingInventoryLine],
        log: &CycleActionLog,
    ) -> RepositoryResult<i32> {
        validate_lines(lines)?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let revision = update_in_tx(&tx, snapshot, allowed_from)?;
        write_lines_in_tx(&tx, &snapshot.inventory_code_id, lines)?;
        insert_in_tx(&tx, log)?;
        tx.commit()?;

        tracing::debug!(
            inventory_code_id = %snapshot.inventory_code_id,
            lines = lines.len(),
            revision,
            "盘点已录入"
        );
        Ok(revision)
    }

    pub fn find_by_code(&self, inventory_code_id: &str) -> RepositoryResult<Vec<EndingInventoryLine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT inventory_code_id, ingredient_id, actual_ending, upcoming_delivery
               FROM ending_inventory
               WHERE inventory_code_id = ?1
               ORDER BY ingredient_id"#,
        )?;
        let lines = stmt
            .query_map(params![inventory_code_id], |row| {
                Ok(EndingInventoryLine {
                    inventory_code_id: row.get(0)?,
                    ingredient_id: row.get(1)?,
                    actual_ending: row.get(2)?,
                    upcoming_delivery: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }
}

fn validate_lines(lines: &[EndingInventoryLine]) -> RepositoryResult<()> {
    match lines
        .iter()
        .find(|l| !(l.actual_ending >= 0.0) || !(l.upcoming_delivery >= 0.0))
    {
        Some(bad) => Err(RepositoryError::ValidationError(format!(
            "盘点数量不能为负: ingredient_id={}, actual_ending={}, upcoming_delivery={}",
            bad.ingredient_id, bad.actual_ending, bad.upcoming_delivery
        ))),
        None => Ok(()),
    }
}

fn write_lines_in_tx(
    conn: &Connection,
    inventory_code_id: &str,
    lines: &[EndingInventoryLine],
) -> RepositoryResult<()> {
    conn.execute(
        "DELETE FROM ending_inventory WHERE inventory_code_id = ?1",
        params![inventory_code_id],
    )?;
    let mut stmt = conn.prepare(
        r#"INSERT INTO ending_inventory (
               inventory_code_id, ingredient_id, actual_ending, upcoming_delivery
           ) VALUES (?1, ?2, ?3, ?4)"#,
    )?;
    for line in lines {
        stmt.execute(params![
            inventory_code_id,
            line.ingredient_id,
            line.actual_ending,
            line.upcoming_delivery
        ])?;
    }
    Ok(())
}
