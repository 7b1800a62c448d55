// ==========================================
// 门店补货预测系统 - 库存周期仓储
// ==========================================
// 职责: InventorySnapshot 的创建/查询/状态迁移
// 红线: 同一门店至多一个非终态周期 (创建时在事务内检查)
// 并发: 状态迁移使用 revision 乐观锁 + 允许前置状态校验
// ==========================================

use crate::domain::action_log::CycleActionLog;
use crate::domain::cycle::InventorySnapshot;
use crate::domain::types::{CycleStatus, DeliveryRound};
use crate::repository::action_log_repo::insert_in_tx;
use crate::repository::error::{
    format_db_datetime, parse_db_datetime, RepositoryError, RepositoryResult,
};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"SELECT inventory_code_id, area_id, code, status, delivery_round,
       created_by, created_at, submitted_by, review_message, report_file,
       config_snapshot_json, revision
  FROM inventory_code"#;

// ==========================================
// InventoryCodeRepository - 库存周期仓储
// ==========================================
pub struct InventoryCodeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InventoryCodeRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建周期 (互斥)
    ///
    /// 在同一事务内:
    /// 1. 检查该门店是否存在非终态周期
    /// 2. 写入新周期
    /// 3. 写入 CREATE 日志
    ///
    /// # 错误
    /// - `CycleConflict`: 门店已有非终态周期
    pub fn create_exclusive(
        &self,
        snapshot: &InventorySnapshot,
        log: &CycleActionLog,
    ) -> RepositoryResult<String> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let blocking = {
            let mut stmt = tx.prepare(
                "SELECT inventory_code_id, code, status FROM inventory_code WHERE area_id = ?1",
            )?;
            let rows = stmt
                .query_map(params![snapshot.area_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().find(|(_, _, status)| {
                CycleStatus::from_db_str(status)
                    .map(|s| !s.is_terminal())
                    .unwrap_or(true)
            })
        };

        if let Some((existing_id, existing_code, status)) = blocking {
            return Err(RepositoryError::CycleConflict {
                message: format!(
                    "门店{}已存在未结束的周期 {} (id={}, status={})",
                    snapshot.area_id, existing_code, existing_id, status
                ),
            });
        }

        tx.execute(
            r#"INSERT INTO inventory_code (
                   inventory_code_id, area_id, code, status, delivery_round,
                   created_by, created_at, submitted_by, review_message, report_file,
                   config_snapshot_json, revision
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
            params![
                snapshot.inventory_code_id,
                snapshot.area_id,
                snapshot.code,
                snapshot.status.to_db_str(),
                snapshot.delivery_round.number(),
                snapshot.created_by,
                format_db_datetime(&snapshot.created_at),
                snapshot.submitted_by,
                snapshot.review_message,
                snapshot.report_file,
                snapshot.config_snapshot_json,
                snapshot.revision,
            ],
        )?;
        insert_in_tx(&tx, log)?;

        tx.commit()?;
        Ok(snapshot.inventory_code_id.clone())
    }

    pub fn find_by_id(&self, inventory_code_id: &str) -> RepositoryResult<Option<InventorySnapshot>> {
        let conn = self.get_conn()?;
        find_by_id_in_tx(&conn, inventory_code_id)
    }

    /// 查询门店全部周期 (按创建时间倒序)
    pub fn list_by_area(&self, area_id: i64) -> RepositoryResult<Vec<InventorySnapshot>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE area_id = ?1 ORDER BY created_at DESC, rowid DESC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let snapshots = stmt
            .query_map(params![area_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(snapshots)
    }

    /// 查询门店最近一个处于给定状态之一的周期
    ///
    /// `statuses` 为空时不做状态过滤
    pub fn find_latest_by_area(
        &self,
        area_id: i64,
        statuses: &[CycleStatus],
    ) -> RepositoryResult<Option<InventorySnapshot>> {
        Ok(self
            .list_by_area(area_id)?
            .into_iter()
            .find(|s| statuses.is_empty() || statuses.contains(&s.status)))
    }

    /// 单独的状态迁移 (无明细写入)
    ///
    /// 返回新的 revision
    pub fn update_status(
        &self,
        snapshot: &InventorySnapshot,
        allowed_from: &[CycleStatus],
        log: &CycleActionLog,
    ) -> RepositoryResult<i32> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let revision = update_in_tx(&tx, snapshot, allowed_from)?;
        insert_in_tx(&tx, log)?;
        tx.commit()?;
        Ok(revision)
    }
}

// ==========================================
// 事务内辅助函数 (供其他仓储组合使用)
// ==========================================

pub(crate) fn find_by_id_in_tx(
    conn: &Connection,
    inventory_code_id: &str,
) -> RepositoryResult<Option<InventorySnapshot>> {
    let sql = format!("{} WHERE inventory_code_id = ?1", SELECT_COLUMNS);
    Ok(conn
        .query_row(&sql, params![inventory_code_id], map_row)
        .optional()?)
}

/// 在调用方事务内写回周期头 (状态 CAS + revision 乐观锁)
///
/// `snapshot.revision` 为调用方读取时的版本, `snapshot.status` 为目标状态
///
/// # 错误
/// - `NotFound`: 周期不存在
/// - `OptimisticLockFailure`: 期间已被其他操作修改
/// - `InvalidStateTransition`: 当前状态不在 `allowed_from` 中
pub(crate) fn update_in_tx(
    conn: &Connection,
    snapshot: &InventorySnapshot,
    allowed_from: &[CycleStatus],
) -> RepositoryResult<i32> {
    let current: Option<(String, i32)> = conn
        .query_row(
            "SELECT status, revision FROM inventory_code WHERE inventory_code_id = ?1",
            params![snapshot.inventory_code_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (raw_status, actual_revision) = current.ok_or_else(|| RepositoryError::NotFound {
        entity: "InventorySnapshot".to_string(),
        id: snapshot.inventory_code_id.clone(),
    })?;

    if actual_revision != snapshot.revision {
        return Err(RepositoryError::OptimisticLockFailure {
            id: snapshot.inventory_code_id.clone(),
            expected: snapshot.revision,
            actual: actual_revision,
        });
    }

    let current_status = CycleStatus::from_db_str(&raw_status);
    if !current_status.map(|s| allowed_from.contains(&s)).unwrap_or(false) {
        return Err(RepositoryError::InvalidStateTransition {
            id: snapshot.inventory_code_id.clone(),
            from: raw_status,
            to: snapshot.status.to_string(),
        });
    }

    let new_revision = actual_revision + 1;
    conn.execute(
        r#"UPDATE inventory_code
           SET status = ?1, delivery_round = ?2, submitted_by = ?3, review_message = ?4,
               report_file = ?5, config_snapshot_json = ?6, revision = ?7
           WHERE inventory_code_id = ?8 AND revision = ?9"#,
        params![
            snapshot.status.to_db_str(),
            snapshot.delivery_round.number(),
            snapshot.submitted_by,
            snapshot.review_message,
            snapshot.report_file,
            snapshot.config_snapshot_json,
            new_revision,
            snapshot.inventory_code_id,
            actual_revision,
        ],
    )?;

    Ok(new_revision)
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<InventorySnapshot> {
    let raw_status: String = row.get(3)?;
    let status = CycleStatus::from_db_str(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("未知周期状态: {}", raw_status).into(),
        )
    })?;

    let round_no: i32 = row.get(4)?;
    let delivery_round = DeliveryRound::from_number(round_no).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Integer,
            format!("非法配送轮次: {}", round_no).into(),
        )
    })?;

    let raw_created_at: String = row.get(6)?;
    let created_at = parse_db_datetime("created_at", &raw_created_at).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            e.to_string().into(),
        )
    })?;

    Ok(InventorySnapshot {
        inventory_code_id: row.get(0)?,
        area_id: row.get(1)?,
        code: row.get(2)?,
        status,
        delivery_round,
        created_by: row.get(5)?,
        created_at,
        submitted_by: row.get(7)?,
        review_message: row.get(8)?,
        report_file: row.get(9)?,
        config_snapshot_json: row.get(10)?,
        revision: row.get(11)?,
    })
}
