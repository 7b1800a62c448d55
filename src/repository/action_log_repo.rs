// ==========================================
// 门店补货预测系统 - 周期操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 说明: 状态迁移的日志通过 insert_in_tx 与迁移本身在同一事务中写入
// ==========================================

use crate::domain::action_log::CycleActionLog;
use crate::domain::types::{CycleAction, CycleStatus};
use crate::repository::error::{
    format_db_datetime, parse_db_datetime, RepositoryError, RepositoryResult,
};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// CycleActionLogRepository - 周期操作日志仓储
// ==========================================
pub struct CycleActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CycleActionLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入操作日志 (独立写入)
    pub fn insert(&self, log: &CycleActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert_in_tx(&conn, log)?;
        Ok(log.action_id.clone())
    }

    /// 查询周期的全部日志 (按时间升序)
    pub fn find_by_inventory_code(
        &self,
        inventory_code_id: &str,
    ) -> RepositoryResult<Vec<CycleActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT action_id, inventory_code_id, action, actor, from_status, to_status,
                      message, payload_json, action_ts
               FROM cycle_action_log
               WHERE inventory_code_id = ?1
               ORDER BY action_ts ASC, rowid ASC"#,
        )?;

        let raw_rows = stmt
            .query_map(params![inventory_code_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, String>(8)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw_rows
            .into_iter()
            .map(
                |(action_id, code_id, action, actor, from, to, message, payload, ts)|
                 -> RepositoryResult<CycleActionLog> {
                    Ok(CycleActionLog {
                        action_id,
                        inventory_code_id: code_id,
                        action: parse_action(&action)?,
                        actor,
                        from_status: from.as_deref().map(parse_status).transpose()?,
                        to_status: parse_status(&to)?,
                        message,
                        payload_json: payload
                            .as_deref()
                            .map(serde_json::from_str::<serde_json::Value>)
                            .transpose()?,
                        action_ts: parse_db_datetime("action_ts", &ts)?,
                    })
                },
            )
            .collect()
    }
}

/// 在调用方事务内写入日志
pub(crate) fn insert_in_tx(conn: &Connection, log: &CycleActionLog) -> RepositoryResult<()> {
    conn.execute(
        r#"INSERT INTO cycle_action_log (
               action_id, inventory_code_id, action, actor, from_status, to_status,
               message, payload_json, action_ts
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
        params![
            log.action_id,
            log.inventory_code_id,
            log.action.as_str(),
            log.actor,
            log.from_status.map(|s| s.to_db_str()),
            log.to_status.to_db_str(),
            log.message,
            log.payload_json.as_ref().map(|v| v.to_string()),
            format_db_datetime(&log.action_ts),
        ],
    )?;
    Ok(())
}

fn parse_status(raw: &str) -> RepositoryResult<CycleStatus> {
    CycleStatus::from_db_str(raw).ok_or_else(|| RepositoryError::FieldValueError {
        field: "status".to_string(),
        message: format!("未知周期状态: {}", raw),
    })
}

fn parse_action(raw: &str) -> RepositoryResult<CycleAction> {
    const ACTIONS: [CycleAction; 9] = [
        CycleAction::Create,
        CycleAction::LoadInventory,
        CycleAction::Process,
        CycleAction::SaveDraft,
        CycleAction::Submit,
        CycleAction::Approve,
        CycleAction::Amend,
        CycleAction::Resubmit,
        CycleAction::Delete,
    ];
    ACTIONS
        .iter()
        .copied()
        .find(|a| a.as_str() == raw)
        .ok_or_else(|| RepositoryError::FieldValueError {
            field: "action".to_string(),
            message: format!("未知周期动作: {}", raw),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_find_by_inventory_code() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        let repo = CycleActionLogRepository::new(Arc::new(Mutex::new(conn)));

        let create = CycleActionLog::new("C1", CycleAction::Create, "alice", None, CycleStatus::Open);
        let amend = CycleActionLog::new(
            "C1",
            CycleAction::Amend,
            "bob",
            Some(CycleStatus::Submitted),
            CycleStatus::Amended,
        )
        .with_message(Some("recount chicken".to_string()))
        .with_payload(serde_json::json!({ "round": 2 }));

        repo.insert(&create).unwrap();
        repo.insert(&amend).unwrap();
        repo.insert(&CycleActionLog::new("C2", CycleAction::Create, "x", None, CycleStatus::Open))
            .unwrap();

        let logs = repo.find_by_inventory_code("C1").unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].action, CycleAction::Create);
        assert_eq!(logs[0].from_status, None);
        assert_eq!(logs[1].to_status, CycleStatus::Amended);
        assert_eq!(logs[1].message.as_deref(), Some("recount chicken"));
        assert_eq!(logs[1].payload_json.as_ref().unwrap()["round"], 2);
    }
}
