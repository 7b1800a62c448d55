// ==========================================
// 门店补货预测系统 - 周期操作日志领域模型
// ==========================================
// 红线: 所有状态迁移必须记录
// 用途: 审计追踪 (谁在何时把周期从哪个状态推到哪个状态)
// 对齐: cycle_action_log 表
// ==========================================

use crate::domain::types::{CycleAction, CycleStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// CycleActionLog - 周期操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleActionLog {
    pub action_id: String,
    pub inventory_code_id: String,
    pub action: CycleAction,
    pub actor: String,
    pub from_status: Option<CycleStatus>, // 创建时为 None
    pub to_status: CycleStatus,
    pub message: Option<String>,
    pub payload_json: Option<JsonValue>,
    pub action_ts: NaiveDateTime,
}

impl CycleActionLog {
    pub fn new(
        inventory_code_id: &str,
        action: CycleAction,
        actor: &str,
        from_status: Option<CycleStatus>,
        to_status: CycleStatus,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            inventory_code_id: inventory_code_id.to_string(),
            action,
            actor: actor.to_string(),
            from_status,
            to_status,
            message: None,
            payload_json: None,
            action_ts: chrono::Local::now().naive_local(),
        }
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }
}
