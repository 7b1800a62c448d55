// ==========================================
// 门店补货预测系统 - 库存周期领域模型
// ==========================================
// 职责: InventorySnapshot (库存周期/InventoryCode)
// 红线: 同一门店同一时间至多一个非终态周期
// ==========================================

use crate::domain::types::{CycleStatus, DeliveryRound};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// InventorySnapshot - 库存周期
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub inventory_code_id: String,           // 周期ID
    pub area_id: i64,                        // 门店
    pub code: String,                        // 可读编码
    pub status: CycleStatus,                 // 状态
    pub delivery_round: DeliveryRound,       // 当前调整轮次
    pub created_by: String,                  // 创建人
    pub created_at: NaiveDateTime,           // 创建时间
    pub submitted_by: Option<String>,        // 提交人 (审批/退回时通知)
    pub review_message: Option<String>,      // 审批人意见
    pub report_file: Option<String>,         // 报表产物
    pub config_snapshot_json: Option<String>,// 最近一次计算使用的策略参数
    pub revision: i32,                       // 修订号, 每次状态变更 +1
}

impl InventorySnapshot {
    /// 新建 OPEN 周期
    pub fn new_open(area_id: i64, code: String, created_by: String, created_at: NaiveDateTime) -> Self {
        Self {
            inventory_code_id: uuid::Uuid::new_v4().to_string(),
            area_id,
            code,
            status: CycleStatus::Open,
            delivery_round: DeliveryRound::First,
            created_by,
            created_at,
            submitted_by: None,
            review_message: None,
            report_file: None,
            config_snapshot_json: None,
            revision: 0,
        }
    }

    /// 配送单号 (每个周期一个)
    ///
    /// 可读编码可在门店间或同一门店的前后周期间重复, 因此拼上周期ID
    pub fn delivery_code(&self) -> String {
        format!("{}-{}-DEL", self.code, self.inventory_code_id)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
