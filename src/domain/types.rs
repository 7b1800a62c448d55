// ==========================================
// 门店补货预测系统 - 领域类型定义
// ==========================================
// 职责: 销售渠道、库存周期状态、周期动作、配送轮次
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 销售渠道 (Transaction Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    DineIn,  // 堂食
    TakeOut, // 外带
}

impl TransactionType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            TransactionType::DineIn => "DINE_IN",
            TransactionType::TakeOut => "TAKE_OUT",
        }
    }

    /// 解析数据库/导入字符串
    ///
    /// 兼容 "DINE IN" / "DINE_IN" / "take out" / "TAKEOUT" 等写法
    pub fn from_db_str(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .to_uppercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match normalized.as_str() {
            "DINEIN" => Some(TransactionType::DineIn),
            "TAKEOUT" => Some(TransactionType::TakeOut),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 库存周期状态 (Cycle Status)
// ==========================================
// OPEN → PROCESSED → DRAFT/SUBMITTED → APPROVED | AMENDED → ... ; DELETED 为软删除
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleStatus {
    Open,      // 已创建, 盘点已录入
    Processed, // 预测已计算
    Draft,     // 调整已保存, 未提交
    Submitted, // 已提交审批
    Approved,  // 已审批 (终态)
    Amended,   // 退回修改
    Deleted,   // 软删除 (终态)
}

impl CycleStatus {
    pub const ALL: [CycleStatus; 7] = [
        CycleStatus::Open,
        CycleStatus::Processed,
        CycleStatus::Draft,
        CycleStatus::Submitted,
        CycleStatus::Approved,
        CycleStatus::Amended,
        CycleStatus::Deleted,
    ];

    pub fn to_db_str(&self) -> &'static str {
        match self {
            CycleStatus::Open => "OPEN",
            CycleStatus::Processed => "PROCESSED",
            CycleStatus::Draft => "DRAFT",
            CycleStatus::Submitted => "SUBMITTED",
            CycleStatus::Approved => "APPROVED",
            CycleStatus::Amended => "AMENDED",
            CycleStatus::Deleted => "DELETED",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        CycleStatus::ALL
            .iter()
            .copied()
            .find(|s| s.to_db_str().eq_ignore_ascii_case(value.trim()))
    }

    /// 终态: 不再阻塞同门店新周期的创建
    pub fn is_terminal(&self) -> bool {
        matches!(self, CycleStatus::Approved | CycleStatus::Deleted)
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 周期动作 (Cycle Action)
// ==========================================
// 用途: 状态迁移 + 权限校验 + 审计日志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleAction {
    Create,
    LoadInventory,
    Process,
    SaveDraft,
    Submit,
    Approve,
    Amend,
    Resubmit,
    Delete,
}

impl CycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleAction::Create => "CREATE",
            CycleAction::LoadInventory => "LOAD_INVENTORY",
            CycleAction::Process => "PROCESS",
            CycleAction::SaveDraft => "SAVE_DRAFT",
            CycleAction::Submit => "SUBMIT",
            CycleAction::Approve => "APPROVE",
            CycleAction::Amend => "AMEND",
            CycleAction::Resubmit => "RESUBMIT",
            CycleAction::Delete => "DELETE",
        }
    }
}

impl fmt::Display for CycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 配送调整轮次 (Delivery Round)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryRound {
    First,
    Second,
    Third,
}

impl DeliveryRound {
    pub fn number(&self) -> i32 {
        match self {
            DeliveryRound::First => 1,
            DeliveryRound::Second => 2,
            DeliveryRound::Third => 3,
        }
    }

    pub fn from_number(n: i32) -> Option<Self> {
        match n {
            1 => Some(DeliveryRound::First),
            2 => Some(DeliveryRound::Second),
            3 => Some(DeliveryRound::Third),
            _ => None,
        }
    }

    /// 下一轮; 第三轮之后没有下一轮
    pub fn next(&self) -> Option<Self> {
        DeliveryRound::from_number(self.number() + 1)
    }
}

impl fmt::Display for DeliveryRound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryRound::First => write!(f, "FIRST"),
            DeliveryRound::Second => write!(f, "SECOND"),
            DeliveryRound::Third => write!(f, "THIRD"),
        }
    }
}
