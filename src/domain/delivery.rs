// ==========================================
// 门店补货预测系统 - 配送领域模型
// ==========================================
// 职责: 配送行 (预测品项) / 按需申请行 (非预测品项), 各含三轮调整
// 红线: 每个周期每个配送单号下每种原料至多一行
// ==========================================

use crate::domain::types::DeliveryRound;
use serde::{Deserialize, Serialize};

// ==========================================
// RoundEntry - 单轮调整结果
// ==========================================
// 配送行: adjustment 为人工增减量
// 按需行: adjustment 为申请数量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundEntry {
    pub adjustment: f64,
    pub final_delivery: f64,
    pub qty_delivered: f64,
    pub label: String, // "数量 单位"
}

/// 三轮调整容器
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundSet {
    pub first: Option<RoundEntry>,
    pub second: Option<RoundEntry>,
    pub third: Option<RoundEntry>,
}

impl RoundSet {
    pub fn get(&self, round: DeliveryRound) -> Option<&RoundEntry> {
        match round {
            DeliveryRound::First => self.first.as_ref(),
            DeliveryRound::Second => self.second.as_ref(),
            DeliveryRound::Third => self.third.as_ref(),
        }
    }

    pub fn set(&mut self, round: DeliveryRound, entry: RoundEntry) {
        match round {
            DeliveryRound::First => self.first = Some(entry),
            DeliveryRound::Second => self.second = Some(entry),
            DeliveryRound::Third => self.third = Some(entry),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoundEntry> {
        [&self.first, &self.second, &self.third]
            .into_iter()
            .filter_map(|e| e.as_ref())
    }
}

// ==========================================
// DeliveryLine - 预测品项配送行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryLine {
    pub inventory_code_id: String,
    pub delivery_code: String,
    pub ingredient_id: i64,
    pub bos_code: String,
    pub forecast: f64, // 基准缺口 (来自 ForecastLine)
    pub rounds: RoundSet,
}

// ==========================================
// ByRequestLine - 按需申请行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByRequestLine {
    pub inventory_code_id: String,
    pub delivery_code: String,
    pub item_id: i64,
    pub item_code: String,
    pub rounds: RoundSet,
    pub total_delivery: f64,       // 三轮数量直接相加
    pub total_qty_delivered: f64,  // 按品项自身换算系数折算
}

// ==========================================
// 调整批次输入
// ==========================================

/// 预测品项的人工调整
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAdjustment {
    pub ingredient_id: i64,
    pub adjustment: Option<f64>,
}

/// 按需品项的申请数量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByRequestEntry {
    pub item_id: i64,
    pub quantity: Option<f64>,
}

/// 一次提交的调整批次 (整体成功或整体失败)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentBatch {
    pub deliveries: Vec<DeliveryAdjustment>,
    pub by_requests: Vec<ByRequestEntry>,
}

impl AdjustmentBatch {
    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty() && self.by_requests.is_empty()
    }
}
