// ==========================================
// 门店补货预测系统 - 销售领域模型
// ==========================================
// 职责: POS 原始流水、窗口汇总、销售汇总表行
// ==========================================

use crate::domain::types::TransactionType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// SalesTransaction - POS 原始流水
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesTransaction {
    pub menu_item_id: i64,
    pub area_id: i64,
    pub transaction_type: TransactionType,
    pub quantity: i64,
    pub sales_date: NaiveDate,
}

// ==========================================
// SalesWindow - 统计窗口 [start_date, end_date)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SalesWindow {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self { start_date, end_date }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date < self.end_date
    }

    pub fn is_empty(&self) -> bool {
        self.end_date <= self.start_date
    }
}

// ==========================================
// SalesAggregate - 窗口内按渠道汇总
// ==========================================
// 红线: 周期内计算后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesAggregate {
    pub menu_item_id: i64,
    pub area_id: i64,
    pub transaction_type: TransactionType,
    pub quantity: i64,
    pub window: SalesWindow,
}

/// 单个菜单品项的分渠道销量
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelSales {
    pub dine_in_qty: i64,
    pub take_out_qty: i64,
}

impl ChannelSales {
    pub fn quantity(&self, channel: TransactionType) -> i64 {
        match channel {
            TransactionType::DineIn => self.dine_in_qty,
            TransactionType::TakeOut => self.take_out_qty,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.dine_in_qty == 0 && self.take_out_qty == 0
    }
}

/// 将汇总行折叠为 menu_item_id → 分渠道销量
pub fn channel_sales_by_item(aggregates: &[SalesAggregate]) -> HashMap<i64, ChannelSales> {
    let mut by_item: HashMap<i64, ChannelSales> = HashMap::new();
    for agg in aggregates {
        let entry = by_item.entry(agg.menu_item_id).or_default();
        match agg.transaction_type {
            TransactionType::DineIn => entry.dine_in_qty += agg.quantity,
            TransactionType::TakeOut => entry.take_out_qty += agg.quantity,
        }
    }
    by_item
}

// ==========================================
// SalesSummaryRow - 销售汇总表 (每门店每品项一行)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSummaryRow {
    pub menu_item_id: i64,
    pub pos_code: String,
    pub area_id: i64,
    pub area_name: String,
    pub dine_in_quantity: i64,
    pub take_out_quantity: i64,
    pub average_dine_in_sold: f64,
    pub average_take_out_sold: f64,
}
