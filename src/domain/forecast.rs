// ==========================================
// 门店补货预测系统 - 预测领域模型
// ==========================================
// 职责: 用量明细行、原料汇总、期末盘点行、预测行
// 红线: UsageRow 创建后不可修改; ForecastLine 重算时整体替换
// ==========================================

use serde::{Deserialize, Serialize};

/// 存储/展示精度 (小数位)
pub const DISPLAY_DECIMALS: i32 = 4;

/// 四舍五入到展示精度 (仅用于存储/展示, 下游汇总使用全精度)
pub fn round_display(value: f64) -> f64 {
    let factor = 10f64.powi(DISPLAY_DECIMALS);
    (value * factor).round() / factor
}

// ==========================================
// UsageRow - 菜单品项 × 原料 用量明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRow {
    // ===== 关联 =====
    pub menu_item_id: i64,
    pub pos_code: String,
    pub menu_description: String,
    pub ingredient_id: i64,
    pub bos_code: String,
    pub ingredient_description: String,
    pub category: String,

    // ===== 销量口径 =====
    pub qty_sold: i64,             // 对应渠道的窗口销量
    pub average_daily_sales: f64,  // 对应渠道的日均销量 (含季节指数)

    // ===== 用量 (全精度) =====
    pub average_daily_usage: f64,
    pub weekly_usage: f64,
    pub safety_stock: f64,
    pub forecast_weekly_consumption: f64,
}

impl UsageRow {
    /// 展示精度副本
    pub fn rounded(&self) -> UsageRow {
        UsageRow {
            average_daily_sales: round_display(self.average_daily_sales),
            average_daily_usage: round_display(self.average_daily_usage),
            weekly_usage: round_display(self.weekly_usage),
            safety_stock: round_display(self.safety_stock),
            forecast_weekly_consumption: round_display(self.forecast_weekly_consumption),
            ..self.clone()
        }
    }
}

// ==========================================
// IngredientTotal - 原料维度汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientTotal {
    pub ingredient_id: i64,
    pub total_average_daily_usage: f64,          // round(Σ + 0.5)
    pub total_forecast_weekly_consumption: f64,  // round(Σ + 0.5)
}

// ==========================================
// EndingInventoryLine - 期末盘点 (外部提供, 只读)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndingInventoryLine {
    pub inventory_code_id: String,
    pub ingredient_id: i64,
    pub actual_ending: f64,      // 实盘数量
    pub upcoming_delivery: f64,  // 在途数量
}

// ==========================================
// ForecastLine - 原料预测结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastLine {
    pub inventory_code_id: String,
    pub ingredient_id: i64,
    pub bos_code: String,

    // ===== 汇总用量 =====
    pub total_average_daily_usage: f64,
    pub total_forecast_weekly_consumption: f64,

    // ===== 盘点输入 (缺失时补 0) =====
    pub actual_ending: f64,
    pub upcoming_delivery: f64,

    // ===== 推导结果 =====
    pub days_to_last: f64,
    pub forecasted_ending_inventory: f64,  // ≥ 0
    pub forecast: f64,                     // 缺口, ≥ 0
    pub converted_ending_inventory: f64,   // 缺口折算为配送单位
}
