// ==========================================
// 门店补货预测系统 - 盘点对账引擎
// ==========================================
// 职责: 用量明细按原料汇总, 与期末盘点对账得出缺口
// 输入: UsageRow (已按原料排序) + EndingInventoryLine + 参考数据
// 输出: 每种原料一行 ForecastLine
// ==========================================
// 计算保护:
// - 日均用量 ≤ 0 → days_to_last = 0
// - 换算系数为 0 → converted_ending_inventory = 0
// - 缺失盘点行 → 实盘/在途按 0 处理 (告警, 不失败)
// ==========================================

use crate::domain::forecast::{
    round_display, EndingInventoryLine, ForecastLine, IngredientTotal, UsageRow,
};
use crate::domain::reference::ReferenceData;
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

/// 原料汇总取整: round(Σ + 0.5), 半数取偶
pub fn round_total(sum: f64) -> f64 {
    (sum + 0.5).round_ties_even()
}

/// 按原料汇总用量 (按 ingredient_id 升序输出)
pub fn aggregate_totals(usage_rows: &[UsageRow]) -> Vec<IngredientTotal> {
    let mut sums: BTreeMap<i64, (f64, f64)> = BTreeMap::new();
    for row in usage_rows {
        let entry = sums.entry(row.ingredient_id).or_insert((0.0, 0.0));
        entry.0 += row.average_daily_usage;
        entry.1 += row.forecast_weekly_consumption;
    }

    sums.into_iter()
        .map(|(ingredient_id, (daily, weekly))| IngredientTotal {
            ingredient_id,
            total_average_daily_usage: round_total(daily).max(0.0),
            total_forecast_weekly_consumption: round_total(weekly).max(0.0),
        })
        .collect()
}

/// 向上取整前先抹去的浮点误差位数
const CEIL_NOISE_SCALE: f64 = 1e9;

/// 可支撑天数: ceil(实盘 / 日均用量 × 100) / 100
///
/// 先按 9 位小数四舍五入, 避免 7.000000000000001 这类误差被向上取整
pub fn days_to_last(actual_ending: f64, total_average_daily_usage: f64) -> f64 {
    if total_average_daily_usage <= 0.0 {
        return 0.0;
    }
    let scaled = actual_ending / total_average_daily_usage * 100.0;
    let denoised = (scaled * CEIL_NOISE_SCALE).round() / CEIL_NOISE_SCALE;
    denoised.ceil() / 100.0
}

/// 缺口折算为配送单位
pub fn convert_to_delivery_units(forecast: f64, conversion_delivery_uom: f64) -> f64 {
    if conversion_delivery_uom == 0.0 || !conversion_delivery_uom.is_finite() {
        return 0.0;
    }
    (forecast / conversion_delivery_uom).ceil()
}

// ==========================================
// SnapshotReconciler - 盘点对账引擎
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct SnapshotReconciler {
    days_before_delivery: u32,
}

impl SnapshotReconciler {
    pub fn new(days_before_delivery: u32) -> Self {
        Self {
            days_before_delivery,
        }
    }

    /// 对账
    ///
    /// 输出覆盖 "有用量" 或 "有盘点记录" 的全部原料
    pub fn reconcile(
        &self,
        inventory_code_id: &str,
        usage_rows: &[UsageRow],
        ending_lines: &[EndingInventoryLine],
        reference: &ReferenceData,
    ) -> Vec<ForecastLine> {
        let mut totals: BTreeMap<i64, IngredientTotal> = aggregate_totals(usage_rows)
            .into_iter()
            .map(|t| (t.ingredient_id, t))
            .collect();

        let ending_by_ingredient: HashMap<i64, &EndingInventoryLine> = ending_lines
            .iter()
            .map(|line| (line.ingredient_id, line))
            .collect();

        // 仅有盘点记录的原料: 用量按 0 计
        for line in ending_lines {
            totals.entry(line.ingredient_id).or_insert(IngredientTotal {
                ingredient_id: line.ingredient_id,
                total_average_daily_usage: 0.0,
                total_forecast_weekly_consumption: 0.0,
            });
        }

        let mut missing_ending = Vec::new();
        let lines: Vec<ForecastLine> = totals
            .into_values()
            .map(|total| {
                let (actual_ending, upcoming_delivery) =
                    match ending_by_ingredient.get(&total.ingredient_id) {
                        Some(line) => (line.actual_ending, line.upcoming_delivery),
                        None => {
                            missing_ending.push(total.ingredient_id);
                            (0.0, 0.0)
                        }
                    };
                let ingredient = reference.ingredient(total.ingredient_id);
                let conversion = ingredient.map(|i| i.conversion_delivery_uom).unwrap_or(0.0);

                let forecasted_ending_inventory = (actual_ending + upcoming_delivery
                    - total.total_average_daily_usage * self.days_before_delivery as f64)
                    .max(0.0);
                let forecast =
                    (total.total_forecast_weekly_consumption - forecasted_ending_inventory).max(0.0);

                ForecastLine {
                    inventory_code_id: inventory_code_id.to_string(),
                    ingredient_id: total.ingredient_id,
                    bos_code: ingredient.map(|i| i.bos_code.clone()).unwrap_or_default(),
                    total_average_daily_usage: total.total_average_daily_usage,
                    total_forecast_weekly_consumption: total.total_forecast_weekly_consumption,
                    actual_ending,
                    upcoming_delivery,
                    days_to_last: days_to_last(actual_ending, total.total_average_daily_usage),
                    forecasted_ending_inventory: round_display(forecasted_ending_inventory),
                    forecast: round_display(forecast),
                    converted_ending_inventory: convert_to_delivery_units(forecast, conversion),
                }
            })
            .collect();

        if !missing_ending.is_empty() {
            warn!(
                inventory_code_id,
                ingredient_ids = ?missing_ending,
                "部分原料缺少期末盘点, 已按 0 补齐"
            );
        }

        info!(
            inventory_code_id,
            forecast_lines = lines.len(),
            days_before_delivery = self.days_before_delivery,
            "盘点对账完成"
        );

        lines
    }
}
