// ==========================================
// 门店补货预测系统 - 配送取整引擎
// ==========================================
// 职责: 将缺口 + 人工调整取整为订货批量的整数倍 (三轮独立)
//       按需申请品项的三轮数量累加与单位换算
// 红线: 整批校验通过后才计算; 任一未知原料/品项整批拒绝
// ==========================================
// 规则:
// - final_delivery = max(0, ceil((forecast + adjustment) / bundling_size) × bundling_size)
// - qty_delivered  = final_delivery × conversion_delivery_uom
// - 每轮的 adjustment 均相对原始 forecast, 不跨轮累加
// ==========================================

use crate::domain::delivery::{
    ByRequestEntry, ByRequestLine, DeliveryAdjustment, DeliveryLine, RoundEntry,
};
use crate::domain::forecast::{round_display, ForecastLine};
use crate::domain::reference::{Ingredient, ReferenceData};
use crate::domain::types::DeliveryRound;
use crate::engine::error::{EngineError, EngineResult};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// 数量展示: 整数不带小数, 其余保留展示精度
pub fn format_quantity(value: f64) -> String {
    let rounded = round_display(value);
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{}", rounded)
    }
}

fn label(qty: f64, uom: &str) -> String {
    format!("{} {}", format_quantity(qty), uom)
}

/// 单轮取整
///
/// # 错误
/// - `InvalidAdjustment`: bundling_size ≤ 0 或调整量非有限值
pub fn round_delivery(
    forecast: f64,
    adjustment: f64,
    ingredient: &Ingredient,
) -> EngineResult<RoundEntry> {
    if !(ingredient.bundling_size > 0.0) {
        return Err(EngineError::InvalidAdjustment(format!(
            "原料{}的 bundling_size 必须大于 0 (当前 {})",
            ingredient.bos_code, ingredient.bundling_size
        )));
    }
    if !adjustment.is_finite() {
        return Err(EngineError::InvalidAdjustment(format!(
            "原料{}的调整量非法: {}",
            ingredient.bos_code, adjustment
        )));
    }

    let bundles = ((forecast + adjustment) / ingredient.bundling_size).ceil();
    let raw = bundles * ingredient.bundling_size;
    let final_delivery = if raw > 0.0 { raw } else { 0.0 };
    let qty_delivered = final_delivery * ingredient.conversion_delivery_uom;

    Ok(RoundEntry {
        adjustment,
        final_delivery,
        qty_delivered,
        label: label(qty_delivered, &ingredient.delivery_uom),
    })
}

// ==========================================
// DeliveryRounder - 配送取整引擎
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryRounder;

impl DeliveryRounder {
    pub fn new() -> Self {
        Self
    }

    /// 计算某一轮的全部配送行
    ///
    /// - 每条预测行都产出一条配送行
    /// - 本批次未给出调整量的原料: 沿用本轮已有调整量, 否则为 0
    /// - 其他轮次的结果原样保留
    /// - 已有配送行中不在预测行里的原料整行沿用 (不计算本轮)
    ///
    /// # 错误
    /// - `UnknownIngredients`: 批次引用了本周期预测行之外的原料, 或预测行的原料不在参考数据中
    /// - `InvalidAdjustment`: 缺少调整量 / 重复原料 / 批量非法
    pub fn apply_delivery_round(
        &self,
        round: DeliveryRound,
        delivery_code: &str,
        forecast_lines: &[ForecastLine],
        existing: &[DeliveryLine],
        adjustments: &[DeliveryAdjustment],
        reference: &ReferenceData,
    ) -> EngineResult<Vec<DeliveryLine>> {
        // ===== 整批校验 =====
        let forecast_ids: HashSet<i64> = forecast_lines.iter().map(|l| l.ingredient_id).collect();

        let mut unknown: BTreeSet<i64> = adjustments
            .iter()
            .map(|a| a.ingredient_id)
            .filter(|id| !forecast_ids.contains(id))
            .collect();
        unknown.extend(
            forecast_lines
                .iter()
                .map(|l| l.ingredient_id)
                .filter(|id| reference.ingredient(*id).is_none()),
        );
        if !unknown.is_empty() {
            return Err(EngineError::UnknownIngredients {
                ids: unknown.into_iter().collect(),
            });
        }

        let mut batch: HashMap<i64, f64> = HashMap::with_capacity(adjustments.len());
        for adj in adjustments {
            let value = adj.adjustment.ok_or_else(|| {
                EngineError::InvalidAdjustment(format!(
                    "原料{}缺少调整量",
                    adj.ingredient_id
                ))
            })?;
            if batch.insert(adj.ingredient_id, value).is_some() {
                return Err(EngineError::InvalidAdjustment(format!(
                    "原料{}在同一批次中重复出现",
                    adj.ingredient_id
                )));
            }
        }

        // ===== 计算 =====
        let existing_by_ingredient: HashMap<i64, &DeliveryLine> =
            existing.iter().map(|l| (l.ingredient_id, l)).collect();

        let mut lines = Vec::with_capacity(forecast_lines.len());
        for forecast_line in forecast_lines {
            let ingredient = reference.ingredient(forecast_line.ingredient_id).ok_or_else(|| {
                EngineError::UnknownIngredients {
                    ids: vec![forecast_line.ingredient_id],
                }
            })?;
            let previous = existing_by_ingredient.get(&forecast_line.ingredient_id);

            let adjustment = batch
                .get(&forecast_line.ingredient_id)
                .copied()
                .or_else(|| {
                    previous
                        .and_then(|l| l.rounds.get(round))
                        .map(|e| e.adjustment)
                })
                .unwrap_or(0.0);

            let mut rounds = previous.map(|l| l.rounds.clone()).unwrap_or_default();
            rounds.set(
                round,
                round_delivery(forecast_line.forecast, adjustment, ingredient)?,
            );

            lines.push(DeliveryLine {
                inventory_code_id: forecast_line.inventory_code_id.clone(),
                delivery_code: delivery_code.to_string(),
                ingredient_id: forecast_line.ingredient_id,
                bos_code: ingredient.bos_code.clone(),
                forecast: forecast_line.forecast,
                rounds,
            });
        }

        // 重新计算后不再出现的原料: 保留其历史轮次
        let mut carried = Vec::new();
        for previous in existing {
            if !forecast_ids.contains(&previous.ingredient_id) {
                carried.push(previous.ingredient_id);
                let mut line = previous.clone();
                line.delivery_code = delivery_code.to_string();
                lines.push(line);
            }
        }
        if !carried.is_empty() {
            warn!(
                round = round.number(),
                delivery_code,
                ingredient_ids = ?carried,
                "原料已不在本次预测结果中, 沿用其已有配送行"
            );
            lines.sort_by_key(|l| l.ingredient_id);
        }

        debug!(
            round = round.number(),
            delivery_code,
            lines = lines.len(),
            adjusted = batch.len(),
            "配送行计算完成"
        );
        Ok(lines)
    }

    /// 计算某一轮的按需申请行
    ///
    /// 未出现在本批次中的已有品项原样保留
    ///
    /// # 错误
    /// - `UnknownByRequestItems`: 引用了不存在的按需品项
    /// - `InvalidAdjustment`: 缺少数量 / 数量为负 / 重复品项
    pub fn apply_by_request_round(
        &self,
        round: DeliveryRound,
        inventory_code_id: &str,
        delivery_code: &str,
        existing: &[ByRequestLine],
        entries: &[ByRequestEntry],
        reference: &ReferenceData,
    ) -> EngineResult<Vec<ByRequestLine>> {
        let unknown: BTreeSet<i64> = entries
            .iter()
            .map(|e| e.item_id)
            .filter(|id| !reference.by_request_items.contains_key(id))
            .collect();
        if !unknown.is_empty() {
            return Err(EngineError::UnknownByRequestItems {
                ids: unknown.into_iter().collect(),
            });
        }

        let mut requested: HashMap<i64, f64> = HashMap::with_capacity(entries.len());
        for entry in entries {
            let quantity = entry.quantity.ok_or_else(|| {
                EngineError::InvalidAdjustment(format!("按需品项{}缺少申请数量", entry.item_id))
            })?;
            if !quantity.is_finite() || quantity < 0.0 {
                return Err(EngineError::InvalidAdjustment(format!(
                    "按需品项{}的申请数量非法: {}",
                    entry.item_id, quantity
                )));
            }
            if requested.insert(entry.item_id, quantity).is_some() {
                return Err(EngineError::InvalidAdjustment(format!(
                    "按需品项{}在同一批次中重复出现",
                    entry.item_id
                )));
            }
        }

        let mut by_item: HashMap<i64, ByRequestLine> =
            existing.iter().map(|l| (l.item_id, l.clone())).collect();

        for (item_id, quantity) in requested {
            let Some(item) = reference.by_request_items.get(&item_id) else {
                continue;
            };
            let line = by_item.entry(item_id).or_insert_with(|| ByRequestLine {
                inventory_code_id: inventory_code_id.to_string(),
                delivery_code: delivery_code.to_string(),
                item_id,
                item_code: item.item_code.clone(),
                rounds: Default::default(),
                total_delivery: 0.0,
                total_qty_delivered: 0.0,
            });

            let qty_delivered = quantity * item.conversion_delivery_uom;
            line.rounds.set(
                round,
                RoundEntry {
                    adjustment: quantity,
                    final_delivery: quantity,
                    qty_delivered,
                    label: label(qty_delivered, &item.delivery_uom),
                },
            );
            line.delivery_code = delivery_code.to_string();
            line.total_delivery = line.rounds.iter().map(|e| e.final_delivery).sum();
            line.total_qty_delivered = line.total_delivery * item.conversion_delivery_uom;
        }

        let mut lines: Vec<ByRequestLine> = by_item.into_values().collect();
        lines.sort_by_key(|l| l.item_id);
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reference::ByRequestItem;

    fn ingredient(id: i64, bundling: f64, conversion: f64) -> Ingredient {
        Ingredient {
            ingredient_id: id,
            bos_code: format!("BOS{}", id),
            description: "Chicken".to_string(),
            uom: "PC".to_string(),
            delivery_uom: "BOX".to_string(),
            bundling_size: bundling,
            conversion_delivery_uom: conversion,
        }
    }

    fn forecast_line(ingredient_id: i64, forecast: f64) -> ForecastLine {
        ForecastLine {
            inventory_code_id: "C1".to_string(),
            ingredient_id,
            bos_code: format!("BOS{}", ingredient_id),
            total_average_daily_usage: 0.0,
            total_forecast_weekly_consumption: 0.0,
            actual_ending: 0.0,
            upcoming_delivery: 0.0,
            days_to_last: 0.0,
            forecasted_ending_inventory: 0.0,
            forecast,
            converted_ending_inventory: 0.0,
        }
    }

    fn reference() -> ReferenceData {
        ReferenceData::new(
            vec![],
            vec![],
            vec![ingredient(10, 12.0, 0.5), ingredient(11, 5.0, 1.0)],
            vec![],
            vec![ByRequestItem {
                item_id: 500,
                item_code: "CUPS".to_string(),
                description: "Paper cups".to_string(),
                uom: "PC".to_string(),
                delivery_uom: "PACK".to_string(),
                conversion_delivery_uom: 50.0,
            }],
        )
    }

    fn adj(ingredient_id: i64, value: f64) -> DeliveryAdjustment {
        DeliveryAdjustment {
            ingredient_id,
            adjustment: Some(value),
        }
    }

    #[test]
    fn test_rounding_law() {
        let entry = round_delivery(37.0, 0.0, &ingredient(10, 12.0, 0.5)).unwrap();
        assert_eq!(entry.final_delivery, 48.0);
        assert_eq!(entry.qty_delivered, 24.0);
        assert_eq!(entry.label, "24 BOX");
    }

    #[test]
    fn test_negative_adjustment_clamps_to_zero() {
        let entry = round_delivery(10.0, -20.0, &ingredient(10, 12.0, 0.5)).unwrap();
        assert_eq!(entry.final_delivery, 0.0);
        assert_eq!(entry.label, "0 BOX");

        let entry = round_delivery(10.0, -10.0, &ingredient(10, 12.0, 0.5)).unwrap();
        assert_eq!(entry.final_delivery, 0.0);
    }

    #[test]
    fn test_invalid_bundling_size_rejected() {
        let err = round_delivery(10.0, 0.0, &ingredient(10, 0.0, 1.0)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAdjustment(_)));
    }

    #[test]
    fn test_rounds_are_independent_of_each_other() {
        let rounder = DeliveryRounder::new();
        let reference = reference();
        let forecast = vec![forecast_line(10, 37.0)];

        let first = rounder
            .apply_delivery_round(DeliveryRound::First, "INV-DEL", &forecast, &[], &[adj(10, 12.0)], &reference)
            .unwrap();
        let second = rounder
            .apply_delivery_round(DeliveryRound::Second, "INV-DEL", &forecast, &first, &[adj(10, 0.0)], &reference)
            .unwrap();

        let rounds = &second[0].rounds;
        assert_eq!(rounds.get(DeliveryRound::First).unwrap().final_delivery, 60.0);
        // 第二轮相对原始 forecast 计算, 不叠加第一轮调整
        assert_eq!(rounds.get(DeliveryRound::Second).unwrap().final_delivery, 48.0);
        assert!(rounds.get(DeliveryRound::Third).is_none());
    }

    #[test]
    fn test_unlisted_ingredients_get_zero_adjustment() {
        let rounder = DeliveryRounder::new();
        let forecast = vec![forecast_line(10, 37.0), forecast_line(11, 7.0)];

        let lines = rounder
            .apply_delivery_round(DeliveryRound::First, "INV-DEL", &forecast, &[], &[adj(10, 1.0)], &reference())
            .unwrap();

        assert_eq!(lines.len(), 2);
        let second = lines.iter().find(|l| l.ingredient_id == 11).unwrap();
        let entry = second.rounds.get(DeliveryRound::First).unwrap();
        assert_eq!(entry.adjustment, 0.0);
        assert_eq!(entry.final_delivery, 10.0);
    }

    #[test]
    fn test_dropped_ingredient_keeps_earlier_rounds() {
        let rounder = DeliveryRounder::new();
        let reference = reference();

        let first = rounder
            .apply_delivery_round(
                DeliveryRound::First,
                "INV-DEL",
                &[forecast_line(10, 37.0), forecast_line(11, 7.0)],
                &[],
                &[adj(11, 3.0)],
                &reference,
            )
            .unwrap();

        // 重新计算后原料 11 不再有缺口行
        let second = rounder
            .apply_delivery_round(
                DeliveryRound::Second,
                "INV-DEL",
                &[forecast_line(10, 20.0)],
                &first,
                &[],
                &reference,
            )
            .unwrap();

        let ids: Vec<i64> = second.iter().map(|l| l.ingredient_id).collect();
        assert_eq!(ids, vec![10, 11]);
        let dropped = &second[1];
        assert_eq!(dropped.rounds.get(DeliveryRound::First).unwrap().final_delivery, 10.0);
        assert!(dropped.rounds.get(DeliveryRound::Second).is_none());

        // 已移出的原料不能再接受调整
        let err = rounder
            .apply_delivery_round(
                DeliveryRound::Second,
                "INV-DEL",
                &[forecast_line(10, 20.0)],
                &first,
                &[adj(11, 1.0)],
                &reference,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownIngredients { .. }));
    }

    #[test]
    fn test_unknown_ingredients_reported_together() {
        let rounder = DeliveryRounder::new();
        let forecast = vec![forecast_line(10, 37.0)];

        let err = rounder
            .apply_delivery_round(
                DeliveryRound::First,
                "INV-DEL",
                &forecast,
                &[],
                &[adj(10, 1.0), adj(99, 1.0), adj(77, 2.0)],
                &reference(),
            )
            .unwrap_err();

        match err {
            EngineError::UnknownIngredients { ids } => assert_eq!(ids, vec![77, 99]),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_adjustment_value_rejected() {
        let rounder = DeliveryRounder::new();
        let err = rounder
            .apply_delivery_round(
                DeliveryRound::First,
                "INV-DEL",
                &[forecast_line(10, 37.0)],
                &[],
                &[DeliveryAdjustment {
                    ingredient_id: 10,
                    adjustment: None,
                }],
                &reference(),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAdjustment(_)));
    }

    #[test]
    fn test_by_request_totals_sum_rounds() {
        let rounder = DeliveryRounder::new();
        let reference = reference();
        let entry = |q: f64| ByRequestEntry {
            item_id: 500,
            quantity: Some(q),
        };

        let first = rounder
            .apply_by_request_round(DeliveryRound::First, "C1", "INV-DEL", &[], &[entry(2.0)], &reference)
            .unwrap();
        let second = rounder
            .apply_by_request_round(DeliveryRound::Second, "C1", "INV-DEL", &first, &[entry(3.0)], &reference)
            .unwrap();

        assert_eq!(second.len(), 1);
        assert_eq!(second[0].total_delivery, 5.0);
        assert_eq!(second[0].total_qty_delivered, 250.0);
        assert_eq!(second[0].rounds.get(DeliveryRound::Second).unwrap().label, "150 PACK");
    }

    #[test]
    fn test_by_request_rejects_unknown_and_negative() {
        let rounder = DeliveryRounder::new();
        let reference = reference();

        let err = rounder
            .apply_by_request_round(
                DeliveryRound::First,
                "C1",
                "INV-DEL",
                &[],
                &[ByRequestEntry {
                    item_id: 404,
                    quantity: Some(1.0),
                }],
                &reference,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownByRequestItems { .. }));

        let err = rounder
            .apply_by_request_round(
                DeliveryRound::First,
                "C1",
                "INV-DEL",
                &[],
                &[ByRequestEntry {
                    item_id: 500,
                    quantity: Some(-1.0),
                }],
                &reference,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAdjustment(_)));
    }
}
