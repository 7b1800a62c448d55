// ==========================================
// 门店补货预测系统 - 需求汇总引擎
// ==========================================
// 职责: 对窗口内有销量的每个菜单品项并发执行 UsageModel
// 输入: 门店 + SalesAggregate + 参考数据快照
// 输出: 按原料排序的 UsageRow + 去重后的销售汇总行
// ==========================================
// 并发模型:
// - 每个菜单品项一个任务, 由 buffer_unordered 限制同时执行的数量 (与 CPU 核数相关)
// - 任务间仅共享只读的 Arc<ReferenceData>
// - 任一任务失败立即中止 (try_collect), 整体超时同样整体失败
// ==========================================

use crate::config::policy::ForecastPolicy;
use crate::domain::forecast::{round_display, UsageRow};
use crate::domain::reference::ReferenceData;
use crate::domain::sales::{channel_sales_by_item, ChannelSales, SalesAggregate, SalesSummaryRow};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::usage_model::UsageModel;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// 单个菜单品项的计算结果
#[derive(Debug, Clone)]
struct ItemDemand {
    usage_rows: Vec<UsageRow>,
    summary: SalesSummaryRow,
}

/// 汇总阶段输出
#[derive(Debug, Clone, Default)]
pub struct DemandAggregation {
    pub usage_rows: Vec<UsageRow>,
    pub sales_summary: Vec<SalesSummaryRow>,
}

// ==========================================
// DemandAggregator - 需求汇总引擎
// ==========================================
#[derive(Debug, Clone)]
pub struct DemandAggregator {
    model: UsageModel,
    worker_pool_size: usize,
    timeout: Duration,
}

impl DemandAggregator {
    pub fn new(policy: &ForecastPolicy) -> Self {
        Self {
            model: UsageModel::new(policy.no_of_days, policy.seasonality_index),
            worker_pool_size: policy.worker_pool_size.max(1),
            timeout: Duration::from_secs(policy.aggregation_timeout_secs),
        }
    }

    /// 执行汇总
    ///
    /// # 错误
    /// - 任一品项计算失败 → 该错误 (其余结果全部丢弃)
    /// - `AggregationTimeout`: 超过策略上限
    #[instrument(skip(self, aggregates, reference), fields(count = aggregates.len()))]
    pub async fn aggregate(
        &self,
        area_id: i64,
        aggregates: &[SalesAggregate],
        reference: Arc<ReferenceData>,
    ) -> EngineResult<DemandAggregation> {
        let timeout_secs = self.timeout.as_secs();
        tokio::time::timeout(self.timeout, self.run(area_id, aggregates, reference))
            .await
            .map_err(|_| EngineError::AggregationTimeout { timeout_secs })?
    }

    async fn run(
        &self,
        area_id: i64,
        aggregates: &[SalesAggregate],
        reference: Arc<ReferenceData>,
    ) -> EngineResult<DemandAggregation> {
        let mut items: Vec<(i64, ChannelSales)> = channel_sales_by_item(aggregates)
            .into_iter()
            .filter(|(_, sales)| !sales.is_zero())
            .collect();
        items.sort_by_key(|(menu_item_id, _)| *menu_item_id);

        let total_items = items.len();
        let model = self.model;

        let outputs: Vec<Option<ItemDemand>> = stream::iter(items)
            .map(|(menu_item_id, sales)| {
                let reference = Arc::clone(&reference);
                async move {
                    let joined = tokio::task::spawn_blocking(move || {
                        evaluate_item(&model, area_id, menu_item_id, sales, &reference)
                    })
                    .await;
                    match joined {
                        Ok(result) => result,
                        Err(e) => Err(EngineError::TaskFailed(format!(
                            "menu_item_id={}: {}",
                            menu_item_id, e
                        ))),
                    }
                }
            })
            .buffer_unordered(self.worker_pool_size)
            .try_collect()
            .await?;

        // 顺序折叠: 汇总行按 (menu_item_id, area_id) 去重, 用量行按原料排序
        let mut summary_by_key: BTreeMap<(i64, i64), SalesSummaryRow> = BTreeMap::new();
        let mut usage_rows = Vec::new();
        for output in outputs.into_iter().flatten() {
            summary_by_key
                .entry((output.summary.menu_item_id, output.summary.area_id))
                .or_insert(output.summary);
            usage_rows.extend(output.usage_rows);
        }
        usage_rows.sort_by(|a, b| {
            a.ingredient_id
                .cmp(&b.ingredient_id)
                .then(a.menu_item_id.cmp(&b.menu_item_id))
        });

        info!(
            area_id,
            menu_items = total_items,
            usage_rows = usage_rows.len(),
            sales_summary = summary_by_key.len(),
            "需求汇总完成"
        );

        Ok(DemandAggregation {
            usage_rows,
            sales_summary: summary_by_key.into_values().collect(),
        })
    }
}

/// 单个菜单品项的计算 (在阻塞线程池中执行)
///
/// 参考数据中不存在的菜单品项返回 None
fn evaluate_item(
    model: &UsageModel,
    area_id: i64,
    menu_item_id: i64,
    sales: ChannelSales,
    reference: &ReferenceData,
) -> EngineResult<Option<ItemDemand>> {
    let Some(menu_item) = reference.menu_items.get(&menu_item_id) else {
        warn!(area_id, menu_item_id, "销售流水中的菜单品项不在参考数据中, 已跳过");
        return Ok(None);
    };

    let usage_rows = model.evaluate(
        menu_item,
        sales,
        reference.bom_lines_for(menu_item_id),
        reference,
    )?;

    debug!(
        menu_item_id,
        dine_in = sales.dine_in_qty,
        take_out = sales.take_out_qty,
        rows = usage_rows.len(),
        "菜单品项用量计算完成"
    );

    let summary = SalesSummaryRow {
        menu_item_id,
        pos_code: menu_item.pos_code.clone(),
        area_id,
        area_name: reference.area_name(area_id),
        dine_in_quantity: sales.dine_in_qty,
        take_out_quantity: sales.take_out_qty,
        average_dine_in_sold: round_display(model.average_daily_sales(sales.dine_in_qty)),
        average_take_out_sold: round_display(model.average_daily_sales(sales.take_out_qty)),
    };

    Ok(Some(ItemDemand {
        usage_rows,
        summary,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reference::{Area, BomLine, Ingredient, MenuItem};
    use crate::domain::sales::SalesWindow;
    use crate::domain::types::TransactionType;
    use chrono::NaiveDate;

    fn window() -> SalesWindow {
        SalesWindow::new(
            NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 26).unwrap(),
        )
    }

    fn agg(menu_item_id: i64, t: TransactionType, quantity: i64) -> SalesAggregate {
        SalesAggregate {
            menu_item_id,
            area_id: 1,
            transaction_type: t,
            quantity,
            window: window(),
        }
    }

    fn bom(menu_item_id: i64, ingredient_id: i64, ratio: f64, category: &str) -> BomLine {
        BomLine {
            menu_item_id,
            ingredient_id,
            ratio,
            category: category.to_string(),
            uom: "PC".to_string(),
        }
    }

    fn menu_item(id: i64) -> MenuItem {
        MenuItem {
            menu_item_id: id,
            pos_code: format!("POS{}", id),
            menu_description: format!("Item {}", id),
        }
    }

    fn ingredient(id: i64) -> Ingredient {
        Ingredient {
            ingredient_id: id,
            bos_code: format!("BOS{}", id),
            description: format!("Ingredient {}", id),
            uom: "PC".to_string(),
            delivery_uom: "BOX".to_string(),
            bundling_size: 12.0,
            conversion_delivery_uom: 12.0,
        }
    }

    fn reference(bom_lines: Vec<BomLine>) -> Arc<ReferenceData> {
        Arc::new(ReferenceData::new(
            vec![Area {
                area_id: 1,
                location: "SM IMUS".to_string(),
                province: "Cavite".to_string(),
                municipality: "Imus".to_string(),
            }],
            (1..=5).map(menu_item).collect(),
            (10..=12).map(ingredient).collect(),
            bom_lines,
            vec![],
        ))
    }

    fn policy(worker_pool_size: usize) -> ForecastPolicy {
        ForecastPolicy {
            worker_pool_size,
            ..ForecastPolicy::default()
        }
    }

    #[tokio::test]
    async fn test_aggregate_sorts_by_ingredient_and_dedupes_summary() {
        let reference = reference(vec![
            bom(1, 11, 1.0, "DINE IN"),
            bom(1, 10, 2.0, "DINE IN"),
            bom(2, 10, 1.0, "TAKE OUT"),
            bom(3, 12, 1.0, "DINE IN"), // 无销量 → 不参与
        ]);
        let aggregates = vec![
            agg(1, TransactionType::DineIn, 210),
            agg(1, TransactionType::TakeOut, 21),
            agg(2, TransactionType::TakeOut, 42),
        ];

        let result = DemandAggregator::new(&policy(2))
            .aggregate(1, &aggregates, reference)
            .await
            .unwrap();

        let keys: Vec<(i64, i64)> = result
            .usage_rows
            .iter()
            .map(|r| (r.ingredient_id, r.menu_item_id))
            .collect();
        assert_eq!(keys, vec![(10, 1), (10, 2), (11, 1)]);

        assert_eq!(result.sales_summary.len(), 2);
        let first = &result.sales_summary[0];
        assert_eq!(first.menu_item_id, 1);
        assert_eq!(first.area_name, "SM IMUS");
        assert_eq!(first.dine_in_quantity, 210);
        assert_eq!(first.take_out_quantity, 21);
        assert_eq!(first.average_dine_in_sold, 11.0);
    }

    #[tokio::test]
    async fn test_aggregate_is_deterministic_across_pool_sizes() {
        let bom_lines: Vec<BomLine> = (1..=5)
            .flat_map(|item| (10..=12).map(move |ing| bom(item, ing, 0.5 * item as f64, "DINE IN")))
            .collect();
        let aggregates: Vec<SalesAggregate> = (1..=5)
            .map(|item| agg(item, TransactionType::DineIn, 10 * item))
            .collect();

        let single = DemandAggregator::new(&policy(1))
            .aggregate(1, &aggregates, reference(bom_lines.clone()))
            .await
            .unwrap();
        let parallel = DemandAggregator::new(&policy(8))
            .aggregate(1, &aggregates, reference(bom_lines))
            .await
            .unwrap();

        assert_eq!(single.usage_rows, parallel.usage_rows);
        assert_eq!(single.sales_summary, parallel.sales_summary);
    }

    #[tokio::test]
    async fn test_one_failing_item_aborts_the_run() {
        let reference = reference(vec![
            bom(1, 10, 1.0, "DINE IN"),
            bom(2, 11, f64::NAN, "DINE IN"),
        ]);
        let aggregates = vec![
            agg(1, TransactionType::DineIn, 10),
            agg(2, TransactionType::DineIn, 10),
        ];

        let err = DemandAggregator::new(&policy(4))
            .aggregate(1, &aggregates, reference)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidBomRatio { menu_item_id: 2, .. }));
    }

    #[tokio::test]
    async fn test_timeout_aborts_whole_run() {
        let bom_lines: Vec<BomLine> = (1..=5)
            .flat_map(|item| (10..=12).map(move |ing| bom(item, ing, 1.0, "DINE IN")))
            .collect();
        let aggregates: Vec<SalesAggregate> = (1..=5)
            .map(|item| agg(item, TransactionType::DineIn, 10 * item))
            .collect();

        // 上限为 0: 首个阻塞任务尚未返回即超时
        let policy = ForecastPolicy {
            worker_pool_size: 1,
            aggregation_timeout_secs: 0,
            ..ForecastPolicy::default()
        };
        let result = DemandAggregator::new(&policy)
            .aggregate(1, &aggregates, reference(bom_lines))
            .await;

        match result {
            Err(EngineError::AggregationTimeout { timeout_secs }) => assert_eq!(timeout_secs, 0),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_menu_item_skipped() {
        let reference = reference(vec![bom(1, 10, 1.0, "DINE IN")]);
        let aggregates = vec![
            agg(1, TransactionType::DineIn, 10),
            agg(99, TransactionType::DineIn, 10),
        ];

        let result = DemandAggregator::new(&policy(2))
            .aggregate(1, &aggregates, reference)
            .await
            .unwrap();
        assert_eq!(result.sales_summary.len(), 1);
        assert_eq!(result.usage_rows.len(), 1);
    }
}
