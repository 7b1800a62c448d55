// ==========================================
// 门店补货预测系统 - 用量模型
// ==========================================
// 职责: 单个菜单品项的分渠道日均销量 → 每条 BOM 行的日/周用量
// 输入: 分渠道销量 + BOM 行 + 参考数据
// 输出: UsageRow 列表 (全精度; 存储时再按展示精度取整)
// 红线: 纯函数, 无副作用
// ==========================================

use crate::config::policy::{SAFETY_STOCK_RATIO, WEEKLY_USAGE_MULTIPLIER};
use crate::domain::forecast::UsageRow;
use crate::domain::reference::{BomLine, MenuItem, ReferenceData};
use crate::domain::sales::ChannelSales;
use crate::domain::types::TransactionType;
use crate::engine::error::{EngineError, EngineResult};

/// 单条 BOM 行的用量推导
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageFigures {
    pub average_daily_usage: f64,
    pub weekly_usage: f64,
    pub safety_stock: f64,
    pub forecast_weekly_consumption: f64,
}

impl UsageFigures {
    pub fn from_daily_usage(average_daily_usage: f64) -> Self {
        let weekly_usage = average_daily_usage * WEEKLY_USAGE_MULTIPLIER;
        let safety_stock = weekly_usage * SAFETY_STOCK_RATIO;
        Self {
            average_daily_usage,
            weekly_usage,
            safety_stock,
            forecast_weekly_consumption: weekly_usage + safety_stock,
        }
    }
}

// ==========================================
// UsageModel - 用量模型
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct UsageModel {
    no_of_days: u32,
    seasonality_index: f64,
}

impl UsageModel {
    pub fn new(no_of_days: u32, seasonality_index: f64) -> Self {
        Self {
            no_of_days,
            seasonality_index,
        }
    }

    /// 日均销量 = 窗口销量 / 天数 × 季节指数
    ///
    /// 天数为 0 时返回 0
    pub fn average_daily_sales(&self, quantity: i64) -> f64 {
        if self.no_of_days == 0 {
            return 0.0;
        }
        (quantity as f64 / self.no_of_days as f64) * self.seasonality_index
    }

    /// 计算一个菜单品项全部 BOM 行的用量
    ///
    /// # 错误
    /// - `InvalidBomRatio`: 配比为负数或非有限值
    pub fn evaluate(
        &self,
        menu_item: &MenuItem,
        sales: ChannelSales,
        bom_lines: &[BomLine],
        reference: &ReferenceData,
    ) -> EngineResult<Vec<UsageRow>> {
        let avg_dine_in = self.average_daily_sales(sales.dine_in_qty);
        let avg_take_out = self.average_daily_sales(sales.take_out_qty);

        let mut rows = Vec::with_capacity(bom_lines.len());
        for line in bom_lines {
            if !line.ratio.is_finite() || line.ratio < 0.0 {
                return Err(EngineError::InvalidBomRatio {
                    menu_item_id: line.menu_item_id,
                    ingredient_id: line.ingredient_id,
                    ratio: line.ratio,
                });
            }

            let channel = line.channel();
            let basis = match channel {
                TransactionType::TakeOut => avg_take_out,
                TransactionType::DineIn => avg_dine_in,
            };
            let figures = UsageFigures::from_daily_usage(basis * line.ratio);

            let (bos_code, ingredient_description) = match reference.ingredient(line.ingredient_id) {
                Some(ingredient) => (ingredient.bos_code.clone(), ingredient.description.clone()),
                None => {
                    tracing::warn!(
                        menu_item_id = menu_item.menu_item_id,
                        ingredient_id = line.ingredient_id,
                        "BOM 行引用的原料不在参考数据中"
                    );
                    (String::new(), String::new())
                }
            };

            rows.push(UsageRow {
                menu_item_id: menu_item.menu_item_id,
                pos_code: menu_item.pos_code.clone(),
                menu_description: menu_item.menu_description.clone(),
                ingredient_id: line.ingredient_id,
                bos_code,
                ingredient_description,
                category: line.category.clone(),
                qty_sold: sales.quantity(channel),
                average_daily_sales: basis,
                average_daily_usage: figures.average_daily_usage,
                weekly_usage: figures.weekly_usage,
                safety_stock: figures.safety_stock,
                forecast_weekly_consumption: figures.forecast_weekly_consumption,
            });
        }

        Ok(rows)
    }
}
