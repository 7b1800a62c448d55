// ==========================================
// 门店补货预测系统 - 参考数据领域模型
// ==========================================
// 职责: 门店、菜单品项、原料(BOS)、BOM 行、按需申请品项
// 说明: 参考数据每次运行显式加载为 ReferenceData 快照, 不做进程级缓存
// ==========================================

use crate::domain::types::TransactionType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// Area - 门店
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub area_id: i64,
    pub location: String,     // 门店名称
    pub province: String,
    pub municipality: String,
}

// ==========================================
// MenuItem - 菜单品项 (POS item)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub menu_item_id: i64,
    pub pos_code: String,         // POS 编码
    pub menu_description: String, // 菜品描述
}

// ==========================================
// Ingredient - 原料 (BOS item)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub ingredient_id: i64,
    pub bos_code: String,
    pub description: String,
    pub uom: String,                     // 库存单位
    pub delivery_uom: String,            // 配送单位
    pub bundling_size: f64,              // 最小订货批量 (> 0)
    pub conversion_delivery_uom: f64,    // 配送单位换算系数 (0 = 无换算)
}

// ==========================================
// BomLine - 物料清单行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomLine {
    pub menu_item_id: i64,
    pub ingredient_id: i64,
    pub ratio: f64,           // 单份用量
    pub category: String,     // 用于区分堂食/外带口径
    pub uom: String,
}

impl BomLine {
    /// 按类别文本判定渠道: 含 "TAKE" 视为外带, 其余为堂食
    pub fn channel(&self) -> TransactionType {
        if self.category.to_uppercase().contains("TAKE") {
            TransactionType::TakeOut
        } else {
            TransactionType::DineIn
        }
    }
}

// ==========================================
// ByRequestItem - 按需申请品项 (不参与预测)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByRequestItem {
    pub item_id: i64,
    pub item_code: String,
    pub description: String,
    pub uom: String,
    pub delivery_uom: String,
    pub conversion_delivery_uom: f64,
}

// ==========================================
// ReferenceData - 单次运行的参考数据快照
// ==========================================
// 只读, 可通过 Arc 在并发任务间共享
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub areas: HashMap<i64, Area>,
    pub menu_items: HashMap<i64, MenuItem>,
    pub ingredients: HashMap<i64, Ingredient>,
    pub bom_by_menu_item: HashMap<i64, Vec<BomLine>>,
    pub by_request_items: HashMap<i64, ByRequestItem>,
}

impl ReferenceData {
    /// 由平铺列表构建快照
    pub fn new(
        areas: Vec<Area>,
        menu_items: Vec<MenuItem>,
        ingredients: Vec<Ingredient>,
        bom_lines: Vec<BomLine>,
        by_request_items: Vec<ByRequestItem>,
    ) -> Self {
        let mut bom_by_menu_item: HashMap<i64, Vec<BomLine>> = HashMap::new();
        for line in bom_lines {
            bom_by_menu_item.entry(line.menu_item_id).or_default().push(line);
        }

        Self {
            areas: areas.into_iter().map(|a| (a.area_id, a)).collect(),
            menu_items: menu_items.into_iter().map(|m| (m.menu_item_id, m)).collect(),
            ingredients: ingredients.into_iter().map(|i| (i.ingredient_id, i)).collect(),
            bom_by_menu_item,
            by_request_items: by_request_items.into_iter().map(|i| (i.item_id, i)).collect(),
        }
    }

    pub fn bom_lines_for(&self, menu_item_id: i64) -> &[BomLine] {
        self.bom_by_menu_item
            .get(&menu_item_id)
            .map(|lines| lines.as_slice())
            .unwrap_or(&[])
    }

    pub fn ingredient(&self, ingredient_id: i64) -> Option<&Ingredient> {
        self.ingredients.get(&ingredient_id)
    }

    pub fn area_name(&self, area_id: i64) -> String {
        self.areas
            .get(&area_id)
            .map(|a| a.location.clone())
            .unwrap_or_else(|| format!("AREA-{}", area_id))
    }
}
