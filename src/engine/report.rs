// ==========================================
// 门店补货预测系统 - 周期报表
// ==========================================
// 职责: 组装周期报表三张表, 交给 ReportWriter 落盘
// 表: initial_replenishment (用量明细) / forecast_summary (原料预测) / sales_data (销售汇总)
// 说明: 报表产物名称由调用方记录到周期 report_file 上
// ==========================================

use crate::domain::cycle::InventorySnapshot;
use crate::domain::forecast::{ForecastLine, UsageRow};
use crate::domain::reference::ReferenceData;
use crate::domain::sales::SalesSummaryRow;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// 报表错误
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("报表目录创建失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV 写入失败: {0}")]
    Csv(#[from] csv::Error),
}

// ==========================================
// 报表行
// ==========================================

/// initial_replenishment: 菜单品项 × 原料 用量明细
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReportRow {
    pub ingredient_id: i64,
    pub bos_code: String,
    pub ingredient_description: String,
    pub pos_code: String,
    pub menu_description: String,
    pub category: String,
    pub qty_sold: i64,
    pub average_daily_sales: f64,
    pub average_daily_usage: f64,
    pub weekly_usage: f64,
    pub safety_stock: f64,
    pub forecast_weekly_consumption: f64,
}

/// forecast_summary: 原料维度预测
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReportRow {
    pub ingredient_id: i64,
    pub bos_code: String,
    pub description: String,
    pub uom: String,
    pub total_average_daily_usage: f64,
    pub total_forecast_weekly_consumption: f64,
    pub actual_ending: f64,
    pub upcoming_delivery: f64,
    pub days_to_last: f64,
    pub forecasted_ending_inventory: f64,
    pub forecast: f64,
    pub converted_ending_inventory: f64,
    pub delivery_uom: String,
}

/// sales_data: 销售汇总 (每门店每品项一行)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesReportRow {
    pub pos_code: String,
    pub area: String,
    pub dine_in_quantity: i64,
    pub take_out_quantity: i64,
    pub average_dine_in_sold: f64,
    pub average_take_out_sold: f64,
}

/// 周期报表
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    pub inventory_code_id: String,
    pub area_name: String,
    pub code: String,
    pub usage_detail: Vec<UsageReportRow>,
    pub forecast_summary: Vec<ForecastReportRow>,
    pub sales_data: Vec<SalesReportRow>,
}

// ==========================================
// ReportAssembler - 报表组装
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportAssembler;

impl ReportAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(
        &self,
        snapshot: &InventorySnapshot,
        usage_rows: &[UsageRow],
        forecast_lines: &[ForecastLine],
        sales_summary: &[SalesSummaryRow],
        reference: &ReferenceData,
    ) -> CycleReport {
        let usage_detail = usage_rows
            .iter()
            .map(|row| UsageReportRow {
                ingredient_id: row.ingredient_id,
                bos_code: row.bos_code.clone(),
                ingredient_description: row.ingredient_description.clone(),
                pos_code: row.pos_code.clone(),
                menu_description: row.menu_description.clone(),
                category: row.category.clone(),
                qty_sold: row.qty_sold,
                average_daily_sales: row.average_daily_sales,
                average_daily_usage: row.average_daily_usage,
                weekly_usage: row.weekly_usage,
                safety_stock: row.safety_stock,
                forecast_weekly_consumption: row.forecast_weekly_consumption,
            })
            .collect();

        let forecast_summary = forecast_lines
            .iter()
            .map(|line| {
                let ingredient = reference.ingredient(line.ingredient_id);
                ForecastReportRow {
                    ingredient_id: line.ingredient_id,
                    bos_code: line.bos_code.clone(),
                    description: ingredient.map(|i| i.description.clone()).unwrap_or_default(),
                    uom: ingredient.map(|i| i.uom.clone()).unwrap_or_default(),
                    total_average_daily_usage: line.total_average_daily_usage,
                    total_forecast_weekly_consumption: line.total_forecast_weekly_consumption,
                    actual_ending: line.actual_ending,
                    upcoming_delivery: line.upcoming_delivery,
                    days_to_last: line.days_to_last,
                    forecasted_ending_inventory: line.forecasted_ending_inventory,
                    forecast: line.forecast,
                    converted_ending_inventory: line.converted_ending_inventory,
                    delivery_uom: ingredient.map(|i| i.delivery_uom.clone()).unwrap_or_default(),
                }
            })
            .collect();

        let sales_data = sales_summary
            .iter()
            .map(|row| SalesReportRow {
                pos_code: row.pos_code.clone(),
                area: row.area_name.clone(),
                dine_in_quantity: row.dine_in_quantity,
                take_out_quantity: row.take_out_quantity,
                average_dine_in_sold: row.average_dine_in_sold,
                average_take_out_sold: row.average_take_out_sold,
            })
            .collect();

        CycleReport {
            inventory_code_id: snapshot.inventory_code_id.clone(),
            area_name: reference.area_name(snapshot.area_id),
            code: snapshot.code.clone(),
            usage_detail,
            forecast_summary,
            sales_data,
        }
    }
}

// ==========================================
// ReportWriter Trait
// ==========================================

/// 报表落盘
///
/// # 返回
/// - 产物名称 (记录到周期 report_file)
pub trait ReportWriter: Send + Sync {
    fn write(&self, report: &CycleReport) -> Result<String, ReportError>;
}

pub const USAGE_SHEET: &str = "initial_replenishment";
pub const FORECAST_SHEET: &str = "forecast_summary";
pub const SALES_SHEET: &str = "sales_data";

/// 产物目录名: `{门店}_{周期编码}_{周期ID}_sales_report`
pub fn report_artifact_name(area_name: &str, code: &str, inventory_code_id: &str) -> String {
    let sanitize = |s: &str| -> String {
        s.trim()
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect()
    };
    format!(
        "{}_{}_{}_sales_report",
        sanitize(area_name),
        sanitize(code),
        sanitize(inventory_code_id)
    )
}

// ==========================================
// CsvReportWriter - 每张表一个 CSV 文件
// ==========================================
#[derive(Debug, Clone)]
pub struct CsvReportWriter {
    output_dir: PathBuf,
}

impl CsvReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn write_sheet<T: Serialize>(
        &self,
        dir: &std::path::Path,
        sheet: &str,
        rows: &[T],
    ) -> Result<(), ReportError> {
        let mut writer = csv::Writer::from_path(dir.join(format!("{}.csv", sheet)))?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl ReportWriter for CsvReportWriter {
    fn write(&self, report: &CycleReport) -> Result<String, ReportError> {
        let artifact = report_artifact_name(
            &report.area_name,
            &report.code,
            &report.inventory_code_id,
        );
        let dir = self.output_dir.join(&artifact);
        fs::create_dir_all(&dir)?;

        self.write_sheet(&dir, USAGE_SHEET, &report.usage_detail)?;
        self.write_sheet(&dir, FORECAST_SHEET, &report.forecast_summary)?;
        self.write_sheet(&dir, SALES_SHEET, &report.sales_data)?;

        info!(
            inventory_code_id = %report.inventory_code_id,
            artifact = %artifact,
            usage_rows = report.usage_detail.len(),
            forecast_rows = report.forecast_summary.len(),
            sales_rows = report.sales_data.len(),
            "报表已生成"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reference::{Area, Ingredient};
    use chrono::NaiveDate;

    fn reference() -> ReferenceData {
        ReferenceData::new(
            vec![Area {
                area_id: 1,
                location: "SM Imus".to_string(),
                province: "Cavite".to_string(),
                municipality: "Imus".to_string(),
            }],
            vec![],
            vec![Ingredient {
                ingredient_id: 10,
                bos_code: "BOS10".to_string(),
                description: "Whole chicken".to_string(),
                uom: "PC".to_string(),
                delivery_uom: "BOX".to_string(),
                bundling_size: 12.0,
                conversion_delivery_uom: 12.0,
            }],
            vec![],
            vec![],
        )
    }

    fn snapshot() -> InventorySnapshot {
        let created_at = NaiveDate::from_ymd_opt(2025, 1, 26)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        InventorySnapshot::new_open(1, "INV-001".to_string(), "alice".to_string(), created_at)
    }

    fn forecast_line(code_id: &str) -> ForecastLine {
        ForecastLine {
            inventory_code_id: code_id.to_string(),
            ingredient_id: 10,
            bos_code: "BOS10".to_string(),
            total_average_daily_usage: 22.0,
            total_forecast_weekly_consumption: 212.0,
            actual_ending: 150.0,
            upcoming_delivery: 12.0,
            days_to_last: 6.82,
            forecasted_ending_inventory: 52.0,
            forecast: 160.0,
            converted_ending_inventory: 14.0,
        }
    }

    #[test]
    fn test_artifact_name_sanitized() {
        assert_eq!(
            report_artifact_name("SM Imus/Cavite", "INV-001", "c1"),
            "SM_Imus_Cavite_INV-001_c1_sales_report"
        );
    }

    #[test]
    fn test_assemble_fills_ingredient_details() {
        let snapshot = snapshot();
        let report = ReportAssembler::new().assemble(
            &snapshot,
            &[],
            &[forecast_line(&snapshot.inventory_code_id)],
            &[],
            &reference(),
        );

        assert_eq!(report.area_name, "SM Imus");
        assert_eq!(report.forecast_summary.len(), 1);
        assert_eq!(report.forecast_summary[0].description, "Whole chicken");
        assert_eq!(report.forecast_summary[0].delivery_uom, "BOX");
        assert!(report.usage_detail.is_empty());
    }

    #[test]
    fn test_csv_writer_creates_three_sheets() {
        let temp_dir = tempfile::tempdir().unwrap();
        let snapshot = snapshot();
        let report = ReportAssembler::new().assemble(
            &snapshot,
            &[],
            &[forecast_line(&snapshot.inventory_code_id)],
            &[],
            &reference(),
        );

        let writer = CsvReportWriter::new(temp_dir.path());
        let artifact = writer.write(&report).unwrap();
        assert_eq!(
            artifact,
            format!("SM_Imus_INV-001_{}_sales_report", snapshot.inventory_code_id)
        );

        let dir = temp_dir.path().join(&artifact);
        for sheet in [USAGE_SHEET, FORECAST_SHEET, SALES_SHEET] {
            assert!(dir.join(format!("{}.csv", sheet)).exists(), "{} missing", sheet);
        }

        let content = fs::read_to_string(dir.join("forecast_summary.csv")).unwrap();
        assert!(content.starts_with("ingredient_id,bos_code"));
        assert!(content.contains("BOS10"));
    }
}
