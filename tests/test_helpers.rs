// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、参考数据/销量播种、API 组装等功能
// 场景数据:
// - 门店 1 (SM Imus) / 门店 2 (SM Bacoor) / 门店 3 (无周期)
// - 菜品 100 汉堡: 每份 2 个面包 (堂食口径)
// - 原料 10 面包: bundling 12, 换算 12 (BOX)
// - 原料 20 酱料: 无 BOM 用量
// - 按需品项 500 纸巾: 换算 6 (PACK)
// ==========================================

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use replenishment_mrp::api::CycleApi;
use replenishment_mrp::db::{init_schema, open_sqlite_connection};
use replenishment_mrp::domain::{
    Area, BomLine, ByRequestItem, EndingInventoryLine, Ingredient, MenuItem, SalesTransaction,
    SalesWindow, TransactionType,
};
use replenishment_mrp::engine::{
    AllowAllCapabilities, CapabilityChecker, CsvReportWriter, CycleEvent, CycleNotifier,
    CycleRepositories,
};
use rusqlite::Connection;
use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::{NamedTempFile, TempDir};

use crate::helpers::mock_config::MockConfig;

pub const AREA_IMUS: i64 = 1;
pub const AREA_BACOOR: i64 = 2;
pub const AREA_EMPTY: i64 = 3;

pub const MENU_BURGER: i64 = 100;
pub const INGREDIENT_BUN: i64 = 10;
pub const INGREDIENT_SAUCE: i64 = 20;
pub const ITEM_TISSUE: i64 = 500;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是合法 UTF-8")?
        .to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 窗口起点 (2025-01-01), 21 天窗口为 [01-01, 01-22)
pub fn window_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

pub fn default_window() -> SalesWindow {
    let start = window_start();
    SalesWindow::new(start, start + Duration::days(21))
}

/// 播种参考数据
pub fn seed_reference_data(repos: &CycleRepositories) {
    repos
        .reference_repo
        .upsert_areas(&[
            area(AREA_IMUS, "SM Imus"),
            area(AREA_BACOOR, "SM Bacoor"),
            area(AREA_EMPTY, "SM Dasmarinas"),
        ])
        .unwrap();

    repos
        .reference_repo
        .upsert_menu_items(&[MenuItem {
            menu_item_id: MENU_BURGER,
            pos_code: "POS-BURGER".to_string(),
            menu_description: "Burger".to_string(),
        }])
        .unwrap();

    repos
        .reference_repo
        .upsert_ingredients(&[
            Ingredient {
                ingredient_id: INGREDIENT_BUN,
                bos_code: "BOS-BUN".to_string(),
                description: "Burger Bun".to_string(),
                uom: "PC".to_string(),
                delivery_uom: "BOX".to_string(),
                bundling_size: 12.0,
                conversion_delivery_uom: 12.0,
            },
            Ingredient {
                ingredient_id: INGREDIENT_SAUCE,
                bos_code: "BOS-SAUCE".to_string(),
                description: "Sauce".to_string(),
                uom: "ML".to_string(),
                delivery_uom: "BOTTLE".to_string(),
                bundling_size: 1.0,
                conversion_delivery_uom: 0.0,
            },
        ])
        .unwrap();

    repos
        .reference_repo
        .replace_bom_lines(&[BomLine {
            menu_item_id: MENU_BURGER,
            ingredient_id: INGREDIENT_BUN,
            ratio: 2.0,
            category: "DINE IN".to_string(),
            uom: "PC".to_string(),
        }])
        .unwrap();

    repos
        .reference_repo
        .upsert_by_request_items(&[ByRequestItem {
            item_id: ITEM_TISSUE,
            item_code: "REQ-TISSUE".to_string(),
            description: "Tissue".to_string(),
            uom: "PACK".to_string(),
            delivery_uom: "PACK".to_string(),
            conversion_delivery_uom: 6.0,
        }])
        .unwrap();
}

fn area(area_id: i64, location: &str) -> Area {
    Area {
        area_id,
        location: location.to_string(),
        province: "Cavite".to_string(),
        municipality: location.to_string(),
    }
}

/// 播种销量: 窗口内每天 11 份堂食 (21 天合计 231)
///
/// 另在窗口结束日写入一笔 1000 份, 用于验证半开区间
pub fn seed_sales(repos: &CycleRepositories, area_id: i64) {
    let start = window_start();
    let mut transactions: Vec<SalesTransaction> = (0..21)
        .map(|offset| SalesTransaction {
            menu_item_id: MENU_BURGER,
            area_id,
            transaction_type: TransactionType::DineIn,
            quantity: 11,
            sales_date: start + Duration::days(offset),
        })
        .collect();
    transactions.push(SalesTransaction {
        menu_item_id: MENU_BURGER,
        area_id,
        transaction_type: TransactionType::DineIn,
        quantity: 1000,
        sales_date: start + Duration::days(21),
    });
    repos.sales_repo.batch_insert(&transactions).unwrap();
}

/// 面包盘点: 实盘 150, 在途 12
pub fn bun_ending_line() -> EndingInventoryLine {
    EndingInventoryLine {
        inventory_code_id: String::new(),
        ingredient_id: INGREDIENT_BUN,
        actual_ending: 150.0,
        upcoming_delivery: 12.0,
    }
}

// ==========================================
// 通知记录器
// ==========================================

/// 记录全部通知, 可配置为始终失败
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<CycleEvent>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn recorded(&self) -> Vec<CycleEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl CycleNotifier for RecordingNotifier {
    fn notify(&self, event: CycleEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        if self.fail {
            return Err("通知服务不可用".into());
        }
        let mut events = self.events.lock().unwrap();
        events.push(event);
        Ok(format!("event-{}", events.len()))
    }
}

// ==========================================
// 测试环境
// ==========================================

/// 组装好的测试环境 (临时文件需保持存活)
pub struct TestEnv {
    pub _db_file: NamedTempFile,
    pub report_dir: TempDir,
    pub conn: Arc<Mutex<Connection>>,
    pub repos: CycleRepositories,
    pub api: CycleApi<MockConfig>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestEnv {
    pub fn report_path(&self) -> PathBuf {
        self.report_dir.path().to_path_buf()
    }
}

/// 创建测试环境: 参考数据已播种, 门店 1/2 已有销量
pub fn setup_env() -> TestEnv {
    setup_env_with(
        Arc::new(AllowAllCapabilities),
        Arc::new(RecordingNotifier::default()),
    )
}

pub fn setup_env_with(
    capabilities: Arc<dyn CapabilityChecker>,
    notifier: Arc<RecordingNotifier>,
) -> TestEnv {
    let (db_file, db_path) = create_test_db().unwrap();
    let conn = Arc::new(Mutex::new(open_sqlite_connection(&db_path).unwrap()));
    let repos = CycleRepositories::from_connection(conn.clone());

    seed_reference_data(&repos);
    seed_sales(&repos, AREA_IMUS);
    seed_sales(&repos, AREA_BACOOR);

    let report_dir = tempfile::tempdir().unwrap();
    let api = CycleApi::new(
        repos.clone(),
        Arc::new(MockConfig::default()),
        Arc::new(CsvReportWriter::new(report_dir.path().to_path_buf())),
        capabilities,
        Some(notifier.clone() as Arc<dyn CycleNotifier>),
    );

    TestEnv {
        _db_file: db_file,
        report_dir,
        conn,
        repos,
        api,
        notifier,
    }
}
