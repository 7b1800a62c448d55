// ==========================================
// 门店补货预测系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表脚本幂等 (CREATE TABLE IF NOT EXISTS)
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    configure_sqlite_connection(conn)?;
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_scope (
    scope_id TEXT PRIMARY KEY,
    scope_type TEXT NOT NULL,
    scope_key TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(scope_type, scope_key)
);

INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
VALUES ('global', 'GLOBAL', 'global');

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

-- ===== 参考数据 =====
CREATE TABLE IF NOT EXISTS area (
    area_id INTEGER PRIMARY KEY,
    location TEXT NOT NULL,
    province TEXT NOT NULL DEFAULT '',
    municipality TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS menu_item (
    menu_item_id INTEGER PRIMARY KEY,
    pos_code TEXT NOT NULL UNIQUE,
    menu_description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS ingredient (
    ingredient_id INTEGER PRIMARY KEY,
    bos_code TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    uom TEXT NOT NULL DEFAULT '',
    delivery_uom TEXT NOT NULL DEFAULT '',
    bundling_size REAL NOT NULL,
    conversion_delivery_uom REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS bom_line (
    bom_line_id INTEGER PRIMARY KEY AUTOINCREMENT,
    menu_item_id INTEGER NOT NULL,
    ingredient_id INTEGER NOT NULL,
    ratio REAL NOT NULL,
    category TEXT NOT NULL DEFAULT '',
    uom TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS by_request_item (
    item_id INTEGER PRIMARY KEY,
    item_code TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    uom TEXT NOT NULL DEFAULT '',
    delivery_uom TEXT NOT NULL DEFAULT '',
    conversion_delivery_uom REAL NOT NULL DEFAULT 0
);

-- ===== 销售流水 =====
CREATE TABLE IF NOT EXISTS sales_transaction (
    sales_id INTEGER PRIMARY KEY AUTOINCREMENT,
    menu_item_id INTEGER NOT NULL,
    area_id INTEGER NOT NULL,
    transaction_type TEXT NOT NULL,
    quantity INTEGER NOT NULL CHECK (quantity >= 0),
    sales_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sales_area_date ON sales_transaction(area_id, sales_date);

-- ===== 库存周期 =====
CREATE TABLE IF NOT EXISTS inventory_code (
    inventory_code_id TEXT PRIMARY KEY,
    area_id INTEGER NOT NULL,
    code TEXT NOT NULL,
    status TEXT NOT NULL,
    delivery_round INTEGER NOT NULL DEFAULT 1,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    submitted_by TEXT,
    review_message TEXT,
    report_file TEXT,
    config_snapshot_json TEXT,
    revision INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_inventory_code_area ON inventory_code(area_id, created_at);

CREATE TABLE IF NOT EXISTS ending_inventory (
    inventory_code_id TEXT NOT NULL REFERENCES inventory_code(inventory_code_id) ON DELETE CASCADE,
    ingredient_id INTEGER NOT NULL,
    actual_ending REAL NOT NULL DEFAULT 0,
    upcoming_delivery REAL NOT NULL DEFAULT 0,
    PRIMARY KEY (inventory_code_id, ingredient_id)
);

-- ===== 预测结果 =====
CREATE TABLE IF NOT EXISTS usage_row (
    inventory_code_id TEXT NOT NULL REFERENCES inventory_code(inventory_code_id) ON DELETE CASCADE,
    seq_no INTEGER NOT NULL,
    menu_item_id INTEGER NOT NULL,
    pos_code TEXT NOT NULL,
    menu_description TEXT NOT NULL,
    ingredient_id INTEGER NOT NULL,
    bos_code TEXT NOT NULL,
    ingredient_description TEXT NOT NULL,
    category TEXT NOT NULL,
    qty_sold INTEGER NOT NULL,
    average_daily_sales REAL NOT NULL,
    average_daily_usage REAL NOT NULL,
    weekly_usage REAL NOT NULL,
    safety_stock REAL NOT NULL,
    forecast_weekly_consumption REAL NOT NULL,
    PRIMARY KEY (inventory_code_id, seq_no)
);

CREATE TABLE IF NOT EXISTS sales_summary (
    inventory_code_id TEXT NOT NULL REFERENCES inventory_code(inventory_code_id) ON DELETE CASCADE,
    menu_item_id INTEGER NOT NULL,
    pos_code TEXT NOT NULL,
    area_id INTEGER NOT NULL,
    area_name TEXT NOT NULL,
    dine_in_quantity INTEGER NOT NULL,
    take_out_quantity INTEGER NOT NULL,
    average_dine_in_sold REAL NOT NULL,
    average_take_out_sold REAL NOT NULL,
    PRIMARY KEY (inventory_code_id, menu_item_id, area_id)
);

CREATE TABLE IF NOT EXISTS forecast_line (
    inventory_code_id TEXT NOT NULL REFERENCES inventory_code(inventory_code_id) ON DELETE CASCADE,
    ingredient_id INTEGER NOT NULL,
    bos_code TEXT NOT NULL,
    total_average_daily_usage REAL NOT NULL,
    total_forecast_weekly_consumption REAL NOT NULL,
    actual_ending REAL NOT NULL,
    upcoming_delivery REAL NOT NULL,
    days_to_last REAL NOT NULL,
    forecasted_ending_inventory REAL NOT NULL,
    forecast REAL NOT NULL,
    converted_ending_inventory REAL NOT NULL,
    PRIMARY KEY (inventory_code_id, ingredient_id)
);

-- ===== 配送/按需申请 =====
CREATE TABLE IF NOT EXISTS delivery_line (
    inventory_code_id TEXT NOT NULL REFERENCES inventory_code(inventory_code_id) ON DELETE CASCADE,
    delivery_code TEXT NOT NULL,
    ingredient_id INTEGER NOT NULL,
    bos_code TEXT NOT NULL,
    forecast REAL NOT NULL,
    rounds_json TEXT NOT NULL,
    PRIMARY KEY (inventory_code_id, ingredient_id)
);

CREATE INDEX IF NOT EXISTS idx_delivery_line_code ON delivery_line(delivery_code);

CREATE TABLE IF NOT EXISTS by_request_line (
    inventory_code_id TEXT NOT NULL REFERENCES inventory_code(inventory_code_id) ON DELETE CASCADE,
    delivery_code TEXT NOT NULL,
    item_id INTEGER NOT NULL,
    item_code TEXT NOT NULL,
    rounds_json TEXT NOT NULL,
    total_delivery REAL NOT NULL,
    total_qty_delivered REAL NOT NULL,
    PRIMARY KEY (inventory_code_id, item_id)
);

-- ===== 审计 =====
CREATE TABLE IF NOT EXISTS cycle_action_log (
    action_id TEXT PRIMARY KEY,
    inventory_code_id TEXT NOT NULL,
    action TEXT NOT NULL,
    actor TEXT NOT NULL,
    from_status TEXT,
    to_status TEXT NOT NULL,
    message TEXT,
    payload_json TEXT,
    action_ts TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cycle_action_log_code ON cycle_action_log(inventory_code_id, action_ts);
"#;
