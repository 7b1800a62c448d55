// ==========================================
// 门店补货预测系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 计算保护 (除零/零用量) 不属于错误, 在各引擎内部就地归零
// ==========================================

use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 输入缺陷 (程序错误) =====
    #[error("BOM 行配比非法: menu_item_id={menu_item_id}, ingredient_id={ingredient_id}, ratio={ratio}")]
    InvalidBomRatio {
        menu_item_id: i64,
        ingredient_id: i64,
        ratio: f64,
    },

    #[error("菜单品项不存在: menu_item_id={0}")]
    UnknownMenuItem(i64),

    #[error("原料不存在: ingredient_ids={ids:?}")]
    UnknownIngredients { ids: Vec<i64> },

    #[error("按需品项不存在: item_ids={ids:?}")]
    UnknownByRequestItems { ids: Vec<i64> },

    #[error("调整批次非法: {0}")]
    InvalidAdjustment(String),

    // ===== 并发执行错误 =====
    #[error("聚合任务执行失败: {0}")]
    TaskFailed(String),

    #[error("聚合超时: 超过 {timeout_secs} 秒")]
    AggregationTimeout { timeout_secs: u64 },

    // ===== 配置 =====
    #[error("配置读取失败: {0}")]
    ConfigError(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
