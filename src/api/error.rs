// ==========================================
// 门店补货预测系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型, 将仓储/引擎错误转换为调用方可识别的错误
// 红线: 错误信息必须能定位到具体的周期/原料ID, 不返回笼统失败
// ==========================================

use crate::engine::error::EngineError;
use crate::engine::report::ReportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 未找到
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 批次引用了不存在的原料/品项 (NotFound 的细分)
    #[error("原料不存在: ids={ids:?}")]
    UnknownIngredients { ids: Vec<i64> },

    // ==========================================
    // 冲突
    // ==========================================
    #[error("周期冲突: {0}")]
    Conflict(String),

    /// 当前状态不允许该动作 (Conflict 的细分)
    #[error("无效的状态转换: id={id}, from={from} to={to}")]
    InvalidStateTransition { id: String, from: String, to: String },

    // ==========================================
    // 输入与权限
    // ==========================================
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("无权限: principal={principal}, action={action}")]
    PermissionDenied { principal: String, action: String },

    // ==========================================
    // 外部协作者/基础设施
    // ==========================================
    #[error("报表生成失败: {0}")]
    ReportError(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("引擎执行失败: {0}")]
    EngineError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 是否属于冲突类错误
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ApiError::Conflict(_) | ApiError::InvalidStateTransition { .. }
        )
    }

    /// 是否属于未找到类错误
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApiError::NotFound(_) | ApiError::UnknownIngredients { .. }
        )
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发/状态控制
            RepositoryError::CycleConflict { message } => ApiError::Conflict(message),
            RepositoryError::InvalidStateTransition { id, from, to } => {
                ApiError::InvalidStateTransition { id, from, to }
            }
            RepositoryError::OptimisticLockFailure {
                id,
                expected,
                actual,
            } => ApiError::Conflict(format!(
                "周期{}已被其他操作修改（期望revision={}，实际revision={}）",
                id, expected, actual
            )),

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg)
            | RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::Conflict(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::NotFound(format!("外键约束违反: {}", msg))
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::ValidationError(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::UnknownIngredients { ids } => ApiError::UnknownIngredients { ids },
            EngineError::UnknownByRequestItems { ids } => {
                ApiError::NotFound(format!("按需品项不存在: item_ids={:?}", ids))
            }
            EngineError::UnknownMenuItem(id) => {
                ApiError::NotFound(format!("菜单品项不存在: menu_item_id={}", id))
            }
            EngineError::InvalidAdjustment(msg) => ApiError::ValidationError(msg),
            other => ApiError::EngineError(other.to_string()),
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        ApiError::ReportError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let api_err: ApiError = RepositoryError::NotFound {
            entity: "InventorySnapshot".to_string(),
            id: "C1".to_string(),
        }
        .into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("InventorySnapshot"));
                assert!(msg.contains("C1"));
            }
            _ => panic!("Expected NotFound"),
        }

        let api_err: ApiError = RepositoryError::OptimisticLockFailure {
            id: "C1".to_string(),
            expected: 1,
            actual: 2,
        }
        .into();
        assert!(api_err.is_conflict());

        let api_err: ApiError = RepositoryError::CycleConflict {
            message: "area 1".to_string(),
        }
        .into();
        assert!(matches!(api_err, ApiError::Conflict(_)));
    }

    #[test]
    fn test_engine_error_conversion() {
        let api_err: ApiError = EngineError::UnknownIngredients { ids: vec![77, 99] }.into();
        match &api_err {
            ApiError::UnknownIngredients { ids } => assert_eq!(ids, &vec![77, 99]),
            _ => panic!("Expected UnknownIngredients"),
        }
        assert!(api_err.is_not_found());

        let api_err: ApiError = EngineError::InvalidAdjustment("missing".to_string()).into();
        assert!(matches!(api_err, ApiError::ValidationError(_)));

        let api_err: ApiError = EngineError::AggregationTimeout { timeout_secs: 5 }.into();
        assert!(matches!(api_err, ApiError::EngineError(_)));
    }
}
