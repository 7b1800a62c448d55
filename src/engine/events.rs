// ==========================================
// 门店补货预测系统 - 周期事件通知
// ==========================================
// 职责: 定义周期通知 trait, 投递方式 (邮件等) 由外部实现
// 说明: 通知在事务提交之后发出, 投递失败只记日志, 不回滚迁移
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 周期事件类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleEventType {
    /// 已提交审批 → 通知门店所有审批权限持有人
    Submitted,
    /// 已审批 → 通知提交人
    Approved,
    /// 已退回 → 通知提交人 (附审批意见)
    Amended,
}

impl CycleEventType {
    pub fn as_str(&self) -> &str {
        match self {
            CycleEventType::Submitted => "Submitted",
            CycleEventType::Approved => "Approved",
            CycleEventType::Amended => "Amended",
        }
    }
}

/// 周期事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleEvent {
    pub inventory_code_id: String,
    pub area_id: i64,
    pub event_type: CycleEventType,
    /// 接收人 (权限持有人或提交人)
    pub recipients: Vec<String>,
    /// 操作人
    pub actor: String,
    /// 审批意见等附言
    pub message: Option<String>,
}

impl CycleEvent {
    pub fn new(
        inventory_code_id: &str,
        area_id: i64,
        event_type: CycleEventType,
        recipients: Vec<String>,
        actor: &str,
    ) -> Self {
        Self {
            inventory_code_id: inventory_code_id.to_string(),
            area_id,
            event_type,
            recipients,
            actor: actor.to_string(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }
}

// ==========================================
// 通知 Trait
// ==========================================

/// 周期通知者
///
/// # 返回
/// - `Ok(receipt)`: 投递回执 (如果支持) 或空字符串
pub trait CycleNotifier: Send + Sync {
    fn notify(&self, event: CycleEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作通知者 (单元测试/命令行批处理)
#[derive(Debug, Clone, Default)]
pub struct NoOpNotifier;

impl CycleNotifier for NoOpNotifier {
    fn notify(&self, event: CycleEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpNotifier: 跳过通知 - inventory_code_id={}, event_type={}",
            event.inventory_code_id,
            event.event_type.as_str()
        );
        Ok(String::new())
    }
}

/// 可选的通知者包装
pub struct OptionalNotifier {
    inner: Option<Arc<dyn CycleNotifier>>,
}

impl OptionalNotifier {
    pub fn with_notifier(notifier: Arc<dyn CycleNotifier>) -> Self {
        Self {
            inner: Some(notifier),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发送通知; 失败只告警
    pub fn notify_best_effort(&self, event: CycleEvent) {
        let Some(notifier) = &self.inner else {
            tracing::debug!(
                "OptionalNotifier: 未配置通知者，跳过事件 - inventory_code_id={}, event_type={}",
                event.inventory_code_id,
                event.event_type.as_str()
            );
            return;
        };

        let code_id = event.inventory_code_id.clone();
        let event_type = event.event_type;
        let recipients = event.recipients.len();
        if let Err(e) = notifier.notify(event) {
            tracing::warn!(
                inventory_code_id = %code_id,
                event_type = event_type.as_str(),
                recipients,
                error = %e,
                "周期通知发送失败"
            );
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalNotifier {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FailingNotifier {
        attempts: Mutex<usize>,
    }

    impl CycleNotifier for FailingNotifier {
        fn notify(&self, _event: CycleEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
            *self.attempts.lock().unwrap() += 1;
            Err("smtp unavailable".into())
        }
    }

    fn event() -> CycleEvent {
        CycleEvent::new(
            "C1",
            1,
            CycleEventType::Amended,
            vec!["alice".to_string()],
            "bob",
        )
        .with_message(Some("recount chicken".to_string()))
    }

    #[test]
    fn test_noop_notifier() {
        let result = NoOpNotifier.notify(event());
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn test_optional_notifier_none() {
        let notifier = OptionalNotifier::none();
        assert!(!notifier.is_configured());
        notifier.notify_best_effort(event());
    }

    #[test]
    fn test_failure_is_swallowed() {
        let failing = Arc::new(FailingNotifier {
            attempts: Mutex::new(0),
        });
        let notifier = OptionalNotifier::with_notifier(failing.clone());
        assert!(notifier.is_configured());

        notifier.notify_best_effort(event());
        assert_eq!(*failing.attempts.lock().unwrap(), 1);
    }
}
