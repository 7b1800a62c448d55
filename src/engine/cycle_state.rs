// ==========================================
// 门店补货预测系统 - 周期状态机
// ==========================================
// 职责: 定义每个周期动作允许的前置状态与目标状态
// 说明: 状态机只给出判定, 实际迁移由仓储在事务内 CAS 完成
// ==========================================
// OPEN ──PROCESS──▶ PROCESSED ──SAVE_DRAFT──▶ DRAFT
//   │                  │  └──────SUBMIT──────┐   │
//   │                  │                     ▼   ▼
//   │                  │                  SUBMITTED ──APPROVE──▶ APPROVED
//   │                  │                     │  ▲
//   │                  │                   AMEND │ RESUBMIT / SUBMIT
//   │                  │                     ▼  │
//   └──────DELETE──────┴────────────────▶  AMENDED ──DELETE──▶ DELETED
// ==========================================

use crate::domain::cycle::InventorySnapshot;
use crate::domain::types::{CycleAction, CycleStatus};

/// 状态判定失败原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRejected {
    pub action: CycleAction,
    pub from: CycleStatus,
}

impl std::fmt::Display for TransitionRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "动作 {} 不允许在状态 {} 下执行", self.action, self.from)
    }
}

// ==========================================
// CycleStateMachine - 周期状态机
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleStateMachine;

impl CycleStateMachine {
    /// 动作允许的前置状态
    pub fn allowed_from(action: CycleAction) -> &'static [CycleStatus] {
        use CycleStatus::*;
        match action {
            CycleAction::Create => &[],
            CycleAction::LoadInventory => &[Open],
            CycleAction::Process => &[Open, Processed],
            CycleAction::SaveDraft => &[Processed, Draft, Amended],
            CycleAction::Submit => &[Processed, Draft, Amended],
            CycleAction::Approve => &[Submitted],
            CycleAction::Amend => &[Submitted],
            CycleAction::Resubmit => &[Amended],
            CycleAction::Delete => &[Open, Processed, Draft, Amended],
        }
    }

    /// 动作的目标状态
    pub fn target(action: CycleAction) -> CycleStatus {
        match action {
            CycleAction::Create | CycleAction::LoadInventory => CycleStatus::Open,
            CycleAction::Process => CycleStatus::Processed,
            CycleAction::SaveDraft => CycleStatus::Draft,
            CycleAction::Submit | CycleAction::Resubmit => CycleStatus::Submitted,
            CycleAction::Approve => CycleStatus::Approved,
            CycleAction::Amend => CycleStatus::Amended,
            CycleAction::Delete => CycleStatus::Deleted,
        }
    }

    pub fn can_apply(action: CycleAction, from: CycleStatus) -> bool {
        Self::allowed_from(action).contains(&from)
    }

    /// 判定动作能否作用于周期, 返回目标状态
    pub fn check(
        action: CycleAction,
        snapshot: &InventorySnapshot,
    ) -> Result<CycleStatus, TransitionRejected> {
        if Self::can_apply(action, snapshot.status) {
            Ok(Self::target(action))
        } else {
            Err(TransitionRejected {
                action,
                from: snapshot.status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_accept_nothing() {
        let actions = [
            CycleAction::LoadInventory,
            CycleAction::Process,
            CycleAction::SaveDraft,
            CycleAction::Submit,
            CycleAction::Approve,
            CycleAction::Amend,
            CycleAction::Resubmit,
            CycleAction::Delete,
        ];
        for action in actions {
            assert!(!CycleStateMachine::can_apply(action, CycleStatus::Approved));
            assert!(!CycleStateMachine::can_apply(action, CycleStatus::Deleted));
        }
    }

    #[test]
    fn test_submitted_is_locked_for_submitter_actions() {
        assert!(!CycleStateMachine::can_apply(CycleAction::SaveDraft, CycleStatus::Submitted));
        assert!(!CycleStateMachine::can_apply(CycleAction::Process, CycleStatus::Submitted));
        assert!(!CycleStateMachine::can_apply(CycleAction::Delete, CycleStatus::Submitted));
        assert!(CycleStateMachine::can_apply(CycleAction::Approve, CycleStatus::Submitted));
        assert!(CycleStateMachine::can_apply(CycleAction::Amend, CycleStatus::Submitted));
    }

    #[test]
    fn test_process_is_rerunnable() {
        assert!(CycleStateMachine::can_apply(CycleAction::Process, CycleStatus::Open));
        assert!(CycleStateMachine::can_apply(CycleAction::Process, CycleStatus::Processed));
        assert_eq!(CycleStateMachine::target(CycleAction::Process), CycleStatus::Processed);
    }

    #[test]
    fn test_amended_returns_to_submission() {
        assert!(CycleStateMachine::can_apply(CycleAction::Resubmit, CycleStatus::Amended));
        assert!(CycleStateMachine::can_apply(CycleAction::SaveDraft, CycleStatus::Amended));
        assert_eq!(CycleStateMachine::target(CycleAction::Resubmit), CycleStatus::Submitted);
    }
}
