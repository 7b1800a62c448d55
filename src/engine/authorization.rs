// ==========================================
// 门店补货预测系统 - 权限校验接口
// ==========================================
// 职责: 询问 "操作人能否对周期执行某动作", 本系统不管理角色/权限
// 说明: 审批权限持有人同时作为 SUBMITTED 通知的接收人
// ==========================================

use crate::domain::cycle::InventorySnapshot;
use crate::domain::types::CycleAction;
use std::collections::{HashMap, HashSet};

/// 权限校验者
pub trait CapabilityChecker: Send + Sync {
    /// 操作人能否对周期执行动作
    ///
    /// `snapshot` 为 None 表示周期尚不存在 (创建动作)
    fn can_perform(
        &self,
        principal: &str,
        action: CycleAction,
        area_id: i64,
        snapshot: Option<&InventorySnapshot>,
    ) -> bool;

    /// 门店内持有某动作权限的全部人员
    fn holders(&self, area_id: i64, action: CycleAction) -> Vec<String>;
}

/// 放行全部请求 (命令行批处理)
#[derive(Debug, Clone, Default)]
pub struct AllowAllCapabilities;

impl CapabilityChecker for AllowAllCapabilities {
    fn can_perform(
        &self,
        _principal: &str,
        _action: CycleAction,
        _area_id: i64,
        _snapshot: Option<&InventorySnapshot>,
    ) -> bool {
        true
    }

    fn holders(&self, _area_id: i64, _action: CycleAction) -> Vec<String> {
        Vec::new()
    }
}

// ==========================================
// StaticCapabilities - 静态授权表
// ==========================================
// (门店, 动作) → 人员集合
#[derive(Debug, Clone, Default)]
pub struct StaticCapabilities {
    grants: HashMap<(i64, CycleAction), HashSet<String>>,
}

impl StaticCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, area_id: i64, principal: &str, actions: &[CycleAction]) -> Self {
        for action in actions {
            self.grants
                .entry((area_id, *action))
                .or_default()
                .insert(principal.to_string());
        }
        self
    }
}

impl CapabilityChecker for StaticCapabilities {
    fn can_perform(
        &self,
        principal: &str,
        action: CycleAction,
        area_id: i64,
        _snapshot: Option<&InventorySnapshot>,
    ) -> bool {
        self.grants
            .get(&(area_id, action))
            .map(|holders| holders.contains(principal))
            .unwrap_or(false)
    }

    fn holders(&self, area_id: i64, action: CycleAction) -> Vec<String> {
        let mut holders: Vec<String> = self
            .grants
            .get(&(area_id, action))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        holders.sort();
        holders
    }
}
