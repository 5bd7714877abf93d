// ==========================================
// 作业分配与履约引擎 - 授权协作方边界
// ==========================================
// 职责: 定义 authorize(actor, tenant, capability) 边界 trait
// 说明: 能力/权限存储在外部系统 (权限表/计费档位门控),
//       核心只负责在每次变更前调用并在失败时零副作用地中止
// ==========================================

use crate::domain::types::Capability;
use std::collections::HashSet;

// ==========================================
// Authorizer Trait
// ==========================================

/// 授权协作方 Trait
///
/// 返回 false 时, 调用操作必须在任何状态变更发生前中止
pub trait Authorizer: Send + Sync {
    /// 判定 actor 在租户作用域内是否持有指定能力
    fn authorize(&self, actor: &str, tenant_id: &str, capability: Capability) -> bool;
}

/// 全放行授权器
///
/// 用于测试与单租户嵌入场景
#[derive(Debug, Clone, Default)]
pub struct AllowAllAuthorizer;

impl Authorizer for AllowAllAuthorizer {
    fn authorize(&self, _actor: &str, _tenant_id: &str, _capability: Capability) -> bool {
        true
    }
}

/// 静态授权器
///
/// 显式授予 (actor, tenant, capability) 三元组, 其余一律拒绝
/// 用于测试授权失败路径
#[derive(Debug, Clone, Default)]
pub struct StaticAuthorizer {
    grants: HashSet<(String, String, Capability)>,
}

impl StaticAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 授予一项能力 (链式调用)
    pub fn grant(mut self, actor: &str, tenant_id: &str, capability: Capability) -> Self {
        self.grants
            .insert((actor.to_string(), tenant_id.to_string(), capability));
        self
    }
}

impl Authorizer for StaticAuthorizer {
    fn authorize(&self, actor: &str, tenant_id: &str, capability: Capability) -> bool {
        self.grants
            .contains(&(actor.to_string(), tenant_id.to_string(), capability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_authorizer_explicit_grants_only() {
        let auth = StaticAuthorizer::new().grant("op1", "t1", Capability::JobCreate);

        assert!(auth.authorize("op1", "t1", Capability::JobCreate));
        assert!(!auth.authorize("op1", "t1", Capability::JobApprove));
        assert!(!auth.authorize("op1", "t2", Capability::JobCreate));
        assert!(!auth.authorize("op2", "t1", Capability::JobCreate));
    }
}
