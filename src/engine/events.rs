// ==========================================
// 作业分配与履约引擎 - 引擎层事件发布
// ==========================================
// 职责: 定义作业事件发布 trait, 实现依赖倒置
// 说明: Engine 层定义 trait, 外围系统 (消息队列/Webhook) 实现适配器
// 时机: 核心事务提交之后调用; 发布失败只记日志, 永不回滚核心状态
// ==========================================

use crate::domain::job_event::JobEvent;
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 事件发布 Trait
// ==========================================

/// 作业事件发布者 Trait
///
/// Engine 层定义, 审计/通知等下游系统实现
/// 通过 trait 实现依赖倒置, 核心不依赖任何具体投递通道
pub trait JobEventPublisher: Send + Sync {
    /// 发布作业事件
    ///
    /// # 参数
    /// - `event`: 作业事件 (已持久化的审计记录副本)
    ///
    /// # 返回
    /// - `Err`: 发布失败 (调用方只记日志)
    fn publish(&self, event: &JobEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl JobEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: &JobEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - job_id={}, event_name={}",
            event.job_id,
            event.event_name
        );
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn JobEventPublisher>> 的使用
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn JobEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn JobEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    pub fn publish(&self, event: &JobEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者, 跳过事件 - job_id={}, event_name={}",
                    event.job_id,
                    event.event_name
                );
                Ok(())
            }
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::JobEventName;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPublisher {
        count: AtomicUsize,
    }

    impl JobEventPublisher for CountingPublisher {
        fn publish(&self, _event: &JobEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_optional_publisher_none_is_noop() {
        let publisher = OptionalEventPublisher::none();
        assert!(!publisher.is_configured());

        let event = JobEvent::new("j1", JobEventName::JobCreated, "op", None);
        assert!(publisher.publish(&event).is_ok());
    }

    #[test]
    fn test_optional_publisher_delegates() {
        let counting = Arc::new(CountingPublisher {
            count: AtomicUsize::new(0),
        });
        let publisher = OptionalEventPublisher::with_publisher(counting.clone());
        assert!(publisher.is_configured());

        let event = JobEvent::new("j1", JobEventName::JobVoided, "op", None);
        publisher.publish(&event).unwrap();
        assert_eq!(counting.count.load(Ordering::SeqCst), 1);
    }
}
