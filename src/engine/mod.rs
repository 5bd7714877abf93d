// ==========================================
// 作业分配与履约引擎 - 引擎层
// ==========================================
// 职责: 状态机转换与库存账目的业务规则
// 红线: 审批评估必须在品项锁 + 单事务内完成 (全有或全无)
// ==========================================

pub mod approval;
pub mod availability;
pub mod bom_edit;
pub mod completion;
pub mod events;
pub mod item_locks;
pub mod voiding;

pub use approval::{ApprovalOutcome, ApprovalValidator, ShortfallDetail};
pub use availability::AvailabilityCalculator;
pub use bom_edit::BomLineEditor;
pub use completion::{ActualLine, CompletionOutcome, CompletionProcessor, ConsumedLine};
pub use events::{JobEventPublisher, NoOpEventPublisher, OptionalEventPublisher};
pub use item_locks::ItemLockRegistry;
pub use voiding::{VoidOutcome, VoidProcessor};

use crate::repository::error::RepositoryError;
use thiserror::Error;

// ==========================================
// 引擎层错误类型
// ==========================================

/// 引擎层错误
///
/// 说明: "审批被阻断"不是错误, 以 ApprovalOutcome::blocked 返回;
/// 本类型只承载硬失败 (非法转换/引用缺失/完整性违反)
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("作业未找到: {0}")]
    JobNotFound(String),

    #[error("品项未找到: {0}")]
    ItemNotFound(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("BOM行不可编辑: 作业当前状态为 {status}")]
    BomFrozen { status: String },

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("实耗清单与BOM品项集不一致: 缺少={missing:?}, 多余={extraneous:?}")]
    IncompleteActuals {
        missing: Vec<String>,
        extraneous: Vec<String>,
    },

    #[error("在手量不足以扣减实耗: item_id={item_id}, on_hand={on_hand}, qty_used={qty_used}")]
    InsufficientOnHand {
        item_id: String,
        on_hand: i64,
        qty_used: i64,
    },

    #[error("锁获取失败: {0}")]
    Lock(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
