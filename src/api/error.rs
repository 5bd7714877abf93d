// ==========================================
// 作业分配与履约引擎 - API层错误类型
// ==========================================
// 职责: 定义对外错误分类, 转换仓储/引擎错误为用户可解释的错误
// 分类对齐: 输入校验 / 授权 / 状态 / 完整性 / 基础设施
// 注意: "审批被阻断"不在此列 —— 它是结构化业务结果, 不是错误
// ==========================================

use crate::engine::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须包含显式原因 (可解释性)
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入校验错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 授权错误
    // ==========================================
    #[error("授权失败: actor={actor} 在租户 {tenant_id} 缺少能力 {capability}")]
    AuthorizationDenied {
        actor: String,
        tenant_id: String,
        capability: String,
    },

    // ==========================================
    // 状态错误 (文档化的幂等空操作除外)
    // ==========================================
    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("操作与作业当前状态不符: operation={operation}, status={status}")]
    InvalidState { operation: String, status: String },

    // ==========================================
    // 完整性错误 (complete 专用)
    // ==========================================
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

    // ==========================================
    // 基础设施错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("锁获取失败: {0}")]
    LockError(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} (id={})", entity, id))
            }
            RepositoryError::LockError(msg) => ApiError::LockError(msg),
            e => ApiError::DatabaseError(e.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::JobNotFound(id) => ApiError::NotFound(format!("作业不存在: {}", id)),
            EngineError::ItemNotFound(id) => ApiError::NotFound(format!("品项不存在: {}", id)),
            EngineError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            EngineError::BomFrozen { status } => ApiError::InvalidState {
                operation: "upsert_bom_line".to_string(),
                status,
            },
            EngineError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            EngineError::IncompleteActuals { missing, extraneous } => {
                ApiError::IncompleteActuals { missing, extraneous }
            }
            EngineError::InsufficientOnHand {
                item_id,
                on_hand,
                qty_used,
            } => ApiError::InsufficientOnHand {
                item_id,
                on_hand,
                qty_used,
            },
            EngineError::Lock(msg) => ApiError::LockError(msg),
            EngineError::Repository(e) => e.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
