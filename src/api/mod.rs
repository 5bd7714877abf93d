// ==========================================
// 作业分配与履约引擎 - API层
// ==========================================
// 职责: 操作面 (createJob/upsertBomLine/approve/complete/void) 与查询面
// 约定: 每个写操作在任何状态变更前先过授权; 结构化结果区分
//       成功 / 阻断 / 幂等空操作 / 硬错误, 而非仅靠异常
// ==========================================

pub mod authorizer;
pub mod error;
pub mod job_api;

pub use authorizer::{AllowAllAuthorizer, Authorizer, StaticAuthorizer};
pub use error::{ApiError, ApiResult};
pub use job_api::JobApi;
