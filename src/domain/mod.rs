// ==========================================
// 作业分配与履约引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、状态机规则
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod item;
pub mod job;
pub mod job_event;
pub mod shortfall;
pub mod types;

// 重导出核心类型
pub use item::InventoryItem;
pub use job::{BomLine, Job};
pub use job_event::JobEvent;
pub use shortfall::Shortfall;
pub use types::{Capability, JobEventName, JobStatus, ShortfallStatus};
