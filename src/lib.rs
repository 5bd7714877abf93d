// ==========================================
// 多租户库存作业系统 - 作业分配与履约引擎核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 作业(工单)预占/履约引擎, 同步事务模型
// 并发红线: 两个并发作业不得同时超占同一单位库存
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 数据库基础设施（连接初始化/PRAGMA/建表统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Capability, JobEventName, JobStatus, ShortfallStatus};

// 领域实体
pub use domain::{BomLine, InventoryItem, Job, JobEvent, Shortfall};

// 引擎
pub use engine::{
    ApprovalValidator, AvailabilityCalculator, BomLineEditor, CompletionProcessor,
    ItemLockRegistry, VoidProcessor,
};

// API
pub use api::{AllowAllAuthorizer, Authorizer, JobApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "作业分配与履约引擎";

// ==========================================
// 预编译检查
// ==========================================
