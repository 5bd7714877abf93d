// ==========================================
// 作业分配与履约引擎 - 领域类型定义
// ==========================================
// 状态机: UNRESERVED → RESERVED → {COMPLETED | VOIDED}
// 红线: 除上述边外不存在其他状态转换
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 作业状态 (Job Status)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Unreserved, // 未预占 (初始态, BOM 行可编辑)
    Reserved,   // 已预占 (计入可承诺量扣减, 不动在手量)
    Completed,  // 已完成 (终态, 实耗已扣减在手量)
    Voided,     // 已作废 (终态, 预占释放, 不动在手量)
}

impl JobStatus {
    /// 转换为数据库存储字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            JobStatus::Unreserved => "UNRESERVED",
            JobStatus::Reserved => "RESERVED",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Voided => "VOIDED",
        }
    }

    /// 从数据库字符串解析
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "UNRESERVED" => Some(JobStatus::Unreserved),
            "RESERVED" => Some(JobStatus::Reserved),
            "COMPLETED" => Some(JobStatus::Completed),
            "VOIDED" => Some(JobStatus::Voided),
            _ => None,
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Voided)
    }

    /// 状态机合法转换判断
    ///
    /// 唯一合法边: UNRESERVED→RESERVED, RESERVED→COMPLETED, RESERVED→VOIDED
    pub fn can_transition_to(&self, target: JobStatus) -> bool {
        matches!(
            (self, target),
            (JobStatus::Unreserved, JobStatus::Reserved)
                | (JobStatus::Reserved, JobStatus::Completed)
                | (JobStatus::Reserved, JobStatus::Voided)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 缺口状态 (Shortfall Status)
// ==========================================
// 每 (job_id, item_id) 至多一条 ACTIVE, 每次审批重算时覆盖
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShortfallStatus {
    Active,   // 当前未满足缺口
    Resolved, // 已消解 (审批成功时置为此态)
}

impl ShortfallStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ShortfallStatus::Active => "ACTIVE",
            ShortfallStatus::Resolved => "RESOLVED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(ShortfallStatus::Active),
            "RESOLVED" => Some(ShortfallStatus::Resolved),
            _ => None,
        }
    }
}

impl fmt::Display for ShortfallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 能力 (Capability)
// ==========================================
// 授权协作方按 (actor, tenant, capability) 判定
// 核心只负责在每次变更前调用, 不负责能力存储
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    JobCreate,   // 创建作业
    JobEdit,     // 编辑 BOM 行
    JobApprove,  // 审批 (预占库存)
    JobComplete, // 完成 (实耗扣减)
    JobVoid,     // 作废 (释放预占)
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::JobCreate => "job_create",
            Capability::JobEdit => "job_edit",
            Capability::JobApprove => "job_approve",
            Capability::JobComplete => "job_complete",
            Capability::JobVoid => "job_void",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 作业事件名 (Job Event Name)
// ==========================================
// 每次生命周期转换追加一条, 事务提交后发布
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobEventName {
    JobCreated,           // 作业创建
    JobApproved,          // 审批通过, 进入 RESERVED
    JobInventoryReserved, // 库存预占生效
    JobApprovalBlocked,   // 审批被阻断 (缺口明细随 payload)
    JobCompleted,         // 作业完成
    JobInventoryConsumed, // 实耗扣减生效
    JobVoided,            // 作业作废
}

impl JobEventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobEventName::JobCreated => "job_created",
            JobEventName::JobApproved => "job_approved",
            JobEventName::JobInventoryReserved => "job_inventory_reserved",
            JobEventName::JobApprovalBlocked => "job_approval_blocked",
            JobEventName::JobCompleted => "job_completed",
            JobEventName::JobInventoryConsumed => "job_inventory_consumed",
            JobEventName::JobVoided => "job_voided",
        }
    }
}

impl fmt::Display for JobEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
