// ==========================================
// 作业分配与履约引擎 - 作业领域模型
// ==========================================
// Job: 计划消耗库存的工作单元, 只追加历史 (状态 + 事件), 永不删除
// BomLine: 作业对单一品项的计划需求量, 仅 UNRESERVED 态可变
// ==========================================

use crate::domain::types::JobStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// Job - 作业 (工单)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,            // 作业ID
    pub tenant_id: String,         // 租户ID (边界已保证作用域, 核心只携带)
    pub job_name: String,          // 作业名称
    pub status: JobStatus,         // 状态
    pub notes: Option<String>,     // 备注
    pub created_by: String,        // 创建人
    pub created_at: NaiveDateTime, // 创建时间
    pub updated_at: NaiveDateTime, // 更新时间
}

impl Job {
    /// 构造新作业 (初始态 UNRESERVED)
    pub fn new(tenant_id: &str, job_name: &str, notes: Option<&str>, created_by: &str) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            job_id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            job_name: job_name.to_string(),
            status: JobStatus::Unreserved,
            notes: notes.map(|s| s.to_string()),
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 是否可编辑 BOM 行
    pub fn is_editable(&self) -> bool {
        self.status == JobStatus::Unreserved
    }

    /// 是否处于预占态
    pub fn is_reserved(&self) -> bool {
        self.status == JobStatus::Reserved
    }
}

// ==========================================
// BomLine - 物料清单行
// ==========================================
// 约束: planned_qty 为正整数, (job_id, item_id) 唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomLine {
    pub line_id: String,           // 行ID
    pub job_id: String,            // 关联作业
    pub item_id: String,           // 品项ID
    pub planned_qty: i64,          // 计划需求量 (> 0)
    pub created_at: NaiveDateTime, // 创建时间
    pub updated_at: NaiveDateTime, // 更新时间
}

impl BomLine {
    pub fn new(job_id: &str, item_id: &str, planned_qty: i64) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            line_id: Uuid::new_v4().to_string(),
            job_id: job_id.to_string(),
            item_id: item_id.to_string(),
            planned_qty,
            created_at: now,
            updated_at: now,
        }
    }
}
