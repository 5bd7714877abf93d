// ==========================================
// 作业分配与履约引擎 - 缺口领域模型
// ==========================================
// Shortfall: 某次审批尝试时, 作业对某品项尚未满足的数量
// 规则: 每 (job_id, item_id) 至多一条 ACTIVE, 下次审批重算时覆盖
// ==========================================

use crate::domain::types::ShortfallStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shortfall {
    pub shortfall_id: String,        // 缺口ID
    pub job_id: String,              // 关联作业
    pub item_id: String,             // 品项ID
    pub missing_qty: i64,            // 缺口量 (>= 0)
    pub status: ShortfallStatus,     // 状态
    pub evaluated_at: NaiveDateTime, // 评估时间
}

impl Shortfall {
    /// 构造一条 ACTIVE 缺口 (审批阻断时写入)
    pub fn active(job_id: &str, item_id: &str, missing_qty: i64) -> Self {
        Self {
            shortfall_id: Uuid::new_v4().to_string(),
            job_id: job_id.to_string(),
            item_id: item_id.to_string(),
            missing_qty,
            status: ShortfallStatus::Active,
            evaluated_at: chrono::Utc::now().naive_utc(),
        }
    }
}
