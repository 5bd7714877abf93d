// ==========================================
// 作业分配与履约引擎 - 作业事件领域模型
// ==========================================
// 红线: 只追加, 每次生命周期转换一条
// 用途: 审计追踪, 缺口历史分析 (ACTIVE 缺口会被覆盖, 事件不会)
// ==========================================

use crate::domain::types::JobEventName;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub event_id: String,                // 事件ID
    pub job_id: String,                  // 关联作业
    pub event_name: String,              // 事件名 (存储为字符串)
    pub actor: String,                   // 操作人
    pub payload_json: Option<JsonValue>, // 事件负载 (JSON)
    pub created_at: NaiveDateTime,       // 发生时间
}

impl JobEvent {
    pub fn new(job_id: &str, event_name: JobEventName, actor: &str, payload: Option<JsonValue>) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            job_id: job_id.to_string(),
            event_name: event_name.as_str().to_string(),
            actor: actor.to_string(),
            payload_json: payload,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}
