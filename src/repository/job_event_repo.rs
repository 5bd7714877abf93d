// ==========================================
// 作业分配与履约引擎 - 作业事件数据仓储
// ==========================================
// 红线: 只追加, 不更新不删除
// 调用时机: 核心事务提交之后, 尽力而为 (失败只记日志, 不回滚核心状态)
// ==========================================

use crate::domain::job_event::JobEvent;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// JobEventRepository - 作业事件仓储
// ==========================================
pub struct JobEventRepository {
    conn: Arc<Mutex<Connection>>,
}

impl JobEventRepository {
    /// 创建新的JobEventRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加事件
    ///
    /// # 返回
    /// - `Ok(event_id)`: 成功插入, 返回event_id
    pub fn insert(&self, event: &JobEvent) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO job_event (
                event_id, job_id, event_name, actor, payload_json, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)"#,
            params![
                &event.event_id,
                &event.job_id,
                &event.event_name,
                &event.actor,
                event.payload_json.as_ref().map(|v| v.to_string()),
                &event.created_at.format(DATETIME_FMT).to_string(),
            ],
        )?;

        Ok(event.event_id.clone())
    }

    /// 查询作业全部事件, 按时间升序
    pub fn find_by_job(&self, job_id: &str) -> RepositoryResult<Vec<JobEvent>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT event_id, job_id, event_name, actor, payload_json, created_at
               FROM job_event
               WHERE job_id = ?
               ORDER BY created_at ASC, rowid ASC"#,
        )?;

        let events = stmt
            .query_map(params![job_id], Self::map_row)?
            .collect::<Result<Vec<JobEvent>, _>>()?;

        Ok(events)
    }

    /// 映射数据库行到JobEvent对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<JobEvent> {
        let payload: Option<String> = row.get(4)?;
        let payload_json = match payload {
            Some(s) => Some(serde_json::from_str(&s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?),
            None => None,
        };

        Ok(JobEvent {
            event_id: row.get(0)?,
            job_id: row.get(1)?,
            event_name: row.get(2)?,
            actor: row.get(3)?,
            payload_json,
            created_at: NaiveDateTime::parse_from_str(&row.get::<_, String>(5)?, DATETIME_FMT)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        5,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
        })
    }
}
