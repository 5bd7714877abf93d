// ==========================================
// 作业分配与履约引擎 - 缺口数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 规则: 每 (job_id, item_id) 至多一条 ACTIVE;
//       覆盖式更新, 历史分析依赖 job_event 而非本表
// ==========================================

use crate::domain::shortfall::Shortfall;
use crate::domain::types::ShortfallStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// ShortfallRepository - 缺口仓储
// ==========================================
pub struct ShortfallRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShortfallRepository {
    /// 创建新的ShortfallRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 覆盖式写入一条 ACTIVE 缺口 (事务内)
    ///
    /// 先删除同 (job_id, item_id) 的既有 ACTIVE 行再插入,
    /// 保证"每次重评估取代上一次"的语义
    pub fn supersede_active_tx(conn: &Connection, shortfall: &Shortfall) -> RepositoryResult<()> {
        conn.execute(
            "DELETE FROM shortfall WHERE job_id = ? AND item_id = ? AND status = 'ACTIVE'",
            params![&shortfall.job_id, &shortfall.item_id],
        )?;

        conn.execute(
            r#"INSERT INTO shortfall (
                shortfall_id, job_id, item_id, missing_qty, status, evaluated_at
            ) VALUES (?, ?, ?, ?, ?, ?)"#,
            params![
                &shortfall.shortfall_id,
                &shortfall.job_id,
                &shortfall.item_id,
                &shortfall.missing_qty,
                shortfall.status.to_db_str(),
                &shortfall.evaluated_at.format(DATETIME_FMT).to_string(),
            ],
        )?;

        Ok(())
    }

    /// 清除作业全部 ACTIVE 缺口 (事务内, 重评估开始时调用)
    ///
    /// # 返回
    /// - Ok(rows): 被删除的行数
    pub fn clear_active_for_job_tx(conn: &Connection, job_id: &str) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "DELETE FROM shortfall WHERE job_id = ? AND status = 'ACTIVE'",
            params![job_id],
        )?;
        Ok(rows)
    }

    /// 将作业全部 ACTIVE 缺口置为 RESOLVED (事务内, 审批成功时调用)
    ///
    /// # 返回
    /// - Ok(rows): 被消解的行数
    pub fn resolve_active_for_job_tx(conn: &Connection, job_id: &str) -> RepositoryResult<usize> {
        let now = chrono::Utc::now().naive_utc().format(DATETIME_FMT).to_string();
        let rows = conn.execute(
            "UPDATE shortfall SET status = 'RESOLVED', evaluated_at = ? WHERE job_id = ? AND status = 'ACTIVE'",
            params![now, job_id],
        )?;
        Ok(rows)
    }

    /// 查询作业当前 ACTIVE 缺口, 按item_id升序
    pub fn find_active_by_job(&self, job_id: &str) -> RepositoryResult<Vec<Shortfall>> {
        let conn = self.get_conn()?;
        Self::find_active_by_job_tx(&conn, job_id)
    }

    /// 查询作业当前 ACTIVE 缺口 (事务内)
    pub fn find_active_by_job_tx(conn: &Connection, job_id: &str) -> RepositoryResult<Vec<Shortfall>> {
        let mut stmt = conn.prepare(
            r#"SELECT shortfall_id, job_id, item_id, missing_qty, status, evaluated_at
               FROM shortfall
               WHERE job_id = ? AND status = 'ACTIVE'
               ORDER BY item_id ASC"#,
        )?;

        let shortfalls = stmt
            .query_map(params![job_id], Self::map_row)?
            .collect::<Result<Vec<Shortfall>, _>>()?;

        Ok(shortfalls)
    }

    /// 映射数据库行到Shortfall对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Shortfall> {
        let status_str: String = row.get(4)?;
        let status = ShortfallStatus::from_db_str(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("无效的缺口状态: {}", status_str).into(),
            )
        })?;

        Ok(Shortfall {
            shortfall_id: row.get(0)?,
            job_id: row.get(1)?,
            item_id: row.get(2)?,
            missing_qty: row.get(3)?,
            status,
            evaluated_at: NaiveDateTime::parse_from_str(&row.get::<_, String>(5)?, DATETIME_FMT)
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
