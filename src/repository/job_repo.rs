// ==========================================
// 作业分配与履约引擎 - 作业/BOM行数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约定: 引擎层事务内操作使用 *_tx 关联函数 (传入事务内连接)
// ==========================================

use crate::domain::job::{BomLine, Job};
use crate::domain::types::JobStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// JobRepository - 作业仓储
// ==========================================
pub struct JobRepository {
    conn: Arc<Mutex<Connection>>,
}

impl JobRepository {
    /// 创建新的JobRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建作业
    ///
    /// # 返回
    /// - `Ok(job_id)`: 成功, 返回job_id
    pub fn create(&self, job: &Job) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO job (
                job_id, tenant_id, job_name, status, notes,
                created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &job.job_id,
                &job.tenant_id,
                &job.job_name,
                job.status.to_db_str(),
                &job.notes,
                &job.created_by,
                &job.created_at.format(DATETIME_FMT).to_string(),
                &job.updated_at.format(DATETIME_FMT).to_string(),
            ],
        )?;

        Ok(job.job_id.clone())
    }

    /// 按job_id查询作业
    pub fn find_by_id(&self, job_id: &str) -> RepositoryResult<Option<Job>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, job_id)
    }

    /// 按job_id查询作业 (事务内)
    pub fn find_by_id_tx(conn: &Connection, job_id: &str) -> RepositoryResult<Option<Job>> {
        match conn.query_row(
            r#"SELECT job_id, tenant_id, job_name, status, notes,
                      created_by, created_at, updated_at
               FROM job
               WHERE job_id = ?"#,
            params![job_id],
            Self::map_row,
        ) {
            Ok(job) => Ok(Some(job)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询租户下所有作业, 按created_at降序
    pub fn list_by_tenant(&self, tenant_id: &str) -> RepositoryResult<Vec<Job>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT job_id, tenant_id, job_name, status, notes,
                      created_by, created_at, updated_at
               FROM job
               WHERE tenant_id = ?
               ORDER BY created_at DESC"#,
        )?;

        let jobs = stmt
            .query_map(params![tenant_id], Self::map_row)?
            .collect::<Result<Vec<Job>, _>>()?;

        Ok(jobs)
    }

    /// 更新作业状态 (事务内)
    ///
    /// 仅做数据写入, 状态机合法性由引擎层负责
    pub fn update_status_tx(
        conn: &Connection,
        job_id: &str,
        status: JobStatus,
    ) -> RepositoryResult<()> {
        let now = chrono::Utc::now().naive_utc().format(DATETIME_FMT).to_string();
        let rows = conn.execute(
            "UPDATE job SET status = ?, updated_at = ? WHERE job_id = ?",
            params![status.to_db_str(), now, job_id],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Job".to_string(),
                id: job_id.to_string(),
            });
        }
        Ok(())
    }

    /// 映射数据库行到Job对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let status_str: String = row.get(3)?;
        let status = JobStatus::from_db_str(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("无效的作业状态: {}", status_str).into(),
            )
        })?;

        Ok(Job {
            job_id: row.get(0)?,
            tenant_id: row.get(1)?,
            job_name: row.get(2)?,
            status,
            notes: row.get(4)?,
            created_by: row.get(5)?,
            created_at: parse_datetime(row, 6)?,
            updated_at: parse_datetime(row, 7)?,
        })
    }
}

// ==========================================
// BomLineRepository - 物料清单行仓储
// ==========================================
pub struct BomLineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BomLineRepository {
    /// 创建新的BomLineRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入或更新 BOM 行
    ///
    /// (job_id, item_id) 唯一; 已存在时覆盖 planned_qty
    pub fn upsert(&self, line: &BomLine) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        Self::upsert_tx(&conn, line)
    }

    /// 插入或更新 BOM 行 (事务内)
    pub fn upsert_tx(conn: &Connection, line: &BomLine) -> RepositoryResult<String> {
        conn.execute(
            r#"INSERT INTO bom_line (
                line_id, job_id, item_id, planned_qty, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_id, item_id) DO UPDATE SET
                planned_qty = excluded.planned_qty,
                updated_at = excluded.updated_at"#,
            params![
                &line.line_id,
                &line.job_id,
                &line.item_id,
                &line.planned_qty,
                &line.created_at.format(DATETIME_FMT).to_string(),
                &line.updated_at.format(DATETIME_FMT).to_string(),
            ],
        )?;

        Ok(line.line_id.clone())
    }

    /// 按 (job_id, item_id) 查询 BOM 行
    pub fn find_by_job_and_item(
        &self,
        job_id: &str,
        item_id: &str,
    ) -> RepositoryResult<Option<BomLine>> {
        let conn = self.get_conn()?;
        Self::find_by_job_and_item_tx(&conn, job_id, item_id)
    }

    /// 按 (job_id, item_id) 查询 BOM 行 (事务内)
    pub fn find_by_job_and_item_tx(
        conn: &Connection,
        job_id: &str,
        item_id: &str,
    ) -> RepositoryResult<Option<BomLine>> {
        match conn.query_row(
            r#"SELECT line_id, job_id, item_id, planned_qty, created_at, updated_at
               FROM bom_line
               WHERE job_id = ? AND item_id = ?"#,
            params![job_id, item_id],
            Self::map_row,
        ) {
            Ok(line) => Ok(Some(line)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询作业的所有 BOM 行, 按item_id升序 (规范锁序一致)
    pub fn find_by_job(&self, job_id: &str) -> RepositoryResult<Vec<BomLine>> {
        let conn = self.get_conn()?;
        Self::find_by_job_tx(&conn, job_id)
    }

    /// 查询作业的所有 BOM 行 (事务内)
    pub fn find_by_job_tx(conn: &Connection, job_id: &str) -> RepositoryResult<Vec<BomLine>> {
        let mut stmt = conn.prepare(
            r#"SELECT line_id, job_id, item_id, planned_qty, created_at, updated_at
               FROM bom_line
               WHERE job_id = ?
               ORDER BY item_id ASC"#,
        )?;

        let lines = stmt
            .query_map(params![job_id], Self::map_row)?
            .collect::<Result<Vec<BomLine>, _>>()?;

        Ok(lines)
    }

    /// 汇总某品项被"其他"RESERVED作业占用的计划量 (事务内)
    ///
    /// 预占账目为派生口径: 对所有当前 RESERVED 作业的 BOM 行求和,
    /// 排除指定作业自身
    pub fn sum_reserved_excluding_tx(
        conn: &Connection,
        item_id: &str,
        excluding_job_id: &str,
    ) -> RepositoryResult<i64> {
        let sum: i64 = conn.query_row(
            r#"SELECT COALESCE(SUM(b.planned_qty), 0)
               FROM bom_line b
               JOIN job j ON j.job_id = b.job_id
               WHERE b.item_id = ?
                 AND j.status = 'RESERVED'
                 AND j.job_id <> ?"#,
            params![item_id, excluding_job_id],
            |row| row.get(0),
        )?;
        Ok(sum)
    }

    /// 映射数据库行到BomLine对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<BomLine> {
        Ok(BomLine {
            line_id: row.get(0)?,
            job_id: row.get(1)?,
            item_id: row.get(2)?,
            planned_qty: row.get(3)?,
            created_at: parse_datetime(row, 4)?,
            updated_at: parse_datetime(row, 5)?,
        })
    }
}

/// 解析文本时间戳列
fn parse_datetime(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&row.get::<_, String>(idx)?, DATETIME_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
