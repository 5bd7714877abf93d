// ==========================================
// 作业分配与履约引擎 - BOM行编辑器
// ==========================================
// 职责: UNRESERVED 态下维护作业物料清单
// 编辑窗口红线: 状态复核与行写入在同一事务内完成,
//              并发审批提交后到达的编辑一律拒绝
// ==========================================

use crate::domain::job::BomLine;
use crate::domain::types::JobStatus;
use crate::engine::{EngineError, EngineResult};
use crate::repository::error::RepositoryError;
use crate::repository::inventory_repo::InventoryItemRepository;
use crate::repository::job_repo::{BomLineRepository, JobRepository};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::debug;

// ==========================================
// BomLineEditor - BOM行编辑器
// ==========================================
pub struct BomLineEditor {
    conn: Arc<Mutex<Connection>>,
}

impl BomLineEditor {
    /// 创建新的BomLineEditor实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 插入或更新 BOM 行
    ///
    /// 仅 UNRESERVED 态允许; 计划量必须为正整数;
    /// 作业与品项必须同租户
    ///
    /// # 返回
    /// - Ok(BomLine): 存储后的行 (覆盖更新时保留原 line_id)
    pub fn upsert(&self, job_id: &str, item_id: &str, planned_qty: i64) -> EngineResult<BomLine> {
        if planned_qty <= 0 {
            return Err(EngineError::InvalidInput(format!(
                "计划量必须为正整数: planned_qty={}",
                planned_qty
            )));
        }

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| EngineError::Lock(e.to_string()))?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let line = Self::upsert_tx(&tx, job_id, item_id, planned_qty)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        debug!(job_id, item_id, planned_qty, "BOM行已写入");
        Ok(line)
    }

    /// 事务内编辑处理
    ///
    /// 状态在此处复核, 入口处的任何快照都不可信
    fn upsert_tx(
        conn: &Connection,
        job_id: &str,
        item_id: &str,
        planned_qty: i64,
    ) -> EngineResult<BomLine> {
        let job = JobRepository::find_by_id_tx(conn, job_id)?
            .ok_or_else(|| EngineError::JobNotFound(job_id.to_string()))?;

        if job.status != JobStatus::Unreserved {
            return Err(EngineError::BomFrozen {
                status: job.status.to_string(),
            });
        }

        // 品项引用与租户作用域校验
        let item = InventoryItemRepository::find_by_id_tx(conn, item_id)?
            .filter(|item| item.tenant_id == job.tenant_id)
            .ok_or_else(|| EngineError::ItemNotFound(item_id.to_string()))?;

        let line = BomLine::new(job_id, &item.item_id, planned_qty);
        BomLineRepository::upsert_tx(conn, &line)?;

        // 覆盖更新时保留原 line_id, 以存储行为准
        BomLineRepository::find_by_job_and_item_tx(conn, job_id, &item.item_id)?.ok_or_else(
            || {
                EngineError::Repository(RepositoryError::DatabaseQueryError(
                    "BOM行写入后读取失败".to_string(),
                ))
            },
        )
    }
}
