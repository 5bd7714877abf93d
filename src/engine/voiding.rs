// ==========================================
// 作业分配与履约引擎 - 作废处理器
// ==========================================
// 职责: 不消耗任何库存地释放预占
// 账目中立: 状态改为 VOIDED 后作业自然退出可承诺量聚合,
//           全程不触碰任何品项的在手量
// ==========================================

use crate::domain::types::JobStatus;
use crate::engine::{EngineError, EngineResult};
use crate::repository::error::RepositoryError;
use crate::repository::job_repo::JobRepository;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// 作废结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoidOutcome {
    pub status: JobStatus, // 恒为 VOIDED
    pub idempotent: bool,  // 是否为重复作废的安全空操作
}

// ==========================================
// VoidProcessor - 作废处理器
// ==========================================
pub struct VoidProcessor {
    conn: Arc<Mutex<Connection>>,
}

impl VoidProcessor {
    /// 创建新的VoidProcessor实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 作废作业
    ///
    /// # 幂等性
    /// - 已 VOIDED: 安全空操作
    /// - 状态 ∉ {RESERVED, VOIDED}: 硬状态错误
    ///   (从未审批的作业不允许直接作废, 见设计文档)
    pub fn void(&self, job_id: &str) -> EngineResult<VoidOutcome> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| EngineError::Lock(e.to_string()))?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let outcome = Self::void_tx(&tx, job_id)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        if outcome.idempotent {
            debug!(job_id, "重复作废, 安全空操作");
        } else {
            info!(job_id, "作业作废, 预占已释放");
        }

        Ok(outcome)
    }

    /// 事务内作废处理
    fn void_tx(conn: &Connection, job_id: &str) -> EngineResult<VoidOutcome> {
        let job = JobRepository::find_by_id_tx(conn, job_id)?
            .ok_or_else(|| EngineError::JobNotFound(job_id.to_string()))?;

        match job.status {
            JobStatus::Reserved => {}
            // 幂等重作废
            JobStatus::Voided => {
                return Ok(VoidOutcome {
                    status: JobStatus::Voided,
                    idempotent: true,
                })
            }
            status => {
                return Err(EngineError::InvalidStateTransition {
                    from: status.to_string(),
                    to: JobStatus::Voided.to_string(),
                })
            }
        }

        JobRepository::update_status_tx(conn, job_id, JobStatus::Voided)?;

        Ok(VoidOutcome {
            status: JobStatus::Voided,
            idempotent: false,
        })
    }
}
