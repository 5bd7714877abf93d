// ==========================================
// 作业分配与履约引擎 - 审批校验器
// ==========================================
// 并发红线: 本引擎是全系统唯一的真实资源竞争点。
// 两个并发审批竞争同一品项时, 必须由品项锁串行化,
// 保证最后一个可用单位至多被一方赢得 (I1)。
// 算法: 品项锁(规范序) + 单事务内重读作业/BOM/在手量/占用聚合
// ==========================================

use crate::domain::shortfall::Shortfall;
use crate::domain::types::JobStatus;
use crate::engine::availability::AvailabilityCalculator;
use crate::engine::item_locks::ItemLockRegistry;
use crate::engine::{EngineError, EngineResult};
use crate::repository::error::RepositoryError;
use crate::repository::job_repo::{BomLineRepository, JobRepository};
use crate::repository::shortfall_repo::ShortfallRepository;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// 阻断原因: 调用方基于过期快照认为可满足, 审批时已被并发变化推翻
pub const REASON_INVENTORY_CHANGED: &str = "inventory_changed";

/// 阻断原因: 作业没有任何 BOM 行, 不可审批
pub const REASON_EMPTY_BOM: &str = "empty_bom";

// ==========================================
// 审批结果结构
// ==========================================

/// 单品项缺口明细
///
/// 阻断返回时携带, 调用方无需再查询即可决定调整/等待/升级
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortfallDetail {
    pub item_id: String,   // 品项ID
    pub planned_qty: i64,  // 计划需求量
    pub available: i64,    // 评估时可承诺量 (可为负)
    pub missing_qty: i64,  // 缺口量 = planned − max(available, 0)
}

/// 审批结果
///
/// 阻断不是错误: blocked=true 属于正常业务结果, 调用方必须分支处理
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub status: JobStatus,               // 评估后的作业状态
    pub blocked: bool,                   // 是否被可用量阻断
    pub reason: Option<String>,          // 阻断原因 (inventory_changed / empty_bom)
    pub idempotent: bool,                // 是否为重复审批的安全空操作
    pub shortfalls: Vec<ShortfallDetail>, // 缺口明细 (阻断时非空)
}

impl ApprovalOutcome {
    fn reserved(idempotent: bool) -> Self {
        Self {
            status: JobStatus::Reserved,
            blocked: false,
            reason: None,
            idempotent,
            shortfalls: Vec::new(),
        }
    }

    fn blocked(reason: Option<String>, shortfalls: Vec<ShortfallDetail>) -> Self {
        Self {
            status: JobStatus::Unreserved,
            blocked: true,
            reason,
            idempotent: false,
            shortfalls,
        }
    }
}

// ==========================================
// ApprovalValidator - 审批校验器
// ==========================================
pub struct ApprovalValidator {
    conn: Arc<Mutex<Connection>>,
    item_locks: Arc<ItemLockRegistry>,
}

impl ApprovalValidator {
    /// 创建新的ApprovalValidator实例
    pub fn new(conn: Arc<Mutex<Connection>>, item_locks: Arc<ItemLockRegistry>) -> Self {
        Self { conn, item_locks }
    }

    /// 审批作业: 原子地重验可行性并转入 RESERVED, 或阻断并记录缺口
    ///
    /// # 参数
    /// - `was_fulfillable_hint`: 调用方的过期可行性判断, 只影响阻断
    ///   时的诊断 reason, 不影响正确性 (服务端总是在锁内重验)
    ///
    /// # 幂等性
    /// - 已 RESERVED: 安全空操作, blocked=false
    /// - COMPLETED/VOIDED: 硬状态错误 (非幂等场景)
    pub fn approve(&self, job_id: &str, was_fulfillable_hint: bool) -> EngineResult<ApprovalOutcome> {
        // 预读 BOM 行确定锁集; 行集在 UNRESERVED 态仍可能被并发编辑,
        // 事务内会重读, 品项锁只需覆盖"审批对审批"的竞争
        let prelock_items: Vec<String> = {
            let conn = self
                .conn
                .lock()
                .map_err(|e| EngineError::Lock(e.to_string()))?;
            BomLineRepository::find_by_job_tx(&conn, job_id)?
                .into_iter()
                .map(|l| l.item_id)
                .collect()
        };

        // 规范序加锁 (按品项ID排序, 防死锁)
        let lock_set = self.item_locks.handles(&prelock_items)?;
        let _guards = lock_set.lock()?;

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| EngineError::Lock(e.to_string()))?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let outcome = Self::evaluate_tx(&tx, job_id, was_fulfillable_hint)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        match (outcome.blocked, outcome.idempotent) {
            (false, false) => info!(job_id, "审批通过, 作业进入 RESERVED"),
            (false, true) => debug!(job_id, "重复审批, 安全空操作"),
            (true, _) => info!(
                job_id,
                reason = outcome.reason.as_deref().unwrap_or("insufficient"),
                shortfall_items = outcome.shortfalls.len(),
                "审批被阻断"
            ),
        }

        Ok(outcome)
    }

    /// 锁内评估 (事务内)
    fn evaluate_tx(
        conn: &Connection,
        job_id: &str,
        was_fulfillable_hint: bool,
    ) -> EngineResult<ApprovalOutcome> {
        let job = JobRepository::find_by_id_tx(conn, job_id)?
            .ok_or_else(|| EngineError::JobNotFound(job_id.to_string()))?;

        match job.status {
            JobStatus::Unreserved => {}
            // 幂等重审批: 不改任何预占账目
            JobStatus::Reserved => return Ok(ApprovalOutcome::reserved(true)),
            status => {
                return Err(EngineError::InvalidStateTransition {
                    from: status.to_string(),
                    to: JobStatus::Reserved.to_string(),
                })
            }
        }

        let lines = BomLineRepository::find_by_job_tx(conn, job_id)?;

        // 零行作业不可审批: 视为阻断, 不写缺口行
        if lines.is_empty() {
            ShortfallRepository::clear_active_for_job_tx(conn, job_id)?;
            return Ok(ApprovalOutcome::blocked(
                Some(REASON_EMPTY_BOM.to_string()),
                Vec::new(),
            ));
        }

        // 逐行核算可承诺量
        let mut shortfalls = Vec::new();
        for line in &lines {
            let available =
                AvailabilityCalculator::available_tx(conn, &line.item_id, Some(job_id))?;
            if available < line.planned_qty {
                shortfalls.push(ShortfallDetail {
                    item_id: line.item_id.clone(),
                    planned_qty: line.planned_qty,
                    available,
                    missing_qty: line.planned_qty - available.max(0),
                });
            }
        }

        if shortfalls.is_empty() {
            // 全部覆盖: 转入 RESERVED, 消解历史缺口
            JobRepository::update_status_tx(conn, job_id, JobStatus::Reserved)?;
            ShortfallRepository::resolve_active_for_job_tx(conn, job_id)?;
            return Ok(ApprovalOutcome::reserved(false));
        }

        // 欠覆盖: 覆盖式重写 ACTIVE 缺口, 作业保持 UNRESERVED
        ShortfallRepository::clear_active_for_job_tx(conn, job_id)?;
        for detail in &shortfalls {
            ShortfallRepository::supersede_active_tx(
                conn,
                &Shortfall::active(job_id, &detail.item_id, detail.missing_qty),
            )?;
        }

        // 调用方此前认为可满足 → 说明快照之后发生了并发变化
        let reason = was_fulfillable_hint.then(|| REASON_INVENTORY_CHANGED.to_string());
        Ok(ApprovalOutcome::blocked(reason, shortfalls))
    }
}
