// ==========================================
// 作业分配与履约引擎 - 完成处理器
// ==========================================
// 职责: 将预占转换为真实消耗, 允许计划量与实耗量存在差异 (variance)
// 完整性红线: 实耗清单必须与 BOM 品项集一一对应 (双射),
//             缺行或多行都硬失败, 不产生任何变更
// ==========================================

use crate::domain::types::JobStatus;
use crate::engine::{EngineError, EngineResult};
use crate::repository::error::RepositoryError;
use crate::repository::inventory_repo::InventoryItemRepository;
use crate::repository::job_repo::{BomLineRepository, JobRepository};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

// ==========================================
// 完成请求/结果结构
// ==========================================

/// 单品项实耗行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActualLine {
    pub item_id: String, // 品项ID
    pub qty_used: i64,   // 实耗量 (>= 0, 可为零, 可超计划)
}

/// 单品项消耗明细 (含差异量, 仅用于报表, 不阻断完成)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumedLine {
    pub item_id: String,  // 品项ID
    pub planned_qty: i64, // 计划需求量
    pub qty_used: i64,    // 实耗量
    pub variance: i64,    // 差异 = qty_used − planned_qty
}

/// 完成结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub status: JobStatus,          // 恒为 COMPLETED
    pub idempotent: bool,           // 是否为重复完成的安全空操作
    pub consumed: Vec<ConsumedLine>, // 消耗明细 (幂等空操作时为空)
}

// ==========================================
// CompletionProcessor - 完成处理器
// ==========================================
pub struct CompletionProcessor {
    conn: Arc<Mutex<Connection>>,
}

impl CompletionProcessor {
    /// 创建新的CompletionProcessor实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 完成作业: 按实耗原子扣减在手量并转入 COMPLETED
    ///
    /// COMPLETED 本身即释放预占: 作业不再计入可承诺量聚合
    ///
    /// # 幂等性
    /// - 已 COMPLETED: 安全空操作, 不重复扣减
    /// - 状态 ∉ {RESERVED, COMPLETED}: 硬状态错误
    pub fn complete(&self, job_id: &str, actuals: &[ActualLine]) -> EngineResult<CompletionOutcome> {
        // 输入校验: 实耗量非负, 品项不重复
        let mut seen = HashSet::new();
        for actual in actuals {
            if actual.qty_used < 0 {
                return Err(EngineError::InvalidInput(format!(
                    "实耗量不能为负: item_id={}, qty_used={}",
                    actual.item_id, actual.qty_used
                )));
            }
            if !seen.insert(actual.item_id.as_str()) {
                return Err(EngineError::InvalidInput(format!(
                    "实耗清单品项重复: item_id={}",
                    actual.item_id
                )));
            }
        }

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| EngineError::Lock(e.to_string()))?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let outcome = Self::consume_tx(&tx, job_id, actuals)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        if outcome.idempotent {
            debug!(job_id, "重复完成, 安全空操作");
        } else {
            info!(job_id, lines = outcome.consumed.len(), "作业完成, 实耗已扣减");
        }

        Ok(outcome)
    }

    /// 事务内消耗处理
    fn consume_tx(
        conn: &Connection,
        job_id: &str,
        actuals: &[ActualLine],
    ) -> EngineResult<CompletionOutcome> {
        let job = JobRepository::find_by_id_tx(conn, job_id)?
            .ok_or_else(|| EngineError::JobNotFound(job_id.to_string()))?;

        match job.status {
            JobStatus::Reserved => {}
            // 幂等重完成: 不重复消耗
            JobStatus::Completed => {
                return Ok(CompletionOutcome {
                    status: JobStatus::Completed,
                    idempotent: true,
                    consumed: Vec::new(),
                })
            }
            status => {
                return Err(EngineError::InvalidStateTransition {
                    from: status.to_string(),
                    to: JobStatus::Completed.to_string(),
                })
            }
        }

        let lines = BomLineRepository::find_by_job_tx(conn, job_id)?;

        // 双射校验: actuals 品项集必须与 BOM 品项集完全一致
        let bom_items: HashSet<&str> = lines.iter().map(|l| l.item_id.as_str()).collect();
        let actual_items: HashSet<&str> = actuals.iter().map(|a| a.item_id.as_str()).collect();

        let mut missing: Vec<String> = bom_items
            .difference(&actual_items)
            .map(|s| s.to_string())
            .collect();
        let mut extraneous: Vec<String> = actual_items
            .difference(&bom_items)
            .map(|s| s.to_string())
            .collect();

        if !missing.is_empty() || !extraneous.is_empty() {
            missing.sort();
            extraneous.sort();
            return Err(EngineError::IncompleteActuals { missing, extraneous });
        }

        let qty_used_by_item: HashMap<&str, i64> = actuals
            .iter()
            .map(|a| (a.item_id.as_str(), a.qty_used))
            .collect();

        // 按实耗逐项条件递减; 任一品项在手量不足则整体回滚
        let mut consumed = Vec::with_capacity(lines.len());
        for line in &lines {
            let qty_used = qty_used_by_item[line.item_id.as_str()];

            if qty_used > 0 {
                match InventoryItemRepository::decrement_on_hand_tx(conn, &line.item_id, qty_used) {
                    Ok(()) => {}
                    Err(RepositoryError::ConditionalUpdateFailed { .. }) => {
                        let on_hand =
                            InventoryItemRepository::read_on_hand_tx(conn, &line.item_id)?;
                        return Err(EngineError::InsufficientOnHand {
                            item_id: line.item_id.clone(),
                            on_hand,
                            qty_used,
                        });
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            consumed.push(ConsumedLine {
                item_id: line.item_id.clone(),
                planned_qty: line.planned_qty,
                qty_used,
                variance: qty_used - line.planned_qty,
            });
        }

        JobRepository::update_status_tx(conn, job_id, JobStatus::Completed)?;

        Ok(CompletionOutcome {
            status: JobStatus::Completed,
            idempotent: false,
            consumed,
        })
    }
}
