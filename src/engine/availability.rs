// ==========================================
// 作业分配与履约引擎 - 可承诺量计算器
// ==========================================
// 口径: available = on_hand − Σ(其他当前 RESERVED 作业的计划量)
// 选型: 派生口径 (审批时聚合), 不维护持久化预占计数器
//       —— 崩溃后无需重放即自愈, 代价是每次审批一条聚合查询
// ==========================================

use crate::engine::{EngineError, EngineResult};
use crate::repository::error::RepositoryError;
use crate::repository::inventory_repo::InventoryItemRepository;
use crate::repository::job_repo::BomLineRepository;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

// ==========================================
// AvailabilityCalculator - 可承诺量计算器
// ==========================================
pub struct AvailabilityCalculator {
    conn: Arc<Mutex<Connection>>,
}

impl AvailabilityCalculator {
    /// 创建新的AvailabilityCalculator实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 计算品项可承诺量 (事务内)
    ///
    /// # 参数
    /// - `excluding_job_id`: 评估中的作业自身, 其计划量不计入占用;
    ///   None 表示站在"新需求"视角, 扣除全部 RESERVED 占用
    pub fn available_tx(
        conn: &Connection,
        item_id: &str,
        excluding_job_id: Option<&str>,
    ) -> EngineResult<i64> {
        let on_hand = match InventoryItemRepository::read_on_hand_tx(conn, item_id) {
            Ok(qty) => qty,
            Err(RepositoryError::NotFound { .. }) => {
                return Err(EngineError::ItemNotFound(item_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let reserved = BomLineRepository::sum_reserved_excluding_tx(
            conn,
            item_id,
            excluding_job_id.unwrap_or(""),
        )?;

        Ok(on_hand - reserved)
    }

    /// 查询品项当前可承诺量快照 (读接口)
    ///
    /// 单连接互斥锁保证两条查询读到一致快照
    pub fn available(&self, item_id: &str) -> EngineResult<i64> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EngineError::Lock(e.to_string()))?;
        Self::available_tx(&conn, item_id, None)
    }
}
