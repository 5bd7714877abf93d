// ==========================================
// 作业分配与履约引擎 - 库存品项数据仓储
// ==========================================
// 边界: 库存协作方 (readOnHand / decrementOnHand)
// 红线: on_hand_qty >= 0; 递减必须是条件更新, 不允许扣成负数
// ==========================================

use crate::domain::item::InventoryItem;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// InventoryItemRepository - 库存品项仓储
// ==========================================
pub struct InventoryItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InventoryItemRepository {
    /// 创建新的InventoryItemRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入或更新品项 (在手量直接覆盖, 用于初始化/盘点调整)
    pub fn upsert(&self, item: &InventoryItem) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO inventory_item (
                item_id, tenant_id, item_name, on_hand_qty, updated_at
            ) VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(item_id) DO UPDATE SET
                item_name = excluded.item_name,
                on_hand_qty = excluded.on_hand_qty,
                updated_at = excluded.updated_at"#,
            params![
                &item.item_id,
                &item.tenant_id,
                &item.item_name,
                &item.on_hand_qty,
                &item.updated_at.format(DATETIME_FMT).to_string(),
            ],
        )?;

        Ok(item.item_id.clone())
    }

    /// 按item_id查询品项
    pub fn find_by_id(&self, item_id: &str) -> RepositoryResult<Option<InventoryItem>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, item_id)
    }

    /// 按item_id查询品项 (事务内)
    pub fn find_by_id_tx(conn: &Connection, item_id: &str) -> RepositoryResult<Option<InventoryItem>> {
        match conn.query_row(
            r#"SELECT item_id, tenant_id, item_name, on_hand_qty, updated_at
               FROM inventory_item
               WHERE item_id = ?"#,
            params![item_id],
            Self::map_row,
        ) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 读取品项在手量 (事务内)
    pub fn read_on_hand_tx(conn: &Connection, item_id: &str) -> RepositoryResult<i64> {
        match conn.query_row(
            "SELECT on_hand_qty FROM inventory_item WHERE item_id = ?",
            params![item_id],
            |row| row.get(0),
        ) {
            Ok(qty) => Ok(qty),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(RepositoryError::NotFound {
                entity: "InventoryItem".to_string(),
                id: item_id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// 条件递减在手量 (事务内, 仅完成处理器调用)
    ///
    /// 仅当 on_hand_qty >= qty 时才更新; 未命中返回
    /// ConditionalUpdateFailed, 由调用方回滚整个事务
    pub fn decrement_on_hand_tx(
        conn: &Connection,
        item_id: &str,
        qty: i64,
    ) -> RepositoryResult<()> {
        let now = chrono::Utc::now().naive_utc().format(DATETIME_FMT).to_string();
        let rows = conn.execute(
            r#"UPDATE inventory_item
               SET on_hand_qty = on_hand_qty - ?1, updated_at = ?2
               WHERE item_id = ?3 AND on_hand_qty >= ?1"#,
            params![qty, now, item_id],
        )?;

        if rows == 0 {
            return Err(RepositoryError::ConditionalUpdateFailed {
                entity: "InventoryItem".to_string(),
                id: item_id.to_string(),
            });
        }
        Ok(())
    }

    /// 映射数据库行到InventoryItem对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<InventoryItem> {
        Ok(InventoryItem {
            item_id: row.get(0)?,
            tenant_id: row.get(1)?,
            item_name: row.get(2)?,
            on_hand_qty: row.get(3)?,
            updated_at: NaiveDateTime::parse_from_str(&row.get::<_, String>(4)?, DATETIME_FMT)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        4,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
        })
    }
}
