// ==========================================
// 作业分配与履约引擎 - 库存品项领域模型
// ==========================================
// InventoryItem: 库存协作方边界实体
// 在手量红线: on_hand_qty >= 0; RESERVED 只做逻辑扣减, 不动在手量;
// 只有 complete 按实耗真正递减
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub item_id: String,           // 品项ID
    pub tenant_id: String,         // 租户ID
    pub item_name: String,         // 品项名称
    pub on_hand_qty: i64,          // 在手量 (>= 0)
    pub updated_at: NaiveDateTime, // 更新时间
}
