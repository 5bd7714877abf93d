// ==========================================
// 作业分配与履约引擎 - 品项排他锁注册表
// ==========================================
// 职责: 为审批评估提供进程内的每品项排他锁
// 红线: 多品项必须按品项ID排序后依次加锁 (规范锁序),
//       防止两个品项集重叠的作业互相死锁
// ==========================================

use crate::engine::{EngineError, EngineResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ItemLockRegistry - 品项锁注册表
// ==========================================

/// 品项锁注册表
///
/// 每个品项对应一把互斥锁, 按需创建, 永不回收
/// (品项数量有限, 泄漏可忽略; 回收需要引用计数, 不值得)
#[derive(Default)]
pub struct ItemLockRegistry {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ItemLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取得一组品项的锁句柄, 已按品项ID升序去重
    ///
    /// 调用方随后按序逐把加锁; 句柄顺序即加锁顺序
    pub fn handles(&self, item_ids: &[String]) -> EngineResult<ItemLockSet> {
        let mut ids: Vec<&String> = item_ids.iter().collect();
        ids.sort();
        ids.dedup();

        let mut registry = self
            .locks
            .lock()
            .map_err(|e| EngineError::Lock(e.to_string()))?;

        let handles = ids
            .into_iter()
            .map(|id| {
                registry
                    .entry(id.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(())))
                    .clone()
            })
            .collect();

        Ok(ItemLockSet { handles })
    }
}

// ==========================================
// ItemLockSet - 已排序的锁句柄集
// ==========================================

/// 一次审批涉及的全部品项锁句柄 (规范序)
pub struct ItemLockSet {
    handles: Vec<Arc<Mutex<()>>>,
}

impl ItemLockSet {
    /// 按规范序依次加锁, 返回守卫集
    ///
    /// 守卫集存活期间, 其他审批对任一重叠品项的加锁都会阻塞
    pub fn lock(&self) -> EngineResult<Vec<MutexGuard<'_, ()>>> {
        self.handles
            .iter()
            .map(|m| m.lock().map_err(|e| EngineError::Lock(e.to_string())))
            .collect()
    }
}
