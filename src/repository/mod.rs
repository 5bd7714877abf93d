// ==========================================
// 作业分配与履约引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑, 只做数据映射
// 约定: 每个仓储持有 Arc<Mutex<Connection>>; 需要跨仓储原子性的
//       操作由引擎层持有连接锁并使用 *_tx 关联函数在同一事务内执行
// ==========================================

pub mod error;
pub mod inventory_repo;
pub mod job_event_repo;
pub mod job_repo;
pub mod shortfall_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use inventory_repo::InventoryItemRepository;
pub use job_event_repo::JobEventRepository;
pub use job_repo::{BomLineRepository, JobRepository};
pub use shortfall_repo::ShortfallRepository;
