// ==========================================
// 作业分配与履约引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 统一建表入口，库内测试与上层服务共用同一份 schema
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化核心表结构（幂等）
///
/// 表清单：
/// - job: 作业主表，状态机载体（UNRESERVED/RESERVED/COMPLETED/VOIDED）
/// - bom_line: 作业物料清单行，(job_id, item_id) 唯一
/// - shortfall: 缺口记录，每 (job_id, item_id) 至多一条 ACTIVE
/// - inventory_item: 库存品项（外部协作方边界，本库持有在手量）
/// - job_event: 作业事件，只追加
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS job (
            job_id      TEXT PRIMARY KEY,
            tenant_id   TEXT NOT NULL,
            job_name    TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'UNRESERVED',
            notes       TEXT,
            created_by  TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS bom_line (
            line_id     TEXT PRIMARY KEY,
            job_id      TEXT NOT NULL REFERENCES job(job_id),
            item_id     TEXT NOT NULL,
            planned_qty INTEGER NOT NULL CHECK (planned_qty > 0),
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            UNIQUE(job_id, item_id)
        );

        CREATE TABLE IF NOT EXISTS shortfall (
            shortfall_id TEXT PRIMARY KEY,
            job_id       TEXT NOT NULL REFERENCES job(job_id),
            item_id      TEXT NOT NULL,
            missing_qty  INTEGER NOT NULL CHECK (missing_qty >= 0),
            status       TEXT NOT NULL DEFAULT 'ACTIVE',
            evaluated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_shortfall_job ON shortfall(job_id, status);

        CREATE TABLE IF NOT EXISTS inventory_item (
            item_id     TEXT PRIMARY KEY,
            tenant_id   TEXT NOT NULL,
            item_name   TEXT NOT NULL,
            on_hand_qty INTEGER NOT NULL DEFAULT 0 CHECK (on_hand_qty >= 0),
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS job_event (
            event_id     TEXT PRIMARY KEY,
            job_id       TEXT NOT NULL,
            event_name   TEXT NOT NULL,
            actor        TEXT NOT NULL,
            payload_json TEXT,
            created_at   TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_job_event_job ON job_event(job_id, created_at);
        "#,
    )?;
    Ok(())
}
