// ==========================================
// 校园课表调度系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为, 避免部分模块外键开启/部分不开启
// - 统一 busy_timeout, 减少并发写入时的偶发 busy 错误
// - 建库入口集中于 initialize_schema, 避免多套建表脚本漂移
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout (毫秒)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 说明: 版本号用于提示/告警 (不做自动迁移), 避免静默在旧库上运行导致隐性错误
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 建库 DDL (幂等, 全部 IF NOT EXISTS)
const SCHEMA_SQL: &str = r#"
-- 版本标记
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- 配置作用域
CREATE TABLE IF NOT EXISTS config_scope (
    scope_id TEXT PRIMARY KEY,
    scope_type TEXT NOT NULL,
    scope_key TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(scope_type, scope_key)
);

INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
VALUES ('global', 'GLOBAL', 'global');

-- 配置键值
CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

-- 作息结构: 工作日集合 (CSV, 如 MONDAY,TUESDAY,...)
CREATE TABLE IF NOT EXISTS school_structure (
    school_id TEXT PRIMARY KEY,
    working_days TEXT NOT NULL
);

-- 作息结构: 有序节次 (含课间)
CREATE TABLE IF NOT EXISTS time_slot (
    school_id TEXT NOT NULL REFERENCES school_structure(school_id) ON DELETE CASCADE,
    period INTEGER NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    is_break INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (school_id, period)
);

-- 基础课表: 每 (班级, 星期, 节次) 至多一条
CREATE TABLE IF NOT EXISTS base_entry (
    id TEXT PRIMARY KEY,
    class_id TEXT NOT NULL,
    day TEXT NOT NULL,
    period INTEGER NOT NULL,
    teacher_id TEXT NOT NULL,
    subject_id TEXT NOT NULL,
    room TEXT,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    UNIQUE(class_id, day, period)
);

CREATE INDEX IF NOT EXISTS idx_base_entry_class ON base_entry(class_id);
CREATE INDEX IF NOT EXISTS idx_base_entry_teacher ON base_entry(teacher_id);

-- 周层编辑: (班级, 周一, 星期, 节次) 为主键, 免审批, 仅本周生效
CREATE TABLE IF NOT EXISTS weekly_edit (
    class_id TEXT NOT NULL,
    week_start TEXT NOT NULL,
    day TEXT NOT NULL,
    period INTEGER NOT NULL,
    teacher_id TEXT,
    subject_id TEXT,
    room TEXT,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    reason TEXT NOT NULL,
    PRIMARY KEY (class_id, week_start, day, period)
);

CREATE INDEX IF NOT EXISTS idx_weekly_edit_teacher ON weekly_edit(teacher_id, week_start);

-- 变更记录: 审批生命周期的唯一权威存储
-- 课位删除时级联清除 (失去课位关联的变更无意义)
CREATE TABLE IF NOT EXISTS change_record (
    id TEXT PRIMARY KEY,
    timetable_entry_id TEXT NOT NULL REFERENCES base_entry(id) ON DELETE CASCADE,
    change_type TEXT NOT NULL,
    change_date TEXT NOT NULL,
    original_teacher_id TEXT,
    new_teacher_id TEXT,
    original_room TEXT,
    new_room TEXT,
    new_start_time TEXT,
    new_end_time TEXT,
    reason TEXT NOT NULL,
    change_source TEXT NOT NULL,
    state TEXT NOT NULL DEFAULT 'PENDING',
    approved_by TEXT,
    approved_at TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_change_record_entry ON change_record(timetable_entry_id);
CREATE INDEX IF NOT EXISTS idx_change_record_date ON change_record(change_date);
CREATE INDEX IF NOT EXISTS idx_change_record_state ON change_record(state);

-- 考勤记录: 外部考勤系统落库, 本系统只读
CREATE TABLE IF NOT EXISTS attendance_record (
    teacher_id TEXT NOT NULL,
    date TEXT NOT NULL,
    status TEXT NOT NULL,
    leave_start_date TEXT,
    leave_end_date TEXT,
    PRIMARY KEY (teacher_id, date)
);

CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance_record(date);

-- 代课确认: 外部代课协调系统落库, 按 (课位, 日期) 精确匹配
CREATE TABLE IF NOT EXISTS substitution_confirmation (
    timetable_entry_id TEXT NOT NULL REFERENCES base_entry(id) ON DELETE CASCADE,
    substitute_teacher_id TEXT NOT NULL,
    date TEXT NOT NULL,
    status TEXT NOT NULL,
    PRIMARY KEY (timetable_entry_id, date)
);

-- 操作日志
CREATE TABLE IF NOT EXISTS action_log (
    action_id TEXT PRIMARY KEY,
    class_id TEXT,
    action_type TEXT NOT NULL,
    action_ts TEXT NOT NULL,
    actor TEXT NOT NULL,
    payload_json TEXT,
    date_range_start TEXT,
    date_range_end TEXT,
    detail TEXT
);

CREATE INDEX IF NOT EXISTS idx_action_log_class ON action_log(class_id);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明:
/// - foreign_keys 需要每个连接单独开启
/// - busy_timeout 需要每个连接单独配置
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

/// 初始化数据库 schema (幂等)
///
/// 新库执行全量建表; 已有库上重复执行无副作用
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version (若表不存在则返回 None)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get(0)
        })?;
    Ok(v)
}
