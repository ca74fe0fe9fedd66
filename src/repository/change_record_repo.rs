// ==========================================
// 校园课表调度系统 - 变更记录仓储
// ==========================================
// 依据: Resolution_Engine_Specs_v1.0.md - 4.2 变更审批生命周期
// 红线: 状态转换采用条件更新, 以 rows_affected 判定竞争胜负
// ==========================================

use crate::domain::change::ChangeRecord;
use crate::domain::types::{ChangeSource, ChangeState, ChangeType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"id, timetable_entry_id, change_type, change_date,
                      original_teacher_id, new_teacher_id, original_room, new_room,
                      new_start_time, new_end_time, reason, change_source,
                      state, approved_by, approved_at, is_active, created_at"#;

// ==========================================
// ChangeRecordRepository - 变更记录仓储
// ==========================================
pub struct ChangeRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ChangeRecordRepository {
    /// 创建新的ChangeRecordRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入变更记录
    pub fn insert(&self, record: &ChangeRecord) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO change_record (
                   id, timetable_entry_id, change_type, change_date,
                   original_teacher_id, new_teacher_id, original_room, new_room,
                   new_start_time, new_end_time, reason, change_source,
                   state, approved_by, approved_at, is_active, created_at
               ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                record.id,
                record.timetable_entry_id,
                record.change_type.to_db_str(),
                record.change_date.format("%Y-%m-%d").to_string(),
                record.original_teacher_id,
                record.new_teacher_id,
                record.original_room,
                record.new_room,
                record.new_start_time.map(|t| t.format("%H:%M").to_string()),
                record.new_end_time.map(|t| t.format("%H:%M").to_string()),
                record.reason,
                record.change_source.to_db_str(),
                record.state.to_db_str(),
                record.approved_by,
                record
                    .approved_at
                    .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string()),
                if record.is_active { 1 } else { 0 },
                record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;

        Ok(record.id.clone())
    }

    /// 按ID查询变更记录
    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<ChangeRecord>> {
        let conn = self.get_conn()?;

        let result = conn.query_row(
            &format!(
                r#"SELECT {}
                   FROM change_record
                   WHERE id = ?1"#,
                SELECT_COLUMNS
            ),
            params![id],
            |row| Self::map_row(row),
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询班级在日期窗口内的全部变更记录
    ///
    /// 通过 base_entry 关联过滤班级, 供解析快照装配使用
    pub fn find_by_class_date_range(
        &self,
        class_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<ChangeRecord>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT cr.id, cr.timetable_entry_id, cr.change_type, cr.change_date,
                      cr.original_teacher_id, cr.new_teacher_id, cr.original_room, cr.new_room,
                      cr.new_start_time, cr.new_end_time, cr.reason, cr.change_source,
                      cr.state, cr.approved_by, cr.approved_at, cr.is_active, cr.created_at
               FROM change_record cr
               INNER JOIN base_entry be ON cr.timetable_entry_id = be.id
               WHERE be.class_id = ?1 AND cr.change_date BETWEEN ?2 AND ?3
               ORDER BY cr.change_date, cr.created_at"#,
        )?;

        let records = stmt
            .query_map(
                params![
                    class_id,
                    start_date.format("%Y-%m-%d").to_string(),
                    end_date.format("%Y-%m-%d").to_string(),
                ],
                |row| Self::map_row(row),
            )?
            .collect::<Result<Vec<ChangeRecord>, _>>()?;

        Ok(records)
    }

    /// 查询日期窗口内指派给某教师的已批代课 (教师视角聚合用)
    pub fn find_substitutions_for_teacher(
        &self,
        teacher_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<ChangeRecord>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {}
               FROM change_record
               WHERE new_teacher_id = ?1
                 AND change_type = 'SUBSTITUTION'
                 AND state IN ('APPROVED', 'DISMISSED')
                 AND is_active = 1
                 AND change_date BETWEEN ?2 AND ?3
               ORDER BY change_date, created_at"#,
            SELECT_COLUMNS
        ))?;

        let records = stmt
            .query_map(
                params![
                    teacher_id,
                    start_date.format("%Y-%m-%d").to_string(),
                    end_date.format("%Y-%m-%d").to_string(),
                ],
                |row| Self::map_row(row),
            )?
            .collect::<Result<Vec<ChangeRecord>, _>>()?;

        Ok(records)
    }

    /// 查询待审批变更 (通知列表, 最新优先)
    pub fn list_pending(&self, class_id: Option<&str>) -> RepositoryResult<Vec<ChangeRecord>> {
        let conn = self.get_conn()?;

        let records = match class_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(class_id) => {
                let mut stmt = conn.prepare(
                    r#"SELECT cr.id, cr.timetable_entry_id, cr.change_type, cr.change_date,
                              cr.original_teacher_id, cr.new_teacher_id, cr.original_room, cr.new_room,
                              cr.new_start_time, cr.new_end_time, cr.reason, cr.change_source,
                              cr.state, cr.approved_by, cr.approved_at, cr.is_active, cr.created_at
                       FROM change_record cr
                       INNER JOIN base_entry be ON cr.timetable_entry_id = be.id
                       WHERE cr.state = 'PENDING' AND be.class_id = ?1
                       ORDER BY cr.created_at DESC"#,
                )?;
                let rows = stmt
                    .query_map(params![class_id], |row| Self::map_row(row))?
                    .collect::<Result<Vec<ChangeRecord>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    r#"SELECT {}
                       FROM change_record
                       WHERE state = 'PENDING'
                       ORDER BY created_at DESC"#,
                    SELECT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], |row| Self::map_row(row))?
                    .collect::<Result<Vec<ChangeRecord>, _>>()?;
                rows
            }
        };

        Ok(records)
    }

    /// 条件批准: 仅当记录仍为 PENDING 时生效
    ///
    /// # 返回
    /// - `Ok(1)`: 转换成功
    /// - `Ok(0)`: 记录不存在或已不在 PENDING 状态 (由调用方判别)
    pub fn approve_pending(
        &self,
        id: &str,
        approved_by: &str,
        approved_at: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"UPDATE change_record
               SET state = 'APPROVED', approved_by = ?2, approved_at = ?3, is_active = 1
               WHERE id = ?1 AND state = 'PENDING'"#,
            params![
                id,
                approved_by,
                approved_at.format("%Y-%m-%d %H:%M:%S").to_string()
            ],
        )?;

        Ok(rows)
    }

    /// 条件驳回: 仅当记录仍为 PENDING 时删除
    ///
    /// 驳回是破坏性操作, 记录永久删除
    pub fn delete_pending(&self, id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            "DELETE FROM change_record WHERE id = ?1 AND state = 'PENDING'",
            params![id],
        )?;

        Ok(rows)
    }

    /// 条件隐藏: 仅当记录为 APPROVED 时转入 DISMISSED
    ///
    /// 记录保留且 is_active 不变, 排课效力不受影响
    pub fn dismiss_approved(&self, id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            "UPDATE change_record SET state = 'DISMISSED' WHERE id = ?1 AND state = 'APPROVED'",
            params![id],
        )?;

        Ok(rows)
    }

    /// 判断课位在日期窗口内是否已有生效中的停课记录
    ///
    /// 用途: 插入前校验 "同一 (entry, 周) 至多一条生效停课" 不变式
    pub fn has_active_cancellation(
        &self,
        timetable_entry_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let count: i64 = conn.query_row(
            r#"SELECT COUNT(*)
               FROM change_record
               WHERE timetable_entry_id = ?1
                 AND change_type = 'CANCELLATION'
                 AND is_active = 1
                 AND change_date BETWEEN ?2 AND ?3"#,
            params![
                timetable_entry_id,
                start_date.format("%Y-%m-%d").to_string(),
                end_date.format("%Y-%m-%d").to_string(),
            ],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    /// 映射数据库行到ChangeRecord对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ChangeRecord> {
        let change_type_str: String = row.get(2)?;
        let change_type = ChangeType::from_str(&change_type_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("无法解析变更类型: {}", change_type_str).into(),
            )
        })?;

        let state_str: String = row.get(12)?;
        let source_str: String = row.get(11)?;

        Ok(ChangeRecord {
            id: row.get(0)?,
            timetable_entry_id: row.get(1)?,
            change_type,
            change_date: NaiveDate::parse_from_str(&row.get::<_, String>(3)?, "%Y-%m-%d").map_err(
                |e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                },
            )?,
            original_teacher_id: row.get(4)?,
            new_teacher_id: row.get(5)?,
            original_room: row.get(6)?,
            new_room: row.get(7)?,
            new_start_time: Self::parse_time_opt(row, 8)?,
            new_end_time: Self::parse_time_opt(row, 9)?,
            reason: row.get(10)?,
            change_source: ChangeSource::from_str(&source_str),
            state: ChangeState::from_str(&state_str),
            approved_by: row.get(13)?,
            approved_at: row
                .get::<_, Option<String>>(14)?
                .and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok()),
            is_active: row.get::<_, i32>(15)? == 1,
            created_at: NaiveDateTime::parse_from_str(
                &row.get::<_, String>(16)?,
                "%Y-%m-%d %H:%M:%S",
            )
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    16,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
        })
    }

    /// 解析可空 HH:MM 文本列
    fn parse_time_opt(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<NaiveTime>> {
        Ok(row
            .get::<_, Option<String>>(idx)?
            .and_then(|s| NaiveTime::parse_from_str(&s, "%H:%M").ok()))
    }
}
