// ==========================================
// 校园课表调度系统 - 基础课表仓储
// ==========================================
// 红线: 每 (class_id, day, period) 至多一条
// 红线: 基础课表仅由外部生成器或提升操作改写
// ==========================================

use crate::domain::timetable::BaseEntry;
use crate::domain::types::SchoolDay;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"id, class_id, day, period, teacher_id, subject_id,
                      room, start_time, end_time"#;

// ==========================================
// BaseEntryRepository - 基础课表仓储
// ==========================================
pub struct BaseEntryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BaseEntryRepository {
    /// 创建新的BaseEntryRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询班级的全部基础课表条目
    pub fn find_by_class(&self, class_id: &str) -> RepositoryResult<Vec<BaseEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {}
               FROM base_entry
               WHERE class_id = ?1
               ORDER BY day, period"#,
            SELECT_COLUMNS
        ))?;

        let entries = stmt
            .query_map(params![class_id], |row| Self::map_row(row))?
            .collect::<Result<Vec<BaseEntry>, _>>()?;

        Ok(entries)
    }

    /// 查询教师视角的全部基础课表条目
    pub fn find_by_teacher(&self, teacher_id: &str) -> RepositoryResult<Vec<BaseEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {}
               FROM base_entry
               WHERE teacher_id = ?1
               ORDER BY day, period"#,
            SELECT_COLUMNS
        ))?;

        let entries = stmt
            .query_map(params![teacher_id], |row| Self::map_row(row))?
            .collect::<Result<Vec<BaseEntry>, _>>()?;

        Ok(entries)
    }

    /// 按ID查询条目
    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<BaseEntry>> {
        let conn = self.get_conn()?;

        let result = conn.query_row(
            &format!(
                r#"SELECT {}
                   FROM base_entry
                   WHERE id = ?1"#,
                SELECT_COLUMNS
            ),
            params![id],
            |row| Self::map_row(row),
        );

        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按课位查询条目 (class_id + day + period 唯一)
    pub fn find_by_slot(
        &self,
        class_id: &str,
        day: SchoolDay,
        period: i32,
    ) -> RepositoryResult<Option<BaseEntry>> {
        let conn = self.get_conn()?;

        let result = conn.query_row(
            &format!(
                r#"SELECT {}
                   FROM base_entry
                   WHERE class_id = ?1 AND day = ?2 AND period = ?3"#,
                SELECT_COLUMNS
            ),
            params![class_id, day.to_db_str(), period],
            |row| Self::map_row(row),
        );

        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 插入单条条目
    pub fn insert(&self, entry: &BaseEntry) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO base_entry (
                   id, class_id, day, period, teacher_id, subject_id,
                   room, start_time, end_time
               ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                entry.id,
                entry.class_id,
                entry.day.to_db_str(),
                entry.period,
                entry.teacher_id,
                entry.subject_id,
                entry.room,
                entry.start_time.format("%H:%M").to_string(),
                entry.end_time.format("%H:%M").to_string(),
            ],
        )?;
        Ok(())
    }

    /// 整体替换班级课表 (外部生成器回写入口)
    ///
    /// # 红线
    /// - 必须在事务中完成, 不允许出现半新半旧的课表
    pub fn replace_for_class(
        &self,
        class_id: &str,
        entries: &[BaseEntry],
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM base_entry WHERE class_id = ?1",
            params![class_id],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO base_entry (
                       id, class_id, day, period, teacher_id, subject_id,
                       room, start_time, end_time
                   ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )?;

            for entry in entries {
                stmt.execute(params![
                    entry.id,
                    entry.class_id,
                    entry.day.to_db_str(),
                    entry.period,
                    entry.teacher_id,
                    entry.subject_id,
                    entry.room,
                    entry.start_time.format("%H:%M").to_string(),
                    entry.end_time.format("%H:%M").to_string(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(entries.len())
    }

    /// 映射数据库行到BaseEntry对象
    pub(crate) fn map_row(row: &rusqlite::Row) -> rusqlite::Result<BaseEntry> {
        let day_str: String = row.get(2)?;
        let day = SchoolDay::from_str(&day_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("无法解析星期: {}", day_str).into(),
            )
        })?;

        Ok(BaseEntry {
            id: row.get(0)?,
            class_id: row.get(1)?,
            day,
            period: row.get(3)?,
            teacher_id: row.get(4)?,
            subject_id: row.get(5)?,
            room: row.get(6)?,
            start_time: Self::parse_time(row, 7)?,
            end_time: Self::parse_time(row, 8)?,
        })
    }

    /// 解析 HH:MM 文本列
    fn parse_time(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveTime> {
        NaiveTime::parse_from_str(&row.get::<_, String>(idx)?, "%H:%M").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    }
}
