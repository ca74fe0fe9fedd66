// ==========================================
// 校园课表调度系统 - 周层编辑仓储
// ==========================================
// 红线: 编辑作用域严格为 (class_id, week_start, day, period)
// 红线: 同一课位重复编辑采用覆盖语义 (UPSERT)
// ==========================================

use crate::domain::timetable::WeeklyEdit;
use crate::domain::types::SchoolDay;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// WeeklyEditRepository - 周层编辑仓储
// ==========================================
pub struct WeeklyEditRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WeeklyEditRepository {
    /// 创建新的WeeklyEditRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入或覆盖周层编辑
    pub fn upsert(&self, edit: &WeeklyEdit) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO weekly_edit (
                   class_id, week_start, day, period,
                   teacher_id, subject_id, room, start_time, end_time, reason
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
               ON CONFLICT(class_id, week_start, day, period) DO UPDATE SET
                   teacher_id = ?5, subject_id = ?6, room = ?7,
                   start_time = ?8, end_time = ?9, reason = ?10"#,
            params![
                edit.class_id,
                edit.week_start.format("%Y-%m-%d").to_string(),
                edit.day.to_db_str(),
                edit.period,
                edit.teacher_id,
                edit.subject_id,
                edit.room,
                edit.start_time.format("%H:%M").to_string(),
                edit.end_time.format("%H:%M").to_string(),
                edit.reason,
            ],
        )?;

        Ok(())
    }

    /// 查询班级某教学周的全部编辑
    pub fn find_by_class_week(
        &self,
        class_id: &str,
        week_start: NaiveDate,
    ) -> RepositoryResult<Vec<WeeklyEdit>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT class_id, week_start, day, period,
                      teacher_id, subject_id, room, start_time, end_time, reason
               FROM weekly_edit
               WHERE class_id = ?1 AND week_start = ?2
               ORDER BY day, period"#,
        )?;

        let edits = stmt
            .query_map(
                params![class_id, week_start.format("%Y-%m-%d").to_string()],
                |row| Self::map_row(row),
            )?
            .collect::<Result<Vec<WeeklyEdit>, _>>()?;

        Ok(edits)
    }

    /// 查询某教学周内指定教师被编辑安排的课位 (教师视角聚合用)
    pub fn find_by_teacher_week(
        &self,
        teacher_id: &str,
        week_start: NaiveDate,
    ) -> RepositoryResult<Vec<WeeklyEdit>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT class_id, week_start, day, period,
                      teacher_id, subject_id, room, start_time, end_time, reason
               FROM weekly_edit
               WHERE teacher_id = ?1 AND week_start = ?2
               ORDER BY day, period"#,
        )?;

        let edits = stmt
            .query_map(
                params![teacher_id, week_start.format("%Y-%m-%d").to_string()],
                |row| Self::map_row(row),
            )?
            .collect::<Result<Vec<WeeklyEdit>, _>>()?;

        Ok(edits)
    }

    /// 查询单个课位的编辑
    pub fn find_one(
        &self,
        class_id: &str,
        week_start: NaiveDate,
        day: SchoolDay,
        period: i32,
    ) -> RepositoryResult<Option<WeeklyEdit>> {
        let conn = self.get_conn()?;

        let result = conn.query_row(
            r#"SELECT class_id, week_start, day, period,
                      teacher_id, subject_id, room, start_time, end_time, reason
               FROM weekly_edit
               WHERE class_id = ?1 AND week_start = ?2 AND day = ?3 AND period = ?4"#,
            params![
                class_id,
                week_start.format("%Y-%m-%d").to_string(),
                day.to_db_str(),
                period
            ],
            |row| Self::map_row(row),
        );

        match result {
            Ok(edit) => Ok(Some(edit)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 映射数据库行到WeeklyEdit对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<WeeklyEdit> {
        let day_str: String = row.get(2)?;
        let day = SchoolDay::from_str(&day_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("无法解析星期: {}", day_str).into(),
            )
        })?;

        Ok(WeeklyEdit {
            class_id: row.get(0)?,
            week_start: NaiveDate::parse_from_str(&row.get::<_, String>(1)?, "%Y-%m-%d").map_err(
                |e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                },
            )?,
            day,
            period: row.get(3)?,
            teacher_id: row.get(4)?,
            subject_id: row.get(5)?,
            room: row.get(6)?,
            start_time: Self::parse_time(row, 7)?,
            end_time: Self::parse_time(row, 8)?,
            reason: row.get(9)?,
        })
    }

    /// 解析 HH:MM 文本列
    fn parse_time(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveTime> {
        NaiveTime::parse_from_str(&row.get::<_, String>(idx)?, "%H:%M").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    }
}
