// ==========================================
// 校园课表调度系统 - 考勤仓储
// ==========================================
// 红线: 考勤数据由外部系统写入, 本仓储只读
// ==========================================

use crate::domain::attendance::AttendanceRecord;
use crate::domain::types::AttendanceStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// AttendanceRepository - 考勤仓储
// ==========================================
pub struct AttendanceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AttendanceRepository {
    /// 创建新的AttendanceRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询指定日期的考勤记录 (可选过滤教师)
    ///
    /// 匹配规则:
    /// - 记录日期等于查询日期; 或
    /// - ON_LEAVE 记录的请假区间覆盖查询日期 (端点缺失退化为记录日期)
    pub fn find_for_date(
        &self,
        teacher_id: Option<&str>,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<AttendanceRecord>> {
        let conn = self.get_conn()?;
        let date_str = date.format("%Y-%m-%d").to_string();

        let records = match teacher_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(teacher_id) => {
                let mut stmt = conn.prepare(
                    r#"SELECT teacher_id, date, status, leave_start_date, leave_end_date
                       FROM attendance_record
                       WHERE teacher_id = ?1
                         AND (date = ?2
                              OR (status = 'ON_LEAVE'
                                  AND COALESCE(leave_start_date, date) <= ?2
                                  AND COALESCE(leave_end_date, date) >= ?2))
                       ORDER BY date"#,
                )?;
                let rows = stmt
                    .query_map(params![teacher_id, date_str], |row| Self::map_row(row))?
                    .collect::<Result<Vec<AttendanceRecord>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(
                    r#"SELECT teacher_id, date, status, leave_start_date, leave_end_date
                       FROM attendance_record
                       WHERE date = ?1
                          OR (status = 'ON_LEAVE'
                              AND COALESCE(leave_start_date, date) <= ?1
                              AND COALESCE(leave_end_date, date) >= ?1)
                       ORDER BY teacher_id, date"#,
                )?;
                let rows = stmt
                    .query_map(params![date_str], |row| Self::map_row(row))?
                    .collect::<Result<Vec<AttendanceRecord>, _>>()?;
                rows
            }
        };

        Ok(records)
    }

    /// 查询一组教师在日期窗口内的考勤记录 (解析快照装配用)
    pub fn find_for_date_range(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<AttendanceRecord>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT teacher_id, date, status, leave_start_date, leave_end_date
               FROM attendance_record
               WHERE (date BETWEEN ?1 AND ?2)
                  OR (status = 'ON_LEAVE'
                      AND COALESCE(leave_start_date, date) <= ?2
                      AND COALESCE(leave_end_date, date) >= ?1)
               ORDER BY teacher_id, date"#,
        )?;

        let records = stmt
            .query_map(
                params![
                    start_date.format("%Y-%m-%d").to_string(),
                    end_date.format("%Y-%m-%d").to_string(),
                ],
                |row| Self::map_row(row),
            )?
            .collect::<Result<Vec<AttendanceRecord>, _>>()?;

        Ok(records)
    }

    /// 映射数据库行到AttendanceRecord对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<AttendanceRecord> {
        let status_str: String = row.get(2)?;
        let status = AttendanceStatus::from_str(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("无法解析考勤状态: {}", status_str).into(),
            )
        })?;

        Ok(AttendanceRecord {
            teacher_id: row.get(0)?,
            date: NaiveDate::parse_from_str(&row.get::<_, String>(1)?, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            status,
            leave_start_date: row
                .get::<_, Option<String>>(3)?
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            leave_end_date: row
                .get::<_, Option<String>>(4)?
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        })
    }
}
