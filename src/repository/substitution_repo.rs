// ==========================================
// 校园课表调度系统 - 代课确认仓储
// ==========================================
// 红线: 代课确认由外部分配流程写入, 本仓储只读
// 说明: 与变更记录双轨并存, 变更被隐藏后确认记录继续支撑代课生效
// ==========================================

use crate::domain::attendance::SubstitutionConfirmation;
use crate::domain::types::ConfirmationStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// SubstitutionConfirmationRepository - 代课确认仓储
// ==========================================
pub struct SubstitutionConfirmationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SubstitutionConfirmationRepository {
    /// 创建新的SubstitutionConfirmationRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询班级在日期窗口内的全部代课确认 (解析快照装配用)
    pub fn find_by_class_date_range(
        &self,
        class_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<SubstitutionConfirmation>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT sc.timetable_entry_id, sc.substitute_teacher_id, sc.date, sc.status
               FROM substitution_confirmation sc
               INNER JOIN base_entry be ON sc.timetable_entry_id = be.id
               WHERE be.class_id = ?1 AND sc.date BETWEEN ?2 AND ?3
               ORDER BY sc.date"#,
        )?;

        let confirmations = stmt
            .query_map(
                params![
                    class_id,
                    start_date.format("%Y-%m-%d").to_string(),
                    end_date.format("%Y-%m-%d").to_string(),
                ],
                |row| Self::map_row(row),
            )?
            .collect::<Result<Vec<SubstitutionConfirmation>, _>>()?;

        Ok(confirmations)
    }

    /// 查询日期窗口内某教师被确认的代课 (教师视角聚合用)
    pub fn find_confirmed_for_substitute(
        &self,
        substitute_teacher_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<SubstitutionConfirmation>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT timetable_entry_id, substitute_teacher_id, date, status
               FROM substitution_confirmation
               WHERE substitute_teacher_id = ?1
                 AND status = 'CONFIRMED'
                 AND date BETWEEN ?2 AND ?3
               ORDER BY date"#,
        )?;

        let confirmations = stmt
            .query_map(
                params![
                    substitute_teacher_id,
                    start_date.format("%Y-%m-%d").to_string(),
                    end_date.format("%Y-%m-%d").to_string(),
                ],
                |row| Self::map_row(row),
            )?
            .collect::<Result<Vec<SubstitutionConfirmation>, _>>()?;

        Ok(confirmations)
    }

    /// 查询单个课位在指定日期的已确认代课
    pub fn find_confirmed_for_entry_date(
        &self,
        timetable_entry_id: &str,
        date: NaiveDate,
    ) -> RepositoryResult<Option<SubstitutionConfirmation>> {
        let conn = self.get_conn()?;

        let result = conn.query_row(
            r#"SELECT timetable_entry_id, substitute_teacher_id, date, status
               FROM substitution_confirmation
               WHERE timetable_entry_id = ?1 AND date = ?2 AND status = 'CONFIRMED'"#,
            params![timetable_entry_id, date.format("%Y-%m-%d").to_string()],
            |row| Self::map_row(row),
        );

        match result {
            Ok(confirmation) => Ok(Some(confirmation)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 映射数据库行到SubstitutionConfirmation对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<SubstitutionConfirmation> {
        let status_str: String = row.get(3)?;
        let status = ConfirmationStatus::from_str(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("无法解析确认状态: {}", status_str).into(),
            )
        })?;

        Ok(SubstitutionConfirmation {
            timetable_entry_id: row.get(0)?,
            substitute_teacher_id: row.get(1)?,
            date: NaiveDate::parse_from_str(&row.get::<_, String>(2)?, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            status,
        })
    }
}
