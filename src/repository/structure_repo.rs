// ==========================================
// 校园课表调度系统 - 作息结构仓储
// ==========================================
// 红线: 结构提供方为外部系统, 本仓储只做快照读写
// ==========================================

use crate::domain::timetable::{SchoolStructure, TimeSlot};
use crate::domain::types::SchoolDay;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// StructureRepository - 作息结构仓储
// ==========================================
pub struct StructureRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StructureRepository {
    /// 创建新的StructureRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取学校作息结构 (工作日 + 有序节次)
    ///
    /// # 返回
    /// - `Ok(Some(structure))`: 结构存在
    /// - `Ok(None)`: 学校未配置结构
    pub fn get_structure(&self, school_id: &str) -> RepositoryResult<Option<SchoolStructure>> {
        let conn = self.get_conn()?;

        let working_days_csv: Option<String> = match conn.query_row(
            "SELECT working_days FROM school_structure WHERE school_id = ?1",
            params![school_id],
            |row| row.get::<_, String>(0),
        ) {
            Ok(v) => Some(v),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };

        let working_days_csv = match working_days_csv {
            Some(v) => v,
            None => return Ok(None),
        };

        let working_days: Vec<SchoolDay> = working_days_csv
            .split(',')
            .filter_map(|s| SchoolDay::from_str(s.trim()))
            .collect();

        let mut stmt = conn.prepare(
            r#"SELECT period, start_time, end_time, is_break
               FROM time_slot
               WHERE school_id = ?1
               ORDER BY period"#,
        )?;

        let time_slots = stmt
            .query_map(params![school_id], |row| Self::map_slot_row(row))?
            .collect::<Result<Vec<TimeSlot>, _>>()?;

        Ok(Some(SchoolStructure {
            school_id: school_id.to_string(),
            working_days,
            time_slots,
        }))
    }

    /// 保存学校作息结构 (整体替换)
    ///
    /// 用途: 接收外部结构提供方的快照推送
    pub fn save_structure(&self, structure: &SchoolStructure) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let working_days_csv = structure
            .working_days
            .iter()
            .map(|d| d.to_db_str())
            .collect::<Vec<_>>()
            .join(",");

        tx.execute(
            r#"INSERT INTO school_structure (school_id, working_days)
               VALUES (?1, ?2)
               ON CONFLICT(school_id) DO UPDATE SET working_days = ?2"#,
            params![structure.school_id, working_days_csv],
        )?;

        tx.execute(
            "DELETE FROM time_slot WHERE school_id = ?1",
            params![structure.school_id],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO time_slot (school_id, period, start_time, end_time, is_break)
                   VALUES (?, ?, ?, ?, ?)"#,
            )?;

            for slot in &structure.time_slots {
                stmt.execute(params![
                    structure.school_id,
                    slot.period,
                    slot.start_time.format("%H:%M").to_string(),
                    slot.end_time.format("%H:%M").to_string(),
                    if slot.is_break { 1 } else { 0 },
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// 映射数据库行到TimeSlot对象
    fn map_slot_row(row: &rusqlite::Row) -> rusqlite::Result<TimeSlot> {
        Ok(TimeSlot {
            period: row.get(0)?,
            start_time: NaiveTime::parse_from_str(&row.get::<_, String>(1)?, "%H:%M").map_err(
                |e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                },
            )?,
            end_time: NaiveTime::parse_from_str(&row.get::<_, String>(2)?, "%H:%M").map_err(
                |e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                },
            )?,
            is_break: row.get::<_, i32>(3)? == 1,
        })
    }
}
