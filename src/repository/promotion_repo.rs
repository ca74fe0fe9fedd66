// ==========================================
// 校园课表调度系统 - 提升操作仓储
// ==========================================
// 依据: Resolution_Engine_Specs_v1.0.md - 4.3 提升操作
// 红线: 基础课表改写与叠加层清理必须同事务完成;
//       半提升状态会导致后续解析重复套用已提升的变更
// ==========================================

use crate::domain::timetable::BaseEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// BaseRewrite - 基础课表改写指令
// ==========================================
// 由提升引擎根据有效课表与当前基础课表的差异计算得出
#[derive(Debug, Clone)]
pub enum BaseRewrite {
    /// 新增条目 (周层编辑在原空课位排入了课程)
    Insert(BaseEntry),
    /// 改写条目内容 (教师/科目/教室/时间)
    Update(BaseEntry),
    /// 删除条目 (该课位本周解析为空课)
    Delete { id: String },
}

// ==========================================
// PromotionOutcome - 提升结果计数
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct PromotionOutcome {
    pub entries_updated: usize,        // 基础课表变动总数 (新增+改写+删除)
    pub entries_deleted: usize,        // 其中删除数
    pub weekly_edits_cleared: usize,   // 清除的周层编辑数
    pub change_records_cleared: usize, // 清除的变更记录数
}

// ==========================================
// PromotionRepository - 提升操作仓储
// ==========================================
pub struct PromotionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PromotionRepository {
    /// 创建新的PromotionRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 原子执行一周的提升: 清理叠加层 + 改写基础课表
    ///
    /// # 参数
    /// - `class_id`: 班级ID
    /// - `week_start` / `week_end`: 教学周窗口 (周一至周日)
    /// - `rewrites`: 基础课表改写指令集
    ///
    /// # 失败语义
    /// - 事务中任一步失败 → 整体回滚, 数据保持提升前状态
    /// - 回滚本身失败 → InconsistentState, 调用方必须对该班级停写
    pub fn apply_week_promotion(
        &self,
        class_id: &str,
        week_start: NaiveDate,
        week_end: NaiveDate,
        rewrites: &[BaseRewrite],
    ) -> RepositoryResult<PromotionOutcome> {
        let mut conn = self.get_conn()?;

        match Self::run_in_tx(&mut conn, class_id, week_start, week_end, rewrites) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                // 事务失败后连接若仍滞留在事务中, 自动回滚未完成
                if !conn.is_autocommit() {
                    let _ = conn.execute_batch("ROLLBACK");
                    if !conn.is_autocommit() {
                        return Err(RepositoryError::InconsistentState(format!(
                            "提升事务回滚失败, 班级 {} 基础课表与叠加层可能分叉: {}",
                            class_id, e
                        )));
                    }
                }
                Err(e)
            }
        }
    }

    /// 事务体: 先清叠加层 (此时课位关联仍完整), 再改写基础课表
    fn run_in_tx(
        conn: &mut Connection,
        class_id: &str,
        week_start: NaiveDate,
        week_end: NaiveDate,
        rewrites: &[BaseRewrite],
    ) -> RepositoryResult<PromotionOutcome> {
        let tx = conn.transaction()?;
        let week_start_str = week_start.format("%Y-%m-%d").to_string();
        let week_end_str = week_end.format("%Y-%m-%d").to_string();

        let change_records_cleared = tx.execute(
            r#"DELETE FROM change_record
               WHERE change_date BETWEEN ?2 AND ?3
                 AND timetable_entry_id IN (
                     SELECT id FROM base_entry WHERE class_id = ?1
                 )"#,
            params![class_id, week_start_str, week_end_str],
        )?;

        let weekly_edits_cleared = tx.execute(
            "DELETE FROM weekly_edit WHERE class_id = ?1 AND week_start = ?2",
            params![class_id, week_start_str],
        )?;

        let mut entries_updated = 0usize;
        let mut entries_deleted = 0usize;

        for rewrite in rewrites {
            match rewrite {
                BaseRewrite::Insert(entry) => {
                    tx.execute(
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
                    entries_updated += 1;
                }
                BaseRewrite::Update(entry) => {
                    tx.execute(
                        r#"UPDATE base_entry
                           SET teacher_id = ?2, subject_id = ?3, room = ?4,
                               start_time = ?5, end_time = ?6
                           WHERE id = ?1"#,
                        params![
                            entry.id,
                            entry.teacher_id,
                            entry.subject_id,
                            entry.room,
                            entry.start_time.format("%H:%M").to_string(),
                            entry.end_time.format("%H:%M").to_string(),
                        ],
                    )?;
                    entries_updated += 1;
                }
                BaseRewrite::Delete { id } => {
                    tx.execute("DELETE FROM base_entry WHERE id = ?1", params![id])?;
                    entries_updated += 1;
                    entries_deleted += 1;
                }
            }
        }

        tx.commit()?;

        Ok(PromotionOutcome {
            entries_updated,
            entries_deleted,
            weekly_edits_cleared,
            change_records_cleared,
        })
    }
}
