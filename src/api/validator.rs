// ==========================================
// 校园课表调度系统 - 写操作校验器
// ==========================================
// 职责: 周层编辑与变更草稿的落库前校验
// 红线: 校验失败拒绝于任何落库之前, 不产生半写状态
// 依据: Resolution_Engine_Specs_v1.0.md - 7 错误分层
// ==========================================

use chrono::Datelike;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult, ValidationViolation};
use crate::api::schedule_api::WeeklyEditDraft;
use crate::domain::timetable::SchoolStructure;
use crate::domain::types::{ChangeType, SchoolDay};
use crate::domain::week::SchoolWeek;
use crate::engine::lifecycle::ChangeDraft;
use crate::repository::{BaseEntryRepository, StructureRepository};

// ==========================================
// WriteOperationValidator - 写操作校验器
// ==========================================

/// 写操作校验器
///
/// 职责:
/// 1. 周层编辑: 半清空编辑、越界节次、课间节次、非工作日
/// 2. 变更草稿: 类型必填字段、日期与课位星期的匹配
pub struct WriteOperationValidator {
    structure_repo: Arc<StructureRepository>,
    base_entry_repo: Arc<BaseEntryRepository>,
}

impl WriteOperationValidator {
    /// 创建新的WriteOperationValidator实例
    pub fn new(
        structure_repo: Arc<StructureRepository>,
        base_entry_repo: Arc<BaseEntryRepository>,
    ) -> Self {
        Self {
            structure_repo,
            base_entry_repo,
        }
    }

    /// 校验周层编辑草稿
    ///
    /// # 规则
    /// - 教师与科目必须同全同空 (全空 = 软删除, 全有 = 覆盖)
    /// - 节次必须存在于作息结构且不是课间
    /// - 星期必须是工作日
    pub fn validate_weekly_edit(
        &self,
        school_id: &str,
        draft: &WeeklyEditDraft,
    ) -> ApiResult<()> {
        let structure = self.require_structure(school_id)?;
        let mut violations = Vec::new();

        // 1. 教师/科目成对约束
        if draft.teacher_id.is_none() && draft.subject_id.is_some() {
            violations.push(ValidationViolation {
                violation_type: "SUBJECT_WITHOUT_TEACHER".to_string(),
                reason: "只留科目不留教师的编辑无法解析; 释放课位须同时清空教师与科目".to_string(),
                details: None,
            });
        }
        if draft.teacher_id.is_some() && draft.subject_id.is_none() {
            violations.push(ValidationViolation {
                violation_type: "TEACHER_WITHOUT_SUBJECT".to_string(),
                reason: "指定教师时必须同时指定科目".to_string(),
                details: None,
            });
        }

        // 2. 节次约束
        match structure.slot(draft.period) {
            None => violations.push(ValidationViolation {
                violation_type: "PERIOD_OUT_OF_RANGE".to_string(),
                reason: format!("节次 {} 不存在于当前作息结构", draft.period),
                details: Some(serde_json::json!({ "period": draft.period })),
            }),
            Some(slot) if slot.is_break => violations.push(ValidationViolation {
                violation_type: "BREAK_PERIOD".to_string(),
                reason: format!("节次 {} 是课间, 不承载课程内容", draft.period),
                details: Some(serde_json::json!({ "period": draft.period })),
            }),
            Some(_) => {}
        }

        // 3. 工作日约束
        if !structure.is_working_day(draft.day) {
            violations.push(ValidationViolation {
                violation_type: "NON_WORKING_DAY".to_string(),
                reason: format!("{} 不是工作日", draft.day),
                details: Some(serde_json::json!({ "day": draft.day })),
            });
        }

        if !violations.is_empty() {
            return Err(ApiError::OperationValidationError {
                reason: format!("周层编辑校验失败, {}项违规", violations.len()),
                violations,
            });
        }
        Ok(())
    }

    /// 校验变更草稿
    ///
    /// # 规则
    /// - 代课必须指定新教师; 换教室必须指定新教室; 调时间至少指定一端
    /// - 日期精确类型 (代课/换教室/调时间) 的日期星期必须与课位星期一致
    /// - 停课日期必须落在教学窗口 (周一至周六)
    pub fn validate_change_draft(&self, draft: &ChangeDraft) -> ApiResult<()> {
        let entry = self
            .base_entry_repo
            .find_by_id(&draft.timetable_entry_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "基础课表条目(id={})不存在",
                    draft.timetable_entry_id
                ))
            })?;

        let mut violations = Vec::new();

        // 1. 类型必填字段
        match draft.change_type {
            ChangeType::Substitution => {
                if draft.new_teacher_id.is_none() {
                    violations.push(ValidationViolation {
                        violation_type: "MISSING_NEW_TEACHER".to_string(),
                        reason: "代课变更必须指定新教师".to_string(),
                        details: None,
                    });
                }
            }
            ChangeType::RoomChange => {
                if draft.new_room.is_none() {
                    violations.push(ValidationViolation {
                        violation_type: "MISSING_NEW_ROOM".to_string(),
                        reason: "换教室变更必须指定新教室".to_string(),
                        details: None,
                    });
                }
            }
            ChangeType::TimeChange => {
                if draft.new_start_time.is_none() && draft.new_end_time.is_none() {
                    violations.push(ValidationViolation {
                        violation_type: "MISSING_NEW_TIME".to_string(),
                        reason: "调时间变更至少指定开始或结束时间之一".to_string(),
                        details: None,
                    });
                }
            }
            ChangeType::Cancellation => {}
        }

        // 2. 日期约束
        let change_week = SchoolWeek::containing(draft.change_date);
        match draft.change_type {
            // 停课按周窗口匹配, 日期只需落在教学窗口内
            ChangeType::Cancellation => {
                if !change_week.contains_teaching_date(draft.change_date) {
                    violations.push(ValidationViolation {
                        violation_type: "NON_TEACHING_DATE".to_string(),
                        reason: format!(
                            "停课日期 {} 落在周日, 不属于教学窗口",
                            draft.change_date
                        ),
                        details: Some(serde_json::json!({
                            "change_date": draft.change_date,
                        })),
                    });
                }
            }
            // 日期精确类型: 日期星期必须与课位星期一致, 否则永不匹配
            ChangeType::Substitution | ChangeType::RoomChange | ChangeType::TimeChange => {
                let weekday = SchoolDay::from_offset(
                    draft.change_date.weekday().num_days_from_monday() as i64,
                );
                if weekday != Some(entry.day) {
                    violations.push(ValidationViolation {
                        violation_type: "DATE_DAY_MISMATCH".to_string(),
                        reason: format!(
                            "变更日期 {} 的星期与课位星期 {} 不一致, 该变更将永不生效",
                            draft.change_date, entry.day
                        ),
                        details: Some(serde_json::json!({
                            "change_date": draft.change_date,
                            "entry_day": entry.day,
                        })),
                    });
                }
            }
        }

        if !violations.is_empty() {
            return Err(ApiError::OperationValidationError {
                reason: format!("变更草稿校验失败, {}项违规", violations.len()),
                violations,
            });
        }
        Ok(())
    }

    fn require_structure(&self, school_id: &str) -> ApiResult<SchoolStructure> {
        self.structure_repo
            .get_structure(school_id)?
            .ok_or_else(|| ApiError::NotFound(format!("学校作息结构(id={})不存在", school_id)))
    }
}
