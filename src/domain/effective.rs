// ==========================================
// 校园课表调度系统 - 有效课位领域模型
// ==========================================
// 依据: Resolution_Engine_Specs_v1.0.md - 4.1 解析输出
// 红线: 派生结果, 永不落库
// ==========================================

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::types::{EffectiveStatus, SchoolDay};

// ==========================================
// EffectiveEntry - 有效课位
// ==========================================
// 解析引擎的唯一输出: 正常上课 / 空课 / 待安排代课 三态之一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveEntry {
    // ===== 课位定位 =====
    pub class_id: String,                    // 班级ID
    pub day: SchoolDay,                      // 星期
    pub period: i32,                         // 节次序号
    pub date: NaiveDate,                     // 具体历日 (本周该星期的日期)

    // ===== 解析结果 =====
    pub status: EffectiveStatus,             // 课位状态
    pub teacher_id: Option<String>,          // 生效教师 (SCHEDULED 时存在)
    pub subject_id: Option<String>,          // 生效科目
    pub room: Option<String>,                // 生效教室
    pub start_time: Option<NaiveTime>,       // 生效开始时间
    pub end_time: Option<NaiveTime>,         // 生效结束时间

    // ===== 展示辅助 =====
    pub original_teacher_id: Option<String>, // 原教师 (代课/待代课场景展示)
}

impl EffectiveEntry {
    /// 构造空课结果
    pub fn free(class_id: &str, day: SchoolDay, period: i32, date: NaiveDate) -> Self {
        Self {
            class_id: class_id.to_string(),
            day,
            period,
            date,
            status: EffectiveStatus::Free,
            teacher_id: None,
            subject_id: None,
            room: None,
            start_time: None,
            end_time: None,
            original_teacher_id: None,
        }
    }

    /// 构造正常上课结果
    #[allow(clippy::too_many_arguments)]
    pub fn scheduled(
        class_id: &str,
        day: SchoolDay,
        period: i32,
        date: NaiveDate,
        teacher_id: String,
        subject_id: String,
        room: Option<String>,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            class_id: class_id.to_string(),
            day,
            period,
            date,
            status: EffectiveStatus::Scheduled,
            teacher_id: Some(teacher_id),
            subject_id: Some(subject_id),
            room,
            start_time: Some(start_time),
            end_time: Some(end_time),
            original_teacher_id: None,
        }
    }

    /// 构造待安排代课结果 (携带原教师/科目供展示)
    #[allow(clippy::too_many_arguments)]
    pub fn substitution_required(
        class_id: &str,
        day: SchoolDay,
        period: i32,
        date: NaiveDate,
        original_teacher_id: String,
        subject_id: String,
        room: Option<String>,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            class_id: class_id.to_string(),
            day,
            period,
            date,
            status: EffectiveStatus::SubstitutionRequired,
            teacher_id: None,
            subject_id: Some(subject_id),
            room,
            start_time: Some(start_time),
            end_time: Some(end_time),
            original_teacher_id: Some(original_teacher_id),
        }
    }

    /// 记录原教师 (代课生效后供展示)
    pub fn with_original_teacher(mut self, teacher_id: &str) -> Self {
        self.original_teacher_id = Some(teacher_id.to_string());
        self
    }

    /// 判断是否为空课
    pub fn is_free(&self) -> bool {
        self.status == EffectiveStatus::Free
    }

    /// 判断是否待安排代课
    pub fn needs_substitution(&self) -> bool {
        self.status == EffectiveStatus::SubstitutionRequired
    }
}
