// ==========================================
// 校园课表调度系统 - 考勤与代课确认领域模型
// ==========================================
// 依据: Resolution_Engine_Specs_v1.0.md - 4.1 步骤4 缺勤判定
// 外部系统只读消费, 本系统不写入
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::types::{AttendanceStatus, ConfirmationStatus};

// ==========================================
// AttendanceRecord - 教师考勤记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub teacher_id: String,                  // 教师ID
    pub date: NaiveDate,                     // 考勤日期
    pub status: AttendanceStatus,            // 考勤状态
    pub leave_start_date: Option<NaiveDate>, // 请假开始日期 (仅 ON_LEAVE)
    pub leave_end_date: Option<NaiveDate>,   // 请假结束日期 (仅 ON_LEAVE)
}

impl AttendanceRecord {
    /// 判定教师在指定日期是否缺勤
    ///
    /// 规则:
    /// 1. ABSENT: 仅当记录日期等于查询日期
    /// 2. ON_LEAVE: 查询日期落在 [leave_start, leave_end] 闭区间内
    ///    (区间端点缺失时退化为记录日期当天)
    /// 3. PRESENT: 恒为出勤
    pub fn is_absent_on(&self, date: NaiveDate) -> bool {
        match self.status {
            AttendanceStatus::Present => false,
            AttendanceStatus::Absent => self.date == date,
            AttendanceStatus::OnLeave => {
                let start = self.leave_start_date.unwrap_or(self.date);
                let end = self.leave_end_date.unwrap_or(self.date);
                date >= start && date <= end
            }
        }
    }
}

// ==========================================
// SubstitutionConfirmation - 代课确认记录
// ==========================================
// 说明: 与 ChangeRecord 双轨并存; 变更记录被隐藏后,
// 确认记录继续独立支撑代课生效
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionConfirmation {
    pub timetable_entry_id: String,    // 关联基础课表条目ID
    pub substitute_teacher_id: String, // 代课教师ID
    pub date: NaiveDate,               // 代课日期 (具体历日)
    pub status: ConfirmationStatus,    // 确认状态
}

impl SubstitutionConfirmation {
    /// 判断是否已确认 (仅已确认记录参与解析)
    pub fn is_confirmed(&self) -> bool {
        self.status == ConfirmationStatus::Confirmed
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("日期格式错误")
    }

    fn record(status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            teacher_id: "T001".to_string(),
            date: d("2024-03-04"),
            status,
            leave_start_date: None,
            leave_end_date: None,
        }
    }

    #[test]
    fn test_absent_matches_exact_date_only() {
        let rec = record(AttendanceStatus::Absent);
        assert!(rec.is_absent_on(d("2024-03-04")));
        assert!(!rec.is_absent_on(d("2024-03-05")));
    }

    #[test]
    fn test_present_never_absent() {
        let rec = record(AttendanceStatus::Present);
        assert!(!rec.is_absent_on(d("2024-03-04")));
    }

    #[test]
    fn test_on_leave_range_inclusive() {
        let mut rec = record(AttendanceStatus::OnLeave);
        rec.leave_start_date = Some(d("2024-03-04"));
        rec.leave_end_date = Some(d("2024-03-08"));
        assert!(rec.is_absent_on(d("2024-03-04")));
        assert!(rec.is_absent_on(d("2024-03-06")));
        assert!(rec.is_absent_on(d("2024-03-08")));
        assert!(!rec.is_absent_on(d("2024-03-09")));
        assert!(!rec.is_absent_on(d("2024-03-03")));
    }

    #[test]
    fn test_on_leave_without_range_falls_back_to_record_date() {
        let rec = record(AttendanceStatus::OnLeave);
        assert!(rec.is_absent_on(d("2024-03-04")));
        assert!(!rec.is_absent_on(d("2024-03-05")));
    }
}
