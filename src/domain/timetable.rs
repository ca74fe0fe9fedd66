// ==========================================
// 校园课表调度系统 - 课表领域模型
// ==========================================
// 依据: Timetable_Dev_Master_Spec.md - PART A2 数据模型红线
// 依据: Resolution_Engine_Specs_v1.0.md - 3. 数据模型
// ==========================================

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::types::SchoolDay;
use crate::domain::week::SchoolWeek;

// ==========================================
// TimeSlot - 节次结构
// ==========================================
// 红线: 课间(is_break)节次不承载教学内容, 不参与教学节次编号
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub period: i32,           // 节次序号 (结构序, 含课间)
    pub start_time: NaiveTime, // 开始时间
    pub end_time: NaiveTime,   // 结束时间
    pub is_break: bool,        // 是否课间
}

impl TimeSlot {
    /// 判断是否为教学节次
    pub fn is_teaching(&self) -> bool {
        !self.is_break
    }
}

// ==========================================
// SchoolStructure - 学校作息结构
// ==========================================
// 外部结构提供方的只读快照: 工作日集合 + 有序节次
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolStructure {
    pub school_id: String,            // 学校ID
    pub working_days: Vec<SchoolDay>, // 工作日集合 (通常为周一至周六)
    pub time_slots: Vec<TimeSlot>,    // 有序节次 (按 period 升序)
}

impl SchoolStructure {
    /// 按节次序号查找节次
    pub fn slot(&self, period: i32) -> Option<&TimeSlot> {
        self.time_slots.iter().find(|s| s.period == period)
    }

    /// 判断节次是否在结构边界内
    pub fn has_period(&self, period: i32) -> bool {
        self.slot(period).is_some()
    }

    /// 判断星期是否为工作日
    pub fn is_working_day(&self, day: SchoolDay) -> bool {
        self.working_days.contains(&day)
    }
}

// ==========================================
// BaseEntry - 基础课表条目
// ==========================================
// 红线: 每 (class_id, day, period) 至多一条; 仅由重新生成或提升操作改写
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseEntry {
    // ===== 主键 =====
    pub id: String,            // 条目ID (UUID)

    // ===== 课位定位 =====
    pub class_id: String,      // 班级ID
    pub day: SchoolDay,        // 星期 (周一至周六)
    pub period: i32,           // 节次序号

    // ===== 教学内容 =====
    pub teacher_id: String,    // 授课教师ID
    pub subject_id: String,    // 科目ID
    pub room: Option<String>,  // 教室 (可选)

    // ===== 时间 =====
    pub start_time: NaiveTime, // 开始时间
    pub end_time: NaiveTime,   // 结束时间
}

impl BaseEntry {
    /// 课位键 (星期 + 节次)
    pub fn slot_key(&self) -> (SchoolDay, i32) {
        (self.day, self.period)
    }
}

// ==========================================
// WeeklyEdit - 周层编辑
// ==========================================
// 红线: 免审批、终局覆盖; 严格限定在一个教学周 [week_start, week_start+5]
// 红线: teacher_id 与 subject_id 同时为空 = 该周该课位软删除
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyEdit {
    // ===== 作用域 (复合主键: class_id + week_start + day + period) =====
    pub class_id: String,             // 班级ID
    pub week_start: NaiveDate,        // 周一日期 (周标识)
    pub day: SchoolDay,               // 星期
    pub period: i32,                  // 节次序号

    // ===== 覆盖内容 =====
    pub teacher_id: Option<String>,   // 教师ID (None = 软删除)
    pub subject_id: Option<String>,   // 科目ID (None = 软删除)
    pub room: Option<String>,         // 教室 (可选)
    pub start_time: NaiveTime,        // 开始时间
    pub end_time: NaiveTime,          // 结束时间

    // ===== 展示信息 =====
    pub reason: String,               // 编辑原因 (仅展示, 不参与解析)
}

impl WeeklyEdit {
    /// 判断是否为软删除 (本周该课位清空)
    pub fn is_soft_delete(&self) -> bool {
        self.teacher_id.is_none() && self.subject_id.is_none()
    }

    /// 所属教学周
    pub fn week(&self) -> SchoolWeek {
        SchoolWeek::from_monday(self.week_start)
    }
}
