// ==========================================
// 校园课表调度系统 - 领域类型定义
// ==========================================
// 依据: Timetable_Dev_Master_Spec.md - PART A2 数据模型红线
// 依据: Resolution_Engine_Specs_v1.0.md - 3. 枚举全集
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 星期枚举 (School Day)
// ==========================================
// 红线: 周定义以周一为锚点, 周日偏移量 +6
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchoolDay {
    Monday,    // 周一
    Tuesday,   // 周二
    Wednesday, // 周三
    Thursday,  // 周四
    Friday,    // 周五
    Saturday,  // 周六
    Sunday,    // 周日 (仅用于周偏移计算, 不承载课表条目)
}

impl fmt::Display for SchoolDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchoolDay::Monday => write!(f, "MONDAY"),
            SchoolDay::Tuesday => write!(f, "TUESDAY"),
            SchoolDay::Wednesday => write!(f, "WEDNESDAY"),
            SchoolDay::Thursday => write!(f, "THURSDAY"),
            SchoolDay::Friday => write!(f, "FRIDAY"),
            SchoolDay::Saturday => write!(f, "SATURDAY"),
            SchoolDay::Sunday => write!(f, "SUNDAY"),
        }
    }
}

impl SchoolDay {
    /// 从字符串解析星期 (兼容大小写)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "MONDAY" => Some(SchoolDay::Monday),
            "TUESDAY" => Some(SchoolDay::Tuesday),
            "WEDNESDAY" => Some(SchoolDay::Wednesday),
            "THURSDAY" => Some(SchoolDay::Thursday),
            "FRIDAY" => Some(SchoolDay::Friday),
            "SATURDAY" => Some(SchoolDay::Saturday),
            "SUNDAY" => Some(SchoolDay::Sunday),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            SchoolDay::Monday => "MONDAY",
            SchoolDay::Tuesday => "TUESDAY",
            SchoolDay::Wednesday => "WEDNESDAY",
            SchoolDay::Thursday => "THURSDAY",
            SchoolDay::Friday => "FRIDAY",
            SchoolDay::Saturday => "SATURDAY",
            SchoolDay::Sunday => "SUNDAY",
        }
    }

    /// 相对周一的偏移天数 (周一=0, 周日=+6)
    pub fn offset_from_monday(&self) -> i64 {
        match self {
            SchoolDay::Monday => 0,
            SchoolDay::Tuesday => 1,
            SchoolDay::Wednesday => 2,
            SchoolDay::Thursday => 3,
            SchoolDay::Friday => 4,
            SchoolDay::Saturday => 5,
            SchoolDay::Sunday => 6,
        }
    }

    /// 从周一偏移量解析星期
    pub fn from_offset(offset: i64) -> Option<Self> {
        match offset {
            0 => Some(SchoolDay::Monday),
            1 => Some(SchoolDay::Tuesday),
            2 => Some(SchoolDay::Wednesday),
            3 => Some(SchoolDay::Thursday),
            4 => Some(SchoolDay::Friday),
            5 => Some(SchoolDay::Saturday),
            6 => Some(SchoolDay::Sunday),
            _ => None,
        }
    }
}

// ==========================================
// 变更类型 (Change Type)
// ==========================================
// 依据: Resolution_Engine_Specs 4.2 变更审批生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Substitution, // 代课
    Cancellation, // 停课
    RoomChange,   // 换教室
    TimeChange,   // 调时间
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Substitution => write!(f, "SUBSTITUTION"),
            ChangeType::Cancellation => write!(f, "CANCELLATION"),
            ChangeType::RoomChange => write!(f, "ROOM_CHANGE"),
            ChangeType::TimeChange => write!(f, "TIME_CHANGE"),
        }
    }
}

impl ChangeType {
    /// 从字符串解析变更类型
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SUBSTITUTION" => Some(ChangeType::Substitution),
            "CANCELLATION" => Some(ChangeType::Cancellation),
            "ROOM_CHANGE" => Some(ChangeType::RoomChange),
            "TIME_CHANGE" => Some(ChangeType::TimeChange),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ChangeType::Substitution => "SUBSTITUTION",
            ChangeType::Cancellation => "CANCELLATION",
            ChangeType::RoomChange => "ROOM_CHANGE",
            ChangeType::TimeChange => "TIME_CHANGE",
        }
    }
}

// ==========================================
// 变更状态 (Change State)
// ==========================================
// 红线: 单一权威状态机, 客户端只读状态不自行推导
// 说明: Rejected 为破坏性删除, 不作为保留状态存在
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeState {
    Pending,   // 待审批
    Approved,  // 已批准
    Dismissed, // 已批准且从通知列表隐藏 (排课仍然生效)
}

impl fmt::Display for ChangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeState::Pending => write!(f, "PENDING"),
            ChangeState::Approved => write!(f, "APPROVED"),
            ChangeState::Dismissed => write!(f, "DISMISSED"),
        }
    }
}

impl ChangeState {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PENDING" => ChangeState::Pending,
            "APPROVED" => ChangeState::Approved,
            "DISMISSED" => ChangeState::Dismissed,
            _ => ChangeState::Pending, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ChangeState::Pending => "PENDING",
            ChangeState::Approved => "APPROVED",
            ChangeState::Dismissed => "DISMISSED",
        }
    }
}

// ==========================================
// 变更来源 (Change Source)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeSource {
    Manual,           // 人工登记
    AutoAbsence,      // 考勤缺勤自动生成
    AutoSubstitution, // 代课分配流程自动生成
}

impl fmt::Display for ChangeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeSource::Manual => write!(f, "MANUAL"),
            ChangeSource::AutoAbsence => write!(f, "AUTO_ABSENCE"),
            ChangeSource::AutoSubstitution => write!(f, "AUTO_SUBSTITUTION"),
        }
    }
}

impl ChangeSource {
    /// 从字符串解析变更来源
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "MANUAL" => ChangeSource::Manual,
            "AUTO_ABSENCE" => ChangeSource::AutoAbsence,
            "AUTO_SUBSTITUTION" => ChangeSource::AutoSubstitution,
            _ => ChangeSource::Manual, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ChangeSource::Manual => "MANUAL",
            ChangeSource::AutoAbsence => "AUTO_ABSENCE",
            ChangeSource::AutoSubstitution => "AUTO_SUBSTITUTION",
        }
    }
}

// ==========================================
// 考勤状态 (Attendance Status)
// ==========================================
// 依据: Resolution_Engine_Specs 4.1 步骤4 缺勤判定
// 外部考勤系统只读消费
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present, // 出勤
    Absent,  // 缺勤
    OnLeave, // 请假 (按请假区间判定)
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceStatus::Present => write!(f, "PRESENT"),
            AttendanceStatus::Absent => write!(f, "ABSENT"),
            AttendanceStatus::OnLeave => write!(f, "ON_LEAVE"),
        }
    }
}

impl AttendanceStatus {
    /// 从字符串解析考勤状态
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PRESENT" => Some(AttendanceStatus::Present),
            "ABSENT" => Some(AttendanceStatus::Absent),
            "ON_LEAVE" => Some(AttendanceStatus::OnLeave),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::OnLeave => "ON_LEAVE",
        }
    }
}

// ==========================================
// 代课确认状态 (Confirmation Status)
// ==========================================
// 说明: 仅 CONFIRMED 参与解析; AUTO_ASSIGNED 视为未确认
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationStatus {
    AutoAssigned, // 系统自动指派 (未确认)
    Confirmed,    // 已确认
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmationStatus::AutoAssigned => write!(f, "AUTO_ASSIGNED"),
            ConfirmationStatus::Confirmed => write!(f, "CONFIRMED"),
        }
    }
}

impl ConfirmationStatus {
    /// 从字符串解析确认状态
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "AUTO_ASSIGNED" => Some(ConfirmationStatus::AutoAssigned),
            "CONFIRMED" => Some(ConfirmationStatus::Confirmed),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ConfirmationStatus::AutoAssigned => "AUTO_ASSIGNED",
            ConfirmationStatus::Confirmed => "CONFIRMED",
        }
    }
}

// ==========================================
// 有效课位状态 (Effective Status)
// ==========================================
// 依据: Resolution_Engine_Specs 4.1 解析输出
// 红线: SUBSTITUTION_REQUIRED 是独立状态, 不等同于 FREE 或原条目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectiveStatus {
    Scheduled,            // 正常上课 (含代课/换教室/调时间后的结果)
    Free,                 // 空课
    SubstitutionRequired, // 需要安排代课 (教师缺勤且无已批准代课)
}

impl fmt::Display for EffectiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectiveStatus::Scheduled => write!(f, "SCHEDULED"),
            EffectiveStatus::Free => write!(f, "FREE"),
            EffectiveStatus::SubstitutionRequired => write!(f, "SUBSTITUTION_REQUIRED"),
        }
    }
}
