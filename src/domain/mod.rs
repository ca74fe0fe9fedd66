// ==========================================
// 校园课表调度系统 - 领域模型层
// ==========================================
// 依据: Timetable_Dev_Master_Spec.md - PART C 数据与状态体系
// 依据: Resolution_Engine_Specs_v1.0.md - 3. 数据模型
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod attendance;
pub mod change;
pub mod effective;
pub mod timetable;
pub mod types;
pub mod week;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use attendance::{AttendanceRecord, SubstitutionConfirmation};
pub use change::ChangeRecord;
pub use effective::EffectiveEntry;
pub use timetable::{BaseEntry, SchoolStructure, TimeSlot, WeeklyEdit};
pub use types::{
    AttendanceStatus, ChangeSource, ChangeState, ChangeType, ConfirmationStatus, EffectiveStatus,
    SchoolDay,
};
pub use week::{date_of_day_in_week, week_monday, SchoolWeek};
