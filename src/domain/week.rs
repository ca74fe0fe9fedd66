// ==========================================
// 校园课表调度系统 - 教学周值类型
// ==========================================
// 依据: Timetable_Dev_Master_Spec.md - PART A4 日期红线
// 红线: 周以周一为锚点; 周日偏移 +6; 禁止字符串日期比较
// ==========================================

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::types::SchoolDay;

/// 计算给定日期所在周的周一
pub fn week_monday(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday() as i64;
    date - Duration::days(offset)
}

// ==========================================
// SchoolWeek - 教学周 (周一锚定)
// ==========================================
// 用途: 周层编辑作用域、停课记录的周窗口匹配、提升操作作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchoolWeek {
    monday: NaiveDate, // 周一日期 (唯一标识)
}

impl SchoolWeek {
    /// 从周一日期构造 (非周一日期会被归一到所在周的周一)
    pub fn from_monday(date: NaiveDate) -> Self {
        Self {
            monday: week_monday(date),
        }
    }

    /// 包含给定日期的教学周
    pub fn containing(date: NaiveDate) -> Self {
        Self::from_monday(date)
    }

    /// 周一日期
    pub fn monday(&self) -> NaiveDate {
        self.monday
    }

    /// 周六日期 (教学周最后一天)
    pub fn saturday(&self) -> NaiveDate {
        self.monday + Duration::days(5)
    }

    /// 周日日期 (完整周最后一天, 偏移 +6)
    pub fn sunday(&self) -> NaiveDate {
        self.monday + Duration::days(6)
    }

    /// 本周内指定星期的具体日期
    pub fn date_of(&self, day: SchoolDay) -> NaiveDate {
        self.monday + Duration::days(day.offset_from_monday())
    }

    /// 日期是否落在本周的周一至周六窗口内
    ///
    /// 停课记录按此窗口匹配 (停课对整个教学周生效)
    pub fn contains_teaching_date(&self, date: NaiveDate) -> bool {
        date >= self.monday && date <= self.saturday()
    }

    /// 日期是否落在本周的周一至周日完整窗口内
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.monday && date <= self.sunday()
    }

    /// 下一教学周
    pub fn next(&self) -> Self {
        Self {
            monday: self.monday + Duration::days(7),
        }
    }
}

impl fmt::Display for SchoolWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.monday.format("%Y-%m-%d"))
    }
}

/// 星期名 + 参考日期 → 同一教学周内该星期的具体日期
///
/// 例: 参考日期为周四, day=周一 → 返回本周一 (向前回溯, 不跨周)
pub fn date_of_day_in_week(reference: NaiveDate, day: SchoolDay) -> NaiveDate {
    SchoolWeek::containing(reference).date_of(day)
}
