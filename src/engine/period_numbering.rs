// ==========================================
// 校园课表调度系统 - 教学节次编号纯函数库
// ==========================================
// 依据: Resolution_Engine_Specs_v1.0.md - 4.4 教学节次编号
// 红线: 每次调用基于当前结构重新计算, 禁止按条目缓存
// ==========================================

use crate::domain::timetable::TimeSlot;

// ==========================================
// PeriodNumbering - 纯函数工具类
// ==========================================
pub struct PeriodNumbering;

impl PeriodNumbering {
    /// 计算教学节次编号
    ///
    /// # 规则
    /// - 统计 period <= target_period 且非课间的节次数量
    /// - 课间节次永不获得教学编号
    ///
    /// # 参数
    /// - slots: 当前作息结构的节次列表
    /// - target_period: 目标节次序号 (结构序)
    pub fn teaching_period_number(slots: &[TimeSlot], target_period: i32) -> i32 {
        slots
            .iter()
            .filter(|s| s.is_teaching() && s.period <= target_period)
            .count() as i32
    }

    /// 节次展示标签
    ///
    /// # 规则
    /// - 课间节次 → 字面量 "Break"
    /// - 教学节次 → 教学编号十进制字符串
    /// - 结构外节次 → 原始序号字符串 (不猜测课间属性)
    pub fn period_label(slots: &[TimeSlot], target_period: i32) -> String {
        match slots.iter().find(|s| s.period == target_period) {
            Some(slot) if slot.is_break => "Break".to_string(),
            Some(_) => Self::teaching_period_number(slots, target_period).to_string(),
            None => target_period.to_string(),
        }
    }
}
