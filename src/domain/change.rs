// ==========================================
// 校园课表调度系统 - 变更记录领域模型
// ==========================================
// 依据: Resolution_Engine_Specs_v1.0.md - 4.2 变更审批生命周期
// 红线: state 为单一权威状态; approved_by/is_active 仅作兼容冗余
// ==========================================

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::types::{ChangeSource, ChangeState, ChangeType};

// ==========================================
// ChangeRecord - 变更记录
// ==========================================
// 用途: 可审批的课表偏差 (代课/停课/换教室/调时间), 作用于单个历日
// 红线: 同一 (timetable_entry_id, change_date) 至多一条生效中的停课记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    // ===== 主键 =====
    pub id: String,                          // 变更ID (UUID)

    // ===== 关联与作用域 =====
    pub timetable_entry_id: String,          // 关联基础课表条目ID
    pub change_type: ChangeType,             // 变更类型
    pub change_date: NaiveDate,              // 变更日期 (具体历日)

    // ===== 结构化引用 (禁止从 reason 文本反推) =====
    pub original_teacher_id: Option<String>, // 原教师ID
    pub new_teacher_id: Option<String>,      // 新教师ID (代课)
    pub original_room: Option<String>,       // 原教室
    pub new_room: Option<String>,            // 新教室 (换教室)
    pub new_start_time: Option<NaiveTime>,   // 新开始时间 (调时间)
    pub new_end_time: Option<NaiveTime>,     // 新结束时间 (调时间)

    // ===== 展示信息 =====
    pub reason: String,                      // 变更原因 (仅展示, 不参与解析)

    // ===== 来源与生命周期 =====
    pub change_source: ChangeSource,         // 变更来源
    pub state: ChangeState,                  // 权威状态 (PENDING/APPROVED/DISMISSED)
    pub approved_by: Option<String>,         // 审批人 (与 state 保持一致)
    pub approved_at: Option<NaiveDateTime>,  // 审批时间
    pub is_active: bool,                     // 是否生效 (与 state 保持一致)
    pub created_at: NaiveDateTime,           // 创建时间
}

impl ChangeRecord {
    /// 判断是否待审批
    pub fn is_pending(&self) -> bool {
        self.state == ChangeState::Pending
    }

    /// 判断是否已批准 (含已隐藏)
    pub fn is_approved(&self) -> bool {
        matches!(self.state, ChangeState::Approved | ChangeState::Dismissed)
    }

    /// 判断是否已从通知列表隐藏
    pub fn is_dismissed(&self) -> bool {
        self.state == ChangeState::Dismissed
    }

    /// 判断代课是否已获批生效
    ///
    /// 规则: 代课必须经审批才改变解析结果; Dismissed 仅影响通知可见性,
    /// 排课效力不变
    pub fn is_effective_substitution(&self) -> bool {
        self.change_type == ChangeType::Substitution && self.is_approved() && self.is_active
    }

    /// 判断是否为生效中的停课
    ///
    /// 规则: 停课按 is_active 判定, 不要求审批; 待审批的停课已经
    /// 压制课位, 驳回 (删除) 后课位恢复
    pub fn is_active_cancellation(&self) -> bool {
        self.change_type == ChangeType::Cancellation && self.is_active
    }

    /// 判断是否为生效中的教室/时间装饰性变更
    pub fn is_active_decoration(&self) -> bool {
        matches!(
            self.change_type,
            ChangeType::RoomChange | ChangeType::TimeChange
        ) && self.is_active
    }
}
