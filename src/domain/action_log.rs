// ==========================================
// 校园课表调度系统 - 操作日志领域模型
// ==========================================
// 依据: Timetable_Dev_Master_Spec.md - PART A3 审计增强
// 红线: 所有写入必须记录
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
// 用途: 审计追踪, 变更回溯
// 对齐: schema action_log 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    // ===== 主键 =====
    pub action_id: String,          // 日志ID (UUID)
    pub class_id: Option<String>,   // 关联班级 (系统级操作可为None)
    pub action_type: String,        // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,   // 操作时间戳
    pub actor: String,              // 操作人

    // ===== 操作负载 =====
    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)

    // ===== 影响范围 =====
    pub date_range_start: Option<chrono::NaiveDate>, // 影响开始日期 (通常为周一)
    pub date_range_end: Option<chrono::NaiveDate>,   // 影响结束日期 (通常为周日)
    pub detail: Option<String>,     // 详细描述
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    WeeklyEdit,     // 周层编辑
    CreateChange,   // 登记变更
    ApproveChange,  // 批准变更
    RejectChange,   // 驳回变更
    DismissChange,  // 隐藏变更通知
    Promote,        // 提升为基础课表
    GenerateBase,   // 触发外部课表生成
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::WeeklyEdit => "WeeklyEdit",
            ActionType::CreateChange => "CreateChange",
            ActionType::ApproveChange => "ApproveChange",
            ActionType::RejectChange => "RejectChange",
            ActionType::DismissChange => "DismissChange",
            ActionType::Promote => "Promote",
            ActionType::GenerateBase => "GenerateBase",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "WeeklyEdit" => Some(ActionType::WeeklyEdit),
            "CreateChange" => Some(ActionType::CreateChange),
            "ApproveChange" => Some(ActionType::ApproveChange),
            "RejectChange" => Some(ActionType::RejectChange),
            "DismissChange" => Some(ActionType::DismissChange),
            "Promote" => Some(ActionType::Promote),
            "GenerateBase" => Some(ActionType::GenerateBase),
            _ => None,
        }
    }
}

// ==========================================
// ActionLog 辅助方法
// ==========================================
impl ActionLog {
    /// 创建新的操作日志
    ///
    /// # 参数
    /// - `action_id`: 日志ID (通常使用UUID)
    /// - `class_id`: 关联班级ID (可选)
    /// - `action_type`: 操作类型
    /// - `actor`: 操作人
    pub fn new(
        action_id: String,
        class_id: Option<String>,
        action_type: &str,
        actor: String,
    ) -> Self {
        Self {
            action_id,
            class_id,
            action_type: action_type.to_string(),
            action_ts: chrono::Utc::now().naive_utc(),
            actor,
            payload_json: None,
            date_range_start: None,
            date_range_end: None,
            detail: None,
        }
    }

    /// 设置操作负载 (转换为JSON)
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload_json = serde_json::to_value(payload).ok();
        self
    }

    /// 设置影响日期范围
    pub fn with_date_range(
        mut self,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    ) -> Self {
        self.date_range_start = Some(start);
        self.date_range_end = Some(end);
        self
    }

    /// 设置详细描述
    pub fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}
