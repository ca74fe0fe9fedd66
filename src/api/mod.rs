// ==========================================
// 校园课表调度系统 - API 层
// ==========================================
// 职责: 对外暴露课表查询/编辑/变更审批接口, 供前端与运维工具调用
// ==========================================

pub mod change_api;
pub mod error;
pub mod schedule_api;
pub mod validator;

// 重导出核心类型
pub use change_api::ChangeApi;
pub use error::{ApiError, ApiResult, ValidationViolation};
pub use schedule_api::{ScheduleApi, WeeklyEditDraft};
pub use validator::WriteOperationValidator;
