// ==========================================
// 校园课表调度系统 - 数据仓储层
// ==========================================
// 依据: Timetable_Dev_Master_Spec.md - PART D 引擎铁律
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod attendance_repo;
pub mod base_entry_repo;
pub mod change_record_repo;
pub mod error;
pub mod promotion_repo;
pub mod structure_repo;
pub mod substitution_repo;
pub mod weekly_edit_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use attendance_repo::AttendanceRepository;
pub use base_entry_repo::BaseEntryRepository;
pub use change_record_repo::ChangeRecordRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use promotion_repo::{BaseRewrite, PromotionOutcome, PromotionRepository};
pub use structure_repo::StructureRepository;
pub use substitution_repo::SubstitutionConfirmationRepository;
pub use weekly_edit_repo::WeeklyEditRepository;
