// ==========================================
// 校园课表调度系统 - 核心库
// ==========================================
// 依据: Timetable_Dev_Master_Spec.md - 系统宪法
// 技术栈: Rust + SQLite
// 系统定位: 基础课表之上的叠加解析引擎 (读时合成, 写时分层)
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施 (连接初始化/PRAGMA 统一/幂等建表)
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ChangeSource, ChangeState, ChangeType, EffectiveStatus, SchoolDay,
};

// 领域实体
pub use domain::{
    ActionLog, ActionType, AttendanceRecord, BaseEntry, ChangeRecord, EffectiveEntry,
    SchoolStructure, SchoolWeek, SubstitutionConfirmation, TimeSlot, WeeklyEdit,
};

// 引擎
pub use engine::{
    ChangeDraft, ChangeLifecycleEngine, PeriodNumbering, PromotionEngine, ResolutionEngine,
    ScopeLockRegistry,
};

// API
pub use api::{ChangeApi, ScheduleApi, WeeklyEditDraft};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "校园课表调度系统";

// ==========================================
// 预编译检查
// ==========================================

// 确保编译时所有模块可见
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
