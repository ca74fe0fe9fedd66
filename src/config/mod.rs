// ==========================================
// 校园课表调度系统 - 配置层
// ==========================================
// 依据: Timetable_Dev_Master_Spec.md - PART A3 配置项全集
// ==========================================
// 职责: 系统配置管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
