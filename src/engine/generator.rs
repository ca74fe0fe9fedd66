// ==========================================
// 校园课表调度系统 - 外部排课生成器接缝
// ==========================================
// 依据: Timetable_Dev_Master_Spec.md - PART A2 外部协作接口
// 红线: 基础课表的约束求解生成属于外部系统, 本引擎只触发不实现
// ==========================================

use std::error::Error;
use std::sync::Arc;

// ==========================================
// BaseScheduleGenerator - 排课生成器 trait
// ==========================================
/// 外部约束求解排课生成器的触发接缝
///
/// 成功时返回一段生成摘要 (供审计日志记录)
pub trait BaseScheduleGenerator: Send + Sync {
    /// 触发基础课表生成
    ///
    /// `class_id` 为 None 时对全校生成
    fn generate(&self, class_id: Option<&str>) -> Result<String, Box<dyn Error + Send + Sync>>;
}

// ==========================================
// NoOpBaseScheduleGenerator - 空实现
// ==========================================
/// 默认接线: 未配置外部生成器时, 触发为记录日志的空操作
///
/// 基础课表数据由外部系统离线落库, 引擎侧不阻塞
pub struct NoOpBaseScheduleGenerator;

impl BaseScheduleGenerator for NoOpBaseScheduleGenerator {
    fn generate(&self, class_id: Option<&str>) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::info!(class_id = ?class_id, "外部排课生成器未配置, 跳过生成");
        Ok("外部排课生成器未配置, 本次触发为空操作".to_string())
    }
}

/// 便捷构造: 默认空实现的共享句柄
pub fn noop_generator() -> Arc<dyn BaseScheduleGenerator> {
    Arc::new(NoOpBaseScheduleGenerator)
}
