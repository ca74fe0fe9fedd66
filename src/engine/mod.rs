// ==========================================
// 校园课表调度系统 - 引擎层
// ==========================================
// 依据: Timetable_Dev_Master_Spec.md - PART D 引擎体系
// 依据: Resolution_Engine_Specs_v1.0.md - 1.2 模块拆分
// ==========================================
// 职责: 实现课表解析与变更规则,不拼 SQL
// 红线: Engine 不拼 SQL, 所有解析必须输出 reason
// ==========================================

pub mod events;
pub mod generator;
pub mod lifecycle;
pub mod period_numbering;
pub mod promotion;
pub mod promotion_core;
pub mod resolution;
pub mod resolution_core;
pub mod scope_lock;

// 重导出核心引擎
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, TimetableEvent, TimetableEventPublisher,
    TimetableEventType,
};
pub use generator::{noop_generator, BaseScheduleGenerator, NoOpBaseScheduleGenerator};
pub use lifecycle::{ChangeDraft, ChangeLifecycleEngine};
pub use period_numbering::PeriodNumbering;
pub use promotion::PromotionEngine;
pub use promotion_core::PromotionPlanner;
pub use resolution::ResolutionEngine;
pub use resolution_core::{ResolutionContext, ResolutionCore};
pub use scope_lock::{ScopeGuard, ScopeLockRegistry};
