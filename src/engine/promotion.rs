// ==========================================
// 校园课表调度系统 - 周课表提升引擎
// ==========================================
// 依据: Resolution_Engine_Specs_v1.0.md - 4.3 提升操作
// 红线: 改写基础课表与清理叠加层必须同事务完成
// 红线: 提升期间持有 (班级, 周) 作用域锁, 并发写入快速失败
// 红线: 回滚失败后班级进入隔离, 人工对账前拒绝一切写入
// ==========================================
// 职责: 把一周有效课表折叠进基础课表, 并清空该周叠加层
// 输入: 班级 + 参考日期
// 输出: 提升结果计数 + 操作日志 + 作用域事件
// ==========================================

use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::week::SchoolWeek;
use crate::engine::events::{
    OptionalEventPublisher, TimetableEvent, TimetableEventPublisher, TimetableEventType,
};
use crate::engine::promotion_core::PromotionPlanner;
use crate::engine::resolution::ResolutionEngine;
use crate::engine::scope_lock::ScopeLockRegistry;
use crate::repository::{
    ActionLogRepository, BaseEntryRepository, PromotionOutcome, PromotionRepository,
    RepositoryError, RepositoryResult,
};

// ==========================================
// PromotionEngine - 周课表提升引擎
// ==========================================
pub struct PromotionEngine {
    // 仓储依赖
    base_entry_repo: Arc<BaseEntryRepository>,
    promotion_repo: Arc<PromotionRepository>,
    action_log_repo: Arc<ActionLogRepository>,

    // 周解析依赖
    resolution_engine: Arc<ResolutionEngine>,

    // 并发控制
    scope_locks: Arc<ScopeLockRegistry>,

    // 事件发布器
    event_publisher: OptionalEventPublisher,
}

impl PromotionEngine {
    /// 创建新的PromotionEngine实例
    pub fn new(
        base_entry_repo: Arc<BaseEntryRepository>,
        promotion_repo: Arc<PromotionRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        resolution_engine: Arc<ResolutionEngine>,
        scope_locks: Arc<ScopeLockRegistry>,
        event_publisher: Option<Arc<dyn TimetableEventPublisher>>,
    ) -> Self {
        let event_publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        Self {
            base_entry_repo,
            promotion_repo,
            action_log_repo,
            resolution_engine,
            scope_locks,
            event_publisher,
        }
    }

    /// 提升一周: 有效课表折叠进基础课表, 清空该周叠加层
    ///
    /// # 流程
    /// 1. 取得 (班级, 周) 作用域独占锁
    /// 2. 解析整周有效课表
    /// 3. 规划基础课表改写指令 (差异驱动)
    /// 4. 原子执行改写 + 清理
    /// 5. 记录操作日志, 发布作用域事件
    ///
    /// # 幂等性
    /// 无新增编辑时重复执行, 第二次 entries_updated 为 0
    #[instrument(skip(self), fields(school_id = %school_id, class_id = %class_id, reference_date = %reference_date))]
    pub fn promote_to_global(
        &self,
        school_id: &str,
        class_id: &str,
        reference_date: NaiveDate,
        operator: &str,
    ) -> RepositoryResult<PromotionOutcome> {
        let week = SchoolWeek::containing(reference_date);

        // 1. 作用域独占锁 (守卫存续期间, 同作用域写入一律 ScopeConflict)
        let _guard = self.scope_locks.try_lock(class_id, week.monday())?;

        // 2. 整周有效课表
        let effective = self
            .resolution_engine
            .resolve_class_week(school_id, class_id, reference_date)?;

        // 3. 差异规划
        let current = self.base_entry_repo.find_by_class(class_id)?;
        let (rewrites, reasons) = PromotionPlanner::plan_rewrites(class_id, &effective, &current);
        tracing::debug!(
            class_id = %class_id,
            week_start = %week.monday(),
            rewrite_count = rewrites.len(),
            reasons = ?reasons,
            "提升差异规划完成"
        );

        // 4. 原子改写 + 清理 (变更记录按周一至周日窗口清除)
        let outcome = match self.promotion_repo.apply_week_promotion(
            class_id,
            week.monday(),
            week.sunday(),
            &rewrites,
        ) {
            Ok(outcome) => outcome,
            Err(e @ RepositoryError::InconsistentState(_)) => {
                // 回滚失败, 基础课表与叠加层可能已分叉
                if let Err(qe) = self.scope_locks.quarantine_class(class_id) {
                    tracing::error!("标记班级停写失败: {}", qe);
                }
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        // 5. 审计与作用域事件
        let log = ActionLog::new(
            Uuid::new_v4().to_string(),
            Some(class_id.to_string()),
            ActionType::Promote.as_str(),
            operator.to_string(),
        )
        .with_payload(&json!({
            "week_start": week.monday(),
            "entries_updated": outcome.entries_updated,
            "entries_deleted": outcome.entries_deleted,
            "weekly_edits_cleared": outcome.weekly_edits_cleared,
            "change_records_cleared": outcome.change_records_cleared,
        }))
        .with_date_range(week.monday(), week.sunday());
        self.action_log_repo.insert(&log)?;

        let event = TimetableEvent::week_scoped(
            class_id.to_string(),
            week.monday(),
            TimetableEventType::SchedulePromoted,
            Some("PromotionEngine".to_string()),
        );
        if let Err(e) = self.event_publisher.publish(event) {
            tracing::warn!("作用域事件发布失败: {}", e);
        }

        tracing::info!(
            class_id = %class_id,
            week_start = %week.monday(),
            entries_updated = outcome.entries_updated,
            weekly_edits_cleared = outcome.weekly_edits_cleared,
            change_records_cleared = outcome.change_records_cleared,
            "周课表提升完成"
        );
        Ok(outcome)
    }
}
