// ==========================================
// 校园课表调度系统 - 变更审批生命周期引擎
// ==========================================
// 依据: Resolution_Engine_Specs_v1.0.md - 4.2 变更审批生命周期
// 红线: state 为单一权威状态, 客户端只读不重推
// 红线: 转换竞争以条件更新的 rows_affected 判定, 败者不得自动重试
// ==========================================
// 职责: 变更登记 / 批准 / 驳回 / 隐藏
// 输入: 变更草稿与转换指令
// 输出: 落库后的变更记录 + 操作日志 + 作用域事件
// ==========================================

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::change::ChangeRecord;
use crate::domain::timetable::BaseEntry;
use crate::domain::types::{ChangeSource, ChangeState, ChangeType};
use crate::domain::week::SchoolWeek;
use crate::engine::events::{
    OptionalEventPublisher, TimetableEvent, TimetableEventPublisher, TimetableEventType,
};
use crate::engine::scope_lock::ScopeLockRegistry;
use crate::repository::{
    ActionLogRepository, BaseEntryRepository, ChangeRecordRepository, RepositoryError,
    RepositoryResult,
};

// ==========================================
// ChangeDraft - 变更登记草稿
// ==========================================
// 调用方只提交意图字段, 主键/状态/原值引用由引擎补全
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeDraft {
    pub timetable_entry_id: String,        // 目标基础课表条目
    pub change_type: ChangeType,           // 变更类型
    pub change_date: NaiveDate,            // 变更日期 (具体历日)
    pub new_teacher_id: Option<String>,    // 新教师 (代课)
    pub new_room: Option<String>,          // 新教室 (换教室)
    pub new_start_time: Option<NaiveTime>, // 新开始时间 (调时间)
    pub new_end_time: Option<NaiveTime>,   // 新结束时间 (调时间)
    pub reason: String,                    // 变更原因 (仅展示)
    pub change_source: ChangeSource,       // 变更来源
}

// ==========================================
// ChangeLifecycleEngine - 生命周期引擎
// ==========================================
pub struct ChangeLifecycleEngine {
    // 仓储依赖
    change_record_repo: Arc<ChangeRecordRepository>,
    base_entry_repo: Arc<BaseEntryRepository>,
    action_log_repo: Arc<ActionLogRepository>,

    // 并发控制
    scope_locks: Arc<ScopeLockRegistry>,

    // 事件发布器
    event_publisher: OptionalEventPublisher,
}

impl ChangeLifecycleEngine {
    /// 创建新的ChangeLifecycleEngine实例
    pub fn new(
        change_record_repo: Arc<ChangeRecordRepository>,
        base_entry_repo: Arc<BaseEntryRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        scope_locks: Arc<ScopeLockRegistry>,
        event_publisher: Option<Arc<dyn TimetableEventPublisher>>,
    ) -> Self {
        let event_publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        Self {
            change_record_repo,
            base_entry_repo,
            action_log_repo,
            scope_locks,
            event_publisher,
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 登记变更 (初始状态 PENDING)
    ///
    /// # 红线
    /// - 同一 (课位, 教学周) 至多一条生效停课
    /// - 停课/换教室/调时间登记即生效; 代课须经批准后才改变解析结果
    #[instrument(skip(self, draft), fields(entry_id = %draft.timetable_entry_id, change_type = %draft.change_type))]
    pub fn create_change(
        &self,
        draft: ChangeDraft,
        operator: &str,
    ) -> RepositoryResult<ChangeRecord> {
        // 1. 目标课位必须存在
        let entry = self.require_entry(&draft.timetable_entry_id)?;

        // 2. 写作用域检查 (提升期间拒绝写入)
        let week = SchoolWeek::containing(draft.change_date);
        self.scope_locks.ensure_writable(&entry.class_id, week.monday())?;

        // 3. 停课唯一性不变式 (按教学周窗口)
        if draft.change_type == ChangeType::Cancellation
            && self.change_record_repo.has_active_cancellation(
                &draft.timetable_entry_id,
                week.monday(),
                week.saturday(),
            )?
        {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "课位 {} 本教学周已有生效停课记录",
                draft.timetable_entry_id
            )));
        }

        // 4. 补全记录并落库
        let record = ChangeRecord {
            id: Uuid::new_v4().to_string(),
            timetable_entry_id: draft.timetable_entry_id,
            change_type: draft.change_type,
            change_date: draft.change_date,
            original_teacher_id: Some(entry.teacher_id.clone()),
            new_teacher_id: draft.new_teacher_id,
            original_room: entry.room.clone(),
            new_room: draft.new_room,
            new_start_time: draft.new_start_time,
            new_end_time: draft.new_end_time,
            reason: draft.reason,
            change_source: draft.change_source,
            state: ChangeState::Pending,
            approved_by: None,
            approved_at: None,
            is_active: true,
            created_at: Utc::now().naive_utc(),
        };
        self.change_record_repo.insert(&record)?;

        // 5. 审计与作用域事件
        self.log_action(
            ActionType::CreateChange,
            &entry.class_id,
            operator,
            &record,
            None,
        )?;
        self.publish_event(&entry.class_id, week, TimetableEventType::ChangeRecordCreated);

        tracing::info!(
            change_id = %record.id,
            class_id = %entry.class_id,
            "变更已登记"
        );
        Ok(record)
    }

    /// 批准变更 (PENDING → APPROVED)
    ///
    /// # 规则
    /// - 仅 PENDING 可批准; 竞争时先观察到 PENDING 者胜出
    /// - 对已批准记录重复调用为无副作用成功 (不得重复通知)
    /// - 记录已被删除时返回 NotFound
    #[instrument(skip(self), fields(change_id = %change_id))]
    pub fn approve_change(
        &self,
        change_id: &str,
        approver: &str,
    ) -> RepositoryResult<ChangeRecord> {
        // 1. 记录与课位定位
        let existing = self.require_change(change_id)?;
        let entry = self.require_entry(&existing.timetable_entry_id)?;
        let week = SchoolWeek::containing(existing.change_date);
        self.scope_locks.ensure_writable(&entry.class_id, week.monday())?;

        // 2. 条件转换
        let rows = self.change_record_repo.approve_pending(
            change_id,
            approver,
            Utc::now().naive_utc(),
        )?;

        // 3. 竞争判别
        if rows == 0 {
            return match self.change_record_repo.find_by_id(change_id)? {
                // 已批准 (含已隐藏): 幂等成功, 不重复通知
                Some(record) if record.is_approved() => Ok(record),
                Some(record) => Err(RepositoryError::InvalidStateTransition {
                    from: record.state.to_db_str().to_string(),
                    to: ChangeState::Approved.to_db_str().to_string(),
                }),
                None => Err(Self::change_not_found(change_id)),
            };
        }

        let record = self
            .change_record_repo
            .find_by_id(change_id)?
            .ok_or_else(|| Self::change_not_found(change_id))?;

        // 4. 审计与作用域事件 (仅首次批准触发)
        self.log_action(
            ActionType::ApproveChange,
            &entry.class_id,
            approver,
            &record,
            None,
        )?;
        self.publish_event(&entry.class_id, week, TimetableEventType::ChangeApproved);

        tracing::info!(change_id = %change_id, approver = %approver, "变更已批准");
        Ok(record)
    }

    /// 驳回变更 (PENDING → 永久删除)
    ///
    /// # 规则
    /// - 驳回是破坏性操作, 记录不保留
    /// - 非 PENDING 记录驳回失败 (InvalidStateTransition), 调用方须刷新后重新评估
    #[instrument(skip(self), fields(change_id = %change_id))]
    pub fn reject_change(
        &self,
        change_id: &str,
        reason: Option<&str>,
        operator: &str,
    ) -> RepositoryResult<()> {
        // 1. 记录与课位定位
        let existing = self.require_change(change_id)?;
        let entry = self.require_entry(&existing.timetable_entry_id)?;
        let week = SchoolWeek::containing(existing.change_date);
        self.scope_locks.ensure_writable(&entry.class_id, week.monday())?;

        // 2. 条件删除
        let rows = self.change_record_repo.delete_pending(change_id)?;

        // 3. 竞争判别
        if rows == 0 {
            return match self.change_record_repo.find_by_id(change_id)? {
                Some(record) => Err(RepositoryError::InvalidStateTransition {
                    from: record.state.to_db_str().to_string(),
                    to: "REJECTED".to_string(),
                }),
                None => Err(Self::change_not_found(change_id)),
            };
        }

        // 4. 审计与作用域事件
        let log = ActionLog::new(
            Uuid::new_v4().to_string(),
            Some(entry.class_id.clone()),
            ActionType::RejectChange.as_str(),
            operator.to_string(),
        )
        .with_payload(&json!({
            "change_id": change_id,
            "change_type": existing.change_type,
            "change_date": existing.change_date,
            "reject_reason": reason,
        }))
        .with_date_range(existing.change_date, existing.change_date);
        self.action_log_repo.insert(&log)?;
        self.publish_event(&entry.class_id, week, TimetableEventType::ChangeRejected);

        tracing::info!(change_id = %change_id, "变更已驳回并删除");
        Ok(())
    }

    /// 隐藏变更通知 (APPROVED → DISMISSED)
    ///
    /// # 规则
    /// - 仅影响通知列表可见性, 记录保留且排课效力不变
    /// - 仅 APPROVED 可隐藏
    #[instrument(skip(self), fields(change_id = %change_id))]
    pub fn dismiss_change(
        &self,
        change_id: &str,
        operator: &str,
    ) -> RepositoryResult<ChangeRecord> {
        // 1. 记录与课位定位
        let existing = self.require_change(change_id)?;
        let entry = self.require_entry(&existing.timetable_entry_id)?;
        let week = SchoolWeek::containing(existing.change_date);
        self.scope_locks.ensure_writable(&entry.class_id, week.monday())?;

        // 2. 条件转换
        let rows = self.change_record_repo.dismiss_approved(change_id)?;

        // 3. 竞争判别
        if rows == 0 {
            return match self.change_record_repo.find_by_id(change_id)? {
                Some(record) => Err(RepositoryError::InvalidStateTransition {
                    from: record.state.to_db_str().to_string(),
                    to: ChangeState::Dismissed.to_db_str().to_string(),
                }),
                None => Err(Self::change_not_found(change_id)),
            };
        }

        let record = self
            .change_record_repo
            .find_by_id(change_id)?
            .ok_or_else(|| Self::change_not_found(change_id))?;

        // 4. 审计与作用域事件
        self.log_action(
            ActionType::DismissChange,
            &entry.class_id,
            operator,
            &record,
            None,
        )?;
        self.publish_event(&entry.class_id, week, TimetableEventType::ChangeDismissed);

        tracing::info!(change_id = %change_id, "变更通知已隐藏");
        Ok(record)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn require_change(&self, change_id: &str) -> RepositoryResult<ChangeRecord> {
        self.change_record_repo
            .find_by_id(change_id)?
            .ok_or_else(|| Self::change_not_found(change_id))
    }

    fn require_entry(&self, entry_id: &str) -> RepositoryResult<BaseEntry> {
        self.base_entry_repo
            .find_by_id(entry_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "基础课表条目".to_string(),
                id: entry_id.to_string(),
            })
    }

    fn change_not_found(change_id: &str) -> RepositoryError {
        RepositoryError::NotFound {
            entity: "变更记录".to_string(),
            id: change_id.to_string(),
        }
    }

    fn log_action(
        &self,
        action_type: ActionType,
        class_id: &str,
        actor: &str,
        record: &ChangeRecord,
        detail: Option<String>,
    ) -> RepositoryResult<()> {
        let mut log = ActionLog::new(
            Uuid::new_v4().to_string(),
            Some(class_id.to_string()),
            action_type.as_str(),
            actor.to_string(),
        )
        .with_payload(&json!({
            "change_id": record.id,
            "change_type": record.change_type,
            "change_date": record.change_date,
            "new_teacher_id": record.new_teacher_id,
            "new_room": record.new_room,
        }))
        .with_date_range(record.change_date, record.change_date);
        if let Some(detail) = detail {
            log = log.with_detail(detail);
        }
        self.action_log_repo.insert(&log)?;
        Ok(())
    }

    fn publish_event(&self, class_id: &str, week: SchoolWeek, event_type: TimetableEventType) {
        let event = TimetableEvent::week_scoped(
            class_id.to_string(),
            week.monday(),
            event_type,
            Some("ChangeLifecycleEngine".to_string()),
        );
        if let Err(e) = self.event_publisher.publish(event) {
            tracing::warn!("作用域事件发布失败: {}", e);
        }
    }
}
