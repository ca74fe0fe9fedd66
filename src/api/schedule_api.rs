// ==========================================
// 校园课表调度系统 - 课表 API
// ==========================================
// 依据: Timetable_Dev_Master_Spec.md PART A2 课表视图 / PART A4 周层编辑
// 红线: API 层只做校验与编排, 叠加解析一律委托 ResolutionEngine
// 红线: 周层编辑免审直接落库, 解析时由已批变更压制
// ==========================================
// 职责: 有效课表查询 / 周层编辑 / 提升触发 / 外部生成触发
// 输入: 前端或调用方提交的查询参数与编辑草稿
// 输出: 解析后的有效课位 / 提升结果 / 操作日志与事件
// ==========================================

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::WriteOperationValidator;
use crate::config::ConfigManager;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::effective::EffectiveEntry;
use crate::domain::timetable::{SchoolStructure, WeeklyEdit};
use crate::domain::types::SchoolDay;
use crate::domain::week::SchoolWeek;
use crate::engine::events::{
    OptionalEventPublisher, TimetableEvent, TimetableEventPublisher, TimetableEventType,
};
use crate::engine::generator::BaseScheduleGenerator;
use crate::engine::promotion::PromotionEngine;
use crate::engine::resolution::ResolutionEngine;
use crate::engine::scope_lock::ScopeLockRegistry;
use crate::repository::{
    ActionLogRepository, PromotionOutcome, StructureRepository, WeeklyEditRepository,
};

// ==========================================
// WeeklyEditDraft - 周层编辑草稿
// ==========================================
// 调用方提交意图字段; 周键归一化与缺省时间补全由 API 完成
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyEditDraft {
    pub class_id: String,                  // 目标班级
    pub week_start: NaiveDate,             // 目标周内任意日期 (落库前归一化为周一)
    pub day: SchoolDay,                    // 星期
    pub period: i32,                       // 节次
    pub teacher_id: Option<String>,        // 教师 (None = 释放课位)
    pub subject_id: Option<String>,        // 科目 (与教师同全同空)
    pub room: Option<String>,              // 教室 (可选)
    pub start_time: Option<NaiveTime>,     // 开始时间 (None = 沿用作息结构)
    pub end_time: Option<NaiveTime>,       // 结束时间 (None = 沿用作息结构)
    pub reason: String,                    // 编辑原因 (仅展示)
}

// ==========================================
// ScheduleApi - 课表 API
// ==========================================
pub struct ScheduleApi {
    // 仓储依赖
    structure_repo: Arc<StructureRepository>,
    weekly_edit_repo: Arc<WeeklyEditRepository>,
    action_log_repo: Arc<ActionLogRepository>,

    // 引擎依赖
    resolution_engine: Arc<ResolutionEngine>,
    promotion_engine: Arc<PromotionEngine>,
    generator: Arc<dyn BaseScheduleGenerator>,

    // 校验与配置
    validator: Arc<WriteOperationValidator>,
    config_manager: Arc<ConfigManager>,

    // 并发控制
    scope_locks: Arc<ScopeLockRegistry>,

    // 事件发布器
    event_publisher: OptionalEventPublisher,
}

impl ScheduleApi {
    /// 创建新的ScheduleApi实例
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        structure_repo: Arc<StructureRepository>,
        weekly_edit_repo: Arc<WeeklyEditRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        resolution_engine: Arc<ResolutionEngine>,
        promotion_engine: Arc<PromotionEngine>,
        generator: Arc<dyn BaseScheduleGenerator>,
        validator: Arc<WriteOperationValidator>,
        config_manager: Arc<ConfigManager>,
        scope_locks: Arc<ScopeLockRegistry>,
        event_publisher: Option<Arc<dyn TimetableEventPublisher>>,
    ) -> Self {
        let event_publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        Self {
            structure_repo,
            weekly_edit_repo,
            action_log_repo,
            resolution_engine,
            promotion_engine,
            generator,
            validator,
            config_manager,
            scope_locks,
            event_publisher,
        }
    }

    // ==========================================
    // 有效课表查询
    // ==========================================

    /// 查询默认学校的作息结构 (工作日与节次定义, 供网格渲染)
    pub fn school_structure(&self) -> ApiResult<SchoolStructure> {
        let school_id = self.config_manager.get_default_school_id()?;
        self.structure_repo
            .get_structure(&school_id)?
            .ok_or_else(|| ApiError::NotFound(format!("学校作息结构(id={})不存在", school_id)))
    }

    /// 查询班级整周有效课表
    ///
    /// # 参数
    /// - `class_id`: 班级ID
    /// - `reference_date`: 周内任意日期 (定位教学周)
    ///
    /// # 返回
    /// 工作日 × 教学节次的全网格有效课位
    pub fn effective_class_week(
        &self,
        class_id: &str,
        reference_date: NaiveDate,
    ) -> ApiResult<Vec<EffectiveEntry>> {
        if class_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("班级ID不能为空".to_string()));
        }
        let school_id = self.config_manager.get_default_school_id()?;
        Ok(self
            .resolution_engine
            .resolve_class_week(&school_id, class_id, reference_date)?)
    }

    /// 查询班级单日有效课表 (非工作日返回空列表)
    pub fn effective_class_date(
        &self,
        class_id: &str,
        date: NaiveDate,
    ) -> ApiResult<Vec<EffectiveEntry>> {
        if class_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("班级ID不能为空".to_string()));
        }
        let school_id = self.config_manager.get_default_school_id()?;
        Ok(self
            .resolution_engine
            .resolve_class_date(&school_id, class_id, date)?)
    }

    /// 查询教师整周有效课表
    ///
    /// 仅包含解析后确与该教师相关的课位: 生效教师为本人,
    /// 或本人缺勤待安排代课的课位
    pub fn effective_teacher_week(
        &self,
        teacher_id: &str,
        reference_date: NaiveDate,
    ) -> ApiResult<Vec<EffectiveEntry>> {
        if teacher_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("教师ID不能为空".to_string()));
        }
        let school_id = self.config_manager.get_default_school_id()?;
        Ok(self
            .resolution_engine
            .resolve_teacher_week(&school_id, teacher_id, reference_date)?)
    }

    /// 查询教师单日有效课表
    pub fn effective_teacher_date(
        &self,
        teacher_id: &str,
        date: NaiveDate,
    ) -> ApiResult<Vec<EffectiveEntry>> {
        if teacher_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("教师ID不能为空".to_string()));
        }
        let school_id = self.config_manager.get_default_school_id()?;
        Ok(self
            .resolution_engine
            .resolve_teacher_date(&school_id, teacher_id, date)?)
    }

    // ==========================================
    // 周层编辑
    // ==========================================

    /// 应用周层编辑 (免审, 同课位覆盖)
    ///
    /// # 参数
    /// - `draft`: 编辑草稿 (week_start 可为周内任意日期)
    /// - `operator`: 操作人
    ///
    /// # 返回
    /// 落库后重新解析的该课位有效结果
    #[instrument(skip(self, draft), fields(class_id = %draft.class_id, day = %draft.day, period = %draft.period))]
    pub fn apply_weekly_edit(
        &self,
        draft: WeeklyEditDraft,
        operator: &str,
    ) -> ApiResult<EffectiveEntry> {
        if draft.class_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("班级ID不能为空".to_string()));
        }
        if operator.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }

        let school_id = self.config_manager.get_default_school_id()?;

        // 1. 结构校验 (成对约束 / 节次 / 工作日)
        self.validator.validate_weekly_edit(&school_id, &draft)?;

        // 2. 周键归一化: 任意日期归一化为所属周的周一
        let week = SchoolWeek::containing(draft.week_start);

        // 3. 提升窗口互斥检查
        self.scope_locks
            .ensure_writable(&draft.class_id, week.monday())?;

        // 4. 缺省时间补全: 未指定时沿用作息结构的节次时间
        let structure = self
            .structure_repo
            .get_structure(&school_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!("学校作息结构(id={})不存在", school_id))
            })?;
        let slot = structure.slot(draft.period).ok_or_else(|| {
            ApiError::InternalError(format!("节次 {} 通过校验后在作息结构中缺失", draft.period))
        })?;

        let edit = WeeklyEdit {
            class_id: draft.class_id.clone(),
            week_start: week.monday(),
            day: draft.day,
            period: draft.period,
            teacher_id: draft.teacher_id.clone(),
            subject_id: draft.subject_id.clone(),
            room: draft.room.clone(),
            start_time: draft.start_time.unwrap_or(slot.start_time),
            end_time: draft.end_time.unwrap_or(slot.end_time),
            reason: draft.reason.clone(),
        };

        // 5. 落库 (同课位覆盖)
        self.weekly_edit_repo.upsert(&edit)?;

        // 6. 操作日志
        let log = ActionLog::new(
            Uuid::new_v4().to_string(),
            Some(draft.class_id.clone()),
            ActionType::WeeklyEdit.as_str(),
            operator.to_string(),
        )
        .with_payload(&json!({
            "week_start": week.monday(),
            "day": draft.day,
            "period": draft.period,
            "teacher_id": draft.teacher_id,
            "subject_id": draft.subject_id,
            "room": draft.room,
        }))
        .with_date_range(week.monday(), week.saturday())
        .with_detail(draft.reason.clone());
        self.action_log_repo.insert(&log)?;

        // 7. 作用域事件
        let event = TimetableEvent::week_scoped(
            draft.class_id.clone(),
            week.monday(),
            TimetableEventType::WeeklyEditApplied,
            Some("ScheduleApi".to_string()),
        );
        if let Err(e) = self.event_publisher.publish(event) {
            tracing::warn!(error = %e, "周编辑事件发布失败, 不影响已落库的编辑");
        }

        // 8. 返回该课位落库后的解析结果
        let slot_date = week.date_of(draft.day);
        let (entry, reasons) = self.resolution_engine.resolve_slot(
            &draft.class_id,
            draft.day,
            draft.period,
            slot_date,
        )?;
        tracing::info!(
            class_id = %draft.class_id,
            day = %draft.day,
            period = %draft.period,
            status = %entry.status,
            reasons = ?reasons,
            "周层编辑已应用"
        );
        Ok(entry)
    }

    // ==========================================
    // 提升与外部生成
    // ==========================================

    /// 将某班某教学周的有效课表提升为基础课表
    ///
    /// # 参数
    /// - `class_id`: 班级ID
    /// - `reference_date`: 周内任意日期 (定位教学周)
    /// - `operator`: 操作人
    pub fn promote_to_global(
        &self,
        class_id: &str,
        reference_date: NaiveDate,
        operator: &str,
    ) -> ApiResult<PromotionOutcome> {
        if class_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("班级ID不能为空".to_string()));
        }
        if operator.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }
        let school_id = self.config_manager.get_default_school_id()?;
        Ok(self.promotion_engine.promote_to_global(
            &school_id,
            class_id,
            reference_date,
            operator,
        )?)
    }

    /// 触发外部生成器重建基础课表
    ///
    /// # 参数
    /// - `class_id`: 目标班级 (None = 全校)
    /// - `operator`: 操作人
    ///
    /// # 返回
    /// 生成器返回的摘要信息
    #[instrument(skip(self), fields(class_id = ?class_id))]
    pub fn generate_base_schedule(
        &self,
        class_id: Option<&str>,
        operator: &str,
    ) -> ApiResult<String> {
        if operator.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }

        let summary = self
            .generator
            .generate(class_id)
            .map_err(|e| ApiError::InternalError(format!("排课生成器执行失败: {}", e)))?;

        let log = ActionLog::new(
            Uuid::new_v4().to_string(),
            class_id.map(|c| c.to_string()),
            ActionType::GenerateBase.as_str(),
            operator.to_string(),
        )
        .with_detail(summary.clone());
        self.action_log_repo.insert(&log)?;

        if let Some(class_id) = class_id {
            let event = TimetableEvent::class_scoped(
                class_id.to_string(),
                TimetableEventType::BaseRegenerated,
                Some("ScheduleApi".to_string()),
            );
            if let Err(e) = self.event_publisher.publish(event) {
                tracing::warn!(error = %e, "基础课表重建事件发布失败");
            }
        }

        tracing::info!(summary = %summary, "外部课表生成已触发");
        Ok(summary)
    }
}
