// ==========================================
// 校园课表调度系统 - 叠加解析引擎
// ==========================================
// 依据: Resolution_Engine_Specs_v1.0.md - 4.1 解析算法
// 红线: 解析为只读纯计算, 可任意并发与重复调用
// ==========================================
// 职责: 装配一致性快照 + 班级/教师视角网格解析
// 输入: 基础课表 + 周编辑 + 变更记录 + 考勤 + 代课确认
// 输出: 有效课位列表 (派生结果, 永不落库)
// ==========================================

use chrono::{Datelike, NaiveDate};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;

use crate::domain::effective::EffectiveEntry;
use crate::domain::timetable::SchoolStructure;
use crate::domain::types::SchoolDay;
use crate::domain::week::SchoolWeek;
use crate::engine::resolution_core::{ResolutionContext, ResolutionCore};
use crate::repository::{
    AttendanceRepository, BaseEntryRepository, ChangeRecordRepository, RepositoryError,
    RepositoryResult, StructureRepository, SubstitutionConfirmationRepository,
    WeeklyEditRepository,
};

// ==========================================
// ResolutionEngine - 叠加解析引擎
// ==========================================
pub struct ResolutionEngine {
    // 仓储依赖
    structure_repo: Arc<StructureRepository>,
    base_entry_repo: Arc<BaseEntryRepository>,
    weekly_edit_repo: Arc<WeeklyEditRepository>,
    change_record_repo: Arc<ChangeRecordRepository>,
    attendance_repo: Arc<AttendanceRepository>,
    substitution_repo: Arc<SubstitutionConfirmationRepository>,
}

impl ResolutionEngine {
    /// 创建新的ResolutionEngine实例
    pub fn new(
        structure_repo: Arc<StructureRepository>,
        base_entry_repo: Arc<BaseEntryRepository>,
        weekly_edit_repo: Arc<WeeklyEditRepository>,
        change_record_repo: Arc<ChangeRecordRepository>,
        attendance_repo: Arc<AttendanceRepository>,
        substitution_repo: Arc<SubstitutionConfirmationRepository>,
    ) -> Self {
        Self {
            structure_repo,
            base_entry_repo,
            weekly_edit_repo,
            change_record_repo,
            attendance_repo,
            substitution_repo,
        }
    }

    /// 装配班级某教学周的解析快照
    ///
    /// 一次性预取全部叠加层数据, 解析阶段不再访问存储;
    /// 变更/考勤/确认按完整周窗口 (周一至周日) 预取, 精确匹配由纯核心完成
    pub fn load_class_context(
        &self,
        class_id: &str,
        week: SchoolWeek,
    ) -> RepositoryResult<ResolutionContext> {
        let base_entries = self.base_entry_repo.find_by_class(class_id)?;
        let weekly_edits = self
            .weekly_edit_repo
            .find_by_class_week(class_id, week.monday())?;
        let change_records = self.change_record_repo.find_by_class_date_range(
            class_id,
            week.monday(),
            week.sunday(),
        )?;
        let attendance = self
            .attendance_repo
            .find_for_date_range(week.monday(), week.sunday())?;
        let confirmations = self.substitution_repo.find_by_class_date_range(
            class_id,
            week.monday(),
            week.sunday(),
        )?;

        Ok(ResolutionContext {
            base_entries,
            weekly_edits,
            change_records,
            attendance,
            confirmations,
        })
    }

    /// 解析单个课位 (含决策原因)
    #[instrument(skip(self), fields(class_id = %class_id, day = %day, period = %period))]
    pub fn resolve_slot(
        &self,
        class_id: &str,
        day: SchoolDay,
        period: i32,
        reference_date: NaiveDate,
    ) -> RepositoryResult<(EffectiveEntry, Vec<String>)> {
        let week = SchoolWeek::containing(reference_date);
        let ctx = self.load_class_context(class_id, week)?;
        Ok(ResolutionCore::resolve_slot(
            &ctx,
            class_id,
            day,
            period,
            reference_date,
        ))
    }

    /// 解析班级整周课表
    ///
    /// 网格 = 工作日 × 教学节次 (课间节次不承载内容, 不输出)
    #[instrument(skip(self), fields(school_id = %school_id, class_id = %class_id, reference_date = %reference_date))]
    pub fn resolve_class_week(
        &self,
        school_id: &str,
        class_id: &str,
        reference_date: NaiveDate,
    ) -> RepositoryResult<Vec<EffectiveEntry>> {
        let structure = self.require_structure(school_id)?;
        let week = SchoolWeek::containing(reference_date);
        let ctx = self.load_class_context(class_id, week)?;

        let mut entries = Vec::new();
        for day in &structure.working_days {
            for slot in structure.time_slots.iter().filter(|s| s.is_teaching()) {
                let (entry, reasons) =
                    ResolutionCore::resolve_slot(&ctx, class_id, *day, slot.period, reference_date);
                tracing::debug!(
                    class_id = %class_id,
                    day = %day,
                    period = %slot.period,
                    status = %entry.status,
                    reasons = ?reasons,
                    "课位解析完成"
                );
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// 解析班级单日课表
    ///
    /// 非工作日返回空列表
    #[instrument(skip(self), fields(school_id = %school_id, class_id = %class_id, date = %date))]
    pub fn resolve_class_date(
        &self,
        school_id: &str,
        class_id: &str,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<EffectiveEntry>> {
        let structure = self.require_structure(school_id)?;
        let day = Self::day_of_date(date)?;
        if !structure.is_working_day(day) {
            return Ok(Vec::new());
        }

        let week = SchoolWeek::containing(date);
        let ctx = self.load_class_context(class_id, week)?;

        let mut entries = Vec::new();
        for slot in structure.time_slots.iter().filter(|s| s.is_teaching()) {
            let (entry, _) = ResolutionCore::resolve_slot(&ctx, class_id, day, slot.period, date);
            entries.push(entry);
        }
        Ok(entries)
    }

    /// 解析教师整周课表
    ///
    /// 候选课位来源: 教师的基础条目 + 指定其授课的周编辑 +
    /// 指派其代课的已批变更与已确认记录; 每个候选课位在所属班级
    /// 上下文内解析, 仅保留解析后确与该教师相关的课位
    #[instrument(skip(self), fields(school_id = %school_id, teacher_id = %teacher_id, reference_date = %reference_date))]
    pub fn resolve_teacher_week(
        &self,
        school_id: &str,
        teacher_id: &str,
        reference_date: NaiveDate,
    ) -> RepositoryResult<Vec<EffectiveEntry>> {
        let structure = self.require_structure(school_id)?;
        let week = SchoolWeek::containing(reference_date);

        // 1. 收集候选课位 (class_id, day, period)
        let mut candidates: HashSet<(String, SchoolDay, i32)> = HashSet::new();

        for entry in self.base_entry_repo.find_by_teacher(teacher_id)? {
            candidates.insert((entry.class_id, entry.day, entry.period));
        }
        for edit in self
            .weekly_edit_repo
            .find_by_teacher_week(teacher_id, week.monday())?
        {
            candidates.insert((edit.class_id, edit.day, edit.period));
        }
        for change in self.change_record_repo.find_substitutions_for_teacher(
            teacher_id,
            week.monday(),
            week.sunday(),
        )? {
            if let Some(entry) = self.base_entry_repo.find_by_id(&change.timetable_entry_id)? {
                candidates.insert((entry.class_id, entry.day, entry.period));
            }
        }
        for conf in self.substitution_repo.find_confirmed_for_substitute(
            teacher_id,
            week.monday(),
            week.sunday(),
        )? {
            if let Some(entry) = self.base_entry_repo.find_by_id(&conf.timetable_entry_id)? {
                candidates.insert((entry.class_id, entry.day, entry.period));
            }
        }

        // 2. 按班级装配上下文并解析, 保留与该教师相关的结果
        let mut contexts: HashMap<String, ResolutionContext> = HashMap::new();
        let mut entries = Vec::new();
        for (class_id, day, period) in candidates {
            if !structure.is_working_day(day) || !structure.has_period(period) {
                continue;
            }
            let ctx = match contexts.entry(class_id.clone()) {
                Entry::Occupied(occupied) => occupied.into_mut(),
                Entry::Vacant(vacant) => {
                    let loaded = self.load_class_context(vacant.key(), week)?;
                    vacant.insert(loaded)
                }
            };
            let (entry, _) =
                ResolutionCore::resolve_slot(ctx, &class_id, day, period, reference_date);
            if Self::involves_teacher(&entry, teacher_id) {
                entries.push(entry);
            }
        }

        entries.sort_by_key(|e| (e.day, e.period));
        Ok(entries)
    }

    /// 解析教师单日课表
    pub fn resolve_teacher_date(
        &self,
        school_id: &str,
        teacher_id: &str,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<EffectiveEntry>> {
        let entries = self.resolve_teacher_week(school_id, teacher_id, date)?;
        Ok(entries.into_iter().filter(|e| e.date == date).collect())
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn require_structure(&self, school_id: &str) -> RepositoryResult<SchoolStructure> {
        self.structure_repo
            .get_structure(school_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "学校作息结构".to_string(),
                id: school_id.to_string(),
            })
    }

    fn day_of_date(date: NaiveDate) -> RepositoryResult<SchoolDay> {
        let offset = date.weekday().num_days_from_monday() as i64;
        SchoolDay::from_offset(offset).ok_or_else(|| RepositoryError::FieldValueError {
            field: "date".to_string(),
            message: format!("无法映射日期到星期: {}", date),
        })
    }

    /// 解析结果是否与教师相关: 生效教师为本人, 或本人课位待安排代课
    fn involves_teacher(entry: &EffectiveEntry, teacher_id: &str) -> bool {
        if entry.teacher_id.as_deref() == Some(teacher_id) {
            return true;
        }
        entry.needs_substitution() && entry.original_teacher_id.as_deref() == Some(teacher_id)
    }
}
