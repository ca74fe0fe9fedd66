// ==========================================
// 校园课表调度系统 - Resolution Core 纯函数库
// ==========================================
// 依据: Resolution_Engine_Specs_v1.0.md - 4.1 解析算法
// 职责: 提供单课位五步优先级解析的纯逻辑
// 红线: 无状态、无副作用、无 I/O 操作
// ==========================================

use chrono::NaiveDate;

use crate::domain::attendance::{AttendanceRecord, SubstitutionConfirmation};
use crate::domain::change::ChangeRecord;
use crate::domain::effective::EffectiveEntry;
use crate::domain::timetable::{BaseEntry, WeeklyEdit};
use crate::domain::types::{ChangeType, EffectiveStatus, SchoolDay};
use crate::domain::week::SchoolWeek;

// ==========================================
// ResolutionContext - 解析输入快照
// ==========================================
// 一致性快照: 调用方预取班级+周范围内的全部叠加层数据,
// 解析过程中不再访问存储
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    pub base_entries: Vec<BaseEntry>,
    pub weekly_edits: Vec<WeeklyEdit>,
    pub change_records: Vec<ChangeRecord>,
    pub attendance: Vec<AttendanceRecord>,
    pub confirmations: Vec<SubstitutionConfirmation>,
}

// ==========================================
// ResolutionCore - 纯函数工具类
// ==========================================
pub struct ResolutionCore;

impl ResolutionCore {
    /// 解析单个课位
    ///
    /// # 规则 (Resolution_Engine_Specs 4.1, 优先级从高到低)
    /// 1. 周编辑存在 → 终局: teacher_id 为空返回空课, 否则直接返回编辑内容
    /// 2. 无基础条目 → 空课
    /// 3. 本周 (周一至周六) 内存在生效停课 → 空课
    /// 4. 教师当日缺勤 → 已批代课/已确认代课生效, 否则待安排代课
    /// 5. 教师出勤 (或考勤未知) → 基础条目生效
    ///
    /// 教室/时间装饰性变更在步骤 4/5 的结果上最后叠加, 只改教室/时间字段
    ///
    /// # 参数
    /// - ctx: 解析输入快照 (班级+周范围预取)
    /// - class_id: 班级ID
    /// - day: 星期
    /// - period: 节次序号
    /// - reference_date: 参考日期 (定位教学周)
    ///
    /// # 返回
    /// - (EffectiveEntry, Vec<String>): 有效课位 + 决策原因
    pub fn resolve_slot(
        ctx: &ResolutionContext,
        class_id: &str,
        day: SchoolDay,
        period: i32,
        reference_date: NaiveDate,
    ) -> (EffectiveEntry, Vec<String>) {
        let mut reasons = Vec::new();
        let week = SchoolWeek::containing(reference_date);
        let slot_date = week.date_of(day);

        // 规则 1: 周编辑终局覆盖 (无视任何变更记录)
        if let Some(edit) = Self::find_weekly_edit(&ctx.weekly_edits, class_id, week, day, period) {
            return Self::resolve_from_weekly_edit(edit, class_id, day, period, slot_date, reasons);
        }

        // 规则 2: 基础条目查找
        let base = match Self::find_base_entry(&ctx.base_entries, class_id, day, period) {
            Some(base) => base,
            None => {
                reasons.push("FREE: no base entry".to_string());
                return (EffectiveEntry::free(class_id, day, period, slot_date), reasons);
            }
        };

        // 规则 3: 停课检查 (周一至周六窗口匹配)
        if let Some(cancel) = Self::find_active_cancellation(&ctx.change_records, &base.id, week) {
            reasons.push(format!(
                "CANCELLED: change_id={} change_date={}",
                cancel.id, cancel.change_date
            ));
            return (EffectiveEntry::free(class_id, day, period, slot_date), reasons);
        }

        // 规则 4/5: 缺勤代课判定, 否则基础条目生效
        let entry = if Self::is_teacher_absent(&ctx.attendance, &base.teacher_id, slot_date) {
            reasons.push(format!(
                "TEACHER_ABSENT: teacher={} date={}",
                base.teacher_id, slot_date
            ));
            Self::resolve_absent_slot(ctx, base, slot_date, &mut reasons)
        } else {
            reasons.push("BASE: teacher present".to_string());
            EffectiveEntry::scheduled(
                class_id,
                day,
                period,
                slot_date,
                base.teacher_id.clone(),
                base.subject_id.clone(),
                base.room.clone(),
                base.start_time,
                base.end_time,
            )
        };

        // 装饰性变更最后叠加 (停课已提前返回, 此处只剩上课/待代课两态)
        let entry = Self::apply_decorations(&ctx.change_records, &base.id, slot_date, entry, &mut reasons);
        (entry, reasons)
    }

    /// 周编辑终局解析
    ///
    /// # 规则
    /// - teacher_id 为空 → 本周该课位空课, 任何变更记录均不再适用
    /// - 否则直接返回编辑指定的教师/科目/教室/时间, 不叠加装饰性变更
    fn resolve_from_weekly_edit(
        edit: &WeeklyEdit,
        class_id: &str,
        day: SchoolDay,
        period: i32,
        slot_date: NaiveDate,
        mut reasons: Vec<String>,
    ) -> (EffectiveEntry, Vec<String>) {
        match edit.teacher_id.as_deref() {
            None => {
                reasons.push("WEEKLY_EDIT_CLEARED: slot freed for this week".to_string());
                (EffectiveEntry::free(class_id, day, period, slot_date), reasons)
            }
            Some(teacher_id) => {
                reasons.push(format!("WEEKLY_EDIT: terminal override teacher={}", teacher_id));
                let entry = EffectiveEntry {
                    class_id: class_id.to_string(),
                    day,
                    period,
                    date: slot_date,
                    status: EffectiveStatus::Scheduled,
                    teacher_id: Some(teacher_id.to_string()),
                    subject_id: edit.subject_id.clone(),
                    room: edit.room.clone(),
                    start_time: Some(edit.start_time),
                    end_time: Some(edit.end_time),
                    original_teacher_id: None,
                };
                (entry, reasons)
            }
        }
    }

    /// 缺勤课位的代课判定
    ///
    /// # 规则 (Resolution_Engine_Specs 4.1 步骤4)
    /// a. 已批生效的代课变更 → 代课教师生效, 科目/教室沿用原条目
    /// b. 已确认代课记录 (CONFIRMED) → 代课教师生效
    /// c. 均无 → 待安排代课 (携带原教师/科目供展示)
    fn resolve_absent_slot(
        ctx: &ResolutionContext,
        base: &BaseEntry,
        slot_date: NaiveDate,
        reasons: &mut Vec<String>,
    ) -> EffectiveEntry {
        if let Some(change) =
            Self::find_effective_substitution(&ctx.change_records, &base.id, slot_date)
        {
            if let Some(new_teacher) = change.new_teacher_id.as_deref() {
                reasons.push(format!(
                    "SUBSTITUTION: change_id={} new_teacher={}",
                    change.id, new_teacher
                ));
                return EffectiveEntry::scheduled(
                    &base.class_id,
                    base.day,
                    base.period,
                    slot_date,
                    new_teacher.to_string(),
                    base.subject_id.clone(),
                    base.room.clone(),
                    base.start_time,
                    base.end_time,
                )
                .with_original_teacher(&base.teacher_id);
            }
        }

        if let Some(conf) = Self::find_confirmed_substitute(&ctx.confirmations, &base.id, slot_date)
        {
            reasons.push(format!(
                "SUBSTITUTION_CONFIRMED: substitute={}",
                conf.substitute_teacher_id
            ));
            return EffectiveEntry::scheduled(
                &base.class_id,
                base.day,
                base.period,
                slot_date,
                conf.substitute_teacher_id.clone(),
                base.subject_id.clone(),
                base.room.clone(),
                base.start_time,
                base.end_time,
            )
            .with_original_teacher(&base.teacher_id);
        }

        reasons.push(format!(
            "SUBSTITUTION_REQUIRED: original_teacher={}",
            base.teacher_id
        ));
        EffectiveEntry::substitution_required(
            &base.class_id,
            base.day,
            base.period,
            slot_date,
            base.teacher_id.clone(),
            base.subject_id.clone(),
            base.room.clone(),
            base.start_time,
            base.end_time,
        )
    }

    /// 叠加装饰性变更 (教室/时间)
    ///
    /// # 规则
    /// - 仅覆盖教室/时间字段, 教师/科目不受影响
    /// - 按具体历日匹配, 停课/代课之后最后应用
    fn apply_decorations(
        changes: &[ChangeRecord],
        entry_id: &str,
        slot_date: NaiveDate,
        mut entry: EffectiveEntry,
        reasons: &mut Vec<String>,
    ) -> EffectiveEntry {
        let decorations = changes.iter().filter(|c| {
            c.timetable_entry_id == entry_id && c.is_active_decoration() && c.change_date == slot_date
        });
        for change in decorations {
            match change.change_type {
                ChangeType::RoomChange => {
                    if let Some(new_room) = &change.new_room {
                        reasons.push(format!(
                            "ROOM_CHANGE: change_id={} room={}",
                            change.id, new_room
                        ));
                        entry.room = Some(new_room.clone());
                    }
                }
                ChangeType::TimeChange => {
                    if change.new_start_time.is_some() || change.new_end_time.is_some() {
                        reasons.push(format!("TIME_CHANGE: change_id={}", change.id));
                        if let Some(start) = change.new_start_time {
                            entry.start_time = Some(start);
                        }
                        if let Some(end) = change.new_end_time {
                            entry.end_time = Some(end);
                        }
                    }
                }
                ChangeType::Substitution | ChangeType::Cancellation => {}
            }
        }
        entry
    }

    // ==========================================
    // 快照内查找 (纯内存过滤)
    // ==========================================

    fn find_weekly_edit<'a>(
        edits: &'a [WeeklyEdit],
        class_id: &str,
        week: SchoolWeek,
        day: SchoolDay,
        period: i32,
    ) -> Option<&'a WeeklyEdit> {
        edits.iter().find(|e| {
            e.class_id == class_id && e.week() == week && e.day == day && e.period == period
        })
    }

    fn find_base_entry<'a>(
        entries: &'a [BaseEntry],
        class_id: &str,
        day: SchoolDay,
        period: i32,
    ) -> Option<&'a BaseEntry> {
        entries
            .iter()
            .find(|b| b.class_id == class_id && b.day == day && b.period == period)
    }

    /// 停课按教学周窗口匹配 (周内任一历日的停课压制整周该课位)
    fn find_active_cancellation<'a>(
        changes: &'a [ChangeRecord],
        entry_id: &str,
        week: SchoolWeek,
    ) -> Option<&'a ChangeRecord> {
        changes.iter().find(|c| {
            c.timetable_entry_id == entry_id
                && c.is_active_cancellation()
                && week.contains_teaching_date(c.change_date)
        })
    }

    /// 代课按具体历日匹配
    fn find_effective_substitution<'a>(
        changes: &'a [ChangeRecord],
        entry_id: &str,
        slot_date: NaiveDate,
    ) -> Option<&'a ChangeRecord> {
        changes.iter().find(|c| {
            c.timetable_entry_id == entry_id
                && c.is_effective_substitution()
                && c.change_date == slot_date
        })
    }

    fn find_confirmed_substitute<'a>(
        confirmations: &'a [SubstitutionConfirmation],
        entry_id: &str,
        slot_date: NaiveDate,
    ) -> Option<&'a SubstitutionConfirmation> {
        confirmations
            .iter()
            .find(|c| c.timetable_entry_id == entry_id && c.date == slot_date && c.is_confirmed())
    }

    fn is_teacher_absent(
        attendance: &[AttendanceRecord],
        teacher_id: &str,
        slot_date: NaiveDate,
    ) -> bool {
        attendance
            .iter()
            .any(|r| r.teacher_id == teacher_id && r.is_absent_on(slot_date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{AttendanceStatus, ChangeSource, ChangeState, ConfirmationStatus};
    use chrono::{NaiveDateTime, NaiveTime};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("日期格式错误")
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").expect("时间格式错误")
    }

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("时间戳格式错误")
    }

    // 基准课位: C001 班周一第 2 节, T001 教数学, 教室 R101
    fn base_entry() -> BaseEntry {
        BaseEntry {
            id: "BE001".to_string(),
            class_id: "C001".to_string(),
            day: SchoolDay::Monday,
            period: 2,
            teacher_id: "T001".to_string(),
            subject_id: "MATH".to_string(),
            room: Some("R101".to_string()),
            start_time: t("08:50"),
            end_time: t("09:35"),
        }
    }

    fn ctx_with_base() -> ResolutionContext {
        ResolutionContext {
            base_entries: vec![base_entry()],
            ..Default::default()
        }
    }

    fn change(change_type: ChangeType, change_date: &str, state: ChangeState) -> ChangeRecord {
        let approved = !matches!(state, ChangeState::Pending);
        ChangeRecord {
            id: "CR001".to_string(),
            timetable_entry_id: "BE001".to_string(),
            change_type,
            change_date: d(change_date),
            original_teacher_id: Some("T001".to_string()),
            new_teacher_id: None,
            original_room: None,
            new_room: None,
            new_start_time: None,
            new_end_time: None,
            reason: "测试变更".to_string(),
            change_source: ChangeSource::Manual,
            state,
            approved_by: if approved {
                Some("admin".to_string())
            } else {
                None
            },
            approved_at: if approved {
                Some(ts("2024-03-01 09:00:00"))
            } else {
                None
            },
            is_active: true,
            created_at: ts("2024-03-01 08:00:00"),
        }
    }

    fn substitution(change_date: &str, state: ChangeState, new_teacher: &str) -> ChangeRecord {
        let mut record = change(ChangeType::Substitution, change_date, state);
        record.new_teacher_id = Some(new_teacher.to_string());
        record
    }

    fn absent(teacher_id: &str, date: &str) -> AttendanceRecord {
        AttendanceRecord {
            teacher_id: teacher_id.to_string(),
            date: d(date),
            status: AttendanceStatus::Absent,
            leave_start_date: None,
            leave_end_date: None,
        }
    }

    fn weekly_edit(teacher_id: Option<&str>, subject_id: Option<&str>) -> WeeklyEdit {
        WeeklyEdit {
            class_id: "C001".to_string(),
            week_start: d("2024-03-04"),
            day: SchoolDay::Monday,
            period: 2,
            teacher_id: teacher_id.map(|s| s.to_string()),
            subject_id: subject_id.map(|s| s.to_string()),
            room: Some("R305".to_string()),
            start_time: t("08:50"),
            end_time: t("09:35"),
            reason: "本周调整".to_string(),
        }
    }

    fn resolve(ctx: &ResolutionContext, reference: &str) -> (EffectiveEntry, Vec<String>) {
        ResolutionCore::resolve_slot(ctx, "C001", SchoolDay::Monday, 2, d(reference))
    }

    // ==========================================
    // 测试 1: 无叠加层时基础条目原样生效
    // ==========================================

    #[test]
    fn test_base_entry_passes_through_without_overlays() {
        let ctx = ctx_with_base();
        let (entry, reasons) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.status, EffectiveStatus::Scheduled);
        assert_eq!(entry.teacher_id.as_deref(), Some("T001"));
        assert_eq!(entry.subject_id.as_deref(), Some("MATH"));
        assert_eq!(entry.room.as_deref(), Some("R101"));
        assert_eq!(entry.date, d("2024-03-04"));
        assert!(reasons.iter().any(|r| r.starts_with("BASE:")));
    }

    #[test]
    fn test_free_when_no_base_entry() {
        let ctx = ResolutionContext::default();
        let (entry, reasons) = resolve(&ctx, "2024-03-04");

        assert!(entry.is_free());
        assert_eq!(reasons, vec!["FREE: no base entry".to_string()]);
    }

    #[test]
    fn test_slot_date_derived_from_reference_week() {
        // 参考日期为周四, 周一课位的具体历日回溯到本周一
        let ctx = ctx_with_base();
        let (entry, _) = resolve(&ctx, "2024-03-07");

        assert_eq!(entry.date, d("2024-03-04"));
    }

    // ==========================================
    // 测试 2: 周编辑终局覆盖
    // ==========================================

    #[test]
    fn test_weekly_edit_overrides_base_entry() {
        let mut ctx = ctx_with_base();
        ctx.weekly_edits.push(weekly_edit(Some("T002"), Some("ENG")));

        let (entry, reasons) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.status, EffectiveStatus::Scheduled);
        assert_eq!(entry.teacher_id.as_deref(), Some("T002"));
        assert_eq!(entry.subject_id.as_deref(), Some("ENG"));
        assert_eq!(entry.room.as_deref(), Some("R305"));
        assert!(reasons.iter().any(|r| r.starts_with("WEEKLY_EDIT:")));
    }

    #[test]
    fn test_weekly_edit_soft_delete_returns_free() {
        let mut ctx = ctx_with_base();
        ctx.weekly_edits.push(weekly_edit(None, None));

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert!(entry.is_free());
    }

    #[test]
    fn test_weekly_edit_soft_delete_wins_over_change_records() {
        // 软删除终局: 同课位同日的已批代课与停课全部失效
        let mut ctx = ctx_with_base();
        ctx.weekly_edits.push(weekly_edit(None, None));
        ctx.change_records
            .push(substitution("2024-03-04", ChangeState::Approved, "T002"));
        ctx.change_records
            .push(change(ChangeType::Cancellation, "2024-03-04", ChangeState::Pending));
        ctx.attendance.push(absent("T001", "2024-03-04"));

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert!(entry.is_free());
    }

    #[test]
    fn test_weekly_edit_is_terminal_for_decorations() {
        // 周编辑后不再叠加教室变更
        let mut ctx = ctx_with_base();
        ctx.weekly_edits.push(weekly_edit(Some("T002"), Some("ENG")));
        let mut room_change = change(ChangeType::RoomChange, "2024-03-04", ChangeState::Approved);
        room_change.new_room = Some("R999".to_string());
        ctx.change_records.push(room_change);

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.room.as_deref(), Some("R305"));
    }

    #[test]
    fn test_weekly_edit_in_other_week_ignored() {
        let mut ctx = ctx_with_base();
        let mut edit = weekly_edit(Some("T002"), Some("ENG"));
        edit.week_start = d("2024-03-11");
        ctx.weekly_edits.push(edit);

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.teacher_id.as_deref(), Some("T001"));
    }

    // ==========================================
    // 测试 3: 停课 (周窗口匹配)
    // ==========================================

    #[test]
    fn test_active_cancellation_frees_slot() {
        let mut ctx = ctx_with_base();
        ctx.change_records
            .push(change(ChangeType::Cancellation, "2024-03-04", ChangeState::Pending));

        let (entry, reasons) = resolve(&ctx, "2024-03-04");

        assert!(entry.is_free());
        assert!(reasons.iter().any(|r| r.starts_with("CANCELLED:")));
    }

    #[test]
    fn test_cancellation_matches_whole_teaching_week() {
        // 停课日期为周六, 周一参考日期仍命中同一教学周
        let mut ctx = ctx_with_base();
        ctx.change_records
            .push(change(ChangeType::Cancellation, "2024-03-09", ChangeState::Pending));

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert!(entry.is_free());
    }

    #[test]
    fn test_cancellation_in_other_week_ignored() {
        let mut ctx = ctx_with_base();
        ctx.change_records
            .push(change(ChangeType::Cancellation, "2024-03-11", ChangeState::Pending));

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.status, EffectiveStatus::Scheduled);
    }

    #[test]
    fn test_inactive_cancellation_ignored() {
        let mut ctx = ctx_with_base();
        let mut cancel = change(ChangeType::Cancellation, "2024-03-04", ChangeState::Pending);
        cancel.is_active = false;
        ctx.change_records.push(cancel);

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.status, EffectiveStatus::Scheduled);
    }

    #[test]
    fn test_cancellation_beats_substitution() {
        // 停课优先于代课: 已停课的课位没有教师可代
        let mut ctx = ctx_with_base();
        ctx.change_records
            .push(change(ChangeType::Cancellation, "2024-03-04", ChangeState::Pending));
        ctx.change_records
            .push(substitution("2024-03-04", ChangeState::Approved, "T002"));
        ctx.attendance.push(absent("T001", "2024-03-04"));

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert!(entry.is_free());
    }

    // ==========================================
    // 测试 4: 缺勤与代课判定
    // ==========================================

    #[test]
    fn test_absent_without_substitution_requires_substitute() {
        let mut ctx = ctx_with_base();
        ctx.attendance.push(absent("T001", "2024-03-04"));

        let (entry, reasons) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.status, EffectiveStatus::SubstitutionRequired);
        assert_eq!(entry.teacher_id, None);
        assert_eq!(entry.original_teacher_id.as_deref(), Some("T001"));
        assert_eq!(entry.subject_id.as_deref(), Some("MATH"));
        assert!(reasons.iter().any(|r| r.starts_with("SUBSTITUTION_REQUIRED:")));
    }

    #[test]
    fn test_approved_substitution_resolves_substitute_teacher() {
        let mut ctx = ctx_with_base();
        ctx.attendance.push(absent("T001", "2024-03-04"));
        ctx.change_records
            .push(substitution("2024-03-04", ChangeState::Approved, "T002"));

        let (entry, reasons) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.status, EffectiveStatus::Scheduled);
        assert_eq!(entry.teacher_id.as_deref(), Some("T002"));
        assert_eq!(entry.subject_id.as_deref(), Some("MATH"));
        assert_eq!(entry.original_teacher_id.as_deref(), Some("T001"));
        assert!(reasons.iter().any(|r| r.starts_with("SUBSTITUTION:")));
    }

    #[test]
    fn test_pending_substitution_does_not_resolve() {
        // 未批代课不改变解析结果, 课位仍为待安排代课
        let mut ctx = ctx_with_base();
        ctx.attendance.push(absent("T001", "2024-03-04"));
        ctx.change_records
            .push(substitution("2024-03-04", ChangeState::Pending, "T002"));

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.status, EffectiveStatus::SubstitutionRequired);
    }

    #[test]
    fn test_dismissed_substitution_still_resolves() {
        // 隐藏仅影响通知列表, 排课效力保持
        let mut ctx = ctx_with_base();
        ctx.attendance.push(absent("T001", "2024-03-04"));
        ctx.change_records
            .push(substitution("2024-03-04", ChangeState::Dismissed, "T002"));

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.teacher_id.as_deref(), Some("T002"));
    }

    #[test]
    fn test_substitution_on_other_date_ignored() {
        let mut ctx = ctx_with_base();
        ctx.attendance.push(absent("T001", "2024-03-04"));
        ctx.change_records
            .push(substitution("2024-03-11", ChangeState::Approved, "T002"));

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.status, EffectiveStatus::SubstitutionRequired);
    }

    #[test]
    fn test_confirmed_substitution_record_resolves() {
        let mut ctx = ctx_with_base();
        ctx.attendance.push(absent("T001", "2024-03-04"));
        ctx.confirmations.push(SubstitutionConfirmation {
            timetable_entry_id: "BE001".to_string(),
            substitute_teacher_id: "T003".to_string(),
            date: d("2024-03-04"),
            status: ConfirmationStatus::Confirmed,
        });

        let (entry, reasons) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.status, EffectiveStatus::Scheduled);
        assert_eq!(entry.teacher_id.as_deref(), Some("T003"));
        assert_eq!(entry.original_teacher_id.as_deref(), Some("T001"));
        assert!(reasons.iter().any(|r| r.starts_with("SUBSTITUTION_CONFIRMED:")));
    }

    #[test]
    fn test_auto_assigned_confirmation_does_not_resolve() {
        // 仅 CONFIRMED 参与解析, 自动指派不算数
        let mut ctx = ctx_with_base();
        ctx.attendance.push(absent("T001", "2024-03-04"));
        ctx.confirmations.push(SubstitutionConfirmation {
            timetable_entry_id: "BE001".to_string(),
            substitute_teacher_id: "T003".to_string(),
            date: d("2024-03-04"),
            status: ConfirmationStatus::AutoAssigned,
        });

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.status, EffectiveStatus::SubstitutionRequired);
    }

    #[test]
    fn test_change_record_takes_priority_over_confirmation() {
        let mut ctx = ctx_with_base();
        ctx.attendance.push(absent("T001", "2024-03-04"));
        ctx.change_records
            .push(substitution("2024-03-04", ChangeState::Approved, "T002"));
        ctx.confirmations.push(SubstitutionConfirmation {
            timetable_entry_id: "BE001".to_string(),
            substitute_teacher_id: "T003".to_string(),
            date: d("2024-03-04"),
            status: ConfirmationStatus::Confirmed,
        });

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.teacher_id.as_deref(), Some("T002"));
    }

    #[test]
    fn test_absence_on_other_day_does_not_affect_slot() {
        let mut ctx = ctx_with_base();
        ctx.attendance.push(absent("T001", "2024-03-05"));

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.status, EffectiveStatus::Scheduled);
        assert_eq!(entry.teacher_id.as_deref(), Some("T001"));
    }

    #[test]
    fn test_on_leave_range_covers_slot_date() {
        let mut ctx = ctx_with_base();
        ctx.attendance.push(AttendanceRecord {
            teacher_id: "T001".to_string(),
            date: d("2024-03-01"),
            status: AttendanceStatus::OnLeave,
            leave_start_date: Some(d("2024-03-01")),
            leave_end_date: Some(d("2024-03-08")),
        });

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.status, EffectiveStatus::SubstitutionRequired);
    }

    // ==========================================
    // 测试 5: 装饰性变更 (教室/时间)
    // ==========================================

    #[test]
    fn test_room_change_decorates_base_entry() {
        let mut ctx = ctx_with_base();
        let mut room_change = change(ChangeType::RoomChange, "2024-03-04", ChangeState::Pending);
        room_change.new_room = Some("R202".to_string());
        ctx.change_records.push(room_change);

        let (entry, reasons) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.room.as_deref(), Some("R202"));
        assert_eq!(entry.teacher_id.as_deref(), Some("T001"));
        assert_eq!(entry.subject_id.as_deref(), Some("MATH"));
        assert!(reasons.iter().any(|r| r.starts_with("ROOM_CHANGE:")));
    }

    #[test]
    fn test_time_change_decorates_base_entry() {
        let mut ctx = ctx_with_base();
        let mut time_change = change(ChangeType::TimeChange, "2024-03-04", ChangeState::Pending);
        time_change.new_start_time = Some(t("14:00"));
        time_change.new_end_time = Some(t("14:45"));
        ctx.change_records.push(time_change);

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.start_time, Some(t("14:00")));
        assert_eq!(entry.end_time, Some(t("14:45")));
        assert_eq!(entry.teacher_id.as_deref(), Some("T001"));
    }

    #[test]
    fn test_decoration_applies_on_substituted_entry() {
        // 换教室与代课并存: 先代课后换教室
        let mut ctx = ctx_with_base();
        ctx.attendance.push(absent("T001", "2024-03-04"));
        ctx.change_records
            .push(substitution("2024-03-04", ChangeState::Approved, "T002"));
        let mut room_change = change(ChangeType::RoomChange, "2024-03-04", ChangeState::Pending);
        room_change.id = "CR002".to_string();
        room_change.new_room = Some("R202".to_string());
        ctx.change_records.push(room_change);

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.teacher_id.as_deref(), Some("T002"));
        assert_eq!(entry.room.as_deref(), Some("R202"));
    }

    #[test]
    fn test_decoration_on_other_date_ignored() {
        let mut ctx = ctx_with_base();
        let mut room_change = change(ChangeType::RoomChange, "2024-03-05", ChangeState::Pending);
        room_change.new_room = Some("R202".to_string());
        ctx.change_records.push(room_change);

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.room.as_deref(), Some("R101"));
    }

    #[test]
    fn test_inactive_decoration_ignored() {
        let mut ctx = ctx_with_base();
        let mut room_change = change(ChangeType::RoomChange, "2024-03-04", ChangeState::Pending);
        room_change.new_room = Some("R202".to_string());
        room_change.is_active = false;
        ctx.change_records.push(room_change);

        let (entry, _) = resolve(&ctx, "2024-03-04");

        assert_eq!(entry.room.as_deref(), Some("R101"));
    }

    // ==========================================
    // 测试 6: 幂等性
    // ==========================================

    #[test]
    fn test_resolution_is_deterministic() {
        let mut ctx = ctx_with_base();
        ctx.attendance.push(absent("T001", "2024-03-04"));
        ctx.change_records
            .push(substitution("2024-03-04", ChangeState::Approved, "T002"));

        let (first, first_reasons) = resolve(&ctx, "2024-03-04");
        let (second, second_reasons) = resolve(&ctx, "2024-03-04");

        assert_eq!(first, second);
        assert_eq!(first_reasons, second_reasons);
    }
}
