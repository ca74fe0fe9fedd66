// ==========================================
// 校园课表调度系统 - 提升差异规划纯函数核心
// ==========================================
// 依据: Resolution_Engine_Specs_v1.0.md - 4.3 提升操作
// 红线: 纯函数, 无 I/O, 无状态
// 红线: 与基础课表一致的课位不产生改写指令 (幂等前提)
// ==========================================
// 职责: 对比一周有效课表与当前基础课表, 产出改写指令集
// 输入: 有效课表条目 + 当前基础课表条目
// 输出: (改写指令集, 规划理由)
// ==========================================

use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::effective::EffectiveEntry;
use crate::domain::timetable::BaseEntry;
use crate::domain::types::{EffectiveStatus, SchoolDay};
use crate::repository::BaseRewrite;

// ==========================================
// PromotionPlanner - 提升差异规划器
// ==========================================
pub struct PromotionPlanner;

impl PromotionPlanner {
    /// 规划一周提升的基础课表改写指令
    ///
    /// # 规划规则
    /// 1. Scheduled 且该课位无基础条目 → Insert (周层编辑排入了新课)
    /// 2. Scheduled 且教师/科目/教室/时间有差异 → Update
    /// 3. Free 且该课位有基础条目 → Delete
    /// 4. SubstitutionRequired → 不动 (未落实的代课需求不进基础课表)
    /// 5. 各字段与基础条目完全一致 → 不动
    pub fn plan_rewrites(
        class_id: &str,
        effective: &[EffectiveEntry],
        current: &[BaseEntry],
    ) -> (Vec<BaseRewrite>, Vec<String>) {
        let index: HashMap<(SchoolDay, i32), &BaseEntry> = current
            .iter()
            .map(|entry| ((entry.day, entry.period), entry))
            .collect();

        let mut rewrites = Vec::new();
        let mut reasons = Vec::new();

        for entry in effective {
            match entry.status {
                // 规则 4: 代课需求未落实, 缺勤属于瞬态数据
                EffectiveStatus::SubstitutionRequired => {
                    reasons.push(format!(
                        "SKIP_UNRESOLVED: day={} period={} 代课未落实, 基础课表保持不变",
                        entry.day, entry.period
                    ));
                }
                // 规则 3: 空课位删除基础条目
                EffectiveStatus::Free => {
                    if let Some(base) = index.get(&(entry.day, entry.period)) {
                        rewrites.push(BaseRewrite::Delete {
                            id: base.id.clone(),
                        });
                        reasons.push(format!(
                            "DELETE: day={} period={} 本周解析为空课",
                            entry.day, entry.period
                        ));
                    }
                }
                EffectiveStatus::Scheduled => {
                    Self::plan_scheduled_slot(class_id, entry, &index, &mut rewrites, &mut reasons);
                }
            }
        }

        (rewrites, reasons)
    }

    /// 规则 1/2/5: Scheduled 课位的新增/改写/跳过判定
    fn plan_scheduled_slot(
        class_id: &str,
        entry: &EffectiveEntry,
        index: &HashMap<(SchoolDay, i32), &BaseEntry>,
        rewrites: &mut Vec<BaseRewrite>,
        reasons: &mut Vec<String>,
    ) {
        // Scheduled 条目必须携带完整的落库字段
        let (teacher_id, subject_id, start_time, end_time) = match (
            entry.teacher_id.clone(),
            entry.subject_id.clone(),
            entry.start_time,
            entry.end_time,
        ) {
            (Some(t), Some(s), Some(st), Some(et)) => (t, s, st, et),
            _ => {
                reasons.push(format!(
                    "SKIP_INCOMPLETE: day={} period={} 有效条目缺少教师/科目/时间, 不落库",
                    entry.day, entry.period
                ));
                return;
            }
        };

        match index.get(&(entry.day, entry.period)) {
            // 规则 1: 新增
            None => {
                rewrites.push(BaseRewrite::Insert(BaseEntry {
                    id: Uuid::new_v4().to_string(),
                    class_id: class_id.to_string(),
                    day: entry.day,
                    period: entry.period,
                    teacher_id: teacher_id.clone(),
                    subject_id,
                    room: entry.room.clone(),
                    start_time,
                    end_time,
                }));
                reasons.push(format!(
                    "INSERT: day={} period={} 新排入课程 teacher={}",
                    entry.day, entry.period, teacher_id
                ));
            }
            Some(base) => {
                let differs = base.teacher_id != teacher_id
                    || base.subject_id != subject_id
                    || base.room != entry.room
                    || base.start_time != start_time
                    || base.end_time != end_time;

                // 规则 5: 一致则不动
                if !differs {
                    return;
                }

                // 规则 2: 改写 (保留条目ID, 维持变更记录的课位关联)
                rewrites.push(BaseRewrite::Update(BaseEntry {
                    id: base.id.clone(),
                    class_id: base.class_id.clone(),
                    day: base.day,
                    period: base.period,
                    teacher_id: teacher_id.clone(),
                    subject_id,
                    room: entry.room.clone(),
                    start_time,
                    end_time,
                }));
                reasons.push(format!(
                    "UPDATE: day={} period={} 字段改写 teacher={}",
                    entry.day, entry.period, teacher_id
                ));
            }
        }
    }
}

// ==========================================
// 测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn base_entry(day: SchoolDay, period: i32) -> BaseEntry {
        BaseEntry {
            id: format!("BE-{}-{}", day.to_db_str(), period),
            class_id: "C001".to_string(),
            day,
            period,
            teacher_id: "T001".to_string(),
            subject_id: "MATH".to_string(),
            room: Some("R101".to_string()),
            start_time: t("08:50"),
            end_time: t("09:35"),
        }
    }

    fn scheduled(day: SchoolDay, period: i32, teacher: &str) -> EffectiveEntry {
        EffectiveEntry {
            class_id: "C001".to_string(),
            day,
            period,
            date: d("2024-03-04"),
            status: EffectiveStatus::Scheduled,
            teacher_id: Some(teacher.to_string()),
            subject_id: Some("MATH".to_string()),
            room: Some("R101".to_string()),
            start_time: Some(t("08:50")),
            end_time: Some(t("09:35")),
            original_teacher_id: None,
        }
    }

    fn free(day: SchoolDay, period: i32) -> EffectiveEntry {
        EffectiveEntry::free("C001", day, period, d("2024-03-04"))
    }

    // ===== 幂等: 一致课位不产生指令 =====

    #[test]
    fn test_identical_slot_produces_no_rewrite() {
        let effective = vec![scheduled(SchoolDay::Monday, 2, "T001")];
        let current = vec![base_entry(SchoolDay::Monday, 2)];

        let (rewrites, _) = PromotionPlanner::plan_rewrites("C001", &effective, &current);

        assert!(rewrites.is_empty());
    }

    #[test]
    fn test_empty_inputs_produce_no_rewrite() {
        let (rewrites, reasons) = PromotionPlanner::plan_rewrites("C001", &[], &[]);

        assert!(rewrites.is_empty());
        assert!(reasons.is_empty());
    }

    // ===== 改写: 字段差异触发 Update =====

    #[test]
    fn test_teacher_difference_produces_update() {
        let effective = vec![scheduled(SchoolDay::Monday, 2, "T002")];
        let current = vec![base_entry(SchoolDay::Monday, 2)];

        let (rewrites, reasons) = PromotionPlanner::plan_rewrites("C001", &effective, &current);

        assert_eq!(rewrites.len(), 1);
        match &rewrites[0] {
            BaseRewrite::Update(entry) => {
                assert_eq!(entry.id, "BE-MONDAY-2");
                assert_eq!(entry.teacher_id, "T002");
                assert_eq!(entry.subject_id, "MATH");
            }
            other => panic!("期望 Update, 实际 {:?}", other),
        }
        assert!(reasons.iter().any(|r| r.starts_with("UPDATE:")));
    }

    #[test]
    fn test_room_difference_produces_update() {
        let mut entry = scheduled(SchoolDay::Tuesday, 3, "T001");
        entry.room = Some("R305".to_string());
        let current = vec![base_entry(SchoolDay::Tuesday, 3)];

        let (rewrites, _) = PromotionPlanner::plan_rewrites("C001", &[entry], &current);

        assert_eq!(rewrites.len(), 1);
        match &rewrites[0] {
            BaseRewrite::Update(updated) => {
                assert_eq!(updated.room, Some("R305".to_string()));
                assert_eq!(updated.teacher_id, "T001");
            }
            other => panic!("期望 Update, 实际 {:?}", other),
        }
    }

    #[test]
    fn test_time_difference_produces_update() {
        let mut entry = scheduled(SchoolDay::Monday, 2, "T001");
        entry.start_time = Some(t("10:00"));
        entry.end_time = Some(t("10:45"));
        let current = vec![base_entry(SchoolDay::Monday, 2)];

        let (rewrites, _) = PromotionPlanner::plan_rewrites("C001", &[entry], &current);

        assert_eq!(rewrites.len(), 1);
        match &rewrites[0] {
            BaseRewrite::Update(updated) => {
                assert_eq!(updated.start_time, t("10:00"));
                assert_eq!(updated.end_time, t("10:45"));
            }
            other => panic!("期望 Update, 实际 {:?}", other),
        }
    }

    // ===== 新增: 无基础条目的 Scheduled 课位 =====

    #[test]
    fn test_scheduled_without_base_produces_insert() {
        let effective = vec![scheduled(SchoolDay::Wednesday, 5, "T009")];

        let (rewrites, reasons) = PromotionPlanner::plan_rewrites("C001", &effective, &[]);

        assert_eq!(rewrites.len(), 1);
        match &rewrites[0] {
            BaseRewrite::Insert(entry) => {
                assert!(!entry.id.is_empty());
                assert_eq!(entry.class_id, "C001");
                assert_eq!(entry.day, SchoolDay::Wednesday);
                assert_eq!(entry.period, 5);
                assert_eq!(entry.teacher_id, "T009");
            }
            other => panic!("期望 Insert, 实际 {:?}", other),
        }
        assert!(reasons.iter().any(|r| r.starts_with("INSERT:")));
    }

    // ===== 删除: 解析为空课的课位 =====

    #[test]
    fn test_free_with_base_produces_delete() {
        let effective = vec![free(SchoolDay::Monday, 2)];
        let current = vec![base_entry(SchoolDay::Monday, 2)];

        let (rewrites, _) = PromotionPlanner::plan_rewrites("C001", &effective, &current);

        assert_eq!(rewrites.len(), 1);
        match &rewrites[0] {
            BaseRewrite::Delete { id } => assert_eq!(id, "BE-MONDAY-2"),
            other => panic!("期望 Delete, 实际 {:?}", other),
        }
    }

    #[test]
    fn test_free_without_base_produces_nothing() {
        let effective = vec![free(SchoolDay::Friday, 1)];

        let (rewrites, _) = PromotionPlanner::plan_rewrites("C001", &effective, &[]);

        assert!(rewrites.is_empty());
    }

    // ===== 代课需求未落实: 课位不动 =====

    #[test]
    fn test_substitution_required_is_skipped() {
        let effective = vec![EffectiveEntry::substitution_required(
            "C001",
            SchoolDay::Monday,
            2,
            d("2024-03-04"),
            "T001".to_string(),
            "MATH".to_string(),
            Some("R101".to_string()),
            t("08:50"),
            t("09:35"),
        )];
        let current = vec![base_entry(SchoolDay::Monday, 2)];

        let (rewrites, reasons) = PromotionPlanner::plan_rewrites("C001", &effective, &current);

        assert!(rewrites.is_empty());
        assert!(reasons.iter().any(|r| r.starts_with("SKIP_UNRESOLVED:")));
    }

    // ===== 缺失字段防御 =====

    #[test]
    fn test_scheduled_missing_subject_is_skipped() {
        let mut entry = scheduled(SchoolDay::Monday, 2, "T001");
        entry.subject_id = None;

        let (rewrites, reasons) = PromotionPlanner::plan_rewrites("C001", &[entry], &[]);

        assert!(rewrites.is_empty());
        assert!(reasons.iter().any(|r| r.starts_with("SKIP_INCOMPLETE:")));
    }

    // ===== 混合周: 各课位独立判定 =====

    #[test]
    fn test_mixed_week_produces_independent_rewrites() {
        let mut substituted = scheduled(SchoolDay::Monday, 2, "T002");
        substituted.original_teacher_id = Some("T001".to_string());
        let effective = vec![
            substituted,                               // Update
            scheduled(SchoolDay::Tuesday, 2, "T001"),  // 与基础一致, 跳过
            scheduled(SchoolDay::Thursday, 4, "T007"), // Insert
            free(SchoolDay::Friday, 2),                // Delete
        ];
        let current = vec![
            base_entry(SchoolDay::Monday, 2),
            base_entry(SchoolDay::Tuesday, 2),
            base_entry(SchoolDay::Friday, 2),
        ];

        let (rewrites, _) = PromotionPlanner::plan_rewrites("C001", &effective, &current);

        assert_eq!(rewrites.len(), 3);
        let updates = rewrites
            .iter()
            .filter(|r| matches!(r, BaseRewrite::Update(_)))
            .count();
        let inserts = rewrites
            .iter()
            .filter(|r| matches!(r, BaseRewrite::Insert(_)))
            .count();
        let deletes = rewrites
            .iter()
            .filter(|r| matches!(r, BaseRewrite::Delete { .. }))
            .count();
        assert_eq!(updates, 1);
        assert_eq!(inserts, 1);
        assert_eq!(deletes, 1);
    }
}
