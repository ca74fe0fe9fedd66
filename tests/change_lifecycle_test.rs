// ==========================================
// 变更审批生命周期集成测试
// ==========================================
// 测试目标: 验证登记/批准/驳回/隐藏的状态机与课表联动
// 场景: 走完整 API 栈 (校验器 + 生命周期引擎 + 解析引擎)
// ==========================================


use chrono::NaiveDate;
use school_timetable::api::ApiError;
use school_timetable::app::AppState;
use school_timetable::domain::types::{ChangeSource, ChangeState, ChangeType, EffectiveStatus};
use school_timetable::engine::ChangeDraft;
use test_helpers::{
    count_rows, create_test_db, d, insert_attendance, open_test_connection,
    seed_default_structure, seed_standard_entry,
};

/// 建库 + 作息结构 + 标准课位 (BE001: C001 周一第 2 节 T001 数学), 再组装应用
fn setup_app() -> (tempfile::NamedTempFile, AppState) {
    let (temp_file, db_path) = create_test_db().expect("创建测试库失败");
    {
        let conn = open_test_connection(&db_path).expect("打开测试库失败");
        seed_default_structure(&conn).expect("写入作息结构失败");
        seed_standard_entry(&conn).expect("写入基础课位失败");
    }
    let state = AppState::new(db_path).expect("组装应用失败");
    (temp_file, state)
}

fn substitution_draft(change_date: NaiveDate, new_teacher: &str) -> ChangeDraft {
    ChangeDraft {
        timetable_entry_id: "BE001".to_string(),
        change_type: ChangeType::Substitution,
        change_date,
        new_teacher_id: Some(new_teacher.to_string()),
        new_room: None,
        new_start_time: None,
        new_end_time: None,
        reason: "教师请假".to_string(),
        change_source: ChangeSource::Manual,
    }
}

fn cancellation_draft(change_date: NaiveDate) -> ChangeDraft {
    ChangeDraft {
        timetable_entry_id: "BE001".to_string(),
        change_type: ChangeType::Cancellation,
        change_date,
        new_teacher_id: None,
        new_room: None,
        new_start_time: None,
        new_end_time: None,
        reason: "全校活动".to_string(),
        change_source: ChangeSource::Manual,
    }
}

fn mark_absent(state: &AppState, teacher_id: &str, date: &str) {
    let conn = open_test_connection(state.get_db_path()).expect("打开测试库失败");
    insert_attendance(&conn, teacher_id, date, "ABSENT", None, None).expect("写入考勤失败");
}

// ==========================================
// 登记
// ==========================================

#[test]
fn test_create_change_starts_pending() {
    let (_tmp, state) = setup_app();

    let record = state
        .change_api
        .create_change(substitution_draft(d("2024-03-04"), "T002"), "admin")
        .expect("登记变更失败");

    assert_eq!(record.state, ChangeState::Pending);
    assert!(record.is_active);
    assert_eq!(record.original_teacher_id.as_deref(), Some("T001"));
    assert_eq!(record.original_room.as_deref(), Some("R101"));
    assert_eq!(record.approved_by, None);

    let pending = state.change_api.list_pending(Some("C001")).expect("查询待审失败");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, record.id);
}

#[test]
fn test_create_change_requires_existing_entry() {
    let (_tmp, state) = setup_app();

    let mut draft = substitution_draft(d("2024-03-04"), "T002");
    draft.timetable_entry_id = "MISSING".to_string();

    let err = state
        .change_api
        .create_change(draft, "admin")
        .expect_err("不存在的课位应当报错");
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[test]
fn test_substitution_without_new_teacher_rejected() {
    let (_tmp, state) = setup_app();

    let mut draft = substitution_draft(d("2024-03-04"), "T002");
    draft.new_teacher_id = None;

    let err = state
        .change_api
        .create_change(draft, "admin")
        .expect_err("缺少新教师应当被校验拦截");
    match err {
        ApiError::OperationValidationError { violations, .. } => {
            assert!(violations
                .iter()
                .any(|v| v.violation_type == "MISSING_NEW_TEACHER"));
        }
        other => panic!("期望校验错误, 实际: {:?}", other),
    }
}

#[test]
fn test_date_precise_change_must_match_slot_weekday() {
    let (_tmp, state) = setup_app();

    // BE001 是周一课位, 2024-03-05 是周二
    let err = state
        .change_api
        .create_change(substitution_draft(d("2024-03-05"), "T002"), "admin")
        .expect_err("日期星期不匹配应当被校验拦截");
    match err {
        ApiError::OperationValidationError { violations, .. } => {
            assert!(violations
                .iter()
                .any(|v| v.violation_type == "DATE_DAY_MISMATCH"));
        }
        other => panic!("期望校验错误, 实际: {:?}", other),
    }
}

#[test]
fn test_sunday_cancellation_rejected() {
    let (_tmp, state) = setup_app();

    // 2024-03-10 是周日, 不在教学窗口内
    let err = state
        .change_api
        .create_change(cancellation_draft(d("2024-03-10")), "admin")
        .expect_err("周日停课应当被校验拦截");
    match err {
        ApiError::OperationValidationError { violations, .. } => {
            assert!(violations
                .iter()
                .any(|v| v.violation_type == "NON_TEACHING_DATE"));
        }
        other => panic!("期望校验错误, 实际: {:?}", other),
    }
}

#[test]
fn test_cancellation_on_other_weekday_is_allowed() {
    let (_tmp, state) = setup_app();

    // 停课按周窗口生效, 日期不必与课位星期一致 (2024-03-06 是周三)
    let record = state
        .change_api
        .create_change(cancellation_draft(d("2024-03-06")), "admin")
        .expect("登记停课失败");
    assert_eq!(record.change_type, ChangeType::Cancellation);

    // 登记即生效 (免审), 本周周一课位被压制
    let entries = state
        .schedule_api
        .effective_class_date("C001", d("2024-03-04"))
        .expect("单日解析失败");
    let slot = entries.iter().find(|e| e.period == 2).expect("缺少第 2 节");
    assert_eq!(slot.status, EffectiveStatus::Free);
}

#[test]
fn test_second_active_cancellation_same_week_rejected() {
    let (_tmp, state) = setup_app();

    state
        .change_api
        .create_change(cancellation_draft(d("2024-03-04")), "admin")
        .expect("登记停课失败");

    let err = state
        .change_api
        .create_change(cancellation_draft(d("2024-03-06")), "admin")
        .expect_err("同周重复停课应当被拒绝");
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
}

#[test]
fn test_cancellation_next_week_is_independent() {
    let (_tmp, state) = setup_app();

    state
        .change_api
        .create_change(cancellation_draft(d("2024-03-04")), "admin")
        .expect("登记停课失败");
    state
        .change_api
        .create_change(cancellation_draft(d("2024-03-11")), "admin")
        .expect("下周停课应当允许");
}

// ==========================================
// 批准
// ==========================================

#[test]
fn test_approve_activates_substitution() {
    let (_tmp, state) = setup_app();
    mark_absent(&state, "T001", "2024-03-04");

    let record = state
        .change_api
        .create_change(substitution_draft(d("2024-03-04"), "T002"), "admin")
        .expect("登记变更失败");

    // 未批时课位仍为待安排代课
    let entries = state
        .schedule_api
        .effective_class_date("C001", d("2024-03-04"))
        .expect("单日解析失败");
    let slot = entries.iter().find(|e| e.period == 2).expect("缺少第 2 节");
    assert_eq!(slot.status, EffectiveStatus::SubstitutionRequired);

    let approved = state
        .change_api
        .approve_change(&record.id, "principal")
        .expect("批准失败");
    assert_eq!(approved.state, ChangeState::Approved);
    assert_eq!(approved.approved_by.as_deref(), Some("principal"));
    assert!(approved.approved_at.is_some());

    let entries = state
        .schedule_api
        .effective_class_date("C001", d("2024-03-04"))
        .expect("单日解析失败");
    let slot = entries.iter().find(|e| e.period == 2).expect("缺少第 2 节");
    assert_eq!(slot.status, EffectiveStatus::Scheduled);
    assert_eq!(slot.teacher_id.as_deref(), Some("T002"));
    assert_eq!(slot.original_teacher_id.as_deref(), Some("T001"));
}

#[test]
fn test_double_approve_is_idempotent() {
    let (_tmp, state) = setup_app();

    let record = state
        .change_api
        .create_change(substitution_draft(d("2024-03-04"), "T002"), "admin")
        .expect("登记变更失败");

    state
        .change_api
        .approve_change(&record.id, "principal")
        .expect("首次批准失败");
    let second = state
        .change_api
        .approve_change(&record.id, "principal")
        .expect("重复批准应当幂等成功");
    assert_eq!(second.state, ChangeState::Approved);

    // 幂等路径不重复写审计日志
    let conn = open_test_connection(state.get_db_path()).expect("打开测试库失败");
    assert_eq!(
        count_rows(&conn, "action_log", "action_type = 'ApproveChange'"),
        1
    );
}

#[test]
fn test_approve_unknown_change_is_not_found() {
    let (_tmp, state) = setup_app();

    let err = state
        .change_api
        .approve_change("CR-MISSING", "principal")
        .expect_err("不存在的变更应当报错");
    assert!(matches!(err, ApiError::NotFound(_)));
}

// ==========================================
// 驳回
// ==========================================

#[test]
fn test_reject_pending_deletes_record_and_restores_schedule() {
    let (_tmp, state) = setup_app();

    let record = state
        .change_api
        .create_change(cancellation_draft(d("2024-03-04")), "admin")
        .expect("登记停课失败");

    state
        .change_api
        .reject_change(&record.id, Some("理由不充分"), "principal")
        .expect("驳回失败");

    // 物理删除, 记录不可再查
    let err = state
        .change_api
        .get_change(&record.id)
        .expect_err("已驳回记录应当不存在");
    assert!(matches!(err, ApiError::NotFound(_)));

    // 课表恢复基础条目
    let entries = state
        .schedule_api
        .effective_class_date("C001", d("2024-03-04"))
        .expect("单日解析失败");
    let slot = entries.iter().find(|e| e.period == 2).expect("缺少第 2 节");
    assert_eq!(slot.status, EffectiveStatus::Scheduled);
    assert_eq!(slot.teacher_id.as_deref(), Some("T001"));
}

#[test]
fn test_reject_approved_change_fails() {
    let (_tmp, state) = setup_app();

    let record = state
        .change_api
        .create_change(substitution_draft(d("2024-03-04"), "T002"), "admin")
        .expect("登记变更失败");
    state
        .change_api
        .approve_change(&record.id, "principal")
        .expect("批准失败");

    let err = state
        .change_api
        .reject_change(&record.id, None, "principal")
        .expect_err("已批变更不可驳回");
    match err {
        ApiError::InvalidStateTransition { from, to } => {
            assert_eq!(from, "APPROVED");
            assert_eq!(to, "REJECTED");
        }
        other => panic!("期望状态转换错误, 实际: {:?}", other),
    }
}

// ==========================================
// 隐藏
// ==========================================

#[test]
fn test_dismiss_hides_notification_but_keeps_schedule_effect() {
    let (_tmp, state) = setup_app();
    mark_absent(&state, "T001", "2024-03-04");

    let record = state
        .change_api
        .create_change(substitution_draft(d("2024-03-04"), "T002"), "admin")
        .expect("登记变更失败");
    state
        .change_api
        .approve_change(&record.id, "principal")
        .expect("批准失败");

    let dismissed = state
        .change_api
        .dismiss_change(&record.id, "teacher_t001")
        .expect("隐藏失败");
    assert_eq!(dismissed.state, ChangeState::Dismissed);

    // 排课效力保持: 代课教师仍然生效
    let entries = state
        .schedule_api
        .effective_class_date("C001", d("2024-03-04"))
        .expect("单日解析失败");
    let slot = entries.iter().find(|e| e.period == 2).expect("缺少第 2 节");
    assert_eq!(slot.teacher_id.as_deref(), Some("T002"));
}

#[test]
fn test_dismiss_pending_change_fails() {
    let (_tmp, state) = setup_app();

    let record = state
        .change_api
        .create_change(substitution_draft(d("2024-03-04"), "T002"), "admin")
        .expect("登记变更失败");

    let err = state
        .change_api
        .dismiss_change(&record.id, "teacher_t001")
        .expect_err("未批变更不可隐藏");
    match err {
        ApiError::InvalidStateTransition { from, to } => {
            assert_eq!(from, "PENDING");
            assert_eq!(to, "DISMISSED");
        }
        other => panic!("期望状态转换错误, 实际: {:?}", other),
    }
}

#[test]
fn test_approve_after_dismiss_returns_record_unchanged() {
    let (_tmp, state) = setup_app();

    let record = state
        .change_api
        .create_change(substitution_draft(d("2024-03-04"), "T002"), "admin")
        .expect("登记变更失败");
    state
        .change_api
        .approve_change(&record.id, "principal")
        .expect("批准失败");
    state
        .change_api
        .dismiss_change(&record.id, "teacher_t001")
        .expect("隐藏失败");

    // 已隐藏记录的重复批准视为幂等成功, 状态保持 DISMISSED
    let result = state
        .change_api
        .approve_change(&record.id, "principal")
        .expect("重复批准应当幂等成功");
    assert_eq!(result.state, ChangeState::Dismissed);
}

// ==========================================
// 审计日志
// ==========================================

#[test]
fn test_lifecycle_actions_are_logged() {
    let (_tmp, state) = setup_app();

    let record = state
        .change_api
        .create_change(substitution_draft(d("2024-03-04"), "T002"), "admin")
        .expect("登记变更失败");
    state
        .change_api
        .approve_change(&record.id, "principal")
        .expect("批准失败");
    state
        .change_api
        .dismiss_change(&record.id, "teacher_t001")
        .expect("隐藏失败");

    let conn = open_test_connection(state.get_db_path()).expect("打开测试库失败");
    assert_eq!(count_rows(&conn, "action_log", "action_type = 'CreateChange'"), 1);
    assert_eq!(count_rows(&conn, "action_log", "action_type = 'ApproveChange'"), 1);
    assert_eq!(count_rows(&conn, "action_log", "action_type = 'DismissChange'"), 1);

    let rejected = state
        .change_api
        .create_change(substitution_draft(d("2024-03-04"), "T004"), "admin")
        .expect("登记变更失败");
    state
        .change_api
        .reject_change(&rejected.id, Some("人选不合适"), "principal")
        .expect("驳回失败");
    assert_eq!(count_rows(&conn, "action_log", "action_type = 'RejectChange'"), 1);
}
