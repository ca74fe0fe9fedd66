// Small dev utility: resolve one class-week and print the effective grid.
//
// Usage:
//   cargo run --bin resolve_week -- [class_id] [YYYY-MM-DD] [db_path]
//
// Falls back to the configured default class and today's date. The date can be
// any day inside the target teaching week.

use chrono::NaiveDate;
use school_timetable::app::{get_default_db_path, AppState};
use school_timetable::domain::types::{EffectiveStatus, SchoolDay};
use school_timetable::engine::PeriodNumbering;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let class_arg = args.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let date_arg = args.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let db_path = args
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(get_default_db_path);

    let state = AppState::new(db_path)?;

    let class_id = match class_arg {
        Some(c) => c,
        None => state
            .config_manager
            .get_default_class_id()?
            .ok_or("No class_id given and no default_class_id configured")?,
    };

    let reference_date = match date_arg {
        Some(d) => NaiveDate::parse_from_str(&d, "%Y-%m-%d")?,
        None => chrono::Local::now().date_naive(),
    };

    let structure = state.schedule_api.school_structure()?;
    let entries = state
        .schedule_api
        .effective_class_week(&class_id, reference_date)?;

    println!("class={} reference_date={}", class_id, reference_date);

    let mut current_day: Option<SchoolDay> = None;
    for entry in &entries {
        if current_day != Some(entry.day) {
            println!();
            println!("== {} {}", entry.day, entry.date);
            current_day = Some(entry.day);
        }

        let label = PeriodNumbering::period_label(&structure.time_slots, entry.period);
        let time = match (entry.start_time, entry.end_time) {
            (Some(s), Some(e)) => format!("{}-{}", s.format("%H:%M"), e.format("%H:%M")),
            _ => "     -     ".to_string(),
        };
        let cell = match entry.status {
            EffectiveStatus::Free => "--".to_string(),
            EffectiveStatus::Scheduled => format!(
                "{} / {}{}",
                entry.subject_id.as_deref().unwrap_or("?"),
                entry.teacher_id.as_deref().unwrap_or("?"),
                entry
                    .room
                    .as_deref()
                    .map(|r| format!(" @{}", r))
                    .unwrap_or_default(),
            ),
            EffectiveStatus::SubstitutionRequired => format!(
                "{} / 待安排代课 (原 {})",
                entry.subject_id.as_deref().unwrap_or("?"),
                entry.original_teacher_id.as_deref().unwrap_or("?"),
            ),
        };
        println!("  第{}节 {} {}", label, time, cell);
    }

    if entries.is_empty() {
        println!("(该周无任何课位: 检查作息结构与基础课表)");
    }
    Ok(())
}
