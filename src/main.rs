// ==========================================
// 校园课表调度系统 - 主入口
// ==========================================
// 依据: Timetable_Dev_Master_Spec.md
// 技术栈: Rust + SQLite
// 系统定位: 基础课表之上的叠加解析引擎
// ==========================================

use school_timetable::app::{get_default_db_path, AppState};

fn main() {
    // 初始化日志系统
    school_timetable::logging::init();

    tracing::info!("==================================================");
    tracing::info!("校园课表调度系统 - 叠加解析引擎");
    tracing::info!("系统版本: {}", school_timetable::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    // 创建AppState (打开数据库并幂等建表)
    tracing::info!("正在初始化AppState...");
    let app_state = AppState::new(db_path).expect("无法初始化AppState");

    tracing::info!("AppState初始化成功");

    // 输出运行状态摘要
    match app_state.config_manager.get_default_school_id() {
        Ok(school_id) => tracing::info!("默认学校: {}", school_id),
        Err(e) => tracing::warn!("读取默认学校配置失败: {}", e),
    }
    match app_state.change_api.list_pending(None) {
        Ok(pending) => tracing::info!("待审批变更: {} 条", pending.len()),
        Err(e) => tracing::warn!("读取待审批变更失败: {}", e),
    }

    println!();
    println!("数据库已就绪: {}", app_state.get_db_path());
    println!("课表解析请使用: cargo run --bin resolve_week -- <班级ID> [YYYY-MM-DD]");
}
