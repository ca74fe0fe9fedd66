// ==========================================
// 校园课表调度系统 - 应用状态
// ==========================================
// 职责: 组装仓储/引擎/API, 管理应用级共享状态
// 依据: Timetable_Dev_Master_Spec.md PART A 分层架构
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::api::{ChangeApi, ScheduleApi, WriteOperationValidator};
use crate::config::ConfigManager;
use crate::engine::events::TimetableEventPublisher;
use crate::engine::generator::noop_generator;
use crate::engine::lifecycle::ChangeLifecycleEngine;
use crate::engine::promotion::PromotionEngine;
use crate::engine::resolution::ResolutionEngine;
use crate::engine::scope_lock::ScopeLockRegistry;
use crate::repository::{
    ActionLogRepository, AttendanceRepository, BaseEntryRepository, ChangeRecordRepository,
    PromotionRepository, StructureRepository, SubstitutionConfirmationRepository,
    WeeklyEditRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
/// 单写者模型: 全部仓储共享同一个互斥连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 课表API (查询/周编辑/提升/生成触发)
    pub schedule_api: Arc<ScheduleApi>,

    /// 变更API (登记/审批生命周期)
    pub change_api: Arc<ChangeApi>,

    /// 配置管理器 (默认学校/班级等运行参数)
    pub config_manager: Arc<ConfigManager>,

    /// 操作日志仓储 (用于审计追踪)
    pub action_log_repo: Arc<ActionLogRepository>,

    /// 作用域锁注册表 (提升窗口互斥与隔离观察)
    pub scope_locks: Arc<ScopeLockRegistry>,

    /// 事件发布器 (外部通知通道, 未接入时为 None)
    pub event_publisher: Option<Arc<dyn TimetableEventPublisher>>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会:
    /// 1. 打开数据库并应用连接级配置 (外键/busy_timeout)
    /// 2. 幂等建表
    /// 3. 初始化 Repository / Engine / API 三层
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_event_publisher(db_path, None)
    }

    /// 创建带事件发布器的AppState实例
    pub fn with_event_publisher(
        db_path: String,
        event_publisher: Option<Arc<dyn TimetableEventPublisher>>,
    ) -> Result<Self, String> {
        tracing::info!("初始化AppState, 数据库路径: {}", db_path);

        // 创建数据库连接 (共享连接) 并幂等建表
        let conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::db::initialize_schema(&conn)
            .map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================

        let structure_repo = Arc::new(StructureRepository::new(conn.clone()));
        let base_entry_repo = Arc::new(BaseEntryRepository::new(conn.clone()));
        let weekly_edit_repo = Arc::new(WeeklyEditRepository::new(conn.clone()));
        let change_record_repo = Arc::new(ChangeRecordRepository::new(conn.clone()));
        let attendance_repo = Arc::new(AttendanceRepository::new(conn.clone()));
        let substitution_repo = Arc::new(SubstitutionConfirmationRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));
        let promotion_repo = Arc::new(PromotionRepository::new(conn.clone()));

        // 配置管理器
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化Engine层
        // ==========================================

        // 作用域锁注册表 (班级+周 写互斥)
        let scope_locks = Arc::new(ScopeLockRegistry::new());

        // 叠加解析引擎
        let resolution_engine = Arc::new(ResolutionEngine::new(
            structure_repo.clone(),
            base_entry_repo.clone(),
            weekly_edit_repo.clone(),
            change_record_repo.clone(),
            attendance_repo.clone(),
            substitution_repo.clone(),
        ));

        // 变更审批生命周期引擎
        let lifecycle_engine = Arc::new(ChangeLifecycleEngine::new(
            change_record_repo.clone(),
            base_entry_repo.clone(),
            action_log_repo.clone(),
            scope_locks.clone(),
            event_publisher.clone(),
        ));

        // 提升引擎
        let promotion_engine = Arc::new(PromotionEngine::new(
            base_entry_repo.clone(),
            promotion_repo,
            action_log_repo.clone(),
            resolution_engine.clone(),
            scope_locks.clone(),
            event_publisher.clone(),
        ));

        // 外部排课生成器 (未接入真实实现时为空操作)
        let generator = noop_generator();

        // ==========================================
        // 初始化API层
        // ==========================================

        // 创建validator
        let validator = Arc::new(WriteOperationValidator::new(
            structure_repo.clone(),
            base_entry_repo.clone(),
        ));

        // 课表API
        let schedule_api = Arc::new(ScheduleApi::new(
            structure_repo,
            weekly_edit_repo,
            action_log_repo.clone(),
            resolution_engine,
            promotion_engine,
            generator,
            validator.clone(),
            config_manager.clone(),
            scope_locks.clone(),
            event_publisher.clone(),
        ));

        // 变更API
        let change_api = Arc::new(ChangeApi::new(
            change_record_repo,
            lifecycle_engine,
            validator,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            schedule_api,
            change_api,
            config_manager,
            action_log_repo,
            scope_locks,
            event_publisher,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 开发环境: 用户数据目录/school-timetable-dev/school_timetable.db
/// - 生产环境: 用户数据目录/school-timetable/school_timetable.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径 (便于调试/测试/CI)
    if let Ok(path) = std::env::var("SCHOOL_TIMETABLE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    // 先给一个默认回退值, 后续如果能拿到 data_dir 再覆盖
    let mut path = PathBuf::from("./school_timetable.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录, 避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("school-timetable-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("school-timetable");
        }

        // 确保目录存在
        std::fs::create_dir_all(&path).ok();
        path = path.join("school_timetable.db");

        // 开发环境: 如果目标 DB 不存在, 但项目根目录有初始 DB, 则复制一份作为种子数据
        #[cfg(debug_assertions)]
        {
            if !path.exists() {
                let seed = PathBuf::from("./school_timetable.db");
                if seed.exists() {
                    // best-effort: 复制失败不应阻塞启动 (后续会自动创建空库并建表)
                    let _ = std::fs::copy(seed, &path);
                }
            }
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    // 注意: AppState::new() 的测试需要真实的数据库文件
    // 这些测试应该在集成测试中进行
}
