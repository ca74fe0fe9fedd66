// ==========================================
// 配置管理器集成测试
// ==========================================
// 测试目标: 验证 config_kv 读写/默认值回退/覆写语义
// 场景: 共享连接上的 ConfigManager
// ==========================================


use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use school_timetable::config::{config_keys, ConfigManager};
use test_helpers::{create_test_db, insert_test_config, open_test_connection};

fn setup() -> (tempfile::NamedTempFile, Arc<Mutex<Connection>>, ConfigManager) {
    let (temp_file, db_path) = create_test_db().expect("创建测试库失败");
    let conn = Arc::new(Mutex::new(
        open_test_connection(&db_path).expect("打开测试库失败"),
    ));
    let manager = ConfigManager::from_connection(conn.clone()).expect("创建配置管理器失败");
    (temp_file, conn, manager)
}

#[test]
fn test_default_school_id_falls_back_when_unset() {
    let (_tmp, _conn, manager) = setup();

    let school_id = manager.get_default_school_id().expect("读取默认学校失败");
    assert_eq!(school_id, "SCH001");
}

#[test]
fn test_default_school_id_respects_configured_value() {
    let (_tmp, conn, manager) = setup();
    {
        let guard = conn.lock().expect("测试连接锁失败");
        insert_test_config(&guard, "default_school_id", "SCH777").expect("写入配置失败");
    }

    let school_id = manager.get_default_school_id().expect("读取默认学校失败");
    assert_eq!(school_id, "SCH777");
}

#[test]
fn test_default_class_id_none_until_set() {
    let (_tmp, _conn, manager) = setup();

    assert_eq!(manager.get_default_class_id().expect("读取默认班级失败"), None);

    manager
        .set_global_config_value(config_keys::DEFAULT_CLASS_ID, "C001")
        .expect("写入配置失败");
    assert_eq!(
        manager.get_default_class_id().expect("读取默认班级失败"),
        Some("C001".to_string())
    );
}

#[test]
fn test_set_global_config_value_overwrites() {
    let (_tmp, _conn, manager) = setup();

    manager
        .set_global_config_value("default_class_id", "C001")
        .expect("写入配置失败");
    manager
        .set_global_config_value("default_class_id", "C002")
        .expect("覆写配置失败");

    assert_eq!(
        manager.get_default_class_id().expect("读取默认班级失败"),
        Some("C002".to_string())
    );
}

#[test]
fn test_missing_key_reads_as_none() {
    let (_tmp, _conn, manager) = setup();

    let value = manager
        .get_global_config_value("not_a_real_key")
        .expect("读取配置失败");
    assert_eq!(value, None);
}
