// ==========================================
// 校园课表调度系统 - 写作用域锁注册表
// ==========================================
// 依据: Resolution_Engine_Specs_v1.0.md - 5. 并发模型
// 职责: 提升操作期间独占 (班级, 周) 作用域; 一致性受损班级停写
// 红线: 同作用域并发写入必须显式拒绝, 不得静默丢失或半应用
// ==========================================

use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Mutex;

use crate::repository::{RepositoryError, RepositoryResult};

// ==========================================
// ScopeLockRegistry - 作用域锁注册表
// ==========================================
#[derive(Debug, Default)]
pub struct ScopeLockRegistry {
    // 提升操作持有中的 (class_id, week_start) 作用域
    locked_scopes: Mutex<HashSet<(String, NaiveDate)>>,
    // 回滚失败后停写的班级, 直到人工对账解除
    quarantined_classes: Mutex<HashSet<String>>,
}

impl ScopeLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 独占获取 (班级, 周) 作用域, 返回 RAII 守卫
    ///
    /// # 错误
    /// - `ScopeConflict`: 作用域已被并发提升操作持有
    /// - `InconsistentState`: 班级处于停写状态
    pub fn try_lock(&self, class_id: &str, week_start: NaiveDate) -> RepositoryResult<ScopeGuard<'_>> {
        self.ensure_not_quarantined(class_id)?;

        let mut scopes = self
            .locked_scopes
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let scope = (class_id.to_string(), week_start);
        if scopes.contains(&scope) {
            return Err(RepositoryError::ScopeConflict(format!(
                "班级 {} 周 {} 正在执行提升操作, 请稍后重试",
                class_id, week_start
            )));
        }
        scopes.insert(scope.clone());
        Ok(ScopeGuard {
            registry: self,
            scope,
        })
    }

    /// 写入前置检查: 班级未停写且作用域未被提升操作持有
    pub fn ensure_writable(&self, class_id: &str, week_start: NaiveDate) -> RepositoryResult<()> {
        self.ensure_not_quarantined(class_id)?;

        let scopes = self
            .locked_scopes
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        if scopes.contains(&(class_id.to_string(), week_start)) {
            return Err(RepositoryError::ScopeConflict(format!(
                "班级 {} 周 {} 正在执行提升操作, 写入被拒绝",
                class_id, week_start
            )));
        }
        Ok(())
    }

    /// 标记班级停写 (提升回滚失败后调用)
    pub fn quarantine_class(&self, class_id: &str) -> RepositoryResult<()> {
        let mut classes = self
            .quarantined_classes
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        classes.insert(class_id.to_string());
        tracing::error!("班级 {} 已标记停写, 等待人工对账", class_id);
        Ok(())
    }

    /// 人工对账完成后解除停写
    pub fn release_quarantine(&self, class_id: &str) -> RepositoryResult<()> {
        let mut classes = self
            .quarantined_classes
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        classes.remove(class_id);
        tracing::info!("班级 {} 停写已解除", class_id);
        Ok(())
    }

    /// 查询班级是否处于停写状态
    pub fn is_quarantined(&self, class_id: &str) -> RepositoryResult<bool> {
        let classes = self
            .quarantined_classes
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        Ok(classes.contains(class_id))
    }

    fn ensure_not_quarantined(&self, class_id: &str) -> RepositoryResult<()> {
        if self.is_quarantined(class_id)? {
            return Err(RepositoryError::InconsistentState(format!(
                "班级 {} 处于停写状态, 需人工对账后恢复",
                class_id
            )));
        }
        Ok(())
    }

    fn release(&self, scope: &(String, NaiveDate)) {
        // Drop 中无法传播错误, 毒化时放弃清理 (进程级互斥已失效)
        if let Ok(mut scopes) = self.locked_scopes.lock() {
            scopes.remove(scope);
        }
    }
}

// ==========================================
// ScopeGuard - 作用域 RAII 守卫
// ==========================================
// 守卫离开作用域 (含 panic 展开) 时自动释放锁
#[derive(Debug)]
pub struct ScopeGuard<'a> {
    registry: &'a ScopeLockRegistry,
    scope: (String, NaiveDate),
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.scope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[test]
    fn test_lock_and_release_on_drop() {
        let registry = ScopeLockRegistry::new();
        {
            let _guard = registry.try_lock("C001", monday()).unwrap();
            assert!(registry.ensure_writable("C001", monday()).is_err());
        }
        // 守卫释放后作用域恢复可写
        assert!(registry.ensure_writable("C001", monday()).is_ok());
    }

    #[test]
    fn test_concurrent_lock_conflicts() {
        let registry = ScopeLockRegistry::new();
        let _guard = registry.try_lock("C001", monday()).unwrap();

        let second = registry.try_lock("C001", monday());
        assert!(matches!(second, Err(RepositoryError::ScopeConflict(_))));
    }

    #[test]
    fn test_different_scopes_are_independent() {
        let registry = ScopeLockRegistry::new();
        let _guard = registry.try_lock("C001", monday()).unwrap();

        assert!(registry.try_lock("C002", monday()).is_ok());
        assert!(registry
            .try_lock("C001", monday() + chrono::Duration::days(7))
            .is_ok());
    }

    #[test]
    fn test_quarantine_blocks_writes_and_locks() {
        let registry = ScopeLockRegistry::new();
        registry.quarantine_class("C001").unwrap();

        assert!(matches!(
            registry.ensure_writable("C001", monday()),
            Err(RepositoryError::InconsistentState(_))
        ));
        assert!(matches!(
            registry.try_lock("C001", monday()),
            Err(RepositoryError::InconsistentState(_))
        ));
        // 其他班级不受影响
        assert!(registry.ensure_writable("C002", monday()).is_ok());
    }

    #[test]
    fn test_release_quarantine_restores_writes() {
        let registry = ScopeLockRegistry::new();
        registry.quarantine_class("C001").unwrap();
        registry.release_quarantine("C001").unwrap();

        assert!(registry.ensure_writable("C001", monday()).is_ok());
        assert!(!registry.is_quarantined("C001").unwrap());
    }
}
