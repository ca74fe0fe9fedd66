// ==========================================
// 校园课表调度系统 - 变更 API
// ==========================================
// 依据: Resolution_Engine_Specs_v1.0.md - 4.2 变更审批生命周期
// 红线: 状态转换一律委托 ChangeLifecycleEngine, API 层不直接改状态
// ==========================================
// 职责: 变更登记入口 (先校验后登记) / 审批转换透传 / 待审列表查询
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::WriteOperationValidator;
use crate::domain::change::ChangeRecord;
use crate::engine::lifecycle::{ChangeDraft, ChangeLifecycleEngine};
use crate::repository::ChangeRecordRepository;

// ==========================================
// ChangeApi - 变更 API
// ==========================================
pub struct ChangeApi {
    // 仓储依赖 (仅查询)
    change_record_repo: Arc<ChangeRecordRepository>,

    // 引擎依赖
    lifecycle_engine: Arc<ChangeLifecycleEngine>,

    // 校验器
    validator: Arc<WriteOperationValidator>,
}

impl ChangeApi {
    /// 创建新的ChangeApi实例
    pub fn new(
        change_record_repo: Arc<ChangeRecordRepository>,
        lifecycle_engine: Arc<ChangeLifecycleEngine>,
        validator: Arc<WriteOperationValidator>,
    ) -> Self {
        Self {
            change_record_repo,
            lifecycle_engine,
            validator,
        }
    }

    /// 登记变更 (初始状态 PENDING)
    ///
    /// # 参数
    /// - `draft`: 变更草稿
    /// - `operator`: 操作人
    ///
    /// # 返回
    /// 落库后的变更记录
    pub fn create_change(
        &self,
        draft: ChangeDraft,
        operator: &str,
    ) -> ApiResult<ChangeRecord> {
        if operator.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }
        if draft.timetable_entry_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("课位ID不能为空".to_string()));
        }

        self.validator.validate_change_draft(&draft)?;
        Ok(self.lifecycle_engine.create_change(draft, operator)?)
    }

    /// 批准待审变更 (PENDING -> APPROVED)
    ///
    /// 已批准/已隐藏的记录重复批准视为幂等成功
    pub fn approve_change(
        &self,
        change_id: &str,
        approver: &str,
    ) -> ApiResult<ChangeRecord> {
        if change_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("变更ID不能为空".to_string()));
        }
        if approver.trim().is_empty() {
            return Err(ApiError::InvalidInput("审批人不能为空".to_string()));
        }
        Ok(self.lifecycle_engine.approve_change(change_id, approver)?)
    }

    /// 驳回待审变更 (物理删除, 不可恢复)
    pub fn reject_change(
        &self,
        change_id: &str,
        reason: Option<&str>,
        operator: &str,
    ) -> ApiResult<()> {
        if change_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("变更ID不能为空".to_string()));
        }
        if operator.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }
        Ok(self
            .lifecycle_engine
            .reject_change(change_id, reason, operator)?)
    }

    /// 隐藏已批变更的通知展示 (APPROVED -> DISMISSED, 不回退课表效果)
    pub fn dismiss_change(
        &self,
        change_id: &str,
        operator: &str,
    ) -> ApiResult<ChangeRecord> {
        if change_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("变更ID不能为空".to_string()));
        }
        if operator.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }
        Ok(self.lifecycle_engine.dismiss_change(change_id, operator)?)
    }

    /// 查询待审变更列表
    ///
    /// # 参数
    /// - `class_id`: 按班级过滤 (None = 全部)
    pub fn list_pending(&self, class_id: Option<&str>) -> ApiResult<Vec<ChangeRecord>> {
        Ok(self.change_record_repo.list_pending(class_id)?)
    }

    /// 查询变更记录详情
    pub fn get_change(&self, change_id: &str) -> ApiResult<ChangeRecord> {
        if change_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("变更ID不能为空".to_string()));
        }
        self.change_record_repo
            .find_by_id(change_id)?
            .ok_or_else(|| ApiError::NotFound(format!("变更记录(id={})不存在", change_id)))
    }
}
