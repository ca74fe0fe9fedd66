// ==========================================
// 校园课表调度系统 - 引擎层事件发布
// ==========================================
// 职责: 定义课表变更事件发布 trait, 实现依赖倒置
// 说明: 每次写入显式声明其失效作用域 (班级 + 教学周),
//       下游缓存/通知按作用域精确刷新, 不做全局失效
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 课表事件类型
// ==========================================

/// 课表变更事件类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimetableEventType {
    /// 周编辑已落库
    WeeklyEditApplied,
    /// 变更记录已创建
    ChangeRecordCreated,
    /// 变更已批准
    ChangeApproved,
    /// 变更已驳回
    ChangeRejected,
    /// 变更已隐藏
    ChangeDismissed,
    /// 周课表已提升为基础课表
    SchedulePromoted,
    /// 基础课表已重新生成
    BaseRegenerated,
}

impl TimetableEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            TimetableEventType::WeeklyEditApplied => "WeeklyEditApplied",
            TimetableEventType::ChangeRecordCreated => "ChangeRecordCreated",
            TimetableEventType::ChangeApproved => "ChangeApproved",
            TimetableEventType::ChangeRejected => "ChangeRejected",
            TimetableEventType::ChangeDismissed => "ChangeDismissed",
            TimetableEventType::SchedulePromoted => "SchedulePromoted",
            TimetableEventType::BaseRegenerated => "BaseRegenerated",
        }
    }
}

/// 课表变更事件
///
/// 携带写入的失效作用域: 班级 + 周一日期
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableEvent {
    /// 班级 ID
    pub class_id: String,
    /// 受影响教学周的周一 (None 表示与周无关, 如基础课表重生成)
    pub week_start: Option<NaiveDate>,
    /// 事件类型
    pub event_type: TimetableEventType,
    /// 事件来源描述
    pub source: Option<String>,
}

impl TimetableEvent {
    /// 创建周作用域事件
    pub fn week_scoped(
        class_id: String,
        week_start: NaiveDate,
        event_type: TimetableEventType,
        source: Option<String>,
    ) -> Self {
        Self {
            class_id,
            week_start: Some(week_start),
            event_type,
            source,
        }
    }

    /// 创建班级全量事件 (不限定周)
    pub fn class_scoped(
        class_id: String,
        event_type: TimetableEventType,
        source: Option<String>,
    ) -> Self {
        Self {
            class_id,
            week_start: None,
            event_type,
            source,
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 课表事件发布者 Trait
///
/// Engine 层定义, 通知/缓存适配层实现
/// 通过 trait 实现依赖倒置, 引擎不依赖任何下游刷新机制
pub trait TimetableEventPublisher: Send + Sync {
    /// 发布课表事件
    ///
    /// # 返回
    /// - `Ok(task_id)`: 下游任务 ID (如果支持) 或空字符串
    /// - `Err`: 发布失败
    fn publish(&self, event: TimetableEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景 (如单元测试)
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl TimetableEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: TimetableEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - class_id={}, event_type={}",
            event.class_id,
            event.event_type.as_str()
        );
        Ok(String::new())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn TimetableEventPublisher>> 的使用
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn TimetableEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn TimetableEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例 (不发布事件)
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件 (如果有发布者)
    pub fn publish(&self, event: TimetableEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者, 跳过事件 - class_id={}, event_type={}",
                    event.class_id,
                    event.event_type.as_str()
                );
                Ok(String::new())
            }
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}
