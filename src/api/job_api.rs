// ==========================================
// 作业分配与履约引擎 - 作业 API
// ==========================================
// 职责: 作业生命周期操作面 + 查询面
// 授权红线: 任何状态变更前先过 authorize, 失败零副作用中止
// 事件红线: 事件在核心事务提交之后追加/发布, 尽力而为,
//           事件失败永不回滚核心状态变更
// ==========================================

use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use crate::api::authorizer::Authorizer;
use crate::api::error::{ApiError, ApiResult};
use crate::domain::job::{BomLine, Job};
use crate::domain::job_event::JobEvent;
use crate::domain::shortfall::Shortfall;
use crate::domain::types::{Capability, JobEventName};
use crate::engine::approval::{ApprovalOutcome, ApprovalValidator};
use crate::engine::availability::AvailabilityCalculator;
use crate::engine::bom_edit::BomLineEditor;
use crate::engine::completion::{ActualLine, CompletionOutcome, CompletionProcessor};
use crate::engine::events::{JobEventPublisher, OptionalEventPublisher};
use crate::engine::voiding::{VoidOutcome, VoidProcessor};
use crate::repository::job_event_repo::JobEventRepository;
use crate::repository::job_repo::{BomLineRepository, JobRepository};
use crate::repository::shortfall_repo::ShortfallRepository;

// ==========================================
// JobApi - 作业 API
// ==========================================

/// 作业API
///
/// 职责:
/// 1. 作业生命周期 (创建 / BOM 行维护 / 审批 / 完成 / 作废)
/// 2. 查询 (作业、BOM 行、缺口、可承诺量、事件)
/// 3. 授权前置与事件后置
pub struct JobApi {
    authorizer: Arc<dyn Authorizer>,
    job_repo: Arc<JobRepository>,
    bom_line_repo: Arc<BomLineRepository>,
    shortfall_repo: Arc<ShortfallRepository>,
    job_event_repo: Arc<JobEventRepository>,
    availability_calc: Arc<AvailabilityCalculator>,
    bom_editor: Arc<BomLineEditor>,
    approval_validator: Arc<ApprovalValidator>,
    completion_processor: Arc<CompletionProcessor>,
    void_processor: Arc<VoidProcessor>,
    // 事件发布器 (依赖倒置: 核心不依赖具体投递通道)
    event_publisher: OptionalEventPublisher,
}

impl JobApi {
    /// 创建新的JobApi实例
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        authorizer: Arc<dyn Authorizer>,
        job_repo: Arc<JobRepository>,
        bom_line_repo: Arc<BomLineRepository>,
        shortfall_repo: Arc<ShortfallRepository>,
        job_event_repo: Arc<JobEventRepository>,
        availability_calc: Arc<AvailabilityCalculator>,
        bom_editor: Arc<BomLineEditor>,
        approval_validator: Arc<ApprovalValidator>,
        completion_processor: Arc<CompletionProcessor>,
        void_processor: Arc<VoidProcessor>,
        event_publisher: Option<Arc<dyn JobEventPublisher>>,
    ) -> Self {
        let event_publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        Self {
            authorizer,
            job_repo,
            bom_line_repo,
            shortfall_repo,
            job_event_repo,
            availability_calc,
            bom_editor,
            approval_validator,
            completion_processor,
            void_processor,
            event_publisher,
        }
    }

    // ==========================================
    // 写操作接口
    // ==========================================

    /// 创建作业 (初始态 UNRESERVED)
    ///
    /// # 返回
    /// - Ok(Job): 新建作业
    /// - Err(ApiError): 授权失败 / 无效输入
    pub fn create_job(
        &self,
        tenant_id: &str,
        job_name: &str,
        notes: Option<&str>,
        actor: &str,
    ) -> ApiResult<Job> {
        self.check_capability(actor, tenant_id, Capability::JobCreate)?;

        if job_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("作业名称不能为空".to_string()));
        }

        let job = Job::new(tenant_id, job_name, notes, actor);
        self.job_repo.create(&job)?;

        self.record_event(
            &job.job_id,
            JobEventName::JobCreated,
            actor,
            Some(json!({
                "tenant_id": tenant_id,
                "job_name": job_name,
            })),
        );

        Ok(job)
    }

    /// 插入或更新 BOM 行
    ///
    /// 仅 UNRESERVED 态允许; 计划量必须为正整数;
    /// 作业与品项必须同租户
    ///
    /// 入口处的作业读取只用于租户作用域授权;
    /// 编辑窗口由编辑器在写入事务内复核
    pub fn upsert_bom_line(
        &self,
        job_id: &str,
        item_id: &str,
        planned_qty: i64,
        actor: &str,
    ) -> ApiResult<BomLine> {
        let job = self.require_job(job_id)?;
        self.check_capability(actor, &job.tenant_id, Capability::JobEdit)?;

        Ok(self.bom_editor.upsert(job_id, item_id, planned_qty)?)
    }

    /// 审批作业 (并发关键操作)
    ///
    /// # 参数
    /// - `was_fulfillable_hint`: 调用方基于过期快照的可行性判断,
    ///   仅影响阻断时的 reason 诊断, 不影响正确性
    ///
    /// # 返回
    /// - Ok(ApprovalOutcome): blocked=false 表示已预占 (或幂等空操作);
    ///   blocked=true 携带逐品项缺口明细
    pub fn approve(
        &self,
        job_id: &str,
        was_fulfillable_hint: bool,
        actor: &str,
    ) -> ApiResult<ApprovalOutcome> {
        let job = self.require_job(job_id)?;
        self.check_capability(actor, &job.tenant_id, Capability::JobApprove)?;

        let outcome = self.approval_validator.approve(job_id, was_fulfillable_hint)?;

        if !outcome.idempotent {
            if outcome.blocked {
                self.record_event(
                    job_id,
                    JobEventName::JobApprovalBlocked,
                    actor,
                    Some(json!({
                        "reason": &outcome.reason,
                        "shortfalls": &outcome.shortfalls,
                    })),
                );
            } else {
                // 事件载荷读取同属尽力而为: 失败降级为空清单并记录
                let lines = match self.bom_line_repo.find_by_job(job_id) {
                    Ok(lines) => lines,
                    Err(e) => {
                        warn!(job_id, error = %e, "事件载荷读取BOM行失败 (不回滚核心状态)");
                        Vec::new()
                    }
                };
                let reserved: Vec<_> = lines
                    .iter()
                    .map(|l| json!({"item_id": &l.item_id, "planned_qty": l.planned_qty}))
                    .collect();

                self.record_event(job_id, JobEventName::JobApproved, actor, None);
                self.record_event(
                    job_id,
                    JobEventName::JobInventoryReserved,
                    actor,
                    Some(json!({ "reserved": reserved })),
                );
            }
        }

        Ok(outcome)
    }

    /// 完成作业: 按实耗扣减在手量并转入 COMPLETED
    ///
    /// 实耗清单必须与 BOM 品项集一一对应; 实耗量可为零或超计划
    /// (差异只入报表与事件, 不阻断完成)
    pub fn complete(
        &self,
        job_id: &str,
        actuals: &[ActualLine],
        actor: &str,
    ) -> ApiResult<CompletionOutcome> {
        let job = self.require_job(job_id)?;
        self.check_capability(actor, &job.tenant_id, Capability::JobComplete)?;

        let outcome = self.completion_processor.complete(job_id, actuals)?;

        if !outcome.idempotent {
            self.record_event(job_id, JobEventName::JobCompleted, actor, None);
            self.record_event(
                job_id,
                JobEventName::JobInventoryConsumed,
                actor,
                Some(json!({ "consumed": &outcome.consumed })),
            );
        }

        Ok(outcome)
    }

    /// 作废作业: 释放预占, 不触碰任何在手量
    pub fn void(&self, job_id: &str, actor: &str) -> ApiResult<VoidOutcome> {
        let job = self.require_job(job_id)?;
        self.check_capability(actor, &job.tenant_id, Capability::JobVoid)?;

        let outcome = self.void_processor.void(job_id)?;

        if !outcome.idempotent {
            self.record_event(job_id, JobEventName::JobVoided, actor, None);
        }

        Ok(outcome)
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 按job_id查询作业
    pub fn get_job(&self, job_id: &str) -> ApiResult<Job> {
        self.require_job(job_id)
    }

    /// 查询租户下所有作业
    pub fn list_jobs(&self, tenant_id: &str) -> ApiResult<Vec<Job>> {
        Ok(self.job_repo.list_by_tenant(tenant_id)?)
    }

    /// 查询作业 BOM 行
    pub fn list_bom_lines(&self, job_id: &str) -> ApiResult<Vec<BomLine>> {
        self.require_job(job_id)?;
        Ok(self.bom_line_repo.find_by_job(job_id)?)
    }

    /// 查询作业当前 ACTIVE 缺口
    pub fn list_active_shortfalls(&self, job_id: &str) -> ApiResult<Vec<Shortfall>> {
        self.require_job(job_id)?;
        Ok(self.shortfall_repo.find_active_by_job(job_id)?)
    }

    /// 查询品项可承诺量快照 (on_hand − 其他 RESERVED 占用)
    ///
    /// 注意: 这是一次过期即失效的快照, 审批仍会在锁内重验
    pub fn availability(&self, item_id: &str) -> ApiResult<i64> {
        Ok(self.availability_calc.available(item_id)?)
    }

    /// 查询作业事件 (按时间升序)
    pub fn list_events(&self, job_id: &str) -> ApiResult<Vec<JobEvent>> {
        self.require_job(job_id)?;
        Ok(self.job_event_repo.find_by_job(job_id)?)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 授权前置检查, 失败时零副作用中止
    fn check_capability(
        &self,
        actor: &str,
        tenant_id: &str,
        capability: Capability,
    ) -> ApiResult<()> {
        if self.authorizer.authorize(actor, tenant_id, capability) {
            Ok(())
        } else {
            Err(ApiError::AuthorizationDenied {
                actor: actor.to_string(),
                tenant_id: tenant_id.to_string(),
                capability: capability.as_str().to_string(),
            })
        }
    }

    /// 读取作业, 不存在时返回 NotFound
    fn require_job(&self, job_id: &str) -> ApiResult<Job> {
        self.job_repo
            .find_by_id(job_id)?
            .ok_or_else(|| ApiError::NotFound(format!("作业不存在: {}", job_id)))
    }

    /// 事务提交后的事件追加与发布 (尽力而为)
    fn record_event(
        &self,
        job_id: &str,
        event_name: JobEventName,
        actor: &str,
        payload: Option<serde_json::Value>,
    ) {
        let event = JobEvent::new(job_id, event_name, actor, payload);

        if let Err(e) = self.job_event_repo.insert(&event) {
            warn!(job_id, event_name = event_name.as_str(), error = %e, "事件追加失败 (不回滚核心状态)");
        }
        if let Err(e) = self.event_publisher.publish(&event) {
            warn!(job_id, event_name = event_name.as_str(), error = %e, "事件发布失败 (不回滚核心状态)");
        }
    }
}
