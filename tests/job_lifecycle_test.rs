// ==========================================
// 作业生命周期测试
// ==========================================
// 职责: 验证作业状态机、BOM 行编辑窗口、授权前置与事件追加
// ==========================================


#[cfg(test)]
mod job_lifecycle_test {
    use std::sync::{Arc, Mutex};

    use job_allocation_engine::api::{ApiError, Authorizer, JobApi, StaticAuthorizer};
    use job_allocation_engine::db;
    use job_allocation_engine::domain::types::{Capability, JobStatus};
    use job_allocation_engine::engine::ActualLine;

    use crate::test_helpers::{
        assert_reservation_invariant, on_hand, seed_item, setup_env, setup_env_on_disk,
        setup_env_with,
    };

    // ==========================================
    // 创建与授权
    // ==========================================

    #[test]
    fn test_create_job_starts_unreserved_and_emits_event() {
        let env = setup_env();

        let job = env.api.create_job("t1", "装配线补料", Some("白班"), "op1").unwrap();
        assert_eq!(job.status, JobStatus::Unreserved);

        let events = env.api.list_events(&job.job_id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_name, "job_created");
        assert_eq!(events[0].actor, "op1");
    }

    #[test]
    fn test_create_job_rejects_empty_name() {
        let env = setup_env();
        let err = env.api.create_job("t1", "  ", None, "op1").unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_create_job_without_capability_has_no_side_effect() {
        // 只授予其他租户的创建能力
        let auth = StaticAuthorizer::new().grant("op1", "t2", Capability::JobCreate);
        let env = setup_env_with(Arc::new(auth), None);

        let err = env.api.create_job("t1", "未授权作业", None, "op1").unwrap_err();
        assert!(matches!(err, ApiError::AuthorizationDenied { .. }));

        assert!(env.api.list_jobs("t1").unwrap().is_empty());
    }

    // ==========================================
    // BOM 行编辑
    // ==========================================

    #[test]
    fn test_upsert_bom_line_rejects_nonpositive_qty() {
        let env = setup_env();
        seed_item(&env, "item-1", 10);
        let job = env.api.create_job("t1", "a", None, "op1").unwrap();

        for qty in [0, -3] {
            let err = env
                .api
                .upsert_bom_line(&job.job_id, "item-1", qty, "op1")
                .unwrap_err();
            assert!(matches!(err, ApiError::InvalidInput(_)));
        }
        assert!(env.api.list_bom_lines(&job.job_id).unwrap().is_empty());
    }

    #[test]
    fn test_upsert_bom_line_unknown_or_cross_tenant_item() {
        let env = setup_env();
        seed_item(&env, "item-t1", 10);
        // t2 的品项对 t1 作业不可见
        crate::test_helpers::seed_item_for_tenant(&env, "item-t2", 10, "t2");

        let job = env.api.create_job("t1", "a", None, "op1").unwrap();

        let err = env
            .api
            .upsert_bom_line(&job.job_id, "no-such-item", 1, "op1")
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = env
            .api
            .upsert_bom_line(&job.job_id, "item-t2", 1, "op1")
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_upsert_bom_line_overwrites_same_item() {
        let env = setup_env();
        seed_item(&env, "item-1", 10);
        let job = env.api.create_job("t1", "a", None, "op1").unwrap();

        env.api.upsert_bom_line(&job.job_id, "item-1", 3, "op1").unwrap();
        env.api.upsert_bom_line(&job.job_id, "item-1", 7, "op1").unwrap();

        let lines = env.api.list_bom_lines(&job.job_id).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].planned_qty, 7);
    }

    #[test]
    fn test_bom_line_frozen_after_reservation() {
        let env = setup_env();
        seed_item(&env, "item-1", 10);
        let job = env.api.create_job("t1", "a", None, "op1").unwrap();
        env.api.upsert_bom_line(&job.job_id, "item-1", 4, "op1").unwrap();

        env.api.approve(&job.job_id, false, "op1").unwrap();

        let err = env
            .api
            .upsert_bom_line(&job.job_id, "item-1", 9, "op1")
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidState { .. }));

        // 计划量保持不变
        let lines = env.api.list_bom_lines(&job.job_id).unwrap();
        assert_eq!(lines[0].planned_qty, 4);
    }

    /// 在 JobEdit 授权回调内完成同一作业的审批,
    /// 制造"入口快照还是 UNRESERVED, 写入前已被并发预占"的窗口
    struct ApproveDuringEditAuthorizer {
        api: Mutex<Option<Arc<JobApi>>>,
        armed_job: Mutex<Option<String>>,
    }

    impl Authorizer for ApproveDuringEditAuthorizer {
        fn authorize(&self, actor: &str, _tenant_id: &str, capability: Capability) -> bool {
            if capability == Capability::JobEdit {
                let armed = self.armed_job.lock().unwrap().take();
                if let Some(job_id) = armed {
                    let api = self.api.lock().unwrap().clone();
                    if let Some(api) = api {
                        api.approve(&job_id, false, actor).unwrap();
                    }
                }
            }
            true
        }
    }

    #[test]
    fn test_bom_edit_rejected_when_approval_lands_mid_call() {
        let auth = Arc::new(ApproveDuringEditAuthorizer {
            api: Mutex::new(None),
            armed_job: Mutex::new(None),
        });
        let env = setup_env_with(auth.clone(), None);
        *auth.api.lock().unwrap() = Some(Arc::clone(&env.api));

        seed_item(&env, "item-1", 5);
        let job = env.api.create_job("t1", "竞态编辑", None, "op1").unwrap();
        env.api.upsert_bom_line(&job.job_id, "item-1", 2, "op1").unwrap();

        // 下一次编辑途中作业被审批为 RESERVED, 编辑必须被写入事务内复核拒绝
        *auth.armed_job.lock().unwrap() = Some(job.job_id.clone());
        let err = env
            .api
            .upsert_bom_line(&job.job_id, "item-1", 100, "op1")
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidState { .. }));

        // 计划量未被抬高, 预占不变量保持
        let lines = env.api.list_bom_lines(&job.job_id).unwrap();
        assert_eq!(lines[0].planned_qty, 2);
        assert_eq!(env.api.get_job(&job.job_id).unwrap().status, JobStatus::Reserved);
        assert_reservation_invariant(&env);
    }

    #[test]
    fn test_bom_edits_never_touch_on_hand() {
        let env = setup_env();
        seed_item(&env, "item-1", 10);
        seed_item(&env, "item-2", 5);
        let job = env.api.create_job("t1", "a", None, "op1").unwrap();

        // UNRESERVED 态任意编辑序列不影响任何在手量 (I2)
        env.api.upsert_bom_line(&job.job_id, "item-1", 3, "op1").unwrap();
        env.api.upsert_bom_line(&job.job_id, "item-2", 5, "op1").unwrap();
        env.api.upsert_bom_line(&job.job_id, "item-1", 900, "op1").unwrap();

        assert_eq!(on_hand(&env, "item-1"), 10);
        assert_eq!(on_hand(&env, "item-2"), 5);
        assert_eq!(env.api.availability("item-1").unwrap(), 10);
    }

    // ==========================================
    // 非法状态转换
    // ==========================================

    #[test]
    fn test_complete_unreserved_job_is_hard_state_error() {
        let env = setup_env();
        seed_item(&env, "item-1", 10);
        let job = env.api.create_job("t1", "a", None, "op1").unwrap();
        env.api.upsert_bom_line(&job.job_id, "item-1", 2, "op1").unwrap();

        let actuals = vec![ActualLine {
            item_id: "item-1".to_string(),
            qty_used: 2,
        }];
        let err = env.api.complete(&job.job_id, &actuals, "op1").unwrap_err();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
        assert_eq!(on_hand(&env, "item-1"), 10);
    }

    #[test]
    fn test_void_unreserved_job_is_hard_state_error() {
        // 设计决策: 从未审批的作业不允许直接作废
        let env = setup_env();
        let job = env.api.create_job("t1", "a", None, "op1").unwrap();

        let err = env.api.void(&job.job_id, "op1").unwrap_err();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
        assert_eq!(
            env.api.get_job(&job.job_id).unwrap().status,
            JobStatus::Unreserved
        );
    }

    #[test]
    fn test_approve_terminal_job_is_hard_state_error() {
        let env = setup_env();
        seed_item(&env, "item-1", 10);
        let job = env.api.create_job("t1", "a", None, "op1").unwrap();
        env.api.upsert_bom_line(&job.job_id, "item-1", 2, "op1").unwrap();
        env.api.approve(&job.job_id, false, "op1").unwrap();
        env.api.void(&job.job_id, "op1").unwrap();

        let err = env.api.approve(&job.job_id, false, "op1").unwrap_err();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
    }

    // ==========================================
    // 事件轨迹
    // ==========================================

    #[test]
    fn test_event_trail_for_full_lifecycle() {
        let env = setup_env();
        seed_item(&env, "item-1", 10);
        let job = env.api.create_job("t1", "a", None, "op1").unwrap();
        env.api.upsert_bom_line(&job.job_id, "item-1", 6, "op1").unwrap();
        env.api.approve(&job.job_id, false, "op1").unwrap();
        env.api
            .complete(
                &job.job_id,
                &[ActualLine {
                    item_id: "item-1".to_string(),
                    qty_used: 4,
                }],
                "op1",
            )
            .unwrap();

        let names: Vec<String> = env
            .api
            .list_events(&job.job_id)
            .unwrap()
            .into_iter()
            .map(|e| e.event_name)
            .collect();
        assert_eq!(
            names,
            vec![
                "job_created",
                "job_approved",
                "job_inventory_reserved",
                "job_completed",
                "job_inventory_consumed",
            ]
        );

        assert_reservation_invariant(&env);
    }

    // ==========================================
    // 磁盘库
    // ==========================================

    #[test]
    fn test_full_lifecycle_on_disk_database() {
        let env = setup_env_on_disk();
        seed_item(&env, "item-1", 10);

        let job = env.api.create_job("t1", "磁盘库作业", None, "op1").unwrap();
        env.api.upsert_bom_line(&job.job_id, "item-1", 6, "op1").unwrap();
        env.api.approve(&job.job_id, false, "op1").unwrap();
        env.api
            .complete(
                &job.job_id,
                &[ActualLine {
                    item_id: "item-1".to_string(),
                    qty_used: 5,
                }],
                "op1",
            )
            .unwrap();
        assert_eq!(on_hand(&env, "item-1"), 5);

        // 第二个连接读同一文件: 已提交状态可见
        let path = env.db_file.as_ref().unwrap().path().to_str().unwrap().to_string();
        let conn2 = db::open_sqlite_connection(&path).unwrap();
        let status: String = conn2
            .query_row(
                "SELECT status FROM job WHERE job_id = ?",
                [job.job_id.as_str()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(status, "COMPLETED");
    }
}
