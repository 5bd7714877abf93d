// ==========================================
// 审批校验器测试
// ==========================================
// 职责: 验证可承诺量核算、阻断与缺口记录、幂等重审批、
//       以及 wasFulfillableHint 的诊断语义
// ==========================================


#[cfg(test)]
mod approval_engine_test {
    use job_allocation_engine::domain::types::{JobStatus, ShortfallStatus};
    use job_allocation_engine::engine::approval::{REASON_EMPTY_BOM, REASON_INVENTORY_CHANGED};

    use crate::test_helpers::{assert_reservation_invariant, on_hand, seed_item, setup_env, TestEnv};

    /// 建一个带单行 BOM 的作业
    fn job_with_line(env: &TestEnv, name: &str, item_id: &str, qty: i64) -> String {
        let job = env.api.create_job("t1", name, None, "op1").unwrap();
        env.api.upsert_bom_line(&job.job_id, item_id, qty, "op1").unwrap();
        job.job_id
    }

    // ==========================================
    // 预占不扣在手量
    // ==========================================

    #[test]
    fn test_approve_reserves_without_decrementing_on_hand() {
        let env = setup_env();
        seed_item(&env, "item-1", 10);
        let job_id = job_with_line(&env, "a", "item-1", 6);

        let outcome = env.api.approve(&job_id, false, "op1").unwrap();
        assert_eq!(outcome.status, JobStatus::Reserved);
        assert!(!outcome.blocked);
        assert!(!outcome.idempotent);
        assert!(outcome.shortfalls.is_empty());

        // 预占只做逻辑扣减: 在手量不动, 可承诺量下降
        assert_eq!(on_hand(&env, "item-1"), 10);
        assert_eq!(env.api.availability("item-1").unwrap(), 4);
        assert_reservation_invariant(&env);
    }

    #[test]
    fn test_approve_idempotent_reapproval() {
        let env = setup_env();
        seed_item(&env, "item-1", 10);
        let job_id = job_with_line(&env, "a", "item-1", 6);

        let first = env.api.approve(&job_id, false, "op1").unwrap();
        let availability_after_first = env.api.availability("item-1").unwrap();

        let second = env.api.approve(&job_id, false, "op1").unwrap();
        assert_eq!(second.status, JobStatus::Reserved);
        assert!(!second.blocked);
        assert!(second.idempotent);
        assert!(!first.idempotent);

        // 预占账目在两次调用之间不变
        assert_eq!(env.api.availability("item-1").unwrap(), availability_after_first);

        // 幂等空操作不追加事件
        let approved_events = env
            .api
            .list_events(&job_id)
            .unwrap()
            .into_iter()
            .filter(|e| e.event_name == "job_approved")
            .count();
        assert_eq!(approved_events, 1);
    }

    // ==========================================
    // 阻断与缺口
    // ==========================================

    #[test]
    fn test_blocked_approval_records_shortfall() {
        let env = setup_env();
        seed_item(&env, "item-1", 2);
        let job_id = job_with_line(&env, "a", "item-1", 5);

        let outcome = env.api.approve(&job_id, false, "op1").unwrap();
        assert!(outcome.blocked);
        assert_eq!(outcome.status, JobStatus::Unreserved);
        // 无 hint 时不给 inventory_changed 诊断
        assert_eq!(outcome.reason, None);
        assert_eq!(outcome.shortfalls.len(), 1);
        assert_eq!(outcome.shortfalls[0].missing_qty, 3);

        let active = env.api.list_active_shortfalls(&job_id).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].missing_qty, 3);
        assert_eq!(active[0].status, ShortfallStatus::Active);

        // 阻断不改变作业状态与在手量
        assert_eq!(env.api.get_job(&job_id).unwrap().status, JobStatus::Unreserved);
        assert_eq!(on_hand(&env, "item-1"), 2);

        // 阻断作为业务结果入事件流
        let names: Vec<String> = env
            .api
            .list_events(&job_id)
            .unwrap()
            .into_iter()
            .map(|e| e.event_name)
            .collect();
        assert!(names.contains(&"job_approval_blocked".to_string()));
    }

    #[test]
    fn test_restock_then_reapprove_clears_shortfall() {
        let env = setup_env();
        seed_item(&env, "item-1", 2);
        let job_id = job_with_line(&env, "a", "item-1", 5);

        let blocked = env.api.approve(&job_id, false, "op1").unwrap();
        assert!(blocked.blocked);
        assert_eq!(blocked.shortfalls[0].missing_qty, 3);

        // 补货到 10 后重审批
        seed_item(&env, "item-1", 10);
        let outcome = env.api.approve(&job_id, true, "op1").unwrap();
        assert!(!outcome.blocked);
        assert_eq!(outcome.status, JobStatus::Reserved);

        // 缺口已消解
        assert!(env.api.list_active_shortfalls(&job_id).unwrap().is_empty());
        assert_reservation_invariant(&env);
    }

    #[test]
    fn test_reevaluation_supersedes_previous_shortfall() {
        let env = setup_env();
        seed_item(&env, "item-1", 0);
        let job_id = job_with_line(&env, "a", "item-1", 5);

        env.api.approve(&job_id, false, "op1").unwrap();
        assert_eq!(
            env.api.list_active_shortfalls(&job_id).unwrap()[0].missing_qty,
            5
        );

        // 部分补货: 缺口被覆盖而非累加
        seed_item(&env, "item-1", 3);
        env.api.approve(&job_id, false, "op1").unwrap();

        let active = env.api.list_active_shortfalls(&job_id).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].missing_qty, 2);
    }

    // ==========================================
    // 两作业竞争场景
    // ==========================================

    #[test]
    fn test_two_jobs_contend_for_last_units() {
        let env = setup_env();
        seed_item(&env, "item-1", 5);
        let job_a = job_with_line(&env, "A", "item-1", 4);
        let job_b = job_with_line(&env, "B", "item-1", 4);

        // B 先审批成功, 在手量保持 5
        let outcome_b = env.api.approve(&job_b, true, "op1").unwrap();
        assert!(!outcome_b.blocked);
        assert_eq!(on_hand(&env, "item-1"), 5);

        // A 再审批: 可用量只剩 1, 阻断并诊断为 inventory_changed
        let outcome_a = env.api.approve(&job_a, true, "op1").unwrap();
        assert!(outcome_a.blocked);
        assert_eq!(outcome_a.reason.as_deref(), Some(REASON_INVENTORY_CHANGED));
        assert_eq!(outcome_a.shortfalls.len(), 1);
        assert_eq!(outcome_a.shortfalls[0].missing_qty, 3);

        let active = env.api.list_active_shortfalls(&job_a).unwrap();
        assert_eq!(active[0].missing_qty, 3);
        assert_reservation_invariant(&env);
    }

    // ==========================================
    // 多品项与边界
    // ==========================================

    #[test]
    fn test_multi_item_job_blocks_on_single_undercovered_line() {
        let env = setup_env();
        seed_item(&env, "item-1", 10);
        seed_item(&env, "item-2", 1);

        let job = env.api.create_job("t1", "a", None, "op1").unwrap();
        env.api.upsert_bom_line(&job.job_id, "item-1", 4, "op1").unwrap();
        env.api.upsert_bom_line(&job.job_id, "item-2", 3, "op1").unwrap();

        let outcome = env.api.approve(&job.job_id, false, "op1").unwrap();
        assert!(outcome.blocked);
        // 只有欠覆盖的行产生缺口
        assert_eq!(outcome.shortfalls.len(), 1);
        assert_eq!(outcome.shortfalls[0].item_id, "item-2");
        assert_eq!(outcome.shortfalls[0].missing_qty, 2);

        // 整体保持 UNRESERVED: 不存在部分预占
        assert_eq!(env.api.get_job(&job.job_id).unwrap().status, JobStatus::Unreserved);
        assert_eq!(env.api.availability("item-1").unwrap(), 10);
    }

    #[test]
    fn test_empty_bom_job_not_approvable() {
        let env = setup_env();
        let job = env.api.create_job("t1", "空作业", None, "op1").unwrap();

        let outcome = env.api.approve(&job.job_id, false, "op1").unwrap();
        assert!(outcome.blocked);
        assert_eq!(outcome.reason.as_deref(), Some(REASON_EMPTY_BOM));
        assert!(outcome.shortfalls.is_empty());
        assert_eq!(env.api.get_job(&job.job_id).unwrap().status, JobStatus::Unreserved);
    }

    #[test]
    fn test_negative_availability_reports_full_planned_as_missing() {
        let env = setup_env();
        seed_item(&env, "item-1", 4);
        let job_a = job_with_line(&env, "A", "item-1", 4);
        let job_b = job_with_line(&env, "B", "item-1", 2);

        env.api.approve(&job_a, false, "op1").unwrap();

        // B 视角可用量 = 4 − 4 = 0, missing = planned − max(0,0) = 2
        let outcome = env.api.approve(&job_b, false, "op1").unwrap();
        assert!(outcome.blocked);
        assert_eq!(outcome.shortfalls[0].available, 0);
        assert_eq!(outcome.shortfalls[0].missing_qty, 2);
    }
}
