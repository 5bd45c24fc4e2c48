//! End-to-end entitlement gate tests over the file-backed store.

mod common;

use common::{free_user, seed_user, test_engine, test_env};
use petfolio::entitlement::{
    check_limit, days_remaining, GatedFeature, FREE_ASSISTANT_LIMIT, FREE_CALCULATOR_LIMIT,
};
use petfolio::error::AppError;
use petfolio::models::PlanTier;
use petfolio::store::PetStore;
use petfolio::time_utils::{now_millis, DAY_MS};

#[tokio::test]
async fn test_free_assistant_limit_blocks_after_two() {
    let (_dir, store, sessions) = test_env().await;
    let engine = test_engine(store.clone(), sessions);

    let user = free_user("u-assist");
    seed_user(store.as_ref(), &user).await;

    for i in 0..FREE_ASSISTANT_LIMIT {
        let current = store.get_user("u-assist").await.unwrap().unwrap();
        assert!(
            check_limit(&current, GatedFeature::Assistant, now_millis()),
            "question {} should be allowed",
            i + 1
        );
        engine
            .consume("u-assist", GatedFeature::Assistant)
            .await
            .unwrap();
    }

    let current = store.get_user("u-assist").await.unwrap().unwrap();
    assert!(!check_limit(&current, GatedFeature::Assistant, now_millis()));
    // The other feature's counter is untouched
    assert!(check_limit(&current, GatedFeature::Calculator, now_millis()));
}

#[tokio::test]
async fn test_free_calculator_limit_blocks_after_one() {
    let (_dir, store, sessions) = test_env().await;
    let engine = test_engine(store.clone(), sessions);

    seed_user(store.as_ref(), &free_user("u-calc")).await;

    assert_eq!(FREE_CALCULATOR_LIMIT, 1);
    engine
        .consume("u-calc", GatedFeature::Calculator)
        .await
        .unwrap();

    let current = store.get_user("u-calc").await.unwrap().unwrap();
    assert!(!check_limit(&current, GatedFeature::Calculator, now_millis()));
}

#[tokio::test]
async fn test_paid_tiers_never_blocked() {
    let (_dir, store, sessions) = test_env().await;
    let engine = test_engine(store.clone(), sessions);

    let mut user = free_user("u-paid");
    seed_user(store.as_ref(), &user).await;
    engine
        .update_plan("u-paid", PlanTier::Monthly)
        .await
        .unwrap();

    // Run the counters well past the free limits
    for _ in 0..10 {
        engine
            .consume("u-paid", GatedFeature::Assistant)
            .await
            .unwrap();
        engine
            .consume("u-paid", GatedFeature::Calculator)
            .await
            .unwrap();
    }

    user = store.get_user("u-paid").await.unwrap().unwrap();
    assert_eq!(user.usage_or_default().ai_questions, 10);
    assert!(check_limit(&user, GatedFeature::Assistant, now_millis()));
    assert!(check_limit(&user, GatedFeature::Calculator, now_millis()));
}

#[tokio::test]
async fn test_consume_is_monotonic_and_persisted() {
    let (_dir, store, sessions) = test_env().await;
    let engine = test_engine(store.clone(), sessions);

    seed_user(store.as_ref(), &free_user("u-mono")).await;

    let mut last = 0;
    for _ in 0..5 {
        let usage = engine
            .consume("u-mono", GatedFeature::Assistant)
            .await
            .unwrap();
        assert!(usage.ai_questions > last, "counter must only increase");
        last = usage.ai_questions;
    }

    let stored = store.get_user("u-mono").await.unwrap().unwrap();
    assert_eq!(stored.usage_or_default().ai_questions, 5);
}

#[tokio::test]
async fn test_consume_surfaces_missing_user() {
    let (_dir, store, sessions) = test_env().await;
    let engine = test_engine(store, sessions);

    let err = engine
        .consume("nobody", GatedFeature::Assistant)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_plan_upgrade_sets_expiry() {
    let (_dir, store, sessions) = test_env().await;
    let engine = test_engine(store.clone(), sessions.clone());

    seed_user(store.as_ref(), &free_user("u-plan")).await;

    let before = now_millis();
    let user = engine
        .update_plan("u-plan", PlanTier::Monthly)
        .await
        .unwrap();
    let after = now_millis();

    assert_eq!(user.plan, PlanTier::Monthly);
    let expires = user.plan_expires_at.unwrap();
    assert!(expires >= before + 30 * DAY_MS && expires <= after + 30 * DAY_MS);

    let user = engine
        .update_plan("u-plan", PlanTier::Annual)
        .await
        .unwrap();
    let expires = user.plan_expires_at.unwrap();
    assert!(expires >= before + 365 * DAY_MS);

    // The new tier is visible immediately through the session snapshot
    let cached = sessions.current("u-plan").await.unwrap().unwrap();
    assert_eq!(cached.plan, PlanTier::Annual);
    assert!(days_remaining(&cached, now_millis()).unwrap() >= 364);

    // Back to free clears the expiry
    let user = engine.update_plan("u-plan", PlanTier::Free).await.unwrap();
    assert_eq!(user.plan_expires_at, None);
}
