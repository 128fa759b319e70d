mod common;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;

use engine::{
    Credits, DEFAULT_SUPPORT_THRESHOLD, Engine, EngineError, SUPPORT_PAGE_SIZE, SupportListParams,
    SupportStatus,
};

use common::{count, engine_with_db, insert_support_request, user_with_balance};

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

/// One author with a storefront; returns `(user_id, storefront_id)`.
async fn storefront(engine: &Engine, username: &str, store_name: &str) -> (i64, i64) {
    let user = user_with_balance(engine, username, 0).await;
    let slug = format!("{username}-store");
    let storefront = engine
        .create_storefront(user, &slug, store_name)
        .await
        .unwrap();
    (user, storefront.id)
}

#[tokio::test]
async fn page_size_is_capped() {
    let (engine, db) = engine_with_db().await;
    let (user, store) = storefront(&engine, "author", "Data Shop").await;
    let start = at(2025, 1, 1, 0);
    for n in 0..120 {
        insert_support_request(&db, store, user, "Data Shop", "pending", start + Duration::minutes(n))
            .await;
    }

    let page = engine
        .list_support_requests(&SupportListParams::default())
        .await
        .unwrap();
    assert_eq!(page.items.len(), SUPPORT_PAGE_SIZE as usize);
    assert_eq!(page.total, 120);
    assert_eq!(page.page, 1);

    let page = engine
        .list_support_requests(&SupportListParams {
            page: Some(3),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.items.len(), 20);
    assert_eq!(page.total, 120);

    let page = engine
        .list_support_requests(&SupportListParams {
            page: Some(9),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn huge_page_numbers_return_an_empty_page() {
    let (engine, db) = engine_with_db().await;
    let (user, store) = storefront(&engine, "author", "Data Shop").await;
    for n in 0..3 {
        insert_support_request(&db, store, user, "Data Shop", "pending", at(2025, 1, 1, n)).await;
    }

    let past_i64 = i64::MAX as u64 / SUPPORT_PAGE_SIZE + 2;
    for page in [u64::MAX, u64::MAX / SUPPORT_PAGE_SIZE + 2, past_i64, i64::MAX as u64] {
        let result = engine
            .list_support_requests(&SupportListParams {
                page: Some(page),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(result.items.is_empty(), "page {page} returned rows");
        assert_eq!(result.total, 3);
        assert_eq!(result.page, page);
    }
}

#[tokio::test]
async fn sorts_by_creation_time() {
    let (engine, db) = engine_with_db().await;
    let (user, store) = storefront(&engine, "author", "Data Shop").await;
    for hour in [5, 1, 9, 3, 7] {
        insert_support_request(&db, store, user, "Data Shop", "pending", at(2025, 3, 1, hour)).await;
    }

    let desc = engine
        .list_support_requests(&SupportListParams::default())
        .await
        .unwrap();
    assert!(desc.items.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    assert_eq!(desc.items[0].created_at, at(2025, 3, 1, 9));

    let asc = engine
        .list_support_requests(&SupportListParams {
            sort_order: Some("asc".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(asc.items.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    assert_eq!(asc.items[0].created_at, at(2025, 3, 1, 1));
}

#[tokio::test]
async fn date_range_is_inclusive_of_whole_days() {
    let (engine, db) = engine_with_db().await;
    let (user, store) = storefront(&engine, "author", "Data Shop").await;
    let inside_end = Utc.with_ymd_and_hms(2025, 2, 10, 23, 59, 59).unwrap();
    for created_at in [
        at(2025, 1, 31, 23),
        at(2025, 2, 1, 0),
        at(2025, 2, 5, 12),
        inside_end,
        at(2025, 2, 11, 0),
    ] {
        insert_support_request(&db, store, user, "Data Shop", "pending", created_at).await;
    }

    let page = engine
        .list_support_requests(&SupportListParams {
            date_from: Some("2025-02-01".to_string()),
            date_to: Some("2025-02-10".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    let from = at(2025, 2, 1, 0);
    assert!(
        page.items
            .iter()
            .all(|item| item.created_at >= from && item.created_at <= inside_end)
    );
}

#[tokio::test]
async fn inverted_date_range_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let err = engine
        .list_support_requests(&SupportListParams {
            date_from: Some("2025-06-01".to_string()),
            date_to: Some("2025-01-01".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn search_matches_store_and_user_names() {
    let (engine, db) = engine_with_db().await;
    let (alice, alice_store) = storefront(&engine, "alice", "Cohort Lab").await;
    let (bob, bob_store) = storefront(&engine, "bob", "Funnel Works").await;
    let (carol, carol_store) = storefront(&engine, "carol", "100% Data_Shop").await;
    insert_support_request(&db, alice_store, alice, "Cohort Lab", "pending", at(2025, 1, 1, 0)).await;
    insert_support_request(&db, bob_store, bob, "Funnel Works", "approved", at(2025, 1, 2, 0)).await;
    insert_support_request(&db, carol_store, carol, "100% Data_Shop", "pending", at(2025, 1, 3, 0))
        .await;

    let search = |keyword: &str| SupportListParams {
        search: Some(keyword.to_string()),
        ..Default::default()
    };

    let page = engine.list_support_requests(&search("COHORT")).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].store_name, "Cohort Lab");

    let page = engine.list_support_requests(&search("Bo")).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].username, "bob");

    let page = engine.list_support_requests(&search("% d")).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].username, "carol");

    let page = engine.list_support_requests(&search("a_s")).await.unwrap();
    assert_eq!(page.total, 1);

    let page = engine.list_support_requests(&search("zzz")).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn search_folds_ascii_case_only() {
    let (engine, db) = engine_with_db().await;
    let (dana, dana_store) = storefront(&engine, "dana", "CAFÉ Metrics").await;
    insert_support_request(&db, dana_store, dana, "CAFÉ Metrics", "pending", at(2025, 1, 1, 0))
        .await;

    let search = |keyword: &str| SupportListParams {
        search: Some(keyword.to_string()),
        ..Default::default()
    };

    for keyword in ["CAFÉ", "cafÉ", "CAFÉ metrics"] {
        let page = engine.list_support_requests(&search(keyword)).await.unwrap();
        assert_eq!(page.total, 1, "{keyword} missed");
    }
    let page = engine.list_support_requests(&search("café")).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn filters_combine() {
    let (engine, db) = engine_with_db().await;
    let (alice, alice_store) = storefront(&engine, "alice", "Cohort Lab").await;
    let (bob, bob_store) = storefront(&engine, "bob", "Cohort Works").await;
    insert_support_request(&db, alice_store, alice, "Cohort Lab", "pending", at(2025, 1, 1, 0)).await;
    insert_support_request(&db, bob_store, bob, "Cohort Works", "approved", at(2025, 1, 2, 0)).await;
    insert_support_request(&db, bob_store, bob, "Cohort Works", "disabled", at(2025, 3, 2, 0)).await;

    let page = engine
        .list_support_requests(&SupportListParams {
            status: Some("approved".to_string()),
            search: Some("cohort".to_string()),
            date_to: Some("2025-02-01".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].status, SupportStatus::Approved);
    assert_eq!(page.items[0].display_name, "BOB");

    assert!(matches!(
        engine
            .list_support_requests(&SupportListParams {
                status: Some("archived".to_string()),
                ..Default::default()
            })
            .await,
        Err(EngineError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn threshold_round_trip_and_rejects_bad_values() {
    let (engine, db) = engine_with_db().await;
    assert_eq!(engine.support_threshold().await, DEFAULT_SUPPORT_THRESHOLD);

    for threshold in [1, 7, 10_000, i64::from(u32::MAX)] {
        engine.set_support_threshold(threshold).await.unwrap();
        assert_eq!(engine.support_threshold().await, threshold);
    }

    engine.set_support_threshold_value(&json!("7")).await.unwrap();
    for bad in [json!("3.14"), json!(0), json!(-5), json!("ten"), json!(null)] {
        assert!(matches!(
            engine.set_support_threshold_value(&bad).await,
            Err(EngineError::InvalidInput(_))
        ));
        assert_eq!(engine.support_threshold().await, 7);
    }

    let rebuilt = Engine::builder().database(db).build().await.unwrap();
    assert_eq!(rebuilt.support_threshold().await, 7);
}

#[tokio::test]
async fn default_language_persists() {
    let (engine, db) = engine_with_db().await;
    assert_eq!(engine.default_language().await, None);
    engine.set_default_language("zh-CN").await.unwrap();
    assert_eq!(engine.default_language().await.as_deref(), Some("zh-CN"));
    assert!(engine.set_default_language("  ").await.is_err());

    let rebuilt = Engine::builder().database(db).build().await.unwrap();
    assert_eq!(rebuilt.default_language().await.as_deref(), Some("zh-CN"));
}

#[tokio::test]
async fn apply_requires_sales_above_threshold() {
    let (engine, db) = engine_with_db().await;
    engine.set_support_threshold(50).await.unwrap();
    let (author, store) = storefront(&engine, "author", "Cohort Lab").await;
    let buyer = user_with_balance(&engine, "buyer", 200).await;
    let pack = engine
        .publish_pack(author, "Cohorts", "per_use", 30)
        .await
        .unwrap();

    engine.charge_for_download(buyer, pack.id).await.unwrap();
    assert!(matches!(
        engine.apply_for_support(author, store, "Analytics", "hi").await,
        Err(EngineError::InvalidInput(_))
    ));
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM storefront_support_requests", vec![]).await,
        0
    );

    engine.charge_for_download(buyer, pack.id).await.unwrap();
    let request = engine
        .apply_for_support(author, store, "Analytics", "hi")
        .await
        .unwrap();
    assert_eq!(request.status, SupportStatus::Pending);
    assert_eq!(request.store_name, "Cohort Lab");
    assert_eq!(request.username, "author");

    assert!(matches!(
        engine.apply_for_support(author, store, "Analytics", "again").await,
        Err(EngineError::ExistingKey(_))
    ));
    assert!(matches!(
        engine.apply_for_support(buyer, store, "Analytics", "not mine").await,
        Err(EngineError::InvalidInput(_)) | Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn threshold_beyond_cent_range_is_never_reached() {
    let (engine, _db) = engine_with_db().await;
    let (author, store) = storefront(&engine, "author", "Cohort Lab").await;

    let huge = engine
        .set_support_threshold_value(&json!("100000000000000000"))
        .await
        .unwrap();
    assert_eq!(huge, 100_000_000_000_000_000);
    assert_eq!(engine.support_threshold().await, huge);

    assert!(!engine.is_eligible_for_support(Credits::ZERO).await);
    assert!(!engine.is_eligible_for_support(Credits::new(i64::MAX)).await);
    assert!(matches!(
        engine.apply_for_support(author, store, "Analytics", "hi").await,
        Err(EngineError::InvalidInput(_))
    ));

    engine.set_support_threshold(i64::MAX / 100).await.unwrap();
    assert!(engine.is_eligible_for_support(Credits::new(i64::MAX)).await);
    assert!(!engine.is_eligible_for_support(Credits::whole(1_000)).await);
}

#[tokio::test]
async fn review_lifecycle() {
    let (engine, db) = engine_with_db().await;
    let (author, store) = storefront(&engine, "author", "Cohort Lab").await;
    insert_support_request(&db, store, author, "Cohort Lab", "pending", at(2025, 1, 1, 0)).await;
    let id = engine
        .list_support_requests(&SupportListParams::default())
        .await
        .unwrap()
        .items[0]
        .id;

    assert!(matches!(
        engine.reenable_support_request(id).await,
        Err(EngineError::InvalidTransition(_))
    ));
    assert!(matches!(
        engine.disable_support_request(id, "spam").await,
        Err(EngineError::InvalidTransition(_))
    ));

    let approved = engine.approve_support_request(id).await.unwrap();
    assert_eq!(approved.status, SupportStatus::Approved);
    assert!(approved.reviewed_at.is_some());
    assert!(matches!(
        engine.approve_support_request(id).await,
        Err(EngineError::InvalidTransition(_))
    ));

    assert!(matches!(
        engine.disable_support_request(id, "  ").await,
        Err(EngineError::InvalidInput(_))
    ));
    let disabled = engine.disable_support_request(id, "spam").await.unwrap();
    assert_eq!(disabled.status, SupportStatus::Disabled);
    assert_eq!(disabled.disable_reason.as_deref(), Some("spam"));

    let reenabled = engine.reenable_support_request(id).await.unwrap();
    assert_eq!(reenabled.status, SupportStatus::Approved);
    assert_eq!(reenabled.disable_reason, None);

    assert!(matches!(
        engine.approve_support_request(4242).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn storefront_slugs_are_unique() {
    let (engine, _db) = engine_with_db().await;
    let user = user_with_balance(&engine, "author", 0).await;
    engine.create_storefront(user, "Data-Shop", "Data Shop").await.unwrap();
    assert_eq!(
        engine
            .create_storefront(user, "data-shop", "Other")
            .await
            .unwrap_err(),
        EngineError::ExistingKey("data-shop".to_string())
    );
    assert!(matches!(
        engine.create_storefront(user, "bad slug", "Other").await,
        Err(EngineError::InvalidInput(_))
    ));
}
