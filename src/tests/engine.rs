use super::{memory_engine, product};
use crate::{
    comparison::MAX_COMPARISON_ITEMS,
    engine::PersonalizationEngine,
    preferences::{BudgetTier, PreferencesUpdate, PriceRange, SearchFilters, Theme},
    product::ProductId,
    search_context::{MAX_HISTORY_ENTRIES, MAX_RECENT_QUERIES},
    storage::{BackendLocal, USER_CONTEXT_KEY, WISHLIST_KEY},
};
use std::sync::Arc;

fn office_prefs() -> PreferencesUpdate {
    PreferencesUpdate {
        categories: Some(vec!["Office".into()]),
        ..Default::default()
    }
}

#[test]
fn office_scenario_ranks_preferred_category_first() {
    let (mut engine, _) = memory_engine();
    engine.preferences_mut().update(office_prefs()).unwrap();
    engine
        .wishlist_mut()
        .add(&product(50, "Office", 420.0))
        .unwrap();

    let ranked = engine.rank(vec![product(1, "Office", 100.0), product(2, "Bedroom", 100.0)]);

    assert_eq!(ranked[0].product.id, ProductId::from(1));
    assert!(ranked[0].personalized_score > ranked[1].personalized_score);
    assert_eq!(ranked[0].personalized_score, 30);
    assert_eq!(ranked[1].personalized_score, 10);
}

#[test]
fn rank_is_pure() {
    let (mut engine, _) = memory_engine();
    engine.preferences_mut().update(office_prefs()).unwrap();
    engine
        .search_context_mut()
        .record_search(
            "ergonomic chair",
            &[],
            &SearchFilters {
                categories: vec!["Office".into(), "Living".into()],
                ..Default::default()
            },
        )
        .unwrap();

    let products = vec![
        product(1, "Living", 80.0),
        product(2, "Office", 9000.0),
        product(3, "Patio", 10.0),
        product(4, "Office", 250.0),
    ];

    let first = engine.rank(products.clone());
    let second = engine.rank(products);
    assert_eq!(first, second);
    assert_eq!(first[0].product.id, ProductId::from(4));
}

#[test]
fn five_comparison_adds() {
    let (mut engine, _) = memory_engine();

    let outcomes = (1..=5)
        .map(|id| engine.comparison_mut().add(&product(id, "Office", 99.0)))
        .collect::<Vec<_>>();

    assert!(outcomes[..4].iter().all(|o| o.success));
    assert!(!outcomes[4].success);
    assert_eq!(outcomes[4].message, "Maximum 4 items for comparison");
    assert_eq!(engine.comparison().count(), MAX_COMPARISON_ITEMS);
}

#[test]
fn wishlist_add_is_idempotent() {
    let (mut engine, _) = memory_engine();
    let sofa = product(7, "Living", 899.0);

    assert!(engine.wishlist_mut().add(&sofa).unwrap());
    assert!(!engine.wishlist_mut().add(&sofa).unwrap());
    assert_eq!(engine.wishlist().len(), 1);
}

#[test]
fn history_keeps_latest_hundred() {
    let (mut engine, _) = memory_engine();
    for i in 0..105 {
        engine
            .search_context_mut()
            .record_search(&format!("query {i}"), &[], &SearchFilters::default())
            .unwrap();
    }

    let history = engine.search_context().history();
    assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
    assert_eq!(history[0].query, "query 104");
    assert_eq!(history[99].query, "query 5");
    assert!(history.windows(2).all(|w| w[0].id > w[1].id));

    let recent = &engine.search_context().context().recent_queries;
    assert_eq!(recent.len(), MAX_RECENT_QUERIES);
    let mut unique = recent.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), recent.len());
}

#[test]
fn export_clear_import_round_trip() {
    let (mut engine, _) = memory_engine();
    engine
        .preferences_mut()
        .update(PreferencesUpdate {
            price_range: Some(PriceRange {
                min: 100.0,
                max: 900.0,
            }),
            brands: Some(vec!["Nordic".into()]),
            budget: Some(BudgetTier::High),
            theme: Some(Theme::Dark),
            ..office_prefs()
        })
        .unwrap();
    engine.wishlist_mut().add(&product(1, "Office", 300.0)).unwrap();
    engine.wishlist_mut().add(&product(2, "Living", 500.0)).unwrap();
    engine.comparison_mut().add(&product(3, "Office", 150.0));
    engine
        .search_context_mut()
        .record_search("walnut desk", &[], &SearchFilters::default())
        .unwrap();

    let prefs_before = engine.preferences().get().clone();
    let exported = engine.export_json().unwrap();

    engine.clear_all().unwrap();
    assert!(engine.wishlist().is_empty());
    assert_eq!(engine.comparison().count(), 0);
    assert_eq!(engine.search_context().total_searches(), 0);

    let report = engine.import_all(&exported);
    assert!(report.success, "{}", report.message);
    assert_eq!(engine.wishlist().len(), 2);
    assert_eq!(engine.comparison().count(), 1);
    assert_eq!(engine.preferences().get(), &prefs_before);
    assert_eq!(engine.search_context().history()[0].query, "walnut desk");
}

#[test]
fn partial_bundle_leaves_other_sections() {
    let (mut engine, _) = memory_engine();
    engine.wishlist_mut().add(&product(1, "Office", 300.0)).unwrap();

    let report = engine.import_all(r#"{"version": 1, "preferences": {"categories": ["Patio"]}}"#);
    assert!(report.success);
    assert_eq!(engine.preferences().get().categories, vec!["Patio"]);
    assert_eq!(engine.wishlist().len(), 1);
}

#[test]
fn newer_export_version_is_refused() {
    let (mut engine, _) = memory_engine();
    let report = engine.import_all(r#"{"version": 99, "preferences": {"categories": ["Patio"]}}"#);
    assert!(!report.success);
    assert!(report.message.starts_with("Unsupported export version"));
    assert!(engine.preferences().get().categories.is_empty());
}

#[test]
fn state_survives_restart_on_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let open = || {
        let storage = BackendLocal::new(tmp.path().to_str().unwrap()).unwrap();
        PersonalizationEngine::load(Arc::new(storage))
    };

    {
        let mut engine = open();
        engine.preferences_mut().update(office_prefs()).unwrap();
        engine.comparison_mut().add(&product(1, "Office", 10.0));
        engine.comparison_mut().add(&product(2, "Office", 20.0));
        engine
            .search_context_mut()
            .record_search("desk", &[], &SearchFilters::default())
            .unwrap();
    }

    let engine = open();
    assert_eq!(engine.preferences().get().categories, vec!["Office"]);
    assert_eq!(engine.comparison().count(), 2);
    assert!(engine.comparison().matrix().is_some());
    assert_eq!(engine.search_context().total_searches(), 1);
    // sessions do not outlive the process
    assert!(engine.search_context().context().current_session.is_empty());
}

#[test]
fn storage_failure_leaves_memory_untouched() {
    let (mut engine, storage) = memory_engine();
    engine.wishlist_mut().add(&product(1, "Office", 300.0)).unwrap();

    storage.reject_writes(true);
    assert!(engine.wishlist_mut().add(&product(2, "Office", 300.0)).is_err());
    assert!(engine.preferences_mut().update(office_prefs()).is_err());
    assert!(engine
        .search_context_mut()
        .record_search("desk", &[], &SearchFilters::default())
        .is_err());

    assert_eq!(engine.wishlist().len(), 1);
    assert!(engine.preferences().get().categories.is_empty());
    assert_eq!(engine.search_context().total_searches(), 0);
}

#[test]
fn clear_all_failure_keeps_each_store_consistent() {
    let (mut engine, storage) = memory_engine();
    engine.preferences_mut().update(office_prefs()).unwrap();
    engine.wishlist_mut().add(&product(1, "Office", 300.0)).unwrap();
    engine
        .search_context_mut()
        .record_search("oak desk", &[], &SearchFilters::default())
        .unwrap();

    storage.fail_key(USER_CONTEXT_KEY);
    assert!(engine.clear_all().is_err());

    // stores after the failing one are still cleared
    assert!(engine.preferences().get().categories.is_empty());
    assert!(engine.wishlist().is_empty());
    assert_eq!(engine.search_context().total_searches(), 1);

    let reloaded = PersonalizationEngine::load(storage.clone());
    assert!(reloaded.preferences().get().categories.is_empty());
    assert!(reloaded.wishlist().is_empty());
    assert_eq!(reloaded.search_context().history().len(), 1);
    assert_eq!(
        reloaded.search_context().context().recent_queries,
        vec!["oak desk"]
    );
}

#[test]
fn import_rolls_back_when_a_later_section_fails() {
    let (mut engine, storage) = memory_engine();
    engine.wishlist_mut().add(&product(1, "Office", 300.0)).unwrap();
    engine
        .search_context_mut()
        .record_search("walnut desk", &[], &SearchFilters::default())
        .unwrap();

    let bundle = r#"{
        "version": 1,
        "preferences": {"categories": ["Patio"]},
        "search_history": [],
        "user_context": {"recent_queries": ["teak bench"]},
        "wishlist": []
    }"#;

    storage.fail_key(WISHLIST_KEY);
    let report = engine.import_all(bundle);
    assert!(!report.success);
    assert!(report.message.starts_with("Failed to store imported data"));

    assert!(engine.preferences().get().categories.is_empty());
    assert_eq!(engine.search_context().history()[0].query, "walnut desk");
    assert_eq!(engine.wishlist().len(), 1);

    let reloaded = PersonalizationEngine::load(storage.clone());
    assert!(reloaded.preferences().get().categories.is_empty());
    assert_eq!(reloaded.search_context().history()[0].query, "walnut desk");
    assert_eq!(
        reloaded.search_context().context().recent_queries,
        vec!["walnut desk"]
    );
    assert_eq!(reloaded.wishlist().len(), 1);
}
