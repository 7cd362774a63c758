use std::sync::atomic::Ordering;

use super::{fake_service, product, FakeBackend};
use crate::{
    preferences::PreferencesUpdate,
    product::ProductId,
    service::{validate_search, InvalidSearch, SearchOpts},
};

fn office_backend() -> FakeBackend {
    FakeBackend::with_results(vec![
        product(1, "Bedroom", 200.0),
        product(2, "Office", 200.0),
        product(3, "Office", 9000.0),
    ])
}

#[test]
fn search_records_history_and_ranks() {
    let (mut service, _) = fake_service(office_backend());
    service
        .engine_mut()
        .preferences_mut()
        .update(PreferencesUpdate {
            categories: Some(vec!["Office".into()]),
            ..Default::default()
        })
        .unwrap();

    let results = service
        .search(
            "office desk",
            SearchOpts {
                max_results: Some(8),
                personalize_filters: true,
                raw: false,
            },
        )
        .unwrap();

    let ids = results
        .results
        .iter()
        .map(|p| p.product.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["2", "3", "1"]);
    assert_eq!(results.entry.result_count, 3);

    let context = service.engine().search_context();
    assert_eq!(context.total_searches(), 1);
    assert_eq!(context.history()[0].id, results.entry.id);
    assert_eq!(context.context().category_count("Office"), 1);
}

#[test]
fn personalized_filters_are_sent_to_backend() {
    let backend = office_backend();
    let (mut service, _) = fake_service(backend.clone());

    service
        .search(
            "lamp",
            SearchOpts {
                max_results: Some(5),
                personalize_filters: true,
                raw: false,
            },
        )
        .unwrap();
    let sent = backend.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(sent.max_results, Some(5));
    let filters = sent.filters.unwrap();
    assert_eq!(filters.price_min, Some(0.0));
    assert_eq!(filters.price_max, Some(5000.0));

    service.search("lamp", SearchOpts::default()).unwrap();
    let sent = backend.last_request.lock().unwrap().clone().unwrap();
    assert!(sent.filters.is_none());
}

#[test]
fn raw_search_keeps_backend_order() {
    let (mut service, _) = fake_service(office_backend());
    service
        .engine_mut()
        .preferences_mut()
        .update(PreferencesUpdate {
            categories: Some(vec!["Office".into()]),
            ..Default::default()
        })
        .unwrap();

    let results = service
        .search(
            "desk",
            SearchOpts {
                raw: true,
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(results.results[0].product.id, ProductId::from(1));
    assert_eq!(results.results[0].personalized_score, 10);
    assert_eq!(results.results[1].personalized_score, 25);
}

#[test]
fn backend_failure_records_nothing() {
    let backend = office_backend();
    backend.fail.store(true, Ordering::SeqCst);
    let (mut service, _) = fake_service(backend);

    assert!(service.search("desk", SearchOpts::default()).is_err());
    assert_eq!(service.engine().search_context().total_searches(), 0);
}

#[test]
fn unwritable_history_still_returns_results() {
    let (mut service, storage) = fake_service(office_backend());
    storage.reject_writes(true);

    let results = service.search("desk", SearchOpts::default()).unwrap();
    assert_eq!(results.results.len(), 3);
    assert_eq!(service.engine().search_context().total_searches(), 0);
}

#[test]
fn search_limits_follow_backend() {
    assert_eq!(validate_search(" \t", None), Err(InvalidSearch::EmptyQuery));
    assert_eq!(validate_search(&"é".repeat(500), Some(50)), Ok(()));
    assert_eq!(
        validate_search(&"é".repeat(501), None),
        Err(InvalidSearch::QueryTooLong(501))
    );
    assert_eq!(validate_search("desk", Some(0)), Err(InvalidSearch::MaxResults(0)));
    assert_eq!(validate_search("desk", Some(51)), Err(InvalidSearch::MaxResults(51)));
}

#[test]
fn invalid_search_never_reaches_backend() {
    let backend = office_backend();
    let (mut service, _) = fake_service(backend.clone());

    let err = service
        .search(
            "desk",
            SearchOpts {
                max_results: Some(100),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<InvalidSearch>(),
        Some(&InvalidSearch::MaxResults(100))
    );
    assert!(backend.last_request.lock().unwrap().is_none());
    assert_eq!(service.engine().search_context().total_searches(), 0);
}

#[test]
fn catalog_listings_pass_through() {
    let (service, _) = fake_service(office_backend());
    let categories = service.categories().unwrap();
    assert_eq!(categories.total, 2);
    assert_eq!(categories.counts.get("Office"), Some(&2));
    assert_eq!(service.analytics().unwrap().overview.total_products, 3);
}
