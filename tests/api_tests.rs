mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use common::{record, setup_db};
use moviesync::{
    reconcile::Reconciler,
    routes::{AppState, router},
};
use serde_json::Value;
use tower::ServiceExt;

async fn app_with_movies() -> Router {
    let db = setup_db().await;
    let reconciler = Reconciler::new(db.clone());

    // Inserted in order, so ids are 1, 2, 3.
    reconciler
        .reconcile(&record("Alien", 1979, &["Sigourney Weaver"], &["Horror", "Sci-Fi"]))
        .await
        .unwrap();
    reconciler
        .reconcile(&record("Blade Runner", 1982, &["Harrison Ford"], &["Sci-Fi"]))
        .await
        .unwrap();
    reconciler
        .reconcile(&record("Casablanca", 1942, &["Humphrey Bogart"], &["Drama"]))
        .await
        .unwrap();

    router(AppState { db })
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap();
    (status, value)
}

fn movie_ids(body: &Value) -> Vec<i64> {
    body["movies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|movie| movie["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn index_links_to_the_movie_listing() {
    let app = app_with_movies().await;
    let (status, body) = get_json(&app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["movies_url"], "/movies");
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app_with_movies().await;
    let (status, body) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn single_movie_rehydrates_the_stored_payload() {
    let app = app_with_movies().await;
    let (status, body) = get_json(&app, "/movies/1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 1);
    assert_eq!(body["title"], "Alien");
    assert_eq!(body["year"], 1979);
    assert_eq!(body["cast"], serde_json::json!(["Sigourney Weaver"]));
    assert_eq!(body["genres"], serde_json::json!(["Horror", "Sci-Fi"]));
    assert_eq!(body["self_url"], "/movies/1");
}

#[tokio::test]
async fn unknown_movie_id_is_not_found() {
    let app = app_with_movies().await;
    let (status, body) = get_json(&app, "/movies/999").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn listing_orders_by_descending_id() {
    let app = app_with_movies().await;
    let (status, body) = get_json(&app, "/movies").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(movie_ids(&body), vec![3, 2, 1]);
    assert_eq!(body["next_url"], Value::Null);
}

#[tokio::test]
async fn cursor_walks_the_listing_to_an_empty_page() {
    let app = app_with_movies().await;

    let (_, page1) = get_json(&app, "/movies?limit=2").await;
    assert_eq!(movie_ids(&page1), vec![3, 2]);
    assert_eq!(page1["next_url"], "/movies?limit=2&start=2");

    let (_, page2) = get_json(&app, "/movies?limit=2&start=2").await;
    assert_eq!(movie_ids(&page2), vec![1]);
    assert_eq!(page2["next_url"], Value::Null);

    // A full final page yields one more cursor, which lands on an
    // empty but well-formed page.
    let (_, page3) = get_json(&app, "/movies?limit=1&start=2").await;
    assert_eq!(movie_ids(&page3), vec![1]);
    assert_eq!(page3["next_url"], "/movies?limit=1&start=1");

    let (status, page4) = get_json(&app, "/movies?limit=1&start=1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(movie_ids(&page4).is_empty());
    assert_eq!(page4["next_url"], Value::Null);
}

#[tokio::test]
async fn listing_filters_by_title_and_year() {
    let app = app_with_movies().await;

    let (_, by_title) = get_json(&app, "/movies?title=Alien").await;
    assert_eq!(movie_ids(&by_title), vec![1]);

    let (_, by_year) = get_json(&app, "/movies?year=1942").await;
    assert_eq!(movie_ids(&by_year), vec![3]);
}

#[tokio::test]
async fn listing_filters_by_cast_and_genre() {
    let app = app_with_movies().await;

    let (_, by_cast) = get_json(&app, "/movies?cast=Harrison%20Ford").await;
    assert_eq!(movie_ids(&by_cast), vec![2]);

    let (_, by_genre) = get_json(&app, "/movies?genre=Sci-Fi").await;
    assert_eq!(movie_ids(&by_genre), vec![2, 1]);
}

#[tokio::test]
async fn filters_compose_with_the_cursor() {
    let app = app_with_movies().await;

    let (_, page1) = get_json(&app, "/movies?genre=Sci-Fi&limit=1").await;
    assert_eq!(movie_ids(&page1), vec![2]);
    assert_eq!(page1["next_url"], "/movies?genre=Sci-Fi&limit=1&start=2");

    let (_, page2) = get_json(&app, "/movies?genre=Sci-Fi&limit=1&start=2").await;
    assert_eq!(movie_ids(&page2), vec![1]);
}
