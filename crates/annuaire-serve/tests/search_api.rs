// Integration tests for the search HTTP API
//
// Requests go through the full router (state, CORS, tracing) with
// `tower::ServiceExt::oneshot` against an in-memory SQLite store.

use annuaire_serve::{create_app, AppState, ServerConfig};
use annuaire_stockage::{BusinessStore, NewBusiness, Storage};
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "admin-secret";

struct Fixture {
    app: Router,
    state: AppState,
    bakery: i64,
    club: i64,
    cafe: i64,
}

fn fixture() -> Fixture {
    let storage = Storage::open_in_memory().unwrap();
    let store = BusinessStore::new(&storage);
    let bakery = store
        .insert(
            &NewBusiness::new("Sunny Bakery", "Fresh bread in", "Paris", "France")
                .with_category("Bakery")
                .with_rating(4.5, 20),
        )
        .unwrap();
    let club = store
        .insert(
            &NewBusiness::new("Night Club", "Loud music in", "Berlin", "Germany")
                .with_category("Nightlife")
                .with_rating(3.0, 5),
        )
        .unwrap();
    let cafe = store
        .insert(
            &NewBusiness::new("Alpha Cafe", "Espresso and croissants", "Lyon", "France")
                .with_rating(4.5, 40),
        )
        .unwrap();

    let config = ServerConfig {
        admin_tokens: vec![ADMIN_TOKEN.to_string()],
        enable_logging: false,
        ..Default::default()
    };
    let state = AppState::new(storage, config);
    Fixture {
        app: create_app(state.clone()),
        state,
        bakery,
        club,
        cafe,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_reindex(app: &Router, authorization: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::post("/api/search/reindex/");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

fn ids(body: &Value) -> Vec<i64> {
    body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health() {
    let fx = fixture();
    let (status, body) = get(&fx.app, "/health/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let fx = fixture();
    let (status, body) = get(&fx.app, "/api/search/fuzzy/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_keyword_matches_any_field() {
    let fx = fixture();
    let (status, body) = get(&fx.app, "/api/search/keyword/?query=france").await;
    assert_eq!(status, StatusCode::OK);
    // Equal ratings fall back to rating count
    assert_eq!(ids(&body), vec![fx.cafe, fx.bakery]);

    let (_, body) = get(&fx.app, "/api/search/keyword/?query=NIGHTLIFE").await;
    assert_eq!(ids(&body), vec![fx.club]);
}

#[tokio::test]
async fn test_keyword_empty_query_lists_best_rated() {
    let fx = fixture();
    let (status, body) = get(&fx.app, "/api/search/keyword/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![fx.cafe, fx.bakery, fx.club]);
}

#[tokio::test]
async fn test_keyword_result_shape() {
    let fx = fixture();
    let (_, body) = get(&fx.app, "/api/search/keyword/?query=Berlin").await;
    let result = body["results"][0].as_object().unwrap();

    let mut keys: Vec<&str> = result.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec!["average_rating", "city", "country", "description", "id", "name", "rating_count"]
    );
    assert_eq!(result["name"], "Night Club");
    assert_eq!(result["rating_count"], 5);
}

#[tokio::test]
async fn test_semantic_ranks_by_similarity() {
    let fx = fixture();

    let (status, body) = get(&fx.app, "/api/search/semantic/?query=bread%20Paris&top_k=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![fx.bakery]);

    let (_, body) = get(&fx.app, "/api/search/semantic/?query=music%20Berlin&top_k=1").await;
    assert_eq!(ids(&body), vec![fx.club]);
}

#[tokio::test]
async fn test_semantic_default_top_k_returns_whole_small_corpus() {
    let fx = fixture();
    let (_, body) = get(&fx.app, "/api/search/semantic/?query=unrelated%20xyz").await;
    // No known terms: every row scores zero and row order is kept
    assert_eq!(ids(&body), vec![fx.bakery, fx.club, fx.cafe]);
}

#[tokio::test]
async fn test_semantic_empty_query_skips_index() {
    let fx = fixture();
    let (status, body) = get(&fx.app, "/api/search/semantic/?query=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "results": [] }));
    assert!(!fx.state.search.is_built().unwrap());

    let (_, body) = get(&fx.app, "/api/search/semantic/").await;
    assert!(body["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_semantic_first_query_builds_index() {
    let fx = fixture();
    get(&fx.app, "/api/search/semantic/?query=bread").await;

    let (status, body) = get(&fx.app, "/api/search/status/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documents"], 3);
    assert_eq!(body["backend"], "tfidf");
    assert!(body["built_at"].is_string());
}

#[tokio::test]
async fn test_semantic_malformed_top_k() {
    let fx = fixture();

    let (status, body) = get(&fx.app, "/api/search/semantic/?query=bread&top_k=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PARAMETER");

    let (status, body) = get(&fx.app, "/api/search/semantic/?query=bread&top_k=0").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = get(&fx.app, "/api/search/semantic/?query=bread&top_k=-2").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_reindex_requires_credentials() {
    let fx = fixture();
    let (status, body) = post_reindex(&fx.app, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(!fx.state.search.is_built().unwrap());
}

#[tokio::test]
async fn test_reindex_rejects_non_admin_token() {
    let fx = fixture();
    let (status, _) = post_reindex(&fx.app, Some("Bearer someone-else")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!fx.state.search.is_built().unwrap());
}

#[tokio::test]
async fn test_reindex_as_admin() {
    let fx = fixture();
    let bearer = format!("Bearer {}", ADMIN_TOKEN);
    let (status, body) = post_reindex(&fx.app, Some(&bearer)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, serde_json::json!({ "indexed": 3 }));
}

#[tokio::test]
async fn test_reindex_picks_up_new_business() {
    let fx = fixture();
    let bearer = format!("Bearer {}", ADMIN_TOKEN);
    post_reindex(&fx.app, Some(&bearer)).await;

    let tea = {
        let storage = fx.state.storage.lock().unwrap();
        BusinessStore::new(&storage)
            .insert(&NewBusiness::new("Leaf Room", "Green tea house", "Kyoto", "Japan"))
            .unwrap()
    };

    let (_, body) = post_reindex(&fx.app, Some(&bearer)).await;
    assert_eq!(body["indexed"], 4);

    let (_, body) = get(&fx.app, "/api/search/semantic/?query=green%20tea&top_k=1").await;
    assert_eq!(ids(&body), vec![tea]);
}

#[tokio::test]
async fn test_semantic_drops_deleted_businesses() {
    let fx = fixture();
    let bearer = format!("Bearer {}", ADMIN_TOKEN);
    post_reindex(&fx.app, Some(&bearer)).await;

    {
        let storage = fx.state.storage.lock().unwrap();
        assert!(BusinessStore::new(&storage).delete(fx.bakery).unwrap());
    }

    let (status, body) = get(&fx.app, "/api/search/semantic/?query=bread%20Paris&top_k=3").await;
    assert_eq!(status, StatusCode::OK);
    let found = ids(&body);
    assert_eq!(found.len(), 2);
    assert!(!found.contains(&fx.bakery));
}

#[tokio::test]
async fn test_routes_accept_missing_trailing_slash() {
    let fx = fixture();
    let (status, _) = get(&fx.app, "/api/search/keyword?query=Paris").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_keyword_folds_non_ascii_case() {
    let fx = fixture();
    let etoile = {
        let storage = fx.state.storage.lock().unwrap();
        BusinessStore::new(&storage)
            .insert(&NewBusiness::new("CAFÉ ÉTOILE", "Pâtisserie", "Genève", "Suisse"))
            .unwrap()
    };

    let (status, body) = get(&fx.app, "/api/search/keyword/?query=caf%C3%A9").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![etoile]);

    let (_, body) = get(&fx.app, "/api/search/keyword/?query=GEN%C3%88VE").await;
    assert_eq!(ids(&body), vec![etoile]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_searches_run_alongside_reindexing() {
    let fx = fixture();
    let bearer = format!("Bearer {}", ADMIN_TOKEN);

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..30 {
        let app = fx.app.clone();
        let bearer = bearer.clone();
        tasks.spawn(async move {
            match i % 3 {
                0 => post_reindex(&app, Some(&bearer)).await.0,
                1 => get(&app, "/api/search/semantic/?query=bread%20Paris&top_k=2").await.0,
                _ => get(&app, "/api/search/keyword/?query=paris").await.0,
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let status = joined.unwrap();
        assert!(
            status == StatusCode::OK || status == StatusCode::CREATED,
            "unexpected status {}",
            status
        );
    }

    // Store stays usable and the index holds the whole corpus
    assert!(fx.state.storage.try_lock().is_ok());
    assert_eq!(fx.state.search.status().unwrap().documents, 3);
}
