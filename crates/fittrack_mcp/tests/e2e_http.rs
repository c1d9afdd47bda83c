use std::net::SocketAddr;
use std::sync::Arc;

use fittrack_core::GoalSet;
use fittrack_core::utils::local_today;
use fittrack_mcp::http::{AppState, HttpOptions, router};
use fittrack_mcp::services::TrackerService;
use metrics_exporter_prometheus::PrometheusBuilder;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

async fn spawn_app(service: TrackerService) -> SocketAddr {
    let state = Arc::new(AppState {
        service,
        metrics: PrometheusBuilder::new().build_recorder().handle(),
    });
    let app = router(state, &HttpOptions::default());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.ok();
    });
    addr
}

#[tokio::test]
async fn e2e_health_and_metrics() {
    let addr = spawn_app(TrackerService::in_memory(GoalSet::Core)).await;
    let http = Client::new();

    let res = http.get(format!("http://{addr}/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "ok");

    let res = http.get(format!("http://{addr}/metrics")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn e2e_day_update_and_streak() {
    let addr = spawn_app(TrackerService::in_memory(GoalSet::Core)).await;
    let http = Client::new();

    for date in ["2026-01-05", "2026-01-06"] {
        let res = http
            .put(format!("http://{addr}/fitness/{date}"))
            .json(&json!({ "water_liters": 4.0, "calories": 1950.0, "exercise_minutes": 60.0 }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let day: Value = res.json().await.unwrap();
        assert_eq!(day["is_streak_day"], json!(true));
    }

    let res = http
        .put(format!("http://{addr}/fitness/2026-01-07"))
        .json(&json!({ "water_liters": 1.0 }))
        .send()
        .await
        .unwrap();
    let day: Value = res.json().await.unwrap();
    assert_eq!(day["goals_completed"], json!(0));

    let day: Value = http
        .get(format!("http://{addr}/fitness/2026-01-06"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(day["goals_completed"], json!(3));

    let report: Value = http
        .get(format!("http://{addr}/fitness/streak?days=3650"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["stats"]["longest_streak"], json!(2));
}

#[tokio::test]
async fn e2e_rejects_bad_input() {
    let addr = spawn_app(TrackerService::in_memory(GoalSet::Core)).await;
    let http = Client::new();

    let res = http
        .get(format!("http://{addr}/fitness/2026-13-40"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = http
        .put(format!("http://{addr}/fitness/today"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = http
        .get(format!("http://{addr}/fitness/summary?period=decade"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = http
        .post(format!("http://{addr}/diet/parse"))
        .json(&json!({ "foodDescription": "two eggs" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let res = http
        .get(format!("http://{addr}/profile"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn e2e_meal_lifecycle_updates_today() {
    let addr = spawn_app(TrackerService::in_memory(GoalSet::Core)).await;
    let http = Client::new();
    let today = local_today().to_string();

    let res = http
        .post(format!("http://{addr}/meals"))
        .json(&json!({
            "date": today,
            "description": "salmon and rice",
            "meal_type": "dinner",
            "calories": 650.0,
            "carbs": 70.0,
            "fats": 20.0,
            "protein": 45.0
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let logged: Value = res.json().await.unwrap();
    let id = logged["meal"]["id"].as_str().unwrap().to_string();

    let today_rec: Value = http
        .get(format!("http://{addr}/fitness/today"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(today_rec["calories"], json!(650.0));

    let meals: Value = http
        .get(format!("http://{addr}/meals?date={today}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(meals["totals"]["meal_count"], json!(1));

    let res = http
        .put(format!("http://{addr}/meals/{id}"))
        .json(&json!({ "calories": 500.0, "description": "salmon, no rice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let edited: Value = res.json().await.unwrap();
    assert_eq!(edited["meal"]["description"], json!("salmon, no rice"));
    assert_eq!(edited["day"]["calories"], json!(500.0));

    let res = http
        .delete(format!("http://{addr}/meals/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let day: Value = res.json().await.unwrap();
    assert_eq!(day["calories"], json!(0.0));

    let res = http
        .delete(format!("http://{addr}/meals/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn e2e_summary_without_period_covers_today() {
    let addr = spawn_app(TrackerService::in_memory(GoalSet::Core)).await;
    let http = Client::new();

    http.put(format!("http://{addr}/fitness/today"))
        .json(&json!({ "water_liters": 4.0 }))
        .send()
        .await
        .unwrap();

    let res = http
        .get(format!("http://{addr}/fitness/summary"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let summary: Value = res.json().await.unwrap();
    assert_eq!(summary["period"], json!("day"));
    assert_eq!(summary["start_date"], json!(local_today().to_string()));
    assert_eq!(summary["total_days"], json!(1));
}

#[tokio::test]
async fn e2e_csv_export_has_attachment_headers() {
    let addr = spawn_app(TrackerService::in_memory(GoalSet::Core)).await;
    let http = Client::new();

    http.put(format!("http://{addr}/fitness/today"))
        .json(&json!({ "water_liters": 2.0 }))
        .send()
        .await
        .unwrap();

    let res = http
        .get(format!(
            "http://{addr}/fitness/summary/export?period=week&format=csv"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let content_type = res
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/csv"));
    let body = res.text().await.unwrap();
    assert!(body.contains("DAILY BREAKDOWN"));
    assert!(body.contains(&local_today().to_string()));
}

#[tokio::test]
async fn e2e_weight_log_round_trip() {
    let addr = spawn_app(TrackerService::in_memory(GoalSet::WithWeight)).await;
    let http = Client::new();
    let today = local_today().to_string();

    let res = http
        .post(format!("http://{addr}/weight-log"))
        .json(&json!({ "date": today, "weight": 79.4, "body_fat_percentage": 19.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let logged: Value = res.json().await.unwrap();
    assert_eq!(logged["day"]["goals_completed"], json!(1));
    assert_eq!(logged["day"]["total_goals"], json!(4));

    let points: Value = http
        .get(format!("http://{addr}/weight-log?days=7"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let points = points.as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["weight"], json!(79.4));
}

#[tokio::test]
async fn e2e_diet_parse_calls_configured_model() {
    use fittrack_core::config::Config;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1beta/models/.+:generateContent$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{
                "text": "{\"calories\": 310, \"carbs\": 2.4, \"fats\": 21.1, \"protein\": 25.3}"
            }] } }]
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let base_url = upstream.uri();
    let config = Config::from_env_with(|k| match k {
        "GEMINI_API_KEY" => Some("test-key".into()),
        "GEMINI_BASE_URL" => Some(base_url.clone()),
        _ => None,
    })
    .unwrap();
    let service = TrackerService::from_config(&config).await.unwrap();
    let addr = spawn_app(service).await;

    let res = Client::new()
        .post(format!("http://{addr}/diet/parse"))
        .json(&json!({ "foodDescription": "three scrambled eggs" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let est: Value = res.json().await.unwrap();
    assert_eq!(est["calories"], json!(310.0));
    assert_eq!(est["protein"], json!(25.3));
}

#[tokio::test]
async fn e2e_analyze_falls_back_when_model_reply_is_not_json() {
    use fittrack_core::config::Config;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1beta/models/.+:generateContent$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{
                "text": "Great week! Keep it up."
            }] } }]
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let base_url = upstream.uri();
    let config = Config::from_env_with(|k| match k {
        "GEMINI_API_KEY" => Some("test-key".into()),
        "GEMINI_BASE_URL" => Some(base_url.clone()),
        _ => None,
    })
    .unwrap();
    let service = TrackerService::from_config(&config).await.unwrap();
    let addr = spawn_app(service).await;
    let http = Client::new();

    http.put(format!("http://{addr}/fitness/today"))
        .json(&json!({ "water_liters": 4.0, "calories": 2000.0, "exercise_minutes": 60.0 }))
        .send()
        .await
        .unwrap();

    let res = http
        .get(format!("http://{addr}/fitness/summary/analyze"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["source"], json!("fallback"));
    assert_eq!(body["summary"]["period"], json!("day"));
    assert_eq!(body["summary"]["water"]["days_met_goal"], json!(1));
    assert_eq!(body["analysis"]["overall_score"], json!(100));
}
