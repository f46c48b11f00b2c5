use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;

fn data(body: &Value) -> &Value {
    assert_eq!(body["success"], true, "unexpected body {body}");
    &body["data"]
}

#[tokio::test]
async fn test_complete_review_then_manual_update() {
    let app = common::create_test_app().await;

    let (status, body) = app.post("/api/progress/1/complete").await;
    assert_eq!(status, StatusCode::OK);
    let record = data(&body);
    assert_eq!(record["status"], "completed");
    assert_eq!(record["attempt_count"], 1);
    assert_eq!(record["completed_reviews"], 0);
    assert_eq!(record["total_reviews"], 5);

    let (_, body) = app.get("/api/reviews?completed=false").await;
    let reviews = data(&body).as_array().unwrap().clone();
    assert_eq!(reviews.len(), 5);
    let first = reviews
        .iter()
        .find(|r| r["review_round"] == 1)
        .unwrap();

    let uri = format!("/api/reviews/{}/complete", first["id"]);
    let (status, body) = app.put(&uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let plan = data(&body);
    assert_eq!(plan["completed"], true);
    assert!(plan["completed_at"].is_string());
    assert_eq!(plan["problem"]["leetcode_id"], 1);

    let (_, body) = app.get("/api/progress/1").await;
    assert_eq!(data(&body)["completed_reviews"], 1);

    let (status, body) = app
        .put(
            "/api/progress/1",
            Some(json!({ "status": "in_progress", "mastery_level": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let record = data(&body);
    assert_eq!(record["attempt_count"], 2);
    assert_eq!(record["status"], "in_progress");
    assert_eq!(record["mastery_level"], 1);
    assert_eq!(record["completed_reviews"], 1);
    assert_eq!(record["total_reviews"], 5);
}

#[tokio::test]
async fn test_recomplete_does_not_duplicate_plan() {
    let app = common::create_test_app().await;

    app.post("/api/progress/2/complete").await;
    let (status, body) = app.post("/api/progress/2/complete").await;
    assert_eq!(status, StatusCode::OK);
    let record = data(&body);
    assert_eq!(record["attempt_count"], 2);
    assert_eq!(record["total_reviews"], 5);

    let (_, body) = app.get("/api/reviews").await;
    let mut rounds: Vec<i64> = data(&body)
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["review_round"].as_i64().unwrap())
        .collect();
    rounds.sort_unstable();
    assert_eq!(rounds, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_plan_dates_strictly_increase() {
    let app = common::create_test_app().await;
    app.post("/api/progress/3/complete").await;

    let (_, body) = app.get("/api/reviews").await;
    let reviews = data(&body).as_array().unwrap();
    let dates: Vec<&str> = reviews
        .iter()
        .map(|r| r["scheduled_date"].as_str().unwrap())
        .collect();
    let rounds: Vec<i64> = reviews
        .iter()
        .map(|r| r["review_round"].as_i64().unwrap())
        .collect();

    assert_eq!(rounds, vec![1, 2, 3, 4, 5]);
    assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test]
async fn test_second_review_completion_conflicts() {
    let app = common::create_test_app().await;
    app.post("/api/progress/4/complete").await;

    let (_, body) = app.get("/api/reviews").await;
    let id = data(&body)[0]["id"].clone();
    let uri = format!("/api/reviews/{id}/complete");

    let (status, _) = app.put(&uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.put(&uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "ALREADY_COMPLETED");

    let (_, body) = app.get("/api/progress/4").await;
    assert_eq!(data(&body)["completed_reviews"], 1);
}

#[tokio::test]
async fn test_validation_errors() {
    let app = common::create_test_app().await;

    let (status, body) = app
        .put(
            "/api/progress/1",
            Some(json!({ "status": "completed", "mastery_level": 9 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .put(
            "/api/progress/1",
            Some(json!({ "status": "reviewing", "mastery_level": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app.put("/api/progress/1", Some(json!({ "status": "completed" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app.post("/api/progress/abc/complete").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get("/api/progress/1").await;
    assert_eq!(data(&body)["attempt_count"], 0);
}

#[tokio::test]
async fn test_unknown_problem_and_review() {
    let app = common::create_test_app().await;

    let (status, body) = app.post("/api/progress/4242/complete").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = app.put("/api/reviews/777/complete", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_problem_listing_and_stats() {
    let app = common::create_test_app().await;
    app.post("/api/progress/1/complete").await;

    let (status, body) = app.get("/api/problems?page=1&page_size=5").await;
    assert_eq!(status, StatusCode::OK);
    let page = data(&body);
    assert_eq!(page["total"], 100);
    assert_eq!(page["items"].as_array().unwrap().len(), 5);
    assert_eq!(page["items"][0]["title"], "Two Sum");
    assert_eq!(page["items"][0]["progress"]["status"], "completed");
    assert!(page["items"][1]["progress"].is_null());

    let (_, body) = app.get("/api/problems?status=completed").await;
    assert_eq!(data(&body)["total"], 1);

    let (status, _) = app.get("/api/problems?page_size=500").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/api/problems/categories").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!data(&body).as_array().unwrap().is_empty());

    let (status, body) = app.get("/api/problems/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["leetcode_id"], 1);

    let (status, body) = app.get("/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    let stats = data(&body);
    assert_eq!(stats["total_problems"], 100);
    assert_eq!(stats["completed_count"], 1);
    assert_eq!(stats["pending_reviews"], 5);
    assert_eq!(stats["status_stats"]["completed"], 1);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = common::create_test_app().await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");

    let (status, body) = app.get("/health/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
