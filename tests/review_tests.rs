use axum::http::StatusCode;
use serde_json::Value;

use hot100_tracker::config::TrackerConfig;
use hot100_tracker::tracker::ReviewIntervals;

mod common;

fn items(body: &Value) -> Vec<Value> {
    body["data"].as_array().cloned().unwrap_or_default()
}

#[tokio::test]
async fn test_buckets_around_reference_date() {
    let app = common::create_test_app_with(TrackerConfig {
        intervals: ReviewIntervals::new(vec![1, 2, 3]).unwrap(),
        ..TrackerConfig::default()
    })
    .await;
    app.post("/api/progress/10/complete").await;

    let (_, body) = app.get("/api/reviews").await;
    let plan = items(&body);
    assert_eq!(plan.len(), 3);
    let today = plan[1]["scheduled_date"].as_str().unwrap().to_string();

    let (status, body) = app.get(&format!("/api/reviews/today?date={today}")).await;
    assert_eq!(status, StatusCode::OK);
    let buckets = &body["data"];

    for (bucket, round) in [("overdue", 1), ("today", 2), ("upcoming", 3)] {
        let entries = buckets[bucket].as_array().unwrap();
        assert_eq!(entries.len(), 1, "bucket {bucket}");
        assert_eq!(entries[0]["review_round"], round);
        assert_eq!(entries[0]["problem"]["id"], 10);
    }
}

#[tokio::test]
async fn test_completed_reviews_leave_buckets() {
    let app = common::create_test_app().await;
    app.post("/api/progress/11/complete").await;

    let (_, body) = app.get("/api/reviews").await;
    let plan = items(&body);
    let far_future = "2999-01-01";

    let uri = format!("/api/reviews/{}/complete", plan[0]["id"]);
    app.put(&uri, None).await;

    let (_, body) = app.get(&format!("/api/reviews/today?date={far_future}")).await;
    let overdue = body["data"]["overdue"].as_array().unwrap();
    assert_eq!(overdue.len(), 4);
    assert!(overdue.iter().all(|r| r["id"] != plan[0]["id"]));
}

#[tokio::test]
async fn test_upcoming_horizon() {
    let app = common::create_test_app_with(TrackerConfig {
        upcoming_days: Some(3),
        ..TrackerConfig::default()
    })
    .await;
    app.post("/api/progress/12/complete").await;

    let (_, body) = app.get("/api/reviews").await;
    let plan = items(&body);
    // Completion day is one day before round 1.
    let first_date = plan[0]["scheduled_date"].as_str().unwrap();
    let first = chrono::NaiveDate::parse_from_str(first_date, "%Y-%m-%d").unwrap();
    let completed_on = first - chrono::Duration::days(1);

    let (_, body) = app.get(&format!("/api/reviews/today?date={completed_on}")).await;
    let upcoming = body["data"]["upcoming"].as_array().unwrap();
    let rounds: Vec<i64> = upcoming
        .iter()
        .map(|r| r["review_round"].as_i64().unwrap())
        .collect();
    // Offsets 1 and 2 fall inside the three day window, 4 does not.
    assert_eq!(rounds, vec![1, 2]);
}

#[tokio::test]
async fn test_reads_do_not_mutate() {
    let app = common::create_test_app().await;
    app.post("/api/progress/13/complete").await;
    app.post("/api/progress/14/complete").await;

    let (_, before_reviews) = app.get("/api/reviews").await;
    let (_, before_progress) = app.get("/api/progress/13").await;

    for _ in 0..3 {
        app.get("/api/reviews/today").await;
        app.get("/api/reviews?completed=true").await;
        app.get("/api/stats").await;
    }

    let (_, after_reviews) = app.get("/api/reviews").await;
    let (_, after_progress) = app.get("/api/progress/13").await;
    assert_eq!(before_reviews, after_reviews);
    assert_eq!(before_progress, after_progress);
}

#[tokio::test]
async fn test_bad_query_values() {
    let app = common::create_test_app().await;

    let (status, body) = app.get("/api/reviews/today?date=tomorrow").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app.get("/api/reviews?completed=maybe").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_horizon_near_calendar_end() {
    let app = common::create_test_app_with(TrackerConfig {
        upcoming_days: Some(7),
        ..TrackerConfig::default()
    })
    .await;
    app.post("/api/progress/15/complete").await;

    let (status, body) = app.get("/api/reviews/today?date=%2B262142-12-30").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["overdue"].as_array().unwrap().len(), 5);
    assert!(body["data"]["upcoming"].as_array().unwrap().is_empty());
}
