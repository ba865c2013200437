//! Integration tests for the progress and like endpoints against `PostgreSQL`.

mod common;

use axum::http::StatusCode;
use sqlx::PgPool;
use uuid::Uuid;

#[sqlx::test(migrations = "../../migrations")]
async fn test_start_pause_resume_complete_round_trip(pool: PgPool) {
    let quest_id = common::seed_quest(&pool, "Alfama Stairs").await;
    let user_id = Uuid::new_v4();

    // POST start
    let app = common::build_test_app(pool.clone());
    let (status, json) =
        common::post(app, &format!("/api/v1/progress/{quest_id}/start"), user_id).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["status"], "active");
    let aggregate_id = json["aggregate_id"].clone();

    for (action, expected) in [("pause", "paused"), ("start", "active"), ("complete", "completed")] {
        let app = common::build_test_app(pool.clone());
        let (status, json) =
            common::post(app, &format!("/api/v1/progress/{quest_id}/{action}"), user_id).await;
        assert!(status.is_success(), "{action} returned {status}");
        assert_eq!(json["data"]["status"], expected);
        assert_eq!(json["aggregate_id"], aggregate_id);
    }

    // GET events: verify the persisted history
    let app = common::build_test_app(pool);
    let (status, json) = common::get_json(app, "/api/v1/progress/events", user_id).await;
    assert_eq!(status, StatusCode::OK);
    let types: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event_type"].as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        vec![
            "progress.quest_started",
            "progress.quest_paused",
            "progress.quest_resumed",
            "progress.quest_completed",
        ]
    );
    assert_eq!(json["data"][0]["platform"]["type"], "web");
    assert_eq!(json["data"][0]["platform"]["browser"], "Safari Mobile");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_second_active_quest_is_rejected(pool: PgPool) {
    let first = common::seed_quest(&pool, "Belém").await;
    let second = common::seed_quest(&pool, "Bairro Alto").await;
    let user_id = Uuid::new_v4();

    let app = common::build_test_app(pool.clone());
    common::post(app, &format!("/api/v1/progress/{first}/start"), user_id).await;

    let app = common::build_test_app(pool.clone());
    let (status, json) =
        common::post(app, &format!("/api/v1/progress/{second}/start"), user_id).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "active_quest_exists");

    let app = common::build_test_app(pool);
    let (_, json) = common::get_json(app, "/api/v1/progress/active", user_id).await;
    assert_eq!(json["data"]["quest_id"], first.to_string());
    assert_eq!(json["data"]["quest"]["title"], "Belém");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_like_toggle_keeps_counter_in_step(pool: PgPool) {
    let quest_id = common::seed_quest(&pool, "Tram 28").await;
    let user_id = Uuid::new_v4();
    let like_uri = format!("/api/v1/quests/{quest_id}/like");

    // Liking before starting is forbidden.
    let app = common::build_test_app(pool.clone());
    let (status, json) = common::post(app, &like_uri, user_id).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "quest_not_started");

    let app = common::build_test_app(pool.clone());
    common::post(app, &format!("/api/v1/progress/{quest_id}/start"), user_id).await;

    let app = common::build_test_app(pool.clone());
    let (status, json) = common::post(app, &like_uri, user_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({ "liked": true, "likes_count": 1 }));

    let app = common::build_test_app(pool.clone());
    let (_, json) = common::get_json(app, "/api/v1/progress/liked", user_id).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    // Abandoning a liked quest takes its like with it.
    let app = common::build_test_app(pool.clone());
    let (status, _) =
        common::post(app, &format!("/api/v1/progress/{quest_id}/abandon"), user_id).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let likes_count: i64 = sqlx::query_scalar("SELECT likes_count FROM quests WHERE id = $1")
        .bind(quest_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(likes_count, 0);

    let app = common::build_test_app(pool);
    let (_, json) = common::get_json(app, &like_uri, user_id).await;
    assert_eq!(json, serde_json::json!({ "can_like": false, "is_liked": false }));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_step_check_carries_app_platform(pool: PgPool) {
    let quest_id = common::seed_quest(&pool, "Castelo").await;
    let user_id = Uuid::new_v4();

    let app = common::build_test_app(pool.clone());
    common::post(app, &format!("/api/v1/progress/{quest_id}/start"), user_id).await;

    let app = common::build_test_app(pool.clone());
    let (status, json) = common::post_json(
        app,
        &format!("/api/v1/progress/{quest_id}/step-checks"),
        user_id,
        &serde_json::json!({
            "client_latitude": 38.7139,
            "client_longitude": -9.1334,
            "distance_to_point": 22.5,
            "check_passed": false,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "active");

    let (event_type, platform): (String, serde_json::Value) = sqlx::query_as(
        "SELECT event_type, platform FROM progress_events \
         WHERE user_id = $1 ORDER BY global_position DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(event_type, "progress.quest_step_checked");
    assert_eq!(platform["type"], "android");
    assert_eq!(platform["app_version"], "2.4.0");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_progress_list_filters_and_counts(pool: PgPool) {
    let first = common::seed_quest(&pool, "Sintra").await;
    let second = common::seed_quest(&pool, "Cascais").await;
    let user_id = Uuid::new_v4();

    for uri in [
        format!("/api/v1/progress/{first}/start"),
        format!("/api/v1/progress/{first}/complete"),
        format!("/api/v1/progress/{second}/start"),
    ] {
        let app = common::build_test_app(pool.clone());
        let (status, _) = common::post(app, &uri, user_id).await;
        assert!(status.is_success(), "{uri} returned {status}");
    }

    let app = common::build_test_app(pool.clone());
    let (status, json) =
        common::get_json(app, "/api/v1/progress?status=completed", user_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["quest_id"], first.to_string());
    assert!(json["data"][0]["completed_at"].is_string());
    assert_eq!(json["meta"]["total"], 2);
    assert_eq!(json["meta"]["completed"], 1);
    assert_eq!(json["meta"]["in_progress"], 1);

    let app = common::build_test_app(pool);
    let (status, json) = common::get_json(app, "/api/v1/progress?status=new", user_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}
