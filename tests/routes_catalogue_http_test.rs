// ABOUTME: HTTP integration tests for the muscle and exercise catalogue routes
// ABOUTME: Public reads, administrator writes, versioned updates, and delete rules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{seed_muscles, signed_in};
use helpers::axum_test::AxumTestRequest;
use jasad::database::exercises::ExerciseSearch;
use jasad::models::Role;
use jasad::resources::ServerResources;
use jasad::routes::router;
use serde_json::{json, Value};

struct Catalogue {
    resources: Arc<ServerResources>,
    app: axum::Router,
    admin: String,
    user: String,
}

async fn catalogue() -> Catalogue {
    let resources = common::default_resources().await;
    seed_muscles(
        &resources,
        &[("chest", "push"), ("triceps", "push"), ("lats", "pull")],
    )
    .await;
    let (_, admin) = signed_in(&resources, "admin", Role::Admin).await;
    let (_, user) = signed_in(&resources, "alice", Role::User).await;
    let app = router(&resources);
    Catalogue {
        resources,
        app,
        admin,
        user,
    }
}

fn bench_press() -> Value {
    json!({
        "name": "bench press",
        "description": "Press the bar from the chest",
        "reference_video": "https://example.com/bench",
        "muscles": ["triceps", "chest"]
    })
}

async fn create_exercise(c: &Catalogue, body: &Value) -> Value {
    AxumTestRequest::post("/api/v1/exercises")
        .bearer(&c.admin)
        .json(body)
        .send(c.app.clone())
        .await
        .assert_status(StatusCode::CREATED)
        .json()
}

// ============================================================================
// Muscles
// ============================================================================

#[tokio::test]
async fn test_muscles_are_public_and_sorted() {
    let c = catalogue().await;

    let body: Vec<Value> = AxumTestRequest::get("/api/v1/muscles")
        .send(c.app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    let names: Vec<&str> = body.iter().map(|m| m["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["chest", "lats", "triceps"]);
    assert_eq!(body[0]["group"], "push");
}

#[tokio::test]
async fn test_only_admins_add_muscles() {
    let c = catalogue().await;
    let calves = json!({ "name": "calves", "group": "legs" });

    AxumTestRequest::post("/api/v1/muscles")
        .json(&calves)
        .send(c.app.clone())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    AxumTestRequest::post("/api/v1/muscles")
        .bearer(&c.user)
        .json(&calves)
        .send(c.app.clone())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let created: Value = AxumTestRequest::post("/api/v1/muscles")
        .bearer(&c.admin)
        .json(&calves)
        .send(c.app.clone())
        .await
        .assert_status(StatusCode::CREATED)
        .json();
    assert_eq!(created["name"], "calves");

    AxumTestRequest::post("/api/v1/muscles")
        .bearer(&c.admin)
        .json(&calves)
        .send(c.app)
        .await
        .assert_status(StatusCode::CONFLICT);
}

// ============================================================================
// Exercises
// ============================================================================

#[tokio::test]
async fn test_create_and_read_exercise() {
    let c = catalogue().await;
    let created = create_exercise(&c, &bench_press()).await;

    assert_eq!(created["version"], 1);
    let muscles: Vec<&str> = created["muscles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(muscles, ["triceps", "chest"]);

    let id = created["id"].as_i64().unwrap();
    let fetched: Value = AxumTestRequest::get(&format!("/api/v1/exercises/{id}"))
        .send(c.app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(fetched, created);

    AxumTestRequest::get("/api/v1/exercises/9999")
        .send(c.app)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

async fn search(c: &Catalogue, query: &str) -> Value {
    AxumTestRequest::get(&format!("/api/v1/exercises{query}"))
        .send(c.app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json()
}

fn names(page: &Value) -> Vec<&str> {
    page["exercises"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_search_filters_by_muscle_and_name() {
    let c = catalogue().await;
    create_exercise(&c, &bench_press()).await;
    create_exercise(
        &c,
        &json!({ "name": "pulldown", "description": "Pull the bar down", "muscles": ["lats"] }),
    )
    .await;

    let all = search(&c, "").await;
    assert_eq!(names(&all), ["bench press", "pulldown"]);
    assert_eq!(all["metadata"]["total_records"], 2);

    let lats = search(&c, "?muscle=lats").await;
    assert_eq!(names(&lats), ["pulldown"]);

    let by_name = search(&c, "?name=BENCH&sort=-name").await;
    assert_eq!(names(&by_name), ["bench press"]);

    let nothing = search(&c, "?name=squat").await;
    assert!(names(&nothing).is_empty());
    assert_eq!(nothing["metadata"]["total_records"], 0);
}

#[tokio::test]
async fn test_search_pages_with_metadata() {
    let c = catalogue().await;
    for name in ["ab rollout", "bench press", "cable fly"] {
        create_exercise(
            &c,
            &json!({ "name": name, "description": "Work the chest", "muscles": ["chest"] }),
        )
        .await;
    }

    let second = search(&c, "?page=2&page_size=2&sort=-id").await;
    assert_eq!(names(&second), ["ab rollout"]);
    assert_eq!(
        second["metadata"],
        json!({
            "current_page": 2,
            "page_size": 2,
            "first_page": 1,
            "last_page": 2,
            "total_records": 3
        })
    );
}

#[tokio::test]
async fn test_search_rejects_bad_paging_and_sort() {
    let c = catalogue().await;

    let body: Value = AxumTestRequest::get("/api/v1/exercises?page=0&page_size=500&sort=muscle")
        .send(c.app.clone())
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
        .json();
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["page", "page_size", "sort"]);

    let body: Value = AxumTestRequest::get("/api/v1/exercises?page=two")
        .send(c.app)
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
        .json();
    assert_eq!(body["details"][0]["message"], "must be an integer value");
}

#[tokio::test]
async fn test_exercise_validation_and_unknown_muscle() {
    let c = catalogue().await;

    let body: Value = AxumTestRequest::post("/api/v1/exercises")
        .bearer(&c.admin)
        .json(&json!({
            "name": "x",
            "description": "",
            "reference_video": "ftp://example.com",
            "muscles": []
        }))
        .send(c.app.clone())
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
        .json();
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields.first(), Some(&"name"));
    assert!(fields.contains(&"reference_video"));
    assert!(fields.contains(&"muscles"));

    let mut unknown = bench_press();
    unknown["muscles"] = json!(["chest", "gills"]);
    let body: Value = AxumTestRequest::post("/api/v1/exercises")
        .bearer(&c.admin)
        .json(&unknown)
        .send(c.app.clone())
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
        .json();
    assert_eq!(body["details"][0]["field"], "muscles");

    let listed = search(&c, "").await;
    assert!(names(&listed).is_empty());
}

#[tokio::test]
async fn test_versioned_update() {
    let c = catalogue().await;
    let created = create_exercise(&c, &bench_press()).await;
    let uri = format!("/api/v1/exercises/{}", created["id"]);

    let stamp: Value = AxumTestRequest::put(&uri)
        .bearer(&c.admin)
        .json(&json!({ "version": 1, "muscles": ["chest"] }))
        .send(c.app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(stamp["version"], 2);

    // The same base version again is stale
    AxumTestRequest::put(&uri)
        .bearer(&c.admin)
        .json(&json!({ "version": 1, "name": "floor press" }))
        .send(c.app.clone())
        .await
        .assert_status(StatusCode::CONFLICT);

    let stored: Value = AxumTestRequest::get(&uri).send(c.app.clone()).await.json();
    assert_eq!(stored["version"], 2);
    assert_eq!(stored["name"], "bench press");
    assert_eq!(stored["muscles"].as_array().unwrap().len(), 1);

    AxumTestRequest::put(&uri)
        .bearer(&c.user)
        .json(&json!({ "version": 2, "name": "floor press" }))
        .send(c.app)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_null_clears_the_reference_video() {
    let c = catalogue().await;
    let created = create_exercise(&c, &bench_press()).await;
    let uri = format!("/api/v1/exercises/{}", created["id"]);

    AxumTestRequest::put(&uri)
        .bearer(&c.admin)
        .json(&json!({ "version": 1, "description": "Flat bench" }))
        .send(c.app.clone())
        .await
        .assert_status(StatusCode::OK);
    let kept: Value = AxumTestRequest::get(&uri).send(c.app.clone()).await.json();
    assert_eq!(kept["reference_video"], "https://example.com/bench");

    AxumTestRequest::put(&uri)
        .bearer(&c.admin)
        .json(&json!({ "version": 2, "reference_video": null }))
        .send(c.app.clone())
        .await
        .assert_status(StatusCode::OK);
    let cleared: Value = AxumTestRequest::get(&uri).send(c.app).await.json();
    assert!(cleared["reference_video"].is_null());
    assert_eq!(cleared["version"], 3);
}

#[tokio::test]
async fn test_rename_onto_existing_name_conflicts() {
    let c = catalogue().await;
    create_exercise(&c, &bench_press()).await;
    let pulldown = create_exercise(
        &c,
        &json!({ "name": "pulldown", "description": "Pull the bar down", "muscles": ["lats"] }),
    )
    .await;

    let body: Value = AxumTestRequest::put(&format!("/api/v1/exercises/{}", pulldown["id"]))
        .bearer(&c.admin)
        .json(&json!({ "version": 1, "name": "bench press" }))
        .send(c.app)
        .await
        .assert_status(StatusCode::CONFLICT)
        .json();
    assert!(body["error"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn test_delete_exercise() {
    let c = catalogue().await;
    let created = create_exercise(&c, &bench_press()).await;
    let uri = format!("/api/v1/exercises/{}", created["id"]);

    AxumTestRequest::delete(&uri)
        .bearer(&c.user)
        .send(c.app.clone())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    AxumTestRequest::delete(&uri)
        .bearer(&c.admin)
        .send(c.app.clone())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    AxumTestRequest::delete(&uri)
        .bearer(&c.admin)
        .send(c.app.clone())
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let remaining = c
        .resources
        .database
        .search_exercises(&ExerciseSearch::default())
        .await
        .unwrap();
    assert!(remaining.exercises.is_empty());
}

#[tokio::test]
async fn test_non_numeric_id_is_a_bad_request() {
    let c = catalogue().await;

    let body: Value = AxumTestRequest::get("/api/v1/exercises/bench")
        .send(c.app)
        .await
        .assert_status(StatusCode::BAD_REQUEST)
        .json();
    assert_eq!(body["status"], 400);
}
