// ABOUTME: HTTP integration tests for owner-scoped workout routes
// ABOUTME: Ownership, entry validation, versioned updates, and exercise delete protection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use common::{seed_muscles, signed_in};
use helpers::axum_test::AxumTestRequest;
use jasad::database::exercises::{ExerciseAggregate, ExerciseDraft};
use jasad::database::users::User;
use jasad::models::Role;
use jasad::routes::router;
use serde_json::{json, Value};

struct Gym {
    app: axum::Router,
    alice: User,
    alice_session: String,
    bob_session: String,
    admin_session: String,
    squat: i64,
    deadlift: i64,
}

async fn gym() -> Gym {
    let resources = common::default_resources().await;
    seed_muscles(&resources, &[("quads", "legs"), ("glutes", "legs")]).await;

    let writer = resources.database.writer();
    let mut ids = Vec::new();
    for name in ["squat", "deadlift"] {
        let stamp = writer
            .create::<ExerciseAggregate>(ExerciseDraft {
                name: name.to_owned(),
                description: format!("Barbell {name}"),
                reference_video: None,
                muscles: vec!["quads".to_owned(), "glutes".to_owned()],
            })
            .await
            .unwrap();
        ids.push(stamp.id);
    }

    let (alice, alice_session) = signed_in(&resources, "alice", Role::User).await;
    let (_bob, bob_session) = signed_in(&resources, "bob_b", Role::User).await;
    let (_admin, admin_session) = signed_in(&resources, "admin", Role::Admin).await;

    Gym {
        app: router(&resources),
        alice,
        alice_session,
        bob_session,
        admin_session,
        squat: ids[0],
        deadlift: ids[1],
    }
}

fn entry(order: i64, exercise_id: i64) -> Value {
    json!({
        "order": order,
        "exercise_id": exercise_id,
        "sets": 5,
        "reps": 5,
        "weights": 100.0,
        "rest_after": 180
    })
}

impl Gym {
    fn workouts_uri(&self) -> String {
        format!("/api/v1/users/{}/workouts", self.alice.id)
    }

    async fn create_leg_day(&self) -> Value {
        AxumTestRequest::post(&self.workouts_uri())
            .bearer(&self.alice_session)
            .json(&json!({
                "name": "leg day",
                "entries": [entry(1, self.squat), entry(2, self.deadlift)]
            }))
            .send(self.app.clone())
            .await
            .assert_status(StatusCode::CREATED)
            .json()
    }
}

#[tokio::test]
async fn test_owner_creates_lists_and_reads() {
    let g = gym().await;
    let created = g.create_leg_day().await;

    assert_eq!(created["version"], 1);
    assert_eq!(created["user_id"], g.alice.id);
    assert_eq!(created["entries"][1]["exercise_id"], g.deadlift);
    assert_eq!(created["entries"][0]["done"], false);

    let listed: Vec<Value> = AxumTestRequest::get(&g.workouts_uri())
        .bearer(&g.alice_session)
        .send(g.app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(listed, [created.clone()]);

    let fetched: Value = AxumTestRequest::get(&format!("{}/{}", g.workouts_uri(), created["id"]))
        .bearer(&g.alice_session)
        .send(g.app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_owner_comes_from_the_path() {
    let g = gym().await;

    let created: Value = AxumTestRequest::post(&g.workouts_uri())
        .bearer(&g.alice_session)
        .json(&json!({
            "user_id": 424_242,
            "name": "sneaky",
            "entries": [entry(1, g.squat)]
        }))
        .send(g.app)
        .await
        .assert_status(StatusCode::CREATED)
        .json();
    assert_eq!(created["user_id"], g.alice.id);
}

#[tokio::test]
async fn test_other_users_are_forbidden_and_admins_pass() {
    let g = gym().await;
    let created = g.create_leg_day().await;
    let uri = format!("{}/{}", g.workouts_uri(), created["id"]);

    for request in [
        AxumTestRequest::get(&g.workouts_uri()),
        AxumTestRequest::get(&uri),
        AxumTestRequest::delete(&uri),
    ] {
        request
            .bearer(&g.bob_session)
            .send(g.app.clone())
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    AxumTestRequest::get(&uri)
        .bearer(&g.admin_session)
        .send(g.app)
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_workout_of_another_owner_is_not_found() {
    let g = gym().await;
    let created = g.create_leg_day().await;

    // Admin addresses Alice's workout under a different owner
    AxumTestRequest::get(&format!("/api/v1/users/999/workouts/{}", created["id"]))
        .bearer(&g.admin_session)
        .send(g.app)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_entry_validation_reports_indexed_fields() {
    let g = gym().await;

    let mut bad = entry(3, g.squat);
    bad["sets"] = json!(0);
    bad["weights"] = json!(1000.0);

    let body: Value = AxumTestRequest::post(&g.workouts_uri())
        .bearer(&g.alice_session)
        .json(&json!({ "name": "broken", "entries": [entry(1, g.squat), bad] }))
        .send(g.app.clone())
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
        .json();
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(
        fields,
        ["entries[1].order", "entries[1].sets", "entries[1].weights"]
    );

    let body: Value = AxumTestRequest::post(&g.workouts_uri())
        .bearer(&g.alice_session)
        .json(&json!({ "name": "ghost", "entries": [entry(1, 9999)] }))
        .send(g.app.clone())
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
        .json();
    assert_eq!(body["details"][0]["field"], "entries[0].exercise_id");

    let listed: Vec<Value> = AxumTestRequest::get(&g.workouts_uri())
        .bearer(&g.alice_session)
        .send(g.app)
        .await
        .json();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_update_rewrites_entries_and_checks_version() {
    let g = gym().await;
    let created = g.create_leg_day().await;
    let uri = format!("{}/{}", g.workouts_uri(), created["id"]);

    let mut finished = entry(1, g.deadlift);
    finished["done"] = json!(true);
    let stamp: Value = AxumTestRequest::put(&uri)
        .bearer(&g.alice_session)
        .json(&json!({ "version": 1, "entries": [finished] }))
        .send(g.app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(stamp["version"], 2);

    AxumTestRequest::put(&uri)
        .bearer(&g.alice_session)
        .json(&json!({ "version": 1, "name": "stale" }))
        .send(g.app.clone())
        .await
        .assert_status(StatusCode::CONFLICT);

    let stored: Value = AxumTestRequest::get(&uri)
        .bearer(&g.alice_session)
        .send(g.app)
        .await
        .json();
    assert_eq!(stored["name"], "leg day");
    assert_eq!(stored["version"], 2);
    assert_eq!(stored["entries"].as_array().unwrap().len(), 1);
    assert_eq!(stored["entries"][0]["done"], true);
}

#[tokio::test]
async fn test_exercise_in_use_cannot_be_deleted() {
    let g = gym().await;
    let created = g.create_leg_day().await;

    AxumTestRequest::delete(&format!("/api/v1/exercises/{}", g.squat))
        .bearer(&g.admin_session)
        .send(g.app.clone())
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    AxumTestRequest::delete(&format!("{}/{}", g.workouts_uri(), created["id"]))
        .bearer(&g.alice_session)
        .send(g.app.clone())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    AxumTestRequest::delete(&format!("/api/v1/exercises/{}", g.squat))
        .bearer(&g.admin_session)
        .send(g.app)
        .await
        .assert_status(StatusCode::NO_CONTENT);
}
