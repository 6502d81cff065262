use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tracing::info;

use super::api_error::{rejection_response, session_error_response};
use crate::AppState;
use shared::{
    BattleListResponse, BattleResponse, CreateBattleRequest, JoinBattleRequest, ReadyRequest, SubmitAnswerRequest,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/battle", post(create_battle))
        .route("/battles", get(list_battles))
        .route("/battle/:id", get(get_battle))
        .route("/battle/:id/join", post(join_battle))
        .route("/battle/:id/ready", post(set_ready))
        .route("/battle/:id/answer", post(submit_answer))
        .route("/battle/:id/complete", post(complete_battle))
}

fn battle_response(battle: shared::Battle) -> Response {
    (StatusCode::OK, Json(BattleResponse { battle })).into_response()
}

pub async fn create_battle(
    State(state): State<AppState>,
    payload: Result<Json<CreateBattleRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    info!("POST /battle - request: {:?}", request);

    match state.battle_service.create_battle(request).await {
        Ok(battle) => battle_response(battle),
        Err(e) => session_error_response("create battle", e),
    }
}

pub async fn list_battles(State(state): State<AppState>) -> Response {
    info!("GET /battles");

    match state.battle_service.list_battles().await {
        Ok(battles) => (StatusCode::OK, Json(BattleListResponse { battles })).into_response(),
        Err(e) => session_error_response("list battles", e),
    }
}

pub async fn get_battle(State(state): State<AppState>, Path(battle_id): Path<String>) -> Response {
    info!("GET /battle/{}", battle_id);

    match state.battle_service.get_battle(&battle_id).await {
        Ok(battle) => battle_response(battle),
        Err(e) => session_error_response("get battle", e),
    }
}

pub async fn join_battle(
    State(state): State<AppState>,
    Path(battle_id): Path<String>,
    payload: Result<Json<JoinBattleRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    info!("POST /battle/{}/join - request: {:?}", battle_id, request);

    match state.battle_service.join_battle(&battle_id, request).await {
        Ok(battle) => battle_response(battle),
        Err(e) => session_error_response("join battle", e),
    }
}

pub async fn set_ready(
    State(state): State<AppState>,
    Path(battle_id): Path<String>,
    payload: Result<Json<ReadyRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    info!("POST /battle/{}/ready - user: {}", battle_id, request.user_id);

    match state.battle_service.set_ready(&battle_id, &request.user_id).await {
        Ok(battle) => battle_response(battle),
        Err(e) => session_error_response("mark player ready", e),
    }
}

pub async fn submit_answer(
    State(state): State<AppState>,
    Path(battle_id): Path<String>,
    payload: Result<Json<SubmitAnswerRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    info!("POST /battle/{}/answer - request: {:?}", battle_id, request);

    match state.battle_service.submit_answer(&battle_id, request).await {
        Ok(battle) => battle_response(battle),
        Err(e) => session_error_response("submit answer", e),
    }
}

pub async fn complete_battle(State(state): State<AppState>, Path(battle_id): Path<String>) -> Response {
    info!("POST /battle/{}/complete", battle_id);

    match state.battle_service.complete_battle(&battle_id).await {
        Ok(battle) => battle_response(battle),
        Err(e) => session_error_response("complete battle", e),
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{read_json, TestApp};
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use shared::{BattleListResponse, BattleResponse, BattleStatus, ErrorResponse};

    async fn create_battle(app: &TestApp) -> String {
        let response = app
            .send(
                Method::POST,
                "/battle",
                Some(json!({
                    "hostId": "A",
                    "hostName": "Ana",
                    "hostAvatar": "tiger",
                    "subject": "math"
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let created: BattleResponse = read_json(response).await;
        created.battle.id
    }

    async fn join(app: &TestApp, battle_id: &str, user: &str) -> axum::response::Response {
        app.send(
            Method::POST,
            &format!("/battle/{}/join", battle_id),
            Some(json!({ "userId": user, "name": user, "avatar": "owl" })),
        )
        .await
    }

    async fn ready(app: &TestApp, battle_id: &str, user: &str) -> BattleResponse {
        let response = app
            .send(Method::POST, &format!("/battle/{}/ready", battle_id), Some(json!({ "userId": user })))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        read_json(response).await
    }

    #[tokio::test]
    async fn test_battle_flow_over_http() {
        let app = TestApp::new();
        let battle_id = create_battle(&app).await;

        let joined: BattleResponse = read_json(join(&app, &battle_id, "B").await).await;
        assert_eq!(joined.battle.players.len(), 2);

        assert_eq!(ready(&app, &battle_id, "A").await.battle.status, BattleStatus::Waiting);
        assert_eq!(ready(&app, &battle_id, "B").await.battle.status, BattleStatus::Active);

        let response = join(&app, &battle_id, "C").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.error, "Battle is full");
        assert_eq!(error.code, "BATTLE_FULL");

        let response = app
            .send(
                Method::POST,
                &format!("/battle/{}/answer", battle_id),
                Some(json!({ "userId": "A", "correct": true, "responseTime": 2300, "questionIndex": 0 })),
            )
            .await;
        let answered: BattleResponse = read_json(response).await;
        assert_eq!(answered.battle.player("A").unwrap().score, 15);

        let response = app.send(Method::POST, &format!("/battle/{}/complete", battle_id), None).await;
        let completed: BattleResponse = read_json(response).await;
        assert_eq!(completed.battle.status, BattleStatus::Completed);
        assert_eq!(completed.battle.winner_id.as_deref(), Some("A"));

        let fetched: BattleResponse =
            read_json(app.send(Method::GET, &format!("/battle/{}", battle_id), None).await).await;
        assert_eq!(fetched.battle, completed.battle);

        let listed: BattleListResponse = read_json(app.send(Method::GET, "/battles", None).await).await;
        assert!(listed.battles.is_empty());
    }

    #[tokio::test]
    async fn test_replayed_answer_is_a_client_error() {
        let app = TestApp::new();
        let battle_id = create_battle(&app).await;
        join(&app, &battle_id, "B").await;
        ready(&app, &battle_id, "A").await;
        ready(&app, &battle_id, "B").await;

        let body = json!({ "userId": "B", "correct": true, "responseTime": 900, "questionIndex": 0 });
        let uri = format!("/battle/{}/answer", battle_id);
        assert_eq!(app.send(Method::POST, &uri, Some(body.clone())).await.status(), StatusCode::OK);

        let response = app.send(Method::POST, &uri, Some(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.code, "ANSWER_OUT_OF_ORDER");
    }

    #[tokio::test]
    async fn test_unknown_battle_is_404() {
        let app = TestApp::new();

        let response = app.send(Method::GET, "/battle/battle-missing", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.error, "Battle not found");

        assert_eq!(join(&app, "battle-missing", "B").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_subject_is_rejected() {
        let app = TestApp::new();

        let response = app
            .send(
                Method::POST,
                "/battle",
                Some(json!({ "hostId": "A", "hostName": "Ana", "hostAvatar": "tiger", "subject": "history" })),
            )
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.code, "INVALID_REQUEST");
    }
}
