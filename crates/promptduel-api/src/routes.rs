use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use promptduel_core::db::{
    Database, DuelRepository, LibSqlDuelRepository, LibSqlTurnRepository, TurnRepository,
};
use promptduel_core::tally::VoteTally;
use promptduel_core::{Duel, DuelId, NewDuel, NewTurn, Turn, TurnId, UpdateDuel, VoteCounter};

use crate::auth::{extract_bearer_token, AuthenticatedUser, JwtVerifier};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::rate_limit::{EndpointRateLimiter, ProtectedEndpoint, RateLimitMetricsSnapshot};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    db: Arc<Database>,
    jwt_verifier: Arc<JwtVerifier>,
    endpoint_rate_limiter: Arc<EndpointRateLimiter>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, db: Arc<Database>) -> Self {
        Self {
            jwt_verifier: Arc::new(JwtVerifier::new(config.clone())),
            endpoint_rate_limiter: Arc::new(EndpointRateLimiter::from_config(config.as_ref())),
            config,
            db,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/duels", get(list_duels).post(create_duel))
        .route(
            "/duels/{id}",
            get(get_duel).patch(update_duel).delete(delete_duel),
        )
        .route("/duels/{id}/turns", get(list_turns).post(create_turn))
        .route("/turns/{id}", delete(delete_turn))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/arena/{id}", get(arena_view))
        .route("/arena/turns/{id}/vote", post(cast_vote))
        .nest("/v1", protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    rate_limit: RateLimitMetricsSnapshot,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        rate_limit: state.endpoint_rate_limiter.metrics_snapshot(),
    })
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let user = state.jwt_verifier.verify_access_token(token).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// A duel with its derived tally, as listed on the dashboard
#[derive(Debug, Serialize)]
struct DuelSummary {
    #[serde(flatten)]
    duel: Duel,
    tally: VoteTally,
}

/// A duel with its ordered turns and tally, as shown in the arena
#[derive(Debug, Serialize)]
struct DuelDetail {
    duel: Duel,
    turns: Vec<Turn>,
    tally: VoteTally,
}

async fn load_detail(db: &Database, id: &DuelId) -> Result<DuelDetail, AppError> {
    let conn = db.connection();
    let duel = LibSqlDuelRepository::new(conn)
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Duel {id} does not exist")))?;
    let turns = LibSqlTurnRepository::new(conn).list_for_duel(id).await?;
    let tally = VoteTally::from_turns(&turns);
    Ok(DuelDetail { duel, turns, tally })
}

async fn arena_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DuelDetail>, AppError> {
    let id = parse_duel_id(&id)?;
    Ok(Json(load_detail(&state.db, &id).await?))
}

#[derive(Debug, Deserialize)]
struct VoteRequest {
    counter: String,
}

#[derive(Debug, Serialize)]
struct VoteResponse {
    ok: bool,
}

async fn cast_vote(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(id): Path<String>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, AppError> {
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::Vote, &addr.ip().to_string())
        .await?;

    let id = parse_turn_id(&id)?;
    let counter: VoteCounter = request
        .counter
        .parse()
        .map_err(|_| AppError::bad_request(format!("Unknown vote counter: {}", request.counter)))?;

    LibSqlTurnRepository::new(state.db.connection())
        .increment(&id, counter)
        .await?;
    tracing::info!(turn = %id, counter = %counter, "Recorded vote");
    Ok(Json(VoteResponse { ok: true }))
}

async fn list_duels(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<DuelSummary>>, AppError> {
    let listed = LibSqlDuelRepository::new(state.db.connection())
        .list_with_votes(&user.user_id)
        .await?;

    Ok(Json(
        listed
            .into_iter()
            .map(|entry| DuelSummary {
                tally: entry.tally(),
                duel: entry.duel,
            })
            .collect(),
    ))
}

async fn create_duel(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(input): Json<NewDuel>,
) -> Result<Json<Duel>, AppError> {
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::Mutation, &user.user_id)
        .await?;

    let duel = LibSqlDuelRepository::new(state.db.connection())
        .create(&user.user_id, input)
        .await?;
    tracing::info!(duel = %duel.id, "Created duel");
    Ok(Json(duel))
}

async fn get_duel(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<DuelDetail>, AppError> {
    let id = parse_duel_id(&id)?;
    let detail = load_detail(&state.db, &id).await?;
    ensure_owner(&detail.duel, &user)?;
    Ok(Json(detail))
}

async fn update_duel(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(changes): Json<UpdateDuel>,
) -> Result<Json<Duel>, AppError> {
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::Mutation, &user.user_id)
        .await?;

    let id = parse_duel_id(&id)?;
    let repo = LibSqlDuelRepository::new(state.db.connection());
    let existing = repo
        .get(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Duel {id} does not exist")))?;
    ensure_owner(&existing, &user)?;

    let updated = repo.update(&id, changes).await?;
    tracing::info!(duel = %id, "Updated duel");
    Ok(Json(updated))
}

async fn delete_duel(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::Mutation, &user.user_id)
        .await?;

    let id = parse_duel_id(&id)?;
    let repo = LibSqlDuelRepository::new(state.db.connection());
    let existing = repo
        .get(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Duel {id} does not exist")))?;
    ensure_owner(&existing, &user)?;

    repo.delete(&id).await?;
    tracing::info!(duel = %id, "Deleted duel");
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn list_turns(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Turn>>, AppError> {
    let id = parse_duel_id(&id)?;
    let conn = state.db.connection();
    let duel = LibSqlDuelRepository::new(conn)
        .get(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Duel {id} does not exist")))?;
    ensure_owner(&duel, &user)?;

    let turns = LibSqlTurnRepository::new(conn).list_for_duel(&id).await?;
    Ok(Json(turns))
}

#[derive(Debug, Deserialize)]
struct NewTurnRequest {
    user_input: String,
    response_a: String,
    response_b: String,
}

async fn create_turn(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(request): Json<NewTurnRequest>,
) -> Result<Json<Turn>, AppError> {
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::Mutation, &user.user_id)
        .await?;

    let id = parse_duel_id(&id)?;
    let conn = state.db.connection();
    let duel = LibSqlDuelRepository::new(conn)
        .get(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Duel {id} does not exist")))?;
    ensure_owner(&duel, &user)?;

    let turn = LibSqlTurnRepository::new(conn)
        .create(NewTurn {
            duel_id: id,
            user_input: request.user_input,
            response_a: request.response_a,
            response_b: request.response_b,
        })
        .await?;
    tracing::info!(duel = %id, turn = %turn.id, order = turn.turn_order, "Created turn");
    Ok(Json(turn))
}

async fn delete_turn(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::Mutation, &user.user_id)
        .await?;

    let id = parse_turn_id(&id)?;
    let conn = state.db.connection();
    let turn_repo = LibSqlTurnRepository::new(conn);
    let turn = turn_repo
        .get(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Turn {id} does not exist")))?;

    // Ownership flows through the parent duel.
    let duel = LibSqlDuelRepository::new(conn)
        .get(&turn.duel_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Duel {} does not exist", turn.duel_id)))?;
    ensure_owner(&duel, &user)?;

    turn_repo.delete(&id).await?;
    tracing::info!(turn = %id, "Deleted turn");
    Ok(Json(serde_json::json!({ "ok": true })))
}

fn ensure_owner(duel: &Duel, user: &AuthenticatedUser) -> Result<(), AppError> {
    if duel.owner_id == user.user_id {
        Ok(())
    } else {
        Err(AppError::forbidden("You do not own this duel"))
    }
}

fn parse_duel_id(raw: &str) -> Result<DuelId, AppError> {
    raw.parse()
        .map_err(|_| AppError::bad_request(format!("Invalid duel id: {raw}")))
}

fn parse_turn_id(raw: &str) -> Result<TurnId, AppError> {
    raw.parse()
        .map_err(|_| AppError::bad_request(format!("Invalid turn id: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_check_rejects_other_users() {
        let duel = Duel::create("owner-1", NewDuel {
            name: "Test".to_string(),
            ..NewDuel::default()
        });

        let owner = AuthenticatedUser {
            user_id: "owner-1".to_string(),
            email: None,
        };
        let stranger = AuthenticatedUser {
            user_id: "owner-2".to_string(),
            email: None,
        };

        assert!(ensure_owner(&duel, &owner).is_ok());
        assert!(matches!(
            ensure_owner(&duel, &stranger).unwrap_err(),
            AppError::Forbidden(_)
        ));
    }

    #[test]
    fn malformed_path_ids_are_bad_requests() {
        assert!(matches!(
            parse_duel_id("not-a-uuid").unwrap_err(),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            parse_turn_id("").unwrap_err(),
            AppError::BadRequest(_)
        ));
    }
}
