use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use agora_store::{ActivityLog, AgentStore, LeaderboardStore, ReputationStore, SimStateStore,
    TaskStore, WalletStore};
use agora_types::{
    ActivityEvent, ActivityKind, Agent, AgentRole, AgentStatus, AgoraError, LeaderboardEntry,
    LeaderboardMetric, ReputationScore, Task, TaskStatus, TickResult, Wallet,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/tick", post(run_tick))
        .route("/api/v1/simulation/pause", post(pause_simulation))
        .route("/api/v1/simulation/resume", post(resume_simulation))
        .route("/api/v1/simulation/reset", post(reset_simulation))
        .route("/api/v1/simulation/status", get(simulation_status))
        .route("/api/v1/agents", post(register_agent).get(list_agents))
        .route("/api/v1/agents/{agent_id}", get(get_agent))
        .route("/api/v1/agents/{agent_id}/fund", post(fund_agent))
        .route("/api/v1/tasks", get(list_tasks))
        .route("/api/v1/leaderboard", get(leaderboard))
        .route("/api/v1/activity", get(recent_activity))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

fn error_response(err: AgoraError) -> (StatusCode, String) {
    let status = match &err {
        AgoraError::AgentNotFound(_)
        | AgoraError::TaskNotFound(_)
        | AgoraError::WalletNotFound(_)
        | AgoraError::ReputationNotFound(_)
        | AgoraError::BidNotFound(_) => StatusCode::NOT_FOUND,
        AgoraError::InvalidAmount(_)
        | AgoraError::InsufficientFunds { .. }
        | AgoraError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
        AgoraError::Store(_) | AgoraError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

async fn run_tick(State(state): State<AppState>) -> Json<TickResult> {
    Json(state.engine.tick().await)
}

async fn pause_simulation(State(state): State<AppState>) -> Result<StatusCode, (StatusCode, String)> {
    state.engine.pause().await.map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn resume_simulation(
    State(state): State<AppState>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.engine.resume().await.map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reset_simulation(
    State(state): State<AppState>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.engine.reset_state().await.map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(serde::Serialize)]
struct SimulationStatus {
    tick_count: u64,
    paused: bool,
    active_agents: usize,
    open_tasks: usize,
    activity_events: usize,
}

async fn simulation_status(
    State(state): State<AppState>,
) -> Result<Json<SimulationStatus>, (StatusCode, String)> {
    let sim = state.store.load_state().await.map_err(error_response)?;
    let active_agents = state
        .store
        .count_agents_by_status(AgentStatus::Active)
        .await
        .map_err(error_response)?;
    let open_tasks = state
        .store
        .count_tasks_by_status(TaskStatus::Open)
        .await
        .map_err(error_response)?;
    let activity_events = state.store.event_count().await.map_err(error_response)?;

    Ok(Json(SimulationStatus {
        tick_count: sim.tick_count,
        paused: sim.paused,
        active_agents,
        open_tasks,
        activity_events,
    }))
}

#[derive(serde::Deserialize)]
struct RegisterAgentRequest {
    name: String,
    #[serde(default)]
    role: Option<AgentRole>,
    #[serde(default)]
    initial_balance: i64,
}

/// Registers an agent together with its wallet and starting reputation.
/// A non-zero `initial_balance` is recorded as a funding transaction so
/// the ledger replays cleanly.
async fn register_agent(
    State(state): State<AppState>,
    Json(req): Json<RegisterAgentRequest>,
) -> Result<(StatusCode, Json<Agent>), (StatusCode, String)> {
    let agent = Agent::new(req.name, req.role.unwrap_or(AgentRole::Generalist));
    let agent_id = agent.id;
    let agent_clone = agent.clone();

    state.store.insert_agent(agent).await.map_err(error_response)?;
    state
        .store
        .insert_wallet(Wallet::new(agent_id))
        .await
        .map_err(error_response)?;
    state
        .store
        .insert_reputation(ReputationScore::new(agent_id))
        .await
        .map_err(error_response)?;

    if req.initial_balance > 0 {
        state
            .ledger
            .fund(agent_id, req.initial_balance)
            .await
            .map_err(error_response)?;
    }

    tracing::info!(agent = %agent_id, "agent registered");
    Ok((StatusCode::CREATED, Json(agent_clone)))
}

#[derive(serde::Deserialize)]
struct AgentListQuery {
    status: Option<AgentStatus>,
}

async fn list_agents(
    State(state): State<AppState>,
    Query(query): Query<AgentListQuery>,
) -> Result<Json<Vec<Agent>>, (StatusCode, String)> {
    let statuses = match query.status {
        Some(status) => vec![status],
        None => vec![
            AgentStatus::Active,
            AgentStatus::Suspended,
            AgentStatus::Archived,
        ],
    };
    let mut agents = Vec::new();
    for status in statuses {
        agents.extend(
            state
                .store
                .list_agents_by_status(status)
                .await
                .map_err(error_response)?,
        );
    }
    Ok(Json(agents))
}

#[derive(serde::Serialize)]
struct AgentDetail {
    agent: Agent,
    wallet: Option<Wallet>,
    reputation: Option<ReputationScore>,
}

async fn get_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<Uuid>,
) -> Result<Json<AgentDetail>, (StatusCode, String)> {
    let agent = state
        .store
        .get_agent(agent_id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(AgoraError::AgentNotFound(agent_id)))?;
    let wallet = state.store.get_wallet(agent_id).await.map_err(error_response)?;
    let reputation = state
        .store
        .get_reputation(agent_id)
        .await
        .map_err(error_response)?;

    Ok(Json(AgentDetail {
        agent,
        wallet,
        reputation,
    }))
}

#[derive(serde::Deserialize)]
struct FundRequest {
    amount: i64,
}

async fn fund_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<Uuid>,
    Json(req): Json<FundRequest>,
) -> Result<Json<Wallet>, (StatusCode, String)> {
    state
        .store
        .get_agent(agent_id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(AgoraError::AgentNotFound(agent_id)))?;

    let wallet = state
        .ledger
        .fund(agent_id, req.amount)
        .await
        .map_err(error_response)?;

    state
        .store
        .append_event(ActivityEvent::new(
            ActivityKind::AgentFunded,
            format!("agent {agent_id} funded with {}", req.amount),
            Some(agent_id),
            None,
        ))
        .await
        .map_err(error_response)?;

    Ok(Json(wallet))
}

#[derive(serde::Deserialize)]
struct TaskListQuery {
    status: Option<TaskStatus>,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    100
}

async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    let status = query.status.unwrap_or(TaskStatus::Open);
    let tasks = state
        .store
        .list_tasks_by_status(status, query.limit)
        .await
        .map_err(error_response)?;
    Ok(Json(tasks))
}

#[derive(serde::Deserialize)]
struct LeaderboardQuery {
    metric: Option<LeaderboardMetric>,
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, (StatusCode, String)> {
    let metric = query.metric.unwrap_or(LeaderboardMetric::Earnings);
    let entries = state
        .store
        .list_ranked_by(metric)
        .await
        .map_err(error_response)?;
    Ok(Json(entries))
}

#[derive(serde::Deserialize)]
struct ActivityQuery {
    #[serde(default = "default_activity_limit")]
    limit: usize,
}

fn default_activity_limit() -> usize {
    50
}

async fn recent_activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityEvent>>, (StatusCode, String)> {
    let events = state
        .store
        .recent_events(query.limit)
        .await
        .map_err(error_response)?;
    Ok(Json(events))
}
