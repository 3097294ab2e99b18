use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::behavior::{self, BehaviorReport};
use crate::config::BEHAVIOR_WINDOW_DAYS;
use crate::db::{positions, risk};
use crate::error::AppError;
use crate::exposure::{self, ExposureSummary, PairWarning, RuleBasedEstimator};
use crate::sizing::{self, SizingInput, StakeRecommendation};
use crate::types::{PositionStatus, Position};
use crate::{approval, hedge, odds};

use super::auth::AuthedOwner;
use super::ApiState;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/stakes/kelly", post(calculate_kelly))
        .route("/exposure", get(get_exposure))
        .route("/exposure/correlations", get(get_correlations))
        .route("/portfolio/summary", get(get_portfolio_summary))
        .route("/risk/check", post(check_risk_limits))
        .route("/behavior", get(get_behavior))
        .route("/behavior/recommendations", get(get_recommendations))
        .route("/approval", post(check_approval))
        .route("/arbitrage", post(calculate_arbitrage))
        .route("/bankroll", get(get_bankroll))
        .route("/bankroll/adjust", post(adjust_bankroll))
        .route("/positions/:id/hedge", post(calculate_hedge))
        .route("/positions/:id/settle", post(settle_position))
        .route("/warnings/:id/acknowledge", post(acknowledge_warning))
        .route("/signals/recent", get(get_recent_signals))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct KellyRequest {
    pub win_probability: f64,
    pub american_odds: i32,
    /// Overrides the owner's configured fraction when set.
    pub multiplier: Option<f64>,
}

#[derive(Serialize)]
pub struct ExposureResponse {
    #[serde(flatten)]
    pub summary: ExposureSummary,
    pub warnings: Vec<PairWarning>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CorrelationResponse {
    InsufficientData {
        open_positions: usize,
        required: usize,
    },
    Ok {
        correlation_score: f64,
        warnings: Vec<PairWarning>,
    },
}

#[derive(Serialize)]
pub struct PortfolioSummary {
    pub bankroll: f64,
    pub starting_bankroll: f64,
    pub open_positions: usize,
    pub total_at_risk: f64,
    pub total_potential_payout: f64,
    pub settled_30d: SettledRecord,
    pub net_pnl_30d: f64,
    pub active_warnings: Vec<crate::db::models::WarningRow>,
}

#[derive(Serialize, Default)]
pub struct SettledRecord {
    pub won: usize,
    pub lost: usize,
    pub push: usize,
}

#[derive(Deserialize)]
pub struct StakeCheckRequest {
    pub proposed_stake: f64,
}

#[derive(Deserialize)]
pub struct ArbitrageRequest {
    pub odds_a: i32,
    pub odds_b: i32,
    pub total_stake: f64,
}

#[derive(Deserialize)]
pub struct HedgeRequest {
    pub counter_odds: i32,
    pub strategy: String,
}

#[derive(Deserialize)]
pub struct SettleRequest {
    pub outcome: String,
}

#[derive(Deserialize)]
pub struct BankrollAdjustRequest {
    /// Positive for a deposit, negative for a withdrawal.
    pub amount: f64,
}

#[derive(Deserialize)]
pub struct RecentSignalsQuery {
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn calculate_kelly(
    State(state): State<ApiState>,
    AuthedOwner(owner_id): AuthedOwner,
    Json(req): Json<KellyRequest>,
) -> Result<Json<StakeRecommendation>, AppError> {
    let bankroll = positions::bankroll(&state.pool, &owner_id).await?;
    let multiplier = req.multiplier.or(Some(bankroll.kelly_multiplier));
    let rec = sizing::size_stake(SizingInput {
        win_probability: req.win_probability,
        american_odds: req.american_odds,
        bankroll: bankroll.current_amount,
        multiplier,
    })?;
    risk::insert_stake_recommendation(
        &state.pool,
        &owner_id,
        req.win_probability,
        req.american_odds,
        rec.recommended_stake,
        rec.full_kelly_stake,
        rec.expected_value_pct,
        Utc::now().timestamp(),
    )
    .await?;
    Ok(Json(rec))
}

async fn get_exposure(
    State(state): State<ApiState>,
    AuthedOwner(owner_id): AuthedOwner,
) -> Result<Json<ExposureResponse>, AppError> {
    let now = Utc::now();
    let pending = positions::pending_for_owner(&state.pool, &owner_id).await?;
    let (summary, warnings) = exposure::compute(&owner_id, &pending, &RuleBasedEstimator, now);
    risk::upsert_snapshot(&state.pool, &summary, now.timestamp()).await?;
    risk::upsert_warnings(&state.pool, &owner_id, &warnings, now.timestamp()).await?;
    risk::retire_stale_warnings(&state.pool, &owner_id).await?;
    Ok(Json(ExposureResponse { summary, warnings }))
}

async fn get_correlations(
    State(state): State<ApiState>,
    AuthedOwner(owner_id): AuthedOwner,
) -> Result<Json<CorrelationResponse>, AppError> {
    let pending = positions::pending_for_owner(&state.pool, &owner_id).await?;
    if pending.len() < 2 {
        return Ok(Json(CorrelationResponse::InsufficientData {
            open_positions: pending.len(),
            required: 2,
        }));
    }
    let (summary, warnings) =
        exposure::compute(&owner_id, &pending, &RuleBasedEstimator, Utc::now());
    Ok(Json(CorrelationResponse::Ok {
        correlation_score: summary.correlation_score,
        warnings,
    }))
}

async fn get_portfolio_summary(
    State(state): State<ApiState>,
    AuthedOwner(owner_id): AuthedOwner,
) -> Result<Json<PortfolioSummary>, AppError> {
    let now = Utc::now();
    let bankroll = positions::bankroll(&state.pool, &owner_id).await?;
    let pending = positions::pending_for_owner(&state.pool, &owner_id).await?;
    let cutoff = (now - Duration::days(BEHAVIOR_WINDOW_DAYS)).timestamp();
    let history = positions::history_since(&state.pool, &owner_id, cutoff).await?;

    let mut total_at_risk = 0.0;
    let mut total_potential_payout = 0.0;
    for p in &pending {
        total_at_risk += p.stake;
        if let Ok(d) = odds::decimal_odds(p.american_odds) {
            total_potential_payout += p.stake * d;
        }
    }

    let mut settled = SettledRecord::default();
    let mut net_pnl = 0.0;
    for p in &history {
        match p.status {
            PositionStatus::Won => {
                settled.won += 1;
                if let Ok(d) = odds::decimal_odds(p.american_odds) {
                    net_pnl += p.stake * (d - 1.0);
                }
            }
            PositionStatus::Lost => {
                settled.lost += 1;
                net_pnl -= p.stake;
            }
            PositionStatus::Push => settled.push += 1,
            PositionStatus::Pending => {}
        }
    }

    Ok(Json(PortfolioSummary {
        bankroll: bankroll.current_amount,
        starting_bankroll: bankroll.starting_amount,
        open_positions: pending.len(),
        total_at_risk,
        total_potential_payout,
        settled_30d: settled,
        net_pnl_30d: net_pnl,
        active_warnings: risk::active_warnings(&state.pool, &owner_id).await?,
    }))
}

async fn get_bankroll(
    State(state): State<ApiState>,
    AuthedOwner(owner_id): AuthedOwner,
) -> Result<Json<crate::types::Bankroll>, AppError> {
    let bankroll = positions::bankroll(&state.pool, &owner_id).await?;
    Ok(Json(bankroll))
}

async fn adjust_bankroll(
    State(state): State<ApiState>,
    AuthedOwner(owner_id): AuthedOwner,
    Json(req): Json<BankrollAdjustRequest>,
) -> Result<Json<crate::types::Bankroll>, AppError> {
    let bankroll = positions::adjust_bankroll(&state.pool, &owner_id, req.amount).await?;
    Ok(Json(bankroll))
}

async fn check_risk_limits(
    State(state): State<ApiState>,
    AuthedOwner(owner_id): AuthedOwner,
    Json(req): Json<StakeCheckRequest>,
) -> Result<Json<approval::RiskLimitCheck>, AppError> {
    let bankroll = positions::bankroll(&state.pool, &owner_id).await?;
    let pending = positions::pending_for_owner(&state.pool, &owner_id).await?;
    let check = approval::check_risk_limits(&bankroll, &pending, req.proposed_stake, Utc::now())?;
    Ok(Json(check))
}

async fn get_behavior(
    State(state): State<ApiState>,
    AuthedOwner(owner_id): AuthedOwner,
) -> Result<Json<BehaviorReport>, AppError> {
    let report = build_behavior_report(&state, &owner_id).await?;
    if let BehaviorReport::Ok(bundle) = &report {
        risk::upsert_tilt_assessment(
            &state.pool,
            &owner_id,
            bundle.tilt.score,
            &serde_json::to_string(&bundle.tilt.indicators)?,
            &bundle.tilt.recommendation,
            Utc::now().timestamp(),
        )
        .await?;
    }
    Ok(Json(report))
}

async fn get_recommendations(
    State(state): State<ApiState>,
    AuthedOwner(owner_id): AuthedOwner,
) -> Result<Json<serde_json::Value>, AppError> {
    let report = build_behavior_report(&state, &owner_id).await?;
    match report {
        BehaviorReport::InsufficientData { settled_bets, required } => {
            Ok(Json(serde_json::json!({
                "status": "insufficient_data",
                "settled_bets": settled_bets,
                "required": required,
            })))
        }
        BehaviorReport::Ok(bundle) => Ok(Json(serde_json::json!({
            "status": "ok",
            "overall_score": bundle.overall_score,
            "band": bundle.band,
            "recommendations": bundle.recommendations,
        }))),
    }
}

async fn check_approval(
    State(state): State<ApiState>,
    AuthedOwner(owner_id): AuthedOwner,
    Json(req): Json<StakeCheckRequest>,
) -> Result<Json<approval::ApprovalDecision>, AppError> {
    let now = Utc::now();
    let bankroll = positions::bankroll(&state.pool, &owner_id).await?;
    let pending = positions::pending_for_owner(&state.pool, &owner_id).await?;
    let (exposure, _) = exposure::compute(&owner_id, &pending, &RuleBasedEstimator, now);
    let behavior = build_behavior_report(&state, &owner_id).await?;
    let decision = approval::evaluate(
        &bankroll,
        &pending,
        &exposure,
        &behavior,
        req.proposed_stake,
        now,
    )?;
    Ok(Json(decision))
}

async fn calculate_arbitrage(
    AuthedOwner(_owner_id): AuthedOwner,
    Json(req): Json<ArbitrageRequest>,
) -> Result<Json<hedge::ArbitrageResult>, AppError> {
    let result = hedge::arbitrage(req.odds_a, req.odds_b, req.total_stake)?;
    Ok(Json(result))
}

async fn calculate_hedge(
    State(state): State<ApiState>,
    AuthedOwner(owner_id): AuthedOwner,
    Path(id): Path<i64>,
    Json(req): Json<HedgeRequest>,
) -> Result<Json<hedge::HedgeResult>, AppError> {
    let strategy = hedge::HedgeStrategy::parse(&req.strategy).ok_or_else(|| {
        AppError::validation(
            "strategy must be guaranteed_profit, minimize_loss or maximize_profit",
        )
    })?;
    let position = owned_position(&state, &owner_id, id).await?;
    let result = hedge::hedge(&position, req.counter_odds, strategy)?;
    Ok(Json(result))
}

async fn settle_position(
    State(state): State<ApiState>,
    AuthedOwner(owner_id): AuthedOwner,
    Path(id): Path<i64>,
    Json(req): Json<SettleRequest>,
) -> Result<Json<Position>, AppError> {
    let outcome = PositionStatus::parse(&req.outcome)
        .ok_or_else(|| AppError::validation("outcome must be won, lost or push"))?;
    // Ownership check before the settlement transaction.
    owned_position(&state, &owner_id, id).await?;
    let settled = positions::settle(&state.pool, id, outcome, Utc::now().timestamp()).await?;
    // Warnings referencing the now-settled position no longer describe an
    // open pair.
    risk::retire_stale_warnings(&state.pool, &owner_id).await?;
    Ok(Json(settled))
}

async fn acknowledge_warning(
    State(state): State<ApiState>,
    AuthedOwner(owner_id): AuthedOwner,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !risk::acknowledge_warning(&state.pool, &owner_id, id).await? {
        return Err(AppError::NotFound(format!("warning {id}")));
    }
    Ok(Json(serde_json::json!({ "acknowledged": true })))
}

async fn get_recent_signals(
    State(state): State<ApiState>,
    AuthedOwner(_owner_id): AuthedOwner,
    Query(params): Query<RecentSignalsQuery>,
) -> Result<Json<Vec<crate::db::models::SignalRow>>, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    let signals = risk::recent_signals(&state.pool, limit).await?;
    Ok(Json(signals))
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

async fn build_behavior_report(
    state: &ApiState,
    owner_id: &str,
) -> Result<BehaviorReport, AppError> {
    let now = Utc::now();
    let cutoff = (now - Duration::days(BEHAVIOR_WINDOW_DAYS)).timestamp();
    let window = positions::history_since(&state.pool, owner_id, cutoff).await?;
    let sport_counts = positions::lifetime_sport_counts(&state.pool, owner_id).await?;
    let recommended = risk::recommended_stakes_since(&state.pool, owner_id, cutoff).await?;
    let bankroll = positions::bankroll(&state.pool, owner_id).await?;
    Ok(behavior::analyze(
        &window,
        &sport_counts,
        &recommended,
        bankroll.current_amount,
        state.local_utc_offset_hours,
        now,
    ))
}

async fn owned_position(state: &ApiState, owner_id: &str, id: i64) -> Result<Position, AppError> {
    let position = positions::get(&state.pool, id).await?;
    // Cross-owner ids read as missing, not forbidden.
    if position.owner_id != owner_id {
        return Err(AppError::NotFound(format!("position {id}")));
    }
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn state_with_token() -> ApiState {
        let pool = test_pool().await;
        sqlx::query(
            "INSERT INTO api_tokens (token, owner_id, expires_at) VALUES ('tok1', 'u1', 4102444800)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO bankrolls (owner_id, current_amount, starting_amount) VALUES ('u1', 1000.0, 1000.0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        ApiState::new(pool, 0)
    }

    fn authed(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", "Bearer tok1")
            .header("content-type", "application/json");
        match body {
            Some(v) => builder.body(Body::from(v.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let state = state_with_token().await;
        let app = router(state);
        let resp = app
            .oneshot(Request::get("/exposure").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn kelly_endpoint_sizes_and_persists() {
        let state = state_with_token().await;
        let pool = state.pool.clone();
        let app = router(state);
        let resp = app
            .oneshot(authed(
                "POST",
                "/stakes/kelly",
                Some(serde_json::json!({
                    "win_probability": 0.5,
                    "american_odds": 150,
                    "multiplier": 0.25
                })),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert!((body["recommended_stake"].as_f64().unwrap() - 41.67).abs() < 0.01);

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM stake_recommendations WHERE owner_id = 'u1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn correlations_report_insufficient_data_below_two_positions() {
        let state = state_with_token().await;
        let app = router(state);
        let resp = app
            .oneshot(authed("GET", "/exposure/correlations", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "insufficient_data");
        assert_eq!(body["required"], 2);
    }

    #[tokio::test]
    async fn behavior_reports_insufficient_data_for_new_owner() {
        let state = state_with_token().await;
        let app = router(state);
        let resp = app.oneshot(authed("GET", "/behavior", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "insufficient_data");
    }

    #[tokio::test]
    async fn arbitrage_endpoint_splits_stakes() {
        let state = state_with_token().await;
        let app = router(state);
        let resp = app
            .oneshot(authed(
                "POST",
                "/arbitrage",
                Some(serde_json::json!({
                    "odds_a": 120, "odds_b": 120, "total_stake": 1000.0
                })),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["has_arbitrage"], true);
        assert!((body["stake_a"].as_f64().unwrap() - 500.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn settling_another_owners_position_is_404() {
        let state = state_with_token().await;
        let pool = state.pool.clone();
        sqlx::query(
            "INSERT INTO positions (owner_id, event_id, sport, market, outcome, stake, american_odds, status, placed_at)
             VALUES ('u2', 'evt1', 'basketball', 'spread', 'home', 50.0, -110, 'pending', 1699963200)",
        )
        .execute(&pool)
        .await
        .unwrap();
        let app = router(state);
        let resp = app
            .oneshot(authed(
                "POST",
                "/positions/1/settle",
                Some(serde_json::json!({ "outcome": "won" })),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn approval_blocks_oversized_stake() {
        let state = state_with_token().await;
        let app = router(state);
        let resp = app
            .oneshot(authed(
                "POST",
                "/approval",
                Some(serde_json::json!({ "proposed_stake": 100.0 })),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        // Default max_single_bet_pct is 0.05 of 1000.
        assert_eq!(body["approved"], false);
        assert!(body["blocks"][0]
            .as_str()
            .unwrap()
            .contains("single-bet limit"));
    }
}
