use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::{debug_handler, Json};
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::ai::{AiError, AthleteRiskProfile, InjuryRiskAssessment};
use crate::api::middleware::identity::{identity_from, ExternalIdentity};
use crate::api::server::{AppState, JsonResult, RouteError};
use crate::db::prelude::*;
use crate::db::store::StoreError;

//
// user management

#[instrument(skip(state, input))]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewUser>,
) -> JsonResult<User> {
    input.validate().map_err(RouteError::Validation)?;

    let user = UserRepository::new(&state.store).create(input).await?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn user_profile(
    State(state): State<Arc<AppState>>,
    ExternalIdentity(external_id): ExternalIdentity,
) -> JsonResult<User> {
    UserRepository::new(&state.store)
        .by_external_id(&external_id)
        .await?
        .map(Json)
        .ok_or_else(|| StoreError::not_found("user", &external_id).into())
}

#[instrument(skip(state, update))]
pub async fn update_user_profile(
    State(state): State<Arc<AppState>>,
    ExternalIdentity(external_id): ExternalIdentity,
    Json(update): Json<ProfileUpdate>,
) -> JsonResult<User> {
    let repo = UserRepository::new(&state.store);
    let user = repo
        .by_external_id(&external_id)
        .await?
        .ok_or_else(|| StoreError::not_found("user", &external_id))?;

    let updated = repo.update_profile(&user.id, update).await?;
    Ok(Json(updated))
}

//
// talents

/// Submission response. The wire `pointsAwarded` reports the combined
/// base+bonus delta applied to the user's total, while the stored talent
/// record keeps its fixed base value.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTalentResponse {
    #[serde(flatten)]
    pub talent: Talent,
    pub bonus_points: i64,
}

#[instrument(skip(state, input))]
pub async fn submit_talent(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewTalent>,
) -> JsonResult<SubmitTalentResponse> {
    input.validate().map_err(RouteError::Validation)?;

    let (talent, outcome) = state.scoring.submit_talent(input).await?;

    let mut wire = talent;
    wire.points_awarded = outcome.delta;

    Ok(Json(SubmitTalentResponse {
        talent: wire,
        bonus_points: outcome.bonus,
    }))
}

#[instrument(skip(state))]
pub async fn talents_by_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> JsonResult<Vec<Talent>> {
    let talents = TalentRepository::new(&state.store)
        .list_for_user(&user_id.into())
        .await;
    Ok(Json(talents))
}

#[instrument(skip(state))]
pub async fn all_talents(State(state): State<Arc<AppState>>) -> JsonResult<Vec<Talent>> {
    Ok(Json(TalentRepository::new(&state.store).list_all().await))
}

#[instrument(skip(state, body))]
pub async fn approve_talent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ApproveTalent>,
) -> JsonResult<Talent> {
    let talent = TalentRepository::new(&state.store)
        .approve(&id.into(), &body.approved_by)
        .await?;
    Ok(Json(talent))
}

//
// daily tasks

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTaskResponse {
    #[serde(flatten)]
    pub task: DailyTask,
    pub points_awarded: i64,
}

#[instrument(skip(state))]
pub async fn daily_tasks(
    State(state): State<Arc<AppState>>,
    ExternalIdentity(external_id): ExternalIdentity,
) -> JsonResult<Vec<DailyTask>> {
    let user = UserRepository::new(&state.store)
        .by_external_id(&external_id)
        .await?
        .ok_or_else(|| StoreError::not_found("user", &external_id))?;

    let tasks = state.lifecycle.daily_tasks(&user).await?;
    Ok(Json(tasks))
}

#[instrument(skip(state))]
pub async fn complete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> JsonResult<CompleteTaskResponse> {
    let outcome = state.lifecycle.complete(&id.into()).await?;

    Ok(Json(CompleteTaskResponse {
        points_awarded: outcome.award.map(|award| award.delta).unwrap_or(0),
        task: outcome.task,
    }))
}

//
// achievements

#[instrument(skip(state))]
pub async fn all_achievements(State(state): State<Arc<AppState>>) -> JsonResult<Vec<Achievement>> {
    Ok(Json(
        AchievementRepository::new(&state.store).list_all().await,
    ))
}

#[instrument(skip(state))]
pub async fn user_achievements(
    State(state): State<Arc<AppState>>,
    ExternalIdentity(external_id): ExternalIdentity,
) -> JsonResult<Vec<UnlockedAchievement>> {
    let user = UserRepository::new(&state.store)
        .by_external_id(&external_id)
        .await?
        .ok_or_else(|| StoreError::not_found("user", &external_id))?;

    let unlocked = AchievementRepository::new(&state.store)
        .list_for_user(&user.id)
        .await;
    Ok(Json(unlocked))
}

//
// leaderboard

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub sport: Option<String>,
    pub timeframe: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub athletes: Vec<User>,
    pub current_user_rank: Option<RankedAthlete>,
    pub scope: String,
    pub sport: String,
    pub timeframe: String,
}

#[instrument(skip(state, headers))]
#[debug_handler]
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Path(scope): Path<String>,
    Query(params): Query<LeaderboardParams>,
    headers: HeaderMap,
) -> JsonResult<LeaderboardResponse> {
    let filter = LeaderboardFilter {
        scope: scope.clone(),
        sport: params.sport.clone(),
        timeframe: params.timeframe.clone(),
    };

    let repo = LeaderboardRepository::new(&state.store);
    let athletes = repo.leaderboard(&filter).await;

    // rank lookup is best-effort: anonymous or unregistered callers simply
    // get no rank block
    let current_user_rank = match identity_from(&headers) {
        Some(external_id) => {
            match UserRepository::new(&state.store)
                .by_external_id(&external_id)
                .await?
            {
                Some(user) => repo.user_rank(&user.id, &filter).await,
                None => None,
            }
        }
        None => None,
    };

    Ok(Json(LeaderboardResponse {
        athletes,
        current_user_rank,
        scope,
        sport: params.sport.unwrap_or_else(|| String::from("all")),
        timeframe: params.timeframe.unwrap_or_else(|| String::from("monthly")),
    }))
}

//
// coach features

#[instrument(skip(state, input))]
pub async fn add_coach_athlete(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewCoachAthlete>,
) -> JsonResult<CoachAthlete> {
    let link = CoachRepository::new(&state.store).add_athlete(input).await?;
    Ok(Json(link))
}

#[instrument(skip(state))]
pub async fn coach_athletes(
    State(state): State<Arc<AppState>>,
    Path(coach_id): Path<String>,
) -> JsonResult<Vec<User>> {
    let roster = CoachRepository::new(&state.store)
        .athletes(&coach_id.into())
        .await;
    Ok(Json(roster))
}

#[instrument(skip(state))]
pub async fn coach_metrics(
    State(state): State<Arc<AppState>>,
    Path(coach_id): Path<String>,
) -> JsonResult<CoachMetricsSummary> {
    let summary = CoachRepository::new(&state.store)
        .metrics_summary(&coach_id.into())
        .await;
    Ok(Json(summary))
}

#[instrument(skip(state))]
pub async fn coach_analytics(
    State(state): State<Arc<AppState>>,
    Path(coach_id): Path<String>,
) -> JsonResult<CoachAnalytics> {
    let analytics = CoachRepository::new(&state.store)
        .analytics(&coach_id.into())
        .await;
    Ok(Json(analytics))
}

//
// performance records

#[instrument(skip(state, input))]
pub async fn create_performance_record(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewPerformanceRecord>,
) -> JsonResult<PerformanceRecord> {
    input.validate().map_err(RouteError::Validation)?;

    let record = CoachRepository::new(&state.store).create_record(input).await?;
    Ok(Json(record))
}

#[instrument(skip(state))]
pub async fn performance_records(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> JsonResult<Vec<PerformanceRecord>> {
    let records = CoachRepository::new(&state.store)
        .records_for_user(&user_id.into())
        .await;
    Ok(Json(records))
}

//
// injury alerts

#[instrument(skip(state, input))]
pub async fn create_injury_alert(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewInjuryAlert>,
) -> JsonResult<InjuryAlert> {
    input.validate().map_err(RouteError::Validation)?;

    let alert = AlertRepository::new(&state.store).create(input).await?;
    Ok(Json(alert))
}

#[instrument(skip(state))]
pub async fn injury_alerts(
    State(state): State<Arc<AppState>>,
    Path(coach_id): Path<String>,
) -> JsonResult<Vec<InjuryAlert>> {
    let alerts = AlertRepository::new(&state.store)
        .list_for_coach(&coach_id.into())
        .await;
    Ok(Json(alerts))
}

#[instrument(skip(state))]
pub async fn resolve_injury_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> JsonResult<InjuryAlert> {
    let alert = AlertRepository::new(&state.store).resolve(&id.into()).await?;
    Ok(Json(alert))
}

//
// on-demand ai analysis

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjuryAnalysisRequest {
    pub athlete_data: AthleteRiskProfile,
}

/// The one surface where collaborator failures are caller-visible: there
/// is no fallback for an explicit analysis request.
#[instrument(skip(state, request))]
pub async fn injury_analysis(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InjuryAnalysisRequest>,
) -> JsonResult<InjuryRiskAssessment> {
    if !state.ai.enabled() {
        return Err(RouteError::Ai(AiError::Disabled));
    }

    let assessment = state.ai.analyze_injury_risk(&request.athlete_data).await?;
    Ok(Json(assessment))
}
