use crate::checklist::{self, ToggleAction};
use crate::config::Config;
use crate::model::{format_date_local, parse_date, Activity, ActivityMarker, DailyRecord, Schedule, User};
use crate::service::{MarkerOptions, Tracker};
use crate::session;
use crate::state::StateStore;
use crate::views::{self, AnalyticsView, ChecklistView, DailyView, WeeklyView};
use crate::analytics;
use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .route(
            "/api/v1/session",
            get(session_get).post(session_login).delete(session_logout),
        )
        .route("/api/v1/activities", get(activities_list).post(activities_create))
        .route(
            "/api/v1/activities/:id/markers",
            get(markers_list).post(markers_create),
        )
        .route("/api/v1/markers/:id/target", put(marker_target_put))
        .route("/api/v1/markers/:id/checkboxes", put(marker_checkboxes_put))
        .route("/api/v1/daily", get(daily))
        .route("/api/v1/daily/toggle", post(daily_toggle))
        .route("/api/v1/weekly", get(weekly))
        .route("/api/v1/activities/:id/checklist", get(checklist_get))
        .route("/api/v1/activities/:id/checklist/toggle", post(checklist_toggle))
        .route("/api/v1/activities/:id/checklist/clear", post(checklist_clear))
        .route("/api/v1/activities/:id/markers/visibility", put(marker_visibility_put))
        .route("/api/v1/activities/:id/suggestions", get(suggestions))
        .route("/api/v1/analytics", get(analytics_get))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    logged_in: bool,
    username: Option<String>,
    api_port: u16,
}

async fn status(State(state): State<ApiState>) -> ApiResult<Json<StatusPayload>> {
    let tracker = Tracker::open(&state.config.db_path)?;
    let mut store = StateStore::load(&state.config.state_path);
    let user = session::restore(&tracker, &mut store)?;

    Ok(Json(StatusPayload {
        logged_in: user.is_some(),
        username: user.map(|u| u.username),
        api_port: state.config.api_port,
    }))
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    username: String,
}

async fn session_get(State(state): State<ApiState>) -> ApiResult<Json<serde_json::Value>> {
    let tracker = Tracker::open(&state.config.db_path)?;
    let mut store = StateStore::load(&state.config.state_path);
    let user = session::restore(&tracker, &mut store)?;

    Ok(Json(json!({ "user": user })))
}

async fn session_login(
    State(state): State<ApiState>,
    Json(payload): Json<LoginPayload>,
) -> ApiResult<Json<User>> {
    if payload.username.trim().is_empty() {
        return Err(ApiError::BadRequest("Username must not be empty".to_string()));
    }

    let tracker = Tracker::open(&state.config.db_path)?;
    let mut store = StateStore::load(&state.config.state_path);
    let user = session::login(&tracker, &mut store, &payload.username)?;

    Ok(Json(user))
}

async fn session_logout(State(state): State<ApiState>) -> ApiResult<Json<serde_json::Value>> {
    let mut store = StateStore::load(&state.config.state_path);
    session::logout(&mut store)?;

    Ok(Json(json!({ "logged_out": true })))
}

#[derive(Debug, Deserialize)]
struct ActivityCreatePayload {
    name: String,
    schedule: Option<Schedule>,
}

async fn activities_list(State(state): State<ApiState>) -> ApiResult<Json<Vec<Activity>>> {
    let tracker = Tracker::open(&state.config.db_path)?;
    let user = active_user(&state, &tracker)?;

    Ok(Json(tracker.get_activities(user.id)?))
}

async fn activities_create(
    State(state): State<ApiState>,
    Json(payload): Json<ActivityCreatePayload>,
) -> ApiResult<Json<Activity>> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Activity name must not be empty".to_string()));
    }

    let tracker = Tracker::open(&state.config.db_path)?;
    let user = active_user(&state, &tracker)?;
    let activity = tracker.create_activity(user.id, name, payload.schedule.as_ref())?;

    Ok(Json(activity))
}

#[derive(Debug, Deserialize)]
struct MarkerCreatePayload {
    label: String,
    is_default: Option<bool>,
    target: Option<u32>,
}

async fn markers_list(
    State(state): State<ApiState>,
    Path(activity_id): Path<i64>,
) -> ApiResult<Json<Vec<ActivityMarker>>> {
    let tracker = Tracker::open(&state.config.db_path)?;
    active_user(&state, &tracker)?;
    require_activity(&tracker, activity_id)?;

    Ok(Json(tracker.get_activity_markers(activity_id)?))
}

async fn markers_create(
    State(state): State<ApiState>,
    Path(activity_id): Path<i64>,
    Json(payload): Json<MarkerCreatePayload>,
) -> ApiResult<Json<ActivityMarker>> {
    let label = payload.label.trim();
    if label.is_empty() {
        return Err(ApiError::BadRequest("Marker label must not be empty".to_string()));
    }
    if payload.target == Some(0) {
        return Err(ApiError::BadRequest("Target must be a positive number".to_string()));
    }

    let tracker = Tracker::open(&state.config.db_path)?;
    active_user(&state, &tracker)?;
    require_activity(&tracker, activity_id)?;

    let marker = tracker.create_activity_marker(
        activity_id,
        label,
        MarkerOptions {
            is_default: payload.is_default,
            target: payload.target,
        },
    )?;

    Ok(Json(marker))
}

#[derive(Debug, Deserialize)]
struct TargetPayload {
    target: Option<u32>,
}

async fn marker_target_put(
    State(state): State<ApiState>,
    Path(marker_id): Path<i64>,
    Json(payload): Json<TargetPayload>,
) -> ApiResult<Json<ActivityMarker>> {
    if payload.target == Some(0) {
        return Err(ApiError::BadRequest("Target must be a positive number".to_string()));
    }

    let tracker = Tracker::open(&state.config.db_path)?;
    active_user(&state, &tracker)?;
    if tracker.get_marker(marker_id)?.is_none() {
        return Err(ApiError::NotFound(format!("Marker not found: {marker_id}")));
    }

    Ok(Json(tracker.update_marker_target(marker_id, payload.target)?))
}

#[derive(Debug, Deserialize)]
struct CheckboxCountPayload {
    delta: i32,
}

async fn marker_checkboxes_put(
    State(state): State<ApiState>,
    Path(marker_id): Path<i64>,
    Json(payload): Json<CheckboxCountPayload>,
) -> ApiResult<Json<serde_json::Value>> {
    let tracker = Tracker::open(&state.config.db_path)?;
    active_user(&state, &tracker)?;
    if tracker.get_marker(marker_id)?.is_none() {
        return Err(ApiError::NotFound(format!("Marker not found: {marker_id}")));
    }

    let mut store = StateStore::load(&state.config.state_path);
    let count = store.adjust_checkbox_count(
        marker_id,
        payload.delta,
        state.config.default_checkbox_count,
    )?;

    Ok(Json(json!({ "checkbox_count": count })))
}

#[derive(Debug, Deserialize)]
struct DateQuery {
    date: Option<String>,
}

async fn daily(
    State(state): State<ApiState>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<DailyView>> {
    let date = resolve_date(query.date.as_deref())?;
    let tracker = Tracker::open(&state.config.db_path)?;
    let user = active_user(&state, &tracker)?;

    Ok(Json(views::daily_view(&tracker, user.id, date)?))
}

#[derive(Debug, Deserialize)]
struct DailyTogglePayload {
    marker_id: i64,
    date: Option<String>,
}

/// The dashboard's single-toggle cell: flips the completed flag of the
/// marker's first record of the day, creating one when none exists.
async fn daily_toggle(
    State(state): State<ApiState>,
    Json(payload): Json<DailyTogglePayload>,
) -> ApiResult<Json<DailyRecord>> {
    let date = resolve_date(payload.date.as_deref())?;
    let tracker = Tracker::open(&state.config.db_path)?;
    let user = active_user(&state, &tracker)?;
    if tracker.get_marker(payload.marker_id)?.is_none() {
        return Err(ApiError::NotFound(format!(
            "Marker not found: {}",
            payload.marker_id
        )));
    }

    let records = tracker.get_daily_records(user.id, date)?;
    let existing = records
        .iter()
        .filter(|r| r.activity_marker_id == payload.marker_id)
        .min_by_key(|r| (r.created_at, r.id));

    let record = match existing {
        Some(record) => tracker.update_daily_record(record.id, !record.completed)?,
        None => tracker.create_daily_record(user.id, payload.marker_id, date, true, None)?,
    };

    Ok(Json(record))
}

async fn weekly(
    State(state): State<ApiState>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<WeeklyView>> {
    let date = resolve_date(query.date.as_deref())?;
    let tracker = Tracker::open(&state.config.db_path)?;
    let user = active_user(&state, &tracker)?;

    Ok(Json(views::weekly_view(&tracker, user.id, date)?))
}

async fn checklist_get(
    State(state): State<ApiState>,
    Path(activity_id): Path<i64>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<ChecklistView>> {
    let date = resolve_date(query.date.as_deref())?;
    let tracker = Tracker::open(&state.config.db_path)?;
    let user = active_user(&state, &tracker)?;
    let store = StateStore::load(&state.config.state_path);

    views::checklist_view(
        &tracker,
        &store,
        state.config.default_checkbox_count,
        user.id,
        activity_id,
        date,
    )?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("Activity not found: {activity_id}")))
}

#[derive(Debug, Deserialize)]
struct ChecklistTogglePayload {
    marker_id: i64,
    index: usize,
    date: Option<String>,
}

async fn checklist_toggle(
    State(state): State<ApiState>,
    Path(activity_id): Path<i64>,
    Json(payload): Json<ChecklistTogglePayload>,
) -> ApiResult<Json<ChecklistView>> {
    let date = resolve_date(payload.date.as_deref())?;
    let tracker = Tracker::open(&state.config.db_path)?;
    let user = active_user(&state, &tracker)?;
    require_activity(&tracker, activity_id)?;
    let marker = require_marker_in_activity(&tracker, activity_id, payload.marker_id)?;

    let records = tracker.get_daily_records(user.id, date)?;
    match checklist::toggle_action(&records, &marker, &format_date_local(date), payload.index) {
        ToggleAction::Remove { record_id } => {
            tracker.delete_daily_record(record_id)?;
        }
        ToggleAction::Add { target_snapshot } => {
            tracker.create_daily_record(user.id, marker.id, date, true, target_snapshot)?;
        }
    }

    refetch_checklist(&state, &tracker, user.id, activity_id, date)
}

#[derive(Debug, Deserialize)]
struct ChecklistClearPayload {
    marker_id: i64,
    date: Option<String>,
}

/// Deletes every record of the marker's day, one delete per record. A
/// mid-sequence failure leaves the partial state and is surfaced as-is.
async fn checklist_clear(
    State(state): State<ApiState>,
    Path(activity_id): Path<i64>,
    Json(payload): Json<ChecklistClearPayload>,
) -> ApiResult<Json<ChecklistView>> {
    let date = resolve_date(payload.date.as_deref())?;
    let tracker = Tracker::open(&state.config.db_path)?;
    let user = active_user(&state, &tracker)?;
    require_activity(&tracker, activity_id)?;
    let marker = require_marker_in_activity(&tracker, activity_id, payload.marker_id)?;

    let records = tracker.get_daily_records(user.id, date)?;
    for record_id in checklist::clear_record_ids(&records, marker.id, &format_date_local(date)) {
        tracker.delete_daily_record(record_id)?;
    }

    refetch_checklist(&state, &tracker, user.id, activity_id, date)
}

#[derive(Debug, Deserialize)]
struct VisibilityPayload {
    marker_id: Option<i64>,
    date: Option<String>,
    action: VisibilityAction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum VisibilityAction {
    Show,
    Hide,
    ShowAll,
}

async fn marker_visibility_put(
    State(state): State<ApiState>,
    Path(activity_id): Path<i64>,
    Json(payload): Json<VisibilityPayload>,
) -> ApiResult<Json<ChecklistView>> {
    let date = resolve_date(payload.date.as_deref())?;
    let date_string = format_date_local(date);
    let tracker = Tracker::open(&state.config.db_path)?;
    let user = active_user(&state, &tracker)?;
    require_activity(&tracker, activity_id)?;

    let markers = tracker.get_activity_markers(activity_id)?;
    let first_marker = markers.first().map(|marker| marker.id);
    let mut store = StateStore::load(&state.config.state_path);

    match payload.action {
        VisibilityAction::Show => {
            let marker_id = payload
                .marker_id
                .ok_or_else(|| ApiError::BadRequest("marker_id is required".to_string()))?;
            store.show_marker(activity_id, &date_string, marker_id, first_marker)?;
        }
        VisibilityAction::Hide => {
            let marker_id = payload
                .marker_id
                .ok_or_else(|| ApiError::BadRequest("marker_id is required".to_string()))?;
            store.hide_marker(activity_id, &date_string, marker_id, first_marker)?;
        }
        VisibilityAction::ShowAll => {
            store.show_all_markers(
                activity_id,
                &date_string,
                markers.iter().map(|marker| marker.id),
            )?;
        }
    }

    refetch_checklist(&state, &tracker, user.id, activity_id, date)
}

#[derive(Debug, Deserialize)]
struct SuggestionsQuery {
    date: Option<String>,
    query: Option<String>,
}

async fn suggestions(
    State(state): State<ApiState>,
    Path(activity_id): Path<i64>,
    Query(query): Query<SuggestionsQuery>,
) -> ApiResult<Json<Vec<ActivityMarker>>> {
    let date = resolve_date(query.date.as_deref())?;
    let tracker = Tracker::open(&state.config.db_path)?;
    active_user(&state, &tracker)?;
    require_activity(&tracker, activity_id)?;

    let markers = tracker.get_activity_markers(activity_id)?;
    let store = StateStore::load(&state.config.state_path);
    let visible = store.visible_markers(
        activity_id,
        &format_date_local(date),
        markers.first().map(|marker| marker.id),
    );

    let matches =
        views::marker_suggestions(&markers, &visible, query.query.as_deref().unwrap_or(""))
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();

    Ok(Json(matches))
}

#[derive(Debug, Deserialize)]
struct AnalyticsQuery {
    view: Option<String>,
    month: Option<String>,
    year: Option<i32>,
}

async fn analytics_get(
    State(state): State<ApiState>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<AnalyticsView>> {
    let tracker = Tracker::open(&state.config.db_path)?;
    let user = active_user(&state, &tracker)?;

    let today = Local::now().date_naive();
    let (start, end) = match query.view.as_deref().unwrap_or("monthly") {
        "monthly" => {
            let (year, month) = match query.month.as_deref() {
                Some(raw) => parse_year_month(raw)?,
                None => (today.year(), today.month()),
            };
            analytics::month_window(year, month)?
        }
        "yearly" => analytics::year_window(query.year.unwrap_or_else(|| today.year()))?,
        "alltime" => (state.config.parse_analytics_epoch()?, today),
        other => {
            return Err(ApiError::BadRequest(format!(
                "Unsupported analytics view: {other}. Use monthly, yearly or alltime"
            )));
        }
    };

    Ok(Json(views::analytics_view(&tracker, user.id, start, end)?))
}

fn active_user(state: &ApiState, tracker: &Tracker) -> Result<User, ApiError> {
    let mut store = StateStore::load(&state.config.state_path);
    session::restore(tracker, &mut store)?
        .ok_or_else(|| ApiError::Unauthorized("Not logged in".to_string()))
}

fn require_activity(tracker: &Tracker, activity_id: i64) -> Result<Activity, ApiError> {
    tracker
        .get_activity(activity_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Activity not found: {activity_id}")))
}

/// The marker must both exist and belong to the activity in the URL;
/// a marker reached through the wrong activity reads as missing.
fn require_marker_in_activity(
    tracker: &Tracker,
    activity_id: i64,
    marker_id: i64,
) -> Result<ActivityMarker, ApiError> {
    tracker
        .get_marker(marker_id)?
        .filter(|marker| marker.activity_id == activity_id)
        .ok_or_else(|| ApiError::NotFound(format!("Marker not found: {marker_id}")))
}

fn refetch_checklist(
    state: &ApiState,
    tracker: &Tracker,
    user_id: i64,
    activity_id: i64,
    date: NaiveDate,
) -> ApiResult<Json<ChecklistView>> {
    let store = StateStore::load(&state.config.state_path);

    views::checklist_view(
        tracker,
        &store,
        state.config.default_checkbox_count,
        user_id,
        activity_id,
        date,
    )?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("Activity not found: {activity_id}")))
}

fn resolve_date(input: Option<&str>) -> Result<NaiveDate, ApiError> {
    match input {
        Some(raw) => parse_date(raw).map_err(|error| ApiError::BadRequest(error.to_string())),
        None => Ok(Local::now().date_naive()),
    }
}

fn parse_year_month(raw: &str) -> Result<(i32, u32), ApiError> {
    let invalid =
        || ApiError::BadRequest(format!("Invalid month format: {raw}. Example: 2026-02"));

    let (year, month) = raw.split_once('-').ok_or_else(invalid)?;
    let year = year.parse::<i32>().map_err(|_| invalid())?;
    let month = month.parse::<u32>().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }

    Ok((year, month))
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_year_month, require_marker_in_activity, ApiError};
    use crate::service::{MarkerOptions, Tracker};

    #[test]
    fn year_month_parsing() {
        assert_eq!(parse_year_month("2026-02").unwrap(), (2026, 2));
        assert!(parse_year_month("2026-13").is_err());
        assert!(parse_year_month("202602").is_err());
    }

    #[test]
    fn marker_lookup_is_scoped_to_the_activity() {
        let dir = tempfile::tempdir().expect("temp dir");
        let tracker = Tracker::open(&dir.path().join("tracker.db")).expect("open db");
        let user = tracker.create_user("alice").expect("user");
        let exercise = tracker
            .create_activity(user.id, "Exercise", None)
            .expect("activity");
        let reading = tracker
            .create_activity(user.id, "Reading", None)
            .expect("activity");
        let marker = tracker
            .create_activity_marker(exercise.id, "Pushups", MarkerOptions::default())
            .expect("marker");

        let found = require_marker_in_activity(&tracker, exercise.id, marker.id).expect("found");
        assert_eq!(found.id, marker.id);

        // The same marker through another activity's URL reads as missing.
        assert!(matches!(
            require_marker_in_activity(&tracker, reading.id, marker.id),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            require_marker_in_activity(&tracker, exercise.id, 999),
            Err(ApiError::NotFound(_))
        ));
    }
}
