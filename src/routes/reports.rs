use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::UserId;
use crate::models::{AccountRole, Report, ReportTargetKind, ReportWithTarget};
use crate::services::moderation_service::ModerationService;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub target_kind: ReportTargetKind,
    pub target_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessReportRequest {
    pub accepted: bool,
    pub details: Option<String>,
}

async fn require_admin(db: &Pool<Postgres>, account_id: Uuid) -> Result<(), AppError> {
    let role: AccountRole = sqlx::query_scalar("SELECT role FROM accounts WHERE id = $1")
        .bind(account_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::Forbidden)?;
    if role != AccountRole::Admin {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub async fn create_report(
    user: UserId,
    state: web::Data<AppState>,
    body: web::Json<CreateReportRequest>,
) -> Result<web::Json<Report>, AppError> {
    let report = ModerationService::create_report(
        &state.db,
        user.0,
        body.target_kind,
        body.target_id,
        &body.reason,
    )
    .await?;
    Ok(web::Json(report))
}

pub async fn list_reports(
    user: UserId,
    state: web::Data<AppState>,
    query: web::Query<Pagination>,
) -> Result<web::Json<Vec<ReportWithTarget>>, AppError> {
    require_admin(&state.db, user.0).await?;

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);
    let reports = ModerationService::list_reports(&state.db, limit, offset).await?;
    Ok(web::Json(reports))
}

pub async fn process_report(
    user: UserId,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ProcessReportRequest>,
) -> Result<HttpResponse, AppError> {
    require_admin(&state.db, user.0).await?;

    ModerationService::process_report(
        &state.db,
        &state.redis,
        state.config.status_cache_ttl_secs,
        user.0,
        path.into_inner(),
        body.accepted,
        body.details.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "report processed" })))
}
