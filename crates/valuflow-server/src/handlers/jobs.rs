//! Job handlers.
//!
//! Generic updates and status transitions are separate paths: a `status`
//! member in a PUT body is routed through the workflow guard, never
//! written directly.

use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use serde::Deserialize;

use valuflow::{JobDraft, JobPatch, JobQueryParams, JobStatus, JobStore};

use crate::error::ApiError;
use crate::extract::ActorRole;

/// GET /v1/jobs
pub async fn list_jobs(
    store: web::Data<JobStore>,
    query: web::Query<JobQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let response = store.query(&query)?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /v1/jobs
pub async fn create_job(
    store: web::Data<JobStore>,
    body: web::Json<JobDraft>,
) -> Result<HttpResponse, ApiError> {
    let job = store.create(&body)?;
    Ok(HttpResponse::Created().json(job))
}

/// GET /v1/jobs/stats
pub async fn job_stats(store: web::Data<JobStore>) -> Result<HttpResponse, ApiError> {
    let counts = store.status_counts()?;
    Ok(HttpResponse::Ok().json(counts))
}

/// GET /v1/jobs/{id}
pub async fn get_job(
    store: web::Data<JobStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let job = store.get(&path)?;
    Ok(HttpResponse::Ok().json(job))
}

/// Body of a PUT /v1/jobs/{id} request. Lifecycle members are split off
/// from the generic patch.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    pub status: Option<JobStatus>,
    pub notes: Option<String>,
    pub expected_version: Option<i64>,
    #[serde(flatten)]
    pub patch: JobPatch,
}

/// PUT /v1/jobs/{id}
///
/// A `status` member goes through the transition guard (and requires the
/// `X-Actor-Role` header); remaining members are merged as a plain patch.
pub async fn update_job(
    req: HttpRequest,
    store: web::Data<JobStore>,
    path: web::Path<String>,
    body: web::Json<UpdateJobRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let id = path.into_inner();
    let UpdateJobRequest {
        status,
        notes,
        expected_version,
        patch,
    } = body.into_inner();

    let job = match status {
        Some(target) => {
            let actor = ActorRole::extract(&req).await?;
            // Remaining fields ride along in the same versioned write, so a
            // rejected patch never leaves a half-applied request behind.
            store
                .transition_with_patch(
                    &id,
                    actor.0,
                    target,
                    notes.as_deref(),
                    &patch,
                    expected_version,
                )
                .map_err(ApiError)?
        }
        None => store.update(&id, &patch, expected_version).map_err(ApiError)?,
    };

    Ok(HttpResponse::Ok().json(job))
}

/// Body of a POST /v1/jobs/{id}/transition request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub target_status: JobStatus,
    pub notes: Option<String>,
    pub expected_version: Option<i64>,
}

/// POST /v1/jobs/{id}/transition
pub async fn transition_job(
    store: web::Data<JobStore>,
    path: web::Path<String>,
    actor: ActorRole,
    body: web::Json<TransitionRequest>,
) -> Result<HttpResponse, ApiError> {
    let job = store.transition(
        &path,
        actor.0,
        body.target_status,
        body.notes.as_deref(),
        body.expected_version,
    )?;
    Ok(HttpResponse::Ok().json(job))
}

/// DELETE /v1/jobs/{id}
pub async fn delete_job(
    store: web::Data<JobStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    store.delete(&path)?;
    Ok(HttpResponse::NoContent().finish())
}
