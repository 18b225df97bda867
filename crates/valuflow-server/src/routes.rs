//! HTTP route registration.

use actix_web::web;

use crate::handlers::{health, jobs, notifications};

/// Registers all HTTP routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health)).service(
        web::scope("/v1")
            .route("/jobs", web::get().to(jobs::list_jobs))
            .route("/jobs", web::post().to(jobs::create_job))
            .route("/jobs/stats", web::get().to(jobs::job_stats))
            .route("/jobs/{id}", web::get().to(jobs::get_job))
            .route("/jobs/{id}", web::put().to(jobs::update_job))
            .route("/jobs/{id}", web::delete().to(jobs::delete_job))
            .route("/jobs/{id}/transition", web::post().to(jobs::transition_job))
            .route(
                "/notifications",
                web::get().to(notifications::list_notifications),
            )
            .route(
                "/notifications",
                web::post().to(notifications::send_notification),
            )
            .route(
                "/notifications/{id}",
                web::put().to(notifications::mark_notification_read),
            )
            .route(
                "/notifications/{id}",
                web::delete().to(notifications::delete_notification),
            ),
    );
}
