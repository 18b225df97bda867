//! Notification handlers — per-recipient advisory inboxes.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use valuflow::{NewNotification, NotificationStore};

use crate::error::ApiError;

/// Recipient scoping for inbox operations.
#[derive(Debug, Deserialize)]
pub struct RecipientQuery {
    pub recipient: String,
}

/// GET /v1/notifications?recipient=...
pub async fn list_notifications(
    store: web::Data<NotificationStore>,
    query: web::Query<RecipientQuery>,
) -> Result<HttpResponse, ApiError> {
    let notifications = store.list(&query.recipient)?;
    Ok(HttpResponse::Ok().json(notifications))
}

/// POST /v1/notifications
pub async fn send_notification(
    store: web::Data<NotificationStore>,
    body: web::Json<NewNotification>,
) -> Result<HttpResponse, ApiError> {
    let notification = store.send(&body)?;
    Ok(HttpResponse::Created().json(notification))
}

/// PUT /v1/notifications/{id}?recipient=... — marks the notification read.
pub async fn mark_notification_read(
    store: web::Data<NotificationStore>,
    path: web::Path<String>,
    query: web::Query<RecipientQuery>,
) -> Result<HttpResponse, ApiError> {
    let notification = store.mark_read(&query.recipient, &path)?;
    Ok(HttpResponse::Ok().json(notification))
}

/// DELETE /v1/notifications/{id}?recipient=...
pub async fn delete_notification(
    store: web::Data<NotificationStore>,
    path: web::Path<String>,
    query: web::Query<RecipientQuery>,
) -> Result<HttpResponse, ApiError> {
    store.delete(&query.recipient, &path)?;
    Ok(HttpResponse::NoContent().finish())
}
