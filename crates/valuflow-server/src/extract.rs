//! Request extractors.

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use std::future::{ready, Ready};

use valuflow::Role;

use crate::error::ErrorResponse;

pub const ACTOR_ROLE_HEADER: &str = "X-Actor-Role";

/// The role asserted by the caller for this request.
///
/// Read from the `X-Actor-Role` header. The claim is not verified against
/// any credential; this is the seam where a real auth layer would plug in.
#[derive(Debug, Clone, Copy)]
pub struct ActorRole(pub Role);

impl FromRequest for ActorRole {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let header = req
            .headers()
            .get(ACTOR_ROLE_HEADER)
            .and_then(|v| v.to_str().ok());

        let result = match header {
            None => Err(actix_web::error::ErrorUnauthorized(
                serde_json::to_string(&ErrorResponse::new(
                    "missing_role",
                    format!("The {} header is required", ACTOR_ROLE_HEADER),
                ))
                .unwrap_or_default(),
            )),
            Some(raw) => raw.parse::<Role>().map(ActorRole).map_err(|e| {
                actix_web::error::ErrorBadRequest(
                    serde_json::to_string(&ErrorResponse::new("invalid_role", e))
                        .unwrap_or_default(),
                )
            }),
        };
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn test_extracts_valid_role() {
        let req = TestRequest::default()
            .insert_header((ACTOR_ROLE_HEADER, "qa_officer"))
            .to_http_request();
        let actor = ActorRole::extract(&req).await.unwrap();
        assert_eq!(actor.0, Role::QaOfficer);
    }

    #[actix_web::test]
    async fn test_missing_header_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        let err = ActorRole::extract(&req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code().as_u16(), 401);
    }

    #[actix_web::test]
    async fn test_unknown_role_is_bad_request() {
        let req = TestRequest::default()
            .insert_header((ACTOR_ROLE_HEADER, "superuser"))
            .to_http_request();
        let err = ActorRole::extract(&req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code().as_u16(), 400);
    }
}
