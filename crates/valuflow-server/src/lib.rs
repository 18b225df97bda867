pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;

pub use config::ServerConfig;
pub use error::{ApiError, ErrorResponse};
pub use extract::{ActorRole, ACTOR_ROLE_HEADER};
