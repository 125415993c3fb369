use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use sqlx::SqlitePool;
use tracing::Instrument;

use crate::database::get_session_by_token;
use crate::validation::{ToValidationResponse, ValidationResponse};

use super::Identity;

pub const SESSION_COOKIE: &str = "session_token";

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Identity {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        resolve_identity(request)
            .instrument(tracing::info_span!("identity_auth_guard"))
            .await
    }
}

async fn resolve_identity(request: &Request<'_>) -> Outcome<Identity, ()> {
    let token = match request.cookies().get_private(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => return Outcome::Error((Status::Unauthorized, ())),
    };

    let db = match request.rocket().state::<SqlitePool>() {
        Some(pool) => pool,
        None => {
            tracing::error!("Database pool not found in managed state");
            return Outcome::Error((Status::InternalServerError, ()));
        }
    };

    match get_session_by_token(db, &token).await {
        Ok(session) if session.is_valid() => {
            tracing::info!(identity_id = %session.identity_id, "Identity authenticated via session token");
            Outcome::Success(Identity {
                id: session.identity_id,
                session_token: token,
            })
        }
        Ok(session) => {
            tracing::warn!(identity_id = %session.identity_id, "Session token expired");
            Outcome::Error((Status::Unauthorized, ()))
        }
        Err(err) => {
            tracing::warn!(error = ?err, "Invalid session token");
            Outcome::Error((Status::Unauthorized, ()))
        }
    }
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Custom<Json<ValidationResponse>> {
    tracing::warn!("Unauthorized access attempt");
    Status::Unauthorized.to_validation_response()
}

#[catch(403)]
pub fn forbidden_api(_req: &Request) -> Custom<Json<ValidationResponse>> {
    tracing::warn!("Forbidden access attempt");
    Status::Forbidden.to_validation_response()
}

#[catch(404)]
pub fn not_found_api(_req: &Request) -> Custom<Json<ValidationResponse>> {
    Status::NotFound.to_validation_response()
}

#[catch(422)]
pub fn unprocessable_api(_req: &Request) -> Custom<Json<ValidationResponse>> {
    Status::UnprocessableEntity.to_validation_response()
}
