use chrono::{DateTime, Duration, Utc};
use rocket::State;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{Actor, Identity, SESSION_COOKIE, Session};
use crate::database::{
    authenticate_identity, create_booking, create_mentor, create_session, delete_identity,
    get_booking, get_mentor, get_profile, invalidate_session, list_bookings, list_mentors,
    list_profiles, register_identity, update_booking, update_mentor, update_profile,
};
use crate::env::AppConfig;
use crate::error::AppError;
use crate::models::{
    Booking, BookingChanges, BookingStatus, Mentor, MentorChanges, NewBooking, NewMentor, Profile,
    ProfileChanges, deserialize_present,
};
use crate::validation::{ApiResult, AppErrorExt, JsonValidateExt};

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Must be a valid email address"))]
    email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    password: String,
    #[validate(length(max = 200, message = "Name is too long"))]
    full_name: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub profile: Option<Profile>,
    pub error: Option<String>,
}

/// Omitted fields are left alone; `null` clears them.
#[derive(Deserialize, Validate)]
pub struct ProfileUpdateRequest {
    #[serde(default, deserialize_with = "deserialize_present")]
    #[validate(length(max = 200, message = "Name is too long"))]
    full_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    #[validate(url(message = "Avatar must be a valid URL"))]
    avatar_url: Option<Option<String>>,
}

#[derive(Deserialize, Validate)]
pub struct MentorRequest {
    #[validate(length(min = 1, message = "Company is required"))]
    company: String,
    #[validate(length(min = 1, message = "Position is required"))]
    position: String,
    bio: String,
    experience_years: i64,
    hourly_rate: i64,
    #[serde(default)]
    expertise: Vec<String>,
    available: Option<bool>,
}

#[derive(Deserialize, Validate)]
pub struct MentorUpdateRequest {
    company: Option<String>,
    position: Option<String>,
    bio: Option<String>,
    experience_years: Option<i64>,
    hourly_rate: Option<i64>,
    expertise: Option<Vec<String>>,
    available: Option<bool>,
}

#[derive(Deserialize, Validate)]
pub struct BookingRequest {
    mentor_id: Uuid,
    /// Defaults to the caller.
    user_id: Option<Uuid>,
    start_time: DateTime<Utc>,
    duration: i64,
    status: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct BookingUpdateRequest {
    mentor_id: Option<Uuid>,
    start_time: Option<DateTime<Utc>>,
    duration: Option<i64>,
    status: Option<String>,
}

fn parse_status(status: Option<&str>) -> Result<Option<BookingStatus>, AppError> {
    status.map(str::parse::<BookingStatus>).transpose()
}

#[get("/health")]
pub fn health() -> Status {
    Status::Ok
}

#[post("/auth/register", data = "<request>")]
pub async fn api_register(
    request: Json<RegisterRequest>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<(Status, Json<Profile>)> {
    let validated = request.validate_custom()?;

    let profile = register_identity(
        db,
        &validated.email,
        &validated.password,
        validated.full_name.as_deref(),
    )
    .await
    .validate_custom()?;

    Ok((Status::Created, Json(profile)))
}

#[post("/auth/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> ApiResult<Json<LoginResponse>> {
    let validated = login.validate_custom()?;

    let identity_id = match authenticate_identity(db, &validated.email, &validated.password)
        .await
        .validate_custom()?
    {
        Some(id) => id,
        None => {
            return Ok(Json(LoginResponse {
                success: false,
                profile: None,
                error: Some("Invalid email or password".to_string()),
            }));
        }
    };

    let token = Session::generate_token();
    let expires_at = Utc::now() + Duration::hours(config.session_ttl_hours);

    create_session(db, identity_id, &token, expires_at)
        .await
        .validate_custom()?;

    cookies.add_private(
        Cookie::build((SESSION_COOKIE, token))
            .same_site(SameSite::Lax)
            .http_only(true)
            .max_age(rocket::time::Duration::hours(config.session_ttl_hours)),
    );

    let actor = Actor::Authenticated(identity_id);
    let profile = get_profile(db, &actor, identity_id).await.validate_custom()?;

    Ok(Json(LoginResponse {
        success: true,
        profile: Some(profile),
        error: None,
    }))
}

#[post("/auth/logout")]
pub async fn api_logout(
    identity: Identity,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Status> {
    invalidate_session(db, &identity.session_token).await?;
    cookies.remove_private(Cookie::build(SESSION_COOKIE));
    Ok(Status::Ok)
}

#[delete("/auth/account")]
pub async fn api_delete_account(
    identity: Identity,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Status> {
    delete_identity(db, &identity.actor(), identity.id).await?;
    cookies.remove_private(Cookie::build(SESSION_COOKIE));
    Ok(Status::NoContent)
}

#[get("/me")]
pub async fn api_me(identity: Identity, db: &State<Pool<Sqlite>>) -> ApiResult<Json<Profile>> {
    let profile = get_profile(db, &identity.actor(), identity.id)
        .await
        .validate_custom()?;
    Ok(Json(profile))
}

#[get("/profiles")]
pub async fn api_list_profiles(
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Profile>>> {
    let profiles = list_profiles(db, &identity.actor()).await.validate_custom()?;
    Ok(Json(profiles))
}

#[get("/profiles/<id>")]
pub async fn api_get_profile(
    id: Uuid,
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Profile>> {
    let profile = get_profile(db, &identity.actor(), id).await.validate_custom()?;
    Ok(Json(profile))
}

#[put("/profiles/<id>", data = "<request>")]
pub async fn api_update_profile(
    id: Uuid,
    request: Json<ProfileUpdateRequest>,
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Profile>> {
    let validated = request.validate_custom()?;

    let changes = ProfileChanges {
        full_name: validated.full_name,
        avatar_url: validated.avatar_url,
    };

    let profile = update_profile(db, &identity.actor(), id, &changes)
        .await
        .validate_custom()?;
    Ok(Json(profile))
}

#[get("/mentors?<expertise>")]
pub async fn api_list_mentors(
    expertise: Option<&str>,
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Mentor>>> {
    let mentors = list_mentors(db, &identity.actor(), expertise)
        .await
        .validate_custom()?;
    Ok(Json(mentors))
}

#[get("/mentors/<id>")]
pub async fn api_get_mentor(
    id: Uuid,
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Mentor>> {
    let mentor = get_mentor(db, &identity.actor(), id).await.validate_custom()?;
    Ok(Json(mentor))
}

/// Registers the caller as a mentor.
#[post("/mentors", data = "<request>")]
pub async fn api_create_mentor(
    request: Json<MentorRequest>,
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<(Status, Json<Mentor>)> {
    let validated = request.validate_custom()?;

    let new_mentor = NewMentor {
        id: identity.id,
        company: validated.company,
        position: validated.position,
        bio: validated.bio,
        experience_years: validated.experience_years,
        hourly_rate: validated.hourly_rate,
        expertise: validated.expertise,
        available: validated.available.unwrap_or(true),
    };

    let mentor = create_mentor(db, &identity.actor(), &new_mentor)
        .await
        .validate_custom()?;
    Ok((Status::Created, Json(mentor)))
}

#[put("/mentors/<id>", data = "<request>")]
pub async fn api_update_mentor(
    id: Uuid,
    request: Json<MentorUpdateRequest>,
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Mentor>> {
    let validated = request.validate_custom()?;

    let changes = MentorChanges {
        company: validated.company,
        position: validated.position,
        bio: validated.bio,
        experience_years: validated.experience_years,
        hourly_rate: validated.hourly_rate,
        expertise: validated.expertise,
        available: validated.available,
    };

    let mentor = update_mentor(db, &identity.actor(), id, &changes)
        .await
        .validate_custom()?;
    Ok(Json(mentor))
}

#[get("/bookings?<status>")]
pub async fn api_list_bookings(
    status: Option<&str>,
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Booking>>> {
    let status = parse_status(status).validate_custom()?;
    let bookings = list_bookings(db, &identity.actor(), status)
        .await
        .validate_custom()?;
    Ok(Json(bookings))
}

#[get("/bookings/<id>")]
pub async fn api_get_booking(
    id: Uuid,
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Booking>> {
    let booking = get_booking(db, &identity.actor(), id).await.validate_custom()?;
    Ok(Json(booking))
}

#[post("/bookings", data = "<request>")]
pub async fn api_create_booking(
    request: Json<BookingRequest>,
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<(Status, Json<Booking>)> {
    let validated = request.validate_custom()?;

    let new_booking = NewBooking {
        mentor_id: validated.mentor_id,
        user_id: validated.user_id.unwrap_or(identity.id),
        start_time: validated.start_time,
        duration: validated.duration,
        status: parse_status(validated.status.as_deref()).validate_custom()?,
    };

    let booking = create_booking(db, &identity.actor(), &new_booking)
        .await
        .validate_custom()?;
    Ok((Status::Created, Json(booking)))
}

#[put("/bookings/<id>", data = "<request>")]
pub async fn api_update_booking(
    id: Uuid,
    request: Json<BookingUpdateRequest>,
    identity: Identity,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Booking>> {
    let validated = request.validate_custom()?;

    let changes = BookingChanges {
        mentor_id: validated.mentor_id,
        start_time: validated.start_time,
        duration: validated.duration,
        status: parse_status(validated.status.as_deref()).validate_custom()?,
    };

    let booking = update_booking(db, &identity.actor(), id, &changes)
        .await
        .validate_custom()?;
    Ok(Json(booking))
}
