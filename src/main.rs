#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod database;
mod env;
mod error;
mod models;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use api::{
    api_create_booking, api_create_mentor, api_delete_account, api_get_booking, api_get_mentor,
    api_get_profile, api_list_bookings, api_list_mentors, api_list_profiles, api_login,
    api_logout, api_me, api_register, api_update_booking, api_update_mentor, api_update_profile,
    health,
};
use auth::{forbidden_api, not_found_api, unauthorized_api, unprocessable_api};
use database::{clean_expired_sessions, connect, run_migrations};
use env::AppConfig;
use error::AppError;
use rocket::{Build, Rocket, tokio};
use telemetry::{TelemetryFairing, init_tracing};
use thiserror::Error;

use sqlx::SqlitePool;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("{0}")]
    Rocket(#[from] Box<rocket::Error>),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

impl From<rocket::Error> for Error {
    fn from(value: rocket::Error) -> Self {
        Error::Rocket(Box::new(value))
    }
}

#[rocket::main]
async fn main() -> Result<(), Error> {
    if let Err(e) = env::load_environment() {
        return Err(anyhow::anyhow!("Failed to load environment: {}", e).into());
    }

    let config = AppConfig::from_env()?;
    let _telemetry = init_tracing(&config)?;

    let pool = connect(&config.database_url).await?;
    run_migrations(&pool).await?;

    spawn_session_sweeper(pool.clone(), config.session_sweep_interval_secs);

    init_rocket(pool, config).launch().await?;

    Ok(())
}

fn spawn_session_sweeper(pool: SqlitePool, interval_secs: u64) {
    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&pool).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(interval_secs)).await;
        }
    });
}

pub fn init_rocket(pool: SqlitePool, config: AppConfig) -> Rocket<Build> {
    info!("Starting mentor booking service");

    rocket::build()
        .manage(pool)
        .manage(config)
        .mount(
            "/api",
            routes![
                api_register,
                api_login,
                api_logout,
                api_delete_account,
                api_me,
                api_list_profiles,
                api_get_profile,
                api_update_profile,
                api_list_mentors,
                api_get_mentor,
                api_create_mentor,
                api_update_mentor,
                api_list_bookings,
                api_get_booking,
                api_create_booking,
                api_update_booking,
                health,
            ],
        )
        .register(
            "/api",
            catchers![unauthorized_api, forbidden_api, not_found_api, unprocessable_api],
        )
        .attach(TelemetryFairing)
}
