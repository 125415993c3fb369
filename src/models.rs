use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::auth::{ColumnValue, PolicyRow};
use crate::error::AppError;

#[derive(Debug, Serialize, Clone, PartialEq, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PolicyRow for Profile {
    fn column(&self, name: &str) -> Option<ColumnValue> {
        match name {
            "id" => Some(ColumnValue::Id(self.id)),
            _ => None,
        }
    }
}

/// `None` keeps the current value. `Some(None)` clears it.
#[derive(Debug, Default, Clone)]
pub struct ProfileChanges {
    pub full_name: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
}

impl ProfileChanges {
    pub fn apply_to(&self, profile: &Profile) -> Profile {
        Profile {
            full_name: self
                .full_name
                .clone()
                .unwrap_or_else(|| profile.full_name.clone()),
            avatar_url: self
                .avatar_url
                .clone()
                .unwrap_or_else(|| profile.avatar_url.clone()),
            ..profile.clone()
        }
    }
}

/// Deserializes a present field, `null` included, as `Some`. Paired with
/// `#[serde(default)]` so an absent field stays `None`.
pub fn deserialize_present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Mentor {
    pub id: Uuid,
    pub company: String,
    pub position: String,
    pub bio: String,
    pub experience_years: i64,
    pub hourly_rate: i64,
    pub expertise: Vec<String>,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbMentor {
    pub id: Uuid,
    pub company: String,
    pub position: String,
    pub bio: String,
    pub experience_years: i64,
    pub hourly_rate: i64,
    pub expertise: Json<Vec<String>>,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbMentor> for Mentor {
    fn from(db: DbMentor) -> Self {
        Self {
            id: db.id,
            company: db.company,
            position: db.position,
            bio: db.bio,
            experience_years: db.experience_years,
            hourly_rate: db.hourly_rate,
            expertise: db.expertise.0,
            available: db.available,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl PolicyRow for Mentor {
    fn column(&self, name: &str) -> Option<ColumnValue> {
        match name {
            "id" => Some(ColumnValue::Id(self.id)),
            "available" => Some(ColumnValue::Flag(self.available)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMentor {
    pub id: Uuid,
    pub company: String,
    pub position: String,
    pub bio: String,
    pub experience_years: i64,
    pub hourly_rate: i64,
    #[serde(default)]
    pub expertise: Vec<String>,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl PolicyRow for NewMentor {
    fn column(&self, name: &str) -> Option<ColumnValue> {
        match name {
            "id" => Some(ColumnValue::Id(self.id)),
            "available" => Some(ColumnValue::Flag(self.available)),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct MentorChanges {
    pub company: Option<String>,
    pub position: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<i64>,
    pub hourly_rate: Option<i64>,
    pub expertise: Option<Vec<String>>,
    pub available: Option<bool>,
}

impl MentorChanges {
    pub fn apply_to(&self, mentor: &Mentor) -> Mentor {
        let mut next = mentor.clone();
        if let Some(company) = &self.company {
            next.company = company.clone();
        }
        if let Some(position) = &self.position {
            next.position = position.clone();
        }
        if let Some(bio) = &self.bio {
            next.bio = bio.clone();
        }
        if let Some(years) = self.experience_years {
            next.experience_years = years;
        }
        if let Some(rate) = self.hourly_rate {
            next.hourly_rate = rate;
        }
        if let Some(expertise) = &self.expertise {
            next.expertise = expertise.clone();
        }
        if let Some(available) = self.available {
            next.available = available;
        }
        next
    }
}

/// Lifecycle state of a booking. Every transition between states is allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown booking status: {}", s)))
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, sqlx::FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub user_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PolicyRow for Booking {
    fn column(&self, name: &str) -> Option<ColumnValue> {
        match name {
            "id" => Some(ColumnValue::Id(self.id)),
            "mentor_id" => Some(ColumnValue::Id(self.mentor_id)),
            "user_id" => Some(ColumnValue::Id(self.user_id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub mentor_id: Uuid,
    pub user_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration: i64,
    /// Left to the column default when absent.
    pub status: Option<BookingStatus>,
}

impl PolicyRow for NewBooking {
    fn column(&self, name: &str) -> Option<ColumnValue> {
        match name {
            "mentor_id" => Some(ColumnValue::Id(self.mentor_id)),
            "user_id" => Some(ColumnValue::Id(self.user_id)),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct BookingChanges {
    pub mentor_id: Option<Uuid>,
    pub start_time: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
    pub status: Option<BookingStatus>,
}

impl BookingChanges {
    pub fn apply_to(&self, booking: &Booking) -> Booking {
        Booking {
            mentor_id: self.mentor_id.unwrap_or(booking.mentor_id),
            start_time: self.start_time.unwrap_or(booking.start_time),
            duration: self.duration.unwrap_or(booking.duration),
            status: self.status.unwrap_or(booking.status),
            ..booking.clone()
        }
    }
}
