#[cfg(test)]
pub mod test_utils {
    use chrono::{DateTime, Duration, Utc};
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Pool, Sqlite};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Once;
    use uuid::Uuid;

    use crate::auth::Actor;
    use crate::database::{
        connect, create_booking, create_mentor, register_identity, run_migrations,
    };
    use crate::env::AppConfig;
    use crate::error::AppError;
    use crate::init_rocket;
    use crate::models::{BookingStatus, NewBooking, NewMentor};

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    pub fn email_for(name: &str) -> String {
        format!("{}@example.com", name)
    }

    pub fn default_start_time() -> DateTime<Utc> {
        Utc::now() + Duration::days(1)
    }

    /// A single connection keeps every query on the same in-memory database.
    pub async fn memory_pool() -> Result<Pool<Sqlite>, AppError> {
        init_test_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        run_migrations(&pool).await?;

        Ok(pool)
    }

    /// A pool over a fresh database file, with the same connection settings
    /// as the service.
    pub async fn file_pool(path: &Path) -> Result<Pool<Sqlite>, AppError> {
        init_test_logging();

        let pool = connect(&format!("sqlite://{}?mode=rwc", path.display())).await?;
        run_migrations(&pool).await?;

        Ok(pool)
    }

    fn init_test_logging() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter("debug")
                .with_test_writer()
                .try_init();
        });
    }

    #[derive(Default)]
    pub struct TestDbBuilder {
        identities: Vec<TestIdentity>,
        mentors: Vec<TestMentor>,
        bookings: Vec<TestBooking>,
        file_backed: bool,
    }

    pub struct TestIdentity {
        pub name: String,
        pub full_name: Option<String>,
    }

    pub struct TestMentor {
        pub name: String,
        pub expertise: Vec<String>,
        pub available: bool,
    }

    pub struct TestBooking {
        pub user: String,
        pub mentor: String,
        pub status: Option<BookingStatus>,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn identity(mut self, name: &str, full_name: Option<&str>) -> Self {
            self.identities.push(TestIdentity {
                name: name.to_string(),
                full_name: full_name.map(String::from),
            });
            self
        }

        /// Registers `name` as a mentor, creating the identity if needed.
        pub fn mentor(mut self, name: &str, expertise: &[&str], available: bool) -> Self {
            if !self.identities.iter().any(|i| i.name == name) {
                self = self.identity(name, None);
            }
            self.mentors.push(TestMentor {
                name: name.to_string(),
                expertise: expertise.iter().map(|s| s.to_string()).collect(),
                available,
            });
            self
        }

        pub fn booking(mut self, user: &str, mentor: &str, status: Option<BookingStatus>) -> Self {
            self.bookings.push(TestBooking {
                user: user.to_string(),
                mentor: mentor.to_string(),
                status,
            });
            self
        }

        /// Uses a temporary database file instead of `sqlite::memory:`, so
        /// several connections can work on the same data.
        pub fn file_backed(mut self) -> Self {
            self.file_backed = true;
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            let file_path = self.file_backed.then(|| {
                std::env::temp_dir().join(format!("mentor_booking_test_{}.db", Uuid::new_v4()))
            });
            let pool = match &file_path {
                Some(path) => file_pool(path).await?,
                None => memory_pool().await?,
            };

            let mut identity_id_map: HashMap<String, Uuid> = HashMap::new();
            let mut booking_ids: Vec<Uuid> = Vec::new();

            for identity in &self.identities {
                let profile = register_identity(
                    &pool,
                    &email_for(&identity.name),
                    STANDARD_PASSWORD,
                    identity.full_name.as_deref(),
                )
                .await?;

                identity_id_map.insert(identity.name.clone(), profile.id);
            }

            for mentor in &self.mentors {
                let id = identity_id_map[&mentor.name];
                let new_mentor = NewMentor {
                    id,
                    company: format!("{} Consulting", mentor.name),
                    position: "Staff Engineer".to_string(),
                    bio: format!("{} has mentored for years", mentor.name),
                    experience_years: 10,
                    hourly_rate: 120,
                    expertise: mentor.expertise.clone(),
                    available: mentor.available,
                };

                create_mentor(&pool, &Actor::Authenticated(id), &new_mentor).await?;
            }

            for booking in &self.bookings {
                let user_id = identity_id_map[&booking.user];
                let new_booking = NewBooking {
                    mentor_id: identity_id_map[&booking.mentor],
                    user_id,
                    start_time: default_start_time(),
                    duration: 60,
                    status: booking.status,
                };

                let created =
                    create_booking(&pool, &Actor::Authenticated(user_id), &new_booking).await?;
                booking_ids.push(created.id);
            }

            Ok(TestDb {
                pool,
                identity_id_map,
                booking_ids,
                file_path,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub identity_id_map: HashMap<String, Uuid>,
        pub booking_ids: Vec<Uuid>,
        file_path: Option<PathBuf>,
    }

    impl Drop for TestDb {
        fn drop(&mut self) {
            if let Some(path) = &self.file_path {
                for suffix in ["", "-wal", "-shm"] {
                    let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
                }
            }
        }
    }

    impl TestDb {
        pub fn id(&self, name: &str) -> Uuid {
            self.identity_id_map[name]
        }

        pub fn actor(&self, name: &str) -> Actor {
            Actor::Authenticated(self.id(name))
        }

        pub fn booking_id(&self, index: usize) -> Uuid {
            self.booking_ids[index]
        }

        pub async fn count(&self, table: &str) -> i64 {
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&self.pool)
                .await
                .expect("Failed to count rows")
        }
    }

    /// Alice books Bob. Carol is a bystander with no relation to the booking.
    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .identity("alice", Some("Alice Doe"))
            .identity("carol", Some("Carol Roe"))
            .mentor("bob", &["rust", "databases"], true)
            .mentor("dana", &["design"], false)
            .booking("alice", "bob", None)
            .build()
            .await
            .expect("Failed to build test database")
    }

    pub async fn setup_test_client(test_db: &TestDb) -> Client {
        let rocket = init_rocket(test_db.pool.clone(), AppConfig::default());
        Client::tracked(rocket)
            .await
            .expect("Failed to create Rocket client")
    }

    pub async fn login_client(test_db: &TestDb, name: &str) -> Client {
        let client = setup_test_client(test_db).await;

        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(
                json!({
                    "email": email_for(name),
                    "password": STANDARD_PASSWORD,
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        drop(response);

        client
    }
}
