#[cfg(test)]
mod tests {
    use crate::{
        auth::{Actor, Session},
        database::{
            clean_expired_sessions, create_session, delete_identity, get_session_by_token,
            invalidate_session,
        },
        error::AppError,
        test::test_utils::{TestDbBuilder, memory_pool},
    };
    use chrono::{DateTime, Duration, Utc};
    use rocket::tokio;
    use sqlx::{Pool, Sqlite};
    use uuid::Uuid;

    async fn create_test_session() -> (Uuid, String, DateTime<Utc>, Pool<Sqlite>) {
        let test_db = TestDbBuilder::new()
            .identity("test_session_user", None)
            .build()
            .await
            .expect("Failed to build test database");

        let identity_id = test_db.id("test_session_user");
        let token = format!("test_token_{}", Uuid::new_v4());
        let expires_at = Utc::now() + Duration::hours(1);

        (identity_id, token, expires_at, test_db.pool.clone())
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let (identity_id, token, expires_at, pool) = create_test_session().await;

        let session_id = create_session(&pool, identity_id, &token, expires_at)
            .await
            .expect("Failed to create session");

        assert!(session_id > 0, "Session ID should be positive");

        let session = get_session_by_token(&pool, &token)
            .await
            .expect("Failed to get session");

        assert_eq!(session.identity_id, identity_id);
        assert_eq!(session.token, token);

        let expires_diff = (session.expires_at.timestamp() - expires_at.timestamp()).abs();
        assert!(
            expires_diff <= 1,
            "Expiration timestamps should match within 1 second"
        );
    }

    #[tokio::test]
    async fn test_get_nonexistent_session() {
        let pool = memory_pool().await.expect("Failed to create database");

        let result = get_session_by_token(&pool, "nonexistent_token").await;

        match result {
            Err(AppError::Authentication(msg)) => assert_eq!(msg, "Invalid session token"),
            Err(err) => panic!("Expected Authentication error, got {:?}", err),
            Ok(_) => panic!("Should return error for nonexistent token"),
        }
    }

    #[tokio::test]
    async fn test_invalidate_session() {
        let (identity_id, token, expires_at, pool) = create_test_session().await;

        create_session(&pool, identity_id, &token, expires_at)
            .await
            .expect("Failed to create session");
        assert!(get_session_by_token(&pool, &token).await.is_ok());

        invalidate_session(&pool, &token)
            .await
            .expect("Failed to invalidate session");

        let result = get_session_by_token(&pool, &token).await;
        assert!(
            result.is_err(),
            "Session should not exist after invalidation"
        );
    }

    #[tokio::test]
    async fn test_clean_expired_sessions() {
        let (identity_id, _, _, pool) = create_test_session().await;

        let expired = format!("test_token_expired_{}", Uuid::new_v4());
        let soon = format!("test_token_soon_{}", Uuid::new_v4());
        let later = format!("test_token_later_{}", Uuid::new_v4());

        create_session(&pool, identity_id, &expired, Utc::now() - Duration::hours(1))
            .await
            .expect("Failed to create expired session");
        create_session(&pool, identity_id, &soon, Utc::now() + Duration::minutes(1))
            .await
            .expect("Failed to create expiring soon session");
        create_session(&pool, identity_id, &later, Utc::now() + Duration::days(1))
            .await
            .expect("Failed to create future session");

        let cleaned_count = clean_expired_sessions(&pool)
            .await
            .expect("Failed to clean expired sessions");

        assert_eq!(
            cleaned_count, 1,
            "Should have cleaned exactly 1 expired session"
        );
        assert!(get_session_by_token(&pool, &expired).await.is_err());
        assert!(get_session_by_token(&pool, &soon).await.is_ok());
        assert!(get_session_by_token(&pool, &later).await.is_ok());
    }

    #[tokio::test]
    async fn test_session_validity() {
        let (identity_id, token, expires_at, pool) = create_test_session().await;

        let expired_token = format!("test_token_expired_{}", Uuid::new_v4());
        create_session(
            &pool,
            identity_id,
            &expired_token,
            Utc::now() - Duration::hours(1),
        )
        .await
        .expect("Failed to create expired session");

        let session = get_session_by_token(&pool, &expired_token)
            .await
            .expect("Should be able to retrieve expired session");
        assert!(!session.is_valid(), "Expired session should be invalid");

        create_session(&pool, identity_id, &token, expires_at)
            .await
            .expect("Failed to create valid session");
        let valid_session = get_session_by_token(&pool, &token)
            .await
            .expect("Should be able to retrieve valid session");
        assert!(valid_session.is_valid(), "Future session should be valid");
    }

    #[tokio::test]
    async fn test_sessions_removed_with_identity() {
        let (identity_id, token, expires_at, pool) = create_test_session().await;

        create_session(&pool, identity_id, &token, expires_at)
            .await
            .unwrap();

        delete_identity(&pool, &Actor::Service, identity_id)
            .await
            .expect("Failed to delete identity");

        assert!(get_session_by_token(&pool, &token).await.is_err());
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        let first = Session::generate_token();
        let second = Session::generate_token();

        assert_eq!(first.len(), 48);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }
}
