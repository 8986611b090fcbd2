use crate::{
    api::models::users::{PromoResponse, SpendingUpdate, UserCreate, UserResponse},
    db::handlers::Users,
    errors::{Error, Result},
    types::UserId,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

/// Create or re-link an account
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    summary = "Create or re-link an account",
    description = "Create an account on first sign-in, or refresh its platform linkage. \
                   New accounts receive the configured initial free casts; existing \
                   accounts keep their financial state untouched.",
    responses(
        (status = 201, description = "Account created or refreshed", body = UserResponse),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn create_or_get_user(State(state): State<AppState>, Json(data): Json<UserCreate>) -> Result<(StatusCode, Json<UserResponse>)> {
    let request = data.into_db_request(state.config.billing.initial_free_casts);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn).create_or_get(&request).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Get an account
#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tag = "users",
    summary = "Get an account",
    params(
        ("user_id" = i64, Path, description = "Twitter numeric user id"),
    ),
    responses(
        (status = 200, description = "Account state", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn get_user(State(state): State<AppState>, Path(user_id): Path<UserId>) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn).get_by_id(user_id).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        id: user_id.to_string(),
    })?;

    Ok(Json(UserResponse::from(user)))
}

/// Update spending controls
#[utoipa::path(
    patch,
    path = "/users/{user_id}/spending",
    tag = "users",
    summary = "Update spending controls",
    description = "Set the spending approval flag and/or the spending limit. Sending \
                   `\"spending_limit\": null` removes the limit; omitting the field \
                   leaves it unchanged.",
    params(
        ("user_id" = i64, Path, description = "Twitter numeric user id"),
    ),
    responses(
        (status = 200, description = "Updated account state", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn update_spending(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(data): Json<SpendingUpdate>,
) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .update_spending(user_id, &data.into())
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
            id: user_id.to_string(),
        })?;

    Ok(Json(UserResponse::from(user)))
}

/// Claim the promotional cast
#[utoipa::path(
    post,
    path = "/users/{user_id}/promo",
    tag = "users",
    summary = "Claim the promotional cast",
    description = "Publish the promotional cast from the user's account and grant the \
                   configured free casts. At most once per account; a repeat claim \
                   reports the existing cast without publishing or granting again.",
    params(
        ("user_id" = i64, Path, description = "Twitter numeric user id"),
    ),
    responses(
        (status = 200, description = "Promo state", body = PromoResponse),
        (status = 400, description = "Account has no Farcaster signer"),
        (status = 404, description = "User not found"),
        (status = 502, description = "Farcaster publish failed"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn claim_promo(State(state): State<AppState>, Path(user_id): Path<UserId>) -> Result<Json<PromoResponse>> {
    let outcome = state.coordinator.claim_promo(user_id).await?;

    Ok(Json(PromoResponse {
        cast_hash: outcome.cast_hash,
        free_casts_granted: outcome.free_casts_granted,
        already_claimed: outcome.already_claimed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_app;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_user_grants_initial_free_casts(pool: PgPool) {
        let app = create_test_app(pool).await;

        let response = app
            .post("/api/v1/users")
            .json(&json!({
                "id": 1001,
                "fid": 42,
                "twitter_handle": "alice",
                "farcaster_username": "alice.eth",
                "signer_uuid": "signer-1",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let user: UserResponse = response.json();
        assert_eq!(user.id, 1001);
        assert_eq!(user.free_casts_remaining, 3);
        assert!(!user.spending_approved);
        assert!(!user.promo_claimed);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_user_is_idempotent_for_financial_state(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let body = json!({"id": 1001, "fid": 42, "twitter_handle": "alice"});

        app.post("/api/v1/users").json(&body).await.assert_status(StatusCode::CREATED);
        sqlx::query("UPDATE users SET free_casts_remaining = 1 WHERE id = 1001")
            .execute(&pool)
            .await
            .unwrap();

        let response = app.post("/api/v1/users").json(&body).await;
        response.assert_status(StatusCode::CREATED);
        let user: UserResponse = response.json();
        assert_eq!(user.free_casts_remaining, 1, "re-link must not re-grant");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_missing_user_is_not_found(pool: PgPool) {
        let app = create_test_app(pool).await;
        app.get("/api/v1/users/9999").await.assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_spending_sets_and_clears_limit(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        crate::test_utils::create_test_user(&pool).await;

        let response = app
            .patch("/api/v1/users/777/spending")
            .json(&json!({"spending_approved": true, "spending_limit": "5.00"}))
            .await;
        response.assert_status_ok();
        let user: UserResponse = response.json();
        assert!(user.spending_approved);
        assert!(user.spending_limit.is_some());

        let response = app.patch("/api/v1/users/777/spending").json(&json!({"spending_limit": null})).await;
        response.assert_status_ok();
        let user: UserResponse = response.json();
        assert!(user.spending_approved, "approval flag untouched");
        assert!(user.spending_limit.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_promo_claims_once(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        crate::test_utils::create_test_user(&pool).await;

        let first: PromoResponse = app.post("/api/v1/users/777/promo").await.json();
        assert!(!first.already_claimed);
        assert_eq!(first.free_casts_granted, 5);

        let second: PromoResponse = app.post("/api/v1/users/777/promo").await.json();
        assert!(second.already_claimed);
        assert_eq!(second.cast_hash, first.cast_hash);
    }
}
