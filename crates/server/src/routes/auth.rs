use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

use crate::auth::{jwt, middleware::AuthUser, password};
use crate::config::Config;
use crate::db::accounts;
use crate::error::AppError;

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

fn auth_response(account: &accounts::Account, config: &Config) -> Result<AuthResponse, AppError> {
    let token = jwt::issue_token(account.id, config)
        .map_err(|e| AppError::Internal(format!("Token creation error: {e}")))?;

    Ok(AuthResponse {
        user: UserResponse {
            id: account.id,
            email: account.email.clone(),
            created_at: account.created_at.to_rfc3339(),
        },
        token,
    })
}

/// POST /api/auth/register
pub async fn register(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Config>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    req.validate()?;

    let email = req.email.trim().to_lowercase();
    if accounts::email_exists(&pool, &email).await? {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = password::hash_password(&req.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {e}")))?;

    let account = accounts::create_account(&pool, &email, &hash).await?;
    tracing::info!(user_id = account.id, "Account registered");

    Ok(Json(auth_response(&account, &config)?))
}

/// POST /api/auth/login
pub async fn login(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Config>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = req.email.trim().to_lowercase();
    let account = accounts::get_account_by_email(&pool, &email)
        .await?
        .ok_or(AppError::BadRequest("Invalid email or password".into()))?;

    let check = password::check_password(&req.password, &account.password_hash)
        .map_err(|e| AppError::Internal(format!("Password verify error: {e}")))?;

    if !check.valid {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }

    // Legacy bcrypt hashes are replaced with argon2 on successful login.
    if check.needs_rehash {
        match password::hash_password(&req.password) {
            Ok(new_hash) => {
                if let Err(e) = accounts::update_password_hash(&pool, account.id, &new_hash).await {
                    tracing::warn!(user_id = account.id, error = %e, "Password rehash failed");
                }
            }
            Err(e) => tracing::warn!(user_id = account.id, error = %e, "Password rehash failed"),
        }
    }

    Ok(Json(auth_response(&account, &config)?))
}

/// GET /api/auth/me
pub async fn me(user: AuthUser) -> Json<UserResponse> {
    Json(UserResponse {
        id: user.id,
        email: user.email,
        created_at: user.created_at.to_rfc3339(),
    })
}
