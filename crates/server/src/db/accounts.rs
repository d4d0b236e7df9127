use sqlx::PgPool;

use crate::error::AppError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub async fn create_account(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<Account, AppError> {
    let account = sqlx::query_as::<_, Account>(
        r#"INSERT INTO accounts (email, password_hash)
           VALUES ($1, $2)
           RETURNING id, email, password_hash, created_at"#,
    )
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        // A concurrent registration took the email after the existence check.
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("Email already registered".into())
        }
        other => AppError::Sqlx(other),
    })?;

    Ok(account)
}

pub async fn get_account_by_email(pool: &PgPool, email: &str) -> Result<Option<Account>, AppError> {
    let account = sqlx::query_as::<_, Account>(
        "SELECT id, email, password_hash, created_at FROM accounts WHERE LOWER(email) = LOWER($1)",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(account)
}

pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, AppError> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE LOWER(email) = LOWER($1))",
    )
    .bind(email)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

pub async fn update_password_hash(pool: &PgPool, id: i64, hash: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE accounts SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(hash)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
