use sqlx::{Pool, Postgres};

use crate::{
    error::ActionError,
    schema::{Id, User, UserRole},
};

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, ActionError> {
    let row: Option<User> = sqlx::query_as("SELECT id, username, uid FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Mirrors an identity owned by the auth layer into the local users table.
pub async fn register_user(
    username: &str,
    role: UserRole,
    pool: &Pool<Postgres>,
) -> Result<User, ActionError> {
    let row: User = sqlx::query_as(
        "
        INSERT INTO users (username, uid)
        VALUES ($1, $2)
        RETURNING id, username, uid
    ",
    )
    .bind(username)
    .bind(role)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Recipes written by the user stay behind with their author cleared.
pub async fn delete_user(user_id: Id, pool: &Pool<Postgres>) -> Result<(), ActionError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ActionError::not_found("user", "User doesn't exist"));
    }

    Ok(())
}
