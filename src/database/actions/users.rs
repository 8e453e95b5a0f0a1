use sqlx::{Pool, Postgres};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
    },
    error::{Error, QueryError},
    schema::{User, Uuid},
};

pub async fn get_user(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(row)
}

/// Creates a user; the stored password is the argon2 hash.
pub async fn register_user(
    email: &str,
    username: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<Uuid, Error> {
    let password =
        hash_password(password).map_err(|e| Error::Database(format!("password hash: {e}")))?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING id
    ",
    )
    .bind(email)
    .bind(username)
    .bind(first_name)
    .bind(last_name)
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::from(QueryError::from(e)))?;

    match row {
        Some(row) => Ok(row.0),
        None => Err(Error::InvalidRequest(
            "User with this email or username already exists".to_string(),
        )),
    }
}

pub async fn login_user(
    email: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let user = get_user(pool, email)
        .await?
        .ok_or_else(|| Error::InvalidRequest("Invalid credentials".to_string()))?;

    let authenticated = verify_password(password, &user.password)
        .map_err(|_| Error::InvalidRequest("Invalid credentials".to_string()))?;
    if !authenticated {
        return Err(Error::InvalidRequest("Invalid credentials".to_string()));
    }

    Ok(generate_jwt_session(&user))
}

/// Changes a user's password. The new password must differ from the
/// current one, and the current one must verify.
pub async fn set_password(
    user_id: Uuid,
    current_password: &str,
    new_password: &str,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    if current_password == new_password {
        return Err(Error::InvalidRequest(
            "New password must differ from the current one".to_string(),
        ));
    }

    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| Error::InvalidRequest("No user exists with specified id".to_string()))?;

    let verified = verify_password(current_password, &user.password)
        .map_err(|_| Error::InvalidRequest("Invalid current password".to_string()))?;
    if !verified {
        return Err(Error::InvalidRequest(
            "Invalid current password".to_string(),
        ));
    }

    let password =
        hash_password(new_password).map_err(|e| Error::Database(format!("password hash: {e}")))?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(())
}
