use sqlx::{Pool, Postgres};

use crate::{
    constants::SUBSCRIPTION_COUNT_PER_PAGE,
    error::{Error, LedgerError, QueryError},
    pagination::PageContext,
    schema::{RecipeBrief, SubscribedAuthorRow, SubscriptionView, Uuid},
};

use super::get_user_by_id;

pub async fn is_subscribed(
    user_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "
        SELECT author_id FROM subscriptions WHERE user_id = $1 AND author_id = $2
    ",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(row.is_some())
}

/// Subscribes `user_id` to `author_id`. The duplicate check rides on the
/// storage uniqueness constraint, so concurrent calls resolve to exactly
/// one success.
pub async fn subscribe(
    user_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    if user_id == author_id {
        return Err(LedgerError::SelfReferenceNotAllowed.into());
    }

    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(Error::InvalidRequest(
            "No user exists with specified id".to_string(),
        ));
    }

    let result = sqlx::query(
        "
        INSERT INTO subscriptions (user_id, author_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
    ",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(|e| QueryError::from(e).into_conflict(LedgerError::AlreadyExists.into()))?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::AlreadyExists.into());
    }

    Ok(())
}

pub async fn unsubscribe(
    user_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(Error::InvalidRequest(
            "No user exists with specified id".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::NotFound.into());
    }

    Ok(())
}

/// Authors the user follows, newest subscription first, each with a brief
/// recipe listing. `recipes_limit` truncates the per-author recipes;
/// `None` returns them all.
pub async fn fetch_subscriptions(
    user_id: Uuid,
    offset: i64,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<SubscriptionView>, Error> {
    let authors: Vec<SubscribedAuthorRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY s.created_at DESC
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(SUBSCRIPTION_COUNT_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::from(QueryError::from(e)))?;

    let total_count = authors.first().map(|a| a.count).unwrap_or(0);

    let mut views = Vec::with_capacity(authors.len());
    for author in authors {
        let recipes: Vec<RecipeBrief> = sqlx::query_as(
            "
            SELECT id, name, image, cooking_time FROM recipes
            WHERE author_id = $1
            ORDER BY created_at DESC
            LIMIT $2
        ",
        )
        .bind(author.id)
        .bind(recipes_limit)
        .fetch_all(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

        let recipes_count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
                .bind(author.id)
                .fetch_one(pool)
                .await
                .map_err(|e| Error::from(QueryError::from(e)))?;

        views.push(SubscriptionView {
            id: author.id,
            email: author.email,
            username: author.username,
            first_name: author.first_name,
            last_name: author.last_name,
            is_subscribed: true,
            recipes,
            recipes_count: recipes_count.0,
        });
    }

    Ok(PageContext::from_rows(
        views,
        total_count,
        SUBSCRIPTION_COUNT_PER_PAGE,
        offset,
    ))
}
