use sqlx::{Pool, Postgres};

use crate::{
    constants::RECIPE_COUNT_PER_PAGE,
    error::{Error, LedgerError, QueryError},
    pagination::PageContext,
    schema::{RecipeBriefRow, Uuid},
};

use super::get_recipe;

pub async fn is_in_cart(
    recipe_id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "
        SELECT recipe_id FROM cart_entries WHERE recipe_id = $1 AND user_id = $2
    ",
    )
    .bind(recipe_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(row.is_some())
}

/// Queues a recipe for shopping-list aggregation. Duplicate pairs are a
/// conflict resolved by the storage uniqueness constraint, so of two
/// concurrent calls exactly one succeeds.
pub async fn add_to_cart(
    recipe_id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    if get_recipe(recipe_id, pool).await?.is_none() {
        return Err(Error::InvalidRequest(
            "No recipe exists with specified id".to_string(),
        ));
    }

    let result = sqlx::query(
        "
        INSERT INTO cart_entries (user_id, recipe_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
    ",
    )
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(|e| QueryError::from(e).into_conflict(LedgerError::AlreadyExists.into()))?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::AlreadyExists.into());
    }

    Ok(())
}

pub async fn remove_from_cart(
    recipe_id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM cart_entries WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::NotFound.into());
    }

    Ok(())
}

pub async fn fetch_cart(
    user_id: Uuid,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeBriefRow>, Error> {
    let rows: Vec<RecipeBriefRow> = sqlx::query_as(
        "
        SELECT r.id, r.name, r.image, r.cooking_time, COUNT(*) OVER() AS count
        FROM cart_entries c
        INNER JOIN recipes r ON r.id = c.recipe_id
        WHERE c.user_id = $1
        ORDER BY c.created_at DESC
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(RECIPE_COUNT_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::from(QueryError::from(e)))?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    Ok(PageContext::from_rows(
        rows,
        total_count,
        RECIPE_COUNT_PER_PAGE,
        offset,
    ))
}
