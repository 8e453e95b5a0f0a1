use std::collections::HashSet;

use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres};

use crate::{
    cache::cache::{delete_cache_value, get_or_list, CacheKey},
    error::{Error, QueryError},
    schema::{Ingredient, Uuid},
};

pub async fn list_ingredients(
    search: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> = match search {
        Some(search) => {
            sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 || '%' ORDER BY id")
                .bind(search)
                .fetch_all(pool)
                .await
                .map_err(|e| Error::from(QueryError::from(e)))?
        }
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY id")
            .fetch_all(pool)
            .await
            .map_err(|e| Error::from(QueryError::from(e)))?,
    };

    Ok(rows)
}

/// Catalog listing backed by the redis read-through cache.
pub async fn list_ingredients_cached(
    cache: &mut MultiplexedConnection,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let pool = pool.clone();
    get_or_list(CacheKey::IngredientCatalog, cache, move || async move {
        list_ingredients(None, &pool).await
    })
    .await
}

pub async fn get_ingredient(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(row)
}

/// Every catalog id, for validating recipe payloads against.
pub async fn list_ingredient_ids(pool: &Pool<Postgres>) -> Result<HashSet<Uuid>, Error> {
    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM ingredients")
        .fetch_all(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(rows.into_iter().map(|r| r.0).collect())
}

/// Bulk import of reference data. Idempotent on the (name, unit) pair;
/// returns how many rows were actually inserted.
pub async fn import_ingredients(
    rows: &[(String, String)],
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<u64, Error> {
    let mut inserted = 0;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| Error::from(QueryError::new("Could not start transaction".to_owned())))?;

    for (name, measurement_unit) in rows {
        let result = sqlx::query(
            "
            INSERT INTO ingredients (name, measurement_unit)
            VALUES ($1, $2)
            ON CONFLICT (name, measurement_unit) DO NOTHING
        ",
        )
        .bind(name)
        .bind(measurement_unit)
        .execute(&mut *tr)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

        inserted += result.rows_affected();
    }

    tr.commit()
        .await
        .map_err(|_| Error::from(QueryError::new("Could not commit transaction".to_owned())))?;

    if inserted > 0 {
        if let Err(e) =
            delete_cache_value(CacheKey::IngredientCatalog.to_string(), cache).await
        {
            log::error!("> Failed to invalidate ingredient catalog: {e}");
        }
    }

    Ok(inserted)
}
