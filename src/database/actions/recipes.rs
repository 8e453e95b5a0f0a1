use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    constants::RECIPE_COUNT_PER_PAGE,
    error::{Error, QueryError, ValidationError},
    jwt::SessionData,
    pagination::PageContext,
    schema::{
        AuthorView, IngredientAmountRow, Recipe, RecipeBrief, RecipeDetail, RecipeRow, RecipeView,
        RecipeViewMode, Uuid,
    },
    validate::{validate_create, validate_update, RecipeDraft},
};

use super::{get_tag, get_user_by_id, is_in_cart, is_subscribed, list_ingredient_ids};

pub async fn fetch_recipes(
    author: Option<Uuid>,
    tag_slug: Option<&str>,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, Error> {
    let rows: Vec<RecipeRow> = match (author, tag_slug) {
        (Some(author), Some(slug)) => {
            sqlx::query_as(
                "
                SELECT r.*, COUNT(*) OVER() AS count FROM recipes r
                WHERE r.author_id = $1
                AND EXISTS (
                    SELECT 1 FROM recipe_tags rt
                    INNER JOIN tags t ON t.id = rt.tag_id
                    WHERE rt.recipe_id = r.id AND t.slug = $2
                )
                ORDER BY r.created_at DESC LIMIT $3 OFFSET $4
            ",
            )
            .bind(author)
            .bind(slug)
            .bind(RECIPE_COUNT_PER_PAGE)
            .bind(offset)
            .fetch_all(pool)
            .await
            .map_err(|e| Error::from(QueryError::from(e)))?
        }
        (Some(author), None) => {
            sqlx::query_as(
                "
                SELECT r.*, COUNT(*) OVER() AS count FROM recipes r
                WHERE r.author_id = $1
                ORDER BY r.created_at DESC LIMIT $2 OFFSET $3
            ",
            )
            .bind(author)
            .bind(RECIPE_COUNT_PER_PAGE)
            .bind(offset)
            .fetch_all(pool)
            .await
            .map_err(|e| Error::from(QueryError::from(e)))?
        }
        (None, Some(slug)) => {
            sqlx::query_as(
                "
                SELECT r.*, COUNT(*) OVER() AS count FROM recipes r
                WHERE EXISTS (
                    SELECT 1 FROM recipe_tags rt
                    INNER JOIN tags t ON t.id = rt.tag_id
                    WHERE rt.recipe_id = r.id AND t.slug = $1
                )
                ORDER BY r.created_at DESC LIMIT $2 OFFSET $3
            ",
            )
            .bind(slug)
            .bind(RECIPE_COUNT_PER_PAGE)
            .bind(offset)
            .fetch_all(pool)
            .await
            .map_err(|e| Error::from(QueryError::from(e)))?
        }
        (None, None) => {
            sqlx::query_as(
                "
                SELECT r.*, COUNT(*) OVER() AS count FROM recipes r
                ORDER BY r.created_at DESC LIMIT $1 OFFSET $2
            ",
            )
            .bind(RECIPE_COUNT_PER_PAGE)
            .bind(offset)
            .fetch_all(pool)
            .await
            .map_err(|e| Error::from(QueryError::from(e)))?
        }
    };

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    let page = PageContext::from_rows(rows, total_count, RECIPE_COUNT_PER_PAGE, offset);
    Ok(page)
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(row)
}

/// Resolves a recipe for mutation: the acting user must be its author,
/// unless they hold the manage-all permission.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    let recipe = get_recipe(id, pool).await?;
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match recipe {
        Some(recipe) => match session.authenticate(ActionType::ManageAllRecipes) {
            Ok(_) => Ok(recipe),
            Err(_) => {
                if recipe.author_id != session.user_id {
                    Err(Error::Unauthorized)
                } else {
                    Ok(recipe)
                }
            }
        },
        None => Err(Error::InvalidRequest(
            "No recipe exists with specified id".to_string(),
        )),
    }
}

pub async fn list_recipe_ingredients(
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<IngredientAmountRow>, Error> {
    let rows: Vec<IngredientAmountRow> = sqlx::query_as(
        "
        SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ia.amount AS amount
        FROM ingredient_amounts ia
        INNER JOIN ingredients i ON i.id = ia.ingredient_id
        WHERE ia.recipe_id = $1
        ORDER BY ia.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(rows)
}

pub async fn is_favorite(
    recipe_id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "
        SELECT recipe_id FROM favorites WHERE recipe_id = $1 AND user_id = $2
    ",
    )
    .bind(recipe_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(result.is_some())
}

/// Builds the read-side representation selected by `mode`. The optional
/// session drives the per-user flags; anonymous readers get `false`.
pub async fn recipe_view(
    id: Uuid,
    mode: RecipeViewMode,
    session: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, Error> {
    let recipe = get_recipe(id, pool).await?.ok_or_else(|| {
        Error::InvalidRequest("No recipe exists with specified id".to_string())
    })?;

    match mode {
        RecipeViewMode::Brief => Ok(RecipeView::Brief(RecipeBrief {
            id: recipe.id,
            name: recipe.name,
            image: recipe.image,
            cooking_time: recipe.cooking_time,
        })),
        RecipeViewMode::Detail => {
            let author = get_user_by_id(pool, recipe.author_id).await?.ok_or_else(|| {
                Error::InvalidRequest("No user exists with specified id".to_string())
            })?;

            let (is_subscribed_flag, is_favorited, is_in_shopping_cart) = match session {
                Some(session) => (
                    is_subscribed(session.user_id, recipe.author_id, pool).await?,
                    is_favorite(recipe.id, session.user_id, pool).await?,
                    is_in_cart(recipe.id, session.user_id, pool).await?,
                ),
                None => (false, false, false),
            };

            let ingredients = list_recipe_ingredients(recipe.id, pool).await?;
            let tags = super::list_recipe_tags(recipe.id, pool).await?;

            Ok(RecipeView::Detail(Box::new(RecipeDetail {
                id: recipe.id,
                tags,
                author: AuthorView {
                    id: author.id,
                    email: author.email,
                    username: author.username,
                    first_name: author.first_name,
                    last_name: author.last_name,
                    is_subscribed: is_subscribed_flag,
                },
                ingredients,
                is_favorited,
                is_in_shopping_cart,
                name: recipe.name,
                image: recipe.image,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            })))
        }
    }
}

/// Validates the draft against the catalog, then persists the recipe row,
/// its ingredient rows and its tag links in one transaction.
pub async fn create_recipe(
    author_id: Uuid,
    draft: &RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<Uuid, Error> {
    let catalog = list_ingredient_ids(pool).await?;
    validate_create(draft, &catalog)?;

    let ingredients = draft.ingredients.clone().unwrap_or_default();
    let tags = draft.tags.clone().unwrap_or_default();

    for tag_id in &tags {
        if get_tag(*tag_id, pool).await?.is_none() {
            return Err(Error::InvalidRequest(
                "No tag exists with specified id".to_string(),
            ));
        }
    }

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| Error::from(QueryError::new("Could not start transaction".to_owned())))?;

    let recipe: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(draft.name.as_deref().unwrap_or(""))
    .bind(draft.image.as_deref().unwrap_or(""))
    .bind(draft.text.as_deref().unwrap_or(""))
    .bind(draft.cooking_time.unwrap_or(1))
    .fetch_one(&mut *tr)
    .await
    .map_err(|e| Error::from(QueryError::from(e)))?;

    let recipe_id = recipe.0;

    for ingredient in &ingredients {
        sqlx::query(
            "
            INSERT INTO ingredient_amounts (recipe_id, ingredient_id, amount)
            VALUES ($1, $2, $3)
        ",
        )
        .bind(recipe_id)
        .bind(ingredient.id)
        .bind(ingredient.amount)
        .execute(&mut *tr)
        .await
        .map_err(|e| {
            QueryError::from(e).into_conflict(ValidationError::DuplicateIngredient.into())
        })?;
    }

    for tag_id in &tags {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut *tr)
            .await
            .map_err(|e| QueryError::from(e).into_conflict(ValidationError::DuplicateTag.into()))?;
    }

    tr.commit()
        .await
        .map_err(|_| Error::from(QueryError::new("Could not commit transaction".to_owned())))?;

    Ok(recipe_id)
}

/// Partial update. Scalar fields keep their stored value when omitted;
/// ingredient rows are replaced only when provided; tag links are always
/// replaced (the validator has already required them). Replacement and
/// field updates share one transaction.
pub async fn update_recipe(
    id: Uuid,
    session: &SessionData,
    draft: &RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    get_recipe_mut(id, session, pool).await?;

    let catalog = list_ingredient_ids(pool).await?;
    validate_update(draft, &catalog)?;

    let tags = draft.tags.clone().unwrap_or_default();
    for tag_id in &tags {
        if get_tag(*tag_id, pool).await?.is_none() {
            return Err(Error::InvalidRequest(
                "No tag exists with specified id".to_string(),
            ));
        }
    }

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| Error::from(QueryError::new("Could not start transaction".to_owned())))?;

    sqlx::query(
        "
        UPDATE recipes SET
            name = COALESCE($1, name),
            image = COALESCE($2, image),
            text = COALESCE($3, text),
            cooking_time = COALESCE($4, cooking_time)
        WHERE id = $5
    ",
    )
    .bind(draft.name.as_deref())
    .bind(draft.image.as_deref())
    .bind(draft.text.as_deref())
    .bind(draft.cooking_time)
    .bind(id)
    .execute(&mut *tr)
    .await
    .map_err(|e| Error::from(QueryError::from(e)))?;

    if let Some(ingredients) = &draft.ingredients {
        sqlx::query("DELETE FROM ingredient_amounts WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tr)
            .await
            .map_err(|e| Error::from(QueryError::from(e)))?;

        for ingredient in ingredients {
            sqlx::query(
                "
                INSERT INTO ingredient_amounts (recipe_id, ingredient_id, amount)
                VALUES ($1, $2, $3)
            ",
            )
            .bind(id)
            .bind(ingredient.id)
            .bind(ingredient.amount)
            .execute(&mut *tr)
            .await
            .map_err(|e| {
                QueryError::from(e).into_conflict(ValidationError::DuplicateIngredient.into())
            })?;
        }
    }

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    for tag_id in &tags {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2)")
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tr)
            .await
            .map_err(|e| QueryError::from(e).into_conflict(ValidationError::DuplicateTag.into()))?;
    }

    tr.commit()
        .await
        .map_err(|_| Error::from(QueryError::new("Could not commit transaction".to_owned())))?;

    Ok(())
}

/// Deletes a recipe and everything referencing it, child rows first:
/// ledger rows and ingredient rows, then tag links, then the recipe row.
pub async fn delete_recipe(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    get_recipe_mut(id, session, pool).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| Error::from(QueryError::new("Could not start transaction".to_owned())))?;

    sqlx::query("DELETE FROM favorites WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    sqlx::query("DELETE FROM cart_entries WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    sqlx::query("DELETE FROM ingredient_amounts WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    tr.commit()
        .await
        .map_err(|_| Error::from(QueryError::new("Could not commit transaction".to_owned())))?;

    Ok(())
}
