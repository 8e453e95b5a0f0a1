use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::TypeError;

pub type Uuid = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

impl TryFrom<Value> for UserRole {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some(value) => match value {
                "user" => Ok(Self::User),
                "admin" => Ok(Self::Admin),
                _ => Err(TypeError::new("Invalid variant")),
            },
            None => Err(TypeError::new("Failed to parse value as string")),
        }
    }
}

/// Explicit selector for the two read-side recipe representations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeViewMode {
    Detail,
    Brief,
}

impl TryFrom<Value> for RecipeViewMode {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some(value) => match value {
                "detail" => Ok(Self::Detail),
                "brief" => Ok(Self::Brief),
                _ => Err(TypeError::new("Invalid variant")),
            },
            None => Err(TypeError::new("Failed to parse value as string")),
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: UserRole,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub created_at: DateTime<Utc>,
}

/// Listing row; `count` carries the total-row window for pagination.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub created_at: DateTime<Utc>,

    pub count: i64,
}

/// One ingredient line of a recipe, joined against the catalog.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct IngredientAmountRow {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Subscription {
    pub user_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Favorite {
    pub user_id: Uuid,
    pub recipe_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct CartEntry {
    pub user_id: Uuid,
    pub recipe_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: AuthorView,
    pub ingredients: Vec<IngredientAmountRow>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeBrief {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

/// Brief listing row with the pagination window attached.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeBriefRow {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,

    pub count: i64,
}

/// Read-side recipe representation, picked by [`RecipeViewMode`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RecipeView {
    Detail(Box<RecipeDetail>),
    Brief(RecipeBrief),
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct SubscribedAuthorRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,

    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeBrief>,
    pub recipes_count: i64,
}

/// Raw (ingredient, amount) occurrence pulled from a user's cart,
/// before aggregation.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct CartItemRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Catalog rows pass through the redis cache as serialized lists, so
    // they must deserialize as well as serialize.
    #[test]
    fn catalog_rows_deserialize() {
        let ingredient: Ingredient =
            serde_json::from_str(r#"{"id": 1, "name": "Salt", "measurement_unit": "g"}"#).unwrap();
        assert_eq!(ingredient.name, "Salt");

        let tag: Tag = serde_json::from_str(
            r##"{"id": 2, "name": "Breakfast", "color": "#E26C2D", "slug": "breakfast"}"##,
        )
        .unwrap();
        assert_eq!(tag.slug, "breakfast");
    }
}
