use std::collections::HashSet;

use serde::Deserialize;

use crate::constants::{MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT, MIN_RECIPE_NAME_LENGTH};

use super::{error::ValidationError, schema::Uuid};

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientRef {
    pub id: Uuid,
    pub amount: i32,
}

/// Candidate recipe payload. Omitted fields deserialize to `None`, which on
/// update means "leave unchanged" for everything except `tags`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub cooking_time: Option<i32>,
    #[serde(default)]
    pub ingredients: Option<Vec<IngredientRef>>,
    #[serde(default)]
    pub tags: Option<Vec<Uuid>>,
}

/// Gate for recipe creation. Pure: no persistence happens here, and the
/// draft is used unchanged afterwards.
pub fn validate_create(
    draft: &RecipeDraft,
    catalog: &HashSet<Uuid>,
) -> Result<(), ValidationError> {
    check_name(draft)?;
    check_ingredients(draft.ingredients.as_deref().unwrap_or(&[]), catalog)?;
    check_tags(draft.tags.as_deref())?;

    match draft.cooking_time {
        None => return Err(ValidationError::MissingCookingTime),
        Some(t) if t < MIN_COOKING_TIME => return Err(ValidationError::InvalidCookingTime),
        Some(_) => {}
    }

    if draft.image.as_deref().map_or(true, |i| i.is_empty()) {
        return Err(ValidationError::MissingImage);
    }

    Ok(())
}

/// Gate for recipe update. Ingredients, image, name and cooking time may be
/// omitted to keep the stored value; an omitted tag list is still rejected.
pub fn validate_update(
    draft: &RecipeDraft,
    catalog: &HashSet<Uuid>,
) -> Result<(), ValidationError> {
    if draft.name.is_some() {
        check_name(draft)?;
    }
    if let Some(ingredients) = draft.ingredients.as_deref() {
        check_ingredients(ingredients, catalog)?;
    }
    check_tags(draft.tags.as_deref())?;

    if let Some(t) = draft.cooking_time {
        if t < MIN_COOKING_TIME {
            return Err(ValidationError::InvalidCookingTime);
        }
    }

    Ok(())
}

fn check_name(draft: &RecipeDraft) -> Result<(), ValidationError> {
    let name = draft.name.as_deref().unwrap_or("");
    if name.chars().count() < MIN_RECIPE_NAME_LENGTH {
        return Err(ValidationError::NameTooShort);
    }
    Ok(())
}

fn check_ingredients(
    ingredients: &[IngredientRef],
    catalog: &HashSet<Uuid>,
) -> Result<(), ValidationError> {
    if ingredients.is_empty() {
        return Err(ValidationError::MissingIngredients);
    }

    let mut unknown: Vec<Uuid> = ingredients
        .iter()
        .filter(|i| !catalog.contains(&i.id))
        .map(|i| i.id)
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        unknown.dedup();
        return Err(ValidationError::UnknownIngredient(unknown));
    }

    let distinct: HashSet<Uuid> = ingredients.iter().map(|i| i.id).collect();
    if distinct.len() != ingredients.len() {
        return Err(ValidationError::DuplicateIngredient);
    }

    if ingredients
        .iter()
        .any(|i| i.amount < MIN_INGREDIENT_AMOUNT)
    {
        return Err(ValidationError::InvalidAmount);
    }

    Ok(())
}

fn check_tags(tags: Option<&[Uuid]>) -> Result<(), ValidationError> {
    let tags = match tags {
        Some(tags) if !tags.is_empty() => tags,
        _ => return Err(ValidationError::MissingTags),
    };

    let distinct: HashSet<Uuid> = tags.iter().copied().collect();
    if distinct.len() != tags.len() {
        return Err(ValidationError::DuplicateTag);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> HashSet<Uuid> {
        [1, 2, 3].into_iter().collect()
    }

    fn draft() -> RecipeDraft {
        RecipeDraft {
            name: Some("Borscht".to_string()),
            text: Some("Simmer for an hour".to_string()),
            image: Some("recipes/images/borscht.png".to_string()),
            cooking_time: Some(60),
            ingredients: Some(vec![
                IngredientRef { id: 1, amount: 2 },
                IngredientRef { id: 2, amount: 5 },
            ]),
            tags: Some(vec![10, 11]),
        }
    }

    #[test]
    fn accepts_complete_draft() {
        assert!(validate_create(&draft(), &catalog()).is_ok());
    }

    #[test]
    fn rejects_duplicate_ingredients_even_when_rest_is_valid() {
        let mut d = draft();
        d.ingredients = Some(vec![
            IngredientRef { id: 1, amount: 2 },
            IngredientRef { id: 1, amount: 3 },
        ]);
        assert_eq!(
            validate_create(&d, &catalog()),
            Err(ValidationError::DuplicateIngredient)
        );
        assert_eq!(
            validate_update(&d, &catalog()),
            Err(ValidationError::DuplicateIngredient)
        );
    }

    #[test]
    fn lists_every_unknown_ingredient() {
        let mut d = draft();
        d.ingredients = Some(vec![
            IngredientRef { id: 9, amount: 1 },
            IngredientRef { id: 1, amount: 1 },
            IngredientRef { id: 7, amount: 1 },
        ]);
        assert_eq!(
            validate_create(&d, &catalog()),
            Err(ValidationError::UnknownIngredient(vec![7, 9]))
        );
    }

    #[test]
    fn rejects_empty_or_missing_ingredients_on_create() {
        let mut d = draft();
        d.ingredients = Some(vec![]);
        assert_eq!(
            validate_create(&d, &catalog()),
            Err(ValidationError::MissingIngredients)
        );
        d.ingredients = None;
        assert_eq!(
            validate_create(&d, &catalog()),
            Err(ValidationError::MissingIngredients)
        );
    }

    #[test]
    fn rejects_amount_below_one() {
        let mut d = draft();
        d.ingredients = Some(vec![IngredientRef { id: 1, amount: 0 }]);
        assert_eq!(
            validate_create(&d, &catalog()),
            Err(ValidationError::InvalidAmount)
        );
    }

    #[test]
    fn rejects_duplicate_tags() {
        let mut d = draft();
        d.tags = Some(vec![10, 10]);
        assert_eq!(
            validate_create(&d, &catalog()),
            Err(ValidationError::DuplicateTag)
        );
    }

    #[test]
    fn cooking_time_is_required_and_positive() {
        let mut d = draft();
        d.cooking_time = None;
        assert_eq!(
            validate_create(&d, &catalog()),
            Err(ValidationError::MissingCookingTime)
        );
        d.cooking_time = Some(0);
        assert_eq!(
            validate_create(&d, &catalog()),
            Err(ValidationError::InvalidCookingTime)
        );
    }

    #[test]
    fn image_is_required_on_create_only() {
        let mut d = draft();
        d.image = None;
        assert_eq!(
            validate_create(&d, &catalog()),
            Err(ValidationError::MissingImage)
        );
        assert!(validate_update(&d, &catalog()).is_ok());
    }

    #[test]
    fn update_without_tags_is_rejected_even_without_ingredients() {
        let mut d = draft();
        d.tags = None;
        d.ingredients = None;
        assert_eq!(
            validate_update(&d, &catalog()),
            Err(ValidationError::MissingTags)
        );
    }

    #[test]
    fn update_may_omit_everything_but_tags() {
        let d = RecipeDraft {
            tags: Some(vec![10]),
            ..RecipeDraft::default()
        };
        assert!(validate_update(&d, &catalog()).is_ok());
    }

    #[test]
    fn short_name_is_rejected() {
        let mut d = draft();
        d.name = Some("Tea".to_string());
        assert_eq!(
            validate_create(&d, &catalog()),
            Err(ValidationError::NameTooShort)
        );
        assert_eq!(
            validate_update(&d, &catalog()),
            Err(ValidationError::NameTooShort)
        );
    }

    #[test]
    fn omitted_fields_deserialize_to_none() {
        let d: RecipeDraft = serde_json::from_str(r#"{"name": "Borscht"}"#).unwrap();
        assert!(d.tags.is_none());
        assert!(d.ingredients.is_none());
        assert_eq!(
            validate_update(&d, &catalog()),
            Err(ValidationError::MissingTags)
        );
    }
}
