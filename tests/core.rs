use std::collections::HashSet;

use recipebook_sdk::error::{Error, LedgerError, ValidationError};
use recipebook_sdk::schema::CartItemRow;
use recipebook_sdk::shopping::{aggregate, render_shopping_list};
use recipebook_sdk::validate::{validate_create, validate_update, RecipeDraft};
use recipebook_sdk::{SHOPPING_LIST_FILENAME, SHOPPING_LIST_HEADER};

fn catalog() -> HashSet<i32> {
    [1, 2, 3].into_iter().collect()
}

#[test]
fn duplicate_ingredient_payload_is_rejected_before_persistence() {
    let draft: RecipeDraft = serde_json::from_str(
        r#"{
            "name": "Pancakes",
            "text": "Fry on both sides",
            "image": "recipes/images/pancakes.png",
            "cooking_time": 20,
            "ingredients": [{"id": 1, "amount": 2}, {"id": 1, "amount": 3}],
            "tags": [4]
        }"#,
    )
    .unwrap();

    assert_eq!(
        validate_create(&draft, &catalog()),
        Err(ValidationError::DuplicateIngredient)
    );
}

#[test]
fn update_payload_must_carry_tags() {
    let draft: RecipeDraft = serde_json::from_str(r#"{"cooking_time": 30}"#).unwrap();
    assert_eq!(
        validate_update(&draft, &catalog()),
        Err(ValidationError::MissingTags)
    );
}

#[test]
fn shopping_list_export_matches_the_wire_format() {
    let items = vec![
        CartItemRow {
            name: "Salt".to_string(),
            measurement_unit: "g".to_string(),
            amount: 5,
        },
        CartItemRow {
            name: "Salt".to_string(),
            measurement_unit: "g".to_string(),
            amount: 3,
        },
        CartItemRow {
            name: "Eggs".to_string(),
            measurement_unit: "pcs".to_string(),
            amount: 2,
        },
    ];

    let text = render_shopping_list(&aggregate(&items));
    assert_eq!(
        text,
        format!("{SHOPPING_LIST_HEADER}\n\nEggs (pcs) — 2\nSalt (g) — 8")
    );
    assert_eq!(SHOPPING_LIST_FILENAME, "shopping_list.txt");
}

#[test]
fn conflict_and_validation_errors_stay_distinct() {
    let conflict = Error::from(LedgerError::AlreadyExists);
    let structural = Error::from(ValidationError::MissingTags);

    assert_eq!(conflict.status(), 409);
    assert_eq!(structural.status(), 400);
    assert!(conflict.payload().get("errors").is_some());
    assert!(structural.payload().get("tags").is_some());
}
