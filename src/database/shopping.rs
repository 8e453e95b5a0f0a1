use std::collections::BTreeMap;

use sqlx::{Pool, Postgres};

use crate::constants::SHOPPING_LIST_HEADER;

use super::{
    error::{Error, QueryError},
    schema::{CartItemRow, Uuid},
};

/// One aggregated line of the exported list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// Groups cart occurrences by (name, measurement unit) and sums the
/// amounts. Two distinct catalog entries sharing a name and unit merge into
/// one line. Output order is lexicographic by name, unit as tiebreak, so
/// the result never depends on insertion order.
pub fn aggregate(items: &[CartItemRow]) -> Vec<ShoppingListLine> {
    let mut totals: BTreeMap<(&str, &str), i64> = BTreeMap::new();
    for item in items {
        *totals
            .entry((&item.name, &item.measurement_unit))
            .or_insert(0) += i64::from(item.amount);
    }

    totals
        .into_iter()
        .map(|((name, unit), total)| ShoppingListLine {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            total,
        })
        .collect()
}

/// Renders the fixed header, a blank line, then one line per group.
pub fn render_shopping_list(lines: &[ShoppingListLine]) -> String {
    let body = lines
        .iter()
        .map(|line| {
            format!(
                "{} ({}) — {}",
                line.name, line.measurement_unit, line.total
            )
        })
        .collect::<Vec<String>>()
        .join("\n");

    format!("{SHOPPING_LIST_HEADER}\n\n{body}")
}

/// Builds the downloadable shopping list for a user's current cart.
/// The caller exposes it as a plain-text attachment.
pub async fn generate_shopping_list(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let entries: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_entries WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    if entries.0 == 0 {
        return Err(Error::EmptyCart);
    }

    let items: Vec<CartItemRow> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ia.amount AS amount
        FROM cart_entries c
        INNER JOIN ingredient_amounts ia ON ia.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ia.ingredient_id
        WHERE c.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(render_shopping_list(&aggregate(&items)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, unit: &str, amount: i32) -> CartItemRow {
        CartItemRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn sums_within_a_name_unit_group() {
        let lines = aggregate(&[item("Salt", "g", 5), item("Salt", "g", 3)]);
        assert_eq!(
            lines,
            vec![ShoppingListLine {
                name: "Salt".to_string(),
                measurement_unit: "g".to_string(),
                total: 8,
            }]
        );
        assert_eq!(
            render_shopping_list(&lines),
            "Список покупок:\n\nSalt (g) — 8"
        );
    }

    #[test]
    fn same_name_different_unit_stays_separate() {
        let lines = aggregate(&[item("Milk", "ml", 200), item("Milk", "g", 50)]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].measurement_unit, "g");
        assert_eq!(lines[1].measurement_unit, "ml");
    }

    #[test]
    fn output_is_sorted_and_insertion_order_independent() {
        let forward = aggregate(&[item("Salt", "g", 1), item("Flour", "g", 2)]);
        let reverse = aggregate(&[item("Flour", "g", 2), item("Salt", "g", 1)]);
        assert_eq!(forward, reverse);
        assert_eq!(forward[0].name, "Flour");
        assert_eq!(forward[1].name, "Salt");
    }

    #[test]
    fn rendering_is_idempotent_for_a_fixed_cart() {
        let items = vec![item("Salt", "g", 5), item("Flour", "g", 100)];
        let first = render_shopping_list(&aggregate(&items));
        let second = render_shopping_list(&aggregate(&items));
        assert_eq!(first, second);
        assert_eq!(first, "Список покупок:\n\nFlour (g) — 100\nSalt (g) — 5");
    }

    #[test]
    fn totals_do_not_overflow_i32_sums() {
        let items = vec![item("Rice", "g", i32::MAX), item("Rice", "g", i32::MAX)];
        let lines = aggregate(&items);
        assert_eq!(lines[0].total, 2 * i64::from(i32::MAX));
    }
}
