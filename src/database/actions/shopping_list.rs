use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    constants::{SHOPPING_LIST_FILE_SUFFIX, SHOPPING_LIST_HEADER},
    error::ActionError,
    schema::{CartPart, Id, ShoppingListEntry},
};

/// Every ingredient row of every recipe in the user's cart, in cart order.
pub async fn list_cart_parts(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<CartPart>, ActionError> {
    let rows: Vec<CartPart> = sqlx::query_as(
        "
        SELECT c.recipe_id AS recipe_id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM carts c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
        ORDER BY c.id, ri.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Sums amounts per (name, unit). Groups come out in first-seen order.
pub fn aggregate_parts<I>(parts: I) -> Vec<ShoppingListEntry>
where
    I: IntoIterator<Item = CartPart>,
{
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut entries: Vec<ShoppingListEntry> = vec![];

    for part in parts {
        let key = (part.name, part.measurement_unit);
        match index.get(&key) {
            Some(&i) => entries[i].amount += i64::from(part.amount),
            None => {
                index.insert(key.clone(), entries.len());
                entries.push(ShoppingListEntry {
                    name: key.0,
                    measurement_unit: key.1,
                    amount: i64::from(part.amount),
                });
            }
        }
    }

    entries
}

pub async fn get_shopping_list(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListEntry>, ActionError> {
    let parts = list_cart_parts(user_id, pool).await?;
    log::debug!("> Aggregating {} cart rows of user {user_id}", parts.len());

    Ok(aggregate_parts(parts))
}

pub fn render_shopping_list(entries: &[ShoppingListEntry]) -> String {
    entries.iter().fold(String::from(SHOPPING_LIST_HEADER), |mut s, entry| {
        s += &format!(
            "\n{} - {} {}",
            entry.name, entry.amount, entry.measurement_unit
        );
        s
    })
}

pub fn shopping_list_filename(date: NaiveDate) -> String {
    format!("{}_{SHOPPING_LIST_FILE_SUFFIX}", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(recipe_id: Id, name: &str, unit: &str, amount: i32) -> CartPart {
        CartPart {
            recipe_id,
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
            amount,
        }
    }

    fn entry(name: &str, unit: &str, amount: i64) -> ShoppingListEntry {
        ShoppingListEntry {
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
            amount,
        }
    }

    fn sorted(mut entries: Vec<ShoppingListEntry>) -> Vec<ShoppingListEntry> {
        entries.sort_by(|a, b| (&a.name, &a.measurement_unit).cmp(&(&b.name, &b.measurement_unit)));
        entries
    }

    fn two_recipes() -> (Vec<CartPart>, Vec<CartPart>) {
        (
            vec![part(1, "flour", "g", 200), part(1, "egg", "pcs", 2)],
            vec![part(2, "flour", "g", 100), part(2, "sugar", "g", 50)],
        )
    }

    #[test]
    fn sums_shared_ingredients() {
        let (x, y) = two_recipes();
        let entries = aggregate_parts(x.into_iter().chain(y));

        assert_eq!(
            entries,
            vec![
                entry("flour", "g", 300),
                entry("egg", "pcs", 2),
                entry("sugar", "g", 50),
            ]
        );
    }

    #[test]
    fn cart_order_does_not_change_totals() {
        let (x, y) = two_recipes();
        let forward = aggregate_parts(x.clone().into_iter().chain(y.clone()));
        let backward = aggregate_parts(y.into_iter().chain(x));

        assert_eq!(sorted(forward), sorted(backward));
    }

    #[test]
    fn groups_by_name_and_unit() {
        let entries = aggregate_parts(vec![
            part(1, "milk", "ml", 200),
            part(2, "milk", "cup", 1),
            part(3, "milk", "ml", 300),
        ]);

        assert_eq!(
            entries,
            vec![entry("milk", "ml", 500), entry("milk", "cup", 1)]
        );
    }

    #[test]
    fn accumulates_past_i32() {
        let entries = aggregate_parts(vec![
            part(1, "water", "ml", i32::MAX),
            part(2, "water", "ml", i32::MAX),
        ]);

        assert_eq!(entries[0].amount, 2 * i64::from(i32::MAX));
    }

    #[test]
    fn empty_cart_gives_empty_list() {
        assert!(aggregate_parts(Vec::<CartPart>::new()).is_empty());
        assert_eq!(render_shopping_list(&[]), SHOPPING_LIST_HEADER);
    }

    #[test]
    fn renders_one_line_per_group() {
        let rendered = render_shopping_list(&[entry("flour", "g", 300), entry("egg", "pcs", 2)]);

        assert_eq!(
            rendered,
            "Your personal shopping list:\nflour - 300 g\negg - 2 pcs"
        );
    }

    #[test]
    fn filename_carries_the_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(shopping_list_filename(date), "2024-03-07_shopping_list.txt");
    }
}
