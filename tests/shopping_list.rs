mod common;

use pantry_sdk::{
    actions::{add_relation, create_recipe, get_shopping_list, remove_relation, render_shopping_list},
    schema::{Id, RelationKind, ShoppingListEntry, UserRole},
};
use sqlx::{Pool, Postgres};

struct Kitchen {
    x: Id,
    y: Id,
}

/// Recipe X uses flour 200 g and egg 2 pcs, recipe Y flour 100 g and sugar 50 g.
async fn kitchen(pool: &Pool<Postgres>) -> Kitchen {
    let cook = common::user(pool, UserRole::User).await;
    let tag = common::tag(pool).await;
    let flour = common::ingredient(pool, "flour", "g").await;
    let egg = common::ingredient(pool, "egg", "pcs").await;
    let sugar = common::ingredient(pool, "sugar", "g").await;

    let x = create_recipe(
        &cook,
        &common::payload(&[tag.id], &[(flour.id, 200), (egg.id, 2)]),
        pool,
    )
    .await
    .unwrap();
    let y = create_recipe(
        &cook,
        &common::payload(&[tag.id], &[(flour.id, 100), (sugar.id, 50)]),
        pool,
    )
    .await
    .unwrap();

    Kitchen {
        x: x.detail.id,
        y: y.detail.id,
    }
}

fn sorted(mut entries: Vec<ShoppingListEntry>) -> Vec<(String, String, i64)> {
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
        .into_iter()
        .map(|e| (e.name, e.measurement_unit, e.amount))
        .collect()
}

fn expected() -> Vec<(String, String, i64)> {
    vec![
        (String::from("egg"), String::from("pcs"), 2),
        (String::from("flour"), String::from("g"), 300),
        (String::from("sugar"), String::from("g"), 50),
    ]
}

#[tokio::test]
async fn sums_ingredients_across_the_cart() {
    let Some(pool) = common::pool().await else {
        return;
    };

    let kitchen = kitchen(&pool).await;
    let shopper = common::user(&pool, UserRole::User).await;

    add_relation(RelationKind::Cart, shopper.user_id, kitchen.x, &pool)
        .await
        .unwrap();
    add_relation(RelationKind::Cart, shopper.user_id, kitchen.y, &pool)
        .await
        .unwrap();

    let list = get_shopping_list(shopper.user_id, &pool).await.unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list[0].name, "flour");

    let rendered = render_shopping_list(&list);
    assert_eq!(
        rendered,
        "Your personal shopping list:\nflour - 300 g\negg - 2 pcs\nsugar - 50 g"
    );

    assert_eq!(sorted(list), expected());
}

#[tokio::test]
async fn cart_order_does_not_matter() {
    let Some(pool) = common::pool().await else {
        return;
    };

    let kitchen = kitchen(&pool).await;
    let forward = common::user(&pool, UserRole::User).await;
    let backward = common::user(&pool, UserRole::User).await;

    for id in [kitchen.x, kitchen.y] {
        add_relation(RelationKind::Cart, forward.user_id, id, &pool)
            .await
            .unwrap();
    }
    for id in [kitchen.y, kitchen.x] {
        add_relation(RelationKind::Cart, backward.user_id, id, &pool)
            .await
            .unwrap();
    }

    let a = get_shopping_list(forward.user_id, &pool).await.unwrap();
    let b = get_shopping_list(backward.user_id, &pool).await.unwrap();

    assert_eq!(sorted(a), expected());
    assert_eq!(sorted(b), expected());
}

#[tokio::test]
async fn empty_cart_is_an_empty_list() {
    let Some(pool) = common::pool().await else {
        return;
    };

    let shopper = common::user(&pool, UserRole::User).await;
    assert!(get_shopping_list(shopper.user_id, &pool)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn favorites_and_other_users_do_not_leak_in() {
    let Some(pool) = common::pool().await else {
        return;
    };

    let kitchen = kitchen(&pool).await;
    let shopper = common::user(&pool, UserRole::User).await;
    let neighbour = common::user(&pool, UserRole::User).await;

    add_relation(RelationKind::Favorite, shopper.user_id, kitchen.x, &pool)
        .await
        .unwrap();
    add_relation(RelationKind::Cart, neighbour.user_id, kitchen.x, &pool)
        .await
        .unwrap();
    add_relation(RelationKind::Cart, shopper.user_id, kitchen.y, &pool)
        .await
        .unwrap();

    let list = sorted(get_shopping_list(shopper.user_id, &pool).await.unwrap());
    assert_eq!(
        list,
        vec![
            (String::from("flour"), String::from("g"), 100),
            (String::from("sugar"), String::from("g"), 50),
        ]
    );

    remove_relation(RelationKind::Cart, shopper.user_id, kitchen.y, &pool)
        .await
        .unwrap();
    assert!(get_shopping_list(shopper.user_id, &pool)
        .await
        .unwrap()
        .is_empty());
}
