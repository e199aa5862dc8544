#![allow(dead_code)]

use pantry_sdk::{
    actions::{create_ingredient, create_tag, register_user, run_migrations},
    schema::{Id, Ingredient, IngredientAmount, RecipePayload, Tag, UserRole},
    session::SessionData,
};
use redis::aio::MultiplexedConnection;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use uuid::Uuid;

/// Connects to `DATABASE_URL` and applies migrations, or returns `None` when
/// no database is configured so store tests can be skipped.
pub async fn pool() -> Option<Pool<Postgres>> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL is not set, skipping store test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("could not connect to DATABASE_URL");
    run_migrations(&pool).await.expect("migrations failed");

    Some(pool)
}

/// Opens a connection to `REDIS_URL`, or `None` so cache tests can be skipped.
pub async fn cache() -> Option<MultiplexedConnection> {
    let url = match std::env::var("REDIS_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("REDIS_URL is not set, skipping cache test");
            return None;
        }
    };

    let client = redis::Client::open(url).expect("invalid REDIS_URL");
    let connection = client
        .get_multiplexed_tokio_connection()
        .await
        .expect("could not connect to REDIS_URL");

    Some(connection)
}

pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

pub async fn user(pool: &Pool<Postgres>, role: UserRole) -> SessionData {
    register_user(&unique("cook"), role, pool)
        .await
        .expect("could not register user")
        .into()
}

pub async fn tag(pool: &Pool<Postgres>) -> Tag {
    let id = Uuid::new_v4().simple().to_string();
    let color = format!("#{}", &id[..6]);

    create_tag(&unique("tag"), &color, &unique("slug"), pool)
        .await
        .expect("could not create tag")
}

pub async fn ingredient(pool: &Pool<Postgres>, name: &str, unit: &str) -> Ingredient {
    create_ingredient(name, unit, pool)
        .await
        .expect("could not create ingredient")
}

pub fn payload(tags: &[Id], ingredients: &[(Id, i32)]) -> RecipePayload {
    RecipePayload {
        name: String::from("Weekend pancakes"),
        text: String::from("Whisk, rest for ten minutes, fry."),
        cooking_time: 25,
        image: Some(String::from("recipes/images/pancakes.png")),
        tags: tags.to_vec(),
        ingredients: ingredients
            .iter()
            .map(|(id, amount)| IngredientAmount {
                id: *id,
                amount: *amount,
            })
            .collect(),
    }
}
