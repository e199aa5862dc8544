use std::collections::HashSet;

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    constants::{INGREDIENT_IMPORT_BATCH_SIZE, INGREDIENT_NAME_MAX_LENGTH},
    error::{ActionError, ValidationError},
    schema::{Id, Ingredient, NewIngredient},
};

pub async fn list_ingredients(pool: &Pool<Postgres>) -> Result<Vec<Ingredient>, ActionError> {
    let rows: Vec<Ingredient> =
        sqlx::query_as("SELECT id, name, measurement_unit FROM ingredients ORDER BY name, id")
            .fetch_all(pool)
            .await?;

    Ok(rows)
}

/// Case-insensitive name prefix search.
pub async fn search_ingredients(
    prefix: &str,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, ActionError> {
    let pattern = format!("{}%", escape_like(prefix));

    let rows: Vec<Ingredient> = sqlx::query_as(
        "SELECT id, name, measurement_unit FROM ingredients WHERE name ILIKE $1 ORDER BY name, id",
    )
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_ingredient(
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, ActionError> {
    let row: Option<Ingredient> =
        sqlx::query_as("SELECT id, name, measurement_unit FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(row)
}

pub async fn create_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, ActionError> {
    let entry = NewIngredient {
        name: name.to_owned(),
        measurement_unit: measurement_unit.to_owned(),
    };
    validate_ingredient(&entry)?;

    let row: Ingredient = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        RETURNING id, name, measurement_unit
    ",
    )
    .bind(&entry.name)
    .bind(&entry.measurement_unit)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Loads a JSON array of `{name, measurement_unit}` objects into the catalog.
/// Either every entry is inserted or none is.
pub async fn import_ingredients(data: &str, pool: &Pool<Postgres>) -> Result<usize, ActionError> {
    let entries = parse_ingredient_import(data)?;
    if entries.is_empty() {
        return Ok(0);
    }

    let mut tr = pool.begin().await.map_err(ActionError::transaction)?;

    for chunk in entries.chunks(INGREDIENT_IMPORT_BATCH_SIZE) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");

        query_builder.push_values(chunk.iter(), |mut b, entry| {
            b.push_bind(&entry.name).push_bind(&entry.measurement_unit);
        });

        query_builder
            .build()
            .execute(&mut *tr)
            .await
            .map_err(ActionError::transaction)?;
    }

    tr.commit().await.map_err(ActionError::transaction)?;

    log::info!("> Imported {} ingredients", entries.len());
    Ok(entries.len())
}

pub fn parse_ingredient_import(data: &str) -> Result<Vec<NewIngredient>, ValidationError> {
    let entries: Vec<NewIngredient> = serde_json::from_str(data)
        .map_err(|_| ValidationError::new("ingredients", "Invalid ingredient import data"))?;

    for entry in entries.iter() {
        validate_ingredient(entry)?;
    }

    Ok(entries)
}

/// Which of `ids` exist in the catalog.
pub async fn existing_ingredient_ids(
    ids: &[Id],
    conn: &mut PgConnection,
) -> Result<HashSet<Id>, ActionError> {
    if ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

fn validate_ingredient(entry: &NewIngredient) -> Result<(), ValidationError> {
    if entry.name.trim().is_empty() || entry.name.chars().count() > INGREDIENT_NAME_MAX_LENGTH {
        return Err(ValidationError::new(
            "name",
            "Ingredient name must be 1-200 characters",
        ));
    }

    if entry.measurement_unit.trim().is_empty()
        || entry.measurement_unit.chars().count() > INGREDIENT_NAME_MAX_LENGTH
    {
        return Err(ValidationError::new(
            "measurement_unit",
            "Measurement unit must be 1-200 characters",
        ));
    }

    Ok(())
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
