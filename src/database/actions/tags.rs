use std::collections::HashSet;

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    constants::{TAG_NAME_MAX_LENGTH, TAG_SLUG_MAX_LENGTH},
    error::{ActionError, ValidationError},
    schema::{Id, Tag},
};

pub async fn create_tag(
    name: &str,
    color: &str,
    slug: &str,
    pool: &Pool<Postgres>,
) -> Result<Tag, ActionError> {
    validate_tag(name, color, slug)?;

    let tag: Tag = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING id, name, color, slug",
    )
    .bind(name)
    .bind(color.to_uppercase())
    .bind(slug)
    .fetch_one(pool)
    .await
    .map_err(|e| match ActionError::from(e) {
        ActionError::Conflict(_) => ActionError::Conflict(String::from(
            "A tag with the same name, color or slug already exists",
        )),
        e => e,
    })?;

    log::info!("> Created tag {} ({})", tag.slug, tag.id);
    Ok(tag)
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, ActionError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT id, name, color, slug FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

pub async fn find_tag_by_slug(slug: &str, pool: &Pool<Postgres>) -> Result<Option<Tag>, ActionError> {
    let tag: Option<Tag> =
        sqlx::query_as("SELECT id, name, color, slug FROM tags WHERE slug = $1")
            .bind(slug)
            .fetch_optional(pool)
            .await?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, ActionError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT id, name, color, slug FROM tags ORDER BY id DESC")
        .fetch_all(pool)
        .await?;

    Ok(list)
}

/// Which of `ids` exist in the catalog.
pub async fn existing_tag_ids(
    ids: &[Id],
    conn: &mut PgConnection,
) -> Result<HashSet<Id>, ActionError> {
    if ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

pub async fn list_recipe_tags(recipe_id: Id, pool: &Pool<Postgres>) -> Result<Vec<Tag>, ActionError> {
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(list)
}

/// Replaces the tag links of a recipe wholesale.
pub async fn set_recipe_tags(
    recipe_id: Id,
    tags: &[Id],
    conn: &mut PgConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    if tags.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

    query_builder.push_values(tags.iter(), |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });

    query_builder.build().execute(&mut *conn).await?;

    Ok(())
}

pub fn validate_tag(name: &str, color: &str, slug: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() || name.chars().count() > TAG_NAME_MAX_LENGTH {
        return Err(ValidationError::new("name", "Tag name must be 1-200 characters"));
    }

    let hex = color.strip_prefix('#').unwrap_or("");
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::new("color", "Color must be in #RRGGBB format"));
    }

    if slug.is_empty()
        || slug.len() > TAG_SLUG_MAX_LENGTH
        || !slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::new(
            "slug",
            "Slug may only contain letters, numbers, hyphens and underscores",
        ));
    }

    Ok(())
}
