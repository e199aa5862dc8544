use sqlx::{Pool, Postgres};

use crate::{
    error::ActionError,
    schema::{Id, RelationKind, ShortRecipeView},
    session::SessionData,
};

use super::get_short_recipe;

pub async fn is_related(
    kind: RelationKind,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, ActionError> {
    let result: Option<(Id,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = $2",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .fetch_optional(pool)
    .await?;

    Ok(result.is_some())
}

/// Marks the recipe for the user. The (user, recipe) unique constraint is what
/// rejects duplicates, including concurrent ones.
pub async fn add_relation(
    kind: RelationKind,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<ShortRecipeView, ActionError> {
    let recipe = get_short_recipe(recipe_id, pool)
        .await?
        .ok_or_else(|| ActionError::not_found("recipe", "Recipe doesn't exist"))?;

    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(|e| {
        // the recipe (or user) vanished between the lookup and the insert
        let vanished =
            matches!(&e, sqlx::Error::Database(db) if db.is_foreign_key_violation());
        if vanished {
            ActionError::not_found("recipe", "Recipe doesn't exist")
        } else {
            ActionError::from(e)
        }
    })?;

    if result.rows_affected() == 0 {
        log::warn!(
            "> Recipe {recipe_id} is already in {} of user {user_id}",
            kind.label()
        );
        return Err(ActionError::Conflict(format!(
            "Recipe is already in {}",
            kind.label()
        )));
    }

    log::info!("> Added recipe {recipe_id} to {} of user {user_id}", kind.label());
    Ok(recipe)
}

pub async fn remove_relation(
    kind: RelationKind,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    if get_short_recipe(recipe_id, pool).await?.is_none() {
        return Err(ActionError::not_found("recipe", "Recipe doesn't exist"));
    }

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ActionError::not_found(
            kind.table(),
            &format!("Recipe isn't in {}, can't be removed", kind.label()),
        ));
    }

    log::info!(
        "> Removed recipe {recipe_id} from {} of user {user_id}",
        kind.label()
    );
    Ok(())
}

/// Adds the recipe to the session user's own favorites or cart.
pub async fn add_own_relation(
    session: &SessionData,
    kind: RelationKind,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<ShortRecipeView, ActionError> {
    session.authenticate(kind.into())?;

    add_relation(kind, session.user_id, recipe_id, pool).await
}

pub async fn remove_own_relation(
    session: &SessionData,
    kind: RelationKind,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    session.authenticate(kind.into())?;

    remove_relation(kind, session.user_id, recipe_id, pool).await
}

pub async fn list_related(
    kind: RelationKind,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShortRecipeView>, ActionError> {
    let rows: Vec<ShortRecipeView> = sqlx::query_as(&format!(
        "
        SELECT r.id, r.name, r.image, r.cooking_time
        FROM {} e
        INNER JOIN recipes r ON r.id = e.recipe_id
        WHERE e.user_id = $1
        ORDER BY e.id DESC
    ",
        kind.table()
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
