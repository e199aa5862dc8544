use std::collections::HashSet;

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    constants::{MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT, RECIPE_NAME_MAX_LENGTH},
    error::{ActionError, ValidationError},
    schema::{Id, RecipePayload, RecipeView},
    session::SessionData,
};

use super::{
    existing_ingredient_ids, existing_tag_ids, get_recipe_mut, get_recipe_view, insert_recipe,
    lock_recipe, replace_recipe_ingredients, set_recipe_tags, update_recipe_info,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeTarget {
    Create { author_id: Id },
    Update { recipe_id: Id },
}

/// The checks that precede the first catalog lookup, so they need no store.
pub fn validate_recipe_basics(payload: &RecipePayload) -> Result<(), ValidationError> {
    if payload.cooking_time < MIN_COOKING_TIME {
        return Err(ValidationError::new(
            "cooking_time",
            "Cooking time must be at least 1 minute",
        ));
    }

    if payload.tags.is_empty() {
        return Err(ValidationError::new(
            "tags",
            "Recipe needs to have at least one tag",
        ));
    }

    let unique_tags: HashSet<&Id> = payload.tags.iter().collect();
    if unique_tags.len() != payload.tags.len() {
        return Err(ValidationError::new("tags", "Tags must be unique"));
    }

    Ok(())
}

/// Checks a payload against the catalog ids known to exist.
/// Checks run in a fixed order and the first failing one is reported.
pub fn validate_recipe(
    payload: &RecipePayload,
    known_tags: &HashSet<Id>,
    known_ingredients: &HashSet<Id>,
) -> Result<(), ValidationError> {
    validate_recipe_basics(payload)?;

    if payload.tags.iter().any(|tag| !known_tags.contains(tag)) {
        return Err(ValidationError::new("tags", "Tag does not exist"));
    }

    if payload.ingredients.is_empty() {
        return Err(ValidationError::new(
            "ingredients",
            "Recipe needs to have at least one ingredient",
        ));
    }

    if payload
        .ingredients
        .iter()
        .any(|ingredient| ingredient.amount < MIN_INGREDIENT_AMOUNT)
    {
        return Err(ValidationError::new(
            "amount",
            "Ingredient amount has to be greater than 0",
        ));
    }

    if payload
        .ingredients
        .iter()
        .any(|ingredient| !known_ingredients.contains(&ingredient.id))
    {
        return Err(ValidationError::new(
            "ingredients",
            "One or more ingredients do not exist",
        ));
    }

    let unique_ingredients: HashSet<Id> = payload.ingredients.iter().map(|i| i.id).collect();
    if unique_ingredients.len() != payload.ingredients.len() {
        return Err(ValidationError::new(
            "ingredients",
            "Duplicate ingredients are not allowed",
        ));
    }

    let name = payload.name.trim();
    if name.is_empty() || name.chars().count() > RECIPE_NAME_MAX_LENGTH {
        return Err(ValidationError::new(
            "name",
            "Recipe name must be 1-200 characters",
        ));
    }

    Ok(())
}

/// Writes the recipe row, its tag links and its ingredient rows in one
/// transaction and returns the read projection as seen by the author
/// (create) or the caller-supplied viewer (update).
pub async fn compose_recipe(
    payload: &RecipePayload,
    target: ComposeTarget,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, ActionError> {
    if let Err(e) = validate_recipe_basics(payload) {
        log::warn!("> Rejected recipe payload ({e})");
        return Err(e.into());
    }

    let mut tr = pool.begin().await.map_err(ActionError::transaction)?;

    let ingredient_ids: Vec<Id> = payload.ingredients.iter().map(|i| i.id).collect();
    let known_tags = existing_tag_ids(&payload.tags, &mut tr).await?;
    let known_ingredients = existing_ingredient_ids(&ingredient_ids, &mut tr).await?;

    if let Err(e) = validate_recipe(payload, &known_tags, &known_ingredients) {
        log::warn!("> Rejected recipe payload ({e})");
        return Err(e.into());
    }

    let recipe_id = write_recipe(payload, target, &mut tr).await?;

    tr.commit().await.map_err(ActionError::transaction)?;

    log::info!(
        "> Composed recipe {} ({}) with {} tags and {} ingredients",
        payload.name.trim(),
        recipe_id,
        payload.tags.len(),
        payload.ingredients.len()
    );

    get_recipe_view(recipe_id, viewer, pool).await
}

/// Write phase of a compose. Expects a validated payload; any store error is
/// a `Transaction` failure and the caller must drop the transaction.
pub(crate) async fn write_recipe(
    payload: &RecipePayload,
    target: ComposeTarget,
    conn: &mut PgConnection,
) -> Result<Id, ActionError> {
    let name = payload.name.trim();
    let recipe_id = match target {
        ComposeTarget::Create { author_id } => insert_recipe(
            Some(author_id),
            name,
            payload.image.as_deref().unwrap_or(""),
            &payload.text,
            payload.cooking_time,
            &mut *conn,
        )
        .await
        .map_err(ActionError::transaction)?,
        ComposeTarget::Update { recipe_id } => {
            if !lock_recipe(recipe_id, &mut *conn)
                .await
                .map_err(ActionError::transaction)?
            {
                return Err(ActionError::not_found("recipe", "Recipe doesn't exist"));
            }

            update_recipe_info(
                recipe_id,
                name,
                payload.image.as_deref(),
                &payload.text,
                payload.cooking_time,
                &mut *conn,
            )
            .await
            .map_err(ActionError::transaction)?;

            recipe_id
        }
    };

    set_recipe_tags(recipe_id, &payload.tags, &mut *conn)
        .await
        .map_err(ActionError::transaction)?;
    replace_recipe_ingredients(recipe_id, &payload.ingredients, &mut *conn)
        .await
        .map_err(ActionError::transaction)?;

    Ok(recipe_id)
}

pub async fn create_recipe(
    session: &SessionData,
    payload: &RecipePayload,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, ActionError> {
    session.authenticate(ActionType::CreateRecipes)?;

    compose_recipe(
        payload,
        ComposeTarget::Create {
            author_id: session.user_id,
        },
        Some(session.user_id),
        pool,
    )
    .await
}

pub async fn update_recipe(
    id: Id,
    session: &SessionData,
    payload: &RecipePayload,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, ActionError> {
    get_recipe_mut(id, session, pool).await?;

    compose_recipe(
        payload,
        ComposeTarget::Update { recipe_id: id },
        Some(session.user_id),
        pool,
    )
    .await
}
