use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    authentication::permissions::ActionType,
    error::ActionError,
    schema::{
        Id, IngredientAmount, Recipe, RecipeAuthor, RecipeDetail, RecipeFilter,
        RecipeIngredient, RecipeView, RelationKind, ShortRecipeView,
    },
    session::SessionData,
};

use super::{is_related, list_recipe_tags};

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, ActionError> {
    let row: Option<Recipe> = sqlx::query_as(
        "SELECT id, author_id, name, image, text, cooking_time, pub_date FROM recipes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn get_short_recipe(
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<ShortRecipeView>, ActionError> {
    let row: Option<ShortRecipeView> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(row)
}

pub async fn get_recipe_author(
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeAuthor>, ActionError> {
    let row: Option<RecipeAuthor> = sqlx::query_as(
        "
        SELECT u.id, u.username
        FROM recipes r
        INNER JOIN users u ON u.id = r.author_id
        WHERE r.id = $1
    ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Resolves a recipe for modification by `session`; only its author or an admin may.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ActionError> {
    let recipe = get_recipe(id, pool).await?;
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match recipe {
        Some(recipe) => match session.authenticate(ActionType::ManageAllRecipes) {
            Ok(_) => Ok(recipe),
            Err(_) => {
                if recipe.author_id != Some(session.user_id) {
                    Err(ActionError::Forbidden(String::from(
                        "Only the author can modify this recipe",
                    )))
                } else {
                    Ok(recipe)
                }
            }
        },
        None => Err(ActionError::not_found("recipe", "Recipe doesn't exist")),
    }
}

pub async fn list_recipe_ingredients(
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeIngredient>, ActionError> {
    let rows: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_recipe_detail(
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeDetail>, ActionError> {
    let recipe = match get_recipe(id, pool).await? {
        Some(recipe) => recipe,
        None => return Ok(None),
    };

    let author = get_recipe_author(id, pool).await?;
    let tags = list_recipe_tags(id, pool).await?;
    let ingredients = list_recipe_ingredients(id, pool).await?;

    Ok(Some(RecipeDetail {
        id: recipe.id,
        tags,
        author,
        ingredients,
        name: recipe.name,
        text: recipe.text,
        image: recipe.image,
        cooking_time: recipe.cooking_time,
        pub_date: recipe.pub_date,
    }))
}

/// Attaches the viewer's favorite and cart flags to a detail.
pub async fn view_for(
    detail: RecipeDetail,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, ActionError> {
    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(user_id) => (
            is_related(RelationKind::Favorite, user_id, detail.id, pool).await?,
            is_related(RelationKind::Cart, user_id, detail.id, pool).await?,
        ),
        None => (false, false),
    };

    Ok(RecipeView {
        detail,
        is_favorited,
        is_in_shopping_cart,
    })
}

pub async fn get_recipe_view(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, ActionError> {
    let detail = get_recipe_detail(id, pool)
        .await?
        .ok_or_else(|| ActionError::not_found("recipe", "Recipe doesn't exist"))?;

    view_for(detail, viewer, pool).await
}

/// Newest first. Favorite and cart filters match nothing for anonymous viewers.
pub async fn list_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShortRecipeView>, ActionError> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.id, r.name, r.image, r.cooking_time FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query_builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }

    for (enabled, kind) in [
        (filter.is_favorited, RelationKind::Favorite),
        (filter.is_in_shopping_cart, RelationKind::Cart),
    ] {
        if !enabled {
            continue;
        }

        match viewer {
            Some(user_id) => {
                query_builder
                    .push(format!(
                        " AND EXISTS (SELECT 1 FROM {} e WHERE e.recipe_id = r.id AND e.user_id = ",
                        kind.table()
                    ))
                    .push_bind(user_id)
                    .push(")");
            }
            None => return Ok(vec![]),
        }
    }

    query_builder.push(" ORDER BY r.id DESC");

    let rows: Vec<ShortRecipeView> = query_builder.build_query_as().fetch_all(pool).await?;

    Ok(rows)
}

pub async fn delete_recipe(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    let recipe = get_recipe_mut(id, session, pool).await?;

    // tag links, ingredient rows, favorites and carts cascade
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(pool)
        .await?;

    log::info!("> Deleted recipe {} ({})", recipe.name, recipe.id);
    Ok(())
}

pub(crate) async fn insert_recipe(
    author_id: Option<Id>,
    name: &str,
    image: &str,
    text: &str,
    cooking_time: i32,
    conn: &mut PgConnection,
) -> Result<Id, sqlx::Error> {
    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(name)
    .bind(image)
    .bind(text)
    .bind(cooking_time)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id.0)
}

/// Takes a row lock so concurrent replacements of the same recipe serialize.
pub(crate) async fn lock_recipe(id: Id, conn: &mut PgConnection) -> Result<bool, sqlx::Error> {
    let row: Option<(Id,)> = sqlx::query_as("SELECT id FROM recipes WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.is_some())
}

pub(crate) async fn update_recipe_info(
    id: Id,
    name: &str,
    image: Option<&str>,
    text: &str,
    cooking_time: i32,
    conn: &mut PgConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "
        UPDATE recipes
        SET name = $1, image = COALESCE($2, image), text = $3, cooking_time = $4
        WHERE id = $5
    ",
    )
    .bind(name)
    .bind(image)
    .bind(text)
    .bind(cooking_time)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Deletes every ingredient row of the recipe, then inserts `ingredients` in order.
pub(crate) async fn replace_recipe_ingredients(
    recipe_id: Id,
    ingredients: &[IngredientAmount],
    conn: &mut PgConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    if ingredients.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
    );

    query_builder.push_values(ingredients.iter(), |mut b, ingredient| {
        b.push_bind(recipe_id)
            .push_bind(ingredient.id)
            .push_bind(ingredient.amount);
    });

    query_builder.build().execute(&mut *conn).await?;

    Ok(())
}
