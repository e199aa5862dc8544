use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ValidationError;

pub type Id = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_type", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

/// The per-user marked-recipe sets. Both share one add/remove contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Favorite,
    Cart,
}

impl RelationKind {
    pub fn table(&self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorites",
            RelationKind::Cart => "carts",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorites",
            RelationKind::Cart => "shopping cart",
        }
    }
}

impl TryFrom<Value> for RelationKind {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some(value) => match value {
                "favorite" => Ok(Self::Favorite),
                "shopping_cart" | "cart" => Ok(Self::Cart),
                _ => Err(ValidationError::new("kind", "Invalid variant")),
            },
            None => Err(ValidationError::new("kind", "Failed to parse value as string")),
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub uid: UserRole,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
}

/// Catalog entry as it arrives from an import file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Id,
    pub author_id: Option<Id>,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeAuthor {
    pub id: Id,
    pub username: String,
}

/// An ingredient row of a recipe, resolved against the catalog.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// The viewer independent part of the read projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDetail {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: Option<RecipeAuthor>,
    pub ingredients: Vec<RecipeIngredient>,
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeView {
    #[serde(flatten)]
    pub detail: RecipeDetail,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortRecipeView {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<Recipe> for ShortRecipeView {
    fn from(value: Recipe) -> Self {
        Self {
            id: value.id,
            name: value.name,
            image: value.image,
            cooking_time: value.cooking_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i32,
}

/// Write payload for creating or replacing a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipePayload {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    #[serde(default)]
    pub image: Option<String>,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientAmount>,
}

impl TryFrom<Value> for RecipePayload {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
            .map_err(|_| ValidationError::new("payload", "Invalid recipe payload"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    /// Tag slugs; a recipe matches when it carries any of them.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorited: bool,
    #[serde(default)]
    pub is_in_shopping_cart: bool,
}

/// One ingredient row reached through a user's cart.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct CartPart {
    pub recipe_id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingListEntry {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}
