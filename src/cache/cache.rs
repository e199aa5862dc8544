use std::{fmt, future::Future};

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    actions::{
        create_recipe, create_tag, delete_recipe, delete_user, get_recipe_detail, list_tags,
        update_recipe, view_for,
    },
    constants::{CATALOG_CACHE_KEY, RECIPE_CACHE_KEY},
    error::{ActionError, CacheError},
    schema::{Id, RecipeDetail, RecipePayload, RecipeView, Tag},
    session::SessionData,
};

// Caching - keys

#[derive(Serialize, Clone, Debug)]
pub struct CacheKey<T: ToString + Serialize> {
    _value: T,
    _type: CacheKeyType,
}

impl<T: ToString + Serialize> CacheKey<T> {
    pub fn from(r#type: CacheKeyType, key: T) -> Self {
        Self {
            _value: key,
            _type: r#type,
        }
    }
}

impl<T: ToString + Serialize> fmt::Display for CacheKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self._type {
            CacheKeyType::Recipe => write!(f, "recipe-{}", self._value.to_string()),
            CacheKeyType::Catalog => write!(f, "catalog-{}", self._value.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheKeyType {
    Recipe,
    Catalog,
}

impl CacheKeyType {
    pub fn new<T: ToString + Serialize>(self, key: T) -> CacheKey<T> {
        CacheKey::from(self, key)
    }

    /// The generation key every entry of this type is bound to.
    pub fn bind_key(&self) -> &'static str {
        match self {
            CacheKeyType::Recipe => RECIPE_CACHE_KEY,
            CacheKeyType::Catalog => CATALOG_CACHE_KEY,
        }
    }
}

/// Writes that make cached entries stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheWrite {
    Recipe,
    Tag,
    /// Clears the author of every recipe the user wrote.
    UserDeletion,
}

impl CacheWrite {
    pub fn stale_kinds(&self) -> &'static [CacheKeyType] {
        match self {
            CacheWrite::Recipe => &[CacheKeyType::Recipe],
            CacheWrite::Tag => &[CacheKeyType::Catalog],
            CacheWrite::UserDeletion => &[CacheKeyType::Recipe],
        }
    }
}

// Cache - wrappers

/// A cached value together with the generation it was written under.
#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone, Debug)]
pub struct RedisValue<T: Serialize + Send + Sync + Clone> {
    pub value: T,
    _bind: Option<String>,
}

impl<T> RedisValue<T>
where
    T: Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>,
{
    fn is_current(&self, bind: &Option<String>) -> bool {
        &self._bind == bind
    }

    /// Returns the cached value when its generation is current, otherwise
    /// runs `callback` and stores the result. Cache failures are logged and
    /// never fail the lookup.
    pub async fn get_or_optional<K, F, Fut>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<Option<T>, ActionError>
    where
        K: ToString + Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, ActionError>>,
    {
        let name = key.to_string();
        let bind = match get_cache_value::<&str, String>(key._type.bind_key(), cache).await {
            Ok(bind) => bind,
            Err(e) => {
                log::error!("> Failed to read cache generation: {e}");
                return callback().await;
            }
        };

        match get_cache_value::<&str, RedisValue<T>>(&name, cache).await {
            Ok(Some(value)) if value.is_current(&bind) => {
                log::trace!("> Found {name}");
                return Ok(Some(value.value));
            }
            Ok(Some(_)) => log::trace!("> Invalidated {name}"),
            Ok(None) => {}
            Err(e) => {
                log::error!("> Failed to deserialize cached value. Deleting {name} ({e})");
                if let Err(e) = delete_cache_value(&name, cache).await {
                    log::error!("> Failed to delete cached value! {e}");
                }
            }
        }

        log::trace!("> Fetching {name}");
        let value = callback().await?;

        if let Some(value) = &value {
            let entry = RedisValue {
                value: value.clone(),
                _bind: bind,
            };
            if let Err(e) = set_cache_value(&name, entry, cache).await {
                log::error!("> Failed to store {name}: {e}");
            }
        }

        Ok(value)
    }

    pub async fn get_or<K, F, Fut>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<T, ActionError>
    where
        K: ToString + Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ActionError>>,
    {
        let value = Self::get_or_optional(key, cache, || async move {
            callback().await.map(Some)
        })
        .await?;

        value.ok_or_else(|| ActionError::not_found("cache", "Value vanished from cache"))
    }
}

/// Rotates the generation of `kind`, so every entry written before becomes stale.
pub async fn invalidate_cache(
    kind: CacheKeyType,
    cache: &mut MultiplexedConnection,
) -> Result<(), CacheError> {
    let generation = Uuid::new_v4().to_string();
    set_cache_value(kind.bind_key(), generation, cache).await?;

    log::debug!("> Rotated {}", kind.bind_key());
    Ok(())
}

pub async fn invalidate_recipe_cache(cache: &mut MultiplexedConnection) -> Result<(), CacheError> {
    invalidate_cache(CacheKeyType::Recipe, cache).await
}

async fn rotate_after_write(write: CacheWrite, cache: &mut MultiplexedConnection) {
    for kind in write.stale_kinds() {
        if let Err(e) = invalidate_cache(*kind, cache).await {
            log::error!("> Failed to invalidate {kind:?} cache after {write:?} write: {e}");
        }
    }
}

pub async fn create_recipe_cached(
    session: &SessionData,
    payload: &RecipePayload,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<RecipeView, ActionError> {
    let view = create_recipe(session, payload, pool).await?;
    rotate_after_write(CacheWrite::Recipe, cache).await;

    Ok(view)
}

pub async fn update_recipe_cached(
    id: Id,
    session: &SessionData,
    payload: &RecipePayload,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<RecipeView, ActionError> {
    let view = update_recipe(id, session, payload, pool).await?;
    rotate_after_write(CacheWrite::Recipe, cache).await;

    Ok(view)
}

pub async fn delete_recipe_cached(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<(), ActionError> {
    delete_recipe(id, session, pool).await?;
    rotate_after_write(CacheWrite::Recipe, cache).await;

    Ok(())
}

pub async fn create_tag_cached(
    name: &str,
    color: &str,
    slug: &str,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Tag, ActionError> {
    let tag = create_tag(name, color, slug, pool).await?;
    rotate_after_write(CacheWrite::Tag, cache).await;

    Ok(tag)
}

pub async fn delete_user_cached(
    user_id: Id,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<(), ActionError> {
    delete_user(user_id, pool).await?;
    rotate_after_write(CacheWrite::UserDeletion, cache).await;

    Ok(())
}

pub async fn get_recipe_view_cached(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<RecipeView, ActionError> {
    let detail: Option<RecipeDetail> =
        RedisValue::get_or_optional(CacheKeyType::Recipe.new(id), cache, || {
            get_recipe_detail(id, pool)
        })
        .await?;

    match detail {
        Some(detail) => view_for(detail, viewer, pool).await,
        None => Err(ActionError::not_found("recipe", "Recipe doesn't exist")),
    }
}

pub async fn list_tags_cached(
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Vec<Tag>, ActionError> {
    RedisValue::get_or(CacheKeyType::Catalog.new("tags"), cache, || list_tags(pool)).await
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), CacheError> {
    let _: () = cache.set(key, value).await?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), CacheError> {
    let _: () = cache.del(key).await?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, CacheError> {
    let value: Option<V> = cache.get(key).await?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_type() {
        assert_eq!(CacheKeyType::Recipe.new(42).to_string(), "recipe-42");
        assert_eq!(CacheKeyType::Catalog.new("tags").to_string(), "catalog-tags");
    }

    #[test]
    fn each_type_has_its_own_generation() {
        assert_eq!(CacheKeyType::Recipe.bind_key(), "recipe-cache-key");
        assert_eq!(CacheKeyType::Catalog.bind_key(), "catalog-cache-key");
    }

    #[test]
    fn writes_rotate_the_generations_they_stale() {
        assert_eq!(CacheWrite::Recipe.stale_kinds(), &[CacheKeyType::Recipe]);
        assert_eq!(CacheWrite::Tag.stale_kinds(), &[CacheKeyType::Catalog]);
        // a deleted author is embedded in cached recipe details
        assert_eq!(CacheWrite::UserDeletion.stale_kinds(), &[CacheKeyType::Recipe]);
    }

    #[test]
    fn stale_generations_are_rejected() {
        let value = RedisValue {
            value: vec![1, 2, 3],
            _bind: Some(String::from("a")),
        };

        assert!(value.is_current(&Some(String::from("a"))));
        assert!(!value.is_current(&Some(String::from("b"))));
        assert!(!value.is_current(&None));
    }
}
