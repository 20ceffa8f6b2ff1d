use std::future::Future;

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{INGREDIENT_CACHE_BIND, TAG_CACHE_BIND},
    error::CacheError,
};

// Caching - keys

#[derive(Serialize, ToRedisArgs, FromRedisValue, Clone, Debug)]
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

    pub fn to_string(&self) -> String {
        self.into()
    }
}

impl<T: ToString + Serialize> From<&CacheKey<T>> for String {
    fn from(key: &CacheKey<T>) -> Self {
        match key._type {
            CacheKeyType::Tag => format!("tag-{}", key._value.to_string()),
            CacheKeyType::Ingredient => format!("ingredient-{}", key._value.to_string()),
            CacheKeyType::IngredientSearch => {
                format!("ingredient-search-{}", key._value.to_string())
            }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum CacheKeyType {
    Tag,
    Ingredient,
    IngredientSearch,
}

impl CacheKeyType {
    pub fn new<T: ToString + Serialize>(self, key: T) -> CacheKey<T> {
        CacheKey::from(self, key)
    }
}

impl<T: ToString + Serialize> From<CacheKey<T>> for CacheLifetime {
    fn from(key: CacheKey<T>) -> Self {
        match key._type {
            CacheKeyType::Tag => CacheLifetime::BindTagCache,
            CacheKeyType::Ingredient | CacheKeyType::IngredientSearch => {
                CacheLifetime::BindIngredientCache
            }
        }
    }
}

// Cache - wrappers

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum CacheLifetime {
    BindTagCache,
    BindIngredientCache,
}

impl CacheLifetime {
    pub async fn get_cache_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<String>, potion::Error> {
        match self {
            CacheLifetime::BindTagCache => {
                get_cache_value::<&str, String>(TAG_CACHE_BIND, cache).await
            }
            CacheLifetime::BindIngredientCache => {
                get_cache_value::<&str, String>(INGREDIENT_CACHE_BIND, cache).await
            }
        }
    }

    pub async fn validate_cache_bind(
        &self,
        bind: &Option<String>,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, potion::Error> {
        Ok(bind == &self.get_cache_bind(cache).await?)
    }
}

#[derive(Serialize, serde::Deserialize, FromRedisValue, ToRedisArgs, Clone)]
pub struct RedisValue<T: serde::Serialize + Send + Sync + Clone> {
    pub value: T,
    _lifetime: CacheLifetime,
    _bind: Option<String>,
}

impl<T: serde::Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>> RedisValue<T> {
    async fn validate(&self, cache: &mut MultiplexedConnection) -> Result<bool, potion::Error> {
        self._lifetime
            .validate_cache_bind(&self._bind, cache)
            .await
    }

    /// Looks up `key`, treating undecodable entries as misses and evicting them in the background.
    /// An unreadable bind is a miss as well.
    async fn lookup<K>(key: &CacheKey<K>, cache: &mut MultiplexedConnection) -> Option<Self>
    where
        K: ToString + Serialize + Clone + Send + Sync,
        Self: FromRedisValue,
    {
        let value = get_cache_value::<String, Self>(key.into(), cache)
            .await
            .unwrap_or_else(|_| {
                let mut c = cache.clone();
                let k = key.to_string();
                tokio::spawn(async move {
                    log::error!("> Failed to read cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {:?}", e.info);
                    }
                });
                None
            });

        // * Cannot use .map(|| {...}) due to async closures
        match value {
            Some(value) => {
                log::trace!("> Found {:?}", key.to_string());
                match value.validate(cache).await {
                    Ok(true) => Some(value),
                    Ok(false) => {
                        log::trace!("> Invalidated {}", key.to_string());
                        None
                    }
                    Err(e) => {
                        log::warn!("> Failed to read the bind of {}: {:?}", key.to_string(), e.info);
                        None
                    }
                }
            }
            None => None,
        }
    }

    /// Caches `value` under the current bind; without a readable bind it is only passed back.
    async fn store<K>(key: &CacheKey<K>, value: T, cache: &mut MultiplexedConnection) -> Self
    where
        K: ToString + Serialize + Clone + Send + Sync,
        Self: ToRedisArgs,
    {
        let lifetime: CacheLifetime = key.to_owned().into();
        let bind = match lifetime.get_cache_bind(cache).await {
            Ok(bind) => bind,
            Err(e) => {
                log::warn!("> Not caching {}, bind unavailable: {:?}", key.to_string(), e.info);
                return Self {
                    value,
                    _lifetime: lifetime,
                    _bind: None,
                };
            }
        };

        let value = Self {
            value,
            _lifetime: lifetime,
            _bind: bind,
        };
        if let Err(e) = set_cache_value::<String, Self>(key.into(), value.clone(), cache).await {
            log::error!("> Failed to cache {}: {:?}", key.to_string(), e.info);
        }

        value
    }

    pub async fn get_or_optional<F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<Option<RedisValue<T>>, potion::Error>
    where
        Self: FromRedisValue + ToRedisArgs,
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<T>, potion::Error>> + Send,
    {
        if let Some(value) = Self::lookup(&key, cache).await {
            return Ok(Some(value));
        }

        log::trace!("> Fetching {:?}", key.to_string());
        match callback().await? {
            Some(value) => Ok(Some(Self::store(&key, value, cache).await)),
            None => Ok(None),
        }
    }

    pub async fn get_or_list<F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<RedisValue<Vec<T>>, potion::Error>
    where
        RedisValue<Vec<T>>: FromRedisValue + ToRedisArgs,
        Vec<T>: serde::Serialize + Send + Sync,
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<T>, potion::Error>> + Send,
    {
        if let Some(value) = RedisValue::<Vec<T>>::lookup(&key, cache).await {
            return Ok(value);
        }

        log::trace!("> Fetching {:?}", key.to_string());
        let value = callback().await?;
        Ok(RedisValue::<Vec<T>>::store(&key, value, cache).await)
    }
}

/// Optional redis backend; every lookup falls through to the database when it is missing or down.
#[derive(Clone, Default)]
pub struct Cache {
    connection: Option<MultiplexedConnection>,
}

impl Cache {
    /// Opens the connection every request shares. An unreachable server leaves the cache disabled.
    pub async fn connect(url: &str) -> Self {
        let connection = match redis::Client::open(url) {
            Ok(client) => client.get_multiplexed_async_connection().await,
            Err(e) => Err(e),
        };

        match connection {
            Ok(connection) => {
                log::info!("Connected to the cache");
                Self {
                    connection: Some(connection),
                }
            }
            Err(e) => {
                log::warn!("Cache unavailable, serving uncached: {e}");
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { connection: None }
    }

    pub fn connection(&self) -> Option<MultiplexedConnection> {
        self.connection.clone()
    }

    pub async fn list<T, K, F, Fut>(&self, key: CacheKey<K>, callback: F) -> Result<Vec<T>, potion::Error>
    where
        T: serde::Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>,
        RedisValue<Vec<T>>: FromRedisValue + ToRedisArgs,
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<T>, potion::Error>> + Send,
    {
        match self.connection() {
            Some(mut connection) => RedisValue::<T>::get_or_list(key, &mut connection, callback)
                .await
                .map(|value| value.value),
            None => callback().await,
        }
    }

    pub async fn optional<T, K, F, Fut>(
        &self,
        key: CacheKey<K>,
        callback: F,
    ) -> Result<Option<T>, potion::Error>
    where
        T: serde::Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>,
        RedisValue<T>: FromRedisValue + ToRedisArgs,
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<T>, potion::Error>> + Send,
    {
        match self.connection() {
            Some(mut connection) => {
                RedisValue::<T>::get_or_optional(key, &mut connection, callback)
                    .await
                    .map(|value| value.map(|value| value.value))
            }
            None => callback().await,
        }
    }
}

/// Points `bind` at a fresh value, invalidating every entry created under the old one.
pub async fn rotate_cache_bind(
    bind: &str,
    cache: &mut MultiplexedConnection,
) -> Result<String, potion::Error> {
    let value = uuid::Uuid::new_v4().to_string();
    set_cache_value::<&str, &str>(bind, &value, cache).await?;
    log::info!("Rotated cache bind {bind}");

    Ok(value)
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), potion::Error> {
    let _: () = cache
        .set(key, value)
        .await
        .map_err(CacheError::from)?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), potion::Error> {
    let _: () = cache
        .del(key)
        .await
        .map_err(CacheError::from)?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, potion::Error> {
    let value: Option<V> = cache
        .get(key)
        .await
        .map_err(CacheError::from)?;

    Ok(value)
}
