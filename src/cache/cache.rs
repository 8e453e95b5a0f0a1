use std::fmt::{self, Display};
use std::future::Future;

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};

use crate::database::error::{CacheError, Error};

/// Keys for the read-through cache. Only the immutable catalog lists are
/// cached; recipe and ledger data always hit storage.
#[derive(Clone, Copy, Debug)]
pub enum CacheKey {
    IngredientCatalog,
    TagCatalog,
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::IngredientCatalog => write!(f, "catalog-ingredients"),
            CacheKey::TagCatalog => write!(f, "catalog-tags"),
        }
    }
}

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone)]
struct CachedList<T>(Vec<T>);

/// Returns the cached list under `key`, falling back to `callback` and
/// storing its result. A value that fails to deserialize is dropped from
/// the cache and refetched.
pub async fn get_or_list<T, F, Fut>(
    key: CacheKey,
    cache: &mut MultiplexedConnection,
    callback: F,
) -> Result<Vec<T>, Error>
where
    T: Serialize + for<'a> Deserialize<'a> + Clone + Send + Sync,
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = Result<Vec<T>, Error>> + Send,
{
    match get_cache_value::<String, CachedList<T>>(key.to_string(), cache).await {
        Ok(Some(value)) => {
            log::trace!("> Found {key}");
            return Ok(value.0);
        }
        Ok(None) => {}
        Err(e) => {
            log::error!("> Failed to read cached value for {key}: {e}");
            if let Err(e) = delete_cache_value(key.to_string(), cache).await {
                log::error!("> Failed to delete cached value! {e}");
            }
        }
    }

    log::trace!("> Fetching {key}");
    let value = callback().await?;

    if let Err(e) = set_cache_value(key.to_string(), CachedList(value.clone()), cache).await {
        log::error!("> Failed to store {key}: {e}");
    }

    Ok(value)
}

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache
        .set(key, value)
        .await
        .map_err(|e| Error::from(CacheError::from(e)))?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache
        .del(key)
        .await
        .map_err(|e| Error::from(CacheError::from(e)))?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, Error> {
    let value: Option<V> = cache
        .get(key)
        .await
        .map_err(|e| Error::from(CacheError::from(e)))?;

    Ok(value)
}
