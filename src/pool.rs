//! Bounded pools of identity-bearing resources.
//!
//! An [`EntityPool`] behaves like a semaphore that hands out concrete values:
//! `take` waits until one of the `total` entities is free and `give_back`
//! makes it available again. Every entity carries an id, and the pool keeps a
//! checked-out flag per id so a value that is not currently out cannot be put
//! back twice.

use crate::error::{Error, PoolError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Semaphore;

/// A pooled resource with a stable identity.
pub trait Entity: Send + Sync + 'static {
    fn id(&self) -> u32;
}

/// Monotonic id source owned by the component that needs distinct ids.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Wraps around to 0 after `u32::MAX`.
    pub fn next_u32(&self) -> u32 {
        self.next() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareResult {
    NotFound,
    ValueChanged,
    Success,
}

pub struct EntityPool<T: Entity> {
    total: u32,
    available: Mutex<VecDeque<T>>,
    permits: Semaphore,
    checked_out: Mutex<HashMap<u32, bool>>,
}

impl<T: Entity> EntityPool<T> {
    /// Builds a pool pre-populated with `total` entities from `factory`.
    pub fn new<F>(total: u32, mut factory: F) -> std::result::Result<Self, PoolError>
    where
        F: FnMut() -> T,
    {
        if total == 0 {
            return Err(PoolError::InvalidSize);
        }

        let mut available = VecDeque::with_capacity(total as usize);
        let mut checked_out = HashMap::with_capacity(total as usize);
        for _ in 0..total {
            let entity = factory();
            if checked_out.insert(entity.id(), false).is_some() {
                return Err(PoolError::DuplicateEntity(entity.id()));
            }
            available.push_back(entity);
        }

        Ok(Self {
            total,
            available: Mutex::new(available),
            permits: Semaphore::new(total as usize),
            checked_out: Mutex::new(checked_out),
        })
    }

    /// Waits for a free entity and marks it checked out.
    pub async fn take(&self) -> std::result::Result<T, PoolError> {
        let permit = self.permits.acquire().await.map_err(|_| PoolError::Closed)?;
        permit.forget();

        let entity = self
            .available
            .lock()
            .pop_front()
            .ok_or(PoolError::Closed)?;
        self.checked_out.lock().insert(entity.id(), true);
        Ok(entity)
    }

    /// Puts a checked-out entity back. Fails without touching the pool if
    /// the id is unknown or the entity is not currently out.
    pub fn give_back(&self, entity: T) -> std::result::Result<(), PoolError> {
        let id = entity.id();
        match self.compare_and_set(id, true, false) {
            CompareResult::Success => {
                self.available.lock().push_back(entity);
                self.permits.add_permits(1);
                Ok(())
            }
            CompareResult::ValueChanged => Err(PoolError::NotCheckedOut(id)),
            CompareResult::NotFound => Err(PoolError::UnknownEntity(id)),
        }
    }

    fn compare_and_set(&self, id: u32, old: bool, new: bool) -> CompareResult {
        let mut checked_out = self.checked_out.lock();
        match checked_out.get_mut(&id) {
            None => CompareResult::NotFound,
            Some(value) if *value != old => CompareResult::ValueChanged,
            Some(value) => {
                *value = new;
                CompareResult::Success
            }
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn used(&self) -> u32 {
        self.total - self.available.lock().len() as u32
    }
}

/// Sizes of the downloader and parser pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolBaseConfig {
    downloader_pool_size: u32,
    parser_pool_size: u32,
}

impl PoolBaseConfig {
    pub fn new(downloader_pool_size: u32, parser_pool_size: u32) -> Self {
        Self {
            downloader_pool_size,
            parser_pool_size,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.downloader_pool_size == 0 {
            return Err(Error::Config(
                "The page downloader pool size can not be 0".to_string(),
            ));
        }
        if self.parser_pool_size == 0 {
            return Err(Error::Config(
                "The page parser pool size can not be 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn downloader_pool_size(&self) -> u32 {
        self.downloader_pool_size
    }

    pub fn parser_pool_size(&self) -> u32 {
        self.parser_pool_size
    }
}

impl fmt::Display for PoolBaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ downloaderPoolSize: {}, parserPoolSize: {} }}",
            self.downloader_pool_size, self.parser_pool_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    struct TestEntity {
        id: u32,
    }

    impl Entity for TestEntity {
        fn id(&self) -> u32 {
            self.id
        }
    }

    fn pool(total: u32) -> EntityPool<TestEntity> {
        let ids = IdGenerator::new();
        EntityPool::new(total, || TestEntity { id: ids.next_u32() }).unwrap()
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let result = EntityPool::new(0, || TestEntity { id: 0 });
        assert!(matches!(result, Err(PoolError::InvalidSize)));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let result = EntityPool::new(3, || TestEntity { id: 7 });
        assert!(matches!(result, Err(PoolError::DuplicateEntity(7))));
    }

    #[tokio::test]
    async fn test_take_until_exhausted_then_block() {
        for total in 1..=5 {
            let pool = Arc::new(pool(total));
            let mut taken = Vec::new();
            for _ in 0..total {
                taken.push(pool.take().await.unwrap());
            }
            assert_eq!(pool.used(), total);

            let blocked = tokio::time::timeout(Duration::from_millis(50), pool.take()).await;
            assert!(blocked.is_err(), "take should block on an exhausted pool");

            let waiter = {
                let pool = pool.clone();
                tokio::spawn(async move { pool.take().await })
            };
            tokio::time::sleep(Duration::from_millis(10)).await;
            pool.give_back(taken.pop().unwrap()).unwrap();

            let entity = tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter should be woken by give_back")
                .unwrap()
                .unwrap();
            assert_eq!(pool.used(), total);
            pool.give_back(entity).unwrap();
        }
    }

    #[tokio::test]
    async fn test_double_return_is_rejected() {
        let pool = pool(2);
        let entity = pool.take().await.unwrap();
        let copy = entity.clone();

        pool.give_back(entity).unwrap();
        assert_eq!(pool.used(), 0);

        let err = pool.give_back(copy).unwrap_err();
        assert_eq!(err, PoolError::NotCheckedOut(0));
        assert_eq!(pool.used(), 0);
    }

    #[tokio::test]
    async fn test_never_taken_entity_is_rejected() {
        let pool = pool(2);
        let _held = pool.take().await.unwrap();

        let err = pool.give_back(TestEntity { id: 1 }).unwrap_err();
        assert_eq!(err, PoolError::NotCheckedOut(1));
        assert_eq!(pool.used(), 1);
    }

    #[tokio::test]
    async fn test_foreign_entity_is_rejected() {
        let pool = pool(2);
        let _held = pool.take().await.unwrap();

        let err = pool.give_back(TestEntity { id: 99 }).unwrap_err();
        assert_eq!(err, PoolError::UnknownEntity(99));
        assert_eq!(pool.used(), 1);
    }

    #[test]
    fn test_pool_base_config_validation() {
        assert!(PoolBaseConfig::new(1, 1).validate().is_ok());
        assert!(PoolBaseConfig::new(0, 1).validate().is_err());
        assert!(PoolBaseConfig::new(1, 0).validate().is_err());
        assert_eq!(
            PoolBaseConfig::new(3, 4).to_string(),
            "{ downloaderPoolSize: 3, parserPoolSize: 4 }"
        );
    }

    #[test]
    fn test_id_generator_is_monotonic() {
        let ids = IdGenerator::new();
        assert_eq!(ids.next(), 0);
        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next_u32(), 2);
    }
}
