//! Account subscriptions with scoped release
//!
//! An administrative invocation keeps a live view of the accounts it touches
//! (global state, the market being configured) for the duration of the
//! operation. [`SubscriptionGuard`] ties that view to a scope: it is released
//! exactly once, whether the operation succeeds, fails, or unwinds.

use crate::{error::Result, rpc::ChainRpc};
use anchor_client::solana_sdk::commitment_config::CommitmentConfig;
use anchor_client::solana_sdk::pubkey::Pubkey;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Live view over a fixed set of accounts
#[async_trait]
pub trait AccountSubscriber: Send + Sync {
    /// Start tracking; the first snapshot is available when this returns
    async fn subscribe(&mut self) -> Result<()>;

    /// Stop tracking and drop cached data
    fn unsubscribe(&mut self);

    /// Most recent data for a tracked account
    fn snapshot(&self, address: &Pubkey) -> Option<Vec<u8>>;
}

type AccountMap = HashMap<Pubkey, Vec<u8>>;
type AccountCache = Arc<RwLock<AccountMap>>;

// Entries are replaced whole, so data behind a poisoned lock is still valid.
fn read_cache(cache: &RwLock<AccountMap>) -> RwLockReadGuard<'_, AccountMap> {
    cache.read().unwrap_or_else(|poisoned| {
        warn!("Account cache lock poisoned; reading recovered data");
        poisoned.into_inner()
    })
}

fn write_cache(cache: &RwLock<AccountMap>) -> RwLockWriteGuard<'_, AccountMap> {
    cache.write().unwrap_or_else(|poisoned| {
        warn!("Account cache lock poisoned; writing over recovered data");
        poisoned.into_inner()
    })
}

/// Subscriber that refreshes its accounts by polling `getMultipleAccounts`
pub struct PollingAccountSubscriber<R: ChainRpc + 'static> {
    rpc: Arc<R>,
    accounts: Vec<Pubkey>,
    commitment: CommitmentConfig,
    interval: Duration,
    cache: AccountCache,
    task: Option<JoinHandle<()>>,
}

impl<R: ChainRpc + 'static> PollingAccountSubscriber<R> {
    pub fn new(
        rpc: Arc<R>,
        accounts: Vec<Pubkey>,
        commitment: CommitmentConfig,
        interval: Duration,
    ) -> Self {
        Self {
            rpc,
            accounts,
            commitment,
            interval,
            cache: Arc::new(RwLock::new(HashMap::new())),
            task: None,
        }
    }

    #[must_use]
    pub fn accounts(&self) -> &[Pubkey] {
        &self.accounts
    }

    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        self.task.is_some()
    }

    async fn refresh(
        rpc: &R,
        accounts: &[Pubkey],
        commitment: CommitmentConfig,
        cache: &AccountCache,
    ) -> Result<()> {
        let fetched = rpc.multiple_account_data(accounts, commitment).await?;
        let mut cache = write_cache(cache);
        for (address, data) in accounts.iter().zip(fetched) {
            match data {
                Some(data) => {
                    cache.insert(*address, data);
                }
                None => {
                    cache.remove(address);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<R: ChainRpc + 'static> AccountSubscriber for PollingAccountSubscriber<R> {
    async fn subscribe(&mut self) -> Result<()> {
        if self.task.is_some() {
            return Ok(());
        }

        Self::refresh(&self.rpc, &self.accounts, self.commitment, &self.cache).await?;

        let rpc = Arc::clone(&self.rpc);
        let accounts = self.accounts.clone();
        let cache = Arc::clone(&self.cache);
        let commitment = self.commitment;
        let interval = self.interval;

        self.task = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(e) = Self::refresh(&rpc, &accounts, commitment, &cache).await {
                    warn!(error = %e, "Account refresh failed");
                }
            }
        }));

        debug!(accounts = self.accounts.len(), "Subscribed to accounts");
        Ok(())
    }

    fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(accounts = self.accounts.len(), "Unsubscribed from accounts");
        }
        write_cache(&self.cache).clear();
    }

    fn snapshot(&self, address: &Pubkey) -> Option<Vec<u8>> {
        read_cache(&self.cache).get(address).cloned()
    }
}

impl<R: ChainRpc + 'static> Drop for PollingAccountSubscriber<R> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Scoped ownership of a subscription
///
/// Dropping the guard releases the subscription if [`SubscriptionGuard::release`]
/// was not called; either way the subscriber sees exactly one `unsubscribe`.
pub struct SubscriptionGuard<S: AccountSubscriber> {
    subscriber: S,
    released: bool,
}

impl<S: AccountSubscriber> SubscriptionGuard<S> {
    /// Subscribe and take ownership of the subscription
    ///
    /// # Errors
    /// Returns the subscribe error after releasing whatever was acquired
    pub async fn acquire(mut subscriber: S) -> Result<Self> {
        if let Err(e) = subscriber.subscribe().await {
            subscriber.unsubscribe();
            return Err(e);
        }
        Ok(Self {
            subscriber,
            released: false,
        })
    }

    #[must_use]
    pub const fn subscriber(&self) -> &S {
        &self.subscriber
    }

    /// Release now instead of at end of scope
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.subscriber.unsubscribe();
        }
    }
}

impl<S: AccountSubscriber> Drop for SubscriptionGuard<S> {
    fn drop(&mut self) {
        self.release_once();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpsError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        unsubscribes: Arc<AtomicUsize>,
        fail_subscribe: bool,
    }

    #[async_trait]
    impl AccountSubscriber for Counting {
        async fn subscribe(&mut self) -> Result<()> {
            if self.fail_subscribe {
                return Err(OpsError::Rpc("connection refused".to_string()));
            }
            Ok(())
        }

        fn unsubscribe(&mut self) {
            self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        }

        fn snapshot(&self, _: &Pubkey) -> Option<Vec<u8>> {
            None
        }
    }

    #[tokio::test]
    async fn test_guard_releases_once_on_drop() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let _guard = SubscriptionGuard::acquire(Counting {
                unsubscribes: Arc::clone(&counter),
                fail_subscribe: false,
            })
            .await
            .unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_explicit_release_is_not_repeated_by_drop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let guard = SubscriptionGuard::acquire(Counting {
            unsubscribes: Arc::clone(&counter),
            fail_subscribe: false,
        })
        .await
        .unwrap();
        guard.release();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_subscribe_still_releases() {
        let counter = Arc::new(AtomicUsize::new(0));
        let result = SubscriptionGuard::acquire(Counting {
            unsubscribes: Arc::clone(&counter),
            fail_subscribe: true,
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_poisoned_cache_still_serves_and_clears() {
        let cache: AccountCache = Arc::new(RwLock::new(HashMap::new()));
        let address = Pubkey::new_unique();
        write_cache(&cache).insert(address, vec![1, 2, 3]);

        let poisoner = Arc::clone(&cache);
        let joined = std::thread::spawn(move || {
            let _guard = poisoner.write().unwrap();
            panic!("writer panicked while holding the cache");
        })
        .join();
        assert!(joined.is_err());
        assert!(cache.is_poisoned());

        assert_eq!(read_cache(&cache).get(&address), Some(&vec![1, 2, 3]));
        write_cache(&cache).clear();
        assert!(read_cache(&cache).is_empty());
    }
}
