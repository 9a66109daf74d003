//! Periodic wallet balance refresh.
//!
//! Each poll re-reads the wallet's UTXO set, then its balance, and writes both
//! to the settings store so readers can serve them within their max age.

use std::sync::Arc;

use async_trait::async_trait;

use crate::Error;
use crate::poller::PollJob;
use crate::store::StoreDb;
use crate::wallet::WalletHandle;

pub struct BalanceRefresher {
    wallet: Arc<dyn WalletHandle>,
    store: StoreDb,
}

impl BalanceRefresher {
    pub fn new(wallet: Arc<dyn WalletHandle>, store: StoreDb) -> Self {
        Self { wallet, store }
    }

    /// Refresh once. Returns the balance that was stored.
    pub async fn refresh(&self) -> Result<u64, Error> {
        let address = self.wallet.address();

        let utxos = self.wallet.refresh_utxos().await?;
        self.store.set_cached_utxos(&address, &utxos).await?;

        let balance = self.wallet.balance().await?;
        self.store.set_cached_balance(&address, balance).await?;

        tracing::debug!(address, balance, "wallet balance refreshed");
        Ok(balance)
    }
}

#[async_trait]
impl PollJob for BalanceRefresher {
    async fn poll(&self) -> Result<(), Error> {
        self.refresh().await.map(|_| ())
    }
}
