//! Account queries.

use crate::client::Mt5Client;
use crate::error::Result;
use crate::types::RawAccountInfo;
use fx_algo_core::AccountSnapshot;
use tracing::debug;

impl Mt5Client {
    /// Fetch the logged-in account's balance, equity, and free margin.
    ///
    /// # Errors
    /// Returns `account_info failed: ...` when the terminal has no account.
    pub async fn account_info(&self) -> Result<AccountSnapshot> {
        let raw: RawAccountInfo = self
            .call("account_info", "account_info", &serde_json::json!({}))
            .await?;
        let snapshot = AccountSnapshot::try_from(raw)?;

        debug!(
            login = snapshot.login,
            balance = %snapshot.balance,
            equity = %snapshot.equity,
            "Account info retrieved"
        );
        Ok(snapshot)
    }
}
