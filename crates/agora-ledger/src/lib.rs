//! Funds ledger: every movement against a wallet is one atomic operation
//! that mutates the wallet record and appends immutable transaction rows.
//! Replaying an agent's rows from zero reproduces its balance and escrow.

use std::sync::Arc;

use uuid::Uuid;

use agora_store::WalletStore;
use agora_types::{AgoraError, Result, Transaction, TransactionKind, Wallet};

/// Service wrapper over the wallet store implementing the five ledger
/// operations: fund, escrow, release, reward, slash.
#[derive(Clone)]
pub struct FundsLedger {
    wallets: Arc<dyn WalletStore>,
}

impl FundsLedger {
    pub fn new(wallets: Arc<dyn WalletStore>) -> Self {
        Self { wallets }
    }

    async fn wallet(&self, agent_id: Uuid) -> Result<Wallet> {
        self.wallets
            .get_wallet(agent_id)
            .await?
            .ok_or(AgoraError::WalletNotFound(agent_id))
    }

    /// Credit spendable balance from outside the economy.
    pub async fn fund(&self, agent_id: Uuid, amount: i64) -> Result<Wallet> {
        if amount <= 0 {
            return Err(AgoraError::InvalidAmount(amount));
        }
        let mut wallet = self.wallet(agent_id).await?;
        wallet.balance += amount;
        self.wallets.update_wallet(wallet.clone()).await?;
        self.wallets
            .append_transaction(Transaction::new(
                agent_id,
                TransactionKind::Funding,
                amount,
                None,
                "funding credit",
            ))
            .await?;
        tracing::debug!(%agent_id, amount, "wallet funded");
        Ok(wallet)
    }

    /// Reserve a task deposit: balance -> escrow.
    pub async fn escrow_deposit(&self, agent_id: Uuid, task_id: Uuid, amount: i64) -> Result<Wallet> {
        if amount <= 0 {
            return Err(AgoraError::InvalidAmount(amount));
        }
        let mut wallet = self.wallet(agent_id).await?;
        if wallet.balance < amount {
            return Err(AgoraError::InsufficientFunds {
                required: amount,
                available: wallet.balance,
            });
        }
        wallet.balance -= amount;
        wallet.escrowed += amount;
        self.wallets.update_wallet(wallet.clone()).await?;
        self.wallets
            .append_transaction(Transaction::new(
                agent_id,
                TransactionKind::Deposit,
                -amount,
                Some(task_id),
                "deposit escrowed",
            ))
            .await?;
        Ok(wallet)
    }

    /// Return an escrowed deposit after a successful task.
    pub async fn release_deposit(&self, agent_id: Uuid, task_id: Uuid, amount: i64) -> Result<Wallet> {
        if amount <= 0 {
            return Err(AgoraError::InvalidAmount(amount));
        }
        let mut wallet = self.wallet(agent_id).await?;
        wallet.escrowed -= amount;
        wallet.balance += amount;
        self.wallets.update_wallet(wallet.clone()).await?;
        self.wallets
            .append_transaction(Transaction::new(
                agent_id,
                TransactionKind::Refund,
                amount,
                Some(task_id),
                "deposit released",
            ))
            .await?;
        Ok(wallet)
    }

    /// Credit a task reward; counts toward lifetime earnings.
    pub async fn pay_reward(&self, agent_id: Uuid, task_id: Uuid, amount: i64) -> Result<Wallet> {
        if amount <= 0 {
            return Err(AgoraError::InvalidAmount(amount));
        }
        let mut wallet = self.wallet(agent_id).await?;
        wallet.balance += amount;
        wallet.total_earned += amount;
        self.wallets.update_wallet(wallet.clone()).await?;
        self.wallets
            .append_transaction(Transaction::new(
                agent_id,
                TransactionKind::Reward,
                amount,
                Some(task_id),
                "task reward",
            ))
            .await?;
        Ok(wallet)
    }

    /// Forfeit part of an escrowed deposit on failure. Two rows: a slash
    /// debit for the burned portion and a refund credit for the rest.
    /// `slash = deposit * slash_percent / 100`, truncating.
    ///
    /// Callers must follow up with the archival check: an agent whose
    /// balance and escrow both hit zero here is archived.
    pub async fn slash_deposit(
        &self,
        agent_id: Uuid,
        task_id: Uuid,
        deposit: i64,
        slash_percent: u8,
    ) -> Result<Wallet> {
        if deposit <= 0 {
            return Err(AgoraError::InvalidAmount(deposit));
        }
        let slash = deposit * i64::from(slash_percent) / 100;
        let remainder = deposit - slash;

        let mut wallet = self.wallet(agent_id).await?;
        wallet.escrowed -= deposit;
        wallet.balance += remainder;
        wallet.total_spent += slash;
        self.wallets.update_wallet(wallet.clone()).await?;

        self.wallets
            .append_transaction(Transaction::new(
                agent_id,
                TransactionKind::Slash,
                -slash,
                Some(task_id),
                format!("deposit slashed {slash_percent}%"),
            ))
            .await?;
        self.wallets
            .append_transaction(Transaction::new(
                agent_id,
                TransactionKind::Refund,
                remainder,
                Some(task_id),
                "slash remainder returned",
            ))
            .await?;
        tracing::debug!(%agent_id, %task_id, slash, remainder, "deposit slashed");
        Ok(wallet)
    }

    /// Whether the agent's funds are fully drained (archival trigger).
    pub async fn is_broke(&self, agent_id: Uuid) -> Result<bool> {
        Ok(self.wallet(agent_id).await?.is_empty())
    }

    /// Replay all of an agent's transaction rows from zero. Used by tests
    /// and audits to confirm the wallet record matches its history.
    pub async fn replay(&self, agent_id: Uuid) -> Result<(i64, i64)> {
        let rows = self.wallets.transactions_for(agent_id).await?;
        let (mut balance, mut escrowed) = (0i64, 0i64);
        for row in &rows {
            row.apply(&mut balance, &mut escrowed);
        }
        Ok((balance, escrowed))
    }
}
