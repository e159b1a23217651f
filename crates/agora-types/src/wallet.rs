use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Funds record, 1:1 with an agent. All amounts are non-negative
/// fixed-point token counts; every mutation to `balance` or `escrowed`
/// is paired with append-only `Transaction` rows so that replaying the
/// rows from zero reproduces both fields exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub agent_id: Uuid,
    pub balance: i64,
    pub escrowed: i64,
    pub total_earned: i64,
    pub total_spent: i64,
}

impl Wallet {
    pub fn new(agent_id: Uuid) -> Self {
        Self {
            agent_id,
            balance: 0,
            escrowed: 0,
            total_earned: 0,
            total_spent: 0,
        }
    }

    /// Spendable funds: escrow is excluded.
    pub fn available(&self) -> i64 {
        self.balance
    }

    /// Both balance and escrow drained; the archival trigger.
    pub fn is_empty(&self) -> bool {
        self.balance == 0 && self.escrowed == 0
    }
}

/// Kind of ledger movement a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Funding,
    Deposit,
    Reward,
    Refund,
    Slash,
}

/// Immutable ledger row. Never updated or deleted outside the
/// administrative full reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub kind: TransactionKind,
    /// Signed: positive credits the balance, negative debits it.
    /// `Deposit` rows move funds into escrow rather than out of the wallet.
    pub amount: i64,
    pub task_id: Option<Uuid>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        agent_id: Uuid,
        kind: TransactionKind,
        amount: i64,
        task_id: Option<Uuid>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            kind,
            amount,
            task_id,
            reason: reason.into(),
            created_at: Utc::now(),
        }
    }

    /// Replay this row against a running (balance, escrowed) pair.
    pub fn apply(&self, balance: &mut i64, escrowed: &mut i64) {
        match self.kind {
            TransactionKind::Funding | TransactionKind::Reward => {
                *balance += self.amount;
            }
            // A deposit debit moves |amount| from balance into escrow.
            TransactionKind::Deposit => {
                *balance += self.amount;
                *escrowed -= self.amount;
            }
            // A refund credit moves |amount| back out of escrow.
            TransactionKind::Refund => {
                *balance += self.amount;
                *escrowed -= self.amount;
            }
            // A slash debit burns funds straight out of escrow.
            TransactionKind::Slash => {
                *escrowed += self.amount;
            }
        }
    }
}
