use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::pricing::service_fee;
use crate::engine::{PaymentError, PaymentGateway};
use crate::model::ChargeReceipt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub bsb: String,
    pub account_number: String,
    pub balance: Decimal,
}

/// Balances held in process: one account per owner plus the system revenue account.
pub struct InMemoryLedger {
    accounts: DashMap<Ulid, BankAccount>,
    revenue: Mutex<Decimal>,
    fee_rate: Decimal,
}

impl InMemoryLedger {
    pub fn new(fee_rate: Decimal) -> Self {
        Self {
            accounts: DashMap::new(),
            revenue: Mutex::new(Decimal::ZERO),
            fee_rate,
        }
    }

    /// Create or update the owner's payout details, keeping any balance.
    pub fn open_account(&self, owner_id: Ulid, bsb: impl Into<String>, account_number: impl Into<String>) {
        let bsb = bsb.into();
        let account_number = account_number.into();
        self.accounts
            .entry(owner_id)
            .and_modify(|a| {
                a.bsb = bsb.clone();
                a.account_number = account_number.clone();
            })
            .or_insert_with(|| BankAccount {
                bsb,
                account_number,
                balance: Decimal::ZERO,
            });
    }

    pub fn close_account(&self, owner_id: Ulid) -> Result<BankAccount, PaymentError> {
        self.accounts
            .remove(&owner_id)
            .map(|(_, a)| a)
            .ok_or(PaymentError::NoAccount(owner_id))
    }

    pub fn account(&self, owner_id: Ulid) -> Option<BankAccount> {
        self.accounts.get(&owner_id).map(|a| a.value().clone())
    }

    pub fn balance(&self, owner_id: Ulid) -> Option<Decimal> {
        self.accounts.get(&owner_id).map(|a| a.balance)
    }

    pub fn revenue_balance(&self) -> Decimal {
        *self.revenue.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PaymentGateway for InMemoryLedger {
    async fn has_payable_account(&self, owner_id: Ulid) -> bool {
        self.accounts.contains_key(&owner_id)
    }

    async fn charge(
        &self,
        owner_id: Ulid,
        amount: Decimal,
        waive_fee: bool,
    ) -> Result<ChargeReceipt, PaymentError> {
        let mut account = self
            .accounts
            .get_mut(&owner_id)
            .ok_or(PaymentError::NoAccount(owner_id))?;
        let fee = if waive_fee {
            Decimal::ZERO
        } else {
            service_fee(amount, self.fee_rate)
        };
        account.balance += amount;
        if !fee.is_zero() {
            *self.revenue.lock().unwrap_or_else(|e| e.into_inner()) += fee;
        }
        Ok(ChargeReceipt {
            owner_id,
            amount,
            service_fee: fee,
            fee_waived: waive_fee,
        })
    }
}
