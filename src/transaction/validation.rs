/// Stateless field checks run before a transaction is signed or submitted
use crate::error::ChainError;
use crate::transaction::types::Transaction;

impl Transaction {
    /// Rejects transactions the ledger would refuse anyway. Balance checks are
    /// the ledger's business and are not attempted here.
    pub fn validate_fields(&self) -> Result<(), ChainError> {
        if self.sender.trim().is_empty() {
            return Err(ChainError::Validation("sender address is empty".to_string()));
        }
        if self.recipient.trim().is_empty() {
            return Err(ChainError::Validation(
                "recipient address is empty".to_string(),
            ));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ChainError::Validation(format!(
                "amount must be a positive number, got {}",
                self.amount
            )));
        }
        if !self.fee.is_finite() || self.fee < 0.0 {
            return Err(ChainError::Validation(format!(
                "fee must be a non-negative number, got {}",
                self.fee
            )));
        }
        Ok(())
    }
}
