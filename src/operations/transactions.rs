//! Budget transactions

use super::{require, MutationIssuer};
use crate::shared::entity::Entity;
use crate::shared::error::{Result, SyncError};
use crate::shared::mutation::{MutationAction, MutationPayload, TransactionPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionKind {
    #[default]
    Expense,
    Income,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Expense => "expense",
            TransactionKind::Income => "income",
        }
    }
}

/// A transaction as entered by the user
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub business_id: Option<String>,
    pub amount: f64,
    pub category: String,
    pub description: Option<String>,
    pub kind: TransactionKind,
}

impl NewTransaction {
    pub fn expense(amount: f64, category: impl Into<String>) -> Self {
        Self {
            business_id: None,
            amount,
            category: category.into(),
            description: None,
            kind: TransactionKind::Expense,
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(SyncError::invalid_input(
                "amount",
                "must be a positive number",
            ));
        }
        require("category", &self.category)
    }
}

#[derive(Debug, Clone)]
pub struct TransactionOps {
    issuer: MutationIssuer,
}

impl TransactionOps {
    pub fn new(issuer: MutationIssuer) -> Self {
        Self { issuer }
    }

    /// Record a budget transaction
    pub async fn add(&self, transaction: NewTransaction) -> Result<Entity> {
        transaction.validate()?;
        let payload = MutationPayload::Transaction(TransactionPayload {
            user_id: self.issuer.user_id().await?,
            business_id: transaction.business_id,
            amount: transaction.amount,
            category: transaction.category,
            description: transaction.description,
            kind: transaction.kind.as_str().to_string(),
        });
        let issued = self.issuer.issue(MutationAction::Create, payload).await?;
        Ok(issued.into_record())
    }
}
