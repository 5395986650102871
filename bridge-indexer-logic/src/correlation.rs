use std::sync::Arc;

use bridge_indexer_entity::{bridge_transactions, prelude::BridgeTransactions};
use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, DatabaseConnection, EntityTrait, QuerySelect, SqlErr, TransactionTrait,
};

use crate::{
    merge::{self, TokenDisplay},
    types::DecodedHalf,
};

/// How many kappa races to absorb before surfacing the upsert as transient.
pub const UPSERT_CONFLICT_RETRIES: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("kappa upsert conflicted {0} times")]
    Conflict(u32),
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

impl StoreError {
    /// Store failures are transient from the pipeline's point of view: the
    /// checkpoint is not advanced past the event, so it is reprocessed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Db(_))
    }
}

/// Kappa-indexed transaction store.
///
/// `upsert` merges OUT and IN halves into one record regardless of arrival
/// order. Per-kappa atomicity comes from a row lock inside a transaction;
/// two workers racing to *insert* the same kappa surface as a unique
/// violation, which is retried against the now-existing row.
#[derive(Clone)]
pub struct BridgeDatabase {
    db: Arc<DatabaseConnection>,
}

impl BridgeDatabase {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn get_by_kappa(
        &self,
        kappa: &[u8],
    ) -> Result<Option<bridge_transactions::Model>, StoreError> {
        Ok(BridgeTransactions::find_by_id(kappa.to_vec())
            .one(self.db.as_ref())
            .await?)
    }

    pub async fn upsert(
        &self,
        half: &DecodedHalf,
        display: &TokenDisplay,
    ) -> Result<bridge_transactions::Model, StoreError> {
        let mut conflicts = 0;
        loop {
            match self.try_upsert(half, display).await {
                Err(StoreError::Db(err)) if is_unique_violation(&err) => {
                    conflicts += 1;
                    if conflicts >= UPSERT_CONFLICT_RETRIES {
                        return Err(StoreError::Conflict(conflicts));
                    }
                    tracing::debug!(
                        kappa = %half.kappa(),
                        conflicts,
                        "kappa insert raced with another writer, retrying"
                    );
                }
                other => return other,
            }
        }
    }

    async fn try_upsert(
        &self,
        half: &DecodedHalf,
        display: &TokenDisplay,
    ) -> Result<bridge_transactions::Model, StoreError> {
        let kappa = half.kappa().to_vec();
        let txn = self.db.begin().await?;

        let existing = BridgeTransactions::find_by_id(kappa)
            .lock_exclusive()
            .one(&txn)
            .await?;
        let is_insert = existing.is_none();

        let merged = merge::merge_half(existing, half, display, Utc::now().naive_utc());
        let model = to_active_model(&merged);

        if is_insert {
            BridgeTransactions::insert(model).exec(&txn).await?;
        } else {
            BridgeTransactions::update(model).exec(&txn).await?;
        }
        txn.commit().await?;

        tracing::info!(
            kappa = %half.kappa(),
            pending = merged.pending,
            direction = ?half.direction(),
            "stored transaction half"
        );
        Ok(merged)
    }
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn to_active_model(model: &bridge_transactions::Model) -> bridge_transactions::ActiveModel {
    bridge_transactions::ActiveModel {
        kappa: Set(model.kappa.clone()),
        pending: Set(model.pending),
        from_tx_hash: Set(model.from_tx_hash.clone()),
        to_tx_hash: Set(model.to_tx_hash.clone()),
        from_address: Set(model.from_address.clone()),
        to_address: Set(model.to_address.clone()),
        sent_value: Set(model.sent_value.clone()),
        received_value: Set(model.received_value.clone()),
        sent_token: Set(model.sent_token.clone()),
        received_token: Set(model.received_token.clone()),
        from_chain_id: Set(model.from_chain_id),
        to_chain_id: Set(model.to_chain_id),
        sent_time: Set(model.sent_time),
        received_time: Set(model.received_time),
        swap_success: Set(model.swap_success),
        sent_token_symbol: Set(model.sent_token_symbol.clone()),
        received_token_symbol: Set(model.received_token_symbol.clone()),
        sent_value_formatted: Set(model.sent_value_formatted.clone()),
        received_value_formatted: Set(model.received_value_formatted.clone()),
        created_at: Set(model.created_at),
        updated_at: Set(model.updated_at),
    }
}
