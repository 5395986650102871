use sea_orm_migration::prelude::*;

use crate::from_sql;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        from_sql(
            manager,
            r#"
            CREATE TABLE bridge_transactions (
                kappa bytea PRIMARY KEY,
                pending boolean NOT NULL,
                from_tx_hash bytea,
                to_tx_hash bytea,
                from_address bytea,
                to_address bytea NOT NULL,
                sent_value varchar,
                received_value varchar,
                sent_token bytea,
                received_token bytea,
                from_chain_id bigint,
                to_chain_id bigint NOT NULL,
                sent_time bigint,
                received_time bigint,
                swap_success boolean,
                sent_token_symbol varchar,
                received_token_symbol varchar,
                sent_value_formatted numeric(78, 18),
                received_value_formatted numeric(78, 18),
                created_at timestamp NOT NULL DEFAULT (now() at time zone 'utc'),
                updated_at timestamp NOT NULL DEFAULT (now() at time zone 'utc')
            );

            CREATE INDEX bridge_transactions_from_chain_sent_time_idx
                ON bridge_transactions (from_chain_id, sent_time);

            CREATE INDEX bridge_transactions_to_chain_received_time_idx
                ON bridge_transactions (to_chain_id, received_time);
            "#,
        )
        .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        from_sql(manager, "DROP TABLE bridge_transactions;").await
    }
}
