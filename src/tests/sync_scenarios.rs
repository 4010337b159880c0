//! End-to-end sync-pass scenarios against a real primary database.
//!
//! These need a reachable Postgres (PRIMARY_DATABASE_URL) and reset its
//! projection tables, so they are ignored by default:
//! `cargo test -- --ignored` with a database available runs them.

#[cfg(test)]
mod tests {
    use crate::db::{self, connection, investment, redemption, sukuk, system_state, yields};
    use crate::models::{Redemption, YieldEntry};
    use crate::sync::run_sync_pass;
    use crate::config::Config;
    use serde_json::{json, Value};
    use sqlx::PgPool;

    const BATCH_SIZE: i64 = 1000;

    async fn setup() -> PgPool {
        let config = Config::from_env();
        let pool = connection::establish_primary(&config)
            .await
            .expect("primary database must be reachable");

        sqlx::raw_sql(
            r#"TRUNCATE yields, investments, redemptions, sukuks, system_state RESTART IDENTITY CASCADE;
               TRUNCATE blockchain.events RESTART IDENTITY;"#,
        )
        .execute(&pool)
        .await
        .unwrap();

        pool
    }

    async fn insert_event(
        pool: &PgPool,
        event_name: &str,
        tx_hash: &str,
        log_index: i64,
        event_data: Value,
    ) -> i64 {
        sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO blockchain.events
               (event_name, tx_hash, log_index, block_number, block_timestamp,
                contract_address, event_data, chain_id)
               VALUES ($1, $2, $3, 100, now(), '0xcontract', $4, 1)
               RETURNING id"#,
        )
        .bind(event_name)
        .bind(tx_hash)
        .bind(log_index)
        .bind(event_data)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    fn investment_payload(investor: &str, sukuk: &str, amount: &str) -> Value {
        json!({
            "investorAddress": investor,
            "sukukAddress": sukuk,
            "tokenAmount": amount
        })
    }

    #[tokio::test]
    #[ignore = "requires a local Postgres (PRIMARY_DATABASE_URL)"]
    async fn pass_over_empty_log_is_a_noop() {
        let pool = setup().await;

        let outcome = run_sync_pass(&pool, BATCH_SIZE).await.unwrap();

        assert_eq!(outcome.applied, 0);
        assert_eq!(outcome.cursor, None);
        assert_eq!(system_state::get_cursor(&pool).await.unwrap(), 0);
        assert_eq!(investment::count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    #[ignore = "requires a local Postgres (PRIMARY_DATABASE_URL)"]
    async fn single_investment_event_advances_cursor_and_projects_one_row() {
        let pool = setup().await;
        let id = insert_event(
            &pool,
            "InvestmentMade",
            "0xtx1",
            0,
            investment_payload("0xinvestor", "0xsukuk", "1000"),
        )
        .await;

        let outcome = run_sync_pass(&pool, BATCH_SIZE).await.unwrap();

        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.cursor, Some(id));
        assert_eq!(system_state::get_cursor(&pool).await.unwrap(), id);
        assert_eq!(investment::count(&pool).await.unwrap(), 1);

        let rows = investment::for_investor(&pool, "0xinvestor").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sukuk_address, "0xsukuk");
        assert_eq!(rows[0].token_amount, "1000");
        assert_eq!(rows[0].tx_hash, "0xtx1");
    }

    #[tokio::test]
    #[ignore = "requires a local Postgres (PRIMARY_DATABASE_URL)"]
    async fn replayed_investment_event_is_deduplicated() {
        let pool = setup().await;
        let payload = investment_payload("0xinvestor", "0xsukuk", "1000");
        insert_event(&pool, "InvestmentMade", "0xtx1", 0, payload.clone()).await;
        run_sync_pass(&pool, BATCH_SIZE).await.unwrap();

        // Same (tx_hash, log_index) arrives again under a new event id
        let replay_id = insert_event(&pool, "InvestmentMade", "0xtx1", 0, payload).await;
        let outcome = run_sync_pass(&pool, BATCH_SIZE).await.unwrap();

        assert_eq!(outcome.cursor, Some(replay_id));
        assert_eq!(investment::count(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    #[ignore = "requires a local Postgres (PRIMARY_DATABASE_URL)"]
    async fn cursor_is_monotonic_across_passes() {
        let pool = setup().await;
        let mut last_cursor = 0;

        for i in 0..3 {
            insert_event(
                &pool,
                "InvestmentMade",
                &format!("0xtx{}", i),
                0,
                investment_payload("0xinvestor", "0xsukuk", "10"),
            )
            .await;
            run_sync_pass(&pool, BATCH_SIZE).await.unwrap();

            let cursor = system_state::get_cursor(&pool).await.unwrap();
            assert!(cursor >= last_cursor, "cursor moved backwards");
            last_cursor = cursor;
        }
    }

    #[tokio::test]
    #[ignore = "requires a local Postgres (PRIMARY_DATABASE_URL)"]
    async fn unknown_and_malformed_events_are_skipped_but_cursor_advances() {
        let pool = setup().await;
        insert_event(&pool, "SomethingNovel", "0xtx1", 0, json!({})).await;
        // Known name, payload missing required fields
        let bad_id = insert_event(&pool, "InvestmentMade", "0xtx2", 0, json!({"oops": 1})).await;

        let outcome = run_sync_pass(&pool, BATCH_SIZE).await.unwrap();

        assert_eq!(outcome.applied, 1); // the unknown event "applies" as a skip
        assert_eq!(outcome.failed, 1); // the malformed one fails
        assert_eq!(system_state::get_cursor(&pool).await.unwrap(), bad_id);
        assert_eq!(investment::count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    #[ignore = "requires a local Postgres (PRIMARY_DATABASE_URL)"]
    async fn distribution_fans_out_pro_rata_and_claim_settles_range() {
        let pool = setup().await;
        insert_event(
            &pool,
            "InvestmentMade",
            "0xtx1",
            0,
            investment_payload("0xalice", "0xsukuk", "300"),
        )
        .await;
        insert_event(
            &pool,
            "InvestmentMade",
            "0xtx2",
            0,
            investment_payload("0xbob", "0xsukuk", "100"),
        )
        .await;
        insert_event(
            &pool,
            "YieldDistributed",
            "0xtx3",
            0,
            json!({"sukukAddress": "0xsukuk", "distributionId": 1, "totalAmount": "1000"}),
        )
        .await;
        run_sync_pass(&pool, BATCH_SIZE).await.unwrap();

        let alice_yields = yields::for_investor(&pool, "0xalice").await.unwrap();
        let bob_yields = yields::for_investor(&pool, "0xbob").await.unwrap();
        assert_eq!(alice_yields.len(), 1);
        assert_eq!(alice_yields[0].amount, "750");
        assert_eq!(bob_yields[0].amount, "250");
        assert_eq!(alice_yields[0].status, YieldEntry::STATUS_PENDING);

        insert_event(
            &pool,
            "YieldClaimed",
            "0xtx4",
            0,
            json!({
                "investorAddress": "0xalice",
                "sukukAddress": "0xsukuk",
                "fromDistributionId": 1,
                "toDistributionId": 1,
                "claimedAmount": "750"
            }),
        )
        .await;
        run_sync_pass(&pool, BATCH_SIZE).await.unwrap();

        assert_eq!(yields::pending_count(&pool, "0xalice").await.unwrap(), 0);
        assert_eq!(yields::pending_count(&pool, "0xbob").await.unwrap(), 1);
    }

    #[tokio::test]
    #[ignore = "requires a local Postgres (PRIMARY_DATABASE_URL)"]
    async fn failed_event_contributes_no_writes_while_neighbors_commit() {
        let pool = setup().await;
        insert_event(
            &pool,
            "InvestmentMade",
            "0xtx1",
            0,
            investment_payload("0xalice", "0xsukuk", "300"),
        )
        .await;
        insert_event(
            &pool,
            "InvestmentMade",
            "0xtx2",
            0,
            investment_payload("0xbob", "0xsukuk", "100"),
        )
        .await;
        // Decodes fine, then fails inside the handler once the fan-out
        // arithmetic hits the bad amount
        insert_event(
            &pool,
            "YieldDistributed",
            "0xtx3",
            0,
            json!({"sukukAddress": "0xsukuk", "distributionId": 1, "totalAmount": "not-a-number"}),
        )
        .await;
        let last_id = insert_event(
            &pool,
            "YieldDistributed",
            "0xtx4",
            0,
            json!({"sukukAddress": "0xsukuk", "distributionId": 2, "totalAmount": "1000"}),
        )
        .await;

        let outcome = run_sync_pass(&pool, BATCH_SIZE).await.unwrap();

        assert_eq!(outcome.applied, 3);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.cursor, Some(last_id));

        // The failed distribution left no rows behind; only distribution 2
        // is projected, for both investors
        let alice_yields = yields::for_investor(&pool, "0xalice").await.unwrap();
        let bob_yields = yields::for_investor(&pool, "0xbob").await.unwrap();
        assert_eq!(alice_yields.len(), 1);
        assert_eq!(bob_yields.len(), 1);
        assert_eq!(alice_yields[0].distribution_id, 2);
        assert_eq!(alice_yields[0].amount, "750");
        assert_eq!(bob_yields[0].distribution_id, 2);
        assert_eq!(bob_yields[0].amount, "250");
    }

    #[tokio::test]
    #[ignore = "requires a local Postgres (PRIMARY_DATABASE_URL)"]
    async fn admin_redemption_request_round_trips() {
        let pool = setup().await;

        redemption::insert_requested(&pool, "0xinvestor", "0xsukuk", "500", Some("0xtx9"))
            .await
            .unwrap();

        let rows = redemption::for_investor(&pool, "0xinvestor").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, Redemption::STATUS_REQUESTED);
        assert_eq!(rows[0].token_amount, "500");
        assert_eq!(rows[0].tx_hash.as_deref(), Some("0xtx9"));
        assert!(redemption::for_investor(&pool, "0xother").await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore = "requires a local Postgres (PRIMARY_DATABASE_URL)"]
    async fn deployment_event_attaches_token_address_to_draft() {
        let pool = setup().await;
        sukuk::create_draft(&pool, "Green Energy Sukuk 2026").await.unwrap();

        insert_event(
            &pool,
            "SukukDeployed",
            "0xtx1",
            0,
            json!({"name": "Green Energy Sukuk 2026", "tokenAddress": "0xdeadbeef"}),
        )
        .await;
        run_sync_pass(&pool, BATCH_SIZE).await.unwrap();

        let row = sukuk::by_name(&pool, "Green Energy Sukuk 2026")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.token_address.as_deref(), Some("0xdeadbeef"));
        assert_eq!(row.status, "deployed");
    }

    #[tokio::test]
    #[ignore = "requires a local Postgres (PRIMARY_DATABASE_URL)"]
    async fn system_state_round_trips_arbitrary_keys() {
        let pool = setup().await;

        db::system_state::set(&pool, "maintenance_mode", "on").await.unwrap();
        assert_eq!(
            db::system_state::get(&pool, "maintenance_mode").await.unwrap(),
            Some("on".to_string())
        );
        assert_eq!(db::system_state::get(&pool, "absent").await.unwrap(), None);
    }
}
