mod resource {
    pub mod mock;
    pub mod rows;
}

#[cfg(test)]
mod tests {
    use crate::resource::{
        mock::{MockSource, init_logs},
        rows::PersonRow,
    };
    use rowkit::{
        DataSourceSession, DriverErrorKind, Error, IsolationLevel, Result, RowkitError, Session,
        TransactionConfig, TransactionRunner, is_retryable, retryable,
    };
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test]
    async fn commit_on_success() {
        init_logs();
        let source = MockSource::new();
        let session = DataSourceSession::new(source.clone());
        let value = session
            .run(async |tx| {
                tx.execute_sql("update `person` set `name` = 'x'", vec![])
                    .await?;
                Ok(5)
            })
            .await
            .expect("Transaction failed");
        assert_eq!(value, 5);
        let state = source.state();
        assert_eq!(state.isolation, [IsolationLevel::ReadUncommitted]);
        assert_eq!(state.auto_commit, [false, true]);
        assert_eq!(state.commits, 1);
        assert_eq!(state.rollbacks, 0);
        assert_eq!(state.connects, 1);
        assert_eq!(state.releases, 1);
        assert_eq!(state.closed_statements, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_exhausted() {
        init_logs();
        let source = MockSource::new();
        let session = DataSourceSession::new(source.clone()).with_transaction_config(
            TransactionConfig::default().with_retry_delay(Duration::from_millis(1000)),
        );
        let mut attempts = 0;
        let start = Instant::now();
        let result: Result<()> = session
            .run(async |_tx| {
                attempts += 1;
                Err(retryable(Error::msg("deadlock detected")))
            })
            .await;
        let elapsed = start.elapsed();
        let error = result.unwrap_err();
        assert!(is_retryable(&error));
        assert_eq!(attempts, 3);
        assert!(elapsed >= Duration::from_millis(2000), "{elapsed:?}");
        assert!(elapsed <= Duration::from_millis(4000), "{elapsed:?}");
        let state = source.state();
        assert_eq!(state.rollbacks, 1);
        assert_eq!(state.commits, 0);
        assert_eq!(state.auto_commit, [false, true]);
        assert_eq!(state.releases, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_then_commit() {
        init_logs();
        let source = MockSource::new();
        source
            .fail(DriverErrorKind::TransactionRollback, "serialization failure")
            .affected(1);
        let session = DataSourceSession::new(source.clone());
        let mut attempts = 0;
        session
            .run(async |tx| {
                attempts += 1;
                tx.execute_sql("update `person` set `name` = ?", vec!["Al".into()])
                    .await?;
                Ok(())
            })
            .await
            .expect("Transaction failed");
        assert_eq!(attempts, 2);
        let state = source.state();
        assert_eq!(state.executed.len(), 2);
        assert_eq!(state.commits, 1);
        assert_eq!(state.rollbacks, 0);
        assert_eq!(state.releases, 1);
    }

    #[tokio::test]
    async fn terminal_failure_rolls_back() {
        init_logs();
        let source = MockSource::new();
        source.fail(DriverErrorKind::Other, "constraint violated");
        let session = DataSourceSession::new(source.clone());
        let mut attempts = 0;
        let result: Result<()> = session
            .run(async |tx| {
                attempts += 1;
                tx.execute_sql("delete from `person`", vec![]).await?;
                Ok(())
            })
            .await;
        let error = result.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<RowkitError>(),
            Some(RowkitError::Statement { .. })
        ));
        assert_eq!(attempts, 1);
        let state = source.state();
        assert_eq!(state.rollbacks, 1);
        assert_eq!(state.commits, 0);
        assert_eq!(state.auto_commit, [false, true]);
        assert_eq!(state.releases, 1);
    }

    #[tokio::test]
    async fn single_connection() {
        init_logs();
        let source = MockSource::new();
        let session = DataSourceSession::new(source.clone());
        session
            .run(async |tx| {
                let repository = tx.repository::<PersonRow>();
                let mut row = repository
                    .insert_with(|p| {
                        p.id = Some(1);
                        p.name = Some("Al".into());
                    })
                    .await?;
                row.name = Some("Bo".into());
                repository.update(&mut row).await?;
                repository.list().await?;
                Ok(())
            })
            .await
            .expect("Transaction failed");
        let state = source.state();
        assert_eq!(state.executed.len(), 3);
        assert_eq!(state.connects, 1);
        assert_eq!(state.releases, 1);
        assert_eq!(state.commits, 1);
    }

    #[tokio::test]
    async fn open_cursor_holds_the_connection() {
        init_logs();
        let source = MockSource::new();
        let session = DataSourceSession::new(source.clone());
        session
            .run(async |tx| {
                let cursor = tx
                    .repository::<PersonRow>()
                    .iterator("person", vec![])
                    .await?;
                assert!(tx.execute_sql("select 1", vec![]).await.is_err());
                drop(cursor);
                tx.execute_sql("select 1", vec![]).await?;
                Ok(())
            })
            .await
            .expect("Transaction failed");
        let state = source.state();
        assert_eq!(state.executed.len(), 2);
        assert_eq!(state.commits, 1);
    }

    #[tokio::test]
    async fn runner_without_isolation() {
        init_logs();
        let source = MockSource::new();
        let session = DataSourceSession::new(source.clone());
        let runner = TransactionRunner::new(
            TransactionConfig::default()
                .with_tries(1)
                .with_isolation(None),
        );
        assert_eq!(runner.config().tries, 1);
        let result: Result<()> = runner
            .run(&session, async |_tx| Err(retryable(Error::msg("busy"))))
            .await;
        assert!(result.is_err());
        let state = source.state();
        assert!(state.isolation.is_empty());
        assert_eq!(state.rollbacks, 1);
        assert_eq!(state.releases, 1);
    }
}
