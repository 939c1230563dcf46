//! CSV bulk loading
//!
//! Records are keyed by their line number and grouped into batches of at most
//! `batch_size` rows. A malformed record aborts the load at its batch;
//! batches submitted before it are awaited and stay written.

use domain_movies::{CatalogRepository, PendingWrite, RawRows, Table, WriteMode, WriteOutcome};
use eyre::{Result, WrapErr};
use std::io::Read;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub batch_size: usize,
    pub mode: WriteMode,
    pub has_headers: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub batches: usize,
    pub rows: usize,
}

struct BatchSubmitter<'a> {
    repo: &'a dyn CatalogRepository,
    table: Table,
    mode: WriteMode,
    pending: Vec<PendingWrite>,
    report: LoadReport,
}

impl BatchSubmitter<'_> {
    async fn submit(&mut self, rows: RawRows) -> Result<()> {
        let size = rows.len();
        let outcome = self
            .repo
            .batch_insert(self.table, rows, self.mode)
            .await
            .wrap_err_with(|| format!("Batch {} for {} rejected", self.report.batches + 1, self.table))?;

        self.report.batches += 1;
        match outcome {
            WriteOutcome::Completed(result) => {
                debug!(batch = self.report.batches, rows = result.rows, "Batch written");
                self.report.rows += result.rows;
            }
            WriteOutcome::Pending(pending) => {
                debug!(batch = self.report.batches, rows = size, "Batch submitted");
                self.pending.push(pending);
            }
        }
        Ok(())
    }

    /// Wait for every asynchronous batch and fold its rows into the report
    ///
    /// All pending batches are awaited even after one fails; the first
    /// failure is returned.
    async fn settle(&mut self) -> Result<()> {
        let mut first_error = None;
        for pending in self.pending.drain(..) {
            match pending.wait().await {
                Ok(result) => self.report.rows += result.rows,
                Err(e) if first_error.is_none() => {
                    first_error = Some(
                        eyre::Report::new(e)
                            .wrap_err(format!("Asynchronous batch for {} failed", self.table)),
                    );
                }
                Err(e) => warn!(table = %self.table, error = %e, "Asynchronous batch failed"),
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn finish(mut self) -> Result<LoadReport> {
        self.settle().await?;
        Ok(self.report)
    }
}

async fn feed<R: Read>(
    submitter: &mut BatchSubmitter<'_>,
    csv_reader: &mut csv::Reader<R>,
    batch_size: usize,
) -> Result<()> {
    let mut chunk = RawRows::with_capacity(batch_size);
    for (index, record) in csv_reader.records().enumerate() {
        let record = record.wrap_err("Failed to read CSV record")?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(index as u64 + 1);

        chunk.insert(
            format!("line {}", line),
            record.iter().map(str::to_string).collect(),
        );

        if chunk.len() >= batch_size {
            let full = std::mem::replace(&mut chunk, RawRows::with_capacity(batch_size));
            submitter.submit(full).await?;
        }
    }

    if !chunk.is_empty() {
        submitter.submit(chunk).await?;
    }
    Ok(())
}

/// Load CSV records from `reader` into `table`
#[instrument(skip(repo, reader))]
pub async fn load_csv<R: Read>(
    repo: &dyn CatalogRepository,
    table: Table,
    reader: R,
    options: LoadOptions,
) -> Result<LoadReport> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(options.has_headers)
        .flexible(true)
        .from_reader(reader);

    let mut submitter = BatchSubmitter {
        repo,
        table,
        mode: options.mode,
        pending: Vec::new(),
        report: LoadReport::default(),
    };

    // Batches already handed off must land before a failure is reported
    if let Err(err) = feed(&mut submitter, &mut csv_reader, options.batch_size).await {
        if let Err(pending_err) = submitter.settle().await {
            warn!(error = %pending_err, "Earlier batch failed while stopping the load");
        }
        info!(
            %table,
            batches = submitter.report.batches,
            rows = submitter.report.rows,
            "Load stopped"
        );
        return Err(err);
    }

    let report = submitter.finish().await?;
    info!(%table, batches = report.batches, rows = report.rows, "Load complete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use domain_movies::{
        CatalogError, CatalogResult, FieldValue, InMemoryCatalogRepository, WriteResult,
    };
    use mockall::mock;
    use mockall::predicate::*;

    mock! {
        pub Repo {}

        #[async_trait]
        impl CatalogRepository for Repo {
            async fn batch_insert(
                &self,
                table: Table,
                rows: RawRows,
                mode: WriteMode,
            ) -> CatalogResult<WriteOutcome>;
            async fn find(&self, table: Table, key: &[FieldValue]) -> CatalogResult<Option<Vec<FieldValue>>>;
        }
    }

    const WATCH_HISTORY_CSV: &str = "\
customer_id,movie_id,watched_at,pause_time,movie_name
7,42,1609459200000,15,Inception
7,43,1609459300000,0,Heat
8,42,1609459400000,90,Inception
9,1,1609459500000,5,\"Crouching Tiger, Hidden Dragon\"
9,2,1609459600000,5,Alien
";

    fn options(batch_size: usize, mode: WriteMode) -> LoadOptions {
        LoadOptions {
            batch_size,
            mode,
            has_headers: true,
        }
    }

    #[tokio::test]
    async fn test_load_splits_into_bounded_batches() {
        let mut repo = MockRepo::new();
        repo.expect_batch_insert()
            .with(eq(Table::WatchHistory), always(), eq(WriteMode::Sync))
            .times(3)
            .returning(|table, rows, _| {
                assert!(rows.len() <= 2);
                Ok(WriteOutcome::Completed(WriteResult {
                    table,
                    rows: rows.len(),
                }))
            });

        let report = load_csv(
            &repo,
            Table::WatchHistory,
            WATCH_HISTORY_CSV.as_bytes(),
            options(2, WriteMode::Sync),
        )
        .await
        .unwrap();

        assert_eq!(report, LoadReport { batches: 3, rows: 5 });
    }

    #[tokio::test]
    async fn test_load_keys_rows_by_line_number() {
        let mut repo = MockRepo::new();
        repo.expect_batch_insert()
            .times(1)
            .returning(|table, rows, _| {
                assert!(rows.contains_key("line 2"));
                assert!(rows.contains_key("line 6"));
                assert_eq!(rows["line 5"][4], "Crouching Tiger, Hidden Dragon");
                Ok(WriteOutcome::Completed(WriteResult {
                    table,
                    rows: rows.len(),
                }))
            });

        let report = load_csv(
            &repo,
            Table::WatchHistory,
            WATCH_HISTORY_CSV.as_bytes(),
            options(100, WriteMode::Sync),
        )
        .await
        .unwrap();
        assert_eq!(report.batches, 1);
    }

    #[tokio::test]
    async fn test_load_stops_at_rejected_batch() {
        let mut repo = MockRepo::new();
        repo.expect_batch_insert()
            .times(1)
            .returning(|_, _, _| Err(CatalogError::InvalidKeyspace("bad-name".to_string())));

        let err = load_csv(
            &repo,
            Table::WatchHistory,
            WATCH_HISTORY_CSV.as_bytes(),
            options(2, WriteMode::Sync),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Batch 1"));
    }

    #[tokio::test]
    async fn test_async_load_into_memory() {
        let repo = InMemoryCatalogRepository::new();

        let report = load_csv(
            &repo,
            Table::WatchHistory,
            WATCH_HISTORY_CSV.as_bytes(),
            options(2, WriteMode::Async),
        )
        .await
        .unwrap();

        assert_eq!(report, LoadReport { batches: 3, rows: 5 });
        assert_eq!(repo.count(Table::WatchHistory).await, 5);
    }

    #[tokio::test]
    async fn test_malformed_record_is_reported() {
        let repo = InMemoryCatalogRepository::new();
        let csv = "7,42,1609459200000,15,Inception\n7,43,not-a-time,0,Heat\n";

        let err = load_csv(
            &repo,
            Table::WatchHistory,
            csv.as_bytes(),
            LoadOptions {
                batch_size: 10,
                mode: WriteMode::Sync,
                has_headers: false,
            },
        )
        .await
        .unwrap_err();

        let cause = err.downcast_ref::<CatalogError>().unwrap();
        match cause {
            CatalogError::MalformedRow { key, .. } => assert_eq!(key, "line 2"),
            other => panic!("expected MalformedRow, got {other:?}"),
        }
        assert_eq!(repo.count(Table::WatchHistory).await, 0);
    }

    #[test]
    fn test_failed_load_waits_for_submitted_batches() {
        let repo = InMemoryCatalogRepository::new();
        let csv = "\
7,42,1609459200000,15,Inception
7,43,1609459300000,0,Heat
8,42,1609459400000,90,Inception
9,1,not-a-time,5,Alien
";

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let result = runtime.block_on(load_csv(
            &repo,
            Table::WatchHistory,
            csv.as_bytes(),
            LoadOptions {
                batch_size: 1,
                mode: WriteMode::Async,
                has_headers: false,
            },
        ));
        assert!(result.is_err());
        // Anything still queued on the runtime is cancelled here
        drop(runtime);

        let stored = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(repo.count(Table::WatchHistory));
        assert_eq!(stored, 3);
    }

    #[tokio::test]
    async fn test_empty_file_loads_nothing() {
        let repo = InMemoryCatalogRepository::new();
        let report = load_csv(
            &repo,
            Table::MoviesGenre,
            "genre,release_year,movie_id,duration,movie_name\n".as_bytes(),
            options(10, WriteMode::Sync),
        )
        .await
        .unwrap();
        assert_eq!(report, LoadReport::default());
    }
}
