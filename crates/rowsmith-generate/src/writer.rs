//! Batched INSERT execution with generated-key retrieval and commit pacing.

use rowsmith_core::Value;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::errors::GenerationError;
use crate::session::Session;
use crate::sql::InsertStatement;

/// How generated values are fetched after inserting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyRetrieval {
    /// Execute many rows at once and map the returned rows by position.
    #[default]
    PerBatch,
    /// Execute one row at a time while generated values are wanted.
    PerRow,
}

/// Who controls the transaction of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// The writer toggles autocommit, commits every batch and rolls back on
    /// failure.
    Owned,
    /// The caller's transaction; the writer never commits or rolls back.
    Joined,
}

/// Counters kept while writing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub rows: u64,
    pub executions: u64,
    pub commits: u64,
}

/// One facet's insert, as handed to the writer.
#[derive(Debug, Clone, Copy)]
pub struct InsertionContext<'a> {
    pub statement: &'a InsertStatement,
    pub row_count: u64,
    /// Database-assigned columns fetched after each execution.
    pub returning: &'a [String],
}

pub struct BatchWriter<'s, S: Session + ?Sized> {
    session: &'s mut S,
    mode: TransactionMode,
    retrieval: KeyRetrieval,
    batch_size: usize,
    previous_autocommit: bool,
    uncommitted: u64,
    stats: WriteStats,
}

impl<'s, S: Session + ?Sized> BatchWriter<'s, S> {
    /// Prepares the session; an owned session leaves autocommit mode until
    /// [`BatchWriter::close`] or [`BatchWriter::abort`].
    pub async fn open(
        session: &'s mut S,
        mode: TransactionMode,
        retrieval: KeyRetrieval,
        batch_size: usize,
    ) -> Result<Self, GenerationError> {
        if batch_size == 0 {
            return Err(GenerationError::config("batch size must be greater than zero"));
        }
        let retrieval = if session.supports_batched_keys() {
            retrieval
        } else {
            KeyRetrieval::PerRow
        };
        let previous_autocommit = session.autocommit();
        if mode == TransactionMode::Owned && previous_autocommit {
            session.set_autocommit(false).await?;
        }
        debug!(
            identity = session.identity(),
            ?mode,
            ?retrieval,
            batch_size,
            "opened batch writer"
        );
        Ok(Self {
            session,
            mode,
            retrieval,
            batch_size,
            previous_autocommit,
            uncommitted: 0,
            stats: WriteStats::default(),
        })
    }

    pub fn stats(&self) -> WriteStats {
        self.stats
    }

    pub fn retrieval(&self) -> KeyRetrieval {
        self.retrieval
    }

    pub fn uncommitted(&self) -> u64 {
        self.uncommitted
    }

    /// The session written through, e.g. to read metadata between inserts.
    pub fn session(&mut self) -> &mut S {
        &mut *self.session
    }

    /// Inserts `context.row_count` rows pulled from `next_row`.
    ///
    /// `on_generated` receives the values of the returning columns after
    /// every execution.
    pub async fn perform_insert<R, G>(
        &mut self,
        context: InsertionContext<'_>,
        mut next_row: R,
        mut on_generated: G,
    ) -> Result<u64, GenerationError>
    where
        R: FnMut() -> Result<Vec<Value>, GenerationError> + Send,
        G: FnMut(&[String], &[Vec<Value>]) + Send,
    {
        debug!(
            table = context.statement.table(),
            rows = context.row_count,
            sql = context.statement.sql(),
            "inserting rows"
        );

        let mut pending: Vec<Vec<Value>> =
            Vec::with_capacity(self.batch_size.min(context.row_count as usize));
        for index in 0..context.row_count {
            let row = next_row()?;
            trace!(table = context.statement.table(), index, ?row, "prepared row");
            pending.push(row);
            self.uncommitted += 1;

            let batch_full = pending.len() >= self.batch_size;
            let commit_due = self.uncommitted >= self.batch_size as u64;
            let per_row = self.retrieval == KeyRetrieval::PerRow && !context.returning.is_empty();
            if per_row || batch_full || commit_due {
                self.execute(&context, &mut pending, &mut on_generated).await?;
            }
            if commit_due {
                self.commit_if_needed().await?;
            }
        }
        self.execute(&context, &mut pending, &mut on_generated).await?;

        self.stats.rows += context.row_count;
        Ok(context.row_count)
    }

    async fn execute<G>(
        &mut self,
        context: &InsertionContext<'_>,
        pending: &mut Vec<Vec<Value>>,
        on_generated: &mut G,
    ) -> Result<(), GenerationError>
    where
        G: FnMut(&[String], &[Vec<Value>]) + Send,
    {
        if pending.is_empty() {
            return Ok(());
        }
        let generated = self
            .session
            .execute_insert(context.statement, pending, context.returning)
            .await?;
        self.stats.executions += 1;
        debug!(
            table = context.statement.table(),
            rows = pending.len(),
            batch_size = self.batch_size,
            "executed insert batch"
        );

        if !context.returning.is_empty() {
            if generated.len() != pending.len() {
                warn!(
                    table = context.statement.table(),
                    expected = pending.len(),
                    returned = generated.len(),
                    "generated values do not line up with inserted rows"
                );
            }
            on_generated(context.returning, &generated);
        }
        pending.clear();
        Ok(())
    }

    async fn commit_if_needed(&mut self) -> Result<(), GenerationError> {
        if self.mode == TransactionMode::Joined {
            debug!(
                rows = self.uncommitted,
                "skip committing, the transaction belongs to the caller"
            );
            self.uncommitted = 0;
            return Ok(());
        }
        if self.uncommitted > 0 {
            debug!(rows = self.uncommitted, batch_size = self.batch_size, "committing rows");
            self.session.commit().await?;
            self.stats.commits += 1;
            self.uncommitted = 0;
        }
        Ok(())
    }

    /// Commits what is left and restores the session's autocommit mode.
    ///
    /// A failed commit aborts the writer before the error is returned.
    pub async fn close(mut self) -> Result<WriteStats, GenerationError> {
        if let Err(err) = self.commit_if_needed().await {
            self.abort().await;
            return Err(err);
        }
        if self.mode == TransactionMode::Owned && self.previous_autocommit {
            self.session.set_autocommit(true).await?;
        }
        debug!(
            rows = self.stats.rows,
            executions = self.stats.executions,
            commits = self.stats.commits,
            "closed batch writer"
        );
        Ok(self.stats)
    }

    /// Rolls back uncommitted rows of an owned session and restores its
    /// autocommit mode. A joined session is left untouched.
    pub async fn abort(self) -> WriteStats {
        if self.mode == TransactionMode::Joined {
            return self.stats;
        }
        if let Err(err) = self.session.rollback().await {
            warn!(error = %err, "rollback failed");
        }
        if self.previous_autocommit {
            if let Err(err) = self.session.set_autocommit(true).await {
                warn!(error = %err, "failed to restore autocommit");
            }
        }
        debug!(rows = self.uncommitted, "rolled back uncommitted rows");
        self.stats
    }
}
