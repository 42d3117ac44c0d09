use std::sync::Arc;
use std::time::Instant;

use rowsmith_core::{ColumnDescriptor, Error};
use rowsmith_introspect::{IntrospectOptions, MetadataCache};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_BATCH_SIZE, GeneratorConfig};
use crate::errors::GenerationError;
use crate::facet::{ColumnInclusion, TableFacet};
use crate::postgres::{PgSession, pool_identity, server_identity};
use crate::row::RowGenerator;
use crate::session::Session;
use crate::setting::{DataSetting, LayeredSetting, SettingInfo};
use crate::sql::InsertStatement;
use crate::writer::{BatchWriter, InsertionContext, KeyRetrieval, TransactionMode};

/// Generates and inserts the rows of table facets, one facet after another.
#[derive(Debug, Clone)]
pub struct Generator {
    cache: Arc<MetadataCache>,
    setting: Option<Arc<DataSetting>>,
    batch_size: usize,
    key_retrieval: KeyRetrieval,
    options: IntrospectOptions,
}

impl Generator {
    pub fn new(cache: Arc<MetadataCache>) -> Self {
        Self {
            cache,
            setting: None,
            batch_size: DEFAULT_BATCH_SIZE,
            key_retrieval: KeyRetrieval::default(),
            options: IntrospectOptions::default(),
        }
    }

    /// Setting consulted after each facet's own and before the defaults.
    pub fn with_setting(mut self, setting: DataSetting) -> Result<Self, GenerationError> {
        setting.validate()?;
        self.setting = Some(Arc::new(setting));
        Ok(self)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_key_retrieval(mut self, key_retrieval: KeyRetrieval) -> Self {
        self.key_retrieval = key_retrieval;
        self
    }

    pub fn with_config(mut self, config: &GeneratorConfig) -> Result<Self, GenerationError> {
        config.validate()?;
        self.batch_size = config.batch_size;
        self.key_retrieval = config.key_retrieval;
        self.options = IntrospectOptions::with_schema(config.schema.clone());
        if let Some(rows) = config.default_rows {
            let setting = match self.setting.take() {
                Some(setting) => (*setting).clone(),
                None => DataSetting::new(),
            };
            return self.with_setting(setting.set_default_rows(rows));
        }
        Ok(self)
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn key_retrieval(&self) -> KeyRetrieval {
        self.key_retrieval
    }

    /// Generates over a connection taken from `pool`.
    ///
    /// The generator owns that connection's transaction: rows are committed
    /// every batch and a failure rolls back what is not committed yet.
    pub async fn generate(&self, pool: &PgPool, facets: &[&TableFacet]) -> Result<u64, GenerationError> {
        let identity = pool_identity(pool);
        let mut conn = pool
            .acquire()
            .await
            .map_err(|err| Error::Db(err.to_string()))?;
        let result = {
            let mut session = PgSession::with_options(&mut *conn, identity, self.options.clone());
            self.generate_with(&mut session, TransactionMode::Owned, facets)
                .await
        };
        if result.is_err() {
            // The transaction state of a failed connection is unknown.
            conn.close_on_drop();
        }
        result
    }

    /// Generates inside the caller's connection and transaction, which are
    /// never committed, rolled back or switched to another commit mode.
    pub async fn generate_in(
        &self,
        conn: &mut PgConnection,
        facets: &[&TableFacet],
    ) -> Result<u64, GenerationError> {
        let identity = server_identity(&mut *conn).await?;
        let mut session = PgSession::with_options(conn, identity, self.options.clone());
        self.generate_with(&mut session, TransactionMode::Joined, facets)
            .await
    }

    /// Generates every facet in order through `session`; returns the number
    /// of inserted rows.
    pub async fn generate_with<S>(
        &self,
        session: &mut S,
        mode: TransactionMode,
        facets: &[&TableFacet],
    ) -> Result<u64, GenerationError>
    where
        S: Session + ?Sized,
    {
        let start = Instant::now();
        let mut writer = BatchWriter::open(session, mode, self.key_retrieval, self.batch_size).await?;

        let mut total = 0;
        for facet in facets {
            match self.generate_facet(&mut writer, facet).await {
                Ok(rows) => total += rows,
                Err(err) => {
                    warn!(table = facet.table(), error = %err, "generation failed");
                    writer.abort().await;
                    return Err(err);
                }
            }
        }

        let stats = writer.close().await?;
        info!(
            facets = facets.len(),
            rows = total,
            executions = stats.executions,
            commits = stats.commits,
            duration_ms = start.elapsed().as_millis() as u64,
            "generation completed"
        );
        Ok(total)
    }

    async fn generate_facet<S>(
        &self,
        writer: &mut BatchWriter<'_, S>,
        facet: &TableFacet,
    ) -> Result<u64, GenerationError>
    where
        S: Session + ?Sized,
    {
        let setting = LayeredSetting::new([facet.setting().cloned(), self.setting.clone()]);
        let row_count = facet.row_count(&setting)?;
        let metadata = self.cache.columns(writer.session(), facet.table()).await?;
        check_configured_columns(facet, &metadata)?;

        let targets = target_columns(facet, &metadata, &setting);
        let returning = generated_columns(&metadata, &targets);
        info!(
            table = facet.table(),
            rows = row_count,
            columns = targets.len(),
            "generating rows"
        );
        debug!(
            table = facet.table(),
            columns = ?targets.iter().map(ColumnDescriptor::name).collect::<Vec<_>>(),
            returning = ?returning,
            "resolved target columns"
        );

        let mut rows = RowGenerator::new(facet, Arc::clone(&targets), &setting)?;
        let statement = InsertStatement::new(facet.table(), &targets, writer.session().placeholder());
        let context = InsertionContext {
            statement: &statement,
            row_count,
            returning: &returning,
        };
        let pool = Arc::clone(facet.pool());
        writer
            .perform_insert(context, || rows.next_row(), |names, generated| {
                pool.preserve_from_post_insert(names, generated)
            })
            .await
    }
}

/// Every column named by the facet must exist in the table.
fn check_configured_columns(
    facet: &TableFacet,
    metadata: &[ColumnDescriptor],
) -> Result<(), GenerationError> {
    for name in facet.configured_column_names() {
        if !metadata.iter().any(|column| column.matches_name(name)) {
            return Err(GenerationError::SchemaMismatch {
                table: facet.table().to_string(),
                column: name.to_string(),
            });
        }
    }
    Ok(())
}

fn target_columns(
    facet: &TableFacet,
    metadata: &[ColumnDescriptor],
    setting: &dyn SettingInfo,
) -> Arc<[ColumnDescriptor]> {
    metadata
        .iter()
        .filter(|column| match facet.column_inclusion(column) {
            ColumnInclusion::Include => true,
            ColumnInclusion::Exclude => false,
            ColumnInclusion::NotSet => setting.is_auto_generating(column),
        })
        .cloned()
        .collect()
}

/// Database-assigned columns left out of the insert.
fn generated_columns(metadata: &[ColumnDescriptor], targets: &[ColumnDescriptor]) -> Vec<String> {
    metadata
        .iter()
        .filter(|column| column.is_auto_increment())
        .filter(|column| !targets.iter().any(|target| target.matches_name(column.name())))
        .map(|column| column.name().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use rowsmith_core::{ColumnProperty, EngineType};

    use super::*;

    fn metadata() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("id", "int4", EngineType::Integer)
                .with_property(ColumnProperty::AutoIncrement)
                .with_property(ColumnProperty::DefaultValue),
            ColumnDescriptor::new("name", "varchar", EngineType::Varchar).with_size(20),
            ColumnDescriptor::new("note", "text", EngineType::Varchar)
                .with_property(ColumnProperty::Nullable),
        ]
    }

    #[test]
    fn unknown_configured_column_is_a_schema_mismatch() {
        let facet = TableFacet::builder("people")
            .column("nickname")
            .fixed("x")
            .build()
            .expect("facet");
        let err = check_configured_columns(&facet, &metadata()).expect_err("mismatch");
        assert!(matches!(
            err,
            GenerationError::SchemaMismatch { ref table, ref column } if table == "people" && column == "nickname"
        ));
    }

    #[test]
    fn targets_follow_inclusion_then_setting() {
        let setting = LayeredSetting::new([None]);
        let facet = TableFacet::builder("people").build().expect("facet");
        let targets = target_columns(&facet, &metadata(), &setting);
        let names: Vec<&str> = targets.iter().map(ColumnDescriptor::name).collect();
        assert_eq!(names, vec!["name", "note"]);

        let facet = TableFacet::builder("people")
            .include_columns(&["id", "note"])
            .build()
            .expect("facet");
        let targets = target_columns(&facet, &metadata(), &setting);
        let names: Vec<&str> = targets.iter().map(ColumnDescriptor::name).collect();
        assert_eq!(names, vec!["id", "note"]);
    }

    #[test]
    fn returning_lists_identity_columns_not_inserted() {
        let metadata = metadata();
        assert_eq!(generated_columns(&metadata, &metadata[1..]), vec!["id".to_string()]);
        assert!(generated_columns(&metadata, &metadata).is_empty());
    }

    #[test]
    fn config_default_rows_becomes_generator_setting() {
        let config = GeneratorConfig {
            batch_size: 10,
            default_rows: Some(7),
            ..GeneratorConfig::default()
        };
        let generator = Generator::new(Arc::new(MetadataCache::new()))
            .with_config(&config)
            .expect("generator");
        assert_eq!(generator.batch_size(), 10);
        let setting = LayeredSetting::new([None, generator.setting.clone()]);
        assert_eq!(setting.default_rows(), 7);
    }
}
