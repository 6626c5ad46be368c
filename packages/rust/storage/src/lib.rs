//! libSQL storage layer for the catalog records table.
//!
//! [`CatalogStore`] implements [`RecordProvider`] over the table named by
//! `repository.table`. It executes the caller's constraint, sort, type-name
//! filter and pagination as given; it never rewrites records it returns.
//!
//! **Access rules:**
//! - catalog serving: read-only via [`CatalogStore::open_readonly`] / [`CatalogStore::from_config`]
//! - seeding/import: read-write via [`CatalogStore::open`]

mod migrations;

use std::path::{Path, PathBuf};

use dynrepo_shared::{
    CatalogRecord, Constraint, DynRepoError, GeoExtent, QueryOptions, RecordProvider,
    RepositoryConfig, Result,
};
use libsql::params::Params;
use libsql::{Connection, Database, Value, params};
use serde::de::DeserializeOwned;

/// Columns selected for every record, in [`row_to_record`] order.
const RECORD_COLUMNS: &str = "identifier, typename, schema, title, abstract, contact, \
     publication_date, begin_date, end_date, keywords, geo_extent, doi, variables, \
     description, documentation";

/// Columns a filtered search may sort on.
const SORTABLE_COLUMNS: &[&str] = &[
    "identifier",
    "typename",
    "title",
    "contact",
    "publication_date",
    "begin_date",
    "end_date",
    "doi",
];

/// Resolve a connection string to a local database path.
///
/// Accepts `sqlite:///relative.db`, `sqlite:////absolute.db` and plain paths.
pub fn database_path(connection: &str) -> Result<PathBuf> {
    if let Some(rest) = connection.strip_prefix("sqlite:///") {
        if rest.is_empty() {
            return Err(DynRepoError::config(format!(
                "connection string '{connection}' has no database path"
            )));
        }
        return Ok(PathBuf::from(rest));
    }
    if let Some((scheme, _)) = connection.split_once("://") {
        return Err(DynRepoError::config(format!(
            "unsupported database scheme '{scheme}' (only sqlite is supported)"
        )));
    }
    Ok(PathBuf::from(connection))
}

/// Catalog records table handle wrapping a libSQL database.
pub struct CatalogStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    table: String,
    readonly: bool,
}

impl CatalogStore {
    /// Open or create a database at `path` in read-write mode, creating `table` if needed.
    pub async fn open(path: &Path, table: &str) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DynRepoError::io(parent, e))?;
        }

        let mut store = Self::connect(path, table).await?;
        store.readonly = false;
        store.run_migrations().await?;
        Ok(store)
    }

    /// Open an existing database at `path` in read-only mode.
    ///
    /// A missing file is a configuration error; nothing is created on disk.
    pub async fn open_readonly(path: &Path, table: &str) -> Result<Self> {
        if !path.is_file() {
            return Err(DynRepoError::config(format!(
                "database '{}' does not exist",
                path.display()
            )));
        }
        Self::connect(path, table).await
    }

    /// Open the records table named by the `[repository]` config section (read-only).
    pub async fn from_config(config: &RepositoryConfig) -> Result<Self> {
        let path = database_path(&config.database)?;
        tracing::debug!(?path, table = %config.table, "opening catalog store");
        Self::open_readonly(&path, &config.table).await
    }

    async fn connect(path: &Path, table: &str) -> Result<Self> {
        if !is_identifier(table) {
            return Err(DynRepoError::config(format!(
                "'{table}' is not a valid table name"
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DynRepoError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DynRepoError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            table: table.to_string(),
            readonly: true,
        })
    }

    /// Name of the records table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations(&self.table) {
            if migration.version > current_version {
                tracing::info!(
                    table = %self.table,
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(&migration.sql)
                    .await
                    .map_err(|e| {
                        DynRepoError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version of this table, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query(
                "SELECT MAX(version) FROM schema_migrations WHERE table_name = ?1",
                params![self.table.as_str()],
            )
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(DynRepoError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert or replace a record (keyed by `resource_uid`).
    pub async fn upsert_record(&self, record: &CatalogRecord) -> Result<()> {
        self.check_writable()?;

        let sql = format!(
            "INSERT INTO {table} ({RECORD_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(identifier) DO UPDATE SET
               typename = excluded.typename,
               schema = excluded.schema,
               title = excluded.title,
               abstract = excluded.abstract,
               contact = excluded.contact,
               publication_date = excluded.publication_date,
               begin_date = excluded.begin_date,
               end_date = excluded.end_date,
               keywords = excluded.keywords,
               geo_extent = excluded.geo_extent,
               doi = excluded.doi,
               variables = excluded.variables,
               description = excluded.description,
               documentation = excluded.documentation",
            table = self.table
        );

        let values = vec![
            Value::Text(record.resource_uid.clone()),
            opt_text(record.typename.as_deref()),
            opt_text(record.schema.as_deref()),
            Value::Text(record.title.clone()),
            Value::Text(record.abstract_text.clone()),
            opt_text(record.contact.as_deref()),
            opt_text(record.publication_date.as_deref()),
            opt_text(record.begin_date.as_deref()),
            opt_text(record.end_date.as_deref()),
            Value::Text(to_json(&record.keywords)?),
            Value::Text(to_json(&record.geo_extent)?),
            opt_text(record.doi.as_deref()),
            Value::Text(to_json(&record.variables)?),
            Value::Text(to_json(&record.description)?),
            Value::Text(to_json(&record.documentation)?),
        ];

        self.conn
            .execute(&sql, Params::Positional(values))
            .await
            .map_err(|e| DynRepoError::Storage(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    async fn fetch_records(&self, sql: &str, values: Vec<Value>) -> Result<Vec<CatalogRecord>> {
        let mut rows = self
            .conn
            .query(sql, Params::Positional(values))
            .await
            .map_err(|e| DynRepoError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        loop {
            match rows.next().await {
                Ok(Some(row)) => results.push(row_to_record(&row)?),
                Ok(None) => break,
                Err(e) => return Err(DynRepoError::Storage(e.to_string())),
            }
        }
        Ok(results)
    }

    async fn count_matching(&self, where_sql: &str, values: Vec<Value>) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {where_sql}", self.table);
        let mut rows = self
            .conn
            .query(&sql, Params::Positional(values))
            .await
            .map_err(|e| DynRepoError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| DynRepoError::Storage(e.to_string()))?;
                Ok(count.max(0) as u64)
            }
            Ok(None) => Ok(0),
            Err(e) => Err(DynRepoError::Storage(e.to_string())),
        }
    }
}

impl RecordProvider for CatalogStore {
    async fn query_ids(&self, ids: &[String]) -> Result<Vec<CatalogRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM {} WHERE identifier IN ({placeholders})",
            self.table
        );
        let values = ids.iter().cloned().map(Value::Text).collect();
        self.fetch_records(&sql, values).await
    }

    async fn query(
        &self,
        constraint: &Constraint,
        options: &QueryOptions,
    ) -> Result<(u64, Vec<CatalogRecord>)> {
        let (where_sql, values) = build_where(constraint, &options.typenames);

        let total = self.count_matching(&where_sql, values.clone()).await?;

        let order_sql = match &options.sort_by {
            Some(sort) => {
                if !SORTABLE_COLUMNS.contains(&sort.property.as_str()) {
                    return Err(DynRepoError::validation(format!(
                        "cannot sort by '{}'",
                        sort.property
                    )));
                }
                format!(" ORDER BY {} {}", sort.property, sort.order.as_sql())
            }
            None => String::new(),
        };

        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM {} WHERE {where_sql}{order_sql} LIMIT ? OFFSET ?",
            self.table
        );
        let mut page_values = values;
        page_values.push(Value::Integer(i64::from(options.max_records)));
        page_values.push(Value::Integer(i64::from(options.start_position)));

        let records = self.fetch_records(&sql, page_values).await?;
        tracing::debug!(total, returned = records.len(), "catalog query");
        Ok((total, records))
    }
}

/// Combine the caller's constraint with the type-name filter.
fn build_where(constraint: &Constraint, typenames: &[String]) -> (String, Vec<Value>) {
    let mut sql = format!("({})", constraint.where_clause);
    let mut values: Vec<Value> = constraint.values.iter().cloned().map(Value::Text).collect();

    if !typenames.is_empty() {
        let placeholders = vec!["?"; typenames.len()].join(", ");
        sql.push_str(&format!(" AND typename IN ({placeholders})"));
        values.extend(typenames.iter().cloned().map(Value::Text));
    }
    (sql, values)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn opt_text(value: Option<&str>) -> Value {
    match value {
        Some(v) => Value::Text(v.to_string()),
        None => Value::Null,
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| DynRepoError::Storage(e.to_string()))
}

/// Parse a JSON column; `None` when the column is NULL.
fn json_column<T: DeserializeOwned>(
    row: &libsql::Row,
    idx: i32,
    record: &str,
    column: &str,
) -> Result<Option<T>> {
    let Ok(raw) = row.get::<String>(idx) else {
        return Ok(None);
    };
    serde_json::from_str(&raw).map(Some).map_err(|e| {
        DynRepoError::validation(format!("record {record:?}: malformed {column} column: {e}"))
    })
}

/// Keywords are stored either as a JSON array or as a comma-separated list.
fn keywords_column(row: &libsql::Row, idx: i32) -> Vec<String> {
    let Ok(raw) = row.get::<String>(idx) else {
        return Vec::new();
    };
    if let Ok(list) = serde_json::from_str::<Vec<String>>(&raw) {
        return list;
    }
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

/// Convert a database row to a [`CatalogRecord`], rejecting rows that lack
/// attributes the enrichment pipeline needs.
fn row_to_record(row: &libsql::Row) -> Result<CatalogRecord> {
    let resource_uid = row
        .get::<String>(0)
        .map_err(|_| DynRepoError::missing_attribute("<unknown>", "resource_uid"))?;
    let required = |idx: i32, attribute: &str| {
        row.get::<String>(idx)
            .map_err(|_| DynRepoError::missing_attribute(resource_uid.as_str(), attribute))
    };

    let title = required(3, "title")?;
    let abstract_text = required(4, "abstract")?;
    let geo_extent: GeoExtent = json_column(row, 10, &resource_uid, "geo_extent")?
        .ok_or_else(|| DynRepoError::missing_attribute(resource_uid.as_str(), "geo_extent"))?;

    Ok(CatalogRecord {
        typename: row.get::<String>(1).ok(),
        schema: row.get::<String>(2).ok(),
        title,
        abstract_text,
        contact: row.get::<String>(5).ok(),
        publication_date: row.get::<String>(6).ok(),
        begin_date: row.get::<String>(7).ok(),
        end_date: row.get::<String>(8).ok(),
        keywords: keywords_column(row, 9),
        geo_extent,
        doi: row.get::<String>(11).ok(),
        variables: json_column(row, 12, &resource_uid, "variables")?.unwrap_or_default(),
        description: json_column(row, 13, &resource_uid, "description")?.unwrap_or_default(),
        documentation: json_column(row, 14, &resource_uid, "documentation")?.unwrap_or_default(),
        xml: None,
        resource_uid,
    })
}
