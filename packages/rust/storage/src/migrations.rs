//! SQL migration definitions for the catalog records table.
//!
//! The records table name comes from configuration, so migrations are built
//! per table. Each migration is applied once, in ascending version order.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: String,
}

/// All migrations for `table`, in ascending version order.
///
/// `table` must already be validated as a plain SQL identifier.
pub(crate) fn all_migrations(table: &str) -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: catalog records table",
        sql: format!(
            r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    table_name TEXT NOT NULL,
    version    INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (table_name, version)
);

-- Catalog records; list and mapping columns hold JSON text
CREATE TABLE IF NOT EXISTS {table} (
    identifier       TEXT PRIMARY KEY,
    typename         TEXT,
    schema           TEXT,
    title            TEXT,
    abstract         TEXT,
    contact          TEXT,
    publication_date TEXT,
    begin_date       TEXT,
    end_date         TEXT,
    keywords         TEXT,
    geo_extent       TEXT,
    doi              TEXT,
    variables        TEXT,
    description      TEXT,
    documentation    TEXT
);

CREATE INDEX IF NOT EXISTS idx_{table}_typename ON {table}(typename);
CREATE INDEX IF NOT EXISTS idx_{table}_title ON {table}(title);

INSERT INTO schema_migrations (table_name, version) VALUES ('{table}', 1);
"#
        ),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_use_table_name() {
        let migrations = all_migrations("cds_records");
        assert_eq!(migrations.len(), 1);
        assert!(migrations[0].sql.contains("CREATE TABLE IF NOT EXISTS cds_records ("));
        assert!(migrations[0].sql.contains("idx_cds_records_typename"));
    }
}
