use std::fmt;

/// SQL flavour of the connected database, used in prompts and to pick the
/// default schema query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Sqlite,
    Postgres,
    MySql,
    /// Recognized for prompting; the bundled drivers cannot connect to it.
    MsSql,
    Other,
}

const SQLITE_SCHEMA_QUERY: &str = "SELECT 'main' AS table_catalog, 'main' AS table_schema, \
m.name AS table_name, p.name AS column_name, p.type AS data_type, \
p.\"notnull\" AS not_null, p.pk AS primary_key \
FROM sqlite_master AS m JOIN pragma_table_info(m.name) AS p \
WHERE m.type = 'table' AND m.name NOT LIKE 'sqlite_%' \
ORDER BY m.name, p.cid";

const POSTGRES_SCHEMA_QUERY: &str = "SELECT CAST(table_catalog AS TEXT) AS table_catalog, \
CAST(table_schema AS TEXT) AS table_schema, CAST(table_name AS TEXT) AS table_name, \
CAST(column_name AS TEXT) AS column_name, CAST(data_type AS TEXT) AS data_type, \
CAST(is_nullable AS TEXT) AS is_nullable \
FROM information_schema.columns \
WHERE table_schema NOT IN ('pg_catalog', 'information_schema') \
ORDER BY table_schema, table_name, ordinal_position";

const MYSQL_SCHEMA_QUERY: &str = "SELECT table_catalog, table_schema, table_name, column_name, \
data_type, is_nullable \
FROM information_schema.columns \
WHERE table_schema NOT IN ('mysql', 'information_schema', 'performance_schema', 'sys') \
ORDER BY table_schema, table_name, ordinal_position";

const INFORMATION_SCHEMA_QUERY: &str = "SELECT * FROM INFORMATION_SCHEMA.COLUMNS";

impl SqlDialect {
    /// Guess the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Self {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_default();
        match scheme.as_str() {
            "sqlite" => SqlDialect::Sqlite,
            "postgres" | "postgresql" => SqlDialect::Postgres,
            "mysql" | "mariadb" => SqlDialect::MySql,
            "mssql" | "sqlserver" => SqlDialect::MsSql,
            _ => SqlDialect::Other,
        }
    }

    /// Name used when telling the model which SQL to write.
    pub fn name(self) -> &'static str {
        match self {
            SqlDialect::Sqlite => "SQLite",
            SqlDialect::Postgres => "PostgreSQL",
            SqlDialect::MySql => "MySQL",
            SqlDialect::MsSql => "T-SQL",
            SqlDialect::Other => "SQL",
        }
    }

    /// Default information-schema style query; every variant projects
    /// `table_catalog`, `table_schema`, `table_name` and `column_name`.
    pub fn schema_query(self) -> &'static str {
        match self {
            SqlDialect::Sqlite => SQLITE_SCHEMA_QUERY,
            SqlDialect::Postgres => POSTGRES_SCHEMA_QUERY,
            SqlDialect::MySql => MYSQL_SCHEMA_QUERY,
            SqlDialect::MsSql | SqlDialect::Other => INFORMATION_SCHEMA_QUERY,
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
