use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_TICK_SECS: u64 = 30;
pub const DEFAULT_BACKUP_TIMEOUT_SECS: u64 = 1800; // 30 min per backup attempt
pub const DEFAULT_MIGRATION_TIMEOUT_SECS: u64 = 3600;

/// Top-level config (config.toml + YEDEK_* env overrides).
///
/// The engine catalog and the migration pair table ship with compiled-in
/// defaults so a bare install works out of the box; deployments override or
/// extend them in TOML without touching code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YedekConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
    #[serde(default = "default_engines")]
    pub engines: BTreeMap<String, EngineSpec>,
}

impl Default for YedekConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            backup: BackupConfig::default(),
            scheduler: SchedulerConfig::default(),
            migration: MigrationConfig::default(),
            engines: default_engines(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Root directory for produced artifacts; one subdirectory per job id.
    #[serde(default = "default_backup_dir")]
    pub dir: String,
    #[serde(default = "default_backup_timeout")]
    pub timeout_secs: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: default_backup_dir(),
            timeout_secs: DEFAULT_BACKUP_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How often the scheduler loop scans for due jobs.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: DEFAULT_TICK_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    #[serde(default = "default_migration_timeout")]
    pub timeout_secs: u64,
    /// Supported source/target pairs with their command templates. Order is
    /// preserved: `targets_for` lists targets as configured.
    #[serde(default = "default_pairs")]
    pub pairs: Vec<MigrationPair>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_MIGRATION_TIMEOUT_SECS,
            pairs: default_pairs(),
        }
    }
}

impl MigrationConfig {
    pub fn pair(&self, source: &str, target: &str) -> Option<&MigrationPair> {
        self.pairs
            .iter()
            .find(|p| p.source == source && p.target == target)
    }

    /// Source engines in first-appearance order, deduplicated.
    pub fn sources(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for p in &self.pairs {
            if !out.contains(&p.source) {
                out.push(p.source.clone());
            }
        }
        out
    }

    pub fn targets_for(&self, source: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|p| p.source == source)
            .map(|p| p.target.clone())
            .collect()
    }
}

/// One engine's capability set. Engines without a `backup_command` are
/// migration-only and cannot back a scheduled job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSpec {
    pub default_port: Option<u16>,
    pub backup_command: Option<String>,
    /// File extension of produced artifacts (sql, bak, archive, ...).
    #[serde(default = "default_artifact_ext")]
    pub artifact_ext: String,
}

/// One supported migration direction with its command and info templates.
/// Placeholders use `src_`/`dst_` prefixes, e.g. `{src_host}`, `{dst_port}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationPair {
    pub source: String,
    pub target: String,
    pub command: String,
    pub info: String,
}

impl YedekConfig {
    /// Load config from a TOML file with YEDEK_* env var overrides.
    /// Falls back to `~/.yedek/config.toml` when no path is given; a missing
    /// file simply yields the defaults.
    ///
    /// Env vars nest on a double underscore so single-level keys can keep
    /// theirs: `YEDEK_BACKUP__TIMEOUT_SECS` maps to `backup.timeout_secs`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        debug!(path = %path, "loading configuration");

        let config: YedekConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("YEDEK_").split("__"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        debug!(
            engines = config.engines.len(),
            pairs = config.migration.pairs.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn engine(&self, name: &str) -> Option<&EngineSpec> {
        self.engines.get(name)
    }

    /// Catalog keys in stable (alphabetical) order.
    pub fn engine_names(&self) -> Vec<&str> {
        self.engines.keys().map(String::as_str).collect()
    }
}

fn default_tick_secs() -> u64 {
    DEFAULT_TICK_SECS
}
fn default_backup_timeout() -> u64 {
    DEFAULT_BACKUP_TIMEOUT_SECS
}
fn default_migration_timeout() -> u64 {
    DEFAULT_MIGRATION_TIMEOUT_SECS
}
fn default_artifact_ext() -> String {
    "sql".to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.yedek/yedek.db", home)
}
fn default_backup_dir() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.yedek/backups", home)
}
fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.yedek/config.toml", home)
}

fn engine(port: Option<u16>, backup_command: Option<&str>, ext: &str) -> EngineSpec {
    EngineSpec {
        default_port: port,
        backup_command: backup_command.map(String::from),
        artifact_ext: ext.to_string(),
    }
}

fn default_engines() -> BTreeMap<String, EngineSpec> {
    let mut m = BTreeMap::new();
    m.insert(
        "MySQL".to_string(),
        engine(
            Some(3306),
            Some("mysqldump --host {host} --port {port} -u{username} -p{password} --single-transaction {database} > {output}"),
            "sql",
        ),
    );
    m.insert(
        "MariaDB".to_string(),
        engine(
            Some(3306),
            Some("mysqldump --host {host} --port {port} -u{username} -p{password} --single-transaction {database} > {output}"),
            "sql",
        ),
    );
    m.insert(
        "PostgreSQL".to_string(),
        engine(
            Some(5432),
            Some("pg_dump \"postgresql://{username}:{password}@{host}:{port}/{database}\" > {output}"),
            "sql",
        ),
    );
    m.insert(
        "MSSQL".to_string(),
        engine(
            Some(1433),
            Some("sqlcmd -S {host},{port} -U {username} -P {password} -Q \"BACKUP DATABASE [{database}] TO DISK='{output}'\""),
            "bak",
        ),
    );
    m.insert(
        "MongoDB".to_string(),
        engine(
            Some(27017),
            Some("mongodump --host {host} --port {port} -u {username} -p {password} --db {database} --archive={output}"),
            "archive",
        ),
    );
    m.insert(
        "SQLite".to_string(),
        engine(None, Some("sqlite3 {database} \".dump\" > {output}"), "sql"),
    );
    // Migration-only engines: present in the matrix, no scheduled backups.
    m.insert("Oracle".to_string(), engine(Some(1521), None, "sql"));
    m.insert("Elasticsearch".to_string(), engine(Some(9200), None, "sql"));
    m
}

fn pair(source: &str, target: &str, command: &str, info: &str) -> MigrationPair {
    MigrationPair {
        source: source.to_string(),
        target: target.to_string(),
        command: command.to_string(),
        info: info.to_string(),
    }
}

fn default_pairs() -> Vec<MigrationPair> {
    vec![
        pair(
            "MySQL",
            "PostgreSQL",
            "pgloader mysql://{src_username}:{src_password}@{src_host}:{src_port}/{src_database} postgresql://{dst_username}:{dst_password}@{dst_host}:{dst_port}/{dst_database}",
            "pgloader streams schema and data from MySQL {src_database} into PostgreSQL {dst_database}",
        ),
        pair(
            "MySQL",
            "MariaDB",
            "mysqldump --host {src_host} --port {src_port} -u{src_username} -p{src_password} --single-transaction {src_database} | mysql --host {dst_host} --port {dst_port} -u{dst_username} -p{dst_password} {dst_database}",
            "logical dump piped straight into the MariaDB server; the dialects are wire-compatible",
        ),
        pair(
            "MariaDB",
            "MySQL",
            "mysqldump --host {src_host} --port {src_port} -u{src_username} -p{src_password} --single-transaction {src_database} | mysql --host {dst_host} --port {dst_port} -u{dst_username} -p{dst_password} {dst_database}",
            "logical dump piped straight into the MySQL server; the dialects are wire-compatible",
        ),
        pair(
            "MariaDB",
            "MariaDB",
            "mysqldump --host {src_host} --port {src_port} -u{src_username} -p{src_password} --single-transaction {src_database} | mysql --host {dst_host} --port {dst_port} -u{dst_username} -p{dst_password} {dst_database}",
            "server-to-server copy of {src_database} via mysqldump",
        ),
        pair(
            "PostgreSQL",
            "PostgreSQL",
            "pg_dump \"postgresql://{src_username}:{src_password}@{src_host}:{src_port}/{src_database}\" | psql \"postgresql://{dst_username}:{dst_password}@{dst_host}:{dst_port}/{dst_database}\"",
            "server-to-server copy of {src_database} via pg_dump",
        ),
        pair(
            "PostgreSQL",
            "MySQL",
            "pg_dump --data-only --column-inserts \"postgresql://{src_username}:{src_password}@{src_host}:{src_port}/{src_database}\" | mysql --host {dst_host} --port {dst_port} -u{dst_username} -p{dst_password} --force {dst_database}",
            "data-only transfer; the matching schema must already exist on the MySQL side",
        ),
        pair(
            "SQLite",
            "SQLite",
            "sqlite3 {src_database} \".dump\" | sqlite3 {dst_database}",
            "full logical copy between SQLite files",
        ),
        pair(
            "SQLite",
            "PostgreSQL",
            "pgloader sqlite://{src_database} postgresql://{dst_username}:{dst_password}@{dst_host}:{dst_port}/{dst_database}",
            "pgloader migrates the SQLite file {src_database} into PostgreSQL {dst_database}",
        ),
        pair(
            "Oracle",
            "PostgreSQL",
            "ora2pg --type COPY --source //{src_host}:{src_port}/{src_database} --user {src_username} --password {src_password} --pg_dsn \"dbi:Pg:dbname={dst_database};host={dst_host};port={dst_port}\" --pg_user {dst_username} --pg_pwd {dst_password}",
            "ora2pg copies Oracle tables into PostgreSQL {dst_database}",
        ),
        pair(
            "MSSQL",
            "PostgreSQL",
            "pgloader mssql://{src_username}:{src_password}@{src_host}:{src_port}/{src_database} postgresql://{dst_username}:{dst_password}@{dst_host}:{dst_port}/{dst_database}",
            "pgloader streams schema and data from SQL Server into PostgreSQL {dst_database}",
        ),
        pair(
            "MongoDB",
            "PostgreSQL",
            "mongoexport --host {src_host} --port {src_port} -u {src_username} -p {src_password} --db {src_database} | psql \"postgresql://{dst_username}:{dst_password}@{dst_host}:{dst_port}/{dst_database}\" -c \"\\copy imported_documents(doc) FROM STDIN\"",
            "one JSON document per row into imported_documents(doc); adjust the export flags to your collection layout",
        ),
        pair(
            "Elasticsearch",
            "Elasticsearch",
            "elasticdump --input=http://{src_username}:{src_password}@{src_host}:{src_port}/{src_database} --output=http://{dst_username}:{dst_password}@{dst_host}:{dst_port}/{dst_database}",
            "index-to-index copy of {src_database} via elasticdump",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_covers_backup_engines() {
        let cfg = YedekConfig::default();
        let mysql = cfg.engine("MySQL").unwrap();
        assert_eq!(mysql.default_port, Some(3306));
        assert!(mysql.backup_command.as_deref().unwrap().contains("mysqldump"));

        let pg = cfg.engine("PostgreSQL").unwrap();
        assert_eq!(pg.default_port, Some(5432));
        assert!(pg.backup_command.as_deref().unwrap().contains("pg_dump"));

        assert_eq!(cfg.engine("MSSQL").unwrap().default_port, Some(1433));
        assert_eq!(cfg.engine("MongoDB").unwrap().default_port, Some(27017));
    }

    #[test]
    fn migration_only_engines_have_no_backup_command() {
        let cfg = YedekConfig::default();
        assert!(cfg.engine("Oracle").unwrap().backup_command.is_none());
        assert!(cfg.engine("Elasticsearch").unwrap().backup_command.is_none());
    }

    #[test]
    fn matrix_lists_targets_in_configured_order() {
        let cfg = YedekConfig::default();
        assert_eq!(
            cfg.migration.targets_for("MySQL"),
            vec!["PostgreSQL".to_string(), "MariaDB".to_string()]
        );
        assert_eq!(
            cfg.migration.targets_for("Oracle"),
            vec!["PostgreSQL".to_string()]
        );
    }

    #[test]
    fn matrix_is_not_symmetric() {
        let cfg = YedekConfig::default();
        assert!(cfg.migration.pair("Oracle", "PostgreSQL").is_some());
        assert!(cfg.migration.pair("PostgreSQL", "Oracle").is_none());
        assert!(cfg.migration.pair("MariaDB", "Oracle").is_none());
    }

    #[test]
    fn sources_are_deduplicated_in_order() {
        let cfg = YedekConfig::default();
        let sources = cfg.migration.sources();
        assert_eq!(sources.first().map(String::as_str), Some("MySQL"));
        assert_eq!(sources.len(), 8);
    }

    #[test]
    fn unknown_engine_is_absent() {
        let cfg = YedekConfig::default();
        assert!(cfg.engine("Redis").is_none());
        assert!(cfg.migration.targets_for("Redis").is_empty());
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        figment::Jail::expect_with(|_jail| {
            let cfg = YedekConfig::load(Some("absent.toml")).unwrap();
            assert_eq!(cfg.scheduler.tick_secs, DEFAULT_TICK_SECS);
            assert_eq!(cfg.engines.len(), 8);
            Ok(())
        });
    }

    #[test]
    fn load_layers_toml_under_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    [scheduler]
                    tick_secs = 10
                "#,
            )?;
            jail.set_env("YEDEK_DATABASE__PATH", "/var/lib/yedek/yedek.db");
            // Double underscore nests; the key's own underscore survives.
            jail.set_env("YEDEK_BACKUP__TIMEOUT_SECS", "60");

            let cfg = YedekConfig::load(Some("config.toml")).unwrap();
            assert_eq!(cfg.scheduler.tick_secs, 10);
            assert_eq!(cfg.database.path, "/var/lib/yedek/yedek.db");
            assert_eq!(cfg.backup.timeout_secs, 60);
            Ok(())
        });
    }
}
