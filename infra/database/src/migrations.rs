use crate::error::{DatabaseError, DatabaseErrorExt};
use fxhash::FxHashMap;
use sha2::{Digest, Sha256};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::types::SurrealValue;

const BOOTSTRAP: &str = "DEFINE TABLE IF NOT EXISTS migration SCHEMALESS;
DEFINE INDEX IF NOT EXISTS migration_version ON migration FIELDS slice, version UNIQUE;";

/// One versioned schema script owned by a feature slice.
///
/// Scripts are applied once, in the order given, each inside its own transaction. The SHA-256
/// of the script is recorded and re-verified on every start, so an applied script must never
/// be edited; add a new version instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub slice: &'static str,
    pub version: &'static str,
    pub script: &'static str,
}

impl Migration {
    #[must_use]
    pub const fn new(slice: &'static str, version: &'static str, script: &'static str) -> Self {
        Self { slice, version, script }
    }

    /// Hex-encoded SHA-256 of the script.
    #[must_use]
    pub fn checksum(&self) -> String {
        hex::encode(Sha256::digest(self.script.as_bytes()))
    }

    fn key(&self) -> String {
        format!("{}:{}", self.slice, self.version)
    }

    fn to_applied(self) -> AppliedMigration {
        AppliedMigration {
            slice: self.slice.to_owned(),
            version: self.version.to_owned(),
            checksum: self.checksum(),
        }
    }
}

/// Outcome of a migration run.
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub applied: Vec<AppliedMigration>,
    pub skipped: Vec<AppliedMigration>,
}

/// A row of the `migration` bookkeeping table.
#[derive(Debug, Clone, PartialEq, Eq, SurrealValue)]
pub struct AppliedMigration {
    pub slice: String,
    pub version: String,
    pub checksum: String,
}

#[derive(Debug)]
pub(crate) struct MigrationRunner<'a> {
    db: &'a Surreal<Any>,
}

impl<'a> MigrationRunner<'a> {
    pub(crate) const fn new(db: &'a Surreal<Any>) -> Self {
        Self { db }
    }

    pub(crate) async fn run(&self, migrations: &[Migration]) -> Result<MigrationReport, DatabaseError> {
        self.bootstrap().await?;

        let mut report = MigrationReport::default();
        let applied_migrations = self.get_migrations_map().await?;

        for migration in migrations {
            if let Some(applied) = applied_migrations.get(&migration.key()) {
                ensure_checksum_match(migration, &applied.checksum)?;
                report.skipped.push(migration.to_applied());
                continue;
            }

            self.apply_migration(migration).await?;
            report.applied.push(migration.to_applied());
        }

        Ok(report)
    }

    async fn bootstrap(&self) -> Result<(), DatabaseError> {
        self.db
            .query(BOOTSTRAP)
            .await
            .context("Bootstrapping migration table")?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(())
    }

    async fn apply_migration(&self, migration: &Migration) -> Result<(), DatabaseError> {
        let script = migration.script.trim().trim_end_matches(';');
        let query = format!(
            "BEGIN TRANSACTION;
            {script};
            CREATE migration SET slice = $slice, version = $version, checksum = $checksum, applied_at = time::now();
            COMMIT TRANSACTION;"
        );

        self.db
            .query(&query)
            .bind(("slice", migration.slice))
            .bind(("version", migration.version))
            .bind(("checksum", migration.checksum()))
            .await
            .context(format!("SQL execution failed at {}", migration.key()))?
            .check()
            .map_err(surrealdb::Error::from)
            .context(format!("Applying {}", migration.key()))?;

        Ok(())
    }

    async fn get_migrations_map(
        &self,
    ) -> Result<FxHashMap<String, AppliedMigration>, DatabaseError> {
        let entries = self
            .db
            .query("SELECT slice, version, checksum FROM migration")
            .await
            .context("Loading applied migrations")?
            .take::<Vec<AppliedMigration>>(0)
            .context("Parsing migrations map")?;

        Ok(entries
            .into_iter()
            .map(|entry| (format!("{}:{}", entry.slice, entry.version), entry))
            .collect())
    }
}

fn ensure_checksum_match(migration: &Migration, existing: &str) -> Result<(), DatabaseError> {
    let checksum = migration.checksum();
    if existing != checksum {
        return Err(DatabaseError::Migration {
            message: format!(
                "Checksum mismatch for {} (expected {existing}, got {checksum})",
                migration.key()
            )
            .into(),
            context: Some("Migration already applied with different checksum".into()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_sha256_hex() {
        let migration = Migration::new("blog", "0001", "");
        assert_eq!(
            migration.checksum(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn checksum_mismatch_is_reported() {
        let migration = Migration::new("blog", "0001", "DEFINE TABLE tag;");
        let err = ensure_checksum_match(&migration, "deadbeef").unwrap_err();
        assert!(matches!(err, DatabaseError::Migration { .. }));
        assert!(err.to_string().contains("blog:0001"));
        assert!(ensure_checksum_match(&migration, &migration.checksum()).is_ok());
    }
}
