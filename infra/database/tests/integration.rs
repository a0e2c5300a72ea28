use quill_database::*;
use quill_database::surrealdb;

const NOTES_V1: Migration = Migration::new(
    "notes",
    "0001",
    "DEFINE TABLE IF NOT EXISTS note SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS title ON note TYPE string;
DEFINE INDEX IF NOT EXISTS note_title ON note FIELDS title UNIQUE;",
);

async fn memory_db(migrations: &[Migration]) -> Database {
    Database::builder()
        .url("mem://")
        .session("test_ns", "test_db")
        .migrations(migrations.iter().copied())
        .init()
        .await
        .expect("connect to mem://")
}

#[tokio::test]
async fn connect_in_memory_and_health_check() {
    let db = memory_db(&[]).await;

    db.health().await.expect("health check");
    assert_eq!(db.namespace(), "test_ns");
    assert_eq!(db.database(), "test_db");
}

#[tokio::test]
async fn missing_parameters_fail_validation() {
    let err = Database::builder().init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));

    let err = Database::builder().url("mem://").session("", "db").init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));
}

#[tokio::test]
async fn migrations_are_applied_once() {
    let db = memory_db(&[NOTES_V1]).await;

    let report = db.migrate(&[NOTES_V1]).await.expect("second run");
    assert!(report.applied.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].checksum, NOTES_V1.checksum());
}

#[tokio::test]
async fn edited_migration_is_rejected() {
    let db = memory_db(&[NOTES_V1]).await;

    let edited = Migration::new("notes", "0001", "DEFINE TABLE IF NOT EXISTS note SCHEMALESS;");
    let err = db.migrate(&[edited]).await.unwrap_err();
    assert!(matches!(err, DatabaseError::Migration { .. }));
}

#[tokio::test]
async fn failing_migration_is_not_recorded() {
    let db = memory_db(&[]).await;

    let broken = Migration::new("notes", "0002", "THIS IS NOT SURREALQL;");
    assert!(db.migrate(&[broken]).await.is_err());

    let applied: Vec<AppliedMigration> = db
        .query("SELECT slice, version, checksum FROM migration")
        .await
        .expect("query")
        .take(0)
        .expect("rows");
    assert!(applied.is_empty());
}

#[tokio::test]
async fn unique_index_violations_are_detected() {
    let db = memory_db(&[NOTES_V1]).await;

    db.query("CREATE note SET title = 'first'")
        .await
        .expect("create")
        .check()
        .map_err(surrealdb::Error::from)
        .expect("first title accepted");
    let err = db
        .query("CREATE note SET title = 'first'")
        .await
        .expect("query")
        .check()
        .map_err(surrealdb::Error::from)
        .err()
        .expect("duplicate title rejected");
    assert!(is_unique_violation(&err));
    assert!(!is_transaction_conflict(&err));
}

#[tokio::test]
async fn thrown_errors_are_neither_conflicts_nor_violations() {
    let db = memory_db(&[NOTES_V1]).await;

    let err = db
        .query(
            "BEGIN TRANSACTION;
            IF (SELECT VALUE title FROM note WHERE title = 'absent').is_empty() { THROW 'missing note' };
            CREATE note SET title = 'orphan';
            COMMIT TRANSACTION;",
        )
        .await
        .expect("query")
        .check()
        .map_err(surrealdb::Error::from)
        .err()
        .expect("guard aborts the transaction");
    assert!(err.to_string().contains("missing note"));
    assert!(!is_transaction_conflict(&err));
    assert!(!is_unique_violation(&err));

    let titles: Vec<String> =
        db.query("SELECT VALUE title FROM note").await.expect("query").take(0).expect("titles");
    assert!(titles.is_empty());
}
