//! Read-only guarantees of the sealed datastore.

use rental_lens::catalog::QueryCatalog;
use rental_lens::db::{DatabaseClient, Value};
use rental_lens::error::ReportError;
use rental_lens::runner::QueryRunner;

use super::fixture_client;

#[tokio::test]
async fn test_drop_table_is_rejected_and_table_survives() {
    let client = fixture_client().await;
    let catalog = QueryCatalog::dvd_rental().unwrap();
    let runner = QueryRunner::new(&client, &catalog);

    let error = runner.run_ad_hoc("DROP TABLE film").await.unwrap_err();
    assert!(matches!(error, ReportError::ReadOnlyViolation(_)));
    assert_eq!(error.category(), "Read-Only Violation");

    let outcome = runner
        .run_ad_hoc("SELECT COUNT(*) AS films FROM film")
        .await
        .unwrap();
    assert_eq!(outcome.result.get(0, "films"), Some(&Value::Int(4)));
}

#[tokio::test]
async fn test_writes_are_rejected() {
    let client = fixture_client().await;
    let catalog = QueryCatalog::new();
    let runner = QueryRunner::new(&client, &catalog);

    for sql in [
        "INSERT INTO category VALUES (99, 'Horror')",
        "UPDATE payment SET amount = 0",
        "DELETE FROM rental",
        "CREATE TABLE scratch (id INTEGER)",
        "ALTER TABLE film ADD COLUMN notes TEXT",
        "SELECT 1; DELETE FROM rental",
        "PRAGMA query_only = OFF",
    ] {
        let error = runner.run_ad_hoc(sql).await.unwrap_err();
        assert!(
            matches!(error, ReportError::ReadOnlyViolation(_)),
            "{sql} gave {error:?}"
        );
    }

    let outcome = runner
        .run_ad_hoc("SELECT SUM(amount) AS revenue FROM payment")
        .await
        .unwrap();
    assert_eq!(outcome.result.get(0, "revenue"), Some(&Value::Float(70.0)));
}

#[tokio::test]
async fn test_engine_refuses_writes_after_seal() {
    let client = fixture_client().await;
    assert!(client.is_sealed());

    // Bypasses the classifier and goes straight to the engine.
    let error = client
        .execute_query("INSERT INTO category VALUES (99, 'Horror')", 10)
        .await
        .unwrap_err();
    assert!(matches!(error, ReportError::ReadOnlyViolation(_)), "{error:?}");

    let error = client
        .execute_script("DELETE FROM rental")
        .await
        .unwrap_err();
    assert!(matches!(error, ReportError::ReadOnlyViolation(_)));
}

#[tokio::test]
async fn test_unparseable_sql_is_query_error() {
    let client = fixture_client().await;
    let catalog = QueryCatalog::new();
    let runner = QueryRunner::new(&client, &catalog);

    let error = runner.run_ad_hoc("SELEC * FRM film").await.unwrap_err();
    assert!(matches!(error, ReportError::Query(_)), "{error:?}");
}

#[tokio::test]
async fn test_unknown_column_is_query_error() {
    let client = fixture_client().await;
    let catalog = QueryCatalog::new();
    let runner = QueryRunner::new(&client, &catalog);

    let error = runner
        .run_ad_hoc("SELECT emal FROM customer")
        .await
        .unwrap_err();
    assert!(matches!(error, ReportError::Query(_)));
    assert!(error.to_string().contains("emal"));
}
