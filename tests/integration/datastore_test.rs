//! Datastore loading and result typing tests.

use pretty_assertions::assert_eq;
use rental_lens::catalog::{QueryCatalog, ReportParams};
use rental_lens::config::{Config, DatastoreConfig};
use rental_lens::db::{self, DatabaseClient, Value};
use rental_lens::error::ReportError;
use rental_lens::runner::QueryRunner;
use tempfile::tempdir;
use time::macros::datetime;

use super::{fixture_client, fixture_dir};

#[tokio::test]
async fn test_fixture_tables_are_registered() {
    let client = fixture_client().await;
    let catalog = QueryCatalog::new();
    let runner = QueryRunner::new(&client, &catalog);

    let schema = runner.tables().await.unwrap();
    let names = schema
        .tables
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>();

    assert_eq!(
        names,
        vec![
            "actor",
            "address",
            "category",
            "city",
            "customer",
            "film",
            "film_actor",
            "film_category",
            "inventory",
            "payment",
            "rental",
            "staff",
            "store",
        ]
    );
    assert_eq!(schema.table("rental").map(|t| t.row_count), Some(5));
    assert!(schema
        .format_for_display()
        .starts_with("Tables: 13 | Rows: "));
}

#[tokio::test]
async fn test_datetime_columns_are_timestamps() {
    let client = fixture_client().await;
    let catalog = QueryCatalog::new();
    let runner = QueryRunner::new(&client, &catalog);

    let result = runner
        .run_ad_hoc("SELECT rental_id, rental_date, return_date FROM rental ORDER BY rental_id")
        .await
        .unwrap()
        .result;

    assert_eq!(
        result.get(0, "rental_date"),
        Some(&Value::Timestamp(datetime!(2005-05-25 10:00:00)))
    );
    assert_eq!(result.get(4, "return_date"), Some(&Value::Null));
    assert_eq!(result.get(0, "rental_id"), Some(&Value::Int(1)));
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let client = fixture_client().await;
    let catalog = QueryCatalog::new();
    let runner = QueryRunner::new(&client, &catalog);

    let result = runner
        .run_ad_hoc("SELECT title, rental_duration FROM film WHERE film_id < 0")
        .await
        .unwrap()
        .result;

    assert!(result.is_empty());
    assert_eq!(result.column_names(), vec!["title", "rental_duration"]);
}

#[tokio::test]
async fn test_max_rows_truncates() {
    let client = fixture_client().await;
    let catalog = QueryCatalog::new();
    let runner = QueryRunner::new(&client, &catalog).with_max_rows(2);

    let result = runner
        .run_ad_hoc("SELECT payment_id FROM payment ORDER BY payment_id")
        .await
        .unwrap()
        .result;

    assert_eq!(result.row_count, 2);
    assert_eq!(result.total_rows, Some(5));
    assert!(result.was_truncated);
    assert_eq!(
        result.truncation_warning().as_deref(),
        Some("⚠ Result truncated: showing 2 of 5 rows")
    );
}

#[tokio::test]
async fn test_missing_data_dir_is_datastore_error() {
    let config = DatastoreConfig {
        data_dir: Some(fixture_dir().join("does-not-exist")),
        ..Default::default()
    };

    let error = db::open(&config).await.unwrap_err();
    assert!(matches!(error, ReportError::Datastore(_)));
    assert_eq!(error.category(), "Datastore Error");
}

#[tokio::test]
async fn test_file_backed_datastore_with_seed_files() {
    let dir = tempdir().unwrap();
    let config = DatastoreConfig {
        path: Some(dir.path().join("dvd.sqlite")),
        seed_files: vec![
            fixture_dir().join("category.sql"),
            fixture_dir().join("film_category.sql"),
        ],
        ..Default::default()
    };

    let client = db::open(&config).await.unwrap();
    let catalog = QueryCatalog::new();
    let runner = QueryRunner::new(&client, &catalog);

    let result = runner
        .run_ad_hoc("SELECT COUNT(*) AS n FROM film_category")
        .await
        .unwrap()
        .result;
    assert_eq!(result.get(0, "n"), Some(&Value::Int(5)));
    assert!(dir.path().join("dvd.sqlite").exists());
}

#[tokio::test]
async fn test_file_backed_datastore_reopens_without_reseeding() {
    let dir = tempdir().unwrap();
    let config = DatastoreConfig {
        path: Some(dir.path().join("dvd.sqlite")),
        data_dir: Some(fixture_dir()),
        ..Default::default()
    };

    let first = db::open(&config).await.unwrap();
    first.close().await.unwrap();

    let client = db::open(&config).await.unwrap();
    let catalog = QueryCatalog::new();
    let runner = QueryRunner::new(&client, &catalog);
    let result = runner
        .run_ad_hoc("SELECT COUNT(*) AS n FROM rental")
        .await
        .unwrap()
        .result;

    assert_eq!(result.get(0, "n"), Some(&Value::Int(5)));
}

#[tokio::test]
async fn test_timed_out_query_does_not_block_next_call() {
    let config = DatastoreConfig {
        data_dir: Some(fixture_dir()),
        query_timeout_secs: 1,
        ..Default::default()
    };
    let client = db::open(&config).await.unwrap();
    let catalog = QueryCatalog::new();
    let runner = QueryRunner::new(&client, &catalog);

    let error = runner
        .run_ad_hoc(
            "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 2000000000) \
             SELECT COUNT(*) FROM n",
        )
        .await
        .unwrap_err();
    assert!(matches!(error, ReportError::Query(_)), "{error:?}");
    assert!(error.to_string().contains("timed out"));

    let result = runner
        .run_ad_hoc("SELECT COUNT(*) AS films FROM film")
        .await
        .unwrap()
        .result;
    assert_eq!(result.get(0, "films"), Some(&Value::Int(4)));
}

#[tokio::test]
async fn test_custom_report_from_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[[reports.custom]]
id = "rentals_per_staff"
label = "Rentals per staff member"
sql = """
SELECT staff_id, COUNT(*) AS rental_count
FROM rental
GROUP BY staff_id
ORDER BY rental_count DESC
LIMIT {{top_n}}
"""
requires = ["rental"]
params = [{ name = "top_n", default = 5, min = 1 }]
"#,
    )
    .unwrap();
    let config = Config::load_from_file(&path).unwrap();

    let mut catalog = QueryCatalog::dvd_rental().unwrap();
    catalog.register_custom(&config.reports.custom).unwrap();
    assert_eq!(catalog.list().last().map(|(id, _)| *id), Some("rentals_per_staff"));

    let client = fixture_client().await;
    let runner = QueryRunner::new(&client, &catalog);
    let result = runner
        .run_catalog_entry("rentals_per_staff", &ReportParams::new().with("top_n", 1))
        .await
        .unwrap()
        .result;

    assert_eq!(result.row_count, 1);
    assert_eq!(result.get(0, "staff_id"), Some(&Value::Int(1)));
    assert_eq!(result.get(0, "rental_count"), Some(&Value::Int(4)));
}

#[tokio::test]
async fn test_custom_report_cannot_shadow_builtin() {
    let config = Config {
        reports: toml::from_str(
            r#"
[[custom]]
id = "top_spenders"
sql = "SELECT 1"
"#,
        )
        .unwrap(),
        ..Default::default()
    };

    let mut catalog = QueryCatalog::dvd_rental().unwrap();
    let error = catalog.register_custom(&config.reports.custom).unwrap_err();

    assert!(matches!(error, ReportError::DuplicateId(_)));
    assert!(catalog
        .get("top_spenders")
        .unwrap()
        .sql()
        .contains("SUM(p.amount)"));
}
