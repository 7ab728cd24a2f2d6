//! Built-in report integration tests against the fixture dataset.

use pretty_assertions::assert_eq;
use rental_lens::catalog::{QueryCatalog, ReportParams};
use rental_lens::db::{QueryResult, Value};
use rental_lens::error::ReportError;
use rental_lens::runner::{QueryRunner, QuerySource};

use super::{assert_close, client_with_script, column, fixture_client, float, text};

async fn run_report(id: &str, params: ReportParams) -> QueryResult {
    let client = fixture_client().await;
    let catalog = QueryCatalog::dvd_rental().unwrap();
    let runner = QueryRunner::new(&client, &catalog);

    let outcome = runner.run_catalog_entry(id, &params).await.unwrap();
    assert_eq!(outcome.source, QuerySource::Catalog(id.to_string()));
    outcome.result
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|v| Value::Int(*v)).collect()
}

fn texts(values: &[&str]) -> Vec<Value> {
    values.iter().map(|v| Value::from(*v)).collect()
}

#[tokio::test]
async fn test_every_builtin_runs_on_fixture() {
    let client = fixture_client().await;
    let catalog = QueryCatalog::dvd_rental().unwrap();
    let runner = QueryRunner::new(&client, &catalog);

    for (id, _) in catalog.list() {
        let outcome = runner.run_catalog_entry(id, &ReportParams::new()).await;
        assert!(outcome.is_ok(), "{id} failed: {:?}", outcome.err());
    }
}

#[tokio::test]
async fn test_top_spender_is_largest_total() {
    let result = run_report("top_spenders", ReportParams::new().with("top_n", 1)).await;

    assert_eq!(result.row_count, 1);
    assert_eq!(text(&result, 0, "fullname"), "Ann Lee");
    assert_close(float(&result, 0, "total_spent"), 60.0);
}

#[tokio::test]
async fn test_top_spenders_ties_by_customer_id() {
    let result = run_report("top_spenders", ReportParams::new()).await;

    // Bob and Cy both spent 5.
    assert_eq!(column(&result, "customer_id"), ints(&[1, 2, 3]));
    assert_close(float(&result, 1, "total_spent"), 5.0);
    assert_close(float(&result, 2, "total_spent"), 5.0);
}

#[tokio::test]
async fn test_top_n_property() {
    let script = "\
        CREATE TABLE customer (customer_id INTEGER, first_name TEXT, last_name TEXT);
        CREATE TABLE payment (payment_id INTEGER, customer_id INTEGER, amount REAL);
        INSERT INTO customer VALUES (1, 'A', 'One'), (2, 'B', 'Two'), (3, 'C', 'Three'), (4, 'D', 'Four');
        INSERT INTO payment VALUES
            (1, 1, 10), (2, 1, 20), (3, 1, 30),
            (4, 2, 5),
            (5, 3, 40), (6, 3, 1),
            (7, 4, 7);";
    let client = client_with_script(script).await;
    let catalog = QueryCatalog::dvd_rental().unwrap();
    let runner = QueryRunner::new(&client, &catalog);

    let outcome = runner
        .run_catalog_entry("top_spenders", &ReportParams::new().with("top_n", 2))
        .await
        .unwrap();
    let result = outcome.result;

    assert_eq!(result.row_count, 2);
    assert_eq!(column(&result, "customer_id"), ints(&[1, 3]));
    assert_close(float(&result, 0, "total_spent"), 60.0);
    assert_close(float(&result, 1, "total_spent"), 41.0);
}

#[tokio::test]
async fn test_top_renters() {
    let result = run_report("top_renters", ReportParams::new()).await;

    assert_eq!(column(&result, "customer_id"), ints(&[1, 2, 3]));
    assert_eq!(column(&result, "rental_count"), ints(&[3, 1, 1]));
}

#[tokio::test]
async fn test_customer_spend_pareto() {
    let result = run_report("customer_spend_pareto", ReportParams::new()).await;

    assert_eq!(result.row_count, 3);
    assert_close(float(&result, 0, "cumulative_share"), 60.0 / 70.0);
    assert_close(float(&result, 1, "cumulative_share"), 65.0 / 70.0);
    assert_close(float(&result, 2, "cumulative_share"), 1.0);
}

#[tokio::test]
async fn test_monthly_rentals_by_store() {
    let result = run_report("monthly_rentals_by_store", ReportParams::new()).await;

    assert_eq!(
        column(&result, "rental_month"),
        texts(&["2005-05", "2005-05", "2005-06", "2005-07"])
    );
    assert_eq!(column(&result, "store_id"), ints(&[1, 2, 1, 1]));
    assert_eq!(column(&result, "rental_count"), ints(&[1, 1, 2, 1]));
}

#[tokio::test]
async fn test_rentals_heatmap() {
    let result = run_report("rentals_heatmap", ReportParams::new()).await;

    assert_eq!(result.row_count, 1);
    assert_eq!(result.column_names().len(), 13);
    assert_eq!(result.get(0, "rental_year"), Some(&Value::Int(2005)));
    assert_eq!(result.get(0, "m04"), Some(&Value::Int(0)));
    assert_eq!(result.get(0, "m05"), Some(&Value::Int(2)));
    assert_eq!(result.get(0, "m06"), Some(&Value::Int(2)));
    assert_eq!(result.get(0, "m07"), Some(&Value::Int(1)));
}

#[tokio::test]
async fn test_monthly_revenue() {
    let result = run_report("monthly_revenue", ReportParams::new()).await;

    assert_eq!(
        column(&result, "payment_month"),
        texts(&["2005-05", "2005-06", "2005-07"])
    );
    assert_close(float(&result, 0, "revenue"), 30.0);
    assert_close(float(&result, 1, "revenue"), 35.0);
    assert_close(float(&result, 2, "revenue"), 5.0);
}

#[tokio::test]
async fn test_monthly_revenue_moving_average() {
    let result = run_report("monthly_revenue_moving_average", ReportParams::new()).await;

    assert_close(float(&result, 0, "moving_avg_3"), 30.0);
    assert_close(float(&result, 1, "moving_avg_3"), 32.5);
    assert_close(float(&result, 2, "moving_avg_3"), 70.0 / 3.0);
    assert_close(float(&result, 2, "moving_avg_6"), 70.0 / 3.0);
}

#[tokio::test]
async fn test_monthly_revenue_growth() {
    let result = run_report("monthly_revenue_growth", ReportParams::new()).await;

    assert_eq!(result.row_count, 3);
    assert_eq!(result.get(0, "growth_rate"), Some(&Value::Float(0.0)));
    assert!(result.get(0, "previous_revenue").is_some_and(Value::is_null));
    assert_close(float(&result, 1, "growth_rate"), (35.0 - 30.0) / 30.0);
    assert_close(float(&result, 2, "growth_rate"), (5.0 - 35.0) / 35.0);
}

#[tokio::test]
async fn test_growth_after_zero_revenue_month_is_null() {
    let script = "\
        CREATE TABLE payment (payment_id INTEGER, amount REAL, payment_date DATETIME);
        INSERT INTO payment VALUES
            (1, 10, '2005-05-01 00:00:00'),
            (2, 0, '2005-06-01 00:00:00'),
            (3, 4, '2005-07-01 00:00:00');";
    let client = client_with_script(script).await;
    let catalog = QueryCatalog::dvd_rental().unwrap();
    let runner = QueryRunner::new(&client, &catalog);

    let result = runner
        .run_catalog_entry("monthly_revenue_growth", &ReportParams::new())
        .await
        .unwrap()
        .result;

    assert_eq!(result.get(0, "growth_rate"), Some(&Value::Float(0.0)));
    assert_close(float(&result, 1, "growth_rate"), -1.0);
    assert_eq!(result.get(2, "growth_rate"), Some(&Value::Null));
}

#[tokio::test]
async fn test_film_duration_quartiles() {
    let result = run_report("film_duration_quartiles", ReportParams::new()).await;

    assert_eq!(
        column(&result, "category_name"),
        texts(&["Animation", "Children", "Comedy", "Music"])
    );
    assert_eq!(column(&result, "standard_quartile"), ints(&[1, 4, 1, 2]));
    assert_eq!(column(&result, "film_count"), ints(&[1, 1, 1, 1]));
}

#[tokio::test]
async fn test_family_film_rentals() {
    let result = run_report("family_film_rentals", ReportParams::new()).await;

    assert_eq!(
        column(&result, "category_name"),
        texts(&["Animation", "Comedy", "Children"])
    );
    assert_eq!(
        column(&result, "film_title"),
        texts(&["Alpha Toon", "Alpha Toon", "Gamma Kids"])
    );
    assert_eq!(column(&result, "rental_count"), ints(&[3, 3, 1]));
}

#[tokio::test]
async fn test_revenue_by_category_does_not_double_count() {
    let result = run_report("revenue_by_category", ReportParams::new()).await;

    assert_eq!(
        column(&result, "category_name"),
        texts(&["Animation", "Comedy", "Drama", "Children"])
    );
    // Alpha Toon earned 35 across three payments and sits in two categories.
    assert_close(float(&result, 0, "total_revenue"), 35.0);
    assert_close(float(&result, 1, "total_revenue"), 35.0);
    assert_close(float(&result, 2, "total_revenue"), 30.0);
    assert_close(float(&result, 3, "total_revenue"), 5.0);
}

#[tokio::test]
async fn test_revenue_by_city() {
    let result = run_report("revenue_by_city", ReportParams::new()).await;

    assert_eq!(
        column(&result, "city_name"),
        texts(&["Lethbridge", "Woodridge"])
    );
    assert_eq!(column(&result, "customer_count"), ints(&[1, 2]));
    assert_close(float(&result, 0, "total_revenue"), 60.0);
    assert_close(float(&result, 1, "total_revenue"), 10.0);
}

#[tokio::test]
async fn test_revenue_by_actor() {
    let result = run_report("revenue_by_actor", ReportParams::new()).await;

    assert_eq!(
        column(&result, "actor_name"),
        texts(&["Penelope Guiness", "Nick Wahlberg"])
    );
    assert_close(float(&result, 0, "total_revenue"), 65.0);
    assert_close(float(&result, 1, "total_revenue"), 35.0);
}

#[tokio::test]
async fn test_actor_category_revenue() {
    let result = run_report("actor_category_revenue", ReportParams::new()).await;

    assert_eq!(result.row_count, 5);
    assert_eq!(text(&result, 0, "actor_name"), "Nick Wahlberg");
    assert_eq!(text(&result, 0, "category_name"), "Animation");
    assert_close(float(&result, 0, "total_revenue"), 35.0);
    assert_eq!(text(&result, 4, "category_name"), "Drama");
    assert_close(float(&result, 4, "total_revenue"), 30.0);
}

#[tokio::test]
async fn test_availability_counts_distinct_copies() {
    let result = run_report("film_availability_vs_demand", ReportParams::new()).await;

    assert_eq!(text(&result, 0, "film_title"), "Alpha Toon");
    assert_eq!(result.get(0, "available_copies"), Some(&Value::Int(2)));
    assert_eq!(result.get(0, "rental_count"), Some(&Value::Int(3)));

    assert_eq!(text(&result, 3, "film_title"), "Delta Music");
    assert_eq!(result.get(3, "available_copies"), Some(&Value::Int(0)));
    assert_eq!(result.get(3, "rental_count"), Some(&Value::Int(0)));
}

#[tokio::test]
async fn test_film_roi_null_for_zero_cost() {
    let result = run_report("film_roi", ReportParams::new()).await;

    assert_eq!(
        column(&result, "film_title"),
        texts(&["Alpha Toon", "Beta Drama", "Gamma Kids", "Delta Music"])
    );
    assert_close(float(&result, 0, "roi"), 35.0 / 20.0);
    assert_close(float(&result, 1, "roi"), 30.0 / 20.0);
    assert_eq!(result.get(2, "roi"), Some(&Value::Null));
    assert_eq!(result.get(3, "roi"), Some(&Value::Null));
}

#[tokio::test]
async fn test_loyalty_tier_boundaries() {
    let script = "\
        CREATE TABLE customer (customer_id INTEGER, first_name TEXT, last_name TEXT);
        CREATE TABLE rental (rental_id INTEGER, customer_id INTEGER);
        INSERT INTO customer VALUES
            (1, 'C', '50'), (2, 'C', '49'), (3, 'C', '30'),
            (4, 'C', '29'), (5, 'C', '10'), (6, 'C', '9'), (7, 'C', '0');
        WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 50)
        INSERT INTO rental (rental_id, customer_id)
        SELECT c.customer_id * 100 + n.i, c.customer_id
        FROM customer c
        JOIN n ON n.i <= CAST(c.last_name AS INTEGER);";
    let client = client_with_script(script).await;
    let catalog = QueryCatalog::dvd_rental().unwrap();
    let runner = QueryRunner::new(&client, &catalog);

    let result = runner
        .run_catalog_entry("loyalty_tiers", &ReportParams::new())
        .await
        .unwrap()
        .result;

    assert_eq!(column(&result, "rental_count"), ints(&[50, 49, 30, 29, 10, 9, 0]));
    assert_eq!(
        column(&result, "loyalty_tier"),
        texts(&["Platinum", "Gold", "Gold", "Silver", "Silver", "Bronze", "Bronze"])
    );
}

#[tokio::test]
async fn test_loyalty_thresholds_are_parameters() {
    let result = run_report(
        "loyalty_tiers",
        ReportParams::new()
            .with("platinum_min", 3)
            .with("gold_min", 2)
            .with("silver_min", 1),
    )
    .await;

    assert_eq!(column(&result, "customer_id"), ints(&[1, 2, 3, 4]));
    assert_eq!(
        column(&result, "loyalty_tier"),
        texts(&["Platinum", "Silver", "Silver", "Bronze"])
    );
}

#[tokio::test]
async fn test_loyalty_thresholds_must_descend() {
    let client = fixture_client().await;
    let catalog = QueryCatalog::dvd_rental().unwrap();
    let runner = QueryRunner::new(&client, &catalog);

    for params in [
        ReportParams::new().with("platinum_min", 10).with("gold_min", 30),
        ReportParams::new().with("gold_min", 10),
        ReportParams::new().with("silver_min", 30),
    ] {
        let error = runner
            .run_catalog_entry("loyalty_tiers", &params)
            .await
            .unwrap_err();
        assert!(
            matches!(error, ReportError::InvalidParameter(_)),
            "{params:?} gave {error:?}"
        );
    }

    let error = runner
        .run_catalog_entry(
            "loyalty_tiers",
            &ReportParams::new().with("platinum_min", 10).with("gold_min", 30),
        )
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "Invalid parameter: 'platinum_min' (10) must be greater than 'gold_min' (30)"
    );
}

#[tokio::test]
async fn test_return_status() {
    let result = run_report("return_status", ReportParams::new()).await;

    assert_eq!(
        column(&result, "return_status"),
        texts(&["Late", "On Time", "Outstanding"])
    );
    // A rental held exactly its rental duration is on time.
    assert_eq!(column(&result, "rental_count"), ints(&[1, 3, 1]));
    assert_close(float(&result, 0, "total_amount"), 20.0);
    assert_close(float(&result, 1, "total_amount"), 45.0);
    assert_close(float(&result, 2, "total_amount"), 5.0);
}

#[tokio::test]
async fn test_missing_tables_are_named() {
    let client = client_with_script("CREATE TABLE rental (rental_id INTEGER);").await;
    let catalog = QueryCatalog::dvd_rental().unwrap();
    let runner = QueryRunner::new(&client, &catalog);

    let error = runner
        .run_catalog_entry("monthly_rentals_by_store", &ReportParams::new())
        .await
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "Report 'monthly_rentals_by_store' requires missing tables: staff, store"
    );
    assert!(matches!(error, ReportError::MissingTables { .. }));
}
