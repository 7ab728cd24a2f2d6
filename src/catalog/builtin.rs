//! Built-in DVD rental reports.
//!
//! Every template targets SQLite. Revenue is always aggregated at its natural
//! grain (per film, per customer) before it is joined to a one-to-many
//! dimension, so a film with several categories or actors is never counted
//! twice within one group.

use super::{CatalogEntry, QueryCatalog, ReportParam};
use crate::error::Result;

/// Categories treated as family-friendly.
const FAMILY_CATEGORIES: &str =
    "'Animation', 'Children', 'Classics', 'Comedy', 'Family', 'Music'";

const TOP_SPENDERS: &str = "\
SELECT c.first_name || ' ' || c.last_name AS fullname,
       p.customer_id,
       SUM(p.amount) AS total_spent
FROM payment p
JOIN customer c ON c.customer_id = p.customer_id
GROUP BY p.customer_id, c.first_name, c.last_name
ORDER BY total_spent DESC, p.customer_id ASC
LIMIT {{top_n}}";

const TOP_RENTERS: &str = "\
SELECT c.first_name || ' ' || c.last_name AS fullname,
       r.customer_id,
       COUNT(r.rental_id) AS rental_count
FROM rental r
JOIN customer c ON c.customer_id = r.customer_id
GROUP BY r.customer_id, c.first_name, c.last_name
ORDER BY rental_count DESC, r.customer_id ASC
LIMIT {{top_n}}";

const CUSTOMER_SPEND_PARETO: &str = "\
WITH customer_spend AS (
    SELECT customer_id, SUM(amount) AS total_spent
    FROM payment
    GROUP BY customer_id
)
SELECT c.first_name || ' ' || c.last_name AS fullname,
       s.customer_id,
       s.total_spent,
       SUM(s.total_spent) OVER (
           ORDER BY s.total_spent DESC, s.customer_id
           ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW
       ) * 1.0 / NULLIF(SUM(s.total_spent) OVER (), 0) AS cumulative_share
FROM customer_spend s
JOIN customer c ON c.customer_id = s.customer_id
ORDER BY s.total_spent DESC, s.customer_id
LIMIT {{top_n}}";

const MONTHLY_RENTALS_BY_STORE: &str = "\
SELECT strftime('%Y-%m', r.rental_date) AS rental_month,
       st.store_id,
       COUNT(r.rental_id) AS rental_count
FROM rental r
JOIN staff st ON st.staff_id = r.staff_id
JOIN store s ON s.store_id = st.store_id
GROUP BY rental_month, st.store_id
ORDER BY rental_month, st.store_id";

const RENTALS_HEATMAP: &str = "\
WITH monthly AS (
    SELECT CAST(strftime('%Y', rental_date) AS INTEGER) AS rental_year,
           CAST(strftime('%m', rental_date) AS INTEGER) AS rental_month,
           COUNT(*) AS rental_count
    FROM rental
    GROUP BY rental_year, rental_month
)
SELECT rental_year,
       SUM(CASE WHEN rental_month = 1 THEN rental_count ELSE 0 END) AS m01,
       SUM(CASE WHEN rental_month = 2 THEN rental_count ELSE 0 END) AS m02,
       SUM(CASE WHEN rental_month = 3 THEN rental_count ELSE 0 END) AS m03,
       SUM(CASE WHEN rental_month = 4 THEN rental_count ELSE 0 END) AS m04,
       SUM(CASE WHEN rental_month = 5 THEN rental_count ELSE 0 END) AS m05,
       SUM(CASE WHEN rental_month = 6 THEN rental_count ELSE 0 END) AS m06,
       SUM(CASE WHEN rental_month = 7 THEN rental_count ELSE 0 END) AS m07,
       SUM(CASE WHEN rental_month = 8 THEN rental_count ELSE 0 END) AS m08,
       SUM(CASE WHEN rental_month = 9 THEN rental_count ELSE 0 END) AS m09,
       SUM(CASE WHEN rental_month = 10 THEN rental_count ELSE 0 END) AS m10,
       SUM(CASE WHEN rental_month = 11 THEN rental_count ELSE 0 END) AS m11,
       SUM(CASE WHEN rental_month = 12 THEN rental_count ELSE 0 END) AS m12
FROM monthly
WHERE rental_year IS NOT NULL
GROUP BY rental_year
ORDER BY rental_year";

const MONTHLY_REVENUE: &str = "\
SELECT strftime('%Y-%m', payment_date) AS payment_month,
       SUM(amount) AS revenue
FROM payment
GROUP BY payment_month
ORDER BY payment_month";

const MONTHLY_REVENUE_MOVING_AVERAGE: &str = "\
WITH monthly AS (
    SELECT strftime('%Y-%m', payment_date) AS payment_month,
           SUM(amount) AS revenue
    FROM payment
    GROUP BY payment_month
)
SELECT payment_month,
       revenue,
       AVG(revenue) OVER (
           ORDER BY payment_month ROWS BETWEEN 2 PRECEDING AND CURRENT ROW
       ) AS moving_avg_3,
       AVG(revenue) OVER (
           ORDER BY payment_month ROWS BETWEEN 5 PRECEDING AND CURRENT ROW
       ) AS moving_avg_6
FROM monthly
ORDER BY payment_month";

const MONTHLY_REVENUE_GROWTH: &str = "\
WITH monthly AS (
    SELECT strftime('%Y-%m', payment_date) AS payment_month,
           SUM(amount) * 1.0 AS revenue
    FROM payment
    GROUP BY payment_month
),
lagged AS (
    SELECT payment_month,
           revenue,
           LAG(revenue) OVER (ORDER BY payment_month) AS previous_revenue
    FROM monthly
)
SELECT payment_month,
       revenue,
       previous_revenue,
       CASE
           WHEN previous_revenue IS NULL THEN 0.0
           ELSE (revenue - previous_revenue) / NULLIF(previous_revenue, 0)
       END AS growth_rate
FROM lagged
ORDER BY payment_month";

fn film_duration_quartiles() -> String {
    format!(
        "\
WITH quartiles AS (
    SELECT film_id,
           NTILE(4) OVER (ORDER BY rental_duration, film_id) AS standard_quartile
    FROM film
)
SELECT c.name AS category_name,
       q.standard_quartile,
       COUNT(q.film_id) AS film_count
FROM quartiles q
JOIN film_category fc ON fc.film_id = q.film_id
JOIN category c ON c.category_id = fc.category_id
WHERE c.name IN ({FAMILY_CATEGORIES})
GROUP BY c.name, q.standard_quartile
ORDER BY c.name, q.standard_quartile"
    )
}

fn family_film_rentals() -> String {
    format!(
        "\
SELECT c.name AS category_name,
       f.title AS film_title,
       COUNT(r.rental_id) AS rental_count
FROM category c
JOIN film_category fc ON fc.category_id = c.category_id
JOIN film f ON f.film_id = fc.film_id
JOIN inventory i ON i.film_id = f.film_id
JOIN rental r ON r.inventory_id = i.inventory_id
WHERE c.name IN ({FAMILY_CATEGORIES})
GROUP BY c.name, f.film_id, f.title
ORDER BY rental_count DESC, category_name, film_title
LIMIT {{{{top_n}}}}"
    )
}

/// Revenue per film, the grain every revenue-attribution report starts from.
const FILM_REVENUE_CTE: &str = "\
WITH film_revenue AS (
    SELECT i.film_id, SUM(p.amount) AS revenue
    FROM payment p
    JOIN rental r ON r.rental_id = p.rental_id
    JOIN inventory i ON i.inventory_id = r.inventory_id
    GROUP BY i.film_id
)";

fn revenue_by_category() -> String {
    format!(
        "{FILM_REVENUE_CTE}
SELECT c.name AS category_name,
       COUNT(fr.film_id) AS film_count,
       SUM(fr.revenue) AS total_revenue
FROM category c
JOIN film_category fc ON fc.category_id = c.category_id
JOIN film_revenue fr ON fr.film_id = fc.film_id
GROUP BY c.category_id, c.name
ORDER BY total_revenue DESC, category_name"
    )
}

const REVENUE_BY_CITY: &str = "\
WITH customer_revenue AS (
    SELECT customer_id, SUM(amount) AS revenue
    FROM payment
    GROUP BY customer_id
)
SELECT ci.city AS city_name,
       COUNT(cr.customer_id) AS customer_count,
       SUM(cr.revenue) AS total_revenue
FROM customer_revenue cr
JOIN customer cu ON cu.customer_id = cr.customer_id
JOIN address a ON a.address_id = cu.address_id
JOIN city ci ON ci.city_id = a.city_id
GROUP BY ci.city_id, ci.city
ORDER BY total_revenue DESC, city_name
LIMIT {{top_n}}";

fn revenue_by_actor() -> String {
    format!(
        "{FILM_REVENUE_CTE}
SELECT a.actor_id,
       a.first_name || ' ' || a.last_name AS actor_name,
       COUNT(fr.film_id) AS film_count,
       SUM(fr.revenue) AS total_revenue
FROM actor a
JOIN film_actor fa ON fa.actor_id = a.actor_id
JOIN film_revenue fr ON fr.film_id = fa.film_id
GROUP BY a.actor_id, a.first_name, a.last_name
ORDER BY total_revenue DESC, a.actor_id
LIMIT {{{{top_n}}}}"
    )
}

fn actor_category_revenue() -> String {
    format!(
        "{FILM_REVENUE_CTE}
SELECT a.first_name || ' ' || a.last_name AS actor_name,
       c.name AS category_name,
       SUM(fr.revenue) AS total_revenue
FROM actor a
JOIN film_actor fa ON fa.actor_id = a.actor_id
JOIN film_category fc ON fc.film_id = fa.film_id
JOIN category c ON c.category_id = fc.category_id
JOIN film_revenue fr ON fr.film_id = fa.film_id
GROUP BY a.actor_id, a.first_name, a.last_name, c.category_id, c.name
ORDER BY total_revenue DESC, actor_name, category_name
LIMIT {{{{top_n}}}}"
    )
}

const FILM_AVAILABILITY_VS_DEMAND: &str = "\
SELECT f.title AS film_title,
       COUNT(DISTINCT i.inventory_id) AS available_copies,
       COUNT(r.rental_id) AS rental_count
FROM film f
LEFT JOIN inventory i ON i.film_id = f.film_id
LEFT JOIN rental r ON r.inventory_id = i.inventory_id
GROUP BY f.film_id, f.title
ORDER BY rental_count DESC, available_copies DESC, f.film_id
LIMIT {{top_n}}";

fn film_roi() -> String {
    format!(
        "{FILM_REVENUE_CTE},
film_copies AS (
    SELECT film_id, COUNT(inventory_id) AS copies
    FROM inventory
    GROUP BY film_id
)
SELECT f.title AS film_title,
       COALESCE(fcp.copies, 0) AS copies,
       f.replacement_cost,
       COALESCE(fr.revenue, 0) AS total_revenue,
       COALESCE(fcp.copies, 0) * f.replacement_cost AS total_cost,
       COALESCE(fr.revenue, 0) * 1.0
           / NULLIF(COALESCE(fcp.copies, 0) * f.replacement_cost, 0) AS roi
FROM film f
LEFT JOIN film_copies fcp ON fcp.film_id = f.film_id
LEFT JOIN film_revenue fr ON fr.film_id = f.film_id
ORDER BY roi IS NULL, roi DESC, f.film_id
LIMIT {{{{top_n}}}}"
    )
}

const LOYALTY_TIERS: &str = "\
WITH rental_counts AS (
    SELECT customer_id, COUNT(rental_id) AS rental_count
    FROM rental
    GROUP BY customer_id
)
SELECT c.customer_id,
       c.first_name || ' ' || c.last_name AS fullname,
       COALESCE(rc.rental_count, 0) AS rental_count,
       CASE
           WHEN COALESCE(rc.rental_count, 0) >= {{platinum_min}} THEN 'Platinum'
           WHEN COALESCE(rc.rental_count, 0) >= {{gold_min}} THEN 'Gold'
           WHEN COALESCE(rc.rental_count, 0) >= {{silver_min}} THEN 'Silver'
           ELSE 'Bronze'
       END AS loyalty_tier
FROM customer c
LEFT JOIN rental_counts rc ON rc.customer_id = c.customer_id
ORDER BY rental_count DESC, c.customer_id";

const RETURN_STATUS: &str = "\
WITH classified AS (
    SELECT r.rental_id,
           CASE
               WHEN r.return_date IS NULL THEN 'Outstanding'
               WHEN julianday(date(r.return_date)) - julianday(date(r.rental_date))
                    > f.rental_duration THEN 'Late'
               ELSE 'On Time'
           END AS return_status
    FROM rental r
    JOIN inventory i ON i.inventory_id = r.inventory_id
    JOIN film f ON f.film_id = i.film_id
),
rental_amounts AS (
    SELECT rental_id, SUM(amount) AS amount
    FROM payment
    GROUP BY rental_id
)
SELECT cl.return_status,
       COUNT(cl.rental_id) AS rental_count,
       COALESCE(SUM(ra.amount), 0) AS total_amount,
       AVG(ra.amount) AS avg_amount
FROM classified cl
LEFT JOIN rental_amounts ra ON ra.rental_id = cl.rental_id
GROUP BY cl.return_status
ORDER BY cl.return_status";

fn top_n(default: i64) -> ReportParam {
    ReportParam::new("top_n", default).min(1)
}

/// Registers every built-in report, in display order.
pub(super) fn register_all(catalog: &mut QueryCatalog) -> Result<()> {
    let entries = [
        CatalogEntry::new("top_spenders", "Top spending customers", TOP_SPENDERS)
            .with_description("Customers ranked by total payments; ties go to the lower customer id.")
            .requires(&["payment", "customer"])
            .with_param(top_n(3)),
        CatalogEntry::new("top_renters", "Most frequent renters", TOP_RENTERS)
            .with_description("Customers ranked by number of rentals.")
            .requires(&["rental", "customer"])
            .with_param(top_n(10)),
        CatalogEntry::new(
            "customer_spend_pareto",
            "Customer spend concentration",
            CUSTOMER_SPEND_PARETO,
        )
        .with_description("Per-customer spend with the running share of total revenue.")
        .requires(&["payment", "customer"])
        .with_param(top_n(30)),
        CatalogEntry::new(
            "monthly_rentals_by_store",
            "Monthly rentals by store",
            MONTHLY_RENTALS_BY_STORE,
        )
        .with_description("Rental counts per calendar month and store.")
        .requires(&["rental", "staff", "store"]),
        CatalogEntry::new("rentals_heatmap", "Rental heatmap by year and month", RENTALS_HEATMAP)
            .with_description("One row per year with a rental count column for each month.")
            .requires(&["rental"]),
        CatalogEntry::new("monthly_revenue", "Monthly revenue", MONTHLY_REVENUE)
            .with_description("Total payments per calendar month.")
            .requires(&["payment"]),
        CatalogEntry::new(
            "monthly_revenue_moving_average",
            "Monthly revenue moving averages",
            MONTHLY_REVENUE_MOVING_AVERAGE,
        )
        .with_description("Monthly revenue with trailing 3- and 6-month averages.")
        .requires(&["payment"]),
        CatalogEntry::new(
            "monthly_revenue_growth",
            "Month-over-month revenue growth",
            MONTHLY_REVENUE_GROWTH,
        )
        .with_description(
            "Growth rate against the previous month. The first month is 0; \
             a previous month with no revenue yields NULL.",
        )
        .requires(&["payment"]),
        CatalogEntry::new(
            "film_duration_quartiles",
            "Family film rental duration quartiles",
            film_duration_quartiles(),
        )
        .with_description("Films per family category in each rental duration quartile.")
        .requires(&["film", "film_category", "category"]),
        CatalogEntry::new(
            "family_film_rentals",
            "Family film rental counts",
            family_film_rentals(),
        )
        .with_description("Rentals per film within the family-friendly categories.")
        .requires(&["category", "film_category", "film", "inventory", "rental"])
        .with_param(top_n(500)),
        CatalogEntry::new("revenue_by_category", "Revenue by category", revenue_by_category())
            .with_description("Film revenue attributed to each of the film's categories.")
            .requires(&["payment", "rental", "inventory", "film_category", "category"]),
        CatalogEntry::new("revenue_by_city", "Revenue by customer city", REVENUE_BY_CITY)
            .with_description("Customer revenue grouped by the city of the customer address.")
            .requires(&["payment", "customer", "address", "city"])
            .with_param(top_n(20)),
        CatalogEntry::new("revenue_by_actor", "Revenue by actor", revenue_by_actor())
            .with_description("Revenue of the films each actor appears in.")
            .requires(&["payment", "rental", "inventory", "film_actor", "actor"])
            .with_param(top_n(20)),
        CatalogEntry::new(
            "actor_category_revenue",
            "Actor and category revenue flows",
            actor_category_revenue(),
        )
        .with_description("Revenue per actor and film category pair.")
        .requires(&[
            "payment",
            "rental",
            "inventory",
            "film_actor",
            "actor",
            "film_category",
            "category",
        ])
        .with_param(top_n(50)),
        CatalogEntry::new(
            "film_availability_vs_demand",
            "Film availability versus demand",
            FILM_AVAILABILITY_VS_DEMAND,
        )
        .with_description("Distinct inventory copies against rental count per film.")
        .requires(&["film", "inventory", "rental"])
        .with_param(top_n(50)),
        CatalogEntry::new("film_roi", "Film return on inventory", film_roi())
            .with_description(
                "Film revenue over copies times replacement cost; NULL when the cost is zero.",
            )
            .requires(&["film", "inventory", "rental", "payment"])
            .with_param(top_n(50)),
        CatalogEntry::new("loyalty_tiers", "Customer loyalty tiers", LOYALTY_TIERS)
            .with_description("Customers bucketed by rental count into Platinum, Gold, Silver and Bronze.")
            .requires(&["customer", "rental"])
            .with_param(ReportParam::new("platinum_min", 50).min(1))
            .with_param(ReportParam::new("gold_min", 30).min(1))
            .with_param(ReportParam::new("silver_min", 10).min(1))
            .descending(&["platinum_min", "gold_min", "silver_min"]),
        CatalogEntry::new("return_status", "Late versus on-time returns", RETURN_STATUS)
            .with_description(
                "Rentals held longer than the film's rental duration are Late; \
                 unreturned rentals are Outstanding.",
            )
            .requires(&["rental", "inventory", "film", "payment"]),
    ];

    for entry in entries {
        catalog.register(entry)?;
    }

    Ok(())
}
