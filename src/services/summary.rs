//! Sales summary service
//!
//! Aggregates a user's orders into counts, revenue, best seller and
//! low-stock lists, and renders the full order history as CSV.

use crate::db::repositories::{BestSeller, OrderRepository, ProductRepository};
use crate::models::{OrderWithProduct, Product};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Products at or below this stock count show up in the low-stock list.
pub const LOW_STOCK_THRESHOLD: i64 = 3;

/// CSV export column headers
const CSV_HEADERS: [&str; 8] = [
    "order_id",
    "customer_name",
    "product",
    "qty",
    "unit_price",
    "status",
    "line_total",
    "created_at",
];

/// Aggregated sales figures for one user
#[derive(Debug, Clone, serde::Serialize)]
pub struct SalesSummary {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub paid_orders: i64,
    pub cancelled_orders: i64,
    /// Sum of qty × unit price over PAID orders only
    pub total_revenue: f64,
    pub best_seller: Option<BestSeller>,
    pub low_stock: Vec<Product>,
}

/// Summary service
pub struct SummaryService {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
}

impl SummaryService {
    /// Create a new summary service with the given repositories
    pub fn new(orders: Arc<dyn OrderRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self { orders, products }
    }

    /// Compute the sales summary for a user
    pub async fn overview(&self, user_id: i64) -> Result<SalesSummary> {
        let counts = self
            .orders
            .count_by_status(user_id)
            .await
            .context("Failed to count orders")?;

        let total_revenue = self
            .orders
            .paid_revenue(user_id)
            .await
            .context("Failed to compute revenue")?;

        let best_seller = self
            .orders
            .best_seller(user_id)
            .await
            .context("Failed to compute best seller")?;

        let low_stock = self
            .products
            .low_stock(user_id, LOW_STOCK_THRESHOLD)
            .await
            .context("Failed to list low-stock products")?;

        Ok(SalesSummary {
            total_orders: counts.total,
            pending_orders: counts.pending,
            paid_orders: counts.paid,
            cancelled_orders: counts.cancelled,
            total_revenue,
            best_seller,
            low_stock,
        })
    }

    /// Render the user's full order history as CSV, oldest order first.
    pub async fn export_csv(&self, user_id: i64) -> Result<String> {
        let rows = self
            .orders
            .export_rows(user_id)
            .await
            .context("Failed to export orders")?;

        Ok(render_csv(&rows))
    }
}

fn render_csv(rows: &[OrderWithProduct]) -> String {
    let mut out = String::new();
    out.push_str(&CSV_HEADERS.join(","));
    out.push_str("\r\n");

    for row in rows {
        let fields = [
            row.order.id.to_string(),
            row.order.customer_name.clone(),
            row.product_name.clone(),
            row.order.qty.to_string(),
            format!("{:.2}", row.unit_price),
            row.order.status.to_string(),
            format!("{:.2}", row.line_total()),
            row.order.created_at.to_rfc3339(),
        ];

        let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&line.join(","));
        out.push_str("\r\n");
    }

    out
}

/// Quote a CSV field when it contains a delimiter, quote or newline
/// (RFC 4180). Quotes inside a quoted field are doubled.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxLiveSessionRepository, SqlxOrderRepository, SqlxProductRepository, SqlxUserRepository,
        UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreateOrderInput, User};
    use crate::services::live::LiveService;
    use crate::services::password::hash_password;
    use proptest::prelude::*;

    struct Fixture {
        summary: SummaryService,
        live: LiveService,
        products: Arc<dyn ProductRepository>,
        user_id: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let user = users
            .create(&User::new(
                "Seller".to_string(),
                "seller@example.com".to_string(),
                hash_password("pw").expect("Failed to hash"),
                None,
                None,
            ))
            .await
            .expect("Failed to create user");

        let products: Arc<dyn ProductRepository> = SqlxProductRepository::shared(pool.clone());
        let orders: Arc<dyn OrderRepository> = SqlxOrderRepository::shared(pool.clone());

        Fixture {
            summary: SummaryService::new(orders.clone(), products.clone()),
            live: LiveService::new(
                SqlxLiveSessionRepository::shared(pool.clone()),
                orders,
                products.clone(),
            ),
            products,
            user_id: user.id,
        }
    }

    async fn add_product(f: &Fixture, name: &str, price: f64, stock: i64) -> i64 {
        f.products
            .create(&crate::models::Product::new(
                f.user_id,
                name.to_string(),
                price,
                stock,
            ))
            .await
            .expect("Failed to create product")
            .id
    }

    async fn place(f: &Fixture, product_id: i64, customer: &str, qty: i64) -> i64 {
        f.live
            .place_order(
                f.user_id,
                CreateOrderInput {
                    customer_name: customer.to_string(),
                    product_id,
                    qty,
                },
            )
            .await
            .expect("Failed to place order")
            .id
    }

    #[tokio::test]
    async fn test_empty_overview() {
        let f = setup().await;

        let summary = f.summary.overview(f.user_id).await.expect("overview");

        assert_eq!(summary.total_orders, 0);
        assert_eq!(summary.total_revenue, 0.0);
        assert!(summary.best_seller.is_none());
        assert!(summary.low_stock.is_empty());
    }

    #[tokio::test]
    async fn test_revenue_counts_only_paid_orders() {
        let f = setup().await;
        let mug = add_product(&f, "Mug", 9.5, 100).await;

        let paid = place(&f, mug, "Ana", 2).await;
        place(&f, mug, "Ben", 5).await; // stays PENDING
        let cancelled = place(&f, mug, "Cleo", 7).await;

        f.live
            .set_status(f.user_id, paid, "PAID")
            .await
            .expect("mark paid");
        f.live
            .set_status(f.user_id, cancelled, "CANCELLED")
            .await
            .expect("cancel");

        let summary = f.summary.overview(f.user_id).await.expect("overview");

        assert_eq!(summary.total_orders, 3);
        assert_eq!(summary.pending_orders, 1);
        assert_eq!(summary.paid_orders, 1);
        assert_eq!(summary.cancelled_orders, 1);
        assert_eq!(summary.total_revenue, 19.0); // only the paid 2 × 9.5
    }

    #[tokio::test]
    async fn test_best_seller_ignores_cancelled() {
        let f = setup().await;
        let mug = add_product(&f, "Mug", 9.5, 100).await;
        let scarf = add_product(&f, "Scarf", 4.0, 100).await;

        place(&f, mug, "Ana", 3).await;
        let big = place(&f, scarf, "Ben", 20).await;
        f.live
            .set_status(f.user_id, big, "CANCELLED")
            .await
            .expect("cancel");

        let summary = f.summary.overview(f.user_id).await.expect("overview");
        let best = summary.best_seller.expect("Expected a best seller");
        assert_eq!(best.product_name, "Mug");
        assert_eq!(best.total_qty, 3);
    }

    #[tokio::test]
    async fn test_low_stock_threshold() {
        let f = setup().await;
        add_product(&f, "Plenty", 1.0, 10).await;
        add_product(&f, "Few", 1.0, 3).await;
        add_product(&f, "Gone", 1.0, 0).await;

        let summary = f.summary.overview(f.user_id).await.expect("overview");

        let names: Vec<&str> = summary.low_stock.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Gone", "Few"]);
    }

    #[tokio::test]
    async fn test_export_csv_shape() {
        let f = setup().await;
        let mug = add_product(&f, "Mug", 9.5, 100).await;
        let paid = place(&f, mug, "Ana", 2).await;
        f.live
            .set_status(f.user_id, paid, "PAID")
            .await
            .expect("mark paid");

        let csv = f.summary.export_csv(f.user_id).await.expect("export");
        let mut lines = csv.lines();

        assert_eq!(
            lines.next(),
            Some("order_id,customer_name,product,qty,unit_price,status,line_total,created_at")
        );

        let row = lines.next().expect("Expected one data row");
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), 8);
        assert_eq!(fields[1], "Ana");
        assert_eq!(fields[2], "Mug");
        assert_eq!(fields[3], "2");
        assert_eq!(fields[4], "9.50");
        assert_eq!(fields[5], "PAID");
        assert_eq!(fields[6], "19.00");

        assert!(lines.next().is_none());
    }

    #[tokio::test]
    async fn test_export_csv_quotes_commas() {
        let f = setup().await;
        let product = add_product(&f, "Mug, Large", 9.5, 100).await;
        place(&f, product, "Cruz, Ana", 1).await;

        let csv = f.summary.export_csv(f.user_id).await.expect("export");
        assert!(csv.contains("\"Cruz, Ana\""));
        assert!(csv.contains("\"Mug, Large\""));
    }

    #[test]
    fn test_csv_field_plain() {
        assert_eq!(csv_field("Ana"), "Ana");
        assert_eq!(csv_field(""), "");
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("line\nbreak"), "\"line\nbreak\"");
    }

    /// Minimal RFC 4180 line parser, for the roundtrip property below.
    fn parse_csv_line(line: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut chars = line.chars().peekable();
        let mut in_quotes = false;

        while let Some(c) = chars.next() {
            match c {
                '"' if in_quotes => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                '"' => in_quotes = true,
                ',' if !in_quotes => {
                    fields.push(std::mem::take(&mut field));
                }
                c => field.push(c),
            }
        }
        fields.push(field);
        fields
    }

    proptest! {
        #[test]
        fn prop_csv_field_roundtrips(
            a in "[^\r\n]{0,30}",
            b in "[^\r\n]{0,30}",
            c in "[^\r\n]{0,30}",
        ) {
            let line = [a.clone(), b.clone(), c.clone()]
                .iter()
                .map(|f| csv_field(f))
                .collect::<Vec<_>>()
                .join(",");

            prop_assert_eq!(parse_csv_line(&line), vec![a, b, c]);
        }
    }
}
