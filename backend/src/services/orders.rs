//! Order service: sales orders, the allocation waterfall and dispatch

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::production::{record_plan_dispatch_tx, regenerate_waterfall_plans_tx};
use shared::{
    rank_for_allocation, reclaim_pool, run_waterfall, short_ref, status_after_allocation,
    status_after_dispatch, validate_piece_qty, AllocationLine, OrderStatus, Priority,
};

/// Order service for sales orders, allocation and dispatch
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
}

/// Sales order record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderRecord {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub priority: String,
    pub status: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One order line with its allocation state
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItemRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub qty_ordered: i32,
    pub qty_allocated: i32,
    pub qty_to_produce: i32,
    pub qty_dispatched: i32,
    pub unit_price: Decimal,
}

/// Order with its lines
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderRecord,
    pub items: Vec<OrderItemRecord>,
}

/// Input for placing an order
#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    pub customer_name: String,
    pub priority: Priority,
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub qty: i32,
    pub unit_price: Decimal,
}

/// Input for dispatching allocated stock against an order
#[derive(Debug, Deserialize)]
pub struct DispatchInput {
    pub items: Vec<DispatchItemInput>,
    pub transporter: Option<String>,
    pub awb_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DispatchItemInput {
    pub order_item_id: Uuid,
    pub qty: i32,
}

#[derive(Debug, FromRow)]
struct AllocationRow {
    item_id: Uuid,
    order_id: Uuid,
    priority: String,
    order_created_at: DateTime<Utc>,
    qty_ordered: i32,
    qty_dispatched: i32,
    qty_allocated: i32,
    qty_to_produce: i32,
}

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List orders
    pub async fn list_orders(&self, status: Option<String>) -> AppResult<Vec<OrderRecord>> {
        let orders = sqlx::query_as::<_, OrderRecord>(
            r#"
            SELECT id, order_number, customer_name, priority, status, created_by, created_at, updated_at
            FROM orders
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.db)
        .await?;

        Ok(orders)
    }

    /// Get one order with its lines
    pub async fn get_order(&self, order_id: Uuid) -> AppResult<OrderDetail> {
        let order = sqlx::query_as::<_, OrderRecord>(
            r#"
            SELECT id, order_number, customer_name, priority, status, created_by, created_at, updated_at
            FROM orders WHERE id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let items = sqlx::query_as::<_, OrderItemRecord>(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, pr.name AS product_name,
                   oi.qty_ordered, oi.qty_allocated, oi.qty_to_produce, oi.qty_dispatched,
                   oi.unit_price
            FROM order_items oi
            JOIN products pr ON pr.id = oi.product_id
            WHERE oi.order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        Ok(OrderDetail { order, items })
    }

    /// Place a sales order and run the allocation waterfall for every
    /// product it touches
    pub async fn create_order(
        &self,
        user: &AuthUser,
        input: CreateOrderInput,
    ) -> AppResult<OrderDetail> {
        if input.items.is_empty() {
            return Err(AppError::ValidationError(
                "An order needs at least one line".to_string(),
            ));
        }
        for item in &input.items {
            validate_piece_qty(item.qty).map_err(|msg| AppError::Validation {
                field: "items.qty".to_string(),
                message: msg.to_string(),
            })?;
        }

        let mut tx = self.db.begin().await?;

        let order_number = format!("ORD-{}", short_ref());
        let order_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO orders (order_number, customer_name, priority, status, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&order_number)
        .bind(&input.customer_name)
        .bind(input.priority.as_str())
        .bind(OrderStatus::Pending.as_str())
        .bind(&user.name)
        .fetch_one(&mut *tx)
        .await?;

        let mut product_ids = Vec::new();
        for item in &input.items {
            let inserted = sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, qty_ordered, unit_price)
                SELECT $1, id, $3, $4 FROM products WHERE id = $2
                "#,
            )
            .bind(order_id)
            .bind(item.product_id)
            .bind(item.qty)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await?;
            if inserted.rows_affected() == 0 {
                return Err(AppError::NotFound("Product".to_string()));
            }
            if !product_ids.contains(&item.product_id) {
                product_ids.push(item.product_id);
            }
        }

        for product_id in product_ids {
            run_waterfall_tx(&mut tx, product_id, &user.name).await?;
        }

        tx.commit().await?;

        tracing::info!(order = %order_number, "Order placed and allocation rerun");
        self.get_order(order_id).await
    }

    /// Re-run the allocation waterfall for one product. Used after stock
    /// changes that happen outside an order placement.
    pub async fn reallocate(&self, user: &AuthUser, product_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        run_waterfall_tx(&mut tx, product_id, &user.name).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Dispatch allocated pieces against an order. Only allocated stock can
    /// ship; allocation is consumed and the order settles into partially or
    /// fully dispatched.
    pub async fn dispatch(
        &self,
        user: &AuthUser,
        order_id: Uuid,
        input: DispatchInput,
    ) -> AppResult<OrderDetail> {
        if input.items.is_empty() {
            return Err(AppError::ValidationError(
                "Nothing to dispatch".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let order = sqlx::query_as::<_, OrderRecord>(
            r#"
            SELECT id, order_number, customer_name, priority, status, created_by, created_at, updated_at
            FROM orders WHERE id = $1 FOR UPDATE
            "#,
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        for item in &input.items {
            validate_piece_qty(item.qty).map_err(|msg| AppError::Validation {
                field: "items.qty".to_string(),
                message: msg.to_string(),
            })?;

            let line = sqlx::query_as::<_, (Uuid, i32)>(
                r#"
                SELECT product_id, qty_allocated FROM order_items
                WHERE id = $1 AND order_id = $2
                FOR UPDATE
                "#,
            )
            .bind(item.order_item_id)
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Order item".to_string()))?;

            if item.qty > line.1 {
                return Err(AppError::InsufficientStock(format!(
                    "Only {} pieces are allocated on this line, cannot dispatch {}",
                    line.1, item.qty
                )));
            }

            sqlx::query(
                r#"
                UPDATE order_items
                SET qty_allocated = qty_allocated - $1, qty_dispatched = qty_dispatched + $1
                WHERE id = $2
                "#,
            )
            .bind(item.qty)
            .bind(item.order_item_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO order_dispatches (order_id, order_item_id, product_id, qty, transporter, awb_number, dispatched_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(order_id)
            .bind(item.order_item_id)
            .bind(line.0)
            .bind(item.qty)
            .bind(&input.transporter)
            .bind(&input.awb_number)
            .bind(&user.name)
            .execute(&mut *tx)
            .await?;

            drain_finished_lots_tx(&mut tx, line.0, item.qty).await?;
            record_plan_dispatch_tx(&mut tx, line.0, item.order_item_id, item.qty).await?;
        }

        let lines = load_allocation_lines_for_order(&mut tx, order_id).await?;
        let new_status = status_after_dispatch(&lines);
        sqlx::query("UPDATE orders SET status = $1, updated_at = now() WHERE id = $2")
            .bind(new_status.as_str())
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(order = %order.order_number, status = new_status.as_str(), "Dispatch booked");
        self.get_order(order_id).await
    }
}

/// Run the allocation waterfall for one product inside a transaction.
///
/// Locks the product, reclaims every live allocation into a single pool,
/// re-ranks all open lines by priority then age, hands the pool out
/// greedily, writes the leftover back to the warehouse and regenerates the
/// product's unconfirmed waterfall plan from the total production backlog.
pub async fn run_waterfall_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    actor: &str,
) -> AppResult<()> {
    let warehouse_qty = sqlx::query_scalar::<_, i32>(
        "SELECT warehouse_qty FROM products WHERE id = $1 FOR UPDATE",
    )
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    let rows = sqlx::query_as::<_, AllocationRow>(
        r#"
        SELECT oi.id AS item_id, o.id AS order_id, o.priority,
               o.created_at AS order_created_at,
               oi.qty_ordered, oi.qty_dispatched, oi.qty_allocated, oi.qty_to_produce
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        WHERE oi.product_id = $1 AND o.status <> $2
        ORDER BY o.created_at
        FOR UPDATE OF oi
        "#,
    )
    .bind(product_id)
    .bind(OrderStatus::Dispatched.as_str())
    .fetch_all(&mut **tx)
    .await?;

    let mut order_of_line: Vec<(Uuid, Uuid)> = Vec::with_capacity(rows.len());
    let mut lines: Vec<AllocationLine> = Vec::with_capacity(rows.len());
    for row in rows {
        let priority = Priority::from_str(&row.priority)
            .ok_or_else(|| AppError::Internal(format!("Unknown priority {}", row.priority)))?;
        order_of_line.push((row.item_id, row.order_id));
        lines.push(AllocationLine {
            order_item_id: row.item_id,
            priority,
            order_created_at: row.order_created_at,
            qty_ordered: row.qty_ordered,
            qty_dispatched: row.qty_dispatched,
            qty_allocated: row.qty_allocated,
            qty_to_produce: row.qty_to_produce,
        });
    }

    let pool = reclaim_pool(warehouse_qty, &mut lines);
    rank_for_allocation(&mut lines);
    let leftover = run_waterfall(pool, &mut lines);

    for line in &lines {
        sqlx::query(
            "UPDATE order_items SET qty_allocated = $1, qty_to_produce = $2 WHERE id = $3",
        )
        .bind(line.qty_allocated)
        .bind(line.qty_to_produce)
        .bind(line.order_item_id)
        .execute(&mut **tx)
        .await?;
    }

    sqlx::query("UPDATE products SET warehouse_qty = $1, updated_at = now() WHERE id = $2")
        .bind(leftover)
        .bind(product_id)
        .execute(&mut **tx)
        .await?;

    // Every order touching this product settles into the status its own
    // lines imply
    let mut order_ids: Vec<Uuid> = order_of_line.iter().map(|(_, o)| *o).collect();
    order_ids.sort();
    order_ids.dedup();
    for order_id in order_ids {
        let order_lines = load_allocation_lines_for_order(tx, order_id).await?;
        let undispatched: Vec<&AllocationLine> =
            order_lines.iter().filter(|l| l.need() > 0).collect();
        if undispatched.is_empty() {
            continue;
        }
        let new_status = status_after_allocation(&order_lines);
        sqlx::query("UPDATE orders SET status = $1, updated_at = now() WHERE id = $2")
            .bind(new_status.as_str())
            .bind(order_id)
            .execute(&mut **tx)
            .await?;
    }

    let demands: Vec<(Uuid, i32)> = lines
        .iter()
        .map(|l| (l.order_item_id, l.qty_to_produce))
        .collect();
    regenerate_waterfall_plans_tx(tx, product_id, &demands, actor).await?;

    Ok(())
}

/// Drain a product's finished-goods lots oldest-first to match a physical
/// dispatch. Emptied lots are removed.
async fn drain_finished_lots_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    qty: i32,
) -> AppResult<()> {
    let lots = sqlx::query_as::<_, (Uuid, i32)>(
        r#"
        SELECT id, qty FROM product_fg_lots
        WHERE product_id = $1 AND qty > 0
        ORDER BY added_at
        FOR UPDATE
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut **tx)
    .await?;

    let available: i64 = lots.iter().map(|(_, q)| *q as i64).sum();
    if available < qty as i64 {
        return Err(AppError::InsufficientStock(format!(
            "Finished lots hold {} pieces, cannot dispatch {}",
            available, qty
        )));
    }

    let mut remaining = qty;
    for (lot_id, lot_qty) in lots {
        if remaining == 0 {
            break;
        }
        let take = lot_qty.min(remaining);
        remaining -= take;
        if take == lot_qty {
            sqlx::query("DELETE FROM product_fg_lots WHERE id = $1")
                .bind(lot_id)
                .execute(&mut **tx)
                .await?;
        } else {
            sqlx::query("UPDATE product_fg_lots SET qty = qty - $1 WHERE id = $2")
                .bind(take)
                .bind(lot_id)
                .execute(&mut **tx)
                .await?;
        }
    }

    Ok(())
}

async fn load_allocation_lines_for_order(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
) -> AppResult<Vec<AllocationLine>> {
    let rows = sqlx::query_as::<_, AllocationRow>(
        r#"
        SELECT oi.id AS item_id, o.id AS order_id, o.priority,
               o.created_at AS order_created_at,
               oi.qty_ordered, oi.qty_dispatched, oi.qty_allocated, oi.qty_to_produce
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        WHERE o.id = $1
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut **tx)
    .await?;

    rows.into_iter()
        .map(|row| {
            let priority = Priority::from_str(&row.priority)
                .ok_or_else(|| AppError::Internal(format!("Unknown priority {}", row.priority)))?;
            Ok(AllocationLine {
                order_item_id: row.item_id,
                priority,
                order_created_at: row.order_created_at,
                qty_ordered: row.qty_ordered,
                qty_dispatched: row.qty_dispatched,
                qty_allocated: row.qty_allocated,
                qty_to_produce: row.qty_to_produce,
            })
        })
        .collect()
}
