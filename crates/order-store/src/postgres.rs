use async_trait::async_trait;
use common::{
    CartId, CartItemId, CustomerContact, EventId, OrderId, PaymentMethod, ShippingAddress, UserRef,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    CART_STATUS_OPEN, CartItemRecord, CartRecord, OrderEventRecord, OrderLineRecord, OrderQuery,
    OrderRecord, Result, StoreError, Version,
    store::{ChangeSet, OrderStore},
};

const CART_SELECT: &str = r#"
    SELECT c.id, c.user_ref, c.status, c.created_at, c.updated_at, c.version,
           COALESCE(
               json_agg(json_build_object(
                   'id', i.id,
                   'product_ref', i.product_ref,
                   'quantity', i.quantity,
                   'unit_price_cents', i.unit_price_cents,
                   'currency', i.currency,
                   'created_at', i.created_at,
                   'updated_at', i.updated_at
               ) ORDER BY i.position) FILTER (WHERE i.id IS NOT NULL),
               '[]'::json
           ) AS items
    FROM carts c
    LEFT JOIN cart_items i ON i.cart_id = c.id
"#;

const ORDER_SELECT: &str = r#"
    SELECT o.*,
           COALESCE(
               json_agg(json_build_object(
                   'product_ref', l.product_ref,
                   'product_name', l.product_name,
                   'quantity', l.quantity,
                   'unit_price_cents', l.unit_price_cents,
                   'currency', l.currency
               ) ORDER BY l.position) FILTER (WHERE l.order_id IS NOT NULL),
               '[]'::json
           ) AS lines
    FROM orders o
    LEFT JOIN order_lines l ON l.order_id = o.id
"#;

/// PostgreSQL-backed order store implementation.
///
/// A change set runs in one transaction. Updates are guarded with
/// `WHERE version = $expected`, so a concurrent writer is detected rather
/// than silently overwritten.
#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_cart(row: PgRow) -> Result<CartRecord> {
        let items_json: serde_json::Value = row.try_get("items")?;
        let items: Vec<CartItemRecord> = serde_json::from_value(items_json)?;

        Ok(CartRecord {
            id: CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_ref: UserRef::new(row.try_get::<String, _>("user_ref")?),
            status: row.try_get("status")?,
            items,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: Version::new(row.try_get("version")?),
        })
    }

    fn row_to_order(row: PgRow) -> Result<OrderRecord> {
        let lines_json: serde_json::Value = row.try_get("lines")?;
        let lines: Vec<OrderLineRecord> = serde_json::from_value(lines_json)?;

        Ok(OrderRecord {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_ref: UserRef::new(row.try_get::<String, _>("user_ref")?),
            status: row.try_get("status")?,
            total_cents: row.try_get("total_cents")?,
            currency: row.try_get("currency")?,
            placed_at: row.try_get("placed_at")?,
            shipping: ShippingAddress {
                recipient: row.try_get("shipping_recipient")?,
                street1: row.try_get("shipping_street1")?,
                street2: row.try_get("shipping_street2")?,
                city: row.try_get("shipping_city")?,
                state: row.try_get("shipping_state")?,
                postal_code: row.try_get("shipping_postal_code")?,
                country: row.try_get("shipping_country")?,
                phone: row.try_get("shipping_phone")?,
            },
            payment_method: PaymentMethod {
                method_type: row.try_get("payment_method_type")?,
                last4: row.try_get("payment_last4")?,
                brand: row.try_get("payment_brand")?,
            },
            customer: CustomerContact {
                email: row.try_get("customer_email")?,
                name: row.try_get("customer_name")?,
            },
            lines,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: Version::new(row.try_get("version")?),
        })
    }

    fn row_to_event(row: PgRow) -> Result<OrderEventRecord> {
        Ok(OrderEventRecord {
            id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn stored_version(
        tx: &mut Transaction<'_, Postgres>,
        table: &'static str,
        id: Uuid,
    ) -> Result<Version> {
        let version: Option<i64> =
            sqlx::query_scalar(&format!("SELECT version FROM {table} WHERE id = $1"))
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(Version::new(version.unwrap_or(0)))
    }

    async fn write_cart(tx: &mut Transaction<'_, Postgres>, cart: &CartRecord) -> Result<()> {
        let id = cart.id.as_uuid();
        let next = cart.version.next();

        if cart.version == Version::initial() {
            sqlx::query(
                r#"
                INSERT INTO carts (id, user_ref, status, created_at, updated_at, version)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(id)
            .bind(cart.user_ref.as_str())
            .bind(&cart.status)
            .bind(cart.created_at)
            .bind(cart.updated_at)
            .bind(next.as_i64())
            .execute(&mut **tx)
            .await
            .map_err(|e| insert_conflict(e, "cart", cart.id.to_string(), cart.version))?;
        } else {
            let result = sqlx::query(
                r#"
                UPDATE carts SET status = $2, updated_at = $3, version = $4
                WHERE id = $1 AND version = $5
                "#,
            )
            .bind(id)
            .bind(&cart.status)
            .bind(cart.updated_at)
            .bind(next.as_i64())
            .bind(cart.version.as_i64())
            .execute(&mut **tx)
            .await?;

            if result.rows_affected() == 0 {
                let actual = Self::stored_version(tx, "carts", id).await?;
                return Err(StoreError::ConcurrencyConflict {
                    entity: "cart",
                    id: cart.id.to_string(),
                    expected: cart.version,
                    actual,
                });
            }

            sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
                .bind(id)
                .execute(&mut **tx)
                .await?;
        }

        for (position, item) in cart.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cart_items
                    (id, cart_id, position, product_ref, quantity, unit_price_cents, currency, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(id)
            .bind(position as i32)
            .bind(&item.product_ref)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(&item.currency)
            .bind(item.created_at)
            .bind(item.updated_at)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    async fn write_order(tx: &mut Transaction<'_, Postgres>, order: &OrderRecord) -> Result<()> {
        let id = order.id.as_uuid();
        let next = order.version.next();

        if order.version == Version::initial() {
            sqlx::query(
                r#"
                INSERT INTO orders (
                    id, user_ref, status, total_cents, currency, placed_at,
                    shipping_recipient, shipping_street1, shipping_street2, shipping_city,
                    shipping_state, shipping_postal_code, shipping_country, shipping_phone,
                    payment_method_type, payment_last4, payment_brand,
                    customer_email, customer_name, created_at, updated_at, version
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                        $15, $16, $17, $18, $19, $20, $21, $22)
                "#,
            )
            .bind(id)
            .bind(order.user_ref.as_str())
            .bind(&order.status)
            .bind(order.total_cents)
            .bind(&order.currency)
            .bind(order.placed_at)
            .bind(&order.shipping.recipient)
            .bind(&order.shipping.street1)
            .bind(&order.shipping.street2)
            .bind(&order.shipping.city)
            .bind(&order.shipping.state)
            .bind(&order.shipping.postal_code)
            .bind(&order.shipping.country)
            .bind(&order.shipping.phone)
            .bind(&order.payment_method.method_type)
            .bind(&order.payment_method.last4)
            .bind(&order.payment_method.brand)
            .bind(&order.customer.email)
            .bind(&order.customer.name)
            .bind(order.created_at)
            .bind(order.updated_at)
            .bind(next.as_i64())
            .execute(&mut **tx)
            .await
            .map_err(|e| insert_conflict(e, "order", order.id.to_string(), order.version))?;

            for (position, line) in order.lines.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO order_lines
                        (order_id, position, product_ref, product_name, quantity, unit_price_cents, currency)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(id)
                .bind(position as i32)
                .bind(&line.product_ref)
                .bind(&line.product_name)
                .bind(line.quantity)
                .bind(line.unit_price_cents)
                .bind(&line.currency)
                .execute(&mut **tx)
                .await?;
            }
        } else {
            // Only lifecycle columns change after creation
            let result = sqlx::query(
                r#"
                UPDATE orders SET status = $2, placed_at = $3, updated_at = $4, version = $5
                WHERE id = $1 AND version = $6
                "#,
            )
            .bind(id)
            .bind(&order.status)
            .bind(order.placed_at)
            .bind(order.updated_at)
            .bind(next.as_i64())
            .bind(order.version.as_i64())
            .execute(&mut **tx)
            .await?;

            if result.rows_affected() == 0 {
                let actual = Self::stored_version(tx, "orders", id).await?;
                return Err(StoreError::ConcurrencyConflict {
                    entity: "order",
                    id: order.id.to_string(),
                    expected: order.version,
                    actual,
                });
            }
        }

        Ok(())
    }
}

fn insert_conflict(e: sqlx::Error, entity: &'static str, id: String, expected: Version) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return StoreError::ConcurrencyConflict {
            entity,
            id,
            expected,
            actual: expected.next(),
        };
    }
    StoreError::Database(e)
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        changes
            .validate()
            .map_err(|e| StoreError::InvalidChangeSet(e.message))?;

        // Dropping the transaction on an early return rolls it back
        let mut tx = self.pool.begin().await?;

        for cart in changes.carts() {
            Self::write_cart(&mut tx, cart).await?;
        }
        for order in changes.orders() {
            Self::write_order(&mut tx, order).await?;
        }
        for event in changes.events() {
            sqlx::query(
                r#"
                INSERT INTO order_events (id, order_id, event_type, payload, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(event.id.as_uuid())
            .bind(event.order_id.as_uuid())
            .bind(&event.event_type)
            .bind(&event.payload)
            .bind(event.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(
            carts = changes.carts().len(),
            orders = changes.orders().len(),
            events = changes.events().len(),
            "Change set committed"
        );
        metrics::counter!("store_commits_total").increment(1);
        Ok(())
    }

    async fn get_cart(&self, cart_id: CartId) -> Result<Option<CartRecord>> {
        let sql = format!("{CART_SELECT} WHERE c.id = $1 GROUP BY c.id");
        let row = sqlx::query(&sql)
            .bind(cart_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_cart).transpose()
    }

    async fn find_open_cart(&self, user_ref: &UserRef) -> Result<Option<CartRecord>> {
        let sql = format!(
            "{CART_SELECT} WHERE c.user_ref = $1 AND UPPER(c.status) = $2 GROUP BY c.id ORDER BY c.created_at ASC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(user_ref.as_str())
            .bind(CART_STATUS_OPEN)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_cart).transpose()
    }

    async fn find_cart_by_item(&self, item_id: CartItemId) -> Result<Option<CartRecord>> {
        let cart_id: Option<Uuid> =
            sqlx::query_scalar("SELECT cart_id FROM cart_items WHERE id = $1")
                .bind(item_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match cart_id {
            Some(cart_id) => self.get_cart(CartId::from_uuid(cart_id)).await,
            None => Ok(None),
        }
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let sql = format!("{ORDER_SELECT} WHERE o.id = $1 GROUP BY o.id");
        let row = sqlx::query(&sql)
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn query_orders(&self, query: OrderQuery) -> Result<Vec<OrderRecord>> {
        let mut sql = format!("{ORDER_SELECT} WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.user_ref.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND o.user_ref = ${param_count}"));
        }
        if query.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND UPPER(o.status) = UPPER(${param_count})"));
        }

        sql.push_str(" GROUP BY o.id ORDER BY o.created_at DESC, o.id DESC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(user_ref) = query.user_ref {
            sqlx_query = sqlx_query.bind(user_ref.as_str().to_string());
        }
        if let Some(status) = query.status {
            sqlx_query = sqlx_query.bind(status);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn get_order_events(&self, order_id: OrderId) -> Result<Vec<OrderEventRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, event_type, payload, created_at
            FROM order_events
            WHERE order_id = $1
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }
}
