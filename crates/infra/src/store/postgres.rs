//! Postgres-backed balance store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Duplicate unit name or item serial |
//! | Database (foreign key violation) | `23503` | `NotFound` | Referenced product/unit/item does not exist |
//! | Database (check constraint violation) | `23514` | `Conflict` | Balance would go negative |
//! | Database (numeric value out of range) | `22003` | `Conflict` | Balance would overflow `BIGINT` |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | PoolClosed / other | N/A | `Backend` | Network errors, connection failures, etc. |
//!
//! ## Atomicity
//!
//! `commit_movement` runs in one transaction. The debit is a single
//! conditioned `UPDATE … WHERE quantity >= $n`, so two concurrent exits can
//! never both succeed against the same balance.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{FromRow, Row};
use tracing::{Span, field, instrument};

use patrimonio_core::{
    BrandId, CategoryId, ConditionId, EquipmentTypeId, ItemId, MovementId, ProductId, UnitId, UserId,
};
use patrimonio_inventory::{
    Acquisition, Brand, Category, Condition, EquipmentType, Item, ItemStatus, Movement, MovementKind,
    MovementPlan, NewBrand, NewCategory, NewCondition, NewEquipmentType, NewItem, NewProduct, NewUnit,
    Product, Stock, Taxonomy, Unit,
};

use super::query::{MovementFilter, MovementPage, Pagination};
use super::{InventoryStore, StoreError};

/// Postgres-backed balance store.
///
/// Uses the SQLx connection pool, which is `Send + Sync`; clones share it.
#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect and apply the embedded migrations.
    #[instrument(skip(database_url), err)]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const PRODUCT_COLUMNS: &str = "id, name, model, description, category_id, type_id, brand_id, \
                               tracked_by_serial, minimum_quantity, active";

const ITEM_COLUMNS: &str = "id, product_id, unit_id, serial, status, condition_id, acquired_on, \
                            acquisition_value_cents, warranty_until, note";

const MOVEMENT_COLUMNS: &str = "id, kind, product_id, item_id, source_unit_id, destination_unit_id, \
                                quantity, user_id, occurred_at, note";

const MOVEMENT_FILTER: &str = r#"
    ($1::BIGINT IS NULL OR product_id = $1)
    AND ($2::BIGINT IS NULL OR item_id = $2)
    AND ($3::BIGINT IS NULL OR source_unit_id = $3 OR destination_unit_id = $3)
    AND ($4::TEXT IS NULL OR kind = $4)
    AND ($5::TIMESTAMPTZ IS NULL OR occurred_at >= $5)
    AND ($6::TIMESTAMPTZ IS NULL OR occurred_at < $6)
"#;

#[async_trait::async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.map(|r| decode::<ProductRow>(&r).map(Product::from)).transpose()
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?;

        row.as_ref().map(item_from_row).transpose()
    }

    #[instrument(skip(self), fields(unit_id = %id), err)]
    async fn get_unit(&self, id: UnitId) -> Result<Option<Unit>, StoreError> {
        let row = sqlx::query("SELECT id, name, manager FROM units WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_unit", e))?;

        row.map(|r| decode::<UnitRow>(&r).map(Unit::from)).transpose()
    }

    #[instrument(skip(self), fields(product_id = %product_id, unit_id = %unit_id), err)]
    async fn get_stock(&self, product_id: ProductId, unit_id: UnitId) -> Result<Option<Stock>, StoreError> {
        let row = sqlx::query(
            "SELECT product_id, unit_id, quantity, minimum_quantity, location \
             FROM stock WHERE product_id = $1 AND unit_id = $2",
        )
        .bind(product_id.get())
        .bind(unit_id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_stock", e))?;

        row.map(|r| decode::<StockRow>(&r).map(Stock::from)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(|r| decode::<ProductRow>(r).map(Product::from)).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_units(&self) -> Result<Vec<Unit>, StoreError> {
        let rows = sqlx::query("SELECT id, name, manager FROM units ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_units", e))?;

        rows.iter().map(|r| decode::<UnitRow>(r).map(Unit::from)).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_stocks(&self) -> Result<Vec<Stock>, StoreError> {
        let rows = sqlx::query(
            "SELECT product_id, unit_id, quantity, minimum_quantity, location \
             FROM stock ORDER BY product_id, unit_id",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_stocks", e))?;

        rows.iter().map(|r| decode::<StockRow>(r).map(Stock::from)).collect()
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn list_stocks_for_product(&self, product_id: ProductId) -> Result<Vec<Stock>, StoreError> {
        let rows = sqlx::query(
            "SELECT product_id, unit_id, quantity, minimum_quantity, location \
             FROM stock WHERE product_id = $1 ORDER BY unit_id",
        )
        .bind(product_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_stocks_for_product", e))?;

        rows.iter().map(|r| decode::<StockRow>(r).map(Stock::from)).collect()
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn list_items_for_product(&self, product_id: ProductId) -> Result<Vec<Item>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE product_id = $1 ORDER BY id"
        ))
        .bind(product_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_items_for_product", e))?;

        rows.iter().map(item_from_row).collect()
    }

    #[instrument(
        skip(self, filter),
        fields(limit = pagination.limit, offset = pagination.offset, movement_count = field::Empty),
        err
    )]
    async fn list_movements(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, StoreError> {
        let span = Span::current();
        let kind = filter.kind.map(|k| k.as_str());

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM movements WHERE {MOVEMENT_FILTER}"))
            .bind(filter.product_id.map(ProductId::get))
            .bind(filter.item_id.map(ItemId::get))
            .bind(filter.unit_id.map(UnitId::get))
            .bind(kind)
            .bind(filter.occurred_after)
            .bind(filter.occurred_before)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_movements", e))?;

        let rows = sqlx::query(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements WHERE {MOVEMENT_FILTER} \
             ORDER BY occurred_at DESC, id DESC LIMIT $7 OFFSET $8"
        ))
        .bind(filter.product_id.map(ProductId::get))
        .bind(filter.item_id.map(ItemId::get))
        .bind(filter.unit_id.map(UnitId::get))
        .bind(kind)
        .bind(filter.occurred_after)
        .bind(filter.occurred_before)
        .bind(i64::from(pagination.limit))
        .bind(i64::from(pagination.offset))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_movements", e))?;

        let movements = rows
            .iter()
            .map(movement_from_row)
            .collect::<Result<Vec<Movement>, StoreError>>()?;

        span.record("movement_count", movements.len());
        Ok(MovementPage::new(movements, total.max(0) as u64, pagination))
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn movements_for_product(&self, product_id: ProductId) -> Result<Vec<Movement>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements WHERE product_id = $1 ORDER BY id"
        ))
        .bind(product_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("movements_for_product", e))?;

        rows.iter().map(movement_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn taxonomy(&self) -> Result<Taxonomy, StoreError> {
        let categories = sqlx::query("SELECT id, name, description, active FROM categories ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;
        let equipment_types = sqlx::query("SELECT id, name, category_id FROM equipment_types ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_equipment_types", e))?;
        let brands = sqlx::query("SELECT id, name FROM brands ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_brands", e))?;
        let conditions = sqlx::query("SELECT id, name FROM item_conditions ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_conditions", e))?;

        Ok(Taxonomy {
            categories: categories
                .iter()
                .map(|r| decode::<CategoryRow>(r).map(Category::from))
                .collect::<Result<_, _>>()?,
            equipment_types: equipment_types
                .iter()
                .map(|r| decode::<EquipmentTypeRow>(r).map(EquipmentType::from))
                .collect::<Result<_, _>>()?,
            brands: brands
                .iter()
                .map(|r| decode::<NamedRow>(r).map(|n| Brand { id: BrandId::new(n.id), name: n.name }))
                .collect::<Result<_, _>>()?,
            conditions: conditions
                .iter()
                .map(|r| decode::<NamedRow>(r).map(|n| Condition { id: ConditionId::new(n.id), name: n.name }))
                .collect::<Result<_, _>>()?,
        })
    }

    #[instrument(skip(self, category), fields(name = %category.name), err)]
    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError> {
        let row = sqlx::query(
            "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING id, name, description, active",
        )
        .bind(&category.name)
        .bind(&category.description)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;

        decode::<CategoryRow>(&row).map(Category::from)
    }

    #[instrument(skip(self, kind), fields(name = %kind.name, category_id = %kind.category_id), err)]
    async fn insert_equipment_type(&self, kind: NewEquipmentType) -> Result<EquipmentType, StoreError> {
        let row = sqlx::query(
            "INSERT INTO equipment_types (name, category_id) VALUES ($1, $2) RETURNING id, name, category_id",
        )
        .bind(&kind.name)
        .bind(kind.category_id.get())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_equipment_type", e))?;

        decode::<EquipmentTypeRow>(&row).map(EquipmentType::from)
    }

    #[instrument(skip(self, brand), fields(name = %brand.name), err)]
    async fn insert_brand(&self, brand: NewBrand) -> Result<Brand, StoreError> {
        let row = sqlx::query("INSERT INTO brands (name) VALUES ($1) RETURNING id, name")
            .bind(&brand.name)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_brand", e))?;

        let named = decode::<NamedRow>(&row)?;
        Ok(Brand { id: BrandId::new(named.id), name: named.name })
    }

    #[instrument(skip(self, condition), fields(name = %condition.name), err)]
    async fn insert_condition(&self, condition: NewCondition) -> Result<Condition, StoreError> {
        let row = sqlx::query("INSERT INTO item_conditions (name) VALUES ($1) RETURNING id, name")
            .bind(&condition.name)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_condition", e))?;

        let named = decode::<NamedRow>(&row)?;
        Ok(Condition { id: ConditionId::new(named.id), name: named.name })
    }

    #[instrument(skip(self, unit), fields(name = %unit.name), err)]
    async fn insert_unit(&self, unit: NewUnit) -> Result<Unit, StoreError> {
        let row = sqlx::query("INSERT INTO units (name, manager) VALUES ($1, $2) RETURNING id, name, manager")
            .bind(&unit.name)
            .bind(&unit.manager)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_unit", e))?;

        decode::<UnitRow>(&row).map(Unit::from)
    }

    #[instrument(skip(self, product), fields(name = %product.name), err)]
    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO products \
             (name, model, description, category_id, type_id, brand_id, tracked_by_serial, minimum_quantity) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.name)
        .bind(&product.model)
        .bind(&product.description)
        .bind(product.category_id.map(CategoryId::get))
        .bind(product.type_id.map(EquipmentTypeId::get))
        .bind(product.brand_id.map(BrandId::get))
        .bind(product.tracked_by_serial)
        .bind(product.minimum_quantity)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        decode::<ProductRow>(&row).map(Product::from)
    }

    #[instrument(skip(self, item), fields(product_id = %item.product_id, unit_id = %item.unit_id), err)]
    async fn insert_item(&self, item: NewItem) -> Result<Item, StoreError> {
        let acquisition = &item.acquisition;
        let row = sqlx::query(&format!(
            "INSERT INTO items \
             (product_id, unit_id, serial, status, condition_id, acquired_on, acquisition_value_cents, \
              warranty_until, note) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {ITEM_COLUMNS}"
        ))
        .bind(item.product_id.get())
        .bind(item.unit_id.get())
        .bind(&item.serial)
        .bind(ItemStatus::Available.as_str())
        .bind(acquisition.condition_id.map(ConditionId::get))
        .bind(acquisition.acquired_on)
        .bind(acquisition.acquisition_value_cents)
        .bind(acquisition.warranty_until)
        .bind(&item.note)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;

        item_from_row(&row)
    }

    #[instrument(
        skip(self, plan),
        fields(
            product_id = %plan.entry.product_id,
            kind = %plan.entry.kind,
            quantity = plan.entry.quantity,
            movement_id = field::Empty
        ),
        err
    )]
    async fn commit_movement(&self, plan: &MovementPlan) -> Result<Movement, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        if let Some(debit) = &plan.debit {
            let updated = sqlx::query(
                "UPDATE stock SET quantity = quantity - $3 \
                 WHERE product_id = $1 AND unit_id = $2 AND quantity >= $3 \
                 RETURNING quantity",
            )
            .bind(debit.product_id.get())
            .bind(debit.unit_id.get())
            .bind(debit.quantity)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("debit_stock", e))?;

            if updated.is_none() {
                tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(StoreError::Conflict(format!(
                    "insufficient stock: requested {} at unit {}",
                    debit.quantity, debit.unit_id
                )));
            }
        }

        if let Some(credit) = &plan.credit {
            sqlx::query(
                "INSERT INTO stock (product_id, unit_id, quantity, minimum_quantity) VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (product_id, unit_id) DO UPDATE SET quantity = stock.quantity + EXCLUDED.quantity",
            )
            .bind(credit.product_id.get())
            .bind(credit.unit_id.get())
            .bind(credit.quantity)
            .bind(credit.minimum_quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("credit_stock", e))?;
        }

        if let Some(update) = &plan.item_update {
            let result = sqlx::query(
                "UPDATE items SET unit_id = $2, status = $3 \
                 WHERE id = $1 AND unit_id = $4 AND status = $5",
            )
            .bind(update.item_id.get())
            .bind(update.unit_id.get())
            .bind(update.status.as_str())
            .bind(update.expected_unit_id.get())
            .bind(ItemStatus::Available.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_item", e))?;

            if result.rows_affected() != 1 {
                tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(StoreError::Conflict(format!(
                    "item {} changed since the movement was planned",
                    update.item_id
                )));
            }
        }

        let entry = &plan.entry;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO movements \
             (kind, product_id, item_id, source_unit_id, destination_unit_id, quantity, user_id, occurred_at, note) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
        )
        .bind(entry.kind.as_str())
        .bind(entry.product_id.get())
        .bind(entry.item_id.map(ItemId::get))
        .bind(entry.source_unit_id.map(UnitId::get))
        .bind(entry.destination_unit_id.map(UnitId::get))
        .bind(entry.quantity)
        .bind(entry.user_id.get())
        .bind(entry.occurred_at)
        .bind(&entry.note)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_movement", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("movement_id", id);
        Ok(entry.clone().into_movement(MovementId::new(id)))
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation
                Some("23505") => StoreError::Conflict(msg),
                // Foreign key violation
                Some("23503") => StoreError::NotFound(msg),
                // Check constraint violation (negative balance, bad status)
                Some("23514") => StoreError::Conflict(msg),
                // Numeric value out of range (balance overflow)
                Some("22003") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

fn decode<'r, T>(row: &'r PgRow) -> Result<T, StoreError>
where
    T: FromRow<'r, PgRow>,
{
    T::from_row(row).map_err(|e| StoreError::Backend(format!("failed to decode row: {e}")))
}

fn item_from_row(row: &PgRow) -> Result<Item, StoreError> {
    Item::try_from(decode::<ItemRow>(row)?)
}

fn movement_from_row(row: &PgRow) -> Result<Movement, StoreError> {
    Movement::try_from(decode::<MovementRow>(row)?)
}

// SQLx row types

#[derive(Debug)]
struct UnitRow {
    id: i64,
    name: String,
    manager: String,
}

impl<'r> FromRow<'r, PgRow> for UnitRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UnitRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            manager: row.try_get("manager")?,
        })
    }
}

impl From<UnitRow> for Unit {
    fn from(row: UnitRow) -> Self {
        Unit {
            id: UnitId::new(row.id),
            name: row.name,
            manager: row.manager,
        }
    }
}

#[derive(Debug)]
struct CategoryRow {
    id: i64,
    name: String,
    description: Option<String>,
    active: bool,
}

impl<'r> FromRow<'r, PgRow> for CategoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CategoryRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            active: row.try_get("active")?,
        })
    }
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: CategoryId::new(row.id),
            name: row.name,
            description: row.description,
            active: row.active,
        }
    }
}

#[derive(Debug)]
struct EquipmentTypeRow {
    id: i64,
    name: String,
    category_id: i64,
}

impl<'r> FromRow<'r, PgRow> for EquipmentTypeRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(EquipmentTypeRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            category_id: row.try_get("category_id")?,
        })
    }
}

impl From<EquipmentTypeRow> for EquipmentType {
    fn from(row: EquipmentTypeRow) -> Self {
        EquipmentType {
            id: EquipmentTypeId::new(row.id),
            name: row.name,
            category_id: CategoryId::new(row.category_id),
        }
    }
}

/// `(id, name)` rows of brands and item conditions.
#[derive(Debug)]
struct NamedRow {
    id: i64,
    name: String,
}

impl<'r> FromRow<'r, PgRow> for NamedRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(NamedRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }
}

#[derive(Debug)]
struct ProductRow {
    id: i64,
    name: String,
    model: Option<String>,
    description: Option<String>,
    category_id: Option<i64>,
    type_id: Option<i64>,
    brand_id: Option<i64>,
    tracked_by_serial: bool,
    minimum_quantity: i64,
    active: bool,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            model: row.try_get("model")?,
            description: row.try_get("description")?,
            category_id: row.try_get("category_id")?,
            type_id: row.try_get("type_id")?,
            brand_id: row.try_get("brand_id")?,
            tracked_by_serial: row.try_get("tracked_by_serial")?,
            minimum_quantity: row.try_get("minimum_quantity")?,
            active: row.try_get("active")?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::new(row.id),
            name: row.name,
            model: row.model,
            description: row.description,
            category_id: row.category_id.map(CategoryId::new),
            type_id: row.type_id.map(EquipmentTypeId::new),
            brand_id: row.brand_id.map(BrandId::new),
            tracked_by_serial: row.tracked_by_serial,
            minimum_quantity: row.minimum_quantity,
            active: row.active,
        }
    }
}

#[derive(Debug)]
struct ItemRow {
    id: i64,
    product_id: i64,
    unit_id: i64,
    serial: String,
    status: String,
    condition_id: Option<i64>,
    acquired_on: Option<NaiveDate>,
    acquisition_value_cents: Option<i64>,
    warranty_until: Option<NaiveDate>,
    note: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for ItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            unit_id: row.try_get("unit_id")?,
            serial: row.try_get("serial")?,
            status: row.try_get("status")?,
            condition_id: row.try_get("condition_id")?,
            acquired_on: row.try_get("acquired_on")?,
            acquisition_value_cents: row.try_get("acquisition_value_cents")?,
            warranty_until: row.try_get("warranty_until")?,
            note: row.try_get("note")?,
        })
    }
}

impl TryFrom<ItemRow> for Item {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let status = ItemStatus::parse(&row.status)
            .map_err(|e| StoreError::Backend(format!("item {}: {e}", row.id)))?;
        Ok(Item {
            id: ItemId::new(row.id),
            product_id: ProductId::new(row.product_id),
            unit_id: UnitId::new(row.unit_id),
            serial: row.serial,
            status,
            acquisition: Acquisition {
                condition_id: row.condition_id.map(ConditionId::new),
                acquired_on: row.acquired_on,
                acquisition_value_cents: row.acquisition_value_cents,
                warranty_until: row.warranty_until,
            },
            note: row.note,
        })
    }
}

#[derive(Debug)]
struct StockRow {
    product_id: i64,
    unit_id: i64,
    quantity: i64,
    minimum_quantity: i64,
    location: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for StockRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(StockRow {
            product_id: row.try_get("product_id")?,
            unit_id: row.try_get("unit_id")?,
            quantity: row.try_get("quantity")?,
            minimum_quantity: row.try_get("minimum_quantity")?,
            location: row.try_get("location")?,
        })
    }
}

impl From<StockRow> for Stock {
    fn from(row: StockRow) -> Self {
        Stock {
            product_id: ProductId::new(row.product_id),
            unit_id: UnitId::new(row.unit_id),
            quantity: row.quantity,
            minimum_quantity: row.minimum_quantity,
            location: row.location,
        }
    }
}

#[derive(Debug)]
struct MovementRow {
    id: i64,
    kind: String,
    product_id: i64,
    item_id: Option<i64>,
    source_unit_id: Option<i64>,
    destination_unit_id: Option<i64>,
    quantity: i64,
    user_id: i64,
    occurred_at: DateTime<Utc>,
    note: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for MovementRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(MovementRow {
            id: row.try_get("id")?,
            kind: row.try_get("kind")?,
            product_id: row.try_get("product_id")?,
            item_id: row.try_get("item_id")?,
            source_unit_id: row.try_get("source_unit_id")?,
            destination_unit_id: row.try_get("destination_unit_id")?,
            quantity: row.try_get("quantity")?,
            user_id: row.try_get("user_id")?,
            occurred_at: row.try_get("occurred_at")?,
            note: row.try_get("note")?,
        })
    }
}

impl TryFrom<MovementRow> for Movement {
    type Error = StoreError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let kind: MovementKind = row
            .kind
            .parse()
            .map_err(|e| StoreError::Backend(format!("movement {}: {e}", row.id)))?;
        Ok(Movement {
            id: MovementId::new(row.id),
            kind,
            product_id: ProductId::new(row.product_id),
            item_id: row.item_id.map(ItemId::new),
            source_unit_id: row.source_unit_id.map(UnitId::new),
            destination_unit_id: row.destination_unit_id.map(UnitId::new),
            quantity: row.quantity,
            user_id: UserId::new(row.user_id),
            occurred_at: row.occurred_at,
            note: row.note,
        })
    }
}
