//! Read-only reconciliation over the store.

use tracing::{debug, instrument, warn};

use patrimonio_core::{DomainError, ProductId};
use patrimonio_inventory::{Product, ProductAudit, UnitNames, reconcile_product};

use crate::error::ServiceError;
use crate::store::InventoryStore;

#[derive(Debug, Clone)]
pub struct AuditService<S> {
    store: S,
}

impl<S> AuditService<S>
where
    S: InventoryStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reconcile every product, in product id order.
    #[instrument(skip(self), err)]
    pub async fn audit_all(&self) -> Result<Vec<ProductAudit>, ServiceError> {
        let names = self.unit_names().await?;
        let products = self.store.list_products().await?;

        let mut reports = Vec::with_capacity(products.len());
        for product in &products {
            reports.push(self.audit(product, &names).await?);
        }

        let divergent = reports.iter().filter(|r| r.has_divergence()).count();
        if divergent > 0 {
            warn!(divergent, total = reports.len(), "stock divergence detected");
        } else {
            debug!(total = reports.len(), "stock reconciled without divergence");
        }
        Ok(reports)
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    pub async fn audit_product(&self, product_id: ProductId) -> Result<ProductAudit, ServiceError> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("product {product_id}")))?;
        let names = self.unit_names().await?;
        self.audit(&product, &names).await
    }

    async fn audit(&self, product: &Product, names: &UnitNames) -> Result<ProductAudit, ServiceError> {
        let (stocks, items, movements) = if product.tracked_by_serial {
            (Vec::new(), self.store.list_items_for_product(product.id).await?, Vec::new())
        } else {
            (
                self.store.list_stocks_for_product(product.id).await?,
                Vec::new(),
                self.store.movements_for_product(product.id).await?,
            )
        };
        Ok(reconcile_product(product, &stocks, &items, &movements, names))
    }

    async fn unit_names(&self) -> Result<UnitNames, ServiceError> {
        Ok(self
            .store
            .list_units()
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect())
    }
}
