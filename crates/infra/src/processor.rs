//! Movement execution pipeline.
//!
//! ```text
//! MovementRequest
//!   ↓
//! 1. Load product
//!   ↓
//! 2. Load item (serialized products)
//!   ↓
//! 3. Load referenced units
//!   ↓
//! 4. Load source and destination balances (bulk products)
//!   ↓
//! 5. Plan (pure decision logic, no mutation)
//!   ↓
//! 6. Commit plan + ledger entry atomically
//! ```
//!
//! Steps 1-4 only read. Nothing is mutated unless the plan is accepted, and
//! the store re-checks the balance and item location inside the commit, so a
//! concurrent movement that slipped in after step 4 turns into a `Conflict`
//! rather than a negative balance.

use chrono::Utc;
use tracing::{info, instrument, warn};

use patrimonio_core::{DomainError, UnitId};
use patrimonio_inventory::{Movement, MovementContext, MovementRequest, Product, plan_movement};

use crate::error::MovementError;
use crate::store::InventoryStore;

/// Applies stock movements against a store.
#[derive(Debug, Clone)]
pub struct MovementProcessor<S> {
    store: S,
}

impl<S> MovementProcessor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> MovementProcessor<S>
where
    S: InventoryStore,
{
    /// Validate a movement, apply its balance and item effects, and append it
    /// to the ledger. On any error nothing is persisted.
    #[instrument(
        skip(self, request),
        fields(
            product_id = %request.product_id,
            kind = %request.kind,
            user_id = %request.user_id
        )
    )]
    pub async fn process(&self, request: MovementRequest) -> Result<Movement, MovementError> {
        match self.execute(&request).await {
            Ok(movement) => {
                info!(
                    movement_id = %movement.id,
                    quantity = movement.quantity,
                    "movement committed"
                );
                Ok(movement)
            }
            Err(err) => {
                warn!(error = %err, "movement rejected");
                Err(err)
            }
        }
    }

    async fn execute(&self, request: &MovementRequest) -> Result<Movement, MovementError> {
        // 1) Product
        let product = self
            .store
            .get_product(request.product_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("product {}", request.product_id)))?;

        // 2) Item (absence is decided by the planner)
        let item = match (product.tracked_by_serial, request.item_id) {
            (true, Some(item_id)) => self.store.get_item(item_id).await?,
            _ => None,
        };

        // 3) Units
        for unit_id in [request.source_unit_id, request.destination_unit_id]
            .into_iter()
            .flatten()
        {
            self.require_unit(unit_id).await?;
        }

        // 4) Balances
        let bulk = !product.tracked_by_serial;
        let source_balance = match request.source_unit_id {
            Some(unit_id) if bulk && request.kind.debits_source() => self.balance(&product, unit_id).await?,
            _ => None,
        };
        let destination_balance = match request.destination_unit_id {
            Some(unit_id) if bulk && request.kind.credits_destination() => {
                self.balance(&product, unit_id).await?
            }
            _ => None,
        };

        // 5) Decide
        let ctx = MovementContext {
            product: &product,
            item: item.as_ref(),
            source_balance,
            destination_balance,
        };
        let plan = plan_movement(request, ctx, Utc::now())?;

        // 6) Commit
        Ok(self.store.commit_movement(&plan).await?)
    }

    async fn balance(&self, product: &Product, unit_id: UnitId) -> Result<Option<i64>, MovementError> {
        Ok(self.store.get_stock(product.id, unit_id).await?.map(|s| s.quantity))
    }

    async fn require_unit(&self, unit_id: UnitId) -> Result<(), MovementError> {
        match self.store.get_unit(unit_id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found(format!("unit {unit_id}")).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::ServiceError;
    use crate::store::{InMemoryInventoryStore, MovementFilter, Pagination};
    use patrimonio_core::{ItemId, ProductId, UserId};
    use patrimonio_inventory::{ItemStatus, MovementKind, NewItem, NewProduct, NewUnit, Unit, reconcile_bulk};

    struct Fixture {
        processor: MovementProcessor<Arc<InMemoryInventoryStore>>,
        store: Arc<InMemoryInventoryStore>,
        paper: Product,
        notebook: Product,
        a: Unit,
        b: Unit,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryInventoryStore::new());
        let a = store
            .insert_unit(NewUnit { name: "Almoxarifado Central".into(), manager: "Ana".into() })
            .await
            .unwrap();
        let b = store
            .insert_unit(NewUnit { name: "Escola Municipal".into(), manager: "Bia".into() })
            .await
            .unwrap();
        let paper = store
            .insert_product(NewProduct {
                name: "Papel A4".into(),
                model: None,
                description: None,
                category_id: None,
                type_id: None,
                brand_id: None,
                tracked_by_serial: false,
                minimum_quantity: 5,
            })
            .await
            .unwrap();
        let notebook = store
            .insert_product(NewProduct {
                name: "Notebook".into(),
                model: Some("X1".into()),
                description: None,
                category_id: None,
                type_id: None,
                brand_id: None,
                tracked_by_serial: true,
                minimum_quantity: 0,
            })
            .await
            .unwrap();

        Fixture {
            processor: MovementProcessor::new(store.clone()),
            store,
            paper,
            notebook,
            a,
            b,
        }
    }

    fn bulk(product: &Product, kind: MovementKind, source: Option<&Unit>, dest: Option<&Unit>, quantity: i64) -> MovementRequest {
        MovementRequest {
            product_id: product.id,
            kind,
            user_id: UserId::new(1),
            source_unit_id: source.map(|u| u.id),
            destination_unit_id: dest.map(|u| u.id),
            item_id: None,
            quantity,
            note: None,
        }
    }

    async fn balance(f: &Fixture, unit: &Unit) -> Option<i64> {
        f.store.get_stock(f.paper.id, unit.id).await.unwrap().map(|s| s.quantity)
    }

    #[tokio::test]
    async fn bulk_receipt_then_transfer() {
        let f = fixture().await;

        f.processor
            .process(bulk(&f.paper, MovementKind::Entrada, None, Some(&f.a), 10))
            .await
            .unwrap();
        let stock = f.store.get_stock(f.paper.id, f.a.id).await.unwrap().unwrap();
        assert_eq!(stock.quantity, 10);
        assert_eq!(stock.minimum_quantity, 5);

        let movement = f
            .processor
            .process(bulk(&f.paper, MovementKind::Transferencia, Some(&f.a), Some(&f.b), 4))
            .await
            .unwrap();
        assert_eq!(movement.source_unit_id, Some(f.a.id));
        assert_eq!(movement.destination_unit_id, Some(f.b.id));
        assert_eq!(balance(&f, &f.a).await, Some(6));
        assert_eq!(balance(&f, &f.b).await, Some(4));
    }

    #[tokio::test]
    async fn overdraw_is_rejected_and_leaves_no_trace() {
        let f = fixture().await;
        f.processor
            .process(bulk(&f.paper, MovementKind::Entrada, None, Some(&f.a), 6))
            .await
            .unwrap();

        let err = f
            .processor
            .process(bulk(&f.paper, MovementKind::Saida, Some(&f.a), None, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(msg) if msg.contains("insufficient stock")));
        assert_eq!(balance(&f, &f.a).await, Some(6));

        let ledger = f.store.movements_for_product(f.paper.id).await.unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn exit_from_unit_without_balance_is_a_conflict() {
        let f = fixture().await;
        let err = f
            .processor
            .process(bulk(&f.paper, MovementKind::Saida, Some(&f.b), None, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(balance(&f, &f.b).await, None);
    }

    #[tokio::test]
    async fn overflowing_receipt_is_rejected_and_store_stays_usable() {
        let f = fixture().await;
        f.processor
            .process(bulk(&f.paper, MovementKind::Entrada, None, Some(&f.a), i64::MAX))
            .await
            .unwrap();

        let err = f
            .processor
            .process(bulk(&f.paper, MovementKind::Entrada, None, Some(&f.a), i64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(msg) if msg.contains("balance overflow")));

        // Neither the balance nor the ledger moved, and later calls still work.
        assert_eq!(balance(&f, &f.a).await, Some(i64::MAX));
        assert_eq!(f.store.movements_for_product(f.paper.id).await.unwrap().len(), 1);
        f.processor
            .process(bulk(&f.paper, MovementKind::Transferencia, Some(&f.a), Some(&f.b), 10))
            .await
            .unwrap();
        assert_eq!(balance(&f, &f.b).await, Some(10));
    }

    #[tokio::test]
    async fn unknown_references_are_not_found() {
        let f = fixture().await;

        let mut req = bulk(&f.paper, MovementKind::Entrada, None, Some(&f.a), 1);
        req.product_id = ProductId::new(999);
        assert!(matches!(f.processor.process(req).await, Err(ServiceError::NotFound(_))));

        let mut req = bulk(&f.paper, MovementKind::Entrada, None, Some(&f.a), 1);
        req.destination_unit_id = Some(UnitId::new(999));
        assert!(matches!(f.processor.process(req).await, Err(ServiceError::NotFound(_))));

        let req = MovementRequest {
            item_id: Some(ItemId::new(999)),
            ..bulk(&f.notebook, MovementKind::Saida, None, None, 1)
        };
        assert!(matches!(f.processor.process(req).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn serialized_transfer_then_retirement() {
        let f = fixture().await;
        let item = f
            .store
            .insert_item(NewItem {
                product_id: f.notebook.id,
                unit_id: f.a.id,
                serial: "TOMBO-0001".into(),
                acquisition: Default::default(),
                note: None,
            })
            .await
            .unwrap();

        let transfer = MovementRequest {
            item_id: Some(item.id),
            ..bulk(&f.notebook, MovementKind::Transferencia, Some(&f.a), Some(&f.b), 7)
        };
        let movement = f.processor.process(transfer).await.unwrap();
        assert_eq!(movement.quantity, 1);
        assert_eq!(movement.source_unit_id, Some(f.a.id));
        assert_eq!(movement.destination_unit_id, Some(f.b.id));

        let moved = f.store.get_item(item.id).await.unwrap().unwrap();
        assert_eq!(moved.unit_id, f.b.id);
        assert_eq!(moved.status, ItemStatus::Available);

        // The item is no longer at A.
        let stale = MovementRequest {
            item_id: Some(item.id),
            ..bulk(&f.notebook, MovementKind::Saida, Some(&f.a), None, 1)
        };
        let err = f.processor.process(stale).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(msg) if msg.contains("item not at claimed source")));

        let exit = MovementRequest {
            item_id: Some(item.id),
            ..bulk(&f.notebook, MovementKind::Saida, Some(&f.b), None, 1)
        };
        f.processor.process(exit).await.unwrap();
        let retired = f.store.get_item(item.id).await.unwrap().unwrap();
        assert_eq!(retired.status, ItemStatus::Baixado);
        assert_eq!(retired.unit_id, f.b.id);

        let again = MovementRequest {
            item_id: Some(item.id),
            ..bulk(&f.notebook, MovementKind::Transferencia, None, Some(&f.a), 1)
        };
        assert!(matches!(
            f.processor.process(again).await,
            Err(ServiceError::UnsupportedTransition(_))
        ));
        assert!(f.store.get_stock(f.notebook.id, f.b.id).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_exits_never_overdraw() {
        let f = Arc::new(fixture().await);
        f.processor
            .process(bulk(&f.paper, MovementKind::Entrada, None, Some(&f.a), 5))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let f = f.clone();
            handles.push(tokio::spawn(async move {
                f.processor
                    .process(bulk(&f.paper, MovementKind::Saida, Some(&f.a), None, 5))
                    .await
            }));
        }

        let mut committed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => committed += 1,
                Err(err) => assert!(matches!(err, ServiceError::Conflict(_))),
            }
        }

        assert_eq!(committed, 1);
        assert_eq!(balance(&f, &f.a).await, Some(0));
    }

    #[tokio::test]
    async fn committed_history_reconciles_and_drift_is_detected() {
        let f = fixture().await;
        for q in [5, 3, 2] {
            f.processor
                .process(bulk(&f.paper, MovementKind::Entrada, None, Some(&f.a), q))
                .await
                .unwrap();
        }
        f.processor
            .process(bulk(&f.paper, MovementKind::Saida, Some(&f.a), None, 4))
            .await
            .unwrap();

        let stocks = f.store.list_stocks_for_product(f.paper.id).await.unwrap();
        let ledger = f.store.movements_for_product(f.paper.id).await.unwrap();
        let report = reconcile_bulk(&f.paper, &stocks, &ledger, &Default::default());
        assert!(!report.has_divergence());
        assert_eq!(report.units[0].computed, 6);

        f.store.force_stock_quantity(f.paper.id, f.a.id, 7).unwrap();
        let stocks = f.store.list_stocks_for_product(f.paper.id).await.unwrap();
        let report = reconcile_bulk(&f.paper, &stocks, &ledger, &Default::default());
        assert_eq!(report.units[0].divergence, Some(-1));

        let page = f
            .store
            .list_movements(
                &MovementFilter { kind: Some(MovementKind::Saida), ..Default::default() },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }
}
