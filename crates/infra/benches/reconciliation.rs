use std::collections::HashMap;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use patrimonio_core::{MovementId, ProductId, UnitId, UserId};
use patrimonio_infra::{InMemoryInventoryStore, InventoryStore, MovementProcessor};
use patrimonio_inventory::{
    Movement, MovementKind, MovementRequest, NewProduct, NewUnit, Product, Stock, ledger_balances,
    reconcile_bulk,
};

const UNITS: i64 = 16;

fn product() -> Product {
    Product {
        id: ProductId::new(1),
        name: "Papel A4".into(),
        model: None,
        description: None,
        category_id: None,
        type_id: None,
        brand_id: None,
        tracked_by_serial: false,
        minimum_quantity: 0,
        active: true,
    }
}

/// Receipts into every unit followed by a rotating mix of transfers and exits.
fn synthetic_ledger(len: usize) -> Vec<Movement> {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).single().unwrap_or_default();
    (0..len)
        .map(|i| {
            let unit = UnitId::new(i as i64 % UNITS + 1);
            let next = UnitId::new((i as i64 + 1) % UNITS + 1);
            let (kind, source, destination, quantity) = match i % 4 {
                0 | 1 => (MovementKind::Entrada, None, Some(unit), 10),
                2 => (MovementKind::Transferencia, Some(unit), Some(next), 3),
                _ => (MovementKind::Saida, Some(unit), None, 2),
            };
            Movement {
                id: MovementId::new(i as i64 + 1),
                kind,
                product_id: ProductId::new(1),
                item_id: None,
                source_unit_id: source,
                destination_unit_id: destination,
                quantity,
                user_id: UserId::new(1),
                occurred_at: at,
                note: None,
            }
        })
        .collect()
}

fn bench_reconcile_bulk(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_bulk");
    let product = product();
    let names: HashMap<UnitId, String> =
        (1..=UNITS).map(|u| (UnitId::new(u), format!("Unidade {u}"))).collect();

    for len in [1_000usize, 10_000, 100_000] {
        let movements = synthetic_ledger(len);
        let stocks: Vec<Stock> = ledger_balances(product.id, &movements)
            .into_iter()
            .map(|(unit_id, quantity)| Stock { quantity, ..Stock::empty(product.id, unit_id, 0) })
            .collect();

        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &movements, |b, movements| {
            b.iter(|| {
                let report = reconcile_bulk(&product, black_box(&stocks), black_box(movements), &names);
                assert!(!report.has_divergence());
            });
        });
    }

    group.finish();
}

fn bench_movement_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("movement_commit");
    group.throughput(Throughput::Elements(1));

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => panic!("failed to build runtime: {err}"),
    };
    let store = Arc::new(InMemoryInventoryStore::new());
    let (unit, product) = rt.block_on(async {
        let unit = store
            .insert_unit(NewUnit { name: "Almoxarifado".into(), manager: "Ana".into() })
            .await
            .unwrap();
        let product = store
            .insert_product(NewProduct {
                name: "Papel A4".into(),
                model: None,
                description: None,
                category_id: None,
                type_id: None,
                brand_id: None,
                tracked_by_serial: false,
                minimum_quantity: 0,
            })
            .await
            .unwrap();
        (unit, product)
    });
    let processor = MovementProcessor::new(store.clone());

    group.bench_function("bulk_entrada", |b| {
        b.iter(|| {
            rt.block_on(processor.process(MovementRequest {
                product_id: product.id,
                kind: MovementKind::Entrada,
                user_id: UserId::new(1),
                source_unit_id: None,
                destination_unit_id: Some(unit.id),
                item_id: None,
                quantity: black_box(1),
                note: None,
            }))
            .unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_reconcile_bulk, bench_movement_commit);
criterion_main!(benches);
