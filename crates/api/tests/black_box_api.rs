use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use patrimonio_api::app::AppServices;
use patrimonio_auth::{Principal, Role};
use patrimonio_core::UserId;
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory stores, bound to an ephemeral port.
        let services = Arc::new(AppServices::in_memory(ChronoDuration::minutes(10)));
        let app = patrimonio_api::app::build_app(services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            handle,
        }
    }

    fn token(&self, user: i64, role: Role) -> String {
        self.services
            .issue_session(Principal::new(UserId::new(user), role))
            .expect("failed to issue session")
            .token
            .to_string()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn post_json(client: &reqwest::Client, url: String, token: &str, body: Value) -> (StatusCode, Value) {
    let res = client.post(url).bearer_auth(token).json(&body).send().await.unwrap();
    let status = res.status();
    let body = res.json().await.unwrap_or(Value::Null);
    (status, body)
}

async fn get_json(client: &reqwest::Client, url: String, token: &str) -> (StatusCode, Value) {
    let res = client.get(url).bearer_auth(token).send().await.unwrap();
    let status = res.status();
    let body = res.json().await.unwrap_or(Value::Null);
    (status, body)
}

/// Unit "Almoxarifado" plus a bulk product; returns (unit_id, product_id).
async fn seed_bulk(srv: &TestServer, client: &reqwest::Client, token: &str) -> (i64, i64) {
    let (status, unit) = post_json(
        client,
        srv.url("/units"),
        token,
        json!({ "name": "Almoxarifado", "manager": "Ana" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, product) = post_json(
        client,
        srv.url("/products"),
        token,
        json!({ "name": "Papel A4", "tracked_by_serial": false, "minimum_quantity": 10 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    (unit["id"].as_i64().unwrap(), product["id"].as_i64().unwrap())
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn session_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Well-formed but never issued.
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth("6f1c2d9e-4b7a-4c41-9d55-0a3e5b8f1c22")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_explains_role_capabilities() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.token(7, Role::Operador);

    let (status, body) = get_json(&client, srv.url("/whoami"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], 7);
    assert_eq!(body["role"], "operador");

    let caps = body["capabilities"].as_array().unwrap();
    let granted: Vec<&str> = caps
        .iter()
        .filter(|c| c["granted"] == true)
        .map(|c| c["required"].as_str().unwrap())
        .collect();
    assert_eq!(granted, vec!["view_stock"]);
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.token(1, Role::Master);

    let res = client
        .post(srv.url("/sessions/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let (status, _) = get_json(&client, srv.url("/whoami"), &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bulk_lifecycle_and_overdraw_rejection() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.token(1, Role::GestorEstoque);
    let (unit, product) = seed_bulk(&srv, &client, &token).await;

    // Front-end field names are accepted.
    let (status, movement) = post_json(
        &client,
        srv.url("/movements"),
        &token,
        json!({ "product_id": product, "tipo": "entrada", "unit_destino_id": unit, "quantidade": 5 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(movement["kind"], "ENTRADA");
    assert_eq!(movement["user_id"], 1);

    let (status, body) = post_json(
        &client,
        srv.url("/movements"),
        &token,
        json!({ "product_id": product, "kind": "SAIDA", "source_unit_id": unit, "quantity": 6 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, stock) = get_json(&client, srv.url(&format!("/products/{product}/stock")), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stock[0]["quantity"], 5);
    assert_eq!(stock[0]["unit_name"], "Almoxarifado");

    let (status, page) = get_json(
        &client,
        srv.url(&format!("/movements?product_id={product}&limit=10")),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["has_more"], false);

    // 5 < minimum 10
    let (status, low) = get_json(&client, srv.url("/stock/low"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(low.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn validation_and_lookup_errors_map_to_status_codes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.token(1, Role::Master);
    let (unit, product) = seed_bulk(&srv, &client, &token).await;

    let (status, _) = post_json(
        &client,
        srv.url("/movements"),
        &token,
        json!({ "product_id": product, "kind": "EMPRESTIMO", "destination_unit_id": unit, "quantity": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &client,
        srv.url("/movements"),
        &token,
        json!({ "product_id": product, "kind": "ENTRADA", "destination_unit_id": unit, "quantity": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &client,
        srv.url("/movements"),
        &token,
        json!({ "product_id": 999, "kind": "ENTRADA", "destination_unit_id": unit, "quantity": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get_json(&client, srv.url("/products/abc"), &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");
}

#[tokio::test]
async fn operador_cannot_move_stock_or_manage_catalog() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = srv.token(1, Role::AdminMunicipal);
    let operador = srv.token(2, Role::Operador);
    let (unit, product) = seed_bulk(&srv, &client, &admin).await;

    let (status, body) = post_json(
        &client,
        srv.url("/movements"),
        &operador,
        json!({ "product_id": product, "kind": "ENTRADA", "destination_unit_id": unit, "quantity": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = post_json(
        &client,
        srv.url("/units"),
        &operador,
        json!({ "name": "Secretaria de Obras", "manager": "Rui" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Viewing is allowed.
    let (status, _) = get_json(&client, srv.url("/products"), &operador).await;
    assert_eq!(status, StatusCode::OK);

    let protocolo = srv.token(3, Role::GestorProtocolo);
    let (status, _) = get_json(&client, srv.url("/products"), &protocolo).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn serialized_item_flow_and_retirement() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.token(1, Role::GestorGeral);

    let (_, a) = post_json(&client, srv.url("/units"), &token, json!({ "name": "Unidade A", "manager": "Ana" })).await;
    let (_, b) = post_json(&client, srv.url("/units"), &token, json!({ "name": "Unidade B", "manager": "Bia" })).await;
    let (a, b) = (a["id"].as_i64().unwrap(), b["id"].as_i64().unwrap());

    let (status, product) = post_json(
        &client,
        srv.url("/products"),
        &token,
        json!({ "name": "Notebook", "tracked_by_serial": true }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let product = product["id"].as_i64().unwrap();

    let (status, item) = post_json(
        &client,
        srv.url("/items"),
        &token,
        json!({ "product_id": product, "unit_id": a, "serial": "PAT-0001" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["status"], "Disponível");
    let item = item["id"].as_i64().unwrap();

    let (status, _) = post_json(
        &client,
        srv.url("/movements"),
        &token,
        json!({ "product_id": product, "item_id": item, "kind": "TRANSFERENCIA", "source_unit_id": a, "destination_unit_id": b }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Stale source unit.
    let (status, _) = post_json(
        &client,
        srv.url("/movements"),
        &token,
        json!({ "product_id": product, "item_id": item, "kind": "SAIDA", "source_unit_id": a }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post_json(
        &client,
        srv.url("/movements"),
        &token,
        json!({ "product_id": product, "item_id": item, "kind": "SAIDA", "source_unit_id": b }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, items) = get_json(&client, srv.url(&format!("/products/{product}/items")), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(items[0]["status"], "Baixado");

    let (status, body) = post_json(
        &client,
        srv.url("/movements"),
        &token,
        json!({ "product_id": product, "item_id": item, "kind": "TRANSFERENCIA", "source_unit_id": b, "destination_unit_id": a }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "unsupported_transition");
}

#[tokio::test]
async fn audit_reconciles_ledger_against_balances() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.token(1, Role::Master);
    let (unit, product) = seed_bulk(&srv, &client, &token).await;

    for q in [5, 3, 2] {
        let (status, _) = post_json(
            &client,
            srv.url("/movements"),
            &token,
            json!({ "product_id": product, "kind": "ENTRADA", "destination_unit_id": unit, "quantity": q }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = post_json(
        &client,
        srv.url("/movements"),
        &token,
        json!({ "product_id": product, "kind": "SAIDA", "source_unit_id": unit, "quantity": 4 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, report) = get_json(&client, srv.url(&format!("/audit/products/{product}")), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["kind"], "bulk");
    assert_eq!(report["units"][0]["computed"], 6);
    assert_eq!(report["units"][0]["stored"], 6);
    assert_eq!(report["units"][0]["divergence"], 0);

    let (status, all) = get_json(&client, srv.url("/audit"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["divergent_products"], 0);

    let (status, _) = get_json(&client, srv.url("/audit/products/999"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let operador = srv.token(2, Role::Operador);
    let (status, _) = get_json(&client, srv.url("/audit"), &operador).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn products_and_items_carry_classification_and_acquisition() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.token(1, Role::GestorGeral);

    let (status, category) = post_json(
        &client,
        srv.url("/taxonomy/categories"),
        &token,
        json!({ "nome": "Informática", "descricao": "Equipamentos de TI" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(category["active"], true);
    let category = category["id"].as_i64().unwrap();

    let (status, kind) = post_json(
        &client,
        srv.url("/taxonomy/types"),
        &token,
        json!({ "name": "Notebook", "category_id": category }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let kind = kind["id"].as_i64().unwrap();

    let (_, brand) = post_json(&client, srv.url("/taxonomy/brands"), &token, json!({ "name": "Lenovo" })).await;
    let (_, condition) = post_json(&client, srv.url("/taxonomy/conditions"), &token, json!({ "nome": "Bom" })).await;
    let (brand, condition) = (brand["id"].as_i64().unwrap(), condition["id"].as_i64().unwrap());

    let (status, _) = post_json(&client, srv.url("/taxonomy/brands"), &token, json!({ "name": "Lenovo" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post_json(
        &client,
        srv.url("/products"),
        &token,
        json!({ "name": "Notebook", "tracked_by_serial": true, "brand_id": 999 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, product) = post_json(
        &client,
        srv.url("/products"),
        &token,
        json!({
            "name": "Notebook",
            "tracked_by_serial": true,
            "category_id": category,
            "type_id": kind,
            "brand_id": brand
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["brand_id"], brand);
    let product = product["id"].as_i64().unwrap();

    let (_, unit) = post_json(&client, srv.url("/units"), &token, json!({ "name": "Unidade A", "manager": "Ana" })).await;
    let unit = unit["id"].as_i64().unwrap();

    let (status, item) = post_json(
        &client,
        srv.url("/items"),
        &token,
        json!({
            "product_id": product,
            "unit_id": unit,
            "tombo": "PAT-0100",
            "estado_id": condition,
            "data_aquisicao": "2024-03-01",
            "acquisition_value_cents": 450000,
            "garantia_ate": "2027-03-01"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["condition_id"], condition);
    assert_eq!(item["acquired_on"], "2024-03-01");
    assert_eq!(item["acquisition_value_cents"], 450000);
    assert_eq!(item["warranty_until"], "2027-03-01");

    let (status, _) = post_json(
        &client,
        srv.url("/items"),
        &token,
        json!({
            "product_id": product,
            "unit_id": unit,
            "serial": "PAT-0101",
            "acquired_on": "2024-03-01",
            "warranty_until": "2023-03-01"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, taxonomy) = get_json(&client, srv.url("/taxonomy"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(taxonomy["categories"][0]["name"], "Informática");
    assert_eq!(taxonomy["equipment_types"][0]["category_id"], category);
    assert_eq!(taxonomy["conditions"][0]["name"], "Bom");
}
