//! HTTP facade over the box office engine.
//!
//! Run with `cargo run --example server`, then drive it with curl:
//!
//! ```sh
//! curl -s -X POST localhost:3000/tickets/issue \
//!   -H 'content-type: application/json' -H 'x-role: admin' \
//!   -d '{"unit_price":"1000","quantity":5,"channel":"online"}'
//!
//! curl -s -X POST localhost:3000/purchase \
//!   -H 'content-type: application/json' \
//!   -d '{"category":"<uuid>","quantity":2,"phone":"+221770000001","first_name":"Awa","last_name":"Ndiaye"}'
//! ```
//!
//! Role checks read the `x-role` header (`super_admin`, `admin`,
//! `club_manager`, `gate`, `supporter`); requests without one are treated
//! as supporters. Gate endpoints also read `x-operator`, a UUID naming the
//! scanning operator.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use boxoffice_rs::{
    authorize, Action, BoxOffice, BuyerId, BuyerProfile, CardId, CategoryId, Channel, CheckIn,
    EventId, OperatorId, PaymentOutcome, Role, SaleId, TicketCode, TicketError,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

struct AppError(TicketError);

impl From<TicketError> for AppError {
    fn from(err: TicketError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            TicketError::Validation { .. } => (StatusCode::BAD_REQUEST, "validation"),
            TicketError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            TicketError::InsufficientInventory { .. } => {
                (StatusCode::CONFLICT, "insufficient_inventory")
            }
            TicketError::InvalidState(_) => (StatusCode::CONFLICT, "invalid_state"),
            TicketError::TicketNotAdmissible => (StatusCode::CONFLICT, "not_admissible"),
            TicketError::NoPendingPayment => (StatusCode::CONFLICT, "no_pending_payment"),
            TicketError::DuplicateCode => (StatusCode::CONFLICT, "duplicate_code"),
            TicketError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            TicketError::ExternalService { .. } => (StatusCode::BAD_GATEWAY, "external_service"),
        };
        let body = Json(json!({ "error": code, "message": self.0.to_string() }));
        (status, body).into_response()
    }
}

fn role_of(headers: &HeaderMap) -> Role {
    headers
        .get("x-role")
        .and_then(|v| v.to_str().ok())
        .and_then(Role::parse)
        .unwrap_or(Role::Supporter)
}

fn operator_of(headers: &HeaderMap) -> Result<OperatorId, AppError> {
    headers
        .get("x-operator")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .map(OperatorId)
        .ok_or(AppError(TicketError::Validation {
            field: "x-operator",
            reason: "must be a UUID header",
        }))
}

#[derive(Deserialize)]
struct IssueRequest {
    category: Option<Uuid>,
    event: Option<Uuid>,
    unit_price: Decimal,
    quantity: u32,
    channel: String,
}

#[derive(Serialize)]
struct IssueResponse {
    category: CategoryId,
    event: EventId,
    issued: usize,
    codes: Vec<TicketCode>,
}

async fn issue_tickets(
    State(office): State<Arc<BoxOffice>>,
    headers: HeaderMap,
    Json(request): Json<IssueRequest>,
) -> Result<Json<IssueResponse>, AppError> {
    authorize(role_of(&headers), Action::IssueTickets)?;
    let channel = Channel::parse(&request.channel).ok_or(TicketError::Validation {
        field: "channel",
        reason: "must be print or online",
    })?;
    let category = request.category.map(CategoryId).unwrap_or_default();
    let event = request.event.map(EventId).unwrap_or_default();
    let batch = office.issue_tickets(
        category,
        event,
        request.unit_price,
        request.quantity,
        channel,
    )?;
    Ok(Json(IssueResponse {
        category,
        event,
        issued: batch.len(),
        codes: batch.into_iter().map(|t| t.code).collect(),
    }))
}

#[derive(Deserialize)]
struct PurchaseRequest {
    category: Uuid,
    quantity: u32,
    phone: String,
    first_name: String,
    last_name: String,
    email: Option<String>,
}

async fn purchase(
    State(office): State<Arc<BoxOffice>>,
    headers: HeaderMap,
    Json(request): Json<PurchaseRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    authorize(role_of(&headers), Action::Purchase)?;
    let profile = BuyerProfile {
        phone: request.phone,
        first_name: request.first_name,
        last_name: request.last_name,
        email: request.email,
    };
    let sale = office.reserve(CategoryId(request.category), request.quantity, &profile)?;
    Ok(Json(json!({
        "sale": sale.id,
        "quantity": sale.quantity,
        "amount": sale.amount,
        "status": sale.status,
    })))
}

async fn payment_url(
    State(office): State<Arc<BoxOffice>>,
    headers: HeaderMap,
    Path(sale): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    authorize(role_of(&headers), Action::Purchase)?;
    let session = office.payment_url(SaleId(sale))?;
    Ok(Json(json!({
        "token": session.token,
        "redirect_url": session.redirect_url,
    })))
}

#[derive(Deserialize)]
struct OutcomeRequest {
    status: String,
}

/// Shared by the redirect callback and the server-to-server notify hook;
/// both carry the same outcome and both are safe to replay.
async fn payment_outcome(
    State(office): State<Arc<BoxOffice>>,
    headers: HeaderMap,
    Path(sale): Path<Uuid>,
    Json(request): Json<OutcomeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    authorize(role_of(&headers), Action::PaymentCallback)?;
    let outcome = PaymentOutcome::from_provider_status(&request.status);
    let status = office.apply_outcome(SaleId(sale), outcome)?;
    Ok(Json(json!({ "sale": sale, "status": status })))
}

#[derive(Deserialize)]
struct CheckInRequest {
    code: String,
}

async fn check_in(
    State(office): State<Arc<BoxOffice>>,
    headers: HeaderMap,
    Json(request): Json<CheckInRequest>,
) -> Result<Json<CheckIn>, AppError> {
    authorize(role_of(&headers), Action::CheckIn)?;
    let operator = operator_of(&headers)?;
    let entry = office.check_in(&TicketCode(request.code), operator)?;
    Ok(Json(entry))
}

async fn my_check_ins(
    State(office): State<Arc<BoxOffice>>,
    headers: HeaderMap,
) -> Result<Json<Vec<CheckIn>>, AppError> {
    authorize(role_of(&headers), Action::ViewOwnCheckIns)?;
    let operator = operator_of(&headers)?;
    Ok(Json(office.check_ins_by_operator(operator)))
}

async fn category_counts(
    State(office): State<Arc<BoxOffice>>,
    headers: HeaderMap,
    Path(category): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    authorize(role_of(&headers), Action::ViewInventory)?;
    let counts = office.counts(CategoryId(category))?;
    Ok(Json(json!(counts)))
}

async fn sales_stats(
    State(office): State<Arc<BoxOffice>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    authorize(role_of(&headers), Action::ViewSalesStats)?;
    Ok(Json(json!(office.sales_stats())))
}

#[derive(Deserialize)]
struct IssueCardRequest {
    holder: Option<Uuid>,
    price: Decimal,
}

async fn issue_card(
    State(office): State<Arc<BoxOffice>>,
    headers: HeaderMap,
    Json(request): Json<IssueCardRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    authorize(role_of(&headers), Action::ManageCards)?;
    let holder = request.holder.map(BuyerId).unwrap_or_default();
    let card = office.issue_card(holder, request.price)?;
    Ok(Json(json!(card)))
}

async fn card_action(
    State(office): State<Arc<BoxOffice>>,
    headers: HeaderMap,
    Path((card, action)): Path<(Uuid, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    authorize(role_of(&headers), Action::ManageCards)?;
    let id = CardId(card);
    match action.as_str() {
        "block" => office.block_card(id)?,
        "disable" => office.disable_card(id)?,
        "activate" => office.activate_card(id)?,
        "sell" => office.sell_card(id)?,
        _ => {
            return Err(AppError(TicketError::Validation {
                field: "action",
                reason: "must be block, disable, activate or sell",
            }))
        }
    }
    let snapshot = office
        .card(id)
        .ok_or(TicketError::NotFound { entity: "card" })?;
    Ok(Json(json!(snapshot)))
}

async fn card_stats(
    State(office): State<Arc<BoxOffice>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    authorize(role_of(&headers), Action::ManageCards)?;
    Ok(Json(json!(office.card_stats())))
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let office = Arc::new(BoxOffice::new());

    let app = Router::new()
        .route("/tickets/issue", post(issue_tickets))
        .route("/purchase", post(purchase))
        .route("/sales/{sale}/payment", post(payment_url))
        .route("/payment/callback/{sale}", post(payment_outcome))
        .route("/payment/notify/{sale}", post(payment_outcome))
        .route("/gate/check-in", post(check_in))
        .route("/gate/check-ins", get(my_check_ins))
        .route("/inventory/{category}", get(category_counts))
        .route("/sales/stats", get(sales_stats))
        .route("/cards", post(issue_card))
        .route("/cards/{card}/{action}", post(card_action))
        .route("/cards/stats", get(card_stats))
        .with_state(office);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .unwrap();
    println!("box office listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}
