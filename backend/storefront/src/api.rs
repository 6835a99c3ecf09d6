//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::admin::{self, OrderListQuery, RegistrationListQuery};
use crate::cart::{Cart, CartItem, DeliveryOption};
use crate::catalog::{self, CampCatalogEntry, CampKey, ProductId, CAMPS, PRODUCTS};
use crate::checkout::{Checkout, CheckoutDraft, OrderStatus};
use crate::config::Config;
use crate::errors::{StorefrontError, SubmitError};
use crate::registration::{AgeRange, RegistrationDraft, RegistrationType, AGE_OPTIONS};
use crate::store::{Collection, DocumentId, RecordStore, StoredDocument};
use crate::wizard::{Wizard, WizardState};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn RecordStore>,
    pub config: Config,
}

/// Build the full route table. Admin routes exist only when an admin token
/// is configured.
pub fn router(state: Arc<ApiState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/camps", get(list_camps))
        .route("/camps/:key", get(get_camp))
        .route("/products", get(list_products))
        .route("/registrations/new", get(new_registration))
        .route("/registrations/validate", post(validate_registration_step))
        .route("/registrations", post(submit_registration))
        .route("/cart/quote", post(quote_cart))
        .route("/orders", post(place_order));

    if state.config.admin_token.is_some() {
        let admin_routes = Router::new()
            .route("/admin/registrations", get(admin_list_registrations))
            .route(
                "/admin/registrations/:id",
                patch(admin_update_registration).delete(admin_delete_registration),
            )
            .route("/admin/orders", get(admin_list_orders))
            .route("/admin/orders/:id/status", patch(admin_set_order_status))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));
        app = app.merge(admin_routes);
    }

    app.with_state(state)
}

// ─────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<&'static str>>,
}

#[derive(Debug)]
pub enum ApiError {
    Submit(SubmitError),
    Store(StorefrontError),
    BadRequest(String),
    NotFound(String),
    Unauthorized,
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        ApiError::Submit(e)
    }
}

impl From<StorefrontError> for ApiError {
    fn from(e: StorefrontError) -> Self {
        ApiError::Store(e)
    }
}

fn store_status(e: &StorefrontError) -> StatusCode {
    match e {
        StorefrontError::NotFound { .. } => StatusCode::NOT_FOUND,
        StorefrontError::OutcomeUnknown { .. } => StatusCode::GATEWAY_TIMEOUT,
        StorefrontError::Unavailable(_)
        | StorefrontError::Database(_)
        | StorefrontError::Migrate(_) => StatusCode::SERVICE_UNAVAILABLE,
        StorefrontError::Json(_) | StorefrontError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Submit(SubmitError::Incomplete { step, missing }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: format!("Step {step} is incomplete"),
                    step: Some(step),
                    missing: Some(missing),
                },
            ),
            ApiError::Submit(SubmitError::Store(e)) | ApiError::Store(e) => (
                store_status(&e),
                ErrorResponse {
                    error: e.to_string(),
                    step: None,
                    missing: None,
                },
            ),
            ApiError::Submit(e @ (SubmitError::InProgress | SubmitError::AlreadySubmitted)) => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: e.to_string(),
                    step: None,
                    missing: None,
                },
            ),
            ApiError::Submit(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: e.to_string(),
                    step: None,
                    missing: None,
                },
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: msg,
                    step: None,
                    missing: None,
                },
            ),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: msg,
                    step: None,
                    missing: None,
                },
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    error: "Admin token required".to_string(),
                    step: None,
                    missing: None,
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct EntryQuery {
    pub camp: Option<String>,
    #[serde(rename = "type")]
    pub registration_type: Option<String>,
}

/// A registration form as posted by the site: the branch plus the flat draft.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    #[serde(default)]
    pub registration_type: RegistrationType,
    #[serde(flatten)]
    pub draft: RegistrationDraft,
}

#[derive(Debug, Deserialize)]
pub struct StepCheckRequest {
    pub step: u8,
    pub form: RegistrationForm,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
    pub registration_type: RegistrationType,
    pub step: u8,
    pub total_steps: u8,
    pub draft: RegistrationDraft,
    pub camp: &'static CampCatalogEntry,
    /// Choices for the student age and institution age-range selectors.
    pub age_options: AgeRange,
}

#[derive(Serialize)]
pub struct StepCheckResponse {
    pub step: u8,
    pub valid: bool,
    pub missing: Vec<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedResponse {
    pub id: DocumentId,
    pub registration_type: RegistrationType,
    pub camp_name: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub items: Vec<LineRequest>,
    #[serde(default)]
    pub delivery_option: DeliveryOption,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub items: Vec<CartItem>,
    pub item_count: u64,
    pub subtotal: u64,
    pub shipping_cost: u64,
    pub total: u64,
    pub amount_until_free_shipping: u64,
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub checkout: CheckoutDraft,
    pub items: Vec<LineRequest>,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: DocumentId,
    pub total: u64,
}

#[derive(Serialize)]
pub struct DocumentsResponse {
    pub count: usize,
    pub documents: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

fn idempotency_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
}

/// Price lines from the server-side catalog. Repeated product ids add up.
fn build_cart(lines: &[LineRequest]) -> ApiResult<Cart> {
    let mut cart = Cart::new();
    for line in lines {
        let product = catalog::find_product(line.product_id)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown product {}", line.product_id)))?;
        let quantity = i64::from(cart.quantity_of(product.id)) + i64::from(line.quantity);
        cart.add_item(product);
        cart.set_quantity(product.id, quantity);
    }
    Ok(cart)
}

fn with_id(doc: StoredDocument) -> Value {
    let mut body = doc.body;
    if let Value::Object(map) = &mut body {
        map.insert("id".to_string(), Value::String(doc.id));
    }
    body
}

// ─────────────────────────────────────────────────────────
// Public handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /camps`
pub async fn list_camps() -> impl IntoResponse {
    Json(json!({ "count": CAMPS.len(), "camps": &CAMPS }))
}

/// `GET /camps/:key`
pub async fn get_camp(Path(key): Path<String>) -> ApiResult<Json<&'static CampCatalogEntry>> {
    CampKey::from_param(&key)
        .map(|k| Json(k.entry()))
        .ok_or_else(|| ApiError::NotFound(format!("Unknown camp '{key}'")))
}

/// `GET /products`
pub async fn list_products() -> impl IntoResponse {
    Json(json!({ "count": PRODUCTS.len(), "products": &PRODUCTS }))
}

/// `GET /registrations/new?camp=&type=`
///
/// Initial wizard state for the registration page.
pub async fn new_registration(Query(query): Query<EntryQuery>) -> impl IntoResponse {
    let state = WizardState::from_query(query.camp.as_deref(), query.registration_type.as_deref());
    Json(WizardView {
        registration_type: state.branch(),
        step: state.step_number(),
        total_steps: state.total_steps(),
        camp: state.draft().camp_type.entry(),
        draft: state.draft().clone(),
        age_options: AGE_OPTIONS,
    })
}

/// `POST /registrations/validate`
///
/// Live check for the "Next" control of a single step.
pub async fn validate_registration_step(Json(req): Json<StepCheckRequest>) -> impl IntoResponse {
    let state = WizardState::new(req.form.registration_type, req.form.draft);
    let missing = state.missing_fields(req.step);
    Json(StepCheckResponse {
        step: req.step,
        valid: missing.is_empty(),
        missing,
    })
}

/// `POST /registrations`
///
/// Walks the submitted form through every wizard step and appends the
/// registration once all steps validate.
pub async fn submit_registration(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(form): Json<RegistrationForm>,
) -> ApiResult<impl IntoResponse> {
    let mut wizard = Wizard::new(WizardState::new(form.registration_type, form.draft));
    wizard.advance_to_review()?;

    let id = wizard
        .submit(
            state.store.as_ref(),
            state.config.write_timeout(),
            idempotency_key(&headers),
        )
        .await?;

    let draft = wizard.state().draft();
    Ok((
        StatusCode::CREATED,
        Json(SubmittedResponse {
            id,
            registration_type: wizard.state().branch(),
            camp_name: draft.camp_type.entry().name,
        }),
    ))
}

/// `POST /cart/quote`
pub async fn quote_cart(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<QuoteRequest>,
) -> ApiResult<Json<QuoteResponse>> {
    let cart = build_cart(&req.items)?;
    let policy = state.config.shipping_policy();
    let totals = cart.totals(req.delivery_option, &policy);
    Ok(Json(QuoteResponse {
        item_count: cart.item_count(),
        subtotal: totals.subtotal,
        shipping_cost: totals.shipping_cost,
        total: totals.total,
        amount_until_free_shipping: cart.amount_until_free_shipping(&policy),
        items: cart.items().to_vec(),
    }))
}

/// `POST /orders`
pub async fn place_order(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(req): Json<OrderRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut checkout = Checkout::new(state.config.shipping_policy());
    checkout.cart = build_cart(&req.items)?;
    checkout.draft = req.checkout;
    let total = checkout
        .cart
        .totals(checkout.draft.delivery_option, checkout.policy())
        .total;

    let id = checkout
        .submit(
            state.store.as_ref(),
            state.config.write_timeout(),
            idempotency_key(&headers),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(OrderResponse { id, total })))
}

// ─────────────────────────────────────────────────────────
// Admin handlers
// ─────────────────────────────────────────────────────────

pub async fn require_admin(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match (&state.config.admin_token, presented) {
        (Some(expected), Some(token)) if token == expected => next.run(request).await,
        _ => {
            warn!("Rejected admin request to {}", request.uri().path());
            ApiError::Unauthorized.into_response()
        }
    }
}

/// `GET /admin/registrations?type=&search=&sort=`
pub async fn admin_list_registrations(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<RegistrationListQuery>,
) -> ApiResult<Json<DocumentsResponse>> {
    let filter =
        admin::parse_type_filter(query.registration_type.as_deref()).map_err(ApiError::BadRequest)?;
    let docs = state
        .store
        .read_all(
            Collection::Registrations,
            query.sort.store_order("submittedAt"),
        )
        .await?;
    let docs = admin::filter_registrations(docs, filter, query.search.as_deref(), query.sort);
    Ok(Json(DocumentsResponse {
        count: docs.len(),
        documents: docs.into_iter().map(with_id).collect(),
    }))
}

/// `PATCH /admin/registrations/:id`
pub async fn admin_update_registration(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(mut partial): Json<Map<String, Value>>,
) -> ApiResult<StatusCode> {
    partial.remove("id");
    state
        .store
        .update(Collection::Registrations, &id, partial)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /admin/registrations/:id`
pub async fn admin_delete_registration(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete(Collection::Registrations, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /admin/orders?status=&search=&sort=`
pub async fn admin_list_orders(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<Json<DocumentsResponse>> {
    let filter = admin::parse_status_filter(query.status.as_deref()).map_err(ApiError::BadRequest)?;
    let docs = state
        .store
        .read_all(Collection::Orders, query.sort.store_order("createdAt"))
        .await?;
    let docs = admin::filter_orders(docs, filter, query.search.as_deref(), query.sort);
    Ok(Json(DocumentsResponse {
        count: docs.len(),
        documents: docs.into_iter().map(with_id).collect(),
    }))
}

/// `PATCH /admin/orders/:id/status`
pub async fn admin_set_order_status(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<StatusCode> {
    let mut partial = Map::new();
    partial.insert(
        "status".to_string(),
        Value::String(update.status.as_str().to_string()),
    );
    state.store.update(Collection::Orders, &id, partial).await?;
    Ok(StatusCode::NO_CONTENT)
}
