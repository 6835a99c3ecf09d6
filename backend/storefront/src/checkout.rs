//! Checkout: validates the customer form, snapshots the cart into an order
//! and appends it to the `orders` collection.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use validator::ValidateEmail;

use crate::cart::{Cart, CartItem, DeliveryOption, ShippingPolicy};
use crate::errors::{StorefrontError, SubmitError};
use crate::store::{self, Collection, DocumentId, RecordStore};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerDetails {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutDraft {
    #[serde(flatten)]
    pub customer: CustomerDetails,
    pub agree_to_terms: bool,
    pub delivery_option: DeliveryOption,
}

/// The first checkout rule a submission breaks, in checking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CheckoutViolation {
    #[error("Please enter your full name")]
    MissingName,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Please enter your phone number")]
    MissingPhone,
    #[error("Please accept the terms and conditions")]
    TermsNotAccepted,
    #[error("Your cart is empty")]
    EmptyCart,
}

pub fn validate_checkout(draft: &CheckoutDraft, cart: &Cart) -> Result<(), CheckoutViolation> {
    let c = &draft.customer;
    if c.full_name.trim().is_empty() {
        return Err(CheckoutViolation::MissingName);
    }
    if !c.email.trim().validate_email() {
        return Err(CheckoutViolation::InvalidEmail);
    }
    if c.phone.trim().is_empty() {
        return Err(CheckoutViolation::MissingPhone);
    }
    if !draft.agree_to_terms {
        return Err(CheckoutViolation::TermsNotAccepted);
    }
    if cart.is_empty() {
        return Err(CheckoutViolation::EmptyCart);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub customer: CustomerDetails,
    pub items: Vec<CartItem>,
    pub subtotal: u64,
    #[serde(rename = "shipping")]
    pub shipping_cost: u64,
    pub total: u64,
    pub delivery_option: DeliveryOption,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Snapshot the cart; the record owns its own copy of every line.
    pub fn snapshot(
        draft: &CheckoutDraft,
        cart: &Cart,
        policy: &ShippingPolicy,
        created_at: DateTime<Utc>,
    ) -> Self {
        let totals = cart.totals(draft.delivery_option, policy);
        OrderRecord {
            customer: draft.customer.clone(),
            items: cart.items().to_vec(),
            subtotal: totals.subtotal,
            shipping_cost: totals.shipping_cost,
            total: totals.total,
            delivery_option: draft.delivery_option,
            status: OrderStatus::Pending,
            created_at,
        }
    }
}

/// One shopper's cart plus checkout form.
#[derive(Debug, Default)]
pub struct Checkout {
    pub cart: Cart,
    pub draft: CheckoutDraft,
    policy: ShippingPolicy,
    loading: bool,
}

impl Checkout {
    pub fn new(policy: ShippingPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> &ShippingPolicy {
        &self.policy
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Validate and freeze the order. Nothing is written yet.
    pub fn begin_submit(&mut self) -> Result<OrderRecord, SubmitError> {
        if self.loading {
            return Err(SubmitError::InProgress);
        }
        validate_checkout(&self.draft, &self.cart)?;
        self.loading = true;
        Ok(OrderRecord::snapshot(
            &self.draft,
            &self.cart,
            &self.policy,
            Utc::now(),
        ))
    }

    /// Settle a submission. Success empties the cart and resets the form;
    /// failure keeps both for a retry.
    pub fn finish_submit(&mut self, outcome: &Result<DocumentId, SubmitError>) {
        self.loading = false;
        if outcome.is_ok() {
            self.cart.clear();
            self.draft = CheckoutDraft::default();
        }
    }

    pub async fn submit(
        &mut self,
        store: &dyn RecordStore,
        deadline: Duration,
        idempotency_key: Option<&str>,
    ) -> Result<DocumentId, SubmitError> {
        let order = self.begin_submit()?;
        let outcome = persist(store, &order, idempotency_key, deadline).await;

        match &outcome {
            Ok(id) => info!(
                "Order {id} stored: {} item(s), total {}",
                order.items.len(),
                order.total
            ),
            Err(e) => error!("Checkout failed: {e}"),
        }
        self.finish_submit(&outcome);
        outcome
    }
}

async fn persist(
    store: &dyn RecordStore,
    order: &OrderRecord,
    idempotency_key: Option<&str>,
    deadline: Duration,
) -> Result<DocumentId, SubmitError> {
    let body = serde_json::to_value(order).map_err(StorefrontError::from)?;
    let id = store::append_within(store, Collection::Orders, body, idempotency_key, deadline).await?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::find_product;
    use crate::store::{MemoryStore, OrderBy};

    const DEADLINE: Duration = Duration::from_secs(5);

    fn valid_draft() -> CheckoutDraft {
        CheckoutDraft {
            customer: CustomerDetails {
                full_name: "Ravi Kumar".into(),
                email: "ravi@example.com".into(),
                phone: "9876543210".into(),
                country: "India".into(),
                city: "Pune".into(),
                state: "MH".into(),
                zip: "411001".into(),
            },
            agree_to_terms: true,
            delivery_option: DeliveryOption::Delivery,
        }
    }

    fn checkout_with_kit() -> Checkout {
        let mut checkout = Checkout::new(ShippingPolicy::default());
        checkout.cart.add_item(find_product(1).unwrap());
        checkout.draft = valid_draft();
        checkout
    }

    #[test]
    fn reports_first_violation_in_order() {
        let cart = Cart::new();
        let blank = CheckoutDraft::default();
        assert_eq!(
            validate_checkout(&blank, &cart),
            Err(CheckoutViolation::MissingName)
        );

        let mut draft = valid_draft();
        draft.customer.email = "not-an-email".into();
        draft.customer.phone.clear();
        assert_eq!(
            validate_checkout(&draft, &cart),
            Err(CheckoutViolation::InvalidEmail)
        );

        let mut draft = valid_draft();
        draft.customer.phone = "  ".into();
        assert_eq!(
            validate_checkout(&draft, &cart),
            Err(CheckoutViolation::MissingPhone)
        );

        let mut draft = valid_draft();
        draft.agree_to_terms = false;
        assert_eq!(
            validate_checkout(&draft, &cart),
            Err(CheckoutViolation::TermsNotAccepted)
        );

        assert_eq!(
            validate_checkout(&valid_draft(), &cart),
            Err(CheckoutViolation::EmptyCart)
        );
    }

    #[tokio::test]
    async fn invalid_checkout_writes_nothing() {
        let store = MemoryStore::new();
        let mut checkout = checkout_with_kit();
        checkout.draft.agree_to_terms = false;

        let err = checkout.submit(&store, DEADLINE, None).await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Checkout(CheckoutViolation::TermsNotAccepted)
        ));
        assert!(!checkout.is_loading());
        assert!(store
            .read_all(Collection::Orders, OrderBy::newest("createdAt"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn successful_checkout_clears_cart_and_form() {
        let store = MemoryStore::new();
        let mut checkout = checkout_with_kit();

        checkout.submit(&store, DEADLINE, None).await.unwrap();

        assert!(checkout.cart.is_empty());
        assert_eq!(checkout.draft, CheckoutDraft::default());
        assert!(!checkout.draft.agree_to_terms);

        let docs = store
            .read_all(Collection::Orders, OrderBy::newest("createdAt"))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        let body = &docs[0].body;
        assert_eq!(body["status"], "pending");
        assert_eq!(body["subtotal"], 4199);
        assert_eq!(body["shipping"], 0);
        assert_eq!(body["total"], 4199);
        assert_eq!(body["deliveryOption"], "delivery");
        assert_eq!(body["customer"]["fullName"], "Ravi Kumar");
        assert_eq!(body["items"][0]["id"], 1);
        assert_eq!(body["items"][0]["quantity"], 1);
    }

    #[tokio::test]
    async fn failed_write_keeps_cart_and_form() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        let mut checkout = checkout_with_kit();
        checkout.cart.add_item(find_product(4).unwrap());
        let cart_before = checkout.cart.clone();
        let draft_before = checkout.draft.clone();

        let err = checkout.submit(&store, DEADLINE, None).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(checkout.cart, cart_before);
        assert_eq!(checkout.draft, draft_before);
        assert!(!checkout.is_loading());
    }

    #[tokio::test]
    async fn stalled_write_keeps_cart_and_form() {
        let store = MemoryStore::new();
        store.set_stall_writes(true);
        let mut checkout = checkout_with_kit();
        let cart_before = checkout.cart.clone();
        let draft_before = checkout.draft.clone();

        let err = checkout
            .submit(&store, Duration::from_millis(20), Some("order-1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Store(StorefrontError::OutcomeUnknown {
                collection: Collection::Orders,
                ..
            })
        ));
        assert!(err.is_retryable());
        assert_eq!(checkout.cart, cart_before);
        assert_eq!(checkout.draft, draft_before);
        assert!(!checkout.is_loading());

        // Retrying with the same key once the store recovers writes one order.
        store.set_stall_writes(false);
        checkout.submit(&store, DEADLINE, Some("order-1")).await.unwrap();
        assert!(checkout.cart.is_empty());
    }

    #[test]
    fn snapshot_is_detached_from_the_cart() {
        let mut checkout = checkout_with_kit();
        let order = checkout.begin_submit().unwrap();
        checkout.cart.set_quantity(1, 7);
        checkout.cart.add_item(find_product(2).unwrap());

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 1);
        assert_eq!(order.subtotal, 4199);
    }

    #[test]
    fn begin_submit_guards_reentry() {
        let mut checkout = checkout_with_kit();
        checkout.begin_submit().unwrap();
        assert!(matches!(checkout.begin_submit(), Err(SubmitError::InProgress)));
        checkout.finish_submit(&Err(SubmitError::InProgress));
        assert!(checkout.begin_submit().is_ok());
    }

    #[test]
    fn pickup_orders_never_pay_shipping() {
        let mut checkout = Checkout::new(ShippingPolicy::default());
        let mut draft = valid_draft();
        draft.delivery_option = DeliveryOption::Pickup;
        checkout.draft = draft;
        checkout.cart.add_item(find_product(4).unwrap());
        checkout.cart.set_quantity(4, 0);
        assert!(checkout.cart.is_empty());

        checkout.cart.add_item(find_product(4).unwrap());
        let order = checkout.begin_submit().unwrap();
        assert_eq!(order.shipping_cost, 0);
        assert_eq!(order.total, 3399);
    }
}
