//! Kit shop cart: line items and derived pricing.
//!
//! Totals are always recomputed from the items; nothing is cached.

use serde::{Deserialize, Serialize};

use crate::catalog::{Product, ProductId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOption {
    #[default]
    Delivery,
    Pickup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub name: String,
    #[serde(rename = "price")]
    pub unit_price: u64,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> u64 {
        self.unit_price * u64::from(self.quantity)
    }
}

/// Free-shipping threshold and the flat fee charged below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    pub free_threshold: u64,
    pub flat_fee: u64,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            free_threshold: 1000,
            flat_fee: 99,
        }
    }
}

impl ShippingPolicy {
    pub fn shipping_for(&self, subtotal: u64, delivery: DeliveryOption) -> u64 {
        match delivery {
            DeliveryOption::Pickup => 0,
            DeliveryOption::Delivery if subtotal >= self.free_threshold => 0,
            DeliveryOption::Delivery => self.flat_fee,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: u64,
    pub shipping_cost: u64,
    pub total: u64,
}

pub fn compute_totals(items: &[CartItem], delivery: DeliveryOption, policy: &ShippingPolicy) -> Totals {
    let subtotal = items.iter().map(CartItem::line_total).sum();
    let shipping_cost = policy.shipping_for(subtotal, delivery);
    Totals {
        subtotal,
        shipping_cost,
        total: subtotal + shipping_cost,
    }
}

/// Ordered line items, at most one per product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units, as shown on the cart badge.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    pub fn quantity_of(&self, id: ProductId) -> u32 {
        self.items
            .iter()
            .find(|i| i.product_id == id)
            .map_or(0, |i| i.quantity)
    }

    /// Add one unit of `product`, merging with an existing line.
    pub fn add_item(&mut self, product: &Product) {
        match self.items.iter_mut().find(|i| i.product_id == product.id) {
            Some(item) => item.quantity = item.quantity.saturating_add(1),
            None => self.items.push(CartItem {
                product_id: product.id,
                name: product.name.to_string(),
                unit_price: product.price,
                quantity: 1,
            }),
        }
    }

    /// Set an exact quantity. Zero or less removes the line; unknown ids are
    /// ignored.
    pub fn set_quantity(&mut self, id: ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(id);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == id) {
            item.quantity = quantity;
        }
    }

    pub fn remove_item(&mut self, id: ProductId) {
        self.items.retain(|i| i.product_id != id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn totals(&self, delivery: DeliveryOption, policy: &ShippingPolicy) -> Totals {
        compute_totals(&self.items, delivery, policy)
    }

    /// How much more the customer has to add before delivery becomes free.
    pub fn amount_until_free_shipping(&self, policy: &ShippingPolicy) -> u64 {
        let subtotal: u64 = self.items.iter().map(CartItem::line_total).sum();
        policy.free_threshold.saturating_sub(subtotal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{find_product, PRODUCTS};

    fn product(id: ProductId) -> &'static Product {
        find_product(id).unwrap()
    }

    fn custom_item(price: u64, quantity: u32) -> CartItem {
        CartItem {
            product_id: 100,
            name: "Test part".into(),
            unit_price: price,
            quantity,
        }
    }

    #[test]
    fn adding_twice_merges_into_one_line() {
        let mut cart = Cart::new();
        cart.add_item(product(1));
        cart.add_item(product(1));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn lines_keep_insertion_order() {
        let mut cart = Cart::new();
        cart.add_item(product(3));
        cart.add_item(product(1));
        cart.add_item(product(3));
        let ids: Vec<_> = cart.items().iter().map(|i| i.product_id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn non_positive_quantity_removes_the_line() {
        let mut cart = Cart::new();
        cart.add_item(product(1));
        cart.add_item(product(2));

        cart.set_quantity(1, 0);
        assert_eq!(cart.quantity_of(1), 0);
        cart.set_quantity(2, -3);
        assert!(cart.is_empty());
    }

    #[test]
    fn set_quantity_is_exact_not_additive() {
        let mut cart = Cart::new();
        cart.add_item(product(4));
        cart.set_quantity(4, 5);
        cart.set_quantity(4, 3);
        assert_eq!(cart.quantity_of(4), 3);

        // Setting a quantity never creates a line.
        cart.set_quantity(5, 2);
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn remove_absent_item_is_a_no_op() {
        let mut cart = Cart::new();
        cart.add_item(product(1));
        cart.remove_item(6);
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn pricing_examples() {
        let policy = ShippingPolicy::default();

        let kit = [custom_item(4199, 1)];
        let t = compute_totals(&kit, DeliveryOption::Delivery, &policy);
        assert_eq!((t.subtotal, t.shipping_cost, t.total), (4199, 0, 4199));

        let small = [custom_item(500, 1)];
        let t = compute_totals(&small, DeliveryOption::Delivery, &policy);
        assert_eq!((t.subtotal, t.shipping_cost, t.total), (500, 99, 599));

        let t = compute_totals(&small, DeliveryOption::Pickup, &policy);
        assert_eq!((t.subtotal, t.shipping_cost, t.total), (500, 0, 500));
    }

    #[test]
    fn threshold_is_inclusive() {
        let policy = ShippingPolicy::default();
        let t = compute_totals(&[custom_item(1000, 1)], DeliveryOption::Delivery, &policy);
        assert_eq!(t.shipping_cost, 0);
        let t = compute_totals(&[custom_item(999, 1)], DeliveryOption::Delivery, &policy);
        assert_eq!(t.shipping_cost, 99);
        let t = compute_totals(&[], DeliveryOption::Delivery, &policy);
        assert_eq!((t.subtotal, t.total), (0, 99));
    }

    #[test]
    fn totals_track_every_mutation() {
        let policy = ShippingPolicy::default();
        let mut cart = Cart::new();

        // Interleave adds, quantity changes and removals; after each step the
        // derived subtotal must match a from-scratch sum.
        for (round, p) in PRODUCTS.iter().cycle().take(24).enumerate() {
            match round % 4 {
                0 | 1 => cart.add_item(p),
                2 => cart.set_quantity(p.id, (round % 5) as i64),
                _ => cart.remove_item(p.id),
            }
            let sum: u64 = cart.items().iter().map(|i| i.unit_price * u64::from(i.quantity)).sum();
            let totals = cart.totals(DeliveryOption::Delivery, &policy);
            assert_eq!(totals.subtotal, sum);
            assert_eq!(totals.total, totals.subtotal + totals.shipping_cost);
            assert!(cart.items().iter().all(|i| i.quantity >= 1));
        }
    }

    #[test]
    fn free_shipping_hint() {
        let policy = ShippingPolicy::default();
        let mut cart = Cart::new();
        assert_eq!(cart.amount_until_free_shipping(&policy), 1000);
        cart.add_item(product(1));
        assert_eq!(cart.amount_until_free_shipping(&policy), 0);
    }

    #[test]
    fn maximum_quantities_do_not_overflow_counts() {
        let mut cart = Cart::new();
        for id in [1, 2] {
            cart.add_item(product(id));
            cart.set_quantity(id, i64::from(u32::MAX));
        }
        cart.add_item(product(1));

        assert_eq!(cart.quantity_of(1), u32::MAX);
        assert_eq!(cart.item_count(), 2 * u64::from(u32::MAX));
        let totals = cart.totals(DeliveryOption::Pickup, &ShippingPolicy::default());
        assert_eq!(totals.subtotal, (4199 + 7599) * u64::from(u32::MAX));
    }
}
