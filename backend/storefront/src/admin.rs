//! Admin dashboard queries: filter, search and sort stored registrations
//! and orders.
//!
//! Documents are read back as raw JSON since the store enforces no schema;
//! records written by older front-ends may lack fields, which simply never
//! match a filter or search.

use std::cmp::Ordering;

use serde::Deserialize;
use serde_json::Value;

use crate::checkout::OrderStatus;
use crate::registration::RegistrationType;
use crate::store::{OrderBy, StoredDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Name,
}

impl SortOrder {
    /// Ordering to request from the store; `Name` is re-sorted afterwards.
    pub fn store_order(&self, timestamp_field: &'static str) -> OrderBy {
        match self {
            Self::Oldest => OrderBy::oldest(timestamp_field),
            Self::Newest | Self::Name => OrderBy::newest(timestamp_field),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationListQuery {
    #[serde(rename = "type")]
    pub registration_type: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

/// `None` and `"all"` disable the filter.
pub fn parse_type_filter(raw: Option<&str>) -> Result<Option<RegistrationType>, String> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(other) => RegistrationType::from_param(other)
            .map(Some)
            .ok_or_else(|| format!("Unknown registration type '{other}'")),
    }
}

pub fn parse_status_filter(raw: Option<&str>) -> Result<Option<OrderStatus>, String> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(other) => serde_json::from_value(Value::String(other.to_string()))
            .map(Some)
            .map_err(|_| format!("Unknown order status '{other}'")),
    }
}

fn field<'a>(body: &'a Value, key: &str) -> &'a str {
    body.get(key).and_then(Value::as_str).unwrap_or("")
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Case-insensitive name order, ties broken on the raw text.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn registration_name(body: &Value) -> &str {
    if field(body, "registrationType") == "individual" {
        field(body, "studentName")
    } else {
        field(body, "institutionName")
    }
}

fn customer_name(body: &Value) -> &str {
    body.get("customer").map_or("", |c| field(c, "fullName"))
}

/// Apply the dashboard's registration filters to documents already ordered
/// by the store.
pub fn filter_registrations(
    docs: Vec<StoredDocument>,
    registration_type: Option<RegistrationType>,
    search: Option<&str>,
    sort: SortOrder,
) -> Vec<StoredDocument> {
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut out: Vec<StoredDocument> = docs
        .into_iter()
        .filter(|d| match registration_type {
            Some(t) => field(&d.body, "registrationType") == t.as_str(),
            None => true,
        })
        .filter(|d| match &needle {
            Some(n) => ["studentName", "institutionName", "campName", "email"]
                .iter()
                .any(|k| contains_ci(field(&d.body, k), n)),
            None => true,
        })
        .collect();

    if sort == SortOrder::Name {
        out.sort_by(|a, b| compare_names(registration_name(&a.body), registration_name(&b.body)));
    }
    out
}

pub fn filter_orders(
    docs: Vec<StoredDocument>,
    status: Option<OrderStatus>,
    search: Option<&str>,
    sort: SortOrder,
) -> Vec<StoredDocument> {
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut out: Vec<StoredDocument> = docs
        .into_iter()
        .filter(|d| match status {
            // Orders without a status are shown as pending.
            Some(s) => {
                let stored = field(&d.body, "status");
                stored == s.as_str() || (stored.is_empty() && s == OrderStatus::Pending)
            }
            None => true,
        })
        .filter(|d| match &needle {
            Some(n) => {
                let customer = d.body.get("customer").cloned().unwrap_or(Value::Null);
                let customer_hit = ["fullName", "email", "phone"]
                    .iter()
                    .any(|k| contains_ci(field(&customer, k), n));
                let item_hit = d
                    .body
                    .get("items")
                    .and_then(Value::as_array)
                    .is_some_and(|items| items.iter().any(|i| contains_ci(field(i, "name"), n)));
                customer_hit || item_hit
            }
            None => true,
        })
        .collect();

    if sort == SortOrder::Name {
        out.sort_by(|a, b| compare_names(customer_name(&a.body), customer_name(&b.body)));
    }
    out
}
