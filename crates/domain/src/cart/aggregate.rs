//! Cart aggregate implementation.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::{CartId, CartItemId, UserRef};
use order_store::{CartItemRecord, CartRecord, Version};

use crate::order::{Money, OrderLine, UnknownStatus};

use super::CartError;

/// Lifecycle of a cart. A cart is closed exactly once and never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CartStatus {
    #[default]
    Open,
    CheckedOut,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Open => "OPEN",
            CartStatus::CheckedOut => "CHECKED_OUT",
        }
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CartStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(CartStatus::Open),
            "CHECKED_OUT" => Ok(CartStatus::CheckedOut),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// A line in a cart. The unit price is captured when the product is
/// first added and is not re-priced later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_ref: String,
    pub quantity: i32,
    pub unit_price: Money,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cart aggregate root.
#[derive(Debug, Clone)]
pub struct Cart {
    id: CartId,
    user_ref: UserRef,
    status: CartStatus,
    items: Vec<CartItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: Version,
}

impl Cart {
    /// Creates a new open, empty cart that has not been stored yet.
    pub fn new(user_ref: UserRef) -> Self {
        let now = Utc::now();
        Self {
            id: CartId::new(),
            user_ref,
            status: CartStatus::Open,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
            version: Version::initial(),
        }
    }
}

// Query methods
impl Cart {
    pub fn id(&self) -> CartId {
        self.id
    }

    pub fn user_ref(&self) -> &UserRef {
        &self.user_ref
    }

    pub fn status(&self) -> CartStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == CartStatus::Open
    }

    /// Returns the items in insertion order.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn item(&self, item_id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn is_owned_by(&self, user: &UserRef) -> bool {
        &self.user_ref == user
    }

    /// Sums quantity times unit price over all items, in cents.
    pub fn total(&self) -> Result<Money, CartError> {
        self.items.iter().try_fold(Money::zero(), |total, item| {
            item.unit_price
                .checked_mul(item.quantity)
                .and_then(|line| total.checked_add(line))
                .ok_or(CartError::TotalOverflow)
        })
    }

    /// Returns the currency shared by all items.
    pub fn currency(&self) -> Result<&str, CartError> {
        let first = self
            .items
            .first()
            .ok_or(CartError::Empty { cart_id: self.id })?;
        if let Some(other) = self.items.iter().find(|i| i.currency != first.currency) {
            return Err(CartError::MixedCurrency {
                expected: first.currency.clone(),
                found: other.currency.clone(),
            });
        }
        Ok(&first.currency)
    }

    /// Copies the items into order lines.
    pub fn to_order_lines(&self) -> Vec<OrderLine> {
        self.items
            .iter()
            .map(|item| OrderLine {
                product_ref: item.product_ref.clone(),
                product_name: None,
                quantity: item.quantity,
                unit_price: item.unit_price,
                currency: item.currency.clone(),
            })
            .collect()
    }
}

// Mutations
impl Cart {
    /// Fails with `Closed` unless the cart is open.
    pub fn ensure_open(&self) -> Result<(), CartError> {
        if !self.is_open() {
            return Err(CartError::Closed { cart_id: self.id });
        }
        Ok(())
    }

    /// Fails with `Empty` if the cart has no items.
    pub fn ensure_not_empty(&self) -> Result<(), CartError> {
        if self.is_empty() {
            return Err(CartError::Empty { cart_id: self.id });
        }
        Ok(())
    }

    /// Adds a product to the cart.
    ///
    /// Adding a product that is already in the cart increases the quantity
    /// of the existing line and keeps its original unit price.
    pub fn add_item(
        &mut self,
        product_ref: &str,
        quantity: i32,
        unit_price: Money,
        currency: &str,
    ) -> Result<CartItemId, CartError> {
        self.ensure_open()?;
        if quantity < 1 {
            return Err(CartError::InvalidQuantity { quantity });
        }
        if unit_price.is_negative() {
            return Err(CartError::InvalidPrice {
                cents: unit_price.cents(),
            });
        }
        if let Some(first) = self.items.first()
            && first.currency != currency
        {
            return Err(CartError::MixedCurrency {
                expected: first.currency.clone(),
                found: currency.to_string(),
            });
        }

        let now = Utc::now();
        let id = match self.items.iter_mut().find(|i| i.product_ref == product_ref) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(quantity)
                    .ok_or(CartError::TotalOverflow)?;
                existing.updated_at = now;
                existing.id
            }
            None => {
                let item = CartItem {
                    id: CartItemId::new(),
                    product_ref: product_ref.to_string(),
                    quantity,
                    unit_price,
                    currency: currency.to_string(),
                    created_at: now,
                    updated_at: now,
                };
                let id = item.id;
                self.items.push(item);
                id
            }
        };
        self.updated_at = now;
        Ok(id)
    }

    /// Sets the quantity of an item.
    pub fn update_item_quantity(
        &mut self,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<(), CartError> {
        self.ensure_open()?;
        if quantity < 1 {
            return Err(CartError::InvalidQuantity { quantity });
        }

        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(CartError::ItemNotFound { item_id })?;

        let now = Utc::now();
        item.quantity = quantity;
        item.updated_at = now;
        self.updated_at = now;
        Ok(())
    }

    /// Removes an item and returns it.
    pub fn remove_item(&mut self, item_id: CartItemId) -> Result<CartItem, CartError> {
        self.ensure_open()?;
        let position = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or(CartError::ItemNotFound { item_id })?;

        self.updated_at = Utc::now();
        Ok(self.items.remove(position))
    }

    /// Removes every item.
    pub fn clear(&mut self) -> Result<(), CartError> {
        self.ensure_open()?;
        self.items.clear();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Checks the cart out. One-way: a closed cart cannot be closed again.
    pub fn close(&mut self) -> Result<(), CartError> {
        self.ensure_open()?;
        self.status = CartStatus::CheckedOut;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.version = self.version.next();
    }
}

// Conversions
impl Cart {
    /// Converts the cart to its stored form at the version it was loaded at.
    pub fn to_record(&self) -> CartRecord {
        CartRecord {
            id: self.id,
            user_ref: self.user_ref.clone(),
            status: self.status.as_str().to_string(),
            items: self
                .items
                .iter()
                .map(|item| CartItemRecord {
                    id: item.id,
                    product_ref: item.product_ref.clone(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                    currency: item.currency.clone(),
                    created_at: item.created_at,
                    updated_at: item.updated_at,
                })
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        }
    }
}

impl TryFrom<CartRecord> for Cart {
    type Error = UnknownStatus;

    fn try_from(record: CartRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            user_ref: record.user_ref,
            status: record.status.parse()?,
            items: record
                .items
                .into_iter()
                .map(|item| CartItem {
                    id: item.id,
                    product_ref: item.product_ref,
                    quantity: item.quantity,
                    unit_price: Money::from_cents(item.unit_price_cents),
                    currency: item.currency,
                    created_at: item.created_at,
                    updated_at: item.updated_at,
                })
                .collect(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
        })
    }
}
