//! Cart service.

use common::{CartId, CartItemId, UserRef};
use order_store::{OrderStore, OrderStoreExt};

use crate::error::DomainError;
use crate::order::Money;

use super::Cart;

/// Currency used when an item does not name one.
const DEFAULT_CURRENCY: &str = "USD";

/// A product to put in a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
    pub product_ref: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub currency: String,
}

impl NewCartItem {
    /// Creates an item priced in the default currency.
    pub fn new(product_ref: impl Into<String>, quantity: i32, unit_price_cents: i64) -> Self {
        Self {
            product_ref: product_ref.into(),
            quantity,
            unit_price_cents,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }
}

/// Service for managing shopping carts.
///
/// Every operation except [`CartService::get_or_create_active_cart`] names
/// the requesting user and fails with `Unauthorized` if it does not own
/// the cart.
pub struct CartService<S: OrderStore> {
    store: S,
}

impl<S: OrderStore> CartService<S> {
    /// Creates a new cart service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's open cart, creating one if none exists.
    ///
    /// Lookup and insert are not atomic: two concurrent first calls for the
    /// same user can both create a cart. Later lookups return the oldest.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_create_active_cart(&self, user: &UserRef) -> Result<Cart, DomainError> {
        if user.is_blank() {
            return Err(DomainError::InvalidArgument(
                "user reference is required".to_string(),
            ));
        }

        if let Some(record) = self.store.find_open_cart(user).await? {
            return Ok(Cart::try_from(record)?);
        }

        let mut cart = Cart::new(user.clone());
        self.store.save_cart(cart.to_record()).await?;
        cart.mark_persisted();

        tracing::info!(cart_id = %cart.id(), "Cart created");
        metrics::counter!("carts_created_total").increment(1);
        Ok(cart)
    }

    /// Loads a cart owned by `user`.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, cart_id: CartId, user: &UserRef) -> Result<Cart, DomainError> {
        self.load_owned(cart_id, user).await
    }

    /// Adds a product to a cart, merging with an existing line for the
    /// same product.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_id: CartId,
        user: &UserRef,
        item: NewCartItem,
    ) -> Result<Cart, DomainError> {
        if item.product_ref.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "product reference is required".to_string(),
            ));
        }

        let mut cart = self.load_owned(cart_id, user).await?;
        let item_id = cart.add_item(
            &item.product_ref,
            item.quantity,
            Money::from_cents(item.unit_price_cents),
            &item.currency,
        )?;
        self.save(&mut cart).await?;

        tracing::info!(%cart_id, %item_id, product_ref = %item.product_ref, "Item added to cart");
        Ok(cart)
    }

    /// Sets the quantity of a cart item.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        item_id: CartItemId,
        user: &UserRef,
        quantity: i32,
    ) -> Result<Cart, DomainError> {
        let mut cart = self.load_by_item(item_id, user).await?;
        cart.update_item_quantity(item_id, quantity)?;
        self.save(&mut cart).await?;
        Ok(cart)
    }

    /// Removes an item from its cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, item_id: CartItemId, user: &UserRef) -> Result<Cart, DomainError> {
        let mut cart = self.load_by_item(item_id, user).await?;
        cart.remove_item(item_id)?;
        self.save(&mut cart).await?;
        Ok(cart)
    }

    /// Removes every item from a cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self, cart_id: CartId, user: &UserRef) -> Result<Cart, DomainError> {
        let mut cart = self.load_owned(cart_id, user).await?;
        cart.clear()?;
        self.save(&mut cart).await?;
        Ok(cart)
    }

    /// Closes a cart without creating an order.
    #[tracing::instrument(skip(self))]
    pub async fn close_cart(&self, cart_id: CartId, user: &UserRef) -> Result<Cart, DomainError> {
        let mut cart = self.load_owned(cart_id, user).await?;
        cart.close()?;
        self.save(&mut cart).await?;

        tracing::info!(%cart_id, "Cart closed");
        Ok(cart)
    }

    async fn load_owned(&self, cart_id: CartId, user: &UserRef) -> Result<Cart, DomainError> {
        let record = self
            .store
            .get_cart(cart_id)
            .await?
            .ok_or_else(|| DomainError::not_found("cart", cart_id))?;

        let cart = Cart::try_from(record)?;
        if !cart.is_owned_by(user) {
            return Err(DomainError::unauthorized(user, "cart", cart_id));
        }
        Ok(cart)
    }

    async fn load_by_item(&self, item_id: CartItemId, user: &UserRef) -> Result<Cart, DomainError> {
        let record = self
            .store
            .find_cart_by_item(item_id)
            .await?
            .ok_or_else(|| DomainError::not_found("cart item", item_id))?;

        let cart = Cart::try_from(record)?;
        if !cart.is_owned_by(user) {
            return Err(DomainError::unauthorized(user, "cart", cart.id()));
        }
        Ok(cart)
    }

    async fn save(&self, cart: &mut Cart) -> Result<(), DomainError> {
        self.store.save_cart(cart.to_record()).await?;
        cart.mark_persisted();
        Ok(())
    }
}
