use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use log::{debug, info};

use crate::error::CartError;
use crate::models::{Order, Product, ProductPayload};

/// The store as shared between actix workers.
pub type SharedStore = Mutex<CartStore>;

pub fn acquire(store: &SharedStore) -> Result<MutexGuard<'_, CartStore>, CartError> {
    store.lock().map_err(|_| CartError::StoreUnavailable)
}

/// Process-wide checkout state: the live cart, every order placed so far and
/// the counter used for products posted without an id.
#[derive(Debug)]
pub struct CartStore {
    cart: Vec<Product>,
    orders: Vec<Order>,
    next_id: u64,
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CartStore {
    pub fn new() -> Self {
        CartStore {
            cart: Vec::new(),
            orders: Vec::new(),
            next_id: 1,
        }
    }

    /// Normalizes the payload and stores it, replacing an entry with the same
    /// id in place or appending otherwise.
    pub fn upsert(&mut self, payload: ProductPayload) -> Product {
        let next_id = &mut self.next_id;
        let product = Product::normalize(payload, || {
            let id = *next_id;
            *next_id += 1;
            id
        });

        let key = product.id.key();
        match self.cart.iter_mut().find(|p| p.id.matches(&key)) {
            Some(slot) => {
                info!("replaced product {} ({})", key, product.name);
                *slot = product.clone();
            }
            None => {
                info!("added product {} ({})", key, product.name);
                self.cart.push(product.clone());
            }
        }
        product
    }

    pub fn products(&self) -> &[Product] {
        debug!("listing {} cart products", self.cart.len());
        &self.cart
    }

    pub fn product(&self, id: &str) -> Result<&Product, CartError> {
        debug!("looking up product {}", id);
        self.cart
            .iter()
            .find(|p| p.id.matches(id))
            .ok_or(CartError::NotFound)
    }

    /// Removes every entry with the given id and reports how many went.
    pub fn remove(&mut self, id: &str) -> usize {
        let before = self.cart.len();
        self.cart.retain(|p| !p.id.matches(id));
        let removed = before - self.cart.len();
        info!("removed {} entries for product {}", removed, id);
        removed
    }

    pub fn update(&mut self, id: &str, patch: ProductPayload) -> Result<Product, CartError> {
        let slot = self
            .cart
            .iter_mut()
            .find(|p| p.id.matches(id))
            .ok_or(CartError::NotFound)?;

        *slot = slot.merge(patch);
        info!("updated product {} ({})", id, slot.name);
        Ok(slot.clone())
    }

    /// Freezes the cart into a new order and empties it.
    pub fn checkout(&mut self) -> Order {
        let products = std::mem::take(&mut self.cart);
        let order = Order::new(self.orders.len() as u64 + 1, Utc::now(), products);
        info!(
            "order {} placed: {} products, total {}",
            order.id,
            order.products.len(),
            order.total
        );
        self.orders.push(order.clone());
        order
    }

    pub fn orders(&self) -> &[Order] {
        debug!("listing {} orders", self.orders.len());
        &self.orders
    }

    pub fn clear(&mut self) {
        info!("cleared cart of {} products", self.cart.len());
        self.cart.clear();
    }
}
