//! Cart Engine: the pending sale, bounded by live stock.

use crate::catalog::Catalog;
use crate::error::ShopError;
use crate::types::{CartEntry, Money, ProductId};

/// Outcome of a cart mutation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CartChange {
    /// Nothing changed (unknown product, zero delta, same quantity)
    Unchanged,
    /// Entry created or updated to this quantity
    Upserted(u32),
    /// Entry removed
    Removed,
}

/// Pending-sale lines in the order they were first added
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cart {
    entries: Vec<CartEntry>,
}

impl Cart {
    /// Creates an empty cart
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Changes a product's quantity by `delta`
    ///
    /// A zero delta is a no-op. A result at or below zero removes the entry.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::StockLimit`] when the new quantity exceeds the
    /// product's stock; the cart is left untouched.
    pub fn update(
        &mut self,
        catalog: &Catalog,
        id: ProductId,
        delta: i64,
    ) -> Result<CartChange, ShopError> {
        if delta == 0 {
            return Ok(CartChange::Unchanged);
        }
        let target = i64::from(self.quantity(id)).saturating_add(delta);
        self.set_quantity(catalog, id, target)
    }

    /// Sets a product's quantity
    ///
    /// A quantity at or below zero removes the entry.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::StockLimit`] when `quantity` exceeds the
    /// product's stock; the cart is left untouched.
    pub fn set_quantity(
        &mut self,
        catalog: &Catalog,
        id: ProductId,
        quantity: i64,
    ) -> Result<CartChange, ShopError> {
        let Some(product) = catalog.get(id) else {
            return Ok(CartChange::Unchanged);
        };

        if quantity > i64::from(product.stock) {
            return Err(ShopError::StockLimit {
                title: product.title.clone(),
                available: product.stock,
            });
        }

        let position = self.entries.iter().position(|e| e.product_id == id);

        // Zero and negative targets remove the entry
        let Ok(quantity @ 1..) = u32::try_from(quantity) else {
            return Ok(match position {
                Some(index) => {
                    self.entries.remove(index);
                    CartChange::Removed
                },
                None => CartChange::Unchanged,
            });
        };

        match position {
            Some(index) if self.entries[index].quantity == quantity => Ok(CartChange::Unchanged),
            Some(index) => {
                self.entries[index].quantity = quantity;
                Ok(CartChange::Upserted(quantity))
            },
            None => {
                self.entries.push(CartEntry {
                    product_id: id,
                    quantity,
                    subtype: product.subtype,
                });
                Ok(CartChange::Upserted(quantity))
            },
        }
    }

    /// Current quantity for a product, 0 if absent
    #[must_use]
    pub fn quantity(&self, id: ProductId) -> u32 {
        self.entries
            .iter()
            .find(|e| e.product_id == id)
            .map_or(0, |e| e.quantity)
    }

    /// Drops a product's entry; returns whether one existed
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.product_id != id);
        self.entries.len() != before
    }

    /// Empties the cart
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Sum of `quantity * price` using live catalog prices
    ///
    /// Entries whose product no longer exists count as price 0.
    #[must_use]
    pub fn total_cost(&self, catalog: &Catalog) -> Money {
        self.entries
            .iter()
            .map(|entry| {
                catalog
                    .get(entry.product_id)
                    .map_or(Money::ZERO, |p| p.price.times(entry.quantity))
            })
            .sum()
    }

    /// Sum of quantities
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.entries
            .iter()
            .fold(0, |sum, e| sum.saturating_add(e.quantity))
    }

    /// Entries in the order they were first added
    #[must_use]
    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    /// Number of distinct products in the cart
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the cart is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
