//! Shopping cart owned by a user.
//!
//! The cart is an ordered list of `(product, quantity)` entries with at most
//! one entry per product. It is a plain value: the storefront loads it,
//! mutates it here, and writes the whole list back.

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// One product in a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub product_id: ProductId,
    /// Always at least 1; entries at zero are removed.
    pub quantity: u32,
}

/// A user's in-progress selection of products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    entries: Vec<CartEntry>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a cart from stored entries.
    ///
    /// Duplicate products are merged into the first occurrence and
    /// zero-quantity entries are dropped.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = CartEntry>) -> Self {
        let mut cart = Self::new();
        for entry in entries {
            cart.add_quantity(entry.product_id, entry.quantity);
        }
        cart
    }

    /// Add one unit of a product: increments an existing entry or appends a new one.
    pub fn add(&mut self, product_id: ProductId) {
        self.add_quantity(product_id, 1);
    }

    /// Add `quantity` units of a product. Adding zero is a no-op.
    pub fn add_quantity(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.entries.iter_mut().find(|e| e.product_id == product_id) {
            Some(entry) => entry.quantity = entry.quantity.saturating_add(quantity),
            None => self.entries.push(CartEntry {
                product_id,
                quantity,
            }),
        }
    }

    /// Set the quantity of a product. Zero removes the entry.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove(product_id);
            return;
        }
        match self.entries.iter_mut().find(|e| e.product_id == product_id) {
            Some(entry) => entry.quantity = quantity,
            None => self.entries.push(CartEntry {
                product_id,
                quantity,
            }),
        }
    }

    /// Remove a product's entry. Returns `false` if it was not in the cart.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.product_id != product_id);
        self.entries.len() != before
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    /// Quantity held for a product (0 if absent).
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.entries
            .iter()
            .find(|e| e.product_id == product_id)
            .map_or(0, |e| e.quantity)
    }

    /// Product ids in cart order.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.entries.iter().map(|e| e.product_id).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of units across all entries.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.entries
            .iter()
            .fold(0u32, |acc, e| acc.saturating_add(e.quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const X: ProductId = ProductId::new(1);
    const Y: ProductId = ProductId::new(2);

    #[test]
    fn test_adding_twice_increments_single_entry() {
        let mut cart = Cart::new();
        cart.add(X);
        cart.add(X);

        assert_eq!(cart.entries().len(), 1);
        assert_eq!(cart.quantity_of(X), 2);
    }

    #[test]
    fn test_remove_empties_cart() {
        let mut cart = Cart::new();
        cart.add(X);
        cart.add(X);

        assert!(cart.remove(X));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        cart.add(Y);

        assert!(!cart.remove(X));
        assert_eq!(cart.entries(), &[CartEntry { product_id: Y, quantity: 1 }]);
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut cart = Cart::new();
        cart.add(Y);
        cart.add(X);
        cart.add(Y);

        assert_eq!(cart.product_ids(), vec![Y, X]);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::new();
        cart.add(X);
        cart.set_quantity(X, 5);
        assert_eq!(cart.quantity_of(X), 5);

        cart.set_quantity(X, 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_from_entries_merges_duplicates_and_drops_zero() {
        let cart = Cart::from_entries([
            CartEntry { product_id: X, quantity: 1 },
            CartEntry { product_id: Y, quantity: 0 },
            CartEntry { product_id: X, quantity: 2 },
        ]);

        assert_eq!(cart.entries(), &[CartEntry { product_id: X, quantity: 3 }]);
    }
}
