//! Catalog product.

use bazaar_core::{CurrencyCode, Price, ProductId, ProductSnapshot};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product as currently listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    /// Unit price in the shop currency.
    pub price: Decimal,
    pub description: String,
    pub image_url: String,
}

impl Product {
    /// Price tagged with the shop currency.
    #[must_use]
    pub const fn price_in(&self, currency: CurrencyCode) -> Price {
        Price::new(self.price, currency)
    }

    /// Copy the fields an order keeps.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            product_id: self.id,
            title: self.title.clone(),
            price: self.price,
            description: self.description.clone(),
            image_url: self.image_url.clone(),
        }
    }
}
