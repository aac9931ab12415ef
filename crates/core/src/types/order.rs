//! Order line snapshots and totals.
//!
//! An order copies the product fields it needs at checkout time. Nothing in
//! an [`OrderLine`] points back at a live product row, so later edits to the
//! catalog never change a placed order or its invoice.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Product fields frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Id the product had when ordered. Informational only.
    pub product_id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub description: String,
    pub image_url: String,
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub quantity: u32,
    pub product: ProductSnapshot,
}

impl OrderLine {
    /// `quantity * price`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// `Σ quantity_i * price_i` over the lines.
#[must_use]
pub fn order_total(lines: &[OrderLine]) -> Decimal {
    lines.iter().map(OrderLine::line_total).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i32, title: &str, quantity: u32, price: i64) -> OrderLine {
        OrderLine {
            quantity,
            product: ProductSnapshot {
                product_id: ProductId::new(id),
                title: title.to_owned(),
                price: Decimal::from(price),
                description: String::new(),
                image_url: String::new(),
            },
        }
    }

    #[test]
    fn test_order_total() {
        let lines = vec![line(1, "X", 2, 10), line(2, "Y", 1, 5)];
        assert_eq!(order_total(&lines), Decimal::from(25));
    }

    #[test]
    fn test_empty_order_total_is_zero() {
        assert_eq!(order_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_fractional_prices() {
        let mut l = line(1, "Tea", 3, 0);
        l.product.price = Decimal::new(1999, 2);
        assert_eq!(l.line_total(), Decimal::new(5997, 2));
    }
}
