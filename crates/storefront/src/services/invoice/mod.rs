//! Invoice rendering.
//!
//! An invoice is derived from a stored order on request. The PDF is built
//! once, written to `<invoice_dir>/invoice-<id>.pdf`, and the same bytes are
//! returned for the response.

mod pdf;

use std::path::PathBuf;

use thiserror::Error;
use tracing::instrument;

use bazaar_core::{CurrencyCode, OrderId, Price, UserId};

use super::ShopError;
use super::orders::OrderService;
use crate::models::Order;

pub use pdf::render_pdf;

#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("failed to build PDF: {0}")]
    Pdf(String),

    #[error("failed to write invoice: {0}")]
    Io(#[from] std::io::Error),
}

/// How a line of the invoice is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    /// Large and underlined.
    Title,
    Body,
    Total,
}

impl LineStyle {
    #[must_use]
    pub const fn font_size(self) -> i64 {
        match self {
            Self::Title => 26,
            Self::Body => 14,
            Self::Total => 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceLine {
    pub text: String,
    pub style: LineStyle,
}

impl InvoiceLine {
    fn new(text: impl Into<String>, style: LineStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

const SEPARATOR: &str = "-----------------------";

/// The text of an invoice, top to bottom.
#[must_use]
pub fn invoice_lines(order: &Order, currency: CurrencyCode) -> Vec<InvoiceLine> {
    let mut lines = vec![
        InvoiceLine::new("Invoice", LineStyle::Title),
        InvoiceLine::new(SEPARATOR, LineStyle::Body),
    ];

    for line in &order.lines {
        let unit = Price::new(line.product.price, currency);
        lines.push(InvoiceLine::new(
            format!("{} - {} x {unit}", line.product.title, line.quantity),
            LineStyle::Body,
        ));
    }

    lines.push(InvoiceLine::new("---", LineStyle::Body));
    lines.push(InvoiceLine::new(
        format!("Total Price: {}", Price::new(order.total(), currency)),
        LineStyle::Total,
    ));
    lines
}

/// File name used on disk and in `Content-Disposition`.
#[must_use]
pub fn invoice_file_name(id: OrderId) -> String {
    format!("invoice-{id}.pdf")
}

/// A rendered invoice.
#[derive(Debug, Clone)]
pub struct Invoice {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct InvoiceService {
    orders: OrderService,
    dir: PathBuf,
    currency: CurrencyCode,
}

impl InvoiceService {
    #[must_use]
    pub const fn new(orders: OrderService, dir: PathBuf, currency: CurrencyCode) -> Self {
        Self {
            orders,
            dir,
            currency,
        }
    }

    /// Render the invoice for `order_id` if `user_id` placed it.
    ///
    /// The file on disk is fully written before this returns.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::OrderNotFound`, `ShopError::NotOrderOwner`, or
    /// `ShopError::Invoice` when the PDF cannot be built or saved.
    #[instrument(skip(self))]
    pub async fn render_invoice(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Invoice, ShopError> {
        let order = self.orders.get_owned_order(order_id, user_id).await?;

        let bytes = render_pdf(&invoice_lines(&order, self.currency))?;
        let file_name = invoice_file_name(order.id);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(InvoiceError::from)?;
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(InvoiceError::from)?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "Invoice written");
        Ok(Invoice { file_name, bytes })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::services::cart::CartService;

    async fn setup(dir: PathBuf) -> (MemoryStore, InvoiceService, OrderService, UserId) {
        let store = MemoryStore::new();
        let x = store.insert_product("X", Decimal::from(10)).await;
        let y = store.insert_product("Y", Decimal::from(5)).await;
        let user = store.insert_user("buyer@example.com").await.id;
        let cart = CartService::new(Arc::new(store.clone()), Arc::new(store.clone()));
        let orders = OrderService::new(
            cart.clone(),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        );
        cart.add_to_cart(user, x.id).await.expect("add");
        cart.add_to_cart(user, x.id).await.expect("add");
        cart.add_to_cart(user, y.id).await.expect("add");
        let invoices = InvoiceService::new(orders.clone(), dir, CurrencyCode::USD);
        (store, invoices, orders, user)
    }

    #[tokio::test]
    async fn test_lines_and_total() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let (_, _, orders, user) = setup(tmp.path().to_path_buf()).await;
        let order = orders.finalize_order(user).await.expect("order");

        let texts: Vec<String> = invoice_lines(&order, CurrencyCode::USD)
            .into_iter()
            .map(|l| l.text)
            .collect();
        assert_eq!(
            texts,
            [
                "Invoice",
                SEPARATOR,
                "X - 2 x $10.00",
                "Y - 1 x $5.00",
                "---",
                "Total Price: $25.00",
            ]
        );
    }

    #[tokio::test]
    async fn test_render_writes_file_and_returns_same_bytes() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = tmp.path().join("invoices");
        let (_, invoices, orders, user) = setup(dir.clone()).await;
        let order = orders.finalize_order(user).await.expect("order");

        let invoice = invoices
            .render_invoice(order.id, user)
            .await
            .expect("invoice");
        assert_eq!(invoice.file_name, format!("invoice-{}.pdf", order.id));
        assert!(invoice.bytes.starts_with(b"%PDF-"));

        let on_disk = std::fs::read(dir.join(&invoice.file_name)).expect("file");
        assert_eq!(on_disk, invoice.bytes);
    }

    #[tokio::test]
    async fn test_same_order_same_text() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let (_, invoices, orders, user) = setup(tmp.path().to_path_buf()).await;
        let order = orders.finalize_order(user).await.expect("order");

        let a = invoices.render_invoice(order.id, user).await.expect("a");
        let b = invoices.render_invoice(order.id, user).await.expect("b");
        assert_eq!(a.bytes, b.bytes);
    }

    #[tokio::test]
    async fn test_access_checks() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let (store, invoices, orders, user) = setup(tmp.path().to_path_buf()).await;
        let order = orders.finalize_order(user).await.expect("order");
        let stranger = store.insert_user("stranger@example.com").await.id;

        let err = invoices
            .render_invoice(order.id, stranger)
            .await
            .expect_err("forbidden");
        assert!(matches!(err, ShopError::NotOrderOwner { .. }));

        let err = invoices
            .render_invoice(OrderId::new(1234), user)
            .await
            .expect_err("missing");
        assert!(matches!(err, ShopError::OrderNotFound(_)));

        assert!(!tmp.path().join("invoice-1234.pdf").exists());
    }
}
