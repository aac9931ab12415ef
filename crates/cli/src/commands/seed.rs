//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! - title: Stoneware Mug
//!   price: "12.50"
//!   description: Holds 350 ml.
//!   image_url: https://images.example/mug.jpg
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use bazaar_storefront::db::{ProductRepository, create_pool};

use super::migrate::database_url;

/// One product entry in the seed file.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub title: String,
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
}

/// Check entries before touching the database.
///
/// Returns one message per invalid entry.
#[must_use]
pub fn validate(products: &[SeedProduct]) -> Vec<String> {
    let mut errors = Vec::new();
    for (i, product) in products.iter().enumerate() {
        if product.title.trim().is_empty() {
            errors.push(format!("entry {i}: title is empty"));
        }
        if product.price.is_sign_negative() {
            errors.push(format!("entry {i} ({}): price is negative", product.title));
        }
    }
    errors
}

/// Insert every product listed in `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, an entry is
/// invalid, or an insert fails.
pub async fn products(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(path).await?;
    let products: Vec<SeedProduct> = serde_yaml::from_str(&content)?;

    let errors = validate(&products);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = create_pool(&database_url()?).await?;
    let repo = ProductRepository::new(pool);

    for product in &products {
        let created = repo
            .insert(
                &product.title,
                product.price,
                &product.description,
                &product.image_url,
            )
            .await?;
        info!(id = %created.id, title = %created.title, "Inserted product");
    }

    info!(count = products.len(), "Seeding complete");
    Ok(())
}
