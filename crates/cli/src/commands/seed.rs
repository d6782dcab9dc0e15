//! Seed the catalog from a YAML file.
//!
//! The file lists sizes, colors, customers, products with their variants,
//! and designs. Designs name their owner by e-mail; the owner must be listed
//! under `customers` in the same file.
//!
//! ```yaml
//! sizes: [S, M, L]
//! colors:
//!   - { name: Negro, hex: "#000000" }
//! customers:
//!   - { email: ana@example.com, name: Ana }
//! products:
//!   - name: Classic Tee
//!     base_price: "15.00"
//!     variants:
//!       - { size: M, color: Negro, stock: 10 }
//! designs:
//!   - { owner: ana@example.com, name: Logo, locations: [front] }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use stitchworks_core::{CustomerId, Email, Money, Role};
use stitchworks_orders::db::{CatalogWriter, RepositoryError};
use stitchworks_orders::models::{Customer, Design, VariantSnapshot};
use thiserror::Error;
use tracing::info;

use super::{CliResult, connect};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The catalog file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// The catalog file is not valid YAML for a catalog.
    #[error("Invalid catalog: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A design names an owner not listed under `customers`.
    #[error("Design {design} names unknown owner {owner}")]
    UnknownOwner { design: String, owner: Email },

    /// Storage rejected a row.
    #[error("Failed to insert {what}: {source}")]
    Repository {
        what: String,
        source: RepositoryError,
    },
}

// =============================================================================
// File format
// =============================================================================

/// Top-level catalog file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<ColorEntry>,
    #[serde(default)]
    pub customers: Vec<CustomerEntry>,
    #[serde(default)]
    pub products: Vec<ProductEntry>,
    #[serde(default)]
    pub designs: Vec<DesignEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColorEntry {
    pub name: String,
    pub hex: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerEntry {
    pub email: Email,
    pub name: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductEntry {
    pub name: String,
    pub base_price: Money,
    #[serde(default)]
    pub variants: Vec<VariantEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantEntry {
    pub size: String,
    pub color: String,
    pub stock: i32,
    #[serde(default)]
    pub extra_price: Money,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesignEntry {
    pub owner: Email,
    pub name: String,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub public: bool,
}

impl CatalogFile {
    /// Parse a catalog from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::Yaml`] if the text is not a valid catalog.
    pub fn parse(yaml: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// Everything a seeding run inserted.
#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    pub customers: Vec<Customer>,
    pub variants: Vec<VariantSnapshot>,
    pub designs: Vec<Design>,
}

impl SeedReport {
    /// ID of the seeded customer with `email`.
    #[must_use]
    pub fn customer_id(&self, email: &str) -> Option<CustomerId> {
        self.customers
            .iter()
            .find(|customer| customer.email.as_str() == email)
            .map(|customer| customer.id)
    }
}

// =============================================================================
// Seeding
// =============================================================================

fn repo(what: impl Into<String>) -> impl FnOnce(RepositoryError) -> SeedError {
    let what = what.into();
    move |source| SeedError::Repository { what, source }
}

/// Insert `catalog` through `writer`.
///
/// Rows are inserted in dependency order: sizes and colors, customers,
/// products with variants, then designs. Not transactional; a failure leaves
/// earlier rows in place.
///
/// # Errors
///
/// Returns [`SeedError::UnknownOwner`] for a design whose owner is not in the
/// file, or [`SeedError::Repository`] naming the row storage rejected.
pub async fn apply<W: CatalogWriter>(
    writer: &W,
    catalog: &CatalogFile,
) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    for size in &catalog.sizes {
        writer
            .register_size(size)
            .await
            .map_err(repo(format!("size {size}")))?;
    }
    for color in &catalog.colors {
        writer
            .register_color(&color.name, color.hex.as_deref())
            .await
            .map_err(repo(format!("color {}", color.name)))?;
    }

    let mut owners: HashMap<Email, CustomerId> = HashMap::new();
    for entry in &catalog.customers {
        let customer = writer
            .insert_customer(&entry.email, &entry.name, entry.role)
            .await
            .map_err(repo(format!("customer {}", entry.email)))?;
        owners.insert(customer.email.clone(), customer.id);
        report.customers.push(customer);
    }

    for entry in &catalog.products {
        let product = writer
            .insert_product(&entry.name, entry.base_price)
            .await
            .map_err(repo(format!("product {}", entry.name)))?;
        for variant in &entry.variants {
            let inserted = writer
                .insert_variant(
                    product.id,
                    &variant.size,
                    &variant.color,
                    variant.stock,
                    variant.extra_price,
                )
                .await
                .map_err(repo(format!(
                    "variant {} ({} / {})",
                    entry.name, variant.size, variant.color
                )))?;
            report.variants.push(inserted);
        }
    }

    for entry in &catalog.designs {
        let owner = *owners
            .get(&entry.owner)
            .ok_or_else(|| SeedError::UnknownOwner {
                design: entry.name.clone(),
                owner: entry.owner.clone(),
            })?;
        let design = writer
            .insert_design(owner, &entry.name, &entry.locations, entry.public)
            .await
            .map_err(repo(format!("design {}", entry.name)))?;
        report.designs.push(design);
    }

    Ok(report)
}

/// Seed the orders database from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, the database is
/// unreachable, or a row is rejected.
pub async fn from_file(file_path: &str) -> CliResult {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading catalog from file");

    // Validate before connecting
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Io {
            path: file_path.to_string(),
            source,
        })?;
    let catalog = CatalogFile::parse(&content)?;
    info!(
        products = catalog.products.len(),
        customers = catalog.customers.len(),
        "Parsed catalog"
    );

    let (_, database) = connect().await?;
    let report = apply(&database, &catalog).await?;

    info!("Seeding complete!");
    info!("  Customers inserted: {}", report.customers.len());
    info!("  Variants inserted: {}", report.variants.len());
    info!("  Designs inserted: {}", report.designs.len());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use stitchworks_orders::db::{Database, MemoryDatabase};

    use super::*;

    const BUNDLED: &str = include_str!("../../seed/catalog.yaml");

    #[test]
    fn test_bundled_catalog_parses() {
        let catalog = CatalogFile::parse(BUNDLED).unwrap();
        assert_eq!(catalog.sizes, ["S", "M", "L", "XL", "XXL"]);
        assert_eq!(catalog.colors.len(), 4);
        assert_eq!(catalog.customers[0].role, Role::Admin);
        assert_eq!(catalog.customers[1].role, Role::Customer);
        assert_eq!(
            catalog.products[1].variants[0].extra_price,
            "3.00".parse().unwrap()
        );
        assert_eq!(catalog.products[0].variants[0].extra_price, Money::ZERO);
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = CatalogFile::parse("sizes: [M]\nflavours: [mango]\n").unwrap_err();
        assert!(matches!(err, SeedError::Yaml(_)));
    }

    #[tokio::test]
    async fn test_apply_inserts_everything() {
        let db = MemoryDatabase::default();
        let catalog = CatalogFile::parse(BUNDLED).unwrap();

        let report = apply(&db, &catalog).await.unwrap();

        assert_eq!(report.customers.len(), 3);
        assert_eq!(report.variants.len(), 5);
        assert_eq!(report.designs.len(), 2);

        let ana = report.customer_id("ana@example.com").unwrap();
        assert_eq!(report.designs[0].customer_id, ana);
        assert!(report.designs[0].is_public);
        assert_eq!(report.designs[0].final_price, "13.50".parse().unwrap());

        let hoodie = &report.variants[3];
        let stored = db.get_variant(hoodie.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 4);
        assert_eq!(stored.unit_base_price(), "35.00".parse().unwrap());
    }

    #[tokio::test]
    async fn test_apply_rejects_unknown_owner() {
        let db = MemoryDatabase::default();
        let catalog = CatalogFile::parse(
            "designs:\n  - { owner: ghost@example.com, name: Boo, locations: [front] }\n",
        )
        .unwrap();

        assert!(matches!(
            apply(&db, &catalog).await,
            Err(SeedError::UnknownOwner { .. })
        ));
    }
}
