use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub i64);

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Immutable reference record for one sellable product. Built once at
/// startup by the catalog generator; cart writes copy `manufacturer` and
/// `category` into item rows instead of re-reading the product later.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "product_id")]
    pub id: ProductId,
    pub sku: String,
    pub manufacturer: String,
    pub category_id: i64,
    pub weight: f64,
    pub some_other_id: i64,
    pub name: String,
    pub category: String,
    pub description: String,
    pub brand: String,
}
