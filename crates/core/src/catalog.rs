use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use rand::Rng;

use crate::domain::product::{Product, ProductId};

const MANUFACTURERS: [&str; 25] = [
    "Muji",
    "Pilot",
    "Jans Sports",
    "Nike",
    "Adidas",
    "Apple",
    "Samsung",
    "Sony",
    "Dell",
    "HP",
    "Lenovo",
    "Asus",
    "Microsoft",
    "Amazon",
    "Google",
    "Patagonia",
    "North Face",
    "Columbia",
    "Under Armour",
    "Puma",
    "Reebok",
    "New Balance",
    "Vans",
    "Converse",
    "Timberland",
];

// Parallel to MANUFACTURERS: index i is manufacturer i's category.
const CATEGORIES: [&str; 25] = [
    "Stationery",
    "Pen",
    "Backpacks",
    "Athletic Apparel",
    "Athletic Apparel",
    "Electronic",
    "Electronic",
    "Electronic",
    "Computer",
    "Computer",
    "Computer",
    "Computer",
    "Software",
    "E-commerce",
    "Technology",
    "Outdoor Apparel",
    "Outdoor Apparel",
    "Outdoor Apparel",
    "Athletic Apparel",
    "Athletic Apparel",
    "Athletic Apparel",
    "Athletic Footwear",
    "Footwear",
    "Footwear",
    "Footwear",
];

const SKU_LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generates `count` synthetic products with ids 1..=count and unique SKUs.
pub fn generate(count: usize) -> Vec<Product> {
    let mut rng = rand::thread_rng();
    let mut used_skus = HashSet::with_capacity(count);
    let mut products = Vec::with_capacity(count);

    for id in 1..=count as i64 {
        let sku = unique_sku(&mut rng, &mut used_skus);
        let index = rng.gen_range(0..MANUFACTURERS.len());
        let manufacturer = MANUFACTURERS[index];
        let category = CATEGORIES[index];
        let weight = (rng.gen_range(0.1_f64..=50.0) * 10.0).floor() / 10.0;

        products.push(Product {
            id: ProductId(id),
            sku,
            manufacturer: manufacturer.to_string(),
            category_id: rng.gen_range(100..1000),
            weight,
            some_other_id: rng.gen_range(100..10000),
            name: format!("Product {manufacturer} {id}"),
            category: category.to_string(),
            description: format!("{manufacturer} {category} {id}"),
            brand: manufacturer.to_string(),
        });
    }

    products
}

fn unique_sku(rng: &mut impl Rng, used: &mut HashSet<String>) -> String {
    loop {
        let mut sku = String::with_capacity(8);
        for position in 0..7 {
            if position == 4 {
                sku.push('-');
            }
            sku.push(SKU_LETTERS[rng.gen_range(0..SKU_LETTERS.len())] as char);
        }
        if used.insert(sku.clone()) {
            return sku;
        }
    }
}

/// Result of one randomized catalog search pass.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchOutcome {
    pub products: Vec<Product>,
    pub total_found: usize,
    pub total_searched: usize,
}

/// Read-mostly keyed product lookup. Populated once at startup; after that
/// the cart path only reads. Administrative edits replace whole records
/// under the write lock so readers never observe a partial product.
#[derive(Default)]
pub struct ProductCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl ProductCatalog {
    pub fn from_products(products: Vec<Product>) -> Self {
        let map = products.into_iter().map(|product| (product.id, product)).collect();
        Self { products: RwLock::new(map) }
    }

    pub fn get(&self, id: ProductId) -> Option<Product> {
        self.products.read().expect("catalog lock poisoned").get(&id).cloned()
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.products.read().expect("catalog lock poisoned").contains_key(&id)
    }

    /// Whole-record replace; also used by the one-time startup population.
    pub fn upsert(&self, product: Product) {
        self.products.write().expect("catalog lock poisoned").insert(product.id, product);
    }

    pub fn len(&self) -> usize {
        self.products.read().expect("catalog lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Randomized sample search: draws `sample_size` ids across the catalog's
    /// id space, matches `query` case-insensitively against name, category,
    /// and brand, and returns at most `max_results` hits. `total_found`
    /// counts every sampled match, including those beyond the result cap.
    pub fn sample_search(
        &self,
        query: &str,
        sample_size: usize,
        max_results: usize,
    ) -> SearchOutcome {
        let products = self.products.read().expect("catalog lock poisoned");
        let id_space = products.len() as i64;
        if id_space == 0 {
            return SearchOutcome { products: Vec::new(), total_found: 0, total_searched: 0 };
        }

        let needle = query.to_lowercase();
        let mut rng = rand::thread_rng();
        let mut matches = Vec::new();
        let mut total_found = 0;
        let mut total_searched = 0;

        for _ in 0..sample_size {
            let id = ProductId(rng.gen_range(1..=id_space));
            total_searched += 1;
            let Some(product) = products.get(&id) else { continue };

            let hit = product.name.to_lowercase().contains(&needle)
                || product.category.to_lowercase().contains(&needle)
                || product.brand.to_lowercase().contains(&needle);
            if hit {
                total_found += 1;
                if matches.len() < max_results {
                    matches.push(product.clone());
                }
            }
        }

        SearchOutcome { products: matches, total_found, total_searched }
    }
}
