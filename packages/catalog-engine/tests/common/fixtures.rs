//! Catalog fixtures
//!
//! Category ids: 1 Electronics, 2 Headphones (under 1), 3 Wireless (under 2),
//! 4 Computers. Brand ids: 1 Sony, 2 Bose, 3 Apple. Tag ids: 1 noise cancelling,
//! 2 refurbished, 3 bundle.

use catalog_storage::{Brand, Category, Product, ProductId, SuggestionEntry, SuggestionKind, Tag};

use super::builders::HarnessBuilder;

/// Route engine logs to the test writer; `RUST_LOG` picks the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub const ELECTRONICS: u64 = 1;
pub const HEADPHONES: u64 = 2;
pub const WIRELESS: u64 = 3;
pub const COMPUTERS: u64 = 4;

pub const SONY: u64 = 1;
pub const BOSE: u64 = 2;
pub const APPLE: u64 = 3;

pub const NOISE_CANCELLING: u64 = 1;
pub const REFURBISHED: u64 = 2;
pub const BUNDLE: u64 = 3;

pub fn fixture_categories() -> Vec<Category> {
    vec![
        Category::new(ELECTRONICS, "Electronics", None),
        Category::new(HEADPHONES, "Headphones", Some(ELECTRONICS)),
        Category::new(WIRELESS, "Wireless", Some(HEADPHONES)),
        Category::new(COMPUTERS, "Computers", None),
    ]
}

pub fn fixture_brands() -> Vec<Brand> {
    vec![
        Brand::new(SONY, "Sony"),
        Brand::new(BOSE, "Bose"),
        Brand::new(APPLE, "Apple"),
    ]
}

pub fn fixture_tags() -> Vec<Tag> {
    vec![
        Tag::new(NOISE_CANCELLING, "Noise cancelling"),
        Tag::new(REFURBISHED, "Refurbished"),
        Tag::new(BUNDLE, "Bundle"),
    ]
}

/// Seven products across the audio tree plus one computer
///
/// | id | brand | category   |
/// |----|-------|------------|
/// | 1  | Sony  | Wireless   |
/// | 2  | Sony  | Wireless   |
/// | 3  | Sony  | Headphones |
/// | 4  | Bose  | Wireless   |
/// | 5  | Bose  | Wireless   |
/// | 6  | Apple | Headphones |
/// | 7  | Apple | Computers  |
pub fn fixture_audio_products() -> Vec<Product> {
    vec![
        Product::new(1, "Sony WH-1000XM5", "SNY-1", 399.0, WIRELESS).with_brand(SONY),
        Product::new(2, "Sony WF-C700N", "SNY-2", 119.0, WIRELESS).with_brand(SONY),
        Product::new(3, "Sony MDR-7506", "SNY-3", 99.0, HEADPHONES).with_brand(SONY),
        Product::new(4, "Bose QuietComfort", "BSE-1", 349.0, WIRELESS).with_brand(BOSE),
        Product::new(5, "Bose Sport Earbuds", "BSE-2", 179.0, WIRELESS).with_brand(BOSE),
        Product::new(6, "Apple EarPods", "APL-1", 19.0, HEADPHONES).with_brand(APPLE),
        Product::new(7, "Apple MacBook Air", "APL-2", 1099.0, COMPUTERS).with_brand(APPLE),
    ]
}

/// Harness over the audio catalog with the default configuration
pub fn fixture_audio_harness() -> HarnessBuilder {
    HarnessBuilder::new()
        .with_categories(fixture_categories())
        .with_brands(fixture_brands())
        .with_products(fixture_audio_products())
}

/// `exact` products whose names contain "headphones" and `fuzzy` whose names
/// only come close ("Headphone Stand N")
pub fn fixture_headphone_names(exact: usize, fuzzy: usize) -> Vec<Product> {
    let exact_products = (0..exact).map(|i| {
        let id = i as ProductId + 1;
        Product::new(id, format!("Headphones Model {}", id), format!("HP-{}", id), 50.0, HEADPHONES)
    });
    let fuzzy_products = (0..fuzzy).map(|i| {
        let id = (exact + i) as ProductId + 1;
        Product::new(id, format!("Headphone Stand {}", id), format!("ST-{}", id), 25.0, HEADPHONES)
    });
    exact_products.chain(fuzzy_products).collect()
}

pub fn fixture_query_entry(value: &str, searches: u64) -> SuggestionEntry {
    SuggestionEntry::new(SuggestionKind::Query, value).with_counts(searches, 0)
}
