//! Planning dashboard state: products, retailers and filters.
//!
//! The timeline only ever sees `filtered_products()`.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::layout::parse_date;
use crate::models::{default_retailers, sample_products, PlanningType, ProductRecord, Retailer};
use crate::store::SavedPlanning;

const NEW_PRODUCT_IMAGE: &str = "/api/placeholder/100/100?text=NEW";
const NEW_RETAILER_LOGO: &str = "/api/placeholder/50/50?text=NEW";

/// Product filters. Empty sets and absent dates let everything through.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub brands: Vec<String>,
    pub retailers: Vec<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

fn toggle(set: &mut Vec<String>, value: &str) {
    match set.iter().position(|v| v == value) {
        Some(pos) => {
            set.remove(pos);
        }
        None => set.push(value.to_string()),
    }
}

impl Filters {
    pub fn is_active(&self) -> bool {
        !self.brands.is_empty() || !self.retailers.is_empty() || self.start.is_some() || self.end.is_some()
    }

    pub fn toggle_brand(&mut self, brand: &str) {
        toggle(&mut self.brands, brand);
    }

    pub fn toggle_retailer(&mut self, retailer: &str) {
        toggle(&mut self.retailers, retailer);
    }

    /// A product passes when it overlaps the date window. A date that is
    /// present but does not parse never satisfies an active bound.
    pub fn matches(&self, product: &ProductRecord) -> bool {
        let brand_ok = self.brands.is_empty() || self.brands.iter().any(|b| *b == product.brand);
        let retailer_ok = self.retailers.is_empty()
            || product.retailer.iter().any(|r| self.retailers.contains(r));

        let present = |text: &Option<String>| text.as_deref().filter(|t| !t.is_empty()).map(|t| parse_date(Some(t)));

        let start_ok = match (self.start, present(&product.end_date)) {
            (None, _) | (_, None) => true,
            (Some(from), Some(end)) => end.is_some_and(|end| end >= from),
        };
        let end_ok = match (self.end, present(&product.start_date)) {
            (None, _) | (_, None) => true,
            (Some(to), Some(start)) => start.is_some_and(|start| start <= to),
        };

        brand_ok && retailer_ok && start_ok && end_ok
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dashboard {
    pub products: Vec<ProductRecord>,
    pub retailers: Vec<Retailer>,
    pub filters: Filters,
}

impl Dashboard {
    pub fn new(products: Vec<ProductRecord>, retailers: Vec<Retailer>) -> Self {
        Self {
            products,
            retailers,
            filters: Filters::default(),
        }
    }

    /// Start from whatever was saved, falling back to the sample catalog
    pub fn from_saved(saved: SavedPlanning) -> Self {
        Self::new(
            saved.products.unwrap_or_else(sample_products),
            saved.retailers.unwrap_or_else(default_retailers),
        )
    }

    pub fn filtered_products(&self) -> Vec<ProductRecord> {
        self.products
            .iter()
            .filter(|p| self.filters.matches(p))
            .cloned()
            .collect()
    }

    /// Distinct non-empty brands in first-seen order
    pub fn brands(&self) -> Vec<String> {
        let mut brands: Vec<String> = Vec::new();
        for product in &self.products {
            if !product.brand.is_empty() && !brands.contains(&product.brand) {
                brands.push(product.brand.clone());
            }
        }
        brands
    }

    pub fn product(&self, id: &str) -> Option<&ProductRecord> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Append a blank product and return its id
    pub fn add_product(&mut self, stamp: i64) -> String {
        let mut id = format!("NEW-{}", stamp);
        let mut n = 1;
        while self.product(&id).is_some() {
            id = format!("NEW-{}-{}", stamp, n);
            n += 1;
        }
        self.products.push(ProductRecord {
            description: "New Product".to_string(),
            image: Some(NEW_PRODUCT_IMAGE.to_string()),
            ..ProductRecord::new(id.clone())
        });
        info!(%id, "product added");
        id
    }

    pub fn remove_product(&mut self, id: &str) -> bool {
        let before = self.products.len();
        self.products.retain(|p| p.id != id);
        before != self.products.len()
    }

    /// Replace a product by id
    pub fn update_product(&mut self, record: ProductRecord) -> bool {
        match self.products.iter_mut().find(|p| p.id == record.id) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    /// Clear retailers, dates and planning type of every product
    pub fn reset_gantt(&mut self) {
        for product in &mut self.products {
            product.retailer.clear();
            product.start_date = None;
            product.end_date = None;
            product.planning_type = PlanningType::Unset;
        }
        info!(products = self.products.len(), "gantt chart reset");
    }

    pub fn add_retailer(&mut self, name: &str) -> Result<(), &'static str> {
        let name = name.trim();
        if name.is_empty() {
            return Err("Retailer name is required");
        }
        if self.retailers.iter().any(|r| r.name == name) {
            return Err("Retailer already exists");
        }
        self.retailers.push(Retailer {
            name: name.to_string(),
            logo: Some(NEW_RETAILER_LOGO.to_string()),
        });
        Ok(())
    }

    /// Remove a retailer everywhere it is referenced
    pub fn remove_retailer(&mut self, name: &str) -> bool {
        let before = self.retailers.len();
        self.retailers.retain(|r| r.name != name);
        for product in &mut self.products {
            product.retailer.retain(|r| r != name);
        }
        self.filters.retailers.retain(|r| r != name);
        before != self.retailers.len()
    }

    pub fn set_retailer_logo(&mut self, name: &str, logo: Option<String>) -> bool {
        match self.retailers.iter_mut().find(|r| r.name == name) {
            Some(retailer) => {
                retailer.logo = logo;
                true
            }
            None => false,
        }
    }

    pub fn set_product_image(&mut self, id: &str, url: String) -> bool {
        match self.products.iter_mut().find(|p| p.id == id) {
            Some(product) => {
                debug!(%id, %url, "product image set");
                product.image = Some(url);
                true
            }
            None => false,
        }
    }

    /// Append imported products, returns how many were added
    pub fn import(&mut self, products: Vec<ProductRecord>) -> usize {
        let count = products.len();
        self.products.extend(products);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dated(id: &str, brand: &str, start: Option<&str>, end: Option<&str>) -> ProductRecord {
        ProductRecord {
            brand: brand.to_string(),
            start_date: start.map(str::to_string),
            end_date: end.map(str::to_string),
            ..ProductRecord::new(id)
        }
    }

    fn date(d: u32, m: u32, y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty_filters_pass_everything() {
        let dashboard = Dashboard::new(sample_products(), default_retailers());
        assert!(!dashboard.filters.is_active());
        assert_eq!(dashboard.filtered_products().len(), 5);
    }

    #[test]
    fn test_brand_and_retailer_filters() {
        let mut dashboard = Dashboard::new(sample_products(), default_retailers());
        dashboard.filters.toggle_brand("FUGGLER");
        assert_eq!(dashboard.filtered_products().len(), 1);

        dashboard.filters.toggle_brand("FUGGLER");
        dashboard.filters.toggle_retailer("Retailer C");
        let ids: Vec<String> = dashboard.filtered_products().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["77685GQ1", "15719BQ1"]);
    }

    #[test]
    fn test_date_window_overlap() {
        let products = vec![
            dated("early", "", Some("01-01-2025"), Some("31-01-2025")),
            dated("late", "", Some("01-06-2025"), Some("30-06-2025")),
            dated("open", "", None, None),
            dated("broken", "", Some("2025-03-01"), Some("2025-03-31")),
        ];
        let mut dashboard = Dashboard::new(products, Vec::new());
        dashboard.filters.start = Some(date(1, 3, 2025));
        let ids: Vec<String> = dashboard.filtered_products().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["late", "open"]);

        dashboard.filters.start = None;
        dashboard.filters.end = Some(date(15, 1, 2025));
        let ids: Vec<String> = dashboard.filtered_products().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["early", "open"]);
    }

    #[test]
    fn test_add_and_remove_product() {
        let mut dashboard = Dashboard::default();
        let id = dashboard.add_product(1700000000000);
        assert_eq!(id, "NEW-1700000000000");
        let again = dashboard.add_product(1700000000000);
        assert_ne!(id, again);

        let added = dashboard.product(&id).unwrap();
        assert_eq!(added.description, "New Product");
        assert_eq!(added.planning_type, PlanningType::Unset);
        assert_eq!(added.start_date, None);

        assert!(dashboard.remove_product(&id));
        assert!(!dashboard.remove_product(&id));
        assert_eq!(dashboard.products.len(), 1);
    }

    #[test]
    fn test_update_product_replaces_by_id() {
        let mut dashboard = Dashboard::new(sample_products(), Vec::new());
        let mut record = dashboard.products[0].clone();
        record.brand = "OTHER".to_string();
        assert!(dashboard.update_product(record));
        assert_eq!(dashboard.products[0].brand, "OTHER");
        assert!(!dashboard.update_product(ProductRecord::new("missing")));
    }

    #[test]
    fn test_reset_gantt_keeps_identity() {
        let mut dashboard = Dashboard::new(sample_products(), default_retailers());
        dashboard.reset_gantt();
        for product in &dashboard.products {
            assert!(product.retailer.is_empty());
            assert_eq!(product.start_date, None);
            assert_eq!(product.planning_type, PlanningType::Unset);
            assert!(!product.description.is_empty());
        }
    }

    #[test]
    fn test_retailer_management() {
        let mut dashboard = Dashboard::new(sample_products(), default_retailers());
        assert_eq!(dashboard.add_retailer("  "), Err("Retailer name is required"));
        assert_eq!(dashboard.add_retailer("Retailer A"), Err("Retailer already exists"));
        assert_eq!(dashboard.add_retailer("Retailer E"), Ok(()));
        assert_eq!(dashboard.retailers.len(), 5);

        dashboard.filters.toggle_retailer("Retailer A");
        assert!(dashboard.remove_retailer("Retailer A"));
        assert!(dashboard.products.iter().all(|p| !p.has_retailer("Retailer A")));
        assert!(dashboard.filters.retailers.is_empty());

        assert!(dashboard.set_retailer_logo("Retailer B", Some("b.png".to_string())));
        assert!(!dashboard.set_retailer_logo("Retailer A", None));
    }

    #[test]
    fn test_from_saved_falls_back_to_samples() {
        let dashboard = Dashboard::from_saved(SavedPlanning::default());
        assert_eq!(dashboard.products.len(), 5);
        assert_eq!(dashboard.retailers.len(), 4);

        let saved = SavedPlanning {
            products: Some(Vec::new()),
            retailers: None,
        };
        let dashboard = Dashboard::from_saved(saved);
        assert!(dashboard.products.is_empty());
        assert_eq!(dashboard.brands(), Vec::<String>::new());
    }

    #[test]
    fn test_brands_in_first_seen_order() {
        let dashboard = Dashboard::new(sample_products(), Vec::new());
        assert_eq!(dashboard.brands(), vec!["5 SURPRISE", "FUGGLER"]);
    }
}
