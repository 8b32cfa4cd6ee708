//! Domain models for the planning dashboard.
//!
//! Product records keep their dates as `DD-MM-YYYY` text, exactly as they are
//! typed, imported and persisted. Parsing happens in the layout engine, so a
//! record with a malformed date still round-trips untouched.
//! Also holds the wire shapes of the upstream product-information API.

use serde::{Deserialize, Serialize};

use crate::layout::parse_date;

/// Merchandising activity category, drives the bar color
///
/// Stored as its lowercase key. An unknown stored key loads as `Unset` and is
/// written back as `""`, so it draws with the neutral fill before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum PlanningType {
    #[default]
    Unset,
    Feature,
    Promo,
    Endcap,
    Sidekick,
    Markdown,
}

impl PlanningType {
    /// All assignable planning types, in legend order
    pub fn all() -> &'static [PlanningType] {
        &[
            PlanningType::Feature,
            PlanningType::Promo,
            PlanningType::Endcap,
            PlanningType::Sidekick,
            PlanningType::Markdown,
        ]
    }

    /// Cycle to the next type, passing through `Unset`
    pub fn next(&self) -> Self {
        match self {
            PlanningType::Unset => PlanningType::Feature,
            PlanningType::Feature => PlanningType::Promo,
            PlanningType::Promo => PlanningType::Endcap,
            PlanningType::Endcap => PlanningType::Sidekick,
            PlanningType::Sidekick => PlanningType::Markdown,
            PlanningType::Markdown => PlanningType::Unset,
        }
    }

    /// Cycle to the previous type
    pub fn previous(&self) -> Self {
        match self {
            PlanningType::Unset => PlanningType::Markdown,
            PlanningType::Feature => PlanningType::Unset,
            PlanningType::Promo => PlanningType::Feature,
            PlanningType::Endcap => PlanningType::Promo,
            PlanningType::Sidekick => PlanningType::Endcap,
            PlanningType::Markdown => PlanningType::Sidekick,
        }
    }

    /// Stored key, empty for `Unset`
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanningType::Unset => "",
            PlanningType::Feature => "feature",
            PlanningType::Promo => "promo",
            PlanningType::Endcap => "endcap",
            PlanningType::Sidekick => "sidekick",
            PlanningType::Markdown => "markdown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlanningType::Unset => "None",
            PlanningType::Feature => "Feature",
            PlanningType::Promo => "Promo",
            PlanningType::Endcap => "Endcap",
            PlanningType::Sidekick => "Sidekick",
            PlanningType::Markdown => "Markdown",
        }
    }
}

impl From<&str> for PlanningType {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "feature" => PlanningType::Feature,
            "promo" => PlanningType::Promo,
            "endcap" => PlanningType::Endcap,
            "sidekick" => PlanningType::Sidekick,
            "markdown" => PlanningType::Markdown,
            _ => PlanningType::Unset,
        }
    }
}

impl From<String> for PlanningType {
    fn from(value: String) -> Self {
        PlanningType::from(value.as_str())
    }
}

impl From<PlanningType> for String {
    fn from(value: PlanningType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for PlanningType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Selling season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum Season {
    #[default]
    Unset,
    SpringSummer,
    AutumnFall,
}

impl Season {
    pub fn next(&self) -> Self {
        match self {
            Season::Unset => Season::SpringSummer,
            Season::SpringSummer => Season::AutumnFall,
            Season::AutumnFall => Season::Unset,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Unset => "",
            Season::SpringSummer => "Spring/Summer",
            Season::AutumnFall => "Autumn/Fall",
        }
    }
}

impl From<String> for Season {
    fn from(value: String) -> Self {
        match value.trim() {
            "Spring/Summer" => Season::SpringSummer,
            "Autumn/Fall" => Season::AutumnFall,
            _ => Season::Unset,
        }
    }
}

impl From<Season> for String {
    fn from(value: Season) -> Self {
        value.as_str().to_string()
    }
}

// ============================================
// Products & retailers
// ============================================

/// A planned retail product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: String,
    #[serde(default)]
    pub item_number: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub planning_type: PlanningType,
    #[serde(default)]
    pub season: Season,
    #[serde(default)]
    pub retailer: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl ProductRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn display_name(&self) -> &str {
        if self.description.trim().is_empty() {
            "No description"
        } else {
            &self.description
        }
    }

    /// Item number used for image lookups, falls back to the id
    pub fn lookup_key(&self) -> &str {
        if self.item_number.trim().is_empty() {
            &self.id
        } else {
            self.item_number.trim()
        }
    }

    pub fn has_retailer(&self, name: &str) -> bool {
        self.retailer.iter().any(|r| r == name)
    }

    /// Form-level validation. Empty dates are allowed (the product is then
    /// simply not drawn), but a date that is present must parse.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.id.trim().is_empty() {
            return Err("Id is required");
        }
        let start = match self.start_date.as_deref().filter(|s| !s.is_empty()) {
            Some(text) => Some(parse_date(Some(text)).ok_or("Start date must be DD-MM-YYYY")?),
            None => None,
        };
        let end = match self.end_date.as_deref().filter(|s| !s.is_empty()) {
            Some(text) => Some(parse_date(Some(text)).ok_or("End date must be DD-MM-YYYY")?),
            None => None,
        };
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err("End date must be after start date");
            }
        }
        Ok(())
    }
}

/// A retailer with an optional logo reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retailer {
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
}

impl Retailer {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let logo = Some(format!("/api/placeholder/50/50?text={}", name));
        Self { name, logo }
    }
}

/// Retailers a fresh dashboard starts with
pub fn default_retailers() -> Vec<Retailer> {
    ["Retailer A", "Retailer B", "Retailer C", "Retailer D"]
        .into_iter()
        .map(Retailer::new)
        .collect()
}

/// Built-in catalog used when nothing has been saved yet
pub fn sample_products() -> Vec<ProductRecord> {
    let make = |id: &str, description: &str, brand: &str, retailers: &[&str], start: &str, end: &str, kind| {
        ProductRecord {
            id: id.to_string(),
            item_number: id.to_string(),
            description: description.to_string(),
            brand: brand.to_string(),
            start_date: Some(start.to_string()),
            end_date: Some(end.to_string()),
            planning_type: kind,
            season: Season::AutumnFall,
            retailer: retailers.iter().map(|r| r.to_string()).collect(),
            image: Some(format!("/api/placeholder/100/100?text={}", id)),
        }
    };

    vec![
        make("77595GQ6", "5 SURPRISE; UNICORN SQUAD; CAPSULE; SERIES 7", "5 SURPRISE",
            &["Retailer A", "Retailer B"], "01-09-2025", "30-11-2025", PlanningType::Feature),
        make("77685GQ1", "5 SURPRISE; DINO MIX & MATCH; CAPSULE; SERIES 1", "5 SURPRISE",
            &["Retailer C"], "15-10-2025", "15-12-2025", PlanningType::Promo),
        make("77687GQ1", "5 SURPRISE; TRANSFORMERS; CAPSULE; SERIES 1", "5 SURPRISE",
            &["Retailer A", "Retailer D"], "01-11-2025", "31-12-2025", PlanningType::Endcap),
        make("77655GQ1", "5 SURPRISE; GABBY'S DOLLHOUSE; CAPSULE; SERIES 1", "5 SURPRISE",
            &["Retailer B"], "01-12-2025", "15-01-2026", PlanningType::Sidekick),
        make("15719BQ1", "FUGGLER; BABY FUGGS 3.5\"; PLUSH; SERIES 2", "FUGGLER",
            &["Retailer A", "Retailer C"], "15-09-2025", "15-11-2025", PlanningType::Feature),
    ]
}

// ============================================
// Upstream product-information API
// ============================================

/// Image formats accepted from the digital asset list
pub const ACCEPTED_IMAGE_FORMATS: &[&str] = &["png", "jpg", "jpeg"];

/// Product document returned by the upstream API
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpstreamProduct {
    #[serde(rename = "salsify:id", default)]
    pub id: Option<String>,
    #[serde(rename = "salsify:digital_assets", default)]
    pub digital_assets: Vec<DigitalAsset>,
}

impl UpstreamProduct {
    /// First asset in an accepted image format that carries a URL
    pub fn first_image(&self) -> Option<&DigitalAsset> {
        self.digital_assets.iter().find(|asset| {
            asset.url.is_some()
                && asset
                    .format
                    .as_deref()
                    .is_some_and(|f| ACCEPTED_IMAGE_FORMATS.contains(&f.to_ascii_lowercase().as_str()))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DigitalAsset {
    #[serde(rename = "salsify:format", default)]
    pub format: Option<String>,
    #[serde(rename = "salsify:url", default)]
    pub url: Option<String>,
}

/// Filtered search result page
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpstreamSearchPage {
    #[serde(default)]
    pub data: Vec<UpstreamProduct>,
}

/// Successful image lookup, also the proxy's 200 body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMatch {
    pub image_url: String,
    #[serde(rename = "salsifyId")]
    pub product_id: Option<String>,
}

/// Error body returned by the proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyErrorBody {
    pub error: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planning_type_conversion() {
        assert_eq!(PlanningType::from("promo"), PlanningType::Promo);
        assert_eq!(PlanningType::from("Endcap"), PlanningType::Endcap);
        assert_eq!(PlanningType::from(""), PlanningType::Unset);
        assert_eq!(PlanningType::from("clearance"), PlanningType::Unset);
        assert_eq!(String::from(PlanningType::Markdown), "markdown");
    }

    #[test]
    fn test_planning_type_cycle_visits_every_type() {
        let mut kind = PlanningType::Unset;
        for _ in 0..6 {
            kind = kind.next();
            assert_eq!(kind.next().previous(), kind);
        }
        assert_eq!(kind, PlanningType::Unset);
    }

    #[test]
    fn test_product_json_shape() {
        let json = r#"{
            "id": "77595GQ6",
            "description": "UNICORN SQUAD",
            "brand": "5 SURPRISE",
            "startDate": "01-09-2025",
            "endDate": null,
            "planningType": "feature",
            "season": "Autumn/Fall",
            "retailer": ["Retailer A"]
        }"#;
        let product: ProductRecord = serde_json::from_str(json).unwrap();
        assert_eq!(product.planning_type, PlanningType::Feature);
        assert_eq!(product.season, Season::AutumnFall);
        assert_eq!(product.end_date, None);
        assert!(product.image.is_none());

        let out = serde_json::to_value(&product).unwrap();
        assert_eq!(out["planningType"], "feature");
        assert_eq!(out["startDate"], "01-09-2025");
    }

    #[test]
    fn test_product_validation() {
        let mut product = ProductRecord::new("A");
        assert!(product.validate().is_ok());

        product.start_date = Some("31-02-2025".to_string());
        assert!(product.validate().is_err());

        product.start_date = Some("10-02-2025".to_string());
        product.end_date = Some("01-02-2025".to_string());
        assert_eq!(product.validate(), Err("End date must be after start date"));

        product.end_date = Some("28-02-2025".to_string());
        assert!(product.validate().is_ok());
    }

    #[test]
    fn test_first_image_skips_unaccepted_formats() {
        let product: UpstreamProduct = serde_json::from_str(
            r#"{
                "salsify:id": "77595GQ6",
                "salsify:digital_assets": [
                    {"salsify:format": "pdf", "salsify:url": "https://cdn/a.pdf"},
                    {"salsify:format": "JPG", "salsify:url": "https://cdn/b.jpg"},
                    {"salsify:format": "png", "salsify:url": "https://cdn/c.png"}
                ]
            }"#,
        )
        .unwrap();
        let image = product.first_image().unwrap();
        assert_eq!(image.url.as_deref(), Some("https://cdn/b.jpg"));
    }
}
