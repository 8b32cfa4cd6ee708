//! CSV export of the planning and spreadsheet import.
//!
//! Import reads either a workbook (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`,
//! first worksheet) or a CSV file, with columns in this order:
//! Item Number, Description, Brand, Image URL, Retailers (`|` separated),
//! Start Date, End Date, Planning Type, Season. The first row is a header.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate};
use thiserror::Error;
use tracing::{debug, info};

use crate::layout::format_date;
use crate::models::{PlanningType, ProductRecord, Season};

const EXPORT_HEADER: [&str; 7] = [
    "ID",
    "Description",
    "Brand",
    "Retailers",
    "Start Date",
    "End Date",
    "Planning Type",
];

const PLACEHOLDER_IMAGE: &str = "/api/placeholder/100/100?text=NEW";

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Serial day of 31-12-9999
const MAX_SERIAL: f64 = 2_958_465.0;

const COLUMNS: usize = 9;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("cannot read workbook {path}: {source}")]
    Workbook {
        path: String,
        #[source]
        source: calamine::Error,
    },
    #[error("{0} has no worksheet")]
    NoSheet(String),
    #[error("no valid products found in the sheet")]
    Empty,
}

/// Write the planning as CSV
pub fn export_csv<W: Write>(products: &[ProductRecord], writer: W) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(EXPORT_HEADER)?;
    for p in products {
        out.write_record([
            p.id.as_str(),
            p.description.as_str(),
            p.brand.as_str(),
            p.retailer.join("; ").as_str(),
            p.start_date.as_deref().unwrap_or(""),
            p.end_date.as_deref().unwrap_or(""),
            p.planning_type.as_str(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

pub fn export_to_path(products: &[ProductRecord], path: &Path) -> anyhow::Result<()> {
    use anyhow::Context;

    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    export_csv(products, file).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(count = products.len(), path = %path.display(), "planning exported");
    Ok(())
}

/// Spreadsheet serial day (1900 date system, epoch 1899-12-30)
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Normalize a date cell. Numbers are serial days, text is kept as typed.
fn date_cell(cell: &str) -> Option<String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    match cell.parse::<f64>() {
        Ok(serial) => serial_to_date(serial).map(format_date),
        Err(_) => Some(cell.to_string()),
    }
}

/// One sheet row, `index` counts data rows from zero
fn product_from_row(cells: &[String], index: usize, stamp: i64) -> Option<ProductRecord> {
    let cell = |n: usize| cells.get(n).map(|c| c.trim()).unwrap_or("");

    let item_number = cell(0);
    let description = cell(1);
    if item_number.is_empty() && description.is_empty() {
        debug!(row = index + 2, "skipping row without item number or description");
        return None;
    }

    let image = match cell(3) {
        "" => PLACEHOLDER_IMAGE.to_string(),
        url => url.to_string(),
    };

    Some(ProductRecord {
        id: format!("IMPORT-{}-{}", stamp, index),
        item_number: item_number.to_string(),
        description: description.to_string(),
        brand: cell(2).to_string(),
        image: Some(image),
        retailer: cell(4)
            .split('|')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect(),
        start_date: date_cell(cell(5)),
        end_date: date_cell(cell(6)),
        planning_type: PlanningType::from(cell(7)),
        season: Season::from(cell(8).to_string()),
    })
}

fn finish(products: Vec<ProductRecord>) -> Result<Vec<ProductRecord>, ImportError> {
    if products.is_empty() {
        return Err(ImportError::Empty);
    }
    info!(count = products.len(), "sheet imported");
    Ok(products)
}

/// Parse a CSV sheet. `stamp` seeds the generated ids.
pub fn import_csv<R: Read>(reader: R, stamp: i64) -> Result<Vec<ProductRecord>, ImportError> {
    let mut rows = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut products = Vec::new();
    for (index, row) in rows.records().enumerate() {
        let row = row?;
        let cells: Vec<String> = row.iter().map(str::to_string).collect();
        products.extend(product_from_row(&cells, index, stamp));
    }
    finish(products)
}

/// Workbook cell as text. Dates become serial days so both formats share
/// the date handling; ISO timestamps are reformatted directly.
fn workbook_text(value: Option<&Data>) -> String {
    match value {
        Some(Data::String(s)) => s.clone(),
        Some(Data::Float(f)) => f.to_string(),
        Some(Data::Int(i)) => i.to_string(),
        Some(Data::Bool(b)) => b.to_string(),
        Some(Data::DateTime(dt)) => dt.as_f64().to_string(),
        Some(Data::DateTimeIso(s)) => s
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(format_date)
            .unwrap_or_else(|| s.clone()),
        Some(Data::DurationIso(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Parse the first worksheet of a workbook. `stamp` seeds the generated ids.
pub fn import_workbook(path: &Path, stamp: i64) -> Result<Vec<ProductRecord>, ImportError> {
    let workbook_error = |source| ImportError::Workbook {
        path: path.display().to_string(),
        source,
    };
    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::NoSheet(path.display().to_string()))?
        .map_err(workbook_error)?;

    // Cells are read by absolute position so a blank leading column keeps
    // every field in its place
    let (Some((first_row, _)), Some((last_row, _))) = (range.start(), range.end()) else {
        return Err(ImportError::Empty);
    };

    let mut products = Vec::new();
    for (index, row) in (first_row + 1..=last_row).enumerate() {
        let cells: Vec<String> = (0..COLUMNS as u32)
            .map(|col| workbook_text(range.get_value((row, col))))
            .collect();
        products.extend(product_from_row(&cells, index, stamp));
    }
    finish(products)
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Import by file extension, anything that is not a workbook is read as CSV
pub fn import_from_path(path: &Path, stamp: i64) -> Result<Vec<ProductRecord>, ImportError> {
    if is_workbook(path) {
        return import_workbook(path, stamp);
    }
    let file = File::open(path).map_err(|source| ImportError::Open {
        path: path.display().to_string(),
        source,
    })?;
    import_csv(file, stamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_products;

    const SHEET: &str = "\
Item Number,Description,Brand,Image URL,Retailers,Start Date,End Date,Planning Type,Season
77595GQ6,UNICORN SQUAD,5 SURPRISE,,Retailer A | Retailer B,01-09-2025,30-11-2025,feature,Autumn/Fall
,,,,,,,,
,PLUSH SERIES 2,FUGGLER,https://cdn/p.png,,45901,45976.5,Promo,
88888,\"Comma, inside\",X,,,,,unknown,Spring/Summer
";

    fn fixture(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
    }

    #[test]
    fn test_import_maps_columns() {
        let products = import_csv(SHEET.as_bytes(), 42).unwrap();
        assert_eq!(products.len(), 3);

        let first = &products[0];
        assert_eq!(first.id, "IMPORT-42-0");
        assert_eq!(first.retailer, vec!["Retailer A", "Retailer B"]);
        assert_eq!(first.image.as_deref(), Some(PLACEHOLDER_IMAGE));
        assert_eq!(first.planning_type, PlanningType::Feature);
        assert_eq!(first.season, Season::AutumnFall);

        let plush = &products[1];
        assert_eq!(plush.id, "IMPORT-42-2");
        assert_eq!(plush.start_date.as_deref(), Some("01-09-2025"));
        assert_eq!(plush.end_date.as_deref(), Some("15-11-2025"));
        assert_eq!(plush.planning_type, PlanningType::Promo);

        let quoted = &products[2];
        assert_eq!(quoted.description, "Comma, inside");
        assert_eq!(quoted.start_date, None);
        assert_eq!(quoted.planning_type, PlanningType::Unset);
    }

    #[test]
    fn test_import_without_products_is_error() {
        let sheet = "Item Number,Description\n,\n";
        assert!(matches!(import_csv(sheet.as_bytes(), 1), Err(ImportError::Empty)));
    }

    #[test]
    fn test_export_header_and_quoting() {
        let mut buf = Vec::new();
        export_csv(&sample_products()[..1], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("ID,Description,Brand,Retailers,Start Date,End Date,Planning Type")
        );
        assert_eq!(
            lines.next(),
            Some("77595GQ6,5 SURPRISE; UNICORN SQUAD; CAPSULE; SERIES 7,5 SURPRISE,Retailer A; Retailer B,01-09-2025,30-11-2025,feature")
        );
    }

    #[test]
    fn test_serial_dates() {
        assert_eq!(serial_to_date(45658.0), NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(serial_to_date(MAX_SERIAL), NaiveDate::from_ymd_opt(9999, 12, 31));
        assert_eq!(serial_to_date(0.0), None);
        assert_eq!(date_cell("  "), None);
        assert_eq!(date_cell("31-02-2025").as_deref(), Some("31-02-2025"));
    }

    #[test]
    fn test_out_of_range_serial_is_dropped() {
        assert_eq!(serial_to_date(MAX_SERIAL + 1.0), None);
        assert_eq!(serial_to_date(1e15), None);
        assert_eq!(serial_to_date(f64::MAX), None);

        let sheet = "Item Number,Description,Brand,Image URL,Retailers,Start Date,End Date\nX1,Thing,B,,,1e15,45901\n";
        let products = import_csv(sheet.as_bytes(), 1).unwrap();
        assert_eq!(products[0].start_date, None);
        assert_eq!(products[0].end_date.as_deref(), Some("01-09-2025"));
    }

    #[test]
    fn test_import_workbook_first_sheet() {
        let products = import_from_path(&fixture("plan.xlsx"), 7).unwrap();
        assert_eq!(products.len(), 3);

        // Date-formatted cell and a text date
        let first = &products[0];
        assert_eq!(first.id, "IMPORT-7-0");
        assert_eq!(first.item_number, "77595GQ6");
        assert_eq!(first.retailer, vec!["Retailer A", "Retailer B"]);
        assert_eq!(first.start_date.as_deref(), Some("01-09-2025"));
        assert_eq!(first.end_date.as_deref(), Some("30-11-2025"));
        assert_eq!(first.planning_type, PlanningType::Feature);
        assert_eq!(first.season, Season::AutumnFall);

        // Numeric item number and plain serial days
        let plush = &products[1];
        assert_eq!(plush.item_number, "88888");
        assert_eq!(plush.start_date.as_deref(), Some("01-09-2025"));
        assert_eq!(plush.end_date.as_deref(), Some("15-11-2025"));
        assert_eq!(plush.planning_type, PlanningType::Promo);

        // The blank row is skipped, ids keep the sheet position
        let huge = &products[2];
        assert_eq!(huge.id, "IMPORT-7-3");
        assert_eq!(huge.start_date, None);
    }

    #[test]
    fn test_import_dispatches_on_extension() {
        assert!(is_workbook(Path::new("plan.XLSX")));
        assert!(is_workbook(Path::new("plan.ods")));
        assert!(!is_workbook(Path::new("plan.csv")));
        assert!(!is_workbook(Path::new("plan")));

        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("plan.txt");
        std::fs::write(&csv_path, SHEET).unwrap();
        assert_eq!(import_from_path(&csv_path, 42).unwrap().len(), 3);

        let broken = dir.path().join("broken.xlsx");
        std::fs::write(&broken, SHEET).unwrap();
        assert!(matches!(import_from_path(&broken, 1), Err(ImportError::Workbook { .. })));
    }
}
