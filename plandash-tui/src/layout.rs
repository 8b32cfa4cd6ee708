//! Timeline layout engine.
//!
//! Turns a product list and the interactive view inputs (zoom, hover, brand
//! grouping) into plain geometry: axis labels, grid lines, holiday markers and
//! one rounded rectangle per drawable product. Nothing in here touches the
//! terminal; the timeline widget maps the resulting pixels onto cells.
//!
//! Every function is pure and total. A record whose dates are missing or
//! malformed is left out of the drawing, never reported as an error.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::holidays::{compute_holiday_markers, HolidayMarker};
use crate::models::{PlanningType, ProductRecord, Season};

/// The only accepted textual date format
pub const DATE_FORMAT: &str = "%d-%m-%Y";

// ============================================
// Dates
// ============================================

/// Strict `DD-MM-YYYY` parse. Surrounding whitespace is ignored, anything
/// else that does not match exactly (single-digit fields, other separators,
/// impossible calendar days) yields `None`.
pub fn parse_date(text: Option<&str>) -> Option<NaiveDate> {
    let text = text?.trim();
    let bytes = text.as_bytes();
    if bytes.len() != 10 || bytes[2] != b'-' || bytes[5] != b'-' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Tooltip/list rendering of a stored date
pub fn display_date(text: Option<&str>) -> String {
    match text.filter(|t| !t.trim().is_empty()) {
        None => "Not set".to_string(),
        Some(t) => parse_date(Some(t))
            .map(format_date)
            .unwrap_or_else(|| "Invalid date".to_string()),
    }
}

/// Inclusive calendar window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, swapping the bounds if needed
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// 1 January to 31 December of `year`
    pub fn calendar_year(year: i32) -> Self {
        let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN);
        let end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    /// Days spanned, both endpoints included. Never below 1.
    pub fn total_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start.year()..=self.end.year()
    }
}

/// Smallest window covering every parsable start/end date. With no valid
/// date at all, the calendar year of `today` is used.
pub fn compute_bounding_range(records: &[ProductRecord], today: NaiveDate) -> DateRange {
    let dates = records.iter().flat_map(|r| {
        [
            parse_date(r.start_date.as_deref()),
            parse_date(r.end_date.as_deref()),
        ]
    });

    let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
    for date in dates.flatten() {
        bounds = Some(match bounds {
            None => (date, date),
            Some((min, max)) => (min.min(date), max.max(date)),
        });
    }

    match bounds {
        Some((min, max)) => DateRange::new(min, max),
        None => DateRange::calendar_year(today.year()),
    }
}

// ============================================
// Configuration
// ============================================

/// Geometry constants, in layout pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Lower bound for the drawing width before zoom is applied
    pub min_width: f64,
    pub min_height: f64,
    /// Bars never get narrower than this
    pub min_bar_width: f64,
    pub row_height: f64,
    /// Vertical inset of a bar inside its row
    pub bar_inset: f64,
    pub corner_radius: f64,
    /// Space reserved above the first row for the axis
    pub header_height: f64,
    pub brand_header_height: f64,
    pub zoom_step: f64,
    pub zoom_min: f64,
    pub zoom_max: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_width: 1000.0,
            min_height: 500.0,
            min_bar_width: 1.0,
            row_height: 50.0,
            bar_inset: 5.0,
            corner_radius: 5.0,
            header_height: 75.0,
            brand_header_height: 25.0,
            zoom_step: 1.2,
            zoom_min: 0.5,
            zoom_max: 8.0,
        }
    }
}

impl LayoutConfig {
    fn step(&self) -> f64 {
        if self.zoom_step.is_finite() && self.zoom_step > 1.0 {
            self.zoom_step
        } else {
            1.2
        }
    }

    fn floor(&self) -> f64 {
        if self.zoom_min.is_finite() && self.zoom_min > 0.0 {
            self.zoom_min
        } else {
            0.5
        }
    }

    fn ceiling(&self) -> f64 {
        if self.zoom_max.is_finite() && self.zoom_max >= self.floor() {
            self.zoom_max
        } else {
            self.floor().max(8.0)
        }
    }

    /// Bring any zoom value into `[zoom_min, zoom_max]`; NaN becomes 1
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        let zoom = if zoom.is_nan() { 1.0 } else { zoom };
        zoom.clamp(self.floor(), self.ceiling())
    }

    fn bar_min_width(&self) -> f64 {
        self.min_bar_width.max(1.0)
    }
}

// ============================================
// Horizontal scale
// ============================================

/// Linear date -> x mapping over a bounding range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    pub range: DateRange,
    /// Effective drawing width (zoom applied)
    pub width: f64,
    pub day_width: f64,
}

impl TimeScale {
    pub fn new(range: DateRange, pixel_width: f64, zoom: f64, config: &LayoutConfig) -> Self {
        let pixel_width = if pixel_width.is_finite() { pixel_width } else { 0.0 };
        let width = pixel_width.max(config.min_width.max(1.0)) * config.clamp_zoom(zoom);
        let day_width = width / range.total_days() as f64;
        Self {
            range,
            width,
            day_width,
        }
    }

    pub fn x(&self, date: NaiveDate) -> f64 {
        (date - self.range.start).num_days() as f64 * self.day_width
    }

    /// Date under a horizontal position, clamped to the range
    pub fn date_at(&self, x: f64) -> NaiveDate {
        let days = (x / self.day_width).floor();
        let days = days.clamp(0.0, (self.range.total_days() - 1) as f64) as i64;
        self.range.start + Duration::days(days)
    }
}

// ============================================
// Rows
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    BrandHeader(String),
    /// Index into the record slice the rows were computed from
    Product(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSlot {
    pub row: usize,
    pub kind: RowKind,
}

fn sort_by_start(records: &[ProductRecord], indices: &mut [usize]) {
    // Stable: ties and undated records keep input order
    indices.sort_by_key(|&i| match parse_date(records[i].start_date.as_deref()) {
        Some(date) => (0u8, date),
        None => (1u8, NaiveDate::MIN),
    });
}

/// Vertical order of the timeline. Undated records go last.
pub fn layout_rows(records: &[ProductRecord], group_by_brand: bool) -> Vec<RowSlot> {
    let mut groups: Vec<(Option<&str>, Vec<usize>)> = Vec::new();

    if group_by_brand {
        for (index, record) in records.iter().enumerate() {
            match groups
                .iter_mut()
                .find(|(brand, _)| *brand == Some(record.brand.as_str()))
            {
                Some((_, members)) => members.push(index),
                None => groups.push((Some(record.brand.as_str()), vec![index])),
            }
        }
    } else {
        groups.push((None, (0..records.len()).collect()));
    }

    let mut slots = Vec::with_capacity(records.len() + groups.len());
    for (brand, mut members) in groups {
        if let Some(brand) = brand {
            slots.push(RowSlot {
                row: slots.len(),
                kind: RowKind::BrandHeader(brand.to_string()),
            });
        }
        sort_by_start(records, &mut members);
        for index in members {
            slots.push(RowSlot {
                row: slots.len(),
                kind: RowKind::Product(index),
            });
        }
    }
    slots
}

// ============================================
// Bars
// ============================================

/// Horizontal extent of a product bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarSpan {
    pub x: f64,
    pub width: f64,
}

/// `None` unless both dates parse
pub fn layout_bar(record: &ProductRecord, scale: &TimeScale, config: &LayoutConfig) -> Option<BarSpan> {
    let start = parse_date(record.start_date.as_deref())?;
    let end = parse_date(record.end_date.as_deref())?;
    let x = scale.x(start);
    let width = (scale.x(end) - x).max(config.bar_min_width());
    Some(BarSpan { x, width })
}

/// Fill color of a bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill(pub u8, pub u8, pub u8);

impl Fill {
    pub const NEUTRAL: Fill = Fill(0xCC, 0xCC, 0xCC);
}

pub fn fill_for(kind: PlanningType) -> Fill {
    match kind {
        PlanningType::Feature => Fill(0x4C, 0xAF, 0x50),
        PlanningType::Promo => Fill(0x21, 0x96, 0xF3),
        PlanningType::Endcap => Fill(0xFF, 0xC1, 0x07),
        PlanningType::Sidekick => Fill(0x9C, 0x27, 0xB0),
        PlanningType::Markdown => Fill(0xF4, 0x43, 0x36),
        PlanningType::Unset => Fill::NEUTRAL,
    }
}

// ============================================
// Zoom & hover
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// One zoom step, clamped to the configured window
pub fn set_zoom(current: f64, direction: ZoomDirection, config: &LayoutConfig) -> f64 {
    let current = config.clamp_zoom(current);
    let next = match direction {
        ZoomDirection::In => current * config.step(),
        ZoomDirection::Out => current / config.step(),
    };
    config.clamp_zoom(next)
}

/// Interactive inputs owned by the host. Transitions return a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub zoom_factor: f64,
    pub hovered_id: Option<String>,
    pub group_by_brand: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom_factor: 1.0,
            hovered_id: None,
            group_by_brand: false,
        }
    }
}

impl ViewState {
    pub fn set_zoom(&self, direction: ZoomDirection, config: &LayoutConfig) -> Self {
        Self {
            zoom_factor: set_zoom(self.zoom_factor, direction, config),
            ..self.clone()
        }
    }

    pub fn set_hover(&self, id: Option<&str>) -> Self {
        Self {
            hovered_id: id.map(str::to_string),
            ..self.clone()
        }
    }

    pub fn set_grouping(&self, group_by_brand: bool) -> Self {
        Self {
            group_by_brand,
            ..self.clone()
        }
    }
}

/// Projection of the current product list through the view inputs.
/// Recomputed wholesale on every change, never patched.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineState {
    pub bounding_range: DateRange,
    pub zoom_factor: f64,
    pub row_assignment: Vec<RowSlot>,
    pub hovered_id: Option<String>,
}

impl TimelineState {
    pub fn derive(
        records: &[ProductRecord],
        view: &ViewState,
        config: &LayoutConfig,
        today: NaiveDate,
    ) -> Self {
        // A hover on a product that is no longer listed is dropped
        let hovered_id = view
            .hovered_id
            .as_ref()
            .filter(|id| records.iter().any(|r| &r.id == *id))
            .cloned();

        Self {
            bounding_range: compute_bounding_range(records, today),
            zoom_factor: config.clamp_zoom(view.zoom_factor),
            row_assignment: layout_rows(records, view.group_by_brand),
            hovered_id,
        }
    }
}

// ============================================
// Full layout
// ============================================

/// Available drawing size as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// Horizontal pixel span on screen. The axis, grid and holidays are only
    /// generated around it; `None` covers the whole range.
    pub window: Option<(f64, f64)>,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            window: None,
        }
    }

    pub fn with_window(self, from: f64, to: f64) -> Self {
        Self {
            window: Some((from.min(to), from.max(to))),
            ..self
        }
    }

    /// Unmeasurable sizes fall back to the configured minimum
    pub fn normalized(&self, config: &LayoutConfig) -> Self {
        let fix = |v: f64, min: f64| if v.is_finite() && v > 0.0 { v } else { min };
        Self {
            width: fix(self.width, config.min_width),
            height: fix(self.height, config.min_height),
            window: self.window,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Month,
    Week,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisLabel {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub kind: LabelKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Week,
    Month,
    Quarter,
    Holiday,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub x: f64,
    pub y_top: f64,
    pub y_bottom: f64,
    pub kind: LineKind,
}

impl LineKind {
    pub fn dashed(&self) -> bool {
        matches!(self, LineKind::Holiday)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrandHeader {
    pub label: String,
    pub row: usize,
    pub y: f64,
}

/// A drawable product rectangle
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub id: String,
    /// Index into the record slice
    pub record: usize,
    pub row: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub corner_radius: f64,
    pub fill: Fill,
    pub label: String,
}

impl Bar {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// Everything the rendering surface needs for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineLayout {
    pub scale: TimeScale,
    pub width: f64,
    pub height: f64,
    pub labels: Vec<AxisLabel>,
    pub lines: Vec<GridLine>,
    pub holidays: Vec<HolidayMarker>,
    pub headers: Vec<BrandHeader>,
    pub bars: Vec<Bar>,
    pub hovered_id: Option<String>,
}

/// Marks of a cadence closer than this many pixels are not generated
const MIN_MARK_SPACING: f64 = 1.0;

const MONTH_LABEL_Y: f64 = 15.0;
const WEEK_LABEL_Y: f64 = 30.0;
const GRID_TOP: f64 = 35.0;

impl TimelineLayout {
    /// Bar under a point, if any
    pub fn bar_at(&self, x: f64, y: f64) -> Option<&Bar> {
        self.bars.iter().find(|bar| bar.contains(x, y))
    }

    pub fn bar(&self, id: &str) -> Option<&Bar> {
        self.bars.iter().find(|bar| bar.id == id)
    }

    pub fn hovered_bar(&self) -> Option<&Bar> {
        self.hovered_id.as_deref().and_then(|id| self.bar(id))
    }

    /// Id of the bar `offset` positions away from the current hover,
    /// in row order. Wraps around.
    pub fn neighbour_bar(&self, current: Option<&str>, offset: isize) -> Option<&str> {
        if self.bars.is_empty() {
            return None;
        }
        let len = self.bars.len() as isize;
        let next = match current.and_then(|id| self.bars.iter().position(|b| b.id == id)) {
            Some(pos) => (pos as isize + offset).rem_euclid(len),
            None if offset < 0 => len - 1,
            None => 0,
        };
        Some(self.bars[next as usize].id.as_str())
    }
}

/// Whether the shortest month is at least a pixel wide
fn months_resolvable(scale: &TimeScale) -> bool {
    scale.day_width * 28.0 >= MIN_MARK_SPACING
}

/// Dates the axis is generated for, a week wider than the window on each side
fn axis_span(scale: &TimeScale, window: Option<(f64, f64)>) -> DateRange {
    let range = scale.range;
    let Some((from, to)) = window else {
        return range;
    };
    let margin = Duration::days(7);
    let start = scale.date_at(from);
    let end = scale.date_at(to);
    DateRange::new(
        start.checked_sub_signed(margin).unwrap_or(start).max(range.start),
        end.checked_add_signed(margin).unwrap_or(end).min(range.end),
    )
}

fn axis(scale: &TimeScale, span: DateRange, bottom: f64) -> (Vec<AxisLabel>, Vec<GridLine>) {
    let mut labels = Vec::new();
    let mut lines = Vec::new();
    let range = scale.range;

    if !months_resolvable(scale) {
        return (labels, lines);
    }

    // Months: first of each month that falls inside the range
    let mut month = NaiveDate::from_ymd_opt(span.start.year(), span.start.month(), 1)
        .unwrap_or(span.start);
    while month <= span.end {
        if month >= range.start {
            let x = scale.x(month);
            labels.push(AxisLabel {
                x,
                y: MONTH_LABEL_Y,
                text: month.format("%b").to_string(),
                kind: LabelKind::Month,
            });
            let kind = if (month.month() - 1) % 3 == 0 {
                LineKind::Quarter
            } else {
                LineKind::Month
            };
            lines.push(GridLine {
                x,
                y_top: GRID_TOP,
                y_bottom: bottom,
                kind,
            });
        }
        month = match month.checked_add_months(chrono::Months::new(1)) {
            Some(next) => next,
            None => break,
        };
    }

    if scale.day_width * 7.0 < MIN_MARK_SPACING {
        return (labels, lines);
    }

    // Weeks: every seven days from the range start
    let skipped_weeks = (span.start - range.start).num_days() / 7;
    let mut week = range.start + Duration::days(skipped_weeks * 7);
    while week <= span.end {
        let x = scale.x(week);
        labels.push(AxisLabel {
            x,
            y: WEEK_LABEL_Y,
            text: week.iso_week().week().to_string(),
            kind: LabelKind::Week,
        });
        lines.push(GridLine {
            x,
            y_top: GRID_TOP,
            y_bottom: bottom,
            kind: LineKind::Week,
        });
        week += Duration::days(7);
    }

    (labels, lines)
}

/// Full geometry for one frame
pub fn compute_layout(
    records: &[ProductRecord],
    state: &TimelineState,
    viewport: Viewport,
    config: &LayoutConfig,
) -> TimelineLayout {
    let viewport = viewport.normalized(config);
    let scale = TimeScale::new(state.bounding_range, viewport.width, state.zoom_factor, config);

    let mut headers = Vec::new();
    let mut bars = Vec::new();
    let mut y = config.header_height;

    for slot in &state.row_assignment {
        match &slot.kind {
            RowKind::BrandHeader(label) => {
                headers.push(BrandHeader {
                    label: label.clone(),
                    row: slot.row,
                    y,
                });
                y += config.brand_header_height;
            }
            RowKind::Product(index) => {
                let Some(record) = records.get(*index) else {
                    continue;
                };
                if let Some(span) = layout_bar(record, &scale, config) {
                    let inset = config.bar_inset.clamp(0.0, config.row_height / 2.0);
                    bars.push(Bar {
                        id: record.id.clone(),
                        record: *index,
                        row: slot.row,
                        x: span.x,
                        y: y + inset,
                        width: span.width,
                        height: (config.row_height - 2.0 * inset).max(1.0),
                        corner_radius: config.corner_radius,
                        fill: fill_for(record.planning_type),
                        label: record.display_name().to_string(),
                    });
                }
                y += config.row_height;
            }
        }
    }

    let height = viewport.height.max(y).max(config.min_height);
    let span = axis_span(&scale, viewport.window);
    let (labels, mut lines) = axis(&scale, span, height);
    let holidays = if months_resolvable(&scale) {
        compute_holiday_markers(&scale, span)
    } else {
        Vec::new()
    };
    lines.extend(holidays.iter().map(|marker| GridLine {
        x: marker.x,
        y_top: GRID_TOP,
        y_bottom: height,
        kind: LineKind::Holiday,
    }));

    let hovered_id = state
        .hovered_id
        .clone()
        .filter(|id| bars.iter().any(|bar| &bar.id == id));

    TimelineLayout {
        scale,
        width: scale.width,
        height,
        labels,
        lines,
        holidays,
        headers,
        bars,
        hovered_id,
    }
}

// ============================================
// Tooltip
// ============================================

/// Fields shown for the hovered product
#[derive(Debug, Clone, PartialEq)]
pub struct TooltipPayload {
    pub description: String,
    pub brand: String,
    pub start: String,
    pub end: String,
    pub planning_type: PlanningType,
    pub season: Season,
    pub retailers: Vec<String>,
    pub image: Option<String>,
}

impl TooltipPayload {
    pub fn from_record(record: &ProductRecord) -> Self {
        Self {
            description: record.display_name().to_string(),
            brand: record.brand.clone(),
            start: display_date(record.start_date.as_deref()),
            end: display_date(record.end_date.as_deref()),
            planning_type: record.planning_type,
            season: record.season,
            retailers: record.retailer.clone(),
            image: record.image.clone(),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
        vec![
            self.description.clone(),
            format!("Brand: {}", or_dash(&self.brand)),
            format!("Start: {}", self.start),
            format!("End: {}", self.end),
            format!("Type: {}", or_dash(self.planning_type.as_str())),
            format!("Season: {}", or_dash(self.season.as_str())),
            format!("Retailers: {}", or_dash(&self.retailers.join(", "))),
            format!("Image: {}", self.image.as_deref().unwrap_or("-")),
        ]
    }
}

/// Tooltip box positioned near the pointer
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub payload: TooltipPayload,
}

const TOOLTIP_OFFSET: f64 = 12.0;

impl Tooltip {
    /// Place the box below-right of the pointer, flipped or clamped so it
    /// stays inside the surface.
    pub fn place(
        payload: TooltipPayload,
        pointer: (f64, f64),
        size: (f64, f64),
        surface: (f64, f64),
    ) -> Self {
        let (px, py) = pointer;
        let (width, height) = size;
        let (surface_w, surface_h) = surface;

        let mut x = px + TOOLTIP_OFFSET;
        if x + width > surface_w {
            x = px - TOOLTIP_OFFSET - width;
        }
        let mut y = py + TOOLTIP_OFFSET;
        if y + height > surface_h {
            y = py - TOOLTIP_OFFSET - height;
        }

        Self {
            x: x.min(surface_w - width).max(0.0),
            y: y.min(surface_h - height).max(0.0),
            width,
            height,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32, m: u32, y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn product(id: &str, start: Option<&str>, end: Option<&str>) -> ProductRecord {
        ProductRecord {
            start_date: start.map(str::to_string),
            end_date: end.map(str::to_string),
            ..ProductRecord::new(id)
        }
    }

    fn branded(id: &str, brand: &str, start: &str) -> ProductRecord {
        ProductRecord {
            brand: brand.to_string(),
            start_date: Some(start.to_string()),
            end_date: Some(start.to_string()),
            ..ProductRecord::new(id)
        }
    }

    fn product_ids(records: &[ProductRecord], slots: &[RowSlot]) -> Vec<String> {
        slots
            .iter()
            .map(|slot| match &slot.kind {
                RowKind::Product(i) => records[*i].id.clone(),
                RowKind::BrandHeader(b) => format!("[{}]", b),
            })
            .collect()
    }

    #[test]
    fn test_parse_date_accepts_exact_format() {
        assert_eq!(parse_date(Some("01-09-2025")), Some(date(1, 9, 2025)));
        assert_eq!(parse_date(Some(" 29-02-2024 ")), Some(date(29, 2, 2024)));
    }

    #[test]
    fn test_parse_date_is_total() {
        for bad in [
            "",
            "31-02-2025",
            "29-02-2025",
            "2025-09-01",
            "1-9-2025",
            "01/09/2025",
            "01-13-2025",
            "aa-bb-cccc",
            "01-09-25",
            "01-09-2025x",
        ] {
            assert_eq!(parse_date(Some(bad)), None, "{bad:?} should not parse");
        }
        assert_eq!(parse_date(None), None);
    }

    #[test]
    fn test_display_date() {
        assert_eq!(display_date(None), "Not set");
        assert_eq!(display_date(Some("")), "Not set");
        assert_eq!(display_date(Some("32-01-2025")), "Invalid date");
        assert_eq!(display_date(Some("05-01-2025")), "05-01-2025");
    }

    #[test]
    fn test_bounding_range_covers_all_valid_dates() {
        let records = vec![
            product("A", Some("15-03-2025"), Some("20-04-2025")),
            product("B", Some("bogus"), Some("02-01-2026")),
            product("C", None, Some("01-02-2025")),
        ];
        let range = compute_bounding_range(&records, date(1, 1, 2030));
        assert_eq!(range.start, date(1, 2, 2025));
        assert_eq!(range.end, date(2, 1, 2026));
    }

    #[test]
    fn test_bounding_range_fallback_is_current_year() {
        let records = vec![product("A", None, Some("not a date")), product("B", None, None)];
        let range = compute_bounding_range(&records, date(16, 10, 2026));
        assert_eq!(range, DateRange::calendar_year(2026));
        assert_eq!(range.total_days(), 365);

        assert_eq!(compute_bounding_range(&[], date(1, 6, 2024)).total_days(), 366);
    }

    #[test]
    fn test_single_day_range_has_width() {
        let records = vec![product("A", Some("10-05-2025"), Some("10-05-2025"))];
        let range = compute_bounding_range(&records, date(1, 1, 2025));
        assert_eq!(range.total_days(), 1);
        let scale = TimeScale::new(range, 0.0, 1.0, &LayoutConfig::default());
        assert!(scale.day_width > 0.0);
        let span = layout_bar(&records[0], &scale, &LayoutConfig::default()).unwrap();
        assert_eq!(span.x, 0.0);
        assert_eq!(span.width, 1.0);
    }

    #[test]
    fn test_scale_x_is_linear_and_anchored() {
        let config = LayoutConfig::default();
        let range = DateRange::new(date(1, 1, 2025), date(31, 12, 2025));
        let x_at = |d: NaiveDate, width: f64, zoom: f64| TimeScale::new(range, width, zoom, &config).x(d);
        assert_eq!(x_at(range.start, 500.0, 1.0), 0.0);

        // 500px is below the minimum, so 1000px over 365 days
        let day = 1000.0 / 365.0;
        let x = x_at(date(11, 1, 2025), 500.0, 1.0);
        assert!((x - 10.0 * day).abs() < 1e-9);

        let zoomed = x_at(date(11, 1, 2025), 500.0, 2.0);
        assert!((zoomed - 2.0 * x).abs() < 1e-9);

        let mut last = f64::MIN;
        let mut d = range.start;
        while d <= range.end {
            let x = x_at(d, 1440.0, 1.3);
            assert!(x >= last);
            last = x;
            d += Duration::days(1);
        }
    }

    #[test]
    fn test_end_to_end_two_month_scenario() {
        let config = LayoutConfig::default();
        let records = vec![
            product("A", Some("01-01-2025"), Some("31-01-2025")),
            product("B", Some("01-02-2025"), Some("28-02-2025")),
        ];
        let range = compute_bounding_range(&records, date(1, 1, 2020));
        assert_eq!(range, DateRange::new(date(1, 1, 2025), date(28, 2, 2025)));

        let scale = TimeScale::new(range, 1000.0, 1.0, &config);
        let a = layout_bar(&records[0], &scale, &config).unwrap();
        let b = layout_bar(&records[1], &scale, &config).unwrap();
        assert_eq!(a.x, 0.0);
        assert!(b.x > a.x + a.width);
    }

    #[test]
    fn test_bar_end_never_before_start() {
        let config = LayoutConfig::default();
        let backwards = product("A", Some("20-03-2025"), Some("01-03-2025"));
        let range = DateRange::calendar_year(2025);
        let scale = TimeScale::new(range, 1000.0, 1.0, &config);
        let span = layout_bar(&backwards, &scale, &config).unwrap();
        assert_eq!(span.width, config.min_bar_width);

        let normal = product("B", Some("01-03-2025"), Some("20-03-2025"));
        let start = parse_date(normal.start_date.as_deref()).unwrap();
        let end = parse_date(normal.end_date.as_deref()).unwrap();
        assert!(scale.x(end) >= scale.x(start));
    }

    #[test]
    fn test_unparsable_dates_produce_no_bar() {
        let config = LayoutConfig::default();
        let scale = TimeScale::new(DateRange::calendar_year(2025), 1000.0, 1.0, &config);
        assert!(layout_bar(&product("A", None, Some("01-01-2025")), &scale, &config).is_none());
        assert!(layout_bar(&product("B", Some("01-01-2025"), Some("31-02-2025")), &scale, &config).is_none());
    }

    #[test]
    fn test_rows_sorted_by_start_with_undated_last() {
        let records = vec![
            product("U1", None, None),
            product("C", Some("01-03-2025"), None),
            product("A", Some("01-01-2025"), None),
            product("U2", Some("garbage"), None),
            product("B1", Some("01-02-2025"), None),
            product("B2", Some("01-02-2025"), None),
        ];
        let slots = layout_rows(&records, false);
        assert_eq!(
            product_ids(&records, &slots),
            vec!["A", "B1", "B2", "C", "U1", "U2"]
        );
        assert!(slots.iter().enumerate().all(|(i, s)| s.row == i));
    }

    #[test]
    fn test_rows_grouped_by_brand_in_first_seen_order() {
        let records = vec![
            branded("f2", "FUGGLER", "01-05-2025"),
            branded("s1", "5 SURPRISE", "01-03-2025"),
            branded("f1", "FUGGLER", "01-01-2025"),
            branded("s2", "5 SURPRISE", "01-02-2025"),
        ];
        let slots = layout_rows(&records, true);
        assert_eq!(
            product_ids(&records, &slots),
            vec!["[FUGGLER]", "f1", "f2", "[5 SURPRISE]", "s2", "s1"]
        );
    }

    #[test]
    fn test_zoom_is_monotone_and_clamped() {
        let config = LayoutConfig::default();

        let mut zoom = 1.0;
        for _ in 0..50 {
            let next = set_zoom(zoom, ZoomDirection::Out, &config);
            assert!(next >= config.zoom_min);
            assert!(next <= zoom);
            zoom = next;
        }
        assert_eq!(zoom, config.zoom_min);
        assert_eq!(set_zoom(zoom, ZoomDirection::Out, &config), zoom);

        let mut zoom = 1.0;
        while zoom * config.zoom_step <= config.zoom_max {
            let next = set_zoom(zoom, ZoomDirection::In, &config);
            assert!(next > zoom);
            zoom = next;
        }
        let capped = set_zoom(set_zoom(zoom, ZoomDirection::In, &config), ZoomDirection::In, &config);
        assert_eq!(capped, config.zoom_max);
    }

    #[test]
    fn test_zoom_never_non_positive() {
        let config = LayoutConfig {
            zoom_min: -3.0,
            zoom_step: 0.5,
            ..LayoutConfig::default()
        };
        let mut zoom = 1.0;
        for _ in 0..100 {
            zoom = set_zoom(zoom, ZoomDirection::Out, &config);
            assert!(zoom > 0.0);
        }
        assert!(set_zoom(f64::NAN, ZoomDirection::In, &config) > 0.0);
    }

    #[test]
    fn test_view_state_transitions() {
        let config = LayoutConfig::default();
        let view = ViewState::default();
        let hovered = view.set_hover(Some("A"));
        assert_eq!(hovered.hovered_id.as_deref(), Some("A"));
        assert_eq!(view.hovered_id, None);
        assert_eq!(hovered.set_hover(None).hovered_id, None);

        let zoomed = hovered.set_zoom(ZoomDirection::In, &config);
        assert!((zoomed.zoom_factor - 1.2).abs() < 1e-12);
        assert_eq!(zoomed.hovered_id.as_deref(), Some("A"));
    }

    #[test]
    fn test_state_drops_hover_for_missing_product() {
        let records = vec![product("A", Some("01-01-2025"), Some("02-01-2025"))];
        let view = ViewState::default().set_hover(Some("gone"));
        let state = TimelineState::derive(&records, &view, &LayoutConfig::default(), date(1, 1, 2025));
        assert_eq!(state.hovered_id, None);
        assert_eq!(state.row_assignment[0].kind, RowKind::Product(0));
    }

    #[test]
    fn test_axis_is_generated_around_the_window() {
        let config = LayoutConfig::default();
        let records = vec![product("A", Some("01-01-2025"), Some("31-12-2025"))];
        let view = ViewState {
            zoom_factor: 8.0,
            ..ViewState::default()
        };
        let state = TimelineState::derive(&records, &view, &config, date(1, 1, 2025));
        let viewport = Viewport::new(800.0, 400.0);
        let full = compute_layout(&records, &state, viewport, &config);
        let windowed = compute_layout(&records, &state, viewport.with_window(4000.0, 4800.0), &config);

        assert_eq!(full.width, 8000.0);
        assert_eq!(full.holidays.len(), 5);
        assert!(windowed.holidays.is_empty());
        assert_eq!(windowed.bars, full.bars);

        let months: Vec<&str> = windowed
            .labels
            .iter()
            .filter(|l| l.kind == LabelKind::Month)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(months, vec!["Jun", "Jul", "Aug"]);
        assert!(windowed.labels.len() < full.labels.len());

        let day = full.scale.day_width;
        assert!(windowed
            .labels
            .iter()
            .all(|l| l.x >= 4000.0 - 31.0 * day && l.x <= 4800.0 + 8.0 * day));
    }

    #[test]
    fn test_sub_pixel_marks_are_not_generated() {
        // A year typo stretches the range over two millennia
        let config = LayoutConfig::default();
        let records = vec![product("A", Some("01-09-0025"), Some("30-11-2025"))];
        let state = TimelineState::derive(&records, &ViewState::default(), &config, date(1, 1, 2025));
        let layout = compute_layout(
            &records,
            &state,
            Viewport::new(800.0, 400.0).with_window(0.0, 800.0),
            &config,
        );

        assert_eq!(layout.bars.len(), 1);
        assert!(layout.labels.is_empty());
        assert!(layout.lines.is_empty());
        assert!(layout.holidays.is_empty());
    }

    #[test]
    fn test_layout_bars_and_hit_test() {
        let config = LayoutConfig::default();
        let records = vec![
            product("A", Some("01-01-2025"), Some("31-01-2025")),
            product("X", None, None),
            product("B", Some("01-02-2025"), Some("28-02-2025")),
        ];
        let view = ViewState::default().set_hover(Some("B"));
        let state = TimelineState::derive(&records, &view, &config, date(1, 1, 2025));
        let layout = compute_layout(&records, &state, Viewport::new(800.0, 0.0), &config);

        assert_eq!(layout.width, 1000.0);
        assert_eq!(layout.bars.len(), 2);
        assert!(layout.height >= config.min_height);

        let b = layout.bar("B").unwrap();
        assert_eq!(b.row, 1);
        assert_eq!(b.y, config.header_height + config.row_height + config.bar_inset);
        let hit = layout.bar_at(b.x + 1.0, b.y + 1.0).unwrap();
        assert_eq!(hit.id, "B");
        assert!(layout.bar_at(b.x + 1.0, 1.0).is_none());
        assert_eq!(layout.hovered_bar().map(|b| b.id.as_str()), Some("B"));

        assert_eq!(layout.neighbour_bar(Some("B"), 1), Some("A"));
        assert_eq!(layout.neighbour_bar(None, -1), Some("B"));
    }

    #[test]
    fn test_layout_axis_and_colors() {
        let config = LayoutConfig::default();
        let records = vec![ProductRecord {
            planning_type: PlanningType::Promo,
            ..product("A", Some("15-01-2025"), Some("15-04-2025"))
        }];
        let state = TimelineState::derive(&records, &ViewState::default(), &config, date(1, 1, 2025));
        let layout = compute_layout(&records, &state, Viewport::default(), &config);

        let months: Vec<&str> = layout
            .labels
            .iter()
            .filter(|l| l.kind == LabelKind::Month)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(months, vec!["Feb", "Mar", "Apr"]);
        assert!(layout.lines.iter().any(|l| l.kind == LineKind::Quarter));
        assert_eq!(layout.bars[0].fill, Fill(0x21, 0x96, 0xF3));
        assert_eq!(fill_for(PlanningType::Unset), Fill::NEUTRAL);
        // Valentine's Day is inside, Easter (20 Apr) is not
        assert_eq!(layout.holidays.len(), 1);
        assert!(layout.lines.iter().any(|l| l.kind.dashed()));
    }

    #[test]
    fn test_viewport_fallback() {
        let config = LayoutConfig::default();
        let v = Viewport::new(0.0, f64::NAN).normalized(&config);
        assert_eq!(v.width, config.min_width);
        assert_eq!(v.height, config.min_height);
    }

    #[test]
    fn test_tooltip_stays_on_surface() {
        let payload = TooltipPayload::from_record(&product("A", Some("01-01-2025"), None));
        assert_eq!(payload.end, "Not set");

        let tip = Tooltip::place(payload.clone(), (10.0, 10.0), (200.0, 100.0), (1000.0, 500.0));
        assert_eq!((tip.x, tip.y), (22.0, 22.0));

        let tip = Tooltip::place(payload, (990.0, 490.0), (200.0, 100.0), (1000.0, 500.0));
        assert!(tip.x + tip.width <= 1000.0);
        assert!(tip.y + tip.height <= 500.0);
    }
}
