//! Application state and event handling.
//!
//! A centralized App struct holds all state; key and mouse events mutate it
//! and may return a command for the background API worker.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use tracing::{info, warn};

use crate::api::{ApiCommand, ApiMessage};
use crate::config::Config;
use crate::dashboard::{Dashboard, Filters};
use crate::layout::{
    compute_layout, format_date, parse_date, LayoutConfig, TimelineLayout, TimelineState, ZoomDirection,
    DATE_FORMAT,
};
use crate::models::{ProductRecord, Retailer};
use crate::sheet;
use crate::store::PlanningStore;
use crate::timeline::TimelineView;

/// File name used by the export shortcut
pub const EXPORT_FILE: &str = "product_planning.csv";

/// Active tab in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    /// Gantt view (default)
    #[default]
    Timeline,
    Products,
    Retailers,
}

impl Tab {
    pub fn next(&self) -> Self {
        match self {
            Tab::Timeline => Tab::Products,
            Tab::Products => Tab::Retailers,
            Tab::Retailers => Tab::Timeline,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Tab::Timeline => Tab::Retailers,
            Tab::Products => Tab::Timeline,
            Tab::Retailers => Tab::Products,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tab::Timeline => "Timeline",
            Tab::Products => "Products",
            Tab::Retailers => "Retailers",
        }
    }

    pub fn all() -> [Tab; 3] {
        [Tab::Timeline, Tab::Products, Tab::Retailers]
    }
}

/// Input mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    /// A form is open
    Editing,
    /// Confirmation dialog
    Confirming,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormType {
    EditProduct(String),
    AddRetailer,
    RetailerLogo(String),
    Filters,
    Import,
}

impl FormType {
    pub fn title(&self) -> &'static str {
        match self {
            FormType::EditProduct(_) => "Edit Product",
            FormType::AddRetailer => "Add Retailer",
            FormType::RetailerLogo(_) => "Retailer Logo",
            FormType::Filters => "Filters",
            FormType::Import => "Import Sheet",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    ItemNumber,
    Description,
    Brand,
    Image,
    StartDate,
    EndDate,
    PlanningType,
    Season,
    Retailers,
    RetailerName,
    RetailerLogo,
    FilterStart,
    FilterEnd,
    FilterBrands,
    FilterRetailers,
    ImportPath,
    SubmitButton,
    CancelButton,
}

impl FormField {
    pub fn product_fields() -> &'static [FormField] {
        &[
            FormField::ItemNumber,
            FormField::Description,
            FormField::Brand,
            FormField::Image,
            FormField::StartDate,
            FormField::EndDate,
            FormField::PlanningType,
            FormField::Season,
            FormField::Retailers,
            FormField::SubmitButton,
            FormField::CancelButton,
        ]
    }

    pub fn retailer_fields() -> &'static [FormField] {
        &[
            FormField::RetailerName,
            FormField::RetailerLogo,
            FormField::SubmitButton,
            FormField::CancelButton,
        ]
    }

    pub fn logo_fields() -> &'static [FormField] {
        &[FormField::RetailerLogo, FormField::SubmitButton, FormField::CancelButton]
    }

    pub fn filter_fields() -> &'static [FormField] {
        &[
            FormField::FilterBrands,
            FormField::FilterRetailers,
            FormField::FilterStart,
            FormField::FilterEnd,
            FormField::SubmitButton,
            FormField::CancelButton,
        ]
    }

    pub fn import_fields() -> &'static [FormField] {
        &[FormField::ImportPath, FormField::SubmitButton, FormField::CancelButton]
    }

    pub fn label(&self) -> &'static str {
        match self {
            FormField::ItemNumber => "Item Number",
            FormField::Description => "Description",
            FormField::Brand => "Brand",
            FormField::Image => "Image",
            FormField::StartDate => "Start Date",
            FormField::EndDate => "End Date",
            FormField::PlanningType => "Planning Type",
            FormField::Season => "Season",
            FormField::Retailers => "Retailers",
            FormField::RetailerName => "Name",
            FormField::RetailerLogo => "Logo",
            FormField::FilterStart => "From",
            FormField::FilterEnd => "To",
            FormField::FilterBrands => "Brands",
            FormField::FilterRetailers => "Retailers",
            FormField::ImportPath => "Sheet File",
            FormField::SubmitButton => "Save",
            FormField::CancelButton => "Cancel",
        }
    }

    pub fn is_text_input(&self) -> bool {
        matches!(
            self,
            FormField::ItemNumber
                | FormField::Description
                | FormField::Brand
                | FormField::Image
                | FormField::RetailerName
                | FormField::RetailerLogo
                | FormField::ImportPath
        )
    }

    /// Typed as `DD-MM-YYYY` or stepped with the arrow keys
    pub fn is_date_picker(&self) -> bool {
        matches!(
            self,
            FormField::StartDate | FormField::EndDate | FormField::FilterStart | FormField::FilterEnd
        )
    }

    /// Cycled with Up/Down
    pub fn is_selector(&self) -> bool {
        matches!(self, FormField::PlanningType | FormField::Season)
    }

    /// Several options, Up/Down moves the cursor and Space toggles
    pub fn is_multi_select(&self) -> bool {
        matches!(
            self,
            FormField::Retailers | FormField::FilterBrands | FormField::FilterRetailers
        )
    }

    pub fn is_button(&self) -> bool {
        matches!(self, FormField::SubmitButton | FormField::CancelButton)
    }
}

/// State for the form modal
#[derive(Debug, Clone)]
pub struct FormState {
    pub form_type: FormType,
    pub focused_field: usize,
    pub fields: Vec<FormField>,
    /// Validation error message
    pub error: Option<String>,
    /// Product being edited
    pub product: ProductRecord,
    pub start_date: String,
    pub end_date: String,
    pub retailer_name: String,
    pub retailer_logo: String,
    pub filter_start: String,
    pub filter_end: String,
    pub selected_brands: Vec<String>,
    pub selected_retailers: Vec<String>,
    pub brand_options: Vec<String>,
    pub retailer_options: Vec<String>,
    /// Cursor inside the focused multi-select
    pub option_cursor: usize,
    pub import_path: String,
    /// Date stepping falls back to this when a field is empty
    today: NaiveDate,
}

impl FormState {
    fn empty(form_type: FormType, fields: &[FormField], today: NaiveDate) -> Self {
        Self {
            form_type,
            focused_field: 0,
            fields: fields.to_vec(),
            error: None,
            product: ProductRecord::default(),
            start_date: String::new(),
            end_date: String::new(),
            retailer_name: String::new(),
            retailer_logo: String::new(),
            filter_start: String::new(),
            filter_end: String::new(),
            selected_brands: Vec::new(),
            selected_retailers: Vec::new(),
            brand_options: Vec::new(),
            retailer_options: Vec::new(),
            option_cursor: 0,
            import_path: String::new(),
            today,
        }
    }

    pub fn new_edit_product(product: &ProductRecord, retailers: &[Retailer], today: NaiveDate) -> Self {
        let mut options: Vec<String> = retailers.iter().map(|r| r.name.clone()).collect();
        // Keep retailers the product references even if they were removed
        for name in &product.retailer {
            if !options.contains(name) {
                options.push(name.clone());
            }
        }
        Self {
            product: product.clone(),
            start_date: product.start_date.clone().unwrap_or_default(),
            end_date: product.end_date.clone().unwrap_or_default(),
            selected_retailers: product.retailer.clone(),
            retailer_options: options,
            ..Self::empty(
                FormType::EditProduct(product.id.clone()),
                FormField::product_fields(),
                today,
            )
        }
    }

    pub fn new_add_retailer(today: NaiveDate) -> Self {
        Self::empty(FormType::AddRetailer, FormField::retailer_fields(), today)
    }

    pub fn new_retailer_logo(retailer: &Retailer, today: NaiveDate) -> Self {
        Self {
            retailer_name: retailer.name.clone(),
            retailer_logo: retailer.logo.clone().unwrap_or_default(),
            ..Self::empty(
                FormType::RetailerLogo(retailer.name.clone()),
                FormField::logo_fields(),
                today,
            )
        }
    }

    pub fn new_filters(dashboard: &Dashboard, today: NaiveDate) -> Self {
        let filters = &dashboard.filters;
        Self {
            filter_start: filters.start.map(format_date).unwrap_or_default(),
            filter_end: filters.end.map(format_date).unwrap_or_default(),
            selected_brands: filters.brands.clone(),
            selected_retailers: filters.retailers.clone(),
            brand_options: dashboard.brands(),
            retailer_options: dashboard.retailers.iter().map(|r| r.name.clone()).collect(),
            ..Self::empty(FormType::Filters, FormField::filter_fields(), today)
        }
    }

    pub fn new_import(default_path: String, today: NaiveDate) -> Self {
        Self {
            import_path: default_path,
            ..Self::empty(FormType::Import, FormField::import_fields(), today)
        }
    }

    pub fn current_field(&self) -> FormField {
        self.fields
            .get(self.focused_field)
            .copied()
            .unwrap_or(FormField::CancelButton)
    }

    pub fn next_field(&mut self) {
        self.focused_field = (self.focused_field + 1) % self.fields.len();
        self.option_cursor = 0;
    }

    pub fn prev_field(&mut self) {
        self.focused_field = self.focused_field.checked_sub(1).unwrap_or(self.fields.len() - 1);
        self.option_cursor = 0;
    }

    /// Text behind the focused field, dates included
    pub fn current_text_mut(&mut self) -> Option<&mut String> {
        match self.current_field() {
            FormField::ItemNumber => Some(&mut self.product.item_number),
            FormField::Description => Some(&mut self.product.description),
            FormField::Brand => Some(&mut self.product.brand),
            FormField::Image => Some(self.product.image.get_or_insert_with(String::new)),
            FormField::StartDate => Some(&mut self.start_date),
            FormField::EndDate => Some(&mut self.end_date),
            FormField::RetailerName => Some(&mut self.retailer_name),
            FormField::RetailerLogo => Some(&mut self.retailer_logo),
            FormField::FilterStart => Some(&mut self.filter_start),
            FormField::FilterEnd => Some(&mut self.filter_end),
            FormField::ImportPath => Some(&mut self.import_path),
            _ => None,
        }
    }

    pub fn handle_char(&mut self, c: char) {
        let date = self.current_field().is_date_picker();
        if let Some(text) = self.current_text_mut() {
            // Date fields only take what DD-MM-YYYY is made of
            if !date || (c.is_ascii_digit() || c == '-') && text.len() < 10 {
                text.push(c);
            }
        }
    }

    pub fn handle_backspace(&mut self) {
        if let Some(text) = self.current_text_mut() {
            text.pop();
        }
    }

    /// Shift the focused date field by a number of days
    pub fn step_date(&mut self, days: i64) {
        let today = self.today;
        let field = match self.current_field() {
            FormField::StartDate => &mut self.start_date,
            FormField::EndDate => &mut self.end_date,
            FormField::FilterStart => &mut self.filter_start,
            FormField::FilterEnd => &mut self.filter_end,
            _ => return,
        };
        *field = Self::add_days_to_date_string(field, days, today);
    }

    /// Add days to a `DD-MM-YYYY` string; unreadable input restarts at today
    fn add_days_to_date_string(date_str: &str, days: i64, today: NaiveDate) -> String {
        match parse_date(Some(date_str)) {
            Some(date) => (date + chrono::Duration::days(days)).format(DATE_FORMAT).to_string(),
            None => format_date(today),
        }
    }

    pub fn cycle_selector(&mut self, forward: bool) {
        match self.current_field() {
            FormField::PlanningType => {
                self.product.planning_type = if forward {
                    self.product.planning_type.next()
                } else {
                    self.product.planning_type.previous()
                };
            }
            FormField::Season => {
                // Three values, stepping twice goes back one
                self.product.season = if forward {
                    self.product.season.next()
                } else {
                    self.product.season.next().next()
                };
            }
            _ => {}
        }
    }

    /// Options and selection of the focused multi-select
    pub fn multi_select(&self) -> Option<(&[String], &[String])> {
        match self.current_field() {
            FormField::Retailers | FormField::FilterRetailers => {
                Some((self.retailer_options.as_slice(), self.selected_retailers.as_slice()))
            }
            FormField::FilterBrands => Some((self.brand_options.as_slice(), self.selected_brands.as_slice())),
            _ => None,
        }
    }

    pub fn move_option_cursor(&mut self, forward: bool) {
        let Some((options, _)) = self.multi_select() else {
            return;
        };
        let total = options.len();
        if total == 0 {
            return;
        }
        self.option_cursor = if forward {
            (self.option_cursor + 1) % total
        } else {
            self.option_cursor.checked_sub(1).unwrap_or(total - 1)
        };
    }

    pub fn toggle_option(&mut self) {
        let (options, selected) = match self.current_field() {
            FormField::Retailers | FormField::FilterRetailers => {
                (&self.retailer_options, &mut self.selected_retailers)
            }
            FormField::FilterBrands => (&self.brand_options, &mut self.selected_brands),
            _ => return,
        };
        let Some(option) = options.get(self.option_cursor) else {
            return;
        };
        match selected.iter().position(|s| s == option) {
            Some(pos) => {
                selected.remove(pos);
            }
            None => selected.push(option.clone()),
        }
    }

    /// Product as entered; blank dates become absent
    pub fn build_product(&self) -> ProductRecord {
        let date = |text: &str| Some(text.trim().to_string()).filter(|t| !t.is_empty());
        let mut product = self.product.clone();
        product.item_number = product.item_number.trim().to_string();
        product.brand = product.brand.trim().to_string();
        product.image = product.image.filter(|i| !i.trim().is_empty());
        product.start_date = date(&self.start_date);
        product.end_date = date(&self.end_date);
        // Keep the order of the retailer list
        product.retailer = self
            .retailer_options
            .iter()
            .filter(|r| self.selected_retailers.contains(r))
            .cloned()
            .collect();
        product
    }

    pub fn build_filters(&self) -> Result<Filters, &'static str> {
        let date = |text: &str| -> Result<Option<NaiveDate>, &'static str> {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            parse_date(Some(text)).map(Some).ok_or("Dates must be DD-MM-YYYY")
        };
        let start = date(&self.filter_start)?;
        let end = date(&self.filter_end)?;
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err("End date must be after start date");
            }
        }
        Ok(Filters {
            brands: self.selected_brands.clone(),
            retailers: self.selected_retailers.clone(),
            start,
            end,
        })
    }
}

/// What a confirmation applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmTarget {
    Product(String),
    Retailer(String),
    ResetGantt,
}

#[derive(Debug, Clone)]
pub struct ConfirmDialog {
    pub title: String,
    pub message: String,
    pub target: ConfirmTarget,
    /// Whether "Yes" is focused (false = "No" is focused)
    pub yes_focused: bool,
}

impl ConfirmDialog {
    pub fn new_delete_product(product: &ProductRecord) -> Self {
        Self {
            title: "Remove Product".to_string(),
            message: format!("Remove \"{}\" from the planning?", product.display_name()),
            target: ConfirmTarget::Product(product.id.clone()),
            yes_focused: false,
        }
    }

    pub fn new_delete_retailer(name: &str) -> Self {
        Self {
            title: "Remove Retailer".to_string(),
            message: format!("Remove \"{}\"?\nIt is also removed from every product.", name),
            target: ConfirmTarget::Retailer(name.to_string()),
            yes_focused: false,
        }
    }

    pub fn new_reset_gantt() -> Self {
        Self {
            title: "Reset Gantt Chart".to_string(),
            message: "Clear dates, retailers and planning type of every product?\nThis action cannot be undone."
                .to_string(),
            target: ConfirmTarget::ResetGantt,
            yes_focused: false,
        }
    }
}

/// Error popup state
#[derive(Debug, Clone)]
pub struct ErrorPopup {
    pub title: String,
    pub message: String,
    pub shown_at: Instant,
    /// Auto-dismiss duration (None for manual dismiss)
    pub auto_dismiss: Option<Duration>,
}

impl ErrorPopup {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            shown_at: Instant::now(),
            auto_dismiss: Some(Duration::from_secs(5)),
        }
    }

    pub fn should_dismiss(&self) -> bool {
        self.auto_dismiss
            .is_some_and(|duration| self.shown_at.elapsed() > duration)
    }
}

/// Log entry for the message area
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Local>,
    pub message: String,
    pub level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogEntry {
    fn with_level(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Local::now(),
            message: message.into(),
            level,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::with_level(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::with_level(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_level(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_level(LogLevel::Error, message)
    }
}

/// Main application state
#[derive(Debug)]
pub struct App {
    pub should_quit: bool,
    pub active_tab: Tab,
    pub input_mode: InputMode,

    pub dashboard: Dashboard,
    pub timeline: TimelineView,
    pub layout_config: LayoutConfig,
    store: PlanningStore,
    /// Unsaved changes
    pub dirty: bool,

    pub error_popup: Option<ErrorPopup>,
    pub form_state: Option<FormState>,
    pub confirm_dialog: Option<ConfirmDialog>,

    pub logs: Vec<LogEntry>,
    /// Maximum number of log entries to keep
    max_logs: usize,

    /// Selected index in the product and retailer lists
    pub list_selected: usize,

    /// Image proxy reachability
    pub proxy_connected: bool,
    /// Image lookups in flight
    pub pending_lookups: usize,

    pub today: NaiveDate,
    pub show_help: bool,
}

impl App {
    pub fn new(config: &Config, dashboard: Dashboard, store: PlanningStore) -> Self {
        let layout_config = config.timeline.clone();
        let mut app = Self {
            should_quit: false,
            active_tab: Tab::Timeline,
            input_mode: InputMode::Normal,
            timeline: TimelineView::new(&config.terminal, &layout_config, config.group_by_brand),
            layout_config,
            dashboard,
            store,
            dirty: false,
            error_popup: None,
            form_state: None,
            confirm_dialog: None,
            logs: Vec::new(),
            max_logs: 100,
            list_selected: 0,
            proxy_connected: false,
            pending_lookups: 0,
            today: chrono::Local::now().date_naive(),
            show_help: false,
        };

        app.log(LogEntry::info("Planning dashboard initialized"));
        app.log(LogEntry::info(format!(
            "{} products, {} retailers",
            app.dashboard.products.len(),
            app.dashboard.retailers.len()
        )));
        app
    }

    pub fn log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
        if self.logs.len() > self.max_logs {
            self.logs.remove(0);
        }
    }

    pub fn show_error(&mut self, title: impl Into<String>, message: impl Into<String>) {
        let title = title.into();
        let message = message.into();
        self.log(LogEntry::error(format!("{}: {}", title, message)));
        self.error_popup = Some(ErrorPopup::new(title, message));
    }

    pub fn dismiss_error(&mut self) {
        self.error_popup = None;
    }

    /// Filtered products and their layout for the current frame
    pub fn timeline_layout(&self) -> (Vec<ProductRecord>, TimelineLayout) {
        let records = self.dashboard.filtered_products();
        let state = TimelineState::derive(&records, &self.timeline.view, &self.layout_config, self.today);
        let layout = compute_layout(&records, &state, self.timeline.viewport(), &self.layout_config);
        (records, layout)
    }

    /// Product the current tab points at
    fn selected_product(&self) -> Option<&ProductRecord> {
        match self.active_tab {
            Tab::Timeline => self
                .timeline
                .view
                .hovered_id
                .as_deref()
                .and_then(|id| self.dashboard.product(id)),
            Tab::Products => self.dashboard.products.get(self.list_selected),
            Tab::Retailers => None,
        }
    }

    fn selected_retailer(&self) -> Option<&Retailer> {
        match self.active_tab {
            Tab::Retailers => self.dashboard.retailers.get(self.list_selected),
            _ => None,
        }
    }

    fn open_form(&mut self, form: FormState) {
        self.form_state = Some(form);
        self.input_mode = InputMode::Editing;
    }

    /// Add a product and open it for editing
    pub fn add_product(&mut self) {
        let id = self.dashboard.add_product(chrono::Utc::now().timestamp_millis());
        self.dirty = true;
        self.log(LogEntry::success(format!("Product {} added", id)));
        if let Some(pos) = self.dashboard.products.iter().position(|p| p.id == id) {
            self.list_selected = pos;
        }
        if let Some(product) = self.dashboard.product(&id) {
            let form = FormState::new_edit_product(product, &self.dashboard.retailers, self.today);
            self.open_form(form);
        }
    }

    pub fn open_edit_form(&mut self) {
        if let Some(retailer) = self.selected_retailer() {
            let form = FormState::new_retailer_logo(retailer, self.today);
            self.open_form(form);
            return;
        }
        if let Some(product) = self.selected_product() {
            let form = FormState::new_edit_product(product, &self.dashboard.retailers, self.today);
            self.open_form(form);
        }
    }

    pub fn open_delete_confirm(&mut self) {
        let dialog = if let Some(retailer) = self.selected_retailer() {
            Some(ConfirmDialog::new_delete_retailer(&retailer.name))
        } else {
            self.selected_product().map(ConfirmDialog::new_delete_product)
        };
        if let Some(dialog) = dialog {
            self.confirm_dialog = Some(dialog);
            self.input_mode = InputMode::Confirming;
        }
    }

    pub fn close_form(&mut self) {
        self.form_state = None;
        self.input_mode = InputMode::Normal;
    }

    pub fn close_confirm(&mut self) {
        self.confirm_dialog = None;
        self.input_mode = InputMode::Normal;
    }

    /// Queue an image lookup for the selected product
    pub fn request_image_lookup(&mut self) -> Option<ApiCommand> {
        let product = self.selected_product()?;
        let command = ApiCommand::LookupImage {
            product_id: product.id.clone(),
            item_number: product.lookup_key().to_string(),
        };
        let message = format!("Looking up image for {}...", product.lookup_key());
        self.pending_lookups += 1;
        self.log(LogEntry::info(message));
        Some(command)
    }

    pub fn handle_api_message(&mut self, message: ApiMessage) {
        match message {
            ApiMessage::ImageFound { product_id, url } => {
                self.pending_lookups = self.pending_lookups.saturating_sub(1);
                if self.dashboard.set_product_image(&product_id, url) {
                    self.dirty = true;
                    self.log(LogEntry::success(format!("Image found for {}", product_id)));
                } else {
                    self.log(LogEntry::warning(format!("{} no longer exists", product_id)));
                }
            }
            ApiMessage::ImageNotFound { product_id } => {
                self.pending_lookups = self.pending_lookups.saturating_sub(1);
                self.log(LogEntry::warning(format!("No image found for {}", product_id)));
            }
            ApiMessage::Error(error) => {
                self.pending_lookups = self.pending_lookups.saturating_sub(1);
                self.show_error("Image Lookup Error", error);
            }
            ApiMessage::ConnectionStatus(connected) => {
                let was_connected = self.proxy_connected;
                self.proxy_connected = connected;
                if connected && !was_connected {
                    self.log(LogEntry::success("Image proxy reachable"));
                } else if !connected && was_connected {
                    self.log(LogEntry::warning("Image proxy unreachable"));
                }
            }
        }
    }

    pub fn save(&mut self) -> anyhow::Result<()> {
        self.store.save(&self.dashboard.products, &self.dashboard.retailers)?;
        self.dirty = false;
        self.log(LogEntry::success(format!(
            "Planning saved to {}",
            self.store.dir().display()
        )));
        Ok(())
    }

    fn save_or_report(&mut self) {
        if let Err(e) = self.save() {
            warn!(error = %e, "save failed");
            self.show_error("Save Failed", e.to_string());
        }
    }

    pub fn export_path(&self) -> PathBuf {
        self.store.dir().join(EXPORT_FILE)
    }

    fn export(&mut self) {
        let path = self.export_path();
        let result = std::fs::create_dir_all(self.store.dir())
            .map_err(anyhow::Error::from)
            .and_then(|_| sheet::export_to_path(&self.dashboard.products, &path));
        match result {
            Ok(()) => self.log(LogEntry::success(format!("Exported to {}", path.display()))),
            Err(e) => self.show_error("Export Failed", format!("{:#}", e)),
        }
    }

    fn import(&mut self, path: &str) {
        let stamp = chrono::Utc::now().timestamp_millis();
        match sheet::import_from_path(std::path::Path::new(path), stamp) {
            Ok(products) => {
                let count = self.dashboard.import(products);
                self.dirty = true;
                self.close_form();
                self.log(LogEntry::success(format!("Imported {} products", count)));
            }
            Err(e) => {
                if let Some(form) = &mut self.form_state {
                    form.error = Some(e.to_string());
                }
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<ApiCommand> {
        if self.error_popup.is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ')) {
                self.dismiss_error();
            }
            return None;
        }

        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Enter) {
                self.show_help = false;
            }
            return None;
        }

        match self.input_mode {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::Editing => {
                self.handle_editing_key(key);
                None
            }
            InputMode::Confirming => {
                self.handle_confirming_key(key);
                None
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Option<ApiCommand> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
                return Some(ApiCommand::Shutdown);
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                return Some(ApiCommand::Shutdown);
            }
            KeyCode::Char('?') => {
                self.show_help = true;
                return None;
            }
            KeyCode::Tab => {
                self.active_tab = self.active_tab.next();
                self.list_selected = 0;
                return None;
            }
            KeyCode::BackTab => {
                self.active_tab = self.active_tab.previous();
                self.list_selected = 0;
                return None;
            }
            KeyCode::Char('s') => {
                self.save_or_report();
                return None;
            }
            KeyCode::Char('x') => {
                self.export();
                return None;
            }
            KeyCode::Char('I') => {
                let default = self.store.dir().join("import.csv").display().to_string();
                self.open_form(FormState::new_import(default, self.today));
                return None;
            }
            KeyCode::Char('f') => {
                self.open_form(FormState::new_filters(&self.dashboard, self.today));
                return None;
            }
            KeyCode::Char('F') => {
                self.dashboard.filters = Filters::default();
                self.log(LogEntry::info("Filters cleared"));
                return None;
            }
            KeyCode::Char('R') => {
                self.confirm_dialog = Some(ConfirmDialog::new_reset_gantt());
                self.input_mode = InputMode::Confirming;
                return None;
            }
            KeyCode::Char('p') => {
                return Some(ApiCommand::CheckConnection);
            }
            KeyCode::Char('i') => {
                return self.request_image_lookup();
            }
            KeyCode::Char('c') => {
                if self.active_tab == Tab::Retailers {
                    self.open_form(FormState::new_add_retailer(self.today));
                } else {
                    self.add_product();
                }
                return None;
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                self.open_edit_form();
                return None;
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                self.open_delete_confirm();
                return None;
            }
            _ => {}
        }

        match self.active_tab {
            Tab::Timeline => self.handle_timeline_key(key),
            Tab::Products => {
                if key.code == KeyCode::Char('b') {
                    self.toggle_selected_brand_filter();
                } else {
                    self.handle_list_key(key, self.dashboard.products.len());
                }
            }
            Tab::Retailers => {
                if key.code == KeyCode::Char(' ') {
                    self.toggle_selected_retailer_filter();
                } else {
                    self.handle_list_key(key, self.dashboard.retailers.len());
                }
            }
        }

        None
    }

    fn toggle_selected_brand_filter(&mut self) {
        let Some(brand) = self.selected_product().map(|p| p.brand.clone()) else {
            return;
        };
        if brand.is_empty() {
            return;
        }
        self.dashboard.filters.toggle_brand(&brand);
        let on = self.dashboard.filters.brands.contains(&brand);
        self.log(LogEntry::info(format!(
            "Brand filter {} {}",
            if on { "+" } else { "-" },
            brand
        )));
    }

    fn toggle_selected_retailer_filter(&mut self) {
        let Some(name) = self.selected_retailer().map(|r| r.name.clone()) else {
            return;
        };
        self.dashboard.filters.toggle_retailer(&name);
        let on = self.dashboard.filters.retailers.contains(&name);
        self.log(LogEntry::info(format!(
            "Retailer filter {} {}",
            if on { "+" } else { "-" },
            name
        )));
    }

    fn handle_editing_key(&mut self, key: KeyEvent) {
        let Some(form) = &mut self.form_state else {
            self.input_mode = InputMode::Normal;
            return;
        };
        let field = form.current_field();

        match key.code {
            KeyCode::Esc => self.close_form(),
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.prev_field(),
            KeyCode::Enter => self.handle_form_submit(),
            KeyCode::Backspace => form.handle_backspace(),
            KeyCode::Up if field.is_date_picker() => form.step_date(1),
            KeyCode::Down if field.is_date_picker() => form.step_date(-1),
            KeyCode::Right if field.is_date_picker() => form.step_date(7),
            KeyCode::Left if field.is_date_picker() => form.step_date(-7),
            KeyCode::Up if field.is_selector() => form.cycle_selector(false),
            KeyCode::Down if field.is_selector() => form.cycle_selector(true),
            KeyCode::Up if field.is_multi_select() => form.move_option_cursor(false),
            KeyCode::Down if field.is_multi_select() => form.move_option_cursor(true),
            KeyCode::Char(' ') if field.is_multi_select() => form.toggle_option(),
            KeyCode::Char(c) => form.handle_char(c),
            _ => {}
        }
    }

    fn handle_form_submit(&mut self) {
        let Some(form) = self.form_state.as_ref() else {
            return;
        };
        let field = form.current_field();

        if field == FormField::CancelButton {
            self.close_form();
            return;
        }

        // Enter on an input moves on, only the Save button submits
        if field != FormField::SubmitButton {
            if let Some(form) = &mut self.form_state {
                form.next_field();
            }
            return;
        }

        let result: Result<String, String> = match form.form_type.clone() {
            FormType::EditProduct(_) => {
                let product = form.build_product();
                match product.validate() {
                    Err(e) => Err(e.to_string()),
                    Ok(()) => {
                        let name = product.display_name().to_string();
                        if self.dashboard.update_product(product) {
                            self.dirty = true;
                            Ok(format!("{} updated", name))
                        } else {
                            Err("Product no longer exists".to_string())
                        }
                    }
                }
            }
            FormType::AddRetailer => {
                let name = form.retailer_name.trim().to_string();
                let logo = Some(form.retailer_logo.trim().to_string()).filter(|l| !l.is_empty());
                match self.dashboard.add_retailer(&name) {
                    Err(e) => Err(e.to_string()),
                    Ok(()) => {
                        if logo.is_some() {
                            self.dashboard.set_retailer_logo(&name, logo);
                        }
                        self.dirty = true;
                        Ok(format!("Retailer {} added", name))
                    }
                }
            }
            FormType::RetailerLogo(name) => {
                let logo = Some(form.retailer_logo.trim().to_string()).filter(|l| !l.is_empty());
                if self.dashboard.set_retailer_logo(&name, logo) {
                    self.dirty = true;
                    Ok(format!("Logo of {} updated", name))
                } else {
                    Err("Retailer no longer exists".to_string())
                }
            }
            FormType::Filters => match form.build_filters() {
                Err(e) => Err(e.to_string()),
                Ok(filters) => {
                    self.dashboard.filters = filters;
                    Ok(format!(
                        "Filters applied, {} of {} products shown",
                        self.dashboard.filtered_products().len(),
                        self.dashboard.products.len()
                    ))
                }
            },
            FormType::Import => {
                let path = form.import_path.trim().to_string();
                self.import(&path);
                return;
            }
        };

        match result {
            Ok(message) => {
                info!("{}", message);
                self.log(LogEntry::success(message));
                self.close_form();
            }
            Err(e) => {
                if let Some(form) = &mut self.form_state {
                    form.error = Some(e);
                }
            }
        }
    }

    fn handle_confirming_key(&mut self, key: KeyEvent) {
        let Some(dialog) = &mut self.confirm_dialog else {
            self.input_mode = InputMode::Normal;
            return;
        };

        match key.code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => self.close_confirm(),
            KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                dialog.yes_focused = !dialog.yes_focused;
            }
            KeyCode::Enter if !dialog.yes_focused => self.close_confirm(),
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                let target = dialog.target.clone();
                self.apply_confirmed(target);
                self.close_confirm();
            }
            _ => {}
        }
    }

    fn apply_confirmed(&mut self, target: ConfirmTarget) {
        match target {
            ConfirmTarget::Product(id) => {
                if self.dashboard.remove_product(&id) {
                    self.timeline.view = self.timeline.view.set_hover(None);
                    self.log(LogEntry::success(format!("Product {} removed", id)));
                }
            }
            ConfirmTarget::Retailer(name) => {
                if self.dashboard.remove_retailer(&name) {
                    self.log(LogEntry::success(format!("Retailer {} removed", name)));
                }
            }
            ConfirmTarget::ResetGantt => {
                self.dashboard.reset_gantt();
                self.log(LogEntry::success("Gantt chart reset"));
            }
        }
        self.dirty = true;
        let total = match self.active_tab {
            Tab::Retailers => self.dashboard.retailers.len(),
            _ => self.dashboard.products.len(),
        };
        self.list_selected = self.list_selected.min(total.saturating_sub(1));
    }

    fn handle_timeline_key(&mut self, key: KeyEvent) {
        let step = if key.modifiers.contains(KeyModifiers::SHIFT) { 8 } else { 1 };
        match key.code {
            KeyCode::Char('h') | KeyCode::Left => self.timeline.scroll_left(step),
            KeyCode::Char('l') | KeyCode::Right => self.timeline.scroll_right(step),
            KeyCode::Char('H') => self.timeline.scroll_left(8),
            KeyCode::Char('L') => self.timeline.scroll_right(8),
            KeyCode::PageUp => self.timeline.scroll_up(2),
            KeyCode::PageDown => self.timeline.scroll_down(2),
            KeyCode::Char('j') | KeyCode::Down => {
                let (_, layout) = self.timeline_layout();
                self.timeline.hover_step(&layout, 1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                let (_, layout) = self.timeline_layout();
                self.timeline.hover_step(&layout, -1);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.timeline.zoom(ZoomDirection::In, &self.layout_config);
            }
            KeyCode::Char('-') => {
                self.timeline.zoom(ZoomDirection::Out, &self.layout_config);
            }
            KeyCode::Char('g') => {
                self.timeline.toggle_grouping();
                let mode = if self.timeline.view.group_by_brand { "brand" } else { "start date" };
                self.log(LogEntry::info(format!("Timeline grouped by {}", mode)));
            }
            KeyCode::Char('t') => self.scroll_to_today(),
            KeyCode::Home => {
                self.timeline.scroll_x = 0;
                self.timeline.scroll_y = 0;
            }
            _ => {}
        }
    }

    fn scroll_to_today(&mut self) {
        let (_, layout) = self.timeline_layout();
        if layout.scale.range.contains(self.today) {
            self.timeline.scroll_to_x(layout.scale.x(self.today));
        } else {
            self.log(LogEntry::info("Today is outside the planned range"));
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.active_tab != Tab::Timeline || self.input_mode != InputMode::Normal {
            return;
        }
        match mouse.kind {
            MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                let (_, layout) = self.timeline_layout();
                self.timeline.pointer_moved(&layout, mouse.column, mouse.row);
            }
            MouseEventKind::Down(MouseButton::Left) => {
                let (_, layout) = self.timeline_layout();
                self.timeline.pointer_moved(&layout, mouse.column, mouse.row);
                self.open_edit_form();
            }
            MouseEventKind::ScrollUp => self.timeline.scroll_up(1),
            MouseEventKind::ScrollDown => self.timeline.scroll_down(1),
            MouseEventKind::ScrollLeft => self.timeline.scroll_left(4),
            MouseEventKind::ScrollRight => self.timeline.scroll_right(4),
            _ => {}
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent, total: usize) {
        if total == 0 {
            return;
        }

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.list_selected = (self.list_selected + 1) % total;
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.list_selected = self.list_selected.checked_sub(1).unwrap_or(total - 1);
            }
            KeyCode::Char('g') => {
                self.list_selected = 0;
            }
            KeyCode::Char('G') => {
                self.list_selected = total.saturating_sub(1);
            }
            _ => {}
        }
    }

    /// Called every frame
    pub fn tick(&mut self) {
        self.today = chrono::Local::now().date_naive();

        if let Some(ref popup) = self.error_popup {
            if popup.should_dismiss() {
                self.error_popup = None;
            }
        }
    }

    pub fn status_text(&self) -> String {
        let proxy = if self.proxy_connected {
            "Proxy up"
        } else {
            "Proxy down"
        };
        let lookups = if self.pending_lookups > 0 {
            format!(" [{} lookups]", self.pending_lookups)
        } else {
            String::new()
        };
        let unsaved = if self.dirty { " | unsaved" } else { "" };
        let filtered = if self.dashboard.filters.is_active() {
            format!(
                " | filtered {}/{}",
                self.dashboard.filtered_products().len(),
                self.dashboard.products.len()
            )
        } else {
            String::new()
        };

        format!(
            "{}{}{}{} | {} | ?: Help | s: Save | f: Filter | q: Quit",
            proxy,
            lookups,
            unsaved,
            filtered,
            self.active_tab.name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{default_retailers, sample_products, PlanningType, Season};
    use ratatui::layout::Rect;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn focus(app: &mut App, field: FormField) {
        let form = app.form_state.as_mut().unwrap();
        form.focused_field = form.fields.iter().position(|f| *f == field).unwrap();
    }

    fn test_app(dir: &std::path::Path) -> App {
        let dashboard = Dashboard::new(sample_products(), default_retailers());
        let mut app = App::new(&Config::default(), dashboard, PlanningStore::new(dir));
        app.today = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        app.timeline.set_plot(Rect::new(1, 1, 78, 18));
        app
    }

    #[test]
    fn test_tab_cycling() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        assert_eq!(app.active_tab, Tab::Timeline);
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.active_tab, Tab::Products);
        app.handle_key(key(KeyCode::BackTab));
        app.handle_key(key(KeyCode::BackTab));
        assert_eq!(app.active_tab, Tab::Retailers);
    }

    #[test]
    fn test_timeline_zoom_and_grouping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.handle_key(key(KeyCode::Char('+')));
        assert!((app.timeline.view.zoom_factor - 1.2).abs() < 1e-9);
        for _ in 0..30 {
            app.handle_key(key(KeyCode::Char('-')));
        }
        assert_eq!(app.timeline.view.zoom_factor, 0.5);

        app.handle_key(key(KeyCode::Char('g')));
        assert!(app.timeline.view.group_by_brand);
        let (_, layout) = app.timeline_layout();
        assert_eq!(layout.headers.len(), 2);
    }

    #[test]
    fn test_keyboard_hover_and_image_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        assert!(app.handle_key(key(KeyCode::Char('i'))).is_none());

        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.timeline.view.hovered_id.as_deref(), Some("77595GQ6"));

        match app.handle_key(key(KeyCode::Char('i'))) {
            Some(ApiCommand::LookupImage { product_id, item_number }) => {
                assert_eq!(product_id, "77595GQ6");
                assert_eq!(item_number, "77595GQ6");
            }
            other => panic!("expected lookup, got {other:?}"),
        }
        assert_eq!(app.pending_lookups, 1);

        app.handle_api_message(ApiMessage::ImageFound {
            product_id: "77595GQ6".to_string(),
            url: "https://cdn.test/a.png".to_string(),
        });
        assert_eq!(app.pending_lookups, 0);
        assert!(app.dirty);
        assert_eq!(
            app.dashboard.product("77595GQ6").unwrap().image.as_deref(),
            Some("https://cdn.test/a.png")
        );
    }

    #[test]
    fn test_lookup_error_shows_popup() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.handle_api_message(ApiMessage::Error("upstream error 500".to_string()));
        assert!(app.error_popup.is_some());
        app.handle_key(key(KeyCode::Esc));
        assert!(app.error_popup.is_none());
    }

    #[test]
    fn test_add_product_opens_form_and_saves_edits() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.handle_key(key(KeyCode::Char('c')));
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.dashboard.products.len(), 6);

        focus(&mut app, FormField::Brand);
        type_text(&mut app, "LOL");
        focus(&mut app, FormField::StartDate);
        type_text(&mut app, "01-10-2025");
        focus(&mut app, FormField::EndDate);
        app.handle_key(key(KeyCode::Up)); // empty date steps to today
        app.handle_key(key(KeyCode::Right));
        focus(&mut app, FormField::PlanningType);
        app.handle_key(key(KeyCode::Down));
        focus(&mut app, FormField::Retailers);
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Char(' ')));
        focus(&mut app, FormField::SubmitButton);
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.input_mode, InputMode::Normal);
        let added = app.dashboard.products.last().unwrap();
        assert_eq!(added.brand, "LOL");
        assert_eq!(added.start_date.as_deref(), Some("01-10-2025"));
        assert_eq!(added.end_date.as_deref(), Some("08-10-2025"));
        assert_eq!(added.planning_type, PlanningType::Feature);
        assert_eq!(added.retailer, vec!["Retailer B"]);
    }

    #[test]
    fn test_invalid_product_keeps_form_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.active_tab = Tab::Products;
        app.handle_key(key(KeyCode::Char('e')));
        focus(&mut app, FormField::EndDate);
        let form = app.form_state.as_mut().unwrap();
        form.end_date = "01-01-2020".to_string();
        focus(&mut app, FormField::SubmitButton);
        app.handle_key(key(KeyCode::Enter));

        let form = app.form_state.as_ref().unwrap();
        assert_eq!(form.error.as_deref(), Some("End date must be after start date"));
        assert_eq!(app.dashboard.products[0].end_date.as_deref(), Some("30-11-2025"));
    }

    #[test]
    fn test_date_field_rejects_letters() {
        let mut form = FormState::new_filters(&Dashboard::default(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        form.focused_field = form.fields.iter().position(|f| *f == FormField::FilterStart).unwrap();
        for c in "0a1-0x1-2025-99".chars() {
            form.handle_char(c);
        }
        assert_eq!(form.filter_start, "01-01-2025");
        form.step_date(-1);
        assert_eq!(form.filter_start, "31-12-2024");
    }

    #[test]
    fn test_filter_form_applies_filters() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.handle_key(key(KeyCode::Char('f')));
        focus(&mut app, FormField::FilterBrands);
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Char(' ')));
        focus(&mut app, FormField::SubmitButton);
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.dashboard.filters.brands, vec!["FUGGLER"]);
        let (records, layout) = app.timeline_layout();
        assert_eq!(records.len(), 1);
        assert_eq!(layout.bars.len(), 1);

        app.handle_key(key(KeyCode::Char('F')));
        assert!(!app.dashboard.filters.is_active());
    }

    #[test]
    fn test_bad_filter_dates_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.handle_key(key(KeyCode::Char('f')));
        let form = app.form_state.as_mut().unwrap();
        form.filter_start = "31-02-2025".to_string();
        focus(&mut app, FormField::SubmitButton);
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(
            app.form_state.as_ref().unwrap().error.as_deref(),
            Some("Dates must be DD-MM-YYYY")
        );
    }

    #[test]
    fn test_delete_and_reset_need_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.active_tab = Tab::Products;
        app.handle_key(key(KeyCode::Char('d')));
        assert_eq!(app.input_mode, InputMode::Confirming);
        app.handle_key(key(KeyCode::Enter)); // "No" focused
        assert_eq!(app.dashboard.products.len(), 5);

        app.handle_key(key(KeyCode::Char('d')));
        app.handle_key(key(KeyCode::Char('y')));
        assert_eq!(app.dashboard.products.len(), 4);

        app.handle_key(key(KeyCode::Char('R')));
        app.handle_key(key(KeyCode::Left));
        app.handle_key(key(KeyCode::Enter));
        assert!(app.dashboard.products.iter().all(|p| p.start_date.is_none()));
    }

    #[test]
    fn test_retailer_tab_actions() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.active_tab = Tab::Retailers;

        app.handle_key(key(KeyCode::Char('c')));
        type_text(&mut app, "Retailer A");
        focus(&mut app, FormField::SubmitButton);
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(
            app.form_state.as_ref().unwrap().error.as_deref(),
            Some("Retailer already exists")
        );
        app.handle_key(key(KeyCode::Esc));

        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(app.dashboard.filters.retailers, vec!["Retailer A"]);

        app.handle_key(key(KeyCode::Char('d')));
        app.handle_key(key(KeyCode::Char('y')));
        assert_eq!(app.dashboard.retailers.len(), 3);
        assert!(app.dashboard.filters.retailers.is_empty());
    }

    #[test]
    fn test_save_and_export_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.dirty = true;
        app.handle_key(key(KeyCode::Char('s')));
        assert!(!app.dirty);
        assert!(dir.path().join("productPlanning.json").exists());

        app.handle_key(key(KeyCode::Char('x')));
        let csv = std::fs::read_to_string(dir.path().join(EXPORT_FILE)).unwrap();
        assert!(csv.starts_with("ID,Description"));
    }

    #[test]
    fn test_import_form_appends_products() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = dir.path().join("sheet.csv");
        std::fs::write(
            &sheet,
            "Item Number,Description,Brand,Image URL,Retailers,Start Date,End Date,Planning Type,Season\n\
             99999,NEW THING,BRAND,,Retailer A,01-10-2025,31-10-2025,promo,\n",
        )
        .unwrap();

        let mut app = test_app(dir.path());
        app.handle_key(key(KeyCode::Char('I')));
        app.form_state.as_mut().unwrap().import_path = sheet.display().to_string();
        focus(&mut app, FormField::SubmitButton);
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.dashboard.products.len(), 6);
        assert_eq!(app.dashboard.products[5].planning_type, PlanningType::Promo);
    }

    #[test]
    fn test_season_selector_cycles_both_ways() {
        let mut form = FormState::new_edit_product(
            &ProductRecord::new("x"),
            &[],
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        );
        form.focused_field = form.fields.iter().position(|f| *f == FormField::Season).unwrap();
        form.cycle_selector(true);
        assert_eq!(form.product.season, Season::SpringSummer);
        form.cycle_selector(false);
        assert_eq!(form.product.season, Season::Unset);
    }

    #[test]
    fn test_quit_sends_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        assert!(matches!(app.handle_key(key(KeyCode::Char('q'))), Some(ApiCommand::Shutdown)));
        assert!(app.should_quit);
    }
}
