//! Terminal rendering of the timeline layout.
//!
//! The layout engine works in pixels. This module maps that geometry onto
//! terminal cells (`TerminalConfig` gives the pixels per column and row),
//! keeps the host-side view state (zoom, hover, scroll, pointer) and draws
//! one `TimelineLayout` per frame.

use chrono::NaiveDate;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

use crate::config::TerminalConfig;
use crate::layout::{
    Bar, LabelKind, LayoutConfig, LineKind, Tooltip, TooltipPayload, TimelineLayout, Viewport,
    ViewState, ZoomDirection,
};
use crate::models::{PlanningType, ProductRecord};
use crate::theme::{colors, planning_color, styles, text_on};

const AXIS_LINE: char = '─';
const MONTH_TICK: char = '┬';
const HOLIDAY_TICK: char = '◆';
const TODAY_TICK: char = '▼';
const GRID_SOLID: char = '│';
const GRID_DASHED: char = '┆';
const GRID_WEEK: char = '·';
const LEGEND_SWATCH: char = '■';

/// Week lines are only drawn when at least this many columns apart
const MIN_WEEK_SPACING: f64 = 4.0;

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

fn to_u16(value: f64) -> u16 {
    value.clamp(0.0, u16::MAX as f64) as u16
}

/// Cells covered by a bar, relative to the plot area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSpan {
    pub col_start: i64,
    pub col_end: i64,
    pub row_start: i64,
    pub row_end: i64,
}

impl CellSpan {
    fn contains(&self, col: i64, row: i64) -> bool {
        col >= self.col_start && col <= self.col_end && row >= self.row_start && row <= self.row_end
    }
}

/// Host-side timeline state
#[derive(Debug, Clone)]
pub struct TimelineView {
    pub view: ViewState,
    /// Horizontal scroll in columns
    pub scroll_x: u16,
    /// Vertical scroll of the product rows
    pub scroll_y: u16,
    /// Last pointer position, absolute terminal cell
    pub pointer: Option<(u16, u16)>,
    /// Inner drawing area of the last frame
    pub plot: Rect,
    terminal: TerminalConfig,
    header_rows: u16,
}

impl TimelineView {
    pub fn new(terminal: &TerminalConfig, layout: &LayoutConfig, group_by_brand: bool) -> Self {
        let terminal = TerminalConfig {
            pixels_per_column: positive_or(terminal.pixels_per_column, 8.0),
            pixels_per_row: positive_or(terminal.pixels_per_row, 25.0),
        };
        let header_rows = (layout.header_height / terminal.pixels_per_row).ceil().max(1.0);
        Self {
            view: ViewState::default().set_grouping(group_by_brand),
            scroll_x: 0,
            scroll_y: 0,
            pointer: None,
            plot: Rect::default(),
            header_rows: to_u16(header_rows),
            terminal,
        }
    }

    pub fn header_rows(&self) -> u16 {
        self.header_rows
    }

    /// Plot area inside the widget border
    pub fn plot_area(area: Rect) -> Rect {
        Block::default().borders(Borders::ALL).inner(area)
    }

    pub fn set_plot(&mut self, plot: Rect) {
        self.plot = plot;
    }

    /// Drawing size handed to the layout engine
    /// Plot size in pixels, windowed on the scrolled columns
    pub fn viewport(&self) -> Viewport {
        let width = self.plot.width as f64 * self.terminal.pixels_per_column;
        let from = self.scroll_x as f64 * self.terminal.pixels_per_column;
        Viewport::new(width, self.plot.height as f64 * self.terminal.pixels_per_row)
            .with_window(from, from + width)
    }

    fn column_of(&self, x: f64) -> i64 {
        (x / self.terminal.pixels_per_column).floor() as i64 - self.scroll_x as i64
    }

    /// Plot row of a vertical position. Rows below the header scroll.
    fn row_of(&self, y: f64) -> i64 {
        let row = (y / self.terminal.pixels_per_row).floor() as i64;
        if row < self.header_rows as i64 {
            row
        } else {
            row - self.scroll_y as i64
        }
    }

    /// Cells covered by a bar. Always at least one cell wide.
    pub fn bar_cells(&self, bar: &Bar) -> CellSpan {
        let col_start = self.column_of(bar.x);
        let col_end = self.column_of(bar.x + bar.width - f64::EPSILON).max(col_start);
        let row_start = self.row_of(bar.y);
        let row_end = self.row_of(bar.y + bar.height - f64::EPSILON).max(row_start);
        CellSpan {
            col_start,
            col_end,
            row_start,
            row_end,
        }
    }

    /// Layout position at the centre of a terminal cell
    pub fn pixel_at(&self, column: u16, row: u16) -> Option<(f64, f64)> {
        let plot = self.plot;
        if column < plot.x || row < plot.y || column >= plot.right() || row >= plot.bottom() {
            return None;
        }
        let col = (column - plot.x) as f64 + self.scroll_x as f64;
        let mut row = (row - plot.y) as f64;
        if row >= self.header_rows as f64 {
            row += self.scroll_y as f64;
        }
        Some((
            (col + 0.5) * self.terminal.pixels_per_column,
            (row + 0.5) * self.terminal.pixels_per_row,
        ))
    }

    /// Id of the bar drawn at a terminal cell
    pub fn hover_at(&self, layout: &TimelineLayout, column: u16, row: u16) -> Option<String> {
        let (x, y) = self.pixel_at(column, row)?;
        if let Some(bar) = layout.bar_at(x, y) {
            return Some(bar.id.clone());
        }
        // Bars narrower than a cell may miss the cell centre
        let col = (column - self.plot.x) as i64;
        let row = (row - self.plot.y) as i64;
        if row < self.header_rows as i64 {
            return None;
        }
        layout
            .bars
            .iter()
            .find(|bar| self.bar_cells(bar).contains(col, row))
            .map(|bar| bar.id.clone())
    }

    pub fn pointer_moved(&mut self, layout: &TimelineLayout, column: u16, row: u16) {
        self.pointer = Some((column, row));
        let id = self.hover_at(layout, column, row);
        self.view = self.view.set_hover(id.as_deref());
    }

    pub fn pointer_left(&mut self) {
        self.pointer = None;
        self.view = self.view.set_hover(None);
    }

    /// Move the hover to the previous or next bar and bring it into view
    pub fn hover_step(&mut self, layout: &TimelineLayout, offset: isize) {
        let next = layout
            .neighbour_bar(self.view.hovered_id.as_deref(), offset)
            .map(str::to_string);
        self.pointer = None;
        self.view = self.view.set_hover(next.as_deref());
        if let Some(bar) = next.as_deref().and_then(|id| layout.bar(id)) {
            self.reveal(bar);
        }
    }

    pub fn zoom(&mut self, direction: ZoomDirection, config: &LayoutConfig) {
        let before = config.clamp_zoom(self.view.zoom_factor);
        self.view = self.view.set_zoom(direction, config);
        // Keep the centre column on the same date
        let ratio = self.view.zoom_factor / before;
        let half = self.plot.width as f64 / 2.0;
        let centre = self.scroll_x as f64 + half;
        self.scroll_x = to_u16((centre * ratio - half).round());
    }

    pub fn toggle_grouping(&mut self) {
        self.view = self.view.set_grouping(!self.view.group_by_brand);
        self.scroll_y = 0;
    }

    pub fn scroll_left(&mut self, columns: u16) {
        self.scroll_x = self.scroll_x.saturating_sub(columns);
    }

    pub fn scroll_right(&mut self, columns: u16) {
        self.scroll_x = self.scroll_x.saturating_add(columns);
    }

    pub fn scroll_up(&mut self, rows: u16) {
        self.scroll_y = self.scroll_y.saturating_sub(rows);
    }

    pub fn scroll_down(&mut self, rows: u16) {
        self.scroll_y = self.scroll_y.saturating_add(rows);
    }

    /// Centre the plot on a layout x position
    pub fn scroll_to_x(&mut self, x: f64) {
        let col = x / self.terminal.pixels_per_column;
        self.scroll_x = to_u16(col - self.plot.width as f64 / 2.0);
    }

    /// Keep scrolling inside the drawn content
    /// Keep the scroll inside the layout. Returns whether it moved.
    pub fn clamp_scroll(&mut self, layout: &TimelineLayout) -> bool {
        let before = (self.scroll_x, self.scroll_y);
        let cols = (layout.width / self.terminal.pixels_per_column).ceil();
        self.scroll_x = self.scroll_x.min(to_u16(cols - self.plot.width as f64));

        let rows = (layout.height / self.terminal.pixels_per_row).ceil();
        self.scroll_y = self.scroll_y.min(to_u16(rows - self.plot.height as f64));
        before != (self.scroll_x, self.scroll_y)
    }

    fn reveal(&mut self, bar: &Bar) {
        let span = self.bar_cells(bar);
        let width = self.plot.width as i64;
        if span.col_start < 0 || span.col_start >= width {
            self.scroll_to_x(bar.x + bar.width / 2.0);
        }
        let bottom = self.plot.height as i64;
        if span.row_start < self.header_rows as i64 {
            let shift = self.header_rows as i64 - span.row_start;
            self.scroll_y = to_u16(self.scroll_y as f64 - shift as f64);
        } else if span.row_end >= bottom {
            let shift = span.row_end - bottom + 1;
            self.scroll_y = to_u16(self.scroll_y as f64 + shift as f64);
        }
    }
}

/// Gantt chart widget for one computed layout
pub struct TimelineWidget<'a> {
    layout: &'a TimelineLayout,
    records: &'a [ProductRecord],
    view: &'a TimelineView,
    today: NaiveDate,
    title: &'a str,
}

impl<'a> TimelineWidget<'a> {
    pub fn new(
        layout: &'a TimelineLayout,
        records: &'a [ProductRecord],
        view: &'a TimelineView,
        today: NaiveDate,
    ) -> Self {
        Self {
            layout,
            records,
            view,
            today,
            title: " Product Timeline ",
        }
    }

    pub fn title(mut self, title: &'a str) -> Self {
        self.title = title;
        self
    }

    fn put(&self, plot: Rect, buf: &mut Buffer, col: i64, row: i64, ch: char, style: Style) {
        if col < 0 || row < 0 || col >= plot.width as i64 || row >= plot.height as i64 {
            return;
        }
        if let Some(cell) = buf.cell_mut((plot.x + col as u16, plot.y + row as u16)) {
            cell.set_char(ch);
            cell.set_style(style);
        }
    }

    fn is_blank(plot: Rect, buf: &Buffer, col: i64, row: i64) -> bool {
        if col < 0 || row < 0 || col >= plot.width as i64 || row >= plot.height as i64 {
            return false;
        }
        buf.cell((plot.x + col as u16, plot.y + row as u16))
            .is_some_and(|cell| cell.symbol() == " ")
    }

    /// Write text clipped to the plot and to `max` columns
    fn put_str(&self, plot: Rect, buf: &mut Buffer, col: i64, row: i64, text: &str, max: i64, style: Style) {
        for (i, ch) in text.chars().take(max.max(0) as usize).enumerate() {
            self.put(plot, buf, col + i as i64, row, ch, style);
        }
    }

    fn render_grid(&self, plot: Rect, buf: &mut Buffer) {
        let header = self.view.header_rows as i64;
        let axis_row = header - 1;
        let week_spacing =
            self.layout.scale.day_width * 7.0 / self.view.terminal.pixels_per_column;

        for col in 0..plot.width as i64 {
            self.put(plot, buf, col, axis_row, AXIS_LINE, styles::border_dim());
        }

        for line in &self.layout.lines {
            if line.kind == LineKind::Week && week_spacing < MIN_WEEK_SPACING {
                continue;
            }
            let col = self.view.column_of(line.x);
            let (ch, style) = match line.kind {
                LineKind::Week => (GRID_WEEK, Style::default().fg(colors::WEEK_LINE)),
                LineKind::Month => (GRID_SOLID, Style::default().fg(colors::MONTH_LINE)),
                LineKind::Quarter => (GRID_SOLID, Style::default().fg(colors::QUARTER_LINE)),
                LineKind::Holiday => (GRID_DASHED, Style::default().fg(colors::HOLIDAY)),
            };
            let ch = if line.kind.dashed() { GRID_DASHED } else { ch };
            for row in header..plot.height as i64 {
                self.put(plot, buf, col, row, ch, style);
            }
            if matches!(line.kind, LineKind::Month | LineKind::Quarter) {
                self.put(plot, buf, col, axis_row, MONTH_TICK, style);
            }
        }

        for marker in &self.layout.holidays {
            let col = self.view.column_of(marker.x);
            self.put(plot, buf, col, axis_row, HOLIDAY_TICK, Style::default().fg(colors::HOLIDAY));
        }
    }

    fn render_labels(&self, plot: Rect, buf: &mut Buffer) {
        let header = self.view.header_rows as i64;
        for label in &self.layout.labels {
            let col = self.view.column_of(label.x);
            let row = self.view.row_of(label.y).min(header - 1);
            let width = label.text.chars().count() as i64;
            match label.kind {
                LabelKind::Month => {
                    self.put_str(plot, buf, col, row, &label.text, width, styles::title_accent());
                }
                // Week numbers only where they fit without overlap
                LabelKind::Week => {
                    if (col..col + width + 1).all(|c| Self::is_blank(plot, buf, c, row)) {
                        self.put_str(plot, buf, col, row, &label.text, width, styles::text_hint());
                    }
                }
            }
        }
    }

    fn render_today(&self, plot: Rect, buf: &mut Buffer) {
        if !self.layout.scale.range.contains(self.today) {
            return;
        }
        let col = self.view.column_of(self.layout.scale.x(self.today));
        let style = Style::default().fg(colors::TODAY_MARKER);
        let header = self.view.header_rows as i64;
        self.put(plot, buf, col, header - 1, TODAY_TICK, style.add_modifier(Modifier::BOLD));
        for row in header..plot.height as i64 {
            self.put(plot, buf, col, row, GRID_SOLID, style.add_modifier(Modifier::DIM));
        }
    }

    fn render_headers(&self, plot: Rect, buf: &mut Buffer) {
        let header = self.view.header_rows as i64;
        let style = Style::default()
            .fg(colors::FG_PRIMARY)
            .bg(colors::BG_HIGHLIGHT)
            .add_modifier(Modifier::BOLD);
        for brand in &self.layout.headers {
            let row = self.view.row_of(brand.y);
            if row < header {
                continue;
            }
            for col in 0..plot.width as i64 {
                self.put(plot, buf, col, row, ' ', style);
            }
            let label = if brand.label.is_empty() { "(no brand)" } else { &brand.label };
            self.put_str(plot, buf, 1, row, label, plot.width as i64 - 1, style);
        }
    }

    fn render_bars(&self, plot: Rect, buf: &mut Buffer) {
        let header = self.view.header_rows as i64;
        for bar in &self.layout.bars {
            let span = self.view.bar_cells(bar);
            let hovered = self.layout.hovered_id.as_deref() == Some(bar.id.as_str());

            let mut style = Style::default().fg(text_on(bar.fill)).bg(bar.fill.into());
            if hovered {
                style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
            }

            for row in span.row_start.max(header)..=span.row_end {
                for col in span.col_start..=span.col_end {
                    self.put(plot, buf, col, row, ' ', style);
                }
            }

            if span.row_start >= header {
                let first_visible = span.col_start.max(0);
                let room = span.col_end - first_visible + 1;
                self.put_str(plot, buf, first_visible, span.row_start, &bar.label, room, style);
            }
        }
    }

    fn render_tooltip(&self, plot: Rect, buf: &mut Buffer) {
        let Some(bar) = self.layout.hovered_bar() else {
            return;
        };
        let Some(record) = self.records.get(bar.record) else {
            return;
        };

        let lines = TooltipPayload::from_record(record).lines();
        let ppc = self.view.terminal.pixels_per_column;
        let ppr = self.view.terminal.pixels_per_row;

        let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16;
        let width = widest.saturating_add(2).min(plot.width);
        let height = (lines.len() as u16).saturating_add(2).min(plot.height);
        if width < 4 || height < 3 {
            return;
        }

        // Anchor at the pointer, or at the bar for keyboard hover
        let (px, py) = match self.view.pointer {
            Some((c, r)) if plot.contains((c, r).into()) => ((c - plot.x) as f64, (r - plot.y) as f64),
            _ => {
                let span = self.view.bar_cells(bar);
                (span.col_start.max(0) as f64, span.row_end as f64)
            }
        };

        let placed = Tooltip::place(
            TooltipPayload::from_record(record),
            (px * ppc, py * ppr),
            (width as f64 * ppc, height as f64 * ppr),
            (plot.width as f64 * ppc, plot.height as f64 * ppr),
        );
        let area = Rect::new(
            plot.x + to_u16((placed.x / ppc).round()).min(plot.width - width),
            plot.y + to_u16((placed.y / ppr).round()).min(plot.height - height),
            width,
            height,
        );

        let fill = bar.fill;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(fill.into()))
            .style(styles::modal_content_bg());
        let text: Vec<Line> = lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                if i == 0 {
                    Line::styled(line, styles::title())
                } else {
                    Line::styled(line, styles::text())
                }
            })
            .collect();

        Clear.render(area, buf);
        Paragraph::new(text).block(block).render(area, buf);
    }

    fn render_legend(&self, area: Rect, buf: &mut Buffer) {
        if area.height < 2 {
            return;
        }
        let y = area.bottom() - 1;
        let mut x = area.x + 6;
        for kind in PlanningType::all() {
            let label = kind.label();
            let needed = label.len() as u16 + 3;
            if x + needed > area.right().saturating_sub(6) {
                break;
            }
            buf.set_string(x, y, LEGEND_SWATCH.to_string(), Style::default().fg(planning_color(*kind)));
            buf.set_string(x + 1, y, label, styles::text_hint());
            x += needed;
        }
    }
}

impl Widget for TimelineWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(self.title)
            .title_style(styles::title_accent())
            .borders(Borders::ALL)
            .border_style(styles::border())
            .style(Style::default().bg(colors::BG_DARK));

        let plot = block.inner(area);
        block.render(area, buf);

        if plot.width < 10 || plot.height <= self.view.header_rows {
            return;
        }

        if self.layout.bars.is_empty() && self.layout.headers.is_empty() {
            self.render_grid(plot, buf);
            self.render_labels(plot, buf);
            let msg = "No products with valid dates";
            let col = (plot.width as i64 - msg.len() as i64) / 2;
            self.put_str(plot, buf, col, plot.height as i64 / 2, msg, msg.len() as i64, styles::text_dim());
            return;
        }

        self.render_grid(plot, buf);
        self.render_labels(plot, buf);
        self.render_today(plot, buf);
        self.render_headers(plot, buf);
        self.render_bars(plot, buf);
        self.render_tooltip(plot, buf);
        self.render_legend(area, buf);

        if self.view.scroll_x > 0 {
            buf.set_string(area.x + 1, area.bottom() - 1, "◀ h", styles::text_hint());
        }
        buf.set_string(area.right().saturating_sub(4), area.bottom() - 1, "l ▶", styles::text_hint());
    }
}

/// One-line summary under the timeline
pub struct TimelineStatusWidget<'a> {
    layout: &'a TimelineLayout,
    view: &'a TimelineView,
}

impl<'a> TimelineStatusWidget<'a> {
    pub fn new(layout: &'a TimelineLayout, view: &'a TimelineView) -> Self {
        Self { layout, view }
    }
}

impl Widget for TimelineStatusWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let range = self.layout.scale.range;
        let hovered = self
            .layout
            .hovered_bar()
            .map(|bar| bar.label.as_str())
            .unwrap_or("none");
        let pointer_date = self
            .view
            .pointer
            .and_then(|(column, row)| self.view.pixel_at(column, row))
            .map(|(x, _)| format!("  at {}", self.layout.scale.date_at(x).format("%d-%m-%Y")))
            .unwrap_or_default();
        let status = format!(
            "{} bars  zoom {:.2}x  {}  {} to {}  hover: {}{}",
            self.layout.bars.len(),
            self.view.view.zoom_factor,
            if self.view.view.group_by_brand { "by brand" } else { "by start" },
            range.start.format("%d-%m-%Y"),
            range.end.format("%d-%m-%Y"),
            hovered,
            pointer_date,
        );
        buf.set_stringn(area.x, area.y, status, area.width as usize, Style::default().fg(colors::FG_DIM));
    }
}
