//! UI rendering module.
//!
//! Draws the dashboard with ratatui: tab bar, the active view, the log area
//! and the modal overlays (forms, confirmation, errors, help).

use chrono::{Datelike, NaiveDate};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::app::{App, FormField, FormState, FormType, LogLevel, Tab};
use crate::layout::{display_date, parse_date};
use crate::theme::{colors, planning_color, styles};
use crate::timeline::{TimelineStatusWidget, TimelineView, TimelineWidget};

/// Width of the label column in forms
const LABEL_WIDTH: u16 = 15;

/// Render the entire UI
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    let bg_block = Block::default().style(Style::default().bg(colors::BG_DARK));
    frame.render_widget(bg_block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs and status
            Constraint::Min(10),   // Main content
            Constraint::Length(5), // Log area
        ])
        .split(area);

    render_tabs(frame, app, chunks[0]);
    render_main_content(frame, app, chunks[1]);
    render_logs(frame, app, chunks[2]);

    if app.form_state.is_some() {
        render_form_modal(frame, app, area);
    }

    if app.confirm_dialog.is_some() {
        render_confirm_dialog(frame, app, area);
    }

    if app.error_popup.is_some() {
        render_error_popup(frame, app, area);
    }

    if app.show_help {
        render_help_overlay(frame, area);
    }
}

/// Render the tab bar
fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Tab::all()
        .iter()
        .map(|tab| {
            let style = if *tab == app.active_tab {
                styles::tab_active()
            } else {
                styles::tab_inactive()
            };
            Line::from(Span::styled(format!(" {} ", tab.name()), style))
        })
        .collect();

    let selected = Tab::all()
        .iter()
        .position(|tab| *tab == app.active_tab)
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .title(" Product Planning ")
                .title_style(styles::title())
                .title(Line::from(Span::styled(format!(" {} ", app.status_text()), styles::text_dim())).right_aligned())
                .borders(Borders::ALL)
                .border_style(styles::border())
                .style(Style::default().bg(colors::BG_MEDIUM)),
        )
        .select(selected)
        .style(styles::text())
        .highlight_style(styles::tab_active())
        .divider(Span::styled(" | ", styles::border_dim()));

    frame.render_widget(tabs, area);
}

/// Render the main content area based on active tab
fn render_main_content(frame: &mut Frame, app: &mut App, area: Rect) {
    match app.active_tab {
        Tab::Timeline => render_timeline_view(frame, app, area),
        Tab::Products => render_products_view(frame, app, area),
        Tab::Retailers => render_retailers_view(frame, app, area),
    }
}

fn render_timeline_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(1)])
        .split(area);

    // The layout depends on the plot size, so the plot is fixed first
    app.timeline.set_plot(TimelineView::plot_area(chunks[0]));
    let (mut records, mut layout) = app.timeline_layout();
    // The axis is generated around the scrolled window
    if app.timeline.clamp_scroll(&layout) {
        (records, layout) = app.timeline_layout();
    }

    let title = if app.dashboard.filters.is_active() {
        " Product Timeline (filtered) "
    } else {
        " Product Timeline "
    };
    let widget = TimelineWidget::new(&layout, &records, &app.timeline, app.today).title(title);
    frame.render_widget(widget, chunks[0]);
    frame.render_widget(TimelineStatusWidget::new(&layout, &app.timeline), chunks[1]);
}

fn selected_style(accent: Color) -> Style {
    Style::default()
        .fg(colors::BG_DARK)
        .bg(accent)
        .add_modifier(Modifier::BOLD)
}

fn render_products_view(frame: &mut Frame, app: &App, area: Rect) {
    let filtered = app.dashboard.filtered_products();

    let items: Vec<ListItem> = app
        .dashboard
        .products
        .iter()
        .enumerate()
        .map(|(i, product)| {
            let is_selected = i == app.list_selected;
            let shown = filtered.iter().any(|p| p.id == product.id);
            let style = if is_selected {
                selected_style(colors::BLUE)
            } else if shown {
                styles::text()
            } else {
                styles::text_hint()
            };
            let dim = if is_selected { style } else { styles::text_dim() };

            let content = Line::from(vec![
                Span::styled("■ ", Style::default().fg(planning_color(product.planning_type))),
                Span::styled(format!("{:<10.10}", product.lookup_key()), style),
                Span::styled(" │ ", styles::border_dim()),
                Span::styled(format!("{:<40.40}", product.display_name()), style),
                Span::styled(" │ ", styles::border_dim()),
                Span::styled(format!("{:<12.12}", product.brand), dim),
                Span::styled(" │ ", styles::border_dim()),
                Span::styled(
                    format!(
                        "{} → {}",
                        display_date(product.start_date.as_deref()),
                        display_date(product.end_date.as_deref())
                    ),
                    dim,
                ),
                Span::styled(" │ ", styles::border_dim()),
                Span::styled(format!("{:<9}", product.planning_type.label()), dim),
                Span::styled(" │ ", styles::border_dim()),
                Span::styled(product.retailer.join(", "), dim),
            ]);

            ListItem::new(content)
        })
        .collect();

    let title = format!(
        " Products ({}/{}) ",
        filtered.len(),
        app.dashboard.products.len()
    );
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::title_accent())
                .title_bottom(Line::from(Span::styled(
                    " c: add  e: edit  d: remove  i: image  b: brand filter ",
                    styles::text_hint(),
                )))
                .borders(Borders::ALL)
                .border_style(styles::border())
                .style(Style::default().bg(colors::BG_DARK)),
        )
        .style(styles::text());

    let mut state = ListState::default().with_selected(Some(app.list_selected));
    frame.render_stateful_widget(list, area, &mut state);

    if app.dashboard.products.is_empty() {
        render_empty_state(frame, area, "No products yet, press c to add one");
    }
}

fn render_retailers_view(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .dashboard
        .retailers
        .iter()
        .enumerate()
        .map(|(i, retailer)| {
            let is_selected = i == app.list_selected;
            let style = if is_selected {
                selected_style(colors::PURPLE)
            } else {
                styles::text()
            };
            let count = app
                .dashboard
                .products
                .iter()
                .filter(|p| p.has_retailer(&retailer.name))
                .count();
            let filter_mark = if app.dashboard.filters.retailers.contains(&retailer.name) {
                "[x]"
            } else {
                "[ ]"
            };

            let content = Line::from(vec![
                Span::styled(
                    format!("{} ", filter_mark),
                    if is_selected { style } else { styles::warning() },
                ),
                Span::styled(format!("{:<20.20}", retailer.name), style),
                Span::styled(" │ ", styles::border_dim()),
                Span::styled(
                    format!("{:>3} products", count),
                    if is_selected { style } else { styles::text_dim() },
                ),
                Span::styled(" │ ", styles::border_dim()),
                Span::styled(
                    retailer.logo.as_deref().unwrap_or("-").to_string(),
                    if is_selected { style } else { styles::text_hint() },
                ),
            ]);

            ListItem::new(content)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" Retailers ")
                .title_style(styles::title_accent())
                .title_bottom(Line::from(Span::styled(
                    " c: add  e: logo  d: remove  space: filter ",
                    styles::text_hint(),
                )))
                .borders(Borders::ALL)
                .border_style(styles::border())
                .style(Style::default().bg(colors::BG_DARK)),
        )
        .style(styles::text());

    let mut state = ListState::default().with_selected(Some(app.list_selected));
    frame.render_stateful_widget(list, area, &mut state);

    if app.dashboard.retailers.is_empty() {
        render_empty_state(frame, area, "No retailers, press c to add one");
    }
}

/// Render the log area
fn render_logs(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .logs
        .iter()
        .rev()
        .take(area.height.saturating_sub(2) as usize)
        .map(|entry| {
            let (prefix, color) = match entry.level {
                LogLevel::Info => ("i", colors::BLUE),
                LogLevel::Success => ("+", colors::GREEN),
                LogLevel::Warning => ("!", colors::YELLOW),
                LogLevel::Error => ("x", colors::RED),
            };

            ListItem::new(Line::from(vec![
                Span::styled(entry.timestamp.format("%H:%M:%S ").to_string(), styles::text_hint()),
                Span::styled(format!("[{}] ", prefix), Style::default().fg(color)),
                Span::styled(&entry.message, styles::text_dim()),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Activity ")
            .title_style(Style::default().fg(colors::FG_DIM))
            .borders(Borders::ALL)
            .border_style(styles::border_dim())
            .style(Style::default().bg(colors::BG_DARK)),
    );

    frame.render_widget(list, area);
}

fn render_empty_state(frame: &mut Frame, area: Rect, message: &str) {
    let paragraph = Paragraph::new(message)
        .style(styles::text_dim())
        .alignment(Alignment::Center);

    let inner = Block::default().borders(Borders::ALL).inner(area);
    let y = inner.y + inner.height / 2;
    let centered = Rect::new(inner.x, y, inner.width, 1);

    frame.render_widget(paragraph, centered);
}

/// Render the form modal
fn render_form_modal(frame: &mut Frame, app: &App, area: Rect) {
    let Some(form) = &app.form_state else {
        return;
    };

    let inputs: Vec<FormField> = form.fields.iter().copied().filter(|f| !f.is_button()).collect();
    // fields + spacer + buttons + error line + margins + borders
    let popup_height = inputs.len() as u16 + 1 + 1 + 1 + 2 + 2;
    let popup_width = match form.form_type {
        FormType::EditProduct(_) | FormType::Filters => 76,
        _ => 60,
    };
    let popup_area = centered_rect(popup_width, popup_height, area);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(format!(" {} ", form.form_type.title()))
        .title_style(styles::title())
        .borders(Borders::ALL)
        .border_style(styles::border_focused())
        .style(styles::modal_content_bg());

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let mut constraints: Vec<Constraint> = inputs.iter().map(|_| Constraint::Length(1)).collect();
    constraints.push(Constraint::Length(1)); // Spacer
    constraints.push(Constraint::Length(1)); // Buttons
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .margin(1)
        .split(inner);

    let focused = form.current_field();
    for (field, row) in inputs.iter().zip(rows.iter()) {
        render_form_row(frame, form, *field, *field == focused, *row);
    }

    if let Some(buttons) = rows.last() {
        render_form_buttons(
            frame,
            focused == FormField::SubmitButton,
            focused == FormField::CancelButton,
            *buttons,
        );
    }

    if let Some(ref error) = form.error {
        let error_area = Rect::new(inner.x, inner.y + inner.height.saturating_sub(1), inner.width, 1);
        let error_text = Paragraph::new(error.as_str())
            .style(styles::error())
            .alignment(Alignment::Center);
        frame.render_widget(error_text, error_area);
    }

    if focused.is_date_picker() {
        let date_str = match focused {
            FormField::StartDate => &form.start_date,
            FormField::EndDate => &form.end_date,
            FormField::FilterStart => &form.filter_start,
            FormField::FilterEnd => &form.filter_end,
            _ => return,
        };
        render_mini_calendar(frame, date_str, app.today, area, popup_area);
    }
}

/// Label on the left, value on the right
fn render_form_row(frame: &mut Frame, form: &FormState, field: FormField, is_focused: bool, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(LABEL_WIDTH), Constraint::Min(10)])
        .split(area);

    let label = Paragraph::new(format!("{}: ", field.label()))
        .style(styles::form_label())
        .alignment(Alignment::Right);
    frame.render_widget(label, chunks[0]);

    let input_style = if is_focused {
        styles::form_input_focused()
    } else {
        styles::form_input()
    };

    let value = if field.is_multi_select() {
        multi_select_line(form, field, is_focused)
    } else {
        Line::from(Span::styled(field_text(form, field, is_focused), input_style))
    };
    frame.render_widget(Paragraph::new(value).style(input_style), chunks[1]);
}

fn field_text(form: &FormState, field: FormField, is_focused: bool) -> String {
    let editable = field.is_text_input() || field.is_date_picker();
    let cursor = if is_focused && editable { "█" } else { "" };
    match field {
        FormField::ItemNumber => format!(" {}{}", form.product.item_number, cursor),
        FormField::Description => format!(" {}{}", form.product.description, cursor),
        FormField::Brand => format!(" {}{}", form.product.brand, cursor),
        FormField::Image => format!(" {}{}", form.product.image.as_deref().unwrap_or(""), cursor),
        FormField::RetailerName => format!(" {}{}", form.retailer_name, cursor),
        FormField::RetailerLogo => format!(" {}{}", form.retailer_logo, cursor),
        FormField::ImportPath => format!(" {}{}", form.import_path, cursor),
        FormField::StartDate | FormField::EndDate | FormField::FilterStart | FormField::FilterEnd => {
            let value = match field {
                FormField::StartDate => &form.start_date,
                FormField::EndDate => &form.end_date,
                FormField::FilterStart => &form.filter_start,
                _ => &form.filter_end,
            };
            let shown = if value.is_empty() && !is_focused { "DD-MM-YYYY" } else { value.as_str() };
            let hint = if is_focused { "  ◀-7 ▲+1 ▼-1 +7▶" } else { "" };
            format!(" {}{}{}", shown, cursor, hint)
        }
        FormField::PlanningType => {
            let arrows = if is_focused { " ▲▼" } else { " ▼" };
            format!(" {}{}", form.product.planning_type.label(), arrows)
        }
        FormField::Season => {
            let arrows = if is_focused { " ▲▼" } else { " ▼" };
            let season = match form.product.season.as_str() {
                "" => "None",
                s => s,
            };
            format!(" {}{}", season, arrows)
        }
        _ => String::new(),
    }
}

/// Checkbox row; the option under the cursor is highlighted when focused
fn multi_select_line(form: &FormState, field: FormField, is_focused: bool) -> Line<'static> {
    let (options, selected) = match field {
        FormField::FilterBrands => (&form.brand_options, &form.selected_brands),
        _ => (&form.retailer_options, &form.selected_retailers),
    };
    if options.is_empty() {
        return Line::from(Span::styled(" (none)", styles::text_hint()));
    }

    let mut spans = vec![Span::raw(" ")];
    for (i, option) in options.iter().enumerate() {
        let mark = if selected.contains(option) { "[x]" } else { "[ ]" };
        let style = if is_focused && i == form.option_cursor {
            selected_style(colors::BLUE)
        } else if selected.contains(option) {
            styles::success()
        } else {
            styles::text_dim()
        };
        spans.push(Span::styled(format!("{} {}", mark, option), style));
        spans.push(Span::raw("  "));
    }
    Line::from(spans)
}

fn render_form_buttons(frame: &mut Frame, save_focused: bool, cancel_focused: bool, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Length(12),
            Constraint::Length(2),
            Constraint::Length(12),
            Constraint::Percentage(30),
        ])
        .split(area);

    let save_style = if save_focused {
        styles::button_focused()
    } else {
        styles::button()
    };
    let save_btn = Paragraph::new("  [ Save ]  ")
        .style(save_style)
        .alignment(Alignment::Center);
    frame.render_widget(save_btn, chunks[1]);

    let cancel_style = if cancel_focused {
        styles::button_danger()
    } else {
        styles::button()
    };
    let cancel_btn = Paragraph::new(" [ Cancel ] ")
        .style(cancel_style)
        .alignment(Alignment::Center);
    frame.render_widget(cancel_btn, chunks[3]);
}

/// Render confirmation dialog
fn render_confirm_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let Some(dialog) = &app.confirm_dialog else {
        return;
    };

    let popup_area = centered_rect(50, 10, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(format!(" {} ", dialog.title))
        .title_style(Style::default().fg(colors::RED).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors::RED))
        .style(Style::default().bg(colors::BG_MEDIUM));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Message
            Constraint::Length(1), // Spacer
            Constraint::Length(1), // Buttons
        ])
        .margin(1)
        .split(inner);

    let message = Paragraph::new(dialog.message.as_str())
        .style(styles::text())
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);
    frame.render_widget(message, chunks[0]);

    let button_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Length(10),
            Constraint::Percentage(10),
            Constraint::Length(10),
            Constraint::Percentage(25),
        ])
        .split(chunks[2]);

    let no_style = if !dialog.yes_focused {
        styles::button_focused()
    } else {
        styles::button()
    };
    let no_btn = Paragraph::new("  [ No ]  ")
        .style(no_style)
        .alignment(Alignment::Center);
    frame.render_widget(no_btn, button_chunks[1]);

    let yes_style = if dialog.yes_focused {
        styles::button_danger()
    } else {
        styles::button()
    };
    let yes_btn = Paragraph::new(" [ Yes ]  ")
        .style(yes_style)
        .alignment(Alignment::Center);
    frame.render_widget(yes_btn, button_chunks[3]);
}

/// Render error popup
fn render_error_popup(frame: &mut Frame, app: &App, area: Rect) {
    let Some(popup) = &app.error_popup else {
        return;
    };

    let popup_width = (area.width * 60 / 100).clamp(30, 60);
    let popup_area = centered_rect(popup_width, 7, area);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(format!(" {} ", popup.title))
        .title_style(
            Style::default()
                .fg(Color::White)
                .bg(colors::RED)
                .add_modifier(Modifier::BOLD),
        )
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors::RED))
        .style(Style::default().bg(Color::Rgb(0x2A, 0x18, 0x18)));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let text = Paragraph::new(popup.message.as_str())
        .style(styles::text())
        .wrap(Wrap { trim: true });
    frame.render_widget(text, inner);

    let hint = Paragraph::new("Press ESC or ENTER to dismiss")
        .style(styles::text_hint())
        .alignment(Alignment::Center);
    let hint_area = Rect::new(
        popup_area.x,
        popup_area.y + popup_area.height.saturating_sub(1),
        popup_area.width,
        1,
    );
    frame.render_widget(hint, hint_area);
}

fn help_section(title: &str) -> Line<'_> {
    Line::from(Span::styled(
        title,
        Style::default().fg(colors::PURPLE).add_modifier(Modifier::BOLD),
    ))
}

fn help_key<'a>(key: &'a str, action: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("  {:<16}", key), Style::default().fg(colors::BLUE)),
        Span::raw(action),
    ])
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().fg(colors::BLUE).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        help_section("Timeline"),
        help_key("h/l, Left/Right", "Scroll (Shift or H/L: faster)"),
        help_key("PgUp/PgDn", "Scroll rows"),
        help_key("j/k", "Walk the bars"),
        help_key("+ / -", "Zoom in / out"),
        help_key("g", "Group by brand / by start date"),
        help_key("t / Home", "Jump to today / to the start"),
        help_key("mouse", "Hover for details, click to edit"),
        Line::from(""),
        help_section("Products & Retailers"),
        help_key("c", "Add product / retailer"),
        help_key("e / Enter", "Edit selection"),
        help_key("d / Delete", "Remove selection"),
        help_key("i", "Look up product image"),
        help_key("b / Space", "Toggle brand / retailer filter"),
        Line::from(""),
        help_section("Planning"),
        help_key("f / F", "Edit / clear filters"),
        help_key("s", "Save"),
        help_key("x", "Export CSV"),
        help_key("I", "Import sheet (CSV or workbook)"),
        help_key("R", "Reset gantt chart"),
        help_key("p", "Check image proxy"),
        Line::from(""),
        help_section("Forms"),
        help_key("Tab/Shift+Tab", "Next / previous field"),
        help_key("Up/Down", "Change selector, date +/-1 day"),
        help_key("Left/Right", "Date +/-7 days"),
        help_key("Space", "Toggle checkbox"),
        help_key("Enter / Esc", "Next field or submit / cancel"),
        Line::from(""),
        help_key("q / Ctrl+C", "Quit (saves first)"),
    ];

    let popup_area = centered_rect(62, help_text.len() as u16 + 2, area);
    frame.render_widget(Clear, popup_area);

    let paragraph = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(" Help ")
                .title_style(styles::title())
                .borders(Borders::ALL)
                .border_style(styles::border())
                .style(Style::default().bg(colors::BG_MEDIUM)),
        )
        .style(styles::text());

    frame.render_widget(paragraph, popup_area);
}

/// Helper to create a centered rectangle
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

/// Month grid next to the form for the focused date field
fn render_mini_calendar(frame: &mut Frame, date_str: &str, today: NaiveDate, screen_area: Rect, form_area: Rect) {
    let date = parse_date(Some(date_str)).unwrap_or(today);

    let cal_width = 24;
    // Title, weekday row, up to six weeks and the hint inside the border
    let cal_height = 11;

    // Right of the form if there is room, else left, else centred
    let cal_x = if form_area.x + form_area.width + cal_width + 2 < screen_area.width {
        form_area.x + form_area.width + 1
    } else if form_area.x >= cal_width + 2 {
        form_area.x - cal_width - 1
    } else {
        (screen_area.width.saturating_sub(cal_width)) / 2
    };

    let cal_y = form_area.y + 2;
    let cal_area = Rect::new(
        cal_x,
        cal_y.min(screen_area.height.saturating_sub(cal_height)),
        cal_width.min(screen_area.width),
        cal_height.min(screen_area.height),
    );

    frame.render_widget(Clear, cal_area);

    let year = date.year();
    let Some(first_of_month) = NaiveDate::from_ymd_opt(year, date.month(), 1) else {
        return;
    };
    let next_month = if date.month() == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, date.month() + 1, 1)
    };
    let days_in_month = next_month
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28);

    // 0 = Monday
    let first_weekday = first_of_month.weekday().num_days_from_monday() as usize;

    let mut lines = Vec::new();

    lines.push(Line::from(Span::styled(
        format!("{:^22}", first_of_month.format("%B %Y").to_string()),
        Style::default().fg(colors::BLUE).add_modifier(Modifier::BOLD),
    )));

    lines.push(Line::from(vec![
        Span::styled(" Mo Tu We Th Fr ", styles::text_dim()),
        Span::styled("Sa ", Style::default().fg(colors::BLUE)),
        Span::styled("Su", Style::default().fg(colors::RED)),
    ]));

    let mut day = 1u32;
    let selected_day = date.day();
    let today_day = (today.year() == year && today.month() == date.month()).then(|| today.day());

    for week in 0..6 {
        if day > days_in_month {
            break;
        }
        let mut spans = vec![Span::raw(" ")];

        for weekday in 0..7 {
            if (week == 0 && weekday < first_weekday) || day > days_in_month {
                spans.push(Span::raw("   "));
            } else {
                let style = if day == selected_day {
                    selected_style(colors::BLUE)
                } else if today_day == Some(day) {
                    Style::default().fg(colors::TODAY_MARKER).add_modifier(Modifier::BOLD)
                } else if weekday == 5 {
                    Style::default().fg(colors::BLUE)
                } else if weekday == 6 {
                    Style::default().fg(colors::RED)
                } else {
                    styles::text()
                };

                spans.push(Span::styled(format!("{:2} ", day), style));
                day += 1;
            }
        }

        lines.push(Line::from(spans));
    }

    lines.push(Line::from(Span::styled("▲▼±1d  ◀▶±7d", styles::text_hint())));

    let calendar = Paragraph::new(lines).block(
        Block::default()
            .title(" Calendar ")
            .title_style(styles::title())
            .borders(Borders::ALL)
            .border_style(styles::border_focused())
            .style(Style::default().bg(colors::BG_MEDIUM)),
    );

    frame.render_widget(calendar, cal_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dashboard::Dashboard;
    use crate::models::{default_retailers, sample_products};
    use crate::store::PlanningStore;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn app(dir: &std::path::Path) -> App {
        let dashboard = Dashboard::new(sample_products(), default_retailers());
        let mut app = App::new(&Config::default(), dashboard, PlanningStore::new(dir));
        app.today = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        app
    }

    #[test]
    fn test_timeline_tab_sets_plot_and_draws_bars() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        let screen = draw(&mut app);
        assert!(screen.contains("Product Timeline"));
        assert!(screen.contains("Product Planning"));
        assert!(app.timeline.plot.width > 0);
        assert!(screen.contains("5 bars"));
    }

    #[test]
    fn test_products_tab_lists_every_product() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        app.active_tab = Tab::Products;
        let screen = draw(&mut app);
        assert!(screen.contains("Products (5/5)"));
        assert!(screen.contains("15719BQ1"));
        assert!(screen.contains("01-09-2025 → 30-11-2025"));
    }

    #[test]
    fn test_form_and_calendar_render() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        app.active_tab = Tab::Products;
        app.handle_key(KeyEvent::new(KeyCode::Char('e'), KeyModifiers::NONE));
        let form = app.form_state.as_mut().unwrap();
        form.focused_field = form.fields.iter().position(|f| *f == FormField::StartDate).unwrap();
        let screen = draw(&mut app);
        assert!(screen.contains("Edit Product"));
        assert!(screen.contains("September 2025"));
        assert!(screen.contains("[x] Retailer A"));
    }

    #[test]
    fn test_help_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        app.show_help = true;
        let screen = draw(&mut app);
        assert!(screen.contains("Keyboard Shortcuts"));
    }

    fn draw_calendar(date: &str) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        terminal
            .draw(|frame| render_mini_calendar(frame, date, today, frame.area(), Rect::new(10, 2, 40, 20)))
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_calendar_shows_last_week_of_month() {
        // September 2025 ends on a Tuesday
        let screen = draw_calendar("15-09-2025");
        assert!(screen.contains("September 2025"));
        assert!(screen.contains("29 30"));

        // March 2025 starts on a Saturday and spans six weeks
        let screen = draw_calendar("31-03-2025");
        assert!(screen.contains("31"));
        assert!(screen.contains("±7d"));
    }

    #[test]
    fn test_selected_product_scrolls_into_view() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        let template = sample_products().remove(0);
        app.dashboard.products = (0..60)
            .map(|i| {
                let mut p = template.clone();
                p.id = format!("ID-{i}");
                p.item_number = format!("ITEM-{i}");
                p
            })
            .collect();
        app.active_tab = Tab::Products;
        app.list_selected = 59;
        let screen = draw(&mut app);
        assert!(screen.contains("ITEM-59"));
        assert!(!screen.contains("ITEM-0 "));
    }

    #[test]
    fn test_log_panel_shows_time() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        let entry = crate::app::LogEntry::info("Planning saved");
        let expected = format!("{}[i] Planning saved", entry.timestamp.format("%H:%M:%S "));
        app.logs.push(entry);
        let screen = draw(&mut app);
        assert!(screen.contains(&expected));
    }
}
