//! Dashboard theme.
//!
//! Low-contrast, warm, dark palette for the chrome of the dashboard. Bar
//! colors come from the planning-type table in the layout engine and are
//! converted here.

use ratatui::style::Color;

use crate::layout::{fill_for, Fill};
use crate::models::PlanningType;

/// Kanagawa Dragon color palette
pub mod colors {
    use super::Color;

    // === Background Colors ===
    /// Dragon Black - Primary background
    pub const BG_DARK: Color = Color::Rgb(0x18, 0x16, 0x16);
    /// Slightly lighter background for medium contrast areas
    pub const BG_MEDIUM: Color = Color::Rgb(0x1D, 0x1C, 0x19);
    /// Background for highlighted/selected areas
    pub const BG_HIGHLIGHT: Color = Color::Rgb(0x28, 0x27, 0x27);

    // === Foreground Colors ===
    /// Old White - Primary text color
    pub const FG_PRIMARY: Color = Color::Rgb(0xC5, 0xC9, 0xC5);
    /// Dimmed text for secondary information
    pub const FG_DIM: Color = Color::Rgb(0x72, 0x71, 0x69);
    /// Very dim text for hints and placeholders
    pub const FG_HINT: Color = Color::Rgb(0x54, 0x54, 0x54);

    // === Accent Colors ===
    pub const RED: Color = Color::Rgb(0xC4, 0x74, 0x6E);
    pub const GREEN: Color = Color::Rgb(0x8A, 0x9A, 0x7B);
    pub const YELLOW: Color = Color::Rgb(0xC4, 0xB2, 0x8A);
    pub const BLUE: Color = Color::Rgb(0x8B, 0xA4, 0xB0);
    pub const PURPLE: Color = Color::Rgb(0x95, 0x7F, 0xB8);

    // === UI Element Colors ===
    /// Wall Gray - For borders and separators
    pub const BORDER: Color = Color::Rgb(0x72, 0x71, 0x69);
    /// Dim border for less important separators
    pub const BORDER_DIM: Color = Color::Rgb(0x3A, 0x3A, 0x3A);
    /// Accent border for focused elements
    pub const BORDER_ACCENT: Color = Color::Rgb(0x8B, 0xA4, 0xB0);

    // === Timeline Colors ===
    pub const TODAY_MARKER: Color = YELLOW;
    /// Holiday dashed lines and labels
    pub const HOLIDAY: Color = Color::Rgb(0xE4, 0x6B, 0x6B);
    pub const QUARTER_LINE: Color = Color::Rgb(0x99, 0x99, 0x99);
    pub const MONTH_LINE: Color = Color::Rgb(0x5A, 0x5A, 0x5A);
    pub const WEEK_LINE: Color = Color::Rgb(0x2E, 0x2E, 0x2E);
}

impl From<Fill> for Color {
    fn from(fill: Fill) -> Self {
        Color::Rgb(fill.0, fill.1, fill.2)
    }
}

/// Bar color for a planning type
pub fn planning_color(kind: PlanningType) -> Color {
    fill_for(kind).into()
}

/// Readable text color on top of a fill
pub fn text_on(fill: Fill) -> Color {
    let luma = 0.299 * fill.0 as f32 + 0.587 * fill.1 as f32 + 0.114 * fill.2 as f32;
    if luma > 150.0 {
        colors::BG_DARK
    } else {
        Color::White
    }
}

/// Semantic styling helpers
pub mod styles {
    use ratatui::style::{Modifier, Style};
    use super::colors;

    pub fn text() -> Style {
        Style::default().fg(colors::FG_PRIMARY)
    }

    pub fn text_dim() -> Style {
        Style::default().fg(colors::FG_DIM)
    }

    pub fn text_hint() -> Style {
        Style::default().fg(colors::FG_HINT)
    }

    pub fn success() -> Style {
        Style::default().fg(colors::GREEN)
    }

    pub fn error() -> Style {
        Style::default().fg(colors::RED)
    }

    pub fn warning() -> Style {
        Style::default().fg(colors::YELLOW)
    }

    pub fn border_focused() -> Style {
        Style::default().fg(colors::BORDER_ACCENT)
    }

    pub fn border() -> Style {
        Style::default().fg(colors::BORDER)
    }

    pub fn border_dim() -> Style {
        Style::default().fg(colors::BORDER_DIM)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(colors::FG_PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for accent titles (tabs, headers)
    pub fn title_accent() -> Style {
        Style::default()
            .fg(colors::BLUE)
            .add_modifier(Modifier::BOLD)
    }

    pub fn tab_active() -> Style {
        Style::default()
            .fg(colors::BLUE)
            .add_modifier(Modifier::BOLD)
    }

    pub fn tab_inactive() -> Style {
        Style::default().fg(colors::FG_DIM)
    }

    pub fn form_label() -> Style {
        Style::default().fg(colors::FG_DIM)
    }

    pub fn form_input_focused() -> Style {
        Style::default()
            .fg(colors::FG_PRIMARY)
            .bg(colors::BG_HIGHLIGHT)
    }

    pub fn form_input() -> Style {
        Style::default()
            .fg(colors::FG_PRIMARY)
            .bg(colors::BG_MEDIUM)
    }

    pub fn button() -> Style {
        Style::default()
            .fg(colors::FG_PRIMARY)
            .bg(colors::BG_MEDIUM)
    }

    pub fn button_focused() -> Style {
        Style::default()
            .fg(colors::BG_DARK)
            .bg(colors::BLUE)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for danger buttons (delete, cancel)
    pub fn button_danger() -> Style {
        Style::default()
            .fg(colors::BG_DARK)
            .bg(colors::RED)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for modal content background
    pub fn modal_content_bg() -> Style {
        Style::default().bg(colors::BG_MEDIUM)
    }
}
