//! Theme colors, taken from the predictor web page palette and
//! optionally overridden from the `[theme]` config table.

use ratatui::style::Color;

use crate::config::ThemeConfig;

/// Theme colors for the UI
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub accent: Color,      // Focused borders, button, section titles
    pub success: Color,     // Predicted score panel
    pub danger: Color,      // Error panel
    pub text: Color,        // Field values
    pub text_dim: Color,    // Labels, hints
    pub inactive: Color,    // Unfocused borders
    pub bg_selected: Color, // Focused button background
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Rgb(76, 114, 176),      // #4C72B0
            success: Color::Rgb(85, 168, 104),     // #55A868
            danger: Color::Rgb(196, 78, 82),       // #C44E52
            text: Color::Rgb(234, 234, 242),       // #EAEAF2
            text_dim: Color::Rgb(147, 153, 178),
            inactive: Color::Rgb(88, 91, 112),
            bg_selected: Color::Rgb(59, 90, 140),  // #3b5a8c
        }
    }
}

impl Theme {
    /// Defaults with any valid overrides from config applied
    pub fn from_config(config: &ThemeConfig) -> Self {
        let defaults = Self::default();
        let pick = |value: &Option<String>, fallback: Color| {
            match value.as_deref() {
                Some(hex) => Self::parse_hex_color(hex).unwrap_or_else(|| {
                    tracing::warn!("Ignoring invalid theme color: {}", hex);
                    fallback
                }),
                None => fallback,
            }
        };

        Self {
            accent: pick(&config.accent, defaults.accent),
            success: pick(&config.success, defaults.success),
            danger: pick(&config.danger, defaults.danger),
            text: pick(&config.text, defaults.text),
            text_dim: pick(&config.text_dim, defaults.text_dim),
            inactive: pick(&config.inactive, defaults.inactive),
            bg_selected: pick(&config.bg_selected, defaults.bg_selected),
        }
    }

    /// Parse a hex color string (#RRGGBB or #RGB)
    fn parse_hex_color(s: &str) -> Option<Color> {
        let s = s.trim().trim_start_matches('#');
        if !s.is_ascii() {
            return None;
        }

        if s.len() == 6 {
            let r = u8::from_str_radix(&s[0..2], 16).ok()?;
            let g = u8::from_str_radix(&s[2..4], 16).ok()?;
            let b = u8::from_str_radix(&s[4..6], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        } else if s.len() == 3 {
            let r = u8::from_str_radix(&s[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&s[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&s[2..3], 16).ok()? * 17;
            Some(Color::Rgb(r, g, b))
        } else {
            None
        }
    }
}
