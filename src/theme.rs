//! Theme colors for the board UI
//! Optionally overridden from ~/.config/capboard/theme.conf (kitty-style `key #hex` lines)

use ratatui::style::Color;
use std::collections::HashMap;
use std::fs;

/// Theme colors for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,      // Active borders, highlights
    pub danger: Color,      // Error banner, unregister hints
    pub success: Color,     // Success banner, roster counts
    pub warning: Color,     // Confirm popup
    pub text: Color,        // Primary text
    pub text_dim: Color,    // Dimmed text, empty states
    pub bg_selected: Color, // Selection background
    pub inactive: Color,    // Inactive borders
    pub header: Color,      // Table header text
}

impl Default for Theme {
    fn default() -> Self {
        // Catppuccin-inspired fallback palette
        Self {
            accent: Color::Rgb(250, 179, 135),
            danger: Color::Rgb(243, 139, 168),
            success: Color::Rgb(166, 218, 149),
            warning: Color::Rgb(249, 226, 175),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            bg_selected: Color::Rgb(69, 71, 90),
            inactive: Color::Rgb(88, 91, 112),
            header: Color::Rgb(137, 180, 250),
        }
    }
}

impl Theme {
    /// Load the theme override if present, otherwise the fallback palette
    pub fn load() -> Self {
        Self::load_user_theme().unwrap_or_default()
    }

    fn load_user_theme() -> Option<Self> {
        let theme_path = dirs::config_dir()?.join("capboard/theme.conf");
        let content = fs::read_to_string(&theme_path).ok()?;
        let colors = Self::parse_theme_conf(&content);

        if colors.is_empty() {
            return None;
        }

        let defaults = Self::default();
        let pick = |key: &str, fallback: Color| colors.get(key).copied().unwrap_or(fallback);

        Some(Self {
            accent: pick("accent", defaults.accent),
            danger: pick("danger", defaults.danger),
            success: pick("success", defaults.success),
            warning: pick("warning", defaults.warning),
            text: pick("text", defaults.text),
            text_dim: pick("text_dim", defaults.text_dim),
            bg_selected: pick("bg_selected", defaults.bg_selected),
            inactive: pick("inactive", defaults.inactive),
            header: pick("header", defaults.header),
        })
    }

    /// Parse `key value` lines where value is a hex color
    fn parse_theme_conf(content: &str) -> HashMap<String, Color> {
        let mut colors = HashMap::new();

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.splitn(2, char::is_whitespace).collect();
            if parts.len() == 2 {
                if let Some(color) = Self::parse_hex_color(parts[1].trim()) {
                    colors.insert(parts[0].trim().to_string(), color);
                }
            }
        }

        colors
    }

    /// Parse a hex color string (#RRGGBB or #RGB)
    fn parse_hex_color(s: &str) -> Option<Color> {
        let s = s.trim().trim_start_matches('#');

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(
            Theme::parse_hex_color("#ffc107"),
            Some(Color::Rgb(255, 193, 7))
        );
        assert_eq!(Theme::parse_hex_color("fff"), Some(Color::Rgb(255, 255, 255)));
        assert_eq!(Theme::parse_hex_color("#12345"), None);
        assert_eq!(Theme::parse_hex_color("zzzzzz"), None);
    }

    #[test]
    fn test_parse_theme_conf() {
        let conf = "# comment\naccent #ff0000\n\ndanger   00ff00\nbroken\n";
        let colors = Theme::parse_theme_conf(conf);
        assert_eq!(colors.get("accent"), Some(&Color::Rgb(255, 0, 0)));
        assert_eq!(colors.get("danger"), Some(&Color::Rgb(0, 255, 0)));
        assert_eq!(colors.len(), 2);
    }
}
