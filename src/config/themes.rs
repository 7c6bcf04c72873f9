use std::collections::HashMap;

use ratatui::style::Color;

use super::ThemeName;

/// Colours the list screen is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub accent: Color,
    pub text: Color,
    pub muted: Color,
    pub completed: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub active_filter: Color,
    pub error: Color,
}

#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    palettes: HashMap<ThemeName, Palette>,
}

impl ThemeRegistry {
    pub fn contains(&self, theme: &ThemeName) -> bool {
        self.palettes.contains_key(theme)
    }

    pub fn palette(&self, theme: ThemeName) -> Palette {
        self.palettes
            .get(&theme)
            .or_else(|| self.palettes.get(&ThemeName::Dark))
            .copied()
            .unwrap_or(DARK)
    }
}

const DARK: Palette = Palette {
    accent: Color::Cyan,
    text: Color::White,
    muted: Color::Gray,
    completed: Color::DarkGray,
    selection_bg: Color::Blue,
    selection_fg: Color::Black,
    active_filter: Color::Yellow,
    error: Color::Red,
};

impl Default for ThemeRegistry {
    fn default() -> Self {
        let palettes = [
            (ThemeName::Dark, DARK),
            (
                ThemeName::Light,
                Palette {
                    accent: Color::Blue,
                    text: Color::Black,
                    muted: Color::DarkGray,
                    completed: Color::Gray,
                    selection_bg: Color::LightBlue,
                    selection_fg: Color::Black,
                    active_filter: Color::Magenta,
                    error: Color::Red,
                },
            ),
            (
                ThemeName::HighContrast,
                Palette {
                    accent: Color::White,
                    text: Color::White,
                    muted: Color::White,
                    completed: Color::Gray,
                    selection_bg: Color::White,
                    selection_fg: Color::Black,
                    active_filter: Color::LightYellow,
                    error: Color::LightRed,
                },
            ),
            (
                ThemeName::Solarized,
                Palette {
                    accent: Color::Rgb(38, 139, 210),
                    text: Color::Rgb(147, 161, 161),
                    muted: Color::Rgb(88, 110, 117),
                    completed: Color::Rgb(88, 110, 117),
                    selection_bg: Color::Rgb(7, 54, 66),
                    selection_fg: Color::Rgb(238, 232, 213),
                    active_filter: Color::Rgb(181, 137, 0),
                    error: Color::Rgb(220, 50, 47),
                },
            ),
        ]
        .into_iter()
        .collect();
        Self { palettes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_theme_name_has_a_palette() {
        let registry = ThemeRegistry::default();
        for theme in [
            ThemeName::Dark,
            ThemeName::Light,
            ThemeName::HighContrast,
            ThemeName::Solarized,
        ] {
            assert!(registry.contains(&theme));
        }
        assert!(!registry.contains(&ThemeName::Unknown));
        assert_eq!(registry.palette(ThemeName::Unknown), DARK);
    }
}
