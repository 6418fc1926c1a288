//! Overlay color presets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named overlay theme. Persisted by display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    Classic,
    Dark,
    Light,
    #[serde(rename = "YouTube Red")]
    YouTubeRed,
    Ocean,
    #[serde(rename = "High Contrast")]
    HighContrast,
    Transparent,
    #[serde(rename = "Solarized Dark")]
    SolarizedDark,
    #[serde(rename = "Solarized Light")]
    SolarizedLight,
    /// User-picked colors; selecting it leaves the stored colors alone.
    Custom,
}

/// Box background and text color of a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeColors {
    pub background: &'static str,
    pub text: &'static str,
}

impl Theme {
    pub const ALL: [Theme; 10] = [
        Theme::Classic,
        Theme::Dark,
        Theme::Light,
        Theme::YouTubeRed,
        Theme::Ocean,
        Theme::HighContrast,
        Theme::Transparent,
        Theme::SolarizedDark,
        Theme::SolarizedLight,
        Theme::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Theme::Classic => "Classic",
            Theme::Dark => "Dark",
            Theme::Light => "Light",
            Theme::YouTubeRed => "YouTube Red",
            Theme::Ocean => "Ocean",
            Theme::HighContrast => "High Contrast",
            Theme::Transparent => "Transparent",
            Theme::SolarizedDark => "Solarized Dark",
            Theme::SolarizedLight => "Solarized Light",
            Theme::Custom => "Custom",
        }
    }

    /// Preset colors; `None` for [`Theme::Custom`].
    pub fn colors(self) -> Option<ThemeColors> {
        let (background, text) = match self {
            Theme::Classic => ("#ffa500", "#ffffff"),
            Theme::Dark => ("#222222", "#ffffff"),
            Theme::Light => ("#ffffff", "#222222"),
            Theme::YouTubeRed => ("#ff0000", "#ffffff"),
            Theme::Ocean => ("#0077be", "#ffffff"),
            Theme::HighContrast => ("#000000", "#ffff00"),
            Theme::Transparent => ("transparent", "#ffa500"),
            Theme::SolarizedDark => ("#073642", "#eee8d5"),
            Theme::SolarizedLight => ("#fdf6e3", "#657b83"),
            Theme::Custom => return None,
        };
        Some(ThemeColors { background, text })
    }

    /// Look up a theme by its display name. Unknown names map to `Custom`,
    /// which keeps whatever colors are stored.
    pub fn from_name(name: &str) -> Theme {
        Theme::ALL
            .into_iter()
            .find(|t| t.name() == name)
            .unwrap_or(Theme::Custom)
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Theme {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Theme::from_name(s))
    }
}
