use std::collections::BTreeMap;

use palette::{Hsl, IntoColor, Srgb};

use crate::config::PipelineConfig;
use crate::data::mapper::map_category;
use crate::data::model::Dataset;
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues, as
/// `#rrggbb` strings.
pub fn generate_palette(n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_hex(rgb.into_format())
        })
        .collect()
}

pub fn to_hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

/// Resolve a CSS/SVG colour name (`"lightgrey"`) or `#rrggbb` string to RGB.
pub fn resolve_color(name: &str) -> Option<Srgb<u8>> {
    let name = name.trim();
    if let Some(hex) = name.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        return Some(Srgb::new(channel(0)?, channel(2)?, channel(4)?));
    }
    palette::named::from_str(&name.to_ascii_lowercase())
}

// ---------------------------------------------------------------------------
// Color mapping: facility name → display colour
// ---------------------------------------------------------------------------

/// Maps a whitelist of facility names to display colours, with a fallback
/// colour for every other facility.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMap {
    /// Whitelist in display order.
    entries: Vec<(String, String)>,
    mapping: BTreeMap<String, String>,
    default_color: String,
}

impl ColorMap {
    /// Build the map from configuration.
    ///
    /// Explicit `hospital_color_map` entries win; selected hospitals without
    /// one get a generated palette colour.  Every colour must resolve.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        let explicit: BTreeMap<String, String> = config
            .hospital_color_map
            .iter()
            .map(|(name, color)| (name.trim().to_string(), color.trim().to_string()))
            .collect();

        let uncolored: Vec<&String> = config
            .selected_hospitals
            .iter()
            .filter(|h| !explicit.contains_key(h.trim()))
            .collect();
        let mut generated = generate_palette(uncolored.len()).into_iter();

        let mut entries: Vec<(String, String)> = Vec::new();
        for hospital in &config.selected_hospitals {
            let name = hospital.trim().to_string();
            if entries.iter().any(|(n, _)| *n == name) {
                continue;
            }
            let color = match explicit.get(&name) {
                Some(color) => color.clone(),
                None => generated.next().unwrap_or_else(|| config.default_color.clone()),
            };
            entries.push((name, color));
        }
        // Colours for facilities that are not in the selected list.
        for (name, color) in &explicit {
            if !entries.iter().any(|(n, _)| n == name) {
                entries.push((name.clone(), color.clone()));
            }
        }

        let default_color = config.default_color.trim().to_string();
        for color in entries.iter().map(|(_, c)| c).chain(std::iter::once(&default_color)) {
            if resolve_color(color).is_none() {
                return Err(ConfigError::UnknownColor(color.clone()));
            }
        }

        let mapping = entries.iter().cloned().collect();
        Ok(ColorMap {
            entries,
            mapping,
            default_color,
        })
    }

    /// Look up the colour for a facility name; surrounding whitespace is
    /// ignored.
    pub fn color_for(&self, facility_name: &str) -> &str {
        self.mapping
            .get(facility_name.trim())
            .map(String::as_str)
            .unwrap_or(self.default_color.as_str())
    }

    pub fn default_color(&self) -> &str {
        &self.default_color
    }

    /// Add `target` holding each row's colour, looked up from `source`.
    pub fn assign(&self, dataset: &Dataset, source: &str, target: &str) -> Dataset {
        map_category(dataset, source, target, &self.mapping, Some(self.default_color.as_str()))
    }

    /// Return the legend entries (facility name → RGB colour).
    pub fn legend_entries(&self) -> Vec<(String, Srgb<u8>)> {
        self.entries
            .iter()
            .filter_map(|(name, color)| resolve_color(color).map(|rgb| (name.clone(), rgb)))
            .collect()
    }
}
