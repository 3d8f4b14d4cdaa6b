use serde::{Deserialize, Serialize};

const DEFAULT_PALETTE: [&str; 14] = [
    "#FF6F00", "#006FFF", "#388E3C", "#FF4343", "#673AB7", "#D73AB7", "#6F0808", "#F5BC00",
    "#200070", "#00B0A0", "#E09080", "#A0E000", "#9090E0", "#9D939A",
];

/// Colour given to the `index`-th category when none was declared.
pub fn palette_color(index: usize) -> &'static str {
    DEFAULT_PALETTE[index % DEFAULT_PALETTE.len()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub background: String,
    pub timeline_color: String,
    pub info_color: String,
    pub info_background: String,
    pub details_color: String,
    pub legend_text_color: String,
    pub legend_border_color: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "Arial, sans-serif".to_string(),
            background: "#FFFFFF".to_string(),
            timeline_color: "#003300".to_string(),
            info_color: "#009700".to_string(),
            info_background: "#EDF7E6".to_string(),
            details_color: "#979797".to_string(),
            legend_text_color: "black".to_string(),
            legend_border_color: "black".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            background: "#FFFFFF".to_string(),
            timeline_color: "#1C2430".to_string(),
            info_color: "#2E7D32".to_string(),
            info_background: "#F1F8E9".to_string(),
            details_color: "#7A8AA6".to_string(),
            legend_text_color: "#1C2430".to_string(),
            legend_border_color: "#C7D2E5".to_string(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
