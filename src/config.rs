use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Vertical slot of one trace row.
    pub row_height: f32,
    /// Horizontal step per nesting level.
    pub level_width: f32,
    pub text_margin: f32,
    /// Gap between the annotation column and the timeline.
    pub comment_margin: f32,
    /// Half the width of the annotation column left of the timeline.
    pub annotation_half_width: f32,
    pub event_box_height: f32,
    pub event_box_radius: f32,
    /// Comment baseline below an event box.
    pub comment_offset: f32,
    /// Rows of padding added under the content.
    pub padding_rows: f32,
    pub min_text_width: f32,
    pub legend_item_height: f32,
    pub legend_line_width: f32,
    pub legend_margin: f32,
    pub min_legend_label_width: f32,
    pub method_font_size: f32,
    pub call_font_size: f32,
    pub legend_font_size: f32,
    pub details_font_size: f32,
    /// Width estimates from per-character factors instead of font outlines.
    pub fast_text_metrics: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            row_height: 40.0,
            level_width: 30.0,
            text_margin: 10.0,
            comment_margin: 20.0,
            annotation_half_width: 75.0,
            event_box_height: 30.0,
            event_box_radius: 10.0,
            comment_offset: 25.0,
            padding_rows: 2.0,
            min_text_width: 120.0,
            legend_item_height: 30.0,
            legend_line_width: 30.0,
            legend_margin: 20.0,
            min_legend_label_width: 60.0,
            method_font_size: 15.0,
            call_font_size: 14.0,
            legend_font_size: 16.0,
            details_font_size: 9.5,
            fast_text_metrics: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Raster size for PNG export. Zero keeps the SVG's own size.
    pub width: f32,
    pub height: f32,
    pub background: String,
    /// Emit the `<?xml ...?>` prolog.
    pub xml_header: bool,
    /// Embed the chart text as an SVG comment.
    pub embed_code: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            background: "#FFFFFF".to_string(),
            xml_header: true,
            embed_code: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    background: Option<String>,
    timeline_color: Option<String>,
    info_color: Option<String>,
    info_background: Option<String>,
    details_color: Option<String>,
    legend_text_color: Option<String>,
    legend_border_color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    row_height: Option<f32>,
    level_width: Option<f32>,
    text_margin: Option<f32>,
    comment_margin: Option<f32>,
    annotation_half_width: Option<f32>,
    event_box_height: Option<f32>,
    event_box_radius: Option<f32>,
    comment_offset: Option<f32>,
    padding_rows: Option<f32>,
    min_text_width: Option<f32>,
    legend_item_height: Option<f32>,
    legend_line_width: Option<f32>,
    legend_margin: Option<f32>,
    min_legend_label_width: Option<f32>,
    method_font_size: Option<f32>,
    call_font_size: Option<f32>,
    legend_font_size: Option<f32>,
    details_font_size: Option<f32>,
    fast_text_metrics: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    background: Option<String>,
    xml_header: Option<bool>,
    embed_code: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    render: Option<RenderConfigFile>,
}

macro_rules! apply {
    ($target:expr, $source:expr, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(value) = $source.$field {
                $target.$field = value;
            }
        )*
    };
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Applies a JSON (or JSON5) override document on top of the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents).map_err(|json5_err| {
            anyhow::anyhow!("invalid config file: {json_err} (as JSON5: {json5_err})")
        })?,
    };

    let mut config = Config::default();
    match parsed.theme.as_deref() {
        Some("modern") => config.theme = Theme::modern(),
        Some("classic") | Some("default") | None => {}
        Some(other) => tracing::warn!(theme = other, "unknown theme, keeping classic"),
    }

    if let Some(vars) = parsed.theme_variables {
        apply!(
            config.theme,
            vars,
            [
                font_family,
                background,
                timeline_color,
                info_color,
                info_background,
                details_color,
                legend_text_color,
                legend_border_color,
            ]
        );
    }
    config.render.background = config.theme.background.clone();

    if let Some(layout) = parsed.layout {
        apply!(
            config.layout,
            layout,
            [
                row_height,
                level_width,
                text_margin,
                comment_margin,
                annotation_half_width,
                event_box_height,
                event_box_radius,
                comment_offset,
                padding_rows,
                min_text_width,
                legend_item_height,
                legend_line_width,
                legend_margin,
                min_legend_label_width,
                method_font_size,
                call_font_size,
                legend_font_size,
                details_font_size,
                fast_text_metrics,
            ]
        );
    }

    if let Some(render) = parsed.render {
        apply!(
            config.render,
            render,
            [width, height, background, xml_header, embed_code]
        );
    }

    Ok(config)
}
