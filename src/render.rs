use crate::config::{Config, RenderConfig};
use crate::embed::code_comment;
use crate::ir::ChartData;
use crate::layout::{
    AnnotationLayout, BoundingBox, ChartLayout, Content, ContentLayout, LegendLayout, SpanKind,
    SpanLayout, category_class,
};
use crate::theme::Theme;
use std::fmt::Write as _;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[cfg(feature = "png")]
    #[error("generated SVG could not be read back: {0}")]
    Svg(#[from] usvg::Error),
    #[error("failed to allocate a {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },
    #[error("failed to encode PNG: {0}")]
    Encode(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Full SVG document for `chart` laid out as `layout`.
pub fn render_svg(chart: &ChartData, layout: &ChartLayout, config: &Config) -> String {
    let theme = &config.theme;
    let content = svg_content(&layout.content);
    let legend = svg_legend(&layout.legend);
    let bounds = content.bounds.union(&legend.bounds);
    let width = num(bounds.max.x);
    let height = num(bounds.max.y);

    let mut svg = String::new();
    if config.render.xml_header {
        svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    }
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">"
    );
    if config.render.embed_code {
        svg.push_str(&code_comment(chart));
        svg.push('\n');
    }
    svg.push_str(&svg_style(chart, theme, config));
    svg.push_str(&legend.markup);
    svg.push_str(SVG_DEFS);
    svg.push_str(&content.markup);
    svg.push_str("</svg>\n");
    svg
}

pub fn svg_content(layout: &ContentLayout) -> Content {
    let mut markup = String::new();
    let _ = writeln!(
        markup,
        "<g class=\"state-timeline\" transform=\"translate({}, {})\">",
        num(layout.timeline.x),
        num(layout.timeline.y)
    );
    let _ = writeln!(
        markup,
        "  <line x1=\"0\" y1=\"0\" x2=\"0\" y2=\"{}\" class=\"timeline\" />",
        num(layout.timeline_length)
    );
    for span in &layout.spans {
        push_span(&mut markup, span, layout);
    }
    markup.push_str("</g>\n");
    Content {
        markup,
        bounds: layout.bounds,
    }
}

fn push_span(out: &mut String, span: &SpanLayout, layout: &ContentLayout) {
    let x = num(span.origin.x - layout.timeline.x);
    let y = num(span.origin.y - layout.timeline.y);
    let back = num(-span.level_width);
    let name = escape_xml(&span.name);
    let label_x = num(span.label_x);

    match span.kind {
        SpanKind::Call => {
            let _ = writeln!(
                out,
                "  <g class=\"call {}\" transform=\"translate({x}, {y})\">",
                span.class_name
            );
            if let Some(annotation) = &span.annotation {
                push_annotation(out, annotation);
            }
            if !span.name.is_empty() {
                let _ = writeln!(out, "    <text x=\"{label_x}\" y=\"0\" class=\"label-call\">{name}</text>");
                let _ = writeln!(out, "    <line x1=\"{back}\" y1=\"0\" x2=\"0\" y2=\"0\" class=\"call-method\" />");
            }
        }
        SpanKind::Method { exit_y } => {
            let exit = num(exit_y);
            let _ = writeln!(
                out,
                "  <g class=\"method {}\" transform=\"translate({x}, {y})\">",
                span.class_name
            );
            if let Some(annotation) = &span.annotation {
                push_annotation(out, annotation);
            }
            let _ = writeln!(out, "    <text x=\"{label_x}\" y=\"0\" class=\"label-method\">{name}</text>");
            let _ = writeln!(out, "    <line x1=\"{back}\" y1=\"0\" x2=\"0\" y2=\"0\" class=\"start-method\" />");
            let _ = writeln!(out, "    <line x1=\"0\" y1=\"0\" x2=\"0\" y2=\"{exit}\" class=\"period-method\" />");
            let _ = writeln!(
                out,
                "    <line x1=\"0\" y1=\"{exit}\" x2=\"{back}\" y2=\"{exit}\" class=\"stop-method\" />"
            );
        }
    }
    out.push_str("  </g>\n");
}

fn push_annotation(out: &mut String, annotation: &AnnotationLayout) {
    let _ = writeln!(
        out,
        "    <line x1=\"{}\" y1=\"0\" x2=\"{}\" y2=\"0\" class=\"link-info\" />",
        num(annotation.link_start_x),
        num(annotation.link_end_x)
    );
    if let Some(event) = &annotation.event {
        let _ = writeln!(
            out,
            "    <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"{}\" class=\"info-box\" />",
            num(event.x),
            num(event.y),
            num(event.width),
            num(event.height),
            num(event.radius)
        );
        let _ = writeln!(
            out,
            "    <text x=\"{}\" y=\"0\" class=\"label-info\">{}</text>",
            num(annotation.text_x),
            escape_xml(&event.text)
        );
    }
    if let Some((at, comment)) = &annotation.comment {
        let _ = writeln!(
            out,
            "    <text x=\"{}\" y=\"{}\" class=\"details-info\">{}</text>",
            num(at.x),
            num(at.y),
            escape_xml(comment)
        );
    }
}

pub fn svg_legend(layout: &LegendLayout) -> Content {
    let mut markup = String::new();
    let _ = writeln!(
        markup,
        "<g class=\"legend\" transform=\"translate({}, {})\">",
        num(layout.origin.x),
        num(layout.origin.y)
    );
    let frame: BoundingBox = layout.frame;
    let _ = writeln!(
        markup,
        "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" class=\"legend-box\" />",
        num(frame.min.x - layout.origin.x),
        num(frame.min.y - layout.origin.y),
        num(frame.width()),
        num(frame.height())
    );
    for item in &layout.items {
        let _ = writeln!(
            markup,
            "  <g class=\"{}\" transform=\"translate(0, {})\">",
            item.class_name,
            num(item.y)
        );
        let _ = writeln!(
            markup,
            "    <line x1=\"0\" y1=\"0\" x2=\"{}\" y2=\"0\" />",
            num(layout.line_width)
        );
        let _ = writeln!(
            markup,
            "    <text x=\"{}\" y=\"0\" class=\"label-legend\">{}</text>",
            num(layout.label_x),
            escape_xml(&item.label)
        );
        markup.push_str("  </g>\n");
    }
    markup.push_str("</g>\n");
    Content {
        markup,
        bounds: layout.bounds,
    }
}

pub fn svg_style(chart: &ChartData, theme: &Theme, config: &Config) -> String {
    let layout = &config.layout;
    let font = &theme.font_family;
    let mut style = String::from("<style>\n");
    let _ = writeln!(style, "svg {{ background: {}; }}", config.render.background);
    style.push_str(".marker { stroke: context-stroke; stroke-width: 2; }\n");
    let _ = writeln!(
        style,
        ".timeline {{ stroke: {}; stroke-width: 4; stroke-dasharray: 10 2; marker-end: url(#arrowhead); marker-start: url(#marker); }}",
        theme.timeline_color
    );
    for category in chart.ordered_categories() {
        let _ = writeln!(
            style,
            ".{} {{ stroke: {color}; fill: {color}; }}",
            category_class(&category.key),
            color = css_value(&category.color)
        );
    }
    style.push_str(concat!(
        ".start-method { fill: none; stroke-width: 2; stroke-dasharray: 5 4; marker-end: url(#arrowhead); marker-start: url(#bullet); }\n",
        ".stop-method { fill: none; stroke-width: 2; stroke-dasharray: 5 4; marker-end: url(#arrowhead); }\n",
        ".period-method { stroke-width: 2; fill: none; }\n",
        ".call-method { fill: none; stroke-width: 2; marker-end: url(#arrowhead); marker-start: url(#bullet); }\n",
    ));
    let _ = writeln!(
        style,
        ".label-method {{ font-family: {font}; font-size: {}px; font-weight: bold; text-anchor: start; dominant-baseline: middle; stroke: none; }}",
        num(layout.method_font_size)
    );
    let _ = writeln!(
        style,
        ".label-call {{ font-family: {font}; font-size: {}px; text-anchor: start; dominant-baseline: middle; stroke: none; }}",
        num(layout.call_font_size)
    );
    let _ = writeln!(
        style,
        ".label-info {{ font-family: {font}; font-size: {}px; text-anchor: middle; dominant-baseline: middle; stroke: none; fill: {}; }}",
        num(layout.call_font_size),
        theme.info_color
    );
    let _ = writeln!(
        style,
        ".details-info {{ font-family: {font}; font-size: {}px; text-anchor: middle; dominant-baseline: middle; stroke: none; fill: {}; }}",
        num(layout.details_font_size),
        theme.details_color
    );
    let _ = writeln!(
        style,
        ".info-box {{ stroke: {}; fill: {}; stroke-width: 2; }}",
        theme.info_color, theme.info_background
    );
    let _ = writeln!(
        style,
        ".link-info {{ stroke: {}; stroke-width: 0.5; stroke-dasharray: 15 2; marker-end: url(#bullet); }}",
        theme.info_color
    );
    style.push_str(".legend { text-anchor: start; dominant-baseline: middle; stroke-width: 4; }\n");
    let _ = writeln!(
        style,
        ".legend text {{ font-family: {font}; font-size: {}px; fill: {}; stroke: none; }}",
        num(layout.legend_font_size),
        theme.legend_text_color
    );
    let _ = writeln!(
        style,
        ".legend-box {{ fill: none; stroke: {}; }}",
        theme.legend_border_color
    );
    style.push_str("</style>\n");
    style
}

const SVG_DEFS: &str = r#"<defs>
  <marker id="arrowhead" markerWidth="5" markerHeight="7" refX="4" refY="1.75" orient="auto">
    <polygon points="0,0 5,1.75 0,3.5" fill="context-stroke" />
  </marker>
  <marker id="bullet" markerWidth="5" markerHeight="5" refX="2" refY="2" orient="auto">
    <circle cx="2" cy="2" r="2" fill="context-stroke" />
  </marker>
  <marker id="marker" markerWidth="5" markerHeight="5" refX="0" refY="2" orient="auto">
    <line x1="0" y1="0" x2="0" y2="4" class="marker" />
  </marker>
</defs>
"#;

/// Colours go into a style block verbatim; anything that could close the
/// rule is dropped.
fn css_value(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !matches!(ch, '{' | '}' | ';' | '<' | '>'))
        .collect()
}

fn num(value: f32) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{rounded}")
    }
}

/// Escapes markup characters. Non-ASCII text becomes numeric references.
pub fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' | '<' | '>' | '"' | '\'' | '`' => {
                let _ = write!(out, "&#{};", ch as u32);
            }
            _ if !ch.is_ascii() => {
                let _ = write!(out, "&#{};", ch as u32);
            }
            _ => out.push(ch),
        }
    }
    out
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => std::fs::write(path, svg)?,
        None => print!("{svg}"),
    }
    Ok(())
}

/// Rasterises `svg`. A non-zero configured width or height scales the
/// image to fit; otherwise the SVG's own size is used.
#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<(), RenderError> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size();

    let scale_x = if render_cfg.width > 0.0 { render_cfg.width / size.width() } else { 1.0 };
    let scale_y = if render_cfg.height > 0.0 { render_cfg.height / size.height() } else { 1.0 };
    let scale = match (render_cfg.width > 0.0, render_cfg.height > 0.0) {
        (true, true) => scale_x.min(scale_y),
        (true, false) => scale_x,
        (false, true) => scale_y,
        (false, false) => 1.0,
    };
    let width = (size.width() * scale).ceil().max(1.0) as u32;
    let height = (size.height() * scale).ceil().max(1.0) as u32;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or(RenderError::Pixmap { width, height })?;
    if let Some(color) = parse_hex_color(&render_cfg.background) {
        pixmap.fill(color);
    }
    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::from_scale(scale, scale), &mut pixmap_mut);
    pixmap
        .save_png(output)
        .map_err(|err| RenderError::Encode(err.to_string()))?;
    tracing::debug!(width, height, path = %output.display(), "wrote png");
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig) -> Result<(), RenderError> {
    Err(RenderError::Encode(
        "PNG output needs the `png` feature".to_string(),
    ))
}

#[cfg(feature = "png")]
fn parse_hex_color(value: &str) -> Option<resvg::tiny_skia::Color> {
    let hex = value.strip_prefix('#')?;
    let channel = |idx: usize| u8::from_str_radix(hex.get(idx..idx + 2)?, 16).ok();
    match hex.len() {
        6 => Some(resvg::tiny_skia::Color::from_rgba8(channel(0)?, channel(2)?, channel(4)?, 255)),
        8 => Some(resvg::tiny_skia::Color::from_rgba8(
            channel(0)?,
            channel(2)?,
            channel(4)?,
            channel(6)?,
        )),
        _ => None,
    }
}
