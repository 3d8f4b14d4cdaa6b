use crate::config::LayoutConfig;
use crate::ir::{ChartData, Trace};
use crate::text_metrics::text_width;
use crate::theme::Theme;
use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Top-left and bottom-right corners.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }
}

/// A piece of markup and the area it covers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Content {
    pub markup: String,
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpanKind {
    /// A leaf: one arrow on its row.
    Call,
    /// A node with sub-tasks: bracket from its row down to `exit_y`.
    Method { exit_y: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub radius: f32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationLayout {
    /// Dashed connector from `link_start_x` to `link_end_x`.
    pub link_start_x: f32,
    pub link_end_x: f32,
    /// Centre of the annotation column.
    pub text_x: f32,
    pub event: Option<EventBox>,
    pub comment: Option<(Point, String)>,
}

/// Geometry of one trace node. Coordinates inside are relative to `origin`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanLayout {
    pub kind: SpanKind,
    pub name: String,
    pub category: String,
    pub class_name: String,
    pub depth: usize,
    pub row: usize,
    pub origin: Point,
    /// The arrow or bracket reaches back this far to the parent line.
    pub level_width: f32,
    pub label_x: f32,
    pub label_width: f32,
    pub annotation: Option<AnnotationLayout>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentLayout {
    /// Start of the timeline; spans are positioned absolutely.
    pub timeline: Point,
    pub timeline_length: f32,
    pub spans: Vec<SpanLayout>,
    pub max_indentation: usize,
    pub rows: usize,
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendItem {
    pub class_name: String,
    pub label: String,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendLayout {
    /// Position of the first item; the frame starts one margin before it.
    pub origin: Point,
    pub frame: BoundingBox,
    pub line_width: f32,
    pub label_x: f32,
    pub items: Vec<LegendItem>,
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    pub content: ContentLayout,
    pub legend: LegendLayout,
    pub width: f32,
    pub height: f32,
}

/// CSS class carrying a category's colour.
pub fn category_class(key: &str) -> String {
    format!("category-{}", NON_WORD_RE.replace_all(key, "-"))
}

pub fn compute_layout(chart: &ChartData, theme: &Theme, config: &LayoutConfig) -> ChartLayout {
    let content = layout_content(chart, theme, config);
    let legend = layout_legend(chart, &content.bounds, theme, config);
    let bounds = content.bounds.union(&legend.bounds);
    tracing::debug!(
        spans = content.spans.len(),
        rows = content.rows,
        max_indentation = content.max_indentation,
        width = bounds.max.x,
        height = bounds.max.y,
        "computed chart layout"
    );
    ChartLayout {
        width: bounds.max.x,
        height: bounds.max.y,
        content,
        legend,
    }
}

enum Step<'a> {
    Enter(&'a Trace, usize),
    Exit(usize),
}

pub fn layout_content(chart: &ChartData, theme: &Theme, config: &LayoutConfig) -> ContentLayout {
    let row_height = config.row_height;
    let timeline = Point::new(
        2.0 * config.annotation_half_width + config.text_margin + config.level_width,
        row_height,
    );

    let mut spans: Vec<SpanLayout> = Vec::with_capacity(chart.trace_count());
    let mut rows_of: Vec<usize> = Vec::new();
    let mut max_indentation = 0;
    let mut cursor = 1;
    let mut steps: Vec<Step<'_>> = chart.trace.iter().rev().map(|trace| Step::Enter(trace, 1)).collect();

    while let Some(step) = steps.pop() {
        match step {
            Step::Enter(trace, depth) => {
                max_indentation = max_indentation.max(depth);
                let idx = spans.len();
                spans.push(span_for(trace, depth, cursor, timeline, theme, config));
                rows_of.push(cursor);
                cursor += 1;
                if !trace.is_leaf() {
                    steps.push(Step::Exit(idx));
                    steps.extend(trace.sub_tasks.iter().rev().map(|child| Step::Enter(child, depth + 1)));
                }
            }
            Step::Exit(idx) => {
                let exit_rows = cursor - rows_of[idx];
                spans[idx].kind = SpanKind::Method {
                    exit_y: exit_rows as f32 * row_height,
                };
                cursor += 1;
            }
        }
    }

    let timeline_length = (cursor + 1) as f32 * row_height;
    let text_edge = spans
        .iter()
        .map(|span| span.origin.x + span.label_x + span.label_width)
        .fold(
            timeline.x
                + max_indentation as f32 * config.level_width
                + config.text_margin
                + config.min_text_width,
            f32::max,
        );
    let bounds = BoundingBox::new(
        Point::new(0.0, 0.0),
        Point::new(text_edge, timeline_length + config.padding_rows * row_height),
    );

    ContentLayout {
        timeline,
        timeline_length,
        spans,
        max_indentation,
        rows: cursor,
        bounds,
    }
}

fn span_for(
    trace: &Trace,
    depth: usize,
    row: usize,
    timeline: Point,
    theme: &Theme,
    config: &LayoutConfig,
) -> SpanLayout {
    let kind = if trace.is_leaf() {
        SpanKind::Call
    } else {
        SpanKind::Method { exit_y: 0.0 }
    };
    let font_size = match kind {
        SpanKind::Call => config.call_font_size,
        SpanKind::Method { .. } => config.method_font_size,
    };
    SpanLayout {
        kind,
        name: trace.name.clone(),
        category: trace.category.clone(),
        class_name: category_class(&trace.category),
        depth,
        row,
        origin: Point::new(
            timeline.x + depth as f32 * config.level_width,
            timeline.y + row as f32 * config.row_height,
        ),
        level_width: config.level_width,
        label_x: config.text_margin,
        label_width: text_width(&trace.name, font_size, &theme.font_family, config.fast_text_metrics),
        annotation: annotation_for(trace, depth, config),
    }
}

/// The annotation column sits left of the timeline whatever the depth.
fn annotation_for(trace: &Trace, depth: usize, config: &LayoutConfig) -> Option<AnnotationLayout> {
    if !trace.has_annotation() {
        return None;
    }
    let half = config.annotation_half_width;
    let link_start_x = -(depth as f32 * config.level_width + config.comment_margin);
    let text_x = link_start_x - half;

    let event = trace.event.as_ref().map(|event| EventBox {
        x: text_x - half,
        y: -config.event_box_height / 2.0,
        width: 2.0 * half,
        height: config.event_box_height,
        radius: config.event_box_radius,
        text: event.clone(),
    });
    let comment = trace.comment.as_ref().map(|comment| {
        let y = if event.is_some() { config.comment_offset } else { 0.0 };
        (Point::new(text_x, y), comment.clone())
    });

    Some(AnnotationLayout {
        link_start_x,
        link_end_x: -config.level_width,
        text_x,
        event,
        comment,
    })
}

pub fn layout_legend(
    chart: &ChartData,
    content: &BoundingBox,
    theme: &Theme,
    config: &LayoutConfig,
) -> LegendLayout {
    let margin = config.legend_margin;
    let categories = chart.ordered_categories();

    let label_width = categories
        .iter()
        .map(|category| {
            text_width(
                category.display_label(),
                config.legend_font_size,
                &theme.font_family,
                config.fast_text_metrics,
            )
        })
        .fold(config.min_legend_label_width, f32::max);
    let width = config.legend_line_width + config.text_margin + label_width + 2.0 * margin;
    let height = config.legend_item_height * categories.len() as f32 + 2.0 * margin;

    let origin = Point::new(content.max.x + margin, content.min.y + margin);
    let frame = BoundingBox::new(
        Point::new(origin.x - margin, origin.y - margin),
        Point::new(origin.x - margin + width, origin.y - margin + height),
    );
    let items = categories
        .iter()
        .enumerate()
        .map(|(idx, category)| LegendItem {
            class_name: category_class(&category.key),
            label: category.display_label().to_string(),
            y: idx as f32 * config.legend_item_height,
        })
        .collect();

    LegendLayout {
        origin,
        frame,
        line_width: config.legend_line_width,
        label_x: config.legend_line_width + config.text_margin,
        items,
        bounds: frame,
    }
}
