#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod embed;
pub mod grammar;
pub mod ir;
pub mod layout;
pub mod parser;
pub mod render;
pub mod serializer;
pub mod text_metrics;
pub mod theme;
pub mod version;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::Config;
pub use diagnostics::{Diagnostic, Diagnostics, ParseError, Severity, Span};
pub use ir::{Categories, Category, ChartData, Origin, Trace};
pub use parser::{ParseOptions, parse_chart};
pub use serializer::chart_to_string;
pub use version::Version;

use embed::extract_code;
use layout::compute_layout;
use render::render_svg;

#[derive(Debug, Clone)]
pub struct SvgOutput {
    pub svg: String,
    pub chart: ChartData,
}

/// Chart recovered from a generated SVG.
#[derive(Debug, Clone)]
pub struct Recovered {
    pub chart: ChartData,
    pub code: String,
    pub version: Version,
}

/// Parses `code`, lays it out and renders the SVG document.
pub fn generate_svg(
    code: &str,
    options: &ParseOptions<'_>,
    diagnostics: &mut Diagnostics,
    config: &Config,
) -> Result<SvgOutput, ParseError> {
    let chart = parse_chart(code, options, diagnostics)?;
    let layout = compute_layout(&chart, &config.theme, &config.layout);
    let svg = render_svg(&chart, &layout, config);
    Ok(SvgOutput { svg, chart })
}

/// Extracts the code embedded in `svg` and parses it with the syntax
/// version it was written in. Extraction warnings land in `diagnostics`.
pub fn chart_from_svg(
    svg: &str,
    seed: Option<&Categories>,
    diagnostics: &mut Diagnostics,
) -> Result<Recovered, ParseError> {
    let extracted = extract_code(svg);
    for warning in extracted.warnings {
        diagnostics.push(Diagnostic {
            span: Span::new(0, 0),
            excerpt: String::new(),
            message: warning,
            severity: Severity::Warning,
        });
    }
    let options = ParseOptions {
        categories: seed,
        version: extracted.version,
        console: false,
    };
    let chart = parse_chart(&extracted.code, &options, diagnostics)?;
    Ok(Recovered {
        chart,
        code: extracted.code,
        version: extracted.version,
    })
}

/// Categories of a previously generated chart, all marked as loaded from
/// a file.
pub fn categories_from_svg(svg: &str, diagnostics: &mut Diagnostics) -> Result<Categories, ParseError> {
    let mut categories = chart_from_svg(svg, None, diagnostics)?.chart.categories;
    for category in categories.values_mut() {
        category.origin = Origin::File;
    }
    Ok(categories)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_svg_carries_the_chart_back() {
        let config = Config::default();
        let mut diagnostics = Diagnostics::new();
        let output = generate_svg(
            "+ boot [app] // [start]\n++ load",
            &ParseOptions::default(),
            &mut diagnostics,
            &config,
        )
        .unwrap();
        assert!(diagnostics.is_empty());

        let recovered = chart_from_svg(&output.svg, None, &mut diagnostics).unwrap();
        assert_eq!(recovered.chart.trace, output.chart.trace);
        assert_eq!(recovered.version, Version::current());
    }

    #[test]
    fn legend_categories_are_file_origin() {
        let config = Config::default();
        let output = generate_svg(
            "categories:\n+ db: Database {#00FF00}\n\ntraces:\n+ q [db]\n+ r [cache]",
            &ParseOptions::default(),
            &mut Diagnostics::new(),
            &config,
        )
        .unwrap();
        let categories = categories_from_svg(&output.svg, &mut Diagnostics::new()).unwrap();
        assert_eq!(categories.len(), 2);
        assert!(categories.values().all(|c| c.origin == Origin::File));
        assert_eq!(categories["db"].label, "Database");
    }

    #[test]
    fn newer_embedded_version_is_reported() {
        let svg = "<svg><!-- trace-chart: x [9.0.0]\n+ a\n-->\n</svg>";
        let mut diagnostics = Diagnostics::new();
        let recovered = chart_from_svg(svg, None, &mut diagnostics).unwrap();
        assert_eq!(recovered.chart.trace.len(), 1);
        assert_eq!(diagnostics.count(Severity::Warning), 1);
    }
}
