//! The chart text carried inside generated SVG documents.
//!
//! ```text
//! <!-- trace-chart: Generated by trace-chart [1.2.0]
//! categories:
//! ...
//! -->
//! ```

use crate::ir::ChartData;
use crate::serializer::chart_to_string;
use crate::version::Version;
use once_cell::sync::Lazy;
use regex::Regex;

pub const NEWER_VERSION_WARNING: &str = "This code is newer than this app version. Some syntaxes may be not supported. They can be ignored or create parse error.";

static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!--\s*trace-chart:(?P<header>[^\n>]*)\n").unwrap());
static HEADER_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(?P<version>[\d.]+)\]\s*$").unwrap());

/// Code recovered from a generated SVG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCode {
    pub code: String,
    /// Syntax version the code was written with; `1.0.0` when unstated.
    pub version: Version,
    pub warnings: Vec<String>,
}

/// Comment placed at the top of a generated SVG.
///
/// XML comments may not contain `--`, so every dash that follows another
/// dash is written as `\-`. The parser reads it back as a plain `-`.
pub fn code_comment(chart: &ChartData) -> String {
    let code = escape_dashes(&chart_to_string(chart, false));
    format!(
        "<!-- trace-chart: Generated by trace-chart [{}]\n{code}\n-->",
        Version::current()
    )
}

fn escape_dashes(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut previous = None;
    for ch in code.chars() {
        if ch == '-' && previous == Some('-') {
            out.push('\\');
        }
        out.push(ch);
        previous = Some(ch);
    }
    out
}

/// Looks for the first well-formed embedded comment. Missing or malformed
/// comments give empty code, never an error.
pub fn extract_code(svg: &str) -> ExtractedCode {
    let mut code = "";
    let mut version_text: Option<&str> = None;

    for caps in HEADER_RE.captures_iter(svg) {
        let Some(matched) = caps.get(0) else {
            continue;
        };
        let rest = &svg[matched.end()..];
        let Some(close) = rest.find("-->") else {
            break;
        };
        let Some(body) = rest[..close].strip_suffix('\n') else {
            continue;
        };
        if body.is_empty() {
            continue;
        }
        code = body;
        version_text = caps
            .name("header")
            .and_then(|header| HEADER_VERSION_RE.captures(header.as_str()))
            .and_then(|version| version.name("version"))
            .map(|version| version.as_str());
        break;
    }

    let version = Version::parse(version_text.unwrap_or("1.0.0"));
    let mut warnings = Vec::new();
    if version.is_newer_than_current() {
        tracing::warn!(%version, current = %Version::current(), "embedded code is newer than this build");
        warnings.push(NEWER_VERSION_WARNING.to_string());
    }

    ExtractedCode {
        code: code.to_string(),
        version,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::diagnostics::Diagnostics;
    use crate::ir::Trace;
    use crate::parser::ParseOptions;
    use crate::{chart_from_svg, generate_svg};

    fn svg_with(comment: &str) -> String {
        format!("<?xml version=\"1.0\"?>\n<svg>\n{comment}\n<g/></svg>")
    }

    #[test]
    fn extracts_what_was_embedded() {
        let mut chart = ChartData::new();
        chart.trace.push(Trace::new("boot", "main"));
        let svg = svg_with(&code_comment(&chart));
        let extracted = extract_code(&svg);
        assert_eq!(extracted.code, "categories:\n\ntraces:\n+ boot [main]");
        assert_eq!(extracted.version, Version::current());
        assert!(extracted.warnings.is_empty());
    }

    #[test]
    fn missing_version_defaults_to_one() {
        let extracted = extract_code(&svg_with("<!-- trace-chart: old build\n+ a\n-->"));
        assert_eq!(extracted.code, "+ a");
        assert_eq!(extracted.version, Version::new(1, 0, 0));
    }

    #[test]
    fn newer_version_warns() {
        let extracted = extract_code(&svg_with("<!-- trace-chart: Generated by trace-chart [99.1.0]\n+ a\n-->"));
        assert_eq!(extracted.version, Version::new(99, 1, 0));
        assert_eq!(extracted.warnings, vec![NEWER_VERSION_WARNING.to_string()]);
    }

    #[test]
    fn no_comment_gives_empty_code() {
        let extracted = extract_code("<svg><!-- unrelated --></svg>");
        assert_eq!(extracted.code, "");
        assert_eq!(extracted.version, Version::new(1, 0, 0));
    }

    #[test]
    fn malformed_comment_is_skipped() {
        let svg = "<!-- trace-chart: [1.1.0]\n-->\n<!-- trace-chart: [1.2.0]\n+ kept\n-->";
        let extracted = extract_code(svg);
        assert_eq!(extracted.code, "+ kept");
        assert_eq!(extracted.version, Version::new(1, 2, 0));
    }

    #[test]
    fn double_dashes_never_reach_the_comment() {
        assert_eq!(escape_dashes("a -- b --- c -"), r"a -\- b -\-\- c -");
        let mut chart = ChartData::new();
        chart.trace.push(Trace::new("npm run build -- --prod", "main"));
        let comment = code_comment(&chart);
        let body = &comment["<!--".len()..comment.len() - "-->".len()];
        assert!(!body.contains("--"), "{comment}");
    }

    #[test]
    fn dashed_names_come_back_from_the_svg() {
        let config = Config::default();
        let code = "+ run --verbose [cli]\n++ npm run build -- --prod // [exit] code --1";
        let output = generate_svg(code, &ParseOptions::default(), &mut Diagnostics::new(), &config).unwrap();
        let recovered = chart_from_svg(&output.svg, None, &mut Diagnostics::new()).unwrap();
        assert_eq!(recovered.chart.trace, output.chart.trace);
        assert_eq!(recovered.chart.trace[0].name, "run --verbose");
        assert_eq!(recovered.chart.trace[0].sub_tasks[0].name, "npm run build -- --prod");
        assert_eq!(recovered.chart.trace[0].sub_tasks[0].comment.as_deref(), Some("code --1"));
    }

    #[cfg(feature = "png")]
    #[test]
    fn dashed_names_keep_the_svg_well_formed() {
        let config = Config::default();
        let code = "+ run --verbose\n++ npm run build -- --prod";
        let output = generate_svg(code, &ParseOptions::default(), &mut Diagnostics::new(), &config).unwrap();
        assert!(output.svg.contains("<!-- trace-chart:"));
        let tree = usvg::Tree::from_str(&output.svg, &usvg::Options::default());
        assert!(tree.is_ok(), "{:?}", tree.err());
    }

    #[test]
    fn comment_terminator_in_labels_is_escaped() {
        let mut chart = ChartData::new();
        chart.trace.push(Trace::new("a -->", "main"));
        let comment = code_comment(&chart);
        assert_eq!(comment.matches("-->").count(), 1);
    }
}
