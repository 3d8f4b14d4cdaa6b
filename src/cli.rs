use crate::config::{Config, load_config};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::embed::extract_code;
use crate::ir::{Categories, ChartData};
use crate::layout::compute_layout;
use crate::parser::{ParseOptions, parse_chart};
use crate::render::{render_svg, write_output_png, write_output_svg};
use crate::serializer::chart_to_string;
use crate::version::Version;
use crate::categories_from_svg;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const WRONG_LEGEND_FILE: &str = "Wrong kind of file. We expect a trace-chart SVG file";

#[derive(Parser, Debug)]
#[command(name = "trace-chart", version, about = "Render trace charts to SVG")]
pub struct Args {
    /// Input file (chart text or a generated .svg) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout except for PNG.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Leave the categories section out of `code` output
    #[arg(long = "only-code")]
    pub only_code: bool,

    /// Previously generated SVG whose categories seed this chart
    #[arg(short = 'l', long = "legend")]
    pub legend: Option<PathBuf>,

    /// Lines may start with a console file name (`app.js:12 + call`)
    #[arg(long = "console")]
    pub console: bool,

    /// Syntax version of the input
    #[arg(long = "syntax")]
    pub syntax: Option<String>,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// PNG width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// PNG height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Debug logging on stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Code,
    Json,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    chart: &'a ChartData,
    diagnostics: &'a [Diagnostic],
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }

    let seed = match args.legend.as_deref() {
        Some(path) => Some(read_legend(path)?),
        None => None,
    };

    let (input, is_svg) = read_input(args.input.as_deref())?;
    let mut version = Version::current();
    let code = if is_svg {
        let extracted = extract_code(&input);
        for warning in &extracted.warnings {
            eprintln!("warning: {warning}");
        }
        version = extracted.version;
        extracted.code
    } else {
        input
    };
    if let Some(syntax) = args.syntax.as_deref() {
        version = Version::parse(syntax);
    }

    let mut diagnostics = Diagnostics::new();
    let options = ParseOptions {
        categories: seed.as_ref(),
        version,
        console: args.console,
    };
    let parsed = parse_chart(&code, &options, &mut diagnostics);
    report(&code, &diagnostics);
    let chart = parsed?;

    match args.output_format {
        OutputFormat::Svg => {
            let svg = render(&chart, &config);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let mut png_config = config.clone();
            png_config.render.embed_code = false;
            let svg = render(&chart, &png_config);
            write_output_png(&svg, &output, &config.render)?;
        }
        OutputFormat::Code => {
            let mut text = chart_to_string(&chart, args.only_code);
            text.push('\n');
            write_output_svg(&text, args.output.as_deref())?;
        }
        OutputFormat::Json => {
            let report = JsonReport {
                chart: &chart,
                diagnostics: diagnostics.records(),
            };
            let mut text = serde_json::to_string_pretty(&report)?;
            text.push('\n');
            write_output_svg(&text, args.output.as_deref())?;
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("TRACE_CHART_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn render(chart: &ChartData, config: &Config) -> String {
    let layout = compute_layout(chart, &config.theme, &config.layout);
    render_svg(chart, &layout, config)
}

fn read_legend(path: &Path) -> Result<Categories> {
    if !has_extension(path, "svg") {
        anyhow::bail!("{WRONG_LEGEND_FILE}: {}", path.display());
    }
    let svg = std::fs::read_to_string(path)
        .with_context(|| format!("reading legend file {}", path.display()))?;
    let mut legend_diagnostics = Diagnostics::new();
    let categories = categories_from_svg(&svg, &mut legend_diagnostics)?;
    for record in legend_diagnostics.drain() {
        tracing::debug!(note = record.message.as_str(), "legend file diagnostic");
    }
    Ok(categories)
}

fn read_input(path: Option<&Path>) -> Result<(String, bool)> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        return Ok((content, has_extension(path, "svg")));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    let is_svg = buf.trim_start().starts_with("<?xml") || buf.trim_start().starts_with("<svg");
    Ok((buf, is_svg))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

fn report(source: &str, diagnostics: &Diagnostics) {
    for line in format_diagnostics(source, diagnostics) {
        eprintln!("{line}");
    }
}

fn format_diagnostics(source: &str, diagnostics: &Diagnostics) -> Vec<String> {
    let mut lines = Vec::new();
    for record in diagnostics.records() {
        if record.excerpt.is_empty() {
            lines.push(format!("{}: {}", record.severity, record.message));
            continue;
        }
        let (line, column) = record.span.line_col(source);
        lines.push(format!(
            "{}: {} (line {line}, column {column})",
            record.severity, record.message
        ));
        for excerpt_line in record.excerpt.lines() {
            lines.push(format!("    | {excerpt_line}"));
        }
    }
    lines
}
