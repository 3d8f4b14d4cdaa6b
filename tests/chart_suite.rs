use std::path::Path;

use trace_chart::embed::extract_code;
use trace_chart::{
    Categories, Category, ChartData, Config, Diagnostics, Origin, ParseOptions, Severity, Trace,
    Version, categories_from_svg, chart_from_svg, chart_to_string, generate_svg, parse_chart,
};

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|err| panic!("{}: {err}", path.display()))
}

fn parse(text: &str) -> (ChartData, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let chart = parse_chart(text, &ParseOptions::default(), &mut diagnostics).expect("parse failed");
    (chart, diagnostics)
}

fn names(traces: &[Trace]) -> Vec<&str> {
    traces.iter().map(|trace| trace.name.as_str()).collect()
}

fn large_input() -> String {
    let mut text = String::from("categories:\n");
    for idx in 0..100 {
        text.push_str(&format!("+ cat{idx}: Category {idx} {{#{:06X}}}\n", idx * 0x020202));
    }
    text.push_str("\ntraces:\n");
    for idx in 0..2000 {
        text.push_str(&format!("+ task {idx} [cat{}] // [step] number {idx}\n", idx % 100));
        if idx % 10 == 0 {
            text.push_str(&format!("++ child of {idx}\n+++ grandchild of {idx}\n"));
        }
    }
    text
}

#[test]
fn checkout_fixture_parses_cleanly() {
    let (chart, diagnostics) = parse(&fixture("checkout.trace"));
    assert!(diagnostics.is_empty(), "{:?}", diagnostics.records());
    assert_eq!(names(&chart.trace), vec!["submit order", "send confirmation mail"]);

    let submit = &chart.trace[0];
    assert_eq!(submit.event.as_deref(), Some("click"));
    assert_eq!(submit.comment.as_deref(), Some("user confirms the cart"));
    assert_eq!(names(&submit.sub_tasks), vec!["POST /checkout", "render receipt"]);
    assert_eq!(submit.sub_tasks[1].category, "web");

    let checkout = &submit.sub_tasks[0];
    assert_eq!(
        names(&checkout.sub_tasks),
        vec!["validate cart", "reserve stock", "insert order", "publish event"]
    );
    assert_eq!(checkout.sub_tasks[0].category, "api");
    assert_eq!(checkout.sub_tasks[2].sub_tasks[0].category, "db");
    assert_eq!(checkout.sub_tasks[3].event, None);
    assert_eq!(checkout.sub_tasks[3].comment.as_deref(), Some("async"));

    let labels: Vec<&str> = chart
        .ordered_categories()
        .iter()
        .map(|category| category.label.as_str())
        .collect();
    assert_eq!(labels, vec!["Web front", "Checkout API", "Orders database", ""]);
    assert!(chart.categories.values().all(|c| c.used && c.origin == Origin::CodeCategory));
}

#[test]
fn checkout_fixture_round_trips() {
    let (chart, _) = parse(&fixture("checkout.trace"));
    let (again, diagnostics) = parse(&chart_to_string(&chart, false));
    assert!(diagnostics.is_empty());
    assert_eq!(again, chart);
}

#[test]
fn brace_fixture_nests_blocks() {
    let (chart, diagnostics) = parse(&fixture("braces.trace"));
    assert!(diagnostics.is_empty(), "{:?}", diagnostics.records());
    assert_eq!(names(&chart.trace), vec!["boot", "shutdown"]);
    let boot = &chart.trace[0];
    assert_eq!(names(&boot.sub_tasks), vec!["load config", "connect", "ready"]);
    let connect = &boot.sub_tasks[1];
    assert_eq!(connect.event.as_deref(), Some("retry"));
    assert_eq!(names(&connect.sub_tasks), vec!["resolve host", "open socket"]);
    assert!(connect.sub_tasks.iter().all(|t| t.category == "net"));
    assert_eq!(boot.sub_tasks[2].category, "app");
    assert_eq!(boot.sub_tasks[2].comment.as_deref(), Some("all good"));
}

#[test]
fn brace_fixture_serializes_with_plus_markers() {
    let (chart, _) = parse(&fixture("braces.trace"));
    let text = chart_to_string(&chart, true);
    assert!(!text.contains('{'));
    assert!(text.contains("+++ resolve host [net]"));
    let (again, _) = parse(&text);
    assert_eq!(again.trace, chart.trace);
}

#[test]
fn brace_fixture_is_plain_text_for_old_syntax() {
    let options = ParseOptions::default().with_version(Version::new(1, 1, 0));
    let mut diagnostics = Diagnostics::new();
    let chart = parse_chart(&fixture("braces.trace"), &options, &mut diagnostics).unwrap();
    assert!(chart.trace.iter().all(|trace| trace.sub_tasks.is_empty()));
    assert_eq!(chart.trace[0].name, "load config");
    assert!(diagnostics.records().iter().any(|r| r.excerpt.starts_with("{ boot")));
}

#[test]
fn console_fixture_needs_the_flag() {
    let text = fixture("console.trace");
    let options = ParseOptions::default().with_console(true);
    let chart = parse_chart(&text, &options, &mut Diagnostics::new()).expect("parse failed");
    assert_eq!(names(&chart.trace), vec!["start"]);
    let start = &chart.trace[0];
    assert_eq!(names(&start.sub_tasks), vec!["fetch user", "render"]);
    let get = &start.sub_tasks[0].sub_tasks[0];
    assert_eq!(get.name, "GET /user");
    assert_eq!(get.category, "net");
    assert_eq!(get.event.as_deref(), Some("200"));

    let (plain, diagnostics) = parse(&text);
    assert!(plain.trace.is_empty());
    assert_eq!(diagnostics.count(Severity::Info), 1);
}

#[test]
fn messy_fixture_reports_everything_it_skips() {
    let text = fixture("messy.trace");
    let (chart, diagnostics) = parse(&text);
    let found: Vec<(Severity, &str)> = diagnostics
        .records()
        .iter()
        .map(|r| (r.severity, r.excerpt.as_str()))
        .collect();
    assert_eq!(
        found,
        vec![
            (Severity::Info, "A short introduction that is not part of the chart."),
            (Severity::Error, "#12"),
            (Severity::Warning, "notes:"),
            (Severity::Info, "this line is not a trace"),
        ]
    );
    for record in diagnostics.records() {
        assert_eq!(&text[record.span.start..record.span.end], record.excerpt);
    }

    assert_eq!(chart.categories["bad"].color, "#006FFF");
    assert!(!chart.categories["bad"].used);
    assert_eq!(chart.categories["svc"].origin, Origin::CodeTrace);
    assert_eq!(chart.categories["svc"].order, 2);
    assert_eq!(names(&chart.trace[0].sub_tasks), vec!["handle", "respond"]);
    assert_eq!(chart.trace[0].sub_tasks[1].category, "web");
}

#[test]
fn default_category_is_main() {
    let (chart, _) = parse("+ Task");
    assert_eq!(chart.trace.len(), 1);
    assert_eq!(chart.trace[0].category, "main");
    assert!(chart.categories["main"].used);
}

#[test]
fn skipped_indentation_aborts() {
    let mut diagnostics = Diagnostics::new();
    let err = parse_chart("+ root\n+++ child\n++ task", &ParseOptions::default(), &mut diagnostics)
        .unwrap_err();
    assert!(err.to_string().contains("grand-child"));
    assert!(diagnostics.has_errors());
}

#[test]
fn legend_entries_survive_redeclaration() {
    let mut seed = Categories::new();
    seed.insert(
        "web".into(),
        Category::new("web", "#111111", 0, Origin::Legend).with_label("Legend web"),
    );
    seed.insert(
        "db".into(),
        Category::new("db", "#222222", 1, Origin::CodeCategory).with_label("Old db"),
    );
    let text = "categories:\n+ web: New web {#AAAAAA}\n+ db: New db {#BBBBBB}\n\ntraces:\n+ a [web]\n+ b [db]";
    let options = ParseOptions::default().with_categories(&seed);
    let chart = parse_chart(text, &options, &mut Diagnostics::new()).unwrap();
    assert_eq!(chart.categories["web"].label, "Legend web");
    assert_eq!(chart.categories["web"].color, "#111111");
    assert_eq!(chart.categories["db"].label, "New db");
    assert_eq!(chart.categories["db"].color, "#BBBBBB");
}

#[test]
fn reparse_prunes_only_implied_categories() {
    let (first, _) = parse("+ a [web]\n+ b [db]");
    let mut seed = first.categories.clone();
    if let Some(web) = seed.get_mut("web") {
        web.origin = Origin::Legend;
    }
    let options = ParseOptions::default().with_categories(&seed);
    let chart = parse_chart("+ c [other]", &options, &mut Diagnostics::new()).unwrap();
    assert!(!chart.categories.contains_key("db"));
    assert!(!chart.categories["web"].used);
    assert!(chart.categories["other"].used);
    let mut orders: Vec<usize> = chart.categories.values().map(|c| c.order).collect();
    orders.sort_unstable();
    assert_eq!(orders, vec![0, 1]);
}

#[test]
fn special_characters_round_trip() {
    let mut chart = ChartData::new();
    let mut trace = Trace::new(r"call a[0] / b\c {x}: <y>", "main");
    trace.event = Some("]ev[".into());
    trace.comment = Some(r"see \n // here".into());
    chart.trace.push(trace);
    let text = chart_to_string(&chart, true);
    let (again, diagnostics) = parse(&text);
    assert!(diagnostics.is_empty(), "{text}");
    assert_eq!(again.trace, chart.trace);
}

#[test]
fn large_input_parses() {
    let (chart, diagnostics) = parse(&large_input());
    assert!(diagnostics.is_empty());
    assert_eq!(chart.categories.len(), 100);
    assert!(chart.trace.len().abs_diff(2000) <= 1);
    assert_eq!(chart.trace_count(), 2000 + 200 * 2);
    assert_eq!(chart.trace[10].sub_tasks[0].sub_tasks[0].name, "grandchild of 10");
    assert_eq!(chart.trace[10].sub_tasks[0].sub_tasks[0].category, "cat10");
}

#[test]
fn svg_output_embeds_extractable_code() {
    let config = Config::default();
    let mut diagnostics = Diagnostics::new();
    let output = generate_svg(
        &fixture("checkout.trace"),
        &ParseOptions::default(),
        &mut diagnostics,
        &config,
    )
    .unwrap();
    assert!(output.svg.starts_with("<?xml"));
    assert!(output.svg.contains("Generated by trace-chart [1.2.0]"));
    assert!(output.svg.contains("POST /checkout"));
    assert!(output.svg.contains("class=\"legend-box\""));

    let extracted = extract_code(&output.svg);
    assert_eq!(extracted.version, Version::current());
    assert_eq!(extracted.code, chart_to_string(&output.chart, false));

    let recovered = chart_from_svg(&output.svg, None, &mut Diagnostics::new()).unwrap();
    assert_eq!(recovered.chart, output.chart);
}

#[test]
fn legend_seed_from_svg() {
    let config = Config::default();
    let output = generate_svg(
        "categories:\n+ web: Web {#123456}\n\ntraces:\n+ a [web]",
        &ParseOptions::default(),
        &mut Diagnostics::new(),
        &config,
    )
    .unwrap();
    let seed = categories_from_svg(&output.svg, &mut Diagnostics::new()).unwrap();
    let options = ParseOptions::default().with_categories(&seed);
    let chart = parse_chart("+ b [db]", &options, &mut Diagnostics::new()).unwrap();
    assert_eq!(chart.categories["web"].origin, Origin::File);
    assert_eq!(chart.categories["web"].color, "#123456");
    assert!(!chart.categories["web"].used);
    assert_eq!(chart.categories["db"].order, 1);
}
