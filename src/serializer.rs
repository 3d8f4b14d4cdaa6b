//! `ChartData` → canonical chart text.

use crate::ir::{ChartData, Trace};
use crate::parser::escape_label;
use std::fmt::Write as _;

/// Writes `chart` back as text the parser reads to the same forest.
///
/// Categories are emitted by `order`. With `only_code` the categories
/// section is left out. Provenance is not kept: every emitted category
/// reads back as declared in code.
pub fn chart_to_string(chart: &ChartData, only_code: bool) -> String {
    let mut out = String::new();
    if !only_code {
        out.push_str("categories:\n");
        for category in chart.ordered_categories() {
            let key = escape_label(&category.key);
            if category.label.is_empty() {
                let _ = writeln!(out, "+ {key}: {{{}}}", category.color);
            } else {
                let label = escape_label(&category.label);
                let _ = writeln!(out, "+ {key}: {label}{{{}}}", category.color);
            }
        }
        out.push('\n');
    }

    out.push_str("traces:");
    let mut pending: Vec<(&Trace, usize)> = chart.trace.iter().rev().map(|t| (t, 1)).collect();
    while let Some((trace, depth)) = pending.pop() {
        out.push('\n');
        push_trace_line(&mut out, trace, depth);
        pending.extend(trace.sub_tasks.iter().rev().map(|child| (child, depth + 1)));
    }
    out
}

fn push_trace_line(out: &mut String, trace: &Trace, depth: usize) {
    let start = out.len();
    out.extend(std::iter::repeat_n('+', depth));
    out.push(' ');
    out.push_str(&escape_label(&trace.name));
    if !trace.category.is_empty() {
        let _ = write!(out, " [{}]", escape_label(&trace.category));
    }
    if trace.has_annotation() {
        out.push_str(" // ");
        if let Some(event) = &trace.event {
            let _ = write!(out, "[{}]", escape_label(event));
        }
        out.push(' ');
        if let Some(comment) = &trace.comment {
            out.push_str(&escape_label(comment));
        }
    }
    let trimmed = out[start..].trim_end().len();
    out.truncate(start + trimmed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::ir::{Category, Origin};
    use crate::parser::{ParseOptions, parse_chart};

    fn parse(text: &str) -> ChartData {
        parse_chart(text, &ParseOptions::default(), &mut Diagnostics::new()).unwrap()
    }

    #[test]
    fn writes_categories_by_order() {
        let mut chart = ChartData::new();
        chart.categories.insert(
            "web".into(),
            Category::new("web", "#FF0000", 1, Origin::CodeCategory).with_label("Web: front"),
        );
        chart
            .categories
            .insert("db".into(), Category::new("db", "#00FF00", 0, Origin::CodeCategory));
        let mut root = Trace::new("load [all]", "web");
        root.event = Some("start".into());
        root.sub_tasks.push(Trace::new("query", "db"));
        chart.trace.push(root);

        assert_eq!(
            chart_to_string(&chart, false),
            "categories:\n+ db: {#00FF00}\n+ web: Web\\: front{#FF0000}\n\ntraces:\n+ load \\[all\\] [web] // [start]\n++ query [db]"
        );
        assert_eq!(
            chart_to_string(&chart, true),
            "traces:\n+ load \\[all\\] [web] // [start]\n++ query [db]"
        );
    }

    #[test]
    fn comment_only_lines_keep_their_marker() {
        let mut trace = Trace::new("", "main");
        trace.comment = Some("note".into());
        let chart = ChartData {
            trace: vec![trace],
            ..ChartData::new()
        };
        assert_eq!(chart_to_string(&chart, true), "traces:\n+  [main] //  note");
    }

    #[test]
    fn reparses_to_the_same_chart() {
        let text = "categories:\n+ web: Web Server {#FF0000}\n+ db: {#00FF00}\n\ntraces:\n+ a [web] // [open] first\n++ b [db]\n+++ c // \\[not an event\\]\n++ d\n+ f [web] // [done]";
        let chart = parse(text);
        let again = parse(&chart_to_string(&chart, false));
        assert_eq!(again, chart);
    }

    #[test]
    fn implied_categories_come_back_declared() {
        let chart = parse("+ a [web]\n++ b");
        assert_eq!(chart.categories["web"].origin, Origin::CodeTrace);
        let again = parse(&chart_to_string(&chart, false));
        assert_eq!(again.trace, chart.trace);
        assert_eq!(again.categories["web"].origin, Origin::CodeCategory);
        assert_eq!(again.categories["web"].color, chart.categories["web"].color);
    }

    #[test]
    fn chart_without_traces_reparses_quietly() {
        let chart = parse("categories:\n+ web: Web {#fff}");
        let text = chart_to_string(&chart, false);
        assert!(text.ends_with("\n\ntraces:"));
        let mut diagnostics = Diagnostics::new();
        let again = parse_chart(&text, &ParseOptions::default(), &mut diagnostics).unwrap();
        assert_eq!(again, chart);
        assert!(diagnostics.is_empty(), "{:?}", diagnostics.records());
    }

    #[test]
    fn deep_nesting_does_not_recurse() {
        let mut trace = Trace::new("leaf", "main");
        for depth in 0..3000 {
            let mut parent = Trace::new(format!("n{depth}"), "main");
            parent.sub_tasks.push(trace);
            trace = parent;
        }
        let chart = ChartData {
            trace: vec![trace],
            ..ChartData::new()
        };
        let text = chart_to_string(&chart, true);
        assert_eq!(text.lines().count(), 3002);
        assert!(text.ends_with(&format!("{} leaf [main]", "+".repeat(3001))));
    }
}
