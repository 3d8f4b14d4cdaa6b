//! Line grammars, selected from the syntax version.
//!
//! Each variant is a fixed pair of category and trace patterns. Patterns are
//! compiled once and shared.

use crate::version::Version;
use once_cell::sync::Lazy;
use regex::Regex;

const CONSOLE_PREFIX: &str = r"(?:[^+{} ][^ ]+ )?";
const CATEGORY_ID: &str = r"(?P<id>(?:[^:\\\n]|\\.)+)";
const CATEGORY_LABEL: &str = r"(?P<label>(?:[^{\\\n]|\\.)+)?";
const CATEGORY_COLOR: &str = r"(?P<color>(?:[^}\\\n]|\\.)+)";

static CATEGORY_LEGACY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?mR)^\s*\+\s*{CATEGORY_ID}:\s*{CATEGORY_LABEL}\{{{CATEGORY_COLOR}\}}"
    ))
    .unwrap()
});
static CATEGORY_LINE: Lazy<Regex> = Lazy::new(|| category_line(""));
static CATEGORY_LINE_CONSOLE: Lazy<Regex> = Lazy::new(|| category_line(CONSOLE_PREFIX));

static TRACE_PLUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?mR)^\s*(?P<indentation>\++)\s*(?P<name>(?:[^\[/\\\n]|\\.)+)\s*",
        r"(?:\[(?P<category>(?:[^\]\\\n]|\\.)+)\])?[ \t]*",
        r"(?://+[ \t]*(?:\[(?P<event>(?:[^\]\\\n]|\\.)+)\])?(?P<comment>[^\n\r]*))?$",
    ))
    .unwrap()
});
static TRACE_BRACED: Lazy<Regex> = Lazy::new(|| trace_braced(""));
static TRACE_BRACED_CONSOLE: Lazy<Regex> = Lazy::new(|| trace_braced(CONSOLE_PREFIX));

fn category_line(prefix: &str) -> Regex {
    Regex::new(&format!(
        r"(?mR)^\s*{prefix}\+\s*{CATEGORY_ID}:\s*{CATEGORY_LABEL}\{{{CATEGORY_COLOR}\}}\s*$"
    ))
    .unwrap()
}

fn trace_braced(prefix: &str) -> Regex {
    let space = r"[ \t]*";
    Regex::new(&format!(
        concat!(
            r"(?mR)^{space}{prefix}(?P<indentation>[{{}}]|\++\{{?){space}",
            r"(?P<name>(?:[^\n\[/\\]|\\.)*){space}",
            r"(?:\[(?P<category>(?:[^\]\n\\]|\\.)+)\])?{space}",
            r"(?://+{space}(?:\[(?P<event>(?:[^\n\]\\]|\\.)+)\]{space})?(?P<comment>[^\n\r]*))?$",
        ),
        space = space,
        prefix = prefix,
    ))
    .unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarVariant {
    /// Pre-1.0 syntax: counted `+` nesting, loose category lines.
    Legacy,
    /// 1.0 and 1.1: counted `+` nesting, anchored category lines.
    Plus,
    /// 1.2 onwards: `{` / `}` block nesting alongside counted `+`.
    Braced,
}

impl GrammarVariant {
    pub fn for_version(version: &Version) -> Self {
        match (version.major, version.minor) {
            (0, _) => Self::Legacy,
            (1, minor) if minor < 2 => Self::Plus,
            _ => Self::Braced,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Grammar {
    pub variant: GrammarVariant,
    pub console: bool,
    category: &'static Regex,
    trace: &'static Regex,
}

impl Grammar {
    /// `console` lets a captured-log filename token precede each line.
    /// The legacy syntax has no such flavor.
    pub fn new(version: &Version, console: bool) -> Self {
        let variant = GrammarVariant::for_version(version);
        let (category, trace): (&'static Regex, &'static Regex) = match (variant, console) {
            (GrammarVariant::Legacy, _) => (&CATEGORY_LEGACY, &TRACE_PLUS),
            (GrammarVariant::Plus, false) => (&CATEGORY_LINE, &TRACE_PLUS),
            (GrammarVariant::Plus, true) => (&CATEGORY_LINE_CONSOLE, &TRACE_PLUS),
            (GrammarVariant::Braced, false) => (&CATEGORY_LINE, &TRACE_BRACED),
            (GrammarVariant::Braced, true) => (&CATEGORY_LINE_CONSOLE, &TRACE_BRACED_CONSOLE),
        };
        Self {
            variant,
            console,
            category,
            trace,
        }
    }

    pub fn category_line(&self) -> &'static Regex {
        self.category
    }

    pub fn trace_line(&self) -> &'static Regex {
        self.trace
    }
}
