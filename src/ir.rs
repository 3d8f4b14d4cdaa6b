use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why a category exists. Arbitrates merge precedence between parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    /// Loaded from an external file (a previously generated chart).
    File,
    /// Declared in a `categories:` section of the current text.
    CodeCategory,
    /// Only implied because some trace references it.
    CodeTrace,
    /// Added explicitly through the host's legend editor.
    Legend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub key: String,
    pub label: String,
    pub color: String,
    pub order: usize,
    pub origin: Origin,
    pub used: bool,
}

impl Category {
    pub fn new(key: impl Into<String>, color: impl Into<String>, order: usize, origin: Origin) -> Self {
        Self {
            key: key.into(),
            label: String::new(),
            color: color.into(),
            order,
            origin,
            used: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.key
        } else {
            &self.label
        }
    }
}

/// Categories by key. Display order is the explicit `order` field, never
/// the map's iteration order.
pub type Categories = BTreeMap<String, Category>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_tasks: Vec<Trace>,
}

impl Trace {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            ..Self::default()
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.sub_tasks.is_empty()
    }

    pub fn has_annotation(&self) -> bool {
        self.event.is_some() || self.comment.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartData {
    pub categories: Categories,
    pub trace: Vec<Trace>,
}

impl ChartData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Categories sorted by `order`, ties broken by key.
    pub fn ordered_categories(&self) -> Vec<&Category> {
        ordered(&self.categories)
    }

    /// Number of trace nodes in the whole forest.
    pub fn trace_count(&self) -> usize {
        let mut count = 0;
        let mut pending: Vec<&Trace> = self.trace.iter().collect();
        while let Some(trace) = pending.pop() {
            count += 1;
            pending.extend(trace.sub_tasks.iter());
        }
        count
    }
}

fn ordered(categories: &Categories) -> Vec<&Category> {
    let mut list: Vec<&Category> = categories.values().collect();
    list.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.key.cmp(&b.key)));
    list
}

/// Rewrites every `order` so the values form `0..len` with no gaps,
/// keeping the current relative order.
pub fn renumber_orders(categories: &mut Categories) {
    let keys: Vec<String> = ordered(categories)
        .into_iter()
        .map(|category| category.key.clone())
        .collect();
    for (order, key) in keys.iter().enumerate() {
        if let Some(category) = categories.get_mut(key) {
            category.order = order;
        }
    }
}

/// Removes `key` and closes the gap it leaves in the orders.
pub fn remove_category(categories: &mut Categories, key: &str) -> Option<Category> {
    let removed = categories.remove(key)?;
    renumber_orders(categories);
    Some(removed)
}
