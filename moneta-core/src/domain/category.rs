//! Category domain model and classifier label normalization

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name every unmapped or missing label falls back to
pub const OTHER_CATEGORY: &str = "Other";

/// Classifier labels (lower-cased) and the category names they map to.
///
/// The classifier answers in Russian; the app stores English names.
const CATEGORY_LABELS: &[(&str, &str)] = &[
    ("покупки", "Shopping"),
    ("еда", "Food"),
    ("транспорт", "Transport"),
    ("развлечения", "Entertainment"),
    ("здоровье", "Health"),
    ("коммунальные услуги", "Utilities"),
    ("переводы", "Transfers"),
    ("доход", "Income"),
];

/// Map a raw classifier label to a category name.
///
/// Total: anything not in the table, including a missing label, is `Other`.
pub fn normalize_category(label: Option<&str>) -> &'static str {
    let Some(label) = label else {
        return OTHER_CATEGORY;
    };
    let key = label.trim().to_lowercase();
    CATEGORY_LABELS
        .iter()
        .find(|(raw, _)| *raw == key)
        .map(|(_, name)| *name)
        .unwrap_or(OTHER_CATEGORY)
}

/// Whether `name` is a category the classifier labels map to, ignoring case
pub fn is_classifier_category(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    CATEGORY_LABELS
        .iter()
        .any(|(_, mapped)| mapped.to_lowercase() == name)
}

/// Whether a category tracks spending or income
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Expense,
    Income,
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryKind::Expense => write!(f, "expense"),
            CategoryKind::Income => write!(f, "income"),
        }
    }
}

impl FromStr for CategoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "expense" => Ok(CategoryKind::Expense),
            "income" => Ok(CategoryKind::Income),
            other => Err(format!("unknown category kind '{}' (expected expense or income)", other)),
        }
    }
}

/// A user-visible category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub kind: CategoryKind,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: impl Into<String>, kind: CategoryKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            created_at: Utc::now(),
        }
    }

    /// Categories a fresh database starts with: every normalized name plus `Other`
    pub fn defaults() -> Vec<Category> {
        CATEGORY_LABELS
            .iter()
            .map(|(_, name)| {
                let kind = if *name == "Income" {
                    CategoryKind::Income
                } else {
                    CategoryKind::Expense
                };
                Category::new(*name, kind)
            })
            .chain(std::iter::once(Category::new(OTHER_CATEGORY, CategoryKind::Expense)))
            .collect()
    }

    pub fn is_other(&self) -> bool {
        self.name.eq_ignore_ascii_case(OTHER_CATEGORY)
    }
}
