//! Target column inference

use serde::{Deserialize, Serialize};

/// Keywords that mark a likely prediction target
pub const TARGET_KEYWORDS: [&str; 6] = ["revenue", "target", "sales", "income", "profit", "earning"];

/// Guesses the target column from column names.
///
/// The first column (in table order) whose lower-cased name contains any
/// keyword wins; keyword order never ranks columns against each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetInferer {
    keywords: Vec<String>,
}

impl Default for TargetInferer {
    fn default() -> Self {
        Self {
            keywords: TARGET_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl TargetInferer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom keyword list
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(|k| k.into().to_lowercase()).collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// First matching column name, or `None` when nothing matches
    pub fn infer<'a, S: AsRef<str>>(&self, columns: &'a [S]) -> Option<&'a str> {
        columns
            .iter()
            .map(|c| c.as_ref())
            .find(|name| {
                let lower = name.to_lowercase();
                self.keywords.iter().any(|k| lower.contains(k.as_str()))
            })
    }
}
