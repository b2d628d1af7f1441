use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

/// Localized disorder labels mapped to the identifiers the backend understands.
/// Lookups are exact and case-sensitive.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct DisorderTranslations {
    table: HashMap<String, String>,
}

impl DisorderTranslations {
    /// Translate a display label. Unknown labels are passed through unchanged.
    pub fn translate<'a>(&'a self, disorder: &'a str) -> &'a str {
        match self.table.get(disorder) {
            Some(translated) => translated.as_str(),
            None => {
                warn!("No translation found for disorder: {}", disorder);
                disorder
            }
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DisorderTranslations {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            table: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
