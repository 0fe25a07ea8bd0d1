use crate::index::Field;
use crate::{Result, SumiError};
use serde::{Deserialize, Serialize};

/// Tunable weights of the scoring model
///
/// Field weights scale the tf-idf contribution of each field. `freshness`,
/// `content_length` and `depth` scale the document-level signals; `depth` is
/// negative by default so deeper pages rank lower.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RankingWeights {
    pub title: f64,
    pub content: f64,
    pub meta_description: f64,
    pub headings: f64,
    pub url: f64,
    pub freshness: f64,
    pub content_length: f64,
    pub depth: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            title: 3.0,
            content: 1.0,
            meta_description: 2.0,
            headings: 2.5,
            url: 1.5,
            freshness: 1.0,
            content_length: 0.5,
            depth: -0.2,
        }
    }
}

impl RankingWeights {
    /// Names accepted by [`RankingWeights::set`], in display order
    pub const NAMES: [&'static str; 8] = [
        "title",
        "content",
        "meta-description",
        "headings",
        "url",
        "freshness",
        "content-length",
        "depth",
    ];

    /// Weight applied to a field's tf-idf sum
    pub fn field(&self, field: Field) -> f64 {
        match field {
            Field::Title => self.title,
            Field::Headings => self.headings,
            Field::MetaDescription => self.meta_description,
            Field::Content => self.content,
            Field::Url => self.url,
        }
    }

    /// Reads a weight by name
    pub fn get(&self, name: &str) -> Option<f64> {
        Some(match name {
            "title" => self.title,
            "content" => self.content,
            "meta-description" | "meta_description" => self.meta_description,
            "headings" => self.headings,
            "url" => self.url,
            "freshness" => self.freshness,
            "content-length" | "content_length" => self.content_length,
            "depth" => self.depth,
            _ => return None,
        })
    }

    /// Sets a weight by name
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The weight was updated
    /// * `Err(SumiError::InvalidWeights)` - Unknown name or non-finite value
    pub fn set(&mut self, name: &str, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(SumiError::InvalidWeights(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }
        let slot = match name {
            "title" => &mut self.title,
            "content" => &mut self.content,
            "meta-description" | "meta_description" => &mut self.meta_description,
            "headings" => &mut self.headings,
            "url" => &mut self.url,
            "freshness" => &mut self.freshness,
            "content-length" | "content_length" => &mut self.content_length,
            "depth" => &mut self.depth,
            _ => {
                return Err(SumiError::InvalidWeights(format!(
                    "unknown weight '{}'",
                    name
                )))
            }
        };
        *slot = value;
        Ok(())
    }

    /// Iterates `(name, value)` pairs in display order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        Self::NAMES
            .iter()
            .filter_map(move |name| self.get(name).map(|value| (*name, value)))
    }

    /// Checks that every weight is finite
    pub fn validate(&self) -> Result<()> {
        match self.iter().find(|(_, value)| !value.is_finite()) {
            Some((name, value)) => Err(SumiError::InvalidWeights(format!(
                "{} must be finite, got {}",
                name, value
            ))),
            None => Ok(()),
        }
    }
}
