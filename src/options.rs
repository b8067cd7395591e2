use serde::{Deserialize, Serialize};

/// Conversion settings, read-only once a [`crate::Document`] is built.
///
/// Missing fields take their defaults when deserialized, so a partial JSON
/// object such as `{"smartypants": true}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Typographic quotes, dashes and ellipses in text.
    pub smartypants: bool,
    /// `1/2` style fractions rendered as fraction entities or sup/sub markup.
    pub fractions: bool,
    /// GFM pipe tables.
    pub tables: bool,
    /// Slug `id` attributes on headings.
    pub heading_ids: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            smartypants: false,
            fractions: false,
            tables: true,
            heading_ids: true,
        }
    }
}
