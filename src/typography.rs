//! Optional typographic substitutions applied to rendered text.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

static OPENING_SINGLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(^|[-\u{2014}/(\[{"\s])'"#).expect("opening single quote pattern")
});

static OPENING_DOUBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(^|[-\u{2014}/(\[{\u{2018}\s])""#).expect("opening double quote pattern")
});

static FRACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)/(\d+)(/\d+)?").expect("fraction pattern"));

/// Curly quotes, en/em dashes and ellipses. Runs before HTML escaping.
pub fn smartypants(text: &str) -> Cow<'_, str> {
    if !text.contains(['-', '.', '\'', '"']) {
        return Cow::Borrowed(text);
    }
    let text = text
        .replace("---", "\u{2014}")
        .replace("--", "\u{2013}")
        .replace("...", "\u{2026}");
    let text = OPENING_SINGLE
        .replace_all(&text, "${1}\u{2018}")
        .replace('\'', "\u{2019}");
    let text = OPENING_DOUBLE
        .replace_all(&text, "${1}\u{201c}")
        .replace('"', "\u{201d}");
    Cow::Owned(text)
}

/// `1/2`, `1/4` and `3/4` become entities, other fractions super/subscript
/// markup. Date-like `a/b/c` sequences are left alone. Runs after escaping.
pub fn fractions(text: &str) -> Cow<'_, str> {
    FRACTION.replace_all(text, |caps: &Captures<'_>| {
        if caps.get(3).is_some() {
            return caps[0].to_string();
        }
        match (&caps[1], &caps[2]) {
            ("1", "2") => "&frac12;".to_string(),
            ("1", "4") => "&frac14;".to_string(),
            ("3", "4") => "&frac34;".to_string(),
            (numerator, denominator) => {
                format!("<sup>{numerator}</sup>&frasl;<sub>{denominator}</sub>")
            }
        }
    })
}
