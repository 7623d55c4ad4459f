//! Postcode canonicalization.

use once_cell::sync::Lazy;
use regex::Regex;

use bindicator_core::ports::PortError;

/// Outward codes served by the council.
pub const SERVED_AREAS: &[&str] = &[
    "E1", "E2", "E5", "E8", "E9", "E10", "E15", "E20", "N1", "N4", "N5", "N16",
];

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex should compile"));

static POSTCODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<outer>[A-Z]{1,2}[0-9][A-Z0-9]?) ?(?P<inner>[0-9][A-Z]{2})$")
        .expect("postcode regex should compile")
});

/// Trim and collapse runs of whitespace to a single space.
#[must_use]
pub fn tidy(raw: &str) -> String {
    WHITESPACE.replace_all(raw.trim(), " ").into_owned()
}

/// Normalize a postcode to `"OUTER INNER"` and check it is served.
///
/// # Errors
///
/// Returns [`PortError::InvalidPostcode`] when `raw` is not a UK postcode and
/// [`PortError::UnsupportedArea`] when its outward code is not served.
pub fn canonicalize(raw: &str) -> Result<String, PortError> {
    let tidied = tidy(raw).to_uppercase();
    let captures = POSTCODE
        .captures(&tidied)
        .ok_or(PortError::InvalidPostcode)?;
    let outer = captures.name("outer").map_or("", |part| part.as_str());
    let inner = captures.name("inner").map_or("", |part| part.as_str());

    if !SERVED_AREAS.contains(&outer) {
        return Err(PortError::UnsupportedArea(SERVED_AREAS.join(", ")));
    }

    Ok(format!("{outer} {inner}"))
}
