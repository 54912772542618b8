//! Place-string normalization.
//!
//! USGS place descriptions come in several word orders ("10 km NNE of Town",
//! "Town 10 km NNE", ...). They are rewritten into one canonical shape:
//! `"<place> - <distance> km <DIRECTION>"`.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::UNKNOWN_LOCATION;

/// Compass directions accepted by the rules, single letters first.
const DIRECTION: &str = "[NSWE]|NE|NW|SE|SW|NNE|NNW|ENE|WNW|ESE|WSW|SSE|SSW";

/// Which capture group holds which field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldOrder {
    /// Groups are (distance, direction, place)
    DistanceFirst,
    /// Groups are (place, distance, direction)
    PlaceFirst,
}

#[derive(Debug)]
struct LocationRule {
    pattern: Regex,
    order: FieldOrder,
}

impl LocationRule {
    /// Extract `(place, distance, direction)` if the rule matches.
    fn apply<'a>(&self, place: &'a str) -> Option<(&'a str, &'a str, &'a str)> {
        let caps = self.pattern.captures(place)?;
        let field = |i: usize| caps.get(i).map(|m| m.as_str());
        match self.order {
            FieldOrder::DistanceFirst => Some((field(3)?, field(1)?, field(2)?)),
            FieldOrder::PlaceFirst => Some((field(1)?, field(2)?, field(3)?)),
        }
    }
}

/// Build a case-insensitive rule from a template where `DIR` stands for the
/// direction alternation.
#[allow(clippy::expect_used)]
fn rule(template: &str, order: FieldOrder) -> LocationRule {
    let source = format!("(?i){}", template.replace("DIR", DIRECTION));
    LocationRule {
        pattern: Regex::new(&source).expect("location rule pattern must compile"),
        order,
    }
}

/// Rules in priority order; the first match wins. Word boundaries are ASCII,
/// so a direction followed by an accented letter still ends there.
static RULES: LazyLock<[LocationRule; 5]> = LazyLock::new(|| {
    [
        // "10 km NNE of Town"
        rule(r"([0-9]+)\s*km\s+(DIR)\s+of\s+(.+)", FieldOrder::DistanceFirst),
        // "10 km NNE Town"
        rule(r"([0-9]+)\s*km\s+(DIR)\s+(.+)", FieldOrder::DistanceFirst),
        // "Town 10 km NNE"
        rule(r"(.+?)\s+([0-9]+)\s*km\s+(DIR)(?-u:\b)", FieldOrder::PlaceFirst),
        // "10 NNE of Town"
        rule(r"([0-9]+)\s+(DIR)\s+of\s+(.+)", FieldOrder::DistanceFirst),
        // "Town 10 NNE"
        rule(r"(.+?)\s+([0-9]+)\s+(DIR)(?-u:\b)", FieldOrder::PlaceFirst),
    ]
});

/// Output shape of [`format_location`]. Strings already in this shape are
/// left alone so formatting is idempotent.
#[allow(clippy::expect_used)]
static CANONICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^.+ - [0-9]+ km (?:{DIRECTION})$"))
        .expect("canonical location pattern must compile")
});

/// Normalize a place description.
///
/// Empty input and [`UNKNOWN_LOCATION`] are returned unchanged, as is any
/// input no rule recognizes.
#[must_use]
pub fn format_location(place: &str) -> Cow<'_, str> {
    if place.is_empty() || place == UNKNOWN_LOCATION || CANONICAL.is_match(place) {
        return Cow::Borrowed(place);
    }

    RULES
        .iter()
        .find_map(|rule| rule.apply(place))
        .map_or(Cow::Borrowed(place), |(location, distance, direction)| {
            Cow::Owned(format!(
                "{location} - {distance} km {}",
                direction.to_uppercase()
            ))
        })
}

/// [`format_location`] for an optional place; `None` stays `None`.
#[must_use]
pub fn format_location_opt(place: Option<&str>) -> Option<Cow<'_, str>> {
    place.map(format_location)
}
