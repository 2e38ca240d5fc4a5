//! Route priority ordering.
//!
//! Sorting routes with [`route_comparator`] yields resolution order: the first
//! route in the sorted list that accepts a path wins.

use std::cmp::Ordering;

use crate::route::{is_static_segment, RouteDefinition, RouteType, Segment};

/// Total order over routes, most specific first.
///
/// Segments are compared pairwise up to the shorter route's length:
/// 1. two static segments compare by their literal text;
/// 2. a static segment sorts before a dynamic one;
/// 3. a partially dynamic segment (`prefix-[x]`) sorts before a fully dynamic one (`[x]`);
/// 4. a segment without a rest part sorts before one with a rest part.
///
/// Then more segments sort first, except that `/foo` sorts before `/foo/[...bar]`.
/// Then endpoints sort before pages, and finally the route strings are compared.
pub fn route_comparator(a: &RouteDefinition, b: &RouteDefinition) -> Ordering {
    compare_segments(a.segments(), b.segments())
        .then_with(|| compare_type(a.route_type(), b.route_type()))
        .then_with(|| locale_compare(a.route(), b.route()))
}

fn compare_segments(a: &[Segment], b: &[Segment]) -> Ordering {
    for (a_segment, b_segment) in a.iter().zip(b.iter()) {
        let a_static = is_static_segment(a_segment);
        let b_static = is_static_segment(b_segment);

        if a_static && b_static {
            let a_content = literal_content(a_segment);
            let b_content = literal_content(b_segment);
            if a_content != b_content {
                return locale_compare(&a_content, &b_content);
            }
        }

        if a_static != b_static {
            return if a_static {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }

        let a_all_dynamic = a_segment.iter().all(|part| part.dynamic);
        let b_all_dynamic = b_segment.iter().all(|part| part.dynamic);
        if a_all_dynamic != b_all_dynamic {
            return if a_all_dynamic {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let a_has_spread = a_segment.iter().any(|part| part.spread);
        let b_has_spread = b_segment.iter().any(|part| part.spread);
        if a_has_spread != b_has_spread {
            return if a_has_spread {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }
    }

    if a.len() != b.len() {
        let a_ends_in_rest = ends_in_rest(a);
        let b_ends_in_rest = ends_in_rest(b);

        if a.len().abs_diff(b.len()) == 1 && a_ends_in_rest != b_ends_in_rest {
            if a.len() > b.len() && a_ends_in_rest {
                return Ordering::Greater;
            }
            if b.len() > a.len() && b_ends_in_rest {
                return Ordering::Less;
            }
        }

        return b.len().cmp(&a.len());
    }

    Ordering::Equal
}

fn compare_type(a: RouteType, b: RouteType) -> Ordering {
    let a_endpoint = a == RouteType::Endpoint;
    let b_endpoint = b == RouteType::Endpoint;
    b_endpoint.cmp(&a_endpoint)
}

fn ends_in_rest(segments: &[Segment]) -> bool {
    segments
        .last()
        .is_some_and(|segment| !segment.is_empty() && segment.iter().all(|part| part.spread))
}

fn literal_content(segment: &Segment) -> String {
    segment.iter().map(|part| part.content.as_str()).collect()
}

/// Locale-style string collation.
///
/// Punctuation sorts before digits and digits before letters; letters compare
/// case-insensitively first, with lowercase before uppercase as a tie-break.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let primary = a
        .chars()
        .map(collation_key)
        .cmp(b.chars().map(collation_key));

    primary.then_with(|| {
        a.chars()
            .map(case_key)
            .cmp(b.chars().map(case_key))
    })
}

fn collation_key(c: char) -> (u8, char) {
    let class = if c.is_alphabetic() {
        2
    } else if c.is_numeric() {
        1
    } else {
        0
    };
    let folded = c.to_lowercase().next().unwrap_or(c);
    (class, folded)
}

fn case_key(c: char) -> u8 {
    u8::from(c.is_uppercase())
}
