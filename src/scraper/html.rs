//! Tag lookup over parsed documents. A missing tag is an error, never an absent value.

use crate::scraper::error::ScraperError;
use regex::Regex;
use scraper::ElementRef;
use tracing::error;

/// Constraint on one attribute of a candidate element.
#[derive(Debug, Clone, Copy)]
pub enum AttrValue<'a> {
    /// Attribute must be present, any value.
    Any,
    /// Attribute must equal this value.
    Equals(&'a str),
    /// Attribute must match this pattern.
    Matches(&'a Regex),
}

impl AttrValue<'_> {
    fn accepts(&self, value: &str) -> bool {
        match self {
            AttrValue::Any => true,
            AttrValue::Equals(expected) => value == *expected,
            AttrValue::Matches(re) => re.is_match(value),
        }
    }
}

/// Attribute filter: every entry must hold. Empty slice means no constraint.
pub type AttrFilter<'a> = [(&'a str, AttrValue<'a>)];

fn attr_matches(element: &ElementRef<'_>, name: &str, expected: &AttrValue<'_>) -> bool {
    let Some(value) = element.value().attr(name) else {
        return false;
    };
    if expected.accepts(value) {
        return true;
    }
    // class is multi-valued: any single class may satisfy the filter
    name == "class" && value.split_whitespace().any(|c| expected.accepts(c))
}

fn element_matches(element: &ElementRef<'_>, tag: &str, attrs: &AttrFilter<'_>) -> bool {
    element.value().name().eq_ignore_ascii_case(tag)
        && attrs
            .iter()
            .all(|(name, expected)| attr_matches(element, name, expected))
}

/// Render a filter for log and error messages, e.g. `{class="docutils", href}`.
pub fn describe_filter(attrs: &AttrFilter<'_>) -> String {
    let parts: Vec<String> = attrs
        .iter()
        .map(|(name, value)| match value {
            AttrValue::Any => name.to_string(),
            AttrValue::Equals(v) => format!("{}={:?}", name, v),
            AttrValue::Matches(re) => format!("{}=~/{}/", name, re.as_str()),
        })
        .collect();
    format!("{{{}}}", parts.join(", "))
}

/// All descendants of `node` (not `node` itself) named `tag` that satisfy `attrs`, in document order.
pub fn find_all<'a>(node: ElementRef<'a>, tag: &str, attrs: &AttrFilter<'_>) -> Vec<ElementRef<'a>> {
    node.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|el| element_matches(el, tag, attrs))
        .collect()
}

/// First descendant of `node` named `tag` that satisfies `attrs`.
///
/// Logs and returns [ScraperError::TagNotFound] when nothing matches, so callers can tell a
/// page whose structure changed apart from a page that could not be fetched.
pub fn find_tag<'a>(
    node: ElementRef<'a>,
    tag: &str,
    attrs: &AttrFilter<'_>,
) -> Result<ElementRef<'a>, ScraperError> {
    let found = node
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| element_matches(el, tag, attrs));
    match found {
        Some(el) => Ok(el),
        None => {
            let filter = describe_filter(attrs);
            error!(tag, filter = %filter, "tag not found");
            Err(ScraperError::TagNotFound {
                tag: tag.to_string(),
                filter,
            })
        }
    }
}

/// Concatenated text of an element and all its descendants.
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Next sibling that is an element, skipping text and comments.
pub fn next_sibling_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

/// Value of `name` on `element`, or [ScraperError::TagNotFound] naming the attribute.
pub fn required_attr<'a>(element: ElementRef<'a>, name: &str) -> Result<&'a str, ScraperError> {
    element.value().attr(name).ok_or_else(|| {
        let filter = describe_filter(&[(name, AttrValue::Any)]);
        error!(tag = element.value().name(), filter = %filter, "attribute missing");
        ScraperError::TagNotFound {
            tag: element.value().name().to_string(),
            filter,
        }
    })
}
