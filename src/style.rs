//! Font-size values and computed-size resolution.
//!
//! The engine only ever reads and writes one style property, so this is a
//! deliberately narrow slice of a style system: a `FontSize` value type
//! (px/em/rem) and the inheritance walk that resolves an element's
//! computed size in pixels.

use crate::dom::{Dom, NodeId, NodeKind};
use std::fmt;

/// Default font size at a document root, in pixels.
pub const DEFAULT_FONT_SIZE_PX: f32 = 16.0;

/// An inline font-size value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FontSize {
  Px(f32),
  Em(f32),
  Rem(f32),
}

impl FontSize {
  /// Parse a dimension string such as `"12px"`, `"1.5em"`, or `"2rem"`.
  ///
  /// Anything else (unknown unit, bare number, garbage) is `None`.
  pub fn parse(value: &str) -> Option<FontSize> {
    let value = value.trim();
    // Longest suffix first: "rem" would otherwise lose its "r" to "em".
    for suffix in ["rem", "em", "px"] {
      if let Some(number) = strip_suffix_ignore_case(value, suffix) {
        let number = number.trim().parse::<f32>().ok()?;
        return FontSize::from_dimension(number, suffix);
      }
    }
    None
  }

  /// Build a font-size from an already-tokenized dimension (a numeric
  /// value plus a unit identifier). Unknown units are `None`.
  pub fn from_dimension(value: f32, unit: &str) -> Option<FontSize> {
    if !value.is_finite() {
      return None;
    }
    if unit.eq_ignore_ascii_case("px") {
      Some(FontSize::Px(value))
    } else if unit.eq_ignore_ascii_case("em") {
      Some(FontSize::Em(value))
    } else if unit.eq_ignore_ascii_case("rem") {
      Some(FontSize::Rem(value))
    } else {
      None
    }
  }

  pub fn value(self) -> f32 {
    match self {
      FontSize::Px(v) | FontSize::Em(v) | FontSize::Rem(v) => v,
    }
  }

  fn unit(self) -> &'static str {
    match self {
      FontSize::Px(_) => "px",
      FontSize::Em(_) => "em",
      FontSize::Rem(_) => "rem",
    }
  }
}

fn strip_suffix_ignore_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
  let split = value.len().checked_sub(suffix.len())?;
  if !value.is_char_boundary(split) {
    return None;
  }
  let (head, tail) = value.split_at(split);
  tail.eq_ignore_ascii_case(suffix).then_some(head)
}

impl fmt::Display for FontSize {
  /// Renders the way script would stringify it: `16` becomes `"16px"`,
  /// `1.5` becomes `"1.5em"`.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let v = self.value();
    if v.fract() == 0.0 {
      write!(f, "{}{}", v as i64, self.unit())
    } else {
      write!(f, "{}{}", v, self.unit())
    }
  }
}

/// Resolve an element's computed font-size in pixels.
///
/// Walks the self-then-ancestor chain for the nearest inline font-size.
/// `em` values multiply the parent's computed size, `rem` values are
/// relative to the root default, and an unstyled chain bottoms out at
/// [`DEFAULT_FONT_SIZE_PX`]. The parent chain naturally crosses shadow
/// boundaries because a shadow root's parent is its host element.
pub fn computed_font_size(dom: &Dom, element: NodeId) -> f32 {
  let mut em_factors: Vec<f32> = Vec::new();
  let mut cursor = Some(element);
  while let Some(id) = cursor {
    if let Some(NodeKind::Element(data)) = dom.kind(id) {
      match data.inline_font_size {
        Some(FontSize::Px(v)) => return apply_factors(v, &em_factors),
        Some(FontSize::Rem(v)) => return apply_factors(v * DEFAULT_FONT_SIZE_PX, &em_factors),
        Some(FontSize::Em(v)) => em_factors.push(v),
        None => {}
      }
    }
    cursor = dom.parent(id);
  }
  apply_factors(DEFAULT_FONT_SIZE_PX, &em_factors)
}

fn apply_factors(base: f32, em_factors: &[f32]) -> f32 {
  em_factors.iter().fold(base, |size, factor| size * factor)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dom::Page;
  use crate::dom::ShadowRootMode;
  use url::Url;

  fn page() -> Page {
    Page::new(Url::parse("https://example.com/").unwrap())
  }

  #[test]
  fn parses_known_units() {
    assert_eq!(FontSize::parse("12px"), Some(FontSize::Px(12.0)));
    assert_eq!(FontSize::parse("1.5em"), Some(FontSize::Em(1.5)));
    assert_eq!(FontSize::parse("2rem"), Some(FontSize::Rem(2.0)));
    assert_eq!(FontSize::parse(" 14PX "), Some(FontSize::Px(14.0)));
  }

  #[test]
  fn rejects_unknown_values() {
    assert_eq!(FontSize::parse("12"), None);
    assert_eq!(FontSize::parse("12pt"), None);
    assert_eq!(FontSize::parse("large"), None);
    assert_eq!(FontSize::parse(""), None);
  }

  #[test]
  fn dimensions_map_by_unit() {
    assert_eq!(FontSize::from_dimension(8.0, "px"), Some(FontSize::Px(8.0)));
    assert_eq!(FontSize::from_dimension(1.5, "EM"), Some(FontSize::Em(1.5)));
    assert_eq!(FontSize::from_dimension(2.0, "rem"), Some(FontSize::Rem(2.0)));
    assert_eq!(FontSize::from_dimension(12.0, "pt"), None);
    assert_eq!(FontSize::from_dimension(f32::NAN, "px"), None);
  }

  #[test]
  fn renders_like_script_stringification() {
    assert_eq!(FontSize::Px(16.0).to_string(), "16px");
    assert_eq!(FontSize::Em(2.0).to_string(), "2em");
    assert_eq!(FontSize::Em(1.5).to_string(), "1.5em");
    assert_eq!(FontSize::Rem(0.875).to_string(), "0.875rem");
  }

  #[test]
  fn unstyled_elements_compute_to_the_default() {
    let mut page = page();
    let body = page.dom.create_element("body");
    let p = page.dom.create_element("p");
    page.dom.append_child(page.document, body).unwrap();
    page.dom.append_child(body, p).unwrap();

    assert_eq!(computed_font_size(&page.dom, p), DEFAULT_FONT_SIZE_PX);
  }

  #[test]
  fn px_wins_and_is_inherited() {
    let mut page = page();
    let body = page.dom.create_element("body");
    let p = page.dom.create_element("p");
    page.dom.append_child(page.document, body).unwrap();
    page.dom.append_child(body, p).unwrap();
    page.dom.set_inline_font_size(body, FontSize::Px(10.0)).unwrap();

    assert_eq!(computed_font_size(&page.dom, p), 10.0);
    assert_eq!(computed_font_size(&page.dom, body), 10.0);
  }

  #[test]
  fn em_scales_the_parent_computed_size() {
    let mut page = page();
    let body = page.dom.create_element("body");
    let outer = page.dom.create_element("div");
    let inner = page.dom.create_element("span");
    page.dom.append_child(page.document, body).unwrap();
    page.dom.append_child(body, outer).unwrap();
    page.dom.append_child(outer, inner).unwrap();
    page.dom.set_inline_font_size(body, FontSize::Px(10.0)).unwrap();
    page.dom.set_inline_font_size(outer, FontSize::Em(2.0)).unwrap();
    page.dom.set_inline_font_size(inner, FontSize::Em(1.5)).unwrap();

    assert_eq!(computed_font_size(&page.dom, outer), 20.0);
    assert_eq!(computed_font_size(&page.dom, inner), 30.0);
  }

  #[test]
  fn rem_ignores_the_ancestor_chain() {
    let mut page = page();
    let body = page.dom.create_element("body");
    let inner = page.dom.create_element("span");
    page.dom.append_child(page.document, body).unwrap();
    page.dom.append_child(body, inner).unwrap();
    page.dom.set_inline_font_size(body, FontSize::Px(10.0)).unwrap();
    page.dom.set_inline_font_size(inner, FontSize::Rem(2.0)).unwrap();

    assert_eq!(computed_font_size(&page.dom, inner), 32.0);
  }

  #[test]
  fn shadow_content_inherits_through_the_host() {
    let mut page = page();
    let body = page.dom.create_element("body");
    let host = page.dom.create_element("div");
    page.dom.append_child(page.document, body).unwrap();
    page.dom.append_child(body, host).unwrap();
    page.dom.set_inline_font_size(host, FontSize::Px(11.0)).unwrap();
    let shadow = page.dom.attach_shadow_root(host, ShadowRootMode::Open).unwrap();
    let span = page.dom.create_element("span");
    page.dom.append_child(shadow, span).unwrap();

    assert_eq!(computed_font_size(&page.dom, span), 11.0);
  }
}
