//! HTML ingestion.
//!
//! Parses page source with html5ever into an `RcDom`, converts the handle
//! tree into the arena, then promotes declarative shadow DOM: the first
//! `<template shadowroot="open"|"closed">` (or `shadowrootmode`) child of
//! an element becomes that element's attached shadow root, its content
//! re-parented into the root and the emptied template removed. Templates
//! without a shadow-root attribute stay inert.
//!
//! Comments, doctypes, and processing instructions are dropped during
//! conversion; nothing downstream looks at them.

use crate::dom::{Dom, NodeId, Page, ShadowRootMode};
use crate::error::{ParseError, Result};
use crate::style::FontSize;
use cssparser::{Delimiter, Parser as CssParser, ParserInput, Token};
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{parse_document as html5ever_parse, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::io;
use url::Url;

/// Parse an HTML document loaded from `url` into a [`Page`].
pub fn parse_page(html: &str, url: &str) -> Result<Page> {
  let url = Url::parse(url).map_err(|e| ParseError::InvalidUrl {
    url: url.to_string(),
    message: e.to_string(),
  })?;

  let opts = ParseOpts {
    tree_builder: TreeBuilderOpts {
      scripting_enabled: false,
      ..Default::default()
    },
    ..Default::default()
  };
  let mut reader = io::Cursor::new(html.as_bytes());
  let rcdom = html5ever_parse(RcDom::default(), opts)
    .from_utf8()
    .read_from(&mut reader)
    .map_err(|e| ParseError::InvalidHtml {
      message: e.to_string(),
    })?;

  let mut page = Page::new(url);
  convert_children(&mut page.dom, page.document, &rcdom.document)?;
  promote_declarative_shadow_roots(&mut page.dom, page.document)?;
  Ok(page)
}

/// Convert the handle tree under `handle` into arena nodes under `parent`.
///
/// Template elements keep their parsed content (html5ever stores it off to
/// the side in `template_contents`) so the shadow promotion pass can see
/// it; the content stays inert for every other walk.
fn convert_children(dom: &mut Dom, parent: NodeId, handle: &Handle) -> Result<()> {
  let mut stack: Vec<(Handle, NodeId)> = Vec::new();
  for child in handle.children.borrow().iter().rev() {
    stack.push((child.clone(), parent));
  }

  while let Some((handle, parent)) = stack.pop() {
    match &handle.data {
      NodeData::Element { name, attrs, template_contents, .. } => {
        let element = dom.create_element(&name.local);
        for attr in attrs.borrow().iter() {
          dom.set_attribute(element, &attr.name.local, &attr.value)?;
          if attr.name.local.as_ref().eq_ignore_ascii_case("style") {
            if let Some(size) = font_size_from_style(&attr.value) {
              dom.set_inline_font_size(element, size)?;
            }
          }
        }
        dom.append_child(parent, element)?;

        let is_template = name.local.as_ref().eq_ignore_ascii_case("template");
        if is_template {
          if let Some(content) = template_contents.borrow().as_ref() {
            for child in content.children.borrow().iter().rev() {
              stack.push((child.clone(), element));
            }
          }
        } else {
          for child in handle.children.borrow().iter().rev() {
            stack.push((child.clone(), element));
          }
        }
      }
      NodeData::Text { contents } => {
        let text = dom.create_text(&contents.borrow());
        dom.append_child(parent, text)?;
      }
      _ => {}
    }
  }
  Ok(())
}

/// The `font-size` declaration of an inline `style` attribute, if present
/// and expressed in a unit the engine understands.
///
/// Tokenized with `cssparser`, so comments, `!important`, and whatever
/// other declarations share the attribute don't confuse the lookup. The
/// last parseable `font-size` wins, as in a real declaration list.
fn font_size_from_style(style: &str) -> Option<FontSize> {
  let mut input = ParserInput::new(style);
  let mut parser = CssParser::new(&mut input);
  let mut found = None;
  while !parser.is_exhausted() {
    let declaration = parser.parse_until_after(Delimiter::Semicolon, |parser| {
      parser.skip_whitespace();
      let property = parser.expect_ident()?.to_string();
      parser.expect_colon()?;
      let is_font_size = property.eq_ignore_ascii_case("font-size");
      let mut value = None;
      while let Ok(token) = parser.next() {
        if is_font_size && value.is_none() {
          if let Token::Dimension { value: number, unit, .. } = token {
            value = FontSize::from_dimension(*number, unit);
          }
        }
      }
      Ok::<_, cssparser::ParseError<()>>(value)
    });
    if let Ok(Some(size)) = declaration {
      found = Some(size);
    }
  }
  found
}

fn shadow_mode_of(dom: &Dom, template: NodeId) -> Option<ShadowRootMode> {
  if !dom.tag_name(template)?.eq_ignore_ascii_case("template") {
    return None;
  }
  let mode = dom
    .attribute(template, "shadowroot")
    .or_else(|| dom.attribute(template, "shadowrootmode"))?;
  match mode.to_ascii_lowercase().as_str() {
    "open" => Some(ShadowRootMode::Open),
    "closed" => Some(ShadowRootMode::Closed),
    _ => None,
  }
}

/// Promote declarative shadow templates, recursing through newly created
/// roots so nested declarations resolve too. Only the first qualifying
/// template per host is promoted; later ones stay inert.
fn promote_declarative_shadow_roots(dom: &mut Dom, document: NodeId) -> Result<()> {
  let mut worklist = vec![document];
  while let Some(root) = worklist.pop() {
    for element in dom.elements_under(root) {
      let Some((template, mode)) = dom
        .children(element)
        .iter()
        .copied()
        .find_map(|child| shadow_mode_of(dom, child).map(|mode| (child, mode)))
      else {
        continue;
      };
      let shadow = dom.attach_shadow_root(element, mode)?;
      for child in dom.children(template).to_vec() {
        dom.append_child(shadow, child)?;
      }
      dom.remove_node(template)?;
      worklist.push(shadow);
    }
  }
  Ok(())
}
