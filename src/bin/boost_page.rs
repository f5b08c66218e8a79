//! One-shot rewrite pass over an HTML file, for inspecting engine behavior.

use clap::Parser;
use fontboost::discovery::discover_roots;
use fontboost::engine::{Evaluation, RewriteEngine};
use fontboost::html::parse_page;
use fontboost::matching::HostMatchMode;
use fontboost::settings::{parse_settings, Settings};
use fontboost::style::computed_font_size;
use fontboost::Result;
use std::fs;

#[derive(Parser, Debug)]
#[command(
  name = "boost_page",
  version,
  about = "Run one font-rewrite pass over an HTML file and print the result"
)]
struct Cli {
  /// Path to the HTML file to rewrite
  html: String,

  /// URL the page is considered to be loaded from (domain rules run
  /// against this)
  #[arg(long, default_value = "https://example.com/")]
  url: String,

  /// Path to a settings JSON file; defaults apply when omitted
  #[arg(long)]
  settings: Option<String>,

  /// Match literal domain rules as hostname suffixes instead of prefixes
  #[arg(long)]
  suffix_domains: bool,
}

fn main() -> Result<()> {
  env_logger::init();
  let cli = Cli::parse();

  let settings = match &cli.settings {
    Some(path) => parse_settings(&fs::read_to_string(path)?)?,
    None => Settings::default(),
  };
  let html = fs::read_to_string(&cli.html)?;
  let mut page = parse_page(&html, &cli.url)?;

  let mode = if cli.suffix_domains {
    HostMatchMode::Suffix
  } else {
    HostMatchMode::Prefix
  };
  let mut engine = RewriteEngine::new(mode);
  let roots = discover_roots(&page.dom, page.document);
  let evaluation = engine.evaluate(&mut page, Some(&settings), &roots);

  match evaluation {
    Evaluation::NoSettings => println!("no settings; nothing done"),
    Evaluation::Restored { restored } => println!("disabled; restored {} element(s)", restored),
    Evaluation::OutOfScope => println!("domain rules exclude {}", page.hostname()),
    Evaluation::Applied(outcome) => {
      println!(
        "{} changed, {} skipped, {} at or over threshold",
        outcome.changed, outcome.skipped, outcome.over_threshold
      );
      for root in &roots {
        for element in page.dom.elements_under(*root) {
          let Some(size) = page.dom.inline_font_size(element) else {
            continue;
          };
          let original = engine.original_size(element);
          println!(
            "  <{}> {} (computed {:.1}px{})",
            page.dom.tag_name(element).unwrap_or("?"),
            size,
            computed_font_size(&page.dom, element),
            match original {
              Some(px) => format!(", was {:.1}px", px),
              None => String::new(),
            }
          );
        }
      }
    }
  }
  Ok(())
}
