//! Post-processing for model-written worksheet HTML.
//!
//! The full-HTML generation path cannot be trusted to follow instructions, so
//! the document is parsed into a tree and corrected in place: surplus article
//! pages are dropped, disabled sections are removed, stray Name/Date/Score
//! fields become the canonical metadata row, and level badges are rewritten.
//!
//! The pass is fail-open: if anything goes wrong the input comes back
//! untouched. Running it twice gives the same result as running it once.

use std::sync::LazyLock;

use kuchiki::traits::TendrilSink;
use kuchiki::NodeRef;
use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::domain::WorksheetSettings;
use crate::error::SanitizeError;
use crate::normalize::requested_level;
use crate::render::fragments::esc;
use crate::render::styles::META_ROW_CSS;

/// Constraints the document must satisfy after sanitation.
#[derive(Clone, Debug, PartialEq)]
pub struct SanitizeOptions {
  pub article_count: usize,
  pub levels: Vec<String>,
  pub show_cover_image: bool,
  pub show_exercises: bool,
  pub show_toolkit: bool,
}

impl SanitizeOptions {
  pub fn from_settings(settings: &WorksheetSettings) -> Self {
    Self {
      article_count: settings.effective_article_count(),
      levels: settings.requested_levels(),
      show_cover_image: settings.show_cover_image,
      show_exercises: settings.show_exercises,
      show_toolkit: settings.show_language_toolkit,
    }
  }
}

/// A removable worksheet section: elements matched by marker selectors, and
/// headings whose text matches a keyword pattern (with their container).
struct SectionRule {
  name: &'static str,
  selectors: &'static str,
  heading: &'static LazyLock<Regex>,
}

static EXERCISE_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)Exercises|练习|Questions|Comprehension|阅读理解").expect("EXERCISE_HEADING_RE: hardcoded regex is valid")
});

static TOOLKIT_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)Language Toolkit|Language Focus|Toolkit|语言工具箱|工具箱|词汇|语法|Grammar Points|Golden Sentences|金句")
    .expect("TOOLKIT_HEADING_RE: hardcoded regex is valid")
});

static EXERCISES: SectionRule = SectionRule {
  name: "exercises",
  selectors: r#".exercises-section, [class*="exercise"], [class*="question"], [data-section="exercises"]"#,
  heading: &EXERCISE_HEADING_RE,
};

static TOOLKIT: SectionRule = SectionRule {
  name: "toolkit",
  selectors: concat!(
    r#".language-toolkit, .toolkit, [class*="toolkit"], [data-section="toolkit"], [data-section="language-toolkit"], "#,
    r#".grammar-golden-section, [data-section="grammar-golden"]"#,
  ),
  heading: &TOOLKIT_HEADING_RE,
};

const HEADINGS: &str = "h1, h2, h3, h4, h5, h6";
const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];
const BADGE_SELECTORS: &str = r#".level-badge, .badge-level, [data-level-badge="true"]"#;
const BADGE_TEXT_CANDIDATES: &str = "span, div, strong, em, p";
const META_LABEL_CANDIDATES: &str = "p, div, span";
const META_CSS_MARKER: &str = "data-worksheet-meta-row";

/// Classes whose elements are page scaffolding, never a removable section.
const STRUCTURAL_CLASSES: &[&str] = &["page", "page-body", "page-header", "article"];

static BADGE_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)^(A1|A2|B1|B2|C1|C2)\s*LEVEL$").expect("BADGE_TEXT_RE: hardcoded regex is valid")
});

static SCORE_SUFFIX_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"/\s*\d+").expect("SCORE_SUFFIX_RE: hardcoded regex is valid"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MetaKey {
  Name,
  Date,
  Score,
}

impl MetaKey {
  const ALL: [MetaKey; 3] = [MetaKey::Name, MetaKey::Date, MetaKey::Score];

  fn label(self) -> &'static str {
    match self {
      MetaKey::Name => "Name",
      MetaKey::Date => "Date",
      MetaKey::Score => "Score",
    }
  }

  fn data_key(self) -> &'static str {
    match self {
      MetaKey::Name => "name",
      MetaKey::Date => "date",
      MetaKey::Score => "score",
    }
  }

  /// `Name:` style prefix, case-insensitive, whitespace allowed before the colon.
  fn matches(self, text: &str) -> bool {
    let label = self.label();
    text.len() >= label.len()
      && text.is_char_boundary(label.len())
      && text[..label.len()].eq_ignore_ascii_case(label)
      && text[label.len()..].trim_start().starts_with(':')
  }
}

/// Enforce article count, visibility and level constraints on generated HTML.
/// Returns the input unchanged if processing fails.
#[instrument(level = "debug", target = "worksheet", skip(html), fields(bytes = html.len()))]
pub fn sanitize_generated_html(html: &str, opts: &SanitizeOptions) -> String {
  fail_open(html, || try_sanitize(html, opts))
}

fn fail_open(html: &str, run: impl FnOnce() -> Result<String, SanitizeError>) -> String {
  match run() {
    Ok(out) => out,
    Err(e) => {
      warn!(target: "worksheet", error = %e, "Sanitizer failed, returning generated HTML unchanged");
      html.to_string()
    }
  }
}

fn try_sanitize(html: &str, opts: &SanitizeOptions) -> Result<String, SanitizeError> {
  let document = kuchiki::parse_html().one(html);
  let allowed = opts.article_count.max(1);

  let removed = remove_out_of_range(&document, ".page", allowed)? + remove_out_of_range(&document, ".article", allowed)?;
  if removed > 0 {
    debug!(target: "worksheet", removed, allowed, "Dropped surplus article containers");
  }

  if !opts.show_cover_image {
    let n = detach_all(&document, "img")?;
    debug!(target: "worksheet", removed = n, "Removed images");
  }
  if !opts.show_exercises {
    remove_section(&document, &EXERCISES)?;
  }
  if !opts.show_toolkit {
    remove_section(&document, &TOOLKIT)?;
  }

  ensure_meta_row_css(&document)?;

  let pages: Vec<NodeRef> = select_nodes(&document, ".page")?;
  let scopes: Vec<NodeRef> = if pages.is_empty() { select_nodes(&document, "body")? } else { pages };

  for scope in &scopes {
    let header = scope.select_first(".page-header").ok().map(|h| h.as_node().clone());
    ensure_meta_row(header.as_ref().unwrap_or(scope))?;
  }

  let single = opts.article_count.max(1) == 1;
  for scope in &scopes {
    let index = if single { 0 } else { article_index(scope) };
    set_badges(scope, &requested_level(&opts.levels, index))?;
  }

  serialize_document(&document)
}

/// Matched nodes, collected before any mutation.
fn select_nodes(root: &NodeRef, selectors: &'static str) -> Result<Vec<NodeRef>, SanitizeError> {
  Ok(
    root
      .select(selectors)
      .map_err(|()| SanitizeError::Selector(selectors))?
      .map(|n| n.as_node().clone())
      .collect(),
  )
}

/// Matched nodes strictly below `scope`. `select` also tests the scope itself.
fn select_below(scope: &NodeRef, selectors: &'static str) -> Result<Vec<NodeRef>, SanitizeError> {
  Ok(select_nodes(scope, selectors)?.into_iter().filter(|n| n != scope).collect())
}

fn detach_all(root: &NodeRef, selectors: &'static str) -> Result<usize, SanitizeError> {
  let nodes = select_nodes(root, selectors)?;
  for node in &nodes {
    node.detach();
  }
  Ok(nodes.len())
}

fn attr(node: &NodeRef, name: &str) -> Option<String> {
  node.as_element().and_then(|e| e.attributes.borrow().get(name).map(str::to_string))
}

fn has_class(node: &NodeRef, class: &str) -> bool {
  attr(node, "class").is_some_and(|c| c.split_whitespace().any(|t| t == class))
}

fn tag_is(node: &NodeRef, names: &[&str]) -> bool {
  node.as_element().is_some_and(|e| names.contains(&&*e.name.local))
}

fn article_index(node: &NodeRef) -> usize {
  std::iter::once(node.clone())
    .chain(node.ancestors())
    .find_map(|n| attr(&n, "data-article-index"))
    .and_then(|raw| raw.trim().parse().ok())
    .unwrap_or(0)
}

/// Containers whose index attribute is present but outside `0..allowed`.
/// Unparseable indices count as out of range; a missing attribute is kept.
fn remove_out_of_range(root: &NodeRef, selectors: &'static str, allowed: usize) -> Result<usize, SanitizeError> {
  let mut removed = 0;
  for node in select_nodes(root, selectors)? {
    let Some(raw) = attr(&node, "data-article-index") else { continue };
    let keep = raw.trim().parse::<usize>().is_ok_and(|i| i < allowed);
    if !keep {
      node.detach();
      removed += 1;
    }
  }
  Ok(removed)
}

fn remove_section(root: &NodeRef, rule: &SectionRule) -> Result<(), SanitizeError> {
  let by_marker = detach_all(root, rule.selectors)?;

  let mut by_heading = 0;
  for heading in select_nodes(root, HEADINGS)? {
    // Already gone with an earlier container.
    if heading.parent().is_none() {
      continue;
    }
    let text = heading.text_contents();
    let text = text.trim();
    if text.is_empty() || !rule.heading.is_match(text) {
      continue;
    }
    match heading_container(&heading) {
      Some(container) => container.detach(),
      None => detach_heading_run(&heading),
    }
    by_heading += 1;
  }

  debug!(target: "worksheet", section = rule.name, by_marker, by_heading, "Removed disabled section");
  Ok(())
}

fn is_structural(node: &NodeRef) -> bool {
  tag_is(node, &["body", "html"])
    || STRUCTURAL_CLASSES.iter().any(|c| has_class(node, c))
    || attr(node, "data-article-index").is_some()
}

/// A heading loose in page scaffolding: drop it with the siblings that follow,
/// up to the next heading.
fn detach_heading_run(heading: &NodeRef) {
  let mut next = heading.next_sibling();
  while let Some(node) = next {
    if tag_is(&node, HEADING_TAGS) || is_structural(&node) {
      break;
    }
    next = node.next_sibling();
    node.detach();
  }
  heading.detach();
}

/// Nearest section/article/div above a heading, unless page scaffolding comes first.
fn heading_container(heading: &NodeRef) -> Option<NodeRef> {
  for ancestor in heading.ancestors() {
    if is_structural(&ancestor) {
      return None;
    }
    if tag_is(&ancestor, &["section", "article", "div"]) {
      return Some(ancestor);
    }
  }
  None
}

fn ensure_meta_row_css(document: &NodeRef) -> Result<(), SanitizeError> {
  if document.select_first(&format!("style[{META_CSS_MARKER}=\"true\"]")).is_ok() {
    return Ok(());
  }
  let Ok(head) = document.select_first("head") else { return Ok(()) };
  let snippet = format!("<style {META_CSS_MARKER}=\"true\">{META_ROW_CSS}</style>");
  let style = parse_element(&snippet, "style")?;
  head.as_node().append(style);
  Ok(())
}

/// Parse a snippet and pull out its first element matching `selector`.
fn parse_element(snippet: &str, selector: &'static str) -> Result<NodeRef, SanitizeError> {
  let fragment = kuchiki::parse_html().one(snippet);
  let node = fragment.select_first(selector).map_err(|()| SanitizeError::Selector(selector))?;
  let node = node.as_node().clone();
  node.detach();
  Ok(node)
}

fn inside_badge(node: &NodeRef) -> bool {
  std::iter::once(node.clone()).chain(node.ancestors()).any(|n| {
    has_class(&n, "level-badge") || has_class(&n, "badge-level") || attr(&n, "data-level-badge").as_deref() == Some("true")
  })
}

/// Drop every node that has another node of the set below it.
fn innermost(nodes: Vec<NodeRef>) -> Vec<NodeRef> {
  nodes
    .iter()
    .filter(|n| !nodes.iter().any(|d| d != *n && d.ancestors().any(|a| a == **n)))
    .cloned()
    .collect()
}

/// Innermost element whose text starts with the key's label.
fn pick_label(candidates: &[(NodeRef, String)], key: MetaKey) -> Option<NodeRef> {
  let matching = candidates.iter().filter(|(_, t)| key.matches(t)).map(|(n, _)| n.clone()).collect();
  innermost(matching).into_iter().next()
}

fn meta_row_html(score_suffix: &str) -> String {
  let items: String = MetaKey::ALL
    .iter()
    .map(|key| {
      let suffix = match key {
        MetaKey::Score if !score_suffix.is_empty() => format!(r#"<span class="meta-suffix">{}</span>"#, esc(score_suffix)),
        _ => String::new(),
      };
      format!(
        r#"<div class="meta-item" data-key="{}"><span class="meta-label">{}:</span><span class="meta-line"></span>{suffix}</div>"#,
        key.data_key(),
        key.label()
      )
    })
    .collect();
  format!(r#"<div class="meta-row">{items}</div>"#)
}

/// Collapse scattered Name/Date/Score fields into one `.meta-row`.
/// Scopes that already have a row, or lack any of the three fields, are left alone.
fn ensure_meta_row(scope: &NodeRef) -> Result<(), SanitizeError> {
  if scope.select_first(".meta-row").is_ok() {
    return Ok(());
  }

  let candidates: Vec<(NodeRef, String)> = select_below(scope, META_LABEL_CANDIDATES)?
    .into_iter()
    .filter(|n| !inside_badge(n))
    .map(|n| {
      let text = n.text_contents().trim().to_string();
      (n, text)
    })
    .filter(|(_, t)| MetaKey::ALL.iter().any(|k| k.matches(t)))
    .collect();

  let (Some(name), Some(date), Some(score)) = (
    pick_label(&candidates, MetaKey::Name),
    pick_label(&candidates, MetaKey::Date),
    pick_label(&candidates, MetaKey::Score),
  ) else {
    return Ok(());
  };

  let parent = match (name.parent(), date.parent(), score.parent()) {
    (Some(a), Some(b), Some(c)) if a == b && b == c => a,
    _ => scope.clone(),
  };

  let score_text = score.text_contents();
  let suffix: String = SCORE_SUFFIX_RE
    .find(score_text.trim())
    .map(|m| m.as_str().chars().filter(|c| !c.is_whitespace()).collect())
    .unwrap_or_default();

  let row = parse_element(&meta_row_html(&suffix), ".meta-row")?;
  name.detach();
  date.detach();
  score.detach();
  parent.prepend(row);
  debug!(target: "worksheet", suffix = %suffix, "Rebuilt metadata row");
  Ok(())
}

fn set_text(node: &NodeRef, text: &str) {
  for child in node.children().collect::<Vec<_>>() {
    child.detach();
  }
  node.append(NodeRef::new_text(text));
}

/// Rewrite marked badges and bare "B1 LEVEL" style elements to `"{LEVEL} LEVEL"`.
fn set_badges(scope: &NodeRef, level: &str) -> Result<(), SanitizeError> {
  let desired = format!("{} LEVEL", level.trim().to_uppercase());
  let mut targets = select_below(scope, BADGE_SELECTORS)?;
  let by_text: Vec<NodeRef> = select_below(scope, BADGE_TEXT_CANDIDATES)?
    .into_iter()
    .filter(|n| !inside_badge(n) && n.select_first(BADGE_SELECTORS).is_err())
    .filter(|n| BADGE_TEXT_RE.is_match(n.text_contents().trim()))
    .collect();
  targets.extend(innermost(by_text));
  for badge in targets {
    if badge.parent().is_some() && badge.text_contents().trim() != desired {
      set_text(&badge, &desired);
    }
  }
  Ok(())
}

fn serialize_document(document: &NodeRef) -> Result<String, SanitizeError> {
  let root = document.select_first("html").map_err(|()| SanitizeError::NoRoot)?;
  let mut out = b"<!doctype html>\n".to_vec();
  root.as_node().serialize(&mut out)?;
  Ok(String::from_utf8(out)?)
}

/// Number of articles a document holds: highest `data-article-index` + 1,
/// or 0 when no element carries the attribute.
pub fn detect_article_count(html: &str) -> usize {
  let document = kuchiki::parse_html().one(html);
  let Ok(nodes) = document.select("[data-article-index]") else { return 0 };
  nodes
    .filter_map(|n| n.attributes.borrow().get("data-article-index").and_then(|v| v.trim().parse::<usize>().ok()))
    .max()
    .map_or(0, |max| max + 1)
}
