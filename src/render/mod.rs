//! Draft to printable HTML.
//!
//! [`render_worksheet_html`] is a pure function of its inputs. Each article
//! becomes one `section.article[data-article-index=i]` grouping holding a single
//! `.page[data-article-index=i]`; the embedded pagination script adds more pages
//! to the grouping in the browser when content overflows.

pub mod fragments;
pub mod styles;

use tracing::{debug, instrument};

use crate::domain::{DraftArticle, LayoutOverrides, Orientation, PaperSize, WorksheetDraft, WorksheetSettings};
use crate::pagination;

pub const DEFAULT_LINE_HEIGHT: f64 = 1.2;
pub const DEFAULT_FONT_SIZE_PX: f64 = 14.0;
pub const DEFAULT_IMAGE_POSITION_Y: f64 = 20.0;
pub const DEFAULT_PAGE_PADDING_MM: f64 = 0.0;
pub const DEFAULT_PARAGRAPH_SPACING_PX: f64 = 8.0;

/// CSS reference pixels per millimetre (96 dpi).
const PX_PER_MM: f64 = 96.0 / 25.4;

/// Physical page size after applying orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageDimensions {
  pub width_mm: u32,
  pub height_mm: u32,
}

impl PageDimensions {
  pub fn new(paper: PaperSize, orientation: Orientation) -> Self {
    let (w, h) = paper.portrait_mm();
    match orientation {
      Orientation::Portrait => Self { width_mm: w, height_mm: h },
      Orientation::Landscape => Self { width_mm: h, height_mm: w },
    }
  }

  pub fn width_px(&self) -> f64 { self.width_mm as f64 * PX_PER_MM }
  pub fn height_px(&self) -> f64 { self.height_mm as f64 * PX_PER_MM }
}

/// Per-article layout with defaults filled in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArticleLayout {
  pub line_height: f64,
  pub font_size: f64,
  pub image_position_y: f64,
  pub page_padding: f64,
  pub paragraph_spacing: f64,
}

impl Default for ArticleLayout {
  fn default() -> Self {
    Self {
      line_height: DEFAULT_LINE_HEIGHT,
      font_size: DEFAULT_FONT_SIZE_PX,
      image_position_y: DEFAULT_IMAGE_POSITION_Y,
      page_padding: DEFAULT_PAGE_PADDING_MM,
      paragraph_spacing: DEFAULT_PARAGRAPH_SPACING_PX,
    }
  }
}

impl From<&LayoutOverrides> for ArticleLayout {
  fn from(o: &LayoutOverrides) -> Self {
    let d = ArticleLayout::default();
    Self {
      line_height: o.line_height.unwrap_or(d.line_height),
      font_size: o.font_size.unwrap_or(d.font_size),
      image_position_y: o.image_position_y.unwrap_or(d.image_position_y),
      page_padding: o.page_padding.unwrap_or(d.page_padding),
      paragraph_spacing: o.paragraph_spacing.unwrap_or(d.paragraph_spacing),
    }
  }
}

/// Document-wide render inputs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderOptions {
  pub paper_size: PaperSize,
  pub orientation: Orientation,
  /// Shared cover image. Each article may still hide it.
  pub cover_image_url: Option<String>,
  pub show_exercises: bool,
  pub show_toolkit: bool,
}

impl RenderOptions {
  pub fn from_settings(settings: &WorksheetSettings) -> Self {
    Self {
      paper_size: settings.paper_size,
      orientation: settings.orientation,
      cover_image_url: settings.effective_cover_url().map(str::to_string),
      show_exercises: settings.show_exercises,
      show_toolkit: settings.show_language_toolkit,
    }
  }

  fn cover_url(&self) -> Option<&str> {
    self.cover_image_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
  }
}

/// First page of one article, wrapped in its index-keyed grouping.
pub fn render_article(article: &DraftArticle, index: usize, opts: &RenderOptions) -> String {
  let layout = ArticleLayout::from(&article.layout);
  let title = if article.title.trim().is_empty() { "Untitled" } else { article.title.trim() };

  let mut body = String::new();
  if let Some(url) = opts.cover_url().filter(|_| article.shows_cover_image()) {
    body.push_str(&fragments::cover(url, layout.image_position_y));
  }
  body.push_str(&fragments::reading(&article.paragraphs, &layout));

  if opts.show_toolkit {
    if article.shows_vocab() {
      body.push_str(&fragments::toolkit(article.toolkit.as_deref().unwrap_or_default()));
    }
    let points = article.grammar_points.as_deref().filter(|_| article.shows_grammar()).unwrap_or_default();
    let sentences = article.golden_sentences.as_deref().filter(|_| article.shows_golden()).unwrap_or_default();
    body.push_str(&fragments::grammar_and_golden(points, sentences));
  }
  if opts.show_exercises {
    body.push_str(&fragments::exercises(article.exercises.as_deref().unwrap_or_default()));
  }

  format!(
    concat!(
      "<section class=\"article\" data-article-index=\"{i}\">\n",
      "<div class=\"page\" data-article-index=\"{i}\" style=\"padding: {pad}mm;\">\n",
      "<div class=\"page-header\">{meta}<h1 class=\"title\">{title}</h1></div>\n",
      "<div class=\"page-body\" style=\"line-height: {lh}; font-size: {fs}px;\">{body}</div>\n",
      "</div>\n",
      "</section>\n",
    ),
    i = index,
    pad = layout.page_padding,
    meta = fragments::meta_row(&article.cefr_level),
    title = fragments::esc(title),
    lh = layout.line_height,
    fs = layout.font_size,
    body = body,
  )
}

/// Complete standalone document: doctype, inline stylesheet, one grouping
/// per article, and the pagination script at the end of the body.
#[instrument(level = "debug", target = "worksheet", skip_all, fields(articles = draft.articles.len()))]
pub fn render_worksheet_html(draft: &WorksheetDraft, opts: &RenderOptions) -> String {
  let dims = PageDimensions::new(opts.paper_size, opts.orientation);
  let articles: String = draft
    .articles
    .iter()
    .enumerate()
    .map(|(i, a)| render_article(a, i, opts))
    .collect();

  let html = format!(
    concat!(
      "<!doctype html>\n",
      "<html lang=\"en\">\n",
      "<head>\n",
      "<meta charset=\"utf-8\" />\n",
      "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n",
      "<title>Worksheet</title>\n",
      "<style>{css}</style>\n",
      "</head>\n",
      "<body>\n",
      "{articles}",
      "{script}\n",
      "</body>\n",
      "</html>\n",
    ),
    css = styles::stylesheet(&dims),
    articles = articles,
    script = pagination::script_tag(),
  );
  debug!(target: "worksheet", bytes = html.len(), width_mm = dims.width_mm, "Rendered worksheet");
  html
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{GrammarPoint, Question, QuestionType, ToolkitGroup};
  use kuchiki::traits::TendrilSink;

  fn article(title: &str, level: &str, paragraphs: &[&str]) -> DraftArticle {
    DraftArticle {
      title: title.into(),
      cefr_level: level.into(),
      paragraphs: paragraphs.iter().map(|p| p.to_string()).collect(),
      ..Default::default()
    }
  }

  fn all_on() -> RenderOptions {
    RenderOptions { show_exercises: true, show_toolkit: true, ..Default::default() }
  }

  fn count(html: &str, selector: &str) -> usize {
    kuchiki::parse_html().one(html).select(selector).unwrap().count()
  }

  #[test]
  fn document_is_self_contained() {
    let draft = WorksheetDraft { articles: vec![article("Tides", "b1", &["The sea rises."])] };
    let html = render_worksheet_html(&draft, &all_on());
    assert!(html.starts_with("<!doctype html>\n"));
    assert!(html.contains("<style>"));
    assert!(html.trim_end().ends_with("</html>"));
    assert_eq!(html.matches("<script>").count(), 1);
    assert!(html.find("</section>").unwrap() < html.find("<script>").unwrap());
    assert!(html.contains("B1 LEVEL"));
  }

  #[test]
  fn groupings_and_pages_share_indices() {
    let draft = WorksheetDraft {
      articles: vec![article("A", "A1", &["x"]), article("B", "A2", &["y"]), article("C", "B1", &["z"])],
    };
    let html = render_worksheet_html(&draft, &all_on());
    let doc = kuchiki::parse_html().one(html);
    for i in 0..3 {
      let group = doc.select_first(&format!("section.article[data-article-index=\"{i}\"]")).unwrap();
      let pages: Vec<_> = group.as_node().select(".page").unwrap().collect();
      assert_eq!(pages.len(), 1);
      assert_eq!(pages[0].attributes.borrow().get("data-article-index"), Some(i.to_string().as_str()));
    }
  }

  #[test]
  fn title_and_paragraphs_are_escaped() {
    let draft = WorksheetDraft { articles: vec![article("<b>Bold</b>", "A1", &["Hello <world>", "Tom & \"Jerry\""])] };
    let html = render_worksheet_html(&draft, &all_on());
    assert!(html.contains("&lt;b&gt;Bold&lt;/b&gt;"));
    assert!(html.contains("Hello &lt;world&gt;"));
    assert!(html.contains("Tom &amp; &quot;Jerry&quot;"));
    assert!(!html.contains("<world>"));
    assert_eq!(count(&html, "h1.title b"), 0);
  }

  #[test]
  fn global_flags_hide_sections() {
    let mut a = article("A", "A1", &["x"]);
    a.exercises = Some(vec![Question { kind: QuestionType::Blank, prompt: "p".into(), ..Default::default() }]);
    let draft = WorksheetDraft { articles: vec![a] };

    let html = render_worksheet_html(&draft, &RenderOptions::default());
    assert_eq!(count(&html, "[data-section=\"exercises\"]"), 0);
    assert_eq!(count(&html, "[data-section=\"language-toolkit\"]"), 0);

    let html = render_worksheet_html(&draft, &all_on());
    assert_eq!(count(&html, "[data-section=\"exercises\"]"), 1);
    // No toolkit content yet: placeholder cards, no grammar block.
    assert_eq!(count(&html, ".toolkit-card"), 2);
    assert_eq!(count(&html, "[data-section=\"grammar-golden\"]"), 0);
  }

  #[test]
  fn per_article_toolkit_flags_hide_sub_sections() {
    let mut a = article("A", "A1", &["x"]);
    a.toolkit = Some(vec![ToolkitGroup { title: "Words".into(), items: vec![] }]);
    a.grammar_points = Some(vec![GrammarPoint { title: "g".into(), explanation: "e".into(), example: "x".into() }]);
    a.golden_sentences = Some(crate::seeds::default_golden_sentences());
    a.show_toolkit_vocab = Some(false);
    a.show_toolkit_golden = Some(false);
    let html = render_worksheet_html(&WorksheetDraft { articles: vec![a] }, &all_on());
    assert_eq!(count(&html, ".toolkit"), 0);
    assert_eq!(count(&html, ".grammar-column"), 1);
    assert_eq!(count(&html, ".golden-column"), 0);
  }

  #[test]
  fn cover_respects_shared_url_and_article_flag() {
    let mut hidden = article("B", "A1", &["y"]);
    hidden.show_cover_image = Some(false);
    let mut shown = article("A", "A1", &["x"]);
    shown.layout.image_position_y = Some(40.0);
    let draft = WorksheetDraft { articles: vec![shown, hidden] };
    let opts = RenderOptions { cover_image_url: Some("https://img.test/c.jpg".into()), ..all_on() };
    let html = render_worksheet_html(&draft, &opts);
    assert_eq!(count(&html, "img.hero-img"), 1);
    assert!(html.contains("object-position: center 40%;"));
    assert_eq!(count(&render_worksheet_html(&draft, &all_on()), "img"), 0);
  }

  #[test]
  fn layout_defaults_and_overrides() {
    let mut a = article("A", "A1", &["x"]);
    a.layout.page_padding = Some(12.5);
    a.layout.font_size = Some(16.0);
    let html = render_article(&a, 0, &all_on());
    assert!(html.contains("style=\"padding: 12.5mm;\""));
    assert!(html.contains("line-height: 1.2; font-size: 16px;"));
    assert!(html.contains("margin-bottom: 8px;"));
  }

  #[test]
  fn page_dimensions_follow_orientation() {
    let a4 = PageDimensions::new(PaperSize::A4, Orientation::Portrait);
    assert_eq!((a4.width_mm, a4.height_mm), (210, 297));
    let a4l = PageDimensions::new(PaperSize::A4, Orientation::Landscape);
    assert_eq!((a4l.width_mm, a4l.height_mm), (297, 210));
    assert!((a4.width_px() - 793.7).abs() < 0.1);
  }
}
