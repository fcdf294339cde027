//! Prompt text for the two generation paths.
//!
//! The draft path asks for a JSON object that the worksheet core normalizes
//! and renders. The HTML path asks the model for a whole printable document,
//! which the core then sanitizes against the same settings.

use std::fmt::Write as _;

use eslsheet::domain::{ArticleConfig, Orientation, WorksheetSettings};
use eslsheet::pagination::script_tag;
use eslsheet::util::fill_template;

use crate::config::Prompts;

pub const DEFAULT_DRAFT_SYSTEM: &str = r#"You generate structured worksheet content as JSON only. Do NOT output HTML.

Return a single JSON object with this shape:
{
  "articles": [{
    "title": string,
    "cefrLevel": "A1"|"A2"|"B1"|"B2"|"C1"|"C2",
    "paragraphs": string[],
    "toolkit"?: [{ "title": string, "items": [{ "word": string, "phonetic"?: string, "pos"?: string, "meaning": string }] }],
    "grammarPoints"?: [{ "title": string, "explanation": string, "example": string }],
    "goldenSentences"?: [{ "sentence": string, "translation": string }],
    "exercises"?: [{ "type": "mcq"|"blank"|"true_false"|"short_answer", "prompt": string, "options"?: [{ "label": string, "text": string }] }],
    "coverImageLayout"?: "banner"|"side"|"inline"
  }]
}

Hard rules:
1) articles.length must equal the requested article count exactly.
2) Each article.cefrLevel must match the level requested for that article.
3) Language Toolkit OFF: omit toolkit, grammarPoints and goldenSentences.
4) Language Toolkit ON: include all three with non-empty arrays (at least one vocabulary group, 2-3 grammar points, 2-3 golden sentences).
5) Exercises OFF: omit exercises. Exercises ON: at least 5 questions per article, same-type questions grouped together (mcq, then true_false, then blank, then short_answer).
6) No fields outside the shape above. Valid JSON, no markdown fences.

Vocabulary: single words carry an IPA phonetic, a part of speech and a Chinese meaning. Phrases of two or more words omit the phonetic.
Grammar points: explain structures actually used in the article; the example must be a sentence from the article that uses the structure.
Golden sentences: exact quotes from the article with a Chinese translation.
"#;

pub const DEFAULT_HTML_SYSTEM: &str = r#"You are an ESL reading-material and worksheet designer fluent in print HTML/CSS. Produce exactly one printable single-file HTML document that follows the user's configuration.

Hard rules:
1) Output exactly N articles for articleCount=N. An article may span several .page containers, all at the same level.
2) Every page shows its level badge in the top-right corner with the text "{CEFR} LEVEL" (for example "B1 LEVEL"). Never add levels nobody asked for.
3) Visibility switches are binding: Cover Image OMIT means no <img> and no empty placeholder; Exercises OMIT means no exercise section; Language Toolkit OMIT means no vocabulary, grammar or golden-sentence section.
4) When content conflicts with the configuration, the configuration wins.

Layout:
- Each page starts with a single horizontal Name / Date / Score row:
  <div class="meta-row">
    <div class="meta-item" data-key="name"><span class="meta-label">Name:</span><span class="meta-line"></span></div>
    <div class="meta-item" data-key="date"><span class="meta-label">Date:</span><span class="meta-line"></span></div>
    <div class="meta-item" data-key="score"><span class="meta-label">Score:</span><span class="meta-line"></span><span class="meta-suffix">/10</span></div>
  </div>
- Indent paragraphs with p { text-indent: 2em; } only.
- Short text stays on one balanced page; long text continues onto further pages. Never shrink fonts or cut content to fit.

Required structure:
- Each article is <section class="article" data-article-index="0..N-1">.
- Each article initially holds one <div class="page" data-article-index="X"> with a <div class="page-header"> and a <div class="page-body"> made of block-level children.

Output only the HTML document, no commentary and no markdown fences. End <body> with this script, verbatim:
{pagination_script}
"#;

/// HTML-path system prompt with the pagination script filled in.
pub fn html_system_prompt(prompts: &Prompts) -> String {
  fill_template(&prompts.html_system, &[("pagination_script", script_tag())])
}

fn on_off(flag: bool) -> &'static str {
  if flag { "ON" } else { "OFF" }
}

fn include_omit(flag: bool, what: &str) -> String {
  if flag { "INCLUDE".to_string() } else { format!("OMIT (do NOT generate any {what})") }
}

fn orientation_label(o: Orientation) -> &'static str {
  match o {
    Orientation::Portrait => "portrait",
    Orientation::Landscape => "landscape",
  }
}

fn article_line(index: usize, a: &ArticleConfig) -> String {
  let mut line = format!(
    "- Article {}: Grade {}, CEFR {}, Grammar {}",
    index + 1,
    a.grade,
    a.cefr_level.trim().to_uppercase(),
    a.grammar_difficulty
  );
  if let Some((min, max)) = a.word_count_range() {
    let _ = write!(line, ", Word Count: {min}-{max} words");
  }
  if a.enable_tense_control && !a.selected_tenses.is_empty() {
    let tenses: Vec<&str> = a.selected_tenses.iter().map(|t| t.label()).collect();
    let _ = write!(line, ", Tense: {}", tenses.join(", "));
  }
  line
}

/// One line per article slot in use. Missing slots get default settings.
fn article_lines(settings: &WorksheetSettings) -> String {
  let count = settings.effective_article_count();
  let fallback = ArticleConfig::default();
  (0..count)
    .map(|i| article_line(i, settings.articles.get(i).unwrap_or(&fallback)))
    .collect::<Vec<_>>()
    .join("\n")
}

pub fn draft_user_prompt(text: &str, settings: &WorksheetSettings) -> String {
  let cover = if settings.show_cover_image { "ON (choose layout banner/side/inline)" } else { "OFF" };
  let toolkit = if settings.show_language_toolkit {
    "ON (MUST include vocabulary, grammar points and golden sentences)"
  } else {
    "OFF"
  };
  format!(
    "Source Text:\n{text}\n\n\
     Requested Articles ({count}):\n{articles}\n\n\
     Visibility:\n\
     - Cover Image: {cover}\n\
     - Language Toolkit: {toolkit}\n\
     - Exercises: {exercises}\n\n\
     Quality:\n\
     - Keep paragraphs clear and coherent; do not truncate.\n\
     - Short text gets concise paragraphs; long text keeps logical paragraph breaks.\n\n\
     Now output JSON only.\n",
    text = text.trim(),
    count = settings.effective_article_count(),
    articles = article_lines(settings),
    exercises = on_off(settings.show_exercises),
  )
}

pub fn html_user_prompt(text: &str, settings: &WorksheetSettings) -> String {
  let count = settings.effective_article_count();
  let (w, h) = settings.paper_size.portrait_mm();
  let mut out = String::new();

  let _ = writeln!(out, "Original Text:\n{}\n", text.trim());
  let _ = writeln!(out, "Configuration:\n{}", article_lines(settings));
  if count == 1 {
    let level = settings
      .requested_levels()
      .first()
      .map(|l| l.to_uppercase())
      .unwrap_or_else(|| "A1".into());
    let _ = writeln!(out, "Generate ONE article at CEFR {level}. The badge must read \"{level} LEVEL\".");
  } else {
    let _ = writeln!(out, "Generate {count} distinct articles in the same document, each following its line above.");
  }
  if let Some(url) = settings.effective_cover_url() {
    let _ = writeln!(out, "- Cover Image URL: {url}");
  }

  let _ = writeln!(out, "\nVisibility (applies to every article and page):");
  let _ = writeln!(out, "- Cover Image: {}", include_omit(settings.show_cover_image, "cover image"));
  let _ = writeln!(out, "- Post-Reading Exercises: {}", include_omit(settings.show_exercises, "exercises"));
  let _ = writeln!(out, "- Language Toolkit: {}", include_omit(settings.show_language_toolkit, "toolkit"));

  let _ = writeln!(out, "\nLayout:");
  let _ = writeln!(out, "- Paper Size: {} ({w}mm x {h}mm)", settings.paper_size.label());
  let _ = writeln!(out, "- Orientation: {}", orientation_label(settings.orientation));
  let _ = writeln!(out, "- Number of Articles: {count}");
  match settings.effective_cover_url() {
    Some(url) => {
      let _ = writeln!(out, "- Place the cover inside the first page as <img src=\"{url}\" class=\"hero-img\" />, in a layout that does not push content onto extra pages.");
    }
    None => {
      let _ = writeln!(out, "- Do NOT include any <img> tags for cover images.");
    }
  }
  if settings.show_language_toolkit {
    let _ = writeln!(out, "- Language Toolkit: two-column grid; each item shows word, phonetic, part of speech and meaning.");
  }
  if settings.show_exercises {
    let _ = writeln!(out, "- Exercises: two-column grid filling the full width, grouped by type, numbered without gaps.");
  }
  let _ = writeln!(out, "\nPlease generate the HTML worksheet now.");
  out
}
