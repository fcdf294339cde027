//! HTML fragments for one article.
//!
//! Every piece of user or model supplied text goes through [`esc`] before it
//! is embedded. Class names and `data-*` markers are shared with the
//! pagination script and the sanitizer, so they are fixed.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{GoldenSentence, GrammarPoint, Question, QuestionType, ToolkitGroup, ToolkitItem};

use super::ArticleLayout;

pub const MAX_TOOLKIT_GROUPS: usize = 6;
pub const MAX_TOOLKIT_ITEMS: usize = 12;
pub const MAX_MCQ_OPTIONS: usize = 4;

const NBSP: &str = "&nbsp;";

static PHRASE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)\s*phrase\s*").expect("PHRASE_RE: hardcoded regex is valid"));

/// Escape `& < > " '` for text and attribute positions alike.
pub fn esc(s: &str) -> Cow<'_, str> {
  html_escape::encode_quoted_attribute(s)
}

/// Uppercased level, "A1" when blank.
pub fn display_level(level: &str) -> String {
  let l = level.trim();
  if l.is_empty() { "A1".to_string() } else { l.to_uppercase() }
}

/// Name / Date / Score(/10) blanks plus the inline level badge, on one row.
pub fn meta_row(level: &str) -> String {
  format!(
    concat!(
      r#"<div class="meta-row">"#,
      r#"<div class="meta-item" data-key="name"><span class="meta-label">Name:</span><span class="meta-line"></span></div>"#,
      r#"<div class="meta-item" data-key="date"><span class="meta-label">Date:</span><span class="meta-line"></span></div>"#,
      r#"<div class="meta-item" data-key="score"><span class="meta-label">Score:</span><span class="meta-line"></span><span class="meta-suffix">/10</span></div>"#,
      r#"<div class="level-badge-inline" data-level-badge="true">{} LEVEL</div>"#,
      r#"</div>"#,
    ),
    esc(&display_level(level))
  )
}

/// Full-width banner. Other requested layouts render the same way.
pub fn cover(url: &str, image_position_y: f64) -> String {
  format!(
    r#"<div class="cover cover-banner"><img class="hero-img" alt="Cover" src="{}" style="object-position: center {}%;" /></div>"#,
    esc(url),
    image_position_y
  )
}

pub fn reading(paragraphs: &[String], layout: &ArticleLayout) -> String {
  let style = format!(
    "margin-bottom: {}px; line-height: {}; font-size: {}px;",
    layout.paragraph_spacing, layout.line_height, layout.font_size
  );
  let body: String = paragraphs
    .iter()
    .map(|p| p.trim())
    .filter(|p| !p.is_empty())
    .map(|p| format!(r#"<p style="{style}">{}</p>"#, esc(p)))
    .collect();
  let body = if body.is_empty() {
    format!(r#"<p style="margin-bottom: {}px;">{NBSP}</p>"#, layout.paragraph_spacing)
  } else {
    body
  };
  format!(
    r#"<section class="reading" data-section="reading" style="line-height: {}; font-size: {}px;">{body}</section>"#,
    layout.line_height, layout.font_size
  )
}

fn blank_li() -> String {
  format!(r#"<li class="toolkit-li"><span class="toolkit-left">{NBSP}</span><span class="toolkit-right">{NBSP}</span></li>"#)
}

fn toolkit_card(title: &str, lis: &str) -> String {
  format!(
    r#"<div class="toolkit-card"><div class="toolkit-card-title">{}</div><ul class="toolkit-list">{lis}</ul></div>"#,
    esc(title)
  )
}

/// `word [phonetic] [pos]`, with "phrase" dropped from the part of speech.
/// Phrases never show a phonetic.
pub fn toolkit_display_word(item: &ToolkitItem) -> String {
  let mut out = esc(item.word.trim()).into_owned();
  if let Some(ph) = item.phonetic.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
    if !item.is_phrase() {
      out.push(' ');
      out.push_str(&esc(ph));
    }
  }
  if let Some(pos) = item.part_of_speech.as_deref() {
    let pos = PHRASE_RE.replace_all(pos, "");
    let pos = pos.trim();
    if !pos.is_empty() {
      out.push(' ');
      out.push_str(&esc(pos));
    }
  }
  out.trim_start().to_string()
}

fn toolkit_li(item: &ToolkitItem) -> String {
  let left = toolkit_display_word(item);
  let right = esc(item.meaning.trim());
  format!(
    r#"<li class="toolkit-li"><span class="toolkit-left">{}</span><span class="toolkit-right">{}</span></li>"#,
    if left.is_empty() { NBSP } else { left.as_str() },
    if right.is_empty() { NBSP } else { &*right },
  )
}

pub fn toolkit(groups: &[ToolkitGroup]) -> String {
  let cards: String = if groups.is_empty() {
    // Two empty cards keep the grid shape for hand-filled worksheets.
    let lis = blank_li().repeat(3);
    toolkit_card("Key Items", &lis) + &toolkit_card("Key Phrases", &lis)
  } else {
    groups
      .iter()
      .take(MAX_TOOLKIT_GROUPS)
      .map(|g| {
        let lis: String = if g.items.is_empty() {
          blank_li()
        } else {
          g.items.iter().take(MAX_TOOLKIT_ITEMS).map(toolkit_li).collect()
        };
        let title = if g.title.trim().is_empty() { "Toolkit" } else { g.title.as_str() };
        toolkit_card(title, &lis)
      })
      .collect()
  };
  format!(
    r#"<section class="toolkit" data-section="language-toolkit"><div class="toolkit-grid">{cards}</div></section>"#
  )
}

/// Empty string when both lists are empty; a column is dropped when its own
/// list is empty.
pub fn grammar_and_golden(points: &[GrammarPoint], sentences: &[GoldenSentence]) -> String {
  if points.is_empty() && sentences.is_empty() {
    return String::new();
  }

  let mut columns = String::new();
  if !points.is_empty() {
    let items: String = points
      .iter()
      .enumerate()
      .map(|(i, p)| {
        format!(
          concat!(
            r#"<div class="grammar-item">"#,
            r#"<div class="grammar-title">{}. {}</div>"#,
            r#"<div class="grammar-explanation">{}</div>"#,
            r#"<div class="grammar-example">{}</div>"#,
            r#"</div>"#,
          ),
          i + 1,
          esc(&p.title),
          esc(&p.explanation),
          esc(&p.example)
        )
      })
      .collect();
    columns.push_str(&format!(
      r#"<div class="grammar-column"><div class="column-title">Grammar Points</div><div class="grammar-list">{items}</div></div>"#
    ));
  }
  if !sentences.is_empty() {
    let items: String = sentences
      .iter()
      .enumerate()
      .map(|(i, s)| {
        format!(
          concat!(
            r#"<div class="golden-item">"#,
            r#"<div class="golden-number">{}</div>"#,
            r#"<div class="golden-content">"#,
            r#"<div class="golden-sentence">{}</div>"#,
            r#"<div class="golden-translation">{}</div>"#,
            r#"</div></div>"#,
          ),
          i + 1,
          esc(&s.sentence),
          esc(&s.translation)
        )
      })
      .collect();
    columns.push_str(&format!(
      r#"<div class="golden-column"><div class="column-title">Golden Sentences</div><div class="golden-list">{items}</div></div>"#
    ));
  }

  format!(
    r#"<section class="grammar-golden-section" data-section="grammar-golden"><div class="grammar-golden-grid">{columns}</div></section>"#
  )
}

fn question_title(num: usize, prompt: &str) -> String {
  let text = esc(prompt.trim());
  format!(
    r#"<div class="q-title"><span class="q-num">Q{num}.</span><span class="q-text">{}</span></div>"#,
    if text.is_empty() { NBSP } else { &*text }
  )
}

pub fn question(q: &Question, num: usize) -> String {
  let answer_area = match q.kind {
    QuestionType::Mcq => {
      let opts: String = q
        .options
        .iter()
        .flatten()
        .take(MAX_MCQ_OPTIONS)
        .map(|o| {
          format!(
            r#"<div class="opt"><span class="opt-label">{}</span><span class="opt-text">{}</span></div>"#,
            esc(&o.label),
            esc(&o.text)
          )
        })
        .collect();
      format!(r#"<div class="opts">{opts}</div>"#)
    }
    QuestionType::TrueFalse => r#"<div class="tf"><span class="box"></span> True <span class="box"></span> False</div>"#.to_string(),
    QuestionType::Blank => r#"<div class="line"></div>"#.to_string(),
    QuestionType::ShortAnswer => r#"<div class="lines"><div class="line"></div><div class="line"></div></div>"#.to_string(),
  };
  format!(r#"<div class="q">{}{answer_area}</div>"#, question_title(num, &q.prompt))
}

/// Two columns: even indices left, odd indices right, order kept.
pub fn exercises(questions: &[Question]) -> String {
  let mut left = String::new();
  let mut right = String::new();
  if questions.is_empty() {
    left.push_str(&format!(r#"<div class="q">{}<div class="line"></div></div>"#, question_title(1, "")));
  }
  for (idx, q) in questions.iter().enumerate() {
    let col = if idx % 2 == 0 { &mut left } else { &mut right };
    col.push_str(&question(q, idx + 1));
  }
  format!(
    concat!(
      r#"<section class="exercises" data-section="exercises">"#,
      r#"<h3 class="section-title">Exercises</h3>"#,
      r#"<div class="exercise-grid">"#,
      r#"<div class="exercise-col">{}</div>"#,
      r#"<div class="exercise-col">{}</div>"#,
      r#"</div></section>"#,
    ),
    left, right
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::QuestionOption;
  use kuchiki::traits::TendrilSink;

  fn q(kind: QuestionType, prompt: &str) -> Question {
    Question { kind, prompt: prompt.into(), ..Default::default() }
  }

  fn texts(html: &str, selector: &str) -> Vec<String> {
    let doc = kuchiki::parse_html().one(html);
    doc.select(selector).unwrap().map(|n| n.text_contents()).collect()
  }

  #[test]
  fn escapes_all_five_characters() {
    let out = esc(r#"a<b>&"c"'d'"#);
    assert!(out.starts_with("a&lt;b&gt;&amp;&quot;c&quot;"));
    assert!(!out.contains(['<', '>', '"', '\'']));
    assert_eq!(out.matches('&').count(), 7);
  }

  #[test]
  fn paragraph_text_is_escaped() {
    let html = reading(&["Hello <world>".into()], &ArticleLayout::default());
    assert!(html.contains("Hello &lt;world&gt;"));
    assert!(!html.contains("<world>"));
  }

  #[test]
  fn reading_uses_layout_and_placeholder() {
    let layout = ArticleLayout { line_height: 1.6, font_size: 15.0, paragraph_spacing: 10.0, ..Default::default() };
    let html = reading(&["One".into(), "  ".into()], &layout);
    assert_eq!(html.matches("<p ").count(), 1);
    assert!(html.contains(r#"<p style="margin-bottom: 10px; line-height: 1.6; font-size: 15px;">One</p>"#));
    let empty = reading(&[], &ArticleLayout::default());
    assert!(empty.contains(r#"<p style="margin-bottom: 8px;">&nbsp;</p>"#));
  }

  #[test]
  fn meta_row_has_three_items_and_badge() {
    let html = meta_row(" b1 ");
    assert_eq!(texts(&html, ".meta-item .meta-label"), ["Name:", "Date:", "Score:"]);
    assert_eq!(texts(&html, ".meta-suffix"), ["/10"]);
    assert_eq!(texts(&html, "[data-level-badge=\"true\"]"), ["B1 LEVEL"]);
  }

  #[test]
  fn cover_is_banner_with_escaped_src() {
    let html = cover("https://x.test/a.png?w=1&h=2", 35.0);
    assert!(html.contains("cover-banner"));
    assert!(html.contains("a.png?w=1&amp;h=2"));
    assert!(html.contains("object-position: center 35%;"));
  }

  #[test]
  fn empty_toolkit_renders_two_placeholder_cards() {
    let html = toolkit(&[]);
    assert_eq!(texts(&html, ".toolkit-card-title"), ["Key Items", "Key Phrases"]);
    assert_eq!(html.matches(r#"class="toolkit-li""#).count(), 6);
  }

  #[test]
  fn toolkit_caps_groups_and_items() {
    let item = ToolkitItem { word: "w".into(), meaning: "m".into(), ..Default::default() };
    let group = ToolkitGroup { title: "G".into(), items: vec![item; 20] };
    let html = toolkit(&vec![group; 9]);
    assert_eq!(html.matches(r#"class="toolkit-card""#).count(), MAX_TOOLKIT_GROUPS);
    assert_eq!(html.matches(r#"class="toolkit-li""#).count(), MAX_TOOLKIT_GROUPS * MAX_TOOLKIT_ITEMS);
  }

  #[test]
  fn display_word_orders_parts_and_drops_phrase() {
    let word = ToolkitItem {
      word: "legacy".into(),
      phonetic: Some("/ˈleɡəsi/".into()),
      part_of_speech: Some("n.".into()),
      meaning: "遗产".into(),
    };
    assert_eq!(toolkit_display_word(&word), "legacy /ˈleɡəsi/ n.");

    let phrase = ToolkitItem {
      word: "ski resort".into(),
      phonetic: Some("/x/".into()),
      part_of_speech: Some("n. Phrase".into()),
      meaning: "滑雪场".into(),
    };
    assert_eq!(toolkit_display_word(&phrase), "ski resort n.");
  }

  #[test]
  fn grammar_golden_columns_are_independent() {
    assert_eq!(grammar_and_golden(&[], &[]), "");
    let point = GrammarPoint { title: "Past".into(), explanation: "e".into(), example: "x".into() };
    let only_grammar = grammar_and_golden(&[point], &[]);
    assert!(only_grammar.contains("grammar-column"));
    assert!(!only_grammar.contains("golden-column"));
    assert_eq!(texts(&only_grammar, ".grammar-title"), ["1. Past"]);

    let s = GoldenSentence { sentence: "A & B".into(), translation: "甲".into() };
    let only_golden = grammar_and_golden(&[], &[s]);
    assert!(only_golden.contains("A &amp; B"));
    assert!(!only_golden.contains("grammar-column"));
  }

  #[test]
  fn five_questions_alternate_columns() {
    let qs: Vec<Question> = (1..=5).map(|i| q(QuestionType::Blank, &format!("P{i}"))).collect();
    let html = exercises(&qs);
    let doc = kuchiki::parse_html().one(html);
    let cols: Vec<Vec<String>> = doc
      .select(".exercise-col")
      .unwrap()
      .map(|col| col.as_node().select(".q-text").unwrap().map(|n| n.text_contents()).collect())
      .collect();
    assert_eq!(cols, vec![vec!["P1", "P3", "P5"], vec!["P2", "P4"]]);
  }

  #[test]
  fn no_questions_gives_left_placeholder() {
    let html = exercises(&[]);
    assert_eq!(texts(&html, ".q-num"), ["Q1."]);
    let doc = kuchiki::parse_html().one(html);
    let cols: Vec<_> = doc.select(".exercise-col").unwrap().collect();
    assert_eq!(cols[1].as_node().children().count(), 0);
  }

  #[test]
  fn question_templates_per_type() {
    let mut mcq = q(QuestionType::Mcq, "Pick");
    mcq.options = Some(
      ["A", "B", "C", "D", "E"]
        .iter()
        .map(|l| QuestionOption { label: l.to_string(), text: format!("opt {l}") })
        .collect(),
    );
    assert_eq!(question(&mcq, 1).matches(r#"class="opt""#).count(), MAX_MCQ_OPTIONS);
    assert_eq!(question(&q(QuestionType::TrueFalse, "t"), 2).matches(r#"class="box""#).count(), 2);
    assert_eq!(question(&q(QuestionType::Blank, "b"), 3).matches(r#"class="line""#).count(), 1);
    assert_eq!(question(&q(QuestionType::ShortAnswer, "s"), 4).matches(r#"class="line""#).count(), 2);
  }
}
