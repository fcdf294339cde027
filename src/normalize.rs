//! Draft normalizer.
//!
//! Model output is only loosely shaped like a `WorksheetDraft`. Everything here
//! reads a `serde_json::Value` field by field: wrong-typed fields count as
//! absent, absent fields get a documented default, and nothing errors. The
//! result always has exactly the requested number of articles, each carrying
//! the level requested for its slot.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::domain::{
  CoverLayout, DraftArticle, GoldenSentence, GradeCategory, GrammarPoint, LayoutOverrides, Question,
  QuestionOption, QuestionType, ToolkitGroup, ToolkitItem, WorksheetDraft, WorksheetSettings,
};
use crate::error::DraftError;
use crate::seeds;
use crate::util::{extract_json_object, strip_code_fences};

const FALLBACK_LEVEL: &str = "A1";
const UNTITLED: &str = "Untitled";

/// What the normalized draft must satisfy.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizeOptions {
  pub article_count: usize,
  /// Requested CEFR level per article index.
  pub levels: Vec<String>,
  pub show_exercises: bool,
  pub show_toolkit: bool,
}

impl NormalizeOptions {
  pub fn from_settings(settings: &WorksheetSettings) -> Self {
    Self {
      article_count: settings.effective_article_count(),
      levels: settings.requested_levels(),
      show_exercises: settings.show_exercises,
      show_toolkit: settings.show_language_toolkit,
    }
  }

  pub fn target_count(&self) -> usize { self.article_count.max(1) }

  /// `levels[index]`, else `levels[0]`, else "A1". Always uppercase.
  pub fn level_for(&self, index: usize) -> String {
    requested_level(&self.levels, index)
  }
}

/// Level for an article slot from a per-index list. Blank entries fall through.
pub fn requested_level(levels: &[String], index: usize) -> String {
  let pick = |i: usize| levels.get(i).map(|l| l.trim()).filter(|l| !l.is_empty());
  pick(index)
    .or_else(|| pick(0))
    .unwrap_or(FALLBACK_LEVEL)
    .to_uppercase()
}

/// Find and parse the draft object inside raw model output.
///
/// Code fences are stripped first. A response that is valid JSON but not an
/// object is rejected. Otherwise the first balanced `{...}` is parsed.
pub fn parse_draft_text(text: &str) -> Result<Value, DraftError> {
  let cleaned = strip_code_fences(text);
  if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
    return if value.is_object() { Ok(value) } else { Err(DraftError::NotAnObject) };
  }
  let json = extract_json_object(cleaned).ok_or(DraftError::NoJsonObject)?;
  Ok(serde_json::from_str(json)?)
}

/// Parse model output and normalize it in one step.
pub fn draft_from_model_output(text: &str, opts: &NormalizeOptions) -> Result<WorksheetDraft, DraftError> {
  let raw = parse_draft_text(text)?;
  Ok(normalize_draft(&raw, opts))
}

#[instrument(level = "debug", target = "worksheet", skip(raw), fields(count = opts.article_count))]
pub fn normalize_draft(raw: &Value, opts: &NormalizeOptions) -> WorksheetDraft {
  let target = opts.target_count();
  let source: &[Value] = raw.get("articles").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);

  if source.len() > target {
    debug!(target: "worksheet", received = source.len(), target, "Truncating draft articles");
  } else if source.len() < target {
    debug!(target: "worksheet", received = source.len(), target, "Padding draft with placeholder articles");
  }

  let mut articles: Vec<DraftArticle> = source
    .iter()
    .take(target)
    .enumerate()
    .map(|(idx, value)| normalize_article(value, &opts.level_for(idx), opts))
    .collect();

  while articles.len() < target {
    let level = opts.level_for(articles.len());
    articles.push(normalize_article(&Value::Null, &level, opts));
  }

  WorksheetDraft { articles }
}

fn normalize_article(value: &Value, level: &str, opts: &NormalizeOptions) -> DraftArticle {
  let title = lenient_string(value.get("title"))
    .map(|t| t.trim().to_string())
    .filter(|t| !t.is_empty())
    .unwrap_or_else(|| UNTITLED.to_string());

  let mut article = DraftArticle {
    title,
    cefr_level: level.to_string(),
    grade_category: value.get("gradeCategory").and_then(from_value::<GradeCategory>),
    paragraphs: read_paragraphs(value.get("paragraphs")),
    cover_image_layout: value.get("coverImageLayout").and_then(from_value::<CoverLayout>),
    show_cover_image: value.get("showCoverImage").and_then(Value::as_bool),
    show_toolkit_vocab: value.get("showToolkitVocab").and_then(Value::as_bool),
    show_toolkit_grammar: value.get("showToolkitGrammar").and_then(Value::as_bool),
    show_toolkit_golden: value.get("showToolkitGolden").and_then(Value::as_bool),
    layout: read_layout(value),
    ..Default::default()
  };

  if opts.show_toolkit {
    let toolkit = read_array(value.get("toolkit"), read_group);
    let grammar = read_array(value.get("grammarPoints"), read_grammar_point);
    let golden = read_array(value.get("goldenSentences"), read_golden_sentence);
    article.toolkit = Some(non_empty_or(toolkit, || seeds::default_toolkit(level)));
    article.grammar_points = Some(non_empty_or(grammar, || seeds::default_grammar_points(level)));
    article.golden_sentences = Some(non_empty_or(golden, seeds::default_golden_sentences));
  }

  if opts.show_exercises {
    if let Some(list) = value.get("exercises").and_then(Value::as_array) {
      article.exercises = Some(list.iter().filter_map(read_question).collect());
    }
  }

  article
}

fn non_empty_or<T>(items: Vec<T>, default: impl FnOnce() -> Vec<T>) -> Vec<T> {
  if items.is_empty() { default() } else { items }
}

fn from_value<T: serde::de::DeserializeOwned>(v: &Value) -> Option<T> {
  serde_json::from_value(v.clone()).ok()
}

/// Strings pass through; numbers and booleans are stringified.
fn lenient_string(v: Option<&Value>) -> Option<String> {
  match v? {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

fn field(obj: &Value, keys: &[&str]) -> String {
  keys.iter().find_map(|k| lenient_string(obj.get(*k))).unwrap_or_default()
}

fn optional_field(obj: &Value, keys: &[&str]) -> Option<String> {
  keys
    .iter()
    .find_map(|k| lenient_string(obj.get(*k)))
    .filter(|s| !s.trim().is_empty())
}

fn read_array<T>(v: Option<&Value>, read: impl Fn(&Value) -> Option<T>) -> Vec<T> {
  v.and_then(Value::as_array).map(|list| list.iter().filter_map(read).collect()).unwrap_or_default()
}

fn read_paragraphs(v: Option<&Value>) -> Vec<String> {
  read_array(v, |p| lenient_string(Some(p)))
    .into_iter()
    .map(|p| p.trim().to_string())
    .filter(|p| !p.is_empty())
    .collect()
}

fn read_layout(article: &Value) -> LayoutOverrides {
  let num = |key: &str| article.get(key).and_then(Value::as_f64).filter(|n| n.is_finite());
  LayoutOverrides {
    line_height: num("lineHeight"),
    font_size: num("fontSize"),
    image_position_y: num("imagePositionY"),
    page_padding: num("pagePadding"),
    paragraph_spacing: num("paragraphSpacing"),
  }
}

fn read_group(v: &Value) -> Option<ToolkitGroup> {
  if !v.is_object() { return None; }
  Some(ToolkitGroup {
    title: field(v, &["title"]),
    items: read_array(v.get("items"), read_item),
  })
}

fn read_item(v: &Value) -> Option<ToolkitItem> {
  let mut item = match v {
    Value::String(word) => ToolkitItem { word: word.clone(), ..Default::default() },
    Value::Object(_) => ToolkitItem {
      word: field(v, &["word"]),
      phonetic: optional_field(v, &["phonetic"]),
      part_of_speech: optional_field(v, &["pos", "partOfSpeech"]),
      meaning: field(v, &["meaning"]),
    },
    _ => return None,
  };
  // Phrases never carry a phonetic transcription.
  if item.is_phrase() {
    item.phonetic = None;
  }
  Some(item)
}

fn read_grammar_point(v: &Value) -> Option<GrammarPoint> {
  if !v.is_object() { return None; }
  Some(GrammarPoint {
    title: field(v, &["title"]),
    explanation: field(v, &["explanation"]),
    example: field(v, &["example"]),
  })
}

fn read_golden_sentence(v: &Value) -> Option<GoldenSentence> {
  match v {
    Value::String(s) => Some(GoldenSentence { sentence: s.clone(), translation: String::new() }),
    Value::Object(_) => Some(GoldenSentence {
      sentence: field(v, &["sentence"]),
      translation: field(v, &["translation"]),
    }),
    _ => None,
  }
}

fn read_question(v: &Value) -> Option<Question> {
  if !v.is_object() { return None; }
  let kind = v.get("type").and_then(Value::as_str).map(QuestionType::parse_lenient).unwrap_or_default();
  let options = match kind {
    QuestionType::Mcq => v.get("options").and_then(Value::as_array).map(|opts| {
      opts
        .iter()
        .enumerate()
        .filter_map(|(i, o)| read_option(o, i))
        .collect::<Vec<_>>()
    }),
    _ => None,
  };
  Some(Question {
    kind,
    prompt: field(v, &["prompt", "question"]),
    options,
    answer: optional_field(v, &["answer"]),
  })
}

fn read_option(v: &Value, index: usize) -> Option<QuestionOption> {
  let default_label = || {
    let letter = (b'A' + (index % 26) as u8) as char;
    letter.to_string()
  };
  match v {
    Value::String(text) => Some(QuestionOption { label: default_label(), text: text.clone() }),
    Value::Object(_) => Some(QuestionOption {
      label: optional_field(v, &["label"]).unwrap_or_else(default_label),
      text: field(v, &["text"]),
    }),
    _ => None,
  }
}
