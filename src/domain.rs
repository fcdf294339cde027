//! Domain models: the structured worksheet draft, generation settings, and history records.

use serde::{Deserialize, Serialize};

/// Ordered list of articles produced by one "generate" action.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorksheetDraft {
  #[serde(default)]
  pub articles: Vec<DraftArticle>,
}

/// One leveled reading article plus its optional study sections.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftArticle {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub cefr_level: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub grade_category: Option<GradeCategory>,
  #[serde(default)]
  pub paragraphs: Vec<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub toolkit: Option<Vec<ToolkitGroup>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub grammar_points: Option<Vec<GrammarPoint>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub golden_sentences: Option<Vec<GoldenSentence>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub exercises: Option<Vec<Question>>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cover_image_layout: Option<CoverLayout>,

  // Absent means shown. Compare against Some(false), never truthiness.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub show_cover_image: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub show_toolkit_vocab: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub show_toolkit_grammar: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub show_toolkit_golden: Option<bool>,

  #[serde(flatten)]
  pub layout: LayoutOverrides,
}

/// Per-article layout knobs. Each falls back to a global default when absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOverrides {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub line_height: Option<f64>,
  /// Pixels.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub font_size: Option<f64>,
  /// Percent, vertical focus of the cover image.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image_position_y: Option<f64>,
  /// Millimetres.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub page_padding: Option<f64>,
  /// Pixels below each paragraph.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub paragraph_spacing: Option<f64>,
}

impl DraftArticle {
  pub fn shows_cover_image(&self) -> bool { self.show_cover_image != Some(false) }
  pub fn shows_vocab(&self) -> bool { self.show_toolkit_vocab != Some(false) }
  pub fn shows_grammar(&self) -> bool { self.show_toolkit_grammar != Some(false) }
  pub fn shows_golden(&self) -> bool { self.show_toolkit_golden != Some(false) }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolkitGroup {
  pub title: String,
  #[serde(default)]
  pub items: Vec<ToolkitItem>,
}

/// A vocabulary entry. Phrases (words containing a space) carry no phonetic.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolkitItem {
  pub word: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phonetic: Option<String>,
  #[serde(default, rename = "pos", alias = "partOfSpeech", skip_serializing_if = "Option::is_none")]
  pub part_of_speech: Option<String>,
  pub meaning: String,
}

impl ToolkitItem {
  pub fn is_phrase(&self) -> bool { self.word.trim().contains(' ') }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GrammarPoint {
  pub title: String,
  pub explanation: String,
  pub example: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GoldenSentence {
  pub sentence: String,
  pub translation: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
  Mcq,
  TrueFalse,
  Blank,
  #[default]
  ShortAnswer,
}

impl QuestionType {
  /// Lenient parse of AI-provided type names. Anything unknown is a short answer.
  pub fn parse_lenient(raw: &str) -> Self {
    match raw.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
      "mcq" | "multiple_choice" | "choice" => QuestionType::Mcq,
      "true_false" | "truefalse" | "tf" => QuestionType::TrueFalse,
      "blank" | "fill_blank" | "fill_in_the_blank" | "cloze" => QuestionType::Blank,
      _ => QuestionType::ShortAnswer,
    }
  }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
  pub label: String,
  pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Question {
  #[serde(rename = "type")]
  pub kind: QuestionType,
  pub prompt: String,
  /// Only meaningful for `QuestionType::Mcq`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<Vec<QuestionOption>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub answer: Option<String>,
}

/// Requested cover layout. Rendering always produces the banner variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverLayout {
  #[default]
  Banner,
  Side,
  Inline,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperSize {
  #[default]
  A4,
  A3,
}

impl PaperSize {
  /// Portrait width and height in millimetres.
  pub fn portrait_mm(self) -> (u32, u32) {
    match self {
      PaperSize::A4 => (210, 297),
      PaperSize::A3 => (297, 420),
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      PaperSize::A4 => "A4",
      PaperSize::A3 => "A3",
    }
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
  #[default]
  Portrait,
  Landscape,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeCategory {
  Elementary,
  #[default]
  Middle,
  High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tense {
  PresentSimple,
  PastSimple,
  FutureSimple,
  PresentContinuous,
  PastContinuous,
  PresentPerfect,
  PastPerfect,
  Mixed,
}

impl Tense {
  pub fn label(self) -> &'static str {
    match self {
      Tense::PresentSimple => "present simple",
      Tense::PastSimple => "past simple",
      Tense::FutureSimple => "future simple",
      Tense::PresentContinuous => "present continuous",
      Tense::PastContinuous => "past continuous",
      Tense::PresentPerfect => "present perfect",
      Tense::PastPerfect => "past perfect",
      Tense::Mixed => "mixed tenses",
    }
  }
}

/// Generation settings for one article slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleConfig {
  pub id: String,
  /// Detailed grade such as "middle-7" or "high-10".
  pub grade: String,
  #[serde(default)]
  pub grade_category: GradeCategory,
  pub cefr_level: String,
  pub grammar_difficulty: String,
  #[serde(default)]
  pub enable_word_count: bool,
  #[serde(default = "default_target_word_count")]
  pub target_word_count: u32,
  /// Percent, e.g. 20 means +/-20%.
  #[serde(default = "default_word_count_tolerance")]
  pub word_count_tolerance: u32,
  #[serde(default)]
  pub enable_tense_control: bool,
  #[serde(default)]
  pub selected_tenses: Vec<Tense>,
}

fn default_target_word_count() -> u32 { 300 }
fn default_word_count_tolerance() -> u32 { 20 }

impl Default for ArticleConfig {
  fn default() -> Self {
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      grade: "middle-7".into(),
      grade_category: GradeCategory::Middle,
      cefr_level: "A1".into(),
      grammar_difficulty: "basic".into(),
      enable_word_count: false,
      target_word_count: default_target_word_count(),
      word_count_tolerance: default_word_count_tolerance(),
      enable_tense_control: false,
      selected_tenses: vec![Tense::Mixed],
    }
  }
}

impl ArticleConfig {
  /// Inclusive word range implied by target and tolerance, when enabled.
  pub fn word_count_range(&self) -> Option<(u32, u32)> {
    if !self.enable_word_count { return None; }
    let target = self.target_word_count as u64;
    let tol = self.word_count_tolerance.min(100) as u64;
    // Integer rounding, half up.
    let low = (target * (100 - tol) + 50) / 100;
    let high = (target * (100 + tol) + 50) / 100;
    Some((low as u32, high as u32))
  }
}

/// Configuration for one worksheet: article slots, paper, visibility.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorksheetSettings {
  #[serde(default = "default_article_count")]
  pub article_count: usize,
  #[serde(default)]
  pub articles: Vec<ArticleConfig>,
  #[serde(default)]
  pub paper_size: PaperSize,
  #[serde(default)]
  pub orientation: Orientation,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cover_image_url: Option<String>,
  #[serde(default = "default_true")]
  pub show_cover_image: bool,
  #[serde(default = "default_true")]
  pub show_exercises: bool,
  #[serde(default = "default_true")]
  pub show_language_toolkit: bool,
}

fn default_article_count() -> usize { 1 }
fn default_true() -> bool { true }

impl Default for WorksheetSettings {
  fn default() -> Self {
    Self {
      article_count: 1,
      articles: vec![ArticleConfig::default()],
      paper_size: PaperSize::A4,
      orientation: Orientation::Portrait,
      cover_image_url: None,
      show_cover_image: true,
      show_exercises: true,
      show_language_toolkit: true,
    }
  }
}

impl WorksheetSettings {
  pub fn effective_article_count(&self) -> usize { self.article_count.max(1) }

  /// Article slots actually in use (at most `article_count`).
  pub fn effective_articles(&self) -> &[ArticleConfig] {
    let n = self.effective_article_count().min(self.articles.len());
    &self.articles[..n]
  }

  /// Requested CEFR levels by article index, skipping blanks.
  pub fn requested_levels(&self) -> Vec<String> {
    self
      .effective_articles()
      .iter()
      .map(|a| a.cefr_level.trim().to_string())
      .filter(|l| !l.is_empty())
      .collect()
  }

  /// Cover URL to embed, honouring the global toggle.
  pub fn effective_cover_url(&self) -> Option<&str> {
    if !self.show_cover_image { return None; }
    self.cover_image_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
  }
}

/// Immutable record of one rendered worksheet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
  pub id: String,
  /// Milliseconds since the Unix epoch.
  pub timestamp: u64,
  pub html_content: String,
  pub original_text: String,
  pub settings: HistorySettings,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<HistoryMetadata>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySettings {
  pub paper_size: PaperSize,
  pub orientation: Orientation,
  pub article_count: usize,
  pub articles: Vec<ArticleConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMetadata {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub grade: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cefr_level: Option<String>,
  #[serde(default)]
  pub article_summaries: Vec<ArticleSummary>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
  pub title: String,
  pub cefr_level: String,
  pub word_count: usize,
}

impl HistoryItem {
  /// Snapshot a rendered worksheet. Metadata is derived from the draft when one exists.
  pub fn new(
    html_content: String,
    original_text: String,
    settings: &WorksheetSettings,
    draft: Option<&WorksheetDraft>,
    timestamp: u64,
  ) -> Self {
    let metadata = draft.map(|d| {
      let summaries: Vec<ArticleSummary> = d
        .articles
        .iter()
        .map(|a| ArticleSummary {
          title: a.title.clone(),
          cefr_level: a.cefr_level.clone(),
          word_count: a.paragraphs.iter().map(|p| crate::util::count_words(p)).sum(),
        })
        .collect();
      HistoryMetadata {
        title: d.articles.first().map(|a| a.title.clone()),
        grade: settings.effective_articles().first().map(|a| a.grade.clone()),
        cefr_level: d.articles.first().map(|a| a.cefr_level.clone()),
        article_summaries: summaries,
      }
    });

    Self {
      id: uuid::Uuid::new_v4().to_string(),
      timestamp,
      html_content,
      original_text,
      settings: HistorySettings {
        paper_size: settings.paper_size,
        orientation: settings.orientation,
        article_count: settings.effective_article_count(),
        articles: settings.effective_articles().to_vec(),
      },
      metadata,
    }
  }
}
