//! Built-in study content used when a draft arrives without toolkit sections.
//!
//! Defaults are tiered by CEFR level: {A1, A2}, {B1, B2}, and everything else.
//! Golden sentences do not depend on level.

use crate::domain::{GoldenSentence, GrammarPoint, ToolkitGroup, ToolkitItem};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelTier {
  Beginner,
  Intermediate,
  Advanced,
}

impl LevelTier {
  pub fn for_level(level: &str) -> Self {
    match level.trim().to_ascii_uppercase().as_str() {
      "A1" | "A2" => LevelTier::Beginner,
      "B1" | "B2" => LevelTier::Intermediate,
      _ => LevelTier::Advanced,
    }
  }
}

fn item(word: &str, phonetic: &str, pos: &str, meaning: &str) -> ToolkitItem {
  ToolkitItem {
    word: word.into(),
    phonetic: Some(phonetic.into()),
    part_of_speech: Some(pos.into()),
    meaning: meaning.into(),
  }
}

fn point(title: &str, explanation: &str, example: &str) -> GrammarPoint {
  GrammarPoint { title: title.into(), explanation: explanation.into(), example: example.into() }
}

pub fn default_toolkit(level: &str) -> Vec<ToolkitGroup> {
  let items = match LevelTier::for_level(level) {
    LevelTier::Beginner => vec![
      item("example", "/ɪɡˈzæmpl/", "n.", "例子；实例"),
      item("practice", "/ˈpræktɪs/", "v.", "练习；实践"),
      item("learn", "/lɜːrn/", "v.", "学习"),
    ],
    LevelTier::Intermediate => vec![
      item("significant", "/sɪɡˈnɪfɪkənt/", "adj.", "重要的；有意义的"),
      item("opportunity", "/ˌɑːpərˈtuːnəti/", "n.", "机会；时机"),
      item("contribute", "/kənˈtrɪbjuːt/", "v.", "贡献；有助于"),
    ],
    LevelTier::Advanced => vec![
      item("sophisticated", "/səˈfɪstɪkeɪtɪd/", "adj.", "复杂的；精密的"),
      item("controversial", "/ˌkɑːntrəˈvɜːrʃl/", "adj.", "有争议的"),
      item("implementation", "/ˌɪmplɪmenˈteɪʃn/", "n.", "实施；执行"),
    ],
  };
  vec![ToolkitGroup { title: "Key Vocabulary".into(), items }]
}

pub fn default_grammar_points(level: &str) -> Vec<GrammarPoint> {
  match LevelTier::for_level(level) {
    LevelTier::Beginner => vec![
      point("一般现在时", "表示经常性、习惯性的动作或状态", "I read English every day."),
      point("一般过去时", "表示过去发生的动作或状态", "She visited Beijing last year."),
    ],
    LevelTier::Intermediate => vec![
      point("现在完成时", "表示过去发生的动作对现在造成的影响", "I have finished my homework."),
      point("被动语态", "强调动作的承受者而非执行者", "The book was written by him."),
      point("条件句", "表示假设情况及其结果", "If it rains, we will stay at home."),
    ],
    LevelTier::Advanced => vec![
      point("虚拟语气", "表示与事实相反的假设或愿望", "If I were you, I would accept the offer."),
      point("倒装句", "将谓语的一部分或全部置于主语之前", "Never have I seen such a beautiful sunset."),
      point("独立主格", "表示伴随情况或原因", "Weather permitting, we will go hiking."),
    ],
  }
}

pub fn default_golden_sentences() -> Vec<GoldenSentence> {
  [
    ("The journey of a thousand miles begins with a single step.", "千里之行，始于足下。"),
    ("Knowledge is power.", "知识就是力量。"),
    ("Practice makes perfect.", "熟能生巧。"),
  ]
  .into_iter()
  .map(|(sentence, translation)| GoldenSentence { sentence: sentence.into(), translation: translation.into() })
  .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tiers_group_levels_in_pairs() {
    assert_eq!(LevelTier::for_level("a2"), LevelTier::Beginner);
    assert_eq!(LevelTier::for_level("B1"), LevelTier::Intermediate);
    assert_eq!(LevelTier::for_level("C2"), LevelTier::Advanced);
    assert_eq!(LevelTier::for_level("native"), LevelTier::Advanced);
  }

  #[test]
  fn every_tier_has_vocab_and_two_or_three_points() {
    for level in ["A1", "B2", "C1"] {
      let toolkit = default_toolkit(level);
      assert_eq!(toolkit.len(), 1);
      assert!(!toolkit[0].items.is_empty());
      assert!(toolkit[0].items.iter().all(|i| !i.is_phrase() && i.phonetic.is_some()));
      let n = default_grammar_points(level).len();
      assert!((2..=3).contains(&n), "{level} has {n} grammar points");
    }
    assert_eq!(default_golden_sentences().len(), 3);
  }

  #[test]
  fn tiers_differ_in_vocabulary() {
    assert_eq!(default_toolkit("A1")[0].items[0].word, "example");
    assert_eq!(default_toolkit("B2")[0].items[0].word, "significant");
    assert_eq!(default_toolkit("C1")[0].items[0].word, "sophisticated");
  }
}
