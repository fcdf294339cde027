//! Overflow-driven pagination.
//!
//! Page breaks depend on real measured box heights, so the authoritative pass
//! runs in the browser: [`script_tag`] is embedded at the end of every rendered
//! document. [`paginate`] is the same greedy algorithm run against a
//! caller-supplied box model, for hosts that can measure layout themselves.
//!
//! Per grouping the machine is
//! `Measuring -> Overflowing -> Splitting -> Measuring (next page) -> Done`:
//! while the current page overflows and its body holds more than one block,
//! trailing blocks move to the front of a fresh page until the current page
//! fits or only one block is left.

use std::collections::VecDeque;
use std::sync::LazyLock;

use tracing::{debug, warn};

use crate::util::fill_template;

/// New pages one grouping may grow before the loop stops.
pub const MAX_PAGES_PER_ARTICLE: usize = 60;
/// Block moves allowed while splitting one page.
pub const MAX_MOVES_PER_PAGE: usize = 240;
/// Measured overflow up to this many pixels still counts as fitting.
pub const OVERFLOW_TOLERANCE_PX: f64 = 1.0;

const SCRIPT_TEMPLATE: &str = r#"<script>
(function() {
  var MAX_PAGES = {max_pages};
  var MAX_MOVES = {max_moves};
  var TOLERANCE = {tolerance};
  function fits(page) {
    return page.scrollHeight <= page.clientHeight + TOLERANCE;
  }
  function createPageForArticle(articleIndex, templatePage) {
    var newPage = templatePage.cloneNode(true);
    newPage.setAttribute('data-article-index', String(articleIndex));
    var body = newPage.querySelector('.page-body');
    if (body) body.innerHTML = '';
    return newPage;
  }
  function paginateArticle(articleEl) {
    var articleIndex = parseInt(articleEl.getAttribute('data-article-index') || '0', 10) || 0;
    var firstPage = articleEl.querySelector('.page[data-article-index="' + articleIndex + '"]') || articleEl.querySelector('.page');
    if (!firstPage) return;
    var currentPage = firstPage;
    for (var iter = 0; iter < MAX_PAGES; iter++) {
      var body = currentPage.querySelector('.page-body');
      if (!body) break;
      if (fits(currentPage)) break;
      if (body.children.length <= 1) break;
      var nextPage = createPageForArticle(articleIndex, firstPage);
      var nextBody = nextPage.querySelector('.page-body');
      if (!nextBody) break;
      for (var moves = 0; moves < MAX_MOVES; moves++) {
        if (fits(currentPage)) break;
        var last = body.lastElementChild;
        if (!last) break;
        nextBody.insertBefore(last, nextBody.firstChild);
        if (body.children.length <= 1) break;
      }
      articleEl.appendChild(nextPage);
      currentPage = nextPage;
    }
  }
  function applyPrintCss() {
    var style = document.createElement('style');
    style.setAttribute('data-worksheet-print', 'true');
    style.textContent =
      '@page { margin: 0; }\n' +
      'html, body { margin: 0; padding: 0; }\n' +
      '.page { break-after: page; }\n' +
      '@media print { body { background: white; } .page { margin: 0; box-shadow: none; overflow: visible !important; } }\n';
    document.head.appendChild(style);
  }
  window.addEventListener('load', function() {
    applyPrintCss();
    var articles = Array.prototype.slice.call(document.querySelectorAll('.article'));
    articles.forEach(paginateArticle);
  });
})();
</script>"#;

static SCRIPT: LazyLock<String> = LazyLock::new(|| {
  fill_template(
    SCRIPT_TEMPLATE,
    &[
      ("max_pages", &MAX_PAGES_PER_ARTICLE.to_string()),
      ("max_moves", &MAX_MOVES_PER_PAGE.to_string()),
      ("tolerance", &OVERFLOW_TOLERANCE_PX.to_string()),
    ],
  )
});

/// The `<script>` element appended to every rendered worksheet.
pub fn script_tag() -> &'static str {
  SCRIPT.as_str()
}

/// Box model for host-side pagination.
pub trait PageMeasure<B> {
  /// Height of a page body holding `blocks`, in the same unit as `page_height`.
  fn content_height(&self, blocks: &[B]) -> f64;

  /// Visible height of one page.
  fn page_height(&self) -> f64;

  fn fits(&self, blocks: &[B]) -> bool {
    self.content_height(blocks) <= self.page_height() + OVERFLOW_TOLERANCE_PX
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageState {
  Measuring,
  Overflowing,
  Splitting,
  Done,
}

/// Pages for one grouping, in order.
#[derive(Clone, Debug, PartialEq)]
pub struct Paginated<B> {
  pub pages: Vec<Vec<B>>,
  /// True when a cap stopped the loop while the last page still overflowed.
  pub capped: bool,
}

/// Greedy split of one grouping's blocks into pages.
///
/// Never fails. A single block taller than a page stays alone on its page.
pub fn paginate<B, M: PageMeasure<B>>(blocks: Vec<B>, measure: &M) -> Paginated<B> {
  let mut pages: Vec<Vec<B>> = vec![blocks];
  let mut state = PageState::Measuring;
  let mut iterations = 0usize;
  let mut capped = false;

  loop {
    let current = pages.len() - 1;
    state = match state {
      PageState::Measuring if iterations >= MAX_PAGES_PER_ARTICLE => {
        capped = !measure.fits(&pages[current]);
        PageState::Done
      }
      PageState::Measuring if measure.fits(&pages[current]) => PageState::Done,
      PageState::Measuring => PageState::Overflowing,
      PageState::Overflowing if pages[current].len() <= 1 => PageState::Done,
      PageState::Overflowing => PageState::Splitting,
      PageState::Splitting => {
        iterations += 1;
        let next = split_trailing(&mut pages[current], measure);
        if next.moves_exhausted {
          capped = true;
        }
        pages.push(next.blocks.into());
        PageState::Measuring
      }
      PageState::Done => break,
    };
  }

  if capped {
    warn!(target: "worksheet", pages = pages.len(), "Pagination stopped at its cap with content still overflowing");
  } else {
    debug!(target: "worksheet", pages = pages.len(), "Paginated grouping");
  }
  Paginated { pages, capped }
}

struct Split<B> {
  blocks: VecDeque<B>,
  moves_exhausted: bool,
}

fn split_trailing<B, M: PageMeasure<B>>(page: &mut Vec<B>, measure: &M) -> Split<B> {
  let mut next = VecDeque::new();
  for _ in 0..MAX_MOVES_PER_PAGE {
    if measure.fits(page) {
      return Split { blocks: next, moves_exhausted: false };
    }
    let Some(last) = page.pop() else { break };
    next.push_front(last);
    if page.len() <= 1 {
      return Split { blocks: next, moves_exhausted: false };
    }
  }
  let moves_exhausted = !measure.fits(page) && page.len() > 1;
  Split { blocks: next, moves_exhausted }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Blocks are their own heights; a page holds `page` units.
  struct Stack {
    page: f64,
  }

  impl PageMeasure<f64> for Stack {
    fn content_height(&self, blocks: &[f64]) -> f64 { blocks.iter().sum() }
    fn page_height(&self) -> f64 { self.page }
  }

  #[test]
  fn content_that_fits_stays_on_one_page() {
    let out = paginate(vec![10.0, 20.0, 30.0], &Stack { page: 60.0 });
    assert_eq!(out.pages, vec![vec![10.0, 20.0, 30.0]]);
    assert!(!out.capped);
  }

  #[test]
  fn tolerance_absorbs_one_pixel() {
    let out = paginate(vec![30.0, 30.5], &Stack { page: 60.0 });
    assert_eq!(out.pages.len(), 1);
  }

  #[test]
  fn trailing_blocks_move_in_order() {
    let blocks: Vec<f64> = vec![40.0, 30.0, 20.0, 50.0, 10.0];
    let out = paginate(blocks.clone(), &Stack { page: 100.0 });
    assert_eq!(out.pages, vec![vec![40.0, 30.0, 20.0], vec![50.0, 10.0]]);
    let flat: Vec<f64> = out.pages.concat();
    assert_eq!(flat, blocks);
  }

  #[test]
  fn oversized_single_block_terminates() {
    let out = paginate(vec![500.0], &Stack { page: 100.0 });
    assert_eq!(out.pages.len(), 1);

    let out = paginate(vec![10.0, 500.0, 10.0], &Stack { page: 100.0 });
    assert_eq!(out.pages, vec![vec![10.0], vec![500.0], vec![10.0]]);
    assert!(!out.capped);
  }

  #[test]
  fn page_count_is_bounded_by_cap() {
    let out = paginate(vec![90.0; 500], &Stack { page: 100.0 });
    assert_eq!(out.pages.len(), MAX_PAGES_PER_ARTICLE + 1);
    assert!(out.capped);
    assert_eq!(out.pages.iter().map(Vec::len).sum::<usize>(), 500);
  }

  #[test]
  fn script_is_built_from_constants() {
    let s = script_tag();
    assert!(s.starts_with("<script>") && s.ends_with("</script>"));
    assert!(s.contains("var MAX_PAGES = 60;"));
    assert!(s.contains("var MAX_MOVES = 240;"));
    assert!(s.contains("var TOLERANCE = 1;"));
    assert!(!s.contains("{max_pages}"));
    assert!(s.contains("addEventListener('load'"));
  }
}
