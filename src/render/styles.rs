//! Embedded stylesheet for rendered worksheets.

use super::PageDimensions;

/// Canonical metadata row rules. The sanitizer injects the same block into
/// model-written documents.
pub const META_ROW_CSS: &str = concat!(
  ".meta-row{display:flex;gap:12px;align-items:flex-end;justify-content:space-between;flex-wrap:nowrap}",
  ".meta-item{flex:1;min-width:0;display:flex;gap:8px;align-items:flex-end;white-space:nowrap}",
  ".meta-item[data-key=\"score\"]{flex:0 0 160px;justify-content:flex-end}",
  ".meta-label{font-weight:800}",
  ".meta-line{flex:1;min-width:60px;border-bottom:2px solid rgba(15,23,42,.55);height:1.05em}",
  ".meta-suffix{font-weight:700;margin-left:6px}",
);

const BASE_CSS: &str = r#"
* { box-sizing: border-box; }
body { margin: 0; padding: 14px; background: #f3f4f6; color: #0f172a; font-family: ui-sans-serif, system-ui, -apple-system, Segoe UI, Roboto, Helvetica, Arial; }
.article { margin: 0 auto 18px auto; width: var(--page-w); }
.page { width: var(--page-w); height: var(--page-h); background: #fff; padding: var(--pad-y) var(--pad-x); overflow: hidden; position: relative; border-radius: 10px; box-shadow: 0 14px 40px rgba(15, 23, 42, 0.10); display: flex; flex-direction: column; }
.page + .page { margin-top: 18px; }
.page-header { flex: 0 0 auto; }
.page-body { flex: 1 1 auto; min-height: 0; display: flex; flex-direction: column; gap: 10px; }
.title { margin: 10px 0 6px 0; font-size: 26px; line-height: 1.1; font-weight: 900; letter-spacing: -0.02em; }
p { margin: 0 0 8px 0; line-height: 1.55; font-size: 14px; text-indent: 2em; }
.level-badge-inline { flex: 0 0 auto; padding: 4px 10px; border-radius: 999px; background: #1f7a3a; color: #fff; font-weight: 800; font-size: 11px; letter-spacing: 0.04em; white-space: nowrap; }
.cover { border-radius: 12px; overflow: hidden; background: #eef2ff; }
.cover-banner { height: 90px; }
.hero-img { width: 100%; height: 100%; object-fit: cover; object-position: center 20%; display: block; }
.section-title { margin: 2px 0 6px 0; font-size: 14px; font-weight: 900; letter-spacing: 0.01em; color: #334155; }
.toolkit { border-top: 1px solid #e2e8f0; padding-top: 8px; }
.toolkit-grid { display: grid; grid-template-columns: repeat(2, minmax(0, 1fr)); gap: 10px; }
.toolkit-card { border: 1px solid #e2e8f0; border-radius: 12px; padding: 10px; background: #f8fafc; }
.toolkit-card-title { font-size: 12px; font-weight: 900; color: #0f172a; margin-bottom: 6px; }
.toolkit-list { list-style: none; padding: 0; margin: 0; display: grid; gap: 6px; }
.toolkit-li { display: flex; justify-content: space-between; gap: 10px; font-size: 12px; color: #0f172a; }
.toolkit-left { font-weight: 700; }
.toolkit-right { color: #475569; text-align: right; }
.grammar-golden-section { border-top: 1px solid #e2e8f0; padding-top: 8px; }
.grammar-golden-grid { display: grid; grid-template-columns: repeat(2, minmax(0, 1fr)); gap: 10px; }
.grammar-column { border: 1px solid #e2e8f0; border-radius: 12px; padding: 10px; background: #faf5ff; }
.golden-column { border: 1px solid #e2e8f0; border-radius: 12px; padding: 10px; background: #fffbeb; }
.column-title { font-size: 12px; font-weight: 900; color: #0f172a; margin-bottom: 8px; text-align: center; border-bottom: 1px solid rgba(0,0,0,0.1); padding-bottom: 6px; }
.grammar-list, .golden-list { display: grid; gap: 8px; }
.grammar-item { border: 1px solid rgba(107, 33, 168, 0.2); border-radius: 8px; padding: 8px; background: rgba(255,255,255,0.5); }
.grammar-title { font-size: 11px; font-weight: 900; color: #6b21a8; margin-bottom: 3px; }
.grammar-explanation { font-size: 10px; color: #334155; margin-bottom: 3px; }
.grammar-example { font-size: 10px; color: #475569; font-style: italic; }
.golden-item { display: flex; gap: 8px; border: 1px solid rgba(245, 158, 11, 0.2); border-radius: 8px; padding: 8px; background: rgba(255,255,255,0.5); }
.golden-number { width: 20px; height: 20px; border-radius: 50%; background: #f59e0b; color: #fff; display: flex; align-items: center; justify-content: center; font-size: 10px; font-weight: 900; flex-shrink: 0; }
.golden-content { flex: 1; }
.golden-sentence { font-size: 11px; color: #0f172a; font-weight: 600; margin-bottom: 2px; }
.golden-translation { font-size: 10px; color: #475569; }
.exercises { border-top: 1px solid #e2e8f0; padding-top: 8px; }
.exercise-grid { display: grid; grid-template-columns: repeat(2, minmax(0, 1fr)); gap: 10px; align-items: start; }
.exercise-col { display: flex; flex-direction: column; gap: 10px; }
.q { border: 1px solid #e2e8f0; border-radius: 12px; padding: 10px; background: #fff; }
.q-title { display: flex; gap: 8px; align-items: baseline; font-size: 12px; }
.q-num { font-weight: 900; color: #0f172a; }
.q-text { color: #0f172a; }
.opts { margin-top: 8px; display: grid; gap: 6px; }
.opt { display: flex; gap: 8px; font-size: 12px; color: #334155; }
.opt-label { width: 18px; font-weight: 900; }
.tf { margin-top: 8px; display: flex; gap: 12px; align-items: center; font-size: 12px; color: #334155; }
.box { width: 12px; height: 12px; border: 1px solid #94a3b8; border-radius: 3px; display: inline-block; }
.line { margin-top: 10px; border-bottom: 2px solid rgba(15,23,42,.45); height: 14px; }
.lines { display: grid; gap: 8px; margin-top: 8px; }
"#;

/// Page variables, fragment rules, then print overrides.
pub fn stylesheet(dims: &PageDimensions) -> String {
  let (w, h) = (dims.width_mm, dims.height_mm);
  format!(
    concat!(
      ":root {{ --page-w: {w}mm; --page-h: {h}mm; --pad-x: 15mm; --pad-y: 12mm; }}\n",
      "{base}",
      "{meta}\n",
      "@page {{ size: {w}mm {h}mm; margin: 0; }}\n",
      "@media print {{\n",
      "  body {{ background: #fff; padding: 0; }}\n",
      "  .article {{ margin: 0; break-after: page; page-break-after: always; }}\n",
      "  .article:last-of-type {{ break-after: auto; page-break-after: auto; }}\n",
      "  .page {{ margin: 0; border-radius: 0; box-shadow: none; }}\n",
      "  .page + .page {{ margin-top: 0; }}\n",
      "}}\n",
    ),
    w = w,
    h = h,
    base = BASE_CSS,
    meta = META_ROW_CSS,
  )
}
