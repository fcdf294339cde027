//! Small string helpers shared by the core and the service.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// No nesting or conditionals.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Whitespace-separated word count.
pub fn count_words(text: &str) -> usize {
  text.split_whitespace().count()
}

/// Remove a leading ```lang fence line and a trailing ``` fence, if present.
pub fn strip_code_fences(text: &str) -> &str {
  let mut s = text.trim();
  if let Some(rest) = s.strip_prefix("```") {
    // Drop the info string ("json", "html", ...) up to the first newline.
    s = match rest.find('\n') {
      Some(nl) => &rest[nl + 1..],
      None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
  }
  if let Some(rest) = s.trim_end().strip_suffix("```") {
    s = rest;
  }
  s.trim()
}

/// Locate the first balanced `{...}` object in model output.
/// Braces inside JSON string literals are ignored. Returns None when no
/// balanced object exists.
pub fn extract_json_object(text: &str) -> Option<&str> {
  let s = strip_code_fences(text);
  let bytes = s.as_bytes();
  let start = s.find('{')?;

  let mut depth = 0usize;
  let mut in_string = false;
  let mut escaped = false;
  for (i, &b) in bytes.iter().enumerate().skip(start) {
    if in_string {
      match b {
        _ if escaped => escaped = false,
        b'\\' => escaped = true,
        b'"' => in_string = false,
        _ => {}
      }
      continue;
    }
    match b {
      b'"' => in_string = true,
      b'{' => depth += 1,
      b'}' => {
        depth -= 1;
        if depth == 0 {
          return Some(&s[start..=i]);
        }
      }
      _ => {}
    }
  }
  None
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}
