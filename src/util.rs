//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// True for precomposed Hangul syllables (가..=힣).
pub fn is_hangul_syllable(ch: char) -> bool {
  ('\u{AC00}'..='\u{D7A3}').contains(&ch)
}

pub fn contains_hangul(s: &str) -> bool {
  s.chars().any(is_hangul_syllable)
}

/// Unwrap a model reply from a ```json fence or a bare ``` fence.
/// Text without a fence is returned trimmed.
pub fn strip_code_fence(text: &str) -> &str {
  let text = text.trim();
  let inner = if let Some((_, rest)) = text.split_once("```json") {
    rest
  } else if let Some((_, rest)) = text.split_once("```") {
    rest
  } else {
    return text;
  };
  inner.split("```").next().unwrap_or(inner).trim()
}

/// Log-safe truncation for large strings.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fence_variants_are_stripped() {
    assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fence("here:\n```\n{\"a\":1}\n```\nbye"), "{\"a\":1}");
    assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    // unterminated fence keeps the tail
    assert_eq!(strip_code_fence("```json {\"a\":1}"), "{\"a\":1}");
  }

  #[test]
  fn hangul_detection_ignores_jamo_and_cjk() {
    assert!(contains_hangul("A+B 문제"));
    assert!(!contains_hangul("A+B"));
    assert!(!contains_hangul("ㄱㄴ"));
    assert!(!contains_hangul("汉字"));
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    let s = "가나다라";
    let t = trunc_for_log(s, 4);
    assert!(t.starts_with("가"));
    assert!(t.contains("12 bytes total"));
    assert_eq!(trunc_for_log("abc", 10), "abc");
  }

  #[test]
  fn template_fills_every_occurrence() {
    assert_eq!(fill_template("{a}-{b}-{a}", &[("a", "1"), ("b", "2")]), "1-2-1");
  }
}
