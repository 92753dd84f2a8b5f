//! Lenient answer comparison.
//!
//! Case-insensitive, punctuation-stripped, whitespace-collapsed equality. This
//! is a UX leniency, not a linguistic grader: accents and word order still count.

use crate::util::collapse_whitespace;

fn is_punctuation(c: char) -> bool {
  c.is_ascii_punctuation()
    || matches!(
      c,
      '¿' | '¡' | '«' | '»' | '‹' | '›' | '“' | '”' | '„' | '‘' | '’' | '‚' | '…' | '–' | '—' | '·'
        | '。' | '、' | '，' | '．' | '！' | '？' | '：' | '；' | '「' | '」' | '『' | '』' | '（' | '）' | '・' | '〜'
        | '؟' | '،' | '؛' | '।' | '॥'
    )
}

/// Canonical comparison form of an answer.
pub fn normalize_answer(s: &str) -> String {
  let stripped: String = s.chars().filter(|c| !is_punctuation(*c)).flat_map(char::to_lowercase).collect();
  collapse_whitespace(&stripped)
}

pub fn is_correct(submitted: &str, canonical: &str) -> bool {
  let expected = normalize_answer(canonical);
  !expected.is_empty() && normalize_answer(submitted) == expected
}
