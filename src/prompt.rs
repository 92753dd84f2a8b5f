//! Instruction builder: (language, level, band, count) -> LLM instruction text.
//!
//! Pure and deterministic. The instruction encodes the pedagogy rules of each
//! level, an explicit per-band difficulty descriptor and the exact output
//! contract. The contract is only a request; `sanitize` is what enforces it.

use crate::config::Prompts;
use crate::domain::{Band, BatchSpec, Language, Level};
use crate::util::fill_template;

/// CEFR-style difficulty descriptor per level and band. Strictly increasing by band.
pub fn difficulty_descriptor(level: Level, band: Band) -> &'static str {
  const BASIC: [&str; 5] = ["very basic A1", "basic A1", "upper A1", "lower A2", "solid A2"];
  const MODERATE: [&str; 5] = ["lower A2", "solid A2", "lower B1", "solid B1", "upper B1"];
  const ADVANCED: [&str; 5] = ["lower B2", "solid B2", "upper B2", "lower C1", "advanced C1"];
  let i = (band.get() - 1) as usize;
  match level {
    Level::Basic => BASIC[i],
    Level::Moderate => MODERATE[i],
    Level::Advanced => ADVANCED[i],
  }
}

/// Topic focus per level and band. Each band gets a distinct cluster.
pub fn band_focus(level: Level, band: Band) -> &'static str {
  match (level, band.get()) {
    (Level::Basic, 1) => "greetings and polite words, numbers 1-20, basic colors",
    (Level::Basic, 2) => "family members, common food and drinks, everyday objects",
    (Level::Basic, 3) => "rooms of the house, clothing, weather, days of the week and months",
    (Level::Basic, 4) => "travel and transport, places in a town, directions, shopping words",
    (Level::Basic, _) => "jobs and workplaces, body and health, feelings, nature and animals",

    (Level::Moderate, 1) => "one-clause present-tense statements: introducing yourself, saying where you are from, what you like",
    (Level::Moderate, 2) => "simple questions and answers about daily routines, time and schedules",
    (Level::Moderate, 3) => "past-tense sentences and making plans with friends (invitations, accepting, declining)",
    (Level::Moderate, 4) => "polite requests, giving opinions and preferences, ordering at a restaurant or shop",
    (Level::Moderate, _) => "two-clause sentences with connectors (because, although, if), telling a short story, hypotheticals",

    (Level::Advanced, 1) => "describing a job, responsibilities and a typical working day",
    (Level::Advanced, 2) => "meetings, scheduling and formal email phrasing",
    (Level::Advanced, 3) => "presenting results and data, making proposals, negotiating terms",
    (Level::Advanced, 4) => "giving feedback, resolving conflict, persuading stakeholders",
    (Level::Advanced, _) => "company strategy, long-term vision, leadership and change management",
  }
}

/// Exact per-type counts for a batch, so the model gets numbers instead of percentages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeMix {
  pub multiple_choice: usize,
  pub type_answer: usize,
  pub fill_in_the_blanks: usize,
}

pub fn type_mix(level: Level, count: usize) -> TypeMix {
  let share = |pct: usize| (count * pct + 50) / 100;
  match level {
    Level::Basic => TypeMix { multiple_choice: count, type_answer: 0, fill_in_the_blanks: 0 },
    Level::Moderate => {
      let multiple_choice = share(50);
      let type_answer = share(20).min(count - multiple_choice);
      TypeMix { multiple_choice, type_answer, fill_in_the_blanks: count - multiple_choice - type_answer }
    }
    Level::Advanced => {
      let type_answer = share(30);
      let fill_in_the_blanks = share(30).min(count - type_answer);
      TypeMix { multiple_choice: count - type_answer - fill_in_the_blanks, type_answer, fill_in_the_blanks }
    }
  }
}

fn level_rules(level: Level, language: Language, count: usize) -> String {
  let mix = type_mix(level, count);
  match level {
    Level::Basic => {
      let en_to_target = count.div_ceil(2);
      format!(
        "LEVEL: Basic (vocabulary only).\n\
         - Every item tests a single word or a very short phrase; no full sentences.\n\
         - Every item MUST be \"multiple-choice\" with 4 or 5 options (the answer plus plausible distractors of the same category).\n\
         - At least {en_to_target} of the {count} items MUST be \"en-to-target\" (English word shown, pick the {language} word); the rest \"target-to-en\".\n\
         - Do not repeat a word across items."
      )
    }
    Level::Moderate => format!(
      "LEVEL: Moderate (short conversational sentences).\n\
       - Use short everyday sentences a learner would say or hear in conversation.\n\
       - Type mix: exactly {mc} \"multiple-choice\" (3 options each), {ta} \"type-answer\" (no options, learner types the translation), \
       {fb} \"fill-in-the-blanks\" (a {language} sentence with \"___\" and up to 4 options).\n\
       - Mix directions between \"en-to-target\" and \"target-to-en\"; fill-in-the-blanks items are \"target-to-target\" with questionLanguage \"target\".",
      mc = mix.multiple_choice,
      ta = mix.type_answer,
      fb = mix.fill_in_the_blanks,
    ),
    Level::Advanced => format!(
      "LEVEL: Advanced (professional, longer sentences).\n\
       - Use complete, natural sentences from professional and workplace contexts, with idiomatic phrasing.\n\
       - Type mix: exactly {ta} \"type-answer\" items that force free production of a full sentence, \
       {mc} \"multiple-choice\" (4 options, distractors differ in nuance or register), \
       {fb} \"fill-in-the-blanks\" (a {language} sentence with \"___\" testing a connector, tense or collocation, up to 4 options).\n\
       - Prefer \"target-to-en\" and \"en-to-target\" evenly; fill-in-the-blanks items are \"target-to-target\" with questionLanguage \"target\".",
      ta = mix.type_answer,
      mc = mix.multiple_choice,
      fb = mix.fill_in_the_blanks,
    ),
  }
}

fn escalation_rule(band: Band) -> String {
  match band.get() {
    1 => "This is the entry band of the level: keep items short and high-frequency. Do not use topics from other bands.".to_string(),
    n => format!(
      "Band {n} MUST be clearly harder than band {prev} (longer items, rarer vocabulary, more demanding grammar). Do not reuse topics from other bands.",
      prev = n - 1
    ),
  }
}

/// Build the complete instruction for one batch.
pub fn build_instruction(prompts: &Prompts, spec: &BatchSpec) -> String {
  let language = spec.language.name();
  let count = spec.count.to_string();
  let vars = [("language", language), ("count", count.as_str())];

  let mut sections = vec![
    fill_template(&prompts.role, &vars),
    level_rules(spec.level, spec.language, spec.count),
    format!(
      "BAND {band} of 5: difficulty \"{descriptor}\". Topic focus: {focus}.\n{escalation}",
      band = spec.band,
      descriptor = difficulty_descriptor(spec.level, spec.band),
      focus = band_focus(spec.level, spec.band),
      escalation = escalation_rule(spec.band),
    ),
  ];

  if spec.language.non_latin_script() {
    sections.push(format!(
      "Write {language} in its native script. Do not add romanization inside \"answer\" or \"options\"; \
       you may include it in \"explanation\"."
    ));
  }

  sections.push(fill_template(&prompts.output_contract, &vars));
  sections.join("\n\n")
}

#[cfg(test)]
mod tests {
  use super::*;

  fn spec(level: Level, band: u8, count: usize) -> BatchSpec {
    BatchSpec { language: Language::French, level, band: Band::new(band).unwrap(), count }
  }

  #[test]
  fn deterministic() {
    let p = Prompts::default();
    assert_eq!(build_instruction(&p, &spec(Level::Moderate, 3, 6)), build_instruction(&p, &spec(Level::Moderate, 3, 6)));
  }

  #[test]
  fn bands_differ_and_descriptors_are_distinct() {
    let p = Prompts::default();
    for level in Level::ALL {
      let texts: Vec<String> = Band::all().map(|b| build_instruction(&p, &spec(level, b.get(), 6))).collect();
      for i in 0..texts.len() {
        for j in (i + 1)..texts.len() {
          assert_ne!(texts[i], texts[j]);
        }
      }
      let descriptors: std::collections::HashSet<_> = Band::all().map(|b| difficulty_descriptor(level, b)).collect();
      assert_eq!(descriptors.len(), 5);
    }
    assert_eq!(difficulty_descriptor(Level::Basic, Band::new(1).unwrap()), "very basic A1");
    assert_eq!(difficulty_descriptor(Level::Advanced, Band::new(5).unwrap()), "advanced C1");
  }

  #[test]
  fn embeds_language_count_and_contract() {
    let text = build_instruction(&Prompts::default(), &spec(Level::Basic, 1, 6));
    assert!(text.contains("French"));
    assert!(text.contains("EXACTLY 6 questions"));
    assert!(text.contains("At least 3 of the 6"));
    for key in ["\"question\"", "\"answer\"", "\"options\"", "\"direction\"", "\"type\"", "\"questionLanguage\"", "\"explanation\""] {
      assert!(text.contains(key), "missing key {key}");
    }
    assert!(text.contains("code fences"));
    assert!(!text.contains("{language}"));
    assert!(!text.contains("{count}"));
  }

  #[test]
  fn type_mix_sums_to_count() {
    for count in 1..=20 {
      for level in Level::ALL {
        let m = type_mix(level, count);
        assert_eq!(m.multiple_choice + m.type_answer + m.fill_in_the_blanks, count);
      }
    }
    assert_eq!(type_mix(Level::Moderate, 6), TypeMix { multiple_choice: 3, type_answer: 1, fill_in_the_blanks: 2 });
    assert_eq!(type_mix(Level::Advanced, 10), TypeMix { multiple_choice: 4, type_answer: 3, fill_in_the_blanks: 3 });
  }

  #[test]
  fn non_latin_languages_get_script_rule() {
    let mut s = spec(Level::Basic, 2, 6);
    s.language = Language::Japanese;
    assert!(build_instruction(&Prompts::default(), &s).contains("native script"));
  }
}
