//! Derived legal indicators computed from a process's movement history.
//!
//! Classification is table driven: a [`Vocabulary`] maps terms to a
//! [`MovementClass`], and the [`Extractor`] compiles it into one matcher per
//! class. Matching ignores case and accents, so `EXECUÇÃO`, `execução` and
//! `execucao` are the same term.

use std::collections::BTreeMap;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::ConfigurationError;
use crate::types::{DerivedIndicators, Movement};

/// What a matching movement says about the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementClass {
    /// A procedural deadline or a summons to act.
    Deadline,
    /// A ruling of some kind.
    Decision,
    /// Enforcement of a judgment.
    Execution,
}

impl MovementClass {
    pub const ALL: [Self; 3] = [Self::Deadline, Self::Decision, Self::Execution];
}

/// Term table, as read from YAML.
///
/// ```yaml
/// deadline: [prazo, intimação]
/// decision: [sentença, decisão]
/// execution: [penhora, execução]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub deadline: Vec<String>,
    pub decision: Vec<String>,
    pub execution: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        fn terms(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| (*s).to_string()).collect()
        }

        Self {
            deadline: terms(&[
                "prazo",
                "intimação",
                "manifestação",
                "apresentar defesa",
                "apresentar",
                "contestação",
                "contrarrazões",
                "embargos",
                "notificação",
                "resposta",
                "recurso",
                "juntada de petição",
            ]),
            decision: terms(&[
                "sentença",
                "acórdão",
                "decisão",
                "despacho",
                "homologação",
                "julgado",
                "julgamento",
                "proferida",
                "deferida",
                "indeferida",
            ]),
            execution: terms(&[
                "execução",
                "cumprimento",
                "penhora",
                "bloqueio",
                "exequente",
                "executado",
                "expedição de alvará",
                "leilão",
                "arrematação",
            ]),
        }
    }
}

impl Vocabulary {
    /// Load a vocabulary from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigurationError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::InvalidVocabulary(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parse a vocabulary from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigurationError> {
        serde_yaml_ng::from_str(text)
            .map_err(|e| ConfigurationError::InvalidVocabulary(e.to_string()))
    }

    /// Terms for one class.
    #[must_use]
    pub fn terms(&self, class: MovementClass) -> &[String] {
        match class {
            MovementClass::Deadline => &self.deadline,
            MovementClass::Decision => &self.decision,
            MovementClass::Execution => &self.execution,
        }
    }
}

/// Lower-case and strip diacritics.
///
/// # Examples
/// ```
/// use datajud_harvester::indicators::fold;
///
/// assert_eq!(fold("Expedição de ALVARÁ"), "expedicao de alvara");
/// ```
#[must_use]
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Compiled vocabulary. Cheap to share, holds no mutable state.
#[derive(Debug, Clone)]
pub struct Extractor {
    matchers: BTreeMap<MovementClass, Regex>,
}

impl Default for Extractor {
    fn default() -> Self {
        #[allow(clippy::expect_used)] // Built-in vocabulary is non-empty and escaped
        Self::new(&Vocabulary::default()).expect("built-in vocabulary compiles")
    }
}

impl Extractor {
    /// Compile a vocabulary. Every class needs at least one non-blank term.
    pub fn new(vocabulary: &Vocabulary) -> Result<Self, ConfigurationError> {
        let mut matchers = BTreeMap::new();

        for class in MovementClass::ALL {
            let terms: Vec<String> = vocabulary
                .terms(class)
                .iter()
                .map(|t| fold(t.trim()))
                .filter(|t| !t.is_empty())
                .map(|t| regex::escape(&t))
                .collect();

            if terms.is_empty() {
                return Err(ConfigurationError::InvalidVocabulary(format!(
                    "no terms for class {class:?}"
                )));
            }

            let regex = RegexBuilder::new(&terms.join("|"))
                .build()
                .map_err(|e| ConfigurationError::InvalidVocabulary(e.to_string()))?;
            matchers.insert(class, regex);
        }

        Ok(Self { matchers })
    }

    /// Does `description` mention a term of `class`?
    #[must_use]
    pub fn classify(&self, description: &str, class: MovementClass) -> bool {
        self.matchers
            .get(&class)
            .is_some_and(|re| re.is_match(&fold(description)))
    }

    /// Compute the indicators for a movement history.
    #[must_use]
    pub fn extract(&self, movements: &[Movement]) -> DerivedIndicators {
        let upcoming_deadline_mentions = movements
            .iter()
            .filter(|m| self.classify(&m.description, MovementClass::Deadline))
            .map(|m| match m.date {
                Some(dt) => format!("{}: {}", dt.format("%Y-%m-%d"), m.description),
                None => m.description.clone(),
            })
            .collect();

        let last_decision_summary = movements
            .iter()
            .rev()
            .find(|m| self.classify(&m.description, MovementClass::Decision))
            .or_else(|| movements.last())
            .map(|m| m.description.clone())
            .unwrap_or_default();

        let in_execution_phase = movements
            .iter()
            .any(|m| self.classify(&m.description, MovementClass::Execution));

        DerivedIndicators {
            upcoming_deadline_mentions,
            last_decision_summary,
            in_execution_phase,
        }
    }
}
