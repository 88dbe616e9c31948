//! # Numerology Rules
//!
//! Rule configuration as served by `/numerology.json`, plus a built-in rule
//! set used when that endpoint is unavailable.
//!
//! A rule either compares the whole amount (`=`, `<`, `<=`, `>`, `>=`) or
//! looks for a pattern inside its decimal digits (`=~` with a literal amount,
//! or an explicit `regex`).

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while turning a rule entry into a [`NumerologyRule`].
#[derive(Debug, Error)]
pub enum RuleError {
    /// The entry has neither a usable `equality` nor a `regex`.
    #[error("rule '{0}' has no equality or regex")]
    MissingPredicate(String),
    /// The `equality` operator is not supported.
    #[error("rule '{name}' uses unknown equality '{equality}'")]
    UnknownEquality {
        /// Rule name.
        name: String,
        /// Offending operator.
        equality: String,
    },
    /// The `amount` is missing or not a non-negative integer.
    #[error("rule '{0}' has an invalid amount")]
    InvalidAmount(String),
    /// The pattern failed to compile.
    #[error("rule '{name}' has an invalid pattern: {source}")]
    InvalidPattern {
        /// Rule name.
        name: String,
        /// Compiler error.
        #[source]
        source: regex::Error,
    },
    /// The rule list is not valid JSON.
    #[error("malformed rule list: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Amounts show up both as numbers and as numeric strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AmountField {
    Number(u64),
    Text(String),
}

impl AmountField {
    fn digits(&self) -> Option<String> {
        match self {
            AmountField::Number(n) => Some(n.to_string()),
            AmountField::Text(s) => {
                let s = s.trim();
                (!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())).then(|| s.to_string())
            }
        }
    }
}

/// One raw entry of the rule list.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleEntry {
    /// Human-readable label, shown in the tooltip.
    #[serde(alias = "description", default)]
    pub name: String,
    /// Glyphs emitted per match.
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    equality: Option<String>,
    #[serde(default)]
    amount: Option<AmountField>,
    #[serde(default)]
    regex: Option<String>,
    /// Optional sound cue played for amounts matching this rule.
    #[serde(default)]
    pub sound_file: Option<String>,
}

/// Whole-amount comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `=`
    Equal,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
}

impl Comparison {
    fn parse(op: &str) -> Option<Self> {
        match op.trim() {
            "=" | "==" => Some(Comparison::Equal),
            "<" => Some(Comparison::Less),
            "<=" => Some(Comparison::LessOrEqual),
            ">" => Some(Comparison::Greater),
            ">=" => Some(Comparison::GreaterOrEqual),
            _ => None,
        }
    }

    /// Applies the operator as `amount <op> bound`.
    pub fn holds(self, amount: u64, bound: u64) -> bool {
        match self {
            Comparison::Equal => amount == bound,
            Comparison::Less => amount < bound,
            Comparison::LessOrEqual => amount <= bound,
            Comparison::Greater => amount > bound,
            Comparison::GreaterOrEqual => amount >= bound,
        }
    }
}

/// The predicate part of a rule.
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// Compares the whole amount against a bound.
    Compare {
        /// Operator.
        op: Comparison,
        /// Right-hand side.
        bound: u64,
    },
    /// Matches inside the decimal digit string.
    Pattern(Regex),
}

/// # Numerology Rule
///
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct NumerologyRule {
    /// Label for the tooltip.
    pub name: String,
    /// Glyphs emitted per match.
    pub emoji: String,
    /// Optional sound cue.
    pub sound_file: Option<String>,
    /// Predicate.
    pub kind: RuleKind,
}

impl NumerologyRule {
    /// Builds a rule from a raw entry. An explicit `regex` wins over
    /// `equality`.
    pub fn from_entry(entry: RuleEntry) -> Result<Self, RuleError> {
        let RuleEntry {
            name,
            emoji,
            equality,
            amount,
            regex,
            sound_file,
        } = entry;

        let kind = if let Some(pattern) = regex.filter(|p| !p.is_empty()) {
            Self::compile(&name, &pattern)?
        } else {
            let equality = equality.ok_or_else(|| RuleError::MissingPredicate(name.clone()))?;
            let digits = amount
                .as_ref()
                .and_then(AmountField::digits)
                .ok_or_else(|| RuleError::InvalidAmount(name.clone()))?;

            if equality.trim() == "=~" {
                Self::compile(&name, &regex::escape(&digits))?
            } else {
                let op = Comparison::parse(&equality).ok_or_else(|| RuleError::UnknownEquality {
                    name: name.clone(),
                    equality: equality.clone(),
                })?;
                let bound = digits
                    .parse::<u64>()
                    .map_err(|_| RuleError::InvalidAmount(name.clone()))?;
                RuleKind::Compare { op, bound }
            }
        };

        Ok(Self {
            name,
            emoji,
            sound_file: sound_file.filter(|s| !s.is_empty()),
            kind,
        })
    }

    fn compile(name: &str, pattern: &str) -> Result<RuleKind, RuleError> {
        Regex::new(pattern)
            .map(RuleKind::Pattern)
            .map_err(|source| RuleError::InvalidPattern {
                name: name.to_string(),
                source,
            })
    }

    /// `=` rules: a hit supersedes every other rule for that amount.
    pub fn is_equality(&self) -> bool {
        matches!(
            self.kind,
            RuleKind::Compare {
                op: Comparison::Equal,
                ..
            }
        )
    }
}

/// Parses a JSON rule list. Entries that fail to build are skipped with a
/// warning; only a malformed document is an error.
pub fn parse_rules(json: &str) -> Result<Vec<NumerologyRule>, RuleError> {
    let entries: Vec<RuleEntry> = serde_json::from_str(json)?;
    Ok(build_rules(entries))
}

/// Builds rules from already decoded entries, skipping invalid ones.
pub fn build_rules(entries: Vec<RuleEntry>) -> Vec<NumerologyRule> {
    entries
        .into_iter()
        .filter_map(|entry| match NumerologyRule::from_entry(entry) {
            Ok(rule) => Some(rule),
            Err(e) => {
                tracing::warn!("Skipping numerology rule: {}", e);
                None
            }
        })
        .collect()
}

const DEFAULT_RULES: &[(&str, &str, &str, &str)] = &[
    ("Satchel of Richards Donation x 7", "🍆🍆🍆🍆🍆🍆🍆", "1111111", "="),
    ("Satchel of Richards Donation x 6", "🍆🍆🍆🍆🍆🍆", "111111", "="),
    ("Satchel of Richards Donation x 5", "🍆🍆🍆🍆🍆", "11111", "="),
    ("Satchel of Richards Donation x 4", "🍆🍆🍆🍆", "1111", "="),
    ("Satchel of Richards Donation x 3", "🍆🍆🍆", "111", "="),
    ("Satchel of Richards Donation x 2", "🍆🍆", "11", "="),
    ("Ducks In a Row Donation x 7", "🦆🦆🦆🦆🦆🦆🦆", "2222222", "="),
    ("Ducks In a Row Donation x 6", "🦆🦆🦆🦆🦆🦆", "222222", "="),
    ("Ducks In a Row Donation x 5", "🦆🦆🦆🦆🦆", "22222", "="),
    ("Ducks In a Row Donation x 4", "🦆🦆🦆🦆", "2222", "="),
    ("Ducks In a Row Donation x 3", "🦆🦆🦆", "222", "="),
    ("Ducks In a Row Donation x 2", "🦆🦆", "22", "="),
    ("Swan Donation x 7", "🦢🦢🦢🦢🦢🦢🦢", "5555555", "="),
    ("Swan Donation x 6", "🦢🦢🦢🦢🦢🦢", "555555", "="),
    ("Swan Donation x 5", "🦢🦢🦢🦢🦢", "55555", "="),
    ("Swan Donation x 4", "🦢🦢🦢🦢", "5555", "="),
    ("Swan Donation x 3", "🦢🦢🦢", "555", "="),
    ("Swan Donation x 2", "🦢🦢", "55", "="),
    ("Countdown Donation x 5", "💥💥💥💥💥", "7654321", "=~"),
    ("Countdown Donation x 4", "💥💥💥💥", "654321", "=~"),
    ("Countdown Donation x 3", "💥💥💥", "54321", "=~"),
    ("Countdown Donation x 2", "💥💥", "4321", "=~"),
    ("Countdown Donation", "💥", "321", "=~"),
    ("Countup Donation x 5", "🧛🧛🧛🧛🧛", "1234567", "=~"),
    ("Countup Donation x 4", "🧛🧛🧛🧛", "123456", "=~"),
    ("Countup Donation x 3", "🧛🧛🧛", "12345", "=~"),
    ("Countup Donation x 2", "🧛🧛", "1234", "=~"),
    ("Countup Donation", "🧛", "123", "=~"),
    ("Bowler Donation x 3 +🦃", "🎳🎳🎳🦃", "101010", "="),
    ("Bowler Donation x 2", "🎳🎳", "1010", "="),
    ("Bowler Donation", "🎳", "10", "="),
    ("Dice Donation", "🎲", "11", "=~"),
    ("Bitcoin donation", "🪙", "21", "=~"),
    ("Magic Number Donation", "✨", "33", "=~"),
    ("Swasslenuff Donation", "💋", "69", "=~"),
    ("Greetings Donation", "👋", "73", "=~"),
    ("Love and Kisses Donation", "🥰", "88", "=~"),
    ("Stoner Donation", "✌👽💨", "420", "=~"),
    ("Devil Donation", "😈", "666", "=~"),
    ("Angel Donation", "😇", "777", "=~"),
    ("America Fuck Yeah Donation", "🇺🇸", "1776", "=~"),
    ("Canada Donation", "🇨🇦", "1867", "=~"),
    ("Boobs Donation", "🎱🎱", "6006", "=~"),
    ("Boobs Donation", "🎱🎱", "8008", "=~"),
    ("Wolf Donation", "🐺", "9653", "=~"),
    ("Boost Donation", "🔁", "30057", "=~"),
    ("Pi Donation x 5", "🥧🥧🥧🥧🥧", "3141592", "=~"),
    ("Pi Donation x 4", "🥧🥧🥧🥧", "314159", "=~"),
    ("Pi Donation x 3", "🥧🥧🥧", "31415", "=~"),
    ("Pi Donation x 2", "🥧🥧", "3141", "=~"),
    ("Pi Donation", "🥧", "314", "=~"),
    ("Poo donation", "💩", "9", "<"),
    ("Lit donation 100k", "🔥", "100000", ">="),
    ("Lit donation 50k", "🔥", "50000", ">="),
    ("Lit donation 10k", "🔥", "10000", ">="),
];

/// Built-in rule set.
pub fn default_rules() -> Vec<NumerologyRule> {
    let entries = DEFAULT_RULES
        .iter()
        .map(|(name, emoji, amount, equality)| RuleEntry {
            name: name.to_string(),
            emoji: emoji.to_string(),
            equality: Some(equality.to_string()),
            amount: Some(AmountField::Text(amount.to_string())),
            regex: None,
            sound_file: None,
        })
        .collect();
    build_rules(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_rule_shapes() {
        let rules = parse_rules(
            r#"[
                {"name": "Nice", "emoji": "💋", "regex": "69"},
                {"description": "Lit", "emoji": "🔥", "equality": ">=", "amount": 10000},
                {"name": "Pair", "emoji": "🎲", "equality": "=~", "amount": "11", "sound_file": "/dice.mp3"},
                {"name": "Exact", "emoji": "🍆", "equality": "=", "amount": "11"}
            ]"#,
        )
        .unwrap();
        assert_eq!(rules.len(), 4);
        assert!(matches!(rules[0].kind, RuleKind::Pattern(_)));
        assert_eq!(rules[1].name, "Lit");
        assert!(matches!(
            rules[1].kind,
            RuleKind::Compare {
                op: Comparison::GreaterOrEqual,
                bound: 10000
            }
        ));
        assert_eq!(rules[2].sound_file.as_deref(), Some("/dice.mp3"));
        assert!(rules[3].is_equality());
        assert!(!rules[1].is_equality());
    }

    #[test]
    fn invalid_entries_are_skipped() {
        let rules = parse_rules(
            r#"[
                {"name": "NoPredicate", "emoji": "?"},
                {"name": "BadOp", "emoji": "?", "equality": "!~", "amount": 1},
                {"name": "BadAmount", "emoji": "?", "equality": "=", "amount": "ten"},
                {"name": "BadRegex", "emoji": "?", "regex": "(["},
                {"name": "Ok", "emoji": "!", "equality": "<", "amount": 9}
            ]"#,
        )
        .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "Ok");
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(matches!(parse_rules("{\"name\": 1}"), Err(RuleError::Malformed(_))));
    }

    #[test]
    fn defaults_all_build() {
        assert_eq!(default_rules().len(), DEFAULT_RULES.len());
    }
}
