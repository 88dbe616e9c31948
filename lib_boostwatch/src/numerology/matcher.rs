//! # Numerology Matcher
//!
//! Decorates an amount with glyphs and a tooltip.
//!
//! ## Key Design Principles:
//! - **Two Passes**: the first pass collects tagged hits with non-overlap
//!   enforced on the digit string; the second pass orders and renders them.
//! - **Equality Supersedes**: a matching `=` rule consumes the whole amount, so
//!   only equality hits are rendered for it.
//! - **Positional Patterns**: comparison hits render first in rule order;
//!   pattern hits follow, ordered by where they sit in the digit string.

use super::rules::{NumerologyRule, RuleError, RuleKind, default_rules, parse_rules};

/// Placeholder written over digits already consumed by a pattern.
const FILLER: char = '_';

/// Result of annotating an amount.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    /// Concatenated glyphs. Empty when nothing matched.
    pub glyphs: String,
    /// Matched rule names, comma separated, each listed once.
    pub tooltip: String,
    /// Sound cues of matched rules, in render order, without repeats.
    pub sound_files: Vec<String>,
}

impl Annotation {
    /// True when no rule matched.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty() && self.tooltip.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Hit {
    Equality { rule: usize },
    Threshold { rule: usize },
    Pattern { position: usize, rule: usize },
}

impl Hit {
    fn rule(self) -> usize {
        match self {
            Hit::Equality { rule } | Hit::Threshold { rule } | Hit::Pattern { rule, .. } => rule,
        }
    }
}

/// # Numerology Matcher
///
/// Pure and deterministic for a given rule list.
#[derive(Debug, Clone, Default)]
pub struct NumerologyMatcher {
    rules: Vec<NumerologyRule>,
}

impl NumerologyMatcher {
    /// Matcher over the given rules, applied in list order.
    pub fn new(rules: Vec<NumerologyRule>) -> Self {
        Self { rules }
    }

    /// Matcher over the built-in rule set.
    pub fn with_defaults() -> Self {
        Self::new(default_rules())
    }

    /// Matcher over a JSON rule list.
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        parse_rules(json).map(Self::new)
    }

    /// Loaded rules.
    pub fn rules(&self) -> &[NumerologyRule] {
        &self.rules
    }

    /// Annotates `amount` (in sats).
    pub fn annotate(&self, amount: u64) -> Annotation {
        let hits = self.collect(amount);
        self.render(hits)
    }

    fn collect(&self, amount: u64) -> Vec<Hit> {
        let equality: Vec<Hit> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| match &rule.kind {
                RuleKind::Compare { op, bound } => rule.is_equality() && op.holds(amount, *bound),
                RuleKind::Pattern(_) => false,
            })
            .map(|(rule, _)| Hit::Equality { rule })
            .collect();
        if !equality.is_empty() {
            return equality;
        }

        let mut thresholds = Vec::new();
        let mut patterns = Vec::new();
        let mut digits = amount.to_string();

        for (idx, rule) in self.rules.iter().enumerate() {
            match &rule.kind {
                RuleKind::Compare { op, bound } => {
                    if op.holds(amount, *bound) {
                        thresholds.push(Hit::Threshold { rule: idx });
                    }
                }
                RuleKind::Pattern(re) => {
                    // Each unconsumed run is searched on its own, so a match
                    // can never straddle digits an earlier rule took.
                    let spans: Vec<(usize, usize)> = unconsumed_runs(&digits)
                        .into_iter()
                        .flat_map(|(offset, run)| {
                            re.find_iter(run)
                                .filter(|m| !m.is_empty())
                                .map(move |m| (offset + m.start(), offset + m.end()))
                        })
                        .collect();
                    for (start, end) in spans {
                        digits.replace_range(start..end, &FILLER.to_string().repeat(end - start));
                        patterns.push(Hit::Pattern {
                            position: start,
                            rule: idx,
                        });
                    }
                }
            }
        }

        patterns.sort_by_key(|hit| match hit {
            Hit::Pattern { position, .. } => *position,
            _ => 0,
        });
        thresholds.extend(patterns);
        thresholds
    }

    fn render(&self, hits: Vec<Hit>) -> Annotation {
        let mut annotation = Annotation::default();
        let mut seen: Vec<usize> = Vec::new();
        let mut names: Vec<&str> = Vec::new();

        for hit in hits {
            let rule = &self.rules[hit.rule()];
            annotation.glyphs.push_str(&rule.emoji);
            if !seen.contains(&hit.rule()) {
                seen.push(hit.rule());
                if !names.contains(&rule.name.as_str()) {
                    names.push(&rule.name);
                }
                if let Some(sound) = &rule.sound_file {
                    if !annotation.sound_files.contains(sound) {
                        annotation.sound_files.push(sound.clone());
                    }
                }
            }
        }

        annotation.tooltip = names.join(", ");
        annotation
    }
}

/// Byte offset and text of every filler-free run in `digits`.
fn unconsumed_runs(digits: &str) -> Vec<(usize, &str)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, c) in digits.char_indices() {
        match (c == FILLER, start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                runs.push((s, &digits[s..i]));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, &digits[s..]));
    }
    runs
}
