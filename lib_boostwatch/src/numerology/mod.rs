//! # Numerology
//!
//! Symbolic annotation of payment amounts, driven by a rule list loaded once
//! per session.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Amount annotation.
pub mod matcher;
/// Rule parsing and the built-in rule set.
pub mod rules;

pub use matcher::{Annotation, NumerologyMatcher};
pub use rules::{NumerologyRule, RuleError, default_rules, parse_rules};
