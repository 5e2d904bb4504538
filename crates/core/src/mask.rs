// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PII masking over strings and JSON values.
//!
//! Traversal is bounded: values nested deeper than [`MAX_DEPTH`] are replaced
//! with [`DEPTH_EXCEEDED`] and arrays are truncated to [`MAX_ARRAY_LEN`] items.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

pub const MAX_DEPTH: usize = 32;
pub const MAX_ARRAY_LEN: usize = 1000;
pub const DEPTH_EXCEEDED: &str = "[MAX_DEPTH_EXCEEDED]";

#[derive(Debug, Error)]
pub enum MaskError {
    #[error("invalid masking pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Built-in PII categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiCategory {
    CreditCard,
    Phone,
    Email,
    GovernmentId,
    IpAddress,
    Iban,
}

impl PiiCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PiiCategory::CreditCard => "CREDIT_CARD",
            PiiCategory::Phone => "PHONE",
            PiiCategory::Email => "EMAIL",
            PiiCategory::GovernmentId => "GOVERNMENT_ID",
            PiiCategory::IpAddress => "IP_ADDRESS",
            PiiCategory::Iban => "IBAN",
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            PiiCategory::CreditCard => r"\b(?:\d[ -]*?){13,16}\b",
            PiiCategory::Phone => r"(\+81|0)\d{1,4}[- ]?\d{1,4}[- ]?\d{4}",
            PiiCategory::Email => r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}",
            PiiCategory::GovernmentId => r"\b\d{12}\b",
            PiiCategory::IpAddress => r"\b(?:\d{1,3}\.){3}\d{1,3}\b",
            PiiCategory::Iban => r"\b[A-Z]{2}\d{2}[A-Z0-9]{11,30}\b",
        }
    }

    /// Replacement text, e.g. `[MASKED_EMAIL]`
    pub fn replacement(self) -> String {
        format!("[MASKED_{}]", self.as_str())
    }
}

/// One masking rule, as configured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaskingRule {
    /// Replace every match of `pattern` inside string values
    Regex { pattern: String, replacement: String },
    /// Replace the whole value of any object key listed in `sensitive_keys`
    KeyMatch {
        sensitive_keys: Vec<String>,
        replacement: String,
    },
    /// Replace matches of a built-in category with `[MASKED_<CATEGORY>]`
    PiiType { category: PiiCategory },
}

impl MaskingRule {
    pub fn validate(&self) -> Result<(), MaskError> {
        if let MaskingRule::Regex { pattern, .. } = self {
            compile(pattern)?;
        }
        Ok(())
    }
}

fn compile(pattern: &str) -> Result<Regex, MaskError> {
    Regex::new(pattern).map_err(|source| MaskError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Compiled rule set
#[derive(Debug, Clone, Default)]
pub struct Masker {
    text_rules: Vec<(Regex, String)>,
    key_rules: Vec<(HashSet<String>, Value)>,
    preserve_fields: HashSet<String>,
}

impl Masker {
    pub fn new(rules: &[MaskingRule], preserve_fields: &[String]) -> Result<Self, MaskError> {
        let mut text_rules = Vec::new();
        let mut key_rules = Vec::new();
        for rule in rules {
            match rule {
                MaskingRule::Regex {
                    pattern,
                    replacement,
                } => text_rules.push((compile(pattern)?, replacement.clone())),
                MaskingRule::PiiType { category } => {
                    text_rules.push((compile(category.pattern())?, category.replacement()))
                }
                MaskingRule::KeyMatch {
                    sensitive_keys,
                    replacement,
                } => key_rules.push((
                    sensitive_keys.iter().map(|k| k.to_ascii_lowercase()).collect(),
                    Value::String(replacement.clone()),
                )),
            }
        }
        Ok(Self {
            text_rules,
            key_rules,
            preserve_fields: preserve_fields.iter().cloned().collect(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.text_rules.is_empty() && self.key_rules.is_empty()
    }

    /// Apply text rules in configuration order
    pub fn mask_str(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (regex, replacement) in &self.text_rules {
            if regex.is_match(&out) {
                out = regex.replace_all(&out, replacement.as_str()).into_owned();
            }
        }
        out
    }

    pub fn mask_value(&self, value: &Value) -> Value {
        self.mask_at(value, 0)
    }

    fn mask_at(&self, value: &Value, depth: usize) -> Value {
        if depth > MAX_DEPTH {
            return Value::String(DEPTH_EXCEEDED.to_string());
        }
        match value {
            Value::String(s) => Value::String(self.mask_str(s)),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .take(MAX_ARRAY_LEN)
                    .map(|item| self.mask_at(item, depth + 1))
                    .collect(),
            ),
            Value::Object(fields) => {
                let mut out = Map::with_capacity(fields.len());
                for (key, field) in fields {
                    let masked = if self.preserve_fields.contains(key) {
                        field.clone()
                    } else if let Some(replacement) = self.key_replacement(key) {
                        replacement.clone()
                    } else {
                        self.mask_at(field, depth + 1)
                    };
                    out.insert(key.clone(), masked);
                }
                Value::Object(out)
            }
            other => other.clone(),
        }
    }

    fn key_replacement(&self, key: &str) -> Option<&Value> {
        let key = key.to_ascii_lowercase();
        self.key_rules
            .iter()
            .find(|(keys, _)| keys.contains(&key))
            .map(|(_, replacement)| replacement)
    }
}

#[cfg(test)]
#[path = "mask_tests.rs"]
mod tests;
