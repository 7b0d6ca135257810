//! Canonical screening result and its schema-validating decode.
//!
//! Agents are inconsistent about types: scores arrive as `87`, `87.4` or
//! `"87"`, names occasionally as empty strings, sections as prose instead of
//! objects. Every field therefore decodes leniently on its own; a field with
//! an unusable value becomes `None` instead of rejecting the whole record.
//! The record as a whole is only accepted when it identifies a candidate or
//! a fit status.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningResult {
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub candidate_name: Option<String>,

    /// Free-form, typically "fit" / "not_fit".
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub fit_status: Option<String>,

    /// 0 – 100
    #[serde(
        deserialize_with = "lenient::score",
        skip_serializing_if = "Option::is_none"
    )]
    pub overall_score: Option<u32>,

    #[serde(
        deserialize_with = "lenient::section",
        skip_serializing_if = "Option::is_none"
    )]
    pub skills_match: Option<SkillsMatch>,

    #[serde(
        deserialize_with = "lenient::section",
        skip_serializing_if = "Option::is_none"
    )]
    pub experience_evaluation: Option<ExperienceEvaluation>,

    #[serde(
        deserialize_with = "lenient::section",
        skip_serializing_if = "Option::is_none"
    )]
    pub nice_to_haves: Option<NiceToHaves>,

    /// May contain lightweight markdown (bold spans, headings, list items).
    #[serde(deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,

    #[serde(
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub email_sent: Option<bool>,

    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub email_summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsMatch {
    #[serde(deserialize_with = "lenient::string_set")]
    pub matched_skills: BTreeSet<String>,
    #[serde(deserialize_with = "lenient::string_set")]
    pub missing_skills: BTreeSet<String>,
    #[serde(deserialize_with = "lenient::score", skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceEvaluation {
    #[serde(deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub years_relevant: Option<String>,
    #[serde(deserialize_with = "lenient::score", skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NiceToHaves {
    #[serde(deserialize_with = "lenient::string_list")]
    pub matched: Vec<String>,
    #[serde(deserialize_with = "lenient::score", skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

impl ScreeningResult {
    /// Decodes a candidate JSON value. `None` unless the value is an object
    /// that names a candidate or a fit status.
    pub fn decode(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        match serde_json::from_value::<ScreeningResult>(fold_keys(value)) {
            Ok(result) if result.is_identified() => Some(result),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Screening result failed schema decode: {e}");
                None
            }
        }
    }

    /// True when at least one of `candidate_name` / `fit_status` is present.
    pub fn is_identified(&self) -> bool {
        self.candidate_name.is_some() || self.fit_status.is_some()
    }

    pub fn meets_threshold(&self, threshold: u32) -> bool {
        self.overall_score.unwrap_or(0) >= threshold
    }
}

/// Rewrites camelCase keys to snake_case at every object level. When both
/// spellings are present the snake_case one is kept.
fn fold_keys(value: &Value) -> Value {
    let Value::Object(map) = value else {
        return value.clone();
    };
    let mut folded = Map::with_capacity(map.len());
    for (key, child) in map {
        let snake = snake_case(key);
        if snake == *key {
            folded.insert(snake, fold_keys(child));
        } else {
            folded.entry(snake).or_insert_with(|| fold_keys(child));
        }
    }
    Value::Object(folded)
}

fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Field-level decoders. Each one reads whatever JSON is present and maps
/// unusable values to the empty form instead of erroring.
mod lenient {
    use std::collections::BTreeSet;

    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn score<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        let raw = match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
            _ => None,
        };
        Ok(raw
            .filter(|v| v.is_finite())
            .map(|v| v.round().clamp(0.0, 100.0) as u32))
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Bool(b) => Some(b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    pub fn section<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(d)?;
        if !value.is_object() {
            return Ok(None);
        }
        Ok(serde_json::from_value(value).ok())
    }

    pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(strings(&value).collect())
    }

    pub fn string_set<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeSet<String>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(strings(&value).collect())
    }

    fn strings(value: &Value) -> impl Iterator<Item = String> + '_ {
        value
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    }
}
