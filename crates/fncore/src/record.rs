use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::metrics::timestamp;

/// Backend-assigned identifier of a function definition
pub type FunctionId = i64;

/// Source language of a function's code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" => Ok(Language::Javascript),
            other => Err(format!("unsupported language: {}", other)),
        }
    }
}

/// Stored function definition, as cached from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub id: FunctionId,
    pub name: String,
    pub route: String,
    pub language: Language,
    pub code: String,
    pub timeout: u32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub environment_variables: BTreeMap<String, String>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl FunctionRecord {
    /// Project the record back onto the fields an operator can author.
    pub fn to_draft(&self) -> FunctionDraft {
        FunctionDraft {
            name: self.name.clone(),
            route: self.route.clone(),
            language: self.language,
            code: self.code.clone(),
            timeout: self.timeout,
            environment_variables: self.environment_variables.clone(),
        }
    }

    /// Return a copy with every set field of `patch` applied.
    pub fn patched(&self, patch: &FunctionPatch) -> FunctionRecord {
        let mut record = self.clone();
        if let Some(name) = &patch.name {
            record.name = name.clone();
        }
        if let Some(route) = &patch.route {
            record.route = route.clone();
        }
        if let Some(language) = patch.language {
            record.language = language;
        }
        if let Some(code) = &patch.code {
            record.code = code.clone();
        }
        if let Some(timeout) = patch.timeout {
            record.timeout = timeout;
        }
        if let Some(env) = &patch.environment_variables {
            record.environment_variables = env.clone();
        }
        record
    }
}

/// Body of a create request: a record without backend-assigned fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDraft {
    pub name: String,
    pub route: String,
    pub language: Language,
    pub code: String,
    pub timeout: u32,
    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,
}

impl FunctionDraft {
    pub fn new(
        name: impl Into<String>,
        route: impl Into<String>,
        language: Language,
        code: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            route: route.into(),
            language,
            code: code.into(),
            timeout: 30,
            environment_variables: BTreeMap::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: u32) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment_variables.insert(key.into(), value.into());
        self
    }

    /// Local checks that can be made without asking the backend.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        if self.route.trim().is_empty() {
            return Err("route is required".to_string());
        }
        if self.timeout == 0 {
            return Err("timeout must be a positive number of seconds".to_string());
        }
        Ok(())
    }
}

/// Partial update; unset fields are left untouched by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<BTreeMap<String, String>>,
}

impl FunctionPatch {
    /// Minimal patch turning `record` into `draft`.
    pub fn between(record: &FunctionRecord, draft: &FunctionDraft) -> Self {
        fn changed<T: PartialEq + Clone>(old: &T, new: &T) -> Option<T> {
            (old != new).then(|| new.clone())
        }

        Self {
            name: changed(&record.name, &draft.name),
            route: changed(&record.route, &draft.route),
            language: changed(&record.language, &draft.language),
            code: changed(&record.code, &draft.code),
            timeout: changed(&record.timeout, &draft.timeout),
            environment_variables: changed(
                &record.environment_variables,
                &draft.environment_variables,
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &FunctionPatch::default()
    }

    /// Same local checks as [`FunctionDraft::validate`], for the set fields.
    pub fn validate(&self) -> Result<(), String> {
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err("name must not be empty".to_string());
        }
        if matches!(&self.route, Some(r) if r.trim().is_empty()) {
            return Err("route must not be empty".to_string());
        }
        if self.timeout == Some(0) {
            return Err("timeout must be a positive number of seconds".to_string());
        }
        Ok(())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<BTreeMap<String, String>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}
