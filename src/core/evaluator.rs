//! Boundary with the external SML evaluator.
//!
//! The evaluator owns the interpreter state; we only thread it through and
//! ask it to print. Interpreter options are forwarded untouched.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Pass-through dialect toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Flag(bool),
    Text(String),
}

/// Named options handed to the evaluator on every call.
pub type InterpreterOptions = BTreeMap<String, OptionValue>;

/// The dialect switches the editor integration always shipped with.
pub fn default_interpreter_options() -> InterpreterOptions {
    [
        ("allowSuccessorML", false),
        ("allowVector", true),
        ("disableElaboration", false),
        ("disableEvaluation", false),
        ("strictMode", true),
        ("allowUnicode", false),
        ("allowUnicodeTypeVariables", false),
        ("allowCommentToken", false),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), OptionValue::Flag(v)))
    .collect()
}

/// Threshold at or above which a warning needs the user's attention.
pub const ATTENTION_THRESHOLD: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub severity: i32,
    pub message: String,
}

impl Warning {
    pub fn is_attention(&self) -> bool {
        self.severity >= ATTENTION_THRESHOLD
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_attention() {
            write!(f, "Attention: {}", self.message)
        } else {
            write!(f, "Message: {}", self.message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalFailure {
    /// The statement is a prefix of a larger construct. Never shown.
    Incomplete,
    /// The evaluator rejected the statement.
    Invalid { message: String, warnings: Vec<Warning> },
    /// The evaluator itself could not be driven.
    Fault(String),
}

impl fmt::Display for EvalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalFailure::Incomplete => write!(f, "input incomplete"),
            EvalFailure::Invalid { message, .. } => write!(f, "{}", message),
            EvalFailure::Fault(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for EvalFailure {}

pub trait Evaluator {
    type State: Clone;

    fn initial_state(&mut self, options: &InterpreterOptions) -> Result<Self::State, EvalFailure>;

    /// Evaluate one `;`-terminated statement against `state`.
    fn evaluate(
        &mut self,
        statement: &str,
        state: &Self::State,
        options: &InterpreterOptions,
    ) -> Result<Self::State, EvalFailure>;

    /// Monotonic identifier of `state`, used only to keep printing continuous.
    fn state_id(&self, state: &Self::State) -> u64;

    /// Pretty-print the parts of `state` created at or after `stop_id`.
    fn print(&self, state: &Self::State, stop_id: u64) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_threshold_splits_attention_from_message() {
        let w = |severity| Warning { severity, message: "m".into() };
        assert_eq!(w(-1).to_string(), "Attention: m");
        assert_eq!(w(3).to_string(), "Attention: m");
        assert_eq!(w(-2).to_string(), "Message: m");
    }

    #[test]
    fn default_options_round_trip_as_plain_json() {
        let json = serde_json::to_value(default_interpreter_options()).unwrap();
        assert_eq!(json["strictMode"], serde_json::Value::Bool(true));
        assert_eq!(json["allowSuccessorML"], serde_json::Value::Bool(false));
        assert_eq!(json.as_object().map(|o| o.len()), Some(8));
    }
}
