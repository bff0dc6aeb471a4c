//! Evaluator backed by an external program.
//!
//! Each statement spawns the configured program once. A JSON request goes
//! to its stdin:
//!
//! ```text
//! {"statement": "val x = 1;", "state": <previous state or null>, "options": {...}}
//! ```
//!
//! and exactly one JSON response is expected on stdout:
//!
//! ```text
//! {"status": "ok", "id": 7, "state": {...}, "output": "val x = 1 : int;"}
//! {"status": "incomplete"}
//! {"status": "error", "message": "...", "warnings": [{"severity": -1, "message": "..."}]}
//! ```

use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::PrepError;
use crate::core::evaluator::{EvalFailure, Evaluator, InterpreterOptions, Warning};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessState {
    pub id: u64,
    pub data: Value,
    /// Output of the statement that produced this state, tagged with its id.
    pub last: Option<(u64, String)>,
}

#[derive(Serialize)]
struct Request<'a> {
    statement: &'a str,
    state: &'a Value,
    options: &'a InterpreterOptions,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Response {
    Ok {
        id: u64,
        #[serde(default)]
        state: Value,
        #[serde(default)]
        output: String,
    },
    Incomplete,
    Error {
        message: String,
        #[serde(default)]
        warnings: Vec<Warning>,
    },
}

#[derive(Debug, Clone)]
pub struct ProcessEvaluator {
    program: String,
    args: Vec<String>,
}

impl ProcessEvaluator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn exchange(&self, request: &Request<'_>) -> Result<Response, PrepError> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| PrepError::protocol(&format!("encoding request: {e}")))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PrepError::spawn(&self.program, &e))?;

        if let Some(mut stdin) = child.stdin.take() {
            // An evaluator may answer without reading its input.
            if let Err(e) = stdin.write_all(&payload) {
                if e.kind() != ErrorKind::BrokenPipe {
                    return Err(PrepError::spawn(&self.program, &e));
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| PrepError::spawn(&self.program, &e))?;

        if !output.status.success() {
            return Err(PrepError::Exit {
                program: self.program.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug_log!("[process] {} -> {}", self.program, stdout.trim());
        serde_json::from_str(stdout.trim())
            .map_err(|e| PrepError::protocol(&format!("bad response from '{}': {e}", self.program)))
    }
}

impl Evaluator for ProcessEvaluator {
    type State = ProcessState;

    fn initial_state(&mut self, _options: &InterpreterOptions) -> Result<ProcessState, EvalFailure> {
        Ok(ProcessState::default())
    }

    fn evaluate(
        &mut self,
        statement: &str,
        state: &ProcessState,
        options: &InterpreterOptions,
    ) -> Result<ProcessState, EvalFailure> {
        let request = Request {
            statement,
            state: &state.data,
            options,
        };
        match self.exchange(&request) {
            Ok(Response::Ok { id, state: data, output }) => Ok(ProcessState {
                id,
                data,
                last: Some((id, output)),
            }),
            Ok(Response::Incomplete) => Err(EvalFailure::Incomplete),
            Ok(Response::Error { message, warnings }) => Err(EvalFailure::Invalid { message, warnings }),
            Err(e) => Err(EvalFailure::Fault(e.to_string())),
        }
    }

    fn state_id(&self, state: &ProcessState) -> u64 {
        state.id
    }

    fn print(&self, state: &ProcessState, stop_id: u64) -> String {
        match &state.last {
            Some((id, text)) if *id >= stop_id => text.clone(),
            _ => String::new(),
        }
    }
}
