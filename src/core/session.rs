//! Statement-by-statement evaluation against a running interpreter state.

use crate::core::evaluator::{EvalFailure, Evaluator, InterpreterOptions, Warning};

/// What one statement produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutput {
    Printed(String),
    Failed { message: String, warnings: Vec<Warning> },
    /// Incomplete input; nothing to show.
    Suppressed,
}

impl ChunkOutput {
    pub fn is_failure(&self) -> bool {
        matches!(self, ChunkOutput::Failed { .. })
    }
}

pub struct Session<E: Evaluator> {
    evaluator: E,
    state: E::State,
    stop_id: u64,
    options: InterpreterOptions,
}

impl<E: Evaluator> Session<E> {
    pub fn new(mut evaluator: E, options: InterpreterOptions) -> Result<Self, EvalFailure> {
        let state = evaluator.initial_state(&options)?;
        let stop_id = evaluator.state_id(&state) + 1;
        Ok(Self {
            evaluator,
            state,
            stop_id,
            options,
        })
    }

    /// Evaluate one statement. The state only advances on success.
    pub fn evaluate(&mut self, statement: &str) -> ChunkOutput {
        match self.evaluator.evaluate(statement, &self.state, &self.options) {
            Ok(next) => {
                let printed = self.evaluator.print(&next, self.stop_id);
                self.stop_id = self.evaluator.state_id(&next) + 1;
                self.state = next;
                ChunkOutput::Printed(printed)
            }
            Err(EvalFailure::Incomplete) => {
                debug_log!("[session] incomplete input suppressed: {:?}", statement);
                ChunkOutput::Suppressed
            }
            Err(EvalFailure::Invalid { message, warnings }) => ChunkOutput::Failed { message, warnings },
            Err(EvalFailure::Fault(message)) => ChunkOutput::Failed {
                message,
                warnings: Vec::new(),
            },
        }
    }

    /// Evaluate every statement in order; one failure never stops the rest.
    pub fn run<I, S>(&mut self, statements: I) -> Vec<ChunkOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        statements
            .into_iter()
            .map(|s| self.evaluate(s.as_ref()))
            .collect()
    }

    pub fn state(&self) -> &E::State {
        &self.state
    }

    pub fn stop_id(&self) -> u64 {
        self.stop_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts `val` bindings, treats `let` without `end` as incomplete,
    /// rejects everything else.
    struct Toy;

    #[derive(Clone)]
    struct ToyState {
        id: u64,
        lines: Vec<(u64, String)>,
    }

    impl Evaluator for Toy {
        type State = ToyState;

        fn initial_state(&mut self, _: &InterpreterOptions) -> Result<ToyState, EvalFailure> {
            Ok(ToyState { id: 4, lines: Vec::new() })
        }

        fn evaluate(&mut self, stmt: &str, state: &ToyState, _: &InterpreterOptions) -> Result<ToyState, EvalFailure> {
            if stmt.starts_with("let") && !stmt.contains("end") {
                return Err(EvalFailure::Incomplete);
            }
            if !stmt.starts_with("val") {
                return Err(EvalFailure::Invalid {
                    message: format!("unexpected {stmt}"),
                    warnings: vec![Warning { severity: -2, message: "hint".into() }],
                });
            }
            let mut next = state.clone();
            next.id += 1;
            next.lines.push((next.id, stmt.to_string()));
            Ok(next)
        }

        fn state_id(&self, state: &ToyState) -> u64 {
            state.id
        }

        fn print(&self, state: &ToyState, stop_id: u64) -> String {
            state
                .lines
                .iter()
                .filter(|(id, _)| *id >= stop_id)
                .map(|(_, l)| l.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        }
    }

    #[test]
    fn failures_do_not_advance_state_or_stop_later_statements() {
        let mut session = Session::new(Toy, InterpreterOptions::new()).unwrap();
        let out = session.run(["val a = 1;", "oops;", "let val x = 1;", "val b = 2;"]);
        assert_eq!(out[0], ChunkOutput::Printed("val a = 1;".into()));
        assert!(out[1].is_failure());
        assert_eq!(out[2], ChunkOutput::Suppressed);
        // Only the new binding is printed: stop_id moved past `a`.
        assert_eq!(out[3], ChunkOutput::Printed("val b = 2;".into()));
        assert_eq!(session.state().id, 6);
        assert_eq!(session.stop_id(), 7);
    }
}
