use std::fmt;

#[derive(Debug)]
pub enum PrepError {
    Spawn { program: String, reason: String },
    Protocol(String),
    Exit { program: String, code: Option<i32>, stderr: String },
}

impl fmt::Display for PrepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrepError::Spawn { program, reason } => write!(f, "Spawn Error: '{}': {}", program, reason),
            PrepError::Protocol(msg) => write!(f, "Protocol Error: {}", msg),
            PrepError::Exit { program, code, stderr } => {
                match code {
                    Some(c) => write!(f, "Evaluator Error: '{}' exited with status {}", program, c)?,
                    None => write!(f, "Evaluator Error: '{}' was terminated by a signal", program)?,
                }
                if !stderr.trim().is_empty() {
                    write!(f, ": {}", stderr.trim())?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for PrepError {}

impl PrepError {
    pub fn spawn(program: &str, err: &std::io::Error) -> Self {
        PrepError::Spawn { program: program.to_string(), reason: err.to_string() }
    }
    pub fn protocol(message: &str) -> Self { PrepError::Protocol(message.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test] fn test_protocol_error() {
        let err = PrepError::protocol("expected JSON object");
        assert_eq!(format!("{}", err), "Protocol Error: expected JSON object");
    }
    #[test] fn test_exit_error_with_stderr() {
        let err = PrepError::Exit { program: "sosml-eval".into(), code: Some(3), stderr: "boom\n".into() };
        assert_eq!(format!("{}", err), "Evaluator Error: 'sosml-eval' exited with status 3: boom");
    }
}
