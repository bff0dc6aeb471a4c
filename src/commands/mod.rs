pub mod bundle;
pub mod imports;
pub mod inspect;
pub mod run;
pub mod watch;

use crate::core::diagnostics::{warn_resolve, warn_unbalanced};
use crate::core::pipeline::{PipelineConfig, PreparedProgram};

/// Surface everything preparation noticed: unreadable imports, cycles and
/// files ending inside a comment or string. None of it is fatal.
pub(crate) fn report_preparation(program: &PreparedProgram, cfg: &PipelineConfig) {
    for w in &program.warnings {
        warn_resolve(w);
    }
    for item in program.unbalanced(cfg) {
        let source = if item.path == program.root {
            Some(program.root_content.as_str())
        } else {
            program
                .units
                .iter()
                .find(|u| u.path == item.path)
                .map(|u| u.content.as_str())
        };
        if let Some(source) = source {
            warn_unbalanced(&item, source);
        }
    }
}
