//! DW-010: Evaluator abstraction — environment creation and fragment execution.
//!
//! The scanner, rewriter and executor only see this trait. The in-process
//! JavaScript evaluator lives in [`js`]; an out-of-process evaluator can be
//! substituted by implementing [`Evaluator`].

pub mod js;
pub mod workdir;

use crate::core::error::WeaveResult;

/// Executes fragment source against a per-document environment.
pub trait Evaluator {
    /// Mutable name bindings shared by the fragments of one document.
    type Environment;

    /// Create a fresh environment. Called once per document.
    fn environment(&self) -> WeaveResult<Self::Environment>;

    /// Run `source` against `env`. Output goes through
    /// [`capture::emit`](crate::core::capture::emit); `Err` carries the fault description.
    fn execute(&self, env: &mut Self::Environment, source: &str) -> Result<(), String>;

    /// Line and column inside the fragment source named by a fault, if known.
    fn fault_position(&self, _description: &str) -> Option<(usize, usize)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::capture::{emit_line, StdoutCapture};
    use std::collections::HashMap;

    /// Toy evaluator: `name=value` binds, `name` prints, `!msg` faults.
    struct Toy;

    impl Evaluator for Toy {
        type Environment = HashMap<String, String>;

        fn environment(&self) -> WeaveResult<Self::Environment> {
            Ok(HashMap::new())
        }

        fn execute(&self, env: &mut Self::Environment, source: &str) -> Result<(), String> {
            let source = source.trim();
            if let Some(msg) = source.strip_prefix('!') {
                return Err(msg.to_string());
            }
            match source.split_once('=') {
                Some((k, v)) => {
                    env.insert(k.to_string(), v.to_string());
                }
                None => emit_line(env.get(source).map(String::as_str).unwrap_or("?")),
            }
            Ok(())
        }
    }

    #[test]
    fn test_dw010_trait_threads_environment() {
        let toy = Toy;
        let mut env = toy.environment().unwrap();
        let capture = StdoutCapture::begin();
        toy.execute(&mut env, "a=1").unwrap();
        toy.execute(&mut env, "a").unwrap();
        assert_eq!(capture.contents(), "1\n");
    }

    #[test]
    fn test_dw010_fault_position_defaults_to_unknown() {
        assert_eq!(Toy.fault_position("anything at line 3, col 1"), None);
    }

    #[test]
    fn test_dw010_trait_fault() {
        let toy = Toy;
        let mut env = toy.environment().unwrap();
        assert_eq!(toy.execute(&mut env, "!bad").unwrap_err(), "bad");
    }
}
