//! Statement-completeness classification for REPL input.
//!
//! Called on the accumulated input buffer after every submitted line to
//! decide between executing and waiting for a continuation line.
//! Classification is a pure function of the input text: it never touches
//! backend state, so calling it any number of times is observationally
//! identical to calling it once.
//!
//! Workers whose interpreter ships a real parser answer `checkSyntax` over
//! the wire instead (the python harness uses `codeop`); these built-in
//! classifiers are the authority for the languages that don't.

pub mod javascript;
pub mod python;
pub mod ruby;

use crate::output::SyntaxStatus;

/// Classifies accumulated REPL input as complete, incomplete or invalid.
pub trait StatementClassifier: Send + Sync {
    fn classify(&self, source: &str) -> SyntaxStatus;
}

/// Python heuristic classifier (see [`python::classify`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonClassifier;

impl StatementClassifier for PythonClassifier {
    fn classify(&self, source: &str) -> SyntaxStatus {
        python::classify(source)
    }
}

/// Ruby heuristic classifier (see [`ruby::classify`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct RubyClassifier;

impl StatementClassifier for RubyClassifier {
    fn classify(&self, source: &str) -> SyntaxStatus {
        ruby::classify(source)
    }
}

/// JavaScript heuristic classifier, also used for typescript input
/// (see [`javascript::classify`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaScriptClassifier;

impl StatementClassifier for JavaScriptClassifier {
    fn classify(&self, source: &str) -> SyntaxStatus {
        javascript::classify(source)
    }
}

#[cfg(all(test, feature = "fuzz-tests"))]
mod fuzz_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Classification is idempotent and total over arbitrary input.
        #[test]
        fn python_classify_is_pure(source in ".{0,200}") {
            let first = python::classify(&source);
            let second = python::classify(&source);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn ruby_classify_is_pure(source in ".{0,200}") {
            prop_assert_eq!(ruby::classify(&source), ruby::classify(&source));
        }

        #[test]
        fn javascript_classify_is_pure(source in ".{0,200}") {
            prop_assert_eq!(javascript::classify(&source), javascript::classify(&source));
        }
    }
}
