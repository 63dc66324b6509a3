//! Ruby statement-completeness heuristic.
//!
//! Tracks `end`-terminated block structure alongside bracket depth and
//! string state. The block keywords `if`, `unless`, `while` and `until`
//! only open a block in statement position; as trailing modifiers
//! (`x = 1 if ready`) they do not, so they count only when they start a
//! line. Ruby strings may span lines, so an unterminated string is a
//! valid prefix rather than an error.

use crate::output::SyntaxStatus;

/// Keywords that always open an `end`-terminated block.
const BLOCK_OPENERS: &[&str] = &["def", "class", "module", "begin", "case", "do", "for"];

/// Keywords that open a block only in statement position.
const CONDITIONAL_OPENERS: &[&str] = &["if", "unless", "while", "until"];

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum StringState {
    None,
    /// Inside a string; the char is the terminating quote.
    Quoted(char),
}

/// Classify accumulated Ruby REPL input.
pub fn classify(source: &str) -> SyntaxStatus {
    if source.trim().is_empty() {
        return SyntaxStatus::Complete;
    }

    let mut block_depth: i32 = 0;
    let mut bracket_depth: i32 = 0;
    let mut string = StringState::None;
    let mut trailing_continuation = false;

    for line in source.split('\n') {
        // Rebuild the line with strings and comments blanked so keyword
        // matching never fires inside literals.
        let mut code = String::with_capacity(line.len());
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            match string {
                StringState::Quoted(quote) => {
                    if c == '\\' {
                        i += 2;
                        continue;
                    }
                    if c == quote {
                        string = StringState::None;
                    }
                }
                StringState::None => match c {
                    '#' => break,
                    '\'' | '"' | '`' => string = StringState::Quoted(c),
                    '(' | '[' | '{' => {
                        bracket_depth += 1;
                        code.push(c);
                    }
                    ')' | ']' | '}' => {
                        bracket_depth -= 1;
                        if bracket_depth < 0 {
                            return SyntaxStatus::Invalid;
                        }
                        code.push(c);
                    }
                    _ => code.push(c),
                },
            }
            i += 1;
        }

        if string != StringState::None {
            // The rest of the line is string content; pick up on the next.
            continue;
        }

        let trimmed = code.trim();
        if !trimmed.is_empty() {
            trailing_continuation = ends_with_continuation(trimmed);
        }

        for (index, word) in trimmed.split_whitespace().enumerate() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '_');
            if word == "end" {
                block_depth -= 1;
                if block_depth < 0 {
                    return SyntaxStatus::Invalid;
                }
            } else if BLOCK_OPENERS.contains(&word)
                || (index == 0 && CONDITIONAL_OPENERS.contains(&word))
            {
                block_depth += 1;
            }
        }
    }

    if string != StringState::None || block_depth > 0 || bracket_depth > 0 {
        return SyntaxStatus::Incomplete;
    }
    if trailing_continuation {
        return SyntaxStatus::Incomplete;
    }
    SyntaxStatus::Complete
}

/// A line ending in an operator, comma, dot or backslash expects more input.
fn ends_with_continuation(code: &str) -> bool {
    matches!(
        code.chars().last(),
        Some('\\' | ',' | '.' | '+' | '-' | '*' | '/' | '=' | '<' | '>' | '&' | '|')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_statement_is_complete() {
        assert_eq!(classify("puts \"Hello, World!\""), SyntaxStatus::Complete);
        assert_eq!(classify("test_var = 42"), SyntaxStatus::Complete);
    }

    #[test]
    fn empty_input_is_complete() {
        assert_eq!(classify(""), SyntaxStatus::Complete);
        assert_eq!(classify("  \n"), SyntaxStatus::Complete);
    }

    #[test]
    fn open_block_is_incomplete() {
        assert_eq!(classify("def greet(name)"), SyntaxStatus::Incomplete);
        assert_eq!(classify("class Foo"), SyntaxStatus::Incomplete);
        assert_eq!(classify("3.times do |i|"), SyntaxStatus::Incomplete);
        assert_eq!(classify("if ready"), SyntaxStatus::Incomplete);
    }

    #[test]
    fn closed_block_is_complete() {
        assert_eq!(
            classify("def greet(name)\n  puts name\nend"),
            SyntaxStatus::Complete
        );
        assert_eq!(
            classify("3.times do |i|\n  puts i\nend"),
            SyntaxStatus::Complete
        );
    }

    #[test]
    fn modifier_if_does_not_open_block() {
        assert_eq!(classify("x = 1 if ready"), SyntaxStatus::Complete);
        assert_eq!(classify("puts :hi unless quiet"), SyntaxStatus::Complete);
    }

    #[test]
    fn stray_end_is_invalid() {
        assert_eq!(classify("end"), SyntaxStatus::Invalid);
        assert_eq!(classify("puts 1\nend"), SyntaxStatus::Invalid);
    }

    #[test]
    fn bracket_depth_tracked() {
        assert_eq!(classify("xs = [1, 2,"), SyntaxStatus::Incomplete);
        assert_eq!(classify("f(1))"), SyntaxStatus::Invalid);
    }

    #[test]
    fn multiline_string_is_incomplete_prefix() {
        assert_eq!(classify("s = \"line one"), SyntaxStatus::Incomplete);
        assert_eq!(
            classify("s = \"line one\nline two\""),
            SyntaxStatus::Complete
        );
    }

    #[test]
    fn keywords_inside_strings_ignored() {
        assert_eq!(classify("s = \"def end if\""), SyntaxStatus::Complete);
        assert_eq!(classify("puts 1 # if this do that"), SyntaxStatus::Complete);
    }

    #[test]
    fn trailing_operator_continues() {
        assert_eq!(classify("x = 1 +"), SyntaxStatus::Incomplete);
        assert_eq!(classify("list.map"), SyntaxStatus::Complete);
        assert_eq!(classify("list.\n"), SyntaxStatus::Incomplete);
    }
}
