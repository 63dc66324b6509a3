//! Python statement-completeness heuristic.
//!
//! Approximates `codeop.compile_command`: a successful parse maps to
//! complete, the "unexpected EOF" family maps to incomplete and anything
//! else to invalid. Two REPL conventions are layered on top, matching
//! observed interpreter behavior: a multi-line buffer only completes once
//! its final line is blank, and a line ending in `:` always opens a block.

use crate::output::SyntaxStatus;

#[derive(Debug, PartialEq, Eq)]
enum StringState {
    None,
    /// Inside a single-line string; the char is the opening quote.
    Single(char),
    /// Inside a triple-quoted string; the char is the quote character.
    Triple(char),
}

/// Classify accumulated Python REPL input.
pub fn classify(source: &str) -> SyntaxStatus {
    if source.trim().is_empty() {
        return SyntaxStatus::Complete;
    }

    // Multi-line statements complete only after a blank final line.
    if source.contains('\n')
        && source
            .rsplit('\n')
            .next()
            .is_some_and(|line| !line.trim().is_empty())
    {
        return SyntaxStatus::Incomplete;
    }

    let mut depth: i32 = 0;
    let mut string = StringState::None;
    let mut trailing_backslash = false;
    let mut last_code_char: Option<char> = None;

    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match string {
            StringState::Single(quote) => {
                if c == '\\' {
                    i += 2;
                    continue;
                }
                if c == quote {
                    string = StringState::None;
                } else if c == '\n' {
                    // Plain strings cannot span lines.
                    return SyntaxStatus::Invalid;
                }
            }
            StringState::Triple(quote) => {
                if c == '\\' {
                    i += 2;
                    continue;
                }
                if c == quote && chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote)
                {
                    string = StringState::None;
                    i += 3;
                    continue;
                }
            }
            StringState::None => match c {
                '#' => {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                    continue;
                }
                '\'' | '"' => {
                    if chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c) {
                        string = StringState::Triple(c);
                        i += 3;
                        continue;
                    }
                    string = StringState::Single(c);
                }
                '(' | '[' | '{' => {
                    depth += 1;
                    last_code_char = Some(c);
                }
                ')' | ']' | '}' => {
                    depth -= 1;
                    if depth < 0 {
                        return SyntaxStatus::Invalid;
                    }
                    last_code_char = Some(c);
                }
                '\\' => {
                    trailing_backslash = chars.get(i + 1).map_or(true, |&next| next == '\n');
                    last_code_char = Some(c);
                }
                '\n' => {}
                _ => {
                    if !c.is_whitespace() {
                        trailing_backslash = false;
                        last_code_char = Some(c);
                    }
                }
            },
        }
        i += 1;
    }

    match string {
        // An unterminated triple-quoted string is a valid prefix.
        StringState::Triple(_) => return SyntaxStatus::Incomplete,
        StringState::Single(_) => return SyntaxStatus::Invalid,
        StringState::None => {}
    }

    if depth > 0 || trailing_backslash {
        return SyntaxStatus::Incomplete;
    }
    if last_code_char == Some(':') {
        return SyntaxStatus::Incomplete;
    }
    SyntaxStatus::Complete
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_statement_is_complete() {
        assert_eq!(classify("print(\"Hello, World!\")"), SyntaxStatus::Complete);
        assert_eq!(classify("testVar = 42"), SyntaxStatus::Complete);
    }

    #[test]
    fn empty_input_is_complete() {
        assert_eq!(classify(""), SyntaxStatus::Complete);
        assert_eq!(classify("   "), SyntaxStatus::Complete);
    }

    #[test]
    fn block_opener_is_incomplete() {
        assert_eq!(classify("if x:"), SyntaxStatus::Incomplete);
        assert_eq!(classify("def f():"), SyntaxStatus::Incomplete);
        assert_eq!(classify("while True:"), SyntaxStatus::Incomplete);
    }

    #[test]
    fn multiline_requires_blank_final_line() {
        assert_eq!(
            classify("while True:\n    pass"),
            SyntaxStatus::Incomplete
        );
        assert_eq!(classify("while True:\n    pass\n"), SyntaxStatus::Complete);
        assert_eq!(
            classify("def f():\n    return 1\n"),
            SyntaxStatus::Complete
        );
    }

    #[test]
    fn open_bracket_is_incomplete() {
        assert_eq!(classify("xs = [1, 2,"), SyntaxStatus::Incomplete);
        assert_eq!(classify("f(1,"), SyntaxStatus::Incomplete);
    }

    #[test]
    fn stray_closer_is_invalid() {
        assert_eq!(classify("f(1))"), SyntaxStatus::Invalid);
        assert_eq!(classify(")"), SyntaxStatus::Invalid);
    }

    #[test]
    fn trailing_backslash_continues() {
        assert_eq!(classify("x = 1 + \\"), SyntaxStatus::Incomplete);
    }

    #[test]
    fn unterminated_strings() {
        assert_eq!(classify("s = 'abc"), SyntaxStatus::Invalid);
        assert_eq!(classify("s = \"\"\"abc"), SyntaxStatus::Incomplete);
        assert_eq!(classify("s = \"\"\"abc\"\"\""), SyntaxStatus::Complete);
    }

    #[test]
    fn colon_inside_string_or_comment_does_not_open_block() {
        assert_eq!(classify("x = 'a:'"), SyntaxStatus::Complete);
        assert_eq!(classify("x = 1  # trailing colon:"), SyntaxStatus::Complete);
    }

    #[test]
    fn classify_is_idempotent() {
        for src in ["if x:", "print(1)", "f(1))", "s = \"\"\"doc"] {
            assert_eq!(classify(src), classify(src));
        }
    }
}
