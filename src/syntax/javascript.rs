//! JavaScript statement-completeness heuristic.
//!
//! Bracket counting with full string and comment awareness. Template
//! literals may span lines, so an unterminated backtick string is a valid
//! prefix; single- and double-quoted strings are not and make the input
//! invalid. Also used for typescript input, whose bracket and string
//! grammar is identical.

use crate::output::SyntaxStatus;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum ScanState {
    Code,
    /// Inside a quoted string; the char is the terminating quote.
    Quoted(char),
    Template,
    LineComment,
    BlockComment,
}

/// Classify accumulated JavaScript REPL input.
pub fn classify(source: &str) -> SyntaxStatus {
    if source.trim().is_empty() {
        return SyntaxStatus::Complete;
    }

    let mut depth: i32 = 0;
    let mut state = ScanState::Code;
    let mut last_code_char: Option<char> = None;

    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match state {
            ScanState::Quoted(quote) => {
                if c == '\\' {
                    i += 2;
                    continue;
                }
                if c == quote {
                    state = ScanState::Code;
                } else if c == '\n' {
                    return SyntaxStatus::Invalid;
                }
            }
            ScanState::Template => {
                if c == '\\' {
                    i += 2;
                    continue;
                }
                if c == '`' {
                    state = ScanState::Code;
                }
            }
            ScanState::LineComment => {
                if c == '\n' {
                    state = ScanState::Code;
                }
            }
            ScanState::BlockComment => {
                if c == '*' && chars.get(i + 1) == Some(&'/') {
                    state = ScanState::Code;
                    i += 2;
                    continue;
                }
            }
            ScanState::Code => match c {
                '/' if chars.get(i + 1) == Some(&'/') => {
                    state = ScanState::LineComment;
                    i += 2;
                    continue;
                }
                '/' if chars.get(i + 1) == Some(&'*') => {
                    state = ScanState::BlockComment;
                    i += 2;
                    continue;
                }
                '\'' | '"' => state = ScanState::Quoted(c),
                '`' => state = ScanState::Template,
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
                _ => {
                    if !c.is_whitespace() {
                        last_code_char = Some(c);
                    }
                }
            },
        }
        i += 1;
    }

    match state {
        ScanState::Quoted(_) => return SyntaxStatus::Invalid,
        // Templates and block comments legitimately span lines.
        ScanState::Template | ScanState::BlockComment => return SyntaxStatus::Incomplete,
        ScanState::Code | ScanState::LineComment => {}
    }

    if depth > 0 {
        return SyntaxStatus::Incomplete;
    }
    // A dangling infix operator or comma expects a continuation line.
    if matches!(
        last_code_char,
        Some(',' | '+' | '-' | '*' | '=' | '<' | '>' | '&' | '|' | '.')
    ) {
        return SyntaxStatus::Incomplete;
    }
    SyntaxStatus::Complete
}
