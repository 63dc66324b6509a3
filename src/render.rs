//! Terminal rendering of output records.
//!
//! The record kinds map to a fixed color scheme: errors red, filtered
//! traces blue italic, system notices dim. Stdout/stderr/return print
//! plain, with the language's return prefix (irb's `=> `) prepended to
//! `return` records when the language defines one.

use crate::output::{Output, OutputKind};
use crossterm::style::Stylize;

pub struct Renderer {
    color: bool,
    return_prefix: Option<&'static str>,
}

impl Renderer {
    pub fn new(color: bool, return_prefix: Option<&'static str>) -> Self {
        Self {
            color,
            return_prefix,
        }
    }

    pub fn outputs(&self, outputs: &[Output]) {
        for output in outputs {
            self.output(output);
        }
    }

    pub fn output(&self, output: &Output) {
        let message = match (output.kind, self.return_prefix) {
            (OutputKind::Return, Some(prefix)) => format!("{prefix}{}", output.message),
            _ => output.message.clone(),
        };
        if !self.color {
            println!("{message}");
            return;
        }
        match output.kind {
            OutputKind::Error => println!("{}", message.red()),
            OutputKind::Trace => println!("{}", message.blue().italic()),
            OutputKind::System => println!("{}", message.dim()),
            OutputKind::Stdout | OutputKind::Stderr | OutputKind::Return => {
                println!("{message}");
            }
        }
    }

    pub fn error(&self, message: &str) {
        if self.color {
            eprintln!("{}", message.to_string().red());
        } else {
            eprintln!("{message}");
        }
    }

    pub fn system(&self, message: &str) {
        if self.color {
            println!("{}", message.to_string().dim());
        } else {
            println!("{message}");
        }
    }
}
