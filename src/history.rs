//! Command history for restart-replay state reconstruction.

use crate::output::CommandRecord;

/// Ordered record of successfully completed commands.
///
/// Only meaningful for restart-strategy backends: after a forced restart the
/// stored command texts are replayed in order to reconstruct interpreter
/// state. Failed or interrupted commands are never admitted, so replay can
/// assume every stored command once succeeded.
///
/// Growth is unbounded per session; replay cost grows linearly with it.
#[derive(Debug, Default)]
pub struct CommandHistory {
    records: Vec<CommandRecord>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed command. Records containing an `error`-kind output
    /// are refused, keeping the replay invariant by construction. Returns
    /// whether the record was admitted.
    pub fn record(&mut self, record: CommandRecord) -> bool {
        if record.succeeded() {
            self.records.push(record);
            true
        } else {
            false
        }
    }

    /// Command texts in execution order, for `restoreState` replay.
    pub fn commands(&self) -> Vec<String> {
        self.records.iter().map(|r| r.command.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
