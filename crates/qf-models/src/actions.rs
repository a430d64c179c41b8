use serde::{Deserialize, Serialize};

/// Intent of an order from the strategy's perspective.
///
/// Purely descriptive: the matching engine ignores it, but it is persisted
/// with the submission so post-run analysis can classify trades.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Entry,
    EntryLong,
    EntryShort,
    Exit,
    ExitLong,
    ExitShort,
    Add,
    Reduce,
    Reverse,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Entry => "ENTRY",
            ActionType::EntryLong => "ENTRY_LONG",
            ActionType::EntryShort => "ENTRY_SHORT",
            ActionType::Exit => "EXIT",
            ActionType::ExitLong => "EXIT_LONG",
            ActionType::ExitShort => "EXIT_SHORT",
            ActionType::Add => "ADD",
            ActionType::Reduce => "REDUCE",
            ActionType::Reverse => "REVERSE",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
