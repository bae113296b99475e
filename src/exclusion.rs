use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalMod {
    pub label: &'static str,
    pub file_name: &'static str,
}

/// Mods the user may opt out of, in the order they are offered as "1" and "2".
pub const OPTIONAL_MODS: [OptionalMod; 2] = [
    OptionalMod {
        label: "Xaero's Minimap",
        file_name: "Xaeros_Minimap.jar",
    },
    OptionalMod {
        label: "Xaero's World Map",
        file_name: "XaerosWorldMap.jar",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    All,
    None,
    OnlyFirst,
    OnlySecond,
    Invalid,
}

impl SelectionMode {
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "all" => SelectionMode::All,
            "none" => SelectionMode::None,
            "1" => SelectionMode::OnlyFirst,
            "2" => SelectionMode::OnlySecond,
            _ => SelectionMode::Invalid,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    pub excluded: BTreeSet<String>,
    pub unrecognized: bool,
}

impl ExclusionSet {
    /// Desired remote set with the excluded names taken out.
    pub fn apply(&self, remote: &BTreeSet<String>) -> BTreeSet<String> {
        remote.difference(&self.excluded).cloned().collect()
    }
}

pub fn resolve(mode: SelectionMode) -> ExclusionSet {
    let [first, second] = OPTIONAL_MODS;
    let excluded = match mode {
        SelectionMode::All | SelectionMode::Invalid => Vec::new(),
        SelectionMode::None => vec![first, second],
        SelectionMode::OnlyFirst => vec![second],
        SelectionMode::OnlySecond => vec![first],
    };
    ExclusionSet {
        excluded: excluded
            .into_iter()
            .map(|entry| entry.file_name.to_string())
            .collect(),
        unrecognized: mode == SelectionMode::Invalid,
    }
}
