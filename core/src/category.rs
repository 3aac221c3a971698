/// Export grouping inferred from term names
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Menu,
    Settings,
    Tutorial,
    Gameplay,
    Misc,
}

/// Checked in order; the first rule with a matching keyword wins.
const RULES: &[(Category, &[&str])] = &[
    (Category::Menu, &["menu", "button"]),
    (Category::Settings, &["setting", "option"]),
    (Category::Tutorial, &["tutorial", "help"]),
    (Category::Gameplay, &["game", "play", "level"]),
];

impl Category {
    /// Case-insensitive substring match of the term against each rule.
    /// Terms matching no rule fall into [`Category::Misc`].
    pub fn infer(term: &str) -> Self {
        let lowered = term.to_lowercase();
        RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
            .map(|(category, _)| *category)
            .unwrap_or(Category::Misc)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Menu => "Menu",
            Category::Settings => "Settings",
            Category::Tutorial => "Tutorial",
            Category::Gameplay => "Gameplay",
            Category::Misc => "Misc",
        }
    }

    /// Output file name used by categorized exports.
    pub fn file_name(&self) -> String {
        format!("{}.txt", self.label())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
