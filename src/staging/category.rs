//! Category directories inside a session root

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A category directory under a session root
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Staged copies of source files (`input_files`)
    Input,
    /// JSON documents collected from staged input (`collected_jsons`)
    Collected,
    /// Corrected JSON documents (`fixed_jsons`)
    Fixed,
    /// Analysis results (`results`)
    Results,
}

impl Category {
    /// Directory name under the session root
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Input => "input_files",
            Self::Collected => "collected_jsons",
            Self::Fixed => "fixed_jsons",
            Self::Results => "results",
        }
    }

    /// All categories in layout order
    pub fn all() -> &'static [Self] {
        &[Self::Input, Self::Collected, Self::Fixed, Self::Results]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Input => "input",
            Self::Collected => "collected",
            Self::Fixed => "fixed",
            Self::Results => "results",
        };
        write!(f, "{}", name)
    }
}
