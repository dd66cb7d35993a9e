//! Supported genome assemblers.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::NanoAsmError;

/// One of the assembly methods the pipeline can run.
///
/// The declaration order is the order in which enabled assemblers are
/// placed into a stage plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssemblyVariant {
    Flye,
    Raven,
    Miniasm,
}

impl AssemblyVariant {
    /// All variants in plan order.
    pub const ALL: [AssemblyVariant; 3] = [
        AssemblyVariant::Flye,
        AssemblyVariant::Raven,
        AssemblyVariant::Miniasm,
    ];

    /// Capitalised name used in the final renamed output file.
    pub fn display_name(self) -> &'static str {
        match self {
            AssemblyVariant::Flye => "Flye",
            AssemblyVariant::Raven => "Raven",
            AssemblyVariant::Miniasm => "Miniasm",
        }
    }

    /// Lowercase name used in intermediate directory names.
    pub fn dir_name(self) -> &'static str {
        match self {
            AssemblyVariant::Flye => "flye",
            AssemblyVariant::Raven => "raven",
            AssemblyVariant::Miniasm => "miniasm",
        }
    }

    /// Whether racon polishing is available for this assembler.
    pub fn supports_racon(self) -> bool {
        matches!(self, AssemblyVariant::Flye)
    }
}

impl fmt::Display for AssemblyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for AssemblyVariant {
    type Err = NanoAsmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssemblyVariant::ALL
            .into_iter()
            .find(|v| v.dir_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| NanoAsmError::InvalidConfig(format!("unknown assembler '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Flye".parse::<AssemblyVariant>().unwrap(), AssemblyVariant::Flye);
        assert_eq!("RAVEN".parse::<AssemblyVariant>().unwrap(), AssemblyVariant::Raven);
        assert_eq!(" miniasm ".parse::<AssemblyVariant>().unwrap(), AssemblyVariant::Miniasm);
        assert!("canu".parse::<AssemblyVariant>().is_err());
    }

    #[test]
    fn test_order_matches_all() {
        let mut sorted = AssemblyVariant::ALL;
        sorted.sort();
        assert_eq!(sorted, AssemblyVariant::ALL);
    }
}
