//! Sort intent for the benchmark comparison table.
//!
//! The table is sorted by the backend; this controller only tracks which
//! column and direction were requested.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Benchmark table columns understood by the backend.
///
/// Unrecognised keys are carried through verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortKey {
    Organization,
    Name,
    License,
    Parameters,
    Context,
    InputCost,
    OutputCost,
    Gpqa,
    Mmlu,
    MmluPro,
    Drop,
    HumanEval,
    Multimodal,
    Other(String),
}

impl SortKey {
    /// Known columns in table order.
    pub const COLUMNS: [SortKey; 13] = [
        SortKey::Organization,
        SortKey::Name,
        SortKey::License,
        SortKey::Parameters,
        SortKey::Context,
        SortKey::InputCost,
        SortKey::OutputCost,
        SortKey::Gpqa,
        SortKey::Mmlu,
        SortKey::MmluPro,
        SortKey::Drop,
        SortKey::HumanEval,
        SortKey::Multimodal,
    ];

    /// Value sent as the `sort_key` query parameter.
    pub fn as_str(&self) -> &str {
        match self {
            SortKey::Organization => "organization",
            SortKey::Name => "name",
            SortKey::License => "license",
            SortKey::Parameters => "parameters",
            SortKey::Context => "context",
            SortKey::InputCost => "inputCost",
            SortKey::OutputCost => "outputCost",
            SortKey::Gpqa => "GPQA",
            SortKey::Mmlu => "MMLU",
            SortKey::MmluPro => "MMLUPro",
            SortKey::Drop => "DROP",
            SortKey::HumanEval => "HumanEval",
            SortKey::Multimodal => "multimodal",
            SortKey::Other(raw) => raw.as_str(),
        }
    }

    /// Column heading used when rendering the table.
    pub fn title(&self) -> &str {
        match self {
            SortKey::Organization => "Organization",
            SortKey::Name => "Model",
            SortKey::License => "License",
            SortKey::Parameters => "Parameters (B)",
            SortKey::Context => "Context",
            SortKey::InputCost => "Input $/M",
            SortKey::OutputCost => "Output $/M",
            SortKey::Gpqa => "GPQA",
            SortKey::Mmlu => "MMLU",
            SortKey::MmluPro => "MMLU Pro",
            SortKey::Drop => "DROP",
            SortKey::HumanEval => "HumanEval",
            SortKey::Multimodal => "Multimodal",
            SortKey::Other(raw) => raw.as_str(),
        }
    }

    /// Dataset name used to look the score up in a row's metrics.
    pub fn dataset(&self) -> Option<&'static str> {
        match self {
            SortKey::Gpqa => Some("GPQA"),
            SortKey::Mmlu => Some("MMLU"),
            SortKey::MmluPro => Some("MMLU-Pro"),
            SortKey::Drop => Some("DROP"),
            SortKey::HumanEval => Some("HumanEval"),
            _ => None,
        }
    }
}

impl FromStr for SortKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let known = SortKey::COLUMNS
            .iter()
            .find(|k| {
                k.as_str().eq_ignore_ascii_case(s)
                    || (matches!(k, SortKey::MmluPro) && s.eq_ignore_ascii_case("mmlu-pro"))
            })
            .cloned();
        Ok(known.unwrap_or_else(|| SortKey::Other(s.to_string())))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            key: SortKey::Name,
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SortController {
    state: SortState,
}

impl SortController {
    pub fn state(&self) -> &SortState {
        &self.state
    }

    /// Same key flips the direction; a new key starts descending.
    pub fn handle_sort(&mut self, key: SortKey) -> &SortState {
        if key == self.state.key {
            self.state.direction = self.state.direction.flipped();
        } else {
            self.state.key = key;
            self.state.direction = SortDirection::Desc;
        }
        tracing::debug!(
            "benchmark sort -> {} {}",
            self.state.key,
            self.state.direction.as_str()
        );
        &self.state
    }

    /// Header arrow for `key`: the active column shows its direction.
    pub fn arrow(&self, key: &SortKey) -> &'static str {
        if *key == self.state.key && self.state.direction == SortDirection::Asc {
            "▲"
        } else {
            "▼"
        }
    }
}
