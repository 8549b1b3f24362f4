use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// One pricing entry. Costs are in currency units per million tokens.
///
/// Field names follow the backend's `custom_providers` contract, which is also
/// the layout written to the local store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Provider {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(rename = "inputCost", default, deserialize_with = "lenient_cost")]
    pub input_cost: f64,
    #[serde(rename = "outputCost", default, deserialize_with = "lenient_cost")]
    pub output_cost: f64,
}

impl Provider {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        input_cost: f64,
        output_cost: f64,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            input_cost,
            output_cost,
        }
    }

    /// Both `name` and `model` are required before a provider can be stored.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.model.is_empty()
    }
}

// Costs may arrive as numbers, numeric strings, or null.
fn lenient_cost<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<JsonValue>::deserialize(deserializer)?;
    let value = match raw {
        Some(JsonValue::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if value.is_finite() { value.max(0.0) } else { 0.0 })
}

/// Which half of the registry a provider lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderSource {
    /// Sourced from the remote pricing feed; read-only.
    Default,
    /// Authored locally; fully mutable and persisted.
    Custom,
}

impl ProviderSource {
    pub fn label(self) -> &'static str {
        match self {
            ProviderSource::Default => "Default Providers",
            ProviderSource::Custom => "Custom Providers",
        }
    }
}

/// Token counts used for a cost calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub input: u64,
    pub output: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            input: 1000,
            output: 500,
        }
    }
}

/// One computed cost row returned by the calculation service.
///
/// `total_cost` is taken as returned and never recomputed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostResult {
    pub provider: String,
    pub model: String,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

/// Named qualitative score attached to a benchmark table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitativeMetric {
    pub dataset_name: String,
    pub score: f64,
}

/// One row of the model comparison table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub param_count: Option<f64>,
    #[serde(default)]
    pub input_context_size: Option<f64>,
    #[serde(rename = "inputCost", default)]
    pub input_cost: Option<f64>,
    #[serde(rename = "outputCost", default)]
    pub output_cost: Option<f64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub qualitative_metrics: Vec<QualitativeMetric>,
    #[serde(default)]
    pub multimodal: Option<bool>,
}

impl BenchmarkEntry {
    /// Score for `dataset`, matched case-insensitively on `dataset_name`.
    pub fn metric(&self, dataset: &str) -> Option<f64> {
        self.qualitative_metrics
            .iter()
            .find(|m| m.dataset_name.eq_ignore_ascii_case(dataset))
            .map(|m| m.score)
    }

    pub fn is_multimodal(&self) -> bool {
        self.multimodal.unwrap_or(false)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<QualitativeMetric>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<QualitativeMetric>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Per-model benchmark score from `GET /benchmarks/{model}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkScore {
    pub dataset_name: String,
    pub score: f64,
    #[serde(default)]
    pub date_recorded: Option<String>,
}
