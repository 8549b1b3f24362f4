//! Session: the single owner of all calculator state.
//!
//! Every command goes through a `&mut self` method and awaits its request
//! before returning, so responses are applied in the order they were issued.
//! Selection changes trigger a recalculation when the selected providers
//! actually change; an empty selection clears the results without a request.

use std::str::FromStr;

use crate::api::{ApiError, PricingApi};
use crate::cost::CostRequestor;
use crate::grouping::{GroupedProviders, project};
use crate::model::{
    BenchmarkEntry, BenchmarkScore, CostResult, Provider, TokenConfig, parse_cost,
};
use crate::registry::ProviderRegistry;
use crate::sort::{SortController, SortKey};

/// Editable field of the provider form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Model,
    InputCost,
    OutputCost,
}

impl FromStr for FormField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(FormField::Name),
            "model" => Ok(FormField::Model),
            "input" | "inputcost" => Ok(FormField::InputCost),
            "output" | "outputcost" => Ok(FormField::OutputCost),
            other => Err(format!("unknown field '{}'", other)),
        }
    }
}

/// Per-model scores shown after a `bench` request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBenchmarks {
    pub model: String,
    pub scores: Vec<BenchmarkScore>,
}

// What the cost result depends on.
type SelectionSnapshot = (Vec<usize>, Vec<Provider>);

pub struct Session {
    api: Box<dyn PricingApi>,
    registry: ProviderRegistry,
    tokens: TokenConfig,
    costs: CostRequestor,
    sort: SortController,
    table: Vec<BenchmarkEntry>,
    benchmarks: Option<ModelBenchmarks>,
    search: String,
    draft: Provider,
}

impl Session {
    pub fn new(api: Box<dyn PricingApi>, registry: ProviderRegistry, tokens: TokenConfig) -> Self {
        Self {
            api,
            registry,
            tokens,
            costs: CostRequestor::default(),
            sort: SortController::default(),
            table: Vec::new(),
            benchmarks: None,
            search: String::new(),
            draft: Provider::default(),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn tokens(&self) -> TokenConfig {
        self.tokens
    }

    pub fn results(&self) -> &[CostResult] {
        self.costs.results()
    }

    pub fn sort(&self) -> &SortController {
        &self.sort
    }

    pub fn benchmark_table(&self) -> &[BenchmarkEntry] {
        &self.table
    }

    pub fn benchmarks(&self) -> Option<&ModelBenchmarks> {
        self.benchmarks.as_ref()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    /// Current search applied to both halves of the registry.
    pub fn grouped(&self) -> GroupedProviders<'_> {
        project(&self.registry, &self.search)
    }

    /// The form being filled in: the edit buffer while editing, else the draft.
    pub fn form(&self) -> &Provider {
        self.registry
            .edit_state()
            .map(|e| &e.buffer)
            .unwrap_or(&self.draft)
    }

    /// Reload the default providers. A failed fetch empties them.
    pub async fn refresh_pricing(&mut self) -> Result<(), ApiError> {
        let before = self.snapshot();
        let fetched = self.api.pricing().await;
        let (providers, outcome) = match fetched {
            Ok(list) => {
                tracing::info!("loaded {} default provider(s)", list.len());
                (list, Ok(()))
            }
            Err(e) => {
                tracing::warn!("error fetching pricing data: {}", e);
                (Vec::new(), Err(e))
            }
        };
        self.registry.replace_defaults(providers);
        let recalculated = self.after_selection_change(before).await;
        match (outcome, recalculated) {
            (Err(fetch), Err(calc)) => {
                tracing::warn!("recalculation after failed pricing fetch also failed: {}", calc);
                Err(fetch)
            }
            (Ok(()), recalculated) => recalculated,
            (fetch, Ok(())) => fetch,
        }
    }

    /// Fetch the comparison table for the current sort. On failure the
    /// previous table stays.
    pub async fn refresh_benchmark_table(&mut self) -> Result<(), ApiError> {
        match self.api.benchmark_table(self.sort.state()).await {
            Ok(rows) => {
                tracing::debug!("benchmark table: {} row(s)", rows.len());
                self.table = rows;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("error fetching benchmark table: {}", e);
                Err(e)
            }
        }
    }

    pub async fn handle_sort(&mut self, key: SortKey) -> Result<(), ApiError> {
        self.sort.handle_sort(key);
        self.refresh_benchmark_table().await
    }

    /// Scores for one model. A failed fetch shows an empty list.
    pub async fn fetch_benchmarks(&mut self, model: &str) -> Result<(), ApiError> {
        let (scores, outcome) = match self.api.benchmarks(model).await {
            Ok(scores) => (scores, Ok(())),
            Err(e) => {
                tracing::warn!("error fetching benchmarks for {}: {}", model, e);
                (Vec::new(), Err(e))
            }
        };
        self.benchmarks = Some(ModelBenchmarks {
            model: model.to_string(),
            scores,
        });
        outcome
    }

    /// Change token counts. Results are left as they are until `calculate`.
    pub fn set_tokens(&mut self, tokens: TokenConfig) {
        self.tokens = tokens;
    }

    /// Recalculate costs for the current selection and tokens.
    pub async fn calculate(&mut self) -> Result<(), ApiError> {
        let selected = self.registry.selected_providers();
        self.costs
            .calculate(self.api.as_ref(), self.tokens, &selected)
            .await?;
        if !selected.is_empty() {
            self.benchmarks = None;
        }
        Ok(())
    }

    pub async fn toggle(&mut self, indices: &[usize]) -> Result<(), ApiError> {
        let before = self.snapshot();
        for &i in indices {
            if !self.registry.toggle(i) {
                tracing::debug!("toggle ignored for out-of-range index {}", i);
            }
        }
        self.after_selection_change(before).await
    }

    pub async fn select_all(&mut self) -> Result<(), ApiError> {
        let before = self.snapshot();
        self.registry.select_all();
        self.after_selection_change(before).await
    }

    pub async fn deselect_all(&mut self) -> Result<(), ApiError> {
        let before = self.snapshot();
        self.registry.deselect_all();
        self.after_selection_change(before).await
    }

    /// Returns whether a custom provider was removed.
    pub async fn delete(&mut self, index: usize) -> Result<bool, ApiError> {
        let before = self.snapshot();
        let removed = self.registry.delete_provider(index);
        self.after_selection_change(before).await?;
        Ok(removed)
    }

    /// Returns the number of custom providers removed.
    pub async fn delete_selected(&mut self) -> Result<usize, ApiError> {
        let before = self.snapshot();
        let removed = self.registry.delete_selected_providers();
        self.after_selection_change(before).await?;
        Ok(removed)
    }

    /// Append a custom provider directly, bypassing the form.
    pub fn add_provider(&mut self, provider: Provider) -> bool {
        self.registry.add_custom_provider(provider)
    }

    /// Start editing; any half-typed draft is discarded.
    pub fn begin_edit(&mut self, index: usize) -> bool {
        if !self.registry.edit_provider(index) {
            return false;
        }
        self.draft = Provider::default();
        true
    }

    pub fn cancel_edit(&mut self) {
        self.registry.cancel_edit();
        self.draft = Provider::default();
    }

    /// Set one field of the active form. Costs are coerced, never rejected.
    pub fn set_field(&mut self, field: FormField, value: &str) {
        let form = match self.registry.edit_buffer_mut() {
            Some(buffer) => buffer,
            None => &mut self.draft,
        };
        match field {
            FormField::Name => form.name = value.to_string(),
            FormField::Model => form.model = value.to_string(),
            FormField::InputCost => form.input_cost = parse_cost(value),
            FormField::OutputCost => form.output_cost = parse_cost(value),
        }
    }

    /// Save the form: commit the active edit, or add the draft as a new
    /// custom provider. An incomplete form changes nothing.
    pub async fn submit_form(&mut self) -> Result<bool, ApiError> {
        if !self.form().is_complete() {
            tracing::debug!("form submitted without name/model");
            return Ok(false);
        }
        let before = self.snapshot();
        let draft = std::mem::take(&mut self.draft);
        let saved = if self.registry.edit_state().is_some() {
            self.registry.commit_edit()
        } else {
            self.add_provider(draft)
        };
        self.after_selection_change(before).await?;
        Ok(saved)
    }

    fn snapshot(&self) -> SelectionSnapshot {
        let mut indices = self.registry.selection().to_vec();
        indices.sort_unstable();
        (indices, self.registry.selected_providers())
    }

    async fn after_selection_change(&mut self, before: SelectionSnapshot) -> Result<(), ApiError> {
        if self.registry.selection().is_empty() {
            self.costs.clear();
            return Ok(());
        }
        if before == self.snapshot() {
            return Ok(());
        }
        self.calculate().await
    }
}
