//! Plain-text views of session state for the shell.

use std::fmt::Write as _;

use crate::grouping::{GroupedProviders, ProviderGroup};
use crate::model::{
    BenchmarkEntry, CostResult, Provider, ProviderSource, TokenConfig, format_thousands,
};
use crate::registry::ProviderRegistry;
use crate::session::ModelBenchmarks;
use crate::sort::{SortController, SortKey};

const MISSING: &str = "-";

/// Both provider sections with their groups.
pub fn providers(view: &GroupedProviders<'_>, registry: &ProviderRegistry) -> String {
    let mut out = String::new();
    let editing = registry
        .edit_state()
        .map(|e| registry.defaults().len() + e.custom_index);
    for (source, groups) in [
        (ProviderSource::Default, &view.default),
        (ProviderSource::Custom, &view.custom),
    ] {
        let _ = writeln!(out, "{}", source.label());
        if groups.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for group in groups {
            provider_group(&mut out, group, registry, editing);
        }
    }
    let _ = write!(
        out,
        "{} of {} selected",
        registry.selection().len(),
        registry.len()
    );
    out
}

fn provider_group(
    out: &mut String,
    group: &ProviderGroup<'_>,
    registry: &ProviderRegistry,
    editing: Option<usize>,
) {
    let _ = writeln!(out, "  {}", group.key);
    for item in &group.providers {
        let idx = item.original_index;
        let mark = if registry.is_selected(idx) { "x" } else { " " };
        let _ = write!(
            out,
            "    [{}] #{:<3} {} ({})  in ${:.2}/M  out ${:.2}/M",
            mark,
            idx,
            item.provider.name,
            item.provider.model,
            item.provider.input_cost,
            item.provider.output_cost
        );
        if editing == Some(idx) {
            out.push_str("  (editing)");
        }
        out.push('\n');
    }
}

pub fn tokens(tokens: TokenConfig) -> String {
    format!(
        "input tokens: {}  output tokens: {}",
        format_thousands(tokens.input),
        format_thousands(tokens.output)
    )
}

/// Current form values; `editing` switches the heading.
pub fn form(provider: &Provider, editing: bool) -> String {
    let heading = if editing {
        "Edit Custom Provider"
    } else {
        "Add Custom Provider"
    };
    format!(
        "{}: name='{}' model='{}' input=${:.2}/M output=${:.2}/M",
        heading, provider.name, provider.model, provider.input_cost, provider.output_cost
    )
}

/// Label for a total relative to the cheapest total.
pub fn cost_label(total: f64, cheapest: f64) -> String {
    if total == cheapest {
        return "(Cheapest)".to_string();
    }
    if cheapest <= 0.0 {
        return "(more expensive)".to_string();
    }
    format!("({:.2}x more expensive)", total / cheapest)
}

pub fn results(rows: &[CostResult]) -> String {
    if rows.is_empty() {
        return "no results".to_string();
    }
    let cheapest = rows
        .iter()
        .map(|r| r.total_cost)
        .fold(f64::INFINITY, f64::min);
    let header = ["Provider", "Model", "Total", "Input", "Output", "Relative"]
        .map(String::from)
        .to_vec();
    let body = rows
        .iter()
        .map(|r| {
            vec![
                r.provider.clone(),
                r.model.clone(),
                format!("${:.5}", r.total_cost),
                format!("${:.5}", r.input_cost),
                format!("${:.5}", r.output_cost),
                cost_label(r.total_cost, cheapest),
            ]
        })
        .collect::<Vec<_>>();
    table(&header, &body)
}

/// Metric cell: score as a percentage with one decimal.
pub fn metric_cell(entry: &BenchmarkEntry, dataset: &str) -> String {
    entry
        .metric(dataset)
        .map(|s| format!("{:.1}%", s * 100.0))
        .unwrap_or_else(|| MISSING.to_string())
}

fn entry_cell(entry: &BenchmarkEntry, key: &SortKey) -> String {
    let text = |v: &Option<String>| {
        v.as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(MISSING)
            .to_string()
    };
    let money = |v: Option<f64>| {
        v.filter(|c| c.is_finite())
            .map(|c| format!("${:.2}", c))
            .unwrap_or_else(|| MISSING.to_string())
    };
    match key {
        SortKey::Organization => text(&entry.organization),
        SortKey::Name => text(&entry.name),
        SortKey::License => text(&entry.license),
        SortKey::Parameters => entry
            .param_count
            .filter(|n| n.is_finite() && *n != 0.0)
            .map(|n| format!("{:.0}", n / 1e9))
            .unwrap_or_else(|| MISSING.to_string()),
        SortKey::Context => entry
            .input_context_size
            .filter(|n| n.is_finite() && *n > 0.0)
            .map(|n| format_thousands(n.round() as u64))
            .unwrap_or_else(|| MISSING.to_string()),
        SortKey::InputCost => money(entry.input_cost),
        SortKey::OutputCost => money(entry.output_cost),
        SortKey::Multimodal => {
            if entry.is_multimodal() {
                "✓".to_string()
            } else {
                MISSING.to_string()
            }
        }
        other => other
            .dataset()
            .map(|d| metric_cell(entry, d))
            .unwrap_or_else(|| MISSING.to_string()),
    }
}

/// Comparison table with a sort arrow on every heading.
pub fn benchmark_table(rows: &[BenchmarkEntry], sort: &SortController) -> String {
    let header = SortKey::COLUMNS
        .iter()
        .map(|k| format!("{}{}", k.title(), sort.arrow(k)))
        .collect::<Vec<_>>();
    if rows.is_empty() {
        return format!("{}\nno benchmark data", header.join(" | "));
    }
    let body = rows
        .iter()
        .map(|entry| {
            SortKey::COLUMNS
                .iter()
                .map(|k| entry_cell(entry, k))
                .collect()
        })
        .collect::<Vec<Vec<String>>>();
    table(&header, &body)
}

pub fn benchmark_scores(benchmarks: &ModelBenchmarks) -> String {
    if benchmarks.scores.is_empty() {
        return format!("no benchmarks for {}", benchmarks.model);
    }
    let mut out = format!("Performance Benchmarks ({}):", benchmarks.model);
    for score in &benchmarks.scores {
        let _ = write!(
            out,
            "\n  {}: {}%\n    Tested on {}",
            score.dataset_name,
            (score.score * 100.0).round(),
            score.date_recorded.as_deref().unwrap_or(MISSING)
        );
    }
    out
}

// Left-aligned columns separated by " | ".
fn table(header: &[String], body: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in body {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };
    let mut out = line(header);
    for row in body {
        out.push('\n');
        out.push_str(&line(row.as_slice()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::project;
    use crate::model::{BenchmarkScore, QualitativeMetric};
    use crate::store::MemoryStore;

    fn row(provider: &str, total: f64) -> CostResult {
        CostResult {
            provider: provider.into(),
            model: format!("{}/m", provider),
            input_cost: total / 2.0,
            output_cost: total / 2.0,
            total_cost: total,
        }
    }

    #[test]
    fn cheapest_and_multipliers() {
        let out = results(&[row("A", 0.002), row("B", 0.001), row("C", 0.003)]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("$0.00200"));
        assert!(lines[1].ends_with("(2.00x more expensive)"));
        assert!(lines[2].ends_with("(Cheapest)"));
        assert!(lines[3].ends_with("(3.00x more expensive)"));
    }

    #[test]
    fn zero_cheapest_does_not_divide() {
        assert_eq!(cost_label(0.0, 0.0), "(Cheapest)");
        assert_eq!(cost_label(1.0, 0.0), "(more expensive)");
        assert_eq!(results(&[]), "no results");
    }

    #[test]
    fn benchmark_cells() {
        let entry = BenchmarkEntry {
            organization: Some("Mistral".into()),
            name: Some("Mixtral".into()),
            license: None,
            param_count: Some(46_700_000_000.0),
            input_context_size: Some(32768.0),
            input_cost: Some(0.7),
            output_cost: None,
            qualitative_metrics: vec![QualitativeMetric {
                dataset_name: "mmlu".into(),
                score: 0.706,
            }],
            multimodal: Some(true),
        };
        assert_eq!(entry_cell(&entry, &SortKey::Parameters), "47");
        assert_eq!(entry_cell(&entry, &SortKey::Context), "32,768");
        assert_eq!(entry_cell(&entry, &SortKey::InputCost), "$0.70");
        assert_eq!(entry_cell(&entry, &SortKey::OutputCost), "-");
        assert_eq!(entry_cell(&entry, &SortKey::License), "-");
        assert_eq!(entry_cell(&entry, &SortKey::Mmlu), "70.6%");
        assert_eq!(entry_cell(&entry, &SortKey::Gpqa), "-");
        assert_eq!(entry_cell(&entry, &SortKey::Multimodal), "✓");
        assert_eq!(entry_cell(&BenchmarkEntry::default(), &SortKey::Multimodal), "-");
    }

    #[test]
    fn table_headings_carry_arrows() {
        let mut sort = SortController::default();
        sort.handle_sort(SortKey::License);
        sort.handle_sort(SortKey::License);
        let out = benchmark_table(&[], &sort);
        assert!(out.starts_with("Organization▼ | Model▼ | License▲ |"));
        assert!(out.ends_with("no benchmark data"));

        let rows = vec![BenchmarkEntry {
            name: Some("m".into()),
            ..BenchmarkEntry::default()
        }];
        assert_eq!(benchmark_table(&rows, &sort).lines().count(), 2);
    }

    #[test]
    fn scores_show_percent_and_date() {
        let shown = ModelBenchmarks {
            model: "openai/gpt-4".into(),
            scores: vec![BenchmarkScore {
                dataset_name: "MMLU".into(),
                score: 0.864,
                date_recorded: Some("2024-05-01".into()),
            }],
        };
        let out = benchmark_scores(&shown);
        assert!(out.contains("MMLU: 86%"));
        assert!(out.contains("Tested on 2024-05-01"));
        let empty = ModelBenchmarks {
            model: "x".into(),
            scores: vec![],
        };
        assert_eq!(benchmark_scores(&empty), "no benchmarks for x");
    }

    #[test]
    fn provider_sections_mark_selection_and_edit() {
        let store = MemoryStore::with_providers(vec![Provider::new("Mine", "local/mine", 1.0, 2.0)]);
        let mut reg = ProviderRegistry::load(Box::new(store));
        reg.replace_defaults(vec![Provider::new("OpenAI", "openai/gpt-4", 5.0, 15.0)]);
        reg.toggle(0);
        reg.edit_provider(1);

        let out = providers(&project(&reg, ""), &reg);
        assert!(out.starts_with("Default Providers\n  openai\n    [x] #0"));
        assert!(out.contains("Custom Providers\n  local\n    [ ] #1"));
        assert!(out.contains("in $1.00/M  out $2.00/M  (editing)"));
        assert!(out.ends_with("1 of 2 selected"));

        let out = providers(&project(&reg, "zzz"), &reg);
        assert!(out.contains("Default Providers\n  (none)\nCustom Providers\n  (none)"));
    }

    #[test]
    fn tokens_and_form() {
        assert_eq!(
            tokens(TokenConfig {
                input: 12_500,
                output: 500
            }),
            "input tokens: 12,500  output tokens: 500"
        );
        let f = form(&Provider::new("n", "m", 1.5, 0.0), true);
        assert_eq!(f, "Edit Custom Provider: name='n' model='m' input=$1.50/M output=$0.00/M");
    }
}
