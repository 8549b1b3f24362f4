//! Read-side projection of the registry: search filter and display groups.
//!
//! Nothing here is cached. Callers rebuild the projection from the registry
//! whenever they render.

use std::collections::HashMap;

use crate::model::Provider;
use crate::registry::ProviderRegistry;

/// A provider annotated with its index in the full registry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedProvider<'a> {
    pub original_index: usize,
    pub provider: &'a Provider,
}

/// Providers sharing a group key, in registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderGroup<'a> {
    pub key: String,
    pub providers: Vec<IndexedProvider<'a>>,
}

/// Filtered and grouped view, one grouping per source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupedProviders<'a> {
    pub default: Vec<ProviderGroup<'a>>,
    pub custom: Vec<ProviderGroup<'a>>,
}

impl GroupedProviders<'_> {
    pub fn is_empty(&self) -> bool {
        self.default.is_empty() && self.custom.is_empty()
    }
}

/// Display bucket for a provider.
///
/// Uses the organisation prefix of `org/model` identifiers (all Mistral
/// spellings fold into `"Mistral"`), then the part of `name` before a `:`,
/// then `name` itself.
pub fn group_key(provider: &Provider) -> String {
    if let Some((prefix, _)) = provider.model.split_once('/') {
        let prefix = prefix.trim();
        if prefix.to_lowercase().contains("mistral") {
            return "Mistral".to_string();
        }
        return prefix.to_string();
    }
    if let Some((head, _)) = provider.name.split_once(':') {
        return head.trim().to_string();
    }
    provider.name.clone()
}

/// Case-insensitive substring match on name or model. Empty query matches.
pub fn matches_query(provider: &Provider, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let q = query.to_lowercase();
    provider.name.to_lowercase().contains(&q) || provider.model.to_lowercase().contains(&q)
}

/// Filter `providers`, tagging survivors with `offset + position`.
pub fn filter_providers<'a>(
    providers: &'a [Provider],
    offset: usize,
    query: &str,
) -> Vec<IndexedProvider<'a>> {
    providers
        .iter()
        .enumerate()
        .filter(|(_, p)| matches_query(p, query))
        .map(|(i, p)| IndexedProvider {
            original_index: offset + i,
            provider: p,
        })
        .collect()
}

/// Bucket by [`group_key`]; groups appear in order of first member.
pub fn group_providers<'a>(items: Vec<IndexedProvider<'a>>) -> Vec<ProviderGroup<'a>> {
    let mut groups: Vec<ProviderGroup<'a>> = Vec::new();
    let mut slot: HashMap<String, usize> = HashMap::new();
    for item in items {
        let key = group_key(item.provider);
        match slot.get(&key) {
            Some(&i) => groups[i].providers.push(item),
            None => {
                slot.insert(key.clone(), groups.len());
                groups.push(ProviderGroup {
                    key,
                    providers: vec![item],
                });
            }
        }
    }
    groups
}

/// Filter and group both halves of the registry independently.
pub fn project<'a>(registry: &'a ProviderRegistry, query: &str) -> GroupedProviders<'a> {
    let dlen = registry.defaults().len();
    GroupedProviders {
        default: group_providers(filter_providers(registry.defaults(), 0, query)),
        custom: group_providers(filter_providers(registry.custom(), dlen, query)),
    }
}
