//! Provider registry: default and custom providers behind one index space.
//!
//! The registry is addressed by position in the concatenation
//! `defaults ++ custom`. Indices below `defaults.len()` are read-only default
//! providers; the rest map to `custom[index - defaults.len()]`.
//!
//! The selection set lives here as well, so every mutation that can shift
//! indices rewrites the selection in the same call. Out-of-range indices are
//! ignored everywhere.

use crate::model::{Provider, ProviderSource};
use crate::store::ProviderStore;

/// Active edit: a working copy of one custom provider.
#[derive(Debug, Clone, PartialEq)]
pub struct EditState {
    /// Index into the custom list (not the registry).
    pub custom_index: usize,
    pub buffer: Provider,
}

pub struct ProviderRegistry {
    defaults: Vec<Provider>,
    custom: Vec<Provider>,
    /// Selected registry indices, unique, in the order they were selected.
    selection: Vec<usize>,
    edit: Option<EditState>,
    store: Box<dyn ProviderStore>,
}

impl ProviderRegistry {
    /// Create a registry with the custom list read from `store`.
    ///
    /// A store that fails to load starts the registry empty.
    pub fn load(store: Box<dyn ProviderStore>) -> Self {
        let custom = match store.load() {
            Ok(list) => {
                tracing::debug!("loaded {} custom provider(s)", list.len());
                list
            }
            Err(e) => {
                tracing::warn!("failed to load custom providers: {} (starting empty)", e);
                Vec::new()
            }
        };
        Self {
            defaults: Vec::new(),
            custom,
            selection: Vec::new(),
            edit: None,
            store,
        }
    }

    pub fn len(&self) -> usize {
        self.defaults.len() + self.custom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn defaults(&self) -> &[Provider] {
        &self.defaults
    }

    pub fn custom(&self) -> &[Provider] {
        &self.custom
    }

    pub fn get(&self, index: usize) -> Option<(ProviderSource, &Provider)> {
        let dlen = self.defaults.len();
        if index < dlen {
            Some((ProviderSource::Default, &self.defaults[index]))
        } else {
            self.custom
                .get(index - dlen)
                .map(|p| (ProviderSource::Custom, p))
        }
    }

    pub fn selection(&self) -> &[usize] {
        &self.selection
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selection.contains(&index)
    }

    /// Selected providers in registry order.
    pub fn selected_providers(&self) -> Vec<Provider> {
        self.defaults
            .iter()
            .chain(self.custom.iter())
            .enumerate()
            .filter(|(i, _)| self.selection.contains(i))
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn edit_state(&self) -> Option<&EditState> {
        self.edit.as_ref()
    }

    pub fn edit_buffer_mut(&mut self) -> Option<&mut Provider> {
        self.edit.as_mut().map(|e| &mut e.buffer)
    }

    /// Replace the default providers wholesale.
    ///
    /// Selected custom indices are remapped onto the new offset. Selected
    /// default indices are kept only if the default list is unchanged, since
    /// positions in a different feed say nothing about identity. An active
    /// edit is left alone; it addresses the custom list. Returns true if the
    /// selection changed.
    pub fn replace_defaults(&mut self, providers: Vec<Provider>) -> bool {
        if providers == self.defaults {
            return false;
        }
        let old_dlen = self.defaults.len();
        let new_dlen = providers.len();
        self.defaults = providers;

        let before = self.selection.clone();
        self.selection = before
            .iter()
            .filter(|&&i| i >= old_dlen)
            .map(|&i| i - old_dlen + new_dlen)
            .collect();
        tracing::debug!(
            "default providers replaced ({} -> {}), selection {:?} -> {:?}",
            old_dlen,
            new_dlen,
            before,
            self.selection
        );
        before != self.selection
    }

    /// Append a custom provider. Missing `name` or `model` is a no-op.
    pub fn add_custom_provider(&mut self, input: Provider) -> bool {
        if !input.is_complete() {
            tracing::debug!("ignoring custom provider without name/model");
            return false;
        }
        self.custom.push(input);
        self.persist();
        true
    }

    /// Start editing the provider at `index`.
    ///
    /// Only custom providers can be edited; default or out-of-range indices
    /// leave the current edit state untouched.
    pub fn edit_provider(&mut self, index: usize) -> bool {
        let dlen = self.defaults.len();
        if index < dlen {
            tracing::warn!("cannot edit default provider at index {}", index);
            return false;
        }
        let Some(p) = self.custom.get(index - dlen) else {
            return false;
        };
        self.edit = Some(EditState {
            custom_index: index - dlen,
            buffer: p.clone(),
        });
        true
    }

    /// Write the edit buffer back to its custom slot and end the edit.
    pub fn commit_edit(&mut self) -> bool {
        let Some(edit) = self.edit.take() else {
            return false;
        };
        let Some(slot) = self.custom.get_mut(edit.custom_index) else {
            return false;
        };
        *slot = edit.buffer;
        self.persist();
        true
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }

    /// Delete the provider at `index`.
    ///
    /// Default providers are never removed, but the selection is shifted as
    /// if a single entry at `index` had been removed in either case. Returns
    /// true if a custom provider was removed.
    pub fn delete_provider(&mut self, index: usize) -> bool {
        if index >= self.len() {
            return false;
        }
        let dlen = self.defaults.len();
        let removed = if index < dlen {
            tracing::warn!("cannot delete default provider at index {}", index);
            false
        } else {
            self.custom.remove(index - dlen);
            self.shift_edit(&[index - dlen]);
            self.persist();
            true
        };
        self.selection = self
            .selection
            .iter()
            .filter(|&&i| i != index)
            .map(|&i| if i > index { i - 1 } else { i })
            .collect();
        removed
    }

    /// Delete every selected custom provider in one batch.
    ///
    /// Selected default providers stay selected; surviving indices shift down
    /// by the number of deleted entries before them. Returns the number of
    /// providers removed.
    pub fn delete_selected_providers(&mut self) -> usize {
        let dlen = self.defaults.len();
        let total = self.len();
        let mut doomed: Vec<usize> = self
            .selection
            .iter()
            .filter(|&&i| i >= dlen && i < total)
            .map(|&i| i - dlen)
            .collect();
        doomed.sort_unstable();
        doomed.dedup();
        if doomed.is_empty() {
            return 0;
        }

        let mut pos = 0;
        self.custom.retain(|_| {
            let keep = doomed.binary_search(&pos).is_err();
            pos += 1;
            keep
        });
        self.shift_edit(&doomed);

        self.selection = self
            .selection
            .iter()
            .filter(|&&i| i < dlen || doomed.binary_search(&(i - dlen)).is_err())
            .map(|&i| {
                let before = doomed.partition_point(|&c| c + dlen < i);
                i - before
            })
            .collect();
        self.persist();
        doomed.len()
    }

    pub fn select_all(&mut self) {
        self.selection = (0..self.len()).collect();
    }

    pub fn deselect_all(&mut self) {
        self.selection.clear();
    }

    /// Flip membership of `index` in the selection.
    pub fn toggle(&mut self, index: usize) -> bool {
        if index >= self.len() {
            return false;
        }
        if let Some(pos) = self.selection.iter().position(|&i| i == index) {
            self.selection.remove(pos);
        } else {
            self.selection.push(index);
        }
        true
    }

    // Keep the edit pointed at the same provider after custom removals
    // (`removed` is sorted); drop it if that provider is gone.
    fn shift_edit(&mut self, removed: &[usize]) {
        let Some(edit) = self.edit.as_mut() else {
            return;
        };
        if removed.binary_search(&edit.custom_index).is_ok() {
            tracing::debug!("provider under edit was deleted; cancelling edit");
            self.edit = None;
            return;
        }
        edit.custom_index -= removed.partition_point(|&r| r < edit.custom_index);
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.custom) {
            tracing::warn!("failed to persist custom providers: {}", e);
        }
    }
}
