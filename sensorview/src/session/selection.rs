use indexmap::IndexSet;

use super::address::NONE_SENTINEL;
use super::catalog::SensorCatalog;

/// Which series a session shows. No explicit choice means every series.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    /// Explicitly nothing.
    None,
    /// Never empty; an emptied list becomes `None`. Never holds the
    /// reserved id `NONE`.
    Ids(IndexSet<String>),
}

impl Selection {
    /// Empty ids and the reserved `NONE` id are dropped; a session address
    /// reads `NONE` as an explicit `None`.
    pub fn ids<I, S>(ids: I) -> Selection
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: IndexSet<String> = ids
            .into_iter()
            .map(Into::into)
            .filter(|id| !id.is_empty() && id != NONE_SENTINEL)
            .collect();
        if set.is_empty() {
            Selection::None
        } else {
            Selection::Ids(set)
        }
    }

    /// Comma-separated ids as written in a session address. Empty means
    /// all, `NONE` means none.
    pub fn parse_list(value: &str) -> Selection {
        let value = value.trim();
        if value.is_empty() {
            Selection::All
        } else if value == NONE_SENTINEL {
            Selection::None
        } else {
            Selection::ids(value.split(',').map(str::trim))
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }

    pub fn contains(&self, id: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::None => false,
            Selection::Ids(ids) => ids.contains(id),
        }
    }

    pub fn len(&self) -> Option<usize> {
        match self {
            Selection::All => None,
            Selection::None => Some(0),
            Selection::Ids(ids) => Some(ids.len()),
        }
    }

    /// Ids for a query; empty means all. `None` has no query at all.
    pub fn query_ids(&self) -> Option<Vec<String>> {
        match self {
            Selection::All => Some(vec![]),
            Selection::None => None,
            Selection::Ids(ids) => Some(ids.iter().cloned().collect()),
        }
    }

    /// Flips one sensor. Deselecting from `All` needs the catalog to know
    /// what remains.
    pub fn toggle(&mut self, id: &str, catalog: &SensorCatalog) {
        let mut ids = match std::mem::take(self) {
            Selection::All => catalog.sensors().map(str::to_string).collect(),
            Selection::None => IndexSet::new(),
            Selection::Ids(ids) => ids,
        };
        if !ids.shift_remove(id) {
            ids.insert(id.to_string());
        }
        *self = Selection::ids(ids);
    }
}
