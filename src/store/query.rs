//! List query parameters for tree entries
//!
//! Parses raw query-string pairs into a typed filter and produces the
//! canonical encoding used to derive list cache keys.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::error::FieldErrors;
use crate::models::requests::parse_date;
use crate::models::TreeEntry;

pub const PARAM_SPECIES: &str = "species";
pub const PARAM_OWNER: &str = "user__username";
pub const PARAM_DATE: &str = "date_planted";
pub const PARAM_SEARCH: &str = "search";
pub const PARAM_ORDERING: &str = "ordering";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeOrdering {
    DatePlantedAsc,
    #[default]
    DatePlantedDesc,
    SpeciesAsc,
    SpeciesDesc,
}

impl TreeOrdering {
    /// Parses an `ordering` value; unknown fields yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "date_planted" => Some(Self::DatePlantedAsc),
            "-date_planted" => Some(Self::DatePlantedDesc),
            "species" => Some(Self::SpeciesAsc),
            "-species" => Some(Self::SpeciesDesc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DatePlantedAsc => "date_planted",
            Self::DatePlantedDesc => "-date_planted",
            Self::SpeciesAsc => "species",
            Self::SpeciesDesc => "-species",
        }
    }

    /// Orders two entries; ties fall back to newest id first.
    pub fn compare(self, a: &TreeEntry, b: &TreeEntry) -> std::cmp::Ordering {
        let primary = match self {
            Self::DatePlantedAsc => a.fields.date_planted.cmp(&b.fields.date_planted),
            Self::DatePlantedDesc => b.fields.date_planted.cmp(&a.fields.date_planted),
            Self::SpeciesAsc => a.fields.species.cmp(&b.fields.species),
            Self::SpeciesDesc => b.fields.species.cmp(&a.fields.species),
        };
        primary.then_with(|| b.id.cmp(&a.id))
    }
}

/// Filters, search and ordering for a tree list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeQuery {
    pub species: Option<String>,
    pub owner_username: Option<String>,
    pub date_planted: Option<NaiveDate>,
    pub search: Option<String>,
    pub ordering: TreeOrdering,
}

impl TreeQuery {
    /// Builds a query from raw query-string pairs.
    ///
    /// Empty values and unknown parameters are ignored. An unparsable
    /// `date_planted` filter is a validation error.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, FieldErrors> {
        let value = |name: &str| {
            params
                .get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let date_planted = match value(PARAM_DATE) {
            Some(raw) => match parse_date(&raw) {
                Some(date) => Some(date),
                None => return Err(FieldErrors::single(PARAM_DATE, "Enter a valid date.")),
            },
            None => None,
        };

        Ok(Self {
            species: value(PARAM_SPECIES),
            owner_username: value(PARAM_OWNER),
            date_planted,
            search: value(PARAM_SEARCH),
            ordering: value(PARAM_ORDERING)
                .and_then(|raw| TreeOrdering::parse(&raw))
                .unwrap_or_default(),
        })
    }

    /// Canonical `name=value&...` encoding, sorted by name.
    ///
    /// Two requests that select the same rows in the same order encode
    /// identically, whatever the order or spelling of their raw parameters.
    pub fn canonical(&self) -> String {
        let mut pairs: BTreeMap<&str, String> = BTreeMap::new();
        if let Some(species) = &self.species {
            pairs.insert(PARAM_SPECIES, species.clone());
        }
        if let Some(owner) = &self.owner_username {
            pairs.insert(PARAM_OWNER, owner.clone());
        }
        if let Some(date) = &self.date_planted {
            pairs.insert(PARAM_DATE, date.to_string());
        }
        if let Some(search) = &self.search {
            pairs.insert(PARAM_SEARCH, search.to_lowercase());
        }
        pairs.insert(PARAM_ORDERING, self.ordering.as_str().to_string());

        pairs
            .into_iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// True when `entry` passes every filter and the search term.
    pub fn matches(&self, entry: &TreeEntry) -> bool {
        if let Some(species) = &self.species {
            if &entry.fields.species != species {
                return false;
            }
        }
        if let Some(owner) = &self.owner_username {
            if &entry.owner_username != owner {
                return false;
            }
        }
        if let Some(date) = &self.date_planted {
            if &entry.fields.date_planted != date {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let hit = entry.fields.species.to_lowercase().contains(&term)
                || entry.owner_username.to_lowercase().contains(&term);
            if !hit {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let query = TreeQuery::from_params(&HashMap::new()).unwrap();
        assert_eq!(query, TreeQuery::default());
        assert_eq!(query.ordering, TreeOrdering::DatePlantedDesc);
        assert_eq!(query.canonical(), "ordering=-date_planted");
    }

    #[test]
    fn test_empty_and_unknown_params_ignored() {
        let a = TreeQuery::from_params(&params(&[("species", ""), ("page_size", "10")])).unwrap();
        assert_eq!(a, TreeQuery::default());
    }

    #[test]
    fn test_unknown_ordering_falls_back_to_default() {
        let query = TreeQuery::from_params(&params(&[("ordering", "latitude")])).unwrap();
        assert_eq!(query.ordering, TreeOrdering::DatePlantedDesc);
    }

    #[test]
    fn test_canonical_is_sorted_and_stable() {
        let query = TreeQuery::from_params(&params(&[
            ("species", "Oak"),
            ("search", "ALI"),
            ("ordering", "species"),
        ]))
        .unwrap();
        assert_eq!(query.canonical(), "ordering=species&search=ali&species=Oak");
    }

    #[test]
    fn test_invalid_date_filter() {
        let errors = TreeQuery::from_params(&params(&[("date_planted", "yesterday")])).unwrap_err();
        assert!(errors.contains("date_planted"));
    }
}
