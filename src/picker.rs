//! Autocomplete-driven selection of one route endpoint.

use std::fmt;

use crate::error::{Error, Result};
use crate::traits::{Place, PlacesProvider, Suggestion};

/// Queries shorter than this never reach the provider.
pub const MIN_QUERY_LEN: usize = 3;

/// Which end of the route a picker feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Origin,
    Destination,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Origin => f.write_str("origin"),
            Endpoint::Destination => f.write_str("destination"),
        }
    }
}

/// Text field plus suggestion list for one endpoint. The "from" and "to"
/// fields are two pickers over the same provider.
#[derive(Debug, Clone)]
pub struct LocationPicker {
    endpoint: Endpoint,
    country: Option<String>,
    query: String,
    suggestions: Vec<Suggestion>,
}

impl LocationPicker {
    pub fn new(endpoint: Endpoint, country: Option<String>) -> Self {
        Self {
            endpoint,
            country,
            query: String::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// Records the typed text and refreshes suggestions.
    ///
    /// On provider failure the previous suggestions are kept and the error
    /// is returned.
    pub fn update_query<P: PlacesProvider>(&mut self, text: &str, places: &P) -> Result<&[Suggestion]> {
        self.query = text.to_string();
        if text.chars().count() < MIN_QUERY_LEN {
            self.suggestions.clear();
            return Ok(&self.suggestions);
        }

        self.suggestions = places.autocomplete(text, self.country.as_deref())?;
        tracing::debug!(endpoint = %self.endpoint, count = self.suggestions.len(), "suggestions refreshed");
        Ok(&self.suggestions)
    }

    /// Resolves one of the current suggestions into a place.
    pub fn select<P: PlacesProvider>(&mut self, suggestion_id: &str, places: &P) -> Result<Place> {
        let suggestion = self
            .suggestions
            .iter()
            .find(|s| s.id == suggestion_id)
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("unknown suggestion {suggestion_id:?}")))?;

        let point = places.details(&suggestion.id)?;
        self.query = suggestion.description.clone();
        self.suggestions.clear();
        Ok(Place::new(suggestion.description, point))
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.suggestions.clear();
    }
}
