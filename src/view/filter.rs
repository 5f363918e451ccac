//! Search and categorical filters.
//!
//! Search is a case-insensitive substring match over a fixed per-entity
//! field set. Categorical filters are exact equality with `None` standing
//! for the "all" sentinel. Filters are a conjunction, so application order
//! does not matter.

use crate::crm::types::{Client, ClientStatus, Deal, Lead, LeadStatus};

/// Fields an entity exposes to the search box.
pub trait Searchable {
    fn haystacks(&self) -> Vec<&str>;
}

impl Searchable for Lead {
    fn haystacks(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.email.as_str()];
        if let Some(company) = &self.company {
            fields.push(company);
        }
        fields
    }
}

impl Searchable for Client {
    fn haystacks(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.email.as_str()];
        if let Some(company) = &self.company {
            fields.push(company);
        }
        fields
    }
}

impl Searchable for Deal {
    fn haystacks(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.description.as_str()]
    }
}

fn matches_search<T: Searchable>(item: &T, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    item.haystacks()
        .iter()
        .any(|haystack| haystack.to_lowercase().contains(&needle))
}

#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub search: String,
    pub status: Option<LeadStatus>,
    pub source: Option<String>,
}

impl LeadFilter {
    pub fn apply<'a>(&self, leads: &'a [Lead]) -> Vec<&'a Lead> {
        leads
            .iter()
            .filter(|lead| matches_search(*lead, &self.search))
            .filter(|lead| self.status.is_none_or(|status| lead.status == status))
            .filter(|lead| {
                self.source
                    .as_deref()
                    .is_none_or(|source| lead.source == source)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    pub search: String,
    pub status: Option<ClientStatus>,
}

impl ClientFilter {
    pub fn apply<'a>(&self, clients: &'a [Client]) -> Vec<&'a Client> {
        clients
            .iter()
            .filter(|client| matches_search(*client, &self.search))
            .filter(|client| self.status.is_none_or(|status| client.status == status))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DealFilter {
    pub search: String,
}

impl DealFilter {
    pub fn apply<'a>(&self, deals: &'a [Deal]) -> Vec<&'a Deal> {
        deals
            .iter()
            .filter(|deal| matches_search(*deal, &self.search))
            .collect()
    }
}
