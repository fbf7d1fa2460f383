//! Campaign registry
//!
//! Process-wide keyed store of campaign state. Each campaign has one logical
//! writer at a time (its executing worker task) while any number of pollers
//! read concurrently. Reads return cloned snapshots so polling stays cheap
//! and side-effect-free; there is no atomic multi-field snapshot guarantee
//! across separate writes, and readers treat intermediate views as advisory.

use dashmap::DashMap;

use blast_core::{Campaign, CampaignId, CampaignSummary};

// ----------------------------------------------------------------------------
// Campaign Registry
// ----------------------------------------------------------------------------

/// Concurrency-safe keyed campaign store, constructed once per process (or
/// per test) and injected wherever campaign state is touched.
#[derive(Debug, Default)]
pub struct CampaignRegistry {
    campaigns: DashMap<CampaignId, Campaign>,
}

impl CampaignRegistry {
    pub fn new() -> Self {
        Self {
            campaigns: DashMap::new(),
        }
    }

    /// Register a campaign. Overwrites any previous entry under the same id.
    pub fn insert(&self, campaign: Campaign) {
        self.campaigns.insert(campaign.id, campaign);
    }

    /// Snapshot of a campaign, if present.
    pub fn get(&self, id: &CampaignId) -> Option<Campaign> {
        self.campaigns.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &CampaignId) -> bool {
        self.campaigns.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.campaigns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
    }

    /// Mutate a campaign in place. Returns false when the id is unknown.
    pub fn update<F>(&self, id: CampaignId, f: F) -> bool
    where
        F: FnOnce(&mut Campaign),
    {
        match self.campaigns.get_mut(&id) {
            Some(mut entry) => {
                f(entry.value_mut());
                true
            }
            None => false,
        }
    }

    /// Mutate a campaign, inserting one first if the id is unknown.
    pub fn update_or_insert<F, G>(&self, id: CampaignId, f: F, default: G)
    where
        F: FnOnce(&mut Campaign),
        G: FnOnce() -> Campaign,
    {
        let mut entry = self.campaigns.entry(id).or_insert_with(default);
        f(entry.value_mut());
    }

    /// Summary projections of every campaign, newest first. Ties on creation
    /// time break on campaign id so the order is deterministic.
    pub fn summaries(&self) -> Vec<CampaignSummary> {
        let mut list: Vec<CampaignSummary> = self
            .campaigns
            .iter()
            .map(|entry| entry.value().summary())
            .collect();
        list.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.campaign_id.cmp(&b.campaign_id))
        });
        list
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
