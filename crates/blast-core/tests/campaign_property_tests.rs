//! Property-based tests for campaign bookkeeping invariants
//!
//! These tests verify the counting invariant and result ordering across
//! arbitrary audiences and outcome mixes.

use blast_core::{
    Campaign, CampaignContent, CampaignId, Recipient, RecipientResult, Timestamp,
};
use proptest::prelude::*;

/// Generate an arbitrary audience of 1..=60 recipients
fn arb_audience() -> impl Strategy<Value = Vec<Recipient>> {
    prop::collection::vec(
        prop::string::string_regex(r"[a-z]{1,12}").unwrap(),
        1..=60,
    )
    .prop_map(|locals| {
        locals
            .into_iter()
            .enumerate()
            .map(|(i, local)| Recipient::new(format!("{local}{i}@example.com")))
            .collect()
    })
}

fn content() -> CampaignContent {
    CampaignContent::Email {
        subject: "Subject".to_string(),
        body: "Body".to_string(),
        from_email: "noreply@example.com".to_string(),
        from_name: None,
    }
}

/// Drive a campaign through its audience with the given outcome mask,
/// flushing results in chunks of `chunk` to model checkpoint batching.
fn run_campaign(audience: Vec<Recipient>, mask: &[bool], chunk: usize) -> Campaign {
    let mut campaign = Campaign::queued(CampaignId::new(), content(), audience, Timestamp::new(0));

    let mut pending = Vec::new();
    let total = campaign.audience.len();
    for (idx, recipient) in campaign.audience.clone().iter().enumerate() {
        let sent = mask[idx % mask.len()];
        let result = if sent {
            RecipientResult::sent(recipient, format!("msg_{idx:012x}"), Timestamp::new(idx as u64))
        } else {
            RecipientResult::failed(
                recipient,
                "Invalid email address".to_string(),
                Timestamp::new(idx as u64),
            )
        };
        pending.push(result);

        if (idx + 1) % chunk == 0 || idx + 1 == total {
            campaign.record_results(pending.drain(..));
        }
    }

    campaign.complete(Timestamp::new(total as u64));
    campaign
}

proptest! {
    /// Property: a completed campaign's counts always sum to the audience size
    #[test]
    fn completed_counts_sum_to_total(
        audience in arb_audience(),
        mask in prop::collection::vec(any::<bool>(), 1..=8),
        chunk in 1usize..=10,
    ) {
        let campaign = run_campaign(audience, &mask, chunk);
        prop_assert_eq!(
            campaign.sent_count + campaign.failed_count,
            campaign.total_recipients()
        );
        prop_assert!(campaign.counts_consistent());
    }

    /// Property: result order equals audience order for all sizes and batchings
    #[test]
    fn result_order_matches_audience_order(
        audience in arb_audience(),
        mask in prop::collection::vec(any::<bool>(), 1..=8),
        chunk in 1usize..=10,
    ) {
        let campaign = run_campaign(audience, &mask, chunk);
        prop_assert_eq!(campaign.results.len(), campaign.audience.len());
        for (result, recipient) in campaign.results.iter().zip(campaign.audience.iter()) {
            prop_assert_eq!(&result.address, &recipient.address);
        }
    }

    /// Property: the counting invariant holds at every intermediate flush
    #[test]
    fn counts_never_exceed_total_mid_flight(
        audience in arb_audience(),
        mask in prop::collection::vec(any::<bool>(), 1..=8),
    ) {
        let mut campaign =
            Campaign::queued(CampaignId::new(), content(), audience, Timestamp::new(0));

        for (idx, recipient) in campaign.audience.clone().iter().enumerate() {
            let result = if mask[idx % mask.len()] {
                RecipientResult::sent(recipient, format!("msg_{idx:012x}"), Timestamp::new(1))
            } else {
                RecipientResult::failed(recipient, "Invalid email address".into(), Timestamp::new(1))
            };
            campaign.record_results([result]);
            prop_assert!(campaign.sent_count + campaign.failed_count <= campaign.total_recipients());
        }
    }
}
