use std::collections::BTreeMap;

use serde::Serialize;

use crate::store::TrackingDocument;

/// Display labels for the campaign buttons we know about. Anything else
/// surfaces under its raw action name.
const ACTION_LABELS: &[(&str, &str)] = &[
    ("products", "View products"),
    ("catalog", "Download catalog"),
    ("whatsapp", "WhatsApp"),
];

/// Aggregates recomputed from the full document on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignStats {
    pub total_sent: u64,
    pub total_opens: u64,
    pub total_clicks: u64,
    pub total_unsubscribes: u64,
    pub open_rate: f64,
    pub click_rate: f64,
    pub click_breakdown: BTreeMap<String, u64>,
}

/// Wire shape of `GET /api/stats`. Rates are rounded to two decimals.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub total_sent: u64,
    pub total_opens: u64,
    pub total_clicks: u64,
    pub open_rate: f64,
    pub click_rate: f64,
    pub click_breakdown: BTreeMap<String, u64>,
}

pub fn compute(document: &TrackingDocument) -> CampaignStats {
    let total_sent = document.emails_sent.len() as u64;
    let total_opens = document.opens.len() as u64;
    let total_clicks = document.clicks.len() as u64;
    let total_unsubscribes = document.unsubscribes.len() as u64;

    let (open_rate, click_rate) = if total_sent > 0 {
        (
            total_opens as f64 / total_sent as f64 * 100.0,
            total_clicks as f64 / total_sent as f64 * 100.0,
        )
    } else {
        (0.0, 0.0)
    };

    let mut click_breakdown = BTreeMap::new();
    for click in &document.clicks {
        *click_breakdown
            .entry(click.action_name.clone())
            .or_insert(0) += 1;
    }

    CampaignStats {
        total_sent,
        total_opens,
        total_clicks,
        total_unsubscribes,
        open_rate,
        click_rate,
        click_breakdown,
    }
}

impl CampaignStats {
    pub fn to_response(&self) -> StatsResponse {
        StatsResponse {
            total_sent: self.total_sent,
            total_opens: self.total_opens,
            total_clicks: self.total_clicks,
            open_rate: round_rate(self.open_rate),
            click_rate: round_rate(self.click_rate),
            click_breakdown: self.click_breakdown.clone(),
        }
    }
}

pub fn action_label(action: &str) -> &str {
    ACTION_LABELS
        .iter()
        .find(|(name, _)| *name == action)
        .map(|(_, label)| *label)
        .unwrap_or(action)
}

fn round_rate(rate: f64) -> f64 {
    (rate * 100.0).round() / 100.0
}
