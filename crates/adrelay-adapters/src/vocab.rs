//! Platform vocabularies.
//!
//! Each platform spells statuses, channels and units its own way; the
//! mapping lives here and nowhere else.

use adrelay_core::{CampaignStatus, ChannelType, DeliveryMethod};
use chrono::NaiveDate;

/// Micros per minor currency unit (1 cent = 10 000 micros).
pub const MICROS_PER_MINOR_UNIT: i64 = 10_000;

pub fn budget_micros(minor_units: i64) -> i64 {
    minor_units.saturating_mul(MICROS_PER_MINOR_UNIT)
}

pub fn ads_status(status: CampaignStatus) -> &'static str {
    match status {
        CampaignStatus::Enabled => "ENABLED",
        CampaignStatus::Paused => "PAUSED",
    }
}

pub fn social_status(status: CampaignStatus) -> &'static str {
    match status {
        CampaignStatus::Enabled => "ACTIVE",
        CampaignStatus::Paused => "PAUSED",
    }
}

pub fn ads_channel(channel: ChannelType) -> Option<&'static str> {
    match channel {
        ChannelType::Search => Some("SEARCH"),
        ChannelType::Video => Some("VIDEO"),
        ChannelType::DemandGen => Some("DEMAND_GEN"),
        ChannelType::Social => None,
    }
}

pub fn ads_delivery(method: DeliveryMethod) -> &'static str {
    match method {
        DeliveryMethod::Standard => "STANDARD",
        DeliveryMethod::Accelerated => "ACCELERATED",
    }
}

pub fn social_pacing(method: DeliveryMethod) -> &'static str {
    match method {
        DeliveryMethod::Standard => "standard",
        DeliveryMethod::Accelerated => "no_pacing",
    }
}

pub fn ads_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Start of day in UTC, the form the graph API expects.
pub fn social_start_time(date: NaiveDate) -> String {
    format!("{}T00:00:00+0000", date.format("%Y-%m-%d"))
}

/// End of day in UTC.
pub fn social_end_time(date: NaiveDate) -> String {
    format!("{}T23:59:59+0000", date.format("%Y-%m-%d"))
}

/// Normalize a free-form call to action ("Learn more") to the upper snake
/// case both APIs use, falling back to `LEARN_MORE`.
pub fn call_to_action(raw: Option<&str>) -> String {
    let normalized: String = raw
        .unwrap_or_default()
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    let normalized = normalized.trim_matches('_').to_string();
    if normalized.is_empty() {
        "LEARN_MORE".to_string()
    } else {
        normalized
    }
}
