//! Pre-flight validation.
//!
//! Runs before any network call and stops at the first violated rule, so an
//! automated caller gets exactly one actionable error.

use chrono::NaiveDate;
use url::Url;

use crate::context::{normalize_account_id, ExecutionContext};
use crate::error::{ValidationError, ValidationRule};
use crate::spec::{CampaignSpec, Creative, SearchCreative, SocialCreative, VideoCreative};
use crate::types::Platform;

pub const MIN_CAMPAIGN_NAME_LEN: usize = 3;
pub const MAX_CAMPAIGN_NAME_LEN: usize = 255;

const VIDEO_MIN_HEADLINES: usize = 3;
const VIDEO_MIN_LONG_HEADLINES: usize = 1;
const VIDEO_MIN_DESCRIPTIONS: usize = 2;
const VIDEO_MAX_TEXT_ASSETS: usize = 5;
const VIDEO_HEADLINE_MAX: usize = 40;
const VIDEO_LONG_HEADLINE_MAX: usize = 90;
const VIDEO_DESCRIPTION_MAX: usize = 90;
const BUSINESS_NAME_MAX: usize = 25;

const SEARCH_MIN_HEADLINES: usize = 3;
const SEARCH_MAX_HEADLINES: usize = 15;
const SEARCH_HEADLINE_MAX: usize = 30;
const SEARCH_MIN_DESCRIPTIONS: usize = 2;
const SEARCH_MAX_DESCRIPTIONS: usize = 4;
const SEARCH_DESCRIPTION_MAX: usize = 90;

/// Parsed serving window of a spec that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

type Check = Result<(), ValidationError>;

/// Validate a spec against its execution context.
///
/// `today` is passed in rather than read from the clock so the function stays
/// pure.
pub fn validate(
    spec: &CampaignSpec,
    ctx: &ExecutionContext,
    today: NaiveDate,
) -> Result<CampaignWindow, ValidationError> {
    let platform = spec.platform();

    check_account_ids(platform, ctx)?;

    if ctx.credential.is_blank() {
        return Err(ValidationError::new(
            ValidationRule::Credential,
            format!("A {} credential is required", platform),
        ));
    }

    check_name(&spec.name)?;

    if spec.daily_budget <= 0 {
        return Err(ValidationError::new(
            ValidationRule::Budget,
            "Daily budget must be greater than zero",
        ));
    }

    let window = check_dates(&spec.start_date, &spec.end_date, today)?;

    if !platform.supports_channel(spec.channel_type) {
        return Err(ValidationError::new(
            ValidationRule::ChannelType,
            format!(
                "Channel type {:?} is not supported by {}",
                spec.channel_type, platform
            ),
        ));
    }

    match &spec.creative {
        Creative::SearchAds(creative) => check_search_creative(creative)?,
        Creative::VideoAds(creative) => check_video_creative(creative)?,
        Creative::SocialAds(creative) => check_social_creative(creative)?,
    }

    Ok(window)
}

fn check_account_ids(platform: Platform, ctx: &ExecutionContext) -> Check {
    if !account_id_is_valid(platform, &ctx.account_id) {
        return Err(ValidationError::new(
            ValidationRule::AccountId,
            account_id_message(platform, "account id"),
        ));
    }
    if let Some(manager) = ctx.manager_id.as_deref().filter(|m| !m.trim().is_empty()) {
        if !account_id_is_valid(platform, manager) {
            return Err(ValidationError::new(
                ValidationRule::ManagerId,
                account_id_message(platform, "manager id"),
            ));
        }
    }
    Ok(())
}

fn account_id_is_valid(platform: Platform, raw: &str) -> bool {
    let trimmed = raw.trim();
    match platform {
        Platform::SearchAds | Platform::VideoAds => {
            let digits = normalize_account_id(trimmed);
            !trimmed.starts_with("act_")
                && trimmed.chars().all(|c| c.is_ascii_digit() || c == '-')
                && digits.len() == 10
        }
        Platform::SocialAds => {
            let digits = trimmed.strip_prefix("act_").unwrap_or(trimmed);
            !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
        }
    }
}

fn account_id_message(platform: Platform, what: &str) -> String {
    match platform {
        Platform::SearchAds | Platform::VideoAds => {
            format!("Invalid {} {}: expected 10 digits (dashes allowed)", platform, what)
        }
        Platform::SocialAds => {
            format!("Invalid {} {}: expected digits, optionally prefixed with act_", platform, what)
        }
    }
}

fn check_name(name: &str) -> Check {
    let len = name.trim().chars().count();
    if len < MIN_CAMPAIGN_NAME_LEN {
        return Err(ValidationError::new(
            ValidationRule::CampaignName,
            format!(
                "Campaign name must be at least {} characters",
                MIN_CAMPAIGN_NAME_LEN
            ),
        ));
    }
    if len > MAX_CAMPAIGN_NAME_LEN {
        return Err(ValidationError::new(
            ValidationRule::CampaignName,
            format!(
                "Campaign name must be at most {} characters",
                MAX_CAMPAIGN_NAME_LEN
            ),
        ));
    }
    Ok(())
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn check_dates(start: &str, end: &str, today: NaiveDate) -> Result<CampaignWindow, ValidationError> {
    let start_date = parse_date(start).ok_or_else(|| {
        ValidationError::new(
            ValidationRule::DateFormat,
            format!("Invalid start date '{}': expected YYYY-MM-DD", start),
        )
    })?;
    let end_date = parse_date(end).ok_or_else(|| {
        ValidationError::new(
            ValidationRule::DateFormat,
            format!("Invalid end date '{}': expected YYYY-MM-DD", end),
        )
    })?;

    if start_date < today {
        return Err(ValidationError::new(
            ValidationRule::StartDateInPast,
            "Start date cannot be in the past",
        ));
    }
    if end_date < start_date {
        return Err(ValidationError::new(
            ValidationRule::DateRange,
            "End date must be on or after the start date",
        ));
    }

    Ok(CampaignWindow {
        start: start_date,
        end: end_date,
    })
}

fn creative_error(message: impl Into<String>) -> ValidationError {
    ValidationError::new(ValidationRule::Creative, message)
}

fn non_blank(texts: &[String]) -> usize {
    texts.iter().filter(|t| !t.trim().is_empty()).count()
}

fn check_lengths(texts: &[String], max: usize, label: &str) -> Check {
    for (i, text) in texts.iter().enumerate() {
        if text.chars().count() > max {
            return Err(creative_error(format!(
                "{} {} exceeds {} characters",
                label,
                i + 1,
                max
            )));
        }
    }
    Ok(())
}

fn check_video_creative(creative: &VideoCreative) -> Check {
    if non_blank(&creative.headlines) < VIDEO_MIN_HEADLINES {
        return Err(creative_error("At least 3 headlines are required"));
    }
    if non_blank(&creative.long_headlines) < VIDEO_MIN_LONG_HEADLINES {
        return Err(creative_error("At least 1 long headline is required"));
    }
    if non_blank(&creative.descriptions) < VIDEO_MIN_DESCRIPTIONS {
        return Err(creative_error("At least 2 descriptions are required"));
    }
    if creative.headlines.len() > VIDEO_MAX_TEXT_ASSETS
        || creative.long_headlines.len() > VIDEO_MAX_TEXT_ASSETS
        || creative.descriptions.len() > VIDEO_MAX_TEXT_ASSETS
    {
        return Err(creative_error(format!(
            "At most {} headlines, long headlines and descriptions are allowed",
            VIDEO_MAX_TEXT_ASSETS
        )));
    }
    check_lengths(&creative.headlines, VIDEO_HEADLINE_MAX, "Headline")?;
    check_lengths(&creative.long_headlines, VIDEO_LONG_HEADLINE_MAX, "Long headline")?;
    check_lengths(&creative.descriptions, VIDEO_DESCRIPTION_MAX, "Description")?;

    if youtube_video_id(&creative.video_url).is_none() {
        return Err(creative_error("A valid YouTube video reference is required"));
    }
    if !is_fetchable_url(&creative.logo_image_url) {
        return Err(creative_error("A valid logo image URL is required"));
    }
    if creative.business_name.trim().is_empty() {
        return Err(creative_error("Business name is required"));
    }
    if creative.business_name.chars().count() > BUSINESS_NAME_MAX {
        return Err(creative_error(format!(
            "Business name exceeds {} characters",
            BUSINESS_NAME_MAX
        )));
    }
    if !is_fetchable_url(&creative.final_url) {
        return Err(creative_error("A valid final URL is required"));
    }
    Ok(())
}

fn check_search_creative(creative: &SearchCreative) -> Check {
    if non_blank(&creative.headlines) < SEARCH_MIN_HEADLINES {
        return Err(creative_error("At least 3 headlines are required"));
    }
    if creative.headlines.len() > SEARCH_MAX_HEADLINES {
        return Err(creative_error(format!(
            "At most {} headlines are allowed",
            SEARCH_MAX_HEADLINES
        )));
    }
    if non_blank(&creative.descriptions) < SEARCH_MIN_DESCRIPTIONS {
        return Err(creative_error("At least 2 descriptions are required"));
    }
    if creative.descriptions.len() > SEARCH_MAX_DESCRIPTIONS {
        return Err(creative_error(format!(
            "At most {} descriptions are allowed",
            SEARCH_MAX_DESCRIPTIONS
        )));
    }
    check_lengths(&creative.headlines, SEARCH_HEADLINE_MAX, "Headline")?;
    check_lengths(&creative.descriptions, SEARCH_DESCRIPTION_MAX, "Description")?;
    if !is_fetchable_url(&creative.final_url) {
        return Err(creative_error("A valid final URL is required"));
    }
    Ok(())
}

fn check_social_creative(creative: &SocialCreative) -> Check {
    if creative.page_id.trim().is_empty() {
        return Err(creative_error("A page id is required"));
    }
    if creative.primary_text.trim().is_empty() {
        return Err(creative_error("Primary text is required"));
    }
    if creative.headline.trim().is_empty() {
        return Err(creative_error("A headline is required"));
    }
    if !is_fetchable_url(&creative.image_url) {
        return Err(creative_error("A valid image URL is required"));
    }
    if !is_fetchable_url(&creative.link_url) {
        return Err(creative_error("A valid link URL is required"));
    }
    if creative.countries.is_empty() {
        return Err(creative_error("At least 1 target country is required"));
    }
    if let Some(bad) = creative
        .countries
        .iter()
        .find(|c| c.len() != 2 || !c.chars().all(|ch| ch.is_ascii_alphabetic()))
    {
        return Err(creative_error(format!("Invalid country code '{}'", bad)));
    }
    Ok(())
}

/// True for absolute http(s) URLs with a host.
pub fn is_fetchable_url(raw: &str) -> bool {
    match Url::parse(raw.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// Extract the 11-character id from a YouTube URL or bare id.
pub fn youtube_video_id(reference: &str) -> Option<String> {
    let reference = reference.trim();
    if is_video_id(reference) {
        return Some(reference.to_string());
    }

    let url = Url::parse(reference).ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");
    let candidate = match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_string),
        "youtube.com" | "music.youtube.com" => {
            let mut segments = url.path_segments()?;
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                Some("shorts") | Some("embed") | Some("live") => {
                    segments.next().map(str::to_string)
                }
                _ => None,
            }
        }
        _ => None,
    }?;

    is_video_id(&candidate).then_some(candidate)
}

fn is_video_id(s: &str) -> bool {
    s.len() == 11
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
