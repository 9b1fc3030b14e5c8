//! Per-platform step tables.
//!
//! A table is the whole difference between platforms as far as the engine is
//! concerned: which resources are created, in which order, and which earlier
//! handles each one consumes.

use adrelay_core::{PipelineState, Platform, StepRole};

/// One resource step and the roles it depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDef {
    pub role: StepRole,
    /// Roles whose handles must exist before this step runs.
    pub parents: &'static [StepRole],
}

impl StepDef {
    const fn new(role: StepRole, parents: &'static [StepRole]) -> Self {
        Self { role, parents }
    }

    pub fn state(&self) -> PipelineState {
        self.role.state()
    }
}

const SEARCH_STEPS: &[StepDef] = &[
    StepDef::new(StepRole::Budget, &[]),
    StepDef::new(StepRole::Campaign, &[StepRole::Budget]),
    StepDef::new(StepRole::AdGroup, &[StepRole::Campaign]),
    StepDef::new(StepRole::Ad, &[StepRole::AdGroup]),
];

const VIDEO_STEPS: &[StepDef] = &[
    StepDef::new(StepRole::Budget, &[]),
    StepDef::new(StepRole::Campaign, &[StepRole::Budget]),
    StepDef::new(StepRole::AdGroup, &[StepRole::Campaign]),
    StepDef::new(StepRole::VideoAsset, &[]),
    StepDef::new(StepRole::ImageAsset, &[]),
    StepDef::new(
        StepRole::Ad,
        &[StepRole::AdGroup, StepRole::VideoAsset, StepRole::ImageAsset],
    ),
];

const SOCIAL_STEPS: &[StepDef] = &[
    StepDef::new(StepRole::Campaign, &[]),
    StepDef::new(StepRole::AdGroup, &[StepRole::Campaign]),
    StepDef::new(StepRole::ImageAsset, &[]),
    StepDef::new(StepRole::Creative, &[StepRole::ImageAsset]),
    StepDef::new(StepRole::Ad, &[StepRole::AdGroup, StepRole::Creative]),
];

/// Ordered steps of one platform's pipeline.
#[derive(Debug, Clone, Copy)]
pub struct StepTable {
    pub platform: Platform,
    pub steps: &'static [StepDef],
}

impl StepTable {
    pub fn for_platform(platform: Platform) -> Self {
        let steps = match platform {
            Platform::SearchAds => SEARCH_STEPS,
            Platform::VideoAds => VIDEO_STEPS,
            Platform::SocialAds => SOCIAL_STEPS,
        };
        Self { platform, steps }
    }

    pub fn roles(&self) -> impl Iterator<Item = StepRole> + '_ {
        self.steps.iter().map(|s| s.role)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
