//! Per-subject search state: five independent result slots plus the
//! generation guard that makes out-of-order completions safe.
//!
//! Every dispatch is tagged with the generation it was issued under. A
//! completion whose generation no longer matches is dropped on the floor,
//! so a slow response for a superseded subject can never overwrite state
//! belonging to the current one.

use crate::error::ApiError;
use crate::report::{ActivityReport, CommunityReport, LanguageReport, Narrative, ProfileReport};
use crate::slot::Slot;

/// Names of the five result slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Profile,
    Languages,
    Community,
    Activity,
    Narrative,
}

impl SlotKind {
    /// The four slots that drive the aggregate loading/has-results flags.
    /// The narrative is excluded so the slowest call never blocks the
    /// main view.
    pub const PRIMARY: [SlotKind; 4] = [
        SlotKind::Profile,
        SlotKind::Languages,
        SlotKind::Community,
        SlotKind::Activity,
    ];
}

/// A typed completion for exactly one slot.
#[derive(Clone, Debug)]
pub enum FetchOutcome {
    Profile(Result<ProfileReport, ApiError>),
    Languages(Result<LanguageReport, ApiError>),
    Community(Result<CommunityReport, ApiError>),
    Activity(Result<ActivityReport, ApiError>),
    Narrative(Result<Narrative, ApiError>),
}

impl FetchOutcome {
    pub fn kind(&self) -> SlotKind {
        match self {
            FetchOutcome::Profile(_) => SlotKind::Profile,
            FetchOutcome::Languages(_) => SlotKind::Languages,
            FetchOutcome::Community(_) => SlotKind::Community,
            FetchOutcome::Activity(_) => SlotKind::Activity,
            FetchOutcome::Narrative(_) => SlotKind::Narrative,
        }
    }
}

/// The whole observable search state for the current subject.
#[derive(Clone, Debug, Default)]
pub struct SearchState {
    pub subject: Option<String>,
    /// Bumped on every `begin_search`; dispatch tags must match to land.
    pub generation: u64,
    pub profile: Slot<ProfileReport>,
    pub languages: Slot<LanguageReport>,
    pub community: Slot<CommunityReport>,
    pub activity: Slot<ActivityReport>,
    pub narrative: Slot<Narrative>,
}

impl SearchState {
    /// Install a new subject: all five slots drop to Idle in this single
    /// state update and the generation advances. Returns the new generation
    /// for tagging the dispatches that follow.
    pub fn begin_search(&mut self, subject: &str) -> u64 {
        self.subject = Some(subject.to_string());
        self.generation += 1;
        self.profile = Slot::idle();
        self.languages = Slot::idle();
        self.community = Slot::idle();
        self.activity = Slot::idle();
        self.narrative = Slot::idle();
        self.generation
    }

    /// Move one slot to Loading, unless the tag is stale.
    pub fn begin_fetch(&mut self, generation: u64, kind: SlotKind) -> bool {
        if generation != self.generation {
            return false;
        }
        match kind {
            SlotKind::Profile => self.profile.begin(),
            SlotKind::Languages => self.languages.begin(),
            SlotKind::Community => self.community.begin(),
            SlotKind::Activity => self.activity.begin(),
            SlotKind::Narrative => self.narrative.begin(),
        }
        true
    }

    /// Settle one slot with a completion, unless the tag is stale.
    /// Returns whether the completion was applied.
    pub fn apply(&mut self, generation: u64, outcome: FetchOutcome) -> bool {
        if generation != self.generation {
            return false;
        }
        match outcome {
            FetchOutcome::Profile(result) => self.profile.resolve(result),
            FetchOutcome::Languages(result) => self.languages.resolve(result),
            FetchOutcome::Community(result) => self.community.resolve(result),
            FetchOutcome::Activity(result) => self.activity.resolve(result),
            FetchOutcome::Narrative(result) => self.narrative.resolve(result),
        }
        true
    }

    /// Stale-while-revalidate completion for the narrative slot: success
    /// silently replaces the cached value, failure never downgrades it.
    pub fn apply_narrative_background(
        &mut self,
        generation: u64,
        result: Result<Narrative, ApiError>,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        self.narrative.resolve_background(result);
        true
    }

    /// OR of `loading` across the four primary slots.
    pub fn any_primary_loading(&self) -> bool {
        self.profile.is_loading()
            || self.languages.is_loading()
            || self.community.is_loading()
            || self.activity.is_loading()
    }

    /// OR of data presence across the four primary slots.
    pub fn has_primary_results(&self) -> bool {
        self.profile.has_data()
            || self.languages.has_data()
            || self.community.has_data()
            || self.activity.has_data()
    }

    /// True once every slot has left both Idle and Loading — the point at
    /// which a one-shot consumer can render a final report.
    pub fn all_settled(&self) -> bool {
        let settled = |idle: bool, loading: bool| !idle && !loading;
        settled(self.profile.is_idle(), self.profile.is_loading())
            && settled(self.languages.is_idle(), self.languages.is_loading())
            && settled(self.community.is_idle(), self.community.is_loading())
            && settled(self.activity.is_idle(), self.activity.is_loading())
            && settled(self.narrative.is_idle(), self.narrative.is_loading())
    }
}
