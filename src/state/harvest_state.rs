/// Harvest state definitions
///
/// This module defines every state one entity's harvest can be in.
use std::fmt;

/// Represents the current state of a single entity harvest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HarvestState {
    // ===== Setup States =====
    /// Driver acquired, nothing loaded yet
    Init,

    /// Navigation succeeded and the page reported ready
    Loaded,

    /// The reviews entry point was found and opened
    ReviewsTabOpen,

    /// Listing switched to newest-first ordering
    Sorted,

    /// Rating-breakdown category labels were read
    CategoriesDiscovered,

    // ===== Extraction States =====
    /// Reading, extracting and scrolling batches of items
    Scrolling,

    /// Loop finished, committing the artifact
    Draining,

    // ===== Terminal States =====
    /// Harvest finished and the artifact (if any) was committed
    Succeeded,

    /// Harvest aborted with an error
    Failed,
}

impl HarvestState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns true if the state machine may move from `self` to `next`
    ///
    /// States advance strictly in order. Any non-terminal state may fail,
    /// and `Scrolling` may loop on itself once per batch.
    pub fn can_transition_to(&self, next: HarvestState) -> bool {
        if next == Self::Failed {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Self::Init, Self::Loaded)
                | (Self::Loaded, Self::ReviewsTabOpen)
                | (Self::ReviewsTabOpen, Self::Sorted)
                | (Self::Sorted, Self::CategoriesDiscovered)
                | (Self::CategoriesDiscovered, Self::Scrolling)
                | (Self::Scrolling, Self::Scrolling)
                | (Self::Scrolling, Self::Draining)
                | (Self::Draining, Self::Succeeded)
        )
    }

    /// Short lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Loaded => "loaded",
            Self::ReviewsTabOpen => "reviews_tab_open",
            Self::Sorted => "sorted",
            Self::CategoriesDiscovered => "categories_discovered",
            Self::Scrolling => "scrolling",
            Self::Draining => "draining",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for HarvestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why the extraction loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// A read returned no items: the listing is exhausted
    NoMoreItems,

    /// An item older than the window's lower bound was reached
    WindowExhausted,

    /// Shallow mode: only the first batch is harvested
    FirstBatchOnly,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoMoreItems => "no more items",
            Self::WindowExhausted => "window exhausted",
            Self::FirstBatchOnly => "first batch only",
        };
        write!(f, "{}", s)
    }
}
