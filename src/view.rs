//! Unified display list built from the persisted and pending sets.
//!
//! The view model is recomputed from scratch whenever either set changes and
//! holds nothing beyond borrowed references, so it can never lag behind the
//! sets it was built from.

use crate::codec;
use crate::model::{PendingId, PendingImage, PersistedImage, RecordId};
use crate::pending::PendingSet;
use crate::persisted::PersistedSet;

/// One entry of the display list.
#[derive(Debug, Clone, Copy)]
pub enum DisplayItem<'a> {
    /// An image already in the store
    Persisted(&'a PersistedImage),
    /// A staged image and its current ordinal in the pending list
    Pending {
        /// The staged image
        image: &'a PendingImage,
        /// Position within the pending list
        ordinal: usize,
    },
}

impl DisplayItem<'_> {
    /// Name shown under the thumbnail.
    pub fn name(&self) -> String {
        match self {
            DisplayItem::Persisted(image) => image.name.clone(),
            DisplayItem::Pending { image, ordinal } => image.display_name(*ordinal),
        }
    }

    /// Note text shown in the note field.
    pub fn note(&self) -> &str {
        match self {
            DisplayItem::Persisted(image) => &image.note,
            DisplayItem::Pending { image, .. } => &image.note,
        }
    }

    /// Human-readable size, for pending images only.
    pub fn size_label(&self) -> Option<String> {
        match self {
            DisplayItem::Persisted(_) => None,
            DisplayItem::Pending { image, .. } => Some(codec::format_file_size(image.size())),
        }
    }

    /// Whether the image is already stored.
    pub fn is_saved(&self) -> bool {
        matches!(self, DisplayItem::Persisted(_))
    }

    /// Where edits and removals of this item must go.
    pub fn route(&self) -> Route {
        match self {
            DisplayItem::Persisted(image) => Route::Persisted(image.remote_id.clone()),
            DisplayItem::Pending { image, .. } => Route::Pending(image.id),
        }
    }
}

/// Target of an edit or removal issued against a display item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// Goes to the persisted set and the store
    Persisted(RecordId),
    /// Goes to the pending set only
    Pending(PendingId),
}

/// Confirmation required before a bulk clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearPrompt {
    /// Nothing to clear; report instead of asking
    Nothing,
    /// Only unsaved images would be discarded
    PendingOnly {
        /// Pending count
        pending: usize,
    },
    /// Only stored images would be deleted
    PersistedOnly {
        /// Persisted count
        persisted: usize,
    },
    /// Both kinds would go
    Both {
        /// Pending count
        pending: usize,
        /// Persisted count
        persisted: usize,
    },
}

impl ClearPrompt {
    /// Question shown to the user, or `None` when there is nothing to clear.
    pub fn message(&self) -> Option<String> {
        match self {
            ClearPrompt::Nothing => None,
            ClearPrompt::PendingOnly { pending } => Some(format!(
                "Are you sure you want to discard all {} unsaved image(s)?",
                pending
            )),
            ClearPrompt::PersistedOnly { persisted } => Some(format!(
                "Are you sure you want to delete all {} saved image(s) from the store?",
                persisted
            )),
            ClearPrompt::Both { pending, persisted } => Some(format!(
                "Are you sure you want to discard all {} unsaved image(s) and delete {} saved image(s) from the store?",
                pending, persisted
            )),
        }
    }
}

/// Ordered display list: persisted images first, then pending ones.
#[derive(Debug, Clone)]
pub struct ViewModel<'a> {
    items: Vec<DisplayItem<'a>>,
    persisted: usize,
    pending: usize,
}

impl<'a> ViewModel<'a> {
    /// Build the display list from the current sets.
    pub fn reconcile(persisted: &'a PersistedSet, pending: &'a PendingSet) -> Self {
        let items = persisted
            .iter()
            .map(DisplayItem::Persisted)
            .chain(
                pending
                    .iter()
                    .enumerate()
                    .map(|(ordinal, image)| DisplayItem::Pending { image, ordinal }),
            )
            .collect();

        Self {
            items,
            persisted: persisted.len(),
            pending: pending.len(),
        }
    }

    /// All display items in order.
    pub fn items(&self) -> &[DisplayItem<'a>] {
        &self.items
    }

    /// Aggregate count shown in the header.
    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// Number of stored images.
    pub fn persisted_count(&self) -> usize {
        self.persisted
    }

    /// Number of staged images.
    pub fn pending_count(&self) -> usize {
        self.pending
    }

    /// Breakdown text such as `"2 saved, 3 new"`.
    pub fn breakdown(&self) -> String {
        match (self.persisted, self.pending) {
            (0, 0) => "No images".to_string(),
            (saved, 0) => format!("{} saved", saved),
            (0, new) => format!("{} new", new),
            (saved, new) => format!("{} saved, {} new", saved, new),
        }
    }

    /// Route for the item at display `index`.
    pub fn route(&self, index: usize) -> Option<Route> {
        self.items.get(index).map(DisplayItem::route)
    }

    /// Confirmation needed to clear everything shown.
    pub fn clear_prompt(&self) -> ClearPrompt {
        match (self.pending, self.persisted) {
            (0, 0) => ClearPrompt::Nothing,
            (pending, 0) => ClearPrompt::PendingOnly { pending },
            (0, persisted) => ClearPrompt::PersistedOnly { persisted },
            (pending, persisted) => ClearPrompt::Both { pending, persisted },
        }
    }
}
