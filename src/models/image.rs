//! Image slots on editable records
//!
//! A form field holding an image is either a file the editor picked but has
//! not saved yet, or an object already in storage. Pending files are only
//! uploaded when the record itself is saved.

use serde::{Deserialize, Serialize};

/// State of an image field in an editor form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ImageSlot {
    /// Picked and staged, not yet in the bucket
    Pending {
        token: String,
        #[serde(default)]
        preview_url: String,
    },
    /// Stored object path inside the bucket
    Uploaded { path: String },
}

impl ImageSlot {
    /// Slot for an object that is already stored
    pub fn uploaded(path: impl Into<String>) -> Self {
        ImageSlot::Uploaded { path: path.into() }
    }

    /// Slot for a staged file
    pub fn pending(token: impl Into<String>) -> Self {
        ImageSlot::Pending {
            token: token.into(),
            preview_url: String::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ImageSlot::Pending { .. })
    }
}
