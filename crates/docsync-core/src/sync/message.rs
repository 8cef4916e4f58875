//! Sync wire types
//!
//! A client posts its changed documents together with the watermark it
//! got back from its previous sync, and receives everything the server
//! has that is newer than that watermark.

use serde::{Deserialize, Serialize};

use crate::document::Document;

/// Collection whose clients still speak the `notes` field names
pub const LEGACY_NOTES_COLLECTION: &str = "notes";

/// Body of a sync call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// Documents changed on the client
    #[serde(default)]
    pub items: Vec<Document>,

    /// Older clients send their documents here instead of `items`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Document>,

    /// `serverTime` of the client's previous sync, absent on first sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<String>,
}

impl SyncRequest {
    /// Request carrying `items` and an optional watermark
    pub fn new(items: Vec<Document>, last_sync_time: Option<String>) -> Self {
        Self {
            items,
            notes: Vec::new(),
            last_sync_time,
        }
    }

    /// The documents to merge: `items`, or `notes` when `items` is empty
    pub fn candidates(&self) -> &[Document] {
        if self.items.is_empty() {
            &self.notes
        } else {
            &self.items
        }
    }
}

/// Reply to a sync call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    /// Documents the client should apply
    pub items: Vec<Document>,

    /// Watermark for the client's next sync
    pub server_time: String,

    /// Copy of `items` for the `notes` collection only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<Document>>,
}

impl SyncResponse {
    pub fn new(collection: &str, items: Vec<Document>, server_time: String) -> Self {
        let notes = (collection == LEGACY_NOTES_COLLECTION).then(|| items.clone());
        Self {
            items,
            server_time,
            notes,
        }
    }
}
