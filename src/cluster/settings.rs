//! Flattened view of the `settings` collection

use mongodb::bson::{doc, Document};

use super::records::SETTINGS;
use crate::client::MetadataStoreExt;
use crate::utils::Result;

/// Typed cluster settings with server defaults applied
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsView {
    /// Balancer has been stopped (`stopped: true` or `mode: "off"`)
    pub balancer_stopped: bool,
    /// The autosplit entry without its `_id`; `{enabled: true}` when absent
    pub autosplit: Document,
    /// Configured maximum chunk size in MB, if overridden
    pub chunk_size_mb: Option<i64>,
}

impl Default for SettingsView {
    fn default() -> Self {
        Self {
            balancer_stopped: false,
            autosplit: doc! { "enabled": true },
            chunk_size_mb: None,
        }
    }
}

impl SettingsView {
    /// Fold the raw settings documents (keyed by `_id`) into a view
    pub fn from_documents(documents: &[Document]) -> Self {
        let mut view = Self::default();

        for document in documents {
            match document.get_str("_id") {
                Ok("balancer") => {
                    let stopped = document.get_bool("stopped").unwrap_or(false);
                    let off = document.get_str("mode").map(|m| m == "off").unwrap_or(false);
                    view.balancer_stopped = stopped || off;
                }
                Ok("autosplit") => {
                    let mut autosplit = document.clone();
                    autosplit.remove("_id");
                    view.autosplit = autosplit;
                }
                Ok("chunksize") => {
                    view.chunk_size_mb = match document.get("value") {
                        Some(v) => v.as_i64().or_else(|| v.as_i32().map(i64::from)),
                        None => None,
                    };
                }
                _ => {}
            }
        }

        view
    }

    /// Read and flatten the settings collection
    pub fn load<S: MetadataStoreExt + ?Sized>(store: &S) -> Result<Self> {
        Ok(Self::from_documents(&store.find_all(SETTINGS)?))
    }

    pub fn balancer_enabled(&self) -> bool {
        !self.balancer_stopped
    }

    pub fn autosplit_enabled(&self) -> bool {
        self.autosplit.get_bool("enabled").unwrap_or(true)
    }
}
