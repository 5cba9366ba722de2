//! Extension allow-list.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::FilesConfig;

/// Maps a lowercase extension (with its dot) to a Content-Type.
///
/// A path whose extension is not listed is not servable at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeTable {
    types: BTreeMap<String, String>,
}

impl MimeTable {
    pub fn new(types: BTreeMap<String, String>) -> Self {
        let types = types
            .into_iter()
            .map(|(ext, mime)| (ext.to_ascii_lowercase(), mime))
            .collect();
        Self { types }
    }

    /// Content-Type for `path`, or `None` when its extension is not allowed.
    pub fn content_type(&self, path: &Path) -> Option<&str> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.types.get(&format!(".{ext}")).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for MimeTable {
    fn default() -> Self {
        Self::new(FilesConfig::default().mime_types)
    }
}
