use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// Closed set of coarse file-type labels. The extension table decides
/// membership; anything unmapped lands in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Images,
    Documents,
    Videos,
    Audio,
    Archives,
    Applications,
    Other,
}

impl Category {
    /// Directory name used under the destination root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Images => "images",
            Category::Documents => "documents",
            Category::Videos => "videos",
            Category::Audio => "audio",
            Category::Archives => "archives",
            Category::Applications => "applications",
            Category::Other => "other",
        }
    }

    pub fn from_label(label: &str) -> Option<Category> {
        match label {
            "images" => Some(Category::Images),
            "documents" => Some(Category::Documents),
            "videos" => Some(Category::Videos),
            "audio" => Some(Category::Audio),
            "archives" => Some(Category::Archives),
            "applications" => Some(Category::Applications),
            "other" => Some(Category::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

const DEFAULT_EXTENSIONS: &[(Category, &[&str])] = &[
    (
        Category::Images,
        &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp", "svg"],
    ),
    (
        Category::Documents,
        &[
            "pdf", "doc", "docx", "txt", "xls", "xlsx", "ppt", "pptx", "odt", "md",
        ],
    ),
    (
        Category::Videos,
        &["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm"],
    ),
    (
        Category::Audio,
        &["mp3", "wav", "flac", "aac", "ogg", "m4a"],
    ),
    (
        Category::Archives,
        &["zip", "rar", "7z", "tar", "gz", "bz2", "xz"],
    ),
    (
        Category::Applications,
        &["exe", "msi", "deb", "rpm", "apk", "dmg"],
    ),
];

/// Lowercased extension → category lookup. Built once per run and
/// checked for extensions claimed by more than one category.
#[derive(Debug, Clone)]
pub struct ExtensionTable {
    map: HashMap<String, Category>,
}

impl ExtensionTable {
    /// Built-in table matching the default category layout.
    pub fn builtin() -> ExtensionTable {
        let mut map = HashMap::new();
        for (category, extensions) in DEFAULT_EXTENSIONS {
            for ext in *extensions {
                map.insert((*ext).to_string(), *category);
            }
        }
        ExtensionTable { map }
    }

    /// Builds the table from the built-in defaults, replacing the
    /// extension set of every category named in `overrides`. Unknown
    /// category labels and extensions appearing in two categories are
    /// configuration errors.
    pub fn with_overrides(overrides: &HashMap<String, Vec<String>>) -> Result<ExtensionTable> {
        let mut sets: HashMap<Category, Vec<String>> = DEFAULT_EXTENSIONS
            .iter()
            .map(|(category, extensions)| {
                (
                    *category,
                    extensions.iter().map(|e| e.to_string()).collect(),
                )
            })
            .collect();

        for (label, extensions) in overrides {
            let category = Category::from_label(label).ok_or_else(|| {
                Error::Config(format!("unknown category '{}' in extension table", label))
            })?;
            let cleaned = extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect();
            sets.insert(category, cleaned);
        }

        let mut map = HashMap::new();
        for (category, extensions) in &sets {
            for ext in extensions {
                if let Some(previous) = map.insert(ext.clone(), *category) {
                    return Err(Error::Config(format!(
                        "extension '{}' mapped to both '{}' and '{}'",
                        ext, previous, category
                    )));
                }
            }
        }

        Ok(ExtensionTable { map })
    }

    /// Category for a known extension, `None` for unmapped or missing
    /// extensions. Pure lookup, no I/O.
    pub fn lookup(&self, file_name: &str) -> Option<Category> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_lowercase();
        self.map.get(&extension).copied()
    }

    /// Category for any file name; unmapped extensions classify as
    /// `Other`.
    pub fn classify(&self, file_name: &str) -> Category {
        self.lookup(file_name).unwrap_or(Category::Other)
    }
}

impl Default for ExtensionTable {
    fn default() -> Self {
        ExtensionTable::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_extensions() {
        let table = ExtensionTable::builtin();
        assert_eq!(table.classify("photo.jpg"), Category::Images);
        assert_eq!(table.classify("report.PDF"), Category::Documents);
        assert_eq!(table.classify("clip.mp4"), Category::Videos);
        assert_eq!(table.classify("song.mp3"), Category::Audio);
        assert_eq!(table.classify("archive.zip"), Category::Archives);
        assert_eq!(table.classify("setup.exe"), Category::Applications);
    }

    #[test]
    fn unknown_and_missing_extensions_are_other() {
        let table = ExtensionTable::builtin();
        assert_eq!(table.classify("notes"), Category::Other);
        assert_eq!(table.classify("data.xyz123"), Category::Other);
        assert_eq!(table.lookup("notes"), None);
        assert_eq!(table.lookup("data.xyz123"), None);
    }

    #[test]
    fn override_replaces_category_set() {
        let mut overrides = HashMap::new();
        overrides.insert("images".to_string(), vec!["heic".to_string()]);
        let table = ExtensionTable::with_overrides(&overrides).unwrap();
        assert_eq!(table.classify("pic.heic"), Category::Images);
        // jpg was replaced away
        assert_eq!(table.classify("pic.jpg"), Category::Other);
    }

    #[test]
    fn duplicate_extension_rejected() {
        let mut overrides = HashMap::new();
        overrides.insert("images".to_string(), vec!["zip".to_string()]);
        let err = ExtensionTable::with_overrides(&overrides).unwrap_err();
        assert!(err.to_string().contains("zip"));
    }

    #[test]
    fn unknown_category_label_rejected() {
        let mut overrides = HashMap::new();
        overrides.insert("memes".to_string(), vec!["jpg".to_string()]);
        assert!(ExtensionTable::with_overrides(&overrides).is_err());
    }
}
