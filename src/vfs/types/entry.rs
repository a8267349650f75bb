/*!
 * Directory Entry
 * One row of a read-directory result
 */

use super::errors::FsError;
use super::file_type::FileType;
use super::metadata::Stat;
use serde::{Deserialize, Deserializer, Serialize};

/// Directory entry with its lstat, when it could be read
///
/// Names that are not valid UTF-8 are converted lossily.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirEntry {
    #[serde(deserialize_with = "deserialize_valid_filename")]
    pub name: String,
    pub file_type: FileType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stat: Option<Stat>,
}

impl DirEntry {
    pub(crate) fn new(name: String, file_type: FileType, stat: Option<Stat>) -> Self {
        Self {
            name,
            file_type,
            stat,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self.file_type, FileType::Directory)
    }

    #[inline]
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self.file_type, FileType::File)
    }

    #[inline]
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        matches!(self.file_type, FileType::Symlink)
    }

    /// Validate a single path component
    #[must_use = "validation result must be checked"]
    pub fn validate_name(name: &str) -> Result<(), FsError> {
        if name.is_empty() {
            return Err(FsError::InvalidArgument("entry name cannot be empty".into()));
        }
        if name.contains('\0') {
            return Err(FsError::InvalidArgument(
                "entry name cannot contain null bytes".into(),
            ));
        }
        if name.contains('/') {
            return Err(FsError::InvalidArgument(
                "entry name cannot contain path separators".into(),
            ));
        }
        Ok(())
    }
}

fn deserialize_valid_filename<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let name = String::deserialize(deserializer)?;
    DirEntry::validate_name(&name).map_err(D::Error::custom)?;
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_helpers() {
        let entry = DirEntry::new("world".into(), FileType::Directory, None);
        assert!(entry.is_dir());
        assert!(!entry.is_file());
        assert!(!entry.is_symlink());
    }

    #[test]
    fn test_entry_validation() {
        assert!(DirEntry::validate_name("server.jar").is_ok());
        assert!(DirEntry::validate_name("").is_err());
        assert!(DirEntry::validate_name("logs/latest.log").is_err());
        assert!(DirEntry::validate_name("bad\0name").is_err());
    }

    #[test]
    fn test_entry_serialization() {
        let entry = DirEntry::new("eula.txt".into(), FileType::File, None);
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"name":"eula.txt","file_type":"file"}"#);
        let back: DirEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);

        let invalid = r#"{"name":"a/b","file_type":"file"}"#;
        assert!(serde_json::from_str::<DirEntry>(invalid).is_err());
    }
}
