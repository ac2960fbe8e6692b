//! Resolves a filename to a destination directory.
//!
//! Resolution walks every file type group in configuration order. For each
//! group containing the file's extension the group destination is taken,
//! then a special case for the extension overrides it, then any keyword found
//! in the filename overrides both. A later matching group replaces the result
//! of an earlier one.
//!
//! # Examples
//!
//! ```
//! use dirsweep::classifier::resolve_destination;
//! use dirsweep::rules::{Destination, FileTypeGroup, RuleSet};
//! use std::collections::HashSet;
//! use std::path::PathBuf;
//!
//! let rules = RuleSet {
//!     groups: vec![FileTypeGroup {
//!         name: "video".to_string(),
//!         extensions: HashSet::from([".mp4".to_string()]),
//!         destination: Destination::Path(PathBuf::from("/dl/Videos")),
//!     }],
//!     ..Default::default()
//! };
//! assert_eq!(
//!     resolve_destination("clip.MP4", &rules),
//!     Some(Destination::Path(PathBuf::from("/dl/Videos")))
//! );
//! assert_eq!(resolve_destination("notes.txt", &rules), None);
//! ```

use crate::rules::{Destination, RuleSet, extension_of};
use std::ffi::OsStr;
use std::path::PathBuf;

/// Why a file is left in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No group contains the file's extension.
    NoRule,
    /// The resolved destination is configured as skip.
    Configured,
    /// A file with the same name already exists at the destination.
    AlreadyPlaced,
}

/// Outcome of classifying one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Destination(PathBuf),
    Skip(SkipReason),
}

impl Verdict {
    pub fn destination(&self) -> Option<&PathBuf> {
        match self {
            Verdict::Destination(path) => Some(path),
            Verdict::Skip(_) => None,
        }
    }
}

/// Applies the group, special-case and keyword rules to `file_name`.
///
/// Returns `None` when no group contains the extension. This touches no
/// filesystem state; see [`classify`] for the full verdict.
pub fn resolve_destination(file_name: &str, rules: &RuleSet) -> Option<Destination> {
    let extension = extension_of(file_name);
    let lower_name = file_name.to_lowercase();
    let mut destination = None;

    for group in rules.groups.iter() {
        if !group.extensions.contains(&extension) {
            continue;
        }
        destination = Some(group.destination.clone());

        if let Some(special) = rules.special_cases.get(&extension) {
            destination = Some(special.clone());
        }

        for rule in &rules.keywords {
            if lower_name.contains(&rule.keyword) && rule.applies_to(&extension, &group.name) {
                destination = Some(rule.destination.clone());
            }
        }
    }

    destination
}

/// Classifies `file_name` against `rules`.
///
/// A file is skipped when nothing matches, when the resolved destination is
/// `skip`, or when `destination/file_name` already exists. The last check keeps
/// repeated runs from moving a file twice or overwriting one already placed.
///
/// Rules see the name with invalid UTF-8 replaced; the existence check uses
/// the name as given.
pub fn classify(file_name: impl AsRef<OsStr>, rules: &RuleSet) -> Verdict {
    let file_name = file_name.as_ref();
    match resolve_destination(&file_name.to_string_lossy(), rules) {
        None => Verdict::Skip(SkipReason::NoRule),
        Some(Destination::Skip) => Verdict::Skip(SkipReason::Configured),
        Some(Destination::Path(dir)) => {
            if dir.join(file_name).exists() {
                Verdict::Skip(SkipReason::AlreadyPlaced)
            } else {
                Verdict::Destination(dir)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{FileTypeGroup, KeywordRule};
    use std::collections::{HashMap, HashSet};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn group(name: &str, exts: &[&str], dest: Destination) -> FileTypeGroup {
        FileTypeGroup {
            name: name.to_string(),
            extensions: exts.iter().map(|e| e.to_string()).collect::<HashSet<_>>(),
            destination: dest,
        }
    }

    fn path(p: &str) -> Destination {
        Destination::Path(PathBuf::from(p))
    }

    /// A typical Downloads layout.
    fn sample_rules() -> RuleSet {
        RuleSet {
            groups: vec![
                group("video", &[".mp4", ".mkv"], path("/dl/Videos")),
                group("image", &[".png", ".jpg"], path("/dl/Images")),
                group("code", &[".py", ".rs"], path("/dl/Coding")),
                group("installer", &[".exe"], Destination::Skip),
            ],
            special_cases: HashMap::from([
                (".mkv".to_string(), path("/dl/HD Videos")),
                (".py".to_string(), path("/dl/Coding/Python")),
            ]),
            keywords: vec![
                KeywordRule {
                    keyword: "wallpaper".to_string(),
                    matches: vec![".png".to_string(), ".jpg".to_string()],
                    destination: path("/dl/Wallpapers"),
                },
                KeywordRule {
                    keyword: "tutorial".to_string(),
                    matches: vec!["video".to_string()],
                    destination: path("/dl/Tutorials"),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_group_destination() {
        let rules = sample_rules();
        assert_eq!(resolve_destination("python.mp4", &rules), Some(path("/dl/Videos")));
        assert_eq!(resolve_destination("photo.JPG", &rules), Some(path("/dl/Images")));
    }

    #[test]
    fn test_special_case_overrides_group() {
        let rules = sample_rules();
        assert_eq!(resolve_destination("videofile.mkv", &rules), Some(path("/dl/HD Videos")));
        assert_eq!(resolve_destination("python.py", &rules), Some(path("/dl/Coding/Python")));
    }

    #[test]
    fn test_keyword_overrides_group_case_insensitive() {
        let rules = sample_rules();
        assert_eq!(resolve_destination("wallpaper.png", &rules), Some(path("/dl/Wallpapers")));
        assert_eq!(
            resolve_destination("My_WallPaper_01.jpg", &rules),
            Some(path("/dl/Wallpapers"))
        );
    }

    #[test]
    fn test_keyword_requires_allowed_extension() {
        let rules = sample_rules();
        // Keyword present but .mp4 is not in the wallpaper rule's list
        assert_eq!(resolve_destination("wallpaper.mp4", &rules), Some(path("/dl/Videos")));
    }

    #[test]
    fn test_keyword_overrides_special_case() {
        let mut rules = sample_rules();
        rules.keywords.push(KeywordRule {
            keyword: "anime".to_string(),
            matches: vec![".mkv".to_string()],
            destination: path("/dl/Anime"),
        });
        assert_eq!(resolve_destination("anime_ep1.mkv", &rules), Some(path("/dl/Anime")));
    }

    #[test]
    fn test_keyword_group_wildcard() {
        let rules = sample_rules();
        assert_eq!(resolve_destination("rust_tutorial.mkv", &rules), Some(path("/dl/Tutorials")));
        // Group wildcard does not leak into other groups
        assert_eq!(resolve_destination("tutorial.py", &rules), Some(path("/dl/Coding/Python")));
    }

    #[test]
    fn test_later_group_wins_on_overlap() {
        let rules = RuleSet {
            groups: vec![
                group("image", &[".svg"], path("/dl/Images")),
                group("vector", &[".svg"], path("/dl/Vectors")),
            ],
            ..Default::default()
        };
        assert_eq!(resolve_destination("logo.svg", &rules), Some(path("/dl/Vectors")));
    }

    #[test]
    fn test_unmatched_and_configured_skip() {
        let rules = sample_rules();
        assert_eq!(classify("notes.txt", &rules), Verdict::Skip(SkipReason::NoRule));
        assert_eq!(classify("setup.exe", &rules), Verdict::Skip(SkipReason::Configured));
    }

    #[test]
    fn test_directory_named_skip_is_a_real_destination() {
        let rules = RuleSet {
            groups: vec![group("misc", &[".bin"], path("/dl/skip"))],
            ..Default::default()
        };
        assert_eq!(
            classify("blob.bin", &rules),
            Verdict::Destination(PathBuf::from("/dl/skip"))
        );
    }

    #[test]
    fn test_existing_file_at_destination_is_skipped() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dest = temp_dir.path().join("Videos");
        fs::create_dir(&dest).expect("Failed to create destination");
        fs::write(dest.join("clip.mp4"), "already here").expect("Failed to write file");

        let rules = RuleSet {
            groups: vec![group("video", &[".mp4"], Destination::Path(dest.clone()))],
            ..Default::default()
        };

        assert_eq!(classify("clip.mp4", &rules), Verdict::Skip(SkipReason::AlreadyPlaced));
        assert!(
            classify("other.mp4", &rules)
                .destination()
                .is_some_and(|d| d.ends_with(Path::new("Videos")))
        );
        assert_eq!(classify("other.mp4", &rules), Verdict::Destination(dest));
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_check_uses_raw_file_name() {
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dest = temp_dir.path().join("Text");
        fs::create_dir(&dest).expect("Failed to create destination");
        let raw = OsStr::from_bytes(b"caf\xe9.txt");
        fs::write(dest.join(raw), "placed").expect("Failed to write file");

        let rules = RuleSet {
            groups: vec![group("text", &[".txt"], Destination::Path(dest.clone()))],
            ..Default::default()
        };

        assert_eq!(classify(raw, &rules), Verdict::Skip(SkipReason::AlreadyPlaced));
        // The display form of the same name is a different file
        assert_eq!(
            classify(&*raw.to_string_lossy(), &rules),
            Verdict::Destination(dest)
        );
    }
}
