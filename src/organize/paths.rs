use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

fn invalid(path: &str, reason: &str) -> Error {
    Error::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

/// Resolves a user-supplied relative path against a trusted root.
///
/// Both `/` and `\` are accepted as separators since the input may come
/// from any client platform. Absolute input, empty input and any `..`
/// sequence that would climb out of `base_root` are rejected. The
/// returned path is lexically normalized (no `.` or `..` components)
/// and guaranteed to sit at or under `base_root`. No filesystem access.
pub fn resolve_under_root(base_root: &Path, user_path: &str) -> Result<PathBuf> {
    if user_path.trim().is_empty() {
        return Err(invalid(user_path, "empty path"));
    }

    let normalized = user_path.replace('\\', "/");
    let candidate = Path::new(&normalized);

    if candidate.is_absolute() || normalized.starts_with('/') {
        return Err(invalid(user_path, "absolute paths are not allowed"));
    }

    let mut parts: Vec<&str> = Vec::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| invalid(user_path, "not valid UTF-8"))?;
                parts.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(invalid(user_path, "path escapes the base directory"));
                }
            }
            // Prefix/RootDir on windows-style input ("C:", leading "/")
            _ => return Err(invalid(user_path, "absolute paths are not allowed")),
        }
    }

    if parts.is_empty() {
        return Err(invalid(user_path, "path resolves to the base directory"));
    }

    let mut resolved = base_root.to_path_buf();
    for part in parts {
        resolved.push(part);
    }

    debug_assert!(resolved.starts_with(base_root));
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PathBuf {
        PathBuf::from("/srv/files/alice")
    }

    #[test]
    fn plain_relative_path_accepted() {
        let resolved = resolve_under_root(&base(), "docs/report.pdf").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/files/alice/docs/report.pdf"));
    }

    #[test]
    fn backslash_separators_normalized() {
        let resolved = resolve_under_root(&base(), "docs\\report.pdf").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/files/alice/docs/report.pdf"));
    }

    #[test]
    fn interior_dotdot_that_stays_inside_accepted() {
        let resolved = resolve_under_root(&base(), "docs/../music/song.mp3").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/files/alice/music/song.mp3"));
    }

    #[test]
    fn escaping_dotdot_rejected() {
        assert!(resolve_under_root(&base(), "../bob/secret.txt").is_err());
        assert!(resolve_under_root(&base(), "docs/../../bob").is_err());
        assert!(resolve_under_root(&base(), "a/../../..").is_err());
    }

    #[test]
    fn absolute_and_degenerate_input_rejected() {
        assert!(resolve_under_root(&base(), "/etc/passwd").is_err());
        assert!(resolve_under_root(&base(), "").is_err());
        assert!(resolve_under_root(&base(), "   ").is_err());
        assert!(resolve_under_root(&base(), ".").is_err());
        assert!(resolve_under_root(&base(), "..").is_err());
    }

    // Pseudo-random property check: any accepted path must normalize to
    // a location under the base; any input whose `..` count ever exceeds
    // its depth must be rejected.
    #[test]
    fn random_paths_never_escape() {
        let fragments = ["a", "b", "photos", "..", ".", "x y", "deep"];
        let mut seed: u64 = 0x5eed;
        for _ in 0..500 {
            let mut input = String::new();
            let len = 1 + (seed % 6) as usize;
            let mut depth: i64 = 0;
            let mut escapes = false;
            for i in 0..len {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let frag = fragments[(seed >> 33) as usize % fragments.len()];
                if i > 0 {
                    input.push('/');
                }
                input.push_str(frag);
                match frag {
                    ".." => {
                        depth -= 1;
                        if depth < 0 {
                            escapes = true;
                        }
                    }
                    "." => {}
                    _ => depth += 1,
                }
            }

            match resolve_under_root(&base(), &input) {
                Ok(resolved) => {
                    assert!(!escapes, "escaping input accepted: {}", input);
                    assert!(resolved.starts_with(base()), "escaped base: {}", input);
                }
                Err(_) => {
                    // Rejection is always allowed for degenerate input, but
                    // an escaping path must never have been accepted.
                }
            }

            if escapes {
                assert!(
                    resolve_under_root(&base(), &input).is_err(),
                    "escaping input accepted: {}",
                    input
                );
            }
        }
    }
}
