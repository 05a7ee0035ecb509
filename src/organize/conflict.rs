use clap::ValueEnum;
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Naming scheme applied when a destination name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    /// `a.txt` → `a(1).txt`, `a(2).txt`, …
    Numbered,
    /// `a.txt` → `1-a.txt`, `2-a.txt`, …
    Prefixed,
}

impl ConflictStrategy {
    fn candidate(&self, name: &str, attempt: u32) -> String {
        match self {
            ConflictStrategy::Numbered => {
                let (stem, ext) = split_name(name);
                format!("{}({}){}", stem, attempt, ext)
            }
            ConflictStrategy::Prefixed => format!("{}-{}", attempt, name),
        }
    }
}

/// Splits a file name into stem and extension (including the dot).
/// Dotfiles like `.bashrc` keep the whole name as the stem.
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

/// Finds a name not present in `dir` and not in `reserved`, probing the
/// strategy's numbered candidates. The attempt cap exists only to guard
/// against pathological loops; hitting it is fatal for the run.
pub fn resolve_unique_name(
    dir: &Path,
    candidate: &str,
    strategy: ConflictStrategy,
    reserved: &HashSet<String>,
    max_attempts: u32,
) -> Result<String> {
    let taken = |name: &str| reserved.contains(name) || dir.join(name).exists();

    if !taken(candidate) {
        return Ok(candidate.to_string());
    }

    for attempt in 1..=max_attempts {
        let name = strategy.candidate(candidate, attempt);
        if !taken(&name) {
            return Ok(name);
        }
    }

    Err(Error::NameResolutionExhausted {
        dir: dir.to_path_buf(),
        candidate: candidate.to_string(),
        attempts: max_attempts,
    })
}

/// Serializes name resolution per destination directory so two workers
/// can never be granted the same "unique" name in the resolve→create
/// window. Reservations also stand in for files a dry run would have
/// created, keeping dry-run plans collision-free.
pub struct NameAllocator {
    strategy: ConflictStrategy,
    max_attempts: u32,
    reserved: DashMap<PathBuf, HashSet<String>>,
}

impl NameAllocator {
    pub fn new(strategy: ConflictStrategy, max_attempts: u32) -> NameAllocator {
        NameAllocator {
            strategy,
            max_attempts,
            reserved: DashMap::new(),
        }
    }

    /// Resolves and reserves a free name in `dir`. The per-directory
    /// entry lock is held across the probe so concurrent callers for
    /// the same directory are serialized.
    pub fn reserve(&self, dir: &Path, candidate: &str) -> Result<String> {
        let mut names = self.reserved.entry(dir.to_path_buf()).or_default();
        let name = resolve_unique_name(dir, candidate, self.strategy, &names, self.max_attempts)?;
        names.insert(name.clone());
        Ok(name)
    }
}
