use crate::error::LedgerError;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Durable set of listing identifiers that already received a bid.
///
/// Backed by a UTF-8 text file with one identifier per line. Entries are only
/// ever appended; nothing is removed.
pub struct DedupLedger {
    path: PathBuf,
    seen: HashSet<String>,
}

impl DedupLedger {
    /// Load every identifier recorded so far. A missing file is an empty ledger.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let seen = match std::fs::read_to_string(&path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => HashSet::new(),
            Err(source) => return Err(LedgerError::Unavailable { path, source }),
        };
        tracing::debug!(path = %path.display(), count = seen.len(), "ledger loaded");
        Ok(Self { path, seen })
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.seen.contains(identifier)
    }

    /// Append one identifier to storage, then to the in-memory set.
    ///
    /// Recording an identifier twice writes a second line but leaves membership
    /// unchanged.
    pub fn record(&mut self, identifier: &str) -> Result<(), LedgerError> {
        self.append_line(identifier)
            .map_err(|source| LedgerError::Unavailable {
                path: self.path.clone(),
                source,
            })?;
        self.seen.insert(identifier.to_string());
        Ok(())
    }

    fn append_line(&self, identifier: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", identifier)?;
        file.flush()
    }

    pub fn identifiers(&self) -> &HashSet<String> {
        &self.seen
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
