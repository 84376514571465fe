use std::path::Path;

use crate::error::{CrackError, Result};

const PASSWORD_PLACEHOLDER: &str = "{password}";
const ARCHIVE_PLACEHOLDER: &str = "{archive}";

/// A tool invocation with `{password}` and `{archive}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new(program: &str, args: &[&str]) -> Self {
        CommandTemplate {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Fill in the placeholders. Every argument stays a single argv entry,
    /// so a password containing spaces is passed through intact.
    pub fn render(&self, password: &str, archive: &Path) -> Vec<String> {
        let archive = archive.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(PASSWORD_PLACEHOLDER, password)
                    .replace(ARCHIVE_PLACEHOLDER, &archive)
            })
            .collect()
    }
}

/// Archive formats the cracker knows how to test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Rar,
    SevenZip,
    Zip,
}

impl ArchiveKind {
    pub const ALL: [ArchiveKind; 3] = [ArchiveKind::Rar, ArchiveKind::SevenZip, ArchiveKind::Zip];

    /// Infer the archive kind from the file extension.
    ///
    /// The match is exact: `secret.ZIP` is rejected just like `secret.tar`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        Self::ALL
            .into_iter()
            .find(|kind| kind.extension() == extension)
            .ok_or_else(|| CrackError::UnrecognizedArchiveType {
                path: path.to_path_buf(),
                extension,
            })
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveKind::Rar => ".rar",
            ArchiveKind::SevenZip => ".7z",
            ArchiveKind::Zip => ".zip",
        }
    }

    /// Substring of the tool output that means the password was accepted
    pub fn success_marker(&self) -> &'static str {
        match self {
            ArchiveKind::Rar => "All OK",
            ArchiveKind::SevenZip => "Everything is Ok",
            ArchiveKind::Zip => "OK",
        }
    }

    pub fn command(&self) -> CommandTemplate {
        match self {
            ArchiveKind::Rar => CommandTemplate::new("unrar", &["t", "-y", "-p{password}", "{archive}"]),
            ArchiveKind::SevenZip => CommandTemplate::new("7za", &["t", "-y", "-p{password}", "{archive}"]),
            ArchiveKind::Zip => CommandTemplate::new("unzip", &["-P{password}", "-t", "{archive}"]),
        }
    }
}

impl std::fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ArchiveKind::Rar => "rar",
            ArchiveKind::SevenZip => "7z",
            ArchiveKind::Zip => "zip",
        };
        write!(f, "{}", name)
    }
}
