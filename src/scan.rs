// Copyright (C) 2025 the stemmix authors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{fmt, fs, path::Path, path::PathBuf, str::FromStr};

use tracing::debug;

use crate::error::EngineError;
use crate::util::filename_display;

/// The role a stem file plays within a song. Inferred from the file name and
/// fixed for the lifetime of the track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StemRole {
    Vocals,
    Drums,
    Bass,
    Instrumental,
    Other,
    Unclassified,
}

impl StemRole {
    /// Roles the scanner can detect, in match priority order. A file name
    /// matching several keywords gets the earliest role in this list.
    pub const DETECTABLE: [StemRole; 5] = [
        StemRole::Instrumental,
        StemRole::Drums,
        StemRole::Vocals,
        StemRole::Bass,
        StemRole::Other,
    ];

    /// The case-insensitive substring that identifies this role in a file name.
    fn keyword(&self) -> &'static str {
        match self {
            StemRole::Vocals => "vocal",
            StemRole::Drums => "drum",
            StemRole::Bass => "bass",
            StemRole::Instrumental => "instrument",
            StemRole::Other => "other",
            StemRole::Unclassified => "",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StemRole::Vocals => "vocals",
            StemRole::Drums => "drums",
            StemRole::Bass => "bass",
            StemRole::Instrumental => "instrumental",
            StemRole::Other => "other",
            StemRole::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for StemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StemRole {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<StemRole, EngineError> {
        match s.to_lowercase().as_str() {
            "vocals" | "vocal" => Ok(StemRole::Vocals),
            "drums" | "drum" => Ok(StemRole::Drums),
            "bass" => Ok(StemRole::Bass),
            "instrumental" | "instrument" => Ok(StemRole::Instrumental),
            "other" | "others" => Ok(StemRole::Other),
            _ => Err(EngineError::InvalidState(format!(
                "unknown stem role '{}' (expected vocals, drums, bass, instrumental, or other)",
                s
            ))),
        }
    }
}

/// Infers a stem role from a file name.
///
/// The match is a case-insensitive substring check with two refinements taken
/// from how stem separation tools name their output: a name containing
/// `(no <keyword>)` never matches that keyword (so "Drums (no vocals).wav" is
/// drums, not vocals), and keywords are tried in [`StemRole::DETECTABLE`]
/// order so a name matching several keywords gets one role.
pub fn classify(file_name: &str) -> StemRole {
    let lowered = file_name.to_lowercase();
    for role in StemRole::DETECTABLE {
        let keyword = role.keyword();
        if lowered.contains(&format!("(no {}", keyword)) {
            continue;
        }
        if lowered.contains(keyword) {
            return role;
        }
    }
    StemRole::Unclassified
}

/// Scans a folder for stem files, yielding at most one file per detectable
/// role in priority order. Files whose names match no keyword are ignored.
///
/// When several files compete for a role, a name carrying the parenthesized
/// form of the keyword ("Song (Vocals).wav") outranks a plain substring match;
/// remaining ties break by lexicographic file name so rescanning the same
/// folder always yields the same result.
pub fn scan_folder(dir: &Path) -> Result<Vec<(PathBuf, StemRole)>, EngineError> {
    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| EngineError::io(dir, e))? {
        let entry = entry.map_err(|e| EngineError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        files.push((filename_display(&path).to_string(), path));
    }
    files.sort();

    let mut found: Vec<(PathBuf, StemRole)> = Vec::new();
    for role in StemRole::DETECTABLE {
        let keyword = role.keyword();
        let candidates: Vec<&(String, PathBuf)> = files
            .iter()
            .filter(|(name, _)| classify(name) == role)
            .collect();

        let parenthesized = candidates
            .iter()
            .find(|(name, _)| name.to_lowercase().contains(&format!("({}", keyword)));
        if let Some((name, path)) = parenthesized.or(candidates.first()) {
            debug!(role = role.as_str(), file = name, "Matched stem file.");
            found.push((path.clone(), role));
        }
    }

    Ok(found)
}
