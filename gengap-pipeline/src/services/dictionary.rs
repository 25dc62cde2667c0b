//! Offline name-dictionary tier
//!
//! First inference tier after the cache: a static name -> gender
//! frequency table covering common given names, loaded once at
//! startup from a TSV reference file. "mostly_*" labels reflect
//! residual ambiguity and map to 0.75 in the corresponding direction
//! instead of a definite 1.0/0.0.

use crate::services::inference::NameResolver;
use crate::services::Resolution;
use async_trait::async_trait;
use gengap_common::db::Gender;
use gengap_common::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Dictionary label vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictLabel {
    Male,
    Female,
    MostlyMale,
    MostlyFemale,
}

impl DictLabel {
    fn parse(label: &str) -> Option<DictLabel> {
        match label {
            "male" => Some(DictLabel::Male),
            "female" => Some(DictLabel::Female),
            "mostly_male" => Some(DictLabel::MostlyMale),
            "mostly_female" => Some(DictLabel::MostlyFemale),
            _ => None,
        }
    }

    /// P(female) mapping: definite labels are 1.0/0.0, "mostly" 0.75
    /// toward the labelled direction.
    pub fn to_resolution(self) -> Resolution {
        let (gender, p_female) = match self {
            DictLabel::Female => (Gender::Female, 1.0),
            DictLabel::Male => (Gender::Male, 0.0),
            DictLabel::MostlyFemale => (Gender::Female, 0.75),
            DictLabel::MostlyMale => (Gender::Male, 0.25),
        };
        Resolution {
            gender,
            p_female: Some(p_female),
            source: Some(SOURCE_DICTIONARY.to_string()),
        }
    }
}

pub const SOURCE_DICTIONARY: &str = "dictionary";

/// Static given-name -> gender lookup table
#[derive(Debug)]
pub struct NameDictionary {
    entries: HashMap<String, DictLabel>,
}

impl NameDictionary {
    /// Load from a TSV file of `name<TAB>label` lines. Lines starting
    /// with '#' are comments; names labelled "unknown" are simply
    /// absent from the table.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read name dictionary {} failed: {}", path.display(), e))
        })?;

        let mut entries = HashMap::new();
        let mut skipped = 0usize;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((name, label)) = line.split_once('\t') else {
                skipped += 1;
                continue;
            };
            match DictLabel::parse(label.trim()) {
                Some(label) => {
                    entries.insert(name.trim().to_lowercase(), label);
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!("Skipped {} unusable name dictionary lines", skipped);
        }
        info!(
            "Loaded name dictionary with {} entries from {}",
            entries.len(),
            path.display()
        );

        Ok(Self { entries })
    }

    /// Build directly from entries; used by tests and fixtures.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, DictLabel)>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, label)| (name.to_lowercase(), label))
                .collect(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<DictLabel> {
        self.entries.get(&name.to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl NameResolver for NameDictionary {
    fn id(&self) -> &'static str {
        SOURCE_DICTIONARY
    }

    async fn attempt(&self, name: &str) -> anyhow::Result<Option<Resolution>> {
        Ok(self.lookup(name).map(DictLabel::to_resolution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_tsv_with_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# name dictionary fixture").unwrap();
        writeln!(file, "maria\tfemale").unwrap();
        writeln!(file, "Noah\tmale").unwrap();
        writeln!(file, "robin\tmostly_female").unwrap();
        writeln!(file, "kim\tunknown").unwrap();
        writeln!(file, "broken line without tab").unwrap();

        let dict = NameDictionary::load(file.path()).unwrap();
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.lookup("MARIA"), Some(DictLabel::Female));
        assert_eq!(dict.lookup("noah"), Some(DictLabel::Male));
        assert_eq!(dict.lookup("kim"), None);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = NameDictionary::load(Path::new("/nonexistent/names.tsv")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn probability_is_always_p_female() {
        let female = DictLabel::Female.to_resolution();
        assert_eq!(female.p_female, Some(1.0));

        let male = DictLabel::Male.to_resolution();
        assert_eq!(male.gender, Gender::Male);
        assert_eq!(male.p_female, Some(0.0));

        let mostly_male = DictLabel::MostlyMale.to_resolution();
        assert_eq!(mostly_male.p_female, Some(0.25));

        let mostly_female = DictLabel::MostlyFemale.to_resolution();
        assert_eq!(mostly_female.gender, Gender::Female);
        assert_eq!(mostly_female.p_female, Some(0.75));
    }
}
