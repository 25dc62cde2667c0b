//! Storage summary report
//!
//! Counts surfaced by the `stats` command: table sizes and the gender
//! breakdown, with and without bare-initial names, mirroring the
//! filtered variant of the analysis.

use crate::db::{authors, journals, positions, publications};
use crate::db::authors::GenderBreakdown;
use gengap_common::Result;
use sqlx::SqlitePool;
use std::fmt;

#[derive(Debug, Clone)]
pub struct StorageSummary {
    pub publications: i64,
    pub authors: i64,
    pub author_positions: i64,
    pub journals_matched: i64,
    pub journals_unmatched: i64,
    pub gender_full: GenderBreakdown,
    /// Breakdown excluding single-character (initial-only) names
    pub gender_filtered: GenderBreakdown,
}

pub async fn storage_summary(pool: &SqlitePool) -> Result<StorageSummary> {
    let (journals_matched, journals_unmatched) = journals::match_counts(pool).await?;
    Ok(StorageSummary {
        publications: publications::count_publications(pool).await?,
        authors: authors::count_authors(pool).await?,
        author_positions: positions::count_links(pool).await?,
        journals_matched,
        journals_unmatched,
        gender_full: authors::gender_breakdown(pool, false).await?,
        gender_filtered: authors::gender_breakdown(pool, true).await?,
    })
}

impl fmt::Display for StorageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Publications:      {:>10}", self.publications)?;
        writeln!(f, "Unique authors:    {:>10}", self.authors)?;
        writeln!(f, "Author positions:  {:>10}", self.author_positions)?;
        writeln!(
            f,
            "Journals matched:  {:>10} ({} unmatched)",
            self.journals_matched, self.journals_unmatched
        )?;
        writeln!(f)?;
        write_breakdown(f, "All authors", &self.gender_full)?;
        writeln!(f)?;
        write_breakdown(f, "Excluding initial-only names", &self.gender_filtered)
    }
}

fn write_breakdown(f: &mut fmt::Formatter<'_>, heading: &str, b: &GenderBreakdown) -> fmt::Result {
    let pct = |count: i64| {
        if b.total > 0 {
            100.0 * count as f64 / b.total as f64
        } else {
            0.0
        }
    };
    writeln!(f, "{} ({} total):", heading, b.total)?;
    writeln!(f, "  male:     {:>10} ({:>5.1}%)", b.male, pct(b.male))?;
    writeln!(f, "  female:   {:>10} ({:>5.1}%)", b.female, pct(b.female))?;
    writeln!(f, "  unknown:  {:>10} ({:>5.1}%)", b.unknown, pct(b.unknown))?;
    write!(f, "  other:    {:>10} ({:>5.1}%)", b.other, pct(b.other))
}
