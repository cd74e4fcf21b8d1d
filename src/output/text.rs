//! Human-readable report rendering.
//!
//! Prints each store's folder tree, indented by depth, with the number of
//! messages removed (or that a dry run would remove) per folder, followed by
//! recorded errors and a one-line summary.
//!
//! ```text
//! Personal
//!   Inbox: 2 removed (5 scanned)
//!     Projects: 0 removed (1 scanned)
//!   Sent: 1 removed (3 scanned)
//!
//! 3 duplicates removed in 4 folders across 1 store
//! ```

use std::io::{self, Write};

use yansi::{Paint, Style};

use crate::report::{FolderResult, RunReport};

const STORE: Style = Style::new().bold();
const COUNT: Style = Style::new().green();
const ZERO: Style = Style::new().dim();
const ERROR: Style = Style::new().red();
const DRY_RUN: Style = Style::new().yellow().bold();

/// Text formatter for a run report.
pub struct TextOutput<'a> {
    report: &'a RunReport,
    color: bool,
}

impl<'a> TextOutput<'a> {
    /// Create a formatter.
    ///
    /// # Arguments
    ///
    /// * `report` - The run report
    /// * `color` - Emit ANSI styling
    #[must_use]
    pub fn new(report: &'a RunReport, color: bool) -> Self {
        Self { report, color }
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color {
            text.paint(style).to_string()
        } else {
            text.to_string()
        }
    }

    fn write_folder<W: Write>(
        &self,
        writer: &mut W,
        depth: usize,
        folder: &FolderResult,
    ) -> io::Result<()> {
        let indent = "  ".repeat(depth);
        let (count, verb) = if self.report.dry_run {
            (folder.candidates, "would be removed")
        } else {
            (folder.duplicates_removed, "removed")
        };
        let style = if count == 0 { ZERO } else { COUNT };
        let label = if depth == 0 {
            self.paint(&folder.name, STORE)
        } else {
            folder.name.clone()
        };
        writeln!(
            writer,
            "{indent}{label}: {} {verb} ({} scanned)",
            self.paint(&count.to_string(), style),
            folder.messages_scanned
        )
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.report.dry_run {
            writeln!(
                writer,
                "{}",
                self.paint("Dry run: no messages were deleted", DRY_RUN)
            )?;
        }

        for store in &self.report.stores {
            for (depth, folder) in store.root.descendants() {
                self.write_folder(writer, depth, folder)?;
            }
            for (path, error) in store.root.all_errors() {
                writeln!(writer, "  {} {path}: {error}", self.paint("error", ERROR))?;
            }
        }

        let totals = self.report.totals();
        let stores = self.report.stores.len();
        writeln!(writer)?;
        if self.report.dry_run {
            writeln!(
                writer,
                "{} duplicates would be removed in {} folders across {} store{}",
                totals.candidates,
                totals.folders,
                stores,
                if stores == 1 { "" } else { "s" }
            )?;
        } else {
            writeln!(
                writer,
                "{} duplicates removed in {} folders across {} store{}",
                totals.removed,
                totals.folders,
                stores,
                if stores == 1 { "" } else { "s" }
            )?;
        }
        if totals.errors > 0 {
            writeln!(
                writer,
                "{}",
                self.paint(&format!("{} errors recorded", totals.errors), ERROR)
            )?;
        }
        Ok(())
    }

    /// Render the report to a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{FolderError, StoreReport};
    use crate::scanner::{HashAlgorithm, KeyPolicy};

    fn tree() -> FolderResult {
        let mut inbox = FolderResult::new("Inbox", "Personal/Inbox");
        inbox.duplicates_removed = 2;
        inbox.candidates = 2;
        inbox.messages_scanned = 5;
        let mut projects = FolderResult::new("Projects", "Personal/Inbox/Projects");
        projects.messages_scanned = 1;
        inbox.child_results.push(projects);

        let mut root = FolderResult::new("Personal", "Personal");
        root.child_results.push(inbox);
        root
    }

    #[test]
    fn test_plain_tree() {
        let mut report = RunReport::new(false, HashAlgorithm::Blake3, &KeyPolicy::default());
        report.push(StoreReport::new("Personal", tree()));
        let text = TextOutput::new(&report, false).render();

        assert!(text.contains("Personal: 0 removed (0 scanned)\n"));
        assert!(text.contains("\n  Inbox: 2 removed (5 scanned)\n"));
        assert!(text.contains("\n    Projects: 0 removed (1 scanned)\n"));
        assert!(text.contains("2 duplicates removed in 3 folders across 1 store\n"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_dry_run_wording() {
        let mut report = RunReport::new(true, HashAlgorithm::Blake3, &KeyPolicy::default());
        report.push(StoreReport::new("Personal", tree()));
        let text = TextOutput::new(&report, false).render();

        assert!(text.starts_with("Dry run"));
        assert!(text.contains("Inbox: 2 would be removed"));
        assert!(text.contains("2 duplicates would be removed"));
    }

    #[test]
    fn test_errors_listed() {
        let mut root = tree();
        root.errors.push(FolderError::ChildListing {
            folder: "Personal".to_string(),
            reason: "denied".to_string(),
        });
        let mut report = RunReport::new(false, HashAlgorithm::Blake3, &KeyPolicy::default());
        report.push(StoreReport::new("Personal", root));
        let text = TextOutput::new(&report, false).render();

        assert!(text.contains("error Personal: Cannot list child folders of Personal: denied"));
        assert!(text.contains("1 errors recorded"));
    }

    #[test]
    fn test_color_adds_escapes() {
        let mut report = RunReport::new(false, HashAlgorithm::Blake3, &KeyPolicy::default());
        report.push(StoreReport::new("Personal", tree()));
        let text = TextOutput::new(&report, true).render();
        assert!(text.contains('\u{1b}'));
    }
}
