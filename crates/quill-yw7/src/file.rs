//! The yw7 project file object.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use quill_model::Novel;
use tracing::debug;

use crate::error::{Error, Result};

/// One day's entry of the word-count log, both values kept as the decimal
/// strings the legacy tool wrote.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WordCount {
    pub count: String,
    pub total_count: String,
}

/// A yWriter 7 project file.
///
/// The file object borrows the novel for the duration of a [`read`] or
/// [`write`] call; neither call is re-entrant. Reading replaces the novel's
/// documented attributes, writing only inspects them.
///
/// [`read`]: Yw7File::read
/// [`write`]: Yw7File::write
#[derive(Debug)]
pub struct Yw7File {
    path: PathBuf,
    pub novel: Novel,
    /// Word counts by ISO date, in file order.
    pub wc_log: IndexMap<String, WordCount>,
}

/// Element names whose textual content the legacy tool wraps in CDATA.
pub(crate) const CDATA_TAGS: &[&str] = &[
    "Title",
    "AuthorName",
    "Bio",
    "Desc",
    "FieldTitle1",
    "FieldTitle2",
    "FieldTitle3",
    "FieldTitle4",
    "LaTeXHeaderFile",
    "Tags",
    "AKA",
    "ImageFile",
    "FullName",
    "Goals",
    "Notes",
    "RTFFile",
    "SceneContent",
    "Outcome",
    "Goal",
    "Conflict",
    "Field_ChapterHeadingPrefix",
    "Field_ChapterHeadingSuffix",
    "Field_PartHeadingPrefix",
    "Field_PartHeadingSuffix",
    "Field_CustomGoal",
    "Field_CustomConflict",
    "Field_CustomOutcome",
    "Field_CustomChrBio",
    "Field_CustomChrGoals",
    "Field_ArcDefinition",
    "Field_SceneArcs",
    "Field_CustomAR",
];

/// Tag marking a section as a stage divider in the legacy format.
pub(crate) const STAGE_MARKER: &str = "stage";

impl Yw7File {
    /// File extension of the legacy project format, with the dot.
    pub const EXTENSION: &'static str = ".yw7";

    pub fn new(path: impl Into<PathBuf>, novel: Novel) -> Self {
        Self {
            path: path.into(),
            novel,
            wc_log: IndexMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a `.lock` sibling placed by the legacy tool exists.
    ///
    /// The check is advisory: nothing prevents the lock from appearing
    /// right after it, matching the legacy tool's own behavior.
    pub fn is_locked(&self) -> bool {
        let mut lock = self.path.clone().into_os_string();
        lock.push(".lock");
        Path::new(&lock).is_file()
    }

    /// Rewrite the serialized tree the way the legacy parser expects it.
    ///
    /// Prepends the declaration, re-inserts the CDATA sections the tree
    /// serializer cannot express, expands an empty `<CHAPTERS />` (the
    /// legacy parser rejects the self-closed spelling), and unescapes the
    /// whole text, since the legacy tool stores reserved characters raw
    /// inside CDATA.
    pub(crate) fn postprocess(serialized: &str, no_chapters: bool) -> String {
        let mut lines = vec!["<?xml version=\"1.0\" encoding=\"utf-8\"?>".to_string()];
        for line in serialized.lines() {
            let mut line = line.to_string();
            for tag in CDATA_TAGS {
                line = line
                    .replace(&format!("<{tag}>"), &format!("<{tag}><![CDATA["))
                    .replace(&format!("</{tag}>"), &format!("]]></{tag}>"));
            }
            lines.push(line);
        }
        let mut text = lines.join("\n");
        text = text.replace("[CDATA[ \n", "[CDATA[");
        text = text.replace("\n]]", "]]");
        if no_chapters {
            text = text.replace("<CHAPTERS />", "<CHAPTERS></CHAPTERS>");
        }
        unescape_entities(&text)
    }

    /// Replace the file on disk with `text`, all or nothing.
    ///
    /// An existing file is moved aside first and restored if the write
    /// fails; the backup is removed once the write went through.
    pub(crate) fn replace_file(&self, text: &str) -> Result<()> {
        let display_path = self.path.display().to_string();
        let mut backup = self.path.clone().into_os_string();
        backup.push(".bak");
        let backup = PathBuf::from(backup);

        let backed_up = if self.path.is_file() {
            fs::rename(&self.path, &backup).map_err(|_| Error::Overwrite {
                path: display_path.clone(),
            })?;
            true
        } else {
            false
        };

        match fs::write(&self.path, text) {
            Ok(()) => {
                if backed_up {
                    if let Err(err) = fs::remove_file(&backup) {
                        debug!(error = %err, "could not remove backup file");
                    }
                }
                Ok(())
            }
            Err(_) => {
                if backed_up {
                    let _ = fs::rename(&backup, &self.path);
                }
                Err(Error::Write { path: display_path })
            }
        }
    }
}

/// Undo XML entity escaping over the final document text.
fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postprocess_inserts_cdata_and_header() {
        let text = Yw7File::postprocess("<YWRITER7>\n  <Title>A &amp; B</Title>\n</YWRITER7>\n", false);
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n"));
        assert!(text.contains("<Title><![CDATA[A & B]]></Title>"));
    }

    #[test]
    fn postprocess_expands_empty_chapters() {
        let text = Yw7File::postprocess("<YWRITER7>\n  <CHAPTERS />\n</YWRITER7>\n", true);
        assert!(text.contains("<CHAPTERS></CHAPTERS>"));
    }

    #[test]
    fn unescape_handles_double_escapes() {
        assert_eq!(unescape_entities("&amp;lt;"), "&lt;");
        assert_eq!(unescape_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
    }
}
