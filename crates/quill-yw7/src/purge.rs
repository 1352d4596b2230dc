//! Removal of data the legacy tool has no use for.
//!
//! Projects that moved back and forth between tools accumulate custom
//! fields and language spans the legacy tool only carries along. These
//! helpers reset them so the next write produces a clean legacy file; both
//! report whether information was actually lost.

use once_cell::sync::Lazy;
use quill_model::{Novel, PL_ROOT, SceneKind};
use regex::Regex;
use tracing::debug;

use crate::file::Yw7File;

static SPAN_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<span xml:lang="[^"]*">"#).unwrap());

/// Reset the custom fields the writer would emit as `Field_*` entries.
///
/// Clears the project-level workflow and numbering fields and drops the
/// plot structure (plot lines, plot points, and section back references),
/// which only exists as custom fields in the legacy format.
pub fn reset_custom_variables(file: &mut Yw7File) -> bool {
    let novel = &mut file.novel;
    let mut changed = false;

    let project_fields_set = novel.work_phase.is_some()
        || novel.renumber_chapters
        || novel.renumber_parts
        || novel.renumber_within_parts
        || novel.roman_chapter_numbers
        || novel.roman_part_numbers
        || !novel.chapter_heading_prefix.is_empty()
        || !novel.chapter_heading_suffix.is_empty()
        || !novel.part_heading_prefix.is_empty()
        || !novel.part_heading_suffix.is_empty()
        || !novel.custom_goal.is_empty()
        || !novel.custom_conflict.is_empty()
        || !novel.custom_outcome.is_empty()
        || !novel.custom_chr_bio.is_empty()
        || !novel.custom_chr_goals.is_empty()
        || novel.save_word_count
        || novel.reference_date.is_some();
    if project_fields_set {
        novel.work_phase = None;
        novel.renumber_chapters = false;
        novel.renumber_parts = false;
        novel.renumber_within_parts = false;
        novel.roman_chapter_numbers = false;
        novel.roman_part_numbers = false;
        novel.chapter_heading_prefix.clear();
        novel.chapter_heading_suffix.clear();
        novel.part_heading_prefix.clear();
        novel.part_heading_suffix.clear();
        novel.custom_goal.clear();
        novel.custom_conflict.clear();
        novel.custom_outcome.clear();
        novel.custom_chr_bio.clear();
        novel.custom_chr_goals.clear();
        novel.save_word_count = false;
        novel.reference_date = None;
        changed = true;
    }

    for chapter in novel.chapters.values_mut() {
        if chapter.no_number {
            chapter.no_number = false;
            changed = true;
        }
    }

    if !novel.plot_lines.is_empty() || !novel.plot_points.is_empty() {
        for pl_id in novel.tree.children(PL_ROOT).to_vec() {
            novel.tree.delete_children(&pl_id);
        }
        novel.tree.delete_children(PL_ROOT);
        novel.plot_lines.clear();
        novel.plot_points.clear();
        changed = true;
    }
    for section in novel.sections.values_mut() {
        if !section.plot_points.is_empty() {
            section.plot_points.clear();
            changed = true;
        }
        if section.scene == SceneKind::Custom {
            section.scene = SceneKind::NotApplicable;
            changed = true;
        }
    }

    if changed {
        debug!("custom variables reset");
    }
    changed
}

/// Strip language spans from all section bodies.
pub fn remove_language_tags(novel: &mut Novel) -> bool {
    let mut changed = false;
    for section in novel.sections.values_mut() {
        let stripped = SPAN_OPEN.replace_all(&section.content, "").into_owned();
        let stripped = stripped.replace("</span>", "");
        if stripped != section.content {
            section.content = stripped;
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_model::Section;

    #[test]
    fn language_tags_are_removed() {
        let mut novel = Novel::new();
        let mut section = Section::default();
        section.content =
            "<p><span xml:lang=\"de\">Hallo</span> there</p>".to_string();
        novel.sections.insert("sc1".to_string(), section);
        assert!(remove_language_tags(&mut novel));
        assert_eq!(
            novel.sections["sc1"].content,
            "<p>Hallo there</p>"
        );
        assert!(!remove_language_tags(&mut novel));
    }

    #[test]
    fn reset_reports_unchanged_projects() {
        let mut file = Yw7File::new("/tmp/unused.yw7", Novel::new());
        assert!(!reset_custom_variables(&mut file));
        file.novel.save_word_count = true;
        assert!(reset_custom_variables(&mut file));
        assert!(!file.novel.save_word_count);
    }
}
