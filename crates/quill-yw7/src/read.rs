//! Populating a novel from a yw7 document.

use std::fs;

use chrono::{NaiveDate, NaiveDateTime};
use quill_model::{
    CH_ROOT, CHAPTER_PREFIX, CHARACTER_PREFIX, CR_ROOT, ChapterKind, IT_ROOT, ITEM_PREFIX,
    LC_ROOT, LOCATION_PREFIX, NovelService, PL_ROOT, PLOT_LINE_PREFIX, PLOT_POINT_PREFIX,
    PN_ROOT, PRJ_NOTE_PREFIX, SECTION_PREFIX, SceneKind, SectionKind, split_list,
};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::file::{STAGE_MARKER, WordCount, Yw7File};
use crate::fixer::MarkupFixer;
use crate::flow::FlowConverter;
use crate::xml::{Element, decode_document, strip_illegal_characters};

impl Yw7File {
    /// Parse the project file and replace the novel's attributes.
    ///
    /// Fails without side effects when the legacy tool holds the lock or
    /// the file cannot be decoded or parsed; everything else (unknown
    /// fields, missing optional children, unparseable dates) is absorbed
    /// with documented defaults.
    pub fn read(&mut self, svc: &dyn NovelService) -> Result<()> {
        if self.is_locked() {
            return Err(Error::LockedByExternalTool);
        }

        let raw = fs::read(self.path()).map_err(Error::parse)?;
        let text = decode_document(&raw)?;
        let text = strip_illegal_characters(&text);
        let root = Element::parse(&text)?;

        self.wc_log.clear();
        let mut arc_scene_ids: Vec<String> = Vec::new();

        self.read_project(&root);
        self.read_locations(&root, svc);
        self.read_items(&root, svc);
        self.read_characters(&root, svc);
        self.read_project_variables(&root);
        self.read_chapters(&root, svc, &mut arc_scene_ids);
        self.read_scenes(&root, svc, &arc_scene_ids)?;
        self.read_project_notes(&root, svc);
        self.read_word_counts(&root);

        // Late repairs the legacy tool itself tolerates.
        for section in self.novel.sections.values_mut() {
            if section.status.is_none() {
                section.status = Some(1);
            }
        }
        self.novel.check_locale();
        Ok(())
    }

    fn read_project(&mut self, root: &Element) {
        let Some(project) = root.find("PROJECT") else {
            return;
        };
        if let Some(title) = project.child_text("Title") {
            self.novel.title = Some(title.to_string());
        }
        if let Some(author) = project.child_text("AuthorName") {
            self.novel.author_name = Some(author.to_string());
        }
        if let Some(desc) = project.child_text("Desc") {
            self.novel.desc = Some(desc.to_string());
        }
        if let Some(count) = project.child_text("WordCountStart") {
            if let Ok(count) = count.trim().parse() {
                self.novel.word_count_start = Some(count);
            }
        }
        if let Some(target) = project.child_text("WordTarget") {
            if let Ok(target) = target.trim().parse() {
                self.novel.word_target = Some(target);
            }
        }

        let field = |name: &str| keyword_field_text(project, name).map(str::to_string);
        self.novel.work_phase = field("Field_WorkPhase").and_then(|text| text.parse().ok());
        self.novel.renumber_chapters = field("Field_RenumberChapters").as_deref() == Some("1");
        self.novel.renumber_parts = field("Field_RenumberParts").as_deref() == Some("1");
        self.novel.renumber_within_parts =
            field("Field_RenumberWithinParts").as_deref() == Some("1");
        self.novel.roman_chapter_numbers =
            field("Field_RomanChapterNumbers").as_deref() == Some("1");
        self.novel.roman_part_numbers = field("Field_RomanPartNumbers").as_deref() == Some("1");
        self.novel.chapter_heading_prefix = field("Field_ChapterHeadingPrefix").unwrap_or_default();
        self.novel.chapter_heading_suffix = field("Field_ChapterHeadingSuffix").unwrap_or_default();
        self.novel.part_heading_prefix = field("Field_PartHeadingPrefix").unwrap_or_default();
        self.novel.part_heading_suffix = field("Field_PartHeadingSuffix").unwrap_or_default();
        self.novel.custom_goal = field("Field_CustomGoal").unwrap_or_default();
        self.novel.custom_conflict = field("Field_CustomConflict").unwrap_or_default();
        self.novel.custom_outcome = field("Field_CustomOutcome").unwrap_or_default();
        self.novel.custom_chr_bio = field("Field_CustomChrBio").unwrap_or_default();
        self.novel.custom_chr_goals = field("Field_CustomChrGoals").unwrap_or_default();
        self.novel.save_word_count = field("Field_SaveWordCount").as_deref() == Some("1");
        if let Some(date) = field("Field_ReferenceDate") {
            self.novel.reference_date = Some(date);
        }

        // Locale fields of projects written before project variables took
        // this role over.
        if let Some(code) = field("Field_LanguageCode") {
            self.novel.language_code = Some(code);
        }
        if let Some(code) = field("Field_CountryCode") {
            self.novel.country_code = Some(code);
        }
    }

    fn read_locations(&mut self, root: &Element, svc: &dyn NovelService) {
        self.novel.tree.delete_children(LC_ROOT);
        let Some(locations) = root.find("LOCATIONS") else {
            return;
        };
        for xml in locations.children() {
            let Some(id) = xml.child_text("ID") else {
                continue;
            };
            let lc_id = format!("{LOCATION_PREFIX}{id}");
            let mut location = svc.make_world_element();
            location.title = xml.child_text("Title").map(str::to_string);
            location.desc = xml.child_text("Desc").map(str::to_string);
            location.aka = xml.child_text("AKA").map(str::to_string);
            if let Some(tags) = xml.child_text("Tags") {
                location.tags = split_list(tags);
            }
            self.novel.tree.append(LC_ROOT, lc_id.clone());
            self.novel.locations.insert(lc_id, location);
        }
    }

    fn read_items(&mut self, root: &Element, svc: &dyn NovelService) {
        self.novel.tree.delete_children(IT_ROOT);
        let Some(items) = root.find("ITEMS") else {
            return;
        };
        for xml in items.children() {
            let Some(id) = xml.child_text("ID") else {
                continue;
            };
            let it_id = format!("{ITEM_PREFIX}{id}");
            let mut item = svc.make_world_element();
            item.title = xml.child_text("Title").map(str::to_string);
            item.desc = xml.child_text("Desc").map(str::to_string);
            item.aka = xml.child_text("AKA").map(str::to_string);
            if let Some(tags) = xml.child_text("Tags") {
                item.tags = split_list(tags);
            }
            self.novel.tree.append(IT_ROOT, it_id.clone());
            self.novel.items.insert(it_id, item);
        }
    }

    fn read_characters(&mut self, root: &Element, svc: &dyn NovelService) {
        self.novel.tree.delete_children(CR_ROOT);
        let Some(characters) = root.find("CHARACTERS") else {
            return;
        };
        for xml in characters.children() {
            let Some(id) = xml.child_text("ID") else {
                continue;
            };
            let cr_id = format!("{CHARACTER_PREFIX}{id}");
            let mut character = svc.make_character();
            character.title = xml.child_text("Title").map(str::to_string);
            character.desc = xml.child_text("Desc").map(str::to_string);
            character.aka = xml.child_text("AKA").map(str::to_string);
            if let Some(tags) = xml.child_text("Tags") {
                character.tags = split_list(tags);
            }
            character.notes = xml.child_text("Notes").map(str::to_string);
            character.bio = xml.child_text("Bio").map(str::to_string);
            character.goals = xml.child_text("Goals").map(str::to_string);
            character.full_name = xml.child_text("FullName").map(str::to_string);
            character.is_major = xml.has_child("Major");
            character.birth_date = keyword_field_text(xml, "Field_BirthDate")
                .unwrap_or_default()
                .to_string();
            character.death_date = keyword_field_text(xml, "Field_DeathDate")
                .unwrap_or_default()
                .to_string();
            self.novel.tree.append(CR_ROOT, cr_id.clone());
            self.novel.characters.insert(cr_id, character);
        }
    }

    fn read_project_variables(&mut self, root: &Element) {
        let Some(vars) = root.find("PROJECTVARS") else {
            return;
        };
        for xml in vars.children() {
            let Some(title) = xml.child_text("Title") else {
                continue;
            };
            if title == "Language" {
                if let Some(desc) = xml.child_text("Desc") {
                    self.novel.language_code = Some(desc.to_string());
                }
            } else if title == "Country" {
                if let Some(desc) = xml.child_text("Desc") {
                    self.novel.country_code = Some(desc.to_string());
                }
            } else if title.starts_with("lang=") {
                let parts: Vec<&str> = title.split('=').collect();
                if parts.len() == 2 {
                    self.novel
                        .languages
                        .get_or_insert_with(Vec::new)
                        .push(parts[1].to_string());
                }
            }
        }
    }

    fn read_chapters(
        &mut self,
        root: &Element,
        svc: &dyn NovelService,
        arc_scene_ids: &mut Vec<String>,
    ) {
        self.novel.tree.delete_children(CH_ROOT);
        self.novel.tree.delete_children(PL_ROOT);
        let Some(chapters) = root.find("CHAPTERS") else {
            return;
        };
        for xml in chapters.children() {
            let Some(id) = xml.child_text("ID") else {
                continue;
            };
            let mut chapter = svc.make_chapter(None, None);
            chapter.title = xml.child_text("Title").map(str::to_string);
            chapter.desc = xml.child_text("Desc").map(str::to_string);
            chapter.level = if xml.has_child("SectionStart") { 1 } else { 2 };

            // Chapter type signals accumulated over several legacy tool
            // versions. `ChapterType` (7.0.7.2+) wins over `Type`; with
            // either present, `Unused` upgrades an otherwise normal value.
            let unused = xml.has_child("Unused");
            chapter.kind = ChapterKind::Normal;
            if xml.has_child("ChapterType") {
                let value = xml.child_text("ChapterType").unwrap_or_default();
                if value == "2" || value == "1" || unused {
                    chapter.kind = ChapterKind::Notes;
                }
            } else if xml.has_child("Type") {
                let value = xml.child_text("Type").unwrap_or_default();
                if value == "1" || unused {
                    chapter.kind = ChapterKind::Notes;
                }
            }

            chapter.is_trash = keyword_field_text(xml, "Field_IsTrash") == Some("1");
            chapter.no_number = keyword_field_text(xml, "Field_NoNumber") == Some("1");

            let mut short_name = keyword_field_text(xml, "Field_ArcDefinition");
            // Underscored alias written by one historic exporter release.
            if let Some(legacy) = keyword_field_text(xml, "Field_Arc_Definition") {
                short_name = Some(legacy);
            }

            let scene_ids: Vec<&str> = xml
                .find("Scenes")
                .map(|scenes| {
                    scenes
                        .find_all("ScID")
                        .filter_map(Element::text)
                        .collect()
                })
                .unwrap_or_default();

            match short_name {
                Some(short_name) if !short_name.is_empty() => {
                    // A plot line masquerading as a chapter; its scenes are
                    // plot points.
                    let pl_id = format!("{PLOT_LINE_PREFIX}{id}");
                    let mut plot_line = svc.make_plot_line();
                    plot_line.title = chapter.title.clone();
                    plot_line.desc = chapter.desc.clone();
                    plot_line.short_name = short_name.to_string();
                    self.novel.tree.append(PL_ROOT, pl_id.clone());
                    for sc_id in scene_ids {
                        self.novel
                            .tree
                            .append(&pl_id, format!("{PLOT_POINT_PREFIX}{sc_id}"));
                        arc_scene_ids.push(sc_id.to_string());
                    }
                    self.novel.plot_lines.insert(pl_id, plot_line);
                }
                _ => {
                    let ch_id = format!("{CHAPTER_PREFIX}{id}");
                    self.novel.tree.append(CH_ROOT, ch_id.clone());
                    for sc_id in scene_ids {
                        self.novel
                            .tree
                            .append(&ch_id, format!("{SECTION_PREFIX}{sc_id}"));
                    }
                    self.novel.chapters.insert(ch_id, chapter);
                }
            }
        }
    }

    fn read_scenes(
        &mut self,
        root: &Element,
        svc: &dyn NovelService,
        arc_scene_ids: &[String],
    ) -> Result<()> {
        let Some(scenes) = root.find("SCENES") else {
            return Ok(());
        };
        if self.novel.languages.is_none() {
            self.novel.update_languages();
        }
        let mut converter = FlowConverter::new(
            self.novel.author_name.clone(),
            self.novel.languages.clone().unwrap_or_default(),
        );
        let fixer = MarkupFixer::default();

        for xml in scenes.children() {
            let Some(id) = xml.child_text("ID") else {
                continue;
            };
            let mut section = svc.make_section();
            section.title = xml.child_text("Title").map(str::to_string);
            section.desc = xml.child_text("Desc").map(str::to_string);

            if let Some(content) = xml.child_text("SceneContent") {
                let flow = converter.convert(content);
                section.content = fixer.fix(&flow)?;
            }

            section.kind = SectionKind::Normal;
            if let Some(sc_type) = keyword_field_text(xml, "Field_SceneType") {
                if sc_type == "1" || sc_type == "2" {
                    section.kind = SectionKind::Unused;
                }
            }

            //--- Plot line references by short name.
            let arcs = split_list(keyword_field_text(xml, "Field_SceneArcs").unwrap_or_default());
            for short_name in &arcs {
                if let Some(plot_line) = self
                    .novel
                    .plot_lines
                    .values_mut()
                    .find(|line| &line.short_name == short_name)
                {
                    if section.kind == SectionKind::Normal {
                        plot_line.sections.push(format!("{SECTION_PREFIX}{id}"));
                    }
                }
            }
            let assoc =
                split_list(keyword_field_text(xml, "Field_SceneAssoc").unwrap_or_default());
            section.plot_points = assoc
                .iter()
                .map(|pp| format!("{PLOT_POINT_PREFIX}{pp}"))
                .collect();

            section.goal = xml.child_text("Goal").map(str::to_string);
            section.conflict = xml.child_text("Conflict").map(str::to_string);
            section.outcome = xml.child_text("Outcome").map(str::to_string);

            section.scene = if keyword_field(xml, "Field_CustomAR").is_some() {
                SceneKind::Custom
            } else if xml.has_child("ReactionScene") {
                SceneKind::Reaction
            } else if section.goal.as_deref().is_some_and(|s| !s.is_empty())
                || section.conflict.as_deref().is_some_and(|s| !s.is_empty())
                || section.outcome.as_deref().is_some_and(|s| !s.is_empty())
            {
                SceneKind::Action
            } else {
                SceneKind::NotApplicable
            };

            if xml.has_child("Unused") && section.kind == SectionKind::Normal {
                section.kind = SectionKind::Unused;
            }

            if let Some(status) = xml.child_text("Status") {
                section.status = status.trim().parse().ok();
            }
            section.notes = xml.child_text("Notes").map(str::to_string);
            if let Some(tags) = xml.child_text("Tags") {
                section.tags = split_list(tags);
            }
            section.append_to_prev = xml.has_child("AppendToPrev");

            self.read_scene_start(xml, &mut section);

            section.lasts_days = xml.child_text("LastsDays").map(str::to_string);
            section.lasts_hours = xml.child_text("LastsHours").map(str::to_string);
            section.lasts_minutes = xml.child_text("LastsMinutes").map(str::to_string);

            section.characters = self.read_id_list(xml, "Characters", "CharID", CHARACTER_PREFIX, CR_ROOT);
            section.locations = self.read_id_list(xml, "Locations", "LocID", LOCATION_PREFIX, LC_ROOT);
            section.items = self.read_id_list(xml, "Items", "ItemID", ITEM_PREFIX, IT_ROOT);

            if arc_scene_ids.contains(&id.to_string()) {
                // Registered earlier as a child of a plot line chapter.
                let pp_id = format!("{PLOT_POINT_PREFIX}{id}");
                let mut plot_point =
                    svc.make_plot_point(section.title.as_deref(), section.desc.as_deref());
                if let Some(first) = assoc.first() {
                    plot_point.section = Some(format!("{SECTION_PREFIX}{first}"));
                }
                self.novel.plot_points.insert(pp_id, plot_point);
            } else {
                if section.tags.iter().any(|tag| tag == STAGE_MARKER) {
                    section.kind = SectionKind::Stage;
                    section.tags.retain(|tag| tag != STAGE_MARKER);
                }
                let sc_id = format!("{SECTION_PREFIX}{id}");
                self.novel.sections.insert(sc_id, section);
            }
        }
        Ok(())
    }

    fn read_scene_start(&self, xml: &Element, section: &mut quill_model::Section) {
        if let Some(date_time) = xml.child_text("SpecificDateTime") {
            if let Some(parsed) = parse_iso_date_time(date_time) {
                section.date = Some(parsed.format("%Y-%m-%d").to_string());
                section.time = Some(parsed.format("%H:%M:%S").to_string());
            }
            return;
        }
        if let Some(day) = xml.child_text("Day") {
            if day.trim().parse::<i64>().is_ok() {
                section.day = Some(day.to_string());
            }
        }
        let hour = xml.child_text("Hour");
        let minute = xml.child_text("Minute");
        if hour.is_some() || minute.is_some() {
            section.time = Some(format!(
                "{:0>2}:{:0>2}:00",
                hour.unwrap_or("00"),
                minute.unwrap_or("00")
            ));
        }
    }

    fn read_id_list(
        &self,
        xml: &Element,
        container: &str,
        entry: &str,
        prefix: &str,
        tree_root: &str,
    ) -> Vec<String> {
        let Some(container) = xml.find(container) else {
            return Vec::new();
        };
        container
            .find_all(entry)
            .filter_map(Element::text)
            .map(|id| format!("{prefix}{id}"))
            .filter(|id| self.novel.tree.children(tree_root).contains(id))
            .collect()
    }

    fn read_project_notes(&mut self, root: &Element, svc: &dyn NovelService) {
        let Some(notes) = root.find("PROJECTNOTES") else {
            return;
        };
        for xml in notes.children() {
            let Some(id) = xml.child_text("ID") else {
                continue;
            };
            let pn_id = format!("{PRJ_NOTE_PREFIX}{id}");
            let mut note = svc.make_basic_element();
            note.title = xml.child_text("Title").map(str::to_string);
            note.desc = xml.child_text("Desc").map(str::to_string);
            self.novel.tree.append(PN_ROOT, pn_id.clone());
            self.novel.project_notes.insert(pn_id, note);
        }
    }

    fn read_word_counts(&mut self, root: &Element) {
        let Some(log) = root.find("WCLog") else {
            return;
        };
        for xml in log.find_all("WC") {
            let (Some(date), Some(count), Some(total)) = (
                xml.child_text("Date"),
                xml.child_text("Count"),
                xml.child_text("TotalCount"),
            ) else {
                warn!("skipping incomplete word count entry");
                continue;
            };
            self.wc_log.insert(
                date.to_string(),
                WordCount {
                    count: count.to_string(),
                    total_count: total.to_string(),
                },
            );
        }
        debug!(entries = self.wc_log.len(), "word count log read");
    }
}

/// First occurrence of a keyword field across the element's `Fields`
/// containers.
fn keyword_field<'a>(xml: &'a Element, name: &str) -> Option<&'a Element> {
    xml.find_all("Fields").find_map(|fields| fields.find(name))
}

fn keyword_field_text<'a>(xml: &'a Element, name: &str) -> Option<&'a str> {
    keyword_field(xml, name).and_then(Element::text)
}

/// Accepts the `T` and space separators the legacy tool writes, and a bare
/// date, which counts as midnight.
fn parse_iso_date_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_date_time_accepts_both_separators() {
        assert!(parse_iso_date_time("2024-07-14 12:30:00").is_some());
        assert!(parse_iso_date_time("2024-07-14T12:30:00").is_some());
        assert!(parse_iso_date_time("someday").is_none());
    }

    #[test]
    fn bare_date_counts_as_midnight() {
        let parsed = parse_iso_date_time("2024-07-14").unwrap();
        assert_eq!(parsed.format("%H:%M:%S").to_string(), "00:00:00");
    }
}
