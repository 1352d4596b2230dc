//! Serializing a novel into a yw7 document.

use indexmap::IndexMap;
use quill_model::{
    CH_ROOT, CHAPTER_PREFIX, CR_ROOT, Chapter, ChapterKind, IT_ROOT, LC_ROOT, NovelService,
    PL_ROOT, PN_ROOT, PlotPoint, SECTION_PREFIX, SceneKind, Section, SectionKind, create_id,
    join_list, numeric_id,
};
use tracing::debug;

use crate::error::{Error, Result};
use crate::file::{STAGE_MARKER, Yw7File};
use crate::shortcode::flow_to_shortcode;
use crate::xml::Element;

/// Chapter type slots of the legacy format: `Unused` presence, `Type`,
/// `ChapterType`.
const CHAPTER_TYPE_SLOTS: [(bool, &str, &str); 4] = [
    (false, "0", "0"), // normal
    (true, "1", "1"),  // notes
    (true, "1", "2"),  // todo; carries plot structure
    (true, "1", "0"),  // unused
];

/// Scene type slots: `Unused` presence, `Field_SceneType` value.
const SCENE_TYPE_SLOTS: [(bool, Option<&str>); 4] = [
    (false, None),     // normal
    (true, Some("1")), // notes
    (true, Some("2")), // todo; used for plot points and stages
    (true, Some("0")), // unused
];

impl Yw7File {
    /// Write the novel to the project file.
    ///
    /// The whole document is assembled and post-processed in memory; the
    /// file on disk is only touched for the final atomic replacement.
    pub fn write(&mut self, svc: &dyn NovelService) -> Result<()> {
        if self.is_locked() {
            return Err(Error::LockedByExternalTool);
        }
        if self.novel.languages.is_none() {
            self.novel.update_languages();
        }
        if self.emits_project_vars() {
            self.novel.check_locale();
        }

        let root = self.build_tree(svc)?;
        let text = Self::postprocess(&root.serialize(), self.novel.chapters.is_empty());
        self.replace_file(&text)?;
        debug!(path = %self.path().display(), "project written");
        Ok(())
    }

    fn emits_project_vars(&self) -> bool {
        self.novel.languages.as_ref().is_some_and(|l| !l.is_empty())
            || self.novel.language_code.as_deref().is_some_and(|c| !c.is_empty())
            || self.novel.country_code.as_deref().is_some_and(|c| !c.is_empty())
    }

    fn build_tree(&self, svc: &dyn NovelService) -> Result<Element> {
        let novel = &self.novel;
        let mut root = Element::new("YWRITER7");

        root.push(self.build_project());
        root.push(self.build_world_elements("LOCATIONS", "LOCATION", LC_ROOT, &novel.locations)?);
        root.push(self.build_world_elements("ITEMS", "ITEM", IT_ROOT, &novel.items)?);
        root.push(self.build_characters()?);
        root.push(self.build_project_vars());

        //--- Allocate scene IDs for plot points up front; the association
        //    fields and the flattened plot line chapters both need them.
        let mut all_scene_ids: Vec<String> = novel.sections.keys().cloned().collect();
        let mut new_scene_ids: IndexMap<String, String> = IndexMap::new();
        for pp_id in novel.plot_points.keys() {
            let sc_id = create_id(&all_scene_ids, SECTION_PREFIX);
            all_scene_ids.push(sc_id.clone());
            new_scene_ids.insert(pp_id.clone(), sc_id);
        }
        let (scene_arcs, scene_assoc) = self.collect_plot_references(&all_scene_ids, &new_scene_ids)?;

        root.push(self.build_scenes(&scene_arcs, &scene_assoc, &new_scene_ids)?);
        root.push(self.build_chapters(svc, &new_scene_ids)?);

        if !novel.tree.children(PN_ROOT).is_empty() {
            root.push(self.build_project_notes()?);
        }
        if !self.wc_log.is_empty() {
            root.push(self.build_word_count_log());
        }
        Ok(root)
    }

    fn build_project(&self) -> Element {
        let novel = &self.novel;
        let mut project = Element::new("PROJECT");
        project.push_leaf("Ver", "7");
        if let Some(title) = non_empty(novel.title.as_deref()) {
            project.push_leaf("Title", title);
        }
        if let Some(desc) = non_empty(novel.desc.as_deref()) {
            project.push_leaf("Desc", desc);
        }
        if let Some(author) = non_empty(novel.author_name.as_deref()) {
            project.push_leaf("AuthorName", author);
        }
        if let Some(count) = novel.word_count_start {
            project.push_leaf("WordCountStart", count.to_string());
        }
        if let Some(target) = novel.word_target {
            project.push_leaf("WordTarget", target.to_string());
        }

        let mut fields = Element::new("Fields");
        let entries: [(&str, Option<String>); 17] = [
            ("Field_WorkPhase", novel.work_phase.map(|phase| phase.to_string())),
            ("Field_RenumberChapters", flag(novel.renumber_chapters)),
            ("Field_RenumberParts", flag(novel.renumber_parts)),
            ("Field_RenumberWithinParts", flag(novel.renumber_within_parts)),
            ("Field_RomanChapterNumbers", flag(novel.roman_chapter_numbers)),
            ("Field_RomanPartNumbers", flag(novel.roman_part_numbers)),
            ("Field_ChapterHeadingPrefix", non_empty(Some(novel.chapter_heading_prefix.as_str())).map(str::to_string)),
            ("Field_ChapterHeadingSuffix", non_empty(Some(novel.chapter_heading_suffix.as_str())).map(str::to_string)),
            ("Field_PartHeadingPrefix", non_empty(Some(novel.part_heading_prefix.as_str())).map(str::to_string)),
            ("Field_PartHeadingSuffix", non_empty(Some(novel.part_heading_suffix.as_str())).map(str::to_string)),
            ("Field_CustomGoal", non_empty(Some(novel.custom_goal.as_str())).map(str::to_string)),
            ("Field_CustomConflict", non_empty(Some(novel.custom_conflict.as_str())).map(str::to_string)),
            ("Field_CustomOutcome", non_empty(Some(novel.custom_outcome.as_str())).map(str::to_string)),
            ("Field_CustomChrBio", non_empty(Some(novel.custom_chr_bio.as_str())).map(str::to_string)),
            ("Field_CustomChrGoals", non_empty(Some(novel.custom_chr_goals.as_str())).map(str::to_string)),
            ("Field_SaveWordCount", flag(novel.save_word_count)),
            ("Field_ReferenceDate", non_empty(novel.reference_date.as_deref()).map(str::to_string)),
        ];
        for (name, value) in entries {
            if let Some(value) = value {
                fields.push_leaf(name, value);
            }
        }
        project.push(fields);
        project
    }

    fn build_world_elements(
        &self,
        container: &str,
        entry: &str,
        tree_root: &str,
        table: &IndexMap<String, quill_model::WorldElement>,
    ) -> Result<Element> {
        let mut xml = Element::new(container);
        for id in self.novel.tree.children(tree_root) {
            let element = table
                .get(id)
                .ok_or_else(|| Error::Model(format!("unknown element ID {id}")))?;
            let entry_xml = xml.push(Element::new(entry));
            entry_xml.push_leaf("ID", numeric_id(id));
            if let Some(title) = non_empty(element.title.as_deref()) {
                entry_xml.push_leaf("Title", title);
            }
            if let Some(desc) = non_empty(element.desc.as_deref()) {
                entry_xml.push_leaf("Desc", desc);
            }
            if let Some(aka) = non_empty(element.aka.as_deref()) {
                entry_xml.push_leaf("AKA", aka);
            }
            if !element.tags.is_empty() {
                entry_xml.push_leaf("Tags", join_list(&element.tags));
            }
        }
        Ok(xml)
    }

    fn build_characters(&self) -> Result<Element> {
        let mut xml = Element::new("CHARACTERS");
        for cr_id in self.novel.tree.children(CR_ROOT) {
            let character = self
                .novel
                .characters
                .get(cr_id)
                .ok_or_else(|| Error::Model(format!("unknown character ID {cr_id}")))?;
            let entry = xml.push(Element::new("CHARACTER"));
            entry.push_leaf("ID", numeric_id(cr_id));
            if let Some(title) = non_empty(character.title.as_deref()) {
                entry.push_leaf("Title", title);
            }
            if let Some(desc) = non_empty(character.desc.as_deref()) {
                entry.push_leaf("Desc", desc);
            }
            if let Some(notes) = non_empty(character.notes.as_deref()) {
                entry.push_leaf("Notes", notes);
            }
            if let Some(aka) = non_empty(character.aka.as_deref()) {
                entry.push_leaf("AKA", aka);
            }
            if !character.tags.is_empty() {
                entry.push_leaf("Tags", join_list(&character.tags));
            }
            if let Some(bio) = non_empty(character.bio.as_deref()) {
                entry.push_leaf("Bio", bio);
            }
            if let Some(goals) = non_empty(character.goals.as_deref()) {
                entry.push_leaf("Goals", goals);
            }
            if let Some(full_name) = non_empty(character.full_name.as_deref()) {
                entry.push_leaf("FullName", full_name);
            }
            if character.is_major {
                entry.push_leaf("Major", "-1");
            }
            let mut fields = Element::new("Fields");
            if !character.birth_date.is_empty() {
                fields.push_leaf("Field_BirthDate", character.birth_date.as_str());
            }
            if !character.death_date.is_empty() {
                fields.push_leaf("Field_DeathDate", character.death_date.as_str());
            }
            if !fields.children().is_empty() {
                entry.push(fields);
            }
        }
        Ok(xml)
    }

    /// Project variables carry the locale and one opener/closer pair per
    /// body language, so the legacy tool can expand language spans.
    fn build_project_vars(&self) -> Element {
        let mut xml = Element::new("PROJECTVARS");
        if !self.emits_project_vars() {
            return xml;
        }
        let novel = &self.novel;
        let mut var_ids: Vec<String> = Vec::new();
        let mut add_var = |xml: &mut Element, title: String, desc: String| {
            let id = create_id(&var_ids, "");
            var_ids.push(id.clone());
            let var = xml.push(Element::new("PROJECTVAR"));
            var.push_leaf("ID", id);
            var.push_leaf("Title", title);
            var.push_leaf("Desc", desc);
            var.push_leaf("Tags", "0");
        };

        add_var(
            &mut xml,
            "Language".to_string(),
            novel.language_code.clone().unwrap_or_default(),
        );
        add_var(
            &mut xml,
            "Country".to_string(),
            novel.country_code.clone().unwrap_or_default(),
        );
        for code in novel.languages.as_deref().unwrap_or_default() {
            add_var(
                &mut xml,
                format!("lang={code}"),
                format!("<HTM <SPAN LANG=\"{code}\"> /HTM>"),
            );
            add_var(&mut xml, format!("/lang={code}"), "<HTM </SPAN> /HTM>".to_string());
        }
        xml
    }

    /// Both directions of the plot structure, keyed by scene ID: the short
    /// names of the plot lines a scene belongs to, and the numeric scene
    /// IDs associated through plot points.
    #[allow(clippy::type_complexity)]
    fn collect_plot_references(
        &self,
        all_scene_ids: &[String],
        new_scene_ids: &IndexMap<String, String>,
    ) -> Result<(IndexMap<String, Vec<String>>, IndexMap<String, Vec<String>>)> {
        let novel = &self.novel;
        let mut scene_arcs: IndexMap<String, Vec<String>> = all_scene_ids
            .iter()
            .map(|id| (id.clone(), Vec::new()))
            .collect();
        let mut scene_assoc = scene_arcs.clone();

        for (pl_id, plot_line) in &novel.plot_lines {
            for sc_id in &plot_line.sections {
                scene_arcs
                    .get_mut(sc_id)
                    .ok_or_else(|| {
                        Error::Model(format!("plot line {pl_id} references unknown section {sc_id}"))
                    })?
                    .push(plot_line.short_name.clone());
            }
            for pp_id in novel.tree.children(pl_id) {
                let sc_id = new_scene_ids.get(pp_id).ok_or_else(|| {
                    Error::Model(format!("plot line {pl_id} references unknown plot point {pp_id}"))
                })?;
                scene_arcs
                    .get_mut(sc_id)
                    .ok_or_else(|| Error::Model(format!("unknown scene ID {sc_id}")))?
                    .push(plot_line.short_name.clone());
            }
        }

        for (pp_id, plot_point) in &novel.plot_points {
            let Some(sc_id) = plot_point.section.as_deref().filter(|id| !id.is_empty()) else {
                continue;
            };
            let new_id = new_scene_ids
                .get(pp_id)
                .ok_or_else(|| Error::Model(format!("unknown plot point ID {pp_id}")))?;
            scene_assoc
                .get_mut(sc_id)
                .ok_or_else(|| {
                    Error::Model(format!("plot point {pp_id} references unknown section {sc_id}"))
                })?
                .push(numeric_id(new_id).to_string());
            scene_assoc
                .get_mut(new_id.as_str())
                .ok_or_else(|| Error::Model(format!("unknown scene ID {new_id}")))?
                .push(numeric_id(sc_id).to_string());
        }
        Ok((scene_arcs, scene_assoc))
    }

    fn build_scenes(
        &self,
        scene_arcs: &IndexMap<String, Vec<String>>,
        scene_assoc: &IndexMap<String, Vec<String>>,
        new_scene_ids: &IndexMap<String, String>,
    ) -> Result<Element> {
        let mut xml = Element::new("SCENES");
        for (sc_id, section) in &self.novel.sections {
            let arcs = scene_arcs.get(sc_id).map(Vec::as_slice).unwrap_or_default();
            let assoc = scene_assoc.get(sc_id).map(Vec::as_slice).unwrap_or_default();
            xml.push(self.build_scene(sc_id, section, arcs, assoc)?);
        }
        for (pp_id, plot_point) in &self.novel.plot_points {
            let sc_id = &new_scene_ids[pp_id];
            let arcs = scene_arcs.get(sc_id).map(Vec::as_slice).unwrap_or_default();
            let assoc = scene_assoc.get(sc_id).map(Vec::as_slice).unwrap_or_default();
            xml.push(build_plot_point_scene(sc_id, plot_point, arcs, assoc));
        }
        Ok(xml)
    }

    fn build_scene(
        &self,
        sc_id: &str,
        section: &Section,
        arcs: &[String],
        assoc: &[String],
    ) -> Result<Element> {
        let mut xml = Element::new("SCENE");
        xml.push_leaf("ID", numeric_id(sc_id));
        if let Some(title) = section.title.as_deref() {
            xml.push_leaf("Title", title);
        }

        // The stage marker travels as a tag; work on a copy so the model
        // keeps the caller's tag list.
        let mut tags = section.tags.clone();
        let slot = match section.kind {
            SectionKind::Normal => 0,
            SectionKind::Stage => {
                if !tags.iter().any(|tag| tag == STAGE_MARKER) {
                    tags.push(STAGE_MARKER.to_string());
                }
                2
            }
            SectionKind::Unused => 3,
        };
        let (unused, scene_type) = SCENE_TYPE_SLOTS[slot];

        let mut fields = Element::new("Fields");
        if let Some(scene_type) = scene_type {
            fields.push_leaf("Field_SceneType", scene_type);
        }
        if !arcs.is_empty() {
            fields.push_leaf("Field_SceneArcs", join_list(arcs));
        }
        if !assoc.is_empty() {
            fields.push_leaf("Field_SceneAssoc", join_list(assoc));
        }
        xml.push(fields);

        if let Some(desc) = section.desc.as_deref() {
            xml.push_leaf("Desc", desc);
        }
        if unused {
            xml.push_leaf("Unused", "-1");
        }
        if let Some(status) = section.status {
            xml.push_leaf("Status", status.to_string());
        }
        xml.push_leaf("SceneContent", flow_to_shortcode(&section.content)?);
        if let Some(notes) = non_empty(section.notes.as_deref()) {
            xml.push_leaf("Notes", notes);
        }
        if !tags.is_empty() {
            xml.push_leaf("Tags", join_list(&tags));
        }
        if section.append_to_prev {
            xml.push_leaf("AppendToPrev", "-1");
        }

        //--- Scene start.
        let date = non_empty(section.date.as_deref());
        let time = non_empty(section.time.as_deref());
        let day = non_empty(section.day.as_deref());
        if let (Some(date), Some(time)) = (date, time) {
            xml.push_leaf("SpecificDateTime", format!("{date} {time}"));
            xml.push_leaf("SpecificDateMode", "-1");
        } else if day.is_some() || time.is_some() {
            if let Some(day) = day {
                xml.push_leaf("Day", day);
            }
            if let Some(time) = time {
                let mut parts = time.split(':');
                if let (Some(hours), Some(minutes)) = (parts.next(), parts.next()) {
                    xml.push_leaf("Hour", hours);
                    xml.push_leaf("Minute", minutes);
                }
            }
        }

        //--- Scene duration.
        if let Some(lasts) = non_empty(section.lasts_days.as_deref()) {
            xml.push_leaf("LastsDays", lasts);
        }
        if let Some(lasts) = non_empty(section.lasts_hours.as_deref()) {
            xml.push_leaf("LastsHours", lasts);
        }
        if let Some(lasts) = non_empty(section.lasts_minutes.as_deref()) {
            xml.push_leaf("LastsMinutes", lasts);
        }

        if section.scene == SceneKind::Reaction {
            xml.push_leaf("ReactionScene", "-1");
        }
        if let Some(goal) = non_empty(section.goal.as_deref()) {
            xml.push_leaf("Goal", goal);
        }
        if let Some(conflict) = non_empty(section.conflict.as_deref()) {
            xml.push_leaf("Conflict", conflict);
        }
        if let Some(outcome) = non_empty(section.outcome.as_deref()) {
            xml.push_leaf("Outcome", outcome);
        }

        push_id_list(&mut xml, "Characters", "CharID", &section.characters);
        push_id_list(&mut xml, "Locations", "LocID", &section.locations);
        push_id_list(&mut xml, "Items", "ItemID", &section.items);
        Ok(xml)
    }

    fn build_chapters(
        &self,
        svc: &dyn NovelService,
        new_scene_ids: &IndexMap<String, String>,
    ) -> Result<Element> {
        let novel = &self.novel;
        let mut xml = Element::new("CHAPTERS");
        let mut ch_ids: Vec<String> = novel.tree.children(CH_ROOT).to_vec();

        for ch_id in novel.tree.children(CH_ROOT) {
            let chapter = novel
                .chapters
                .get(ch_id)
                .ok_or_else(|| Error::Model(format!("unknown chapter ID {ch_id}")))?;
            let slot = match chapter.kind {
                ChapterKind::Normal => 0,
                ChapterKind::Notes | ChapterKind::Todo | ChapterKind::Unused => 3,
            };
            let entry = xml.push(build_chapter_element(
                numeric_id(ch_id),
                chapter,
                slot,
                None,
            ));
            let scene_ids = novel.tree.children(ch_id);
            if !scene_ids.is_empty() {
                let list = entry.push(Element::new("Scenes"));
                for sc_id in scene_ids {
                    list.push_leaf("ScID", numeric_id(sc_id));
                }
            }
        }

        //--- Flatten plot lines into one container part plus one chapter
        //    per line, all at the todo slot.
        let pl_ids = novel.tree.children(PL_ROOT);
        if pl_ids.is_empty() {
            return Ok(xml);
        }
        let container_id = create_id(&ch_ids, CHAPTER_PREFIX);
        ch_ids.push(container_id.clone());
        let arc_part = svc.make_chapter(Some("Plot lines"), Some(1));
        xml.push(build_chapter_element(
            numeric_id(&container_id),
            &arc_part,
            2,
            None,
        ));
        for pl_id in pl_ids {
            let plot_line = novel
                .plot_lines
                .get(pl_id)
                .ok_or_else(|| Error::Model(format!("unknown plot line ID {pl_id}")))?;
            let ch_id = create_id(&ch_ids, CHAPTER_PREFIX);
            ch_ids.push(ch_id.clone());
            let mut chapter = svc.make_chapter(None, None);
            chapter.title = plot_line.title.clone();
            chapter.desc = plot_line.desc.clone();
            let entry = xml.push(build_chapter_element(
                numeric_id(&ch_id),
                &chapter,
                2,
                Some(&plot_line.short_name),
            ));
            let pp_ids = novel.tree.children(pl_id);
            if !pp_ids.is_empty() {
                let list = entry.push(Element::new("Scenes"));
                for pp_id in pp_ids {
                    let sc_id = new_scene_ids.get(pp_id).ok_or_else(|| {
                        Error::Model(format!("unknown plot point ID {pp_id}"))
                    })?;
                    list.push_leaf("ScID", numeric_id(sc_id));
                }
            }
        }
        Ok(xml)
    }

    fn build_project_notes(&self) -> Result<Element> {
        let mut xml = Element::new("PROJECTNOTES");
        for pn_id in self.novel.tree.children(PN_ROOT) {
            let note = self
                .novel
                .project_notes
                .get(pn_id)
                .ok_or_else(|| Error::Model(format!("unknown project note ID {pn_id}")))?;
            let entry = xml.push(Element::new("PROJECTNOTE"));
            entry.push_leaf("ID", numeric_id(pn_id));
            if let Some(title) = note.title.as_deref() {
                entry.push_leaf("Title", title);
            }
            if let Some(desc) = note.desc.as_deref() {
                entry.push_leaf("Desc", desc);
            }
        }
        Ok(xml)
    }

    fn build_word_count_log(&self) -> Element {
        let mut xml = Element::new("WCLog");
        let mut last: Option<(&str, &str)> = None;
        for (date, wc) in &self.wc_log {
            if self.novel.save_word_count {
                // Discard entries with unchanged word count.
                if last == Some((wc.count.as_str(), wc.total_count.as_str())) {
                    continue;
                }
                last = Some((wc.count.as_str(), wc.total_count.as_str()));
            }
            let entry = xml.push(Element::new("WC"));
            entry.push_leaf("Date", date.as_str());
            entry.push_leaf("Count", wc.count.as_str());
            entry.push_leaf("TotalCount", wc.total_count.as_str());
        }
        xml
    }
}

fn build_chapter_element(
    id_numeric: &str,
    chapter: &Chapter,
    slot: usize,
    arc_definition: Option<&str>,
) -> Element {
    let (unused, ch_type, chapter_type) = CHAPTER_TYPE_SLOTS[slot];
    let mut xml = Element::new("CHAPTER");
    xml.push_leaf("ID", id_numeric);
    if let Some(title) = chapter.title.as_deref() {
        xml.push_leaf("Title", title);
    }
    if let Some(desc) = chapter.desc.as_deref() {
        xml.push_leaf("Desc", desc);
    }
    if unused {
        xml.push_leaf("Unused", "-1");
    }

    let mut fields = Element::new("Fields");
    match arc_definition {
        Some(short_name) => {
            fields.push_leaf("Field_ArcDefinition", short_name);
        }
        None => {
            if chapter.is_trash {
                fields.push_leaf("Field_IsTrash", "1");
            }
            if chapter.no_number {
                fields.push_leaf("Field_NoNumber", "1");
            }
        }
    }
    xml.push(fields);

    if arc_definition.is_none() && chapter.level == 1 {
        xml.push_leaf("SectionStart", "-1");
    }
    xml.push_leaf("Type", ch_type);
    xml.push_leaf("ChapterType", chapter_type);
    xml
}

fn build_plot_point_scene(
    sc_id: &str,
    plot_point: &PlotPoint,
    arcs: &[String],
    assoc: &[String],
) -> Element {
    let mut xml = Element::new("SCENE");
    xml.push_leaf("ID", numeric_id(sc_id));
    if let Some(title) = plot_point.title.as_deref() {
        xml.push_leaf("Title", title);
    }

    let mut fields = Element::new("Fields");
    fields.push_leaf("Field_SceneType", "2");
    if !arcs.is_empty() {
        fields.push_leaf("Field_SceneArcs", join_list(arcs));
    }
    if !assoc.is_empty() {
        fields.push_leaf("Field_SceneAssoc", join_list(assoc));
    }
    xml.push(fields);

    if let Some(desc) = plot_point.desc.as_deref() {
        xml.push_leaf("Desc", desc);
    }
    xml.push_leaf("Unused", "-1");
    xml.push_leaf("Status", "1");
    xml.push(Element::new("SceneContent"));
    xml
}

fn push_id_list(xml: &mut Element, container: &str, entry: &str, ids: &[String]) {
    if ids.is_empty() {
        return;
    }
    let list = xml.push(Element::new(container));
    for id in ids {
        list.push_leaf(entry, numeric_id(id));
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|text| !text.is_empty())
}

fn flag(value: bool) -> Option<String> {
    value.then(|| "1".to_string())
}
