//! End-to-end write/read scenarios against real files.
//!
//! Run with: cargo test --test project_roundtrip

use std::fs;
use std::path::Path;

use quill_model::{
    CH_ROOT, CR_ROOT, IT_ROOT, LC_ROOT, Novel, NovelService, PL_ROOT, PN_ROOT, SectionKind,
    StandardNovelService,
};
use quill_yw7::{Error, WordCount, Yw7File};

fn minimal_novel(svc: &StandardNovelService) -> Novel {
    let mut novel = svc.make_novel();
    novel.title = Some("A".to_string());

    let chapter = svc.make_chapter(Some("Ch1"), None);
    novel.tree.append(CH_ROOT, "ch1");
    novel.chapters.insert("ch1".to_string(), chapter);

    let mut section = svc.make_section();
    section.title = Some("Opening".to_string());
    section.content = "<p>Hello <em>world</em>.</p>".to_string();
    section.status = Some(1);
    novel.tree.append("ch1", "sc1");
    novel.sections.insert("sc1".to_string(), section);
    novel
}

fn write_project(path: &Path, novel: Novel) -> Yw7File {
    let svc = StandardNovelService;
    let mut file = Yw7File::new(path, novel);
    file.write(&svc).unwrap();
    file
}

fn read_project(path: &Path) -> Yw7File {
    let svc = StandardNovelService;
    let mut file = Yw7File::new(path, svc.make_novel());
    file.read(&svc).unwrap();
    file
}

#[test]
fn minimal_project_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("minimal.yw7");
    let svc = StandardNovelService;

    write_project(&path, minimal_novel(&svc));
    let file = read_project(&path);

    assert_eq!(file.novel.title.as_deref(), Some("A"));
    assert_eq!(file.novel.chapters["ch1"].title.as_deref(), Some("Ch1"));
    assert_eq!(file.novel.tree.children("ch1"), ["sc1"]);
    let section = &file.novel.sections["sc1"];
    assert_eq!(section.content, "<p>Hello <em>world</em>.</p>");
    assert_eq!(section.kind, SectionKind::Normal);
    assert_eq!(section.status, Some(1));
}

#[test]
fn ids_and_prefixes_are_stable_across_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stable.yw7");
    let svc = StandardNovelService;

    let mut novel = minimal_novel(&svc);
    let mut character = svc.make_character();
    character.title = Some("Ada".to_string());
    character.is_major = true;
    character.birth_date = "1815-12-10".to_string();
    novel.tree.append(CR_ROOT, "cr3");
    novel.characters.insert("cr3".to_string(), character);

    let mut location = svc.make_world_element();
    location.title = Some("London".to_string());
    novel.tree.append(LC_ROOT, "lc2");
    novel.locations.insert("lc2".to_string(), location);

    let mut item = svc.make_world_element();
    item.title = Some("Engine".to_string());
    novel.tree.append(IT_ROOT, "it5");
    novel.items.insert("it5".to_string(), item);

    let mut note = svc.make_basic_element();
    note.title = Some("Remember".to_string());
    novel.tree.append(PN_ROOT, "pn1");
    novel.project_notes.insert("pn1".to_string(), note);

    novel.sections["sc1"].characters.push("cr3".to_string());
    novel.sections["sc1"].locations.push("lc2".to_string());
    novel.sections["sc1"].items.push("it5".to_string());

    write_project(&path, novel);
    let file = read_project(&path);

    assert_eq!(file.novel.tree.children(CH_ROOT), ["ch1"]);
    assert_eq!(file.novel.tree.children(CR_ROOT), ["cr3"]);
    assert_eq!(file.novel.tree.children(LC_ROOT), ["lc2"]);
    assert_eq!(file.novel.tree.children(IT_ROOT), ["it5"]);
    assert_eq!(file.novel.tree.children(PN_ROOT), ["pn1"]);
    let section = &file.novel.sections["sc1"];
    assert_eq!(section.characters, ["cr3"]);
    assert_eq!(section.locations, ["lc2"]);
    assert_eq!(section.items, ["it5"]);
    let character = &file.novel.characters["cr3"];
    assert!(character.is_major);
    assert_eq!(character.birth_date, "1815-12-10");
}

#[test]
fn stage_section_round_trips_with_marker_tag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stage.yw7");
    let svc = StandardNovelService;

    let mut novel = minimal_novel(&svc);
    let mut stage = svc.make_section();
    stage.title = Some("Act One".to_string());
    stage.kind = SectionKind::Stage;
    stage.tags = vec!["alpha".to_string()];
    novel.tree.append("ch1", "sc2");
    novel.sections.insert("sc2".to_string(), stage);

    write_project(&path, novel);

    // On disk the stage travels as a todo scene with the marker tag.
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("<Field_SceneType>2</Field_SceneType>"));
    assert!(text.contains("<Tags><![CDATA[alpha, stage]]></Tags>"));

    let file = read_project(&path);
    let section = &file.novel.sections["sc2"];
    assert_eq!(section.kind, SectionKind::Stage);
    assert_eq!(section.tags, ["alpha"]);
}

#[test]
fn plot_structure_flattens_and_comes_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plot.yw7");
    let svc = StandardNovelService;

    let mut novel = minimal_novel(&svc);
    let mut plot_line = svc.make_plot_line();
    plot_line.title = Some("Main arc".to_string());
    plot_line.short_name = "AS".to_string();
    plot_line.sections = vec!["sc1".to_string()];
    novel.tree.append(PL_ROOT, "pl1");
    novel.plot_lines.insert("pl1".to_string(), plot_line);

    let mut plot_point = svc.make_plot_point(Some("Turning point"), None);
    plot_point.section = Some("sc1".to_string());
    novel.tree.append("pl1", "pp1");
    novel.plot_points.insert("pp1".to_string(), plot_point);

    write_project(&path, novel);
    let file = read_project(&path);

    // Plot line IDs are regenerated from the flattened chapter IDs, the
    // short name and wiring survive.
    assert_eq!(file.novel.plot_lines.len(), 1);
    let (pl_id, plot_line) = file.novel.plot_lines.first().unwrap();
    assert!(pl_id.starts_with("pl"));
    assert_eq!(plot_line.short_name, "AS");
    assert_eq!(plot_line.sections, ["sc1"]);

    assert_eq!(file.novel.plot_points.len(), 1);
    let (pp_id, plot_point) = file.novel.plot_points.first().unwrap();
    assert_eq!(plot_point.title.as_deref(), Some("Turning point"));
    assert_eq!(plot_point.section.as_deref(), Some("sc1"));
    assert_eq!(file.novel.sections["sc1"].plot_points, [pp_id.clone()]);
    assert_eq!(file.novel.tree.children(pl_id), [pp_id.clone()]);
}

#[test]
fn project_variables_cover_locale_and_languages() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locale.yw7");
    let svc = StandardNovelService;

    let mut novel = minimal_novel(&svc);
    novel.language_code = Some("en".to_string());
    novel.country_code = Some("US".to_string());
    novel.languages = Some(vec!["de".to_string(), "fr".to_string()]);

    write_project(&path, novel);
    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.matches("<PROJECTVAR>").count(), 2 + 2 * 2);
    assert!(text.contains("<Title><![CDATA[lang=de]]></Title>"));
    assert!(text.contains("<Desc><![CDATA[<HTM <SPAN LANG=\"de\"> /HTM>]]></Desc>"));

    let file = read_project(&path);
    assert_eq!(file.novel.language_code.as_deref(), Some("en"));
    assert_eq!(file.novel.country_code.as_deref(), Some("US"));
    assert_eq!(
        file.novel.languages.as_deref(),
        Some(&["de".to_string(), "fr".to_string()][..])
    );
}

#[test]
fn word_count_log_dedups_consecutive_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wc.yw7");
    let svc = StandardNovelService;

    let mut novel = minimal_novel(&svc);
    novel.save_word_count = true;
    let mut file = Yw7File::new(&path, novel);
    for (date, count) in [
        ("2024-01-01", "100"),
        ("2024-01-02", "100"),
        ("2024-01-03", "120"),
    ] {
        file.wc_log.insert(
            date.to_string(),
            WordCount {
                count: count.to_string(),
                total_count: count.to_string(),
            },
        );
    }
    file.write(&svc).unwrap();

    let file = read_project(&path);
    let dates: Vec<&String> = file.wc_log.keys().collect();
    assert_eq!(dates, ["2024-01-01", "2024-01-03"]);
}

#[test]
fn locked_projects_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locked.yw7");
    let svc = StandardNovelService;
    write_project(&path, minimal_novel(&svc));

    fs::write(path.with_extension("yw7.lock"), "").unwrap();
    let mut file = Yw7File::new(&path, svc.make_novel());
    let err = file.read(&svc).unwrap_err();
    assert!(matches!(err, Error::LockedByExternalTool));
    assert_eq!(
        err.to_string(),
        "yWriter seems to be open. Please close first."
    );
    let err = write_project_err(&path, minimal_novel(&svc));
    assert!(matches!(err, Error::LockedByExternalTool));
}

fn write_project_err(path: &Path, novel: Novel) -> Error {
    let svc = StandardNovelService;
    let mut file = Yw7File::new(path, novel);
    file.write(&svc).unwrap_err()
}

#[test]
fn failed_overwrite_leaves_the_original_intact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atomic.yw7");
    let svc = StandardNovelService;
    write_project(&path, minimal_novel(&svc));
    let before = fs::read(&path).unwrap();

    // A directory squatting on the backup path makes the rename fail.
    fs::create_dir(dir.path().join("atomic.yw7.bak")).unwrap();
    fs::write(dir.path().join("atomic.yw7.bak").join("keep"), "x").unwrap();

    let err = write_project_err(&path, minimal_novel(&svc));
    assert!(matches!(err, Error::Overwrite { .. }));
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn backup_is_removed_after_a_successful_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rewrite.yw7");
    let svc = StandardNovelService;
    write_project(&path, minimal_novel(&svc));
    write_project(&path, minimal_novel(&svc));
    assert!(!dir.path().join("rewrite.yw7.bak").exists());
}

#[test]
fn empty_novel_writes_a_parsable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.yw7");
    let svc = StandardNovelService;
    write_project(&path, svc.make_novel());

    let text = fs::read_to_string(&path).unwrap();
    // The legacy parser rejects a self-closed CHAPTERS element.
    assert!(text.contains("<CHAPTERS></CHAPTERS>"));

    let file = read_project(&path);
    assert!(file.novel.chapters.is_empty());
    assert!(file.novel.sections.is_empty());
}
