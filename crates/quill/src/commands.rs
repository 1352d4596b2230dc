//! CLI subcommands.

use std::fs;

use anyhow::{Context, Result};
use quill_model::{NovelService, StandardNovelService};
use quill_yw7::purge::{remove_language_tags, reset_custom_variables};
use quill_yw7::Yw7File;
use tracing::info;

fn open(path: &str, svc: &StandardNovelService) -> Result<Yw7File> {
    let mut file = Yw7File::new(path, svc.make_novel());
    file.read(svc)
        .with_context(|| format!("reading {path}"))?;
    Ok(file)
}

pub fn info(path: &str) -> Result<()> {
    let svc = StandardNovelService;
    let file = open(path, &svc)?;
    let novel = &file.novel;

    println!("Title:        {}", novel.title.as_deref().unwrap_or("(untitled)"));
    if let Some(author) = novel.author_name.as_deref() {
        println!("Author:       {author}");
    }
    if let Some(language) = novel.language_code.as_deref() {
        let country = novel.country_code.as_deref().unwrap_or("?");
        println!("Locale:       {language}-{country}");
    }
    println!("Chapters:     {}", novel.chapters.len());
    println!("Sections:     {}", novel.sections.len());
    println!("Characters:   {}", novel.characters.len());
    println!("Locations:    {}", novel.locations.len());
    println!("Items:        {}", novel.items.len());
    println!("Plot lines:   {}", novel.plot_lines.len());
    println!("Plot points:  {}", novel.plot_points.len());
    println!("Notes:        {}", novel.project_notes.len());
    if !file.wc_log.is_empty() {
        println!("WC entries:   {}", file.wc_log.len());
    }
    Ok(())
}

pub fn convert(path: &str, keep_backup: bool) -> Result<()> {
    let svc = StandardNovelService;
    let original = keep_backup
        .then(|| fs::read(path))
        .transpose()
        .with_context(|| format!("reading {path}"))?;

    let mut file = open(path, &svc)?;
    file.write(&svc).with_context(|| format!("writing {path}"))?;

    if let Some(original) = original {
        fs::write(format!("{path}.bak"), original)
            .with_context(|| format!("keeping backup of {path}"))?;
    }
    info!(path, "project re-written");
    println!("Converted: {path}");
    Ok(())
}

pub fn purge(path: &str) -> Result<()> {
    let svc = StandardNovelService;
    let mut file = open(path, &svc)?;

    let mut lost = reset_custom_variables(&mut file);
    lost |= remove_language_tags(&mut file.novel);

    file.write(&svc).with_context(|| format!("writing {path}"))?;
    if lost {
        println!("Purged: {path} (some tool-specific data was removed)");
    } else {
        println!("Purged: {path} (nothing to remove)");
    }
    Ok(())
}
