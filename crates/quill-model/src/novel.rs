//! The project-level record tying the element tables together.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::element::{
    BasicElement, Chapter, Character, PlotLine, PlotPoint, Section, WorldElement,
};
use crate::tree::NovelTree;

static LANG_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"xml:lang="([^"]*)""#).unwrap());

/// A whole novel project.
///
/// Element tables are insertion-ordered; every consumer that serializes the
/// novel relies on that order being the declared one.
#[derive(Clone, Debug, Default)]
pub struct Novel {
    pub title: Option<String>,
    pub desc: Option<String>,
    pub author_name: Option<String>,
    pub word_count_start: Option<i64>,
    pub word_target: Option<i64>,

    /// ISO 639-1 code of the main language.
    pub language_code: Option<String>,
    /// ISO 3166-2 code of the main language's country.
    pub country_code: Option<String>,
    /// Additional language codes used in section bodies; `None` until
    /// counted, which is distinct from a counted empty list.
    pub languages: Option<Vec<String>>,

    pub work_phase: Option<i64>,
    pub renumber_chapters: bool,
    pub renumber_parts: bool,
    pub renumber_within_parts: bool,
    pub roman_chapter_numbers: bool,
    pub roman_part_numbers: bool,
    pub chapter_heading_prefix: String,
    pub chapter_heading_suffix: String,
    pub part_heading_prefix: String,
    pub part_heading_suffix: String,
    pub custom_goal: String,
    pub custom_conflict: String,
    pub custom_outcome: String,
    pub custom_chr_bio: String,
    pub custom_chr_goals: String,
    pub save_word_count: bool,
    pub reference_date: Option<String>,

    pub chapters: IndexMap<String, Chapter>,
    pub sections: IndexMap<String, Section>,
    pub plot_lines: IndexMap<String, PlotLine>,
    pub plot_points: IndexMap<String, PlotPoint>,
    pub characters: IndexMap<String, Character>,
    pub locations: IndexMap<String, WorldElement>,
    pub items: IndexMap<String, WorldElement>,
    pub project_notes: IndexMap<String, BasicElement>,

    pub tree: NovelTree,
}

impl Novel {
    pub fn new() -> Self {
        Self {
            tree: NovelTree::new(),
            ..Self::default()
        }
    }

    /// Count the language codes used in section bodies, first occurrence
    /// first, and store the result in `languages`.
    pub fn update_languages(&mut self) {
        let mut found: Vec<String> = Vec::new();
        for section in self.sections.values() {
            for caps in LANG_SPAN.captures_iter(&section.content) {
                let code = caps[1].to_string();
                if !code.is_empty() && !found.contains(&code) {
                    found.push(code);
                }
            }
        }
        self.languages = Some(found);
    }

    /// Fill in missing locale codes from the process environment, falling
    /// back to the ISO "no linguistic content" markers.
    pub fn check_locale(&mut self) {
        if self
            .language_code
            .as_deref()
            .is_none_or(|code| code.is_empty())
        {
            let (lang, country) = system_locale();
            self.language_code = Some(lang);
            if self
                .country_code
                .as_deref()
                .is_none_or(|code| code.is_empty())
            {
                self.country_code = Some(country);
            }
        } else if self
            .country_code
            .as_deref()
            .is_none_or(|code| code.is_empty())
        {
            let (_, country) = system_locale();
            self.country_code = Some(country);
        }
    }
}

/// `("ll", "CC")` from a `LANG`-style environment value, or the neutral
/// `("zxx", "none")` markers.
fn system_locale() -> (String, String) {
    if let Ok(value) = std::env::var("LANG") {
        let value = value.split('.').next().unwrap_or_default();
        if let Some((lang, country)) = value.split_once('_') {
            if !lang.is_empty() && !country.is_empty() {
                return (lang.to_string(), country.to_string());
            }
        }
    }
    ("zxx".to_string(), "none".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_languages_collects_codes_in_order() {
        let mut novel = Novel::new();
        let mut section = Section::default();
        section.content =
            r#"<p><span xml:lang="de">Hallo</span> and <span xml:lang="fr">salut</span></p>"#
                .to_string();
        novel.sections.insert("sc1".to_string(), section);
        let mut other = Section::default();
        other.content = r#"<p><span xml:lang="de">nochmal</span></p>"#.to_string();
        novel.sections.insert("sc2".to_string(), other);

        novel.update_languages();
        assert_eq!(novel.languages.as_deref(), Some(&["de".to_string(), "fr".to_string()][..]));
    }

    #[test]
    fn check_locale_keeps_existing_codes() {
        let mut novel = Novel::new();
        novel.language_code = Some("it".to_string());
        novel.country_code = Some("IT".to_string());
        novel.check_locale();
        assert_eq!(novel.language_code.as_deref(), Some("it"));
        assert_eq!(novel.country_code.as_deref(), Some("IT"));
    }

    #[test]
    fn check_locale_fills_missing_codes() {
        let mut novel = Novel::new();
        novel.check_locale();
        assert!(novel.language_code.is_some());
        assert!(novel.country_code.is_some());
    }
}
