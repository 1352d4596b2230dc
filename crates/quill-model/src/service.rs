//! Element construction capabilities consumed by the file format codecs.

use crate::element::{
    BasicElement, Chapter, Character, PlotLine, PlotPoint, Section, WorldElement,
};
use crate::novel::Novel;

/// Factory capability set for novel elements.
///
/// Codecs never construct elements themselves; routing construction through
/// a service keeps the defaults for freshly imported elements in one place
/// and lets a host application substitute richer element types later.
pub trait NovelService {
    fn make_novel(&self) -> Novel {
        Novel::new()
    }

    fn make_chapter(&self, title: Option<&str>, level: Option<u8>) -> Chapter {
        Chapter {
            title: title.map(str::to_string),
            level: level.unwrap_or(2),
            ..Chapter::default()
        }
    }

    fn make_section(&self) -> Section {
        Section::default()
    }

    fn make_plot_line(&self) -> PlotLine {
        PlotLine::default()
    }

    fn make_plot_point(&self, title: Option<&str>, desc: Option<&str>) -> PlotPoint {
        PlotPoint {
            title: title.map(str::to_string),
            desc: desc.map(str::to_string),
            section: None,
        }
    }

    fn make_world_element(&self) -> WorldElement {
        WorldElement::default()
    }

    fn make_character(&self) -> Character {
        Character::default()
    }

    fn make_basic_element(&self) -> BasicElement {
        BasicElement::default()
    }

    /// Extension of the native project file format, with the dot.
    fn novx_file_extension(&self) -> &'static str {
        ".novx"
    }
}

/// The default service, producing the plain element records of this crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardNovelService;

impl NovelService for StandardNovelService {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_defaults() {
        let svc = StandardNovelService;
        let chapter = svc.make_chapter(Some("Plot lines"), Some(1));
        assert_eq!(chapter.title.as_deref(), Some("Plot lines"));
        assert_eq!(chapter.level, 1);
        let plain = svc.make_chapter(None, None);
        assert_eq!(plain.level, 2);
    }
}
