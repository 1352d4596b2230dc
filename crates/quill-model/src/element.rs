//! Story element records.
//!
//! All elements share the title/description prefix of [`BasicElement`];
//! richer kinds add their own fields by composition rather than by a type
//! hierarchy.

/// How a chapter participates in the narrative.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ChapterKind {
    #[default]
    Normal,
    Notes,
    Todo,
    Unused,
}

/// How a section participates in the narrative.
///
/// `Stage` marks a structural divider rather than prose; it has no direct
/// representation in the legacy format and travels as a reserved tag there.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SectionKind {
    #[default]
    Normal,
    Unused,
    Stage,
}

/// The action/reaction classification of a scene.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SceneKind {
    #[default]
    NotApplicable,
    Action,
    Reaction,
    Custom,
}

/// Title/description pair shared by every element; used directly for
/// project notes.
#[derive(Clone, Debug, Default)]
pub struct BasicElement {
    pub title: Option<String>,
    pub desc: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Chapter {
    pub title: Option<String>,
    pub desc: Option<String>,
    /// 1 = part, 2 = chapter.
    pub level: u8,
    pub kind: ChapterKind,
    pub is_trash: bool,
    pub no_number: bool,
}

impl Default for Chapter {
    fn default() -> Self {
        Self {
            title: None,
            desc: None,
            level: 2,
            kind: ChapterKind::Normal,
            is_trash: false,
            no_number: false,
        }
    }
}

/// A section of narrative text with its scene metadata.
///
/// `content` holds the body as flow markup (`<p>…</p>` paragraphs with
/// inline elements); the codecs convert it to and from their own body
/// dialects.
#[derive(Clone, Debug, Default)]
pub struct Section {
    pub title: Option<String>,
    pub desc: Option<String>,
    pub content: String,
    pub kind: SectionKind,
    pub scene: SceneKind,
    /// Completion status, 1 (outline) through 6 (done).
    pub status: Option<u8>,
    pub goal: Option<String>,
    pub conflict: Option<String>,
    pub outcome: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub append_to_prev: bool,
    /// Specific start date (`YYYY-MM-DD`), exclusive with `day`.
    pub date: Option<String>,
    /// Start time (`HH:MM:SS`).
    pub time: Option<String>,
    /// Unspecific start day, kept as the integer's decimal string.
    pub day: Option<String>,
    pub lasts_days: Option<String>,
    pub lasts_hours: Option<String>,
    pub lasts_minutes: Option<String>,
    pub characters: Vec<String>,
    pub locations: Vec<String>,
    pub items: Vec<String>,
    /// Plot point IDs that reference this section.
    pub plot_points: Vec<String>,
}

/// A story arc; its `sections` list the section IDs it runs through.
#[derive(Clone, Debug, Default)]
pub struct PlotLine {
    pub title: Option<String>,
    pub desc: Option<String>,
    /// Unique short identifier, 1–20 printable characters.
    pub short_name: String,
    pub sections: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct PlotPoint {
    pub title: Option<String>,
    pub desc: Option<String>,
    /// The section this point is anchored at, if any.
    pub section: Option<String>,
}

/// Locations and items.
#[derive(Clone, Debug, Default)]
pub struct WorldElement {
    pub title: Option<String>,
    pub desc: Option<String>,
    pub aka: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Character {
    pub title: Option<String>,
    pub desc: Option<String>,
    pub aka: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub bio: Option<String>,
    pub goals: Option<String>,
    pub full_name: Option<String>,
    pub is_major: bool,
    /// ISO date string; empty when unknown.
    pub birth_date: String,
    pub death_date: String,
}
