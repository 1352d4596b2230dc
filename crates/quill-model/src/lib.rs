//! The novel object graph shared by all quill file formats.
//!
//! A [`Novel`] owns ID-keyed tables of story elements (chapters, sections,
//! characters, locations, items, plot lines, plot points, project notes)
//! plus a [`NovelTree`] that records the ordered parent/child structure.
//! Elements reference each other by prefixed string IDs (`ch1`, `sc4`, and
//! so on) rather than by pointers, so cyclic relationships (plot lines
//! listing sections, sections listing plot points, plot points pointing
//! back at sections) stay representable without shared ownership.
//!
//! File format codecs do not construct elements directly; they go through
//! the [`NovelService`] capability set so that the element defaults stay in
//! one place.

pub mod element;
pub mod id;
pub mod novel;
pub mod service;
pub mod tree;

pub use element::{
    BasicElement, Chapter, ChapterKind, Character, PlotLine, PlotPoint, SceneKind, Section,
    SectionKind, WorldElement,
};
pub use id::{
    CH_ROOT, CHAPTER_PREFIX, CHARACTER_PREFIX, CR_ROOT, IT_ROOT, ITEM_PREFIX, LC_ROOT,
    LOCATION_PREFIX, PL_ROOT, PLOT_LINE_PREFIX, PLOT_POINT_PREFIX, PN_ROOT, PRJ_NOTE_PREFIX,
    SECTION_PREFIX, create_id, join_list, numeric_id, split_list,
};
pub use novel::Novel;
pub use service::{NovelService, StandardNovelService};
pub use tree::NovelTree;
