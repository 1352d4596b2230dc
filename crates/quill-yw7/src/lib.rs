//! yWriter 7 project import and export.
//!
//! This crate is a bidirectional codec between the legacy `.yw7` XML
//! container and the novel object graph of [`quill_model`]. It keeps the
//! legacy tool's quirks intact on purpose: CDATA-wrapped text elements
//! with raw reserved characters inside, overlapping type signals for
//! chapters and scenes, plot structure smuggled through custom fields,
//! and a bracket-based body markup with block comments.
//!
//! # Overview
//!
//! - [`Yw7File`] reads and writes a project file as a whole.
//! - [`FlowConverter`] rewrites legacy shortcode bodies into flow markup;
//!   [`flow_to_shortcode`] goes the other way.
//! - [`MarkupFixer`] rebalances overlapping inline format tags so that
//!   converted bodies always parse as XML.
//! - [`purge`] removes data the legacy tool cannot use.
//!
//! # Example
//!
//! ```no_run
//! use quill_model::{NovelService, StandardNovelService};
//! use quill_yw7::Yw7File;
//!
//! let svc = StandardNovelService;
//! let mut file = Yw7File::new("story.yw7", svc.make_novel());
//! file.read(&svc)?;
//! println!("{} sections", file.novel.sections.len());
//! # Ok::<(), quill_yw7::Error>(())
//! ```

pub mod error;
pub mod file;
pub mod fixer;
pub mod flow;
pub mod purge;
pub mod shortcode;
pub mod xml;

mod read;
mod write;

pub use error::{Error, Result};
pub use file::{WordCount, Yw7File};
pub use fixer::MarkupFixer;
pub use flow::FlowConverter;
pub use shortcode::flow_to_shortcode;
