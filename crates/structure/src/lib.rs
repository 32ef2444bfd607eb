//! Structure-to-archive pipeline.
//!
//! A structure is an ordered list of [`StructureEntry`] values (a relative
//! path plus optional text content). The pipeline parses raw user input into
//! entries, materializes them into a scratch directory and packs that
//! directory into a zip or tar.gz archive. Plain text can also be rendered
//! into a PDF.

pub mod archive;
pub mod entry;
pub mod error;
pub mod job;
pub mod materialize;
pub mod pdf;
pub mod template;

pub use {
    archive::ArchiveFormat,
    entry::{InputKind, StructureEntry, StructureSpec},
    error::{Error, Result},
    job::{ArchiveJob, BuiltArchive},
    materialize::{MaterializeReport, Progress},
};
