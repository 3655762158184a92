//! OpenType Layout: shared `Coverage`/`ClassDef`/list-header plumbing plus the `GSUB`
//! and `GPOS` lookup engines (§4.7, §4.8).

pub mod classdef;
pub mod common;
pub mod coverage;
pub mod gpos;
pub mod gsub;

pub use gpos::{GposTable, ValueRecord};
pub use gsub::GsubTable;
