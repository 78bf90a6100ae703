//! Core library for the iati-tools command line application.
//!
//! The library reconciles independently authored report workbooks against a
//! template and consolidates them into one table per template sheet. IO
//! adapters live under [`iati::tools::io`], the in-memory workbook model in
//! [`iati::tools::model`], schema extraction in [`iati::tools::template`], the
//! cleaning stages in [`iati::tools::clean`], the merge in
//! [`iati::tools::consolidate`], and the end-to-end orchestration under
//! [`iati::tools::pipeline`].

pub mod iati;

pub use iati::tools::{
    Result, ToolError, clean, config, consolidate, diagnostics, error, io, model, pipeline,
    template,
};
