//! Core library for the judge-payout command line application.
//!
//! The library turns a judge sheet (reviewer lists whose cell fill marks a
//! correct judgment, plus per-problem rates) into payout tables, and checks
//! previously written tables against the sheet. Sheet and CSV adapters live
//! under [`io`], the row engine in [`classify`], [`identity`], [`evaluate`]
//! and [`aggregate`], the independent re-check in [`reconcile`], and the
//! orchestration used by the CLI in [`pipeline`].

pub mod aggregate;
pub mod audit;
pub mod classify;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod identity;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod reconcile;

pub use error::{Result, ToolError};
