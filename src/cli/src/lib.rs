//! cfs-gen CLI - flatten image layers into page-aligned files.

pub mod commands;
pub mod output;
