//! Built-in seed library.
//!
//! The ten curated starter patterns are compiled into the binary so the
//! pipeline works without any external pattern directory. Additional
//! patterns load from disk via [`super::PatternLibrary::load_dir`].

use super::{Pattern, PatternLibrary};
use crate::error::ForgeResult;

macro_rules! seed_record {
    ($stem:literal) => {
        (
            include_str!(concat!("../../patterns/", $stem, ".json")),
            include_str!(concat!("../../patterns/", $stem, ".tsx")),
        )
    };
}

const SEED_RECORDS: &[(&str, &str)] = &[
    seed_record!("shadcn-alert"),
    seed_record!("shadcn-badge"),
    seed_record!("shadcn-button"),
    seed_record!("shadcn-card"),
    seed_record!("shadcn-checkbox"),
    seed_record!("shadcn-input"),
    seed_record!("shadcn-radio-group"),
    seed_record!("shadcn-select"),
    seed_record!("shadcn-switch"),
    seed_record!("shadcn-tabs"),
];

/// Build the library from the compiled-in seed records.
pub fn seed_library() -> ForgeResult<PatternLibrary> {
    let mut library = PatternLibrary::new();
    for (json, code) in SEED_RECORDS {
        library.insert(Pattern::from_record(json, code)?)?;
    }
    Ok(library)
}
