//! Built-in project presets for `/template`.

use crate::entry::StructureEntry;

const TEMPLATES: &[(&str, &[&str])] = &[
    ("web", &[
        "project/",
        "project/index.html",
        "project/css/style.css",
        "project/js/script.js",
    ]),
    ("python", &[
        "project/",
        "project/index.py",
        "project/requirements.txt",
        "project/utils/__init__.py",
    ]),
];

/// Names of all presets, in display order.
pub fn names() -> impl Iterator<Item = &'static str> {
    TEMPLATES.iter().map(|(name, _)| *name)
}

/// Entries for the preset called `name`.
#[must_use]
pub fn lookup(name: &str) -> Option<Vec<StructureEntry>> {
    TEMPLATES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, paths)| paths.iter().copied().map(StructureEntry::path).collect())
}
