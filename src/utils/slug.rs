//! Slug helpers.

use heck::ToKebabCase;

/// Lowercase, hyphen-separated form of a title ("FRCS Course" → "frcs-course").
pub fn slugify(title: &str) -> String {
    title.trim().to_kebab_case()
}

/// Whether two tag titles name the same tag, by exact title or by slug.
pub fn same_tag(a: &str, b: &str) -> bool {
    a == b || slugify(a) == slugify(b)
}
