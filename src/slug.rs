//! URL slugs derived from display names.
//!
//! Categories and items are addressed by slug (`/items/{category}/{item}/`).
//! The slug is never typed by hand: it is re-derived from the name on every
//! save, so renaming an entry moves its URL.
//!
//! ## Rules
//!
//! - Compatibility-decompose (NFKD) and keep only ASCII, so `Crème brûlée`
//!   becomes `creme-brulee` rather than losing its letters.
//! - Keep ASCII letters, digits, `_`, `-` and whitespace; drop the rest.
//! - Lowercase.
//! - Runs of whitespace and hyphens collapse to one `-`.
//! - Leading and trailing `-`/`_` are stripped.
//!
//! The output only contains `[a-z0-9_-]` with no leading, trailing or doubled
//! hyphen, which makes [`slugify`] idempotent. Two names can still produce the
//! same slug (`"Item 1"` and `"item-1"`); that is resolved by the store's
//! unique index, not here.

use unicode_normalization::UnicodeNormalization;

/// Derive the URL slug for a display name.
///
/// - `"Category 1"` → `"category-1"`
/// - `"Item 1-1"` → `"item-1-1"`
/// - `"  Spicy   Noodles! "` → `"spicy-noodles"`
/// - `"!!!"` → `""` (callers reject empty slugs)
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.nfkd().filter(char::is_ascii) {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else if c == '-' || c.is_ascii_whitespace() {
            pending_separator = true;
        }
    }

    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_become_hyphens() {
        assert_eq!(slugify("Category 1"), "category-1");
    }

    #[test]
    fn existing_hyphens_are_kept() {
        assert_eq!(slugify("Item 1-1"), "item-1-1");
    }

    #[test]
    fn punctuation_is_dropped() {
        assert_eq!(slugify("Mum's Apple Pie (v2)!"), "mums-apple-pie-v2");
    }

    #[test]
    fn separator_runs_collapse() {
        assert_eq!(slugify("  Spicy  -  Noodles  "), "spicy-noodles");
    }

    #[test]
    fn accents_are_folded_to_ascii() {
        assert_eq!(slugify("Crème Brûlée"), "creme-brulee");
    }

    #[test]
    fn non_latin_letters_are_dropped() {
        assert_eq!(slugify("Ramen ラーメン"), "ramen");
    }

    #[test]
    fn underscores_survive_inside_but_not_at_edges() {
        assert_eq!(slugify("_snake_case_"), "snake_case");
    }

    #[test]
    fn symbol_only_name_gives_empty_slug() {
        assert_eq!(slugify("!!! ???"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn deterministic() {
        assert_eq!(slugify("Banana Bread"), slugify("Banana Bread"));
    }

    #[test]
    fn idempotent_over_varied_names() {
        let names = [
            "Category 1",
            "Item 1-5",
            "  --Leading and trailing--  ",
            "Crème Brûlée",
            "a_b - c",
            "__x__",
            "Tom Yum (Spicy!!)",
            "---",
        ];
        for name in names {
            let once = slugify(name);
            assert_eq!(slugify(&once), once, "not idempotent for {name:?}");
        }
    }
}
