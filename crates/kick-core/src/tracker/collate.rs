//! Display-name ordering for the dashboard.
//!
//! Names are compared with the Unicode Collation Algorithm under the Polish (`pl`) CLDR
//! tailoring: accented letters sort next to their base letter, Polish letters follow
//! theirs (`a < ą < b`, `z < ź < ż`), punctuation sorts before letters and lowercase
//! sorts before uppercase. The raw string breaks collation ties so the order is total.

use std::cmp::Ordering;
use std::sync::LazyLock;

use icu_collator::options::CollatorOptions;
use icu_collator::{Collator, CollatorBorrowed};
use icu_locale_core::locale;

static COLLATOR: LazyLock<Option<CollatorBorrowed<'static>>> = LazyLock::new(|| {
    match Collator::try_new(locale!("pl").into(), CollatorOptions::default()) {
        Ok(collator) => Some(collator),
        Err(e) => {
            tracing::warn!(error = %e, "Polish collation data unavailable, using case-insensitive order");
            None
        }
    }
});

pub fn compare_display_names(a: &str, b: &str) -> Ordering {
    let collated = match COLLATOR.as_ref() {
        Some(collator) => collator.compare(a, b),
        None => a.to_lowercase().cmp(&b.to_lowercase()),
    };
    collated.then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(names: &[&str]) -> Vec<String> {
        let mut v: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        v.sort_by(|a, b| compare_display_names(a, b));
        v
    }

    #[test]
    fn ignores_case_for_primary_order() {
        assert_eq!(sorted(&["bob", "Alice", "carol"]), vec!["Alice", "bob", "carol"]);
    }

    #[test]
    fn polish_letters_follow_their_base_letter() {
        assert_eq!(
            sorted(&["Żaba", "zebra", "Źrebię", "ala", "Ąś", "bartek"]),
            vec!["ala", "Ąś", "bartek", "zebra", "Źrebię", "Żaba"]
        );
        assert_eq!(compare_display_names("łukasz", "maciej"), Ordering::Less);
        assert_eq!(compare_display_names("lena", "łukasz"), Ordering::Less);
    }

    #[test]
    fn other_accented_letters_sort_with_their_base_letter() {
        assert_eq!(compare_display_names("Émile", "Zed"), Ordering::Less);
        assert_eq!(compare_display_names("Ölaf", "Peter"), Ordering::Less);
        assert_eq!(compare_display_names("Üwe", "Zed"), Ordering::Less);
        assert_eq!(compare_display_names("Ñico", "Zed"), Ordering::Less);
        assert_eq!(
            sorted(&["Zed", "Üwe", "Émile", "Ölaf", "Ñico", "Dawid"]),
            vec!["Dawid", "Émile", "Ñico", "Ölaf", "Üwe", "Zed"]
        );
    }

    #[test]
    fn punctuation_sorts_before_letters() {
        assert_eq!(compare_display_names("~x", "a"), Ordering::Less);
        assert_eq!(compare_display_names("_streamer", "alice"), Ordering::Less);
    }

    #[test]
    fn lowercase_breaks_ties_first() {
        assert_eq!(compare_display_names("alice", "Alice"), Ordering::Less);
        assert_eq!(compare_display_names("Alice", "alice"), Ordering::Greater);
        assert_eq!(compare_display_names("alice", "alice"), Ordering::Equal);
    }

    #[test]
    fn prefix_sorts_first() {
        assert_eq!(compare_display_names("ann", "anna"), Ordering::Less);
        assert_eq!(compare_display_names("", "a"), Ordering::Less);
    }
}
