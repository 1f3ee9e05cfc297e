//! URL slug generation
//!
//! Slugs are lowercase ASCII: letters, digits and single hyphens between
//! words. Titles that contain nothing usable fall back to `untitled`.

/// Slug used when a title yields no letters or digits
pub const FALLBACK_SLUG: &str = "untitled";

/// Lowercase `title` and collapse every run of characters outside
/// `[a-z0-9]` into one hyphen. Leading and trailing hyphens are dropped.
///
/// May return an empty string; see [`slug_or_fallback`].
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// [`slugify`], substituting [`FALLBACK_SLUG`] for an empty result
pub fn slug_or_fallback(title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// The `attempt`-th candidate for a unique slug: `base`, `base-2`, `base-3`...
pub fn slug_candidate(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}

/// Pick the first candidate for which `taken` reports false.
///
/// `taken` is async so callers can check the database directly.
pub async fn unique_slug<F, Fut>(base: &str, mut taken: F) -> anyhow::Result<String>
where
    F: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<bool>>,
{
    let mut attempt = 1;
    loop {
        let candidate = slug_candidate(base, attempt);
        if !taken(candidate.clone()).await? {
            return Ok(candidate);
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_slugify_examples() {
        assert_eq!(slugify("Dubai Airshow 2025"), "dubai-airshow-2025");
        assert_eq!(slugify("  --Hello,  World!-- "), "hello-world");
        assert_eq!(slugify("events/expo/"), "events-expo");
        assert_eq!(slugify("/leading/slash"), "leading-slash");
        assert_eq!(slugify("Café & Bar"), "caf-bar");
        assert_eq!(slugify("ÉXPO"), "xpo");
        assert_eq!(slugify("a__b..c"), "a-b-c");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_fallback() {
        assert_eq!(slug_or_fallback("***"), "untitled");
        assert_eq!(slug_or_fallback("Trade Show"), "trade-show");
    }

    #[test]
    fn test_candidates() {
        assert_eq!(slug_candidate("expo", 1), "expo");
        assert_eq!(slug_candidate("expo", 2), "expo-2");
        assert_eq!(slug_candidate("expo", 10), "expo-10");
    }

    #[tokio::test]
    async fn test_unique_slug_skips_taken() {
        let taken = ["expo", "expo-2"];
        let slug = unique_slug("expo", |candidate| async move {
            Ok(taken.contains(&candidate.as_str()))
        })
        .await
        .unwrap();
        assert_eq!(slug, "expo-3");
    }

    proptest! {
        #[test]
        fn slugify_is_idempotent(input in "\\PC{0,64}") {
            let once = slugify(&input);
            prop_assert_eq!(slugify(&once), once);
        }

        #[test]
        fn slugify_output_shape(input in "\\PC{0,64}") {
            let slug = slugify(&input);
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.ends_with('/'));
            prop_assert!(!slug.contains("--"));
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }

        #[test]
        fn slugify_keeps_ascii_words(words in prop::collection::vec("[a-z0-9]{1,8}", 1..6)) {
            let title = words.join(" / ");
            prop_assert_eq!(slugify(&title), words.join("-"));
        }
    }
}
