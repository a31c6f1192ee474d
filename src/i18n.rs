//! Locale-aware path rendering.
//!
//! The inverse of the resolver's path normalization: given an application
//! path and a resolved locale (and optionally a tenant slug), render the
//! public URL path that resolves back to the same tenant and locale.

/// Render a locale-prefixed path. The application default locale is omitted.
pub fn i18n_path(path: &str, locale: &str, default_locale: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if locale == default_locale {
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{trimmed}")
        }
    } else if trimmed.is_empty() {
        format!("/{locale}")
    } else {
        format!("/{locale}/{trimmed}")
    }
}

/// Render a tenant- and locale-prefixed path for slug-routed deployments.
pub fn tenant_i18n_path(slug: &str, path: &str, locale: &str, default_locale: &str) -> String {
    let localized = i18n_path(path, locale, default_locale);
    if localized == "/" {
        format!("/{slug}")
    } else {
        format!("/{slug}{localized}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_locale_is_omitted() {
        assert_eq!(i18n_path("/pricing", "en", "en"), "/pricing");
        assert_eq!(i18n_path("/", "en", "en"), "/");
    }

    #[test]
    fn non_default_locale_is_prefixed() {
        assert_eq!(i18n_path("/pricing", "fr", "en"), "/fr/pricing");
        assert_eq!(i18n_path("/", "fr", "en"), "/fr");
        assert_eq!(i18n_path("sign-in", "de", "en"), "/de/sign-in");
    }

    #[test]
    fn tenant_path_prefixes_slug() {
        assert_eq!(
            tenant_i18n_path("acme", "/pricing", "fr", "en"),
            "/acme/fr/pricing"
        );
        assert_eq!(tenant_i18n_path("acme", "/", "en", "en"), "/acme");
    }
}
