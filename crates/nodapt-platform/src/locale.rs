//! Locale hint used only to choose a default download mirror.

pub const DEFAULT_MIRROR: &str = "https://nodejs.org/dist/";
pub const SIMPLIFIED_CHINESE_MIRROR: &str = "https://registry.npmmirror.com/-/binary/node/";

const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];
const SIMPLIFIED_CHINESE_TAGS: [&str; 3] = ["zh_cn", "zh-cn", "zh-hans-cn"];

/// Whether the locale variables visible through `lookup` name Simplified
/// Chinese. The first non-empty variable wins, in POSIX precedence order.
pub fn is_simplified_chinese<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let Some(lang) = LOCALE_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
    else {
        return false;
    };

    log::debug!("locale hint: {lang}");

    let lang = lang.to_ascii_lowercase();
    SIMPLIFIED_CHINESE_TAGS.iter().any(|tag| lang.contains(tag))
}

/// Mirror used when none is configured explicitly.
pub fn default_mirror<F>(lookup: F) -> &'static str
where
    F: Fn(&str) -> Option<String>,
{
    if is_simplified_chinese(lookup) {
        SIMPLIFIED_CHINESE_MIRROR
    } else {
        DEFAULT_MIRROR
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn no_locale_uses_universal_default() {
        assert_eq!(default_mirror(env(&[])), DEFAULT_MIRROR);
    }

    #[test]
    fn chinese_lang_selects_npmmirror() {
        assert_eq!(
            default_mirror(env(&[("LANG", "zh_CN.UTF-8")])),
            SIMPLIFIED_CHINESE_MIRROR
        );
        assert!(is_simplified_chinese(env(&[("LANG", "zh-Hans-CN")])));
    }

    #[test]
    fn lc_all_takes_precedence_over_lang() {
        let lookup = env(&[("LC_ALL", "en_US.UTF-8"), ("LANG", "zh_CN.UTF-8")]);
        assert!(!is_simplified_chinese(lookup));
    }

    #[test]
    fn blank_variables_are_skipped() {
        let lookup = env(&[("LC_ALL", "  "), ("LANG", "zh_CN")]);
        assert!(is_simplified_chinese(lookup));
    }

    #[test]
    fn traditional_chinese_keeps_default() {
        assert_eq!(
            default_mirror(env(&[("LANG", "zh_TW.UTF-8")])),
            DEFAULT_MIRROR
        );
    }
}
