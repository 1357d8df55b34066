//! リスティングURLの日付・人数パラメータ正規化

use std::sync::LazyLock;

use chrono::{Days, NaiveDate, Utc};
use regex::{Captures, Regex};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// 書き換え対象のパラメータ（追記時もこの順序）
const PARAM_KEYS: [&str; 4] = ["checkin", "checkout", "adults", "children"];

/// URL内のどこに現れても一致する対象パラメータ（`group_adults=` なども含む）。
/// 直前の `?` / `&` は任意、値は次の `&` / `#` まで
static PARAM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([?&])?(checkin|checkout|adults|children)=([^&#]*)")
        .expect("parameter pattern is valid")
});

/// 正規化後のパラメータ値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StayParams {
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
    pub adults: u32,
    pub children: u32,
}

impl StayParams {
    /// 翌日チェックイン・翌々日チェックアウト、大人1名・子供0名
    pub fn for_today(today: NaiveDate) -> Self {
        Self {
            checkin: today.checked_add_days(Days::new(1)).unwrap_or(today),
            checkout: today.checked_add_days(Days::new(2)).unwrap_or(today),
            adults: 1,
            children: 0,
        }
    }

    fn value_of(&self, key: &str) -> String {
        match key {
            "checkin" => self.checkin.format(DATE_FORMAT).to_string(),
            "checkout" => self.checkout.format(DATE_FORMAT).to_string(),
            "adults" => self.adults.to_string(),
            _ => self.children.to_string(),
        }
    }
}

/// 今日 (UTC) を基準に正規化
pub fn normalize_listing_url_today(url: &str) -> String {
    normalize_listing_url(url, Utc::now().date_naive())
}

/// `today` を基準に4つのパラメータを設定したURLを返す
///
/// 既存パラメータは名前の部分一致で探し（`group_adults=2` → `group_adults=1`）、
/// 最初の出現位置で値を置き換え、2つ目以降の重複は取り除く。
/// 存在しないパラメータは `&key=value` としてフラグメントの前に追記する。
/// URLに `?` が無い場合も `&` で追記する（クエリとしては不正になる）。
pub fn normalize_listing_url(url: &str, today: NaiveDate) -> String {
    let params = StayParams::for_today(today);
    let mut seen = [false; PARAM_KEYS.len()];

    let rewritten = PARAM_PATTERN.replace_all(url, |caps: &Captures| {
        let separator = caps.get(1).map_or("", |m| m.as_str());
        let key = &caps[2];
        let Some(index) = PARAM_KEYS.iter().position(|k| *k == key) else {
            return caps[0].to_string();
        };
        // 区切り付きの重複は丸ごと削除。`x_adults=` のように名前の一部なら値だけ揃える
        if seen[index] && !separator.is_empty() {
            return String::new();
        }
        seen[index] = true;
        format!("{}{}={}", separator, key, params.value_of(key))
    });

    let appended: String = PARAM_KEYS
        .iter()
        .zip(seen)
        .filter(|(_, present)| !present)
        .map(|(key, _)| format!("&{}={}", key, params.value_of(key)))
        .collect();

    if appended.is_empty() {
        return rewritten.into_owned();
    }

    let (base, fragment) = match rewritten.find('#') {
        Some(pos) => rewritten.split_at(pos),
        None => (&rewritten[..], ""),
    };
    format!("{}{}{}", base, appended, fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jan_10() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn test_appends_missing_params() {
        let url = normalize_listing_url("https://example.com/hotel?x=1", jan_10());
        assert_eq!(
            url,
            "https://example.com/hotel?x=1&checkin=2024-01-11&checkout=2024-01-12&adults=1&children=0"
        );
    }

    #[test]
    fn test_replaces_existing_params_in_place() {
        let url = normalize_listing_url(
            "https://example.com/hotel?checkin=2020-01-01&checkout=2020-01-02&adults=3&children=2",
            jan_10(),
        );
        assert_eq!(
            url,
            "https://example.com/hotel?checkin=2024-01-11&checkout=2024-01-12&adults=1&children=0"
        );
    }

    #[test]
    fn test_removes_duplicate_params() {
        let url = normalize_listing_url(
            "https://example.com/h?adults=2&x=1&adults=4&children=1&children=3",
            jan_10(),
        );
        assert_eq!(count(&url, "adults="), 1);
        assert_eq!(count(&url, "children="), 1);
        assert_eq!(count(&url, "checkin="), 1);
        assert_eq!(count(&url, "checkout="), 1);
        assert!(url.starts_with("https://example.com/h?adults=1&x=1&children=0"));
    }

    #[test]
    fn test_replaces_malformed_values() {
        let url = normalize_listing_url("https://example.com/h?checkin=soon&adults=&x=1", jan_10());
        assert!(url.contains("checkin=2024-01-11"));
        assert!(url.contains("adults=1"));
        assert!(!url.contains("soon"));
    }

    #[test]
    fn test_rewrites_prefixed_occupancy_params() {
        let url = normalize_listing_url(
            "https://example.com/hotel/x.html?checkin=2020-01-01&checkout=2020-01-02&group_adults=2&group_children=1&no_rooms=1",
            jan_10(),
        );
        assert_eq!(
            url,
            "https://example.com/hotel/x.html?checkin=2024-01-11&checkout=2024-01-12&group_adults=1&group_children=0&no_rooms=1"
        );
    }

    #[test]
    fn test_prefixed_param_counts_as_present() {
        let url = normalize_listing_url("https://example.com/h?group_adults=3&adults=2", jan_10());
        assert_eq!(
            url,
            "https://example.com/h?group_adults=1&checkin=2024-01-11&checkout=2024-01-12&children=0"
        );
    }

    #[test]
    fn test_appends_before_fragment() {
        let url = normalize_listing_url("https://example.com/h?x=1#rooms", jan_10());
        assert!(url.ends_with("&children=0#rooms"));
    }

    #[test]
    fn test_url_without_query_keeps_ampersand() {
        let url = normalize_listing_url("https://example.com/h", jan_10());
        assert_eq!(
            url,
            "https://example.com/h&checkin=2024-01-11&checkout=2024-01-12&adults=1&children=0"
        );
    }

    #[test]
    fn test_idempotent_within_a_day() {
        let once = normalize_listing_url("https://example.com/h?adults=5&y=2", jan_10());
        let twice = normalize_listing_url(&once, jan_10());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_dates_cross_month_boundary() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let url = normalize_listing_url("https://example.com/h?x=1", today);
        assert!(url.contains("checkin=2024-02-29"));
        assert!(url.contains("checkout=2024-03-01"));
    }
}
