use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const FILE_EXTENSION: &str = ".png";
const UNSAFE_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// How single-tweet downloads stamp their file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStyle {
    /// `YYYYMMDD`
    #[default]
    DateOnly,
    /// `YYYYMMDD-HHMMSS`
    DateTimeSeconds,
}

impl Display for NamingStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NamingStyle::DateOnly => write!(f, "date only (YYYYMMDD)"),
            NamingStyle::DateTimeSeconds => write!(f, "date and time (YYYYMMDD-HHMMSS)"),
        }
    }
}

/// Replaces characters that aren't allowed in file names with `_`.
pub fn sanitize(subject: &str) -> String {
    subject
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

pub fn datestamp(when: &NaiveDateTime, style: NamingStyle) -> String {
    match style {
        NamingStyle::DateOnly => when.format("%Y%m%d").to_string(),
        NamingStyle::DateTimeSeconds => when.format("%Y%m%d-%H%M%S").to_string(),
    }
}

/// File name for image `index` (1 based) out of `total` in a single tweet.
/// A lone image gets no index suffix.
pub fn tweet_file_name(
    subject: &str,
    when: &NaiveDateTime,
    style: NamingStyle,
    index: usize,
    total: usize,
) -> String {
    let stamp = datestamp(when, style);
    let subject = sanitize(subject);
    if total <= 1 {
        format!("{subject}-{stamp}{FILE_EXTENSION}")
    } else {
        format!("{subject}-{stamp}-{index:02}{FILE_EXTENSION}")
    }
}

/// File name for a batch download. The media id keeps names unique within
/// a profile, so no index is needed.
pub fn batch_file_name(subject: &str, media_id: &str) -> String {
    format!(
        "{}-{}{FILE_EXTENSION}",
        sanitize(subject),
        sanitize(media_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn march_fourth() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 4)
            .unwrap()
            .and_hms_opt(13, 5, 9)
            .unwrap()
    }

    #[test]
    fn single_image_date_only() {
        assert_eq!(
            tweet_file_name("user", &march_fourth(), NamingStyle::DateOnly, 1, 1),
            "user-20250304.png"
        );
    }

    #[test]
    fn single_image_with_seconds() {
        assert_eq!(
            tweet_file_name("user", &march_fourth(), NamingStyle::DateTimeSeconds, 1, 1),
            "user-20250304-130509.png"
        );
    }

    #[test]
    fn multi_image_tweet_is_indexed() {
        let names: Vec<_> = (1..=3)
            .map(|i| tweet_file_name("user", &march_fourth(), NamingStyle::DateOnly, i, 3))
            .collect();
        assert_eq!(
            names,
            vec!["user-20250304-01.png", "user-20250304-02.png", "user-20250304-03.png"]
        );
    }

    #[test]
    fn batch_name_uses_media_id() {
        assert_eq!(batch_file_name("someone", "GabcXYZ"), "someone-GabcXYZ.png");
    }

    #[test]
    fn unsafe_subject_characters_are_replaced() {
        assert_eq!(sanitize(r#"a/b\c:d*e?f"g<h>i|j"#), "a_b_c_d_e_f_g_h_i_j");
    }
}
