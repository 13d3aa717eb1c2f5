//! Publication date recovery from the assorted places blogs hide it.

use crate::consts;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime};

const MONTHS: [(&str, Month); 12] = [
    ("january", Month::January),
    ("february", Month::February),
    ("march", Month::March),
    ("april", Month::April),
    ("may", Month::May),
    ("june", Month::June),
    ("july", Month::July),
    ("august", Month::August),
    ("september", Month::September),
    ("october", Month::October),
    ("november", Month::November),
    ("december", Month::December),
];

fn month_from_name(name: &str) -> Option<Month> {
    let name = name.to_ascii_lowercase();
    MONTHS.iter().find(|(candidate, _)| *candidate == name).map(|(_, month)| *month)
}

fn midnight(date: Date) -> OffsetDateTime {
    date.midnight().assume_utc()
}

fn date_from_parts(year: &str, month: Month, day: &str) -> Option<Date> {
    Date::from_calendar_date(year.parse().ok()?, month, day.parse().ok()?).ok()
}

/// Parses machine-readable timestamps found in `<meta>` and `<time>` tags:
/// RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS`, or a bare `YYYY-MM-DD`.
pub(crate) fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if let Ok(datetime) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(datetime);
    }
    if let Ok(datetime) = PrimitiveDateTime::parse(value, format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]")) {
        return Some(datetime.assume_utc());
    }
    Date::parse(value.get(..10)?, format_description!("[year]-[month]-[day]")).ok().map(midnight)
}

/// Finds a human-written date in free text, e.g. `March 3, 2024`, `03/15/2024` or `2024-03-15`.
pub(crate) fn parse_prose(text: &str) -> Option<OffsetDateTime> {
    if let Some(captures) = consts::LONG_DATE_REGEX.captures(text)
        && let Some(month) = month_from_name(&captures[1])
        && let Some(date) = date_from_parts(&captures[3], month, &captures[2])
    {
        return Some(midnight(date));
    }
    if let Some(captures) = consts::NUMERIC_DATE_REGEX.captures(text)
        && let Some(month) = captures[1].parse::<u8>().ok().and_then(|m| Month::try_from(m).ok())
        && let Some(date) = date_from_parts(&captures[3], month, &captures[2])
    {
        return Some(midnight(date));
    }
    if let Some(captures) = consts::ISO_DATE_REGEX.captures(text)
        && let Some(month) = captures[2].parse::<u8>().ok().and_then(|m| Month::try_from(m).ok())
        && let Some(date) = date_from_parts(&captures[1], month, &captures[3])
    {
        return Some(midnight(date));
    }
    None
}

/// Reads `/2024/september/3/` style permalinks.
pub(crate) fn from_url(url: &str) -> Option<OffsetDateTime> {
    let url = url.to_ascii_lowercase();
    let captures = consts::URL_DATE_REGEX.captures(&url)?;
    let month = month_from_name(&captures[2])?;
    date_from_parts(&captures[1], month, &captures[3]).map(midnight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::datetime;

    #[rstest]
    #[case("2024-01-15T10:30:00+02:00", Some(datetime!(2024-01-15 10:30:00 +2)))]
    #[case("2024-01-15T10:30:00", Some(datetime!(2024-01-15 10:30:00 UTC)))]
    #[case("2024-01-15", Some(datetime!(2024-01-15 00:00:00 UTC)))]
    #[case("  2024-01-15  ", Some(datetime!(2024-01-15 00:00:00 UTC)))]
    #[case("yesterday", None)]
    #[case("", None)]
    fn test_parse_timestamp(#[case] input: &str, #[case] expected: Option<OffsetDateTime>) {
        assert_eq!(parse_timestamp(input), expected);
    }

    #[rstest]
    #[case("Posted by Admin | March 3, 2024 | News", Some(datetime!(2024-03-03 00:00:00 UTC)))]
    #[case("posted on december 25 2023", Some(datetime!(2023-12-25 00:00:00 UTC)))]
    #[case("Updated 03/15/2024", Some(datetime!(2024-03-15 00:00:00 UTC)))]
    #[case("Published 2022-07-04", Some(datetime!(2022-07-04 00:00:00 UTC)))]
    #[case("February 30, 2024", None)]
    #[case("No date here", None)]
    fn test_parse_prose(#[case] input: &str, #[case] expected: Option<OffsetDateTime>) {
        assert_eq!(parse_prose(input), expected);
    }

    #[rstest]
    #[case("https://example.com/2024/september/3/new-models/", Some(datetime!(2024-09-03 00:00:00 UTC)))]
    #[case("https://example.com/2024/September/30/", Some(datetime!(2024-09-30 00:00:00 UTC)))]
    #[case("https://example.com/2024/09/03/new-models/", None)]
    #[case("https://example.com/blog/post/", None)]
    fn test_from_url(#[case] url: &str, #[case] expected: Option<OffsetDateTime>) {
        assert_eq!(from_url(url), expected);
    }
}
