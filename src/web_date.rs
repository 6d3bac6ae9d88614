// Dates in the web API format `yyyy-MM-dd HH:mm:ssZ`, for `#[serde(with = ...)]`.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serializer};

pub const WEB_API_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_str(value, WEB_API_DATE_FORMAT).map(|date| date.with_timezone(&Utc))
}

pub fn format(date: &DateTime<Utc>) -> String {
    date.format(WEB_API_DATE_FORMAT).to_string()
}

pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(date))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(|_| de::Error::custom(format!("cannot decode date string {raw}")))
}

pub mod option {
    use super::*;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_some(&format(date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw)
                .map(Some)
                .map_err(|_| de::Error::custom(format!("cannot decode date string {raw}"))),
            None => Ok(None),
        }
    }
}
