//! Page count scalar, rendered on the wire as `"<n> pages"`.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const SUFFIX: &str = "pages";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid page format")]
pub struct PagesFormatError;

/// Number of pages in a book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pages(pub i32);

impl Pages {
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for Pages {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Pages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, SUFFIX)
    }
}

/// Parses the unquoted form: exactly `<i32> pages`, single space, lowercase suffix.
impl FromStr for Pages {
    type Err = PagesFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(' ');
        let (Some(count), Some(SUFFIX), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(PagesFormatError);
        };
        count.parse::<i32>().map(Self).map_err(|_| PagesFormatError)
    }
}

impl Serialize for Pages {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pages {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(PagesVisitor)
    }
}

struct PagesVisitor;

impl de::Visitor<'_> for PagesVisitor {
    type Value = Pages;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string of the form \"<n> pages\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Pages, E> {
        v.parse().map_err(E::custom)
    }
}
