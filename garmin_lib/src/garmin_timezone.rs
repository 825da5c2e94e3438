use derive_more::Into;
use stack_string::StackString;
use std::{convert::TryFrom, fmt, ops::Deref, str::FromStr};
use time::{Duration, OffsetDateTime, PrimitiveDateTime};
use time_tz::{
    timezones::{db::UTC, get_by_name},
    Offset, OffsetResult, PrimitiveDateTimeExt, TimeZone, Tz,
};

use crate::errors::ConverterError as Error;

/// A validated IANA time zone used to anchor naive civil timestamps.
#[derive(Into, Debug, PartialEq, Copy, Clone, Eq)]
pub struct GarminTz(&'static Tz);

impl Default for GarminTz {
    fn default() -> Self {
        Self(UTC)
    }
}

impl Deref for GarminTz {
    type Target = Tz;
    fn deref(&self) -> &Self::Target {
        self.0
    }
}

impl fmt::Display for GarminTz {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.0.name())
    }
}

impl From<GarminTz> for StackString {
    fn from(item: GarminTz) -> Self {
        item.0.name().into()
    }
}

impl FromStr for GarminTz {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        get_by_name(s)
            .map(Self)
            .ok_or_else(|| Error::InvalidTimeZone(s.into()))
    }
}

impl TryFrom<&str> for GarminTz {
    type Error = Error;
    fn try_from(item: &str) -> Result<Self, Self::Error> {
        item.parse()
    }
}

impl GarminTz {
    /// Attach this zone to a wall-clock reading without shifting it.
    ///
    /// A reading repeated by a DST fold resolves to its first occurrence, a
    /// reading skipped by a DST gap keeps the offset in effect before the
    /// transition.
    #[must_use]
    pub fn attach(&self, datetime: PrimitiveDateTime) -> OffsetDateTime {
        match datetime.assume_timezone(self.0) {
            OffsetResult::Some(dt) | OffsetResult::Ambiguous(dt, _) => dt,
            OffsetResult::None => {
                // The reading a day earlier, taken as UTC, precedes the
                // transition in every zone.
                let before = datetime.assume_utc() - Duration::days(1);
                let offset = self.0.get_offset_utc(&before).to_utc();
                datetime.assume_offset(offset)
            }
        }
    }
}
