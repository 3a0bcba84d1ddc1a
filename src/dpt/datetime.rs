//! DPT 10.x (time of day) and DPT 11.x (date)
//!
//! Time is 3 bytes: weekday(3 bits)/hour(5 bits), minute(6 bits),
//! second(6 bits); weekday 0 means "no day". Date is 3 bytes:
//! day(5 bits), month(4 bits), year(7 bits) with the century pivot
//! year >= 90 -> 1900s, else 2000s.

use crate::dpt::{check_payload_len, wrong_kind, DptCodec, DptId, DptValue, PayloadLength, ValueKind};
use crate::error::KnxError;
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use std::fmt;

/// Century pivot of the 7-bit DPT 11 year field.
const YEAR_PIVOT: i32 = 90;

const WEEKDAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Time of day with an optional weekday (1 = Monday .. 7 = Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnxTime {
    pub weekday: Option<u8>,
    pub time: NaiveTime,
}

impl KnxTime {
    pub fn new(weekday: Option<u8>, hour: u32, minute: u32, second: u32) -> Result<Self, KnxError> {
        if let Some(day) = weekday {
            if !(1..=7).contains(&day) {
                return Err(KnxError::ValueFormat(format!(
                    "weekday {day} outside 1..=7"
                )));
            }
        }
        let time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(|| {
            KnxError::ValueFormat(format!("invalid time {hour:02}:{minute:02}:{second:02}"))
        })?;
        Ok(Self { weekday, time })
    }
}

impl fmt::Display for KnxTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.weekday {
            Some(day) => write!(f, "{} {}", WEEKDAY_NAMES[usize::from(day - 1)], self.time),
            None => write!(f, "{}", self.time),
        }
    }
}

/// DPT 10.x time-of-day codec.
#[derive(Debug, Clone, Copy)]
pub struct TimeCodec {
    id: DptId,
}

impl TimeCodec {
    pub fn new(id: DptId) -> Self {
        Self { id }
    }
}

impl DptCodec for TimeCodec {
    fn id(&self) -> DptId {
        self.id
    }

    fn payload_length(&self) -> PayloadLength {
        PayloadLength::Bytes(3)
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Time
    }

    fn encode(&self, value: &DptValue) -> Result<Vec<u8>, KnxError> {
        let t = match value {
            DptValue::Time(t) => t,
            other => return Err(wrong_kind(self, other)),
        };
        let weekday = t.weekday.unwrap_or(0);
        Ok(vec![
            (weekday << 5) | (t.time.hour() as u8 & 0x1F),
            t.time.minute() as u8 & 0x3F,
            t.time.second() as u8 & 0x3F,
        ])
    }

    fn decode(&self, raw: &[u8]) -> Result<DptValue, KnxError> {
        check_payload_len(self, raw)?;
        let weekday = (raw[0] >> 5) & 0x07;
        let weekday = if weekday == 0 { None } else { Some(weekday) };
        let time = KnxTime::new(
            weekday,
            u32::from(raw[0] & 0x1F),
            u32::from(raw[1] & 0x3F),
            u32::from(raw[2] & 0x3F),
        )?;
        Ok(DptValue::Time(time))
    }
}

/// DPT 11.x date codec.
#[derive(Debug, Clone, Copy)]
pub struct DateCodec {
    id: DptId,
}

impl DateCodec {
    pub fn new(id: DptId) -> Self {
        Self { id }
    }
}

impl DptCodec for DateCodec {
    fn id(&self) -> DptId {
        self.id
    }

    fn payload_length(&self) -> PayloadLength {
        PayloadLength::Bytes(3)
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Date
    }

    fn encode(&self, value: &DptValue) -> Result<Vec<u8>, KnxError> {
        let date = match value {
            DptValue::Date(d) => d,
            other => return Err(wrong_kind(self, other)),
        };
        let year = date.year();
        if !(1990..=2089).contains(&year) {
            return Err(KnxError::ValueRange(format!(
                "year {year} outside 1990..=2089 for DPT {}",
                self.id
            )));
        }
        let short_year = if year >= 2000 { year - 2000 } else { year - 1900 };
        Ok(vec![
            date.day() as u8 & 0x1F,
            date.month() as u8 & 0x0F,
            short_year as u8 & 0x7F,
        ])
    }

    fn decode(&self, raw: &[u8]) -> Result<DptValue, KnxError> {
        check_payload_len(self, raw)?;
        let day = u32::from(raw[0] & 0x1F);
        let month = u32::from(raw[1] & 0x0F);
        let short_year = i32::from(raw[2] & 0x7F);
        let year = if short_year >= YEAR_PIVOT {
            1900 + short_year
        } else {
            2000 + short_year
        };
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            KnxError::ValueFormat(format!("invalid date {year:04}-{month:02}-{day:02}"))
        })?;
        Ok(DptValue::Date(date))
    }
}
