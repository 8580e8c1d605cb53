// Copyright (c) 2023 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use std::{cmp::min, fmt};

/// Returns the integer part of a packed time value.
pub fn my_packed_time_get_int_part(i: i64) -> i64 {
    i >> 24
}

/// Returns the fractional part (microseconds) of a packed time value.
pub fn my_packed_time_get_frac_part(i: i64) -> i64 {
    i % (1_i64 << 24)
}

/// Makes a packed time value from integer and fractional parts.
pub fn my_packed_time_make(i: i64, f: i64) -> i64 {
    (i << 24).wrapping_add(f)
}

/// Server-side mysql time representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MysqlTime {
    pub year: u32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// microseconds
    pub second_part: u32,
    pub neg: bool,
    pub time_type: MysqlTimestampType,
}

impl MysqlTime {
    /// Creates a date value.
    pub fn date(year: u32, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
            second_part: 0,
            neg: false,
            time_type: MysqlTimestampType::MYSQL_TIMESTAMP_DATE,
        }
    }

    /// Creates a datetime value.
    pub fn datetime(year: u32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        Self {
            hour,
            minute,
            second,
            time_type: MysqlTimestampType::MYSQL_TIMESTAMP_DATETIME,
            ..Self::date(year, month, day)
        }
    }

    /// Creates a time value.
    pub fn time(neg: bool, hour: u32, minute: u32, second: u32) -> Self {
        Self {
            hour,
            minute,
            second,
            neg,
            time_type: MysqlTimestampType::MYSQL_TIMESTAMP_TIME,
            ..Self::date(0, 0, 0)
        }
    }

    /// Convert time packed numeric representation to [`MysqlTime`].
    pub fn from_int64_time_packed(mut packed_value: i64) -> Self {
        let neg = packed_value < 0;
        if neg {
            packed_value = packed_value.wrapping_neg()
        }

        let hms: i64 = my_packed_time_get_int_part(packed_value);

        let hour = (hms >> 12) as u32 % (1 << 10); /* 10 bits starting at 12th */
        let minute = (hms >> 6) as u32 % (1 << 6); /* 6 bits starting at 6th   */
        let second = hms as u32 % (1 << 6); /* 6 bits starting at 0th   */
        let second_part = my_packed_time_get_frac_part(packed_value);

        Self {
            second_part: second_part as u32,
            ..Self::time(neg, hour, minute, second)
        }
    }

    /// Convert packed numeric datetime representation to [`MysqlTime`].
    pub fn from_int64_datetime_packed(mut packed_value: i64) -> Self {
        let neg = packed_value < 0;
        if neg {
            packed_value = packed_value.wrapping_neg()
        }

        let second_part = my_packed_time_get_frac_part(packed_value);
        let ymdhms: i64 = my_packed_time_get_int_part(packed_value);

        let ymd: i64 = ymdhms >> 17;
        let ym: i64 = ymd >> 5;
        let hms: i64 = ymdhms % (1 << 17);

        let day = ymd % (1 << 5);
        let month = ym % 13;
        let year = ym / 13;

        let second = hms % (1 << 6);
        let minute = (hms >> 6) % (1 << 6);
        let hour = hms >> 12;

        Self {
            second_part: second_part as u32,
            neg,
            ..Self::datetime(
                year as u32,
                month as u32,
                day as u32,
                hour as u32,
                minute as u32,
                second as u32,
            )
        }
    }
}

impl fmt::Display for MysqlTime {
    /// Formatter precision, if given, is the number of fractional digits (at most 6).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.time_type {
            MysqlTimestampType::MYSQL_TIMESTAMP_DATETIME => format_datetime(self, f),
            MysqlTimestampType::MYSQL_TIMESTAMP_DATE => format_date(self, f),
            MysqlTimestampType::MYSQL_TIMESTAMP_TIME => format_time(self, f),
        }
    }
}

fn trim_two_digits(value: u32) -> u32 {
    if value >= 100 {
        0
    } else {
        value
    }
}

/// Formats a time value as `HH:MM:SS[.fraction]`.
fn format_time(time: &MysqlTime, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if time.neg {
        f.write_str("-")?;
    }

    write!(
        f,
        "{:02}:{:02}:{:02}",
        time.hour,
        trim_two_digits(time.minute),
        trim_two_digits(time.second),
    )?;
    format_useconds(time.second_part, f)
}

/// Formats a datetime value with an optional fractional part (if formatter precision is given).
fn format_datetime(time: &MysqlTime, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if time.neg {
        f.write_str("-")?;
    }

    format_date(time, f)?;
    write!(
        f,
        " {:02}:{:02}:{:02}",
        trim_two_digits(time.hour),
        trim_two_digits(time.minute),
        trim_two_digits(time.second),
    )?;
    format_useconds(time.second_part, f)
}

/// Formats a date value as 'YYYY-MM-DD'.
fn format_date(time: &MysqlTime, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
        f,
        "{:02}{:02}-{:02}-{:02}",
        trim_two_digits(time.year / 100),
        trim_two_digits(time.year % 100),
        trim_two_digits(time.month),
        trim_two_digits(time.day),
    )
}

/// Only formats useconds if formatter precision is given (will be truncated to 6)
fn format_useconds(mut useconds: u32, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let dec = match f.precision().map(|x| min(x, 6)) {
        Some(dec) if dec > 0 => dec,
        _ => return Ok(()),
    };

    useconds %= 1_000_000;

    for _ in 0..(6 - dec) {
        useconds /= 10;
    }

    write!(f, ".{:0width$}", useconds, width = dec)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum MysqlTimestampType {
    MYSQL_TIMESTAMP_DATE,
    MYSQL_TIMESTAMP_DATETIME,
    MYSQL_TIMESTAMP_TIME,
}
