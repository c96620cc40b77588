/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Utc};

/// this should be used wherever we might have to use sim clock instead of wall clock
#[inline]
pub fn utc_now()->DateTime<Utc> {
    Utc::now()
}

/// current UTC wall clock time without timezone and sub-second fractions. Archive file names encode
/// naive UTC times with second resolution so this is what we compare against
pub fn naive_utc_now()->NaiveDateTime {
    truncate_to_second( &utc_now().naive_utc())
}

#[inline]
pub fn truncate_to_second (dt: &NaiveDateTime)->NaiveDateTime {
    dt.with_nanosecond(0).unwrap_or(*dt)
}

/// return the full hour for given NaiveDateTime (minutes, seconds and nanos all zeroed)
pub fn naive_full_hour (dt: &NaiveDateTime)->NaiveDateTime {
    dt.date().and_time( NaiveTime::MIN) + TimeDelta::hours( dt.hour() as i64)
}

/// return the start of the day (00:00:00) for given NaiveDateTime
pub fn naive_full_day (dt: &NaiveDateTime)->NaiveDateTime {
    dt.date().and_time( NaiveTime::MIN)
}

/// absolute difference between two naive times. Note this is symmetric, i.e. the order of arguments does not matter
#[inline]
pub fn abs_diff (a: &NaiveDateTime, b: &NaiveDateTime)->TimeDelta {
    (*a - *b).abs()
}

/// format a TimeDelta as signed "[-]HH:MM:SS" (e.g. for logging offsets from a target time)
pub fn fmt_signed_hms (d: &TimeDelta)->String {
    let secs = d.num_seconds();
    let sign = if secs < 0 { "-" } else { "+" };
    let secs = secs.abs();
    format!("{}{:02}:{:02}:{:02}", sign, secs / 3600, (secs % 3600) / 60, secs % 60)
}

//--- misc string format parsing

/// parse a UTC date/time spec as it is typically entered on the command line. We accept
/// `2024-09-01T12:00:00`, `2024-09-01T12:00:00Z`, `2024-09-01 12:00:00`, `2024-09-01T12:00`, RFC 3339 with
/// offset (which is converted to UTC) and plain dates `2024-09-01` (meaning 00:00:00)
pub fn parse_naive_utc_datetime (s: &str)->Option<NaiveDateTime> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some( truncate_to_second( &dt.naive_utc()))
    }

    let s = s.strip_suffix('Z').unwrap_or(s);
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt)
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(|d| d.and_time(NaiveTime::MIN))
}

/// parse the ISO "yyyy-MM-ddTHH:mm:ssZ" time stamps used in netCDF `time_coverage_start` attributes and CF `units` strings
/// (e.g. "seconds since 2024-09-01T12:00:05Z")
pub fn parse_iso_utc_suffix (s: &str)->Option<NaiveDateTime> {
    let last = s.split_whitespace().last()?;
    parse_naive_utc_datetime(last)
}
