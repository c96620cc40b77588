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

use chrono::{NaiveDate, TimeDelta};
use odin_common::datetime::{fmt_signed_hms, naive_full_day, naive_full_hour, parse_iso_utc_suffix, parse_naive_utc_datetime};

#[test]
fn test_parse_datetime() {
    let expected = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap().and_hms_opt(12, 50, 0).unwrap();

    for s in ["2024-09-01T12:50:00Z", "2024-09-01T12:50:00", "2024-09-01 12:50:00", "2024-09-01T12:50", " 2024-09-01T14:50:00+02:00 "] {
        assert_eq!( parse_naive_utc_datetime(s), Some(expected), "{s}");
    }
    assert_eq!( parse_naive_utc_datetime("2024-09-01"), Some( NaiveDate::from_ymd_opt(2024, 9, 1).unwrap().and_hms_opt(0,0,0).unwrap()));
    assert_eq!( parse_naive_utc_datetime("2024-09-31T12:00:00Z"), None);
    assert_eq!( parse_naive_utc_datetime("now"), None);

    assert_eq!( parse_iso_utc_suffix("seconds since 2024-09-01T12:50:00Z"), Some(expected));
    assert_eq!( parse_iso_utc_suffix(""), None);
}

#[test]
fn test_truncation() {
    let dt = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap().and_hms_opt(12, 50, 33).unwrap();
    assert_eq!( naive_full_hour( &dt).to_string(), "2024-09-01 12:00:00");
    assert_eq!( naive_full_day( &dt).to_string(), "2024-09-01 00:00:00");
}

#[test]
fn test_fmt_signed_hms() {
    assert_eq!( fmt_signed_hms( &TimeDelta::seconds(3723)), "+01:02:03");
    assert_eq!( fmt_signed_hms( &TimeDelta::seconds(-905)), "-00:15:05");
    assert_eq!( fmt_signed_hms( &TimeDelta::zero()), "+00:00:00");
}
