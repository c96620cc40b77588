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

use std::future::ready;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use odin_nexrad::{
    resolve, resolve_windowed, search_windows, IdentifierFormat, OdinNexradError, SearchWindow, TimeLayout,
    TimestampExtractor, WindowSpan
};

fn dt (d: u32, h: u32, m: u32, s: u32)->NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 9, d).unwrap().and_hms_opt(h, m, s).unwrap()
}

fn minutes_extractor (prefix: &str)->TimestampExtractor {
    TimestampExtractor::new( IdentifierFormat::new( prefix, TimeLayout::DateTimeMinutes, "", true)).unwrap()
}

#[test]
fn test_closest_example() {
    let ex = minutes_extractor("S");
    let candidates = ["S20240901_1200", "S20240901_1230", "S20240901_1305"];

    // 13:05 is 15min away from 12:50, 12:30 is 20min away
    let tid = resolve( candidates, &dt(1,12,50,0), |id| ex.extract(id)).unwrap();
    assert_eq!( tid.id, "S20240901_1305");
    assert_eq!( tid.timestamp, dt(1,13,5,0));
}

#[test]
fn test_closest_brute_force() {
    let ex = TimestampExtractor::new( IdentifierFormat::aws_level2("KJAX")).unwrap();
    let candidates: Vec<String> = (0..48).map(|i| {
        let t = dt(1,0,0,0) + TimeDelta::seconds( i * 1789 + (i*i*37) % 600);
        format!("2024/09/01/KJAX/KJAX{}_V06", t.format("%Y%m%d_%H%M%S"))
    }).collect();

    for target in [dt(1,0,0,0), dt(1,7,13,22), dt(1,12,0,0), dt(1,23,59,59), dt(2,3,0,0)] {
        let tid = resolve( &candidates, &target, |id| ex.extract(id)).unwrap();
        let d = (tid.timestamp - target).abs();
        for c in &candidates {
            let t = ex.extract(c).unwrap();
            assert!( d <= (t - target).abs(), "{} is closer to {} than {}", c, target, tid.id);
        }
    }
}

#[test]
fn test_empty_and_malformed() {
    let ex = minutes_extractor("S");
    let empty: Vec<String> = Vec::new();
    assert!( resolve( &empty, &dt(1,12,0,0), |id| ex.extract(id)).is_none());

    let malformed = ["T20240901_1200", "S2024090_1200", "S20240901_12x0", "S20240901_2561", "S20240901_1200.bak", ""];
    assert!( resolve( malformed, &dt(1,12,0,0), |id| ex.extract(id)).is_none());

    // malformed ones are skipped, not fatal
    let mixed = ["S20240901_12x0", "S20240901_1100", "garbage"];
    assert_eq!( resolve( mixed, &dt(1,12,0,0), |id| ex.extract(id)).unwrap().id, "S20240901_1100");
}

#[test]
fn test_tie_uses_input_order() {
    let ex = minutes_extractor("S");
    let target = dt(1,12,0,0);

    let a = ["S20240901_1150", "S20240901_1210"];
    assert_eq!( resolve( a, &target, |id| ex.extract(id)).unwrap().id, "S20240901_1150");

    let b = ["S20240901_1210", "S20240901_1150"];
    assert_eq!( resolve( b, &target, |id| ex.extract(id)).unwrap().id, "S20240901_1210");
}

#[test]
fn test_station_extraction() {
    let ex = TimestampExtractor::new( IdentifierFormat::new( "ABCD", TimeLayout::DateTimeSeconds, "", false)).unwrap();

    assert_eq!( ex.extract("ABCD20240901_120000"), Some(dt(1,12,0,0)));
    assert_eq!( ex.extract("WXYZ20240901_120000"), None);
}

#[tokio::test]
async fn test_windowed_fallback() {
    let ex = minutes_extractor("S");
    let target = dt(2,0,30,0);
    let windows = search_windows( &target, WindowSpan::Day, 2);
    let mut listed: Vec<SearchWindow> = Vec::new();

    // window A (Sep 2) has no valid candidates, window B (Sep 1) has exactly one
    let tid = resolve_windowed( "S", &windows, &target, |id| ex.extract(id), |w| {
        listed.push( w);
        if w.start == dt(2,0,0,0) {
            ready( Ok( vec!["S2024090_0010".to_string(), "README".to_string()] ))
        } else {
            ready( Ok( vec!["S20240901_2350".to_string()] ))
        }
    }).await.unwrap();

    assert_eq!( tid.id, "S20240901_2350");
    assert_eq!( listed, windows);
}

#[tokio::test]
async fn test_windowed_first_window_wins() {
    let ex = minutes_extractor("S");
    let target = dt(2,0,30,0);
    let windows = search_windows( &target, WindowSpan::Day, 2);
    let mut n_listed = 0;

    // the previous day has a closer scan, but we don't look at it if the first window resolves
    let tid = resolve_windowed( "S", &windows, &target, |id| ex.extract(id), |w| {
        n_listed += 1;
        if w.start == dt(2,0,0,0) {
            ready( Ok( vec!["S20240902_0200".to_string()] ))
        } else {
            ready( Ok( vec!["S20240902_0025".to_string()] ))
        }
    }).await.unwrap();

    assert_eq!( tid.id, "S20240902_0200");
    assert_eq!( n_listed, 1);
}

#[tokio::test]
async fn test_windowed_no_data() {
    let ex = minutes_extractor("S");
    let target = dt(2,0,30,0);
    let windows = search_windows( &target, WindowSpan::Hour, 2);

    let res = resolve_windowed( "S", &windows, &target, |id| ex.extract(id), |_| ready( Ok::<Vec<String>,OdinNexradError>( Vec::new()))).await;
    match res {
        Err(OdinNexradError::NoDataFound { station, windows }) => {
            assert_eq!( station, "S");
            assert_eq!( windows, "hour 2024-09-02T00, hour 2024-09-01T23");
        }
        other => panic!("expected NoDataFound, got {other:?}")
    }
}

#[tokio::test]
async fn test_windowed_listing_error() {
    let ex = minutes_extractor("S");
    let target = dt(2,0,30,0);
    let windows = search_windows( &target, WindowSpan::Hour, 3);
    let mut n_listed = 0;

    let res = resolve_windowed( "S", &windows, &target, |id| ex.extract(id), |_| {
        n_listed += 1;
        ready( Err::<Vec<String>,OdinNexradError>( odin_nexrad::op_failed("connection refused")))
    }).await;
    assert!( matches!( res, Err(OdinNexradError::OpFailed(_))));
    assert_eq!( n_listed, 1);
}
