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

//! nearest-timestamp resolution of archive identifiers, and the search windows we resolve in

use std::{fmt, future::Future};
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use odin_common::datetime::{abs_diff, fmt_signed_hms, naive_full_day, naive_full_hour};

use crate::errors::{OdinNexradError, Result};

/// an archive identifier together with the timestamp that was extracted from it
#[derive(Debug,Clone,PartialEq,Eq)]
pub struct TimestampedIdentifier {
    pub id: String,
    pub timestamp: NaiveDateTime,
}

impl TimestampedIdentifier {
    /// signed distance of this identifier's timestamp from `target` (positive means later)
    pub fn offset_from (&self, target: &NaiveDateTime)->TimeDelta {
        self.timestamp - *target
    }
}

impl fmt::Display for TimestampedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.timestamp.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

/// return the candidate with the smallest absolute distance to `target`, or `None` if no candidate
/// has an extractable timestamp. Candidates for which `extract` returns `None` are skipped. On ties the
/// first candidate in iteration order wins. This does not perform any I/O
pub fn resolve<I,S,F> (candidates: I, target: &NaiveDateTime, extract: F)->Option<TimestampedIdentifier>
    where I: IntoIterator<Item=S>, S: AsRef<str>, F: Fn(&str)->Option<NaiveDateTime>
{
    let mut best: Option<(TimeDelta,TimestampedIdentifier)> = None;

    for c in candidates {
        let id = c.as_ref();
        if let Some(timestamp) = extract(id) {
            let dt = abs_diff( &timestamp, target);
            let is_better = match &best {
                Some((best_dt,_)) => dt < *best_dt, // strict, first minimum wins
                None => true
            };
            if is_better {
                best = Some( (dt, TimestampedIdentifier { id: id.to_string(), timestamp }) );
            }
        } else {
            debug!("ignoring non-matching identifier {id}");
        }
    }

    best.map(|(_,tid)| tid)
}

/// caller-level retry over a sequence of search windows. `list` provides the complete candidate set of
/// a window. The first window that resolves to a candidate wins, listing errors are returned immediately
/// and exhausting all windows results in a [`OdinNexradError::NoDataFound`] error.
/// Each window is resolved against the original `target`
pub async fn resolve_windowed<E,L,F> (station: &str, windows: &[SearchWindow], target: &NaiveDateTime, extract: E, mut list: L)->Result<TimestampedIdentifier>
    where E: Fn(&str)->Option<NaiveDateTime>, L: FnMut(SearchWindow)->F, F: Future<Output=Result<Vec<String>>>
{
    for (i,window) in windows.iter().enumerate() {
        if i > 0 { warn!("no {station} data in previous window, falling back to {window}") }

        let candidates = list(*window).await?;
        info!("{station} listing for {window}: {} entries", candidates.len());

        if let Some(tid) = resolve( &candidates, target, &extract) {
            info!("closest to {target} is {} ({})", tid.id, fmt_signed_hms( &tid.offset_from(target)));
            return Ok(tid)
        } else {
            debug!("no matching {station} identifiers in {window}");
        }
    }

    Err( no_data_found( station, windows))
}

fn no_data_found (station: &str, windows: &[SearchWindow])->OdinNexradError {
    let windows = windows.iter().map(|w| w.to_string()).collect::<Vec<String>>().join(", ");
    OdinNexradError::NoDataFound { station: station.to_string(), windows: if windows.is_empty() { "no windows".to_string() } else { windows } }
}

/* #region search windows ***************************************************************************/

/// the granularity in which an archive is organized (and hence listed)
#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
pub enum WindowSpan {
    Day,
    Hour,
}

impl WindowSpan {
    pub fn duration (&self)->TimeDelta {
        match self {
            WindowSpan::Day => TimeDelta::days(1),
            WindowSpan::Hour => TimeDelta::hours(1),
        }
    }

    /// the start of the span that contains `dt`
    pub fn truncate (&self, dt: &NaiveDateTime)->NaiveDateTime {
        match self {
            WindowSpan::Day => naive_full_day(dt),
            WindowSpan::Hour => naive_full_hour(dt),
        }
    }
}

/// a contiguous time range `[start, start + span)` of an archive for which we can obtain a listing
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub struct SearchWindow {
    pub start: NaiveDateTime,
    pub span: WindowSpan,
}

impl SearchWindow {
    pub fn containing (dt: &NaiveDateTime, span: WindowSpan)->Self {
        SearchWindow { start: span.truncate(dt), span }
    }

    /// the window immediately before this one
    pub fn previous (&self)->Self {
        SearchWindow { start: self.start - self.span.duration(), span: self.span }
    }

    pub fn end (&self)->NaiveDateTime {
        self.start + self.span.duration()
    }

    pub fn contains (&self, dt: &NaiveDateTime)->bool {
        *dt >= self.start && *dt < self.end()
    }
}

impl fmt::Display for SearchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            WindowSpan::Day => write!(f, "day {}", self.start.format("%Y-%m-%d")),
            WindowSpan::Hour => write!(f, "hour {}", self.start.format("%Y-%m-%dT%H")),
        }
    }
}

/// the window that contains `target` followed by `count-1` progressively older windows.
/// A `count` of 0 is treated as 1 since there is no point in resolving without any window
pub fn search_windows (target: &NaiveDateTime, span: WindowSpan, count: usize)->Vec<SearchWindow> {
    let count = count.max(1);
    let mut windows = Vec::with_capacity(count);

    let mut w = SearchWindow::containing( target, span);
    for _ in 0..count {
        windows.push(w);
        w = w.previous();
    }
    windows
}

/* #endregion search windows */

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt (d: u32, h: u32, m: u32)->NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_hour_windows() {
        let ws = search_windows( &dt(1,0,20), WindowSpan::Hour, 3);
        assert_eq!( ws.len(), 3);
        assert_eq!( ws[0].start, dt(1,0,0));
        assert_eq!( ws[1].start, NaiveDate::from_ymd_opt(2024,8,31).unwrap().and_hms_opt(23,0,0).unwrap());
        assert_eq!( ws[2].start, NaiveDate::from_ymd_opt(2024,8,31).unwrap().and_hms_opt(22,0,0).unwrap());
        assert!( ws[0].contains( &dt(1,0,59)));
        assert!( !ws[0].contains( &dt(1,1,0)));
    }

    #[test]
    fn test_day_windows() {
        let ws = search_windows( &dt(2,13,45), WindowSpan::Day, 0);
        assert_eq!( ws, vec![ SearchWindow { start: dt(2,0,0), span: WindowSpan::Day } ]);
        assert_eq!( ws[0].previous().start, dt(1,0,0));
        assert_eq!( ws[0].end(), dt(3,0,0));
        assert_eq!( ws[0].to_string(), "day 2024-09-02");
    }

    #[test]
    fn test_offset() {
        let tid = TimestampedIdentifier { id: "x".to_string(), timestamp: dt(1,12,30) };
        assert_eq!( tid.offset_from( &dt(1,12,50)), TimeDelta::minutes(-20));
    }
}
