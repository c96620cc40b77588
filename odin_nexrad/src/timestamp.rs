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

//! extraction of scan times that are encoded in archive file names

use std::fmt;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use odin_common::{if_let, fs::key_basename};

use crate::errors::{OdinNexradError, Result};

/// layout of the date/time substring within an identifier
#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
pub enum TimeLayout {
    /// `yyyyMMdd_HHmmss` (8 digit date + 6 digit time), e.g. AWS Level II keys
    DateTimeSeconds,
    /// `yyyyMMdd_HHmm` (8 digit date + 4 digit time), e.g. THREDDS Level II dataset names
    DateTimeMinutes,
}

impl TimeLayout {
    fn time_digits (&self)->usize {
        match self {
            TimeLayout::DateTimeSeconds => 6,
            TimeLayout::DateTimeMinutes => 4,
        }
    }

    fn parse_time (&self, s: &str)->Option<NaiveTime> {
        if_let! {
            true = s.len() == self.time_digits(),
            Ok(h) = s[0..2].parse::<u32>(),
            Ok(m) = s[2..4].parse::<u32>(),
            Ok(sec) = if s.len() == 6 { s[4..6].parse::<u32>() } else { Ok(0) } => {
                return NaiveTime::from_hms_opt(h, m, sec)
            }
        }
        None
    }
}

/// archive specific format of identifiers:
///
///     «prefix» «yyyyMMdd» _ «HHmm[ss]» «suffix» [«anything» if not anchored]
///
/// The prefix usually contains the station code (e.g. "KJAX" or "Level2_KJAX_"), which means an extractor
/// built from this format also rejects identifiers of other stations
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct IdentifierFormat {
    pub prefix: String,
    pub layout: TimeLayout,
    pub suffix: String,
    /// if set the suffix has to end the identifier
    pub anchored: bool,
}

impl IdentifierFormat {
    pub fn new (prefix: impl ToString, layout: TimeLayout, suffix: impl ToString, anchored: bool)->Self {
        IdentifierFormat { prefix: prefix.to_string(), layout, suffix: suffix.to_string(), anchored }
    }

    /// AWS `noaa-nexrad-level2` objects, e.g. `2024/09/01/KJAX/KJAX20240901_120435_V06`.
    /// Not anchored so that compressed variants (`.._V06.gz`) still match, `.._MDM` files don't
    pub fn aws_level2 (station: &str)->Self {
        IdentifierFormat::new( station.to_uppercase(), TimeLayout::DateTimeSeconds, "_V06", false)
    }

    /// THREDDS `nexrad/level2` datasets, e.g. `Level2_KJAX_20240901_1204.ar2v`
    pub fn thredds_level2 (station: &str)->Self {
        IdentifierFormat::new( format!("Level2_{}_", station.to_uppercase()), TimeLayout::DateTimeMinutes, ".ar2v", true)
    }
}

impl fmt::Display for IdentifierFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = match self.layout {
            TimeLayout::DateTimeSeconds => "yyyyMMdd_HHmmss",
            TimeLayout::DateTimeMinutes => "yyyyMMdd_HHmm",
        };
        write!(f, "{}{}{}{}", self.prefix, time, self.suffix, if self.anchored {""} else {"*"})
    }
}

/// the function that maps identifiers to their embedded timestamps. This is constructed once per archive
/// (and station) and is pure, i.e. it can be applied to any number of identifiers in any order
#[derive(Debug,Clone)]
pub struct TimestampExtractor {
    format: IdentifierFormat,
    re: Regex,
}

impl TimestampExtractor {
    pub fn new (format: IdentifierFormat)->Result<Self> {
        if format.prefix.is_empty() && format.suffix.is_empty() && !format.anchored {
            return Err( OdinNexradError::InvalidFormat( format!("{format} has neither prefix nor suffix")))
        }

        let pattern = format!( r"^{}(\d{{8}})_(\d{{{}}}){}{}",
            regex::escape( &format.prefix),
            format.layout.time_digits(),
            regex::escape( &format.suffix),
            if format.anchored { "$" } else { "" }
        );
        let re = Regex::new( &pattern)?;

        Ok( TimestampExtractor { format, re } )
    }

    pub fn format (&self)->&IdentifierFormat { &self.format }

    /// extract the timestamp from the last path element of `id` (so that both plain names and full S3 keys or
    /// urlPaths can be passed in). Returns `None` on any structural mismatch (wrong station, wrong length,
    /// non-numeric fields or invalid calendar values)
    pub fn extract (&self, id: &str)->Option<NaiveDateTime> {
        let name = key_basename(id);

        if_let! {
            Some(cap) = self.re.captures(name),
            Ok(date) = NaiveDate::parse_from_str( &cap[1], "%Y%m%d"),
            Some(time) = self.format.layout.parse_time( &cap[2]) => {
                return Some( NaiveDateTime::new( date, time))
            }
        }
        None
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
