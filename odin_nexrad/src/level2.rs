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

//! sweeps of raw NEXRAD Level II archives ("AR2V..") as they are stored in the AWS bucket. The record
//! decompression and message decoding is done by the `nexrad-data` crate, we only map its scan model
//! into [`SweepField`]s

use std::collections::BTreeMap;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use nexrad_data::volume::File as Level2File;
use nexrad_model::data::MomentValue;
use odin_common::fs::filepath_contents;

use crate::{
    archive::VolumeSource,
    decode::SweepDecoder,
    errors::{decode_error, OdinNexradError, Result},
    sweep::SweepField,
};

/// length of the volume header that precedes the (compressed) LDM records
pub const VOLUME_HEADER_LEN: usize = 24;

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(default)]
pub struct Level2Config {
    /// station locations as (latitude, longitude) in degrees
    pub sites: BTreeMap<String,(f64,f64)>,
    /// range of the first reflectivity gate center in meters
    pub first_gate: f64,
    /// reflectivity gate spacing in meters
    pub gate_interval: f64,
}

impl Default for Level2Config {
    fn default()->Self {
        let sites = [
            ("KAMX", 25.6111, -80.4128),
            ("KBYX", 24.5975, -81.7031),
            ("KCLX", 32.6556, -81.0422),
            ("KEVX", 30.5644, -85.9214),
            ("KJAX", 30.4846, -81.7019),
            ("KJGX", 32.6755, -83.3511),
            ("KMLB", 28.1133, -80.6542),
            ("KTBW", 27.7055, -82.4018),
            ("KTLH", 30.3975, -84.3289),
            ("KVAX", 30.8903, -83.0019),
        ];
        Level2Config {
            sites: sites.iter().map(|(id,lat,lon)| (id.to_string(), (*lat,*lon))).collect(),
            first_gate: 2125.0,
            gate_interval: 250.0,
        }
    }
}

/// the volume header: "AR2V0006." version, 3 char extension number, volume date and time, station
#[derive(Debug,Clone,PartialEq)]
pub struct VolumeHeader {
    pub version: String,
    pub station: String,
    pub start: Option<NaiveDateTime>,
}

impl VolumeHeader {
    pub fn parse (data: &[u8])->Result<Self> {
        if data.len() < VOLUME_HEADER_LEN || !data.starts_with(b"AR2V") {
            return Err( OdinNexradError::UnsupportedFormat( "not a Level II archive".to_string()))
        }

        let version = String::from_utf8_lossy( &data[4..8]).to_string();
        let station = String::from_utf8_lossy( &data[20..24]).trim_matches(|c: char| c == '\0' || c.is_whitespace()).to_string();

        // modified julian date (day 1 is 1970-01-01) and milliseconds since midnight
        let days = u32::from_be_bytes( [data[12], data[13], data[14], data[15]]) as i64;
        let millis = u32::from_be_bytes( [data[16], data[17], data[18], data[19]]) as i64;
        let start = NaiveDate::from_ymd_opt(1970, 1, 1)
            .map(|d| d.and_time( chrono::NaiveTime::MIN))
            .and_then(|epoch| epoch.checked_add_signed( TimeDelta::days(days - 1) + TimeDelta::milliseconds(millis)))
            .filter(|_| days > 0);

        Ok( VolumeHeader { version, station, start } )
    }
}

/// decoder for local Level II archive files
#[derive(Debug,Clone,Default)]
pub struct Level2SweepDecoder {
    pub config: Level2Config,
}

impl Level2SweepDecoder {
    pub fn new (config: Level2Config)->Self {
        Level2SweepDecoder { config }
    }

    fn site_location (&self, station: &str)->Result<(f64,f64)> {
        self.config.sites.get( &station.to_uppercase()).copied()
            .ok_or_else(|| decode_error( format!("no location for station {station}, add it to the level2 sites config")))
    }
}

impl SweepDecoder for Level2SweepDecoder {
    fn decode (&self, source: &VolumeSource, sweep: usize)->Result<SweepField> {
        let path = source.local_path()
            .ok_or_else(|| OdinNexradError::UnsupportedFormat( format!("{source} is not a local Level II archive")))?;
        let data = filepath_contents( &path)?;

        let header = VolumeHeader::parse( &data)?;
        let (station_lat, station_lon) = self.site_location( &header.station)?;
        debug!("reading Level II {} volume of {} ({} bytes)", header.version, header.station, data.len());

        let scan = Level2File::new( data).scan().map_err(|e| decode_error( format!("invalid Level II volume: {e}")))?;
        let n_sweeps = scan.sweeps().len();
        let radials = scan.sweeps().get(sweep)
            .ok_or_else(|| decode_error( format!("sweep {sweep} out of range, volume has {n_sweeps} sweeps")))?
            .radials();

        let mut rays: Vec<(f64,Vec<f32>)> = Vec::with_capacity( radials.len());
        for radial in radials.iter() {
            if let Some(moment) = radial.reflectivity() {
                let values = moment.values().into_iter().map( |v| match v {
                    MomentValue::Value(x) => x,
                    _ => f32::NAN // below threshold or range folded
                }).collect();
                rays.push( (radial.azimuth_angle_degrees() as f64, values));
            }
        }
        if rays.is_empty() {
            return Err( decode_error( format!("sweep {sweep} has no reflectivity data")))
        }

        let scan_start = radials.iter()
            .map(|r| r.collection_timestamp())
            .min()
            .and_then( DateTime::<Utc>::from_timestamp_millis)
            .map(|t| t.naive_utc())
            .or( header.start);

        let (azimuths, values) = assemble_rays( rays);
        let ranges = (0..values.ncols()).map(|j| self.config.first_gate + j as f64 * self.config.gate_interval).collect();

        let sweep_field = SweepField {
            station_name: header.station,
            station_lat,
            station_lon,
            field_name: "reflectivity".to_string(),
            units: "dBZ".to_string(),
            scan_start,
            azimuths,
            ranges,
            values,
        };
        sweep_field.check_shape()?;

        info!("decoded sweep {} of {}: {} rays x {} gates of {}", sweep, sweep_field.instrument(),
              sweep_field.n_rays(), sweep_field.n_gates(), sweep_field.field_name);
        Ok( sweep_field )
    }
}

/// turn (azimuth, gate values) rays into a `[ray, gate]` array. Rays can have different gate counts,
/// shorter ones are padded with NaN
fn assemble_rays (rays: Vec<(f64,Vec<f32>)>)->(Vec<f64>, Array2<f32>) {
    let n_gates = rays.iter().map(|(_,v)| v.len()).max().unwrap_or(0);
    let mut values = Array2::from_elem( (rays.len(), n_gates), f32::NAN);
    let mut azimuths = Vec::with_capacity( rays.len());

    for (i, (az, ray)) in rays.into_iter().enumerate() {
        for (j, v) in ray.into_iter().enumerate() {
            values[[i,j]] = v;
        }
        azimuths.push(az);
    }
    (azimuths, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_header() {
        let mut data = b"AR2V0006.401".to_vec();
        data.extend( 19968u32.to_be_bytes()); // 2024-09-01
        data.extend( 43_475_000u32.to_be_bytes()); // 12:04:35
        data.extend( b"KJAX");

        let h = VolumeHeader::parse( &data).unwrap();
        assert_eq!( h.version, "0006");
        assert_eq!( h.station, "KJAX");
        assert_eq!( h.start.unwrap().to_string(), "2024-09-01 12:04:35");

        assert!( matches!( VolumeHeader::parse( b"CDF\x01"), Err(OdinNexradError::UnsupportedFormat(_))));
        assert!( VolumeHeader::parse( b"AR2V0006.401").is_err());
    }

    #[test]
    fn test_assemble_rays() {
        let (az, v) = assemble_rays( vec![ (0.5, vec![1.0, 2.0, 3.0]), (1.5, vec![4.0]) ]);
        assert_eq!( az, vec![0.5, 1.5]);
        assert_eq!( v.dim(), (2, 3));
        assert_eq!( v[[1,0]], 4.0);
        assert!( v[[1,2]].is_nan());
    }

    #[test]
    fn test_site_location() {
        let decoder = Level2SweepDecoder::default();
        assert_eq!( decoder.site_location("kjax").unwrap(), (30.4846, -81.7019));
        assert!( matches!( decoder.site_location("XXXX"), Err(OdinNexradError::DecodeError(_))));
    }

    #[test]
    fn test_remote_source_rejected() {
        let source = VolumeSource::Remote("https://thredds.ucar.edu/thredds/dodsC/x.ar2v".to_string());
        assert!( matches!( Level2SweepDecoder::default().decode( &source, 0), Err(OdinNexradError::UnsupportedFormat(_))));
    }
}
