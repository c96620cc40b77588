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

//! decoded sweep data and its geographic placement

use chrono::NaiveDateTime;
use geo::{Destination, Haversine, Point};
use ndarray::Array2;
use odin_common::MinMaxAvg;

use crate::errors::{decode_error, Result};

/// one elevation scan of a single field (e.g. reflectivity). Values are indexed as `[ray, gate]` and
/// missing data is represented as NaN
#[derive(Debug,Clone)]
pub struct SweepField {
    pub station_name: String,
    pub station_lat: f64,
    pub station_lon: f64,
    pub field_name: String,
    pub units: String,
    pub scan_start: Option<NaiveDateTime>,

    /// ray azimuths in degrees clockwise from north
    pub azimuths: Vec<f64>,
    /// gate center distances from the radar in meters
    pub ranges: Vec<f64>,
    pub values: Array2<f32>,
}

/// geographic coordinates of all gates of a sweep, with the same `[ray, gate]` shape as the values
#[derive(Debug,Clone)]
pub struct GateGrid {
    pub lon: Array2<f64>,
    pub lat: Array2<f64>,
}

impl SweepField {
    pub fn check_shape (&self)->Result<()> {
        let (n_rays, n_gates) = self.values.dim();
        if n_rays != self.azimuths.len() || n_gates != self.ranges.len() {
            Err( decode_error( format!("{} values have shape {:?} but there are {} azimuths and {} ranges",
                 self.field_name, self.values.dim(), self.azimuths.len(), self.ranges.len())))
        } else {
            Ok(())
        }
    }

    pub fn n_rays (&self)->usize { self.azimuths.len() }
    pub fn n_gates (&self)->usize { self.ranges.len() }

    /// place all gate centers on the sphere. This is the great circle destination for the ray azimuth and
    /// gate range, starting at the station. Beam height and refraction are not taken into account
    pub fn gate_grid (&self)->GateGrid {
        self.place( &self.azimuths, &self.ranges)
    }

    /// the corners of all gate cells, i.e. a grid with one more row and column than the values. Cell
    /// boundaries are the midpoints between neighboring azimuths and ranges
    pub fn gate_corners (&self)->GateGrid {
        self.place( &azimuth_edges( &self.azimuths), &range_edges( &self.ranges))
    }

    fn place (&self, azimuths: &[f64], ranges: &[f64])->GateGrid {
        let origin = Point::new( self.station_lon, self.station_lat);
        let shape = (azimuths.len(), ranges.len());
        let mut lon = Array2::<f64>::zeros(shape);
        let mut lat = Array2::<f64>::zeros(shape);

        for (i,az) in azimuths.iter().enumerate() {
            for (j,r) in ranges.iter().enumerate() {
                let p = if *r > 0.0 { Haversine.destination( origin, *az, *r) } else { origin };
                lon[[i,j]] = p.x();
                lat[[i,j]] = p.y();
            }
        }

        GateGrid { lon, lat }
    }

    pub fn value_stats (&self)->MinMaxAvg {
        let mut stats = MinMaxAvg::new();
        for v in self.values.iter() {
            stats.add( *v as f64);
        }
        stats
    }

    /// the display name of the instrument, which is the station name if we have one
    pub fn instrument (&self)->&str {
        if self.station_name.is_empty() { "radar" } else { &self.station_name }
    }
}

// signed smallest angle from a to b in degrees
fn angle_diff (a: f64, b: f64)->f64 {
    (b - a + 540.0).rem_euclid(360.0) - 180.0
}

fn azimuth_edges (az: &[f64])->Vec<f64> {
    match az.len() {
        0 => Vec::new(),
        1 => vec![ az[0] - 0.5, az[0] + 0.5 ],
        n => {
            let mut edges = Vec::with_capacity(n+1);
            edges.push( az[0] - angle_diff( az[0], az[1]) / 2.0);
            for k in 1..n {
                edges.push( az[k-1] + angle_diff( az[k-1], az[k]) / 2.0);
            }
            edges.push( az[n-1] + angle_diff( az[n-2], az[n-1]) / 2.0);
            edges
        }
    }
}

fn range_edges (r: &[f64])->Vec<f64> {
    match r.len() {
        0 => Vec::new(),
        1 => vec![ r[0], r[0] ],
        n => {
            let mut edges = Vec::with_capacity(n+1);
            edges.push( (r[0] - (r[1] - r[0]) / 2.0).max(0.0));
            for k in 1..n {
                edges.push( (r[k-1] + r[k]) / 2.0);
            }
            edges.push( r[n-1] + (r[n-1] - r[n-2]) / 2.0);
            edges
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sweep()->SweepField {
        SweepField {
            station_name: "KJAX".to_string(),
            station_lat: 30.4846,
            station_lon: -81.7019,
            field_name: "Reflectivity".to_string(),
            units: "dBZ".to_string(),
            scan_start: None,
            azimuths: vec![0.0, 90.0],
            ranges: vec![0.0, 100_000.0],
            values: array![[f32::NAN, 10.0], [20.0, 30.0]],
        }
    }

    #[test]
    fn test_gate_grid() {
        let s = sweep();
        s.check_shape().unwrap();
        let g = s.gate_grid();

        // range 0 is the station itself
        assert_eq!( g.lat[[0,0]], s.station_lat);
        assert_eq!( g.lon[[1,0]], s.station_lon);

        // azimuth 0 goes north: ~0.9° of latitude per 100km, same longitude
        assert!( (g.lat[[0,1]] - s.station_lat - 0.899).abs() < 0.01);
        assert!( (g.lon[[0,1]] - s.station_lon).abs() < 1e-6);

        // azimuth 90 goes east: more than 0.9° of longitude at 30°N, latitude almost unchanged
        assert!( g.lon[[1,1]] - s.station_lon > 1.0);
        assert!( (g.lat[[1,1]] - s.station_lat).abs() < 0.05);
    }

    #[test]
    fn test_edges() {
        assert_eq!( azimuth_edges( &[359.0, 1.0, 3.0]), vec![358.0, 360.0, 2.0, 4.0]);
        assert_eq!( range_edges( &[1000.0, 2000.0, 3000.0]), vec![500.0, 1500.0, 2500.0, 3500.0]);

        let g = sweep().gate_corners();
        assert_eq!( g.lon.dim(), (3,3));
    }

    #[test]
    fn test_stats() {
        let stats = sweep().value_stats();
        assert_eq!( stats.n, 3);
        assert_eq!( stats.min, 10.0);
        assert_eq!( stats.max, 30.0);
        assert_eq!( stats.avg, 20.0);
    }

    #[test]
    fn test_bad_shape() {
        let mut s = sweep();
        s.ranges.push( 200_000.0);
        assert!( s.check_shape().is_err());
    }
}
