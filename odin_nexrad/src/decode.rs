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

//! decoding of single sweeps from radar volumes. Local files are dispatched on their format, netCDF
//! representations are either local CF/Radial files or remote (OPeNDAP) datasets of THREDDS servers

use std::path::Path;
use ndarray::Array2;
use netcdf::{AttributeValue, File, Variable};
use tracing::{debug, info};
use odin_common::{datetime::parse_iso_utc_suffix, fs::file_prefix};

use crate::{
    archive::VolumeSource,
    errors::{decode_error, OdinNexradError, Result},
    level2::{Level2Config, Level2SweepDecoder},
    sweep::SweepField,
};

/// the radar decoder abstraction, which turns a fetched volume into the field values of one sweep
pub trait SweepDecoder {
    fn decode (&self, source: &VolumeSource, sweep: usize)->Result<SweepField>;
}

/// the known layouts of volume files
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum VolumeFormat {
    NetCdf,
    Hdf5,
    /// raw NEXRAD Level II archive ("AR2V0006..")
    Level2Archive,
    Unknown,
}

/// guess the volume format from the first bytes of a file
pub fn detect_volume_format (magic: &[u8])->VolumeFormat {
    if magic.starts_with(b"CDF") {
        VolumeFormat::NetCdf
    } else if magic.starts_with(b"\x89HDF") {
        VolumeFormat::Hdf5
    } else if magic.starts_with(b"AR2V") {
        VolumeFormat::Level2Archive
    } else {
        VolumeFormat::Unknown
    }
}

pub fn local_volume_format (path: &Path)->Result<VolumeFormat> {
    let magic = file_prefix( &path, 8)?;
    Ok( detect_volume_format( &magic) )
}

pub fn check_local_volume (path: &Path)->Result<()> {
    match local_volume_format( path)? {
        VolumeFormat::NetCdf | VolumeFormat::Hdf5 => Ok(()),
        VolumeFormat::Level2Archive => Err( OdinNexradError::UnsupportedFormat( format!("{:?} is a raw Level II archive", path))),
        VolumeFormat::Unknown => Err( OdinNexradError::UnsupportedFormat( format!("{:?} is not a netCDF file", path))),
    }
}

/// the decoder for volumes of any supported format. Local files are dispatched on their magic bytes,
/// remote volumes are always netCDF (OPeNDAP)
#[derive(Debug,Clone,Default)]
pub struct VolumeDecoder {
    pub netcdf: NetcdfSweepDecoder,
    pub level2: Level2SweepDecoder,
}

impl VolumeDecoder {
    pub fn new (level2: Level2Config)->Self {
        VolumeDecoder { netcdf: NetcdfSweepDecoder::default(), level2: Level2SweepDecoder::new( level2) }
    }
}

impl SweepDecoder for VolumeDecoder {
    fn decode (&self, source: &VolumeSource, sweep: usize)->Result<SweepField> {
        let format = match source.local_path() {
            Some(path) => local_volume_format( path)?,
            None => VolumeFormat::NetCdf
        };
        debug!("{source} has format {format:?}");

        match format {
            VolumeFormat::Level2Archive => self.level2.decode( source, sweep),
            _ => self.netcdf.decode( source, sweep)
        }
    }
}

/// decoder for netCDF volumes. The field is the first variable of `field_names` that exists in the volume
#[derive(Debug,Clone)]
pub struct NetcdfSweepDecoder {
    pub field_names: Vec<String>,
}

impl Default for NetcdfSweepDecoder {
    fn default()->Self {
        let field_names = ["Reflectivity_HI", "Reflectivity", "DBZ", "DBZH", "REF", "reflectivity"];
        NetcdfSweepDecoder { field_names: field_names.iter().map(|s| s.to_string()).collect() }
    }
}

impl SweepDecoder for NetcdfSweepDecoder {
    fn decode (&self, source: &VolumeSource, sweep: usize)->Result<SweepField> {
        if let Some(path) = source.local_path() {
            check_local_volume( path)?;
        }

        let location = source.location();
        debug!("opening {location}");
        let file = netcdf::open( &location)?;

        let sweep_field = if file.variable("sweep_start_ray_index").is_some() {
            self.decode_cfradial( &file, sweep)?
        } else {
            self.decode_thredds( &file, sweep)?
        };
        sweep_field.check_shape()?;

        info!("decoded sweep {} of {}: {} rays x {} gates of {}", sweep, sweep_field.instrument(),
              sweep_field.n_rays(), sweep_field.n_gates(), sweep_field.field_name);
        Ok(sweep_field)
    }
}

impl NetcdfSweepDecoder {
    fn field_variable<'f> (&self, file: &'f File)->Result<Variable<'f>> {
        self.field_names.iter()
            .find_map( |name| file.variable(name))
            .ok_or_else( || decode_error( format!("none of the fields {:?} found", self.field_names)))
    }

    /// THREDDS Level II datasets: field[scan,radial,gate] with azimuth[scan,radial] and distance[gate]
    /// coordinate variables that share the field's resolution suffix (e.g. `Reflectivity_HI`, `azimuthR_HI`)
    fn decode_thredds (&self, file: &File, sweep: usize)->Result<SweepField> {
        let var = self.field_variable( file)?;
        let field_name = var.name();
        let shape = var_shape( &var);
        if shape.len() != 3 {
            return Err( decode_error( format!("{field_name} has {} dimensions, expected 3", shape.len())))
        }
        let (n_scans, n_radials, n_gates) = (shape[0], shape[1], shape[2]);
        if sweep >= n_scans {
            return Err( decode_error( format!("sweep {sweep} out of range, volume has {n_scans} sweeps")))
        }

        let suffix = field_name.find('_').map(|i| &field_name[i..]).unwrap_or("");
        let azimuths = read_f64( file, &format!("azimuthR{suffix}"))?;
        let ranges = read_f64( file, &format!("distanceR{suffix}"))?;
        if azimuths.len() != n_scans * n_radials || ranges.len() != n_gates {
            return Err( decode_error( format!("coordinate variables don't match {field_name} shape {shape:?}")))
        }

        let values = read_unpacked( &var)?;
        let n = n_radials * n_gates;
        let values = Array2::from_shape_vec( (n_radials, n_gates), values[sweep*n .. (sweep+1)*n].to_vec())
            .map_err(|e| decode_error(e))?;
        let azimuths = azimuths[sweep*n_radials .. (sweep+1)*n_radials].to_vec();

        let (azimuths, values) = drop_invalid_rays( azimuths, values);

        Ok( SweepField {
            station_name: global_str( file, "Station").unwrap_or_default(),
            station_lat: global_f64( file, "StationLatitude").ok_or_else(|| decode_error("no StationLatitude"))?,
            station_lon: global_f64( file, "StationLongitude").ok_or_else(|| decode_error("no StationLongitude"))?,
            field_name,
            units: var_str( &var, "units").unwrap_or_default(),
            scan_start: global_str( file, "time_coverage_start").and_then(|s| parse_iso_utc_suffix(&s)),
            azimuths,
            ranges,
            values,
        })
    }

    /// CF/Radial volumes: field[time,range] where the rays of sweep i are
    /// `sweep_start_ray_index[i] ..= sweep_end_ray_index[i]`
    fn decode_cfradial (&self, file: &File, sweep: usize)->Result<SweepField> {
        let var = self.field_variable( file)?;
        let field_name = var.name();
        let shape = var_shape( &var);
        if shape.len() != 2 {
            return Err( decode_error( format!("{field_name} has {} dimensions, expected 2", shape.len())))
        }
        let n_gates = shape[1];

        let starts = read_f64( file, "sweep_start_ray_index")?;
        let ends = read_f64( file, "sweep_end_ray_index")?;
        if sweep >= starts.len() || sweep >= ends.len() {
            return Err( decode_error( format!("sweep {sweep} out of range, volume has {} sweeps", starts.len())))
        }
        let (i0, i1) = (starts[sweep] as usize, ends[sweep] as usize + 1);
        if i1 <= i0 || i1 > shape[0] {
            return Err( decode_error( format!("invalid ray range {i0}..{i1} of sweep {sweep}")))
        }

        let azimuths = read_f64( file, "azimuth")?;
        let ranges = read_f64( file, "range")?;
        if azimuths.len() != shape[0] || ranges.len() != n_gates {
            return Err( decode_error( format!("coordinate variables don't match {field_name} shape {shape:?}")))
        }

        let values = read_unpacked( &var)?;
        let values = Array2::from_shape_vec( (i1-i0, n_gates), values[i0*n_gates .. i1*n_gates].to_vec())
            .map_err(|e| decode_error(e))?;
        let azimuths = azimuths[i0..i1].to_vec();

        let station_lat = read_f64( file, "latitude")?.first().copied().ok_or_else(|| decode_error("empty latitude"))?;
        let station_lon = read_f64( file, "longitude")?.first().copied().ok_or_else(|| decode_error("empty longitude"))?;

        let scan_start = global_str( file, "time_coverage_start")
            .and_then(|s| parse_iso_utc_suffix(&s))
            .or_else(|| ray_time( file, i0));

        let (azimuths, values) = drop_invalid_rays( azimuths, values);

        Ok( SweepField {
            station_name: global_str( file, "instrument_name").unwrap_or_default(),
            station_lat,
            station_lon,
            field_name,
            units: var_str( &var, "units").unwrap_or_default(),
            scan_start,
            azimuths,
            ranges,
            values,
        })
    }
}

// the CF `time` variable holds seconds relative to its units epoch
fn ray_time (file: &File, ray: usize)->Option<chrono::NaiveDateTime> {
    let var = file.variable("time")?;
    let base = var_str( &var, "units").and_then(|s| parse_iso_utc_suffix(&s))?;
    let secs = var.get_values::<f64,_>(..).ok()?.get(ray).copied()?;
    Some( base + chrono::TimeDelta::milliseconds( (secs * 1000.0) as i64))
}

/// remove rays without a valid azimuth (THREDDS pads scans that have fewer radials than the dimension)
fn drop_invalid_rays (azimuths: Vec<f64>, values: Array2<f32>)->(Vec<f64>, Array2<f32>) {
    if azimuths.iter().all(|a| a.is_finite()) {
        return (azimuths, values)
    }

    let keep: Vec<usize> = azimuths.iter().enumerate().filter(|(_,a)| a.is_finite()).map(|(i,_)| i).collect();
    let values = values.select( ndarray::Axis(0), &keep);
    let azimuths = keep.iter().map(|i| azimuths[*i]).collect();
    (azimuths, values)
}

/* #region variable and attribute access ***********************************************************/

fn var_shape (var: &Variable)->Vec<usize> {
    var.dimensions().iter().map(|d| d.len()).collect()
}

fn read_f64 (file: &File, name: &str)->Result<Vec<f64>> {
    let var = file.variable(name).ok_or_else(|| decode_error( format!("no variable {name}")))?;
    Ok( var.get_values::<f64,_>(..)? )
}

/// read all values of a packed variable, applying `_Unsigned`, `scale_factor` and `add_offset`.
/// Values that match `_FillValue` or `missing_value` are returned as NaN
fn read_unpacked (var: &Variable)->Result<Vec<f32>> {
    let unsigned = var_str( var, "_Unsigned").map(|s| s.eq_ignore_ascii_case("true")).unwrap_or(false);

    let (raw, wrap) = if unsigned {
        match var.get_values::<u8,_>(..) {
            Ok(bytes) => (bytes.into_iter().map(|b| b as f64).collect(), Some(256.0)),
            Err(_) => (var.get_values::<f64,_>(..)?, Some(65536.0)) // 16 bit
        }
    } else {
        (var.get_values::<f64,_>(..)?, None)
    };

    let mut missing = var_f64s( var, "_FillValue");
    missing.extend( var_f64s( var, "missing_value"));

    let scale = var_f64s( var, "scale_factor").first().copied().unwrap_or(1.0);
    let offset = var_f64s( var, "add_offset").first().copied().unwrap_or(0.0);

    Ok( unpack( raw, missing, wrap, scale, offset) )
}

/// `wrap` is the value range of unsigned data that was stored in signed types, negative raw and
/// missing values are shifted by it
fn unpack (raw: Vec<f64>, mut missing: Vec<f64>, wrap: Option<f64>, scale: f64, offset: f64)->Vec<f32> {
    let unwrap = |v: f64| match wrap {
        Some(w) if v < 0.0 => v + w,
        _ => v
    };
    for m in missing.iter_mut() { *m = unwrap(*m) }

    raw.into_iter().map( |v| {
        let v = unwrap(v);
        if v.is_nan() || missing.contains(&v) { f32::NAN } else { (v * scale + offset) as f32 }
    }).collect()
}

#[allow(unreachable_patterns)]
fn attr_f64s (v: AttributeValue)->Vec<f64> {
    match v {
        AttributeValue::Uchar(x) => vec![x as f64],
        AttributeValue::Uchars(x) => x.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Schar(x) => vec![x as f64],
        AttributeValue::Schars(x) => x.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Ushort(x) => vec![x as f64],
        AttributeValue::Ushorts(x) => x.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Short(x) => vec![x as f64],
        AttributeValue::Shorts(x) => x.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Uint(x) => vec![x as f64],
        AttributeValue::Uints(x) => x.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Int(x) => vec![x as f64],
        AttributeValue::Ints(x) => x.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Ulonglong(x) => vec![x as f64],
        AttributeValue::Ulonglongs(x) => x.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Longlong(x) => vec![x as f64],
        AttributeValue::Longlongs(x) => x.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Float(x) => vec![x as f64],
        AttributeValue::Floats(x) => x.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Double(x) => vec![x],
        AttributeValue::Doubles(x) => x,
        AttributeValue::Str(s) => s.trim().parse::<f64>().into_iter().collect(),
        AttributeValue::Strs(v) => v.iter().filter_map(|s| s.trim().parse::<f64>().ok()).collect(),
        _ => Vec::new()
    }
}

fn attr_str (v: AttributeValue)->Option<String> {
    match v {
        AttributeValue::Str(s) => Some(s),
        AttributeValue::Strs(v) => v.into_iter().next(),
        _ => None
    }
}

fn var_f64s (var: &Variable, name: &str)->Vec<f64> {
    var.attribute_value(name).and_then(|r| r.ok()).map(attr_f64s).unwrap_or_default()
}

fn var_str (var: &Variable, name: &str)->Option<String> {
    var.attribute_value(name).and_then(|r| r.ok()).and_then(attr_str)
}

fn global_f64 (file: &File, name: &str)->Option<f64> {
    file.attribute(name).and_then(|a| a.value().ok()).map(attr_f64s).and_then(|v| v.first().copied())
}

fn global_str (file: &File, name: &str)->Option<String> {
    file.attribute(name).and_then(|a| a.value().ok()).and_then(attr_str)
}

/* #endregion variable and attribute access */

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use ndarray::array;

    #[test]
    fn test_detect_format() {
        assert_eq!( detect_volume_format(b"AR2V0006.123"), VolumeFormat::Level2Archive);
        assert_eq!( detect_volume_format(b"CDF\x01...."), VolumeFormat::NetCdf);
        assert_eq!( detect_volume_format(b"\x89HDF\r\n\x1a\n"), VolumeFormat::Hdf5);
        assert_eq!( detect_volume_format(b""), VolumeFormat::Unknown);
    }

    #[test]
    fn test_level2_dispatch() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"AR2V0006.401\x00\x00\x4e\x00\x02\x97\x5e\x38XXXX").unwrap();
        let source = VolumeSource::Local(file);

        // the netCDF decoder does not read Level II archives
        match NetcdfSweepDecoder::default().decode( &source, 0) {
            Err(OdinNexradError::UnsupportedFormat(_)) => {}
            other => panic!("unexpected decode result {other:?}")
        }

        // the volume decoder hands it to the Level II decoder, which knows the format but not the station
        match VolumeDecoder::default().decode( &source, 0) {
            Err(OdinNexradError::DecodeError(msg)) => assert!( msg.contains("XXXX")),
            other => panic!("unexpected decode result {other:?}")
        }
    }

    #[test]
    fn test_unpack() {
        // 8 bit unsigned data stored as signed bytes
        let v = unpack( vec![-1.0, -56.0, 2.0], vec![-1.0], Some(256.0), 0.5, -33.0);
        assert!( v[0].is_nan());
        assert_eq!( v[1], 67.0);
        assert_eq!( v[2], -32.0);

        // 16 bit unsigned data
        let v = unpack( vec![-1.0, 65535.0, 100.0], vec![-1.0], Some(65536.0), 0.01, 0.0);
        assert!( v[0].is_nan());
        assert!( v[1].is_nan());
        assert_eq!( v[2], 1.0);

        // signed data is not shifted
        let v = unpack( vec![-1.0, f64::NAN], vec![-9999.0], None, 1.0, 0.0);
        assert_eq!( v[0], -1.0);
        assert!( v[1].is_nan());
    }

    #[test]
    fn test_drop_invalid_rays() {
        let (az, v) = drop_invalid_rays( vec![0.0, f64::NAN, 1.0], array![[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        assert_eq!( az, vec![0.0, 1.0]);
        assert_eq!( v, array![[1.0f32, 2.0], [5.0, 6.0]]);
    }

    #[test]
    fn test_attr_values() {
        assert_eq!( attr_f64s( AttributeValue::Schars(vec![0, 1])), vec![0.0, 1.0]);
        assert_eq!( attr_f64s( AttributeValue::Str("-33.0".to_string())), vec![-33.0]);
        assert_eq!( attr_str( AttributeValue::Str("KJAX".to_string())), Some("KJAX".to_string()));
        assert_eq!( attr_str( AttributeValue::Double(1.0)), None);
    }
}
