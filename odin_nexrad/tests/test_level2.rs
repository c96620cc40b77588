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

//! decoding of a small synthetic Level II volume: one bzip2 compressed LDM record with a single 360 radial
//! elevation cut of message 31 radials (volume, elevation, radial and reflectivity data blocks)

use std::io::Write;
use bzip2::{write::BzEncoder, Compression};
use odin_nexrad::{Level2SweepDecoder, SweepDecoder, VolumeDecoder, VolumeSource};

const DAYS: u16 = 19968; // 2024-09-01 (day 1 is 1970-01-01)
const MILLIS: u32 = 43_475_000; // 12:04:35
const N_GATES: usize = 100;
const N_RADIALS: usize = 360;

fn be16 (buf: &mut Vec<u8>, v: u16) { buf.extend( v.to_be_bytes()) }
fn be32 (buf: &mut Vec<u8>, v: u32) { buf.extend( v.to_be_bytes()) }
fn bef32 (buf: &mut Vec<u8>, v: f32) { buf.extend( v.to_be_bytes()) }

/// raw reflectivity byte of gate `g`: below threshold close to the radar, 20 dBZ beyond
fn raw_ref (g: usize)->u8 {
    if g < 5 { 0 } else { (20.0 * 2.0 + 66.0) as u8 }
}

fn volume_block ()->Vec<u8> {
    let mut b = b"RVOL".to_vec();
    be16( &mut b, 44);
    b.extend( [1, 0]); // major, minor version
    bef32( &mut b, 30.4846);
    bef32( &mut b, -81.7019);
    be16( &mut b, 10); // site height
    be16( &mut b, 20); // feedhorn height
    for _ in 0..5 { bef32( &mut b, 0.0) } // calibration, tx power h/v, zdr, initial phase
    be16( &mut b, 215); // VCP
    be16( &mut b, 0);
    assert_eq!( b.len(), 44);
    b
}

fn elevation_block ()->Vec<u8> {
    let mut b = b"RELV".to_vec();
    be16( &mut b, 12);
    be16( &mut b, 0xFFF0); // atmospheric attenuation (-16)
    bef32( &mut b, 0.0);
    b
}

fn radial_block ()->Vec<u8> {
    let mut b = b"RRAD".to_vec();
    be16( &mut b, 28);
    be16( &mut b, 4660); // unambiguous range
    bef32( &mut b, -80.0);
    bef32( &mut b, -80.0);
    be16( &mut b, 2800); // nyquist velocity
    be16( &mut b, 0);
    bef32( &mut b, 0.0);
    bef32( &mut b, 0.0);
    b
}

fn reflectivity_block ()->Vec<u8> {
    let mut b = b"DREF".to_vec();
    be32( &mut b, 0);
    be16( &mut b, N_GATES as u16);
    be16( &mut b, 2125); // first gate range
    be16( &mut b, 250); // gate interval
    be16( &mut b, 100); // tover
    be16( &mut b, 16); // snr threshold
    b.push(0); // control flags
    b.push(8); // data word size
    bef32( &mut b, 2.0); // scale
    bef32( &mut b, 66.0); // offset
    b.extend( (0..N_GATES).map(raw_ref));
    b
}

/// the complete message 31 segment including the 12 byte CTM prefix and the 16 byte message header
fn radial_message (i: usize)->Vec<u8> {
    let blocks = [ volume_block(), elevation_block(), radial_block(), reflectivity_block() ];
    let header_len = 32 + 4 * blocks.len();

    let mut body = b"KJAX".to_vec();
    be32( &mut body, MILLIS + i as u32 * 40);
    be16( &mut body, DAYS);
    be16( &mut body, i as u16 + 1); // azimuth number
    bef32( &mut body, i as f32 + 0.5);
    body.push(0); // uncompressed
    body.push(0);
    let radial_len = header_len + blocks.iter().map(|b| b.len()).sum::<usize>();
    be16( &mut body, radial_len as u16);
    body.push(2); // 1 deg azimuth spacing
    body.push( if i == 0 { 3 } else if i == N_RADIALS-1 { 4 } else { 1 }); // radial status
    body.push(1); // elevation number
    body.push(0); // cut sector
    bef32( &mut body, 0.48);
    body.push(0);
    body.push(0);
    be16( &mut body, blocks.len() as u16);

    let mut ptr = header_len;
    for b in &blocks {
        be32( &mut body, ptr as u32);
        ptr += b.len();
    }
    assert_eq!( body.len(), header_len);
    for b in &blocks { body.extend(b) }

    let mut msg = vec![0u8; 12];
    be16( &mut msg, ((16 + body.len()) / 2) as u16); // size in halfwords
    msg.push(8); // redundant channel
    msg.push(31);
    be16( &mut msg, i as u16);
    be16( &mut msg, DAYS);
    be32( &mut msg, MILLIS);
    be16( &mut msg, 1);
    be16( &mut msg, 1);
    msg.extend( body);
    msg
}

fn level2_volume ()->Vec<u8> {
    let mut data = b"AR2V0006.001".to_vec();
    be32( &mut data, DAYS as u32);
    be32( &mut data, MILLIS);
    data.extend( b"KJAX");

    let mut encoder = BzEncoder::new( Vec::new(), Compression::default());
    for i in 0..N_RADIALS {
        encoder.write_all( &radial_message(i)).unwrap();
    }
    let record = encoder.finish().unwrap();

    be32( &mut data, record.len() as u32);
    data.extend( record);
    data
}

fn level2_source ()->VolumeSource {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all( &level2_volume()).unwrap();
    VolumeSource::Local(file)
}

#[test]
fn test_decode_level2_sweep() {
    let source = level2_source();
    let sweep = Level2SweepDecoder::default().decode( &source, 0).unwrap();

    assert_eq!( sweep.station_name, "KJAX");
    assert_eq!( (sweep.station_lat, sweep.station_lon), (30.4846, -81.7019));
    assert_eq!( sweep.n_rays(), N_RADIALS);
    assert_eq!( sweep.n_gates(), N_GATES);
    assert_eq!( sweep.scan_start.unwrap().to_string(), "2024-09-01 12:04:35");
    assert!( (sweep.azimuths[90] - 90.5).abs() < 1e-3);
    assert_eq!( sweep.ranges[0], 2125.0);
    assert_eq!( sweep.ranges[1], 2375.0);

    assert!( sweep.values[[0,0]].is_nan());
    assert!( (sweep.values[[0,10]] - 20.0).abs() < 1e-3);
    assert_eq!( sweep.value_stats().n, N_RADIALS * (N_GATES - 5));
}

#[test]
fn test_volume_decoder_dispatch() {
    let source = level2_source();
    let sweep = VolumeDecoder::default().decode( &source, 0).unwrap();
    assert_eq!( sweep.field_name, "reflectivity");
    assert_eq!( sweep.units, "dBZ");

    assert!( VolumeDecoder::default().decode( &source, 3).is_err()); // there is only one sweep
}
