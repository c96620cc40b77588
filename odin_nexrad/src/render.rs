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

//! static map rendering of sweeps

use std::path::{Path, PathBuf};
use ab_glyph::{FontVec, PxScale};
use geojson::GeoJson;
use image::{Rgba, RgbaImage};
use imageproc::{drawing::{draw_hollow_rect_mut, draw_line_segment_mut, draw_polygon_mut, draw_text_mut, text_size}, point::Point, rect::Rect};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use odin_common::fs::{ensure_parent_dir, filepath_contents};

use crate::{errors::{op_failed, Result}, sweep::SweepField};

/* #region map extent *******************************************************************************/

/// geographic display bounds in degrees
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct MapExtent {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl MapExtent {
    pub fn around (lat: f64, lon: f64, half_width_deg: f64)->Self {
        MapExtent { west: lon - half_width_deg, east: lon + half_width_deg, south: lat - half_width_deg, north: lat + half_width_deg }
    }

    pub fn width (&self)->f64 { self.east - self.west }
    pub fn height (&self)->f64 { self.north - self.south }

    /// plate carrée pixel coordinates of (lon,lat) in a `w` x `h` image of this extent
    pub fn to_pixel (&self, lon: f64, lat: f64, w: u32, h: u32)->(f64,f64) {
        ((lon - self.west) / self.width() * w as f64, (self.north - lat) / self.height() * h as f64)
    }
}

/* #endregion map extent */

/* #region color table ******************************************************************************/

/// a step color table. Each entry is the lower bound of the value interval it applies to, up to the next entry.
/// Values below the first entry or NaN have no color
#[derive(Debug,Clone,PartialEq)]
pub struct ColorTable {
    pub name: String,
    entries: Vec<(f64,Rgba<u8>)>,
}

impl ColorTable {
    /// entries have to be sorted by ascending values
    pub fn new (name: impl ToString, entries: Vec<(f64,Rgba<u8>)>)->Result<Self> {
        if entries.is_empty() { return Err( op_failed("empty color table")) }
        if entries.windows(2).any(|w| w[1].0 <= w[0].0) { return Err( op_failed("color table bounds not ascending")) }
        Ok( ColorTable { name: name.to_string(), entries } )
    }

    /// the NWS storm and clear air mode reflectivity table for [-30,80] dBZ. Clear air returns are
    /// shades of gray, precipitation the usual cyan/blue/green/yellow/red/magenta sequence
    pub fn nws_storm_clear_reflectivity ()->Self {
        let entries = vec![
            (-30.0, Rgba([ 96,  96,  96,  96])),
            (-25.0, Rgba([112, 112, 112, 112])),
            (-20.0, Rgba([128, 128, 128, 128])),
            (-15.0, Rgba([144, 144, 144, 144])),
            (-10.0, Rgba([160, 160, 160, 160])),
            ( -5.0, Rgba([176, 176, 176, 176])),
            (  0.0, Rgba([118, 118, 118, 200])),
            (  5.0, Rgba([100, 100, 100, 220])),
            ( 10.0, Rgba([ 75,  75,  75, 230])),
            ( 15.0, Rgba([  0, 236, 236, 255])),
            ( 20.0, Rgba([  1, 160, 246, 255])),
            ( 25.0, Rgba([  0,   0, 246, 255])),
            ( 30.0, Rgba([  0, 255,   0, 255])),
            ( 35.0, Rgba([  0, 200,   0, 255])),
            ( 40.0, Rgba([  0, 144,   0, 255])),
            ( 45.0, Rgba([255, 255,   0, 255])),
            ( 50.0, Rgba([231, 192,   0, 255])),
            ( 55.0, Rgba([255, 144,   0, 255])),
            ( 60.0, Rgba([255,   0,   0, 255])),
            ( 65.0, Rgba([214,   0,   0, 255])),
            ( 70.0, Rgba([192,   0,   0, 255])),
            ( 75.0, Rgba([255,   0, 255, 255])),
        ];
        ColorTable { name: "NWSStormClearReflectivity".to_string(), entries }
    }

    pub fn color_of (&self, v: f64)->Option<Rgba<u8>> {
        if v.is_nan() { return None }
        self.entries.iter().rev().find(|(lower,_)| v >= *lower).map(|(_,c)| *c)
    }
}

/// the opaque color we get for `c` on a white background
fn on_white (c: Rgba<u8>)->Rgba<u8> {
    let a = c[3] as u32;
    let blend = |x: u8| ((x as u32 * a + 255 * (255 - a)) / 255) as u8;
    Rgba([ blend(c[0]), blend(c[1]), blend(c[2]), 255])
}

/* #endregion color table */

/* #region plot model *******************************************************************************/

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub vmin: f64,
    pub vmax: f64,
    /// half width/height of the displayed extent around the station in degrees
    pub half_extent_deg: f64,
    pub width: u32,
    pub height: u32,
    /// TrueType font for titles and colorbar labels. Text is omitted if there is none
    pub font: Option<PathBuf>,
    /// GeoJSON files with (county, state etc.) boundaries that are drawn on top of the sweep, in order
    pub boundaries: Vec<PathBuf>,
    pub boundary_color: [u8;4],
}

impl Default for RenderConfig {
    fn default()->Self {
        RenderConfig {
            vmin: -30.0, vmax: 80.0, half_extent_deg: 2.0, width: 1000, height: 900, font: None,
            boundaries: Vec::new(), boundary_color: [64,64,64,255]
        }
    }
}

fn check_value_range (vmin: f64, vmax: f64)->Result<()> {
    if vmin < vmax { Ok(()) } else { Err( op_failed( format!("invalid value range [{vmin},{vmax}]"))) }
}

/* #region boundaries */

/// a polyline in (lon,lat) degrees
pub type Polyline = Vec<(f64,f64)>;

/// all line strings and polygon rings of a GeoJSON file. Points are ignored
pub fn load_boundaries (path: &Path)->Result<Vec<Polyline>> {
    let text = std::fs::read_to_string( path)?;
    let geojson: GeoJson = text.parse()?;

    let mut lines: Vec<Polyline> = Vec::new();
    match &geojson {
        GeoJson::FeatureCollection(fc) => {
            for f in &fc.features {
                if let Some(g) = &f.geometry { collect_lines( &g.value, &mut lines) }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(g) = &f.geometry { collect_lines( &g.value, &mut lines) }
        }
        GeoJson::Geometry(g) => collect_lines( &g.value, &mut lines)
    }

    debug!("{} boundary lines in {:?}", lines.len(), path);
    Ok(lines)
}

fn collect_lines (value: &geojson::Value, lines: &mut Vec<Polyline>) {
    use geojson::Value::*;
    match value {
        LineString(ls) => lines.push( polyline(ls)),
        MultiLineString(mls) => for ls in mls { lines.push( polyline(ls)) },
        Polygon(rings) => for r in rings { lines.push( polyline(r)) },
        MultiPolygon(polys) => for p in polys { for r in p { lines.push( polyline(r)) } },
        GeometryCollection(gs) => for g in gs { collect_lines( &g.value, lines) },
        _ => {}
    }
}

fn polyline (positions: &[Vec<f64>])->Polyline {
    positions.iter().filter(|p| p.len() >= 2).map(|p| (p[0], p[1])).collect()
}

/* #endregion boundaries */

/// all the input a renderer needs. `lon`/`lat` are either cell corner grids (one row and column
/// more than `values`) or cell center grids (same shape as `values`)
#[derive(Debug,Clone)]
pub struct MapPlot {
    pub lon: Array2<f64>,
    pub lat: Array2<f64>,
    pub values: Array2<f32>,
    pub value_range: (f64,f64),
    pub color_table: ColorTable,
    pub extent: MapExtent,
    pub title_left: String,
    pub title_right: String,
}

impl MapPlot {
    pub fn from_sweep (sweep: &SweepField, config: &RenderConfig)->Self {
        let grid = sweep.gate_corners();
        let valid = match &sweep.scan_start {
            Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => "unknown".to_string()
        };

        MapPlot {
            lon: grid.lon,
            lat: grid.lat,
            values: sweep.values.clone(),
            value_range: (config.vmin, config.vmax),
            color_table: ColorTable::nws_storm_clear_reflectivity(),
            extent: MapExtent::around( sweep.station_lat, sweep.station_lon, config.half_extent_deg),
            title_left: format!("{}: {}", sweep.instrument(), sweep.field_name),
            title_right: format!("Valid: {valid}"),
        }
    }

    /// number of (ray,gate) cells to draw
    fn cells (&self)->Result<(usize,usize)> {
        let (nr, ng) = self.values.dim();
        let grid_dim = self.lon.dim();
        if nr == 0 || ng == 0 {
            Ok( (0, 0) )
        } else if grid_dim != self.lat.dim() {
            Err( op_failed("lon and lat grids differ in shape"))
        } else if grid_dim == (nr+1, ng+1) {
            Ok( (nr, ng) )
        } else if grid_dim == (nr, ng) {
            Ok( (nr - 1, ng - 1) )
        } else {
            Err( op_failed( format!("grid shape {:?} does not match values {:?}", grid_dim, (nr,ng))))
        }
    }
}

/// the renderer abstraction. Returns the path of the produced image
pub trait Renderer {
    fn render (&self, plot: &MapPlot)->Result<PathBuf>;
}

/* #endregion plot model */

/* #region png renderer *****************************************************************************/

const MARGIN_LEFT: u32 = 20;
const MARGIN_TOP: u32 = 40;
const MARGIN_BOTTOM: u32 = 20;
const COLORBAR_GAP: u32 = 30;
const COLORBAR_WIDTH: u32 = 20;
const COLORBAR_LABELS: u32 = 50;

const BLACK: Rgba<u8> = Rgba([0,0,0,255]);
const WHITE: Rgba<u8> = Rgba([255,255,255,255]);

/// renders plate carrée maps into PNG files
pub struct PngRenderer {
    width: u32,
    height: u32,
    font: Option<FontVec>,
    boundaries: Vec<Polyline>,
    boundary_color: Rgba<u8>,
    output: PathBuf,
}

impl PngRenderer {
    pub fn new (config: &RenderConfig, output: impl AsRef<Path>)->Result<Self> {
        let font = match &config.font {
            Some(path) => Some( load_font( path)? ),
            None => None
        };
        let min_width = MARGIN_LEFT + COLORBAR_GAP + COLORBAR_WIDTH + COLORBAR_LABELS + 10;
        let min_height = MARGIN_TOP + MARGIN_BOTTOM + 10;
        if config.width < min_width || config.height < min_height {
            return Err( op_failed( format!("image size {}x{} too small", config.width, config.height)))
        }
        check_value_range( config.vmin, config.vmax)?;

        let mut boundaries = Vec::new();
        for path in &config.boundaries {
            boundaries.extend( load_boundaries( path)?);
        }

        Ok( PngRenderer {
            width: config.width,
            height: config.height,
            font,
            boundaries,
            boundary_color: Rgba(config.boundary_color),
            output: output.as_ref().to_path_buf()
        })
    }

    fn plot_rect (&self)->(u32,u32,u32,u32) {
        let w = self.width - MARGIN_LEFT - COLORBAR_GAP - COLORBAR_WIDTH - COLORBAR_LABELS;
        let h = self.height - MARGIN_TOP - MARGIN_BOTTOM;
        (MARGIN_LEFT, MARGIN_TOP, w, h)
    }

    fn draw_cells (&self, plot: &MapPlot, area: &mut RgbaImage)->Result<usize> {
        let (n_rays, n_gates) = plot.cells()?;
        let (w, h) = area.dimensions();
        let ext = &plot.extent;
        let (vmin, vmax) = plot.value_range;

        let to_px = |i: usize, j: usize| -> Point<i32> {
            let (x, y) = ext.to_pixel( plot.lon[[i,j]], plot.lat[[i,j]], w, h);
            Point::new( x.round() as i32, y.round() as i32)
        };

        let mut n = 0;
        for i in 0..n_rays {
            for j in 0..n_gates {
                let v = plot.values[[i,j]] as f64;
                if v.is_nan() || v < vmin { continue }

                let color = match plot.color_table.color_of( v.min(vmax)) {
                    Some(c) if c[3] > 0 => on_white(c),
                    _ => continue
                };

                let corners = [ to_px(i,j), to_px(i+1,j), to_px(i+1,j+1), to_px(i,j+1) ];
                if corners.iter().all(|p| p.x < 0) || corners.iter().all(|p| p.y < 0)
                   || corners.iter().all(|p| p.x >= w as i32) || corners.iter().all(|p| p.y >= h as i32) {
                    continue
                }

                fill_quad( area, &corners, color);
                n += 1;
            }
        }
        Ok(n)
    }

    fn draw_boundaries (&self, extent: &MapExtent, area: &mut RgbaImage)->usize {
        let (w, h) = area.dimensions();
        let (wf, hf) = (w as f64, h as f64);
        let mut n = 0;

        for line in &self.boundaries {
            let pts: Vec<(f64,f64)> = line.iter().map(|(lon,lat)| extent.to_pixel( *lon, *lat, w, h)).collect();
            for seg in pts.windows(2) {
                let ((x0,y0), (x1,y1)) = (seg[0], seg[1]);
                if (x0 < 0.0 && x1 < 0.0) || (y0 < 0.0 && y1 < 0.0) || (x0 >= wf && x1 >= wf) || (y0 >= hf && y1 >= hf) {
                    continue
                }
                draw_line_segment_mut( area, (x0 as f32, y0 as f32), (x1 as f32, y1 as f32), self.boundary_color);
                n += 1;
            }
        }
        n
    }

    fn draw_colorbar (&self, img: &mut RgbaImage, plot: &MapPlot) {
        let (px, py, pw, ph) = self.plot_rect();
        let x0 = px + pw + COLORBAR_GAP;
        let (vmin, vmax) = plot.value_range;

        for k in 0..ph {
            let v = vmax - (k as f64 + 0.5) / ph as f64 * (vmax - vmin);
            let color = plot.color_table.color_of(v).map(on_white).unwrap_or(WHITE);
            for x in x0..x0+COLORBAR_WIDTH {
                img.put_pixel( x, py + k, color);
            }
        }
        draw_hollow_rect_mut( img, Rect::at( x0 as i32, py as i32).of_size( COLORBAR_WIDTH, ph), BLACK);

        // ticks at multiples of 10
        let mut v = (vmin / 10.0).ceil() * 10.0;
        while v <= vmax {
            let y = py as f32 + ((vmax - v) / (vmax - vmin)) as f32 * ph as f32;
            let x1 = (x0 + COLORBAR_WIDTH) as f32;
            draw_line_segment_mut( img, (x1, y), (x1 + 5.0, y), BLACK);
            if let Some(font) = &self.font {
                let scale = PxScale::from(14.0);
                draw_text_mut( img, BLACK, x1 as i32 + 8, y as i32 - 7, scale, font, &format!("{v}"));
            }
            v += 10.0;
        }
    }

    fn draw_titles (&self, img: &mut RgbaImage, plot: &MapPlot) {
        if let Some(font) = &self.font {
            let (px, _, pw, _) = self.plot_rect();
            let scale = PxScale::from(20.0);
            let y = (MARGIN_TOP as i32 - 26).max(0);

            draw_text_mut( img, BLACK, px as i32, y, scale, font, &plot.title_left);

            let (tw, _) = text_size( scale, font, &plot.title_right);
            let x = (px + pw) as i32 - tw as i32;
            draw_text_mut( img, BLACK, x.max(px as i32), y, scale, font, &plot.title_right);
        }
    }
}

impl Renderer for PngRenderer {
    fn render (&self, plot: &MapPlot)->Result<PathBuf> {
        info!("rendering '{}' | '{}'", plot.title_left, plot.title_right);
        check_value_range( plot.value_range.0, plot.value_range.1)?;

        let mut img = RgbaImage::from_pixel( self.width, self.height, WHITE);
        let (px, py, pw, ph) = self.plot_rect();

        let mut area = RgbaImage::from_pixel( pw, ph, WHITE); // clips cells to the plot area
        let n = self.draw_cells( plot, &mut area)?;
        let m = self.draw_boundaries( &plot.extent, &mut area);
        debug!("{n} cells and {m} boundary segments drawn");
        image::imageops::replace( &mut img, &area, px as i64, py as i64);
        draw_hollow_rect_mut( &mut img, Rect::at( px as i32, py as i32).of_size( pw, ph), BLACK);

        self.draw_colorbar( &mut img, plot);
        self.draw_titles( &mut img, plot);

        ensure_parent_dir( &self.output)?;
        img.save( &self.output)?;
        info!("map saved to {:?}", self.output);

        Ok( self.output.clone() )
    }
}

pub fn load_font (path: &Path)->Result<FontVec> {
    if !path.is_file() {
        Err( op_failed( format!("font not found: {:?}", path)))
    } else {
        let data = filepath_contents( &path)?;
        Ok( FontVec::try_from_vec( data)? )
    }
}

/// fill a (possibly degenerate) quadrilateral. Small cells can collapse into less than 3 distinct pixels,
/// which we have to draw as single pixels since polygons need at least 3 distinct vertices
fn fill_quad (img: &mut RgbaImage, corners: &[Point<i32>; 4], color: Rgba<u8>) {
    let mut pts: Vec<Point<i32>> = Vec::with_capacity(4);
    for p in corners {
        if !pts.contains(p) { pts.push(*p) }
    }

    if pts.len() >= 3 {
        draw_polygon_mut( img, &pts, color);
    } else {
        let (w, h) = img.dimensions();
        for p in pts {
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < w && (p.y as u32) < h {
                img.put_pixel( p.x as u32, p.y as u32, color);
            }
        }
    }
}

/* #endregion png renderer */
