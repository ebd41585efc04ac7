//! Native GeoTIFF reading/writing (without GDAL dependency)
//!
//! Uses the `tiff` crate. Supports single- and multi-band (chunky) images,
//! the ModelPixelScale/ModelTiepoint georeference, the EPSG code from the
//! GeoKey directory and the `GDAL_NODATA` tag. Floating point rasters are
//! written as 32-bit float, integer rasters as 32-bit signed integer.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::{ensure_writable, GeoTiffOptions};
use crate::raster::{BandStack, GeoTransform, Raster, RasterElement};
use ndarray::Array3;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{ColorType, Gray32Float, GrayI32};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::{PhotometricInterpretation, PlanarConfiguration, SampleFormat, Tag};

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;
const KEY_USER_DEFINED: u16 = 32767;

/// Read one band (1-based, default 1) of a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    read_bands(path)?.band(band.unwrap_or(1))
}

/// Read every band of a GeoTIFF file
pub fn read_bands<T, P>(path: P) -> Result<BandStack<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

fn tiff_err(context: &str) -> impl Fn(tiff::TiffError) -> Error + '_ {
    move |e| Error::Other(format!("{}: {}", context, e))
}

macro_rules! cast_samples {
    ($buf:expr) => {
        $buf.into_iter()
            .map(|v| num_traits::cast(v).unwrap_or(T::default_nodata()))
            .collect::<Vec<T>>()
    };
}

/// Decode a GeoTIFF from any `Read + Seek` source
fn decode_geotiff<T, R>(reader: R) -> Result<BandStack<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader).map_err(tiff_err("TIFF decode error"))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(tiff_err("Cannot read dimensions"))?;
    let rows = height as usize;
    let cols = width as usize;

    let planar = decoder
        .find_tag_unsigned::<u16>(Tag::PlanarConfiguration)
        .map_err(tiff_err("Cannot read planar configuration"))?;
    if planar.and_then(PlanarConfiguration::from_u16) == Some(PlanarConfiguration::Planar) {
        return Err(Error::UnsupportedDataType(
            "planar (band-sequential) TIFF layout".to_string(),
        ));
    }

    let result = decoder
        .read_image()
        .map_err(tiff_err("Cannot read image data"))?;

    let data: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_samples!(buf),
        DecodingResult::F64(buf) => cast_samples!(buf),
        DecodingResult::U8(buf) => cast_samples!(buf),
        DecodingResult::U16(buf) => cast_samples!(buf),
        DecodingResult::U32(buf) => cast_samples!(buf),
        DecodingResult::I8(buf) => cast_samples!(buf),
        DecodingResult::I16(buf) => cast_samples!(buf),
        DecodingResult::I32(buf) => cast_samples!(buf),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    let cells = rows * cols;
    if cells == 0 || data.len() % cells != 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    let samples = data.len() / cells;

    // Chunky layout is pixel-interleaved: (row, col, band)
    let interleaved = Array3::from_shape_vec((rows, cols, samples), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    let planes = interleaved
        .permuted_axes([2, 0, 1])
        .as_standard_layout()
        .into_owned();

    let mut stack = BandStack::from_array(planes);

    let scale = decoder.get_tag_f64_vec(Tag::Unknown(TAG_MODEL_PIXEL_SCALE)).ok();
    let tiepoint = decoder.get_tag_f64_vec(Tag::Unknown(TAG_MODEL_TIEPOINT)).ok();
    if let (Some(scale), Some(tiepoint)) = (scale, tiepoint) {
        if let Some(transform) = GeoTransform::from_tiff_tags(&scale, &tiepoint) {
            stack.set_transform(transform);
        }
    }

    if let Ok(keys) = decoder.get_tag_u16_vec(Tag::Unknown(TAG_GEO_KEY_DIRECTORY)) {
        stack.set_crs(epsg_from_geokeys(&keys).map(CRS::from_epsg));
    }

    if let Ok(text) = decoder.get_tag_ascii_string(Tag::Unknown(TAG_GDAL_NODATA)) {
        let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        let nodata = text.parse::<f64>().ok().and_then(T::from_f64);
        stack.set_nodata(nodata);
    }

    debug_assert_eq!(stack.band_count(), samples);
    Ok(stack)
}

/// Find the EPSG code in a GeoKey directory (inline SHORT values only)
fn epsg_from_geokeys(keys: &[u16]) -> Option<u32> {
    let count = *keys.get(3)? as usize;
    let entries: Vec<&[u16]> = keys.get(4..)?.chunks_exact(4).take(count).collect();

    let inline_value = |key: u16| {
        entries
            .iter()
            .find(|e| e[0] == key && e[1] == 0)
            .map(|e| e[3])
            .filter(|&v| v != 0 && v != KEY_USER_DEFINED)
    };

    inline_value(KEY_PROJECTED_CS_TYPE)
        .or_else(|| inline_value(KEY_GEOGRAPHIC_TYPE))
        .map(u32::from)
}

/// Build a GeoKey directory for the given CRS
fn geokeys_for(crs: Option<&CRS>) -> Vec<u16> {
    let code = crs.and_then(|c| c.epsg()).and_then(|c| u16::try_from(c).ok());
    let geographic = crs.and_then(|c| c.is_geographic()).unwrap_or(false);

    // GTModelType: 1 = projected, 2 = geographic. GTRasterType 1 = PixelIsArea.
    let mut entries: Vec<[u16; 4]> = vec![
        [KEY_MODEL_TYPE, 0, 1, if geographic { 2 } else { 1 }],
        [KEY_RASTER_TYPE, 0, 1, 1],
    ];
    if let Some(code) = code {
        let key = if geographic {
            KEY_GEOGRAPHIC_TYPE
        } else {
            KEY_PROJECTED_CS_TYPE
        };
        entries.push([key, 0, 1, code]);
    }

    let mut keys = vec![1, 1, 0, entries.len() as u16];
    keys.extend(entries.into_iter().flatten());
    keys
}

fn nodata_text<T: RasterElement>(nodata: T) -> String {
    match nodata.to_f64() {
        Some(v) if v.is_nan() => "nan".to_string(),
        _ => nodata.to_string(),
    }
}

/// Pixel-interleaved 32-bit float samples, `N` per pixel
struct Float32Bands<const N: usize>;

impl<const N: usize> ColorType for Float32Bands<N> {
    type Inner = f32;
    const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::BlackIsZero;
    const BITS_PER_SAMPLE: &'static [u16] = &[32; N];
    const SAMPLE_FORMAT: &'static [SampleFormat] = &[SampleFormat::IEEEFP; N];

    // Predictors are never enabled for these images.
    fn horizontal_predict(_: &[Self::Inner], _: &mut Vec<Self::Inner>) {}
}

struct GeoTags<'a> {
    transform: &'a GeoTransform,
    crs: Option<&'a CRS>,
    nodata: Option<String>,
}

/// Encode one image with georeference tags into any `Write + Seek` sink
fn encode_image<C, W>(writer: W, cols: usize, rows: usize, data: &[C::Inner], tags: GeoTags) -> Result<()>
where
    C: ColorType,
    [C::Inner]: TiffValue,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer).map_err(tiff_err("TIFF encoder error"))?;
    let mut image = encoder
        .new_image::<C>(cols as u32, rows as u32)
        .map_err(tiff_err("Cannot create TIFF image"))?;

    image
        .encoder()
        .write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), &tags.transform.model_pixel_scale()[..])
        .map_err(tiff_err("Cannot write scale tag"))?;
    image
        .encoder()
        .write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), &tags.transform.model_tiepoint()[..])
        .map_err(tiff_err("Cannot write tiepoint tag"))?;
    image
        .encoder()
        .write_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY), geokeys_for(tags.crs).as_slice())
        .map_err(tiff_err("Cannot write geokey tag"))?;
    if let Some(nodata) = &tags.nodata {
        image
            .encoder()
            .write_tag(Tag::Unknown(TAG_GDAL_NODATA), nodata.as_str())
            .map_err(tiff_err("Cannot write nodata tag"))?;
    }

    image
        .write_data(data)
        .map_err(tiff_err("Cannot write image data"))?;
    Ok(())
}

/// Write a Raster to a GeoTIFF file
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let opts = options.unwrap_or_default();
    ensure_writable(path.as_ref(), opts.overwrite)?;

    let (rows, cols) = raster.shape();
    let tags = GeoTags {
        transform: raster.transform(),
        crs: raster.crs(),
        nodata: raster.nodata().map(nodata_text),
    };

    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    if T::is_float() {
        let data: Vec<f32> = raster
            .data()
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
            .collect();
        encode_image::<Gray32Float, _>(&mut writer, cols, rows, &data, tags)?;
    } else {
        let data: Vec<i32> = raster
            .data()
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(i32::MIN))
            .collect();
        encode_image::<GrayI32, _>(&mut writer, cols, rows, &data, tags)?;
    }
    writer.flush()?;
    Ok(())
}

macro_rules! encode_bands {
    ($count:expr, $writer:expr, $cols:expr, $rows:expr, $data:expr, $tags:expr, [$($n:literal),+]) => {
        match $count {
            $($n => encode_image::<Float32Bands<$n>, _>($writer, $cols, $rows, $data, $tags),)+
            other => Err(Error::UnsupportedDataType(format!("{} bands in one image", other))),
        }
    };
}

/// Write every band of a stack to one pixel-interleaved float32 GeoTIFF
pub fn write_bands<T, P>(stack: &BandStack<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let opts = options.unwrap_or_default();
    ensure_writable(path.as_ref(), opts.overwrite)?;

    let (rows, cols) = (stack.rows(), stack.cols());
    let data: Vec<f32> = stack
        .data()
        .view()
        .permuted_axes([1, 2, 0])
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();
    let tags = GeoTags {
        transform: stack.transform(),
        crs: stack.crs(),
        nodata: stack.nodata().map(nodata_text),
    };

    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    encode_bands!(
        stack.band_count(),
        &mut writer,
        cols,
        rows,
        &data,
        tags,
        [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13]
    )?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_geokeys_round_trip() {
        let keys = geokeys_for(Some(&CRS::from_epsg(32719)));
        assert_eq!(epsg_from_geokeys(&keys), Some(32719));

        let keys = geokeys_for(Some(&CRS::wgs84()));
        assert_eq!(epsg_from_geokeys(&keys), Some(4326));

        assert_eq!(epsg_from_geokeys(&geokeys_for(None)), None);
        assert_eq!(epsg_from_geokeys(&[1, 1]), None);
    }

    #[test]
    fn test_float_raster_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ndre.tif");

        let mut raster = Raster::from_vec(vec![0.25, -0.5, f64::NAN, 0.75, 0.0, 1.0], 2, 3).unwrap();
        raster.set_transform(GeoTransform::new(300_000.0, 5_000_000.0, 10.0, -10.0));
        raster.set_crs(Some(CRS::from_epsg(32719)));
        raster.set_nodata(Some(f64::NAN));
        write_geotiff(&raster, &path, None).unwrap();

        let loaded: Raster<f64> = read_geotiff(&path, None).unwrap();
        assert_eq!(loaded.shape(), (2, 3));
        assert_eq!(loaded.get(0, 1).unwrap(), -0.5);
        assert!(loaded.get(0, 2).unwrap().is_nan());
        assert!(loaded.nodata().is_some_and(|v| v.is_nan()));
        assert_eq!(loaded.transform(), raster.transform());
        assert_eq!(loaded.crs().and_then(|c| c.epsg()), Some(32719));
    }

    #[test]
    fn test_mask_round_trip_keeps_integer_nodata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agua.tif");

        let mut mask = Raster::from_vec(vec![1u8, 0, 0, 1], 2, 2).unwrap();
        mask.set_nodata(Some(0));
        write_geotiff(&mask, &path, None).unwrap();

        let loaded: Raster<u8> = read_geotiff(&path, None).unwrap();
        assert_eq!(loaded.data(), mask.data());
        assert_eq!(loaded.nodata(), Some(0));
        assert_eq!(loaded.valid_count(), 2);
    }

    #[test]
    fn test_multiband_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stack.tif");

        let data = Array3::from_shape_fn((8, 3, 4), |(b, r, c)| (b * 100 + r * 10 + c) as f64);
        let mut stack = BandStack::from_array(data);
        stack.set_transform(GeoTransform::new(0.0, 30.0, 10.0, -10.0));
        write_bands(&stack, &path, None).unwrap();

        let loaded: BandStack<f64> = read_bands(&path).unwrap();
        assert_eq!(loaded.band_count(), 8);
        assert_eq!(loaded.data(), stack.data());

        let nir: Raster<f64> = read_geotiff(&path, Some(8)).unwrap();
        assert_eq!(nir.get(2, 3).unwrap(), 723.0);
        assert!(read_geotiff::<f64, _>(&path, Some(9)).is_err());
    }

    #[test]
    fn test_overwrite_disabled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("NDVI.tif");
        let raster: Raster<f64> = Raster::filled(2, 2, 0.5);

        write_geotiff(&raster, &path, None).unwrap();
        write_geotiff(&raster, &path, None).unwrap();

        let keep = GeoTiffOptions {
            overwrite: false,
            ..Default::default()
        };
        assert!(matches!(
            write_geotiff(&raster, &path, Some(keep)),
            Err(Error::OutputExists(_))
        ));
    }
}
