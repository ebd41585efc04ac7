//! Raster to polygon conversion
//!
//! Each maximal connected region of equal, valid cell value becomes one
//! feature. Region boundaries follow cell edges exactly: there is no
//! smoothing or simplification beyond merging collinear unit edges.
//!
//! Boundaries are traced on the vertex lattice of the grid. Every cell side
//! separating a region from anything else is a directed edge with the
//! region on its right (screen orientation, rows growing downward), so outer
//! rings come out with positive shoelace area and holes with negative area.
//! Where a region touches itself only through a corner, the turn taken at
//! that vertex decides whether the corner joins the two cells, which keeps
//! the rings consistent with the labelling connectivity.

use std::collections::{HashMap, HashSet};

use geo::orient::{Direction, Orient};
use geo::{Contains, Coord, Geometry, LineString, MultiPolygon, Polygon};
use grassmap_core::raster::{Neighborhood, NeighborhoodIterator, Raster, RasterElement};
use grassmap_core::vector::{AttributeValue, Feature, FeatureCollection, FieldType};
use grassmap_core::{Algorithm, Error, Result};

/// Sequential feature identifier field
pub const ID_FIELD: &str = "Id";

/// Field holding the cell value of the region
pub const VALUE_FIELD: &str = "gridcode";

/// Parameters for polygonization
#[derive(Debug, Clone, Default)]
pub struct PolygonizeParams {
    /// Connectivity used to group cells into regions
    pub neighborhood: Neighborhood,
}

/// Polygonize algorithm
#[derive(Debug, Clone, Default)]
pub struct Polygonize;

impl Algorithm for Polygonize {
    type Input = Raster<u8>;
    type Output = FeatureCollection;
    type Params = PolygonizeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Polygonize"
    }

    fn description(&self) -> &'static str {
        "Convert connected regions of equal cell value into polygon features"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        polygonize_with(&input, params)
    }
}

/// Polygonize a raster with 4-connected regions.
///
/// # Example
/// ```ignore
/// let grass = range_mask(&ndre, 0.41, 0.59)?;
/// let polygons = polygonize(&grass)?;
/// ```
pub fn polygonize<T: RasterElement>(raster: &Raster<T>) -> Result<FeatureCollection> {
    polygonize_with(raster, PolygonizeParams::default())
}

/// Polygonize a raster with explicit parameters.
///
/// Features are emitted in raster-scan order of their first cell. Each one
/// carries `Id` (1-based) and `gridcode` (the region value, truncated to an
/// integer) and the raster's CRS is copied to the collection.
pub fn polygonize_with<T: RasterElement>(
    raster: &Raster<T>,
    params: PolygonizeParams,
) -> Result<FeatureCollection> {
    let mut features = FeatureCollection::with_crs(raster.crs().cloned());
    features.add_field(ID_FIELD, FieldType::Integer);
    features.add_field(VALUE_FIELD, FieldType::Integer);

    let (labels, values) = label_regions(raster, params.neighborhood);
    if values.is_empty() {
        return Ok(features);
    }

    let edges = boundary_edges(&labels, values.len());
    let transform = raster.transform();

    for (index, (value, region_edges)) in values.iter().zip(edges).enumerate() {
        let gridcode = value.to_f64().ok_or_else(|| {
            Error::Algorithm(format!("cell value {} has no numeric representation", value))
        })?;

        let rings = trace_rings(&region_edges, params.neighborhood)?;
        let (exteriors, holes): (Vec<_>, Vec<_>) =
            rings.into_iter().partition(|ring| signed_area2(ring) > 0);

        let to_map = |ring: &[Vertex]| -> LineString<f64> {
            ring.iter()
                .map(|&(col, row)| {
                    let (x, y) = transform.corner(col as f64, row as f64);
                    Coord { x, y }
                })
                .collect()
        };
        let exteriors: Vec<LineString<f64>> = exteriors.iter().map(|r| to_map(r)).collect();
        let holes: Vec<LineString<f64>> = holes.iter().map(|r| to_map(r)).collect();

        let mut feature = Feature::new(assemble(exteriors, holes)?);
        feature.set_property(ID_FIELD, AttributeValue::Int(index as i64 + 1));
        feature.set_property(VALUE_FIELD, AttributeValue::Int(gridcode as i64));
        features.push(feature);
    }

    Ok(features)
}

/// Label connected regions of equal valid value.
///
/// Returns the label grid (0 = no region, row-major) and the value of each
/// region; label `n` has value `values[n - 1]`.
fn label_regions<T: RasterElement>(raster: &Raster<T>, neighborhood: Neighborhood) -> (Vec<Vec<usize>>, Vec<T>) {
    let (rows, cols) = raster.shape();
    let mut labels = vec![vec![0usize; cols]; rows];
    let mut values = Vec::new();
    let mut stack = Vec::new();

    for ((row, col), &value) in raster.data().indexed_iter() {
        if labels[row][col] != 0 || raster.is_nodata(value) {
            continue;
        }
        values.push(value);
        let label = values.len();
        labels[row][col] = label;
        stack.push((row, col));

        while let Some((r, c)) = stack.pop() {
            for (nr, nc, v) in NeighborhoodIterator::new(raster, r, c, neighborhood) {
                if labels[nr][nc] == 0 && v == value && !raster.is_nodata(v) {
                    labels[nr][nc] = label;
                    stack.push((nr, nc));
                }
            }
        }
    }

    (labels, values)
}

/// Lattice vertex as (col, row) of a cell corner
type Vertex = (usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Heading {
    East,
    South,
    West,
    North,
}

impl Heading {
    fn step(self, (col, row): Vertex) -> Vertex {
        match self {
            Heading::East => (col + 1, row),
            Heading::South => (col, row + 1),
            Heading::West => (col - 1, row),
            Heading::North => (col, row - 1),
        }
    }

    /// Clockwise on screen
    fn right(self) -> Self {
        match self {
            Heading::East => Heading::South,
            Heading::South => Heading::West,
            Heading::West => Heading::North,
            Heading::North => Heading::East,
        }
    }

    fn left(self) -> Self {
        self.right().right().right()
    }
}

/// Outgoing boundary headings per start vertex, one map per region
type EdgeMap = HashMap<Vertex, Vec<Heading>>;

fn boundary_edges(labels: &[Vec<usize>], regions: usize) -> Vec<EdgeMap> {
    let mut edges = vec![EdgeMap::new(); regions];
    let rows = labels.len();

    for (row, line) in labels.iter().enumerate() {
        let cols = line.len();
        for (col, &label) in line.iter().enumerate() {
            if label == 0 {
                continue;
            }
            let differs = |r: Option<usize>, c: Option<usize>| match (r, c) {
                (Some(r), Some(c)) if r < rows && c < cols => labels[r][c] != label,
                _ => true,
            };
            let map = &mut edges[label - 1];
            let mut add = |start: Vertex, heading: Heading| {
                map.entry(start).or_default().push(heading);
            };

            if differs(row.checked_sub(1), Some(col)) {
                add((col, row), Heading::East);
            }
            if differs(Some(row), Some(col + 1)) {
                add((col + 1, row), Heading::South);
            }
            if differs(Some(row + 1), Some(col)) {
                add((col + 1, row + 1), Heading::West);
            }
            if differs(Some(row), col.checked_sub(1)) {
                add((col, row + 1), Heading::North);
            }
        }
    }

    edges
}

/// Pick the outgoing edge at a vertex reached while heading `incoming`.
///
/// A vertex has two outgoing edges only where the region touches itself
/// through a corner. Turning right keeps the two cells apart (4-connected
/// regions), turning left joins them (8-connected regions).
fn next_heading(outgoing: &[Heading], incoming: Heading, neighborhood: Neighborhood) -> Option<Heading> {
    match outgoing {
        [] => None,
        [only] => Some(*only),
        _ => {
            let preferred = match neighborhood {
                Neighborhood::Rook3x3 => incoming.right(),
                Neighborhood::Queen3x3 => incoming.left(),
            };
            outgoing
                .iter()
                .copied()
                .find(|&h| h == preferred)
                .or_else(|| outgoing.first().copied())
        }
    }
}

/// Follow every boundary edge of one region into closed rings.
///
/// Rings are returned without the closing vertex and with collinear
/// vertices removed.
fn trace_rings(edges: &EdgeMap, neighborhood: Neighborhood) -> Result<Vec<Vec<Vertex>>> {
    let total: usize = edges.values().map(Vec::len).sum();
    let mut used: HashSet<(Vertex, Heading)> = HashSet::with_capacity(total);
    let mut rings = Vec::new();

    let mut starts: Vec<(Vertex, Heading)> = edges
        .iter()
        .flat_map(|(&v, hs)| hs.iter().map(move |&h| (v, h)))
        .collect();
    // (row, col) order makes the output independent of hash order
    starts.sort_by_key(|&((col, row), h)| (row, col, h as u8));

    for start in starts {
        if used.contains(&start) {
            continue;
        }

        let mut ring = Vec::new();
        let (mut vertex, mut heading) = start;
        loop {
            if !used.insert((vertex, heading)) {
                return Err(Error::Algorithm(format!(
                    "boundary edge at {:?} visited twice while tracing",
                    vertex
                )));
            }
            ring.push((vertex, heading));

            let next = heading.step(vertex);
            let outgoing = edges.get(&next).map(Vec::as_slice).unwrap_or(&[]);
            let turn = next_heading(outgoing, heading, neighborhood).ok_or_else(|| {
                Error::Algorithm(format!("open boundary at vertex {:?}", next))
            })?;

            if (next, turn) == start {
                break;
            }
            vertex = next;
            heading = turn;
        }

        rings.push(drop_collinear(&ring));
    }

    Ok(rings)
}

/// Keep only the vertices where the heading changes
fn drop_collinear(ring: &[(Vertex, Heading)]) -> Vec<Vertex> {
    let n = ring.len();
    (0..n)
        .filter(|&i| ring[(i + n - 1) % n].1 != ring[i].1)
        .map(|i| ring[i].0)
        .collect()
}

/// Twice the shoelace area in lattice coordinates (rows growing downward)
fn signed_area2(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = ring[i];
            let (x1, y1) = ring[(i + 1) % n];
            x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64
        })
        .sum()
}

/// Build the feature geometry, exteriors clockwise and holes
/// counter-clockwise in map coordinates.
fn assemble(exteriors: Vec<LineString<f64>>, holes: Vec<LineString<f64>>) -> Result<Geometry<f64>> {
    let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> =
        exteriors.into_iter().map(|ring| (ring, Vec::new())).collect();

    match polygons.len() {
        0 => return Err(Error::Algorithm("region without an outer boundary".into())),
        1 => polygons[0].1.extend(holes),
        _ => {
            for hole in holes {
                let owner = polygons
                    .iter()
                    .position(|(exterior, _)| Polygon::new(exterior.clone(), vec![]).contains(&hole))
                    .unwrap_or(0);
                polygons[owner].1.push(hole);
            }
        }
    }

    let mut polygons: Vec<Polygon<f64>> = polygons
        .into_iter()
        .map(|(exterior, interiors)| Polygon::new(exterior, interiors).orient(Direction::Reversed))
        .collect();

    Ok(if polygons.len() == 1 {
        Geometry::Polygon(polygons.remove(0))
    } else {
        Geometry::MultiPolygon(MultiPolygon::new(polygons))
    })
}
