//! Cell connectivity for region operations

use super::{Raster, RasterElement};

/// Which neighbours count as connected to a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Neighborhood {
    /// 3x3 without corners: the four edge-sharing neighbours
    #[default]
    Rook3x3,
    /// 3x3: edge and corner neighbours
    Queen3x3,
}

const ROOK: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];
const QUEEN: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

impl Neighborhood {
    /// Relative (row, col) positions of the neighbours, center excluded
    pub fn offsets(&self) -> &'static [(isize, isize)] {
        match self {
            Neighborhood::Rook3x3 => &ROOK,
            Neighborhood::Queen3x3 => &QUEEN,
        }
    }

    /// Number of connected neighbours (4 or 8)
    pub fn connectivity(&self) -> usize {
        self.offsets().len()
    }
}

/// Iterator over the in-bounds neighbours of a cell, yielding (row, col, value)
pub struct NeighborhoodIterator<'a, T: RasterElement> {
    raster: &'a Raster<T>,
    center_row: usize,
    center_col: usize,
    offsets: std::slice::Iter<'static, (isize, isize)>,
}

impl<'a, T: RasterElement> NeighborhoodIterator<'a, T> {
    pub fn new(raster: &'a Raster<T>, row: usize, col: usize, neighborhood: Neighborhood) -> Self {
        Self {
            raster,
            center_row: row,
            center_col: col,
            offsets: neighborhood.offsets().iter(),
        }
    }
}

impl<'a, T: RasterElement> Iterator for NeighborhoodIterator<'a, T> {
    type Item = (usize, usize, T);

    fn next(&mut self) -> Option<Self::Item> {
        for &(dr, dc) in self.offsets.by_ref() {
            let (Some(r), Some(c)) = (
                self.center_row.checked_add_signed(dr),
                self.center_col.checked_add_signed(dc),
            ) else {
                continue;
            };
            if let Ok(value) = self.raster.get(r, c) {
                return Some((r, c, value));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets() {
        assert_eq!(Neighborhood::Rook3x3.connectivity(), 4);
        assert_eq!(Neighborhood::Queen3x3.connectivity(), 8);
        assert_eq!(Neighborhood::default(), Neighborhood::Rook3x3);
    }

    #[test]
    fn test_iterator_clips_at_edges() {
        let raster: Raster<u8> = Raster::filled(3, 3, 1);
        let corner: Vec<_> =
            NeighborhoodIterator::new(&raster, 0, 0, Neighborhood::Rook3x3).collect();
        assert_eq!(corner.len(), 2);

        let center: Vec<_> =
            NeighborhoodIterator::new(&raster, 1, 1, Neighborhood::Queen3x3).collect();
        assert_eq!(center.len(), 8);
    }
}
