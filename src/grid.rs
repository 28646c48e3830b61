/// Row-major flat grid. No per-cell objects.
/// Neighbourhood lookups wrap on both axes (toroidal topology).
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    pub data: Vec<T>,
    pub w: usize,
    pub h: usize,
}

impl<T: Copy + Default> Grid<T> {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            data: vec![T::default(); w * h],
            w,
            h,
        }
    }

    pub fn square(size: usize) -> Self {
        Self::new(size, size)
    }

    pub fn from_vec(w: usize, h: usize, data: Vec<T>) -> Self {
        assert_eq!(data.len(), w * h, "grid data does not match {w}x{h}");
        Self { data, w, h }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.w && y < self.h);
        y * self.w + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[self.idx(x, y)]
    }

    /// Side length of a square grid.
    #[inline]
    pub fn size(&self) -> usize {
        debug_assert_eq!(self.w, self.h);
        self.w
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Rows as nested vectors, outer index = row.
    pub fn to_rows(&self) -> Vec<Vec<T>> {
        if self.w == 0 {
            return vec![Vec::new(); self.h];
        }
        self.data.chunks(self.w).map(|row| row.to_vec()).collect()
    }

    pub fn map<U: Copy + Default>(&self, f: impl Fn(T) -> U) -> Grid<U> {
        Grid {
            data: self.data.iter().map(|&v| f(v)).collect(),
            w: self.w,
            h: self.h,
        }
    }
}

/// Wrap a signed coordinate into `0..n`. `n` must be non-zero.
#[inline]
pub fn wrap(c: isize, n: usize) -> usize {
    c.rem_euclid(n as isize) as usize
}

/// Wrap both coordinates on a torus of size `w`x`h`.
#[inline]
pub fn wrap_xy(x: isize, y: isize, w: usize, h: usize) -> (usize, usize) {
    (wrap(x, w), wrap(y, h))
}

/// Von Neumann neighbourhood plus centre.
pub const VON_NEUMANN5: [(isize, isize); 5] = [(0, -1), (-1, 0), (0, 0), (1, 0), (0, 1)];

/// Moore neighbourhood plus centre.
#[rustfmt::skip]
pub const MOORE9: [(isize, isize); 9] = [
    (-1, -1), (0, -1), (1, -1),
    (-1, 0),  (0, 0),  (1, 0),
    (-1, 1),  (0, 1),  (1, 1),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_is_toroidal() {
        assert_eq!(wrap(-1, 5), 4);
        assert_eq!(wrap(5, 5), 0);
        assert_eq!(wrap(-6, 5), 4);
        assert_eq!(wrap_xy(-1, 3, 3, 3), (2, 0));
    }

    #[test]
    fn size_one_wraps_onto_itself() {
        for &(dx, dy) in &MOORE9 {
            assert_eq!(wrap_xy(dx, dy, 1, 1), (0, 0));
        }
    }

    #[test]
    fn rows_are_row_major() {
        let g = Grid::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(g.to_rows(), vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(g.get(1, 0), 2.0);
        assert_eq!(Grid::<f64>::square(0).to_rows(), Vec::<Vec<f64>>::new());
    }
}
