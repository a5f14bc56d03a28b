//! Dense row-major matrix payload.

use std::ops::{Index, IndexMut};

/// Row-major matrix stored in a single contiguous buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Matrix<T> {
    rows: usize,
    columns: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Matrix<T> {
    /// Matrix of the given size filled with `T::default()`.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self::filled(rows, columns, T::default())
    }
}

impl<T: Clone> Matrix<T> {
    pub fn filled(rows: usize, columns: usize, value: T) -> Self {
        Self {
            rows,
            columns,
            data: vec![value; rows * columns],
        }
    }
}

impl<T> Matrix<T> {
    /// Wraps `data` as a `rows` x `columns` matrix. Returns `None` when the
    /// buffer length does not match.
    pub fn from_vec(rows: usize, columns: usize, data: Vec<T>) -> Option<Self> {
        (data.len() == rows * columns).then_some(Self {
            rows,
            columns,
            data,
        })
    }

    /// Builds a matrix from equally long rows.
    pub fn from_rows<R>(rows: impl IntoIterator<Item = R>) -> Option<Self>
    where
        R: IntoIterator<Item = T>,
    {
        let mut data = Vec::new();
        let mut row_count = 0;
        let mut columns = None;
        for row in rows {
            let before = data.len();
            data.extend(row);
            let width = data.len() - before;
            match columns {
                None => columns = Some(width),
                Some(c) if c != width => return None,
                Some(_) => {}
            }
            row_count += 1;
        }
        Self::from_vec(row_count, columns.unwrap_or(0), data)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, row: usize, column: usize) -> Option<&T> {
        if row < self.rows && column < self.columns {
            self.data.get(row * self.columns + column)
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, row: usize, column: usize) -> Option<&mut T> {
        if row < self.rows && column < self.columns {
            self.data.get_mut(row * self.columns + column)
        } else {
            None
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    /// Row slice, `None` when out of range.
    pub fn row(&self, row: usize) -> Option<&[T]> {
        (row < self.rows).then(|| &self.data[row * self.columns..(row + 1) * self.columns])
    }

    pub fn same_size<U>(&self, other: &Matrix<U>) -> bool {
        self.rows == other.rows && self.columns == other.columns
    }

    /// Applies `f` to every element.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Matrix<U> {
        Matrix {
            rows: self.rows,
            columns: self.columns,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Combines two equally sized matrices element by element.
    pub fn zip_map<U, V>(&self, other: &Matrix<U>, mut f: impl FnMut(&T, &U) -> V) -> Option<Matrix<V>> {
        if !self.same_size(other) {
            return None;
        }
        Some(Matrix {
            rows: self.rows,
            columns: self.columns,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| f(a, b))
                .collect(),
        })
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (row, column): (usize, usize)) -> &T {
        assert!(row < self.rows && column < self.columns, "matrix index out of range");
        &self.data[row * self.columns + column]
    }
}

impl<T> IndexMut<(usize, usize)> for Matrix<T> {
    fn index_mut(&mut self, (row, column): (usize, usize)) -> &mut T {
        assert!(row < self.rows && column < self.columns, "matrix index out of range");
        &mut self.data[row * self.columns + column]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows() {
        let m = Matrix::from_rows([[1, 2, 3], [4, 5, 6]]).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.columns(), 3);
        assert_eq!(m[(1, 0)], 4);
        assert_eq!(m.row(0), Some(&[1, 2, 3][..]));
        assert!(m.row(2).is_none());
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let rows: Vec<Vec<i32>> = vec![vec![1, 2], vec![3]];
        assert!(Matrix::from_rows(rows).is_none());
        assert!(Matrix::from_vec(2, 2, vec![1.0f32; 3]).is_none());
    }

    #[test]
    fn test_map_and_zip() {
        let a = Matrix::from_vec(1, 3, vec![1, 5, 3]).unwrap();
        let b = Matrix::from_vec(1, 3, vec![2, 2, 3]).unwrap();
        let gt = a.zip_map(&b, |x, y| x > y).unwrap();
        assert_eq!(gt.as_slice(), &[false, true, false]);
        assert_eq!(a.map(|x| x * 2).into_vec(), vec![2, 10, 6]);
        assert!(a.zip_map(&Matrix::<i32>::new(3, 1), |x, y| x + y).is_none());
    }

    #[test]
    fn test_get_out_of_range() {
        let mut m = Matrix::<u8>::new(2, 2);
        assert!(m.get(2, 0).is_none());
        *m.get_mut(1, 1).unwrap() = 9;
        assert_eq!(m[(1, 1)], 9);
    }
}
