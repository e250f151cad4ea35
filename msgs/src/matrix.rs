use serde::{de, ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer};

/// Rectangular row-major grid indexed `(y, x)`.
///
/// Serialized as an array of rows. Ragged input is refused at decode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix<T> {
    height: usize,
    width: usize,
    cells: Vec<T>,
}

impl<T: Clone> Matrix<T> {
    pub fn new(height: usize, width: usize, fill: T) -> Matrix<T> {
        Matrix { height, width, cells: vec![fill; height * width] }
    }
}

impl<T> Matrix<T> {
    pub fn from_rows(rows: Vec<Vec<T>>) -> Option<Matrix<T>> {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.len());
        if rows.iter().any(|row| row.len() != width) {
            return None;
        }
        let cells = rows.into_iter().flatten().collect();
        Some(Matrix { height, width, cells })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn get(&self, y: usize, x: usize) -> Option<&T> {
        if y >= self.height || x >= self.width {
            return None;
        }
        self.cells.get(y * self.width + x)
    }

    pub fn get_mut(&mut self, y: usize, x: usize) -> Option<&mut T> {
        if y >= self.height || x >= self.width {
            return None;
        }
        self.cells.get_mut(y * self.width + x)
    }

    pub fn set(&mut self, y: usize, x: usize, value: T) -> bool {
        match self.get_mut(y, x) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    pub fn row(&self, y: usize) -> Option<&[T]> {
        if y >= self.height {
            return None;
        }
        self.cells.get(y * self.width..(y + 1) * self.width)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        (0..self.height).filter_map(move |y| self.row(y))
    }
}

impl<T: Serialize> Serialize for Matrix<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.height))?;
        for row in self.rows() {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Matrix<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<Vec<T>>::deserialize(deserializer)?;
        Matrix::from_rows(rows).ok_or_else(|| de::Error::custom("rows of a matrix must have equal length"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexing_is_row_major() {
        let matrix = Matrix::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        assert_eq!(matrix.height(), 2);
        assert_eq!(matrix.width(), 3);
        assert_eq!(matrix.get(1, 0), Some(&4));
        assert_eq!(matrix.get(0, 3), None);
        assert_eq!(matrix.get(2, 0), None);
        assert_eq!(matrix.row(1), Some(&[4, 5, 6][..]));
        assert_eq!(matrix.row(2), None);
    }

    #[test]
    fn ragged_json_is_refused() {
        assert!(serde_json::from_str::<Matrix<i32>>("[[1,2],[3]]").is_err());
        let matrix: Matrix<i32> = serde_json::from_str("[[1,2],[3,4]]").unwrap();
        assert_eq!(serde_json::to_string(&matrix).unwrap(), "[[1,2],[3,4]]");
    }

    #[test]
    fn zero_width_rows_serialize() {
        let matrix: Matrix<i32> = Matrix::new(2, 0, 0);
        assert_eq!(serde_json::to_string(&matrix).unwrap(), "[[],[]]");
    }
}
