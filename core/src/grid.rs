use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Location of a single grid cell expressed as integer x/z coordinates.
///
/// Cells may sit anywhere on the world grid, including negative coordinates;
/// the world-space footprint of a cell is derived by multiplying with the
/// configured cell size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: i32,
    z: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Cell index along the world x axis.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Cell index along the world z axis.
    #[must_use]
    pub const fn z(&self) -> i32 {
        self.z
    }
}

/// Inclusive rectangular region expressed in cell coordinates.
///
/// Bounds are always stored normalized (`min <= max` on both axes); reversed
/// input is accepted and swapped during construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellBounds {
    min_x: i32,
    max_x: i32,
    min_z: i32,
    max_z: i32,
}

impl CellBounds {
    /// Creates bounds from the provided corners, normalizing reversed axes.
    #[must_use]
    pub fn new(min_x: i32, max_x: i32, min_z: i32, max_z: i32) -> Self {
        let (min_x, max_x) = if min_x <= max_x {
            (min_x, max_x)
        } else {
            (max_x, min_x)
        };
        let (min_z, max_z) = if min_z <= max_z {
            (min_z, max_z)
        } else {
            (max_z, min_z)
        };
        Self {
            min_x,
            max_x,
            min_z,
            max_z,
        }
    }

    /// Parses bounds from the compact `"<minX>..<maxX>,<minZ>..<maxZ>"`
    /// notation.
    pub fn parse(notation: &str) -> Result<Self, BoundsParseError> {
        let trimmed = notation.trim();
        let mut axes = trimmed.split(',');
        let x_axis = axes
            .next()
            .ok_or_else(|| BoundsParseError::MissingAxis(trimmed.to_owned()))?;
        let z_axis = axes
            .next()
            .ok_or_else(|| BoundsParseError::MissingAxis(trimmed.to_owned()))?;
        if axes.next().is_some() {
            return Err(BoundsParseError::MissingAxis(trimmed.to_owned()));
        }

        let (min_x, max_x) = parse_axis(x_axis)?;
        let (min_z, max_z) = parse_axis(z_axis)?;
        Ok(Self::new(min_x, max_x, min_z, max_z))
    }

    /// Smallest cell index covered along the x axis.
    #[must_use]
    pub const fn min_x(&self) -> i32 {
        self.min_x
    }

    /// Largest cell index covered along the x axis.
    #[must_use]
    pub const fn max_x(&self) -> i32 {
        self.max_x
    }

    /// Smallest cell index covered along the z axis.
    #[must_use]
    pub const fn min_z(&self) -> i32 {
        self.min_z
    }

    /// Largest cell index covered along the z axis.
    #[must_use]
    pub const fn max_z(&self) -> i32 {
        self.max_z
    }

    /// Number of cells covered by the bounds.
    #[must_use]
    pub fn cell_count(&self) -> u64 {
        let width = (i64::from(self.max_x) - i64::from(self.min_x) + 1) as u64;
        let height = (i64::from(self.max_z) - i64::from(self.min_z) + 1) as u64;
        width * height
    }

    /// Iterates every covered cell in row-major order: z rows ascending, x
    /// ascending within each row.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let min_x = self.min_x;
        let max_x = self.max_x;
        (self.min_z..=self.max_z)
            .flat_map(move |z| (min_x..=max_x).map(move |x| CellCoord::new(x, z)))
    }

    /// Converts the bounds into a world-space box using the provided cell
    /// size, padded outward by `margin` world units on every side.
    #[must_use]
    pub fn to_world(&self, cell_size: f64, margin: f64) -> WorldBox {
        WorldBox {
            min_x: f64::from(self.min_x) * cell_size - margin,
            min_z: f64::from(self.min_z) * cell_size - margin,
            max_x: (f64::from(self.max_x) + 1.0) * cell_size + margin,
            max_z: (f64::from(self.max_z) + 1.0) * cell_size + margin,
        }
    }

    /// Renders the bounds back into the compact range notation.
    #[must_use]
    pub fn notation(&self) -> String {
        format!(
            "{}..{},{}..{}",
            self.min_x, self.max_x, self.min_z, self.max_z
        )
    }
}

fn parse_axis(axis: &str) -> Result<(i32, i32), BoundsParseError> {
    let trimmed = axis.trim();
    let (low, high) = trimmed
        .split_once("..")
        .ok_or_else(|| BoundsParseError::InvalidRange(trimmed.to_owned()))?;
    Ok((parse_cell_index(low)?, parse_cell_index(high)?))
}

fn parse_cell_index(value: &str) -> Result<i32, BoundsParseError> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| BoundsParseError::InvalidNumber(value.trim().to_owned()))
}

/// Errors raised while parsing the compact bounds notation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BoundsParseError {
    /// The notation did not contain exactly two comma-separated axes.
    #[error("bounds must contain exactly two comma-separated axes: {0:?}")]
    MissingAxis(String),
    /// An axis did not use the `<min>..<max>` range notation.
    #[error("axis must use `<min>..<max>` notation: {0:?}")]
    InvalidRange(String),
    /// A cell index was missing or not an integer.
    #[error("cell index is not an integer: {0:?}")]
    InvalidNumber(String),
}

/// Axis-aligned world-space box derived from [`CellBounds`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldBox {
    /// Smallest world x covered by the box.
    pub min_x: f64,
    /// Smallest world z covered by the box.
    pub min_z: f64,
    /// Largest world x covered by the box.
    pub max_x: f64,
    /// Largest world z covered by the box.
    pub max_z: f64,
}

impl WorldBox {
    /// Reports whether the provided world-space point lies inside the box.
    #[must_use]
    pub fn contains(&self, x: f64, z: f64) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }
}

/// World-space position of a spawn record.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// World x coordinate.
    pub x: f64,
    /// World y coordinate; defaults to ground level.
    pub y: f64,
    /// World z coordinate.
    pub z: f64,
}

impl Position {
    /// Creates a position with explicit coordinates on all three axes.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a ground-level position (`y = 0`).
    #[must_use]
    pub const fn flat(x: f64, z: f64) -> Self {
        Self { x, y: 0.0, z }
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundsParseError, CellBounds, CellCoord};

    #[test]
    fn parses_compact_notation() {
        let bounds = CellBounds::parse("0..1,0..1").expect("parse");
        assert_eq!(bounds, CellBounds::new(0, 1, 0, 1));
        assert_eq!(bounds.cell_count(), 4);
    }

    #[test]
    fn normalizes_reversed_axes() {
        let bounds = CellBounds::parse("5..-2, 3..1").expect("parse");
        assert_eq!(bounds.min_x(), -2);
        assert_eq!(bounds.max_x(), 5);
        assert_eq!(bounds.min_z(), 1);
        assert_eq!(bounds.max_z(), 3);
    }

    #[test]
    fn rejects_malformed_notation() {
        assert!(matches!(
            CellBounds::parse("0..1"),
            Err(BoundsParseError::MissingAxis(_))
        ));
        assert!(matches!(
            CellBounds::parse("0..1,2"),
            Err(BoundsParseError::InvalidRange(_))
        ));
        assert!(matches!(
            CellBounds::parse("0..x,0..1"),
            Err(BoundsParseError::InvalidNumber(_))
        ));
        assert!(matches!(
            CellBounds::parse("0..NaN,0..1"),
            Err(BoundsParseError::InvalidNumber(_))
        ));
    }

    #[test]
    fn cells_iterate_row_major() {
        let bounds = CellBounds::new(0, 1, 0, 1);
        let cells: Vec<CellCoord> = bounds.cells().collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(0, 0),
                CellCoord::new(1, 0),
                CellCoord::new(0, 1),
                CellCoord::new(1, 1),
            ]
        );
    }

    #[test]
    fn world_box_covers_padded_region() {
        let bounds = CellBounds::new(0, 1, 0, 1);
        let world = bounds.to_world(64.0, 8.0);
        assert!(world.contains(-8.0, 0.0));
        assert!(world.contains(136.0, 136.0));
        assert!(!world.contains(137.0, 0.0));
    }
}
