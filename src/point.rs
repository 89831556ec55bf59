use crate::error::Error;
use ordered_float::NotNan;

/// A detected joint location in normalized image coordinates. Also used for
/// the offset between two locations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    x: f32,
    y: f32,
}

fn not_nan(value: f32) -> Result<f32, Error> {
    NotNan::new(value)
        .map(NotNan::into_inner)
        .map_err(|e| Error::ConstructNotNan(e, value))
}

impl Point {
    pub fn new(x: f32, y: f32) -> Result<Self, Error> {
        Ok(Self {
            x: not_nan(x)?,
            y: not_nan(y)?,
        })
    }

    /// Offset that carries `self` onto `target`.
    #[inline]
    pub fn offset_to(self, target: Self) -> Self {
        Self {
            x: target.x - self.x,
            y: target.y - self.y,
        }
    }

    #[inline]
    pub fn norm_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn squared_distance(self, other: Self) -> f32 {
        self.offset_to(other).norm_squared()
    }

    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// z component of the 3D cross product of `self` and `other`.
    #[inline]
    pub fn cross(self, other: Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    pub fn x(self) -> f32 {
        self.x
    }

    pub fn y(self) -> f32 {
        self.y
    }
}

#[cfg(test)]
mod tests {
    use super::Point;

    #[test]
    fn squared_distance_is_symmetric() {
        let a = Point::new(0.5, 0.5).unwrap();
        let b = Point::new(1.0, 1.0).unwrap();
        assert_eq!(a.squared_distance(b), 0.5);
        assert_eq!(b.squared_distance(a), 0.5);
    }

    #[test]
    fn offset_points_from_origin_to_target() {
        let origin = Point::new(0.25, 0.75).unwrap();
        let target = Point::new(1.0, 0.5).unwrap();
        assert_eq!(origin.offset_to(target), Point::new(0.75, -0.25).unwrap());
    }

    #[test]
    fn nan_is_rejected() {
        assert!(Point::new(f32::NAN, 0.5).is_err());
        assert!(Point::new(0.5, f32::NAN).is_err());
    }

    #[test]
    fn cross_is_antisymmetric() {
        let a = Point::new(1.0, 0.0).unwrap();
        let b = Point::new(0.0, 1.0).unwrap();
        assert_eq!(a.cross(b), 1.0);
        assert_eq!(b.cross(a), -1.0);
    }
}
