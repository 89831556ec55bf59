use crate::point::Point;

/// Upper bound for [`percent_distance_change`].
pub const MAX_PERCENT_CHANGE: f32 = 2.0;

/// Lower bound for [`percent_distance_change`], reached when the pair collapses
/// onto a single point.
pub const MIN_PERCENT_CHANGE: f32 = -1.0;

/// Returned by [`percent_distance_change`] when the previous distance is zero.
pub const ZERO_DISTANCE_CHANGE: f32 = 1.0;

#[inline]
pub fn euclidean_distance(p: Point, q: Point) -> f32 {
    p.squared_distance(q).sqrt()
}

/// Signed angle in degrees, in `[0, 360)`, swept from the ray `vertex -> c` to
/// the ray `vertex -> a`.
///
/// The result depends on argument order: swapping `a` and `c` yields
/// `360 - angle`. A ray of zero length has no direction, so coincident points
/// produce NaN; callers are expected to filter those out.
pub fn angle_between(a: Point, vertex: Point, c: Point) -> f32 {
    let to_a = vertex.offset_to(a);
    let to_c = vertex.offset_to(c);
    if to_a.norm_squared() == 0.0 || to_c.norm_squared() == 0.0 {
        return f32::NAN;
    }
    let degrees = to_c.cross(to_a).atan2(to_c.dot(to_a)).to_degrees();
    if degrees >= 0.0 {
        return degrees;
    }
    let wrapped = degrees + 360.0;
    // tiny negative angles round up to exactly 360 in f32
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Relative change in the distance between a pair of points from one frame to
/// the next, capped at [`MAX_PERCENT_CHANGE`].
pub fn percent_distance_change(current: (Point, Point), previous: (Point, Point)) -> f32 {
    let previous_distance = euclidean_distance(previous.0, previous.1);
    if previous_distance == 0.0 {
        return ZERO_DISTANCE_CHANGE;
    }
    let current_distance = euclidean_distance(current.0, current.1);
    ((current_distance - previous_distance) / previous_distance).min(MAX_PERCENT_CHANGE)
}
