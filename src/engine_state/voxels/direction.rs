//! # Direction Module
//!
//! The six axis directions used for chunk neighbors and block faces.

use cgmath::Vector3;

/// One of the six axis-aligned directions.
///
/// The discriminants pair up opposite directions on consecutive even/odd
/// values so that [`Direction::opposite`] is a single XOR.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// +Z
    Front = 0,
    /// -Z
    Back = 1,
    /// +X
    Right = 2,
    /// -X
    Left = 3,
    /// +Y
    Top = 4,
    /// -Y
    Bottom = 5,
}

impl Direction {
    /// All six directions, in discriminant order.
    pub fn all() -> [Direction; 6] {
        [
            Direction::Front,
            Direction::Back,
            Direction::Right,
            Direction::Left,
            Direction::Top,
            Direction::Bottom,
        ]
    }

    /// The discriminant, usable as an array index.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Recovers a direction from its index.
    ///
    /// # Panics
    /// Panics if `index >= 6`.
    pub fn from_index(index: usize) -> Direction {
        match index {
            0 => Direction::Front,
            1 => Direction::Back,
            2 => Direction::Right,
            3 => Direction::Left,
            4 => Direction::Top,
            5 => Direction::Bottom,
            _ => panic!("invalid direction index {index}"),
        }
    }

    /// The direction pointing the other way.
    pub fn opposite(self) -> Direction {
        // Pairs share an axis on even/odd discriminants.
        Direction::from_index(self.index() ^ 1)
    }

    /// Unit offset in chunk/world integer coordinates.
    pub fn offset(self) -> Vector3<i32> {
        match self {
            Direction::Front => Vector3::new(0, 0, 1),
            Direction::Back => Vector3::new(0, 0, -1),
            Direction::Right => Vector3::new(1, 0, 0),
            Direction::Left => Vector3::new(-1, 0, 0),
            Direction::Top => Vector3::new(0, 1, 0),
            Direction::Bottom => Vector3::new(0, -1, 0),
        }
    }

    /// The outward face normal for this direction.
    pub fn normal(self) -> [f32; 3] {
        let offset = self.offset();
        [offset.x as f32, offset.y as f32, offset.z as f32]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposites_pair_up() {
        assert_eq!(Direction::Front.opposite(), Direction::Back);
        assert_eq!(Direction::Back.opposite(), Direction::Front);
        assert_eq!(Direction::Right.opposite(), Direction::Left);
        assert_eq!(Direction::Left.opposite(), Direction::Right);
        assert_eq!(Direction::Top.opposite(), Direction::Bottom);
        assert_eq!(Direction::Bottom.opposite(), Direction::Top);
    }

    #[test]
    fn test_opposite_offsets_cancel() {
        for direction in Direction::all() {
            let sum = direction.offset() + direction.opposite().offset();
            assert_eq!(sum, Vector3::new(0, 0, 0));
        }
    }

    #[test]
    fn test_index_round_trip() {
        for direction in Direction::all() {
            assert_eq!(Direction::from_index(direction.index()), direction);
        }
    }
}
