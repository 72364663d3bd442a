//! Common types used across dffkit
//!
//! This module provides the small math and colour types shared by the
//! decoder, the scene builders and the export sinks.

use serde::{Deserialize, Serialize};

/// 3D vector (position, normal, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };
    pub const X: Self = Self { x: 1.0, y: 0.0, z: 0.0 };
    pub const Y: Self = Self { x: 0.0, y: 1.0, z: 0.0 };
    pub const Z: Self = Self { x: 0.0, y: 0.0, z: 1.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self {
                x: self.x / len,
                y: self.y / len,
                z: self.z / len,
            }
        } else {
            Self::ZERO
        }
    }

    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// 2D vector (UV coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Default for Vec2 {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Rotation quaternion, stored as `[x, y, z, w]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Build a quaternion from a rotation matrix given as `m[row][col]`,
    /// where the columns are the rotated basis axes.
    pub fn from_rotation_matrix(m: [[f32; 3]; 3]) -> Self {
        let trace = m[0][0] + m[1][1] + m[2][2];

        let q = if trace > 0.0 {
            let s = 0.5 / (trace + 1.0).sqrt();
            Self::new(
                (m[2][1] - m[1][2]) * s,
                (m[0][2] - m[2][0]) * s,
                (m[1][0] - m[0][1]) * s,
                0.25 / s,
            )
        } else if m[0][0] > m[1][1] && m[0][0] > m[2][2] {
            let s = 2.0 * (1.0 + m[0][0] - m[1][1] - m[2][2]).sqrt();
            Self::new(
                0.25 * s,
                (m[0][1] + m[1][0]) / s,
                (m[0][2] + m[2][0]) / s,
                (m[2][1] - m[1][2]) / s,
            )
        } else if m[1][1] > m[2][2] {
            let s = 2.0 * (1.0 + m[1][1] - m[0][0] - m[2][2]).sqrt();
            Self::new(
                (m[0][1] + m[1][0]) / s,
                0.25 * s,
                (m[1][2] + m[2][1]) / s,
                (m[0][2] - m[2][0]) / s,
            )
        } else {
            let s = 2.0 * (1.0 + m[2][2] - m[0][0] - m[1][1]).sqrt();
            Self::new(
                (m[0][2] + m[2][0]) / s,
                (m[1][2] + m[2][1]) / s,
                0.25 * s,
                (m[1][0] - m[0][1]) / s,
            )
        };

        q.normalize()
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 && len.is_finite() {
            Self::new(self.x / len, self.y / len, self.z / len, self.w / len)
        } else {
            Self::IDENTITY
        }
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// 3x3 rotation basis as stored by RenderWare frames.
///
/// Each field is one row of the matrix: `right`, `up` and `at`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mat3 {
    pub right: Vec3,
    pub up: Vec3,
    pub at: Vec3,
}

impl Mat3 {
    pub const IDENTITY: Self = Self {
        right: Vec3::X,
        up: Vec3::Y,
        at: Vec3::Z,
    };

    pub fn new(right: Vec3, up: Vec3, at: Vec3) -> Self {
        Self { right, up, at }
    }

    /// Rows of the matrix in storage order
    pub fn rows(&self) -> [[f32; 3]; 3] {
        [self.right.to_array(), self.up.to_array(), self.at.to_array()]
    }

    /// The matrix with rows and columns swapped
    pub fn transposed(&self) -> [[f32; 3]; 3] {
        let r = self.rows();
        let mut t = [[0.0f32; 3]; 3];
        for (i, row) in r.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                t[j][i] = *value;
            }
        }
        t
    }

    /// Local rotation of the basis.
    ///
    /// The stored rows are the basis vectors, so the matrix is transposed
    /// before conversion to put them in the columns. Each axis is
    /// normalized first so a scaled basis yields its pure rotation.
    pub fn to_quaternion(&self) -> Quat {
        let unit = Self::new(self.right.normalize(), self.up.normalize(), self.at.normalize());
        Quat::from_rotation_matrix(unit.transposed())
    }
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Bounding sphere of a morph target
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Color in RGBA format (0-255 per channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self { r: 255, g: 255, b: 255, a: 255 };
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0, a: 255 };

    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Convert to normalized float values (0.0-1.0)
    pub fn to_float(&self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        ]
    }

    /// Normalized RGB, alpha dropped
    pub fn to_rgb_float(&self) -> [f32; 3] {
        let [r, g, b, _] = self.to_float();
        [r, g, b]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_quat_eq(a: Quat, b: Quat) {
        // q and -q encode the same rotation
        let same = (a.x - b.x).abs() < 1e-5
            && (a.y - b.y).abs() < 1e-5
            && (a.z - b.z).abs() < 1e-5
            && (a.w - b.w).abs() < 1e-5;
        let negated = (a.x + b.x).abs() < 1e-5
            && (a.y + b.y).abs() < 1e-5
            && (a.z + b.z).abs() < 1e-5
            && (a.w + b.w).abs() < 1e-5;
        assert!(same || negated, "{a:?} != {b:?}");
    }

    #[test]
    fn test_identity_basis_is_identity_quaternion() {
        assert_quat_eq(Mat3::IDENTITY.to_quaternion(), Quat::IDENTITY);
    }

    #[test]
    fn test_basis_rotated_about_z() {
        // x axis rotated onto y
        let basis = Mat3::new(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::Z,
        );
        let half = std::f32::consts::FRAC_1_SQRT_2;
        assert_quat_eq(basis.to_quaternion(), Quat::new(0.0, 0.0, half, half));
    }

    #[test]
    fn test_scaled_basis_keeps_rotation() {
        let basis = Mat3::new(
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(-2.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
        );
        let half = std::f32::consts::FRAC_1_SQRT_2;
        assert_quat_eq(basis.to_quaternion(), Quat::new(0.0, 0.0, half, half));
    }

    #[test]
    fn test_half_turn_about_x_uses_non_trace_branch() {
        let basis = Mat3::new(
            Vec3::X,
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(0.0, 0.0, -1.0),
        );
        assert_quat_eq(basis.to_quaternion(), Quat::new(1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_transposed_swaps_rows_and_columns() {
        let basis = Mat3::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(4.0, 5.0, 6.0),
            Vec3::new(7.0, 8.0, 9.0),
        );
        let t = basis.transposed();
        assert_eq!(t[0], [1.0, 4.0, 7.0]);
        assert_eq!(t[2], [3.0, 6.0, 9.0]);
    }

    #[test]
    fn test_degenerate_quaternion_normalizes_to_identity() {
        assert_eq!(Quat::new(0.0, 0.0, 0.0, 0.0).normalize(), Quat::IDENTITY);
    }

    #[test]
    fn test_color_rgb_float_drops_alpha() {
        let c = Color::new(255, 0, 51, 10);
        assert_eq!(c.to_rgb_float(), [1.0, 0.0, 0.2]);
    }
}
