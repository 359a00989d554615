use cgmath::{vec3, vec4, InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix, Vector2, Vector3, Vector4};

pub type Vec2 = Vector2<f32>;
pub type Vec3 = Vector3<f32>;
pub type Vec4 = Vector4<f32>;
pub type UVec2 = Vector2<u32>;

/// Row-major 3x4 affine transform `[R|t]` with an implicit `(0,0,0,1)`
/// bottom row. The row layout matches the packed instance transform of
/// hardware acceleration structures, so the twelve floats can be copied into
/// an API-side staging buffer verbatim.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat3x4 {
    pub rows: [Vec4; 3],
}

impl Mat3x4 {
    pub const IDENTITY: Mat3x4 = Mat3x4 {
        rows: [
            Vector4 { x: 1.0, y: 0.0, z: 0.0, w: 0.0 },
            Vector4 { x: 0.0, y: 1.0, z: 0.0, w: 0.0 },
            Vector4 { x: 0.0, y: 0.0, z: 1.0, w: 0.0 },
        ],
    };

    pub fn from_translation(t: Vec3) -> Mat3x4 {
        Mat3x4 {
            rows: [
                vec4(1.0, 0.0, 0.0, t.x),
                vec4(0.0, 1.0, 0.0, t.y),
                vec4(0.0, 0.0, 1.0, t.z),
            ],
        }
    }

    /// Converts a column-major 4x4 by transposing its upper 3x4 block. The
    /// projective bottom row is dropped.
    pub fn from_mat4(m: Matrix4<f32>) -> Mat3x4 {
        Mat3x4 {
            rows: [
                vec4(m.x.x, m.y.x, m.z.x, m.w.x),
                vec4(m.x.y, m.y.y, m.z.y, m.w.y),
                vec4(m.x.z, m.y.z, m.z.z, m.w.z),
            ],
        }
    }

    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        vec3(
            self.rows[0].truncate().dot(p) + self.rows[0].w,
            self.rows[1].truncate().dot(p) + self.rows[1].w,
            self.rows[2].truncate().dot(p) + self.rows[2].w,
        )
    }

    /// Applies the linear part only; translation does not act on vectors.
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        vec3(
            self.rows[0].truncate().dot(v),
            self.rows[1].truncate().dot(v),
            self.rows[2].truncate().dot(v),
        )
    }

    /// The linear 3x3 part as a column-major cgmath matrix.
    pub fn linear(&self) -> Matrix3<f32> {
        Matrix3::from_cols(
            vec3(self.rows[0].x, self.rows[1].x, self.rows[2].x),
            vec3(self.rows[0].y, self.rows[1].y, self.rows[2].y),
            vec3(self.rows[0].z, self.rows[1].z, self.rows[2].z),
        )
    }

    pub fn translation(&self) -> Vec3 {
        vec3(self.rows[0].w, self.rows[1].w, self.rows[2].w)
    }

    /// Affine inverse: invert the linear part, then counter-transform the
    /// translation. The linear part must be invertible.
    pub fn inverse(&self) -> Mat3x4 {
        let inv = self
            .linear()
            .invert()
            .expect("instance transform is singular");
        let t = -(inv * self.translation());
        // Columns of the transpose are the rows of `inv`.
        let rows = inv.transpose();
        Mat3x4 {
            rows: [
                vec4(rows.x.x, rows.x.y, rows.x.z, t.x),
                vec4(rows.y.x, rows.y.y, rows.y.z, t.y),
                vec4(rows.z.x, rows.z.y, rows.z.z, t.z),
            ],
        }
    }
}
