//! 主轴分析：协方差矩阵 + 幂迭代求主特征向量

use glam::{Mat3, Quat, Vec3};

/// 幂迭代次数
pub const POWER_ITERATIONS: usize = 32;

/// 点集关于均值的协方差矩阵（除以点数）；少于 2 个点时为零矩阵
pub fn covariance(points: &[Vec3]) -> Mat3 {
    if points.len() < 2 {
        return Mat3::ZERO;
    }
    let n = points.len() as f32;
    let mean = points.iter().copied().sum::<Vec3>() / n;

    let (mut xx, mut xy, mut xz, mut yy, mut yz, mut zz) = (0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    for p in points {
        let d = *p - mean;
        xx += d.x * d.x;
        xy += d.x * d.y;
        xz += d.x * d.z;
        yy += d.y * d.y;
        yz += d.y * d.z;
        zz += d.z * d.z;
    }

    Mat3::from_cols(
        Vec3::new(xx, xy, xz) / n,
        Vec3::new(xy, yy, yz) / n,
        Vec3::new(xz, yz, zz) / n,
    )
}

/// 对称矩阵的主特征向量（固定次数幂迭代）
///
/// 结果为单位向量，符号规范为绝对值最大的分量为正；
/// 矩阵退化（迭代向量塌缩为零）时返回 Z 轴。
pub fn dominant_eigenvector(m: Mat3) -> Vec3 {
    // 任意但不与坐标轴对齐的初值
    let mut v = Vec3::new(0.6, 0.5, 0.62).normalize();

    for _ in 0..POWER_ITERATIONS {
        let next = m * v;
        let len = next.length();
        if !len.is_finite() || len <= f32::MIN_POSITIVE {
            return Vec3::Z;
        }
        v = next / len;
    }

    canonical_sign(v)
}

/// 以 `axis` 为 Z 轴补全右手正交坐标系
pub fn frame_from_axis(axis: Vec3) -> Quat {
    let z = axis.normalize_or_zero();
    if z == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let x = z.any_orthonormal_vector();
    let y = z.cross(x);
    Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize()
}

fn canonical_sign(v: Vec3) -> Vec3 {
    let a = v.abs();
    let major = if a.x >= a.y && a.x >= a.z {
        v.x
    } else if a.y >= a.z {
        v.y
    } else {
        v.z
    };
    if major < 0.0 {
        -v
    } else {
        v
    }
}
