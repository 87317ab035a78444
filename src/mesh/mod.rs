//! 蒙皮网格输入数据

use glam::Vec3;

use crate::{PhysGenError, Result};

/// 单个骨骼影响（权重由调用方归一化）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneInfluence {
    pub bone: usize,
    pub weight: f32,
}

impl BoneInfluence {
    pub fn new(bone: usize, weight: f32) -> Self {
        Self { bone, weight }
    }
}

/// 蒙皮顶点（网格空间，绑定姿态）
#[derive(Clone, Debug, Default)]
pub struct SkinnedVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub influences: Vec<BoneInfluence>,
}

impl SkinnedVertex {
    pub fn new(position: Vec3, normal: Vec3, influences: Vec<BoneInfluence>) -> Self {
        Self { position, normal, influences }
    }

    /// 只受单根骨骼影响的顶点
    pub fn rigid(position: Vec3, normal: Vec3, bone: usize) -> Self {
        Self::new(position, normal, vec![BoneInfluence::new(bone, 1.0)])
    }

    /// 是否有任何非零权重
    #[inline]
    pub fn is_weighted(&self) -> bool {
        self.influences.iter().any(|inf| inf.weight > 0.0)
    }
}

/// 蒙皮网格
#[derive(Clone, Debug, Default)]
pub struct SkinnedMesh {
    pub vertices: Vec<SkinnedVertex>,
    /// 三角形索引（每 3 个一组）
    pub indices: Vec<u32>,
}

impl SkinnedMesh {
    pub fn new(vertices: Vec<SkinnedVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// 三角形数量
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// 第 `t` 个三角形的顶点索引
    #[inline]
    pub fn triangle(&self, t: usize) -> [usize; 3] {
        let i = t * 3;
        [
            self.indices[i] as usize,
            self.indices[i + 1] as usize,
            self.indices[i + 2] as usize,
        ]
    }

    /// 检查网格是否可用于生成
    ///
    /// 无三角形、索引越界、无任何带权重顶点均视为退化网格。
    pub fn validate(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            return Err(PhysGenError::DegenerateMesh(format!(
                "index buffer length {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        if self.triangle_count() == 0 {
            return Err(PhysGenError::DegenerateMesh("mesh has no triangles".into()));
        }
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= self.vertices.len()) {
            return Err(PhysGenError::DegenerateMesh(format!(
                "index {} out of range ({} vertices)",
                bad,
                self.vertices.len()
            )));
        }
        if !self.vertices.iter().any(SkinnedVertex::is_weighted) {
            return Err(PhysGenError::DegenerateMesh("mesh has no weighted vertices".into()));
        }
        Ok(())
    }
}
