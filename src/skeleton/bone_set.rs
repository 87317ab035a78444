//! 骨骼集合
//!
//! 类似 nphysics Multibody：按拓扑顺序存放 BoneLink（父索引总是小于子索引），
//! 构建时一次性计算全局绑定矩阵、逆绑定矩阵和子节点缓存，之后只读。

use glam::Mat4;

use super::bone_link::BoneLink;
use crate::{PhysGenError, Result};

/// 骨骼集合
#[derive(Clone, Debug)]
pub struct BoneSet {
    /// 所有骨骼（拓扑有序）
    bones: Vec<BoneLink>,
    /// 子节点缓存
    children_cache: Vec<Vec<usize>>,
    /// 根骨骼列表
    roots: Vec<usize>,
}

impl BoneSet {
    /// 从骨骼列表构建
    ///
    /// 要求：父索引 < 子索引，至少存在一个根骨骼，绑定矩阵可逆。
    pub fn new(mut bones: Vec<BoneLink>) -> Result<Self> {
        if bones.is_empty() {
            return Err(PhysGenError::InvalidSkeleton("skeleton has no bones".into()));
        }

        let mut children_cache = vec![Vec::new(); bones.len()];
        let mut roots = Vec::new();

        for i in 0..bones.len() {
            bones[i].internal_id = i;
            let parent_bind = match bones[i].parent_index {
                Some(p) if p >= i => {
                    return Err(PhysGenError::InvalidSkeleton(format!(
                        "bone {} ('{}') has parent {} which does not precede it",
                        i, bones[i].name, p
                    )));
                }
                Some(p) => {
                    children_cache[p].push(i);
                    bones[p].bind_matrix
                }
                None => {
                    roots.push(i);
                    Mat4::IDENTITY
                }
            };

            let bind = parent_bind * bones[i].local_bind.to_matrix();
            if bind.determinant().abs() <= f32::EPSILON {
                return Err(PhysGenError::InvalidSkeleton(format!(
                    "bone {} ('{}') has a singular bind matrix",
                    i, bones[i].name
                )));
            }
            bones[i].bind_matrix = bind;
            bones[i].inverse_bind = bind.inverse();
        }

        if roots.len() > 1 {
            log::debug!("[PhysGen] 骨骼包含 {} 个根节点，按独立的树处理", roots.len());
        }

        Ok(Self { bones, children_cache, roots })
    }

    /// 骨骼数量
    #[inline]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// 获取骨骼
    #[inline]
    pub fn get(&self, index: usize) -> Option<&BoneLink> {
        self.bones.get(index)
    }

    /// 所有骨骼
    #[inline]
    pub fn bones(&self) -> &[BoneLink] {
        &self.bones
    }

    /// 父骨骼索引
    #[inline]
    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.bones.get(index).and_then(|b| b.parent_index)
    }

    /// 子骨骼列表
    #[inline]
    pub fn children_of(&self, index: usize) -> &[usize] {
        self.children_cache.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 根骨骼列表
    #[inline]
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// 按名称查找骨骼
    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// 绑定矩阵（骨骼空间 → 网格空间）
    #[inline]
    pub fn bind_matrix(&self, index: usize) -> Mat4 {
        self.bones[index].bind_matrix
    }

    /// 逆绑定矩阵（网格空间 → 骨骼空间）
    #[inline]
    pub fn inverse_bind_matrix(&self, index: usize) -> Mat4 {
        self.bones[index].inverse_bind
    }

    /// `from` 骨骼空间 → `to` 骨骼空间 的绑定姿态相对变换
    #[inline]
    pub fn relative_transform(&self, from: usize, to: usize) -> Mat4 {
        self.bones[to].inverse_bind * self.bones[from].bind_matrix
    }

    /// 沿父链向上遍历（不含自身）
    pub fn ancestors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.parent_of(index), move |&i| self.parent_of(i))
    }

    /// 所在树的根骨骼
    pub fn root_of(&self, index: usize) -> usize {
        self.ancestors(index).last().unwrap_or(index)
    }

    /// `ancestor` 是否为 `index` 自身或其祖先
    pub fn is_ancestor_or_self(&self, ancestor: usize, index: usize) -> bool {
        index == ancestor || self.ancestors(index).any(|a| a == ancestor)
    }

    /// 最近公共祖先（含自身）；不在同一棵树时返回 None
    pub fn common_ancestor(&self, a: usize, b: usize) -> Option<usize> {
        // 拓扑有序：不断把索引较大的一侧上移
        let (mut a, mut b) = (a, b);
        while a != b {
            if a > b {
                a = self.parent_of(a)?;
            } else {
                b = self.parent_of(b)?;
            }
        }
        Some(a)
    }
}
