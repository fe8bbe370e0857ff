//! 关节索引和数组
//!
//! 提供编译期安全的关节索引，并区分大、小两类执行器（速度上限不同）。
//!
//! # 示例
//!
//! ```rust
//! use jaco_client::types::{ActuatorClass, Joint, JointArray, Rad};
//!
//! let positions = JointArray::new([Rad(0.0), Rad(0.1), Rad(0.2), Rad(0.3), Rad(0.4), Rad(0.5)]);
//! assert_eq!(positions[Joint::J2], Rad(0.1));
//! assert_eq!(Joint::J4.actuator_class(), ActuatorClass::Small);
//! ```

use std::fmt;
use std::ops::{Index, IndexMut};

/// 执行器类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActuatorClass {
    /// 关节 1-3
    Large,
    /// 关节 4-6
    Small,
}

/// 手臂关节
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    /// 基座
    J1 = 0,
    /// 肩
    J2 = 1,
    /// 肘
    J3 = 2,
    /// 腕 1
    J4 = 3,
    /// 腕 2
    J5 = 4,
    /// 手
    J6 = 5,
}

impl Joint {
    pub const ALL: [Joint; 6] = [
        Joint::J1,
        Joint::J2,
        Joint::J3,
        Joint::J4,
        Joint::J5,
        Joint::J6,
    ];

    /// 获取关节索引（0-5）
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Joint::J1 => "J1",
            Joint::J2 => "J2",
            Joint::J3 => "J3",
            Joint::J4 => "J4",
            Joint::J5 => "J5",
            Joint::J6 => "J6",
        }
    }

    pub const fn actuator_class(self) -> ActuatorClass {
        match self {
            Joint::J1 | Joint::J2 | Joint::J3 => ActuatorClass::Large,
            Joint::J4 | Joint::J5 | Joint::J6 => ActuatorClass::Small,
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 6 关节数组
#[derive(Debug, Clone, PartialEq)]
pub struct JointArray<T> {
    data: [T; 6],
}

impl<T: Copy> Copy for JointArray<T> {}

impl<T> JointArray<T> {
    #[inline]
    pub const fn new(data: [T; 6]) -> Self {
        JointArray { data }
    }

    #[inline]
    pub fn as_array(&self) -> &[T; 6] {
        &self.data
    }

    #[inline]
    pub fn into_array(self) -> [T; 6] {
        self.data
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn map<U, F>(self, f: F) -> JointArray<U>
    where
        F: FnMut(T) -> U,
    {
        JointArray {
            data: self.data.map(f),
        }
    }

    /// 带关节信息的映射
    pub fn map_with_joint<U, F>(self, mut f: F) -> JointArray<U>
    where
        F: FnMut(Joint, T) -> U,
    {
        let [a, b, c, d, e, g] = self.data;
        JointArray::new([
            f(Joint::J1, a),
            f(Joint::J2, b),
            f(Joint::J3, c),
            f(Joint::J4, d),
            f(Joint::J5, e),
            f(Joint::J6, g),
        ])
    }

    /// 与另一个数组逐元素组合
    pub fn map_with<U, V, F>(self, other: JointArray<U>, mut f: F) -> JointArray<V>
    where
        F: FnMut(T, U) -> V,
    {
        let [a1, b1, c1, d1, e1, f1] = self.data;
        let [a2, b2, c2, d2, e2, f2] = other.data;
        JointArray::new([
            f(a1, a2),
            f(b1, b2),
            f(c1, c2),
            f(d1, d2),
            f(e1, e2),
            f(f1, f2),
        ])
    }
}

impl<T: Copy> JointArray<T> {
    #[inline]
    pub const fn splat(value: T) -> Self {
        JointArray { data: [value; 6] }
    }
}

impl JointArray<f64> {
    /// 各分量绝对值之和
    pub fn l1_norm(&self) -> f64 {
        self.data.iter().map(|v| v.abs()).sum()
    }

    /// 最大绝对值
    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |m, v| m.max(v.abs()))
    }
}

impl<T: Default> Default for JointArray<T> {
    fn default() -> Self {
        JointArray {
            data: Default::default(),
        }
    }
}

impl<T> Index<Joint> for JointArray<T> {
    type Output = T;
    #[inline]
    fn index(&self, joint: Joint) -> &T {
        &self.data[joint.index()]
    }
}

impl<T> IndexMut<Joint> for JointArray<T> {
    #[inline]
    fn index_mut(&mut self, joint: Joint) -> &mut T {
        &mut self.data[joint.index()]
    }
}

impl<T> Index<usize> for JointArray<T> {
    type Output = T;
    #[inline]
    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

impl<T> IndexMut<usize> for JointArray<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.data[index]
    }
}

impl<T> From<[T; 6]> for JointArray<T> {
    #[inline]
    fn from(data: [T; 6]) -> Self {
        JointArray { data }
    }
}

impl<T> IntoIterator for JointArray<T> {
    type Item = T;
    type IntoIter = std::array::IntoIter<T, 6>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a JointArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}
