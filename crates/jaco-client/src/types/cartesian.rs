//! 笛卡尔空间类型
//!
//! 位姿用位置（米）+ 欧拉角（弧度，XYZ 顺序）表示，与厂商笛卡尔接口一致。

/// 3D 位置（米）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position3D {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Position3D { x, y, z }
    }

    pub fn distance(&self, other: &Position3D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// 欧拉角（弧度）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
}

impl EulerAngles {
    pub const fn new(rx: f64, ry: f64, rz: f64) -> Self {
        EulerAngles { rx, ry, rz }
    }

    /// 各轴最短角距离中的最大值
    pub fn max_angle_to(&self, other: &EulerAngles) -> f64 {
        use crate::types::Rad;
        [
            Rad(self.rx).shortest_to(Rad(other.rx)),
            Rad(self.ry).shortest_to(Rad(other.ry)),
            Rad(self.rz).shortest_to(Rad(other.rz)),
        ]
        .iter()
        .fold(0.0, |m, a| m.max(a.0.abs()))
    }
}

/// 末端位姿
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CartesianPose {
    pub position: Position3D,
    pub orientation: EulerAngles,
}

impl CartesianPose {
    pub const fn new(position: Position3D, orientation: EulerAngles) -> Self {
        CartesianPose {
            position,
            orientation,
        }
    }

    /// 从厂商格式 `[x, y, z, θx, θy, θz]` 构造
    pub fn from_array(a: [f64; 6]) -> Self {
        CartesianPose {
            position: Position3D::new(a[0], a[1], a[2]),
            orientation: EulerAngles::new(a[3], a[4], a[5]),
        }
    }

    /// 转为厂商格式 `[x, y, z, θx, θy, θz]`
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.position.x,
            self.position.y,
            self.position.z,
            self.orientation.rx,
            self.orientation.ry,
            self.orientation.rz,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// 是否在给定的平移/旋转容差内
    pub fn within(&self, other: &CartesianPose, position_tol: f64, orientation_tol: f64) -> bool {
        self.position.distance(&other.position) <= position_tol
            && self.orientation.max_angle_to(&other.orientation) <= orientation_tol
    }
}
