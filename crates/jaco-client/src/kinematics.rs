//! 正运动学接口
//!
//! 笛卡尔位姿查询和平滑（笛卡尔）模式都需要把关节角换算成末端位姿。
//! 求解器是外部协作者，这里只定义接口，并提供一个标准 DH 连杆链实现。

use crate::types::{CartesianPose, EulerAngles, JointArray, KinematicsError, Position3D, Rad};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

/// 正运动学求解器
pub trait ForwardKinematics: Send + Sync {
    /// 关节角（rad）→ 末端位姿（m, rad）
    fn forward(&self, joints: &JointArray<Rad>) -> Result<CartesianPose, KinematicsError>;
}

impl<F> ForwardKinematics for F
where
    F: Fn(&JointArray<Rad>) -> Result<CartesianPose, KinematicsError> + Send + Sync,
{
    fn forward(&self, joints: &JointArray<Rad>) -> Result<CartesianPose, KinematicsError> {
        self(joints)
    }
}

/// 标准 DH 参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DhLink {
    pub a: f64,
    pub alpha: f64,
    pub d: f64,
    /// θ = direction · q + offset
    pub offset: f64,
    pub direction: f64,
}

impl DhLink {
    pub const fn new(a: f64, alpha: f64, d: f64, offset: f64) -> Self {
        Self {
            a,
            alpha,
            d,
            offset,
            direction: 1.0,
        }
    }

    pub const fn reversed(mut self) -> Self {
        self.direction = -1.0;
        self
    }

    fn transform(&self, q: f64) -> Isometry3<f64> {
        let theta = self.direction * q + self.offset;
        let about_z = Isometry3::from_parts(
            Translation3::new(0.0, 0.0, self.d),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), theta),
        );
        let about_x = Isometry3::from_parts(
            Translation3::new(self.a, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.alpha),
        );
        about_z * about_x
    }
}

/// 六连杆 DH 链
#[derive(Debug, Clone)]
pub struct DhChain {
    links: [DhLink; 6],
}

impl DhChain {
    pub fn new(links: [DhLink; 6]) -> Self {
        Self { links }
    }

    /// MICO 六自由度臂的名义连杆参数
    pub fn mico() -> Self {
        use std::f64::consts::{FRAC_PI_2, FRAC_PI_6, PI};

        const D1: f64 = 0.2755;
        const D2: f64 = 0.2900;
        const D3: f64 = 0.1233;
        const D4: f64 = 0.0741;
        const D5: f64 = 0.0741;
        const D6: f64 = 0.1600;
        const E2: f64 = 0.0070;

        // 腕部两个关节轴之间的夹角为 60°
        let aa = FRAC_PI_6;
        let ratio = aa.sin() / (2.0 * aa).sin();
        let d4b = D3 + ratio * D4;
        let d5b = ratio * D4 + ratio * D5;
        let d6b = ratio * D5 + D6;

        Self::new([
            DhLink::new(0.0, FRAC_PI_2, D1, 0.0).reversed(),
            DhLink::new(D2, PI, 0.0, -FRAC_PI_2),
            DhLink::new(0.0, FRAC_PI_2, -E2, FRAC_PI_2),
            DhLink::new(0.0, 2.0 * aa, -d4b, 0.0),
            DhLink::new(0.0, 2.0 * aa, -d5b, PI),
            DhLink::new(0.0, PI, -d6b, -FRAC_PI_2),
        ])
    }

    pub fn links(&self) -> &[DhLink; 6] {
        &self.links
    }
}

impl ForwardKinematics for DhChain {
    fn forward(&self, joints: &JointArray<Rad>) -> Result<CartesianPose, KinematicsError> {
        if joints.iter().any(|q| !q.is_finite()) {
            return Err(KinematicsError::Failed("joint angles are not finite".to_string()));
        }

        let end = self
            .links
            .iter()
            .zip(joints.iter())
            .fold(Isometry3::identity(), |acc, (link, q)| acc * link.transform(q.value()));

        let t = end.translation.vector;
        let (rx, ry, rz) = end.rotation.euler_angles();
        Ok(CartesianPose::new(
            Position3D::new(t.x, t.y, t.z),
            EulerAngles::new(rx, ry, rz),
        ))
    }
}
