//! 命令定义和实现

pub mod config;
pub mod gripper;
pub mod home;
pub mod r#move;
pub mod state;

pub use config::ConfigCommand;
pub use gripper::GripperCommand;
pub use r#move::MoveCommand;
pub use state::StateCommand;
