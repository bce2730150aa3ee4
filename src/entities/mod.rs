pub mod frame;
pub mod subscription;
pub mod user;
