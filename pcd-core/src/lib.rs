pub mod pointcloud;
pub mod stats;
