pub mod cluster;
pub mod histogram;

pub use cluster::{CalibrationParams, Cluster, ClusterSet, RoleMap, RoledCluster};
pub use histogram::{CountMap, Peak, PositionHistogram};
