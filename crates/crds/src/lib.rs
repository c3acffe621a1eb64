//! KubeVirt NodePool CRD Definitions
//!
//! Kubernetes resource types read and written by the KubeVirt node pool
//! controller: HyperShift `NodePool`/`HostedCluster`, CDI `DataVolume`, KubeVirt
//! virtual machine shapes and the CAPK `KubevirtMachineTemplate`.

pub mod node_pool;
pub mod hosted_cluster;
pub mod data_volume;
pub mod kubevirt;
pub mod machine_template;
pub mod fixtures;

pub use node_pool::*;
pub use hosted_cluster::*;
pub use data_volume::*;
pub use kubevirt::*;
pub use machine_template::*;
