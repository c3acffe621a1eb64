//! Prints the CRDs owned by this project as a multi-document YAML stream.

use crds::{HostedCluster, NodePool};
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    let documents = [
        serde_yaml::to_string(&NodePool::crd())?,
        serde_yaml::to_string(&HostedCluster::crd())?,
    ];
    for document in documents {
        println!("---");
        print!("{}", document);
    }
    Ok(())
}
