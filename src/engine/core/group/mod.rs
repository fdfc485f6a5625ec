mod group_key;
mod partition;

pub use group_key::{GroupKey, GroupValue};
pub use partition::{Partition, Partitioner, Partitioning};
