pub mod frequency;
pub mod time_bucketing;

pub use frequency::{Frequency, FrequencyUnit};
pub use time_bucketing::{BucketLabel, TimeBucket, TimeBucketer, bucket_of};

#[cfg(test)]
mod frequency_test;
