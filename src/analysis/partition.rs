//! Region partitioning.

use crate::models::{Partition, PartitionRow, Record, Region};
use std::cmp::Reverse;

/// USA and Germany partitions of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionSet {
    pub usa: Partition,
    pub germany: Partition,
}

impl PartitionSet {
    pub fn get(&self, region: Region) -> &Partition {
        match region {
            Region::Usa => &self.usa,
            Region::Germany => &self.germany,
        }
    }

    /// Partitions in report order.
    pub fn iter(&self) -> impl Iterator<Item = &Partition> {
        Region::ALL.into_iter().map(move |r| self.get(r))
    }

    pub fn total_records(&self) -> usize {
        self.usa.len() + self.germany.len()
    }
}

/// Split classified records by region, sort each side oldest first and number it.
pub fn partition_records(records: Vec<Record>) -> PartitionSet {
    let (usa, germany): (Vec<Record>, Vec<Record>) =
        records.into_iter().partition(|r| r.region == Region::Usa);

    PartitionSet {
        usa: build_partition(Region::Usa, usa),
        germany: build_partition(Region::Germany, germany),
    }
}

fn build_partition(region: Region, mut records: Vec<Record>) -> Partition {
    if records.is_empty() {
        return Partition::empty(region);
    }

    // Stable, so equal ages keep input order.
    records.sort_by_key(|r| Reverse(r.days_open()));

    let rows = records
        .into_iter()
        .enumerate()
        .map(|(i, record)| PartitionRow {
            sr_no: i + 1,
            record,
        })
        .collect();

    Partition { region, rows }
}
