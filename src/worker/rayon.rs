use std::mem;

use rayon::prelude::*;

use crate::error::Result;
use super::immediate::ImmediateWorker;
use super::{idct_row, RowData, Worker};

/// Shares the bookkeeping of `ImmediateWorker`, but runs the IDCT of a batch of rows on the
/// rayon thread pool.
pub struct Scoped {
    inner: ImmediateWorker,
}

pub fn with_rayon<T>(f: impl FnOnce(&mut dyn Worker) -> T) -> T {
    let mut worker = Scoped {
        inner: ImmediateWorker::default(),
    };
    f(&mut worker)
}

impl Worker for Scoped {
    fn start(&mut self, row_data: RowData) -> Result<()> {
        self.inner.start_immediate(row_data);
        Ok(())
    }

    fn append_row(&mut self, row: (usize, Vec<[i32; 64]>)) -> Result<()> {
        self.inner.append_row_immediate(row)
    }

    fn get_result(&mut self, index: usize) -> Result<Vec<u8>> {
        Ok(self.inner.get_result_immediate(index))
    }

    // Magic sauce, these run in parallel.
    fn append_rows(&mut self, iter: &mut dyn Iterator<Item = (usize, Vec<[i32; 64]>)>) -> Result<()> {
        // First we schedule everything, making sure their offsets are right.
        let mut claimed = Vec::new();
        for (index, data) in iter {
            let (slot, offset) = self.inner.claim_row(index)?;
            claimed.push((index, slot, offset, data));
        }

        let results = &mut self.inner.results;

        // Then every row gets the disjoint part of its plane it writes to.
        let mut unclaimed: Vec<(&mut [u8], usize)> = results.iter_mut()
                                                            .map(|plane| (plane.as_mut_slice(), 0))
                                                            .collect();
        let mut jobs = Vec::with_capacity(claimed.len());

        for (index, slot, offset, data) in claimed {
            let metadata = slot.metadata;
            let (plane, position) = &mut unclaimed[index];
            let (_, rest) = mem::take(plane).split_at_mut(offset - *position);
            let (output, rest) = rest.split_at_mut(metadata.bytes_used());

            *plane = rest;
            *position = offset + metadata.bytes_used();
            jobs.push((metadata, slot.quantization_table, data, output));
        }

        jobs.into_par_iter().for_each(|(metadata, quantization_table, data, output)| {
            idct_row(metadata, &data, &quantization_table, output);
        });

        Ok(())
    }
}
