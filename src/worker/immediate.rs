use std::mem;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::parser::MAX_COMPONENTS;
use super::{idct_row, ComponentMetadata, RowData, Worker};

/// A started component: where its rows go and how they are dequantized.
#[derive(Clone)]
pub(super) struct ComponentSlot {
    pub(super) metadata: ComponentMetadata,
    pub(super) quantization_table: Arc<[u16; 64]>,
}

#[derive(Default)]
pub struct ImmediateWorker {
    pub(super) offsets: [usize; MAX_COMPONENTS],
    pub(super) results: [Vec<u8>; MAX_COMPONENTS],
    pub(super) slots: [Option<ComponentSlot>; MAX_COMPONENTS],
}

pub fn with_immediate<T>(f: impl FnOnce(&mut dyn Worker) -> T) -> T {
    let mut worker = ImmediateWorker::default();
    f(&mut worker)
}

impl ImmediateWorker {
    pub fn start_immediate(&mut self, data: RowData) {
        let component = &data.component;
        let elements = component.block_size.width as usize * component.block_size.height as usize * 64;

        self.offsets[data.index] = 0;
        self.results[data.index] = vec![0u8; elements];
        self.slots[data.index] = Some(ComponentSlot {
            metadata: ComponentMetadata::new(component),
            quantization_table: data.quantization_table,
        });
    }

    /// Reserves the part of the plane the next row of component `index` is written to.
    pub(super) fn claim_row(&mut self, index: usize) -> Result<(ComponentSlot, usize)> {
        let slot = self.slots.get(index)
                             .and_then(|slot| slot.clone())
                             .ok_or(Error::Internal("row for a component the worker was not started with"))?;
        let offset = self.offsets[index];
        let end = offset + slot.metadata.bytes_used();

        if end > self.results[index].len() {
            return Err(Error::Internal("more rows than the component plane holds"));
        }

        self.offsets[index] = end;
        Ok((slot, offset))
    }

    pub fn append_row_immediate(&mut self, (index, data): (usize, Vec<[i32; 64]>)) -> Result<()> {
        let (slot, offset) = self.claim_row(index)?;
        let output = &mut self.results[index][offset..offset + slot.metadata.bytes_used()];

        idct_row(slot.metadata, &data, &slot.quantization_table, output);
        Ok(())
    }

    pub fn get_result_immediate(&mut self, index: usize) -> Vec<u8> {
        mem::take(&mut self.results[index])
    }
}

impl Worker for ImmediateWorker {
    fn start(&mut self, data: RowData) -> Result<()> {
        self.start_immediate(data);
        Ok(())
    }
    fn append_row(&mut self, row: (usize, Vec<[i32; 64]>)) -> Result<()> {
        self.append_row_immediate(row)
    }
    fn get_result(&mut self, index: usize) -> Result<Vec<u8>> {
        Ok(self.get_result_immediate(index))
    }
}
