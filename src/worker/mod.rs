mod immediate;
#[cfg(feature = "rayon")]
mod rayon;

use std::sync::Arc;

use crate::error::Result;
use crate::idct::dequantize_and_idct_block;
use crate::parser::Component;

pub struct RowData {
    pub index: usize,
    pub component: Component,
    pub quantization_table: Arc<[u16; 64]>,
}

/// Turns rows of dequantized blocks into component planes.
///
/// A row is one MCU row of a single component: its blocks in raster order, `block_size.width`
/// blocks per line and `vertical_sampling_factor` lines.
pub trait Worker {
    fn start(&mut self, row_data: RowData) -> Result<()>;
    fn append_row(&mut self, row: (usize, Vec<[i32; 64]>)) -> Result<()>;
    fn get_result(&mut self, index: usize) -> Result<Vec<u8>>;
    /// Default implementation for spawning multiple tasks.
    fn append_rows(&mut self, row: &mut dyn Iterator<Item = (usize, Vec<[i32; 64]>)>) -> Result<()> {
        for item in row {
            self.append_row(item)?;
        }
        Ok(())
    }
}

pub enum PreferWorkerKind {
    Immediate,
    Multithreaded,
}

/// Execute something with a worker system.
pub fn with_worker<T>(prefer: PreferWorkerKind, f: impl FnOnce(&mut dyn Worker) -> T) -> T {
    match prefer {
        #[cfg(feature = "rayon")]
        PreferWorkerKind::Multithreaded => self::rayon::with_rayon(f),
        _ => self::immediate::with_immediate(f),
    }
}

#[derive(Clone, Copy)]
pub struct ComponentMetadata {
    block_width: usize,
    block_count: usize,
    line_stride: usize,
}

impl ComponentMetadata {
    fn new(component: &Component) -> ComponentMetadata {
        let block_width = component.block_size.width as usize;

        ComponentMetadata {
            block_width,
            block_count: block_width * component.vertical_sampling_factor as usize,
            line_stride: block_width * 8,
        }
    }

    fn bytes_used(&self) -> usize {
        self.block_count * 64
    }
}

/// Converts the coefficients of one MCU row to samples. `output` starts at the first line of
/// the row within the component plane.
fn idct_row(metadata: ComponentMetadata, blocks: &[[i32; 64]], quantization_table: &[u16; 64], output: &mut [u8]) {
    debug_assert_eq!(blocks.len(), metadata.block_count);

    for (i, coefficients) in blocks.iter().enumerate() {
        let x = (i % metadata.block_width) * 8;
        let y = (i / metadata.block_width) * 8;

        dequantize_and_idct_block(coefficients, quantization_table, metadata.line_stride,
                                  &mut output[y * metadata.line_stride + x..]);
    }
}
