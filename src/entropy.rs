use log::debug;

use crate::bit_reader::BitReader;
use crate::error::{EntropyError, Error, Result, StructuralError, TableClass};
use crate::huffman::HuffmanTable;
use crate::parser::{FrameInfo, ScanInfo, UNZIGZAG, MAX_COMPONENTS};

/// The DC coefficient category of a baseline (8 bit) image is at most 11.
const MAX_DC_LENGTH: u8 = 11;
const MAX_AC_LENGTH: u8 = 10;

/// Coefficients of every block of the image, in the order the scan codes them.
///
/// Each MCU holds `blocks_per_mcu` blocks: for every component in scan order, `h * v` blocks in
/// raster order within the MCU. Coefficients are in natural (row-major) order, not yet
/// dequantized.
#[derive(Debug)]
pub struct McuGrid {
    pub mcus_wide: usize,
    pub mcus_high: usize,
    pub blocks_per_mcu: usize,
    pub blocks: Vec<[i32; 64]>,
}

/// Where the blocks of one component sit within an MCU.
#[derive(Clone, Copy, Debug)]
pub struct BlockLayout {
    pub component_index: usize,
    pub offset: usize,
    pub horizontal_blocks: usize,
    pub vertical_blocks: usize,
}

impl McuGrid {
    pub fn mcu(&self, index: usize) -> &[[i32; 64]] {
        &self.blocks[index * self.blocks_per_mcu..(index + 1) * self.blocks_per_mcu]
    }
}

/// Block layout of the components a scan codes, in scan order.
pub fn block_layout(frame: &FrameInfo, scan: &ScanInfo) -> Vec<BlockLayout> {
    let mut offset = 0;

    scan.component_indices.iter()
        .filter_map(|&index| frame.components[index].as_ref().map(|component| (index, component)))
        .map(|(index, component)| {
            let layout = BlockLayout {
                component_index: index,
                offset,
                horizontal_blocks: component.horizontal_sampling_factor as usize,
                vertical_blocks: component.vertical_sampling_factor as usize,
            };
            offset += layout.horizontal_blocks * layout.vertical_blocks;
            layout
        })
        .collect()
}

/// Decodes every MCU of a scan from de-stuffed entropy-coded data.
// Section F.2.2
pub fn decode_mcus(frame: &FrameInfo,
                   scan: &ScanInfo,
                   dc_tables: &[Option<HuffmanTable>; 4],
                   ac_tables: &[Option<HuffmanTable>; 4],
                   restart_interval: u16,
                   data: &[u8]) -> Result<McuGrid> {
    let layout = block_layout(frame, scan);
    let mut tables = Vec::with_capacity(layout.len());

    for block in &layout {
        let component = frame.components[block.component_index].as_ref()
                                                                .ok_or(StructuralError::InvalidComponentId(block.component_index as u8 + 1))?;
        let dc_table = dc_tables[component.dc_table_index].as_ref().ok_or(StructuralError::UninitializedTable {
            class: TableClass::HuffmanDc,
            id: component.dc_table_index as u8,
        })?;
        let ac_table = ac_tables[component.ac_table_index].as_ref().ok_or(StructuralError::UninitializedTable {
            class: TableClass::HuffmanAc,
            id: component.ac_table_index as u8,
        })?;
        tables.push((dc_table, ac_table));
    }

    let mcus_wide = frame.mcu_size.width as usize;
    let mcus_high = frame.mcu_size.height as usize;
    let blocks_per_mcu: usize = layout.iter().map(|block| block.horizontal_blocks * block.vertical_blocks).sum();
    let mcu_count = mcus_wide * mcus_high;
    let block_count = mcu_count * blocks_per_mcu;

    // Every block codes at least a DC length and an end of block, one bit each.
    if block_count.saturating_mul(2) > data.len().saturating_mul(8) {
        debug!("{} blocks cannot fit in {} bytes of entropy-coded data", block_count, data.len());
        return Err(Error::Entropy(EntropyError::EndOfData));
    }

    let mut blocks = vec![[0i32; 64]; block_count];
    let mut reader = BitReader::new(data);
    let mut dc_predictors = [0i32; MAX_COMPONENTS];

    for (mcu_index, mcu) in blocks.chunks_exact_mut(blocks_per_mcu).enumerate() {
        if restart_interval != 0 && mcu_index % restart_interval as usize == 0 {
            // Section F.2.1.3.1
            // Restart markers are dropped during extraction, the data of each interval starts
            // on a byte boundary.
            reader.align();
            dc_predictors = [0i32; MAX_COMPONENTS];
        }

        for (i, block) in layout.iter().enumerate() {
            let (dc_table, ac_table) = tables[i];
            let count = block.horizontal_blocks * block.vertical_blocks;

            for coefficients in &mut mcu[block.offset..block.offset + count] {
                decode_block(&mut reader, coefficients, dc_table, ac_table, &mut dc_predictors[i])
                    .map_err(|error| {
                        debug!("entropy decoding failed in MCU {} of {}: {}", mcu_index, mcu_count, error);
                        Error::Entropy(error)
                    })?;
            }
        }
    }

    if reader.remaining() >= 8 {
        debug!("{} bits of entropy-coded data left after the last MCU", reader.remaining());
    }

    Ok(McuGrid {
        mcus_wide,
        mcus_high,
        blocks_per_mcu,
        blocks,
    })
}

/// Decodes one block into `coefficients` (zero on entry) and updates the DC predictor of its
/// component.
// Section F.2.2.1, F.2.2.2
pub fn decode_block(reader: &mut BitReader,
                    coefficients: &mut [i32; 64],
                    dc_table: &HuffmanTable,
                    ac_table: &HuffmanTable,
                    dc_predictor: &mut i32) -> std::result::Result<(), EntropyError> {
    let length = dc_table.decode(reader)?;
    if length > MAX_DC_LENGTH {
        return Err(EntropyError::DcLengthOutOfRange(length));
    }

    let diff = receive_extend(reader, length)?;
    *dc_predictor = dc_predictor.wrapping_add(diff);
    coefficients[0] = *dc_predictor;

    let mut index = 1u8;

    // Section F.1.2.2.1
    while index < 64 {
        let symbol = ac_table.decode(reader)?;

        // End of block, the rest stays zero.
        if symbol == 0x00 {
            break;
        }

        let run = match symbol {
            0xF0 => 16,
            _ => symbol >> 4,
        };
        let length = symbol & 0x0f;

        if index as usize + run as usize >= 64 {
            return Err(EntropyError::ZeroRunOverflow { position: index, run });
        }
        index += run;

        if length > MAX_AC_LENGTH {
            return Err(EntropyError::AcLengthOutOfRange(length));
        }

        if length != 0 {
            coefficients[UNZIGZAG[index as usize] as usize] = receive_extend(reader, length)?;
            index += 1;
        }
    }

    Ok(())
}

/// Reads a `length` bit magnitude and sign-extends it.
// Section F.2.2.1
fn receive_extend(reader: &mut BitReader, length: u8) -> std::result::Result<i32, EntropyError> {
    if length == 0 {
        return Ok(0);
    }

    let value = reader.read_bits(length).ok_or(EntropyError::EndOfData)? as i32;
    Ok(extend(value, length))
}

// Figure F.12
fn extend(value: i32, count: u8) -> i32 {
    let vt = 1 << (count as u16 - 1);

    if value < vt {
        value + (-1 << count as i32) + 1
    } else {
        value
    }
}
