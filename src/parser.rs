use std::sync::Arc;

use log::{debug, trace, warn};

use crate::error::{Error, Result, StructuralError, TableClass, UnsupportedFeature};
use crate::huffman::{HuffmanTable, HuffmanTableClass, MAX_SYMBOLS};
use crate::marker::Marker;
use crate::reader::JpegRead;

/// Components are addressed by their normalized 1-based id, so the table has one slot per id.
pub const MAX_COMPONENTS: usize = 3;

pub static UNZIGZAG: [u8; 64] = [
     0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u16,
    pub height: u16,
}

#[derive(Clone, Debug)]
pub struct Component {
    /// Normalized to 1-based numbering.
    pub identifier: u8,

    pub horizontal_sampling_factor: u8,
    pub vertical_sampling_factor: u8,

    pub quantization_table_index: usize,
    // Assigned by the scan header.
    pub dc_table_index: usize,
    pub ac_table_index: usize,

    /// Size of the component in samples.
    pub size: Dimensions,
    /// Size of the component in blocks, padded to whole MCUs.
    pub block_size: Dimensions,
}

#[derive(Clone, Debug)]
pub struct FrameInfo {
    pub image_size: Dimensions,
    /// Number of MCUs horizontally and vertically.
    pub mcu_size: Dimensions,
    pub max_horizontal_sampling_factor: u8,
    pub max_vertical_sampling_factor: u8,

    /// Indexed by component id - 1.
    pub components: [Option<Component>; MAX_COMPONENTS],
    pub component_count: u8,
    pub zero_based_ids: bool,
}

#[derive(Clone, Debug)]
pub struct ScanInfo {
    /// Indices into `FrameInfo::components`, in the order the scan codes them.
    pub component_indices: Vec<usize>,
}

/// Everything the marker segments before the entropy-coded data define.
#[derive(Default)]
pub struct Header {
    pub frame: Option<FrameInfo>,
    pub quantization_tables: [Option<Arc<[u16; 64]>>; 4],
    pub dc_huffman_tables: [Option<HuffmanTable>; 4],
    pub ac_huffman_tables: [Option<HuffmanTable>; 4],
    /// MCUs between restart markers, 0 if restarts are disabled.
    pub restart_interval: u16,
    pub scan: Option<ScanInfo>,
}

impl FrameInfo {
    /// Present components in id order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().flatten()
    }

    fn update_geometry(&mut self) {
        let h_max = self.components().map(|c| c.horizontal_sampling_factor).max().unwrap_or(1);
        let v_max = self.components().map(|c| c.vertical_sampling_factor).max().unwrap_or(1);

        self.max_horizontal_sampling_factor = h_max;
        self.max_vertical_sampling_factor = v_max;
        self.mcu_size = Dimensions {
            width: ceil_div(self.image_size.width as u32, 8 * h_max as u32) as u16,
            height: ceil_div(self.image_size.height as u32, 8 * v_max as u32) as u16,
        };

        let image_size = self.image_size;
        let mcu_size = self.mcu_size;

        for component in self.components.iter_mut().flatten() {
            let h = component.horizontal_sampling_factor as u32;
            let v = component.vertical_sampling_factor as u32;

            component.size = Dimensions {
                width: ceil_div(image_size.width as u32 * h, h_max as u32) as u16,
                height: ceil_div(image_size.height as u32 * v, v_max as u32) as u16,
            };
            component.block_size = Dimensions {
                width: (mcu_size.width as u32 * h) as u16,
                height: (mcu_size.height as u32 * v) as u16,
            };
        }
    }
}

impl Header {
    /// Checks made once the whole header is known: the component count and that every table a
    /// scan component uses has been defined.
    pub fn validate(&self) -> Result<()> {
        let frame = self.frame.as_ref().ok_or(StructuralError::NoFrame)?;
        let scan = self.scan.as_ref().ok_or(StructuralError::NoFrame)?;

        if frame.component_count != 1 && frame.component_count != 3 {
            return Err(Error::Structural(StructuralError::InvalidComponentCount(frame.component_count)));
        }

        for &index in &scan.component_indices {
            let component = frame.components[index].as_ref().ok_or(StructuralError::InvalidComponentId(index as u8 + 1))?;

            if self.quantization_tables[component.quantization_table_index].is_none() {
                return Err(uninitialized(TableClass::Quantization, component.quantization_table_index));
            }
            if self.dc_huffman_tables[component.dc_table_index].is_none() {
                return Err(uninitialized(TableClass::HuffmanDc, component.dc_table_index));
            }
            if self.ac_huffman_tables[component.ac_table_index].is_none() {
                return Err(uninitialized(TableClass::HuffmanAc, component.ac_table_index));
            }
        }

        Ok(())
    }

    /// Logs the parsed header, one line per table and component.
    pub fn log_summary(&self) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }

        if let Some(ref frame) = self.frame {
            debug!("frame: {}x{}, {} component(s), {}x{} MCUs",
                   frame.image_size.width, frame.image_size.height, frame.component_count,
                   frame.mcu_size.width, frame.mcu_size.height);

            for component in frame.components() {
                debug!("component {}: sampling {}x{}, quantization table {}, huffman tables DC {} AC {}",
                       component.identifier, component.horizontal_sampling_factor,
                       component.vertical_sampling_factor, component.quantization_table_index,
                       component.dc_table_index, component.ac_table_index);
            }
        }

        for (id, table) in self.quantization_tables.iter().enumerate() {
            if let Some(table) = table {
                debug!("quantization table {}: {:?}", id, &table[..]);
            }
        }
        for (id, table) in self.dc_huffman_tables.iter().enumerate() {
            if let Some(table) = table {
                debug!("DC huffman table {}: {} symbols", id, table.symbol_count());
            }
        }
        for (id, table) in self.ac_huffman_tables.iter().enumerate() {
            if let Some(table) = table {
                debug!("AC huffman table {}: {} symbols", id, table.symbol_count());
            }
        }

        debug!("restart interval: {}", self.restart_interval);
    }
}

fn uninitialized(class: TableClass, id: usize) -> Error {
    Error::Structural(StructuralError::UninitializedTable { class, id: id as u8 })
}

fn ceil_div(x: u32, y: u32) -> u32 {
    (x + y - 1) / y
}

fn length_mismatch(marker: Marker, declared: u16, expected: usize) -> Error {
    let expected = expected.min(u16::MAX as usize) as u16;
    Error::Structural(StructuralError::SegmentLength { marker, declared, expected })
}

// Section B.2.2
pub fn parse_sof<R: JpegRead>(reader: &mut R) -> Result<FrameInfo> {
    let length = reader.read_length(Marker::SOF(0))?;

    let precision = reader.read_u8()?;
    if precision != 8 {
        return Err(Error::Unsupported(UnsupportedFeature::SamplePrecision(precision)));
    }

    let height = reader.read_u16_from_be()?;
    let width = reader.read_u16_from_be()?;

    // height:
    // "Value 0 indicates that the number of lines shall be defined by the DNL marker and
    //     parameters at the end of the first scan (see B.2.5)."
    // DNL is not part of the baseline subset handled here, so zero is simply invalid.
    if width == 0 || height == 0 {
        return Err(Error::Structural(StructuralError::InvalidDimensions));
    }

    let component_count = reader.read_u8()?;
    match component_count {
        1 | 3 => {},
        4 => return Err(Error::Unsupported(UnsupportedFeature::Cmyk)),
        _ => return Err(Error::Structural(StructuralError::InvalidComponentCount(component_count))),
    }

    let expected = 8 + 3 * component_count as usize;
    if length as usize != expected {
        return Err(length_mismatch(Marker::SOF(0), length, expected));
    }

    let mut components: [Option<Component>; MAX_COMPONENTS] = Default::default();
    let mut zero_based_ids = false;

    for _ in 0..component_count {
        let mut identifier = reader.read_u8()?;

        // Some encoders number components from 0. Once that is seen every id is shifted so
        // that all later lookups use 1-based ids.
        if identifier == 0 && !zero_based_ids {
            warn!("component ids are zero-based");
            zero_based_ids = true;
        }
        if zero_based_ids {
            identifier = identifier.wrapping_add(1);
        }

        match identifier {
            4 | 5 => return Err(Error::Unsupported(UnsupportedFeature::Yiq)),
            1..=3 => {},
            _ => return Err(Error::Structural(StructuralError::InvalidComponentId(identifier))),
        }

        let slot = &mut components[identifier as usize - 1];
        if slot.is_some() {
            return Err(Error::Structural(StructuralError::DuplicateComponent(identifier)));
        }

        let byte = reader.read_u8()?;
        let horizontal_sampling_factor = byte >> 4;
        let vertical_sampling_factor = byte & 0x0f;

        if !(1..=4).contains(&horizontal_sampling_factor) || !(1..=4).contains(&vertical_sampling_factor) {
            return Err(Error::Structural(StructuralError::InvalidSamplingFactor {
                component: identifier,
                horizontal: horizontal_sampling_factor,
                vertical: vertical_sampling_factor,
            }));
        }

        let quantization_table_index = reader.read_u8()?;
        if quantization_table_index > 3 {
            return Err(Error::Structural(StructuralError::InvalidTableId {
                class: TableClass::Quantization,
                id: quantization_table_index,
            }));
        }

        trace!("component {}: sampling {}x{}, quantization table {}", identifier,
               horizontal_sampling_factor, vertical_sampling_factor, quantization_table_index);

        *slot = Some(Component {
            identifier,
            horizontal_sampling_factor,
            vertical_sampling_factor,
            quantization_table_index: quantization_table_index as usize,
            dc_table_index: 0,
            ac_table_index: 0,
            size: Dimensions { width: 0, height: 0 },
            block_size: Dimensions { width: 0, height: 0 },
        });
    }

    // A single component scan is non-interleaved: its MCU is one block whatever the sampling
    // factors say.
    if component_count == 1 {
        for component in components.iter_mut().flatten() {
            component.horizontal_sampling_factor = 1;
            component.vertical_sampling_factor = 1;
        }
    }

    let mut frame = FrameInfo {
        image_size: Dimensions { width, height },
        mcu_size: Dimensions { width: 0, height: 0 },
        max_horizontal_sampling_factor: 1,
        max_vertical_sampling_factor: 1,
        components,
        component_count,
        zero_based_ids,
    };
    frame.update_geometry();

    Ok(frame)
}

// Section B.2.3
pub fn parse_sos<R: JpegRead>(reader: &mut R, frame: &mut FrameInfo) -> Result<ScanInfo> {
    let length = reader.read_length(Marker::SOS)?;
    let component_count = reader.read_u8()?;

    if component_count == 0 {
        return Err(Error::Structural(StructuralError::EmptyScan));
    }

    let expected = 6 + 2 * component_count as usize;
    if length as usize != expected {
        return Err(length_mismatch(Marker::SOS, length, expected));
    }

    let mut component_indices = Vec::with_capacity(component_count as usize);
    let mut used = [false; MAX_COMPONENTS];

    for _ in 0..component_count {
        let mut identifier = reader.read_u8()?;
        if frame.zero_based_ids {
            identifier = identifier.wrapping_add(1);
        }

        let index = match identifier {
            1..=3 if frame.components[identifier as usize - 1].is_some() => identifier as usize - 1,
            _ => return Err(Error::Structural(StructuralError::InvalidComponentId(identifier))),
        };

        if used[index] {
            return Err(Error::Structural(StructuralError::DuplicateComponent(identifier)));
        }
        used[index] = true;

        let byte = reader.read_u8()?;
        let dc_table_index = byte >> 4;
        let ac_table_index = byte & 0x0f;

        if dc_table_index > 3 {
            return Err(Error::Structural(StructuralError::InvalidTableId { class: TableClass::HuffmanDc, id: dc_table_index }));
        }
        if ac_table_index > 3 {
            return Err(Error::Structural(StructuralError::InvalidTableId { class: TableClass::HuffmanAc, id: ac_table_index }));
        }

        if let Some(component) = frame.components[index].as_mut() {
            component.dc_table_index = dc_table_index as usize;
            component.ac_table_index = ac_table_index as usize;
        }

        component_indices.push(index);
    }

    let spectral_selection_start = reader.read_u8()?;
    let spectral_selection_end = reader.read_u8()?;
    let byte = reader.read_u8()?;
    let successive_approximation_high = byte >> 4;
    let successive_approximation_low = byte & 0x0f;

    // Baseline scans cover the whole spectrum in one pass.
    if spectral_selection_start != 0 || spectral_selection_end != 63 ||
            successive_approximation_high != 0 || successive_approximation_low != 0 {
        return Err(Error::Unsupported(UnsupportedFeature::Progressive));
    }

    if component_indices.len() != frame.component_count as usize {
        return Err(Error::Unsupported(UnsupportedFeature::MultipleScans));
    }

    Ok(ScanInfo { component_indices })
}

// Section B.2.4.1
pub fn parse_dqt<R: JpegRead>(reader: &mut R) -> Result<[Option<[u16; 64]>; 4]> {
    let length = reader.read_length(Marker::DQT)?;
    let mut remaining = length as usize - 2;
    let mut tables = [None; 4];

    // Each DQT segment may contain multiple quantization tables.
    while remaining > 0 {
        let byte = reader.read_u8()?;
        remaining -= 1;

        let precision = byte >> 4;
        let index = byte & 0x0f;

        if index > 3 {
            return Err(Error::Structural(StructuralError::InvalidTableId { class: TableClass::Quantization, id: index }));
        }

        let table_length = if precision == 0 { 64 } else { 128 };
        if remaining < table_length {
            return Err(length_mismatch(Marker::DQT, length, length as usize - remaining + table_length));
        }

        let mut table = [0u16; 64];

        for &position in UNZIGZAG.iter() {
            table[position as usize] = match precision {
                0 => reader.read_u8()? as u16,
                _ => reader.read_u16_from_be()?,
            };
        }

        trace!("quantization table {}: {} bit", index, if precision == 0 { 8 } else { 16 });

        remaining -= table_length;
        tables[index as usize] = Some(table);
    }

    Ok(tables)
}

// Section B.2.4.2
pub fn parse_dht<R: JpegRead>(reader: &mut R) -> Result<([Option<HuffmanTable>; 4], [Option<HuffmanTable>; 4])> {
    let length = reader.read_length(Marker::DHT)?;
    let mut remaining = length as usize - 2;
    let mut dc_tables: [Option<HuffmanTable>; 4] = Default::default();
    let mut ac_tables: [Option<HuffmanTable>; 4] = Default::default();

    // Each DHT segment may contain multiple huffman tables.
    while remaining > 0 {
        if remaining < 17 {
            return Err(length_mismatch(Marker::DHT, length, length as usize - remaining + 17));
        }

        let byte = reader.read_u8()?;
        let class = if byte >> 4 != 0 { HuffmanTableClass::AC } else { HuffmanTableClass::DC };
        let index = byte & 0x0f;

        if index > 3 {
            return Err(Error::Structural(StructuralError::InvalidTableId { class: class.into(), id: index }));
        }

        let mut counts = [0u8; 16];
        reader.read_exact(&mut counts)?;
        remaining -= 17;

        let symbol_count: usize = counts.iter().map(|&count| count as usize).sum();
        if symbol_count > MAX_SYMBOLS {
            return Err(Error::Structural(StructuralError::TooManyHuffmanSymbols(symbol_count)));
        }
        if remaining < symbol_count {
            return Err(length_mismatch(Marker::DHT, length, length as usize - remaining + symbol_count));
        }

        let mut values = vec![0u8; symbol_count];
        reader.read_exact(&mut values)?;
        remaining -= symbol_count;

        trace!("{:?} huffman table {}: {} symbols", class, index, symbol_count);

        let table = HuffmanTable::new(&counts, &values, class)?;
        match class {
            HuffmanTableClass::DC => dc_tables[index as usize] = Some(table),
            HuffmanTableClass::AC => ac_tables[index as usize] = Some(table),
        }
    }

    Ok((dc_tables, ac_tables))
}

// Section B.2.4.4
pub fn parse_dri<R: JpegRead>(reader: &mut R) -> Result<u16> {
    let length = reader.read_length(Marker::DRI)?;

    if length != 4 {
        return Err(length_mismatch(Marker::DRI, length, 4));
    }

    reader.read_u16_from_be()
}

/// Discards an application, comment or otherwise uninterpreted segment.
pub fn skip_segment<R: JpegRead>(reader: &mut R, marker: Marker) -> Result<()> {
    let length = reader.read_length(marker)?;
    reader.skip_bytes(length as usize - 2)
}

/// Reads the entropy-coded data following a scan header up to the end of image marker,
/// undoing byte stuffing and dropping restart markers.
// Section B.1.1.5
pub fn read_entropy_coded_data<R: JpegRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut data = Vec::new();

    loop {
        let byte = reader.read_u8()?;

        if byte != 0xFF {
            data.push(byte);
            continue;
        }

        let mut next_byte = reader.read_u8()?;

        // Section B.1.1.2
        // "Any marker may optionally be preceded by any number of fill bytes, which are bytes assigned code X’FF’."
        while next_byte == 0xFF {
            next_byte = reader.read_u8()?;
        }

        match Marker::from_u8(next_byte) {
            None => data.push(0xFF),
            // The entropy decoder realigns at each interval by counting MCUs.
            Some(Marker::RST(_)) => {},
            Some(Marker::EOI) => break,
            Some(_) => return Err(Error::Structural(StructuralError::InvalidMarkerInScan(next_byte))),
        }
    }

    debug!("read {} bytes of entropy-coded data", data.len());

    Ok(data)
}
