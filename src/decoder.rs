use std::io::Read;
use std::mem;
use std::sync::Arc;

use log::debug;

use crate::color::{color_convert_line_grayscale, color_convert_line_ycbcr, ColorSpace};
use crate::entropy::{self, BlockLayout, McuGrid};
use crate::error::{Error, Result, StructuralError, TableClass, UnsupportedFeature};
use crate::marker::Marker;
use crate::parser::{self, Component, FrameInfo, Header, ScanInfo};
use crate::reader::JpegRead;
use crate::upsampler::Upsampler;
use crate::worker::{with_worker, PreferWorkerKind, RowData};

/// MCU rows handed to the worker at once.
const MCU_ROWS_PER_BATCH: usize = 16;

/// Describes a JPEG image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    /// The width of the image, in pixels.
    pub width: u16,
    /// The height of the image, in pixels.
    pub height: u16,
    /// The color space the components are coded in. Decoded pixels are always RGB.
    pub color_space: ColorSpace,
}

/// JPEG decoder
pub struct Decoder<R> {
    reader: R,
    header: Header,
    read_soi: bool,

    max_decoding_buffer_size: usize,
    strict_sampling: bool,
}

impl<R: Read> Decoder<R> {
    /// Creates a new `Decoder` using the reader `reader`.
    pub fn new(reader: R) -> Decoder<R> {
        Decoder {
            reader,
            header: Header::default(),
            read_soi: false,
            max_decoding_buffer_size: usize::MAX,
            strict_sampling: false,
        }
    }

    /// Rejects images whose decoding would need more than `max` bytes: the RGB output plus the
    /// coefficients and sample planes held while decoding.
    pub fn set_max_decoding_buffer_size(&mut self, max: usize) {
        self.max_decoding_buffer_size = max;
    }

    /// Rejects chroma subsampled images, accepting only frames where every component has
    /// sampling factors 1x1.
    pub fn set_strict_sampling(&mut self, strict: bool) {
        self.strict_sampling = strict;
    }

    /// Returns metadata about the image.
    ///
    /// The returned value will be `None` until a call to either `read_info` or `decode` has
    /// returned `Ok`.
    pub fn info(&self) -> Option<ImageInfo> {
        let frame = self.header.frame.as_ref()?;

        Some(ImageInfo {
            width: frame.image_size.width,
            height: frame.image_size.height,
            color_space: ColorSpace::from_component_count(frame.component_count)?,
        })
    }

    /// Tries to read metadata from the image without decoding it.
    ///
    /// If successful, the metadata can be obtained using the `info` method.
    pub fn read_info(&mut self) -> Result<()> {
        self.read_headers(true)
    }

    /// Decodes the image and returns its pixels as rows of RGB triples, top to bottom.
    ///
    /// The returned buffer holds exactly `width * height * 3` bytes.
    pub fn decode(&mut self) -> Result<Vec<u8>> {
        self.read_headers(false)?;

        let data = parser::read_entropy_coded_data(&mut self.reader)?;

        self.header.validate()?;
        self.header.log_summary();

        let header = &self.header;
        let frame = header.frame.as_ref().ok_or(StructuralError::NoFrame)?;
        let scan = header.scan.as_ref().ok_or(StructuralError::NoFrame)?;

        let grid = entropy::decode_mcus(frame,
                                        scan,
                                        &header.dc_huffman_tables,
                                        &header.ac_huffman_tables,
                                        header.restart_interval,
                                        &data)?;
        drop(data);

        let planes = reconstruct_planes(frame, scan, &grid, &header.quantization_tables)?;
        drop(grid);

        compute_image(frame, &planes)
    }

    /// Reads marker segments up to and including the scan header, or up to the frame header
    /// when `stop_after_frame` is set.
    fn read_headers(&mut self, stop_after_frame: bool) -> Result<()> {
        if !self.read_soi {
            if self.reader.read_u8()? != 0xFF || self.reader.read_u8()? != Marker::SOI.to_u8() {
                return Err(Error::Structural(StructuralError::MissingSoi));
            }
            self.read_soi = true;
        }

        if (stop_after_frame && self.header.frame.is_some()) || self.header.scan.is_some() {
            // Already read.
            return Ok(());
        }

        loop {
            let marker = self.read_marker()?;
            debug!("reading {:?} marker", marker);

            match marker {
                // Frame header
                Marker::SOF(0) => {
                    // Section 4.10
                    // "An image contains only one frame in the cases of sequential and
                    //  progressive coding processes; an image contains multiple frames for the
                    //  hierarchical mode."
                    if self.header.frame.is_some() {
                        return Err(Error::Structural(StructuralError::DuplicateFrame));
                    }

                    let frame = parser::parse_sof(&mut self.reader)?;
                    self.check_frame(&frame)?;
                    self.header.frame = Some(frame);

                    if stop_after_frame {
                        return Ok(());
                    }
                },
                Marker::SOF(_) | Marker::JPG => {
                    return Err(Error::Unsupported(UnsupportedFeature::FrameType(marker.to_u8())));
                },

                // Scan header
                Marker::SOS => {
                    let frame = self.header.frame.as_mut().ok_or(StructuralError::ScanBeforeFrame)?;
                    let scan = parser::parse_sos(&mut self.reader, frame)?;
                    self.header.scan = Some(scan);

                    // The entropy-coded data follows.
                    return Ok(());
                },

                // Table-specification and miscellaneous markers
                // Quantization table-specification
                Marker::DQT => {
                    let tables = parser::parse_dqt(&mut self.reader)?;

                    for (slot, table) in self.header.quantization_tables.iter_mut().zip(tables.iter()) {
                        if let Some(table) = table {
                            *slot = Some(Arc::new(*table));
                        }
                    }
                },
                // Huffman table-specification
                Marker::DHT => {
                    let (dc_tables, ac_tables) = parser::parse_dht(&mut self.reader)?;

                    for (slot, table) in self.header.dc_huffman_tables.iter_mut().zip(dc_tables) {
                        if table.is_some() {
                            *slot = table;
                        }
                    }
                    for (slot, table) in self.header.ac_huffman_tables.iter_mut().zip(ac_tables) {
                        if table.is_some() {
                            *slot = table;
                        }
                    }
                },
                // Arithmetic conditioning table-specification
                Marker::DAC => return Err(Error::Unsupported(UnsupportedFeature::ArithmeticEntropyCoding)),
                // Restart interval definition
                Marker::DRI => self.header.restart_interval = parser::parse_dri(&mut self.reader)?,

                Marker::SOI => return Err(Error::Structural(StructuralError::EmbeddedSoi)),
                Marker::EOI | Marker::RST(_) => return Err(Error::Structural(StructuralError::MarkerBeforeScan(marker))),

                // Carries no length and no data.
                Marker::TEM => {},

                // Application data, comments, extensions and the hierarchical markers
                _ if marker.is_skippable() => parser::skip_segment(&mut self.reader, marker)?,

                _ => return Err(Error::Structural(StructuralError::UnknownMarker(marker.to_u8()))),
            }
        }
    }

    fn read_marker(&mut self) -> Result<Marker> {
        let byte = self.reader.read_u8()?;
        if byte != 0xFF {
            return Err(Error::Structural(StructuralError::ExpectedMarker(byte)));
        }

        let mut byte = self.reader.read_u8()?;

        // Section B.1.1.2
        // "Any marker may optionally be preceded by any number of fill bytes, which are bytes assigned code X’FF’."
        while byte == 0xFF {
            byte = self.reader.read_u8()?;
        }

        match Marker::from_u8(byte) {
            None | Some(Marker::RES) => Err(Error::Structural(StructuralError::UnknownMarker(byte))),
            Some(marker) => Ok(marker),
        }
    }

    /// Frame level checks that depend on the decoder configuration.
    fn check_frame(&self, frame: &FrameInfo) -> Result<()> {
        let components: Vec<Component> = frame.components().cloned().collect();

        if self.strict_sampling &&
                components.iter().any(|c| c.horizontal_sampling_factor != 1 || c.vertical_sampling_factor != 1) {
            return Err(Error::Unsupported(UnsupportedFeature::SubsamplingRatio));
        }

        // Fails for ratios the upsampler cannot express.
        Upsampler::new(&components)?;

        let required = decoding_buffer_size(frame);
        if required > self.max_decoding_buffer_size {
            return Err(Error::BufferLimit { required, limit: self.max_decoding_buffer_size });
        }

        Ok(())
    }
}

/// Bytes held at once while decoding `frame`: a coefficient block and a sample block for every
/// block of every component, then the RGB output.
fn decoding_buffer_size(frame: &FrameInfo) -> usize {
    let blocks = frame.components()
                      .map(|c| c.block_size.width as usize * c.block_size.height as usize)
                      .fold(0usize, |total, count| total.saturating_add(count));
    let per_block = 64 * (mem::size_of::<i32>() + 1);
    let output = frame.image_size.width as usize * frame.image_size.height as usize * 3;

    blocks.saturating_mul(per_block).saturating_add(output)
}

/// Runs the IDCT over every block and returns one sample plane per component, in component id
/// order. Planes are padded to whole MCUs.
fn reconstruct_planes(frame: &FrameInfo,
                      scan: &ScanInfo,
                      grid: &McuGrid,
                      quantization_tables: &[Option<Arc<[u16; 64]>>; 4]) -> Result<Vec<Vec<u8>>> {
    let layout = entropy::block_layout(frame, scan);
    let prefer = if cfg!(feature = "rayon") {
        PreferWorkerKind::Multithreaded
    } else {
        PreferWorkerKind::Immediate
    };

    with_worker(prefer, |worker| -> Result<Vec<Vec<u8>>> {
        for block in &layout {
            let component = frame.components[block.component_index].as_ref()
                                                                    .ok_or(StructuralError::InvalidComponentId(block.component_index as u8 + 1))?;
            let quantization_table = quantization_tables[component.quantization_table_index].as_ref()
                                                                                            .ok_or(StructuralError::UninitializedTable {
                                                                                                class: TableClass::Quantization,
                                                                                                id: component.quantization_table_index as u8,
                                                                                            })?;

            worker.start(RowData {
                index: block.component_index,
                component: component.clone(),
                quantization_table: Arc::clone(quantization_table),
            })?;
        }

        for first_row in (0..grid.mcus_high).step_by(MCU_ROWS_PER_BATCH) {
            let last_row = (first_row + MCU_ROWS_PER_BATCH).min(grid.mcus_high);
            let mut rows = (first_row..last_row).flat_map(|mcu_y| {
                layout.iter().map(move |block| (block.component_index, mcu_row_blocks(grid, block, mcu_y)))
            });

            worker.append_rows(&mut rows)?;
        }

        let mut planes = Vec::with_capacity(layout.len());
        for (index, _) in frame.components.iter().enumerate().filter(|(_, c)| c.is_some()) {
            planes.push(worker.get_result(index)?);
        }

        Ok(planes)
    })
}

/// Collects the blocks of one component in MCU row `mcu_y`, in raster order over the row.
fn mcu_row_blocks(grid: &McuGrid, block: &BlockLayout, mcu_y: usize) -> Vec<[i32; 64]> {
    let mut blocks = Vec::with_capacity(grid.mcus_wide * block.horizontal_blocks * block.vertical_blocks);

    for block_y in 0..block.vertical_blocks {
        for mcu_x in 0..grid.mcus_wide {
            let mcu = grid.mcu(mcu_y * grid.mcus_wide + mcu_x);
            let start = block.offset + block_y * block.horizontal_blocks;

            blocks.extend_from_slice(&mcu[start..start + block.horizontal_blocks]);
        }
    }

    blocks
}

fn compute_image(frame: &FrameInfo, data: &[Vec<u8>]) -> Result<Vec<u8>> {
    if data.is_empty() || data.iter().any(|data| data.is_empty()) {
        return Err(Error::Structural(StructuralError::NoFrame));
    }

    let components: Vec<Component> = frame.components().cloned().collect();
    let output_width = frame.image_size.width as usize;
    let output_height = frame.image_size.height as usize;
    let line_size = output_width * 3;
    let mut image = vec![0u8; line_size * output_height];

    if components.len() == 1 {
        let line_stride = components[0].block_size.width as usize * 8;
        let plane = &data[0];

        convert_rows(&mut image, line_size, |row, line| {
            color_convert_line_grayscale(&plane[row * line_stride..][..output_width], line);
        });
    } else {
        let upsampler = Upsampler::new(&components)?;

        convert_rows(&mut image, line_size, |row, line| {
            upsampler.upsample_and_interleave_row(data, row, output_width, line);
            color_convert_line_ycbcr(line, output_width);
        });
    }

    Ok(image)
}

#[cfg(feature = "rayon")]
fn convert_rows(image: &mut [u8], line_size: usize, convert: impl Fn(usize, &mut [u8]) + Send + Sync) {
    use rayon::prelude::*;

    image.par_chunks_mut(line_size)
         .enumerate()
         .for_each(|(row, line)| convert(row, line));
}

#[cfg(not(feature = "rayon"))]
fn convert_rows(image: &mut [u8], line_size: usize, convert: impl Fn(usize, &mut [u8])) {
    for (row, line) in image.chunks_mut(line_size).enumerate() {
        convert(row, line);
    }
}
