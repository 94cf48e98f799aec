//! This crate contains a decoder for baseline JPEG images and a writer for uncompressed BMP
//! files.
//!
//! Only the baseline subset of JPEG is handled: one SOF0 frame of 8-bit samples with one
//! (grayscale) or three (YCbCr) components, coded in a single Huffman scan. Everything else is
//! rejected with an error describing the unsupported feature.
//!
//! # Examples
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let file = File::open("image.jpg").expect("failed to open file");
//! let mut decoder = baseline_jpeg::Decoder::new(BufReader::new(file));
//! let pixels = decoder.decode().expect("failed to decode image");
//! let metadata = decoder.info().unwrap();
//!
//! let output = File::create("out.bmp").expect("failed to create file");
//! baseline_jpeg::bmp::write_bmp(output, metadata.width, metadata.height, &pixels)
//!     .expect("failed to write image");
//! ```

#![forbid(unsafe_code)]

pub use crate::color::ColorSpace;
pub use crate::decoder::{Decoder, ImageInfo};
pub use crate::error::{EntropyError, Error, Result, StructuralError, TableClass, UnsupportedFeature};
pub use crate::marker::Marker;

pub mod bmp;

mod bit_reader;
mod color;
mod decoder;
mod entropy;
mod error;
mod huffman;
mod idct;
mod marker;
mod parser;
mod reader;
mod upsampler;
mod worker;
