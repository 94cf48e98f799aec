//! Converts baseline JPEG files to 24-bit BMP files.
//!
//! Every path given on the command line is either a JPEG file or a directory that is searched
//! recursively for `.jpg` and `.jpeg` files. Files are converted independently, a failure is
//! reported and the remaining files are still converted. Two inputs never write the same BMP
//! file: the later one is reported as failed.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{debug, error, info};
use rayon::prelude::*;
use walkdir::WalkDir;

use baseline_jpeg::{bmp, Decoder};

#[derive(Parser)]
#[command(version, about = "Converts baseline JPEG images to BMP")]
struct Args {
    /// JPEG files, or directories to search for them
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Directory to write the BMP files to, instead of next to each input
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Reject chroma subsampled images
    #[arg(long)]
    strict_sampling: bool,
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map_or(false, |extension| extension.eq_ignore_ascii_case("jpg") || extension.eq_ignore_ascii_case("jpeg"))
}

/// Expands directories into the JPEG files they contain. Files named explicitly are kept
/// whatever their extension.
fn collect_inputs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut inputs = Vec::new();

    for path in paths {
        if !path.is_dir() {
            inputs.push(path.clone());
            continue;
        }

        for entry in WalkDir::new(path).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_jpeg(entry.path()) => {
                    inputs.push(entry.into_path());
                },
                Ok(_) => {},
                Err(err) => error!("{}: {}", path.display(), err),
            }
        }
    }

    inputs
}

fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let bmp_name = Path::new(input.file_stem().unwrap_or(input.as_os_str())).with_extension("bmp");

    match output_dir {
        Some(dir) => dir.join(bmp_name),
        None => input.with_file_name(bmp_name),
    }
}

/// Pairs every input with its output, or with the earlier input that already writes there.
fn assign_outputs(inputs: &[PathBuf], output_dir: Option<&Path>) -> Vec<(PathBuf, Result<PathBuf, PathBuf>)> {
    let mut claimed: HashMap<PathBuf, &PathBuf> = HashMap::new();

    inputs.iter()
          .map(|input| {
              let output = output_path(input, output_dir);
              let assigned = match claimed.get(&output) {
                  Some(&earlier) => Err(earlier.clone()),
                  None => {
                      claimed.insert(output.clone(), input);
                      Ok(output)
                  },
              };
              (input.clone(), assigned)
          })
          .collect()
}

fn convert(input: &Path, output: &Path, strict_sampling: bool) -> Result<(), Box<dyn StdError + Send + Sync>> {
    let mut decoder = Decoder::new(BufReader::new(File::open(input)?));
    decoder.set_strict_sampling(strict_sampling);

    // Nothing is written unless the whole image decoded.
    let pixels = decoder.decode()?;
    let info = decoder.info().ok_or("no frame header")?;
    debug!("{}: {}x{} {:?}", input.display(), info.width, info.height, info.color_space);

    let writer = BufWriter::new(File::create(output)?);
    bmp::write_bmp(writer, info.width, info.height, &pixels)?;

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let inputs = collect_inputs(&args.paths);

    if inputs.is_empty() {
        error!("no JPEG files found");
        return ExitCode::FAILURE;
    }

    let jobs = assign_outputs(&inputs, args.output_dir.as_deref());
    let failures = jobs.par_iter()
                       .filter(|(input, output)| {
                           let output = match output {
                               Ok(output) => output,
                               Err(earlier) => {
                                   error!("{}: output {} is already written for {}",
                                          input.display(), output_path(input, args.output_dir.as_deref()).display(),
                                          earlier.display());
                                   return true;
                               },
                           };

                           match convert(input, output, args.strict_sampling) {
                               Ok(()) => {
                                   info!("{} -> {}", input.display(), output.display());
                                   false
                               },
                               Err(err) => {
                                   error!("{}: {}", input.display(), err);
                                   true
                               },
                           }
                       })
                       .count();

    if failures > 0 {
        error!("{} of {} files failed", failures, inputs.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
