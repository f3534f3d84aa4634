use clap::{Parser, Subcommand};
use imageconvert::{batch, convert, options, pdf};
use std::path::PathBuf;

/// Shared flags for commands that re-encode pixels.
#[derive(clap::Args, Clone)]
struct EncodeArgs {
    /// Quality for lossy targets, 1-100
    #[arg(long, short)]
    quality: Option<u8>,

    /// Resolution override in dots per inch
    #[arg(long)]
    dpi: Option<f32>,
}

#[derive(Parser)]
#[command(name = "imageconvert")]
#[command(about = "Convert images between formats, keeping metadata and timestamps")]
#[command(long_about = "\
Convert images between formats, keeping metadata and timestamps

Formats: jpg/jpeg/jfif, png, bmp, tiff/tif, webp, gif, avif, heif/heic,
svg (source only), pdf.

EXIF metadata (camera, GPS, resolution) is carried to any target that can
hold it; file timestamps are copied to the destination. SVG sources are
rasterized; PDFs render out through the system pdfium library and compose
in from any raster or vector source.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert one file; the target format comes from the destination extension
    Convert {
        source: PathBuf,
        dest: PathBuf,
        #[command(flatten)]
        encode: EncodeArgs,
        /// Do not carry EXIF metadata to the destination
        #[arg(long)]
        no_metadata: bool,
        /// Do not copy file timestamps to the destination
        #[arg(long)]
        no_timestamps: bool,
    },
    /// Convert every supported file in a directory
    Batch {
        input_dir: PathBuf,
        output_dir: PathBuf,
        /// Target extension (e.g. webp); omit to keep each file's format
        #[arg(long, short)]
        format: Option<String>,
        /// Descend into subdirectories, mirroring their structure
        #[arg(long, short)]
        recursive: bool,
        /// Leave already-present destinations untouched
        #[arg(long)]
        skip_existing: bool,
        #[command(flatten)]
        encode: EncodeArgs,
        #[arg(long)]
        no_metadata: bool,
        #[arg(long)]
        no_timestamps: bool,
    },
    /// Print a file's dimensions, format, and metadata as JSON
    Info {
        source: PathBuf,
        /// Report only identity and geometry, no EXIF blocks
        #[arg(long)]
        no_exif: bool,
    },
    /// Render PDF pages into an output directory as page_{N} images
    PdfToImages {
        source: PathBuf,
        output_dir: PathBuf,
        /// Target extension for the rendered pages
        #[arg(long, short, default_value = "png")]
        format: String,
        /// Zero-based page indices; omit for all pages
        #[arg(long, value_delimiter = ',')]
        pages: Option<Vec<usize>>,
        #[command(flatten)]
        encode: EncodeArgs,
    },
    /// Compose one PDF from a sequence of images, one page each
    ImagesToPdf {
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        #[arg(long, short)]
        output: PathBuf,
        /// Page size: a4, letter, legal, a3, a5
        #[arg(long, default_value = "a4")]
        page_size: String,
        /// Placement: contain, cover, stretch
        #[arg(long, default_value = "contain")]
        fit: String,
        /// Title for the document's Info dictionary
        #[arg(long)]
        title: Option<String>,
        /// Author for the document's Info dictionary
        #[arg(long)]
        author: Option<String>,
        /// Subject for the document's Info dictionary
        #[arg(long)]
        subject: Option<String>,
        #[command(flatten)]
        encode: EncodeArgs,
    },
}

fn quality_from(encode: &EncodeArgs) -> options::Quality {
    encode
        .quality
        .map(options::Quality::new)
        .unwrap_or_default()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Convert {
            source,
            dest,
            encode,
            no_metadata,
            no_timestamps,
        } => {
            let request = convert::ConversionRequest {
                quality: quality_from(&encode),
                dpi: encode.dpi,
                preserve_metadata: !no_metadata,
                preserve_timestamps: !no_timestamps,
                source,
                dest,
            };
            let out = convert::convert(&request)?;
            println!("{}", out.display());
        }
        Command::Batch {
            input_dir,
            output_dir,
            format,
            recursive,
            skip_existing,
            encode,
            no_metadata,
            no_timestamps,
        } => {
            let batch_options = batch::BatchOptions {
                output_format: format,
                recursive,
                skip_existing,
                quality: quality_from(&encode),
                dpi: encode.dpi,
                preserve_metadata: !no_metadata,
                preserve_timestamps: !no_timestamps,
            };
            let report = batch::batch_convert(&input_dir, &output_dir, &batch_options)?;
            for (source, outcome) in &report.entries {
                match outcome {
                    batch::Outcome::Converted(dest) => {
                        println!("{} -> {}", source.display(), dest.display())
                    }
                    batch::Outcome::Skipped(dest) => {
                        println!("{} -> {} (skipped, exists)", source.display(), dest.display())
                    }
                    batch::Outcome::Failed { reason, .. } => {
                        eprintln!("{}: {reason}", source.display())
                    }
                }
            }
            println!(
                "{} converted, {} skipped, {} failed",
                report.converted_count(),
                report.skipped_count(),
                report.failed_count()
            );
            if report.failed_count() > 0 {
                std::process::exit(1);
            }
        }
        Command::Info { source, no_exif } => {
            let record = convert::get_image_info(&source, !no_exif)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::PdfToImages {
            source,
            output_dir,
            format,
            pages,
            encode,
        } => {
            let target =
                imageconvert::format::resolve(std::path::Path::new(&format!("x.{format}")))?;
            let outputs = pdf::pdf_to_images(
                &source,
                &output_dir,
                target,
                pages.as_deref(),
                encode.dpi,
                quality_from(&encode),
            )?;
            for path in outputs {
                println!("{}", path.display());
            }
        }
        Command::ImagesToPdf {
            sources,
            output,
            page_size,
            fit,
            title,
            author,
            subject,
            encode,
        } => {
            let doc_info = (title.is_some() || author.is_some() || subject.is_some()).then(|| {
                imageconvert::exif::DocumentInfo {
                    title,
                    author,
                    subject,
                    ..Default::default()
                }
            });
            pdf::images_to_pdf(
                &sources,
                &output,
                pdf::PageSize::from_name(&page_size),
                fit.parse()?,
                quality_from(&encode),
                doc_info.as_ref(),
            )?;
            println!("{}", output.display());
        }
    }

    Ok(())
}
