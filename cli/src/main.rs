//! panelkit CLI - comic archive panel toolkit

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use panelkit::external::PanelDetector;
use panelkit::extract::PanelMasker;
use panelkit::histogram::{histogram_dir, HistogramMode};
use panelkit::organize::{flatten_folder, rename_files, rename_folders, FlattenOutcome, Prompt};
use panelkit::{
    load_layout, AssembleOptions, AssemblerRegistry, BoundsPolicy, ContourDetector, ContourOptions,
    CoverageSummary, ExtractOptions, ExtractionStats, PanelExtractor, PanelFormat, PercentageRecord, Unpacker,
};

#[derive(Parser)]
#[command(name = "panelkit")]
#[command(version)]
#[command(about = "Unpack comics, crop panels, and rebuild them as PDF or EPUB", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Unpack CBZ/CBR/PDF containers into page folders
    Unpack {
        /// Container file, or a folder of containers
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output root; pages go to <OUTPUT>/<container name>/
        #[arg(short, long, value_name = "DIR", default_value = "pages")]
        output: PathBuf,

        /// 7-Zip executable used for CBR archives
        #[arg(long, env = "PANELKIT_SEVEN_ZIP", default_value = "7z")]
        seven_zip: String,
    },

    /// Run the panel detector on a folder of page images
    Detect {
        /// Folder of page images
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Layout JSON file (or output folder with --tree)
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,

        /// Run on every nested folder, one <folder>.json each
        #[arg(long)]
        tree: bool,

        /// Detector command line
        #[arg(long, env = "PANELKIT_DETECTOR", default_value = "python kumiko")]
        detector: String,

        /// Use the built-in contour detector instead of the external one
        #[arg(long)]
        builtin: bool,

        /// Minimum panel width and height in pixels (built-in detector)
        #[arg(long, default_value = "100")]
        min_size: u32,

        /// Right-to-left reading order
        #[arg(long)]
        rtl: bool,
    },

    /// Compute the share of each page covered by panels
    Coverage {
        /// Layout JSON file
        #[arg(value_name = "LAYOUT")]
        layout: PathBuf,

        /// Output JSON file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Print a bar chart of the coverage per page
        #[arg(long)]
        chart: bool,
    },

    /// Crop every panel into its own image
    Extract {
        /// Layout JSON file
        #[arg(value_name = "LAYOUT")]
        layout: PathBuf,

        /// Folder containing the page images
        #[arg(value_name = "PAGES")]
        pages: PathBuf,

        /// Output folder
        #[arg(short, long, value_name = "DIR", default_value = "panels")]
        output: PathBuf,

        /// Scale applied to layout coordinates
        #[arg(long, default_value = "1.0")]
        scale: f64,

        /// Skip panels that exceed the image instead of clamping them
        #[arg(long)]
        strict: bool,

        /// Panel image format
        #[arg(long, value_enum, default_value = "png")]
        format: ImageFormatArg,
    },

    /// Write pages with their panels blacked out
    Mask {
        /// Layout JSON file
        #[arg(value_name = "LAYOUT")]
        layout: PathBuf,

        /// Folder containing the page images
        #[arg(value_name = "PAGES")]
        pages: PathBuf,

        /// Output folder
        #[arg(short, long, value_name = "DIR", default_value = "unused")]
        output: PathBuf,

        /// Scale applied to layout coordinates
        #[arg(long, default_value = "2.0")]
        scale: f64,
    },

    /// Assemble panel folders into a PDF or EPUB
    Assemble {
        /// Folder with one subfolder per chapter
        #[arg(value_name = "BASE")]
        base: PathBuf,

        /// Output file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Output format (defaults to the output extension)
        #[arg(long, value_enum)]
        format: Option<BookFormat>,

        /// Document title
        #[arg(long)]
        title: Option<String>,

        /// Document author
        #[arg(long)]
        author: Option<String>,

        /// Language tag
        #[arg(long, default_value = "en")]
        language: String,
    },

    /// Write RGB histograms for each image in a folder
    Histogram {
        /// Folder of images
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Output folder
        #[arg(short, long, value_name = "DIR", default_value = "histograms")]
        output: PathBuf,

        /// Count black and white pixels too
        #[arg(long)]
        all_pixels: bool,
    },

    /// Interactively rename files or folders
    Rename {
        /// What to rename
        #[arg(value_enum)]
        target: RenameTarget,

        /// Root folder
        #[arg(value_name = "DIR")]
        root: PathBuf,
    },

    /// Collapse chains of single-folder wrappers
    Flatten {
        /// Folder to flatten
        #[arg(value_name = "DIR")]
        folder: PathBuf,

        /// Flatten each subfolder instead of the folder itself
        #[arg(long)]
        children: bool,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ImageFormatArg {
    Png,
    Jpeg,
}

impl From<ImageFormatArg> for PanelFormat {
    fn from(format: ImageFormatArg) -> Self {
        match format {
            ImageFormatArg::Png => PanelFormat::Png,
            ImageFormatArg::Jpeg => PanelFormat::Jpeg,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum BookFormat {
    Pdf,
    Epub,
}

impl BookFormat {
    fn extension(self) -> &'static str {
        match self {
            BookFormat::Pdf => "pdf",
            BookFormat::Epub => "epub",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum RenameTarget {
    Files,
    Folders,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Unpack {
            input,
            output,
            seven_zip,
        } => cmd_unpack(&input, &output, seven_zip),
        Commands::Detect {
            input,
            output,
            tree,
            detector,
            builtin,
            min_size,
            rtl,
        } => {
            if builtin {
                let options = ContourOptions::new().with_min_size(min_size).with_rtl(rtl);
                cmd_detect_builtin(&input, &output, tree, options)
            } else {
                cmd_detect(&input, &output, tree, &detector, rtl)
            }
        }
        Commands::Coverage {
            layout,
            output,
            chart,
        } => cmd_coverage(&layout, output.as_deref(), chart),
        Commands::Extract {
            layout,
            pages,
            output,
            scale,
            strict,
            format,
        } => cmd_extract(&layout, &pages, &output, scale, strict, format),
        Commands::Mask {
            layout,
            pages,
            output,
            scale,
        } => cmd_mask(&layout, &pages, &output, scale),
        Commands::Assemble {
            base,
            output,
            format,
            title,
            author,
            language,
        } => cmd_assemble(&base, &output, format, title, author, language),
        Commands::Histogram {
            input,
            output,
            all_pixels,
        } => cmd_histogram(&input, &output, all_pixels),
        Commands::Rename { target, root } => cmd_rename(target, &root),
        Commands::Flatten { folder, children } => cmd_flatten(&folder, children),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

fn cmd_unpack(
    input: &Path,
    output: &Path,
    seven_zip: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let unpacker = Unpacker::new().with_seven_zip(seven_zip);

    let reports = if input.is_dir() {
        let pb = ProgressBar::new_spinner();
        pb.set_message(format!("Unpacking {}...", input.display()));
        let reports = unpacker.unpack_dir(input, output)?;
        pb.finish_and_clear();
        reports
    } else {
        vec![unpacker.unpack(input, output)?]
    };

    for report in &reports {
        println!(
            "{} {} ({}, {} files)",
            "Unpacked".green(),
            report.output_dir.display(),
            report.format,
            report.files.len()
        );
    }
    println!("\n{} {} containers unpacked", "Done!".green().bold(), reports.len());

    Ok(())
}

fn cmd_detect(
    input: &Path,
    output: &Path,
    tree: bool,
    detector: &str,
    rtl: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let detector = PanelDetector::from_command_line(detector)?.with_rtl(rtl);

    if tree {
        let written = detector.detect_tree(input, output)?;
        for path in &written {
            println!("{} {}", "Saved to".green(), path.display());
        }
        println!("\n{} {} layouts written", "Done!".green().bold(), written.len());
    } else {
        detector.detect_dir(input, output)?;
        println!("{} {}", "Saved to".green(), output.display());
    }

    Ok(())
}

fn cmd_detect_builtin(
    input: &Path,
    output: &Path,
    tree: bool,
    options: ContourOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let detector = ContourDetector::new(options);

    if tree {
        let written = detector.detect_tree(input, output)?;
        for path in &written {
            println!("{} {}", "Saved to".green(), path.display());
        }
        println!("\n{} {} layouts written", "Done!".green().bold(), written.len());
    } else {
        let pages = detector.detect_dir_to(input, output)?;
        let panels: usize = pages.iter().map(|p| p.panel_count()).sum();
        println!("{} {}", "Saved to".green(), output.display());
        println!("{}: {}  {}: {}", "Pages".bold(), pages.len(), "Panels".bold(), panels);
    }

    Ok(())
}

fn cmd_coverage(
    layout: &Path,
    output: Option<&Path>,
    chart: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output.map(|p| p.to_path_buf()).unwrap_or_else(|| {
        let stem = layout.file_stem().unwrap_or_default().to_string_lossy();
        layout.with_file_name(format!("{}_coverage.json", stem))
    });

    let records = panelkit::coverage_report(layout, &output)?;
    println!("{} {}", "Saved to".green(), output.display());

    if let Some(summary) = CoverageSummary::from_records(&records) {
        println!();
        println!("{}", "Panel Coverage".cyan().bold());
        println!("{}", "─".repeat(40).dimmed());
        println!("{}: {}", "Pages".bold(), summary.pages);
        println!("{}: {:.2}%", "Min".bold(), summary.min);
        println!("{}: {:.2}%", "Max".bold(), summary.max);
        println!("{}: {:.2}%", "Mean".bold(), summary.mean);
    }

    if chart {
        println!();
        print_chart(&records);
    }

    Ok(())
}

/// Horizontal bar per page, 50 columns for 100%.
fn print_chart(records: &[PercentageRecord]) {
    let label_width = records
        .iter()
        .map(|r| r.filename.chars().count())
        .max()
        .unwrap_or(0);
    for record in records {
        let filled = (record.panel_percentage.clamp(0.0, 100.0) / 2.0).round() as usize;
        println!(
            "{:<width$} {}{} {:>6.2}%",
            record.filename,
            "█".repeat(filled).cyan(),
            "·".repeat(50 - filled).dimmed(),
            record.panel_percentage,
            width = label_width
        );
    }
}

fn cmd_extract(
    layout: &Path,
    pages_dir: &Path,
    output: &Path,
    scale: f64,
    strict: bool,
    format: ImageFormatArg,
) -> Result<(), Box<dyn std::error::Error>> {
    let pages = load_layout(layout)?;
    let bounds = if strict {
        BoundsPolicy::Skip
    } else {
        BoundsPolicy::Clamp
    };
    let options = ExtractOptions::new()
        .with_scale(scale)
        .with_bounds(bounds)
        .with_format(format.into());
    let extractor = PanelExtractor::new(options);
    fs::create_dir_all(output)?;

    let pb = progress_bar(pages.len() as u64);
    let mut stats = ExtractionStats::new();
    for page in &pages {
        pb.set_message(page.filename.clone());
        let page_stats = extractor.extract_page(page, pages_dir, output)?;
        stats.merge(&page_stats);
        pb.inc(1);
    }
    pb.finish_with_message("Done!");

    println!();
    println!("{}: {}", "Pages".bold(), stats.pages_processed);
    println!("{}: {}", "Panels".bold(), stats.panels_written);
    if stats.panels_skipped > 0 {
        println!("{}: {}", "Skipped panels".yellow(), stats.panels_skipped);
    }
    if stats.pages_missing > 0 {
        println!("{}: {}", "Missing pages".yellow(), stats.pages_missing);
    }
    println!("{} {}", "Saved to".green(), output.display());

    Ok(())
}

fn cmd_mask(
    layout: &Path,
    pages_dir: &Path,
    output: &Path,
    scale: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let pages = load_layout(layout)?;
    let masker = PanelMasker::new(ExtractOptions::new().with_scale(scale));
    let written = masker.mask(&pages, pages_dir, output)?;

    println!(
        "{} {} masked pages written to {}",
        "Done!".green().bold(),
        written,
        output.display()
    );

    Ok(())
}

fn cmd_assemble(
    base: &Path,
    output: &Path,
    format: Option<BookFormat>,
    title: Option<String>,
    author: Option<String>,
    language: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = match format {
        Some(format) => output.with_extension(format.extension()),
        None => output.to_path_buf(),
    };

    let mut options = AssembleOptions::new().with_language(language);
    if let Some(title) = title {
        options = options.with_title(title);
    }
    if let Some(author) = author {
        options = options.with_author(author);
    }

    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Assembling {}...", output.display()));
    let report = AssemblerRegistry::with_defaults().assemble_to(base, &output, &options)?;
    pb.finish_and_clear();

    println!("{} {}", "Saved to".green(), report.output.display());
    println!("{}: {}", "Pages".bold(), report.pages_written);
    if !report.skipped.is_empty() {
        println!("{}:", "Skipped".yellow());
        for path in &report.skipped {
            println!("  {} {}", "─".dimmed(), path.display());
        }
    }

    Ok(())
}

fn cmd_histogram(
    input: &Path,
    output: &Path,
    all_pixels: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mode = if all_pixels {
        HistogramMode::AllPixels
    } else {
        HistogramMode::ExcludeExtremes
    };
    let written = histogram_dir(input, output, mode)?;

    println!(
        "{} {} histograms written to {}",
        "Done!".green().bold(),
        written,
        output.display()
    );

    Ok(())
}

/// Reads answers from stdin; an empty line keeps the default.
struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask(&mut self, message: &str, default: &str) -> panelkit::Result<String> {
        print!("{} [{}]: ", message.cyan(), default);
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let answer = line.trim();
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer.to_string()
        })
    }
}

fn cmd_rename(target: RenameTarget, root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut prompt = StdinPrompt;
    let report = match target {
        RenameTarget::Files => rename_files(root, &mut prompt)?,
        RenameTarget::Folders => rename_folders(root, &mut prompt)?,
    };

    for (from, to) in &report.renamed {
        println!("{} {} -> {}", "Renamed".green(), from.display(), to.display());
    }
    for (path, error) in &report.failed {
        println!("{} {}: {}", "Failed".red(), path.display(), error);
    }

    Ok(())
}

fn cmd_flatten(folder: &Path, children: bool) -> Result<(), Box<dyn std::error::Error>> {
    let targets = if children {
        let mut dirs: Vec<PathBuf> = fs::read_dir(folder)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        dirs
    } else {
        vec![folder.to_path_buf()]
    };

    for target in targets {
        match flatten_folder(&target)? {
            FlattenOutcome::Empty => println!("{} {}", "Empty".yellow(), target.display()),
            FlattenOutcome::Unchanged => {
                println!("{} {}", "Nothing to flatten".dimmed(), target.display())
            }
            FlattenOutcome::Flattened { moved } => {
                println!("{} {} ({} entries)", "Flattened".green(), target.display(), moved)
            }
        }
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "panelkit".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Comic archive panel toolkit");
}
