use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use humansize::{format_size, DECIMAL};

use dupkeep::fingerprint::DEFAULT_CHUNK_SIZE;
use dupkeep::resolve::{ListingViewer, StdinPrompter};
use dupkeep::scanner::ExtensionFilter;
use dupkeep::{
    build_catalog, resolve_catalog, CatalogStore, DuplicateCatalog, Scanner, XxFingerprinter,
};

/// Extension allow-list used when `--ext` is not given: common image and
/// video formats.
const DEFAULT_EXTENSIONS: &[&str] = &[
    ".3g2", ".3gp", ".avi", ".bmp", ".gif", ".jpeg", ".jpg", ".mov", ".mp4", ".png", ".psd",
    ".tif",
];

#[derive(Parser)]
#[command(
    name = "dupkeep",
    version,
    about = "Find content-duplicate files, catalog them, and resolve them interactively",
    long_about = "Scan a directory tree, fingerprint files with a fast non-cryptographic hash, \
persist the duplicate catalog, and walk through each duplicate group deciding which copy to keep. \
Without --path, a previously saved catalog is post-processed instead of rescanning."
)]
struct Cli {
    /// Directory to scan for duplicate files
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Directory to scan; omit to post-process a previously saved catalog"
    )]
    path: Option<PathBuf>,

    /// Collect unique file extensions only
    #[arg(long, help = "Only collect the distinct file extensions under --path")]
    ext_only: bool,

    /// Dispose of duplicates immediately after finding them
    #[arg(long, help = "Run the interactive resolution pass right after the scan")]
    post_process: bool,

    /// Catalog file location
    #[arg(
        long,
        value_name = "FILE",
        default_value = "dupes.json",
        help = "Where the duplicate catalog is saved and loaded"
    )]
    catalog: PathBuf,

    /// File extensions to consider (e.g. jpg,png,mov)
    #[arg(
        long = "ext",
        value_delimiter = ',',
        value_name = "EXT",
        help = "Extension allow-list, comma-separated (defaults to common image/video formats)"
    )]
    extensions: Vec<String>,

    /// Fingerprint read size in bytes
    #[arg(
        long,
        default_value_t = DEFAULT_CHUNK_SIZE,
        help = "Chunk size for streaming fingerprint reads, in bytes"
    )]
    chunk_size: usize,

    /// Number of threads to use for parallel fingerprinting
    #[arg(long, default_value = "0", help = "Number of threads (0 = auto-detect)")]
    threads: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Cli::parse();

    if args.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()
            .unwrap();
    }

    match args.path.clone() {
        Some(root) if args.ext_only => run_ext_only(&root),
        Some(root) => run_scan(&root, &args),
        None => run_post_process(&args),
    }
}

/// `--path --ext-only`: report the distinct extensions under the root.
fn run_ext_only(root: &Path) -> Result<()> {
    let start = Instant::now();
    println!(
        "{}",
        style("Collecting unique file extensions...").cyan().bold()
    );

    let scanner = Scanner::new(root);
    let (extensions, errors) = scanner.collect_extensions();
    report_skipped(&errors);

    println!(
        "\nFound {} extensions in {:.2}s",
        extensions.len(),
        start.elapsed().as_secs_f64()
    );
    for ext in &extensions {
        println!("  {ext}");
    }
    Ok(())
}

/// `--path`: scan, build the catalog, save it, optionally resolve right away.
fn run_scan(root: &Path, args: &Cli) -> Result<()> {
    let filter = if args.extensions.is_empty() {
        ExtensionFilter::new(DEFAULT_EXTENSIONS)
    } else {
        ExtensionFilter::new(&args.extensions)
    };

    let start = Instant::now();
    println!(
        "{}",
        style("Scanning for duplicate files...").cyan().bold()
    );

    let scanner = Scanner::new(root);
    let hasher = XxFingerprinter::new(args.chunk_size);
    let outcome = build_catalog(&scanner, &filter, &hasher, true);
    report_skipped(&outcome.stats.errors);

    println!(
        "\nCompleted looking for duplicate files in {:.2}s",
        start.elapsed().as_secs_f64()
    );
    println!(
        "Fingerprinted {} of {} files ({})",
        outcome.stats.files_hashed,
        outcome.stats.files_seen,
        format_size(outcome.stats.bytes_hashed, DECIMAL)
    );
    println!("Found {} duplicate groups", outcome.catalog.len());

    let store = CatalogStore::new(&args.catalog);
    let mut catalog = outcome.catalog;
    store
        .save(&catalog)
        .with_context(|| format!("saving catalog to {}", args.catalog.display()))?;
    println!("Catalog saved to {}", style(args.catalog.display()).bold());

    if catalog.is_empty() {
        println!("{}", style("No duplicate files found!").green().bold());
        return Ok(());
    }

    if args.post_process {
        resolve_and_report(&mut catalog, &store)?;
    }
    Ok(())
}

/// No `--path`: resolve a catalog saved by a previous run.
fn run_post_process(args: &Cli) -> Result<()> {
    let default = args.catalog.to_string_lossy().into_owned();
    let answer: String = dialoguer::Input::new()
        .with_prompt("Path to a previously generated catalog")
        .default(default)
        .interact_text()?;
    let catalog_path = PathBuf::from(answer);

    let proceed = dialoguer::Confirm::new()
        .with_prompt(
            "Be sure the source files have NOT changed since the catalog was created. Continue?",
        )
        .default(false)
        .interact()?;
    if !proceed {
        println!("{}", style("Exiting without changes").yellow());
        return Ok(());
    }

    let store = CatalogStore::new(&catalog_path);
    let mut catalog = store.load().context("loading duplicate catalog")?;
    if catalog.is_empty() {
        println!("{}", style("Catalog has no unresolved groups").green());
        return Ok(());
    }

    resolve_and_report(&mut catalog, &store)
}

/// Run the interactive resolution pass and summarize what happened.
fn resolve_and_report(catalog: &mut DuplicateCatalog, store: &CatalogStore) -> Result<()> {
    let mut prompter = StdinPrompter;
    let resolved = resolve_catalog(catalog, store, &mut prompter, &ListingViewer)?;

    println!();
    println!(
        "{} group(s) resolved, {} remaining in {}",
        resolved.len(),
        catalog.len(),
        store.path().display()
    );
    if catalog.is_empty() {
        println!("{}", style("All duplicate groups resolved!").green().bold());
    }
    Ok(())
}

/// Every skipped path gets a visible diagnostic.
fn report_skipped(errors: &[PathBuf]) {
    for path in errors {
        eprintln!(
            "{} skipped unreadable path: {}",
            style("Warning:").yellow(),
            path.display()
        );
    }
}
