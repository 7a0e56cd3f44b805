//! protoguess - Inspect Protocol Buffer blobs without a schema
//!
//! Decodes unknown binary payloads into a best-effort JSON view of their
//! structure, and encodes that JSON view back into bytes.

mod json;

use anyhow::{bail, Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::{Args, Parser, ValueEnum};
use protoguess_core::{Decoder, DecoderConfig, Encoder, TextEncoding, DEFAULT_MAX_DEPTH};
use std::collections::HashSet;
use std::fs;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Upper bound for `--max-depth`; each level is one native stack frame
const MAX_CLI_DEPTH: u64 = 1024;

/// Inspect Protocol Buffer blobs without a schema
#[derive(Parser, Debug)]
#[command(name = "protoguess")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Decode binary input to JSON, or encode JSON input to binary
    #[arg(long, value_enum, default_value = "decode")]
    mode: Mode,

    /// Text encoding for undecodable payloads and for text values when encoding
    #[arg(short, long, default_value = "utf-8")]
    encoding: TextEncoding,

    /// Keep undecodable payloads as bytes instead of converting them to text
    #[arg(long)]
    raw: bool,

    /// Maximum message nesting depth to decode (at most 1024)
    #[arg(
        long,
        env = "PROTOGUESS_MAX_DEPTH",
        default_value_t = DEFAULT_MAX_DEPTH,
        value_parser = RangedU64ValueParser::<usize>::new().range(0..=MAX_CLI_DEPTH)
    )]
    max_depth: usize,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Write output to this file instead of standard output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Input source; standard input when neither is given
#[derive(Args, Debug)]
#[group(required = false, multiple = false)]
struct InputMode {
    /// Path to a single blob
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of blobs to decode
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Direction of the conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Binary to JSON
    Decode,
    /// JSON to binary
    Encode,
}

/// Tracks blob hashes already seen in directory mode
#[derive(Default)]
struct BlobRegistry {
    seen: HashSet<String>,
    stats: RegistryStats,
}

#[derive(Default)]
struct RegistryStats {
    total_found: usize,
    duplicates_skipped: usize,
    decoded: usize,
    raw: usize,
}

impl BlobRegistry {
    fn new() -> Self {
        Self::default()
    }

    /// Full blake3 hash of the content, hex-encoded
    fn content_hash(data: &[u8]) -> String {
        blake3::hash(data).to_hex().to_string()
    }

    /// Registers a blob hash, returning false if it was already seen
    fn register(&mut self, content_hash: &str) -> bool {
        self.stats.total_found += 1;

        if !self.seen.insert(content_hash.to_string()) {
            self.stats.duplicates_skipped += 1;
            return false;
        }
        true
    }

    fn print_summary(&self) {
        info!(
            "Summary: {} found, {} duplicates skipped, {} decoded as messages, {} left raw",
            self.stats.total_found,
            self.stats.duplicates_skipped,
            self.stats.decoded,
            self.stats.raw
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    run(&cli)
}

/// Produces the whole output in memory, then writes it out.
///
/// The output file is only created once processing succeeded, so `-o` may
/// name the input file and a failed run leaves an existing output intact.
fn run(cli: &Cli) -> Result<()> {
    let mut out = Vec::new();

    match (cli.mode, &cli.input.directory) {
        (Mode::Decode, Some(directory)) => process_directory(cli, directory, &mut out)?,
        (Mode::Encode, Some(_)) => bail!("--directory can only be used with --mode decode"),
        (Mode::Decode, None) => process_decode(cli, &mut out)?,
        (Mode::Encode, None) => process_encode(cli, &mut out)?,
    }

    write_output(cli.output.as_deref(), &out)
}

fn write_output(path: Option<&Path>, data: &[u8]) -> Result<()> {
    match path {
        Some(path) => fs::write(path, data)
            .with_context(|| format!("Failed to write file: {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush().context("Failed to flush output")
        }
    }
}

fn decoder_for(cli: &Cli) -> Decoder {
    let encoding = (!cli.raw).then_some(cli.encoding);
    Decoder::with_config(
        DecoderConfig::new()
            .max_depth(cli.max_depth)
            .text_encoding(encoding),
    )
}

/// Serialize a JSON value on one line, or pretty-printed
fn render(value: &serde_json::Value, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}

/// Decode a single file or standard input, streaming from the source
fn process_decode(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let decoder = decoder_for(cli);

    let value = match &cli.input.file {
        Some(file) => {
            debug!("Decoding {}", file.display());
            let reader = fs::File::open(file)
                .with_context(|| format!("Failed to read input file: {}", file.display()))?;
            decoder
                .decode_reader(BufReader::new(reader))
                .with_context(|| format!("Failed to read input file: {}", file.display()))?
        }
        None => {
            debug!("Decoding standard input");
            decoder
                .decode_reader(io::stdin().lock())
                .context("Failed to read standard input")?
        }
    };

    if value.is_raw() {
        info!("Input is not a protobuf message, printing it unchanged");
    }

    writeln!(out, "{}", render(&json::to_json(&value), cli.pretty)?)?;
    Ok(())
}

/// Encode JSON from a single file or standard input to binary
fn process_encode(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let source = match &cli.input.file {
        Some(file) => fs::read_to_string(file)
            .with_context(|| format!("Failed to read input file: {}", file.display()))?,
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("Failed to read standard input")?;
            source
        }
    };

    let parsed: serde_json::Value =
        serde_json::from_str(&source).context("Input is not valid JSON")?;
    let value = json::from_json(&parsed)?;

    let bytes = Encoder::with_text_encoding(cli.encoding)
        .encode(&value)
        .context("Failed to encode value")?;

    debug!("Encoded {} bytes", bytes.len());
    out.write_all(&bytes)?;
    Ok(())
}

/// Decode every unique blob under a directory, one JSON line per blob
fn process_directory(cli: &Cli, directory: &Path, out: &mut impl Write) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let decoder = decoder_for(cli);
    let mut registry = BlobRegistry::new();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        // Skip directories
        if !path.is_file() {
            continue;
        }

        // Skip hidden files
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
        {
            trace!("Skipping hidden file: {}", path.display());
            continue;
        }

        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                // Log error but continue with other files
                warn!("Error reading {}: {}", path.display(), e);
                continue;
            }
        };

        let content_hash = BlobRegistry::content_hash(&data);
        if !registry.register(&content_hash) {
            debug!("Skipping duplicate: {} (hash: {})", path.display(), content_hash);
            continue;
        }

        let value = decoder.decode(&data);
        if value.is_raw() {
            registry.stats.raw += 1;
        } else {
            registry.stats.decoded += 1;
        }

        let line = serde_json::json!({
            "path": path.display().to_string(),
            "blake3": content_hash,
            "value": json::to_json(&value),
        });
        writeln!(out, "{}", render(&line, cli.pretty)?)?;
    }

    registry.print_summary();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("protoguess").chain(args.iter().copied()))
    }

    #[test]
    fn test_blob_registry_deduplication() {
        let mut registry = BlobRegistry::new();
        let hash = BlobRegistry::content_hash(&[0x08, 0x01]);

        assert!(registry.register(&hash));
        assert!(!registry.register(&hash));
        assert!(registry.register(&BlobRegistry::content_hash(&[0x08, 0x02])));

        assert_eq!(registry.stats.total_found, 3);
        assert_eq!(registry.stats.duplicates_skipped, 1);
    }

    #[test]
    fn test_content_hash() {
        let hash1 = BlobRegistry::content_hash(b"hello");
        let hash2 = BlobRegistry::content_hash(b"hello");
        let hash3 = BlobRegistry::content_hash(b"world");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_decode_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("blob.bin");
        fs::write(&path, [0x12, 0x02, 0x08, 0x05]).unwrap();

        let cli = cli(&["-f", path.to_str().unwrap()]);
        let mut out = Vec::new();
        process_decode(&cli, &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "{\"2\":{\"1\":5}}\n");
    }

    #[test]
    fn test_decode_file_fallback_text() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("blob.txt");
        fs::write(&path, "plain text").unwrap();

        let mut out = Vec::new();
        process_decode(&cli(&["-f", path.to_str().unwrap()]), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\"plain text\"\n");

        let mut out = Vec::new();
        process_decode(&cli(&["--raw", "-f", path.to_str().unwrap()]), &mut out).unwrap();
        let expected = format!("{{\"$bytes\":\"{}\"}}\n", json::to_hex(b"plain text"));
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_encode_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("value.json");
        fs::write(&path, r#"{"1": 150, "2": {"1": 5}, "3": {"$f32": 1.5}}"#).unwrap();

        let mut out = Vec::new();
        process_encode(&cli(&["--mode", "encode", "-f", path.to_str().unwrap()]), &mut out).unwrap();

        let mut expected = vec![0x08, 0x96, 0x01, 0x12, 0x02, 0x08, 0x05, 0x1D];
        expected.extend_from_slice(&1.5f32.to_le_bytes());
        assert_eq!(out, expected);
    }

    #[test]
    fn test_encode_rejects_top_level_integer() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("value.json");
        fs::write(&path, "42").unwrap();

        let mut out = Vec::new();
        let cli = cli(&["--mode", "encode", "-f", path.to_str().unwrap()]);
        assert!(process_encode(&cli, &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_failed_encode_keeps_existing_output() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("bad.json");
        let output = temp_dir.path().join("out.bin");
        fs::write(&input, "{not json").unwrap();
        fs::write(&output, [1, 2, 3]).unwrap();

        let cli = cli(&[
            "--mode",
            "encode",
            "-f",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ]);
        assert!(run(&cli).is_err());
        assert_eq!(fs::read(&output).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_output_may_overwrite_input() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("blob.bin");
        fs::write(&path, [0x08, 0x96, 0x01]).unwrap();

        let path = path.to_str().unwrap();
        run(&cli(&["-f", path, "-o", path])).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "{\"1\":150}\n");
    }

    #[test]
    fn test_max_depth_is_bounded() {
        assert_eq!(cli(&["--max-depth", "1024"]).max_depth, 1024);
        assert_eq!(cli(&[]).max_depth, DEFAULT_MAX_DEPTH);
        assert!(Cli::try_parse_from(["protoguess", "--max-depth", "1025"]).is_err());
        assert!(Cli::try_parse_from(["protoguess", "--max-depth", "-1"]).is_err());
    }

    #[test]
    fn test_process_directory_skips_duplicates_and_hidden() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.bin"), [0x08, 0x01]).unwrap();
        fs::write(temp_dir.path().join("b.bin"), [0x08, 0x01]).unwrap();
        fs::write(temp_dir.path().join("c.bin"), [0x18, 0x01, 0x08, 0x01]).unwrap();
        fs::write(temp_dir.path().join(".hidden"), [0x08, 0x02]).unwrap();

        let cli = cli(&["--raw", "-d", temp_dir.path().to_str().unwrap()]);
        let mut out = Vec::new();
        process_directory(&cli, temp_dir.path(), &mut out).unwrap();

        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0]["path"].as_str().unwrap().ends_with("a.bin"));
        assert_eq!(lines[0]["value"], serde_json::json!({"1": 1}));
        assert!(lines[1]["path"].as_str().unwrap().ends_with("c.bin"));
        assert_eq!(lines[1]["value"], serde_json::json!({"$bytes": "18010801"}));
        assert_eq!(
            lines[1]["blake3"].as_str().unwrap(),
            BlobRegistry::content_hash(&[0x18, 0x01, 0x08, 0x01])
        );
    }

    #[test]
    fn test_process_directory_missing() {
        let cli = cli(&["-d", "/nonexistent/protoguess"]);
        let mut out = Vec::new();
        assert!(process_directory(&cli, Path::new("/nonexistent/protoguess"), &mut out).is_err());
    }

    #[test]
    fn test_parse_encoding_flag() {
        assert_eq!(cli(&["-e", "latin1"]).encoding, TextEncoding::Latin1);
        assert!(Cli::try_parse_from(["protoguess", "-e", "ebcdic"]).is_err());
        assert!(Cli::try_parse_from(["protoguess", "-f", "a", "-d", "b"]).is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
