//! Dump and convert command implementations.

use anyhow::{Context, Result};
use console::style;
use flashdump::{
    DumpFormat, DumpRequest, DumpSource, EncodeOptions, Encoded, FileSource, IntelHexOptions,
    MockPattern, MockSource, SRecordOptions, encode_with, parse_address, parse_length, read_dump,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::{CliError, EncodeArgs, Session};

/// Where a setting came from, for error attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Command line or environment variable.
    Cli,
    /// Configuration file.
    Config,
}

/// A raw setting with its origin.
#[derive(Debug, Clone, Copy)]
struct Setting<'a> {
    key: &'static str,
    value: &'a str,
    origin: Origin,
}

impl<'a> Setting<'a> {
    /// Command-line value first, then config value.
    fn pick(key: &'static str, cli: Option<&'a str>, config: Option<&'a str>) -> Option<Self> {
        cli.map(|value| Self {
            key,
            value,
            origin: Origin::Cli,
        })
        .or_else(|| {
            config.map(|value| Self {
                key,
                value,
                origin: Origin::Config,
            })
        })
    }

    /// Parse the value, blaming the config file when that is where it came from.
    fn parse<T>(self, parse: impl FnOnce(&str) -> flashdump::Result<T>) -> Result<T> {
        parse(self.value).map_err(|e| match self.origin {
            Origin::Cli => anyhow::Error::from(e),
            Origin::Config => {
                anyhow::Error::from(CliError::Config(format!(
                    "dump.{} = '{}': {e}",
                    self.key, self.value
                )))
            },
        })
    }
}

/// Build a dump source from its description.
///
/// `mock`, `mock:<pattern>` or `file:<path>[@<hex address>]`; a file without
/// an explicit address is mapped at `default_address`.
pub(crate) fn parse_source(
    spec: &str,
    default_address: u32,
) -> flashdump::Result<Box<dyn DumpSource>> {
    let spec = spec.trim();
    if spec == "mock" {
        return Ok(Box::new(MockSource::default()));
    }
    if let Some(pattern) = spec.strip_prefix("mock:") {
        return Ok(Box::new(MockSource::new(MockPattern::from_name(pattern)?)));
    }
    if let Some(rest) = spec.strip_prefix("file:") {
        // A trailing `@` only separates an address when one follows it.
        let (path, address) = rest
            .rsplit_once('@')
            .and_then(|(path, address)| Some((path, parse_address(address).ok()?)))
            .unwrap_or((rest, default_address));
        if path.is_empty() {
            return Err(flashdump::Error::InvalidInput("file source needs a path".into()));
        }
        return Ok(Box::new(FileSource::from_file(path, address)?));
    }
    Err(flashdump::Error::InvalidInput(format!(
        "unknown source '{spec}' (expected mock, mock:<pattern> or file:<path>)"
    )))
}

/// Resolve encoder options from flags and config.
fn encode_options(session: &Session, args: &EncodeArgs) -> EncodeOptions {
    EncodeOptions {
        intel_hex: IntelHexOptions::default()
            .with_extended_linear(args.ihex_extended || session.config.intel_hex.extended_linear),
        srecord: SRecordOptions::default()
            .with_computed_terminator(args.srec_computed || session.config.srecord.computed_terminator),
    }
}

/// Resolve the output format from flags and config.
fn output_format(session: &Session, args: &EncodeArgs) -> Result<DumpFormat> {
    match Setting::pick(
        "format",
        args.format.as_deref(),
        session.config.dump.format.as_deref(),
    ) {
        Some(setting) => setting.parse(str::parse),
        None => Ok(DumpFormat::default()),
    }
}

fn warn_on_truncation(request: &DumpRequest, options: &EncodeOptions) -> Result<()> {
    if request.format == DumpFormat::IntelHex
        && !options.intel_hex.extended_linear
        && request.length > 0
        && request.end_address()? > 0x1_0000
    {
        warn!(
            "Intel HEX addresses above 0xFFFF are truncated to 16 bits; \
             pass --ihex-extended to emit extended linear address records"
        );
    }
    Ok(())
}

/// Write the encoded output and report where it went.
fn write_output(session: &Session, encoded: &Encoded, format: DumpFormat, path: &Path) -> Result<()> {
    if path == Path::new("-") {
        encoded
            .write_to(io::stdout().lock())
            .context("Failed to write to stdout")?;
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    encoded
        .write_to(io::BufWriter::new(file))
        .with_context(|| format!("Failed to write output file: {}", path.display()))?;

    session.status(
        style("✓").green(),
        &format!(
            "Wrote {} bytes ({format}) to {}",
            encoded.len(),
            style(path.display()).yellow()
        ),
    );
    Ok(())
}

/// Dump command implementation.
pub(crate) fn cmd_dump(
    session: &Session,
    address: Option<&str>,
    length: Option<&str>,
    source: Option<&str>,
    args: &EncodeArgs,
) -> Result<()> {
    let dump_config = &session.config.dump;

    let address = match Setting::pick("address", address, dump_config.address.as_deref()) {
        Some(setting) => setting.parse(parse_address)?,
        None => 0,
    };
    let length = Setting::pick("length", length, dump_config.length.as_deref())
        .ok_or_else(|| {
            CliError::Usage("missing --length (or dump.length in flashdump.toml)".into())
        })?
        .parse(parse_length)?;
    let format = output_format(session, args)?;
    let request = DumpRequest::new(address, length, format)?;
    let options = encode_options(session, args);
    warn_on_truncation(&request, &options)?;

    let source_setting = Setting::pick("source", source, dump_config.source.as_deref());
    let mut source: Box<dyn DumpSource> = match source_setting {
        Some(setting) => setting.parse(|spec| parse_source(spec, address))?,
        None => Box::new(MockSource::default()),
    };

    info!(
        "Dumping {} bytes @ 0x{:08X} from {} as {}",
        request.length,
        request.address,
        source.name(),
        request.format
    );

    let pb = if session.quiet || !session.fancy {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(request.length as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")?
                .progress_chars("#>-"),
        );
        pb
    };

    let bytes = read_dump(&mut source, &request, &mut |done, _total| {
        pb.set_position(done as u64);
    })
    .map_err(|e| match e {
        flashdump::Error::Interrupted => anyhow::Error::from(CliError::Cancelled("Dump interrupted".into())),
        other => anyhow::Error::from(other).context(format!("Failed to read from {}", source.name())),
    })?;
    pb.finish_and_clear();

    let encoded = encode_with(&bytes, request.address, request.format, &options);

    let path = match &args.output {
        Some(path) => path.clone(),
        None => {
            let name = format!("dump_{:08X}.{}", request.address, request.format.extension());
            dump_config
                .output_dir
                .as_ref()
                .map_or_else(|| PathBuf::from(&name), |dir| dir.join(&name))
        },
    };
    write_output(session, &encoded, request.format, &path)
}

/// Convert command implementation.
pub(crate) fn cmd_convert(
    session: &Session,
    input: &Path,
    address: &str,
    args: &EncodeArgs,
) -> Result<()> {
    let address = parse_address(address)?;
    let format = output_format(session, args)?;
    let options = encode_options(session, args);

    let source = FileSource::from_file(input, address)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;
    let request = DumpRequest::new(address, source.len(), format)?;
    warn_on_truncation(&request, &options)?;

    info!(
        "Converting {} ({} bytes @ 0x{:08X}) to {}",
        input.display(),
        source.len(),
        address,
        format
    );
    let encoded = encode_with(source.data(), address, format, &options);

    let path = match &args.output {
        Some(path) => path.clone(),
        None => {
            let path = input.with_extension(format.extension());
            if path == input {
                return Err(CliError::Usage(format!(
                    "refusing to overwrite {}; pass --output",
                    input.display()
                ))
                .into());
            }
            path
        },
    };
    write_output(session, &encoded, format, &path)
}
