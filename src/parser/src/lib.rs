use std::{
    error::Error,
    ffi::OsStr,
    fmt::{self, Display, Formatter},
    fs::File,
    path::{Path, PathBuf},
};

use located_error::*;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use log::debug;
use anyhow::{anyhow, Result};

mod error;
pub use error::ParserError;

#[derive(Parser, Debug, Serialize, Deserialize)]
#[clap(name = "pfp-rs", author, version, about, long_about = None)]
#[clap(propagate_version = true)]
/// A prefix-free parse pangenome engine.
pub struct Cli {
    /// Set the verbosity level (-v -vv -vvv)
    ///
    /// Set the verbosity level of this program. Multiple levels allowed {n}
    ///
    /// -v: Info  |  -vv: Debug  | -vvv: Trace {n}
    ///
    /// Note that the program will still output warnings by default, even when this flag is off.
    /// Use --quiet/-q to disable them.
    #[clap(short = 'v', long, parse(from_occurrences), global = true)]
    pub verbose: u8,

    /// Disable warnings.
    ///
    /// By default, warnings are emitted and redirected to the console, even when verbose mode is
    /// off. Use this argument to disable this. Only errors will be displayed.
    #[clap(short = 'q', long, global = true)]
    pub quiet: bool,

    #[clap(subcommand)]
    pub commands: Commands,
}

impl Cli {
    /// Serialize command line arguments within a `.yaml` file.
    ///
    /// # Behavior
    /// - File naming follows the convention '{current time}-{subcommand}.yaml'. current time
    ///   follows the format `YYYY`-`MM`-`DD`T`hhmmss`
    /// - File is written at the root of the run's `--output-dir` folder.
    ///
    /// # Errors
    /// Sends an unrecoverable error if `serde_yaml` fails to parse `Self` to a string.
    pub fn serialize(&self) -> Result<(), Box<dyn Error>> {
        let serialized = serde_yaml::to_string(&self)
            .map_err(|err| format!("Failed to serialize command line arguments. got [{err}]"))?;

        debug!("\n---- Command line args ----\n{}\n---", serialized);

        let current_time = chrono::offset::Local::now().format("%Y-%m-%dT%H%M%S").to_string();

        let output_file = match &self.commands {
            Commands::Build { common, build: _ } => {
                let dir_string = common.output_dir.to_str().expect("Invalid characters in directory");
                format!("{dir_string}/{current_time}-build.yaml")
            },
            Commands::FromFasta { common, standalone: _ } => {
                let dir_string = common.output_dir.to_str().expect("Invalid characters in directory");
                format!("{dir_string}/{current_time}-from-fasta.yaml")
            },
            Commands::FromText { common, standalone: _ } => {
                let dir_string = common.output_dir.to_str().expect("Invalid characters in directory");
                format!("{dir_string}/{current_time}-from-text.yaml")
            },
            Commands::AuPair { aupair } => {
                let dir_string = aupair.output_dir.to_str().expect("Invalid characters in directory");
                format!("{dir_string}/{current_time}-aupair.yaml")
            },
            Commands::FromYaml { yaml: _ } => return Ok(()),
        };

        match std::fs::write(&output_file, serialized) {
            Err(e) => Err(format!("Unable to serialize arguments into {output_file}: [{e}]").into()),
            Ok(()) => Ok(()),
        }
    }

    /// Deserialize a `.yaml` file into command line arguments.
    ///
    /// # Errors
    /// - Returns an I/O error if the provided `.yaml` is invalid, or does not carry read permissions.
    /// - Sends an unrecoverable error if `serde_yaml` fails to parse the provided file to `Self`.
    pub fn deserialize(yaml: PathBuf) -> Result<Self, Box<dyn Error>> {
        Ok(serde_yaml::from_reader(File::open(yaml)?)?)
    }
}

#[derive(Subcommand, Debug, Serialize, Deserialize)]
pub enum Commands {
    /// Build a dictionary and parse from a reference plus a VCF-driven set of samples.
    Build {
        #[clap(flatten)]
        common: Common,
        #[clap(flatten)]
        build: BuildArgs,
    },

    /// Build a dictionary and parse from a reference plus standalone FASTA(.gz) samples.
    ///
    /// Each sample record is parsed the same way the reference is, skipping the VCF-driven
    /// haplotype state machine entirely.
    FromFasta {
        #[clap(flatten)]
        common: Common,
        #[clap(flatten)]
        standalone: StandaloneFasta,
    },

    /// Build a dictionary and parse from a reference plus standalone plain-text samples.
    ///
    /// Each input file must contain exactly one sequence, with no FASTA header.
    FromText {
        #[clap(flatten)]
        common: Common,
        #[clap(flatten)]
        standalone: StandaloneText,
    },

    /// Contract an existing dictionary/parse pair with the AuPair algorithm.
    AuPair {
        #[clap(flatten)]
        aupair: AuPairArgs,
    },

    /// Run pfp-rs using a previously generated .yaml configuration file.
    ///
    /// This allows users to easily re-apply a pfp-rs command using the exact same parameters
    /// and arguments.
    FromYaml {
        yaml: PathBuf,
    },
}

#[derive(Parser, Debug, Serialize, Deserialize)]
pub struct Common {
    /// Trigger-window length, in bytes.
    ///
    /// The rolling hash is computed over a sliding window of this many bytes; phrases are cut
    /// wherever the hash triggers. Must be at least 1.
    #[clap(long, default_value("10"), parse(try_from_str = parse_window))]
    pub window: usize,

    /// Trigger modulus.
    ///
    /// A window triggers a phrase cut when its rolling hash is congruent to 0 modulo this
    /// value. Lower values yield shorter, more numerous phrases. Must be at least 1.
    #[clap(short, long, default_value("100"), parse(try_from_str = parse_modulus))]
    pub modulus: u64,

    /// One or more reference FASTA files (optionally gzip-compressed), in intended genome order.
    #[clap(short, long, required(true), multiple_values(true), parse(try_from_os_str = valid_input_file))]
    pub reference: Vec<PathBuf>,

    /// Output directory where the dictionary, parse, and sidecar files will be written.
    #[clap(short, long, default_value("pfp-output"), parse(try_from_os_str = valid_output_dir))]
    pub output_dir: PathBuf,

    /// Overwrite existing output files.
    ///
    /// By default, pfp-rs refuses to overwrite an existing results file. Use this flag to force
    /// this behavior.
    #[clap(short = 'w', long)]
    pub overwrite: bool,

    /// Number of worker threads used to parse samples.
    ///
    /// A value of 0 (the default) lets the pool size itself to the available parallelism.
    #[clap(short, long, default_value("0"))]
    pub threads: usize,

    /// Enable acceleration: reuse reference-parse boundaries for samples that track the
    /// reference exactly across a stretch of bytes, instead of re-hashing them.
    #[clap(long)]
    pub use_acceleration: bool,

    /// Maintain per-phrase occurrence counts and emit them in a `.occ` sidecar file.
    #[clap(long)]
    pub compute_occurrences: bool,

    /// Emit a `.lidx` sidecar file with one `<name> <length>` line per contig per sample.
    #[clap(long)]
    pub report_lengths: bool,

    /// Emit a `.ldx` lifting index, allowing sample coordinates to be translated back to
    /// reference coordinates.
    #[clap(long)]
    pub compute_lifting: bool,

    /// Additionally emit a compressed dictionary variant (`.dicz` + `.dicz.len`).
    #[clap(long)]
    pub compress_dictionary: bool,

    /// Run AuPair contraction immediately after the main pass completes.
    #[clap(long)]
    pub aupair: bool,

    /// Byte budget for the post-pass AuPair contraction. Requires `--aupair`.
    #[clap(long, required(false))]
    pub aupair_budget: Option<u64>,
}

impl Common {
    /// Sanity check: `--aupair-budget` only makes sense alongside `--aupair`.
    ///
    /// # Errors
    /// If `--aupair-budget` was given without `--aupair`.
    pub fn check_aupair(&self) -> Result<(), ParserError> {
        if self.aupair_budget.is_some() && !self.aupair {
            return Err(ParserError::AuPairBudgetWithoutAuPair);
        }
        Ok(())
    }

    /// Derive an output file-name prefix from the first reference file's stem.
    ///
    /// # Errors
    /// If a prefix cannot be extracted from the first reference path.
    pub fn get_file_prefix(&self) -> Result<PathBuf> {
        let stem = self.reference.first()
            .and_then(|path| path.file_stem())
            .ok_or_else(|| anyhow!(ParserError::ParseOutputPrefix))
            .loc("While parsing command line arguments")?;

        let mut parsed_file = PathBuf::new();
        parsed_file.push(&self.output_dir);
        parsed_file.push(stem);
        Ok(parsed_file)
    }

    /// Check if a given file already exists; raise an error if such is the case and the user did
    /// not explicitly allow file overwriting.
    ///
    /// # Errors
    /// - If `pathbuf` already exists and `--overwrite` was not given.
    pub fn can_write_file(&self, pathbuf: &Path) -> Result<bool> {
        if !self.overwrite && pathbuf.exists() {
            return Err(ParserError::CannotOverwrite(pathbuf.display().to_string()))
                .loc("While parsing command line arguments");
        }
        Ok(true)
    }
}

/// Run pfp-rs against a VCF-driven set of samples.
#[derive(Args, Debug, Serialize, Deserialize)]
pub struct BuildArgs {
    /// One or more VCF files (optionally gzip-compressed), in intended genome order.
    #[clap(long, required(true), multiple_values(true), parse(try_from_os_str = valid_input_file))]
    pub vcf: Vec<PathBuf>,

    /// Upper bound on the number of samples processed per VCF file.
    #[clap(long, required(false))]
    pub max_samples: Option<usize>,

    /// Restrict processing to the sample ids listed in this file (one per line).
    ///
    /// `--max-samples` still applies as an additional cap on top of the allow-list.
    #[clap(long, required(false), parse(try_from_os_str = valid_input_file))]
    pub allow_list: Option<PathBuf>,
}

/// Run pfp-rs against standalone FASTA(.gz) samples, with no variant context.
#[derive(Args, Debug, Serialize, Deserialize)]
pub struct StandaloneFasta {
    /// One or more FASTA(.gz) sample files.
    #[clap(long, required(true), multiple_values(true), parse(try_from_os_str = valid_input_file))]
    pub sample: Vec<PathBuf>,

    /// Upper bound on the number of samples processed.
    #[clap(long, required(false))]
    pub max_samples: Option<usize>,
}

/// Run pfp-rs against standalone plain-text samples, with no variant context.
#[derive(Args, Debug, Serialize, Deserialize)]
pub struct StandaloneText {
    /// One or more plain-text sample files, each containing exactly one sequence.
    #[clap(long, required(true), multiple_values(true), parse(try_from_os_str = valid_input_file))]
    pub sample: Vec<PathBuf>,

    /// Upper bound on the number of samples processed.
    #[clap(long, required(false))]
    pub max_samples: Option<usize>,
}

/// Contract an existing dictionary/parse pair with the AuPair algorithm.
#[derive(Args, Debug, Serialize, Deserialize)]
pub struct AuPairArgs {
    /// Path to an existing `.dict` file.
    #[clap(long, parse(try_from_os_str = valid_input_file))]
    pub dict: PathBuf,

    /// Path to the `.parse` file matching `--dict`.
    #[clap(long, parse(try_from_os_str = valid_input_file))]
    pub parse: PathBuf,

    /// Trigger-window length that produced `--dict`/`--parse`. Must be at least 1.
    #[clap(long, default_value("10"), parse(try_from_str = parse_window))]
    pub window: usize,

    /// Byte budget for the contraction.
    #[clap(short, long)]
    pub budget: u64,

    /// Output directory for `.n_dict`/`.n_parse`.
    #[clap(short, long, default_value("pfp-output"), parse(try_from_os_str = valid_output_dir))]
    pub output_dir: PathBuf,

    /// Overwrite existing output files.
    #[clap(short = 'w', long)]
    pub overwrite: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum FileEntity {
    File,
    Directory,
}

impl Display for FileEntity {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::File => write!(f, "File"),
            Self::Directory => write!(f, "Directory"),
        }
    }
}

impl FileEntity {
    fn validate(&self, path: &Path) -> Result<(), ParserError> {
        use ParserError::InvalidFileEntity;
        let valid = match self {
            Self::File => path.is_file(),
            Self::Directory => path.is_dir(),
        };

        if valid {
            Ok(())
        } else {
            Err(InvalidFileEntity(*self, path.display().to_string()))
        }
    }
}

fn assert_filesystem_entity_is_valid(s: &OsStr, entity: &FileEntity) -> Result<()> {
    use ParserError::MissingFileEntity;
    let path = Path::new(s);
    if !path.exists() {
        return Err(MissingFileEntity(*entity, path.display().to_string()))
            .loc("While parsing arguments.");
    }

    entity.validate(path).loc("While parsing arguments.")
}

fn valid_input_file(s: &OsStr) -> Result<PathBuf> {
    assert_filesystem_entity_is_valid(s, &FileEntity::File)
        .loc("While checking for file validity")?;
    Ok(PathBuf::from(s))
}

fn valid_output_dir(s: &OsStr) -> Result<PathBuf> {
    if !Path::new(s).exists() {
        std::fs::create_dir(s)?;
    }
    assert_filesystem_entity_is_valid(s, &FileEntity::Directory)
        .loc("While checking for directory validity")?;
    Ok(PathBuf::from(s))
}

fn parse_window(s: &str) -> Result<usize> {
    let window: usize = s.parse().with_loc(|| format!("While parsing {s}"))?;
    if window < 1 {
        return Err(anyhow!(ParserError::InvalidWindow(window))).with_loc(|| format!("While parsing {s}"));
    }
    Ok(window)
}

fn parse_modulus(s: &str) -> Result<u64> {
    let modulus: u64 = s.parse().with_loc(|| format!("While parsing {s}"))?;
    if modulus < 1 {
        return Err(anyhow!(ParserError::InvalidModulus(modulus))).with_loc(|| format!("While parsing {s}"));
    }
    Ok(modulus)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_window_rejects_zero() {
        assert!(parse_window("0").is_err());
        assert!(parse_window("10").is_ok());
    }

    #[test]
    fn parse_modulus_rejects_zero() {
        assert!(parse_modulus("0").is_err());
        assert!(parse_modulus("100").is_ok());
    }

    #[test]
    fn file_entity_display_matches_variant() {
        assert_eq!(FileEntity::File.to_string(), "File");
        assert_eq!(FileEntity::Directory.to_string(), "Directory");
    }

    #[test]
    fn valid_input_file_rejects_missing_path() {
        assert!(valid_input_file(OsStr::new("/no/such/file/hopefully")).is_err());
    }

    #[test]
    fn valid_output_dir_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("fresh-output");
        assert!(!target.exists());
        let created = valid_output_dir(target.as_os_str()).unwrap();
        assert!(created.is_dir());
    }
}
