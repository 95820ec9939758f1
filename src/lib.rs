//! Wires command-line arguments into ingestion ([`pfp_io`]), the reference/sample parse engine
//! ([`pfp_core`]), and output writing. [`run`] is the library-level entry point; `src/bin/main.rs`
//! only parses [`parser::Cli`], initializes the logger, and maps a returned error to a process
//! exit code.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use located_error::prelude::*;
use log::info;
use rayon::ThreadPool;

use genome::{Contig, ContigInstance, Sample, SampleTag};
use parser::{AuPairArgs, BuildArgs, Cli, Commands, Common, StandaloneFasta, StandaloneText};
use pfp_core::{
    build_reference_parse, parse_sample, parse_standalone, DictionaryError, FinalizedDictionary, PhraseDictionary, ReferenceParse,
    WorkerSampleOutput,
};

pub fn run(cli: Cli) -> Result<()> {
    match cli.commands {
        Commands::Build { common, build } => run_build(&common, &build),
        Commands::FromFasta { common, standalone } => run_from_fasta(&common, &standalone),
        Commands::FromText { common, standalone } => run_from_text(&common, &standalone),
        Commands::AuPair { aupair } => run_aupair(&aupair),
        Commands::FromYaml { yaml } => {
            let replayed = Cli::deserialize(yaml).map_err(|e| anyhow!(e.to_string()))?;
            run(replayed)
        }
    }
}

/// Paths of every output file a `Build`/`FromFasta`/`FromText` run may produce, derived once
/// from the reference's file-name stem (SPEC_FULL.md §6).
struct OutputPaths {
    dict: PathBuf,
    dicz: PathBuf,
    dicz_len: PathBuf,
    parse: PathBuf,
    occ: PathBuf,
    lidx: PathBuf,
    ldx: PathBuf,
    n_dict: PathBuf,
    n_parse: PathBuf,
}

impl OutputPaths {
    fn new(prefix: &Path) -> Self {
        Self {
            dict: with_ext(prefix, ".dict"),
            dicz: with_ext(prefix, ".dicz"),
            dicz_len: with_ext(prefix, ".dicz.len"),
            parse: with_ext(prefix, ".parse"),
            occ: with_ext(prefix, ".occ"),
            lidx: with_ext(prefix, ".lidx"),
            ldx: with_ext(prefix, ".ldx"),
            n_dict: with_ext(prefix, ".n_dict"),
            n_parse: with_ext(prefix, ".n_parse"),
        }
    }

    /// Rejects the run up front if any output file this configuration would produce already
    /// exists and `--overwrite` was not given, rather than failing midway through writing.
    fn check_overwrite(&self, common: &Common) -> Result<()> {
        common.can_write_file(&self.dict)?;
        common.can_write_file(&self.parse)?;
        if common.compress_dictionary {
            common.can_write_file(&self.dicz)?;
            common.can_write_file(&self.dicz_len)?;
        }
        if common.compute_occurrences {
            common.can_write_file(&self.occ)?;
        }
        if common.report_lengths {
            common.can_write_file(&self.lidx)?;
        }
        if common.compute_lifting {
            common.can_write_file(&self.ldx)?;
        }
        if common.aupair {
            common.can_write_file(&self.n_dict)?;
            common.can_write_file(&self.n_parse)?;
        }
        Ok(())
    }
}

fn with_ext(prefix: &Path, ext: &str) -> PathBuf {
    let mut p = prefix.as_os_str().to_owned();
    p.push(ext);
    PathBuf::from(p)
}

fn run_build(common: &Common, build: &BuildArgs) -> Result<()> {
    common.check_aupair().with_loc(|| "While validating command line arguments")?;
    let prefix = common.get_file_prefix()?;
    let paths = OutputPaths::new(&prefix);
    paths.check_overwrite(common)?;

    info!("Reading reference from {} file(s)...", common.reference.len());
    let mut contigs = pfp_io::read_fasta(&common.reference, common.threads).with_loc(|| "While reading the reference FASTA")?;

    let allow_list =
        build.allow_list.as_deref().map(pfp_io::read_sample_list).transpose().with_loc(|| "While reading the sample allow-list")?;

    info!("Reading VCF-driven samples from {} file(s)...", build.vcf.len());
    let (selections, ingestion_summary) =
        pfp_io::read_vcf(&build.vcf, &mut contigs, common.threads, build.max_samples, allow_list.as_deref())
            .with_loc(|| "While reading VCF input")?;
    if ingestion_summary.total_skipped() > 0 {
        info!(
            "Skipped {} VCF record(s): {} malformed, {} unknown contig, {} unparseable position, {} symbolic ALT, {} overlapping",
            ingestion_summary.total_skipped(),
            ingestion_summary.malformed_lines,
            ingestion_summary.unknown_contig,
            ingestion_summary.unparseable_position,
            ingestion_summary.symbolic_allele,
            ingestion_summary.overlapping_variation,
        );
    }

    let contigs: Vec<Arc<Contig>> = contigs.into_iter().map(Arc::new).collect();

    let dictionary = PhraseDictionary::new();
    info!("Building the reference parse ({} contig(s))...", contigs.len());
    let reference_parse =
        build_reference_parse(&contigs, common.window, common.modulus, &dictionary).with_loc(|| "While building the reference parse")?;

    let samples = selections_to_samples(&contigs, selections);
    let lifting_entries = common.compute_lifting.then(|| build_lifting_entries(&samples));

    info!("Parsing {} sample(s)...", samples.len());
    let pool = build_thread_pool(common.threads)?;
    let worker_outputs = dispatch(&pool, samples, |sample| {
        parse_sample(sample, 0, common.window, common.modulus, &dictionary, &reference_parse, common.use_acceleration)
    })?;

    finish(common, &paths, dictionary, Some((contigs.as_slice(), &reference_parse)), worker_outputs, lifting_entries)
}

fn run_from_fasta(common: &Common, standalone: &StandaloneFasta) -> Result<()> {
    let prefix = common.get_file_prefix()?;
    let paths = OutputPaths::new(&prefix);
    paths.check_overwrite(common)?;

    let mut records: Vec<(SampleTag, Vec<u8>)> = Vec::new();
    for path in &standalone.sample {
        for (name, bytes) in
            pfp_io::read_fasta_samples(path, common.threads).with_loc(|| format!("While reading sample FASTA {}", path.display()))?
        {
            records.push((SampleTag::from(name), bytes));
        }
    }
    if let Some(max) = standalone.max_samples {
        records.truncate(max);
    }

    info!("Parsing {} standalone FASTA sample(s)...", records.len());
    let dictionary = PhraseDictionary::new();
    let pool = build_thread_pool(common.threads)?;
    let worker_outputs = dispatch(&pool, records, |(tag, bytes)| {
        parse_standalone(tag, std::slice::from_ref(&bytes), common.window, common.modulus, &dictionary)
    })?;

    finish(common, &paths, dictionary, None, worker_outputs, None)
}

fn run_from_text(common: &Common, standalone: &StandaloneText) -> Result<()> {
    let prefix = common.get_file_prefix()?;
    let paths = OutputPaths::new(&prefix);
    paths.check_overwrite(common)?;

    let mut records: Vec<(SampleTag, Vec<u8>)> = Vec::new();
    for path in &standalone.sample {
        let bytes = pfp_io::read_text_sample(path).with_loc(|| format!("While reading plain-text sample {}", path.display()))?;
        let tag = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string());
        records.push((SampleTag::from(tag), bytes));
    }
    if let Some(max) = standalone.max_samples {
        records.truncate(max);
    }

    info!("Parsing {} standalone plain-text sample(s)...", records.len());
    let dictionary = PhraseDictionary::new();
    let pool = build_thread_pool(common.threads)?;
    let worker_outputs = dispatch(&pool, records, |(tag, bytes)| {
        parse_standalone(tag, std::slice::from_ref(&bytes), common.window, common.modulus, &dictionary)
    })?;

    finish(common, &paths, dictionary, None, worker_outputs, None)
}

fn run_aupair(aupair: &AuPairArgs) -> Result<()> {
    let stem = aupair.dict.file_stem().map(std::ffi::OsStr::to_owned).unwrap_or_default();
    let mut prefix = aupair.output_dir.clone();
    prefix.push(stem);
    let n_dict = with_ext(&prefix, ".n_dict");
    let n_parse = with_ext(&prefix, ".n_parse");
    if !aupair.overwrite {
        for path in [&n_dict, &n_parse] {
            if path.exists() {
                bail!("{} already exists. Use --overwrite to force.", path.display());
            }
        }
    }

    info!("Loading {} and {}...", aupair.dict.display(), aupair.parse.display());
    let phrases = pfp_io::read_dictionary(&aupair.dict).with_loc(|| format!("While reading {}", aupair.dict.display()))?;
    let ranks = pfp_io::read_parse(&aupair.parse).with_loc(|| format!("While reading {}", aupair.parse.display()))?;

    let mut counts = vec![0u64; phrases.len()];
    for &rank in &ranks {
        if let Some(count) = counts.get_mut((rank as usize).saturating_sub(1)) {
            *count += 1;
        }
    }
    let finalized = FinalizedDictionary::from_parts(phrases, counts);

    info!("Contracting with budget {}...", aupair.budget);
    let output = pfp_core::aupair::run(&finalized, &ranks, aupair.window, aupair.budget);
    info!("Removed {} dictionary bytes via {} trigger(s)", output.removed_bytes, output.removed_triggers.len());

    pfp_io::write_dictionary(&n_dict, &output.phrases).with_loc(|| format!("While writing {}", n_dict.display()))?;
    let new_ranks: Vec<u32> = output.parse.iter().map(|&idx| idx + 1).collect();
    pfp_io::write_parse(&n_parse, &new_ranks).with_loc(|| format!("While writing {}", n_parse.display()))
}

fn selections_to_samples(contigs: &[Arc<Contig>], selections: Vec<pfp_io::SampleSelections>) -> Vec<Sample> {
    selections
        .into_iter()
        .map(|sel| {
            let mut per_contig: HashMap<usize, Vec<(usize, usize)>> = HashMap::new();
            for (contig_idx, variation_idx, genotype) in sel.selections {
                per_contig.entry(contig_idx).or_default().push((variation_idx, genotype));
            }
            let mut sample = Sample::new(SampleTag::from(sel.tag));
            for (idx, contig) in contigs.iter().enumerate() {
                let mut instance = ContigInstance::new(contig.clone());
                if let Some(picks) = per_contig.get(&idx) {
                    for &(variation_idx, genotype) in picks {
                        instance.select(variation_idx, genotype);
                    }
                }
                sample.push_contig(instance).expect("a contig is visited at most once per sample by construction");
            }
            sample
        })
        .collect()
}

/// Builds one [`pfp_io::LiftingEntry`] per contig-instance across every sample, directly from
/// each instance's retained variations (SPEC_FULL.md §4.6, `.ldx`). Computed ahead of dispatch,
/// since [`parse_sample`] consumes `Sample` by value.
fn build_lifting_entries(samples: &[Sample]) -> Vec<pfp_io::LiftingEntry> {
    let mut entries = Vec::new();
    for sample in samples {
        for instance in &sample.contigs {
            let mut picks: Vec<(usize, usize)> =
                instance.variation_indices.iter().copied().zip(instance.genotypes.iter().copied()).collect();
            picks.sort_by_key(|&(variation_idx, _)| variation_idx);

            let selections: Vec<(u64, u32, u32)> = picks
                .into_iter()
                .filter_map(|(variation_idx, genotype)| {
                    let variation = instance.contig.variations.get(variation_idx)?;
                    let allele = variation.allele(genotype)?;
                    Some((variation.pos.0, variation.ref_len, allele.len() as u32))
                })
                .collect();

            let (_, lift) = pfp_io::lift_from_variations(instance.contig.len() as u64, &selections);
            entries.push(pfp_io::LiftingEntry {
                name: format!("{}:{}", sample.tag, instance.contig.name),
                reference_offset: instance.contig.global_offset.0,
                lift,
            });
        }
    }
    entries
}

fn build_thread_pool(threads: usize) -> Result<ThreadPool> {
    rayon::ThreadPoolBuilder::new().num_threads(threads).build().with_loc(|| "While building the worker thread pool")
}

/// Runs `work` once per item of `items` across `pool`, one `scope::spawn` per item
/// (SPEC_FULL.md §5's "static parallel-for"), preserving input order in the returned vector.
fn dispatch<I, F>(pool: &ThreadPool, items: Vec<I>, work: F) -> Result<Vec<WorkerSampleOutput>>
where
    I: Send,
    F: Fn(I) -> std::result::Result<WorkerSampleOutput, DictionaryError> + Sync,
{
    let len = items.len();
    let slots: Mutex<Vec<Option<WorkerSampleOutput>>> = Mutex::new((0..len).map(|_| None).collect());
    let error: Mutex<Option<(usize, DictionaryError)>> = Mutex::new(None);

    pool.scope(|scope| {
        for (index, item) in items.into_iter().enumerate() {
            let work = &work;
            let slots = &slots;
            let error = &error;
            scope.spawn(move |_| match work(item) {
                Ok(out) => slots.lock().unwrap()[index] = Some(out),
                Err(e) => {
                    let mut error = error.lock().unwrap();
                    if error.is_none() {
                        *error = Some((index, e));
                    }
                }
            });
        }
    });

    if let Some((index, e)) = error.into_inner().unwrap() {
        return Err(anyhow!(e)).with_loc(|| format!("While parsing sample {index}"));
    }
    Ok(slots.into_inner().unwrap().into_iter().enumerate().map(|(i, s)| s.unwrap_or_else(|| panic!("worker {i} never completed"))).collect())
}

/// Finalizes the dictionary, remaps every worker's strong-hash ids to dense rank ids, and
/// writes every output the `Common` flags request.
fn finish(
    common: &Common,
    paths: &OutputPaths,
    dictionary: PhraseDictionary,
    reference: Option<(&[Arc<Contig>], &ReferenceParse)>,
    worker_outputs: Vec<WorkerSampleOutput>,
    lifting_entries: Option<Vec<pfp_io::LiftingEntry>>,
) -> Result<()> {
    let finalized = dictionary.sort_and_finalize().with_loc(|| "While finalizing the phrase dictionary")?;

    let mut parse: Vec<u32> = Vec::new();
    let mut lengths: Vec<(String, u64)> = Vec::new();
    if let Some((contigs, reference_parse)) = reference {
        for contig in contigs {
            let Some(contig_parse) = reference_parse.contig(&contig.name) else { continue };
            for &id in &contig_parse.phrase_ids {
                let rank = finalized.rank_of(id).with_loc(|| "Reference parse emitted a phrase id absent from the finalized dictionary")?;
                parse.push(rank);
            }
        }
    }
    for output in &worker_outputs {
        for &id in &output.strong_ids {
            let rank = finalized.rank_of(id).with_loc(|| "Worker emitted a phrase id absent from the finalized dictionary")?;
            parse.push(rank);
        }
        for (name, len) in &output.contig_lengths {
            lengths.push((format!("{}:{}", output.tag, name), *len));
        }
    }

    info!("Writing {} ({} phrases)...", paths.dict.display(), finalized.len());
    pfp_io::write_dictionary(&paths.dict, &finalized.phrases).with_loc(|| format!("While writing {}", paths.dict.display()))?;
    if common.compress_dictionary {
        pfp_io::write_compressed_dictionary(&paths.dicz, &paths.dicz_len, &finalized.phrases)
            .with_loc(|| format!("While writing {}", paths.dicz.display()))?;
    }

    info!("Writing {} ({} tokens)...", paths.parse.display(), parse.len());
    pfp_io::write_parse(&paths.parse, &parse).with_loc(|| format!("While writing {}", paths.parse.display()))?;

    if common.compute_occurrences {
        pfp_io::write_occurrences(&paths.occ, &finalized.counts).with_loc(|| format!("While writing {}", paths.occ.display()))?;
    }
    if common.report_lengths {
        pfp_io::write_length_index(&paths.lidx, &lengths).with_loc(|| format!("While writing {}", paths.lidx.display()))?;
    }
    if let Some(entries) = lifting_entries {
        let universe_len = entries.iter().map(|e| e.lift.sample_len()).sum();
        pfp_io::write_lifting_index(&paths.ldx, universe_len, &entries).with_loc(|| format!("While writing {}", paths.ldx.display()))?;
    }

    if common.aupair {
        let budget = common.aupair_budget.unwrap_or(u64::MAX);
        info!("Running AuPair contraction with budget {budget}...");
        let output = pfp_core::aupair::run(&finalized, &parse, common.window, budget);
        info!("Removed {} dictionary bytes via {} trigger(s)", output.removed_bytes, output.removed_triggers.len());
        pfp_io::write_dictionary(&paths.n_dict, &output.phrases).with_loc(|| format!("While writing {}", paths.n_dict.display()))?;
        let aupair_ranks: Vec<u32> = output.parse.iter().map(|&idx| idx + 1).collect();
        pfp_io::write_parse(&paths.n_parse, &aupair_ranks).with_loc(|| format!("While writing {}", paths.n_parse.display()))?;
    }

    Ok(())
}
