//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases del proceso de
//! compilación y expone una CLI.

use anyhow::{self, bail, Context};
use clap::{self, crate_version, Arg};
use log::{Level, Log, Metadata, Record};
use proverbes::{
    pipeline::{self, Stages},
    proverbs::ProverbDatabase,
    source::Source,
    themes::ThemeExpectations,
};

use std::{
    fs::{self, File},
    io::{self, BufReader, Read, Write},
    rc::Rc,
};

fn main() -> anyhow::Result<()> {
    // Parsing de CLI
    let args = clap::Command::new("Proverb rule compiler")
        .version(crate_version!())
        .arg(
            Arg::new("input")
                .index(1)
                .value_name("INPUT")
                .required_unless_present("init-proverbs")
                .help("Rule set to compile ('-' for stdin)"),
        )
        .arg(
            Arg::new("proverbs")
                .short('p')
                .long("proverbs")
                .takes_value(true)
                .value_name("FILE")
                .help("Proverb dictionary, one THEME:text entry per line"),
        )
        .arg(
            Arg::new("init-proverbs")
                .long("init-proverbs")
                .takes_value(true)
                .value_name("FILE")
                .conflicts_with("input")
                .help("Write the default proverb dictionary to FILE and exit"),
        )
        .arg(
            Arg::new("emit")
                .short('e')
                .long("emit")
                .takes_value(true)
                .multiple_occurrences(true)
                .use_value_delimiter(true)
                .value_name("STAGE")
                .possible_values(["tokens", "ast", "symbols", "semantic", "ir", "optimized", "asm", "all"])
                .help("Stages to print [default: semantic,asm]"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .default_value("-")
                .value_name("FILE")
                .help("Output file for the assembly listing ('-' for stdout)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .multiple_occurrences(true)
                .help("Increase log verbosity"),
        )
        .get_matches();

    init_logger(args.occurrences_of("verbose"))?;

    if let Some(path) = args.value_of("init-proverbs") {
        let mut file = File::create(path)
            .with_context(|| format!("Failed to open for writing: {}", path))?;

        ProverbDatabase::defaults()
            .write(&mut file)
            .with_context(|| format!("Failed to write proverbs to: {}", path))?;

        log::info!("default proverbs written to {}", path);
        return Ok(());
    }

    let database = match args.value_of("proverbs") {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open: {}", path))?;
            ProverbDatabase::read(BufReader::new(file))
                .with_context(|| format!("Failed to read proverbs from: {}", path))?
        }

        None => ProverbDatabase::defaults(),
    };

    let stages = match args.values_of("emit") {
        Some(names) => {
            let mut stages = Stages::empty();
            for name in names {
                stages |= name.parse::<Stages>().map_err(anyhow::Error::msg)?;
            }

            stages
        }

        None => Stages::DEFAULT,
    };

    let input = args.value_of("input").context("Missing input file")?;
    let source = read_source(input)?;

    let expectations = ThemeExpectations::defaults();
    let compilation = match pipeline::compile(&source, &database, &expectations) {
        Ok(compilation) => compilation,
        Err(diagnostics) => {
            eprint!("{}", diagnostics);
            bail!("Failed to compile {}", source.name());
        }
    };

    let mut stdout = io::stdout();

    if stages.contains(Stages::TOKENS) {
        writeln!(stdout, "; tokens\n{}", compilation.token_listing())?;
    }

    if stages.contains(Stages::AST) {
        writeln!(stdout, "; ast\n{:#?}\n", compilation.ast)?;
    }

    if stages.contains(Stages::SYMBOLS) {
        writeln!(stdout, "; symbols\n{}", compilation.analysis.symbols)?;
    }

    if stages.contains(Stages::SEMANTIC) {
        let (errors, warnings) = compilation.diagnostics();
        for diagnostics in [errors, warnings] {
            if !diagnostics.is_empty() {
                eprint!("{}", diagnostics);
            }
        }

        writeln!(stdout, "; proverbs\n{}", compilation.used_proverbs(&database))?;
    }

    if stages.contains(Stages::IR) {
        writeln!(stdout, "; ir\n{}", compilation.ir)?;
    }

    if stages.contains(Stages::OPTIMIZED) {
        writeln!(stdout, "; optimized\n{}", compilation.optimized)?;
    }

    if stages.contains(Stages::ASM) {
        match args.value_of("output") {
            Some("-") | None => write!(stdout, "{}", compilation.target)?,
            Some(path) => {
                let mut file = File::create(path)
                    .with_context(|| format!("Failed to open for writing: {}", path))?;

                write!(file, "{}", compilation.target)
                    .with_context(|| format!("Failed to emit to file: {}", path))?;
            }
        }
    }

    let errors = compilation.analysis.errors.len();
    if errors > 0 {
        bail!("{} semantic error(s) in {}", errors, source.name());
    }

    Ok(())
}

fn read_source(input: &str) -> anyhow::Result<Rc<Source>> {
    let source = match input {
        "-" => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read from stdin")?;

            Source::new("<stdin>", text)
        }

        path => {
            let text = fs::read_to_string(path).with_context(|| format!("Failed to read: {}", path))?;
            Source::new(path, text)
        }
    };

    Ok(source)
}

/// Bitácora hacia stderr.
struct Logger;

static LOGGER: Logger = Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logger(verbosity: u64) -> anyhow::Result<()> {
    let level = match verbosity {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };

    log::set_logger(&LOGGER).map_err(|error| anyhow::anyhow!("Failed to install logger: {}", error))?;
    log::set_max_level(level.to_level_filter());

    Ok(())
}
