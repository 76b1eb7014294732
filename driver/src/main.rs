// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

mod config;
mod logger;

use std::{fs::File, io::{BufWriter, Write}, path::{Path, PathBuf}, process::exit};

use anyhow::Context;
use clap::Subcommand;
use colored::Colorize;
use dis::Module;
use dis_compiler::{CompileOptions, Compiler, Program};
use log::{debug, LevelFilter};

use self::{config::ConfigRoot, logger::Logger};

#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file to use instead of the `disc.toml` next to the input.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

impl Args {
    pub fn parse_args() -> Self {
        use clap::Parser;
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compiles a program in JSON form into a Dis module.
    Build {
        program: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Prints the disassembly of a Dis module.
    Dump {
        module: PathBuf,
    },
}

fn main() {
    let args = Args::parse_args();

    if let Err(error) = run(args) {
        let message = error.to_string();
        eprintln!("{}: {}", "error".red().bold(), message.bold());

        // Some errors already carry their source in the message.
        for cause in error.chain().skip(1).filter(|cause| !message.contains(&cause.to_string())) {
            eprintln!("  {} {cause}", "caused by:".bright_black());
        }
        exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let input = match &args.command {
        Commands::Build { program, .. } => program,
        Commands::Dump { module } => module,
    };

    let config = ConfigRoot::load(args.config.as_deref(), input)?;

    Logger::initialize(if args.verbose || config.log.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    });

    match args.command {
        Commands::Build { program, output } => {
            let output = output.unwrap_or_else(|| program.with_extension("dis"));
            build(&program, &output, &config)
        }

        Commands::Dump { module } => dump(&module),
    }
}

fn build(input: &Path, output: &Path, config: &ConfigRoot) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let mut program: Program = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid program", input.display()))?;

    if let Some(entry) = &config.module.entry {
        program.entry = entry.clone();
    }

    let options = CompileOptions {
        module_name: config.module.name.clone(),
        stack_size: config.module.stack_size,
    };

    let compiled = Compiler::new(options).compile(&program)?;

    for symbol in &compiled.symbols {
        debug!("{:>6}  frame {:<3} {}", symbol.address, symbol.frame_id, symbol.name);
    }

    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    compiled.module.write_to(&mut writer)?;
    writer.flush()?;

    println!(
        "{} {} -> {} ({} instructions, {} functions)",
        "compiled".green().bold(),
        input.display(),
        output.display(),
        compiled.module.instructions.len(),
        compiled.symbols.len(),
    );

    Ok(())
}

fn dump(path: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let module = Module::decode(&bytes)
        .with_context(|| format!("{} is not a valid Dis module", path.display()))?;

    print!("{module}");
    Ok(())
}
