use anyhow::Context as _;
use clap::Parser;
use minic::ir::{self, IrGenerator};
use minic::lang::Frontend;
use minic::semantic::Analyzer;
use std::{fs, path::PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The source file to compile.
    input: PathBuf,

    /// Enable verbose per-stage tracing and dumps.
    #[arg(short, long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("minic=debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::trace!("CLI args = {:?}", args);

    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let frontend = Frontend::new().context("failed to assemble the front end")?;

    // Conflicts are reported before parsing begins; the table stays
    // usable, so the run continues.
    for conflict in frontend.table().conflicts() {
        eprintln!("[warning] {}", conflict.display(frontend.grammar()));
    }
    if args.debug {
        println!("{}", frontend.grammar());
        println!("{}", frontend.automaton().display(frontend.grammar()));
        println!("{}", frontend.table().display(frontend.grammar()));
    }

    let tokens = frontend
        .tokenize(&source)
        .context("lexical analysis failed")?;
    if args.debug {
        for token in &tokens {
            println!("{token}");
        }
    }

    let mut program = frontend.parse(&tokens).context("syntax analysis failed")?;
    if args.debug {
        print!("{}", program.tree());
    }

    let errors = Analyzer::analyze(&mut program);
    if errors.is_empty() {
        println!("semantic analysis completed with no errors");
    } else {
        for error in &errors {
            println!("semantic error: {error}");
        }
        println!("semantic analysis found {} error(s)", errors.len());
    }

    let quads = IrGenerator::generate(&program);
    print!("{}", ir::dump(&quads));

    Ok(())
}
