// Shici Search CLI
// Query the poetry corpus from the command line

use anyhow::{bail, Context, Result};
use clap::Parser;
use shici::{ExecuteStrategy, PoetrySearch};

/// Search classical Chinese poetry with a condition expression
#[derive(Parser, Debug)]
#[command(name = "shici")]
#[command(about = "Search classical Chinese poetry by character conditions", long_about = None)]
#[command(version)]
struct Args {
    /// Condition expression, e.g. "[木木木,山]" or "*(4)*"
    #[arg(value_name = "QUERY")]
    query: String,

    /// Hanzi knowledge JSON
    #[arg(long, default_value = "hanzi_data.json")]
    hanzi: String,

    /// Poetry corpus CSV
    #[arg(long, default_value = "poetry.csv")]
    poetry: String,

    /// Maximum number of poems to display
    #[arg(short, long, default_value = "10")]
    limit: usize,

    /// Evaluate poems on a single thread
    #[arg(long)]
    sequential: bool,

    /// Print the compiled matcher tree before searching
    #[arg(long)]
    show_matcher: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shici=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut search = PoetrySearch::new();
    search
        .load_hanzi(&args.hanzi)
        .with_context(|| format!("loading hanzi knowledge from {}", args.hanzi))?;
    search
        .load_poetry(&args.poetry)
        .with_context(|| format!("loading poetry corpus from {}", args.poetry))?;

    let stats = search.stats();
    println!(
        "Loaded {} poems / {} sentences, {} hanzi records\n",
        stats.poems, stats.sentences, stats.hanzi_records
    );

    let cond = match search.parse(&args.query) {
        Ok(cond) => cond,
        Err(err) => match err.span() {
            Some((l, r)) => bail!("{err}\n  {}\n  {}^", args.query, " ".repeat(l.min(r))),
            None => bail!("{err}"),
        },
    };
    let matcher = search.compile(&cond)?;

    if args.show_matcher {
        println!("{matcher}\n");
    }

    let strategy = if args.sequential {
        ExecuteStrategy::Sequential
    } else {
        ExecuteStrategy::Parallel
    };
    let results = search.run_with(&matcher, strategy);

    if results.is_empty() {
        println!("No matches found.");
        return Ok(());
    }

    let total: usize = results.iter().map(|r| r.match_positions.len()).sum();
    println!("Found {} matching sentences in {} poems:\n", total, results.len());

    for result in results.iter().take(args.limit) {
        let poem = search
            .poetry_by_id(result.poetry_id)
            .context("result references unknown poem")?;
        println!("{}（{} · {}）", poem.title, poem.dynasty, poem.author);
        for &pos in &result.match_positions {
            if let Some(text) = search.sentence_text(poem, pos) {
                println!("    {text}");
            }
        }
        println!();
    }

    if results.len() > args.limit {
        println!("... and {} more poems", results.len() - args.limit);
    }

    Ok(())
}
