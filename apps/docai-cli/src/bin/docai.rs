use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::{env, fs};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use docai_answer::{build_prompt, synthesize_answer, StructuredAnswer};
use docai_cli::{init_tracing, render_answer, render_candidates, render_reasoning, render_status, CommandCompleter};
use docai_core::config::{expand_path, Config, Settings};
use docai_core::traits::Completer;
use docai_core::DocumentLoader;
use docai_embed::default_embedder;
use docai_hybrid::{FileStore, HybridSearchEngine, ProgressFn};

const USAGE: &str = "Usage: docai <command> [args]

Commands:
  ingest [data_dir] [--limit N]            build the index from .txt/.md files
  search \"<query>\" [--top-k N] [--json]    show ranked passages
  prompt \"<question>\" [--top-k N]          print the prompt a model would get
  answer \"<question>\" <completion|-> [--json] [--reasoning]
                                           structure a completion produced elsewhere
  ask \"<question>\" [--top-k N] [--json] [--reasoning]
                                           retrieve, run llm.command, structure the answer
  status [--json]                          describe the current index
  clear                                    drop the index";

#[derive(Debug, Default)]
struct Args {
    cmd: String,
    positional: Vec<String>,
    top_k: Option<usize>,
    limit: Option<usize>,
    json: bool,
    reasoning: bool,
}

fn number(flag: &str, value: Option<&String>) -> Result<usize> {
    value.and_then(|v| v.parse().ok()).with_context(|| format!("{flag} requires a number"))
}

fn parse_args() -> Result<Args> {
    let raw: Vec<String> = env::args().skip(1).collect();
    let Some((cmd, rest)) = raw.split_first() else { bail!("{USAGE}") };
    let mut args = Args { cmd: cmd.clone(), ..Args::default() };
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--top-k" | "-k" => { args.top_k = Some(number("--top-k", rest.get(i + 1))?); i += 1; }
            "--limit" => { args.limit = Some(number("--limit", rest.get(i + 1))?); i += 1; }
            "--json" => args.json = true,
            "--reasoning" => args.reasoning = true,
            "-" => args.positional.push("-".into()),
            flag if flag.starts_with('-') => bail!("unknown flag {flag}\n\n{USAGE}"),
            value => args.positional.push(value.to_string()),
        }
        i += 1;
    }
    Ok(args)
}

fn positional<'a>(args: &'a Args, i: usize, what: &str) -> Result<&'a str> {
    args.positional.get(i).map(String::as_str).with_context(|| format!("missing {what}\n\n{USAGE}"))
}

fn open_engine(settings: &Settings) -> Result<HybridSearchEngine> {
    let embedder = default_embedder(&settings.embedding)?;
    let store = Arc::new(FileStore::new(expand_path(&settings.paths.index_file)));
    Ok(HybridSearchEngine::open(embedder, store, settings)?)
}

fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

async fn ingest(settings: &Settings, args: &Args) -> Result<()> {
    let data_dir = args.positional.first().map(PathBuf::from).unwrap_or_else(|| expand_path(&settings.paths.data_dir));
    let loader = args.limit.map_or_else(DocumentLoader::new, DocumentLoader::with_limit);
    let documents = loader.load_directory(&data_dir)?;
    if documents.is_empty() {
        bail!("no .txt or .md files under {}", data_dir.display());
    }

    let engine = open_engine(settings)?;
    let pb = progress_bar()?;
    let bar = pb.clone();
    let progress: ProgressFn = Arc::new(move |done: usize, total: usize| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    });
    pb.set_message("embedding");
    let stats = engine.build_index_with_progress(&documents, progress).await?;
    pb.finish_with_message("done");

    println!("Indexed {} documents ({} blank skipped) into {} chunks", stats.documents, stats.skipped_documents, stats.chunks);
    println!("Embedded {} chunks, reused {} cached embeddings", stats.embedded, stats.reused_embeddings);
    if stats.persisted {
        println!("Index saved to {}", expand_path(&settings.paths.index_file).display());
    } else {
        println!("Index was built but could not be saved; see the log");
    }
    Ok(())
}

fn read_completion(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    fs::read_to_string(source).with_context(|| format!("failed to read completion from {source}"))
}

fn print_answer(answer: &StructuredAnswer, args: &Args) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(answer)?);
        return Ok(());
    }
    print!("{}", render_answer(answer));
    if args.reasoning && !(answer.reasoning.is_empty() && answer.supporting_facts.is_empty() && answer.alternatives.is_empty()) {
        print!("\nReasoning:\n{}", render_reasoning(answer));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {e}"); e })?;
    let settings = config.settings()?;
    init_tracing(&settings.logging.level);
    let args = parse_args()?;
    let top_k = args.top_k.unwrap_or(settings.retrieval.top_k);

    match args.cmd.as_str() {
        "ingest" => ingest(&settings, &args).await?,
        "search" => {
            let query = positional(&args, 0, "query")?;
            let candidates = open_engine(&settings)?.retrieve(query, top_k).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&candidates)?);
            } else {
                print!("{}", render_candidates(query, &candidates));
            }
        }
        "prompt" => {
            let question = positional(&args, 0, "question")?;
            let candidates = open_engine(&settings)?.retrieve(question, top_k).await?;
            let prompt = build_prompt(question, &candidates, settings.llm.max_context_chars);
            println!("{}\n\n{}", prompt.system, prompt.user);
        }
        "answer" => {
            let question = positional(&args, 0, "question")?;
            let completion = read_completion(positional(&args, 1, "completion file")?)?;
            let candidates = open_engine(&settings)?.retrieve(question, top_k).await?;
            print_answer(&synthesize_answer(&completion, &candidates, &settings.answer), &args)?;
        }
        "ask" => {
            let question = positional(&args, 0, "question")?;
            let completer = CommandCompleter::new(&settings.llm.command)?;
            let candidates = open_engine(&settings)?.retrieve(question, top_k).await?;
            let answer = if candidates.is_empty() {
                info!("no passages retrieved; not calling the model");
                StructuredAnswer::no_information()
            } else {
                let prompt = build_prompt(question, &candidates, settings.llm.max_context_chars);
                info!(completer = completer.name(), passages = candidates.len(), "requesting completion");
                let completion = tokio::task::spawn_blocking(move || completer.complete(&prompt.system, &prompt.user)).await??;
                synthesize_answer(&completion, &candidates, &settings.answer)
            };
            print_answer(&answer, &args)?;
        }
        "status" => {
            let status = open_engine(&settings)?.status();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print!("{}", render_status(&status));
            }
        }
        "clear" => {
            open_engine(&settings)?.clear().await?;
            println!("Index cleared");
        }
        other => bail!("unknown command '{other}'\n\n{USAGE}"),
    }
    Ok(())
}
