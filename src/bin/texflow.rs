use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "texflow", version)]
struct Cli {
    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a graph and write every output node as a PNG.
    Run(RunArgs),
    /// Print the compute order of a graph.
    Order(GraphArgs),
    /// Print the ordered dependency chain of one node.
    Deps(DepsArgs),
}

#[derive(Parser, Debug)]
struct GraphArgs {
    /// Input graph JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Input graph JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Directory receiving `<node id>.png` for every output node.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Number of runs (realtime graphs advance their clock on every run).
    #[arg(long, default_value_t = 1)]
    frames: u32,

    /// Force realtime mode regardless of the document.
    #[arg(long)]
    realtime: bool,

    /// Worker threads for the compute pool.
    #[arg(long)]
    threads: Option<usize>,

    /// Run kernels on the calling thread.
    #[arg(long)]
    serial: bool,
}

#[derive(Parser, Debug)]
struct DepsArgs {
    /// Input graph JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Node id as written in the document.
    #[arg(long)]
    node: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Order(args) => cmd_order(args),
        Command::Deps(args) => cmd_deps(args),
    }
}

fn load(path: &Path) -> anyhow::Result<texflow::LoadedGraph> {
    let s = fs::read_to_string(path)
        .with_context(|| format!("open graph '{}'", path.display()))?;
    let def = texflow::GraphDef::from_json(&s).with_context(|| "parse graph JSON")?;
    Ok(def.build()?)
}

fn name_of(graph: &texflow::Graph, id: texflow::NodeId) -> String {
    graph
        .node(id)
        .map_or_else(|| id.to_string(), |n| n.name().to_string())
}

fn cmd_order(args: GraphArgs) -> anyhow::Result<()> {
    let loaded = load(&args.in_path)?;
    for id in loaded.graph.compute_order() {
        println!("{}", name_of(&loaded.graph, *id));
    }
    Ok(())
}

fn cmd_deps(args: DepsArgs) -> anyhow::Result<()> {
    let loaded = load(&args.in_path)?;
    let id = loaded.id(&args.node)?;
    for dep in loaded.graph.dependencies(id)? {
        println!("{}", name_of(&loaded.graph, dep));
    }
    Ok(())
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let mut loaded = load(&args.in_path)?;
    let opts = texflow::RuntimeOpts {
        parallel: !args.serial,
        threads: args.threads,
        ..texflow::RuntimeOpts::default()
    };
    let mut runtime = texflow::GraphRuntime::new(&opts)?;
    let graph = &mut loaded.graph;
    if args.realtime {
        graph.set_realtime(true);
    }

    for _ in 0..args.frames.max(1) {
        let report = runtime.run_graph(graph)?;
        for (node, message) in report.warnings() {
            eprintln!("warning: {}: {message}", name_of(graph, node));
        }
        for node in &report.failed {
            if let Some(n) = graph.node(*node) {
                for m in n.messages().iter() {
                    if m.kind == texflow::MessageKind::Error {
                        eprintln!("error: {}: {}", n.name(), m.text);
                    }
                }
            }
        }
        eprintln!(
            "frame {}: {} processed, {} failed, {} skipped, {} commands",
            report.frame,
            report.processed.len(),
            report.failed.len(),
            report.skipped.len(),
            report.commands
        );
    }

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;
    let outputs: Vec<texflow::NodeId> = graph
        .nodes()
        .filter(|n| matches!(n.kind(), texflow::NodeKind::Output(_)))
        .map(|n| n.id())
        .collect();
    for id in outputs {
        let name = name_of(graph, id);
        let Some(texture) = runtime.output_texture(graph, id) else {
            eprintln!("skipped {name}: no output");
            continue;
        };
        let e = texture.extent();
        for z in 0..e.depth {
            let file = if e.depth > 1 {
                format!("{name}_{z}.png")
            } else {
                format!("{name}.png")
            };
            let path = args.out_dir.join(file);
            let data = texture.slice_rgba8(z)?;
            image::save_buffer_with_format(
                &path,
                &data,
                e.width,
                e.height,
                image::ColorType::Rgba8,
                image::ImageFormat::Png,
            )
            .with_context(|| format!("write png '{}'", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
    }
    Ok(())
}
