use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::resolve::Overrides;
use crate::config::Settings;
use crate::core::changes::changed_dockerfiles;
use crate::core::image::ImageRef;
use crate::docker::ops::{build_images, pull_latest, push_images, BuildPlan};
use crate::docker::qualified;
use crate::error::{ImageGraphError, Result};
use crate::git::ops::{changed_paths, compare_range, current_branch, fetch_deploy_branch};
use crate::git::CompareRange;
use crate::graph::merge::{merge_dockerfile, rebuild_graph, MergeOutcome};
use crate::graph::query::{
    check_graph, descendants, latest_images, unittest_paths, GraphReport, IssueKind,
};
use crate::graph::store::{init_graph, load_graph};
use crate::util::output;
use crate::util::process::SystemRunner;

#[derive(Parser, Debug)]
#[command(name = "imagegraph")]
#[command(about = "Docker image relationship graph and CI build helper", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Dockerfile to merge into the relationship graph (<image>/<version>/Dockerfile)
    pub dockerfile: Option<PathBuf>,
    #[arg(short, long, global = true)]
    pub graph: Option<PathBuf>,
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,
    #[arg(short, long, global = true)]
    pub owner: Option<String>,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[arg(short, long, global = true)]
    pub quiet: bool,
    #[arg(long, global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an empty relationship graph
    Init,
    /// Merge every <image>/<version>/Dockerfile under the root
    Scan,
    /// List files changed between the compare range
    Changed(ChangedArgs),
    /// Merge, build and tag the changed images
    Build(ChangedArgs),
    /// Push the changed images
    Push(ChangedArgs),
    /// Show the latest version of every image
    Latest(LatestArgs),
    /// List every image built on top of the given one
    Descendants(DescendantsArgs),
    /// Report inconsistencies in the relationship graph
    Check(CheckArgs),
}

#[derive(Args, Debug, Default)]
pub struct ChangedArgs {
    /// Revisions to diff, "<start> <end>" or "<start>..<end>"
    #[arg(long)]
    pub range: Option<String>,
    /// Fetch the deploy branch before diffing
    #[arg(long)]
    pub fetch: bool,
    /// Use these repo-relative paths instead of asking git
    #[arg(long = "path")]
    pub paths: Vec<String>,
}

#[derive(Args, Debug)]
pub struct LatestArgs {
    #[arg(long)]
    pub json: bool,
    #[arg(long)]
    pub pull: bool,
    /// Print <image>/<version>/unittest.yml for every latest image
    #[arg(long, conflicts_with = "json")]
    pub unittest_paths: bool,
}

#[derive(Args, Debug)]
pub struct DescendantsArgs {
    pub image: String,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[arg(long)]
    pub json: bool,
}

pub fn run() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    if cli.no_color {
        output::disable_colors();
    }
    setup_logging(cli.verbose, cli.quiet);

    if let Err(err) = dispatch(cli) {
        output::error(&err.to_string());
        std::process::exit(1);
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).without_time())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .try_init();
}

fn dispatch(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        root: cli.root,
        graph: cli.graph,
        owner: cli.owner,
    };
    let settings = Settings::resolve(env::current_dir()?, overrides)?;
    tracing::debug!(?settings, "resolved settings");

    match (cli.command, cli.dockerfile) {
        (None, Some(dockerfile)) => handle_merge(dockerfile, &settings, cli.quiet),
        (None, None) => Err(ImageGraphError::Usage(
            "imagegraph <DOCKERFILE> or imagegraph <COMMAND>; see --help".to_string(),
        )),
        (Some(_), Some(dockerfile)) => Err(ImageGraphError::Usage(format!(
            "unexpected argument '{}' before the subcommand",
            dockerfile.display()
        ))),
        (Some(command), None) => match command {
            Commands::Init => handle_init(&settings),
            Commands::Scan => handle_scan(&settings, cli.quiet),
            Commands::Changed(args) => handle_changed(args, &settings),
            Commands::Build(args) => handle_build(args, &settings),
            Commands::Push(args) => handle_push(args, &settings),
            Commands::Latest(args) => handle_latest(args, &settings),
            Commands::Descendants(args) => handle_descendants(args, &settings),
            Commands::Check(args) => handle_check(args, &settings),
        },
    }
}

fn handle_merge(dockerfile: PathBuf, settings: &Settings, quiet: bool) -> Result<()> {
    let outcome = merge_dockerfile(&dockerfile, &settings.graph_path, settings.latest_policy)?;
    if !quiet {
        report_merge(&outcome);
    }
    Ok(())
}

fn report_merge(outcome: &MergeOutcome) {
    let verb = if outcome.created { "added" } else { "updated" };
    output::success(&format!("{} {}", verb, outcome.image));
    for ancestor in &outcome.ancestors_created {
        output::info(&format!("  new ancestor {}", ancestor));
    }
    for ancestor in &outcome.ancestors_updated {
        output::info(&format!("  {} gained child {}", ancestor, outcome.image));
    }
    if outcome.latest_moved {
        output::info(&format!(
            "  latest {} -> {}",
            outcome.image.name, outcome.image.version
        ));
    }
}

fn handle_init(settings: &Settings) -> Result<()> {
    if init_graph(&settings.graph_path)? {
        output::success(&format!("created {}", settings.graph_path.display()));
    } else {
        output::warn(&format!(
            "{} already exists, leaving it untouched",
            settings.graph_path.display()
        ));
    }
    Ok(())
}

fn handle_scan(settings: &Settings, quiet: bool) -> Result<()> {
    let outcomes = rebuild_graph(&settings.root, &settings.graph_path, settings.latest_policy)?;
    if !quiet {
        for outcome in &outcomes {
            report_merge(outcome);
        }
    }
    output::info(&format!("merged {} dockerfiles", outcomes.len()));
    Ok(())
}

fn handle_changed(args: ChangedArgs, settings: &Settings) -> Result<()> {
    let runner = SystemRunner::in_dir(&settings.root);
    let paths = resolve_changed_paths(&args, settings, &runner)?;
    for path in paths {
        println!("{}", path);
    }
    Ok(())
}

fn handle_build(args: ChangedArgs, settings: &Settings) -> Result<()> {
    let owner = settings.owner()?;
    let runner = SystemRunner::in_dir(&settings.root);
    let paths = resolve_changed_paths(&args, settings, &runner)?;
    let changed = changed_dockerfiles(&paths);

    let plan = BuildPlan {
        runner: &runner,
        owner,
        root: &settings.root,
        graph_path: &settings.graph_path,
        policy: settings.latest_policy,
    };
    let built = build_images(&plan, &changed)?;
    for image in built {
        println!("{}", qualified(owner, &image.image));
    }
    Ok(())
}

fn handle_push(args: ChangedArgs, settings: &Settings) -> Result<()> {
    let owner = settings.owner()?;
    let runner = SystemRunner::in_dir(&settings.root);
    let paths = resolve_changed_paths(&args, settings, &runner)?;
    let changed = changed_dockerfiles(&paths);
    let graph = load_graph(&settings.graph_path)?;

    for reference in push_images(&runner, owner, &graph, &changed)? {
        println!("{}", reference);
    }
    Ok(())
}

fn handle_latest(args: LatestArgs, settings: &Settings) -> Result<()> {
    let graph = load_graph(&settings.graph_path)?;

    if args.pull {
        let owner = settings.owner()?;
        let runner = SystemRunner::in_dir(&settings.root);
        pull_latest(&runner, owner, &graph)?;
    }

    if args.unittest_paths {
        for path in unittest_paths(&graph) {
            println!("{}", path);
        }
        return Ok(());
    }

    if args.json {
        let latest: BTreeMap<&str, &str> = graph
            .latest
            .iter()
            .map(|(name, version)| (name.as_str(), version.as_str()))
            .collect();
        print_json(&latest)?;
        return Ok(());
    }

    for image in latest_images(&graph) {
        match settings.owner.as_deref() {
            Some(owner) => println!("{}", qualified(owner, &image)),
            None => println!("{}", image),
        }
    }
    Ok(())
}

fn handle_descendants(args: DescendantsArgs, settings: &Settings) -> Result<()> {
    let image: ImageRef = args.image.parse()?;
    let graph = load_graph(&settings.graph_path)?;
    if !graph.contains(&image) {
        return Err(ImageGraphError::Other(anyhow::anyhow!(
            "image {} is not in {}",
            image,
            settings.graph_path.display()
        )));
    }

    let found = descendants(&graph, &image)
        .into_iter()
        .map(|image| image.to_string())
        .collect::<Vec<_>>();
    if args.json {
        return print_json(&found);
    }
    for image in found {
        println!("{}", image);
    }
    Ok(())
}

fn handle_check(args: CheckArgs, settings: &Settings) -> Result<()> {
    let graph = load_graph(&settings.graph_path)?;
    let report = check_graph(&graph);

    if args.json {
        print_json(&report)?;
    } else {
        print_graph_report(&report);
    }

    if report.is_clean() {
        Ok(())
    } else {
        Err(ImageGraphError::Other(anyhow::anyhow!(
            "graph has {} issue(s)",
            report.issues.len()
        )))
    }
}

fn resolve_changed_paths(
    args: &ChangedArgs,
    settings: &Settings,
    runner: &SystemRunner,
) -> Result<Vec<String>> {
    if !args.paths.is_empty() {
        return Ok(args.paths.clone());
    }

    let range = match args.range.as_deref() {
        Some(raw) => CompareRange::parse(raw).ok_or_else(|| {
            ImageGraphError::Usage(format!(
                "invalid range '{raw}', expected '<start> <end>' or '<start>..<end>'"
            ))
        })?,
        None => {
            let deploy = settings.deploy_branch()?;
            output::info(&format!("Deploy branch set to {deploy}"));
            let github_ref = env::var("GITHUB_REF").ok();
            let current = current_branch(runner, github_ref.as_deref())?;
            if args.fetch {
                fetch_deploy_branch(runner, &current, deploy, &settings.remote)?;
            }
            compare_range(&current, deploy, &settings.remote)
        }
    };

    let paths = changed_paths(runner, &range)?;
    output::info(&format!("Changed files between {range}:"));
    for path in &paths {
        output::info(&format!("  {path}"));
    }
    Ok(paths)
}

fn print_graph_report(report: &GraphReport) {
    if report.is_clean() {
        output::info("no graph issues found");
        return;
    }

    for issue in &report.issues {
        let line = match issue.kind {
            IssueKind::LatestMissingVersion => format!(
                "latest {} -> {} has no node",
                issue.image, issue.reference
            ),
            IssueKind::ChildNotLinkedBack => format!(
                "{} lists child {} which does not list it as a parent",
                issue.image, issue.reference
            ),
            IssueKind::UnknownParent => format!(
                "{} has parent {} with no node",
                issue.image, issue.reference
            ),
        };
        println!("  {}", line);
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value)
            .map_err(|err| ImageGraphError::Other(anyhow::Error::new(err)))?
    );
    Ok(())
}
