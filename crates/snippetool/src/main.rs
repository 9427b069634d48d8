use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use snippetool_core::config::{ToolConfig, load_config};
use snippetool_core::extract::{ExtractOptions, ExtractReport, run_extract};
use snippetool_core::generate::{GenerateReport, run_generate};
use snippetool_core::install::{InstallOptions, InstallTarget, install_skills};
use snippetool_core::locate::run_locate;
use snippetool_core::runtime::{
    InitOptions, PathOverrides, ResolutionContext, ResolvedPaths, init_layout, inspect_runtime,
    resolve_paths,
};
use snippetool_core::snapshot::snapshot_outputs;

#[derive(Debug, Parser)]
#[command(
    name = "snippetool",
    version,
    about = "Extract documentation code blocks into snippet files and build skill manifests"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    project_root: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    project_root: Option<PathBuf>,
    config: Option<PathBuf>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            project_root: cli.project_root.clone(),
            config: cli.config.clone(),
            diagnostics: cli.diagnostics,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Create pages/, snippets/, skills/ and the default config")]
    Init(InitArgs),
    #[command(about = "Show runtime layout and output counts")]
    Status,
    #[command(about = "Move snippet code blocks into files and rewrite pages to import them")]
    Extract(ExtractArgs),
    #[command(about = "Build category and umbrella skill manifests from extracted snippets")]
    Generate(GenerateArgs),
    #[command(about = "Generate manifests, then copy skills into a skills directory")]
    Install(InstallArgs),
    #[command(about = "Find the page that imports a snippet file")]
    Locate(LocateArgs),
    #[command(about = "Print hashes of every generated file as JSON")]
    Snapshot,
}

#[derive(Debug, Args)]
struct InitArgs {
    #[arg(long, help = "Overwrite an existing config file")]
    force: bool,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    #[arg(long, help = "Report planned writes without touching any file")]
    dry_run: bool,
    #[arg(long, help = "Print the report as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[arg(long, help = "Print the report as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct InstallArgs {
    #[arg(long, help = "Install into the home directory instead of the project")]
    global: bool,
    #[arg(long, value_name = "PATH", conflicts_with = "global")]
    target: Option<PathBuf>,
    #[arg(long, help = "Do not write the settings file")]
    no_settings: bool,
}

#[derive(Debug, Args)]
struct LocateArgs {
    category: String,
    artifact: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::Init(args)) => run_init(&runtime, args),
        Some(Commands::Status) => run_status(&runtime),
        Some(Commands::Extract(args)) => run_extract_command(&runtime, args),
        Some(Commands::Generate(args)) => run_generate_command(&runtime, args),
        Some(Commands::Install(args)) => run_install(&runtime, args),
        Some(Commands::Locate(args)) => run_locate_command(&runtime, args),
        Some(Commands::Snapshot) => run_snapshot(&runtime),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn run_init(runtime: &RuntimeOptions, args: InitArgs) -> Result<()> {
    let (paths, _) = resolve_runtime(runtime)?;
    let report = init_layout(&paths, &InitOptions { force: args.force })?;

    println!("Initialized snippetool layout");
    println!("project_root: {}", normalize_path(&paths.project_root));
    println!("pages: {}", normalize_path(&paths.pages_dir));
    println!("snippets: {}", normalize_path(&paths.snippets_dir));
    println!("skills: {}", normalize_path(&paths.skills_dir));
    println!("config_path: {}", normalize_path(&paths.config_path));
    println!("created_dirs: {}", report.created_dirs.len());
    println!("wrote_config: {}", format_flag(report.wrote_config));
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn run_status(runtime: &RuntimeOptions) -> Result<()> {
    let (paths, config) = resolve_runtime(runtime)?;
    let status = inspect_runtime(&paths, &config)?;

    println!("runtime status");
    println!("project_root: {}", normalize_path(&paths.project_root));
    println!(
        "project_root_exists: {}",
        format_flag(status.project_root_exists)
    );
    println!("pages_exists: {}", format_flag(status.pages_exists));
    println!("snippets_exists: {}", format_flag(status.snippets_exists));
    println!("skills_exists: {}", format_flag(status.skills_exists));
    println!("state_dir_exists: {}", format_flag(status.state_dir_exists));
    println!("config_exists: {}", format_flag(status.config_exists));
    println!("documents: {}", status.document_count);
    println!("artifacts: {}", status.artifact_count);
    println!("manifests: {}", status.manifest_count);
    print_warnings(&status.warnings);
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn run_extract_command(runtime: &RuntimeOptions, args: ExtractArgs) -> Result<()> {
    let (paths, config) = resolve_runtime(runtime)?;
    let report = run_extract(
        &paths,
        &config,
        &ExtractOptions {
            dry_run: args.dry_run,
        },
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_extract_report(&report);
    }
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn print_extract_report(report: &ExtractReport) {
    let verb = if report.dry_run { "would create" } else { "created" };
    for created in &report.created {
        println!("{verb}: {created}");
    }
    let verb = if report.dry_run { "would update" } else { "updated" };
    for updated in &report.updated {
        println!("{verb}: {updated}");
    }
    for skipped in &report.skipped {
        println!("skipped: {skipped}");
    }
    println!("scanned: {}", report.scanned);
    println!("artifacts: {}", report.created.len());
    println!("documents_rewritten: {}", report.updated.len());
    println!("dry_run: {}", format_flag(report.dry_run));
    print_warnings(&report.warnings);
}

fn run_generate_command(runtime: &RuntimeOptions, args: GenerateArgs) -> Result<()> {
    let (paths, config) = resolve_runtime(runtime)?;
    let report = run_generate(&paths, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_generate_report(&report);
    }
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn print_generate_report(report: &GenerateReport) {
    for manifest in &report.manifests {
        println!(
            "written: {} ({} snippets)",
            manifest.path, manifest.artifacts
        );
    }
    println!("total_artifacts: {}", report.total_artifacts);
    println!("copied_scripts: {}", report.copied_scripts);
    if !report.unlocated.is_empty() {
        println!("unlocated:");
        for artifact in &report.unlocated {
            println!("  - {artifact}");
        }
    }
}

fn run_install(runtime: &RuntimeOptions, args: InstallArgs) -> Result<()> {
    let (paths, config) = resolve_runtime(runtime)?;
    let generated = run_generate(&paths, &config)?;
    print_generate_report(&generated);

    let target = match (args.target, args.global) {
        (Some(path), _) => InstallTarget::Explicit(path),
        (None, true) => InstallTarget::Global {
            home: home_dir()?,
        },
        (None, false) => InstallTarget::Project,
    };
    let report = install_skills(
        &paths,
        &config,
        &InstallOptions {
            target,
            write_settings: !args.no_settings,
        },
    )?;

    println!("target_dir: {}", report.target_dir);
    for skill in &report.installed {
        println!("installed: {skill}");
    }
    println!("copied_files: {}", report.copied_files);
    println!(
        "settings: {}",
        report.settings_path.as_deref().unwrap_or("<not written>")
    );
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn run_locate_command(runtime: &RuntimeOptions, args: LocateArgs) -> Result<()> {
    let (paths, config) = resolve_runtime(runtime)?;
    let report = run_locate(&paths, &config, &args.category, &args.artifact)?;

    println!("category: {}", report.category);
    println!("artifact: {}", report.artifact);
    println!("located: {}", format_flag(report.located));
    if let (Some(document), Some(identifier), Some(shape)) =
        (&report.document, &report.identifier, report.shape)
    {
        println!("document: {document}");
        println!("identifier: {identifier}");
        println!("shape: {}", shape.as_str());
    }
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn run_snapshot(runtime: &RuntimeOptions) -> Result<()> {
    let (paths, _) = resolve_runtime(runtime)?;
    let snapshot = snapshot_outputs(&paths)?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn resolve_runtime(runtime: &RuntimeOptions) -> Result<(ResolvedPaths, ToolConfig)> {
    dotenvy::dotenv().ok();

    let context = ResolutionContext::from_process()?;
    let overrides = PathOverrides {
        project_root: runtime.project_root.clone(),
        config: runtime.config.clone(),
    };

    let initial = resolve_paths(&context, &overrides)?;
    let project_env = initial.project_root.join(".env");
    if project_env.exists() {
        let _ = dotenvy::from_path_override(&project_env);
    }

    let paths = resolve_paths(&context, &overrides)?;
    let config = load_config(&paths.config_path)?;
    let paths = paths.with_layout(&config.paths);
    Ok((paths, config))
}

fn home_dir() -> Result<PathBuf> {
    match env::var_os("HOME").or_else(|| env::var_os("USERPROFILE")) {
        Some(home) if !home.is_empty() => Ok(PathBuf::from(home)),
        _ => bail!("cannot resolve the home directory for --global; set HOME or use --target"),
    }
}

fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    println!("warnings:");
    for warning in warnings {
        println!("  - {warning}");
    }
}

fn print_diagnostics(runtime: &RuntimeOptions, paths: &ResolvedPaths) {
    if runtime.diagnostics {
        println!("\n[diagnostics]\n{}", paths.diagnostics());
    }
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
