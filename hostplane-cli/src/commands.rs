use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use hostplane_config::Registry;
use hostplane_core::{
    ConfigEngine, ConfigUpdate, Driver, EngineConfig, EngineOptions, FileWatcher, PassOutcome,
    Snapshot, Trigger,
};
use hostplane_sources::DatastoreHandle;
use hostplane_telemetry::{filter_for_severity, init_logging, ResolutionMetrics};

use crate::output;

#[derive(Parser)]
#[command(name = "hostplane", version, about)]
pub struct Cli {
    /// Log filter directive; defaults to the resolved logSeverityScreen.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the effective configuration once and print it
    Resolve(ResolveArgs),
    /// Keep resolving and print every change until interrupted
    Watch(WatchArgs),
    /// Describe registered parameters
    Describe(DescribeArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Yaml,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Engine settings (YAML); HOSTPLANE_* variables apply on top
    #[arg(long)]
    pub engine_config: Option<PathBuf>,
    /// Local override file (key = value, YAML or JSON)
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Environment variable prefix of agent parameters
    #[arg(long)]
    pub env_prefix: Option<String>,
    /// JSON document standing in for this host's datastore object
    #[arg(long)]
    pub host_object: Option<PathBuf>,
    /// JSON document standing in for the global datastore object
    #[arg(long)]
    pub global_object: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub sources: SourceArgs,
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
    /// Only print parameters some source overrode
    #[arg(long)]
    pub only_overridden: bool,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    #[command(flatten)]
    pub sources: SourceArgs,
    /// Poll interval, e.g. `10s`; defaults to the engine setting
    #[arg(long, value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,
    /// Print Prometheus metrics on exit
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DescribeArgs {
    /// Parameter name in any accepted spelling; all parameters when omitted
    pub name: Option<String>,
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

/// Engine plus the datastore handles feeding it.
struct Assembly {
    config: EngineConfig,
    engine: Arc<ConfigEngine>,
    per_host: DatastoreHandle,
    global: DatastoreHandle,
}

fn assemble(
    args: &SourceArgs,
    metrics: Option<Arc<ResolutionMetrics>>,
) -> anyhow::Result<Assembly> {
    let mut config = EngineConfig::load(args.engine_config.as_deref())
        .context("loading engine configuration")?;
    if let Some(file) = &args.file {
        config.config_file = Some(file.clone());
    }
    if let Some(prefix) = &args.env_prefix {
        config.env_prefix = prefix.clone();
    }

    let registry = Registry::builtin().context("building parameter registry")?;
    let per_host = DatastoreHandle::new();
    let global = DatastoreHandle::new();
    let options = EngineOptions {
        channel_capacity: config.channel_capacity,
        first_pass: config.first_pass_policy(),
    };
    let mut engine = ConfigEngine::new(
        registry,
        config.sources(per_host.clone(), global.clone()),
        options,
    )?;
    if let Some(metrics) = metrics {
        engine = engine.with_metrics(metrics);
    }

    let assembly = Assembly {
        config,
        engine: Arc::new(engine),
        per_host,
        global,
    };
    assembly.load_objects(args)?;
    Ok(assembly)
}

impl Assembly {
    /// (Re)publishes the datastore stand-in documents.
    fn load_objects(&self, args: &SourceArgs) -> anyhow::Result<()> {
        publish_object(&self.per_host, args.host_object.as_deref())?;
        publish_object(&self.global, args.global_object.as_deref())?;
        Ok(())
    }

    /// Files whose edits should start a pass.
    fn watched_files(&self, args: &SourceArgs) -> Vec<PathBuf> {
        self.config
            .config_file
            .iter()
            .chain(&args.host_object)
            .chain(&args.global_object)
            .cloned()
            .collect()
    }

    /// Watches every input file. Object files are re-published before the
    /// pass is triggered.
    fn watch_files(&self, args: &SourceArgs, trigger: Trigger) -> anyhow::Result<FileWatcher> {
        let objects = [
            (args.host_object.clone(), self.per_host.clone()),
            (args.global_object.clone(), self.global.clone()),
        ];
        let watcher = FileWatcher::new(&self.watched_files(args), move |changed| {
            for (path, handle) in &objects {
                if path.as_deref() == Some(changed) {
                    if let Err(e) = publish_object(handle, Some(changed)) {
                        tracing::warn!("Failed to reload datastore object: {e:#}");
                    }
                }
            }
            trigger.fire();
        })
        .context("watching configuration files")?;
        Ok(watcher)
    }
}

fn publish_object(handle: &DatastoreHandle, path: Option<&Path>) -> anyhow::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    match std::fs::read_to_string(path) {
        Ok(json) => handle
            .publish_spec_json(&json)
            .with_context(|| format!("parsing {}", path.display()))?,
        Err(e) => handle.mark_unreachable(format!("{}: {e}", path.display())),
    }
    Ok(())
}

/// Logging is set up after a first pass so that the agent's own resolved
/// screen severity can drive it.
async fn first_pass(
    engine: &ConfigEngine,
    log_level: Option<&str>,
) -> anyhow::Result<Arc<ConfigUpdate>> {
    let update = match engine.resolve().await {
        PassOutcome::Committed(update) => update,
        PassOutcome::Superseded => bail!("initial resolution pass was superseded"),
    };
    let directive = log_level.map(str::to_string).or_else(|| {
        update
            .snapshot
            .string("logSeverityScreen")
            .and_then(filter_for_severity)
            .map(|level| level.as_str().to_ascii_lowercase())
    });
    init_logging(directive.as_deref());
    Ok(update)
}

pub async fn resolve(args: ResolveArgs, log_level: Option<&str>) -> anyhow::Result<()> {
    let assembly = assemble(&args.sources, None)?;
    let update = first_pass(&assembly.engine, log_level).await?;

    output::print_snapshot(&update.snapshot, args.format, args.only_overridden)?;
    report_problems(&update);
    Ok(())
}

pub async fn watch(args: WatchArgs, log_level: Option<&str>) -> anyhow::Result<()> {
    let metrics = Arc::new(ResolutionMetrics::new()?);
    let assembly = assemble(&args.sources, Some(metrics.clone()))?;
    let initial = first_pass(&assembly.engine, log_level).await?;
    print_summary(&initial.snapshot);
    report_problems(&initial);

    let interval = args
        .interval
        .unwrap_or_else(|| assembly.config.poll_interval());
    let mut updates = assembly.engine.subscribe();
    let (driver, handle) = Driver::new(assembly.engine.clone(), interval);
    let driver_task = tokio::spawn(driver.run());

    let watcher = assembly.watch_files(&args.sources, handle.trigger())?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = updates.recv() => match update {
                Some(update) => output::print_changes(&update),
                None => break,
            },
        }
    }

    info!("Shutting down");
    drop(watcher);
    handle.shutdown();
    driver_task.await?;

    if args.metrics {
        print!("{}", metrics.gather_metrics()?);
    }
    Ok(())
}

/// Logging is not up during the first pass, so its report goes to stderr.
fn report_problems(update: &ConfigUpdate) {
    if let Some(text) = problems_text(update) {
        eprint!("{text}");
    }
}

fn problems_text(update: &ConfigUpdate) -> Option<String> {
    (!update.report.is_clean()).then(|| format!("Rejected configuration:\n{}", update.report))
}

fn print_summary(snapshot: &Snapshot) {
    println!(
        "generation {} ({} overridden, fingerprint {})",
        snapshot.generation(),
        snapshot.overridden().count(),
        &snapshot.fingerprint()[..12]
    );
}

pub fn describe(args: DescribeArgs) -> anyhow::Result<()> {
    let registry = Registry::builtin().context("building parameter registry")?;
    let descriptors: Vec<_> = match &args.name {
        Some(name) => match registry.descriptor_for(name) {
            Some(descriptor) => vec![descriptor],
            None => bail!("no parameter named '{name}'"),
        },
        None => registry.all_descriptors().iter().collect(),
    };
    output::print_descriptors(&registry, &descriptors, args.format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use figment::Jail;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_watch_interval() {
        let cli = Cli::parse_from([
            "hostplane",
            "watch",
            "--interval",
            "30s",
            "--file",
            "felix.cfg",
        ]);
        match cli.command {
            Commands::Watch(args) => {
                assert_eq!(args.interval, Some(Duration::from_secs(30)));
                assert_eq!(args.sources.file, Some(PathBuf::from("felix.cfg")));
            }
            _ => panic!("expected watch"),
        }
    }

    fn source_args(file: Option<&str>, host_object: Option<&str>) -> SourceArgs {
        SourceArgs {
            engine_config: None,
            file: file.map(PathBuf::from),
            env_prefix: None,
            host_object: host_object.map(PathBuf::from),
            global_object: None,
        }
    }

    #[tokio::test]
    async fn first_pass_problems_are_rendered() {
        let args = source_args(None, Some("/no/such/host.json"));
        let assembly = assemble(&args, None).unwrap();
        let update = match assembly.engine.resolve().await {
            PassOutcome::Committed(update) => update,
            PassOutcome::Superseded => panic!("pass was superseded"),
        };

        let text = problems_text(&update).unwrap();
        assert!(text.starts_with("Rejected configuration:\n"));
        assert!(text.contains("source datastore-per-host"));
        assert!(text.contains("/no/such/host.json"));
    }

    #[tokio::test]
    async fn clean_pass_renders_no_problems() {
        let assembly = assemble(&source_args(None, None), None).unwrap();
        let update = match assembly.engine.resolve().await {
            PassOutcome::Committed(update) => update,
            PassOutcome::Superseded => panic!("pass was superseded"),
        };
        assert_eq!(problems_text(&update), None);
    }

    #[test]
    fn watches_config_and_object_files() {
        let args = source_args(Some("felix.cfg"), Some("host.json"));
        let assembly = assemble(&args, None).unwrap();
        assert_eq!(
            assembly.watched_files(&args),
            [PathBuf::from("felix.cfg"), PathBuf::from("host.json")]
        );
        assert!(assembly.watched_files(&source_args(None, None)).is_empty());
    }

    #[test]
    fn edited_object_file_is_republished() {
        Jail::expect_with(|jail| {
            let host = jail.directory().join("host.json");
            jail.create_file("host.json", r#"{"vxlanVNI": 5000}"#)?;
            let args = source_args(None, host.to_str());
            let assembly = assemble(&args, None).unwrap();
            let (_driver, handle) = Driver::new(assembly.engine.clone(), Duration::ZERO);
            let _watcher = assembly.watch_files(&args, handle.trigger()).unwrap();

            let runtime = tokio::runtime::Runtime::new().unwrap();
            let vni = || {
                runtime.block_on(assembly.engine.resolve());
                assembly.engine.current_snapshot().int("vxlanVNI")
            };
            assert_eq!(vni(), Some(5000));

            jail.create_file("host.json", r#"{"vxlanVNI": 6000}"#)?;
            let mut seen = None;
            for _ in 0..50 {
                seen = vni();
                if seen == Some(6000) {
                    break;
                }
                std::thread::sleep(Duration::from_millis(100));
            }
            assert_eq!(seen, Some(6000));
            Ok(())
        });
    }
}
