//! The scan command: load a collected snapshot, run every applicable
//! plugin, and report findings to the console or a JSON file.
//!
//! Collection itself happens out of process, by one collector per cloud,
//! each wrapping vendor APIs and pagination. This command consumes the
//! snapshot those collectors write, which also makes scans reproducible:
//! the same collection file always yields the same findings.

use crate::console::ConsoleSink;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use kumori_engine::output::JsonSink;
use kumori_engine::{
    default_registry, AccountScope, CloudContext, OutputSink, ScanSettings, ScanningEngine,
    SnapshotCollector,
};
use std::path::PathBuf;

#[derive(Args)]
pub struct ScanArgs {
    /// Cloud provider whose catalog to run
    #[arg(long, default_value = "aws")]
    pub cloud: String,

    /// Previously collected snapshot JSON file
    #[arg(long)]
    pub collection: PathBuf,

    /// Run only this plugin id
    #[arg(long)]
    pub plugin: Option<String>,

    /// Comma-delimited plugin ids to skip
    #[arg(long)]
    pub skip_plugin: Option<String>,

    /// Compliance program to scan for (repeatable)
    #[arg(long = "compliance")]
    pub compliance: Vec<String>,

    /// Suppression expression pluginId:region:resource, * wildcards allowed
    /// (repeatable)
    #[arg(long = "suppress")]
    pub suppress: Vec<String>,

    /// Drop passing results from the output
    #[arg(long)]
    pub ignore_ok: bool,

    #[arg(long)]
    pub skip_paginate: bool,

    #[arg(long)]
    pub govcloud: bool,

    #[arg(long)]
    pub china: bool,

    /// Exit with the worst finding's status code instead of 0
    #[arg(long)]
    pub exit_code: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Console)]
    pub format: OutputFormat,

    /// Write JSON results to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Credential scope, for providers that distinguish organization from
    /// user accounts
    #[arg(long, value_enum)]
    pub scope: Option<Scope>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum OutputFormat {
    Console,
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum Scope {
    Org,
    User,
}

pub async fn execute(args: ScanArgs) -> Result<i32> {
    let registry = default_registry(&args.cloud);
    if registry.is_empty() {
        anyhow::bail!("No plugin catalog for provider: {}", args.cloud);
    }

    let mut context = CloudContext::new(&args.cloud);
    if let Some(scope) = args.scope {
        context = context.with_account_scope(match scope {
            Scope::Org => AccountScope::Organization,
            Scope::User => AccountScope::User,
        });
    }

    let mut settings = ScanSettings::new()
        .with_compliance(args.compliance)
        .with_suppress(args.suppress)
        .with_ignore_ok(args.ignore_ok)
        .with_skip_paginate(args.skip_paginate)
        .with_govcloud(args.govcloud)
        .with_china(args.china)
        .with_exit_code(args.exit_code);
    if let Some(plugin) = args.plugin {
        settings = settings.with_plugin(plugin);
    }
    if let Some(skip) = args.skip_plugin {
        settings = settings.with_skip_plugins(skip.as_str());
    }

    let collector = SnapshotCollector::from_file(&args.collection)
        .context("Unable to load the collection snapshot")?;

    let sink: Box<dyn OutputSink + Send> = match args.format {
        OutputFormat::Console => Box::new(ConsoleSink::new(args.ignore_ok)),
        OutputFormat::Json => {
            let sink = match &args.output {
                Some(path) => JsonSink::to_file(path)?,
                None => JsonSink::stdout(),
            };
            Box::new(sink.with_ignore_ok(args.ignore_ok))
        }
    };

    let engine = ScanningEngine::new(registry);
    let summary = engine.run(&context, settings, &collector, sink).await?;

    Ok(summary.exit_code)
}
