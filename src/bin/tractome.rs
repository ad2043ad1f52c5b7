#[macro_use]
extern crate log;

use clap::{Parser, Subcommand};
use humantime::format_duration;
use std::error::Error;
use std::path;
use std::time::Instant;
use tractome::export::{write_pathway_tables, write_report_csv};
use tractome::merge::SourcePaths;
use tractome::{build_report, stats, PipelineConfig, PipelineContext, Report, SourceKind, SourceStatus, TractomeError};

#[derive(Parser, PartialEq, Debug)]
#[command(author, version, about, long_about = None)]
struct Options {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, PartialEq, Debug)]
enum Commands {
    /// Merge the annotation tables into one row per expression gene
    Merge {
        #[arg(short, long, required = true)]
        expression: path::PathBuf,

        #[arg(short, long)]
        tractability: Option<path::PathBuf>,

        #[arg(short, long)]
        pathways: Option<path::PathBuf>,

        #[arg(short, long)]
        drug_interactions: Option<path::PathBuf>,

        #[arg(short, long)]
        config: Option<path::PathBuf>,

        #[arg(short, long, required = true)]
        output: path::PathBuf,
    },
    /// Write the genes and drug interactions of every enriched pathway
    PathwayTables {
        #[arg(short, long, required = true)]
        expression: path::PathBuf,

        #[arg(short, long, required = true)]
        pathways: path::PathBuf,

        #[arg(short, long)]
        drug_interactions: Option<path::PathBuf>,

        #[arg(short, long)]
        config: Option<path::PathBuf>,

        #[arg(short, long, required = true)]
        output: path::PathBuf,
    },
    /// Print fold change sums and tag, biotype and interaction type counts as JSON
    Summarize {
        #[arg(short, long, required = true)]
        expression: path::PathBuf,

        #[arg(short, long)]
        tractability: Option<path::PathBuf>,

        #[arg(short, long)]
        drug_interactions: Option<path::PathBuf>,

        #[arg(short, long)]
        config: Option<path::PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    env_logger::init();

    let options = Options::parse();
    debug!("{:?}", options);

    match &options.command {
        Some(Commands::Merge {
            expression,
            tractability,
            pathways,
            drug_interactions,
            config,
            output,
        }) => {
            let config = PipelineConfig::load(config.as_ref())?;
            let paths = SourcePaths {
                expression: Some(expression.clone()),
                tractability: tractability.clone(),
                pathways: pathways.clone(),
                drug_interactions: drug_interactions.clone(),
            };
            let ctx = PipelineContext::from_paths(&paths, &config)?;
            let report = build_report(&ctx, &config)?;
            log_report(&report);
            write_report_csv(&report, output, &config)?;
        }
        Some(Commands::PathwayTables {
            expression,
            pathways,
            drug_interactions,
            config,
            output,
        }) => {
            let config = PipelineConfig::load(config.as_ref())?;
            let paths = SourcePaths {
                expression: Some(expression.clone()),
                pathways: Some(pathways.clone()),
                drug_interactions: drug_interactions.clone(),
                ..Default::default()
            };
            let ctx = PipelineContext::from_paths(&paths, &config)?;
            let genes = ctx.expression.records().ok_or_else(|| TractomeError::not_supplied(SourceKind::Expression))?;
            let enriched = ctx.pathways.records().ok_or_else(|| TractomeError::not_supplied(SourceKind::Pathways))?;
            write_pathway_tables(output, genes, enriched, ctx.drug_interactions.records())?;
        }
        Some(Commands::Summarize {
            expression,
            tractability,
            drug_interactions,
            config,
        }) => {
            let config = PipelineConfig::load(config.as_ref())?;
            let paths = SourcePaths {
                expression: Some(expression.clone()),
                tractability: tractability.clone(),
                drug_interactions: drug_interactions.clone(),
                ..Default::default()
            };
            let ctx = PipelineContext::from_paths(&paths, &config)?;
            let summary = stats::summarize(
                ctx.expression.records().unwrap_or(&[]),
                ctx.tractability.records().unwrap_or(&[]),
                ctx.drug_interactions.records().unwrap_or(&[]),
            );
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        None => {}
    }

    info!("Duration: {}", format_duration(start.elapsed()).to_string());
    Ok(())
}

fn log_report(report: &Report) {
    for kind in [SourceKind::Expression, SourceKind::Tractability, SourceKind::Pathways, SourceKind::DrugInteractions] {
        match report.availability.get(kind) {
            SourceStatus::Available { rows } => info!("{}: {} rows", kind, rows),
            SourceStatus::Unavailable { reason } => warn!("{}: {}", kind, reason),
        }
    }
    for issue in report.issues.iter() {
        warn!("{}", issue);
    }
    if !report.mismatches.is_empty() {
        info!("{} genes without a match in at least one source", report.mismatches.len());
    }
    for (kind, dropped) in report.duplicates_dropped.iter() {
        info!("{}: dropped {} duplicate rows", kind, dropped);
    }
    info!("report has {} genes and columns {:?}", report.len(), report.column_labels());
}
