//! Run command - clone every repository and collect matching folders

use std::path::PathBuf;

use clap::Args;
use harvest_core::{read_sources, Config, ConfigOverrides, Harvester, RunSummary, Secrets};

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// CSV table of `url,destination[,branch]` rows
    #[arg(short, long)]
    pub sources: Option<PathBuf>,

    /// Directory receiving one clone per row
    #[arg(long)]
    pub clone_root: Option<PathBuf>,

    /// Collect folders whose name contains this substring
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Consolidated output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Manifest file listing collected packages
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Rewind each clone to the last commit before this time (YYYY-MM-DD HH:MM:SS, UTC)
    #[arg(long)]
    pub cutoff: Option<String>,

    /// Directory searched inside each clone; repeat for several ("." is the clone root)
    #[arg(long = "search-root", value_name = "DIR")]
    pub search_roots: Vec<String>,

    /// Dry run - show what would be cloned without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// CLI values that take priority over env and config file
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            sources: self.sources.clone(),
            clone_root: self.clone_root.clone(),
            filter: self.filter.clone(),
            output_root: self.output.clone(),
            manifest: self.manifest.clone(),
            cutoff: self.cutoff.clone(),
            search_roots: self.search_roots.iter().map(PathBuf::from).collect(),
        }
    }

    /// Execute the run command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let credentials = Secrets::load()?.with_env_overrides().credentials()?;
        let run_config = config.resolve(credentials)?;
        let descriptors = read_sources(&run_config.sources_path)?;

        tracing::info!(
            repositories = descriptors.len(),
            sources = %run_config.sources_path.display(),
            "Loaded repository list"
        );

        if self.dry_run {
            println!("Harvest Dry Run");
            println!("===============");
            println!();
            println!("Filter: {}", run_config.filter);
            println!("Output: {}", run_config.output_root.display());
            match run_config.cutoff {
                Some(cutoff) => println!("Cutoff: {}", cutoff),
                None => println!("Cutoff: (none)"),
            }
            println!();
            for descriptor in &descriptors {
                println!(
                    "  {} -> {} [{}]",
                    descriptor.display_url(),
                    descriptor.target_dir(&run_config.clone_root).display(),
                    descriptor.branch.as_deref().unwrap_or("default branch")
                );
            }
            println!();
            println!("[Dry run] Would clone {} repositories", descriptors.len());
            return Ok(());
        }

        let summary = Harvester::new(run_config).run(descriptors).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_summary(&summary);
        }

        Ok(())
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("Harvest Summary");
    println!("===============");
    println!("  Repositories:      {}", summary.repositories);
    println!("  Cloned:            {}", summary.cloned);
    println!("  Failed:            {}", summary.failed);
    if summary.rewound + summary.no_commit_before_cutoff > 0 {
        println!("  Rewound:           {}", summary.rewound);
        println!("  No earlier commit: {}", summary.no_commit_before_cutoff);
    }
    println!("  Packages recorded: {}", summary.collect.packages_recorded);
    println!("  Folders copied:    {}", summary.collect.folders_copied);
    println!("  Collect errors:    {}", summary.collect.failures);

    if !summary.failures.is_empty() {
        println!();
        println!("Failed repositories:");
        for name in &summary.failures {
            println!("  - {}", name);
        }
    }
}
