use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use raidtally_core::{ApiClient, ClanApi, RaidTable, Report, pipeline};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "raidtally",
    about = "Sum raid completions across every member of a Destiny 2 clan"
)]
#[command(version)]
struct Cli {
    /// Bungie API key, sent as the X-API-Key header
    #[arg(long)]
    api_key: String,

    /// Numeric clan group id
    #[arg(long, required_unless_present = "group_name", conflicts_with = "group_name")]
    group_id: Option<String>,

    /// Clan name, resolved to a group id before the run
    #[arg(long)]
    group_name: Option<String>,

    /// Group type used when resolving --group-name (1 = clan)
    #[arg(long, default_value_t = 1)]
    group_type: i32,

    /// Output file path
    #[arg(long, default_value = "results.json")]
    out: PathBuf,

    /// Ceiling on simultaneous in-flight requests
    #[arg(long, default_value_t = raidtally_core::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Restrict aggregation to these activity hashes (default: all known)
    #[arg(long, num_args = 1.., value_name = "HASH")]
    raid_hashes: Vec<u32>,

    /// Single activity hash (deprecated, use --raid-hashes)
    #[arg(long, hide = true, conflicts_with = "raid_hashes")]
    raid_hash: Option<u32>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// The explicit hash subset, folding in the deprecated single-hash
    /// flag. Empty means "all known".
    fn selected_hashes(&self) -> Vec<u32> {
        if !self.raid_hashes.is_empty() {
            self.raid_hashes.clone()
        } else {
            self.raid_hash.into_iter().collect()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let start = Instant::now();

    let table = RaidTable::builtin();
    let wanted = table.wanted_set(&cli.selected_hashes());
    if wanted.is_empty() {
        bail!("none of the requested activity hashes are known");
    }

    let client = ApiClient::new(cli.api_key.as_str())?.with_concurrency(cli.concurrency);

    let group_id = match (&cli.group_id, &cli.group_name) {
        (Some(id), _) => id.clone(),
        (None, Some(name)) => {
            let id = client
                .group_id_by_name(name, cli.group_type)
                .await
                .with_context(|| format!("resolving clan {name:?}"))?;
            info!(clan = %name, group_id = %id, "resolved clan name");
            id
        }
        (None, None) => bail!("either --group-id or --group-name is required"),
    };

    let totals = pipeline::run(Arc::new(client), &table, &group_id, &wanted)
        .await
        .context("fetching the clan member directory")?;

    let report = Report::assemble(group_id, &table, totals);
    write_report(&cli.out, &report)?;

    let elapsed = start.elapsed().as_secs_f64();
    info!(out = %cli.out.display(), "run complete");
    println!("Done in {:.2}s. Results in {}", elapsed, cli.out.display());
    Ok(())
}

fn write_report(path: &Path, report: &Report) -> Result<()> {
    let body = serde_json::to_vec(report).context("serializing report")?;
    std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_surface_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn group_id_or_name_is_required() {
        let result = Cli::try_parse_from(["raidtally", "--api-key", "k"]);
        assert!(result.is_err());

        let cli =
            Cli::try_parse_from(["raidtally", "--api-key", "k", "--group-id", "4901284"]).unwrap();
        assert_eq!(cli.group_id.as_deref(), Some("4901284"));
        assert_eq!(cli.concurrency, 150);
        assert_eq!(cli.out, PathBuf::from("results.json"));
    }

    #[test]
    fn deprecated_single_hash_flag_feeds_the_subset() {
        let cli = Cli::try_parse_from([
            "raidtally",
            "--api-key",
            "k",
            "--group-id",
            "1",
            "--raid-hash",
            "3881495763",
        ])
        .unwrap();
        assert_eq!(cli.selected_hashes(), vec![3881495763]);
    }

    #[test]
    fn write_report_emits_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let report = Report::assemble("4901284", &RaidTable::builtin(), vec![]);

        write_report(&path, &report).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["group_id"], "4901284");
        assert!(json["raids"].is_object());
        assert_eq!(json["members"], serde_json::json!([]));
    }

    #[test]
    fn explicit_hash_list_wins() {
        let cli = Cli::try_parse_from([
            "raidtally",
            "--api-key",
            "k",
            "--group-id",
            "1",
            "--raid-hashes",
            "100",
            "200",
        ])
        .unwrap();
        assert_eq!(cli.selected_hashes(), vec![100, 200]);
    }
}
