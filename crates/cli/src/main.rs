//! Command-line front end for the mentor matching engine.
//!
//! Usage:
//!     mentormatch match --mentors mentors.json --mentees mentees.json
//!     mentormatch explain --mentors mentors.json --mentees mentees.json --mentor m1 --mentee t1
//!     mentormatch conflicts --selection selection.json
//!     mentormatch save --mentors mentors.json --mentees mentees.json --selection selection.json

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use mentormatch_explain::explain_pair;
use mentormatch_features::normalize_pool;
use mentormatch_model::{MatchConfig, Person, RawProfile};
use mentormatch_rank::{
    detect_conflicts, mentors_with_conflicts, ConflictMap, MatchSet, Matcher, SelectedPair,
    Selection,
};
use mentormatch_store::{AssignedIds, AssignmentStore, MemoryStore, RestConfig, RestStore};

#[derive(Parser)]
#[command(name = "mentormatch")]
#[command(about = "Score and assign mentor/mentee pairs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute ranked matches and the recommended assignment
    Match {
        #[command(flatten)]
        pools: PoolArgs,

        #[command(flatten)]
        tuning: TuningArgs,

        #[command(flatten)]
        store: StoreArgs,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show the score breakdown for one pair
    Explain {
        #[command(flatten)]
        pools: PoolArgs,

        #[command(flatten)]
        tuning: TuningArgs,

        /// Mentor id
        #[arg(long)]
        mentor: String,

        /// Mentee id
        #[arg(long)]
        mentee: String,
    },

    /// Report mentees selected under more than one mentor
    Conflicts {
        /// Path to a JSON array of {mentorId, menteeId}
        #[arg(short, long)]
        selection: PathBuf,
    },

    /// Persist an approved selection
    Save {
        #[command(flatten)]
        pools: PoolArgs,

        #[command(flatten)]
        tuning: TuningArgs,

        #[command(flatten)]
        store: StoreArgs,

        /// Path to a JSON array of {mentorId, menteeId}
        #[arg(short, long)]
        selection: PathBuf,

        /// Save even if a mentee is selected under several mentors
        #[arg(long)]
        allow_conflicts: bool,
    },
}

#[derive(Args)]
struct PoolArgs {
    /// Path to the mentor profiles (JSON array)
    #[arg(long)]
    mentors: PathBuf,

    /// Path to the mentee profiles (JSON array)
    #[arg(long)]
    mentees: PathBuf,
}

#[derive(Args)]
struct TuningArgs {
    /// JSON file with a MatchConfig; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum base picks per mentor
    #[arg(long)]
    capacity: Option<usize>,

    /// Maximum display-list length per mentor
    #[arg(long)]
    list_size: Option<usize>,

    /// Education score when a level is missing
    #[arg(long)]
    missing_education: Option<f64>,
}

#[derive(Args)]
struct StoreArgs {
    /// REST store base URL; without it assignments stay in memory
    #[arg(long)]
    store_url: Option<String>,

    /// REST store API key
    #[arg(long)]
    api_key: Option<String>,
}

impl TuningArgs {
    fn matcher(&self) -> Result<Matcher> {
        let mut config = match &self.config {
            Some(path) => read_json::<MatchConfig>(path)?,
            None => MatchConfig::default(),
        };
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(list_size) = self.list_size {
            config.list_size = list_size;
        }
        if let Some(score) = self.missing_education {
            config.missing_education_score = score;
        }
        Matcher::new(config).context("invalid match configuration")
    }
}

impl StoreArgs {
    fn rest_store(&self) -> Result<Option<RestStore>> {
        let Some(url) = &self.store_url else {
            return Ok(None);
        };
        let config = RestConfig {
            base_url: url.clone(),
            api_key: self.api_key.clone(),
            ..Default::default()
        };
        Ok(Some(RestStore::new(config)?))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mentormatch=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Match {
            pools,
            tuning,
            store,
            format,
        } => {
            run_match(&pools, &tuning, &store, &format).await?;
        }
        Commands::Explain {
            pools,
            tuning,
            mentor,
            mentee,
        } => {
            run_explain(&pools, &tuning, &mentor, &mentee)?;
        }
        Commands::Conflicts { selection } => {
            run_conflicts(&selection)?;
        }
        Commands::Save {
            pools,
            tuning,
            store,
            selection,
            allow_conflicts,
        } => {
            let pairs: Vec<SelectedPair> = read_json(&selection)?;
            match store.rest_store()? {
                Some(rest) => run_save(&rest, &pools, &tuning, &pairs, allow_conflicts).await?,
                None => {
                    let memory = MemoryStore::new();
                    run_save(&memory, &pools, &tuning, &pairs, allow_conflicts).await?
                }
            }
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

/// Load a profile file, skipping entries that are not even profile-shaped.
fn read_profiles(path: &Path) -> Result<Vec<RawProfile>> {
    let values: Vec<serde_json::Value> = read_json(path)?;
    let mut profiles = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<RawProfile>(value) {
            Ok(profile) => profiles.push(profile),
            Err(e) => {
                tracing::warn!(file = %path.display(), index, error = %e, "Skipping unreadable profile");
            }
        }
    }
    Ok(profiles)
}

fn read_pools(pools: &PoolArgs) -> Result<(Vec<RawProfile>, Vec<RawProfile>)> {
    Ok((read_profiles(&pools.mentors)?, read_profiles(&pools.mentees)?))
}

async fn run_match(
    pools: &PoolArgs,
    tuning: &TuningArgs,
    store: &StoreArgs,
    format: &str,
) -> Result<()> {
    let matcher = tuning.matcher()?;
    let (mut mentors, mut mentees) = read_pools(pools)?;

    if let Some(rest) = store.rest_store()? {
        let assigned = rest
            .assigned()
            .await
            .with_context(|| format!("failed to load assignments from {} store", rest.name()))?;
        AssignedIds::from_records(&assigned).retain_unassigned(&mut mentors, &mut mentees);
    }

    let matches = matcher.compute_from_raw(&mentors, &mentees);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&matches)?);
    } else {
        print_matches(&matches);
    }

    Ok(())
}

fn print_matches(matches: &MatchSet) {
    if matches.is_empty() {
        println!("No matches (empty mentor or mentee pool)");
        return;
    }

    for entry in &matches.mentors {
        let name = entry.display_name.as_deref().unwrap_or(&entry.mentor_id);
        println!("\n{} ({})", name, entry.mentor_id);
        for (i, candidate) in entry.candidates.iter().enumerate() {
            let pair = &candidate.pair;
            let marker = if candidate.recommended { "*" } else { " " };
            println!(
                "  {}{}. {}  overall {:.2} | skill {:.2} industry {:.0} education {:.2} hobby {:.2}",
                marker,
                i + 1,
                pair.mentee_id,
                pair.overall_score,
                pair.scores.skill,
                pair.scores.industry,
                pair.scores.education,
                pair.scores.hobby
            );
            for reason in &pair.reasons {
                println!("       - {}", reason);
            }
        }
    }

    let picks = matches.base_recommendation().count();
    println!("\n---");
    println!("Recommended: {} pair(s) (marked *)", picks);
}

fn find<'a>(pool: &'a [Person], id: &str, role: &str) -> Result<&'a Person> {
    match pool.iter().find(|p| p.id == id) {
        Some(person) => Ok(person),
        None => bail!("{} {} not found or not a valid profile", role, id),
    }
}

fn run_explain(pools: &PoolArgs, tuning: &TuningArgs, mentor_id: &str, mentee_id: &str) -> Result<()> {
    let matcher = tuning.matcher()?;
    let (mentors, mentees) = read_pools(pools)?;
    let mentors = normalize_pool(&mentors);
    let mentees = normalize_pool(&mentees);

    let mentor = find(&mentors, mentor_id, "Mentor")?;
    let mentee = find(&mentees, mentee_id, "Mentee")?;
    let pair = matcher.score_pair(mentor, mentee);
    let breakdown = explain_pair(mentor, mentee, &pair, &matcher.config().weights);

    println!("{} -> {}: {}%", mentor.label(), mentee.label(), breakdown.total_pct);
    for part in &breakdown.parts {
        println!(
            "  {:<10} score {:.2} x weight {:.2}  [{}]",
            part.label, part.score, part.weight, part.details
        );
    }
    for reason in &pair.reasons {
        println!("  - {}", reason);
    }

    Ok(())
}

fn print_conflicts(conflicts: &ConflictMap) {
    for (mentee, mentors) in conflicts {
        println!("  {} is assigned to {}", mentee, mentors.join(", "));
    }
}

fn run_conflicts(selection: &Path) -> Result<()> {
    let pairs: Vec<SelectedPair> = read_json(selection)?;
    let conflicts = detect_conflicts(
        pairs
            .iter()
            .map(|p| (p.mentor_id.as_str(), p.mentee_id.as_str())),
    );

    if conflicts.is_empty() {
        println!("No conflicts in {} selected pair(s)", pairs.len());
        return Ok(());
    }

    println!("{} conflict(s):", conflicts.len());
    print_conflicts(&conflicts);
    println!(
        "Mentors involved: {}",
        mentors_with_conflicts(&conflicts)
            .into_iter()
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

async fn run_save<S: AssignmentStore>(
    store: &S,
    pools: &PoolArgs,
    tuning: &TuningArgs,
    pairs: &[SelectedPair],
    allow_conflicts: bool,
) -> Result<()> {
    let matcher = tuning.matcher()?;
    let (mentors, mentees) = read_pools(pools)?;
    let mentors: HashMap<String, Person> = normalize_pool(&mentors)
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();
    let mentees: HashMap<String, Person> = normalize_pool(&mentees)
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

    let mut selection = Selection::new();
    for pair in pairs {
        match (mentors.get(&pair.mentor_id), mentees.get(&pair.mentee_id)) {
            (Some(mentor), Some(mentee)) => {
                selection.select(&matcher.score_pair(mentor, mentee));
            }
            _ => {
                tracing::warn!(
                    mentor = %pair.mentor_id,
                    mentee = %pair.mentee_id,
                    "Skipping selected pair with unknown profile"
                );
            }
        }
    }

    if selection.is_empty() {
        bail!("No valid pairs selected to save");
    }

    let conflicts = selection.refresh_status();
    if !conflicts.is_empty() {
        println!("{} conflict(s) in selection:", conflicts.len());
        print_conflicts(&conflicts);
        if !allow_conflicts {
            bail!("Refusing to save a conflicted selection; pass --allow-conflicts to proceed");
        }
    }

    let written = store
        .upsert(&selection.to_records())
        .await
        .with_context(|| format!("failed to save to {} store", store.name()))?;
    selection.mark_saved();

    println!("Saved {} match(es) to {} store", written, store.name());
    Ok(())
}
