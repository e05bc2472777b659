//! Content Blocker CLI
//!
//! CLI tool for checking requests against filter lists and keeping
//! profiles up to date.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use cb_compiler::{compile_filter_list, verify_checksum, ChecksumStatus, CompiledList};
use cb_core::url::extract_host;
use cb_core::{candidate_domains, HidingMode, MatchDecision, ResourceType};
use cb_profile::{
    load_listing, save_listing, ContentBlockingProfile, FsStorage, HttpFetcher, ProfileEvent, RuleFetcher,
    RuleStorage,
};

#[derive(Parser)]
#[command(name = "cb-cli")]
#[command(about = "Content blocker filter list tools")]
struct Cli {
    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a request URL against a filter list
    Check {
        /// Filter list file
        #[arg(short, long)]
        list: PathBuf,

        /// Request URL
        #[arg(short, long)]
        url: String,

        /// URL of the page issuing the request
        #[arg(short, long, default_value = "")]
        base: String,

        /// Resource type (script, image, stylesheet, sub_frame, xmlhttprequest, ...)
        #[arg(short = 't', long = "type", default_value = "other")]
        resource_type: String,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the element hiding selectors for a page
    Cosmetic {
        /// Filter list file
        #[arg(short, long)]
        list: PathBuf,

        /// Page URL
        #[arg(short, long)]
        url: String,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Show list metadata and rule counts
    Info {
        /// Filter list file
        #[arg(short, long)]
        list: PathBuf,
    },

    /// Verify the embedded checksum of a list
    Verify {
        /// Filter list file
        #[arg(short, long)]
        list: PathBuf,
    },

    /// Download updates for the profiles in a JSON listing
    Update {
        /// Profile listing (JSON array of profile settings)
        #[arg(short, long)]
        profiles: PathBuf,

        /// Directory holding the downloaded lists
        #[arg(short, long)]
        dir: PathBuf,

        /// Only update this profile
        #[arg(short, long)]
        name: Option<String>,

        /// Update even if the interval has not elapsed
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check {
            list,
            url,
            base,
            resource_type,
            json,
        } => cmd_check(&list, &url, &base, &resource_type, json),
        Commands::Cosmetic { list, url, json } => cmd_cosmetic(&list, &url, json),
        Commands::Info { list } => cmd_info(&list),
        Commands::Verify { list } => cmd_verify(&list),
        Commands::Update {
            profiles,
            dir,
            name,
            force,
        } => cmd_update(&profiles, &dir, name.as_deref(), force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_list(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path.display(), e))
}

fn compile_list(path: &Path) -> Result<CompiledList, String> {
    Ok(compile_filter_list(&read_list(path)?))
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    decision: &'static str,
    rule: Option<&'a str>,
}

fn cmd_check(list: &Path, url: &str, base: &str, resource_type: &str, json: bool) -> Result<(), String> {
    let compiled = compile_list(list)?;
    let resource_type = ResourceType::from_str(resource_type);

    let result = compiled.index.check_url(base, url, resource_type);
    let decision = match result.decision {
        MatchDecision::Block => "block",
        MatchDecision::Allow => "allow",
        MatchDecision::NoMatch => "no-match",
    };
    let rule = compiled.index.rule_for(&result).map(|rule| rule.raw.as_str());

    if json {
        let output = serde_json::to_string(&CheckOutput { decision, rule }).map_err(|e| e.to_string())?;
        println!("{output}");
    } else {
        match rule {
            Some(rule) => println!("{decision} ({rule})"),
            None => println!("{decision}"),
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct CosmeticOutput<'a> {
    hiding: &'static str,
    generic: Vec<&'a str>,
    domain: Vec<&'a str>,
}

fn cmd_cosmetic(list: &Path, url: &str, json: bool) -> Result<(), String> {
    let compiled = compile_list(list)?;
    let index = &compiled.index;

    let hiding = index.check_page_hiding(url);
    let host = extract_host(url).to_ascii_lowercase();
    let domains = candidate_domains(&host);
    let filters = match hiding {
        HidingMode::Disabled => Default::default(),
        HidingMode::DomainOnly => index.get_cosmetic_filters(&domains, true),
        HidingMode::All => index.get_cosmetic_filters(&domains, false),
    };

    let output = CosmeticOutput {
        hiding: match hiding {
            HidingMode::All => "all",
            HidingMode::DomainOnly => "domain-only",
            HidingMode::Disabled => "disabled",
        },
        generic: filters.generic,
        domain: filters.domain,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?);
    } else {
        println!("Element hiding: {}", output.hiding);
        println!("Domain selectors ({}):", output.domain.len());
        for selector in &output.domain {
            println!("  {selector}");
        }
        println!("Generic selectors ({}):", output.generic.len());
        for selector in &output.generic {
            println!("  {selector}");
        }
    }

    Ok(())
}

fn cmd_info(list: &Path) -> Result<(), String> {
    let start = Instant::now();
    let compiled = compile_list(list)?;
    let elapsed = start.elapsed();

    let header = &compiled.header;
    let stats = &compiled.stats;
    let index = &compiled.index;

    println!("List: {}", list.display());
    println!("  Format:   {}", header.format.as_deref().unwrap_or("-"));
    println!("  Title:    {}", header.title.as_deref().unwrap_or("-"));
    println!("  Homepage: {}", header.homepage.as_deref().unwrap_or("-"));
    println!("  Version:  {}", header.version.as_deref().unwrap_or("-"));
    match header.expires_days() {
        Some(days) => println!("  Expires:  {days} days"),
        None => println!("  Expires:  -"),
    }
    println!();
    println!("Lines:      {} ({} comments, {} dropped)", stats.parse.lines, stats.parse.comments, stats.parse.dropped);
    println!(
        "Network:    {} -> {} (dedupe removed {}, badfilter removed {})",
        stats.optimize.before, stats.optimize.after, stats.optimize.deduped, stats.optimize.badfiltered_rules
    );
    println!(
        "Cosmetic:   {} generic, {} domain-scoped",
        index.cosmetic.generic_count(),
        index.cosmetic.domain_count()
    );
    println!("Trie nodes: {}", index.rules.node_count());
    println!("Time:       {:.1}ms", elapsed.as_secs_f64() * 1000.0);

    Ok(())
}

fn cmd_verify(list: &Path) -> Result<(), String> {
    let text = read_list(list)?;

    match verify_checksum(&text) {
        ChecksumStatus::Valid => {
            println!("Checksum valid");
            Ok(())
        }
        ChecksumStatus::Missing => {
            println!("No checksum");
            Ok(())
        }
        ChecksumStatus::Invalid { expected, computed } => {
            Err(format!("Checksum mismatch: list says {expected}, content is {computed}"))
        }
    }
}

fn cmd_update(profiles_path: &Path, dir: &Path, only: Option<&str>, force: bool) -> Result<(), String> {
    let mut listing = load_listing(profiles_path).map_err(|e| e.to_string())?;
    let storage: Arc<dyn RuleStorage> = Arc::new(FsStorage::new(dir));
    let fetcher: Arc<dyn RuleFetcher> = Arc::new(HttpFetcher::new().map_err(|e| e.to_string())?);
    let runtime = tokio::runtime::Runtime::new().map_err(|e| format!("Failed to start runtime: {e}"))?;

    let now = SystemTime::now();
    let mut failures = 0usize;

    runtime.block_on(async {
        for settings in listing.iter_mut() {
            if only.is_some_and(|name| name != settings.name) {
                continue;
            }

            let profile = ContentBlockingProfile::new(settings.clone(), storage.clone());
            if let Err(e) = profile.load_rules() {
                log::debug!("no usable stored list for {:?}: {e}", settings.name);
            }

            if !force && !profile.is_update_due(now) {
                println!("{}: up to date", profile.title());
                continue;
            }

            let mut events = profile.subscribe();
            if !profile.download_rules(fetcher.clone()) {
                println!("{}: no update URL", profile.title());
                continue;
            }

            loop {
                match events.recv().await {
                    Ok(ProfileEvent::Modified { .. }) if !profile.is_updating() => {
                        println!("{}: updated", profile.title());
                        break;
                    }
                    Ok(ProfileEvent::UpdateFailed { error, .. }) => {
                        println!("{}: {error}", profile.title());
                        failures += 1;
                        break;
                    }
                    Ok(ProfileEvent::Modified { .. }) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
            }

            *settings = profile.settings();
        }
    });

    save_listing(profiles_path, &listing).map_err(|e| e.to_string())?;

    if failures > 0 {
        return Err(format!("{failures} profile(s) failed to update"));
    }
    Ok(())
}
