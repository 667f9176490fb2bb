//! Session command handlers
//!
//! Handles fetching, editing, reconciling and publishing a pipeline through a cached
//! editing session. Every command opens a fresh session; unsaved edits carry over
//! between commands through the cache directory.

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use colored::*;
use rivet_core::compare::differences;
use rivet_core::domain::pipeline::PipelineDocument;
use rivet_core::domain::scope::PipelineScope;
use rivet_core::identity::derive_key;
use rivet_session::{
    Action, CacheStore, DocumentUpdate, FetchOutcome, FetchParams, ReconcileOutcome,
    SaveOptions, SaveOutcome, Session, SessionState,
};
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::Config;

/// Scope of the pipeline a command works on
#[derive(Args, Clone)]
pub struct ScopeArgs {
    /// Pipeline identifier
    pipeline: String,

    /// Organization identifier
    #[arg(long, default_value = "default")]
    org: String,

    /// Project identifier
    #[arg(long, default_value = "default")]
    project: String,

    /// Repository name, for pipelines stored in git
    #[arg(long)]
    repo: Option<String>,

    /// Branch, for pipelines stored in git
    #[arg(long)]
    branch: Option<String>,
}

impl ScopeArgs {
    fn scope(&self, account_id: &str) -> PipelineScope {
        let mut scope = PipelineScope::new(account_id, &self.org, &self.project, &self.pipeline);
        scope.repo_name = self.repo.clone();
        scope.branch = self.branch.clone();
        scope
    }
}

/// Session subcommands
#[derive(Subcommand)]
pub enum SessionCommands {
    /// Fetch a pipeline, keeping cached unsaved edits unless forced
    Fetch {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Replace cached unsaved edits with the remote document
        #[arg(short, long)]
        force: bool,
    },
    /// Show the cached session without contacting the service
    Status {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Edit the pipeline; the edit is cached until saved or discarded
    Edit {
        #[command(flatten)]
        scope: ScopeArgs,

        /// JSON file holding the full replacement document
        #[arg(long)]
        file: Option<PathBuf>,

        /// New pipeline name
        #[arg(long)]
        name: Option<String>,

        /// Tags to set as key=value pairs
        #[arg(short, long, value_parser = parse_key_val)]
        tag: Vec<(String, String)>,
    },
    /// Move the session to another branch
    SwitchBranch {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Branch to switch to
        #[arg(long = "to")]
        target: String,
    },
    /// Check the pipeline against its template-expanded form
    Reconcile {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Replace the edited pipeline with the canonical one when out of sync
        #[arg(long)]
        apply: bool,
    },
    /// Drop unsaved edits
    Discard {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Publish unsaved edits
    Save {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Commit message for git-backed pipelines
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Remove every cached session
    CacheClear,
}

/// Parse a single key=value pair
fn parse_key_val(s: &str) -> Result<(String, String)> {
    let pos = s
        .find('=')
        .ok_or_else(|| anyhow::anyhow!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Handle session commands
///
/// Routes session subcommands to their respective handlers.
pub async fn handle_session_command(command: SessionCommands, config: &Config) -> Result<()> {
    match command {
        SessionCommands::Fetch { scope, force } => fetch(config, &scope, force).await,
        SessionCommands::Status { scope } => status(config, &scope).await,
        SessionCommands::Edit {
            scope,
            file,
            name,
            tag,
        } => edit(config, &scope, file, name, tag).await,
        SessionCommands::SwitchBranch { scope, target } => {
            switch_branch(config, &scope, target).await
        }
        SessionCommands::Reconcile { scope, apply } => reconcile(config, &scope, apply).await,
        SessionCommands::Discard { scope } => discard(config, &scope).await,
        SessionCommands::Save { scope, message } => save(config, &scope, message).await,
        SessionCommands::CacheClear => cache_clear(config).await,
    }
}

/// Fetch a pipeline into the session cache
async fn fetch(config: &Config, args: &ScopeArgs, force: bool) -> Result<()> {
    let (session, mut actions) = open(config, args)?;

    let params = if force {
        FetchParams::forced()
    } else {
        FetchParams::default()
    };
    let outcome = session.fetch(params).await;
    print_actions(config, &mut actions);
    report_fetch(outcome)?;

    print_state(&session.state());
    Ok(())
}

/// Show the cached session
async fn status(config: &Config, args: &ScopeArgs) -> Result<()> {
    let scope = args.scope(&config.session.account_id);
    let key = derive_key(&scope);

    let Some(record) = config
        .cache()
        .get(&key)
        .await
        .context("Failed to read session cache")?
    else {
        println!("{}", "No cached session.".yellow());
        return Ok(());
    };

    println!("{} {}", "▸".cyan(), record.pipeline.name.bold());
    println!("    Key:       {}", key.to_string().dimmed());
    println!(
        "    Cached at: {}",
        record.cached_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(git) = &record.git_details {
        print_git(git.branch.as_deref(), git.object_id.as_deref());
    }

    let changed = differences(&record.original_pipeline, &record.pipeline);
    if changed.is_empty() {
        println!("    Unsaved:   {}", "no".green());
    } else {
        println!("    Unsaved:   {}", "yes".yellow().bold());
        for path in changed {
            println!("      - {}", path.yellow());
        }
    }

    for error in &record.template_schema_errors {
        println!("    {} {}", "Template:".red(), error);
    }
    Ok(())
}

/// Apply an edit on top of the cached document
async fn edit(
    config: &Config,
    args: &ScopeArgs,
    file: Option<PathBuf>,
    name: Option<String>,
    tags: Vec<(String, String)>,
) -> Result<()> {
    let replacement = match file {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read document file: {}", path.display()))?;
            let document: PipelineDocument = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse document file: {}", path.display()))?;
            Some(document)
        }
        None => None,
    };
    if replacement.is_none() && name.is_none() && tags.is_empty() {
        bail!("Nothing to edit: pass --file, --name or --tag");
    }

    let (session, mut actions) = open(config, args)?;
    report_fetch(session.fetch(FetchParams::default()).await)?;

    let update = DocumentUpdate::produce(move |base| {
        let mut document = replacement.unwrap_or_else(|| base.clone());
        if let Some(name) = name {
            document.name = name;
        }
        for (key, value) in tags {
            document.tags.insert(key, value);
        }
        document
    });
    let unsaved = session.update_document(update).await;
    print_actions(config, &mut actions);

    if unsaved {
        println!("{}", "✓ Edit cached; run `rivet session save` to publish".green().bold());
    } else {
        println!("{}", "Pipeline matches the last fetched version.".yellow());
    }
    print_state(&session.state());
    Ok(())
}

/// Move the session to another branch
async fn switch_branch(config: &Config, args: &ScopeArgs, target: String) -> Result<()> {
    let (session, mut actions) = open(config, args)?;

    let outcome = session
        .switch_branch(target.clone())
        .await
        .context("Failed to switch branch")?;
    print_actions(config, &mut actions);
    report_fetch(outcome)?;

    println!("{}", format!("✓ Switched to branch {}", target).green().bold());
    print_state(&session.state());
    Ok(())
}

/// Check for drift against the canonical pipeline
async fn reconcile(config: &Config, args: &ScopeArgs, apply: bool) -> Result<()> {
    let (session, mut actions) = open(config, args)?;
    report_fetch(session.fetch(FetchParams::default()).await)?;

    let outcome = session.reconcile().await;
    match &outcome {
        ReconcileOutcome::InSync => {
            println!("{}", "✓ Pipeline is in sync with its templates".green().bold());
        }
        ReconcileOutcome::OutOfSync(details) => {
            println!("{}", "Pipeline is out of sync".yellow().bold());
            if let Some(summary) = &details.summary {
                println!("  {}", summary.dimmed());
            }
            for path in &details.paths {
                println!("    - {}", path.yellow());
            }
        }
        ReconcileOutcome::Failed(failure) => {
            print_actions(config, &mut actions);
            bail!("Reconciliation failed: {}", failure);
        }
    }

    if apply && outcome.out_of_sync() {
        if session.refresh_from_canonical().await {
            println!(
                "{}",
                "✓ Canonical pipeline applied; run `rivet session save` to publish"
                    .green()
                    .bold()
            );
        } else {
            println!("{}", "No canonical pipeline was returned.".yellow());
        }
    }

    print_actions(config, &mut actions);
    Ok(())
}

/// Drop unsaved edits
async fn discard(config: &Config, args: &ScopeArgs) -> Result<()> {
    let (session, mut actions) = open(config, args)?;
    session.discard().await;
    print_actions(config, &mut actions);

    println!("{}", "✓ Unsaved changes discarded".green().bold());
    Ok(())
}

/// Publish unsaved edits
async fn save(config: &Config, args: &ScopeArgs, message: Option<String>) -> Result<()> {
    let (session, mut actions) = open(config, args)?;
    report_fetch(session.fetch(FetchParams::default()).await)?;

    if !session.state().is_updated {
        print_actions(config, &mut actions);
        println!("{}", "Nothing to save.".yellow());
        return Ok(());
    }

    let outcome = session
        .save(SaveOptions {
            commit_message: message,
        })
        .await;
    print_actions(config, &mut actions);

    match outcome {
        SaveOutcome::Saved => {
            println!("{}", "✓ Pipeline saved successfully!".green().bold());
            print_state(&session.state());
            Ok(())
        }
        SaveOutcome::Conflict(failure) => {
            println!(
                "{}",
                "The pipeline changed since it was fetched; your edits are still cached.".yellow()
            );
            println!(
                "  Reload with {} or drop them with {}",
                "rivet session fetch --force".cyan(),
                "rivet session discard".cyan()
            );
            bail!("Save conflict: {}", failure.message)
        }
        SaveOutcome::Failed(failure) => bail!("Failed to save pipeline: {}", failure),
    }
}

/// Remove every cached session
async fn cache_clear(config: &Config) -> Result<()> {
    info!("Clearing session cache in {}", config.session.cache_dir.display());
    let removed = config
        .cache()
        .clear()
        .await
        .context("Failed to clear session cache")?;

    println!(
        "{}",
        format!("✓ Removed {} cached session(s)", removed)
            .green()
            .bold()
    );
    Ok(())
}

fn open(config: &Config, args: &ScopeArgs) -> Result<(Session, broadcast::Receiver<Action>)> {
    let session = config.open_session(args.scope(&config.session.account_id))?;
    debug!("Opened session {} for {}", session.id(), session.identity_key());
    let actions = session.actions();
    Ok((session, actions))
}

fn report_fetch(outcome: FetchOutcome) -> Result<()> {
    match outcome {
        FetchOutcome::Fetched => {
            println!("{}", "✓ Pipeline fetched".green().bold());
        }
        FetchOutcome::RestoredFromCache => {
            println!("{}", "✓ Restored unsaved edits from cache".green().bold());
        }
        FetchOutcome::Cancelled => {
            println!("{}", "Fetch cancelled".yellow());
        }
        FetchOutcome::Failed(failure) if failure.is_not_found() => {
            bail!("Pipeline not found: {}", failure.message)
        }
        FetchOutcome::Failed(failure) => bail!("Failed to fetch pipeline: {}", failure),
    }
    Ok(())
}

fn print_actions(config: &Config, actions: &mut broadcast::Receiver<Action>) {
    if !config.verbose {
        return;
    }
    while let Ok(action) = actions.try_recv() {
        println!("  {} {}", "·".dimmed(), action.name().dimmed());
    }
}

/// Print a session summary
fn print_state(state: &SessionState) {
    println!();
    println!("  {} {}", "▸".cyan(), state.pipeline.name.bold());
    println!("    Key:     {}", state.identity_key().to_string().dimmed());
    if let Some(git) = &state.git_details {
        print_git(git.branch.as_deref(), git.object_id.as_deref());
    }

    let unsaved = if state.is_updated {
        "yes".yellow().bold()
    } else {
        "no".green()
    };
    println!("    Unsaved: {}", unsaved);
    if state.is_backend_updated {
        println!(
            "    {}",
            "The pipeline changed remotely since your edits started.".yellow()
        );
    }
    if let Some(error) = &state.template_error {
        println!("    {} {}", "Template:".red(), error);
    }
    if !state.entity_validity_details.valid {
        println!("    {}", "The stored pipeline is invalid.".red());
    }
}

fn print_git(branch: Option<&str>, object_id: Option<&str>) {
    println!(
        "    Branch:  {} {}",
        branch.unwrap_or("-").cyan(),
        object_id
            .map(|id| format!("({})", id))
            .unwrap_or_default()
            .dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("owner=ci").unwrap(),
            ("owner".to_string(), "ci".to_string())
        );
        assert_eq!(
            parse_key_val("expr=a=b").unwrap(),
            ("expr".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("missing").is_err());
    }

    #[test]
    fn test_scope_args_build_scope() {
        let args = ScopeArgs {
            pipeline: "build".to_string(),
            org: "org".to_string(),
            project: "proj".to_string(),
            repo: Some("repoA".to_string()),
            branch: Some("main".to_string()),
        };
        let scope = args.scope("acct");

        assert_eq!(scope.account_id, "acct");
        assert_eq!(scope.pipeline_id, "build");
        assert_eq!(scope.repository_identity(), "repoA");
        assert_eq!(scope.branch_segment(), "main");
    }
}
