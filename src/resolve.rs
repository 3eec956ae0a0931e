use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use console::style;
use log::{debug, warn};

use crate::catalog::{AltEntry, CatalogStore, DuplicateCatalog};
use crate::error::Result;

/// Synchronous operator I/O port: show a prompt, get one trimmed line back.
///
/// The interactive implementation blocks on stdin; tests substitute a
/// scripted response source.
pub trait Prompter {
    fn ask(&mut self, prompt: &str) -> Result<String>;
}

/// External display capability: render each path's content for human
/// inspection. The caller only waits for completion.
pub trait Viewer {
    fn present(&self, paths: &[PathBuf]) -> Result<()>;
}

/// Line-oriented prompter over stdin/stdout.
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&mut self, prompt: &str) -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

/// Fallback display: list the paths on the terminal. Stands in where no
/// richer viewer (image preview etc.) is wired up.
pub struct ListingViewer;

impl Viewer for ListingViewer {
    fn present(&self, paths: &[PathBuf]) -> Result<()> {
        println!();
        for path in paths {
            println!("  {} {}", style("->").cyan(), path.display());
        }
        Ok(())
    }
}

/// How a single duplicate group came out of the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Operator skipped the group; nothing changed.
    Skipped,
    /// Operator kept one member; every other member was deleted.
    Resolved {
        keeper: PathBuf,
        removed: Vec<PathBuf>,
    },
    /// Invalid input, refused confirmation, or a failed deletion; the group
    /// stays in the catalog. Nothing was deleted unless a removal itself
    /// failed partway.
    Aborted,
    /// Operator quit; the whole resolution pass ends here.
    Quit,
}

/// Walk the operator through every group in catalog iteration order.
///
/// Each resolved group is pruned from the catalog and persisted immediately,
/// so a quit never loses a completed resolution. Returns the canonical keys
/// that were resolved. Groups are independent: one group's outcome never
/// affects another's.
pub fn resolve_catalog<P, V>(
    catalog: &mut DuplicateCatalog,
    store: &CatalogStore,
    prompter: &mut P,
    viewer: &V,
) -> Result<Vec<String>>
where
    P: Prompter,
    V: Viewer,
{
    let mut resolved = Vec::new();

    for canonical in catalog.canonicals() {
        let Some(alternates) = catalog.get(&canonical).cloned() else {
            continue;
        };

        match resolve_group(&canonical, &alternates, prompter, viewer)? {
            Outcome::Resolved { keeper, removed } => {
                debug!(
                    "group {} resolved: kept {}, removed {} files",
                    canonical,
                    keeper.display(),
                    removed.len()
                );
                store.prune(catalog, std::slice::from_ref(&canonical))?;
                resolved.push(canonical);
            }
            Outcome::Skipped | Outcome::Aborted => {}
            Outcome::Quit => break,
        }
    }

    Ok(resolved)
}

/// Drive one duplicate group through the prompt state machine:
/// presented, then skip, view, delete, or quit.
pub fn resolve_group<P, V>(
    canonical: &str,
    alternates: &[AltEntry],
    prompter: &mut P,
    viewer: &V,
) -> Result<Outcome>
where
    P: Prompter,
    V: Viewer,
{
    let mut members: Vec<PathBuf> = Vec::with_capacity(alternates.len() + 1);
    members.push(PathBuf::from(canonical));
    members.extend(alternates.iter().map(|alt| PathBuf::from(&alt.path)));

    let action = prompter.ask(&format!(
        "\nWhat would you like to do with dups of: {}?\n  (s)how, (d)elete, (q)uit, ENTER to skip: ",
        style(canonical).bold()
    ))?;

    match action.to_lowercase().as_str() {
        "s" => {
            viewer.present(&members)?;
            let answer = prompter.ask("  Delete dups for this set (y/n)?: ")?;
            if answer.eq_ignore_ascii_case("y") {
                delete_all_but_keeper(&members, prompter)
            } else {
                Ok(Outcome::Skipped)
            }
        }
        "d" => delete_all_but_keeper(&members, prompter),
        "q" => Ok(Outcome::Quit),
        _ => Ok(Outcome::Skipped),
    }
}

/// Ask which member to keep, confirm, then delete the rest.
///
/// Selection gets exactly one re-prompt on invalid input; a second invalid
/// response aborts the group with no filesystem change. Deletion only
/// proceeds after the operator types the literal `yes`.
fn delete_all_but_keeper<P: Prompter>(members: &[PathBuf], prompter: &mut P) -> Result<Outcome> {
    println!("\n  The list of duplicates is...\n");
    for (i, member) in members.iter().enumerate() {
        println!("  {}: {}", i, member.display());
    }

    let Some(keep_index) = select_index(members.len(), prompter)? else {
        println!("  {}", style("Invalid selection, leaving this set alone").yellow());
        return Ok(Outcome::Aborted);
    };
    let keeper = &members[keep_index];

    let really = prompter.ask(&format!(
        "\nReally delete duplicates of {}?  Enter \"yes\": ",
        keeper.display()
    ))?;
    if really != "yes" {
        println!(
            "  {}",
            style("Skipping... MUST enter \"yes\", not just \"y\"").yellow()
        );
        return Ok(Outcome::Aborted);
    }

    let mut removed = Vec::new();
    let mut failed = false;
    for (i, member) in members.iter().enumerate() {
        if i == keep_index {
            continue;
        }
        match fs::remove_file(member) {
            Ok(()) => {
                println!("  deleted {}", member.display());
                removed.push(member.clone());
            }
            Err(err) => {
                warn!("could not delete {}: {err}", member.display());
                eprintln!(
                    "  {} could not delete {}: {err}",
                    style("!").red(),
                    member.display()
                );
                failed = true;
            }
        }
    }

    if failed {
        // Keep the catalog entry so a later pass re-presents whatever is
        // left of the group.
        return Ok(Outcome::Aborted);
    }

    Ok(Outcome::Resolved {
        keeper: keeper.clone(),
        removed,
    })
}

/// Bounded retry: two attempts to pick a valid member index, then give up.
fn select_index<P: Prompter>(len: usize, prompter: &mut P) -> Result<Option<usize>> {
    for attempt in 0..2 {
        if attempt > 0 {
            println!(
                "  {}",
                style(format!("Enter a number between 0 and {}", len - 1)).yellow()
            );
        }
        let answer = prompter.ask("\nWhich one to *KEEP* (enter number): ")?;
        if let Ok(index) = answer.parse::<usize>() {
            if index < len {
                return Ok(Some(index));
            }
        }
    }
    Ok(None)
}
