//! Docwiki administration CLI
//!
//! Applies the schema and manages categories directly against the database, acting as
//! the actor described by `--role` and `--department`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use docwiki::migration::Migrator;
use docwiki::model::{Actor, CategoryId, CategoryNode, DepartmentId, NewCategory, RenameCategory, Role};
use docwiki::store::{PgCategoryStore, PgDocumentStore};
use docwiki::{connect, CategoryService, DeletePolicy, DocwikiConfig, Executor, PgExecutor};
use std::process;

#[derive(Parser)]
#[command(name = "docwiki")]
#[command(about = "Category administration for docwiki")]
#[command(version = "0.1.0")]
struct Cli {
    /// Database connection URL (overrides configuration)
    #[arg(long)]
    database_url: Option<String>,

    /// Role to act as: admin, editor or reader
    #[arg(long, default_value = "admin")]
    role: Role,

    /// Department of the acting editor ("Global" for none)
    #[arg(long)]
    department: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate {
        /// Number of migrations to apply (default: all pending)
        #[arg(long)]
        steps: Option<usize>,
    },

    /// Roll back applied schema migrations, newest first
    Down {
        /// Number of migrations to roll back
        #[arg(long, default_value = "1")]
        steps: usize,
    },

    /// Show migration status (applied vs pending)
    Status,

    /// Print the category tree
    Tree {
        /// Emit JSON instead of an indented listing
        #[arg(long)]
        json: bool,
    },

    /// Print the breadcrumb of a category
    Breadcrumb { id: CategoryId },

    /// Create a category
    Create {
        name: String,
        #[arg(long)]
        parent: Option<CategoryId>,
        /// Department scope; inherits the parent's when omitted
        #[arg(long = "in-department")]
        in_department: Option<String>,
        /// Explicit slug, pinned against renames
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    /// Rename a category
    Rename {
        id: CategoryId,
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Derive the slug from the name again
        #[arg(long)]
        unpin_slug: bool,
    },

    /// Move a category under another one (or to the root without --parent)
    Move {
        id: CategoryId,
        #[arg(long)]
        parent: Option<CategoryId>,
    },

    /// Set the sibling position of a category
    Reorder { id: CategoryId, order: i32 },

    /// Delete a category
    Delete {
        id: CategoryId,
        /// Remove the whole subtree instead of refusing when non-empty
        #[arg(long)]
        cascade: bool,
        /// Category receiving the documents of a cascaded subtree
        #[arg(long, requires = "cascade")]
        reassign_to: Option<CategoryId>,
    },
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = DocwikiConfig::load().context("Failed to load configuration")?;
    let database_url = cli
        .database_url
        .clone()
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| config.database.url.clone());

    let client = connect(&database_url).context("Error connecting to database")?;
    let executor = PgExecutor::new(client);
    if !executor.check_health().context("Database health check failed")? {
        bail!("Database did not answer the health check");
    }

    match cli.command {
        Commands::Migrate { steps } => {
            let applied = Migrator::new().up(&executor, steps)?;
            println!("{} applied {} migration(s)", "✓".green(), applied);
            Ok(())
        }
        Commands::Down { steps } => {
            let rolled_back = Migrator::new().down(&executor, Some(steps))?;
            println!("{} rolled back {} migration(s)", "✓".green(), rolled_back);
            Ok(())
        }
        Commands::Status => handle_status(&executor),
        command => {
            let actor = actor(cli.role, cli.department.as_deref());
            let service = CategoryService::with_config(
                PgCategoryStore::new(&executor),
                PgDocumentStore::new(&executor, &config.documents)?,
                config.categories.clone(),
            );
            handle_category_command(&service, &actor, command)
        }
    }
}

fn actor(role: Role, department: Option<&str>) -> Actor {
    let department = department.and_then(DepartmentId::parse);
    if role == Role::Editor && department.is_none() {
        log::warn!("Editor without a department may only modify Global categories");
    }
    Actor::new(whoami(), role, department)
}

fn whoami() -> String {
    std::env::var("USER").unwrap_or_else(|_| "docwiki-cli".to_string())
}

fn handle_status(executor: &dyn Executor) -> Result<()> {
    let status = Migrator::new().status(executor)?;

    println!("\n{}\n", "Migration Status".bold());
    for record in &status.applied {
        let time_str = record
            .execution_time_ms
            .map_or_else(|| "N/A".to_string(), |ms| format!("{ms}ms"));
        println!(
            "  {} m{}_{} ({}, {})",
            "✓".green(),
            record.version,
            record.name,
            record.applied_at.format("%Y-%m-%d %H:%M:%S"),
            time_str
        );
    }
    for pending in &status.pending {
        println!("  {} m{}_{} (pending)", "…".yellow(), pending.version, pending.name);
    }
    println!(
        "\nSummary: {} applied, {} pending",
        status.applied.len(),
        status.pending.len()
    );
    Ok(())
}

fn handle_category_command<S, D>(
    service: &CategoryService<S, D>,
    actor: &Actor,
    command: Commands,
) -> Result<()>
where
    S: docwiki::CategoryStore,
    D: docwiki::DocumentStore,
{
    match command {
        Commands::Tree { json } => {
            let forest = service.get_tree()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&forest)?);
            } else {
                print_forest(&forest, 0);
            }
        }
        Commands::Breadcrumb { id } => println!("{}", service.get_breadcrumb(id)?),
        Commands::Create {
            name,
            parent,
            in_department,
            slug,
            icon,
            description,
        } => {
            let request = NewCategory {
                name,
                parent_id: parent,
                department_id: in_department.as_deref().and_then(DepartmentId::parse),
                icon,
                description,
                slug,
                order: None,
            };
            let created = service.create_category(actor, request)?;
            println!("{} created {} ({})", "✓".green(), created.id, created.slug);
        }
        Commands::Rename {
            id,
            name,
            description,
            unpin_slug,
        } => {
            let mut request = RenameCategory::new(name);
            if description.is_some() {
                request = request.with_description(description);
            }
            if unpin_slug {
                request = request.unpinned();
            }
            let renamed = service.rename_category(actor, id, request)?;
            println!("{} renamed {} ({})", "✓".green(), renamed.id, renamed.slug);
        }
        Commands::Move { id, parent } => {
            service.move_category(actor, id, parent)?;
            println!("{} moved {}: {}", "✓".green(), id, service.get_breadcrumb(id)?);
        }
        Commands::Reorder { id, order } => {
            service.reorder_category(actor, id, order)?;
            println!("{} {} now at position {}", "✓".green(), id, order);
        }
        Commands::Delete {
            id,
            cascade,
            reassign_to,
        } => {
            let policy = if cascade {
                DeletePolicy::Cascade { reassign_to }
            } else {
                DeletePolicy::RejectIfNonEmpty
            };
            let outcome = service.delete_category(actor, id, policy)?;
            println!(
                "{} removed {} categor{}, reassigned {} document(s)",
                "✓".green(),
                outcome.removed.len(),
                if outcome.removed.len() == 1 { "y" } else { "ies" },
                outcome.documents_reassigned
            );
        }
        Commands::Migrate { .. } | Commands::Down { .. } | Commands::Status => {
            bail!("not a category command")
        }
    }
    Ok(())
}

fn print_forest(forest: &[CategoryNode], depth: usize) {
    for node in forest {
        println!(
            "{}{} {} {}",
            "  ".repeat(depth),
            node.category.name.bold(),
            format!("/{}", node.category.slug).dimmed(),
            format!("({} docs)", node.doc_count).cyan()
        );
        print_forest(&node.children, depth + 1);
    }
}
