use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use webbasics::checklist::storage_key;
use webbasics::config::{SiteConfig, StorageBackend, load_or_default};
use webbasics::dom::{HeadlessDom, Surface};
use webbasics::harness::{HarnessOptions, run_harness};
use webbasics::model::ChecklistState;
use webbasics::page::{PageSession, Step};
use webbasics::site::{discover_pages, page_progress, read_page};
use webbasics::todo::TodoBoard;

#[derive(Parser, Debug)]
#[command(name = "webbasics", about = "Headless driver for the web basics lesson pages")]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured storage file.
    #[arg(long)]
    store: Option<PathBuf>,

    #[arg(long)]
    site_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Pages,
    Check {
        #[arg(long)]
        page: String,
        #[arg(long)]
        item: String,
    },
    Uncheck {
        #[arg(long)]
        page: String,
        #[arg(long)]
        item: String,
    },
    Progress {
        #[arg(long)]
        page: String,
    },
    Reset {
        #[arg(long)]
        page: String,
    },
    Todo {
        #[command(subcommand)]
        action: TodoAction,
    },
    Simulate {
        file: PathBuf,
        steps: Vec<String>,
    },
    Harness,
}

#[derive(Subcommand, Debug)]
enum TodoAction {
    Add { task: String },
    Remove { index: usize },
    List,
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let mut config = load_or_default(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        config.storage.backend = StorageBackend::File;
        config.storage.path = store;
    }
    if let Some(site_dir) = cli.site_dir {
        config.site.root = site_dir;
    }

    match cli.command {
        Commands::Pages => {
            let store = config.open_store();
            for page in discover_pages(&config.site.root)? {
                let progress = page_progress(&page, &store);
                println!(
                    "{}\t{}/{}\t{}",
                    progress.page, progress.completed, progress.toggles, progress.path
                );
            }
        }
        Commands::Check { page, item } => set_item(&config, &page, &item, true)?,
        Commands::Uncheck { page, item } => set_item(&config, &page, &item, false)?,
        Commands::Progress { page } => {
            let store = config.open_store();
            let state: ChecklistState = store.load(&storage_key(&page), ChecklistState::default());
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Commands::Reset { page } => {
            let mut session = open_page(&config, &page)?;
            let resets = session.dom().query_attr("data-reset", None);
            let Some(&reset) = resets.first() else {
                bail!("page {page} has no reset button");
            };
            session.click(reset);
            info!(page = %page, "checklist reset");
        }
        Commands::Todo { action } => {
            let mut store = config.open_store();
            let mut board = TodoBoard::detached(&store);
            match action {
                TodoAction::Add { task } => {
                    if !board.add(&task, &mut store) {
                        bail!("task must not be blank");
                    }
                }
                TodoAction::Remove { index } => {
                    let removed = board
                        .remove(index, &mut store)
                        .with_context(|| format!("no todo at index {index}"))?;
                    info!(task = %removed, "todo removed");
                }
                TodoAction::List => {}
            }
            for (index, task) in board.tasks().iter().enumerate() {
                println!("{index}\t{task}");
            }
        }
        Commands::Simulate { file, steps } => {
            let page = read_page(&file)?;
            let mut session = PageSession::open(page.dom, config.open_store(), &config);
            for raw in &steps {
                let step: Step = raw.parse()?;
                let handled = session
                    .apply_step(&step)
                    .with_context(|| format!("step {raw} failed"))?;
                info!(step = %raw, handled, "step applied");
            }
            println!("{}", serde_json::to_string_pretty(&session.report())?);
        }
        Commands::Harness => {
            let report = run_harness(&HarnessOptions {
                site_dir: config.site.root.clone(),
                store_path: config.storage.path.with_file_name("harness-storage.json"),
            })?;

            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.all_passed() {
                bail!("{} harness checks failed", report.failed);
            }
        }
    }

    Ok(())
}

fn open_page(config: &SiteConfig, page: &str) -> Result<PageSession<HeadlessDom>> {
    let root = config.site.root.display();
    let loaded = discover_pages(&config.site.root)?
        .into_iter()
        .find(|candidate| candidate.name == page)
        .with_context(|| format!("no page named {page} under {root}"))?;
    Ok(PageSession::open(loaded.dom, config.open_store(), config))
}

fn set_item(config: &SiteConfig, page: &str, item: &str, done: bool) -> Result<()> {
    let mut session = open_page(config, page)?;
    let Some(toggle) = session.dom().first_attr_value("data-progress", item, None) else {
        bail!("page {page} has no checklist item {item}");
    };
    session.toggle(toggle, done);

    let completed = session
        .checklist()
        .map(|checklist| checklist.state().completed())
        .unwrap_or_default();
    info!(page, item, done, completed, "checklist updated");
    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}
