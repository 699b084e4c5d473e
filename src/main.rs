use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::{style, Style};
use dialoguer::{Confirm, Input, Password};
use tracing_subscriber::EnvFilter;

use clouddocs::docs::describe::{download_name, FileRow, TagChip};
use clouddocs::docs::modal::ModalCommit;
use clouddocs::docs::tags::{color_of, parse_input};
use clouddocs::docs::toast::ToastKind;
use clouddocs::docs::upload::fetch_suggestions;
use clouddocs::docs::{ChatMessage, Dashboard, HttpDirectory, StagedFile};
use clouddocs::{Config, FileTokenStore, SessionStore};

/// clouddocs - manage your CloudDocs files from the terminal
#[derive(Parser, Debug)]
#[command(name = "clouddocs", version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/clouddocs/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Backend base URL, overrides config and CLOUDDOCS_API_BASE
    #[arg(long, global = true, value_name = "URL")]
    api_base: Option<String>,

    /// More log output on stderr (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store the token issued by the identity provider
    Login {
        /// Token value; prompted for (or read from stdin) when omitted
        #[arg(long)]
        token: Option<String>,
    },
    /// Forget the stored token
    Logout,
    /// Show who the stored token belongs to
    Whoami,
    /// List files
    Ls {
        /// Case-insensitive filename substring
        #[arg(short, long)]
        search: Option<String>,
        /// Only files carrying this tag
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// List every tag in use
    Tags,
    /// Upload a file, with AI-suggested name and tags
    Upload {
        path: PathBuf,
        /// Final filename (overrides the suggestion)
        #[arg(long)]
        name: Option<String>,
        /// Extra tag, repeatable
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Skip the name/tag suggestions
        #[arg(long)]
        no_suggest: bool,
        /// Review filename and tags before uploading
        #[arg(short, long)]
        interactive: bool,
    },
    /// Delete files
    Rm {
        #[arg(required = true, value_name = "FILE_ID")]
        file_ids: Vec<String>,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Rename a file
    Rename { file_id: String, name: String },
    /// Edit a file's tags
    Tag {
        file_id: String,
        #[arg(long, value_name = "TAG")]
        add: Vec<String>,
        #[arg(long, value_name = "TAG")]
        remove: Vec<String>,
        /// Remove every tag first
        #[arg(long)]
        clear: bool,
    },
    /// Share a file with someone
    Share { file_id: String, recipient: String },
    /// Print a temporary download link
    Link { file_id: String },
    /// Download a file
    Download {
        file_id: String,
        /// Output path (default: the file's name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the name and tags the assistant would suggest
    Suggest { filename: String },
    /// Ask the assistant a question
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "clouddocs=warn",
        1 => "clouddocs=info",
        _ => "clouddocs=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(base) = cli.api_base.clone() {
        config = config.with_api_base(base);
    }
    let token_path = config.token_path()?;
    let session = Arc::new(
        SessionStore::restore(FileTokenStore::new(&token_path))
            .with_context(|| format!("Failed to read token from {}", token_path.display()))?,
    );

    match cli.command {
        Commands::Login { token } => login(&session, token),
        Commands::Logout => {
            session.logout()?;
            println!("Logged out.");
            Ok(())
        }
        Commands::Whoami => whoami(&session),
        Commands::Ls { search, tag } => {
            let dash = mount(&config, &session).await?;
            dash.set_search(search.as_deref().unwrap_or_default());
            dash.set_tag_filter(tag.as_deref());
            print_rows(&dash.rows());
            Ok(())
        }
        Commands::Tags => {
            let dash = mount(&config, &session).await?;
            let chips: Vec<TagChip> = dash
                .taxonomy()
                .into_iter()
                .map(|t| TagChip { color: color_of(&t), label: t })
                .collect();
            if chips.is_empty() {
                println!("No tags yet.");
            } else {
                println!("{}", render_chips(&chips));
            }
            Ok(())
        }
        Commands::Upload {
            path,
            name,
            tags,
            no_suggest,
            interactive,
        } => upload(&config, &session, &path, name, tags, no_suggest, interactive).await,
        Commands::Rm { file_ids, yes } => remove(&config, &session, &file_ids, yes).await,
        Commands::Rename { file_id, name } => {
            let dash = mount(&config, &session).await?;
            dash.open_rename(&file_id)?;
            dash.edit_modal(|m| m.set_rename_input(name))?;
            if dash.modal().commit()? == ModalCommit::Unchanged {
                println!("Filename is unchanged.");
            }
            dash.save_modal().await?;
            print_toast(&dash);
            Ok(())
        }
        Commands::Tag {
            file_id,
            add,
            remove,
            clear,
        } => {
            let dash = mount(&config, &session).await?;
            dash.open_tag_editor(&file_id)?;
            dash.edit_modal(|m| {
                if clear {
                    m.set_tags(Vec::<String>::new())?;
                }
                for tag in add.iter().flat_map(|t| parse_input(t)) {
                    m.add_tag(&tag)?;
                }
                for tag in &remove {
                    m.remove_tag(tag)?;
                }
                Ok(())
            })?;
            if dash.modal().commit()? == ModalCommit::Unchanged {
                println!("Tags are unchanged.");
            }
            dash.save_modal().await?;
            print_toast(&dash);
            Ok(())
        }
        Commands::Share { file_id, recipient } => {
            let dash = mount(&config, &session).await?;
            let message = dash.share(&file_id, &recipient).await?;
            println!("{message}");
            Ok(())
        }
        Commands::Link { file_id } => {
            let dash = mount(&config, &session).await?;
            let url = dash.copy_link(&file_id).await?;
            println!("{url}");
            Ok(())
        }
        Commands::Download { file_id, output } => {
            let dash = mount(&config, &session).await?;
            let output = match output {
                Some(path) => path,
                None => {
                    let listed = dash.all_files().into_iter().find(|f| f.file_id == file_id);
                    download_name(listed.as_ref().map(|f| f.filename.as_str()), &file_id)
                }
            };
            let bytes = dash.download(&file_id).await?;
            tokio::fs::write(&output, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Saved {} ({} bytes)", output.display(), bytes.len());
            Ok(())
        }
        Commands::Suggest { filename } => {
            let directory = HttpDirectory::from_config(&config, session.clone())?;
            let suggestions = fetch_suggestions(&directory, &filename).await;
            println!("name: {}", suggestions.filename);
            println!("tags: {}", suggestions.tags.join(", "));
            Ok(())
        }
        Commands::Ask { prompt } => {
            let directory = HttpDirectory::from_config(&config, session.clone())?;
            let messages = [ChatMessage::user(prompt.join(" "))];
            let reply = directory
                .ask(&messages, &config.assistant_model, config.assistant_max_tokens)
                .await?;
            println!("{reply}");
            Ok(())
        }
    }
}

fn login(session: &SessionStore, token: Option<String>) -> Result<()> {
    let token = match token {
        Some(token) => token,
        None if std::io::stdin().is_terminal() => Password::new().with_prompt("Token").interact()?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read token from stdin")?;
            raw
        }
    };
    let claims = session.login(&token)?;
    println!("Welcome, {}", claims.display_name());
    Ok(())
}

fn whoami(session: &SessionStore) -> Result<()> {
    let Some(claims) = session.claims() else {
        bail!("Not logged in");
    };
    println!("{}", claims.display_name());
    if let Some(exp) = claims.exp.and_then(|e| chrono::DateTime::from_timestamp(e, 0)) {
        let exp = exp.with_timezone(&chrono::Local);
        let note = if exp < chrono::Local::now() { " (expired)" } else { "" };
        println!("token expires {}{note}", exp.format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

async fn mount(config: &Config, session: &Arc<SessionStore>) -> Result<Dashboard> {
    let directory = HttpDirectory::from_config(config, session.clone())?;
    let dash = Dashboard::new(session.clone(), Arc::new(directory), config.toast_ttl())?;
    dash.refresh().await.context("Failed to fetch files")?;
    Ok(dash)
}

async fn upload(
    config: &Config,
    session: &Arc<SessionStore>,
    path: &Path,
    name: Option<String>,
    tags: Vec<String>,
    no_suggest: bool,
    interactive: bool,
) -> Result<()> {
    let original = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?
        .to_string();
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let dash = mount(config, session).await?;
    let staged = StagedFile::new(original, bytes);
    let snapshot = if no_suggest {
        dash.stage_upload_plain(staged)?
    } else {
        let snapshot = dash.stage_upload(staged).await?;
        println!("Suggested name: {}", snapshot.filename);
        if !snapshot.tags.is_empty() {
            println!("Suggested tags: {}", snapshot.tags.join(", "));
        }
        snapshot
    };

    if let Some(name) = name {
        dash.set_upload_filename(&name)?;
    }
    for tag in tags.iter().flat_map(|t| parse_input(t)) {
        dash.add_upload_tag(&tag)?;
    }
    if interactive {
        let current = dash.upload_state();
        let filename: String = Input::new()
            .with_prompt("Filename")
            .default(current.filename.clone())
            .interact_text()?;
        let tag_line: String = Input::new()
            .with_prompt("Tags (comma separated)")
            .default(current.tags.join(", "))
            .allow_empty(true)
            .interact_text()?;
        dash.set_upload_filename(&filename)?;
        dash.set_upload_tags(parse_input(&tag_line))?;
    }

    let final_state = dash.upload_state();
    tracing::debug!(?snapshot, ?final_state, "submitting upload");
    dash.submit_upload().await?;
    print_toast(&dash);
    Ok(())
}

async fn remove(config: &Config, session: &Arc<SessionStore>, file_ids: &[String], yes: bool) -> Result<()> {
    let dash = mount(config, session).await?;
    for id in file_ids {
        if !dash.selection().iter().any(|f| &f.file_id == id) {
            dash.toggle_selection(id)?;
        }
    }
    let report = dash
        .delete_selected(|files| {
            if yes {
                return true;
            }
            let names: Vec<&str> = files.iter().map(|f| f.filename.as_str()).collect();
            Confirm::new()
                .with_prompt(format!("Delete {}?", names.join(", ")))
                .default(false)
                .interact()
                .unwrap_or(false)
        })
        .await?;
    print_toast(&dash);
    for (file, err) in &report.failed {
        eprintln!("  {} ({}): {err}", file.filename, file.file_id);
    }
    if !report.all_succeeded() {
        bail!("{}", report.summary());
    }
    Ok(())
}

fn render_chips(chips: &[TagChip]) -> String {
    chips
        .iter()
        .map(|c| Style::new().color256(c.color.ansi256).apply_to(format!("#{}", c.label)).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_rows(rows: &[FileRow]) {
    if rows.is_empty() {
        println!("No files found");
        return;
    }
    println!(
        "{}",
        style(format!("   {:<40} {:<16} {:>12}  {:<36}  {}", "Filename", "Uploaded", "Size", "File ID", "Tags")).bold()
    );
    for row in rows {
        println!(
            "{} {:<40} {:<16} {:>12}  {:<36}  {}",
            row.icon,
            row.filename,
            row.created,
            row.size,
            row.file_id,
            render_chips(&row.tags)
        );
    }
}

fn print_toast(dash: &Dashboard) {
    if let Some(toast) = dash.toast() {
        let line = match toast.kind {
            ToastKind::Success => style(toast.message).green(),
            ToastKind::Error => style(toast.message).red(),
            ToastKind::Info => style(toast.message).cyan(),
        };
        eprintln!("{line}");
    }
}
