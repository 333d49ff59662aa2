use std::time::Duration;

use clap::{CommandFactory, Parser};
use colored::*;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use dynamo_console::cli::{Args, Command};
use dynamo_console::forms::{
    AddNodeForm, AdminUploadForm, LoginForm, SelectedFile, SignupForm, UploadForm,
};
use dynamo_console::page::Gallery;
use dynamo_console::{Console, ConsoleConfig, SubmitOutcome};

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(args: &Args) -> Result<ConsoleConfig, Box<dyn std::error::Error>> {
    let mut cfg = match &args.config {
        Some(path) => ConsoleConfig::load(path)?,
        None => ConsoleConfig::default(),
    };
    args.apply_to(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

fn print_gallery(gallery: &Gallery) {
    match gallery {
        Gallery::Message(msg) => println!("{}", msg.dimmed()),
        Gallery::Cards(cards) => {
            for card in cards {
                println!("  {} {}", card.name.bright_cyan(), card.src.dimmed());
            }
        }
    }
}

fn print_status(console: &Console) {
    let page = console.page().snapshot();
    println!(
        "{} {}\n{} {}",
        "virtual: ".bright_magenta(),
        page.virtual_nodes,
        "physical:".bright_magenta(),
        page.physical_nodes
    );
}

async fn watch(console: &Console) -> Result<(), Box<dyn std::error::Error>> {
    let sync = console.status();
    info!(endpoint = %sync.endpoint(), "watching ring status");
    sync.start();

    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    let mut last = (String::new(), String::new());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = ticker.tick() => {
                let page = console.page().snapshot();
                let current = (page.virtual_nodes, page.physical_nodes);
                if current != last {
                    print_status(console);
                    last = current;
                }
            }
        }
    }
    sync.stop();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Command::Completions { shell } = &args.command {
        clap_complete::generate(*shell, &mut Args::command(), "dynamo-console", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = load_config(&args)?;
    init_tracing(&cfg.log_level);
    let console = Console::new(cfg)?;

    let redirects = matches!(args.command, Command::Login { .. } | Command::Signup { .. });
    let outcome = match args.command {
        Command::Watch => return watch(&console).await,
        Command::Whoami => {
            match console.session().logged_in_user() {
                Some(user) => println!("{}", user.bright_green()),
                None => println!("{}", "not logged in".dimmed()),
            }
            return Ok(());
        }
        Command::Login { username, password } => {
            console.submit_login(&mut LoginForm::new(username, password)).await
        }
        Command::Signup {
            username,
            password,
            confirm_password,
        } => {
            console
                .submit_signup(&mut SignupForm::new(username, password, confirm_password))
                .await
        }
        Command::Logout => console.logout().await,
        Command::AddNode { node_id, host, port } => {
            console
                .submit_add_node(&mut AddNodeForm::new(node_id, host, port))
                .await
        }
        Command::Upload { file, admin } => {
            let selected = SelectedFile::from_path(&file).await?;
            if admin {
                console
                    .submit_admin_upload(&mut AdminUploadForm::with_file(selected))
                    .await
            } else {
                console
                    .submit_upload(&mut UploadForm::with_file(selected))
                    .await
            }
        }
        Command::Gallery { admin } => {
            let loaded = if admin {
                console.activate_image_tab().await
            } else {
                console.load_user_gallery().await
            };
            print_gallery(&console.page().gallery());
            return loaded.map(|_| ()).map_err(Into::into);
        }
        Command::Completions { .. } => return Ok(()),
    };

    if let Some(nav) = console.page().navigation() {
        println!("{}", nav.to_string().dimmed());
    }
    match outcome {
        SubmitOutcome::Failed(e) => Err(e.into()),
        SubmitOutcome::Succeeded => {
            if redirects {
                console.await_redirect("/").await;
            }
            println!("{} {}", "location:".dimmed(), console.page().location());
            Ok(())
        }
        SubmitOutcome::Ignored => Ok(()),
    }
}
