use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::config::ConsoleConfig;

#[derive(Parser, Debug)]
#[command(name = "dynamo-console")]
#[command(version)]
#[command(about = "Headless console for the Dynamo control panel and image service")]
pub struct Args {
    /// TOML config file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Origin the panel is served from (e.g. https://ring.example:8443)
    #[arg(long)]
    pub origin: Option<String>,

    /// JSON file mirroring the session so invocations share the logged-in user
    #[arg(long)]
    pub session_file: Option<PathBuf>,

    /// Milliseconds between a dashboard disconnect and the next attempt
    #[arg(long)]
    pub reconnect_delay_ms: Option<u64>,

    /// Do not print notifications to stderr
    #[arg(long, short)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Follow the live ring status until interrupted
    Watch,
    Login {
        username: String,
        password: String,
    },
    Signup {
        username: String,
        password: String,
        confirm_password: String,
    },
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Add a node to the ring
    AddNode {
        node_id: String,
        host: String,
        port: String,
    },
    /// Upload an image
    Upload {
        file: PathBuf,
        /// Use the admin upload endpoint
        #[arg(long)]
        admin: bool,
    },
    /// List the image gallery
    Gallery {
        #[arg(long)]
        admin: bool,
    },
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Args {
    /// Layer command-line overrides on top of a file/default config.
    pub fn apply_to(&self, cfg: &mut ConsoleConfig) {
        if let Some(origin) = &self.origin {
            cfg.origin = origin.clone();
        }
        if let Some(path) = &self.session_file {
            cfg.session_file = Some(path.clone());
        }
        if let Some(ms) = self.reconnect_delay_ms {
            cfg.reconnect_delay_ms = ms;
        }
        if self.quiet {
            cfg.echo = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_watch() {
        let args = Args::parse_from(["dc", "watch"]);
        assert_eq!(args.command, Command::Watch);
        assert!(args.origin.is_none());
        assert!(!args.quiet);
    }

    #[test]
    fn test_args_parse_login() {
        let args = Args::parse_from(["dc", "--origin", "https://ring.example", "login", "a", "b"]);
        assert_eq!(
            args.command,
            Command::Login {
                username: "a".into(),
                password: "b".into()
            }
        );
        assert_eq!(args.origin.as_deref(), Some("https://ring.example"));
    }

    #[test]
    fn test_args_parse_add_node_keeps_raw_port() {
        let args = Args::parse_from(["dc", "add-node", "node-1", "10.0.0.1", "80x"]);
        assert_eq!(
            args.command,
            Command::AddNode {
                node_id: "node-1".into(),
                host: "10.0.0.1".into(),
                port: "80x".into()
            }
        );
    }

    #[test]
    fn test_args_parse_upload_admin() {
        let args = Args::parse_from(["dc", "upload", "img.png", "--admin"]);
        assert_eq!(
            args.command,
            Command::Upload {
                file: PathBuf::from("img.png"),
                admin: true
            }
        );
    }

    #[test]
    fn test_args_parse_gallery_default_user() {
        let args = Args::parse_from(["dc", "gallery"]);
        assert_eq!(args.command, Command::Gallery { admin: false });
    }

    #[test]
    fn test_args_parse_completions() {
        let args = Args::parse_from(["dc", "completions", "bash"]);
        assert_eq!(args.command, Command::Completions { shell: Shell::Bash });
    }

    #[test]
    fn test_apply_overrides() {
        let args = Args::parse_from([
            "dc",
            "--origin",
            "http://10.0.0.9:8000",
            "--session-file",
            "/tmp/s.json",
            "--reconnect-delay-ms",
            "250",
            "-q",
            "whoami",
        ]);
        let mut cfg = ConsoleConfig::default();
        args.apply_to(&mut cfg);
        assert_eq!(cfg.origin, "http://10.0.0.9:8000");
        assert_eq!(cfg.session_file, Some(PathBuf::from("/tmp/s.json")));
        assert_eq!(cfg.reconnect_delay_ms, 250);
        assert!(!cfg.echo);
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let args = Args::parse_from(["dc", "logout"]);
        let mut cfg = ConsoleConfig::default();
        args.apply_to(&mut cfg);
        assert_eq!(cfg, ConsoleConfig::default());
    }
}
