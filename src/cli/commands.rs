//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - interview: gather API requirements from the operator
//! - refine / validate: drive or check an OpenAPI definition
//! - generate / build: produce server stubs, SDKs and docs
//! - serve / ingest: run and fill the research service

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Specloop - refine LLM-written OpenAPI definitions until they validate
#[derive(Parser, Debug)]
#[command(name = "specloop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interview the operator and save the API requirements
    Interview {
        /// Write the requirements here instead of the store
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Refine an OpenAPI definition from requirements until it validates
    Refine {
        /// Requirements Markdown file
        #[arg(short, long)]
        requirements: PathBuf,

        /// Existing definition to start from
        #[arg(short, long)]
        document: Option<PathBuf>,

        /// Override refine.max_iterations
        #[arg(short, long)]
        max_iterations: Option<u32>,

        /// Save a valid definition to the store
        #[arg(short, long)]
        save: bool,
    },

    /// Run the configured validator once
    Validate {
        /// Definition file to check
        file: PathBuf,
    },

    /// Generate server stub, client SDKs and docs from a definition
    Generate {
        /// Definition file
        #[arg(short, long)]
        spec: PathBuf,
    },

    /// Refine, save and generate in one run
    Build {
        /// Requirements Markdown file
        #[arg(short, long)]
        requirements: PathBuf,
    },

    /// Run the research HTTP service
    Serve {
        /// Override research.host
        #[arg(long)]
        host: Option<String>,

        /// Override research.port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Load arXiv JSON-lines metadata into the vector store
    Ingest {
        /// JSON-lines metadata file
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["specloop"]).is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from(["specloop", "validate", "api.yaml", "-v", "-c", "/etc/specloop.yml"]).unwrap();
        assert!(cli.is_verbose());
        assert_eq!(cli.config, Some(PathBuf::from("/etc/specloop.yml")));
    }

    #[test]
    fn test_interview_command() {
        let cli = Cli::try_parse_from(["specloop", "interview"]).unwrap();
        match cli.command {
            Commands::Interview { output } => assert!(output.is_none()),
            _ => panic!("Expected interview command"),
        }

        let cli = Cli::try_parse_from(["specloop", "interview", "-o", "reqs.md"]).unwrap();
        match cli.command {
            Commands::Interview { output } => assert_eq!(output, Some(PathBuf::from("reqs.md"))),
            _ => panic!("Expected interview command"),
        }
    }

    #[test]
    fn test_refine_command() {
        let cli = Cli::try_parse_from([
            "specloop",
            "refine",
            "--requirements",
            "reqs.md",
            "--document",
            "draft.yaml",
            "--max-iterations",
            "3",
            "--save",
        ])
        .unwrap();
        match cli.command {
            Commands::Refine {
                requirements,
                document,
                max_iterations,
                save,
            } => {
                assert_eq!(requirements, PathBuf::from("reqs.md"));
                assert_eq!(document, Some(PathBuf::from("draft.yaml")));
                assert_eq!(max_iterations, Some(3));
                assert!(save);
            }
            _ => panic!("Expected refine command"),
        }
    }

    #[test]
    fn test_refine_requires_requirements() {
        assert!(Cli::try_parse_from(["specloop", "refine"]).is_err());
    }

    #[test]
    fn test_refine_defaults() {
        let cli = Cli::try_parse_from(["specloop", "refine", "-r", "reqs.md"]).unwrap();
        match cli.command {
            Commands::Refine {
                document,
                max_iterations,
                save,
                ..
            } => {
                assert!(document.is_none());
                assert!(max_iterations.is_none());
                assert!(!save);
            }
            _ => panic!("Expected refine command"),
        }
    }

    #[test]
    fn test_generate_and_build() {
        let cli = Cli::try_parse_from(["specloop", "generate", "--spec", "swagger.yaml"]).unwrap();
        assert!(matches!(cli.command, Commands::Generate { spec } if spec == PathBuf::from("swagger.yaml")));

        let cli = Cli::try_parse_from(["specloop", "build", "-r", "reqs.md"]).unwrap();
        assert!(matches!(cli.command, Commands::Build { requirements } if requirements == PathBuf::from("reqs.md")));
    }

    #[test]
    fn test_serve_command() {
        let cli = Cli::try_parse_from(["specloop", "serve", "--host", "0.0.0.0", "-p", "9000"]).unwrap();
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(9000));
            }
            _ => panic!("Expected serve command"),
        }
    }

    #[test]
    fn test_serve_rejects_bad_port() {
        assert!(Cli::try_parse_from(["specloop", "serve", "--port", "70000"]).is_err());
    }

    #[test]
    fn test_ingest_command() {
        let cli = Cli::try_parse_from(["specloop", "ingest", "arxiv.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Ingest { file } if file == PathBuf::from("arxiv.json")));
    }

    #[test]
    fn test_help_works() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_flag() {
        let result = Cli::try_parse_from(["specloop", "--version"]);
        assert!(result.is_err());
    }
}
