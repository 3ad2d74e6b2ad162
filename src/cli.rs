//! Command-line interface definitions for DOI Harvest.
//!
//! Global options come first, then one subcommand per pipeline stage. Most
//! options can also be provided via environment variables.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the DOI Harvest application.
///
/// # Examples
///
/// ```sh
/// # Collect DOI links for every configured subject and keyword
/// doi_harvest --config harvest.yaml links --output-dir ./links
///
/// # Turn a subject's links into a resumable input list
/// doi_harvest seed --from ./links/links-accounting/all_accounting_links.json --list urls.txt
///
/// # Visit every unprocessed article in the list
/// doi_harvest articles --list urls.txt --output articles.csv
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML configuration file
    #[arg(short, long, global = true, env = "DOI_HARVEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Results per search page (overrides `page_size` from the config)
    #[arg(long, global = true)]
    pub page_size: Option<u32>,

    /// Proxy URL for every request (overrides `proxy.url` from the config)
    #[arg(long, global = true, env = "DOI_HARVEST_PROXY")]
    pub proxy: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect result links for every (subject, keyword) pair
    Links {
        /// Directory receiving `links-<subject>/` folders
        #[arg(short, long)]
        output_dir: PathBuf,
    },

    /// Append links from collector output to an input list
    Seed {
        /// Pair or master JSON file(s) written by `links`
        #[arg(short, long = "from", required = true, num_args = 1..)]
        from: Vec<PathBuf>,

        /// Input list to create or extend
        #[arg(short, long)]
        list: PathBuf,
    },

    /// Extract bibliographic rows for every unprocessed list entry
    Articles {
        /// Input list (`label;url[;1]` per line)
        #[arg(short, long)]
        list: PathBuf,

        /// Semicolon-delimited output file
        #[arg(short, long)]
        output: PathBuf,

        /// Do not visit author profile pages for emails
        #[arg(long)]
        no_profiles: bool,
    },

    /// Extract title, authors and abstract for every unprocessed list entry
    Abstracts {
        /// Input list (`label;url[;1]` per line)
        #[arg(short, long)]
        list: PathBuf,

        /// Directory receiving `merged.csv` and `articles/`
        #[arg(short, long)]
        output_dir: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_links() {
        let cli = Cli::parse_from([
            "doi_harvest",
            "--config",
            "harvest.yaml",
            "links",
            "--output-dir",
            "./links",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("harvest.yaml")));
        match cli.command {
            Command::Links { output_dir } => assert_eq!(output_dir, PathBuf::from("./links")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_articles_short_flags() {
        let cli = Cli::parse_from([
            "doi_harvest",
            "articles",
            "-l",
            "/tmp/urls.txt",
            "-o",
            "/tmp/out.csv",
            "--no-profiles",
            "--page-size",
            "50",
        ]);

        assert_eq!(cli.page_size, Some(50));
        match cli.command {
            Command::Articles {
                list,
                output,
                no_profiles,
            } => {
                assert_eq!(list, PathBuf::from("/tmp/urls.txt"));
                assert_eq!(output, PathBuf::from("/tmp/out.csv"));
                assert!(no_profiles);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_seed_accepts_several_sources() {
        let cli = Cli::parse_from([
            "doi_harvest",
            "seed",
            "--from",
            "a.json",
            "b.json",
            "--list",
            "urls.txt",
        ]);

        match cli.command {
            Command::Seed { from, list } => {
                assert_eq!(from.len(), 2);
                assert_eq!(list, PathBuf::from("urls.txt"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["doi_harvest"]).is_err());
    }
}
