//! CLI definition (clap builder)

use clap::{Arg, ArgAction, Command};

/// Build the `permafrost` command tree.
pub fn build_cli() -> Command {
    let json = Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Emit machine-readable JSON instead of human output");
    let dry_run = Arg::new("dry-run")
        .long("dry-run")
        .action(ArgAction::SetTrue)
        .help("Report what would happen without changing anything");

    Command::new("permafrost")
        .about("Tiered retention and archival engine for agent event stores")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("db")
                .long("db")
                .value_name("PATH")
                .default_value("./permafrost.db")
                .global(true)
                .help("Hot store SQLite database"),
        )
        .arg(
            Arg::new("root")
                .long("root")
                .value_name("PATH")
                .default_value("./archive")
                .global(true)
                .help("Archive root holding the warm and cold tiers"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("Retention policy JSON file (replaces the builtin table)"),
        )
        .subcommand(
            Command::new("archive")
                .about("Move aged hot records into warm archive files")
                .arg(
                    Arg::new("target")
                        .required(true)
                        .value_name("all|class|category")
                        .help("What to archive"),
                )
                .arg(
                    Arg::new("older-than")
                        .long("older-than")
                        .value_name("Nd|Nw|Nm|Ny")
                        .help("Override the policy hot threshold for this run"),
                )
                .arg(
                    Arg::new("batch-size")
                        .long("batch-size")
                        .value_name("N")
                        .default_value("500")
                        .help("Records per write-then-delete batch"),
                )
                .arg(
                    Arg::new("no-compress")
                        .long("no-compress")
                        .action(ArgAction::SetTrue)
                        .help("Write plain .jsonl warm files instead of .jsonl.gz"),
                )
                .arg(dry_run.clone())
                .arg(json.clone()),
        )
        .subcommand(
            Command::new("cleanup")
                .about("Consolidate warm files and purge expired cold bundles")
                .subcommand_required(true)
                .subcommand(
                    Command::new("archives")
                        .about("Run consolidation and/or purge over the archive root")
                        .arg(
                            Arg::new("older-than")
                                .long("older-than")
                                .value_name("Nd|Nw|Nm|Ny")
                                .default_value("30d")
                                .help("Consolidate warm files older than this"),
                        )
                        .arg(
                            Arg::new("consolidate-only")
                                .long("consolidate-only")
                                .action(ArgAction::SetTrue)
                                .conflicts_with("purge-only")
                                .help("Skip the purge pass"),
                        )
                        .arg(
                            Arg::new("purge-only")
                                .long("purge-only")
                                .action(ArgAction::SetTrue)
                                .help("Skip the consolidation pass"),
                        )
                        .arg(dry_run.clone())
                        .arg(json.clone()),
                ),
        )
        .subcommand(
            Command::new("retention")
                .about("Inspect retention configuration and tier usage")
                .subcommand_required(true)
                .subcommand(
                    Command::new("status")
                        .about("Hot/warm/cold counts and sizes per category")
                        .arg(json.clone()),
                )
                .subcommand(
                    Command::new("policy")
                        .about("Configured thresholds per category")
                        .arg(json),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn archive_parses_flags() {
        let matches = build_cli()
            .try_get_matches_from([
                "permafrost", "archive", "events", "--older-than", "30d", "--dry-run", "--json",
            ])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "archive");
        assert_eq!(sub.get_one::<String>("target").unwrap(), "events");
        assert_eq!(sub.get_one::<String>("older-than").unwrap(), "30d");
        assert!(sub.get_flag("dry-run"));
        assert!(sub.get_flag("json"));
    }

    #[test]
    fn cleanup_only_flags_conflict() {
        let result = build_cli().try_get_matches_from([
            "permafrost",
            "cleanup",
            "archives",
            "--consolidate-only",
            "--purge-only",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_apply_anywhere() {
        let matches = build_cli()
            .try_get_matches_from(["permafrost", "retention", "status", "--db", "/tmp/x.db"])
            .unwrap();
        assert_eq!(matches.get_one::<String>("db").unwrap(), "/tmp/x.db");
    }
}
