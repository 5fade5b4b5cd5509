use clap::{Parser, Subcommand};

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Generate, apply and rotate network adapter MAC addresses", long_about = None)]
pub struct Args {
    /// Log filter used when RUST_LOG is unset (e.g. "debug", "poser=trace")
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Adapter display name; defaults to the configured or best-guess adapter
    #[arg(short, long, global = true)]
    pub adapter: Option<String>,

    /// Print machine-readable JSON instead of console messages
    #[arg(long, global = true)]
    pub json: bool,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List adapters, marking the default pick
    List,
    /// Show the selected adapter's current MAC
    Show,
    /// Print a freshly generated, locally administered MAC
    Random,
    /// Apply a MAC to the selected adapter
    Set {
        /// 12 hex digits, any separators
        mac: String,
    },
    /// Remove the override and return to the hardware MAC
    Restore,
    /// Rotate to a new random MAC every interval until Ctrl-C
    Rotate {
        /// Minutes between rotations
        #[arg(short, long)]
        interval: Option<String>,
        /// Generate and show identifiers without applying them
        #[arg(long)]
        no_apply: bool,
    },
    /// Manage saved profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ProfileCommand {
    List,
    /// Create a profile; without NAME the first free "Profile N" is used
    Create {
        name: Option<String>,
    },
    Rename {
        id: String,
        name: String,
    },
    /// Save a MAC into a profile
    Save {
        id: String,
        mac: String,
    },
    Remove {
        id: String,
    },
    /// Apply a profile's saved MAC to the selected adapter
    Apply {
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["poser", "set", "02:11:22:33:44:55", "--adapter", "Wi-Fi", "-y"]).unwrap();
        assert_eq!(args.adapter.as_deref(), Some("Wi-Fi"));
        assert!(args.yes);
        assert_eq!(
            args.command,
            Command::Set {
                mac: "02:11:22:33:44:55".to_string()
            }
        );
    }

    #[test]
    fn test_rotate_options() {
        let args = Args::try_parse_from(["poser", "rotate", "--interval", "10", "--no-apply"]).unwrap();
        assert_eq!(
            args.command,
            Command::Rotate {
                interval: Some("10".to_string()),
                no_apply: true
            }
        );

        let defaults = Args::try_parse_from(["poser", "rotate"]).unwrap();
        assert_eq!(
            defaults.command,
            Command::Rotate {
                interval: None,
                no_apply: false
            }
        );
    }

    #[test]
    fn test_profile_subcommands() {
        let args = Args::try_parse_from(["poser", "--json", "profile", "create"]).unwrap();
        assert!(args.json);
        assert_eq!(args.command, Command::Profile(ProfileCommand::Create { name: None }));

        let args = Args::try_parse_from(["poser", "profile", "rename", "abc", "Home Wi-Fi"]).unwrap();
        assert_eq!(
            args.command,
            Command::Profile(ProfileCommand::Rename {
                id: "abc".to_string(),
                name: "Home Wi-Fi".to_string()
            })
        );
    }

    #[test]
    fn test_set_requires_mac() {
        assert!(Args::try_parse_from(["poser", "set"]).is_err());
        assert!(Args::try_parse_from(["poser"]).is_err());
    }
}
