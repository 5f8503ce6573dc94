use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// xo-server 主命令行参数
#[derive(Parser, Debug)]
#[clap(
    name = "xo-server",
    version,
    about = "Xen Orchestra server",
    long_about = "Runs the Xen Orchestra server and inspects its services and database."
)]
pub struct XoServerArgs {
    /// Configuration file (defaults to $XO_SERVER_CONFIG, then the user config dir)
    #[clap(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity
    #[clap(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: XoServerCommand,
}

/// xo-server 支持的子命令
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum XoServerCommand {
    /// Build every service once and report problems
    Check,

    /// List known users
    Users(UsersArgs),

    /// Run until interrupted, then save the database
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct UsersArgs {
    /// Print users as JSON
    #[clap(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ServeArgs {
    /// Seconds between purges of expired tokens
    #[clap(long, value_name = "SECONDS", default_value_t = 60)]
    pub purge_interval: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let args =
            XoServerArgs::try_parse_from(["xo-server", "-vv", "--config", "/etc/xo.toml", "serve"])
                .unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.config, Some(PathBuf::from("/etc/xo.toml")));
        assert_eq!(
            args.command,
            XoServerCommand::Serve(ServeArgs { purge_interval: 60 })
        );
    }

    #[test]
    fn test_parse_users_json() {
        let args = XoServerArgs::try_parse_from(["xo-server", "users", "--json"]).unwrap();
        assert_eq!(args.command, XoServerCommand::Users(UsersArgs { json: true }));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(XoServerArgs::try_parse_from(["xo-server"]).is_err());
    }
}
