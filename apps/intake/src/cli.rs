use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "收文目录自动登记")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase verbosity. Can be used multiple times (e.g., -v, -vv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 监控目录，新文件自动登记（默认）
    Watch,
    /// 登记指定文件
    Reconcile {
        /// 要登记的文件
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// 遍历监控目录，补登所有文件
    Scan,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["intake"], 0)]
    #[case(&["intake", "-v"], 1)]
    #[case(&["intake", "-vv"], 2)]
    #[case(&["intake", "--verbose", "--verbose", "--verbose"], 3)]
    fn test_no_subcommand_parses(#[case] args: &[&str], #[case] verbose: u8) {
        let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, verbose);
    }

    #[rstest]
    #[case(&["intake", "watch"])]
    #[case(&["intake", "scan", "-v"])]
    #[case(&["intake", "reconcile", "a.doc", "b.doc", "-v"])]
    fn test_subcommands_parse(#[case] args: &[&str]) {
        let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
        match (args[1], cli.command) {
            ("watch", Some(Commands::Watch)) | ("scan", Some(Commands::Scan)) => {}
            ("reconcile", Some(Commands::Reconcile { files })) => assert_eq!(files.len(), 2),
            (name, other) => panic!("unexpected command for {name}: {other:?}"),
        }
    }

    #[test]
    fn test_reconcile_requires_files() {
        assert!(Cli::try_parse_from(["intake", "reconcile"]).is_err());
    }
}
