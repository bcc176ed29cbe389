#[cfg(test)]
mod tests {
    use crate::cli::{Cli, Command};
    use crate::config::Mode;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_build_defaults() {
        let cli = Cli::try_parse_from(["kiln", "build"]).unwrap();
        match cli.command {
            Command::Build(args) => {
                assert!(!args.static_export);
                assert_eq!(args.mode, None);
            }
            other => panic!("expected build, got {:?}", other),
        }
    }

    #[test]
    fn test_build_static_flag() {
        let cli = Cli::try_parse_from(["kiln", "build", "--static", "--mode", "production"]).unwrap();
        match cli.command {
            Command::Build(args) => {
                assert!(args.static_export);
                assert_eq!(args.mode, Some(Mode::Production));
            }
            other => panic!("expected build, got {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "kiln",
            "start",
            "--build",
            "--verbose",
            "--no-color",
            "--root",
            "app",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(cli.no_color);
        assert_eq!(cli.root, Some(PathBuf::from("app")));
        assert!(matches!(cli.command, Command::Start(ref args) if args.build));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["kiln", "build", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_dev_forces_development_mode() {
        let cli = Cli::try_parse_from(["kiln", "dev", "--port", "4000"]).unwrap();
        let overrides = cli.command.overrides();
        assert_eq!(overrides.mode, Some(Mode::Development));
        assert_eq!(overrides.port, Some(4000));
    }

    #[test]
    fn test_start_passes_mode_through() {
        let cli = Cli::try_parse_from(["kiln", "start"]).unwrap();
        let overrides = cli.command.overrides();
        assert_eq!(overrides.mode, None);
        assert_eq!(overrides.port, None);
    }

    #[test]
    fn test_invalid_mode_rejected() {
        assert!(Cli::try_parse_from(["kiln", "build", "--mode", "staging"]).is_err());
    }
}
