use super::*;

#[test]
fn parses_run_command() {
    let cli = Cli::try_parse_from(["stockwatch", "run"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Run { dry_run: false })));
}

#[test]
fn parses_run_dry_run() {
    let cli =
        Cli::try_parse_from(["stockwatch", "run", "--dry-run"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Run { dry_run: true })));
}

#[test]
fn parses_once_command() {
    let cli = Cli::try_parse_from(["stockwatch", "once", "--dry-run"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Once { dry_run: true })));
}

#[test]
fn parses_check_config_command() {
    let cli = Cli::try_parse_from(["stockwatch", "check-config"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::CheckConfig)));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["stockwatch"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn unknown_command_is_rejected() {
    assert!(Cli::try_parse_from(["stockwatch", "collect"]).is_err());
}
