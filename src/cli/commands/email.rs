use clap::{Arg, Command};

pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new("mail-from")
            .long("mail-from")
            .help("Sender address for verification and approval emails")
            .env("CHEFSTAR_MAIL_FROM")
            .default_value("no-reply@chefstar.app"),
    )
}
