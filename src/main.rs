use std::path::PathBuf;
use std::process;

use clap::Parser;
use env_logger::Env;

#[derive(Parser)]
#[command(name = nsbox::APP_NAME)]
#[command(version = nsbox::VERSION)]
#[command(about = nsbox::APP_DESCRIPTION, long_about = None)]
#[command(after_help = "Example:\n  nsbox -u 0:1000 -g 0:1000 --chroot /srv/rootfs -- /bin/sh -i")]
struct Cli {
    /// Map user ID INSIDE the sandbox to OUTSIDE on the host (repeatable)
    #[arg(short = 'u', long = "user", value_name = "INSIDE:OUTSIDE")]
    user: Vec<String>,

    /// Map group ID INSIDE the sandbox to OUTSIDE on the host (repeatable)
    #[arg(short = 'g', long = "group", value_name = "INSIDE:OUTSIDE")]
    group: Vec<String>,

    /// Directory tree to expose as the sandbox's read-only root
    #[arg(short = 'c', long = "chroot", value_name = "SOURCE_DIR")]
    chroot: Option<PathBuf>,

    /// Program to run inside the sandbox, with its arguments
    #[arg(value_name = "PROGRAM", trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() {
    env_logger::init_from_env(Env::new().default_filter_or("warn"));

    let cli = Cli::parse();

    match nsbox::cli::run(&cli.user, &cli.group, cli.chroot.as_deref(), &cli.command) {
        Ok(status) => process::exit(status),
        Err(err) => {
            eprintln!("{}: fatal: {err}", nsbox::APP_NAME);
            process::exit(1);
        }
    }
}
