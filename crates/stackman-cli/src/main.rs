//! `stackman` binary entrypoint.

fn main() {
    std::process::exit(stackman_cli::run());
}
