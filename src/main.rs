fn main() {
    if let Err(err) = scale_backup::cli::run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}
