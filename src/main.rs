fn main() {
    if let Err(err) = csv_consolidate::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
