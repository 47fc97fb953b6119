fn main() {
    if let Err(err) = schema_rename::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
