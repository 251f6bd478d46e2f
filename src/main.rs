fn main() {
    let code = catalyst::run::run().unwrap_or_else(|err| {
        eprintln!("catalyst: {}", err);
        1
    });
    std::process::exit(code);
}
